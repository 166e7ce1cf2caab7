//! The controller actor and its public handle.
//!
//! The controller owns the state machine, the task registry, and the window
//! host, and processes every event sequentially off a single mpsc channel.
//! Timer firings, host notifications, and user commands all become messages
//! on that channel, so no locking is needed around the machine state.
//!
//! # Panic Recovery
//!
//! If a message handler panics, the panic is caught and logged and the
//! actor keeps processing subsequent messages. A single bad host snapshot
//! must not take the auto-hide behavior down with it.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::AutoHideConfig;
use crate::geometry::Bounds;
use crate::host::WindowHost;
use crate::machine::{AutoHideEvent, AutoHideMachine, AutoHideState, Effect, HostView};
use crate::tasks::{TaskKind, TaskRegistry};

/// Channel buffer size for the controller.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Error types for controller communication.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Failed to send a message to the controller.
    #[error("Failed to send message to controller: channel closed")]
    SendFailed,

    /// Failed to receive a response from the controller.
    #[error("Failed to receive response from controller: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// Messages processed by the controller.
#[derive(Debug)]
pub enum ControllerMessage {
    EnableAutoHide,
    DisableAutoHide,
    WindowMoved { bounds: Bounds },
    WindowShownForFirstTime,
    SecondaryWindowOpened { id: String },
    SecondaryWindowClosed { id: String },
    TaskFired { kind: TaskKind, generation: u64 },
    Query { respond_to: oneshot::Sender<ControllerSnapshot> },
    Shutdown,
}

impl ControllerMessage {
    /// Message name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnableAutoHide => "EnableAutoHide",
            Self::DisableAutoHide => "DisableAutoHide",
            Self::WindowMoved { .. } => "WindowMoved",
            Self::WindowShownForFirstTime => "WindowShownForFirstTime",
            Self::SecondaryWindowOpened { .. } => "SecondaryWindowOpened",
            Self::SecondaryWindowClosed { .. } => "SecondaryWindowClosed",
            Self::TaskFired { .. } => "TaskFired",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Point-in-time view of the controller, returned by [`ControllerHandle::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub state: AutoHideState,
    pub original_bounds: Option<Bounds>,
    pub secondary_windows: usize,
}

/// The controller actor. Owns the machine, the timers, and the host.
pub struct AutoHideController<H: WindowHost> {
    machine: AutoHideMachine,
    tasks: TaskRegistry,
    host: H,
    secondary_windows: HashSet<String>,
    receiver: mpsc::Receiver<ControllerMessage>,
}

impl<H: WindowHost> AutoHideController<H> {
    /// Spawn the controller on the current tokio runtime and return a
    /// handle for communicating with it.
    #[must_use]
    pub fn spawn(host: H, config: AutoHideConfig) -> ControllerHandle {
        tracing::debug!("spawning auto-hide controller");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let controller = Self {
            machine: AutoHideMachine::new(config),
            tasks: TaskRegistry::new(sender.clone()),
            host,
            secondary_windows: HashSet::new(),
            receiver,
        };

        tokio::spawn(async move {
            controller.run().await;
        });

        ControllerHandle::new(sender)
    }

    /// Run the message loop.
    ///
    /// Panics in a handler are caught and logged; the loop continues.
    async fn run(mut self) {
        tracing::trace!("controller message loop starting");

        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, ControllerMessage::Shutdown) {
                tracing::debug!("controller received shutdown message");
                self.tasks.cancel_all();
                return;
            }

            let msg_name = msg.name();
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.handle_message(msg);
            }));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!("PANIC in controller while handling '{msg_name}': {panic_msg}");
                tracing::error!(
                    "controller recovered from panic; auto-hide state may be inconsistent"
                );
            }
        }

        tracing::debug!("controller channel closed, exiting");
        self.tasks.cancel_all();
    }

    fn handle_message(&mut self, msg: ControllerMessage) {
        match msg {
            ControllerMessage::EnableAutoHide => self.dispatch(AutoHideEvent::Enable),
            ControllerMessage::DisableAutoHide => self.dispatch(AutoHideEvent::Disable),
            ControllerMessage::WindowMoved { bounds } => {
                self.dispatch(AutoHideEvent::WindowMoved(bounds));
            }
            ControllerMessage::WindowShownForFirstTime => {
                self.dispatch(AutoHideEvent::ShownFirstTime);
            }

            // The machine only cares about the transitions between "none
            // open" and "some open"; the id bookkeeping lives here.
            ControllerMessage::SecondaryWindowOpened { id } => {
                let was_empty = self.secondary_windows.is_empty();
                if self.secondary_windows.insert(id) && was_empty {
                    self.dispatch(AutoHideEvent::SecondaryOpened);
                }
            }
            ControllerMessage::SecondaryWindowClosed { id } => {
                if self.secondary_windows.remove(&id) && self.secondary_windows.is_empty() {
                    self.dispatch(AutoHideEvent::SecondaryClosed);
                }
            }

            ControllerMessage::TaskFired { kind, generation } => {
                if !self.tasks.is_current(kind, generation) {
                    tracing::trace!(
                        kind = kind.name(),
                        generation,
                        "dropping stale task firing"
                    );
                    return;
                }
                if !kind.is_repeating() {
                    self.tasks.finish(kind, generation);
                }
                self.dispatch(match kind {
                    TaskKind::HideDebounce => AutoHideEvent::HideDebounceFired,
                    TaskKind::ShowDebounce => AutoHideEvent::ShowDebounceFired,
                    TaskKind::LeaveDetection => AutoHideEvent::LeaveDetectionTick,
                    TaskKind::ProximityPoll => AutoHideEvent::ProximityPollTick,
                    TaskKind::ResumeSettle => AutoHideEvent::ResumeSettleElapsed,
                });
            }

            ControllerMessage::Query { respond_to } => {
                let snapshot = ControllerSnapshot {
                    state: self.machine.state(),
                    original_bounds: self.machine.original_bounds(),
                    secondary_windows: self.secondary_windows.len(),
                };
                if respond_to.send(snapshot).is_err() {
                    tracing::warn!("failed to send query response (channel closed)");
                }
            }

            // Handled in run() before dispatch.
            ControllerMessage::Shutdown => {}
        }
    }

    /// Feed one event through the machine and execute its effects.
    fn dispatch(&mut self, event: AutoHideEvent) {
        let view = self.snapshot_host();
        let effects = self.machine.handle(event, &view);
        for effect in effects {
            self.apply(effect);
        }
    }

    fn snapshot_host(&self) -> HostView {
        let bounds = self.host.bounds();
        HostView {
            bounds,
            cursor: self.host.cursor_position(),
            work_area: self.host.work_area_for(bounds),
            work_areas: self.host.work_areas(),
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::SetBounds(bounds) => self.host.set_bounds(bounds),
            Effect::Show => {
                if !self.host.is_visible() {
                    self.host.show();
                }
            }
            Effect::SetAlwaysOnTop(on_top) => self.host.set_always_on_top(on_top),
            Effect::Schedule(kind, delay) => self.tasks.schedule(kind, delay),
            Effect::ScheduleRepeating(kind, interval) => {
                self.tasks.schedule_repeating(kind, interval);
            }
            Effect::Cancel(kind) => self.tasks.cancel(kind),
            Effect::CancelAll => self.tasks.cancel_all(),
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Handle for communicating with the controller.
///
/// Cheap to clone and safe to share across threads. All notification
/// methods are fire-and-forget; they only fail when the controller has
/// stopped.
#[derive(Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
}

impl ControllerHandle {
    pub(crate) const fn new(sender: mpsc::Sender<ControllerMessage>) -> Self { Self { sender } }

    /// Send a message without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed or
    /// full.
    fn send(&self, msg: ControllerMessage) -> Result<(), ControllerError> {
        self.sender.try_send(msg).map_err(|_| ControllerError::SendFailed)
    }

    /// Turn the auto-hide behavior on.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn enable_auto_hide(&self) -> Result<(), ControllerError> {
        self.send(ControllerMessage::EnableAutoHide)
    }

    /// Turn the auto-hide behavior off, restoring the window if retracted.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn disable_auto_hide(&self) -> Result<(), ControllerError> {
        self.send(ControllerMessage::DisableAutoHide)
    }

    /// Report that the managed window moved or resized.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn notify_window_moved(&self, bounds: Bounds) -> Result<(), ControllerError> {
        self.send(ControllerMessage::WindowMoved { bounds })
    }

    /// Report that the managed window became visible for the first time.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn notify_shown_first_time(&self) -> Result<(), ControllerError> {
        self.send(ControllerMessage::WindowShownForFirstTime)
    }

    /// Report that a secondary application window opened.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn notify_secondary_window_opened(&self, id: &str) -> Result<(), ControllerError> {
        self.send(ControllerMessage::SecondaryWindowOpened { id: id.to_string() })
    }

    /// Report that a secondary application window closed.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn notify_secondary_window_closed(&self, id: &str) -> Result<(), ControllerError> {
        self.send(ControllerMessage::SecondaryWindowClosed { id: id.to_string() })
    }

    /// Request shutdown of the controller.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed.
    pub fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(ControllerMessage::Shutdown)
    }

    /// Query the current state.
    ///
    /// Because messages are processed in order, this also acts as a barrier:
    /// everything sent before it has been handled once it resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SendFailed`] if the channel is closed, or
    /// [`ControllerError::ReceiveFailed`] if the response channel is closed.
    pub async fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControllerMessage::Query { respond_to: tx })
            .await
            .map_err(|_| ControllerError::SendFailed)?;

        rx.await.map_err(|_| ControllerError::ReceiveFailed)
    }

    /// Query the current state with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Timeout`] if the query doesn't complete in
    /// time, or any error from [`Self::snapshot`].
    pub async fn snapshot_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ControllerSnapshot, ControllerError> {
        tokio::time::timeout(timeout, self.snapshot())
            .await
            .map_err(|_| ControllerError::Timeout(timeout))?
    }

    /// Check if the controller is still running (channel is open).
    #[must_use]
    pub fn is_alive(&self) -> bool { !self.sender.is_closed() }

    /// Get the number of messages waiting in the queue.
    #[must_use]
    pub fn pending_messages(&self) -> usize { self.sender.max_capacity() - self.sender.capacity() }
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("alive", &self.is_alive())
            .field("pending", &self.pending_messages())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::geometry::{Point, WorkArea};

    struct FakeHostState {
        bounds: Bounds,
        cursor: Point,
        work_areas: Vec<WorkArea>,
        visible: bool,
        always_on_top: bool,
    }

    /// Scriptable window host shared between a test and the controller.
    #[derive(Clone)]
    struct FakeHost {
        state: Arc<Mutex<FakeHostState>>,
    }

    impl FakeHost {
        fn new(bounds: Bounds, work_area: WorkArea, cursor: Point) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeHostState {
                    bounds,
                    cursor,
                    work_areas: vec![work_area],
                    visible: true,
                    always_on_top: false,
                })),
            }
        }

        fn set_cursor(&self, cursor: Point) { self.state.lock().cursor = cursor; }

        fn bounds(&self) -> Bounds { self.state.lock().bounds }

        fn always_on_top(&self) -> bool { self.state.lock().always_on_top }
    }

    impl WindowHost for FakeHost {
        fn bounds(&self) -> Bounds { self.state.lock().bounds }
        fn set_bounds(&mut self, bounds: Bounds) { self.state.lock().bounds = bounds; }
        fn is_visible(&self) -> bool { self.state.lock().visible }
        fn show(&mut self) { self.state.lock().visible = true; }
        fn set_always_on_top(&mut self, on_top: bool) {
            self.state.lock().always_on_top = on_top;
        }
        fn cursor_position(&self) -> Point { self.state.lock().cursor }
        fn work_areas(&self) -> Vec<WorkArea> { self.state.lock().work_areas.clone() }
    }

    const WORK_AREA: WorkArea = WorkArea::new(0, 0, 1920, 1080);
    const START_BOUNDS: Bounds = Bounds::new(1915, 100, 1024, 620);
    const FAR_CURSOR: Point = Point::new(500, 500);

    async fn settle(handle: &ControllerHandle) -> ControllerSnapshot {
        handle.snapshot().await.expect("controller alive")
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_at_edge_docks_after_debounce() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        handle.notify_window_moved(START_BOUNDS).expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::PendingHide);
        assert_eq!(snap.original_bounds, Some(START_BOUNDS));

        tokio::time::sleep(Duration::from_millis(350)).await;
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Docked);
        assert_eq!(host.bounds(), Bounds::new(1915, 100, 1024, 620));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_at_edge_reveals_window() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(settle(&handle).await.state, AutoHideState::Docked);

        host.set_cursor(Point::new(1918, 500));
        // Next proximity poll notices the cursor, then the show debounce
        // elapses.
        tokio::time::sleep(Duration::from_millis(350)).await;
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Peeking);
        assert!(host.always_on_top());
        assert_eq!(host.bounds(), Bounds::new(896, 100, 1024, 620));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_retracts_after_cursor_leaves() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        tokio::time::sleep(Duration::from_millis(350)).await;
        host.set_cursor(Point::new(1918, 500));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(settle(&handle).await.state, AutoHideState::Peeking);

        host.set_cursor(FAR_CURSOR);
        // Leave detection notices, then the hide debounce re-docks.
        tokio::time::sleep(Duration::from_millis(700)).await;
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Docked);
        assert!(!host.always_on_top());
        assert_eq!(host.bounds().x, 1915);
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_window_suspends_and_resumes() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(settle(&handle).await.state, AutoHideState::Docked);

        handle.notify_secondary_window_opened("webapp-1").expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Suspended);
        assert_eq!(snap.secondary_windows, 1);
        // Restored to the remembered position while suspended.
        assert_eq!(host.bounds(), START_BOUNDS);

        // A second secondary window keeps it suspended.
        handle.notify_secondary_window_opened("webapp-2").expect("send");
        handle.notify_secondary_window_closed("webapp-1").expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Suspended);
        assert_eq!(snap.secondary_windows, 1);

        handle.notify_secondary_window_closed("webapp-2").expect("send");
        tokio::time::sleep(Duration::from_millis(250)).await;
        let snap = settle(&handle).await;
        // Back in business; the window still sits at the edge, so the hide
        // cycle is already restarting.
        assert!(
            matches!(snap.state, AutoHideState::PendingHide | AutoHideState::Docked),
            "state was {:?}",
            snap.state
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_during_pending_hide_cancels_dock() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        handle.notify_window_moved(START_BOUNDS).expect("send");
        assert_eq!(settle(&handle).await.state, AutoHideState::PendingHide);

        handle.disable_auto_hide().expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Disabled);

        // Well past the debounce: no dock happened.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Disabled);
        assert_eq!(host.bounds(), START_BOUNDS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_disable_round_trip_leaves_bounds_unchanged() {
        let bounds = Bounds::new(400, 100, 1024, 620);
        let host = FakeHost::new(bounds, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        handle.disable_auto_hide().expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Disabled);
        assert_eq!(snap.original_bounds, None);
        assert_eq!(host.bounds(), bounds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_while_docked_restores_window() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(settle(&handle).await.state, AutoHideState::Docked);

        handle.disable_auto_hide().expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Disabled);
        assert_eq!(host.bounds(), START_BOUNDS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_show_docks_after_settle() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, Point::new(1918, 300));
        let handle = AutoHideController::spawn(host.clone(), AutoHideConfig::default());

        handle.enable_auto_hide().expect("send");
        handle.notify_shown_first_time().expect("send");
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::PendingHide);

        // Docks despite the cursor sitting over the window.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let snap = settle(&handle).await;
        assert_eq!(snap.state, AutoHideState::Docked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_controller() {
        let host = FakeHost::new(START_BOUNDS, WORK_AREA, FAR_CURSOR);
        let handle = AutoHideController::spawn(host, AutoHideConfig::default());

        assert!(handle.is_alive());
        handle.shutdown().expect("send");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_alive());
        assert!(handle.enable_auto_hide().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_timeout_on_stopped_controller() {
        let (sender, receiver) = mpsc::channel(1);
        let handle = ControllerHandle::new(sender);
        // Nothing is draining the channel; the query sits unanswered.
        let result = handle.snapshot_timeout(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ControllerError::Timeout(_))));
        drop(receiver);
    }
}

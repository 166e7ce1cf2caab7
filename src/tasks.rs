//! Scheduled-task registry.
//!
//! The controller never sleeps inline; every delay becomes a registered
//! task that posts a [`ControllerMessage::TaskFired`] back onto the
//! controller's channel. The registry keeps at most one live task per kind
//! and tags each with a generation number. A delivery whose generation no
//! longer matches the registry is dropped by the controller, so a cancelled
//! or replaced task can never act, even when its timer already fired into
//! the channel.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::ControllerMessage;

/// The kinds of scheduled work the controller uses. One live task per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// One-shot delay before retracting a window parked at the edge.
    HideDebounce,
    /// One-shot delay before re-emerging once the cursor reaches the edge.
    ShowDebounce,
    /// One-shot cursor check while the window is peeking; rescheduled on
    /// every tick the cursor is still over the window.
    LeaveDetection,
    /// Repeating cursor proximity poll, alive whenever auto-hide is on.
    ProximityPoll,
    /// One-shot settle delay before resuming after the last secondary
    /// window closes.
    ResumeSettle,
}

impl TaskKind {
    /// Whether this kind fires repeatedly until cancelled.
    #[must_use]
    pub const fn is_repeating(self) -> bool { matches!(self, Self::ProximityPoll) }

    /// Kind name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HideDebounce => "hide_debounce",
            Self::ShowDebounce => "show_debounce",
            Self::LeaveDetection => "leave_detection",
            Self::ProximityPoll => "proximity_poll",
            Self::ResumeSettle => "resume_settle",
        }
    }
}

struct TaskSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owns the live timer tasks and their generation bookkeeping.
pub struct TaskRegistry {
    sender: mpsc::Sender<ControllerMessage>,
    slots: HashMap<TaskKind, TaskSlot>,
    next_generation: u64,
}

impl TaskRegistry {
    /// Create a registry that delivers firings into the given channel.
    #[must_use]
    pub fn new(sender: mpsc::Sender<ControllerMessage>) -> Self {
        Self {
            sender,
            slots: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Schedule a one-shot task, replacing any live task of the same kind.
    pub fn schedule(&mut self, kind: TaskKind, delay: Duration) {
        let generation = self.bump();
        tracing::trace!(kind = kind.name(), generation, ?delay, "scheduling task");

        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Waits out a full channel rather than dropping the firing;
            // sending fails only when the controller is gone.
            let _ = sender
                .send(ControllerMessage::TaskFired { kind, generation })
                .await;
        });

        self.install(kind, generation, handle);
    }

    /// Schedule a repeating task, replacing any live task of the same kind.
    /// The first firing happens one full interval from now.
    pub fn schedule_repeating(&mut self, kind: TaskKind, interval: Duration) {
        let generation = self.bump();
        tracing::trace!(kind = kind.name(), generation, ?interval, "scheduling repeating task");

        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval's first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if sender
                    .send(ControllerMessage::TaskFired { kind, generation })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        });

        self.install(kind, generation, handle);
    }

    /// Cancel the live task of a kind. No-op when none is scheduled.
    pub fn cancel(&mut self, kind: TaskKind) {
        if let Some(slot) = self.slots.remove(&kind) {
            tracing::trace!(kind = kind.name(), generation = slot.generation, "cancelling task");
            slot.handle.abort();
        }
    }

    /// Cancel every live task.
    pub fn cancel_all(&mut self) {
        for (kind, slot) in self.slots.drain() {
            tracing::trace!(kind = kind.name(), generation = slot.generation, "cancelling task");
            slot.handle.abort();
        }
    }

    /// Whether a delivery with this generation is still the live one.
    #[must_use]
    pub fn is_current(&self, kind: TaskKind, generation: u64) -> bool {
        self.slots.get(&kind).is_some_and(|slot| slot.generation == generation)
    }

    /// Retire a one-shot task's slot after its firing was accepted.
    pub fn finish(&mut self, kind: TaskKind, generation: u64) {
        if self.is_current(kind, generation) {
            self.slots.remove(&kind);
        }
    }

    /// Whether any task of this kind is live.
    #[must_use]
    pub fn is_scheduled(&self, kind: TaskKind) -> bool { self.slots.contains_key(&kind) }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn install(&mut self, kind: TaskKind, generation: u64, handle: JoinHandle<()>) {
        if let Some(previous) = self.slots.insert(kind, TaskSlot { generation, handle }) {
            previous.handle.abort();
        }
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) { self.cancel_all(); }
}

// ============================================================================
// Tests
// ============================================================================

//! The auto-hide state machine.
//!
//! Pure transition logic: an event plus a snapshot of the host goes in, a
//! list of effects comes out. No I/O, no clocks, no channels. The
//! controller owns an instance, feeds it every event in arrival order, and
//! executes the effects.
//!
//! # States
//!
//! - `Disabled`: auto-hide off, window untouched.
//! - `Visible`: auto-hide on, window not retracted.
//! - `PendingHide`: window parked at the right edge, hide debounce running.
//! - `Docked`: window retracted to a sliver at the right edge.
//! - `PendingShow`: cursor reached the edge, show debounce running.
//! - `Peeking`: window re-emerged on top, watching for the cursor to leave.
//! - `Suspended`: secondary windows are open; the behavior is parked until
//!   the last one closes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AutoHideConfig;
use crate::geometry::{
    Bounds, Point, WorkArea, docked_bounds, is_at_right_edge, is_cursor_near_right_edge,
    is_mostly_hidden, undocked_bounds,
};
use crate::tasks::TaskKind;

/// The mutually exclusive modes of the auto-hide behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoHideState {
    Disabled,
    Visible,
    PendingHide,
    Docked,
    PendingShow,
    Peeking,
    Suspended,
}

impl AutoHideState {
    /// Whether the remembered original bounds must be set in this state.
    #[must_use]
    pub const fn needs_original_bounds(self) -> bool {
        matches!(self, Self::PendingHide | Self::Docked | Self::PendingShow | Self::Peeking)
    }

    /// State name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Visible => "visible",
            Self::PendingHide => "pending_hide",
            Self::Docked => "docked",
            Self::PendingShow => "pending_show",
            Self::Peeking => "peeking",
            Self::Suspended => "suspended",
        }
    }
}

/// Everything that can happen to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoHideEvent {
    Enable,
    Disable,
    /// The managed window moved or resized; carries the fresh bounds.
    WindowMoved(Bounds),
    /// The continuous proximity poll ticked.
    ProximityPollTick,
    /// The leave-detection check ticked while peeking.
    LeaveDetectionTick,
    /// The hide debounce elapsed.
    HideDebounceFired,
    /// The show debounce elapsed.
    ShowDebounceFired,
    /// The resume settle delay elapsed while suspended.
    ResumeSettleElapsed,
    /// The first secondary window opened.
    SecondaryOpened,
    /// The last secondary window closed.
    SecondaryClosed,
    /// The managed window became visible for the first time.
    ShownFirstTime,
}

/// Host-side work requested by a transition. Executed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SetBounds(Bounds),
    Show,
    SetAlwaysOnTop(bool),
    Schedule(TaskKind, Duration),
    ScheduleRepeating(TaskKind, Duration),
    Cancel(TaskKind),
    CancelAll,
}

/// Snapshot of the host taken right before a transition.
///
/// Work areas are looked up fresh for every event; the machine never caches
/// display geometry across events.
#[derive(Debug, Clone)]
pub struct HostView {
    /// Current bounds of the managed window.
    pub bounds: Bounds,
    /// Current global cursor position.
    pub cursor: Point,
    /// The work area the window belongs to, when one matches.
    pub work_area: Option<WorkArea>,
    /// Usable areas of all connected displays.
    pub work_areas: Vec<WorkArea>,
}

/// The auto-hide state machine.
pub struct AutoHideMachine {
    state: AutoHideState,
    config: AutoHideConfig,
    /// Bounds to restore when the window re-emerges or auto-hide turns off.
    original_bounds: Option<Bounds>,
    /// Whether leaving `Suspended` should resume into `Visible`.
    resume_when_cleared: bool,
    /// Set on the first-show path: the pending hide docks without
    /// re-checking the cursor.
    dock_unconditionally: bool,
}

impl AutoHideMachine {
    #[must_use]
    pub const fn new(config: AutoHideConfig) -> Self {
        Self {
            state: AutoHideState::Disabled,
            config,
            original_bounds: None,
            resume_when_cleared: false,
            dock_unconditionally: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> AutoHideState { self.state }

    #[must_use]
    pub const fn original_bounds(&self) -> Option<Bounds> { self.original_bounds }

    /// Apply one event and return the effects to execute.
    pub fn handle(&mut self, event: AutoHideEvent, view: &HostView) -> Vec<Effect> {
        let before = self.state;
        let mut effects = match event {
            AutoHideEvent::Enable => self.on_enable(view),
            AutoHideEvent::Disable => self.on_disable(),
            AutoHideEvent::WindowMoved(bounds) => self.on_window_moved(bounds, view),
            AutoHideEvent::ProximityPollTick => self.on_proximity_tick(view),
            AutoHideEvent::LeaveDetectionTick => self.on_leave_tick(view),
            AutoHideEvent::HideDebounceFired => self.on_hide_debounce(view),
            AutoHideEvent::ShowDebounceFired => self.on_show_debounce(view),
            AutoHideEvent::ResumeSettleElapsed => self.on_resume_settle(view),
            AutoHideEvent::SecondaryOpened => self.on_secondary_opened(),
            AutoHideEvent::SecondaryClosed => self.on_secondary_closed(),
            AutoHideEvent::ShownFirstTime => self.on_shown_first_time(view),
        };
        effects.extend(self.repair());

        if self.state != before {
            tracing::debug!(
                from = before.name(),
                to = self.state.name(),
                event = ?event,
                "auto-hide transition"
            );
        }
        effects
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    fn on_enable(&mut self, view: &HostView) -> Vec<Effect> {
        if self.state != AutoHideState::Disabled {
            return Vec::new();
        }

        self.state = AutoHideState::Visible;
        let mut effects = vec![Effect::ScheduleRepeating(
            TaskKind::ProximityPoll,
            self.config.proximity_poll(),
        )];
        // The window may already be parked at the edge.
        effects.extend(self.evaluate_visible(view.bounds, view));
        effects
    }

    fn on_disable(&mut self) -> Vec<Effect> {
        match self.state {
            AutoHideState::Disabled => Vec::new(),
            AutoHideState::Suspended => {
                // Stay suspended; the eventual resume lands in Disabled.
                self.resume_when_cleared = false;
                self.original_bounds = None;
                self.dock_unconditionally = false;
                Vec::new()
            }
            state => {
                let mut effects = vec![Effect::CancelAll];
                if state == AutoHideState::Peeking {
                    effects.push(Effect::SetAlwaysOnTop(false));
                }
                if matches!(
                    state,
                    AutoHideState::Docked | AutoHideState::PendingShow | AutoHideState::Peeking
                ) {
                    if let Some(original) = self.original_bounds {
                        effects.push(Effect::SetBounds(original));
                        effects.push(Effect::Show);
                    }
                }
                self.original_bounds = None;
                self.dock_unconditionally = false;
                self.state = AutoHideState::Disabled;
                effects
            }
        }
    }

    fn on_window_moved(&mut self, bounds: Bounds, view: &HostView) -> Vec<Effect> {
        match self.state {
            AutoHideState::Disabled | AutoHideState::Suspended => Vec::new(),
            AutoHideState::Visible | AutoHideState::PendingHide => {
                self.evaluate_visible(bounds, view)
            }
            AutoHideState::Docked | AutoHideState::PendingShow => {
                let Some(area) = view.work_area else {
                    return Vec::new();
                };
                let still_retracted = is_at_right_edge(bounds, area, self.config.edge_tolerance_px)
                    && is_mostly_hidden(bounds, area, self.config.hidden_margin_px);
                if still_retracted {
                    // The echo of our own dock placement.
                    return Vec::new();
                }

                // The user dragged the retracted window out.
                let mut effects = Vec::new();
                if self.state == AutoHideState::PendingShow {
                    effects.push(Effect::Cancel(TaskKind::ShowDebounce));
                }
                self.state = AutoHideState::Visible;
                self.original_bounds = None;
                effects.extend(self.evaluate_visible(bounds, view));
                effects
            }
            // The reveal placement echoes back; leave detection owns the
            // exit path while peeking.
            AutoHideState::Peeking => Vec::new(),
        }
    }

    fn on_proximity_tick(&mut self, view: &HostView) -> Vec<Effect> {
        match self.state {
            AutoHideState::Visible => self.evaluate_visible(view.bounds, view),
            AutoHideState::Docked => {
                if self.cursor_at_wake_edge(view) {
                    self.state = AutoHideState::PendingShow;
                    vec![Effect::Schedule(TaskKind::ShowDebounce, self.config.show_debounce())]
                } else {
                    Vec::new()
                }
            }
            AutoHideState::PendingShow => {
                if self.cursor_at_wake_edge(view) {
                    Vec::new()
                } else {
                    self.state = AutoHideState::Docked;
                    vec![Effect::Cancel(TaskKind::ShowDebounce)]
                }
            }
            // PendingHide waits on its debounce, Peeking on leave detection.
            _ => Vec::new(),
        }
    }

    fn on_hide_debounce(&mut self, view: &HostView) -> Vec<Effect> {
        if self.state != AutoHideState::PendingHide {
            return Vec::new();
        }
        let Some(area) = view.work_area else {
            // Display lookup failed; drop back and let the poll retry.
            self.state = AutoHideState::Visible;
            self.dock_unconditionally = false;
            return Vec::new();
        };

        let cursor_over = view.bounds.contains_point(view.cursor);
        if self.dock_unconditionally || !cursor_over {
            self.dock_unconditionally = false;
            self.state = AutoHideState::Docked;
            vec![Effect::SetBounds(docked_bounds(
                view.bounds,
                area,
                self.config.reveal_px,
            ))]
        } else {
            // The cursor came back over the window during the debounce.
            self.state = AutoHideState::Visible;
            Vec::new()
        }
    }

    fn on_show_debounce(&mut self, view: &HostView) -> Vec<Effect> {
        if self.state != AutoHideState::PendingShow {
            return Vec::new();
        }
        let Some(original) = self.original_bounds else {
            // Repaired below; nothing sensible to restore to.
            return Vec::new();
        };
        let Some(area) = view.work_area else {
            // Display lookup failed; stay retracted, the poll retries.
            self.state = AutoHideState::Docked;
            return Vec::new();
        };

        self.state = AutoHideState::Peeking;
        vec![
            Effect::SetBounds(undocked_bounds(original, area)),
            Effect::Show,
            Effect::SetAlwaysOnTop(true),
            Effect::Schedule(TaskKind::LeaveDetection, self.config.peek_grace()),
        ]
    }

    fn on_leave_tick(&mut self, view: &HostView) -> Vec<Effect> {
        if self.state != AutoHideState::Peeking {
            return Vec::new();
        }

        if view.bounds.contains_point(view.cursor) {
            // Still over the window; keep watching.
            return vec![Effect::Schedule(TaskKind::LeaveDetection, self.config.leave_poll())];
        }

        let mut effects = vec![Effect::SetAlwaysOnTop(false)];
        self.state = AutoHideState::Visible;
        // Re-evaluate the fresh position as if the window had just moved;
        // a window still at the edge heads back toward Docked.
        effects.extend(self.evaluate_visible(view.bounds, view));
        effects
    }

    fn on_secondary_opened(&mut self) -> Vec<Effect> {
        match self.state {
            AutoHideState::Disabled | AutoHideState::Suspended => Vec::new(),
            state => {
                let mut effects = vec![Effect::CancelAll];
                if state == AutoHideState::Peeking {
                    effects.push(Effect::SetAlwaysOnTop(false));
                }
                if matches!(
                    state,
                    AutoHideState::Docked | AutoHideState::PendingShow | AutoHideState::Peeking
                ) {
                    if let Some(original) = self.original_bounds {
                        effects.push(Effect::SetBounds(original));
                    }
                }
                effects.push(Effect::Show);
                self.original_bounds = None;
                self.dock_unconditionally = false;
                self.resume_when_cleared = true;
                self.state = AutoHideState::Suspended;
                effects
            }
        }
    }

    fn on_secondary_closed(&mut self) -> Vec<Effect> {
        if self.state != AutoHideState::Suspended {
            return Vec::new();
        }
        vec![Effect::Schedule(TaskKind::ResumeSettle, self.config.settle())]
    }

    fn on_resume_settle(&mut self, view: &HostView) -> Vec<Effect> {
        if self.state != AutoHideState::Suspended {
            return Vec::new();
        }

        if self.resume_when_cleared {
            self.state = AutoHideState::Visible;
            let mut effects = vec![Effect::ScheduleRepeating(
                TaskKind::ProximityPoll,
                self.config.proximity_poll(),
            )];
            effects.extend(self.evaluate_visible(view.bounds, view));
            effects
        } else {
            self.state = AutoHideState::Disabled;
            self.original_bounds = None;
            Vec::new()
        }
    }

    fn on_shown_first_time(&mut self, view: &HostView) -> Vec<Effect> {
        if !matches!(self.state, AutoHideState::Visible | AutoHideState::PendingHide) {
            return Vec::new();
        }
        let Some(area) = view.work_area else {
            return Vec::new();
        };

        // First show docks unconditionally after the settle delay, without
        // re-checking the cursor.
        self.remember_original(view.bounds, area);
        self.dock_unconditionally = true;
        self.state = AutoHideState::PendingHide;
        vec![Effect::Schedule(TaskKind::HideDebounce, self.config.settle())]
    }

    // ========================================================================
    // Shared evaluation
    // ========================================================================

    /// Decide between `Visible` and `PendingHide` for a window position.
    /// Only called while in one of those two states.
    fn evaluate_visible(&mut self, bounds: Bounds, view: &HostView) -> Vec<Effect> {
        let Some(area) = view.work_area else {
            // Off every known display, usually mid-reconfiguration. Keep
            // the current mode and let the next poll retry.
            if self.state == AutoHideState::PendingHide {
                self.state = AutoHideState::Visible;
                self.original_bounds = None;
                return vec![Effect::Cancel(TaskKind::HideDebounce)];
            }
            return Vec::new();
        };

        let at_edge = is_at_right_edge(bounds, area, self.config.edge_tolerance_px);
        let cursor_over = bounds.contains_point(view.cursor);

        if at_edge && !cursor_over {
            self.remember_original(bounds, area);
            self.state = AutoHideState::PendingHide;
            // Replaces any running debounce; dragging along the edge keeps
            // restarting the countdown.
            return vec![Effect::Schedule(TaskKind::HideDebounce, self.config.hide_debounce())];
        }

        let mut effects = Vec::new();
        if self.state == AutoHideState::PendingHide {
            effects.push(Effect::Cancel(TaskKind::HideDebounce));
        }
        self.state = AutoHideState::Visible;
        self.original_bounds = None;
        effects
    }

    /// Remember the bounds to restore to. A position already retracted
    /// behind the edge never overwrites a known-good original, but is
    /// accepted when nothing better was ever captured.
    fn remember_original(&mut self, bounds: Bounds, area: WorkArea) {
        if self.original_bounds.is_none()
            || !is_mostly_hidden(bounds, area, self.config.hidden_margin_px)
        {
            self.original_bounds = Some(bounds);
        }
    }

    /// Whether the cursor should wake a retracted window: within proximity
    /// of the right edge of any work area whose vertical band contains it.
    fn cursor_at_wake_edge(&self, view: &HostView) -> bool {
        view.work_areas.iter().any(|area| {
            area.contains_y(view.cursor.y)
                && is_cursor_near_right_edge(view.cursor, *area, self.config.proximity_px)
        })
    }

    /// Self-heal: a docked-family state without remembered bounds cannot
    /// restore the window, so force `Visible` rather than strand it.
    fn repair(&mut self) -> Vec<Effect> {
        if !self.state.needs_original_bounds() || self.original_bounds.is_some() {
            return Vec::new();
        }

        tracing::warn!(
            state = self.state.name(),
            "auto-hide state lost its remembered bounds, forcing visible"
        );
        let mut effects = Vec::new();
        if self.state == AutoHideState::Peeking {
            effects.push(Effect::SetAlwaysOnTop(false));
        }
        effects.extend([
            Effect::Cancel(TaskKind::HideDebounce),
            Effect::Cancel(TaskKind::ShowDebounce),
            Effect::Cancel(TaskKind::LeaveDetection),
            Effect::Show,
        ]);
        self.state = AutoHideState::Visible;
        self.dock_unconditionally = false;
        effects
    }
}

// ============================================================================
// Tests
// ============================================================================

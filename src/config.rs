//! Auto-hide controller configuration.
//!
//! Every tunable of the controller lives here with its documented default.
//! The struct deserializes from the embedding application's settings file;
//! persistence is the embedder's job.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the edge-docking auto-hide behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoHideConfig {
    /// How close (px) the window's right edge must be to the work area's
    /// right edge to count as docked there.
    /// Default: 1
    #[serde(default = "default_edge_tolerance_px")]
    pub edge_tolerance_px: i32,

    /// How close (px) the cursor must be to the screen's right edge to wake
    /// a retracted window.
    /// Default: 10
    #[serde(default = "default_proximity_px")]
    pub proximity_px: i32,

    /// A window with at most this many pixels still on screen counts as
    /// already retracted; such positions are not remembered for restore.
    /// Default: 20
    #[serde(default = "default_hidden_margin_px")]
    pub hidden_margin_px: i32,

    /// Sliver of the window (px) left visible while retracted.
    /// Default: 5
    #[serde(default = "default_reveal_px")]
    pub reveal_px: i32,

    /// Delay (ms) between the window settling at the edge and retracting.
    /// Default: 300
    #[serde(default = "default_hide_debounce_ms")]
    pub hide_debounce_ms: u64,

    /// Delay (ms) between the cursor reaching the edge and the window
    /// re-emerging.
    /// Default: 100
    #[serde(default = "default_show_debounce_ms")]
    pub show_debounce_ms: u64,

    /// Grace period (ms) after re-emerging before leave detection starts.
    /// Default: 200
    #[serde(default = "default_peek_grace_ms")]
    pub peek_grace_ms: u64,

    /// Interval (ms) between cursor checks while the window is peeking.
    /// Default: 300
    #[serde(default = "default_leave_poll_ms")]
    pub leave_poll_ms: u64,

    /// Interval (ms) of the continuous cursor proximity poll.
    /// Default: 200
    #[serde(default = "default_proximity_poll_ms")]
    pub proximity_poll_ms: u64,

    /// Settle delay (ms) before docking on first show and before resuming
    /// after the last secondary window closes.
    /// Default: 200
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

const fn default_edge_tolerance_px() -> i32 { 1 }
const fn default_proximity_px() -> i32 { 10 }
const fn default_hidden_margin_px() -> i32 { 20 }
const fn default_reveal_px() -> i32 { 5 }
const fn default_hide_debounce_ms() -> u64 { 300 }
const fn default_show_debounce_ms() -> u64 { 100 }
const fn default_peek_grace_ms() -> u64 { 200 }
const fn default_leave_poll_ms() -> u64 { 300 }
const fn default_proximity_poll_ms() -> u64 { 200 }
const fn default_settle_ms() -> u64 { 200 }

impl Default for AutoHideConfig {
    fn default() -> Self {
        Self {
            edge_tolerance_px: default_edge_tolerance_px(),
            proximity_px: default_proximity_px(),
            hidden_margin_px: default_hidden_margin_px(),
            reveal_px: default_reveal_px(),
            hide_debounce_ms: default_hide_debounce_ms(),
            show_debounce_ms: default_show_debounce_ms(),
            peek_grace_ms: default_peek_grace_ms(),
            leave_poll_ms: default_leave_poll_ms(),
            proximity_poll_ms: default_proximity_poll_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl AutoHideConfig {
    #[must_use]
    pub const fn hide_debounce(&self) -> Duration { Duration::from_millis(self.hide_debounce_ms) }

    #[must_use]
    pub const fn show_debounce(&self) -> Duration { Duration::from_millis(self.show_debounce_ms) }

    #[must_use]
    pub const fn peek_grace(&self) -> Duration { Duration::from_millis(self.peek_grace_ms) }

    #[must_use]
    pub const fn leave_poll(&self) -> Duration { Duration::from_millis(self.leave_poll_ms) }

    #[must_use]
    pub const fn proximity_poll(&self) -> Duration {
        Duration::from_millis(self.proximity_poll_ms)
    }

    #[must_use]
    pub const fn settle(&self) -> Duration { Duration::from_millis(self.settle_ms) }
}

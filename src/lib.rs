//! dockaway - Edge-docking auto-hide controller for desktop windows.
//!
//! A window parked at the right screen edge retracts to a sliver after a
//! short debounce and re-emerges when the pointer approaches the edge. The
//! behavior suspends itself while secondary application windows are open
//! and tolerates monitors appearing and disappearing underneath it.
//!
//! The windowing system stays behind the [`WindowHost`] trait; the crate
//! itself is pure control logic driven by a single tokio actor. Embedders
//! implement the trait for their main window, spawn an
//! [`AutoHideController`], and forward window events through the returned
//! [`ControllerHandle`].

pub mod config;
pub mod controller;
pub mod geometry;
pub mod host;
pub mod machine;
pub mod tasks;

pub use config::AutoHideConfig;
pub use controller::{
    AutoHideController, ControllerError, ControllerHandle, ControllerMessage, ControllerSnapshot,
};
pub use geometry::{Bounds, Point, WorkArea};
pub use host::WindowHost;
pub use machine::{AutoHideEvent, AutoHideMachine, AutoHideState, Effect, HostView};
pub use tasks::{TaskKind, TaskRegistry};

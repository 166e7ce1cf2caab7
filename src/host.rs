//! The seam between the controller and the window system.
//!
//! The controller never talks to a real windowing API. Everything it needs
//! from the platform goes through [`WindowHost`], which the embedding
//! application implements for its main window.

use crate::geometry::{Bounds, Point, WorkArea};

/// Host-side operations on the managed window and its displays.
///
/// Implementations should be cheap: every call happens on the controller's
/// event loop. Setters are fire-and-forget; the controller never waits for
/// the window system to confirm a placement.
pub trait WindowHost: Send + 'static {
    /// Current bounds of the managed window.
    fn bounds(&self) -> Bounds;

    /// Move and resize the managed window.
    fn set_bounds(&mut self, bounds: Bounds);

    /// Whether the managed window is currently visible.
    fn is_visible(&self) -> bool;

    /// Make the managed window visible.
    fn show(&mut self);

    /// Toggle the always-on-top flag on the managed window.
    fn set_always_on_top(&mut self, on_top: bool);

    /// Current global cursor position.
    fn cursor_position(&self) -> Point;

    /// Usable areas of all connected displays.
    fn work_areas(&self) -> Vec<WorkArea>;

    /// The work area the window currently belongs to.
    ///
    /// The default picks the area containing the window's center, falling
    /// back to the area with the largest overlap. Returns `None` when the
    /// window overlaps no known display, which can happen transiently while
    /// monitors reconfigure.
    fn work_area_for(&self, bounds: Bounds) -> Option<WorkArea> {
        let areas = self.work_areas();
        let center = bounds.center();

        if let Some(area) = areas.iter().find(|area| area.contains_point(center)) {
            return Some(*area);
        }

        areas
            .into_iter()
            .map(|area| (area.overlap_area(bounds), area))
            .filter(|(overlap, _)| *overlap > 0)
            .max_by_key(|(overlap, _)| *overlap)
            .map(|(_, area)| area)
    }
}

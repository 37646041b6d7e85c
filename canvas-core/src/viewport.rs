//! Viewport rectangle and tile culling.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::tile::{TileGrid, TileRange};
use crate::transform::ViewTransform;

/// The world-space rectangle currently visible on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Widget size in screen pixels.
    pub screen: Size,
    /// Visible world rectangle.
    pub world: Rect,
}

impl Viewport {
    /// Derive the viewport from the widget size and the current transform.
    #[must_use]
    pub fn from_transform(screen: Size, transform: &ViewTransform) -> Self {
        let top_left = transform.screen_to_world(Point::zero());
        let bottom_right = transform.screen_to_world(Point::new(screen.width, screen.height));
        Self {
            screen,
            world: Rect::from_points(top_left, bottom_right),
        }
    }
}

/// Number of extra tiles fetched around the visible edge at a given zoom.
///
/// At very low zoom every tile covers a lot of screen, so nothing is prefetched.
#[must_use]
pub fn prefetch_margin(zoom: f32) -> i32 {
    if zoom < 0.1 {
        0
    } else if zoom < 0.5 {
        1
    } else {
        2
    }
}

/// Computes which tiles must be resident for a viewport.
#[derive(Debug, Clone, Copy)]
pub struct ViewportCuller {
    grid: TileGrid,
}

impl ViewportCuller {
    /// Create a culler for the given grid.
    #[must_use]
    pub fn new(grid: TileGrid) -> Self {
        Self { grid }
    }

    /// Inclusive tile rectangle covering the viewport plus the zoom-dependent margin.
    #[must_use]
    pub fn visible_tiles(&self, viewport: &Viewport, zoom: f32) -> TileRange {
        self.grid
            .range_for(&viewport.world)
            .expand(prefetch_margin(zoom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileKey;

    fn culler() -> ViewportCuller {
        ViewportCuller::new(TileGrid::new(256, 2))
    }

    #[test]
    fn test_viewport_from_identity_transform() {
        let vp = Viewport::from_transform(Size::new(800.0, 600.0), &ViewTransform::default());
        assert_eq!(vp.world, Rect::from_ltrb(0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn test_viewport_follows_pan_and_zoom() {
        let mut t = ViewTransform::default();
        t.set_pan(Point::new(100.0, 50.0));
        t.zoom_at(Point::zero(), 2.0);
        let vp = Viewport::from_transform(Size::new(800.0, 600.0), &t);
        assert!(vp.world.min.approx_eq(Point::new(-100.0, -50.0), 1e-3));
        assert!(vp.world.max.approx_eq(Point::new(300.0, 250.0), 1e-3));
    }

    #[test]
    fn test_prefetch_margin_tiers() {
        assert_eq!(prefetch_margin(0.05), 0);
        assert_eq!(prefetch_margin(0.2), 1);
        assert_eq!(prefetch_margin(1.0), 2);
        assert_eq!(prefetch_margin(8.0), 2);
    }

    #[test]
    fn test_visible_tiles_normal_zoom() {
        let vp = Viewport::from_transform(Size::new(800.0, 600.0), &ViewTransform::default());
        let range = culler().visible_tiles(&vp, 1.0);
        // 800 / 256 -> columns 0..=3, 600 / 256 -> rows 0..=2, plus two on each side.
        assert_eq!(range, TileRange::new(-2, -2, 5, 4));
        assert!(range.contains(TileKey::new(0, 0)));
    }

    #[test]
    fn test_visible_tiles_low_zoom_has_no_margin() {
        let mut t = ViewTransform::default();
        t.zoom_at(Point::zero(), 0.05);
        let vp = Viewport::from_transform(Size::new(500.0, 500.0), &t);
        let range = culler().visible_tiles(&vp, t.zoom());
        assert_eq!(range, TileRange::new(0, 0, 39, 39));
    }
}

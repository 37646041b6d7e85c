//! Screen composition of the visible tile window.
//!
//! Each tile interior is filled through a pattern shader that samples the
//! tile buffer. The buffer padding gives the bilinear filter real neighbour
//! pixels at tile seams when the view is scaled.

use canvas_core::{Color, TileRange, ViewTransform};
use tiny_skia::{FilterQuality, Paint, Pattern, Pixmap, PixmapPaint, SpreadMode, Transform};

use crate::tile_store::TileStore;

/// Draws tiles and overlays onto a screen-sized pixmap.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    background: Color,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl Compositor {
    /// Create a compositor with a background color.
    #[must_use]
    pub fn new(background: Color) -> Self {
        Self { background }
    }

    /// Fill the target with the background color.
    pub fn clear(&self, target: &mut Pixmap) {
        target.fill(tiny_skia::Color::from_rgba8(
            self.background.r,
            self.background.g,
            self.background.b,
            255,
        ));
    }

    /// Draw every existing tile of `range`. Returns the number drawn.
    ///
    /// Missing tiles are skipped, never created; drawn tiles are stamped as
    /// recently used.
    pub fn draw_tiles(
        &self,
        target: &mut Pixmap,
        store: &mut TileStore,
        view: &ViewTransform,
        range: &TileRange,
    ) -> usize {
        let grid = store.grid();
        let zoom = view.zoom();
        let pan = view.pan();
        let screen = Transform::from_row(zoom, 0.0, 0.0, zoom, pan.x * zoom, pan.y * zoom);
        let quality = if (zoom - 1.0).abs() < f32::EPSILON {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };

        let mut drawn = 0;
        for key in range.iter() {
            if !store.touch(key) {
                continue;
            }
            let Some(tile) = store.get(key) else {
                continue;
            };

            let bounds = grid.tile_bounds(key);
            let Some(rect) =
                tiny_skia::Rect::from_ltrb(bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y)
            else {
                continue;
            };
            let origin = grid.buffer_origin(key);
            let paint = Paint {
                shader: Pattern::new(
                    tile.pixmap().as_ref(),
                    SpreadMode::Pad,
                    quality,
                    1.0,
                    Transform::from_translate(origin.x, origin.y),
                ),
                anti_alias: false,
                ..Paint::default()
            };
            target.fill_rect(rect, &paint, screen, None);
            drawn += 1;
        }

        tracing::trace!("Composited {drawn} of {} visible tiles", range.len());
        drawn
    }

    /// Draw a screen-space overlay, such as the shape preview, at the origin.
    pub fn overlay(&self, target: &mut Pixmap, layer: &Pixmap) {
        target.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_store::EvictionPolicy;
    use canvas_core::{Point, TileGrid, TileKey};

    fn store() -> TileStore {
        TileStore::new(TileGrid::new(16, 2), EvictionPolicy::default()).expect("store")
    }

    #[test]
    fn test_clear_uses_background() {
        let mut target = Pixmap::new(4, 4).expect("pixmap");
        Compositor::default().clear(&mut target);
        let p = target.pixel(2, 2).expect("pixel");
        assert_eq!((p.red(), p.green(), p.blue(), p.alpha()), (255, 255, 255, 255));
    }

    #[test]
    fn test_draw_tiles_places_interior_at_world_position() {
        let mut store = store();
        store
            .get_tile(TileKey::new(1, 0))
            .pixmap_mut()
            .fill(tiny_skia::Color::from_rgba8(255, 0, 0, 255));

        let mut target = Pixmap::new(48, 16).expect("pixmap");
        let compositor = Compositor::default();
        compositor.clear(&mut target);
        let drawn = compositor.draw_tiles(
            &mut target,
            &mut store,
            &ViewTransform::default(),
            &TileRange::new(0, 0, 2, 0),
        );

        assert_eq!(drawn, 1);
        let red = target.pixel(20, 8).expect("pixel");
        assert_eq!((red.red(), red.green()), (255, 0));
        let white = target.pixel(8, 8).expect("pixel");
        assert_eq!(white.green(), 255);
        // Tiles missing from the store are not created by rendering.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_draw_tiles_scales_with_zoom() {
        let mut store = store();
        store
            .get_tile(TileKey::new(0, 0))
            .pixmap_mut()
            .fill(tiny_skia::Color::from_rgba8(0, 0, 255, 255));

        let mut view = ViewTransform::default();
        view.zoom_at(Point::zero(), 2.0);
        let mut target = Pixmap::new(64, 64).expect("pixmap");
        let compositor = Compositor::default();
        compositor.clear(&mut target);
        compositor.draw_tiles(&mut target, &mut store, &view, &TileRange::new(0, 0, 0, 0));

        // 16 world px cover 32 screen px at 2x.
        assert_eq!(target.pixel(30, 30).map(|p| p.blue()), Some(255));
        assert_eq!(target.pixel(30, 30).map(|p| p.red()), Some(0));
        assert_eq!(target.pixel(40, 40).map(|p| p.red()), Some(255));
    }

    #[test]
    fn test_draw_tiles_stamps_drawn_keys() {
        let mut store = store();
        store.get_tile(TileKey::new(0, 0));
        store.get_tile(TileKey::new(5, 5));
        let before = store.last_access(TileKey::new(0, 0)).expect("stamp");

        let mut target = Pixmap::new(16, 16).expect("pixmap");
        Compositor::default().draw_tiles(
            &mut target,
            &mut store,
            &ViewTransform::default(),
            &TileRange::new(0, 0, 0, 0),
        );
        assert!(store.last_access(TileKey::new(0, 0)).expect("stamp") > before);
    }
}

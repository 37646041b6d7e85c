//! Saving the tile store as one image and loading an image back into tiles.
//!
//! The saved image covers the tight bounding rectangle of all resident
//! tiles. Missing tiles inside that rectangle stay white. Loading places the
//! image's top-left corner at world (0, 0).

use std::collections::HashSet;
use std::path::Path;

use canvas_core::TileKey;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tiny_skia::ColorU8;

use crate::error::{RenderError, RenderResult};
use crate::tile_store::TileStore;

/// Default tile batch edge used while loading.
pub const DEFAULT_LOAD_BATCH: u32 = 10;

/// Converts between a [`TileStore`] and raster images.
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    load_batch: u32,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_BATCH)
    }
}

impl Serializer {
    /// Create a serializer that loads `load_batch x load_batch` tiles between eviction passes.
    #[must_use]
    pub fn new(load_batch: u32) -> Self {
        Self {
            load_batch: load_batch.max(1),
        }
    }

    /// Flatten every resident tile onto a white image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyCanvas`] if the store has no tiles.
    pub fn compose(&self, store: &TileStore) -> RenderResult<RgbaImage> {
        let bounds = store.bounds().ok_or(RenderError::EmptyCanvas)?;
        let grid = store.grid();
        let size = grid.tile_size;
        let pad = grid.pad_offset();

        let width = bounds
            .columns()
            .checked_mul(size)
            .ok_or_else(|| RenderError::Export("composite width overflows".into()))?;
        let height = bounds
            .rows()
            .checked_mul(size)
            .ok_or_else(|| RenderError::Export("composite height overflows".into()))?;

        let mut out = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        for (key, tile) in store.iter() {
            let (ox, oy) = tile_offset(key, bounds.min_tx, bounds.min_ty, size);
            let pixmap = tile.pixmap();
            for y in 0..size {
                for x in 0..size {
                    let Some(src) = pixmap.pixel(x + pad, y + pad) else {
                        continue;
                    };
                    // Premultiplied source over opaque white.
                    let cover = 255 - src.alpha();
                    out.put_pixel(
                        ox + x,
                        oy + y,
                        Rgba([
                            src.red() + cover,
                            src.green() + cover,
                            src.blue() + cover,
                            255,
                        ]),
                    );
                }
            }
        }
        Ok(out)
    }

    /// Write the composite to `path` in the format implied by its extension.
    ///
    /// Returns the image dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is empty, the extension is not a known
    /// image format, or encoding/IO fails.
    pub fn save(&self, store: &TileStore, path: &Path) -> RenderResult<(u32, u32)> {
        let format = ImageFormat::from_path(path)?;
        let composite = self.compose(store)?;
        let (width, height) = composite.dimensions();

        let image = match format {
            ImageFormat::Jpeg => {
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(composite).to_rgb8())
            }
            _ => DynamicImage::ImageRgba8(composite),
        };
        image.save_with_format(path, format)?;

        tracing::info!(
            "Saved {width}x{height} canvas ({} tiles) to {}",
            store.len(),
            path.display()
        );
        Ok((width, height))
    }

    /// Decode an image file into RGBA pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn decode(path: &Path) -> RenderResult<RgbaImage> {
        Ok(image::open(path)?.to_rgba8())
    }

    /// Replace the store's content with raw RGBA bytes.
    ///
    /// The store is cleared before validation, so invalid input leaves an
    /// empty canvas.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidImage`] for zero sizes or a buffer whose
    /// length does not match `width * height * 4`.
    pub fn load_raw(
        &self,
        store: &mut TileStore,
        width: u32,
        height: u32,
        data: Vec<u8>,
        protected: &HashSet<TileKey>,
    ) -> RenderResult<usize> {
        store.clear();
        let len = data.len();
        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            RenderError::InvalidImage(format!(
                "{len} bytes do not form a {width}x{height} RGBA image"
            ))
        })?;
        self.populate(store, &image, protected)
    }

    /// Replace the store's content with an image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidImage`] if the image has no pixels.
    pub fn load_image(
        &self,
        store: &mut TileStore,
        image: &RgbaImage,
        protected: &HashSet<TileKey>,
    ) -> RenderResult<usize> {
        store.clear();
        self.populate(store, image, protected)
    }

    fn populate(
        &self,
        store: &mut TileStore,
        image: &RgbaImage,
        protected: &HashSet<TileKey>,
    ) -> RenderResult<usize> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidImage(format!(
                "image has no pixels ({width}x{height})"
            )));
        }

        let grid = store.grid();
        let size = grid.tile_size;
        let columns = width.div_ceil(size);
        let rows = height.div_ceil(size);
        if i32::try_from(columns).is_err() || i32::try_from(rows).is_err() {
            return Err(RenderError::InvalidImage(format!(
                "{width}x{height} does not fit the tile grid"
            )));
        }

        let batch = self.load_batch;
        let mut loaded = 0;
        let mut evicted = 0;
        for batch_y in (0..rows).step_by(batch as usize) {
            for batch_x in (0..columns).step_by(batch as usize) {
                for ty in batch_y..(batch_y + batch).min(rows) {
                    for tx in batch_x..(batch_x + batch).min(columns) {
                        copy_padded_region(store, image, tx, ty);
                        loaded += 1;
                    }
                }
                evicted += store.evict_if_over_capacity(protected);
            }
        }

        tracing::info!(
            "Loaded {width}x{height} image into {loaded} tiles ({evicted} evicted while loading)"
        );
        Ok(loaded)
    }
}

/// Pixel offset of a tile's interior inside the composite.
#[allow(clippy::cast_sign_loss)]
fn tile_offset(key: TileKey, min_tx: i32, min_ty: i32, size: u32) -> (u32, u32) {
    let dx = (key.tx - min_tx) as u32;
    let dy = (key.ty - min_ty) as u32;
    (dx * size, dy * size)
}

/// Copy the image region under tile `(tx, ty)`, padding included, into its buffer.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn copy_padded_region(store: &mut TileStore, image: &RgbaImage, tx: u32, ty: u32) {
    let grid = store.grid();
    let size = i64::from(grid.tile_size);
    let pad = i64::from(grid.pad_offset());
    let edge = grid.buffer_edge();
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let left = i64::from(tx) * size - pad;
    let top = i64::from(ty) * size - pad;

    let tile = store.get_tile(TileKey::new(tx as i32, ty as i32));
    let pixels = tile.pixmap_mut().pixels_mut();
    for by in 0..i64::from(edge) {
        let sy = top + by;
        if sy < 0 || sy >= height {
            continue;
        }
        for bx in 0..i64::from(edge) {
            let sx = left + bx;
            if sx < 0 || sx >= width {
                continue;
            }
            let [r, g, b, a] = image.get_pixel(sx as u32, sy as u32).0;
            pixels[(by * i64::from(edge) + bx) as usize] =
                ColorU8::from_rgba(r, g, b, a).premultiply();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_store::EvictionPolicy;
    use canvas_core::TileGrid;

    fn store(tile_size: u32) -> TileStore {
        TileStore::new(TileGrid::new(tile_size, 2), EvictionPolicy::default()).expect("store")
    }

    fn paint(store: &mut TileStore, key: TileKey, rgba: (u8, u8, u8, u8)) {
        store
            .get_tile(key)
            .pixmap_mut()
            .fill(tiny_skia::Color::from_rgba8(rgba.0, rgba.1, rgba.2, rgba.3));
    }

    // ===========================================
    // Compose and save
    // ===========================================

    #[test]
    fn test_compose_empty_fails() {
        let store = store(16);
        assert!(matches!(
            Serializer::default().compose(&store),
            Err(RenderError::EmptyCanvas)
        ));
    }

    #[test]
    fn test_compose_covers_bounding_tiles_with_white_gaps() {
        let mut store = store(16);
        paint(&mut store, TileKey::new(-1, 0), (255, 0, 0, 255));
        paint(&mut store, TileKey::new(1, 1), (0, 0, 255, 255));

        let image = Serializer::default().compose(&store).expect("composite");
        assert_eq!(image.dimensions(), (48, 32));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(47, 31).0, [0, 0, 255, 255]);
        // Tile (0, 0) was never created.
        assert_eq!(image.get_pixel(20, 5).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_compose_blends_translucent_over_white() {
        let mut store = store(16);
        paint(&mut store, TileKey::new(0, 0), (0, 0, 0, 128));
        let image = Serializer::default().compose(&store).expect("composite");
        let [r, g, b, a] = image.get_pixel(3, 3).0;
        assert_eq!(a, 255);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((125..=130).contains(&r), "red was {r}");
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store(16);
        paint(&mut store, TileKey::new(0, 0), (1, 2, 3, 255));
        let result = Serializer::default().save(&store, &dir.path().join("canvas.nope"));
        assert!(matches!(result, Err(RenderError::Image(_))));
    }

    #[test]
    fn test_save_jpeg_flattens_alpha() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("canvas.jpg");
        let mut store = store(16);
        paint(&mut store, TileKey::new(0, 0), (10, 200, 30, 255));

        let dims = Serializer::default().save(&store, &path).expect("save");
        assert_eq!(dims, (16, 16));
        let decoded = image::open(&path).expect("decode");
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    // ===========================================
    // Load
    // ===========================================

    #[test]
    fn test_load_raw_rejects_inconsistent_buffer_and_stays_cleared() {
        let mut store = store(16);
        paint(&mut store, TileKey::new(4, 4), (1, 2, 3, 255));

        let result = Serializer::default().load_raw(&mut store, 4, 4, vec![0; 10], &HashSet::new());
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_rejects_zero_size() {
        let mut store = store(16);
        let result =
            Serializer::default().load_image(&mut store, &RgbaImage::new(0, 0), &HashSet::new());
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
    }

    #[test]
    fn test_load_fills_tiles_with_padding() {
        let mut store = store(16);
        let image = RgbaImage::from_fn(40, 20, |x, _| {
            if x < 16 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });

        let loaded = Serializer::default()
            .load_image(&mut store, &image, &HashSet::new())
            .expect("load");
        assert_eq!(loaded, 6);
        assert_eq!(store.bounds().map(|r| r.len()), Some(6));

        let left = store.get(TileKey::new(0, 0)).expect("tile").pixmap();
        // Interior pixel (0, 0) sits at buffer (1, 1).
        assert_eq!(left.pixel(1, 1).map(|p| p.red()), Some(255));
        // Right pad column holds the neighbour's first column.
        assert_eq!(left.pixel(17, 1).map(|p| p.green()), Some(255));
        // Left pad column lies outside the image.
        assert_eq!(left.pixel(0, 1).map(|p| p.alpha()), Some(0));
    }

    #[test]
    fn test_load_evicts_between_batches() {
        let mut store = TileStore::new(
            TileGrid::new(8, 2),
            EvictionPolicy {
                base_capacity: 4,
                cleanup_interval: 1000,
                spare_pool: 0,
            },
        )
        .expect("store");
        let image = RgbaImage::from_pixel(8 * 6, 8 * 6, Rgba([9, 9, 9, 255]));

        let loaded = Serializer::new(2)
            .load_image(&mut store, &image, &HashSet::new())
            .expect("load");
        assert_eq!(loaded, 36);
        assert!(store.len() <= 4);
    }

    #[test]
    fn test_save_load_round_trip_is_pixel_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");

        let mut store = store(16);
        paint(&mut store, TileKey::new(0, 0), (200, 10, 10, 255));
        paint(&mut store, TileKey::new(1, 0), (0, 0, 0, 77));
        let serializer = Serializer::default();
        serializer.save(&store, &first).expect("save");

        let decoded = Serializer::decode(&first).expect("decode");
        let mut reloaded = self::store(16);
        serializer
            .load_image(&mut reloaded, &decoded, &HashSet::new())
            .expect("load");
        serializer.save(&reloaded, &second).expect("save again");

        let a = Serializer::decode(&first).expect("decode");
        let b = Serializer::decode(&second).expect("decode");
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.as_raw(), b.as_raw());
    }
}

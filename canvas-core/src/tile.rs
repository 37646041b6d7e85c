//! Tile addressing on the infinite grid.
//!
//! ```text
//!   world x:  -256        0         256       512
//!              ├─────────┼─────────┼─────────┤
//!   tile tx:      -1         0         1
//!
//!   buffer of one tile (pad = 2):
//!   ┌─┬──────────────┬─┐
//!   │ │              │ │   one pad pixel on every side,
//!   │ │   interior   │ │   interior pixel (0,0) sits at
//!   │ │ tile_size²   │ │   buffer pixel (1,1)
//!   └─┴──────────────┴─┘
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Integer coordinates of a tile on the infinite grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    /// Column (floor of world x / tile size).
    pub tx: i32,
    /// Row (floor of world y / tile size).
    pub ty: i32,
}

impl TileKey {
    /// Create a new tile key.
    #[must_use]
    pub const fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.tx, self.ty)
    }
}

impl From<(i32, i32)> for TileKey {
    fn from((tx, ty): (i32, i32)) -> Self {
        Self::new(tx, ty)
    }
}

/// Tile edge length and padding, and the conversions that depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Edge length of a tile's interior in world pixels.
    pub tile_size: u32,
    /// Extra pixels added to the buffer edge (split evenly between both sides).
    pub padding: u32,
}

impl TileGrid {
    /// Create a grid description.
    #[must_use]
    pub const fn new(tile_size: u32, padding: u32) -> Self {
        Self { tile_size, padding }
    }

    /// Edge length of a tile's pixel buffer, padding included.
    #[must_use]
    pub const fn buffer_edge(&self) -> u32 {
        self.tile_size + self.padding
    }

    /// Pixels of padding on each side of the interior.
    #[must_use]
    pub const fn pad_offset(&self) -> u32 {
        self.padding / 2
    }

    /// Tile containing a world point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn world_to_tile(&self, p: Point) -> TileKey {
        let size = self.tile_size as f32;
        TileKey::new((p.x / size).floor() as i32, (p.y / size).floor() as i32)
    }

    /// Tile containing a world point plus the offset of the point inside that tile's interior.
    #[must_use]
    pub fn locate(&self, p: Point) -> (TileKey, Point) {
        let key = self.world_to_tile(p);
        (key, p - self.tile_origin(key))
    }

    /// World position of the top-left corner of a tile's interior.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tile_origin(&self, key: TileKey) -> Point {
        let size = self.tile_size as f32;
        Point::new(key.tx as f32 * size, key.ty as f32 * size)
    }

    /// World position that maps to buffer pixel (0, 0) of a tile.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn buffer_origin(&self, key: TileKey) -> Point {
        let pad = self.pad_offset() as f32;
        self.tile_origin(key) - Point::new(pad, pad)
    }

    /// Convert a world point into the buffer coordinates of a tile.
    #[must_use]
    pub fn world_to_buffer(&self, key: TileKey, p: Point) -> Point {
        p - self.buffer_origin(key)
    }

    /// World-space area covered by a tile's interior.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tile_bounds(&self, key: TileKey) -> Rect {
        let origin = self.tile_origin(key);
        let size = self.tile_size as f32;
        Rect::from_ltrb(origin.x, origin.y, origin.x + size, origin.y + size)
    }

    /// World-space area covered by a tile's whole buffer, padding included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn padded_bounds(&self, key: TileKey) -> Rect {
        self.tile_bounds(key).inflate(self.pad_offset() as f32)
    }

    /// Inclusive range of tiles touched by a world rectangle.
    #[must_use]
    pub fn range_for(&self, rect: &Rect) -> TileRange {
        let min = self.world_to_tile(rect.min);
        let max = self.world_to_tile(rect.max);
        TileRange::new(min.tx, min.ty, max.tx, max.ty)
    }
}

/// Inclusive rectangle of tile keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    /// Smallest column.
    pub min_tx: i32,
    /// Smallest row.
    pub min_ty: i32,
    /// Largest column (inclusive).
    pub max_tx: i32,
    /// Largest row (inclusive).
    pub max_ty: i32,
}

impl TileRange {
    /// Create a range from inclusive bounds.
    #[must_use]
    pub const fn new(min_tx: i32, min_ty: i32, max_tx: i32, max_ty: i32) -> Self {
        Self {
            min_tx,
            min_ty,
            max_tx,
            max_ty,
        }
    }

    /// Grow the range by `tiles` in every direction.
    #[must_use]
    pub const fn expand(&self, tiles: i32) -> Self {
        Self::new(
            self.min_tx - tiles,
            self.min_ty - tiles,
            self.max_tx + tiles,
            self.max_ty + tiles,
        )
    }

    /// Number of columns.
    #[must_use]
    pub fn columns(&self) -> u32 {
        (self.max_tx - self.min_tx + 1).max(0).unsigned_abs()
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> u32 {
        (self.max_ty - self.min_ty + 1).max(0).unsigned_abs()
    }

    /// Number of tiles in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Check whether the range contains no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a key lies inside the range.
    #[must_use]
    pub fn contains(&self, key: TileKey) -> bool {
        (self.min_tx..=self.max_tx).contains(&key.tx)
            && (self.min_ty..=self.max_ty).contains(&key.ty)
    }

    /// Iterate over every key, row by row.
    pub fn iter(&self) -> impl Iterator<Item = TileKey> {
        let Self {
            min_tx,
            min_ty,
            max_tx,
            max_ty,
        } = *self;
        (min_ty..=max_ty).flat_map(move |ty| (min_tx..=max_tx).map(move |tx| TileKey::new(tx, ty)))
    }

    /// Collect the range into a set.
    #[must_use]
    pub fn to_set(&self) -> HashSet<TileKey> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileGrid {
        TileGrid::new(256, 2)
    }

    #[test]
    fn test_world_to_tile_floors_negative() {
        let g = grid();
        assert_eq!(g.world_to_tile(Point::new(0.0, 0.0)), TileKey::new(0, 0));
        assert_eq!(g.world_to_tile(Point::new(255.9, 255.9)), TileKey::new(0, 0));
        assert_eq!(g.world_to_tile(Point::new(256.0, 0.0)), TileKey::new(1, 0));
        assert_eq!(g.world_to_tile(Point::new(-0.5, -256.0)), TileKey::new(-1, -1));
        assert_eq!(g.world_to_tile(Point::new(-256.5, 10.0)), TileKey::new(-2, 0));
    }

    #[test]
    fn test_locate_returns_local_offset() {
        let (key, local) = grid().locate(Point::new(300.0, -10.0));
        assert_eq!(key, TileKey::new(1, -1));
        assert_eq!(local, Point::new(44.0, 246.0));
    }

    #[test]
    fn test_buffer_coordinates_include_pad() {
        let g = grid();
        assert_eq!(g.buffer_edge(), 258);
        let local = g.world_to_buffer(TileKey::new(1, 0), Point::new(256.0, 0.0));
        assert_eq!(local, Point::new(1.0, 1.0));
        let padded = g.padded_bounds(TileKey::new(0, 0));
        assert_eq!(padded, Rect::from_ltrb(-1.0, -1.0, 257.0, 257.0));
    }

    #[test]
    fn test_range_iteration() {
        let range = TileRange::new(-1, 0, 1, 1);
        assert_eq!(range.len(), 6);
        let keys: Vec<_> = range.iter().collect();
        assert_eq!(keys.first(), Some(&TileKey::new(-1, 0)));
        assert_eq!(keys.last(), Some(&TileKey::new(1, 1)));
        assert!(range.contains(TileKey::new(0, 1)));
        assert!(!range.contains(TileKey::new(2, 1)));
        assert_eq!(range.expand(1).len(), 20);
    }

    #[test]
    fn test_range_for_rect() {
        let range = grid().range_for(&Rect::from_ltrb(10.0, 10.0, 300.0, 10.0));
        assert_eq!(range, TileRange::new(0, 0, 1, 0));
    }
}

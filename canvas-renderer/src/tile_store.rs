//! Lazily created tile buffers with zoom-adaptive LRU eviction.
//!
//! Tiles live in a slot arena and are addressed through a [`TileKey`] index.
//! Every access stamps the key with a logical clock; eviction removes the
//! oldest stamps first but never touches the protected (visible) set.
//! Buffers of evicted tiles are kept in a small spare pool and reused for
//! the next tile that gets created.

use std::collections::{HashMap, HashSet};

use canvas_core::{CanvasConfig, CanvasError, TileGrid, TileKey, TileRange};
use slotmap::SlotMap;
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};

slotmap::new_key_type! {
    /// Stable handle of a tile inside the store's arena.
    pub struct TileHandle;
}

/// One tile: a padded premultiplied RGBA buffer and its dirty flag.
#[derive(Debug, Clone)]
pub struct CanvasTile {
    pixels: Pixmap,
    dirty: bool,
}

impl CanvasTile {
    fn new(pixels: Pixmap) -> Self {
        Self {
            pixels,
            dirty: false,
        }
    }

    /// Read access to the pixel buffer.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixels
    }

    /// Write access to the pixel buffer. Marks the tile dirty.
    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        self.dirty = true;
        &mut self.pixels
    }

    /// Whether the buffer changed since the flag was last cleared.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Check whether every pixel is fully transparent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().iter().all(|p| p.alpha() == 0)
    }
}

/// How many tiles may stay resident and how often that is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Tile budget at normal zoom.
    pub base_capacity: usize,
    /// Tile creations between lazy eviction passes.
    pub cleanup_interval: u32,
    /// Evicted buffers kept for reuse.
    pub spare_pool: usize,
}

impl EvictionPolicy {
    /// Tile budget for a zoom factor.
    ///
    /// Zoomed out, each tile paints a small part of the screen and a vast
    /// world area is in view, so the budget shrinks; zoomed in it grows.
    #[must_use]
    pub fn capacity_for_zoom(&self, zoom: f32) -> usize {
        let base = self.base_capacity;
        if zoom < 0.1 {
            base * 3 / 10
        } else if zoom < 0.5 {
            base * 6 / 10
        } else if zoom > 5.0 {
            base * 3 / 2
        } else {
            base
        }
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::from(&CanvasConfig::default())
    }
}

impl From<&CanvasConfig> for EvictionPolicy {
    fn from(config: &CanvasConfig) -> Self {
        Self {
            base_capacity: config.base_tile_capacity,
            cleanup_interval: config.cleanup_interval,
            spare_pool: config.spare_pool,
        }
    }
}

/// Store statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileStoreStats {
    /// Tiles created.
    pub created: u64,
    /// Tiles created from a recycled buffer.
    pub recycled: u64,
    /// Tiles removed by eviction.
    pub evicted: u64,
    /// Eviction passes run.
    pub cleanup_passes: u64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: TileHandle,
    last_access: u64,
}

/// Owner of every tile buffer of the canvas.
pub struct TileStore {
    grid: TileGrid,
    policy: EvictionPolicy,
    arena: SlotMap<TileHandle, CanvasTile>,
    index: HashMap<TileKey, Entry>,
    clock: u64,
    creations_since_cleanup: u32,
    zoom: f32,
    protected: HashSet<TileKey>,
    blank: Pixmap,
    spare: Vec<Pixmap>,
    stats: TileStoreStats,
}

impl TileStore {
    /// Create an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile buffer size cannot be allocated.
    pub fn new(grid: TileGrid, policy: EvictionPolicy) -> RenderResult<Self> {
        let edge = grid.buffer_edge();
        let blank = Pixmap::new(edge, edge).ok_or_else(|| {
            RenderError::Core(CanvasError::InvalidConfig(format!(
                "tile buffer of {edge}x{edge} pixels cannot be allocated"
            )))
        })?;

        Ok(Self {
            grid,
            policy,
            arena: SlotMap::with_key(),
            index: HashMap::new(),
            clock: 0,
            creations_since_cleanup: 0,
            zoom: 1.0,
            protected: HashSet::new(),
            blank,
            spare: Vec::new(),
            stats: TileStoreStats::default(),
        })
    }

    /// Create a store from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &CanvasConfig) -> RenderResult<Self> {
        config.validate()?;
        Self::new(config.grid(), EvictionPolicy::from(config))
    }

    /// Tile geometry of this store.
    #[must_use]
    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    /// Eviction policy of this store.
    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Return the tile for `key`, creating a blank one if needed.
    ///
    /// Always stamps the key as most recently used. Every
    /// `cleanup_interval`-th creation runs an eviction pass first, protecting
    /// the keys last passed to [`set_protected`](Self::set_protected).
    pub fn get_tile(&mut self, key: TileKey) -> &mut CanvasTile {
        let now = self.tick();
        if let Some(entry) = self.index.get_mut(&key) {
            entry.last_access = now;
            let handle = entry.handle;
            return &mut self.arena[handle];
        }

        self.creations_since_cleanup += 1;
        if self.creations_since_cleanup >= self.policy.cleanup_interval {
            self.creations_since_cleanup = 0;
            let protected = std::mem::take(&mut self.protected);
            self.evict_if_over_capacity(&protected);
            self.protected = protected;
        }

        let pixels = self.take_buffer();
        let handle = self.arena.insert(CanvasTile::new(pixels));
        self.index.insert(
            key,
            Entry {
                handle,
                last_access: now,
            },
        );
        self.stats.created += 1;
        tracing::trace!("Created tile {key} ({} resident)", self.index.len());
        &mut self.arena[handle]
    }

    /// Return the tile for `key` only if it exists, stamping it as used.
    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut CanvasTile> {
        let now = self.tick();
        let entry = self.index.get_mut(&key)?;
        entry.last_access = now;
        let handle = entry.handle;
        self.arena.get_mut(handle)
    }

    /// Read a tile without creating it or changing its stamp.
    #[must_use]
    pub fn get(&self, key: TileKey) -> Option<&CanvasTile> {
        self.index
            .get(&key)
            .and_then(|entry| self.arena.get(entry.handle))
    }

    /// Stamp an existing key as most recently used. Returns `false` if absent.
    pub fn touch(&mut self, key: TileKey) -> bool {
        let now = self.tick();
        match self.index.get_mut(&key) {
            Some(entry) => {
                entry.last_access = now;
                true
            }
            None => false,
        }
    }

    /// Arena handle of a resident key.
    #[must_use]
    pub fn handle_of(&self, key: TileKey) -> Option<TileHandle> {
        self.index.get(&key).map(|entry| entry.handle)
    }

    /// Logical time of the last access to a key.
    #[must_use]
    pub fn last_access(&self, key: TileKey) -> Option<u64> {
        self.index.get(&key).map(|entry| entry.last_access)
    }

    /// Check whether a tile exists for `key`.
    #[must_use]
    pub fn contains(&self, key: TileKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Number of resident tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check whether the store holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Resident keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.index.keys().copied()
    }

    /// Resident tiles in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (TileKey, &CanvasTile)> + '_ {
        self.index
            .iter()
            .filter_map(|(key, entry)| self.arena.get(entry.handle).map(|tile| (*key, tile)))
    }

    /// Smallest tile rectangle containing every resident tile.
    #[must_use]
    pub fn bounds(&self) -> Option<TileRange> {
        let mut keys = self.index.keys();
        let first = keys.next()?;
        let init = TileRange::new(first.tx, first.ty, first.tx, first.ty);
        Some(keys.fold(init, |r, k| {
            TileRange::new(
                r.min_tx.min(k.tx),
                r.min_ty.min(k.ty),
                r.max_tx.max(k.tx),
                r.max_ty.max(k.ty),
            )
        }))
    }

    /// Zoom factor the capacity is currently scaled for.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Update the zoom factor used to scale the capacity.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    /// Replace the set of keys lazy eviction passes must keep.
    pub fn set_protected(&mut self, keys: HashSet<TileKey>) {
        self.protected = keys;
    }

    /// Keys currently protected from lazy eviction.
    #[must_use]
    pub fn protected(&self) -> &HashSet<TileKey> {
        &self.protected
    }

    /// Tile budget at the current zoom.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.policy.capacity_for_zoom(self.zoom)
    }

    /// Remove least recently used tiles until the store fits its capacity.
    ///
    /// Keys in `visible` are never removed; if they alone exceed the
    /// capacity the excess is tolerated. Returns the number of evicted tiles.
    pub fn evict_if_over_capacity(&mut self, visible: &HashSet<TileKey>) -> usize {
        let capacity = self.capacity();
        self.stats.cleanup_passes += 1;
        if self.index.len() <= capacity {
            return 0;
        }

        let mut candidates: Vec<(u64, TileKey)> = self
            .index
            .iter()
            .filter(|(key, _)| !visible.contains(key))
            .map(|(key, entry)| (entry.last_access, *key))
            .collect();
        candidates.sort_unstable();

        let excess = self.index.len() - capacity;
        let mut evicted = 0;
        for (_, key) in candidates.into_iter().take(excess) {
            if self.discard(key) {
                evicted += 1;
            }
        }
        self.stats.evicted += evicted as u64;

        if self.index.len() > capacity {
            tracing::debug!(
                "Visible tiles exceed capacity: {} resident, capacity {capacity}",
                self.index.len()
            );
        }
        tracing::debug!(
            "Eviction pass removed {evicted} tiles ({} resident, capacity {capacity}, zoom {:.3})",
            self.index.len(),
            self.zoom
        );
        evicted
    }

    /// Drop every tile and access record.
    pub fn clear(&mut self) {
        let keys: Vec<TileKey> = self.index.keys().copied().collect();
        for key in keys {
            self.discard(key);
        }
        self.creations_since_cleanup = 0;
        tracing::debug!("Tile store cleared");
    }

    /// Store statistics.
    #[must_use]
    pub fn stats(&self) -> &TileStoreStats {
        &self.stats
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn discard(&mut self, key: TileKey) -> bool {
        let Some(entry) = self.index.remove(&key) else {
            return false;
        };
        if let Some(tile) = self.arena.remove(entry.handle) {
            if self.spare.len() < self.policy.spare_pool {
                self.spare.push(tile.pixels);
            }
        }
        true
    }

    fn take_buffer(&mut self) -> Pixmap {
        match self.spare.pop() {
            Some(mut pixels) => {
                pixels.fill(tiny_skia::Color::TRANSPARENT);
                self.stats.recycled += 1;
                pixels
            }
            None => self.blank.clone(),
        }
    }
}

impl std::fmt::Debug for TileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileStore")
            .field("grid", &self.grid)
            .field("policy", &self.policy)
            .field("tiles", &self.index.len())
            .field("zoom", &self.zoom)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

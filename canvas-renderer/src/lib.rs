//! # Saorsa Tiles Renderer
//!
//! CPU pixel work for the infinite tiled canvas, built on tiny-skia.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               CanvasEngine                  │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Rasterizer  │ Annotation  │ Serializer      │
//! │ strokes,    │ Layer       │ save / load     │
//! │ shapes      │ text items  │ via `image`     │
//! ├─────────────┴─────────────┴─────────────────┤
//! │        TileStore (arena + LRU)              │
//! ├─────────────────────────────────────────────┤
//! │   Compositor: visible window → screen       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the thread that owns the [`CanvasEngine`]. Eviction
//! needs `&mut TileStore`, so it can never overlap a render pass.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod annotation;
pub mod compositor;
pub mod engine;
pub mod error;
pub mod raster;
pub mod serializer;
pub mod text;
pub mod tile_store;

pub use annotation::{
    AnnotationLayer, PressOutcome, TextGesture, TextItem, TextPrompt, MIN_TEXT_SCALE,
};
pub use compositor::Compositor;
pub use engine::{CanvasEngine, Interaction, ZoomObserver};
pub use error::{RenderError, RenderResult};
pub use raster::{Rasterizer, ShapePreview};
pub use serializer::Serializer;
pub use text::{FontBook, TextExtent};
pub use tile_store::{CanvasTile, EvictionPolicy, TileHandle, TileStore, TileStoreStats};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

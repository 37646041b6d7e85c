//! # Saorsa Tiles Core
//!
//! Pure model of the infinite tiled canvas. No pixels live here; the
//! renderer crate owns the tile buffers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                canvas-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Coordinates     │  Input                   │
//! │  - ViewTransform │  - Pointer / wheel       │
//! │  - TileGrid      │  - Replayable commands   │
//! │  - Viewport cull │  - Brush & tool state    │
//! ├─────────────────────────────────────────────┤
//! │  CanvasConfig    │  CanvasError             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Pointer events arrive in screen space, [`ViewTransform`] maps them into
//! world space, [`TileGrid`] addresses the tile under a world point and
//! [`ViewportCuller`] picks the tile window that has to stay resident.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod brush;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod text;
pub mod tile;
pub mod transform;
pub mod viewport;

pub use brush::{brush_size_from_slider, BrushState, Color, ShapeKind, Tool};
pub use config::CanvasConfig;
pub use error::{CanvasError, CanvasResult};
pub use event::{Command, Modifiers, PointerButton, PointerEvent};
pub use geometry::{Point, Rect, Size};
pub use text::{FontDescriptor, TextId};
pub use tile::{TileGrid, TileKey, TileRange};
pub use transform::{ViewTransform, ZoomDirection};
pub use viewport::{prefetch_margin, Viewport, ViewportCuller};

/// Canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

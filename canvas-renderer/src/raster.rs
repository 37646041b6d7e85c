//! Stroke and shape rasterization across tile boundaries.
//!
//! Geometry is built once in world space and replayed into every affected
//! tile with a translation to that tile's buffer origin, so a stroke that
//! crosses a seam is drawn identically on both sides (the padding pixels
//! overlap the neighbour).

use canvas_core::{
    BrushState, Color, Point, Rect, ShapeKind, TileGrid, TileKey, Tool, ViewTransform,
};
use tiny_skia::{
    BlendMode, FillRule, LineCap, LineJoin, NonZeroRect, Paint, Path, PathBuilder, Pixmap, Stroke,
    Transform,
};

use crate::error::{RenderError, RenderResult};
use crate::tile_store::TileStore;

/// Segments shorter than this are drawn as a dot.
const MIN_SEGMENT_LENGTH: f32 = 1e-3;

/// Draws freehand segments and committed shapes into tiles.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    grid: TileGrid,
}

impl Rasterizer {
    /// Create a rasterizer for a tile grid.
    #[must_use]
    pub fn new(grid: TileGrid) -> Self {
        Self { grid }
    }

    /// Draw one freehand segment (pen, brush or eraser) between two world points.
    ///
    /// The width is given in screen pixels and divided by `zoom`. The eraser
    /// clears a band twice as wide and only visits tiles that already exist.
    /// Returns the keys of the tiles that were drawn on.
    pub fn draw_stroke(
        &self,
        store: &mut TileStore,
        brush: &BrushState,
        zoom: f32,
        start: Point,
        end: Point,
    ) -> Vec<TileKey> {
        let erasing = brush.tool == Tool::Eraser;
        let width = if erasing {
            brush.size() * 2.0 / zoom
        } else {
            brush.size() / zoom
        };
        let paint = if erasing {
            eraser_paint()
        } else {
            color_paint(brush.color, brush.opacity())
        };

        let Some(mark) = StrokeMark::segment(start, end, width) else {
            tracing::warn!("Skipping stroke with non-finite geometry");
            return Vec::new();
        };
        let bbox = Rect::from_points(start, end);
        self.paint_into_tiles(store, &mark, &paint, &bbox, width, !erasing)
    }

    /// Draw a finished shape into every tile it overlaps.
    ///
    /// The width is the raw brush size in world pixels.
    pub fn commit_shape(
        &self,
        store: &mut TileStore,
        kind: ShapeKind,
        brush: &BrushState,
        start: Point,
        end: Point,
    ) -> Vec<TileKey> {
        let width = brush.size();
        let Some(mark) = StrokeMark::shape(kind, start, end, width) else {
            tracing::warn!("Skipping {kind:?} with non-finite geometry");
            return Vec::new();
        };
        let paint = color_paint(brush.color, brush.opacity());
        let bbox = Rect::from_points(start, end);
        let touched = self.paint_into_tiles(store, &mark, &paint, &bbox, width, true);
        tracing::debug!("Committed {kind:?} into {} tiles", touched.len());
        touched
    }

    fn paint_into_tiles(
        &self,
        store: &mut TileStore,
        mark: &StrokeMark,
        paint: &Paint<'_>,
        bbox: &Rect,
        width: f32,
        create: bool,
    ) -> Vec<TileKey> {
        let reach = bbox.inflate(width / 2.0);
        let candidates = self.grid.range_for(&reach).expand(1);

        let mut touched = Vec::new();
        for key in candidates.iter() {
            if !self.grid.padded_bounds(key).intersects(&reach) {
                continue;
            }
            let tile = if create {
                Some(store.get_tile(key))
            } else {
                store.get_mut(key)
            };
            let Some(tile) = tile else {
                continue;
            };

            let origin = self.grid.buffer_origin(key);
            let transform = Transform::from_translate(-origin.x, -origin.y);
            mark.paint(tile.pixmap_mut(), paint, transform);
            touched.push(key);
        }
        touched
    }
}

/// Screen-sized scratch buffer holding the shape being dragged.
#[derive(Debug, Clone)]
pub struct ShapePreview {
    pixmap: Pixmap,
    active: bool,
}

impl ShapePreview {
    /// Create a transparent preview buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            pixmap: scratch_pixmap(width, height)?,
            active: false,
        })
    }

    /// Reallocate the buffer for a new widget size. Drops any pending preview.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.pixmap = scratch_pixmap(width, height)?;
        self.active = false;
        Ok(())
    }

    /// Redraw the preview of a shape spanning `start..end` (world space).
    pub fn draw(
        &mut self,
        kind: ShapeKind,
        brush: &BrushState,
        start: Point,
        end: Point,
        view: &ViewTransform,
    ) {
        self.clear();
        let Some(mark) = StrokeMark::shape(kind, start, end, brush.size()) else {
            return;
        };
        let zoom = view.zoom();
        let pan = view.pan();
        let transform = Transform::from_row(zoom, 0.0, 0.0, zoom, pan.x * zoom, pan.y * zoom);
        mark.paint(
            &mut self.pixmap,
            &color_paint(brush.color, brush.opacity()),
            transform,
        );
        self.active = true;
    }

    /// Make the buffer transparent again.
    pub fn clear(&mut self) {
        if self.active {
            self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
        self.active = false;
    }

    /// Whether a shape is currently being previewed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The scratch buffer in screen space.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

fn scratch_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width.max(1), height.max(1)).ok_or_else(|| {
        RenderError::Export(format!("cannot allocate {width}x{height} preview buffer"))
    })
}

/// World-space geometry ready to paint: a stroked outline or a filled dot.
enum StrokeMark {
    Outline { path: Path, stroke: Stroke },
    Dot(Path),
}

impl StrokeMark {
    fn segment(start: Point, end: Point, width: f32) -> Option<Self> {
        if start.distance(end) < MIN_SEGMENT_LENGTH {
            let path = PathBuilder::from_circle(start.x, start.y, (width / 2.0).max(0.5))?;
            return Some(Self::Dot(path));
        }
        let mut pb = PathBuilder::new();
        pb.move_to(start.x, start.y);
        pb.line_to(end.x, end.y);
        Some(Self::Outline {
            path: pb.finish()?,
            stroke: round_stroke(width),
        })
    }

    fn shape(kind: ShapeKind, start: Point, end: Point, width: f32) -> Option<Self> {
        let bounds = NonZeroRect::from_ltrb(
            start.x.min(end.x),
            start.y.min(end.y),
            start.x.max(end.x),
            start.y.max(end.y),
        );
        let path = match (kind, bounds) {
            (ShapeKind::Rectangle, Some(rect)) => PathBuilder::from_rect(rect.to_rect()),
            (ShapeKind::Circle, Some(rect)) => PathBuilder::from_oval(rect.to_rect())?,
            // Lines, and rectangles or ellipses collapsed to zero area.
            _ => return Self::segment(start, end, width),
        };
        Some(Self::Outline {
            path,
            stroke: round_stroke(width),
        })
    }

    fn paint(&self, pixmap: &mut Pixmap, paint: &Paint<'_>, transform: Transform) {
        match self {
            Self::Outline { path, stroke } => {
                pixmap.stroke_path(path, paint, stroke, transform, None);
            }
            Self::Dot(path) => {
                pixmap.fill_path(path, paint, FillRule::Winding, transform, None);
            }
        }
    }
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn color_paint(color: Color, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint.anti_alias = true;
    paint
}

fn eraser_paint() -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.blend_mode = BlendMode::Clear;
    paint.anti_alias = true;
    paint
}

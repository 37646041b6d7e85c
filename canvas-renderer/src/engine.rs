//! The canvas engine: the single entry point a UI or script talks to.
//!
//! The engine owns every piece of canvas state and routes input through one
//! explicit interaction state:
//!
//! ```text
//!            left down (pen/brush/eraser)        left up
//!   Idle ──────────────────────────────► Stroking ──────► Idle
//!    │  left down (rectangle/circle/line)          left up (commit)
//!    ├──────────────────────────────────► ShapeDrag ─────► Idle
//!    │  middle down                                middle up
//!    ├──────────────────────────────────► Panning ───────► Idle
//!    │  left down on text item/handle (text/select)  left up
//!    └──────────────────────────────────► Annotating ────► Idle
//! ```

use std::collections::HashSet;
use std::path::Path;

use canvas_core::{
    brush_size_from_slider, BrushState, CanvasConfig, Color, Command, FontDescriptor, Modifiers,
    Point, PointerButton, PointerEvent, ShapeKind, Size, TextId, TileGrid, TileKey, TileRange, Tool,
    ViewTransform, Viewport, ViewportCuller, ZoomDirection,
};
use image::RgbaImage;
use tiny_skia::Pixmap;

use crate::annotation::{AnnotationLayer, PressOutcome, TextPrompt};
use crate::compositor::Compositor;
use crate::error::{RenderError, RenderResult};
use crate::raster::{Rasterizer, ShapePreview};
use crate::serializer::Serializer;
use crate::text::FontBook;
use crate::tile_store::{EvictionPolicy, TileStore};

/// Callback receiving the new zoom level in percent.
pub type ZoomObserver = Box<dyn FnMut(u32)>;

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum Interaction {
    /// No button held.
    #[default]
    Idle,
    /// Freehand drawing; `last` is the previous world point.
    Stroking { last: Point },
    /// Dragging out a shape between two world points.
    ShapeDrag {
        kind: ShapeKind,
        start: Point,
        current: Point,
    },
    /// Middle-button pan; `last_screen` is the previous screen point.
    Panning { last_screen: Point },
    /// A text item gesture is in progress.
    Annotating { id: TextId },
}

impl Interaction {
    fn button(self) -> Option<PointerButton> {
        match self {
            Self::Idle => None,
            Self::Panning { .. } => Some(PointerButton::Middle),
            Self::Stroking { .. } | Self::ShapeDrag { .. } | Self::Annotating { .. } => {
                Some(PointerButton::Left)
            }
        }
    }
}

/// Infinite tiled canvas with pan, zoom, drawing and text annotations.
pub struct CanvasEngine {
    config: CanvasConfig,
    grid: TileGrid,
    view: ViewTransform,
    screen: Size,
    brush: BrushState,
    store: TileStore,
    culler: ViewportCuller,
    rasterizer: Rasterizer,
    preview: ShapePreview,
    annotations: AnnotationLayer,
    fonts: FontBook,
    serializer: Serializer,
    compositor: Compositor,
    prompt: Option<Box<dyn TextPrompt>>,
    zoom_observers: Vec<ZoomObserver>,
    interaction: Interaction,
}

impl CanvasEngine {
    /// Create an engine for a widget of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or buffers cannot be
    /// allocated.
    pub fn new(config: CanvasConfig, screen: Size) -> RenderResult<Self> {
        config.validate()?;
        let grid = config.grid();
        let store = TileStore::new(grid, EvictionPolicy::from(&config))?;
        let (width, height) = pixel_size(screen);

        let mut engine = Self {
            grid,
            view: ViewTransform::new(config.min_zoom, config.max_zoom),
            screen,
            brush: BrushState::default(),
            store,
            culler: ViewportCuller::new(grid),
            rasterizer: Rasterizer::new(grid),
            preview: ShapePreview::new(width, height)?,
            annotations: AnnotationLayer::new(grid, config.handle_radius_px),
            fonts: FontBook::new(),
            serializer: Serializer::new(config.load_batch),
            compositor: Compositor::default(),
            prompt: None,
            zoom_observers: Vec::new(),
            interaction: Interaction::Idle,
            config,
        };
        engine.store.set_zoom(engine.view.zoom());
        engine.refresh_protected();

        tracing::info!(
            "Canvas engine ready: {width}x{height} view, {}px tiles, capacity {}",
            grid.tile_size,
            engine.store.capacity()
        );
        Ok(engine)
    }

    /// Create an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if buffers cannot be allocated.
    pub fn with_defaults(screen: Size) -> RenderResult<Self> {
        Self::new(CanvasConfig::default(), screen)
    }

    // ------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Current brush settings.
    #[must_use]
    pub fn brush(&self) -> &BrushState {
        &self.brush
    }

    /// Current pan and zoom.
    #[must_use]
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Widget size in screen pixels.
    #[must_use]
    pub fn screen_size(&self) -> Size {
        self.screen
    }

    /// World-space rectangle on screen.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::from_transform(self.screen, &self.view)
    }

    /// Tile window kept resident for the current view.
    #[must_use]
    pub fn visible_range(&self) -> TileRange {
        self.culler.visible_tiles(&self.viewport(), self.view.zoom())
    }

    /// Tile store.
    #[must_use]
    pub fn store(&self) -> &TileStore {
        &self.store
    }

    /// Text annotations.
    #[must_use]
    pub fn annotations(&self) -> &AnnotationLayer {
        &self.annotations
    }

    /// Registered fonts.
    #[must_use]
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Current pointer interaction.
    #[must_use]
    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Zoom level in percent.
    #[must_use]
    pub fn zoom_percent(&self) -> u32 {
        self.view.zoom_percent()
    }

    // ------------------------------------------------------------------
    // Tool and brush settings
    // ------------------------------------------------------------------

    /// Select the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        if !tool.is_annotation() {
            self.annotations.deselect_all();
        }
        self.brush.tool = tool;
        tracing::debug!("Tool set to {tool}");
    }

    /// Set the brush size in screen pixels (at least 1).
    pub fn set_brush_size(&mut self, size: f32) {
        self.brush.set_size(size);
    }

    /// Set the brush size from a 0-100 slider position.
    pub fn set_brush_size_from_slider(&mut self, position: u32) {
        self.brush.set_size(brush_size_from_slider(position));
    }

    /// Set the brush color.
    pub fn set_brush_color(&mut self, color: Color) {
        self.brush.color = color;
    }

    /// Set the brush opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.brush.set_opacity(opacity);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Pointer pressed. Left uses the active tool, middle starts a pan.
    pub fn handle_pointer_down(&mut self, event: PointerEvent) {
        match event.button {
            PointerButton::Middle => {
                self.interaction = Interaction::Panning {
                    last_screen: event.position,
                };
            }
            PointerButton::Left => self.begin_tool(event.position),
            PointerButton::Right => {}
        }
    }

    /// Pointer moved.
    pub fn handle_pointer_move(&mut self, event: PointerEvent) {
        let world = self.view.screen_to_world(event.position);
        match self.interaction {
            Interaction::Idle => {}
            Interaction::Stroking { last } => {
                self.rasterizer
                    .draw_stroke(&mut self.store, &self.brush, self.view.zoom(), last, world);
                self.interaction = Interaction::Stroking { last: world };
            }
            Interaction::ShapeDrag { kind, start, .. } => {
                self.preview.draw(kind, &self.brush, start, world, &self.view);
                self.interaction = Interaction::ShapeDrag {
                    kind,
                    start,
                    current: world,
                };
            }
            Interaction::Panning { last_screen } => {
                self.view.pan_by(event.position - last_screen);
                self.interaction = Interaction::Panning {
                    last_screen: event.position,
                };
                self.refresh_protected();
            }
            Interaction::Annotating { .. } => {
                self.annotations.pointer_move(world);
            }
        }
    }

    /// Pointer released. Ends the interaction started by the same button.
    pub fn handle_pointer_up(&mut self, event: PointerEvent) {
        if self.interaction.button() != Some(event.button) {
            return;
        }
        let world = self.view.screen_to_world(event.position);
        match std::mem::take(&mut self.interaction) {
            Interaction::ShapeDrag { kind, start, .. } => {
                self.rasterizer
                    .commit_shape(&mut self.store, kind, &self.brush, start, world);
                self.preview.clear();
            }
            Interaction::Annotating { .. } => self.annotations.pointer_up(),
            Interaction::Idle | Interaction::Stroking { .. } | Interaction::Panning { .. } => {}
        }
    }

    /// Wheel tick. Zooms around the pointer only while Ctrl is held.
    ///
    /// Returns `true` if the zoom level changed.
    pub fn handle_wheel(&mut self, position: Point, delta: f32, modifiers: Modifiers) -> bool {
        if !modifiers.ctrl {
            return false;
        }
        let Some(direction) = ZoomDirection::from_delta(delta) else {
            return false;
        };
        if self.view.wheel_step(position, direction) {
            self.zoom_changed();
            true
        } else {
            false
        }
    }

    /// Zoom to an absolute level keeping `anchor` (screen space) fixed.
    ///
    /// Returns `true` if the zoom level changed.
    pub fn zoom_to(&mut self, anchor: Point, zoom: f32) -> bool {
        if self.view.zoom_at(anchor, zoom) {
            self.zoom_changed();
            true
        } else {
            false
        }
    }

    /// Widget resized.
    ///
    /// # Errors
    ///
    /// Returns an error if the preview buffer cannot be reallocated.
    pub fn handle_resize(&mut self, size: Size) -> RenderResult<()> {
        let (width, height) = pixel_size(size);
        self.preview.resize(width, height)?;
        self.screen = size;
        if let Interaction::ShapeDrag { .. } = self.interaction {
            self.interaction = Interaction::Idle;
        }
        self.refresh_protected();
        tracing::debug!("Resized to {width}x{height}");
        Ok(())
    }

    /// Register a callback notified with the zoom percent after every zoom change.
    pub fn on_zoom_changed(&mut self, observer: impl FnMut(u32) + 'static) {
        self.zoom_observers.push(Box::new(observer));
    }

    // ------------------------------------------------------------------
    // Text annotations
    // ------------------------------------------------------------------

    /// Install the collaborator asked for text when the text tool clicks empty canvas.
    pub fn set_text_prompt(&mut self, prompt: Box<dyn TextPrompt>) {
        self.prompt = Some(prompt);
    }

    /// Register font data for a family name.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a parsable font.
    pub fn register_font(&mut self, family: impl Into<String>, data: Vec<u8>) -> RenderResult<()> {
        self.fonts.register(family, data)
    }

    /// Add a selected text item centered on a world position, in the brush color.
    pub fn add_text(&mut self, at: Point, text: impl Into<String>, font: FontDescriptor) -> TextId {
        self.annotations
            .add(text, at, font, self.brush.color, &self.fonts)
    }

    /// Remove a text item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist.
    pub fn remove_text(&mut self, id: TextId) -> RenderResult<()> {
        self.annotations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| canvas_core::CanvasError::TextNotFound(id.to_string()).into())
    }

    // ------------------------------------------------------------------
    // Canvas lifecycle
    // ------------------------------------------------------------------

    /// Drop every tile and annotation.
    pub fn clear(&mut self) {
        self.store.clear();
        self.annotations.clear();
        self.preview.clear();
        self.interaction = Interaction::Idle;
        tracing::info!("Canvas cleared");
    }

    /// Save the canvas to `path`. Returns `false` and logs on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.save_to(path) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to save canvas to {}: {e}", path.display());
                false
            }
        }
    }

    /// Save the canvas to `path`, returning the image dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is empty or encoding/IO fails.
    pub fn save_to(&self, path: &Path) -> RenderResult<(u32, u32)> {
        self.serializer.save(&self.store, path)
    }

    /// Compose the canvas into an image without writing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is empty.
    pub fn compose(&self) -> RenderResult<RgbaImage> {
        self.serializer.compose(&self.store)
    }

    /// Replace the canvas with an image file. Returns `false` and logs on failure.
    ///
    /// A file that cannot be decoded leaves the canvas untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.load_from(path) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to load {}: {e}", path.display());
                false
            }
        }
    }

    /// Replace the canvas with an image file, returning the number of tiles written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded.
    pub fn load_from(&mut self, path: &Path) -> RenderResult<usize> {
        let image = Serializer::decode(path)?;
        self.load_image(&image)
    }

    /// Replace the canvas with decoded pixels, returning the number of tiles written.
    ///
    /// # Errors
    ///
    /// Returns an error if the image has no pixels. The canvas is left cleared.
    pub fn load_image(&mut self, image: &RgbaImage) -> RenderResult<usize> {
        self.interaction = Interaction::Idle;
        self.preview.clear();
        let visible = self.visible_range().to_set();
        self.serializer
            .load_image(&mut self.store, image, &visible)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the current view into a new screen-sized pixmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be allocated.
    pub fn render(&mut self) -> RenderResult<Pixmap> {
        let (width, height) = pixel_size(self.screen);
        let mut target = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Export(format!("cannot allocate {width}x{height} frame")))?;
        self.render_into(&mut target);
        Ok(target)
    }

    /// Render the current view into an existing pixmap.
    pub fn render_into(&mut self, target: &mut Pixmap) {
        let range = self.visible_range();
        self.compositor.clear(target);
        self.compositor
            .draw_tiles(target, &mut self.store, &self.view, &range);
        if self.preview.is_active() {
            self.compositor.overlay(target, self.preview.pixmap());
        }
        if !self.annotations.is_empty() {
            self.annotations
                .render(target, &self.view, &range.to_set(), &self.fonts);
        }
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// Apply one scripted command.
    ///
    /// # Errors
    ///
    /// Returns an error from resize, save or load commands.
    pub fn apply(&mut self, command: Command) -> RenderResult<()> {
        match command {
            Command::SetTool { tool } => self.set_tool(tool),
            Command::SetBrushSize { size } => self.set_brush_size(size),
            Command::SetBrushColor { color } => self.set_brush_color(color),
            Command::SetOpacity { opacity } => self.set_opacity(opacity),
            Command::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.handle_pointer_down(PointerEvent {
                position: Point::new(x, y),
                button,
                modifiers,
            }),
            Command::PointerMove {
                x,
                y,
                button,
                modifiers,
            } => self.handle_pointer_move(PointerEvent {
                position: Point::new(x, y),
                button,
                modifiers,
            }),
            Command::PointerUp {
                x,
                y,
                button,
                modifiers,
            } => self.handle_pointer_up(PointerEvent {
                position: Point::new(x, y),
                button,
                modifiers,
            }),
            Command::Wheel {
                x,
                y,
                delta,
                modifiers,
            } => {
                self.handle_wheel(Point::new(x, y), delta, modifiers);
            }
            Command::Resize { width, height } => self.handle_resize(Size::new(width, height))?,
            Command::AddText { x, y, text, font } => {
                self.add_text(Point::new(x, y), text, font);
            }
            Command::Clear => self.clear(),
            Command::Save { path } => {
                self.save_to(Path::new(&path))?;
            }
            Command::Load { path } => {
                self.load_from(Path::new(&path))?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn begin_tool(&mut self, screen: Point) {
        let world = self.view.screen_to_world(screen);
        let tool = self.brush.tool;

        if tool.is_freehand() {
            self.interaction = Interaction::Stroking { last: world };
        } else if let Some(kind) = tool.shape() {
            self.preview.clear();
            self.interaction = Interaction::ShapeDrag {
                kind,
                start: world,
                current: world,
            };
        } else if tool.is_annotation() {
            match self.annotations.pointer_down(world, self.view.zoom()) {
                PressOutcome::Gesture(id, _) => {
                    self.interaction = Interaction::Annotating { id };
                }
                PressOutcome::Miss if tool == Tool::Text => self.prompt_for_text(world),
                PressOutcome::Miss => {}
            }
        }
    }

    fn prompt_for_text(&mut self, world: Point) {
        let Some(prompt) = self.prompt.as_mut() else {
            tracing::debug!("Text tool clicked with no text prompt installed");
            return;
        };
        if let Some((text, font)) = prompt.request_text(world) {
            if !text.is_empty() {
                self.add_text(world, text, font);
            }
        }
    }

    fn visible_keys(&self) -> HashSet<TileKey> {
        self.visible_range().to_set()
    }

    fn refresh_protected(&mut self) {
        let visible = self.visible_keys();
        self.store.set_protected(visible);
    }

    fn zoom_changed(&mut self) {
        let zoom = self.view.zoom();
        self.store.set_zoom(zoom);
        let visible = self.visible_keys();
        let evicted = self.store.evict_if_over_capacity(&visible);
        self.store.set_protected(visible);

        let percent = self.view.zoom_percent();
        tracing::debug!("Zoom {percent}% ({evicted} tiles evicted)");
        for observer in &mut self.zoom_observers {
            observer(percent);
        }
    }
}

impl std::fmt::Debug for CanvasEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasEngine")
            .field("screen", &self.screen)
            .field("view", &self.view)
            .field("brush", &self.brush)
            .field("store", &self.store)
            .field("annotations", &self.annotations.len())
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}

/// Whole-pixel buffer size for a widget size, at least 1x1.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_size(size: Size) -> (u32, u32) {
    (
        size.width.max(1.0).ceil() as u32,
        size.height.max(1.0).ceil() as u32,
    )
}

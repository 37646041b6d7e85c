//! Text annotations: tile-indexed items with move, rotate and scale gestures.
//!
//! Items are vector data drawn over the tiles, never into them. Each item
//! is indexed by the tile under its anchor so the render pass only looks at
//! items whose tile is in the visible window.
//!
//! ```text
//!                  o   rotation handle
//!                  |
//!        +---------+---------+
//!        |       text        |   centered on the anchor,
//!        |         x         |   rotated, then scaled
//!        +-------------------o   scale handle
//! ```

use std::collections::{HashMap, HashSet};

use canvas_core::{
    CanvasError, CanvasResult, Color, FontDescriptor, Point, TextId, TileGrid, TileKey,
    ViewTransform,
};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::text::{FontBook, TextExtent};

/// Smallest scale a gesture can produce.
pub const MIN_TEXT_SCALE: f32 = 0.1;

/// Floor for the initial pointer distance of a scale gesture.
const MIN_GESTURE_DISTANCE: f32 = 1.0;

/// Distance of the rotation handle above the top edge, in screen pixels.
const ROTATION_HANDLE_OFFSET_PX: f32 = 20.0;

/// Drawn radius of a handle, in screen pixels.
const HANDLE_DRAW_RADIUS_PX: f32 = 5.0;

/// Frame and handle color.
const SELECTION_COLOR: Color = Color::rgb(0x0d, 0x6e, 0xfd);

/// Supplies content and font when the text tool clicks empty canvas.
pub trait TextPrompt {
    /// Ask for a new annotation at `world`. `None` cancels the creation.
    fn request_text(&mut self, world: Point) -> Option<(String, FontDescriptor)>;
}

/// Gesture state of one text item.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum TextGesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Moving the anchor; `last` is the previous pointer position.
    Dragging { last: Point },
    /// Turning around the anchor.
    Rotating {
        start_angle: f32,
        initial_rotation: f32,
    },
    /// Resizing relative to the anchor.
    Scaling {
        initial_distance: f32,
        initial_scale: f32,
    },
}

/// A text annotation.
#[derive(Debug, Clone)]
pub struct TextItem {
    id: TextId,
    text: String,
    anchor: Point,
    font: FontDescriptor,
    color: Color,
    extent: TextExtent,
    scale: f32,
    rotation: f32,
    selected: bool,
    gesture: TextGesture,
}

impl TextItem {
    fn new(
        text: String,
        anchor: Point,
        font: FontDescriptor,
        color: Color,
        extent: TextExtent,
    ) -> Self {
        Self {
            id: TextId::new(),
            text,
            anchor,
            font,
            color,
            extent,
            scale: 1.0,
            rotation: 0.0,
            selected: false,
            gesture: TextGesture::Idle,
        }
    }

    /// Unique ID.
    #[must_use]
    pub fn id(&self) -> TextId {
        self.id
    }

    /// Text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// World position of the text center.
    #[must_use]
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Font family and size.
    #[must_use]
    pub fn font(&self) -> &FontDescriptor {
        &self.font
    }

    /// Fill color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Unscaled size of the text block.
    #[must_use]
    pub fn extent(&self) -> TextExtent {
        self.extent
    }

    /// Scale factor.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Rotation in degrees, clockwise on screen.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Whether this is the selected item.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Current gesture state.
    #[must_use]
    pub fn gesture(&self) -> TextGesture {
        self.gesture
    }

    /// Map a point from item space (unrotated, unscaled, centered) to world space.
    #[must_use]
    pub fn to_world(&self, local: Point) -> Point {
        self.anchor + (local * self.scale).rotated(self.rotation)
    }

    /// World corners of the bounding box: top-left, top-right, bottom-right, bottom-left.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.extent.width / 2.0;
        let hh = self.extent.height / 2.0;
        [
            self.to_world(Point::new(-hw, -hh)),
            self.to_world(Point::new(hw, -hh)),
            self.to_world(Point::new(hw, hh)),
            self.to_world(Point::new(-hw, hh)),
        ]
    }

    /// Check whether a world point lies inside the rotated, scaled bounds.
    #[must_use]
    pub fn contains(&self, world: Point) -> bool {
        point_in_polygon(world, &self.corners())
    }

    /// World position of the rotation handle at a zoom level.
    #[must_use]
    pub fn rotation_handle(&self, zoom: f32) -> Point {
        let top = self.extent.height / 2.0 * self.scale + ROTATION_HANDLE_OFFSET_PX / zoom;
        self.anchor + Point::new(0.0, -top).rotated(self.rotation)
    }

    /// World position of the scale handle (bottom-right corner).
    #[must_use]
    pub fn scale_handle(&self) -> Point {
        self.corners()[2]
    }

    fn begin(&mut self, gesture: TextGesture) {
        self.gesture = gesture;
    }

    fn apply(&mut self, world: Point) -> bool {
        match self.gesture {
            TextGesture::Idle => false,
            TextGesture::Dragging { last } => {
                self.anchor += world - last;
                self.gesture = TextGesture::Dragging { last: world };
                true
            }
            TextGesture::Rotating {
                start_angle,
                initial_rotation,
            } => {
                let angle = (world - self.anchor).angle_degrees();
                self.rotation = initial_rotation + (angle - start_angle);
                true
            }
            TextGesture::Scaling {
                initial_distance,
                initial_scale,
            } => {
                let distance = world.distance(self.anchor);
                self.scale = (initial_scale * (distance / initial_distance)).max(MIN_TEXT_SCALE);
                true
            }
        }
    }
}

/// What a pointer press did on the annotation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressOutcome {
    /// A gesture started on an item.
    Gesture(TextId, TextGesture),
    /// Nothing was hit; the selection was cleared.
    Miss,
}

/// Owner of every text annotation.
#[derive(Debug, Clone)]
pub struct AnnotationLayer {
    grid: TileGrid,
    handle_radius_px: f32,
    items: HashMap<TextId, TextItem>,
    index: HashMap<TileKey, Vec<TextId>>,
    order: Vec<TextId>,
    active: Option<TextId>,
}

impl AnnotationLayer {
    /// Create an empty layer.
    #[must_use]
    pub fn new(grid: TileGrid, handle_radius_px: f32) -> Self {
        Self {
            grid,
            handle_radius_px,
            items: HashMap::new(),
            index: HashMap::new(),
            order: Vec::new(),
            active: None,
        }
    }

    /// Add a selected text item centered on `anchor`.
    pub fn add(
        &mut self,
        text: impl Into<String>,
        anchor: Point,
        font: FontDescriptor,
        color: Color,
        fonts: &FontBook,
    ) -> TextId {
        let text = text.into();
        let extent = fonts.measure(&text, &font);
        let item = TextItem::new(text, anchor, font, color, extent);
        let id = item.id;

        let key = self.grid.world_to_tile(anchor);
        self.index.entry(key).or_default().push(id);
        self.items.insert(id, item);
        self.order.push(id);
        self.select(id);

        tracing::debug!("Added text {id} at ({:.1}, {:.1}) in tile {key}", anchor.x, anchor.y);
        id
    }

    /// Remove an item.
    pub fn remove(&mut self, id: TextId) -> Option<TextItem> {
        let item = self.items.remove(&id)?;
        let key = self.grid.world_to_tile(item.anchor);
        self.unindex(key, id);
        self.order.retain(|other| *other != id);
        if self.active == Some(id) {
            self.active = None;
        }
        Some(item)
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
        self.order.clear();
        self.active = None;
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: TextId) -> Option<&TextItem> {
        self.items.get(&id)
    }

    /// Items in creation (paint) order.
    pub fn iter(&self) -> impl Iterator<Item = &TextItem> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the layer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The selected item, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&TextItem> {
        self.iter().find(|item| item.selected)
    }

    /// Item IDs anchored in a tile.
    #[must_use]
    pub fn items_in_tile(&self, key: TileKey) -> &[TextId] {
        self.index.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Select one item and deselect every other.
    pub fn select(&mut self, id: TextId) {
        for item in self.items.values_mut() {
            item.selected = item.id == id;
        }
    }

    /// Deselect every item.
    pub fn deselect_all(&mut self) {
        for item in self.items.values_mut() {
            item.selected = false;
        }
    }

    /// Set an item's rotation in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist.
    pub fn set_rotation(&mut self, id: TextId, degrees: f32) -> CanvasResult<()> {
        self.item_mut(id)?.rotation = degrees;
        Ok(())
    }

    /// Set an item's scale, floored at [`MIN_TEXT_SCALE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist.
    pub fn set_scale(&mut self, id: TextId, scale: f32) -> CanvasResult<()> {
        self.item_mut(id)?.scale = scale.max(MIN_TEXT_SCALE);
        Ok(())
    }

    /// Topmost item containing a world point.
    #[must_use]
    pub fn item_at(&self, world: Point) -> Option<TextId> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.items.get(id))
            .find(|item| item.contains(world))
            .map(|item| item.id)
    }

    /// Check whether a world point hits a specific item.
    #[must_use]
    pub fn is_point_in_text(&self, id: TextId, world: Point) -> bool {
        self.items.get(&id).is_some_and(|item| item.contains(world))
    }

    /// Start a gesture at a world point.
    ///
    /// Handles of the selected item win over item bodies; a press on empty
    /// canvas deselects everything.
    pub fn pointer_down(&mut self, world: Point, zoom: f32) -> PressOutcome {
        let tolerance = self.handle_radius_px / zoom;

        let on_handle = self.selected().and_then(|item| {
            if world.distance(item.rotation_handle(zoom)) <= tolerance {
                let start_angle = (world - item.anchor).angle_degrees();
                Some((
                    item.id,
                    TextGesture::Rotating {
                        start_angle,
                        initial_rotation: item.rotation,
                    },
                ))
            } else if world.distance(item.scale_handle()) <= tolerance {
                Some((
                    item.id,
                    TextGesture::Scaling {
                        initial_distance: world.distance(item.anchor).max(MIN_GESTURE_DISTANCE),
                        initial_scale: item.scale,
                    },
                ))
            } else {
                None
            }
        });

        let hit = on_handle.or_else(|| {
            self.item_at(world)
                .map(|id| (id, TextGesture::Dragging { last: world }))
        });

        match hit {
            Some((id, gesture)) => {
                self.select(id);
                if let Some(item) = self.items.get_mut(&id) {
                    item.begin(gesture);
                }
                self.active = Some(id);
                tracing::trace!("Text {id} gesture {gesture:?}");
                PressOutcome::Gesture(id, gesture)
            }
            None => {
                self.deselect_all();
                self.active = None;
                PressOutcome::Miss
            }
        }
    }

    /// Feed a pointer move into the active gesture. Returns `true` if an item changed.
    pub fn pointer_move(&mut self, world: Point) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };

        let old_key = self.grid.world_to_tile(item.anchor);
        let changed = item.apply(world);
        let new_key = self.grid.world_to_tile(item.anchor);

        if old_key != new_key {
            self.unindex(old_key, id);
            self.index.entry(new_key).or_default().push(id);
        }
        changed
    }

    /// End the active gesture.
    pub fn pointer_up(&mut self) {
        if let Some(id) = self.active.take() {
            if let Some(item) = self.items.get_mut(&id) {
                item.begin(TextGesture::Idle);
            }
        }
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Draw every item anchored in a visible tile onto a screen-space pixmap.
    pub fn render(
        &self,
        pixmap: &mut Pixmap,
        view: &ViewTransform,
        visible: &HashSet<TileKey>,
        fonts: &FontBook,
    ) {
        let shown: HashSet<TextId> = self
            .index
            .iter()
            .filter(|(key, _)| visible.contains(key))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        if shown.is_empty() {
            return;
        }

        let zoom = view.zoom();
        let pan = view.pan();
        let screen = Transform::from_row(zoom, 0.0, 0.0, zoom, pan.x * zoom, pan.y * zoom);

        for item in self.iter().filter(|item| shown.contains(&item.id)) {
            let local = screen
                .pre_translate(item.anchor.x, item.anchor.y)
                .pre_concat(Transform::from_rotate(item.rotation))
                .pre_scale(item.scale, item.scale);

            if let Some(path) = fonts.outline(&item.text, &item.font) {
                let mut paint = Paint::default();
                paint.set_color_rgba8(item.color.r, item.color.g, item.color.b, 255);
                paint.anti_alias = true;
                pixmap.fill_path(&path, &paint, FillRule::Winding, local, None);
            }
            if item.selected {
                draw_selection(pixmap, item, view);
            }
        }
        tracing::trace!("Rendered {} text items", shown.len());
    }

    fn item_mut(&mut self, id: TextId) -> CanvasResult<&mut TextItem> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| CanvasError::TextNotFound(id.to_string()))
    }

    fn unindex(&mut self, key: TileKey, id: TextId) {
        if let Some(ids) = self.index.get_mut(&key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.index.remove(&key);
            }
        }
    }
}

fn draw_selection(pixmap: &mut Pixmap, item: &TextItem, view: &ViewTransform) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(SELECTION_COLOR.r, SELECTION_COLOR.g, SELECTION_COLOR.b, 255);
    paint.anti_alias = true;
    let hairline = Stroke {
        width: 0.0,
        ..Stroke::default()
    };

    let corners = item.corners().map(|p| view.world_to_screen(p));
    let top_mid = view.world_to_screen(item.to_world(Point::new(0.0, -item.extent.height / 2.0)));
    let rotate = view.world_to_screen(item.rotation_handle(view.zoom()));
    let scale = view.world_to_screen(item.scale_handle());

    let mut pb = PathBuilder::new();
    pb.move_to(corners[0].x, corners[0].y);
    for corner in &corners[1..] {
        pb.line_to(corner.x, corner.y);
    }
    pb.close();
    pb.move_to(top_mid.x, top_mid.y);
    pb.line_to(rotate.x, rotate.y);
    if let Some(frame) = pb.finish() {
        pixmap.stroke_path(&frame, &paint, &hairline, Transform::identity(), None);
    }

    for handle in [rotate, scale] {
        if let Some(dot) = PathBuilder::from_circle(handle.x, handle.y, HANDLE_DRAW_RADIUS_PX) {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Even-odd crossing test.
fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> AnnotationLayer {
        AnnotationLayer::new(TileGrid::new(256, 2), 10.0)
    }

    /// Fallback metrics: "Hello" at 20 px is 60 x 24.
    fn add_hello(layer: &mut AnnotationLayer, at: Point) -> TextId {
        layer.add(
            "Hello",
            at,
            FontDescriptor::new("unregistered", 20.0),
            Color::BLACK,
            &FontBook::new(),
        )
    }

    // ===========================================
    // Items and selection
    // ===========================================

    #[test]
    fn test_add_selects_new_item_only() {
        let mut layer = layer();
        let first = add_hello(&mut layer, Point::new(100.0, 100.0));
        let second = add_hello(&mut layer, Point::new(400.0, 100.0));

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.selected().map(TextItem::id), Some(second));
        assert!(!layer.get(first).is_some_and(TextItem::is_selected));
        assert_eq!(layer.items_in_tile(TileKey::new(0, 0)), &[first]);
        assert_eq!(layer.items_in_tile(TileKey::new(1, 0)), &[second]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(10.0, 10.0));
        add_hello(&mut layer, Point::new(20.0, 20.0));

        assert!(layer.remove(id).is_some());
        assert!(layer.remove(id).is_none());
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.items_in_tile(TileKey::new(0, 0)).len(), 1);

        layer.clear();
        assert!(layer.is_empty());
        assert!(layer.items_in_tile(TileKey::new(0, 0)).is_empty());
    }

    #[test]
    fn test_setters_report_missing_item() {
        let mut layer = layer();
        let result = layer.set_rotation(TextId::new(), 45.0);
        assert!(matches!(result, Err(CanvasError::TextNotFound(_))));
    }

    // ===========================================
    // Hit testing
    // ===========================================

    #[test]
    fn test_hit_test_axis_aligned() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));
        assert!(layer.is_point_in_text(id, Point::new(100.0, 100.0)));
        assert!(layer.is_point_in_text(id, Point::new(125.0, 108.0)));
        assert!(!layer.is_point_in_text(id, Point::new(135.0, 100.0)));
        assert!(!layer.is_point_in_text(id, Point::new(100.0, 115.0)));
    }

    #[test]
    fn test_hit_test_rotated_and_scaled() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));
        layer.set_rotation(id, 90.0).expect("item");
        layer.set_scale(id, 2.0).expect("item");

        // Box is now 48 wide and 120 tall.
        assert!(layer.is_point_in_text(id, Point::new(100.0, 155.0)));
        assert!(!layer.is_point_in_text(id, Point::new(155.0, 100.0)));
    }

    #[test]
    fn test_full_turn_restores_geometry() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(50.0, 60.0));
        let before = layer.get(id).expect("item").corners();
        layer.set_rotation(id, 360.0).expect("item");
        let after = layer.get(id).expect("item").corners();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(a.approx_eq(*b, 1e-3));
        }
    }

    #[test]
    fn test_topmost_item_wins() {
        let mut layer = layer();
        add_hello(&mut layer, Point::new(100.0, 100.0));
        let top = add_hello(&mut layer, Point::new(110.0, 100.0));
        assert_eq!(layer.item_at(Point::new(105.0, 100.0)), Some(top));
    }

    // ===========================================
    // Gestures
    // ===========================================

    #[test]
    fn test_drag_moves_anchor_only() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));

        let outcome = layer.pointer_down(Point::new(100.0, 100.0), 1.0);
        assert!(matches!(
            outcome,
            PressOutcome::Gesture(hit, TextGesture::Dragging { .. }) if hit == id
        ));
        layer.pointer_move(Point::new(130.0, 110.0));
        layer.pointer_move(Point::new(150.0, 120.0));
        layer.pointer_up();

        let item = layer.get(id).expect("item");
        assert!(item.anchor().approx_eq(Point::new(150.0, 120.0), 1e-4));
        assert!(item.rotation().abs() < f32::EPSILON);
        assert!((item.scale() - 1.0).abs() < f32::EPSILON);
        assert_eq!(item.gesture(), TextGesture::Idle);
        assert!(!layer.is_active());
    }

    #[test]
    fn test_drag_across_seam_reindexes() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(240.0, 100.0));
        layer.pointer_down(Point::new(240.0, 100.0), 1.0);
        layer.pointer_move(Point::new(300.0, 100.0));
        layer.pointer_up();

        assert!(layer.items_in_tile(TileKey::new(0, 0)).is_empty());
        assert_eq!(layer.items_in_tile(TileKey::new(1, 0)), &[id]);
    }

    #[test]
    fn test_rotation_handle_gesture() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));
        let handle = layer.get(id).expect("item").rotation_handle(1.0);
        assert!(handle.approx_eq(Point::new(100.0, 68.0), 1e-4));

        let outcome = layer.pointer_down(handle, 1.0);
        assert!(matches!(
            outcome,
            PressOutcome::Gesture(_, TextGesture::Rotating { .. })
        ));
        // Pointer swings from straight above to the right of the anchor.
        layer.pointer_move(Point::new(140.0, 100.0));
        layer.pointer_up();

        assert!((layer.get(id).expect("item").rotation() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_scale_handle_gesture() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));
        let handle = layer.get(id).expect("item").scale_handle();
        assert!(handle.approx_eq(Point::new(130.0, 112.0), 1e-4));

        layer.pointer_down(handle, 1.0);
        layer.pointer_move(Point::new(160.0, 124.0));
        assert!((layer.get(id).expect("item").scale() - 2.0).abs() < 1e-3);

        // Collapsing onto the anchor clamps instead of reaching zero.
        layer.pointer_move(Point::new(100.0, 100.0));
        assert!((layer.get(id).expect("item").scale() - MIN_TEXT_SCALE).abs() < 1e-6);
        layer.pointer_up();
    }

    #[test]
    fn test_handles_only_on_selected_item() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));
        layer.deselect_all();
        let handle = layer.get(id).expect("item").rotation_handle(1.0);
        assert_eq!(layer.pointer_down(handle, 1.0), PressOutcome::Miss);
    }

    #[test]
    fn test_handle_tolerance_is_constant_on_screen() {
        let mut layer = layer();
        let id = add_hello(&mut layer, Point::new(100.0, 100.0));

        // 7 world units off the handle: 7 px at 1x, 14 px at 2x.
        let near = layer.get(id).expect("item").rotation_handle(1.0) + Point::new(7.0, 0.0);
        assert!(matches!(
            layer.pointer_down(near, 1.0),
            PressOutcome::Gesture(_, TextGesture::Rotating { .. })
        ));
        layer.pointer_up();

        let far = layer.get(id).expect("item").rotation_handle(2.0) + Point::new(7.0, 0.0);
        assert!(!matches!(
            layer.pointer_down(far, 2.0),
            PressOutcome::Gesture(_, TextGesture::Rotating { .. })
        ));
    }

    #[test]
    fn test_press_on_empty_canvas_deselects() {
        let mut layer = layer();
        add_hello(&mut layer, Point::new(100.0, 100.0));
        assert_eq!(layer.pointer_down(Point::new(500.0, 500.0), 1.0), PressOutcome::Miss);
        assert!(layer.selected().is_none());
        assert!(!layer.pointer_move(Point::new(510.0, 510.0)));
    }

    // ===========================================
    // Rendering
    // ===========================================

    #[test]
    fn test_render_skips_items_outside_visible_tiles() {
        let mut layer = layer();
        add_hello(&mut layer, Point::new(100.0, 100.0));
        let mut pixmap = Pixmap::new(200, 200).expect("pixmap");
        let view = ViewTransform::default();
        let fonts = FontBook::new();

        let elsewhere: HashSet<_> = [TileKey::new(5, 5)].into_iter().collect();
        layer.render(&mut pixmap, &view, &elsewhere, &fonts);
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));

        let here: HashSet<_> = [TileKey::new(0, 0)].into_iter().collect();
        layer.render(&mut pixmap, &view, &here, &fonts);
        assert!(pixmap.pixels().iter().any(|p| p.alpha() > 0));
    }
}

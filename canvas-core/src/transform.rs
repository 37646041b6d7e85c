//! Screen ↔ world coordinate transform with anchored zoom.
//!
//! ```text
//!   world  = screen / zoom - pan
//!   screen = (world + pan) * zoom
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Zoom below which the fine wheel step is used.
pub const LOW_ZOOM_THRESHOLD: f32 = 0.1;

/// Zoom above which the fine wheel step is used.
pub const HIGH_ZOOM_THRESHOLD: f32 = 5.0;

/// Wheel multiplier below [`LOW_ZOOM_THRESHOLD`].
pub const LOW_ZOOM_STEP: f32 = 1.1;

/// Wheel multiplier above [`HIGH_ZOOM_THRESHOLD`].
pub const HIGH_ZOOM_STEP: f32 = 1.05;

/// Wheel multiplier for everything in between.
pub const NORMAL_ZOOM_STEP: f32 = 1.2;

/// Direction of one wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// Magnify.
    In,
    /// Shrink.
    Out,
}

impl ZoomDirection {
    /// Direction implied by a wheel delta (positive is away from the user, i.e. zoom in).
    #[must_use]
    pub fn from_delta(delta: f32) -> Option<Self> {
        if delta > 0.0 {
            Some(Self::In)
        } else if delta < 0.0 {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// The current pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    zoom: f32,
    pan: Point,
    min_zoom: f32,
    max_zoom: f32,
}

impl ViewTransform {
    /// Create a transform at 100% zoom and no pan.
    ///
    /// The bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            pan: Point::zero(),
            min_zoom,
            max_zoom,
        }
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current pan offset in world units.
    #[must_use]
    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Zoom bounds as `(min, max)`.
    #[must_use]
    pub fn zoom_bounds(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    /// Zoom as a whole percentage, as shown to the user.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).floor() as u32
    }

    /// Map a screen position into world space.
    #[must_use]
    pub fn screen_to_world(&self, p: Point) -> Point {
        p / self.zoom - self.pan
    }

    /// Map a world position into screen space.
    #[must_use]
    pub fn world_to_screen(&self, p: Point) -> Point {
        (p + self.pan) * self.zoom
    }

    /// Replace the pan offset.
    pub fn set_pan(&mut self, pan: Point) {
        self.pan = pan;
    }

    /// Pan by a screen-space delta (e.g. a middle-button drag).
    pub fn pan_by(&mut self, screen_delta: Point) {
        self.pan += screen_delta / self.zoom;
    }

    /// Wheel multiplier for the current zoom tier.
    #[must_use]
    pub fn step_factor(&self) -> f32 {
        if self.zoom < LOW_ZOOM_THRESHOLD {
            LOW_ZOOM_STEP
        } else if self.zoom > HIGH_ZOOM_THRESHOLD {
            HIGH_ZOOM_STEP
        } else {
            NORMAL_ZOOM_STEP
        }
    }

    /// Set the zoom while keeping the world point under `anchor` (screen space) fixed.
    ///
    /// The requested zoom is clamped to the configured bounds. Returns `true`
    /// if the zoom actually changed.
    pub fn zoom_at(&mut self, anchor: Point, zoom: f32) -> bool {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if !new_zoom.is_finite() || (new_zoom - self.zoom).abs() <= f32::EPSILON * self.zoom {
            return false;
        }

        let before = self.screen_to_world(anchor);
        self.zoom = new_zoom;
        let after = self.screen_to_world(anchor);
        self.pan += after - before;
        true
    }

    /// Multiply the zoom by `factor` around a screen anchor.
    pub fn zoom_by(&mut self, anchor: Point, factor: f32) -> bool {
        self.zoom_at(anchor, self.zoom * factor)
    }

    /// Apply one wheel tick around a screen anchor using the tiered step.
    pub fn wheel_step(&mut self, anchor: Point, direction: ZoomDirection) -> bool {
        let step = self.step_factor();
        let factor = match direction {
            ZoomDirection::In => step,
            ZoomDirection::Out => step.recip(),
        };
        self.zoom_by(anchor, factor)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(0.05, 10.0)
    }
}

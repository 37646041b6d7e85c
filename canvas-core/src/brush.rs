//! Tool selection and brush settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult};

/// The active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Thin freehand stroke.
    Pen,
    /// Freehand stroke (same compositing as the pen).
    Brush,
    /// Rectangle outline dragged corner to corner.
    Rectangle,
    /// Ellipse inscribed in the dragged rectangle.
    Circle,
    /// Straight line.
    Line,
    /// Freehand clearing stroke.
    Eraser,
    /// Place and manipulate text annotations.
    Text,
    /// Select and manipulate existing annotations.
    Select,
}

/// Shapes committed on pointer release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Rectangle outline.
    Rectangle,
    /// Ellipse outline.
    Circle,
    /// Straight segment.
    Line,
}

impl Tool {
    /// Every tool, in toolbar order.
    pub const ALL: [Self; 8] = [
        Self::Pen,
        Self::Brush,
        Self::Rectangle,
        Self::Circle,
        Self::Line,
        Self::Eraser,
        Self::Text,
        Self::Select,
    ];

    /// Identifier used by the UI and in command scripts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pen => "pen",
            Self::Brush => "brush",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Eraser => "eraser",
            Self::Text => "text",
            Self::Select => "select",
        }
    }

    /// Check whether the tool rasterizes continuously while the pointer moves.
    #[must_use]
    pub const fn is_freehand(self) -> bool {
        matches!(self, Self::Pen | Self::Brush | Self::Eraser)
    }

    /// Shape committed by this tool, if any.
    #[must_use]
    pub const fn shape(self) -> Option<ShapeKind> {
        match self {
            Self::Rectangle => Some(ShapeKind::Rectangle),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Line => Some(ShapeKind::Line),
            _ => None,
        }
    }

    /// Check whether the tool interacts with the annotation layer.
    #[must_use]
    pub const fn is_annotation(self) -> bool {
        matches!(self, Self::Text | Self::Select)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CanvasError::UnknownTool(s.to_string()))
    }
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create a color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not six hex digits.
    pub fn from_hex(hex: &str) -> CanvasResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CanvasError::InvalidColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| CanvasError::InvalidColor(hex.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Format as lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = CanvasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Smallest brush size in screen pixels.
pub const MIN_BRUSH_SIZE: f32 = 1.0;

/// Map a size slider position (0..=100) to a brush size.
///
/// The first 30% of the slider covers sizes 1-20 so small brushes get fine
/// control; the remaining 70% covers 20-100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn brush_size_from_slider(position: u32) -> f32 {
    let position = position.min(100) as f32;
    let size = if position <= 30.0 {
        1.0 + position * 19.0 / 30.0
    } else {
        20.0 + (position - 30.0) * 80.0 / 70.0
    };
    size.trunc()
}

/// Current tool and brush settings of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushState {
    /// Active tool.
    pub tool: Tool,
    /// Brush size in screen pixels, before zoom scaling.
    size: f32,
    /// Stroke color.
    pub color: Color,
    /// Opacity in `[0, 1]`.
    opacity: f32,
}

impl BrushState {
    /// Brush size in screen pixels.
    #[must_use]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Set the brush size; values below [`MIN_BRUSH_SIZE`] (or NaN) are raised to it.
    pub fn set_size(&mut self, size: f32) {
        self.size = if size.is_nan() {
            MIN_BRUSH_SIZE
        } else {
            size.max(MIN_BRUSH_SIZE)
        };
    }

    /// Opacity in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }
}

impl Default for BrushState {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            size: 3.0,
            color: Color::BLACK,
            opacity: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_parse_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>().expect("parse"), tool);
        }
        assert_eq!("ERASER".parse::<Tool>().expect("parse"), Tool::Eraser);
        assert!("spray".parse::<Tool>().is_err());
    }

    #[test]
    fn test_tool_classification() {
        assert!(Tool::Pen.is_freehand());
        assert!(Tool::Eraser.is_freehand());
        assert!(!Tool::Line.is_freehand());
        assert_eq!(Tool::Circle.shape(), Some(ShapeKind::Circle));
        assert_eq!(Tool::Text.shape(), None);
        assert!(Tool::Select.is_annotation());
    }

    #[test]
    fn test_color_hex() {
        let c = Color::from_hex("#FF8000").expect("valid");
        assert_eq!(c, Color::rgb(255, 128, 0));
        assert_eq!(c.to_hex(), "#ff8000");
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn test_color_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(0, 128, 255)).expect("serialize");
        assert_eq!(json, "\"#0080ff\"");
        let back: Color = serde_json::from_str("\"#ff0000\"").expect("deserialize");
        assert_eq!(back, Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_slider_mapping() {
        assert!((brush_size_from_slider(0) - 1.0).abs() < f32::EPSILON);
        assert!((brush_size_from_slider(10) - 7.0).abs() < f32::EPSILON);
        assert!((brush_size_from_slider(30) - 20.0).abs() < f32::EPSILON);
        assert!((brush_size_from_slider(100) - 100.0).abs() < f32::EPSILON);
        assert!((brush_size_from_slider(250) - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_brush_clamps() {
        let mut brush = BrushState::default();
        brush.set_opacity(1.7);
        assert!((brush.opacity() - 1.0).abs() < f32::EPSILON);
        brush.set_opacity(-0.3);
        assert!(brush.opacity().abs() < f32::EPSILON);
        brush.set_size(0.0);
        assert!((brush.size() - MIN_BRUSH_SIZE).abs() < f32::EPSILON);
    }
}

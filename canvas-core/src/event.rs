//! Input events forwarded by the UI and replayable canvas commands.

use serde::{Deserialize, Serialize};

use crate::brush::{Color, Tool};
use crate::geometry::Point;
use crate::text::FontDescriptor;

/// Mouse/pen button that triggered a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Primary button: uses the active tool.
    #[default]
    Left,
    /// Middle button: pans the canvas.
    Middle,
    /// Secondary button (currently unused).
    Right,
}

/// Keyboard modifiers held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Control (Command on macOS).
    pub ctrl: bool,
    /// Shift.
    pub shift: bool,
    /// Alt / Option.
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
    };

    /// Only Control held.
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// A pointer event in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Position relative to the top-left of the widget.
    pub position: Point,
    /// Button involved.
    #[serde(default)]
    pub button: PointerButton,
    /// Modifiers held.
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Left-button event without modifiers.
    #[must_use]
    pub const fn left(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    /// Middle-button event without modifiers.
    #[must_use]
    pub const fn middle(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Middle,
            modifiers: Modifiers::NONE,
        }
    }
}

/// One step of a scripted canvas session.
///
/// Mirrors the interface the UI uses, so a recorded session can be replayed
/// headlessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
#[allow(missing_docs)] // Variant fields documented at variant level
pub enum Command {
    /// Select the active tool.
    SetTool { tool: Tool },
    /// Set the brush size in screen pixels.
    SetBrushSize { size: f32 },
    /// Set the brush color.
    SetBrushColor { color: Color },
    /// Set the brush opacity in `[0, 1]`.
    SetOpacity { opacity: f32 },
    /// Pointer pressed at a screen position.
    PointerDown {
        x: f32,
        y: f32,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Pointer moved to a screen position.
    PointerMove {
        x: f32,
        y: f32,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Pointer released at a screen position.
    PointerUp {
        x: f32,
        y: f32,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Wheel tick at a screen position.
    Wheel {
        x: f32,
        y: f32,
        delta: f32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Widget resized.
    Resize { width: f32, height: f32 },
    /// Place a text annotation at a world position.
    AddText {
        x: f32,
        y: f32,
        text: String,
        #[serde(default)]
        font: FontDescriptor,
    },
    /// Drop all tiles and annotations.
    Clear,
    /// Write the canvas to an image file.
    Save { path: String },
    /// Replace the canvas with an image file.
    Load { path: String },
}

impl Command {
    /// Parse a JSON array of commands.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn parse_script(json: &str) -> crate::CanvasResult<Vec<Self>> {
        let commands: Vec<Self> = serde_json::from_str(json)?;
        tracing::debug!("Parsed script with {} commands", commands.len());
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_with_defaults() {
        let script = r##"[
            {"op": "set_tool", "tool": "line"},
            {"op": "set_brush_color", "color": "#ff0000"},
            {"op": "pointer_down", "x": 10, "y": 20},
            {"op": "pointer_up", "x": 30, "y": 40, "button": "middle"},
            {"op": "wheel", "x": 0, "y": 0, "delta": 120, "modifiers": {"ctrl": true}},
            {"op": "add_text", "x": 5, "y": 5, "text": "hi"},
            {"op": "clear"}
        ]"##;

        let commands = Command::parse_script(script).expect("valid script");
        assert_eq!(commands.len(), 7);
        assert_eq!(commands[0], Command::SetTool { tool: Tool::Line });
        assert_eq!(
            commands[1],
            Command::SetBrushColor {
                color: Color::rgb(255, 0, 0)
            }
        );
        assert!(matches!(
            commands[2],
            Command::PointerDown {
                button: PointerButton::Left,
                modifiers: Modifiers::NONE,
                ..
            }
        ));
        assert!(matches!(
            commands[3],
            Command::PointerUp {
                button: PointerButton::Middle,
                ..
            }
        ));
        assert!(matches!(
            commands[4],
            Command::Wheel {
                modifiers: Modifiers::CTRL,
                ..
            }
        ));
        match &commands[5] {
            Command::AddText { font, .. } => assert_eq!(font, &FontDescriptor::default()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_script_rejects_unknown_tool() {
        let script = r#"[{"op": "set_tool", "tool": "spray"}]"#;
        assert!(Command::parse_script(script).is_err());
    }
}

//! Identity and font description of text annotations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a text annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextId(Uuid);

impl TextId {
    /// Create a new unique text ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Font family and pixel size of a text annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescriptor {
    /// Family name, resolved against the fonts registered with the engine.
    pub family: String,
    /// Font size in world pixels (before the item's own scale).
    pub size: f32,
}

impl FontDescriptor {
    /// Create a font descriptor.
    #[must_use]
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new("sans-serif", 24.0)
    }
}

//! Text metrics and glyph outlines for annotations.

use std::collections::HashMap;

use ab_glyph::{Font, FontArc, GlyphId, Outline, OutlineCurve, ScaleFont};
use canvas_core::FontDescriptor;
use tiny_skia::{Path, PathBuilder};

use crate::error::{RenderError, RenderResult};

/// Advance per character, in ems, when the family is not registered.
pub const FALLBACK_ADVANCE_EM: f32 = 0.6;

/// Line height, in ems, when the family is not registered.
pub const FALLBACK_LINE_EM: f32 = 1.2;

/// Unscaled size of a laid-out text block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    /// Width of the longest line.
    pub width: f32,
    /// Height of all lines.
    pub height: f32,
}

/// Fonts available to annotations, keyed by family name.
#[derive(Clone, Default)]
pub struct FontBook {
    fonts: HashMap<String, FontArc>,
}

impl FontBook {
    /// Create an empty font book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register TrueType/OpenType data under a family name.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a parsable font.
    pub fn register(&mut self, family: impl Into<String>, data: Vec<u8>) -> RenderResult<()> {
        let family = family.into();
        let font = FontArc::try_from_vec(data)
            .map_err(|e| RenderError::InvalidFont(format!("{family}: {e}")))?;
        tracing::debug!("Registered font family '{family}'");
        self.fonts.insert(family, font);
        Ok(())
    }

    /// Check whether a family is registered.
    #[must_use]
    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(family)
    }

    /// Measure a (possibly multi-line) string.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure(&self, text: &str, font: &FontDescriptor) -> TextExtent {
        let lines = text.split('\n');
        let line_count = text.split('\n').count() as f32;

        match self.fonts.get(&font.family) {
            Some(face) => {
                let scaled = face.as_scaled(font.size);
                let width = lines
                    .map(|line| line_width(face, font.size, line))
                    .fold(0.0, f32::max);
                TextExtent {
                    width,
                    height: scaled.height() * line_count,
                }
            }
            None => {
                let longest = lines.map(|line| line.chars().count()).max().unwrap_or(0);
                TextExtent {
                    width: longest as f32 * FALLBACK_ADVANCE_EM * font.size,
                    height: line_count * FALLBACK_LINE_EM * font.size,
                }
            }
        }
    }

    /// Glyph outlines of `text`, centered on the origin, y pointing down.
    ///
    /// Returns `None` for unregistered families and for text without any
    /// visible glyph.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn outline(&self, text: &str, font: &FontDescriptor) -> Option<Path> {
        let face = self.fonts.get(&font.family)?;
        let scaled = face.as_scaled(font.size);
        let extent = self.measure(text, font);
        let scale = (scaled.h_scale_factor(), scaled.v_scale_factor());

        let mut pb = PathBuilder::new();
        for (i, line) in text.split('\n').enumerate() {
            let baseline = -extent.height / 2.0 + i as f32 * scaled.height() + scaled.ascent();
            let mut cursor = -extent.width / 2.0;
            let mut prev: Option<GlyphId> = None;
            for ch in line.chars() {
                let id = face.glyph_id(ch);
                if let Some(prev) = prev {
                    cursor += scaled.kern(prev, id);
                }
                if let Some(outline) = face.outline(id) {
                    append_outline(&mut pb, &outline, (cursor, baseline), scale);
                }
                cursor += scaled.h_advance(id);
                prev = Some(id);
            }
        }
        pb.finish()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.fonts.keys().collect();
        families.sort();
        f.debug_struct("FontBook")
            .field("families", &families)
            .finish()
    }
}

fn line_width(face: &FontArc, size: f32, line: &str) -> f32 {
    let scaled = face.as_scaled(size);
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = face.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Append one glyph outline (font units, y up) at `origin` on the baseline.
fn append_outline(
    pb: &mut PathBuilder,
    outline: &Outline,
    origin: (f32, f32),
    scale: (f32, f32),
) {
    let map = |p: ab_glyph::Point| (origin.0 + p.x * scale.0, origin.1 - p.y * scale.1);
    let mut last: Option<ab_glyph::Point> = None;

    for curve in &outline.curves {
        let (start, end) = match *curve {
            OutlineCurve::Line(a, b)
            | OutlineCurve::Quad(a, _, b)
            | OutlineCurve::Cubic(a, _, _, b) => (a, b),
        };
        if last != Some(start) {
            if last.is_some() {
                pb.close();
            }
            let (x, y) = map(start);
            pb.move_to(x, y);
        }
        match *curve {
            OutlineCurve::Line(_, b) => {
                let (x, y) = map(b);
                pb.line_to(x, y);
            }
            OutlineCurve::Quad(_, c, b) => {
                let (cx, cy) = map(c);
                let (x, y) = map(b);
                pb.quad_to(cx, cy, x, y);
            }
            OutlineCurve::Cubic(_, c1, c2, b) => {
                let (c1x, c1y) = map(c1);
                let (c2x, c2y) = map(c2);
                let (x, y) = map(b);
                pb.cubic_to(c1x, c1y, c2x, c2y, x, y);
            }
        }
        last = Some(end);
    }
    if last.is_some() {
        pb.close();
    }
}

use crate::foundation::error::{ReelError, ReelResult};

/// One glyph run of a shaped line, ready for the raster backend.
#[derive(Clone)]
pub struct ShapedRun {
    /// Font data backing the run's glyph outlines.
    pub font: vello_cpu::peniko::FontData,
    /// Font size of the run in pixels.
    pub font_size: f32,
    /// Positioned glyphs, relative to the line's top-left origin.
    pub glyphs: Vec<vello_cpu::Glyph>,
}

impl std::fmt::Debug for ShapedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapedRun")
            .field("font_size", &self.font_size)
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

/// A single shaped caption line: measured box plus glyph runs.
#[derive(Clone, Debug, Default)]
pub struct ShapedLine {
    /// Measured line width in pixels.
    pub width: f32,
    /// Measured line height in pixels.
    pub height: f32,
    /// Glyph runs to paint; empty runs still carry a valid measurement.
    pub runs: Vec<ShapedRun>,
}

/// Shapes and measures single caption lines.
///
/// The production implementation wraps parley; tests substitute a
/// fixed-advance implementation so layout logic runs without font files.
pub trait CaptionShaper {
    /// Shape `text` as one unwrapped line at `size_px`.
    fn shape(&mut self, text: &str, size_px: f32, italic: bool) -> ReelResult<ShapedLine>;

    /// Measured width of `text` at `size_px`, without keeping the glyphs.
    fn measure(&mut self, text: &str, size_px: f32) -> ReelResult<f32> {
        Ok(self.shape(text, size_px, false)?.width)
    }
}

/// Parley-backed shaper over a font registered from raw bytes.
pub struct ParleyShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    font: vello_cpu::peniko::FontData,
    family_name: String,
}

impl ParleyShaper {
    /// Register `font_bytes` (TTF/OTF) and build a shaper around them.
    pub fn from_font_bytes(font_bytes: Vec<u8>) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font_bytes.clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            font,
            family_name,
        })
    }

    /// Primary family name resolved from the registered font bytes.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }
}

impl CaptionShaper for ParleyShaper {
    fn shape(&mut self, text: &str, size_px: f32, italic: bool) -> ReelResult<ShapedLine> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation("font size must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        if italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut runs = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run
                    .glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                runs.push(ShapedRun {
                    font: self.font.clone(),
                    font_size: run.run().font_size(),
                    glyphs,
                });
            }
        }

        Ok(ShapedLine {
            width: layout.width(),
            height: layout.height(),
            runs,
        })
    }
}

/// Deterministic shaper for tests and debugging: every character advances a
/// fixed fraction of the font size and no glyphs are produced.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceShaper {
    /// Horizontal advance per character, in em (fraction of the font size).
    pub advance_em: f32,
}

impl Default for FixedAdvanceShaper {
    fn default() -> Self {
        Self { advance_em: 0.5 }
    }
}

impl CaptionShaper for FixedAdvanceShaper {
    fn shape(&mut self, text: &str, size_px: f32, _italic: bool) -> ReelResult<ShapedLine> {
        Ok(ShapedLine {
            width: text.chars().count() as f32 * self.advance_em * size_px,
            height: size_px,
            runs: Vec::new(),
        })
    }
}

//! Renderer facade: feeds positioned glyphs to an external callback sink.

use pathfinder_geometry::rect::RectF;
use pathfinder_geometry::vector::Vector2F;

use crate::error::FontError;
use crate::font::ParsedFont;
use crate::outline::OutlineSink;
use crate::position::{text_bounds, PositionedGlyph};
use crate::tables::{TableProvider, SfntVersion};
use crate::tag;

/// Callback surface a vector renderer implements.
///
/// Calls arrive strictly nested: `begin_text`, then per glyph `begin_glyph`
/// … path segments … `end_figure` per contour … `end_glyph`, and finally
/// `end_text`. Implementations need not be thread-safe; the facade never
/// re-enters a callback within one render.
pub trait GlyphRenderer {
    fn begin_text(&mut self, bounds: RectF);
    fn begin_glyph(&mut self, glyph_id: u16, bounds: RectF);
    fn move_to(&mut self, p: Vector2F);
    fn line_to(&mut self, p: Vector2F);
    fn quadratic_to(&mut self, c: Vector2F, p: Vector2F);
    fn cubic_to(&mut self, c1: Vector2F, c2: Vector2F, p: Vector2F);
    fn end_figure(&mut self);
    fn end_glyph(&mut self);
    fn end_text(&mut self);
}

/// Adapts [OutlineSink] output (font units, y up) into renderer calls
/// (pixels, y down) at a glyph's position.
struct RendererSink<'a, R: GlyphRenderer> {
    renderer: &'a mut R,
    origin: Vector2F,
    scale: f32,
}

impl<R: GlyphRenderer> RendererSink<'_, R> {
    fn transform(&self, point: Vector2F) -> Vector2F {
        Vector2F::new(
            self.origin.x() + point.x() * self.scale,
            self.origin.y() - point.y() * self.scale,
        )
    }
}

impl<R: GlyphRenderer> OutlineSink for RendererSink<'_, R> {
    fn move_to(&mut self, to: Vector2F) {
        let to = self.transform(to);
        self.renderer.move_to(to);
    }

    fn line_to(&mut self, to: Vector2F) {
        let to = self.transform(to);
        self.renderer.line_to(to);
    }

    fn quadratic_curve_to(&mut self, control: Vector2F, to: Vector2F) {
        let control = self.transform(control);
        let to = self.transform(to);
        self.renderer.quadratic_to(control, to);
    }

    fn cubic_curve_to(&mut self, control1: Vector2F, control2: Vector2F, to: Vector2F) {
        let control1 = self.transform(control1);
        let control2 = self.transform(control2);
        let to = self.transform(to);
        self.renderer.cubic_to(control1, control2, to);
    }

    fn close(&mut self) {
        self.renderer.end_figure();
    }
}

/// Drive `renderer` over `glyphs` previously produced by the layout engine.
///
/// `px_per_em` must match the value used at layout time so outlines land in
/// the glyph bounds.
pub fn render_text<T, R>(
    font: &ParsedFont<T>,
    glyphs: &[PositionedGlyph],
    px_per_em: f32,
    renderer: &mut R,
) -> Result<(), FontError>
where
    T: TableProvider + SfntVersion,
    R: GlyphRenderer,
{
    let scale = px_per_em / f32::from(font.units_per_em());
    renderer.begin_text(text_bounds(glyphs));
    for glyph in glyphs {
        renderer.begin_glyph(glyph.glyph_id, glyph.bounds);
        let mut sink = RendererSink {
            renderer: &mut *renderer,
            origin: glyph.origin,
            scale,
        };
        font.visit_outline(glyph.glyph_id, &mut sink)
            .map_err(FontError::invalid_table(match font.outline_format {
                crate::font::OutlineFormat::TrueType => tag::GLYF,
                crate::font::OutlineFormat::Cff => tag::CFF,
            }))?;
        renderer.end_glyph();
    }
    renderer.end_text();
    Ok(())
}

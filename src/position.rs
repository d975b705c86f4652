//! Text layout: from logical text to positioned glyphs.
//!
//! The pipeline decodes UTF-16 input, resolves bidirectional embedding
//! levels, splits each line into script runs, shapes every run, and
//! accumulates pen positions into [PositionedGlyph]s. Lines are separated
//! by mandatory breaks; alignment translates finished lines once their
//! extent is known.
//!
//! Coordinates are in pixels with y growing downwards; each glyph's
//! `origin` is its baseline origin and `bounds` covers the inked area
//! derived from the glyph bounding box.

use pathfinder_geometry::rect::RectF;
use pathfinder_geometry::vector::Vector2F;

use crate::error::FontError;
use crate::font::ParsedFont;
use crate::gsub::ShapedGlyph;
use crate::tables::{TableProvider, SfntVersion};
use crate::unicode::bidi::{self, Direction};
use crate::unicode::props::{self, LineBreakClass, ScriptClass};
use crate::unicode::{CodePoint, Utf16Iter};

/// Number of space advances a tab expands to by default.
const DEFAULT_TAB_WIDTH: u32 = 4;

/// Horizontal alignment of each line within the wrapping length.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Alignment {
    Start,
    Center,
    End,
}

/// Options controlling text layout.
pub struct TextOptions {
    /// Paragraph direction; `None` auto-detects from the first strong
    /// character.
    pub direction: Option<Direction>,
    /// Force every run to this script instead of itemizing.
    pub script_override: Option<ScriptClass>,
    /// OpenType language tag.
    pub language: Option<u32>,
    /// Enable the `kern` feature for non-complex scripts.
    pub kerning: bool,
    /// Tab width in multiples of the space advance.
    pub tab_width: u32,
    /// Line width used by alignment; required for `Center`/`End`.
    pub wrapping_length: Option<f32>,
    /// Top-left origin of the first line.
    pub origin: Vector2F,
    /// Pixels per em; glyph metrics scale by `px_per_em / units_per_em`.
    pub px_per_em: f32,
    pub alignment: Alignment,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions {
            direction: None,
            script_override: None,
            language: None,
            kerning: true,
            tab_width: DEFAULT_TAB_WIDTH,
            wrapping_length: None,
            origin: Vector2F::zero(),
            px_per_em: 16.0,
            alignment: Alignment::Start,
        }
    }
}

/// A glyph with its final position, ready for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedGlyph {
    pub glyph_id: u16,
    /// Cluster id from shaping, relating the glyph back to its codepoints.
    pub cluster: u32,
    /// Baseline origin in pixels.
    pub origin: Vector2F,
    /// Inked bounds in pixels.
    pub bounds: RectF,
}

/// One run of codepoints sharing a script and embedding level.
struct ScriptRun {
    start: usize,
    end: usize,
    script: ScriptClass,
    level: u8,
}

/// Lay out UTF-16 text.
pub fn layout_text_utf16<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    units: &[u16],
    options: &TextOptions,
) -> Result<Vec<PositionedGlyph>, FontError> {
    let codepoints: Vec<CodePoint> = Utf16Iter::new(units).collect();
    layout_codepoints(font, &codepoints, options)
}

/// Lay out UTF-8 text.
pub fn layout_text<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    text: &str,
    options: &TextOptions,
) -> Result<Vec<PositionedGlyph>, FontError> {
    let codepoints: Vec<CodePoint> = text.chars().map(CodePoint::from).collect();
    layout_codepoints(font, &codepoints, options)
}

/// Lay out already-decoded codepoints.
pub fn layout_codepoints<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    codepoints: &[CodePoint],
    options: &TextOptions,
) -> Result<Vec<PositionedGlyph>, FontError> {
    let scale = options.px_per_em / f32::from(font.units_per_em());
    let line_height = font.line_height() as f32 * scale;
    let space_advance = space_advance_px(font, scale)?;
    let tab_advance = space_advance * options.tab_width as f32;

    let mut output = Vec::new();
    let mut pen_y = options.origin.y();

    for line in split_lines(codepoints) {
        let line_start = output.len();
        let mut pen_x = options.origin.x();

        let direction = options
            .direction
            .unwrap_or_else(|| bidi::base_direction(line));
        let levels = bidi::resolve_levels(line, direction);
        let runs = script_runs(line, &levels, options.script_override);
        let visual_order = visual_order_of(&runs);

        for &run_index in &visual_order {
            let run = &runs[run_index];
            let segment = &line[run.start..run.end];
            // Tabs partition the run; they never reach the shaper.
            let mut seg_start = 0;
            for (i, cp) in segment.iter().enumerate() {
                if props::line_break(cp.value()) == LineBreakClass::Tab {
                    pen_x = emit_run(
                        font,
                        &segment[seg_start..i],
                        run,
                        options,
                        scale,
                        pen_x,
                        pen_y,
                        &mut output,
                    )?;
                    pen_x += tab_advance;
                    seg_start = i + 1;
                }
            }
            pen_x = emit_run(
                font,
                &segment[seg_start..],
                run,
                options,
                scale,
                pen_x,
                pen_y,
                &mut output,
            )?;
        }

        align_line(
            &mut output[line_start..],
            options,
            pen_x - options.origin.x(),
        );
        pen_y += line_height;
    }

    Ok(output)
}

fn space_advance_px<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    scale: f32,
) -> Result<f32, FontError> {
    let space = font.lookup_glyph_index(
        CodePoint::from(' '),
        crate::font::MatchingPresentation::NotRequired,
        None,
    );
    let advance = font
        .horizontal_advance(space)
        .map_err(FontError::invalid_table(crate::tag::HMTX))?;
    Ok(f32::from(advance) * scale)
}

/// Split codepoints into lines at mandatory breaks. CRLF counts as one
/// break.
fn split_lines(codepoints: &[CodePoint]) -> Vec<&[CodePoint]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < codepoints.len() {
        let class = props::line_break(codepoints[i].value());
        if class.is_mandatory_break() {
            lines.push(&codepoints[start..i]);
            if class == LineBreakClass::CarriageReturn
                && codepoints.get(i + 1).map(|cp| props::line_break(cp.value()))
                    == Some(LineBreakClass::LineFeed)
            {
                i += 1;
            }
            start = i + 1;
        }
        i += 1;
    }
    lines.push(&codepoints[start..]);
    lines
}

/// Split a line into runs by embedding level and script.
///
/// Common and inherited characters take the script of the preceding real
/// script (or the following one at a run start).
fn script_runs(
    line: &[CodePoint],
    levels: &[u8],
    script_override: Option<ScriptClass>,
) -> Vec<ScriptRun> {
    let resolved = resolve_scripts(line, script_override);
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=line.len() {
        let boundary = i == line.len()
            || levels[i] != levels[start]
            || resolved[i] != resolved[start];
        if boundary {
            runs.push(ScriptRun {
                start,
                end: i,
                script: resolved[start],
                level: levels.get(start).copied().unwrap_or(0),
            });
            start = i;
        }
    }
    runs.retain(|run| run.end > run.start);
    runs
}

fn resolve_scripts(line: &[CodePoint], script_override: Option<ScriptClass>) -> Vec<ScriptClass> {
    if let Some(script) = script_override {
        return vec![script; line.len()];
    }
    let mut resolved: Vec<ScriptClass> = line
        .iter()
        .map(|cp| props::script(cp.value()))
        .collect();
    // Forward pass: inherit from the previous concrete script.
    let mut last = ScriptClass::Common;
    for script in resolved.iter_mut() {
        if matches!(*script, ScriptClass::Common | ScriptClass::Inherited) {
            *script = last;
        } else {
            last = *script;
        }
    }
    // Leading common characters take the first concrete script.
    let first_concrete = resolved
        .iter()
        .copied()
        .find(|script| !matches!(script, ScriptClass::Common | ScriptClass::Inherited))
        .unwrap_or(ScriptClass::Common);
    for script in resolved.iter_mut() {
        if matches!(*script, ScriptClass::Common | ScriptClass::Inherited) {
            *script = first_concrete;
        } else {
            break;
        }
    }
    resolved
}

fn visual_order_of(runs: &[ScriptRun]) -> Vec<usize> {
    let level_runs: Vec<bidi::LevelRun> = runs
        .iter()
        .map(|run| bidi::LevelRun {
            start: run.start,
            end: run.end,
            level: run.level,
        })
        .collect();
    bidi::visual_run_order(&level_runs)
}

#[allow(clippy::too_many_arguments)]
fn emit_run<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    codepoints: &[CodePoint],
    run: &ScriptRun,
    options: &TextOptions,
    scale: f32,
    mut pen_x: f32,
    pen_y: f32,
    output: &mut Vec<PositionedGlyph>,
) -> Result<f32, FontError> {
    if codepoints.is_empty() {
        return Ok(pen_x);
    }
    let mut shaped = font.shape_run(codepoints, run.script, options.language, options.kerning)?;
    if run.level % 2 == 1 {
        // Odd levels emit their glyphs in reverse for visual order.
        shaped.reverse();
    }
    for glyph in &shaped {
        output.push(position_glyph(font, glyph, scale, pen_x, pen_y)?);
        pen_x += glyph.x_advance as f32 * scale;
    }
    Ok(pen_x)
}

fn position_glyph<T: TableProvider + SfntVersion>(
    font: &ParsedFont<T>,
    glyph: &ShapedGlyph,
    scale: f32,
    pen_x: f32,
    pen_y: f32,
) -> Result<PositionedGlyph, FontError> {
    let metrics = font
        .glyph_metrics(glyph.glyph_id)
        .map_err(FontError::invalid_table(crate::tag::GLYF))?;
    // y offsets are in font units (y up); the output space has y down.
    let origin = Vector2F::new(
        pen_x + glyph.x_offset as f32 * scale,
        pen_y - glyph.y_offset as f32 * scale,
    );
    let bbox = metrics.bounding_box;
    let top_left = Vector2F::new(
        origin.x() + f32::from(bbox.x_min) * scale,
        origin.y() - f32::from(bbox.y_max) * scale,
    );
    let size = Vector2F::new(
        metrics.width() as f32 * scale,
        metrics.height() as f32 * scale,
    );
    Ok(PositionedGlyph {
        glyph_id: glyph.glyph_id,
        cluster: glyph.cluster,
        origin,
        bounds: RectF::new(top_left, size),
    })
}

/// Translate a finished line according to the alignment.
fn align_line(line: &mut [PositionedGlyph], options: &TextOptions, line_width: f32) {
    let Some(wrapping_length) = options.wrapping_length else {
        return;
    };
    let dx = match options.alignment {
        Alignment::Start => return,
        Alignment::Center => (wrapping_length - line_width) / 2.0,
        Alignment::End => wrapping_length - line_width,
    };
    let delta = Vector2F::new(dx, 0.0);
    for glyph in line.iter_mut() {
        glyph.origin += delta;
        glyph.bounds = glyph.bounds + delta;
    }
}

/// The union of all positioned glyph bounds.
pub fn text_bounds(glyphs: &[PositionedGlyph]) -> RectF {
    let mut iter = glyphs.iter();
    let Some(first) = iter.next() else {
        return RectF::default();
    };
    let mut bounds = first.bounds;
    for glyph in iter {
        bounds = bounds.union_rect(glyph.bounds);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(text: &str) -> Vec<CodePoint> {
        text.chars().map(CodePoint::from).collect()
    }

    #[test]
    fn line_splitting() {
        let text = cps("ab\ncd\r\nef");
        let lines = split_lines(&text);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1].len(), 2);
        assert_eq!(lines[2].len(), 2);
    }

    #[test]
    fn trailing_newline_yields_empty_line() {
        let text = cps("ab\n");
        let lines = split_lines(&text);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].is_empty());
    }

    #[test]
    fn script_itemization() {
        let text = cps("ab אב cd");
        let levels = bidi::resolve_levels(&text, Direction::LeftToRight);
        let runs = script_runs(&text, &levels, None);
        // Latin+space (level 0), Hebrew (level 1), space+Latin (level 0)
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].script, ScriptClass::Latin);
        assert_eq!(runs[1].script, ScriptClass::Hebrew);
        assert_eq!(runs[2].script, ScriptClass::Latin);
    }

    #[test]
    fn script_override_wins() {
        let text = cps("ab אב");
        let levels = vec![0; text.len()];
        let runs = script_runs(&text, &levels, Some(ScriptClass::Latin));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, ScriptClass::Latin);
    }

    #[test]
    fn common_inherits_surrounding_script() {
        let text = cps("א.ב");
        let resolved = resolve_scripts(&text, None);
        assert_eq!(resolved, vec![ScriptClass::Hebrew; 3]);

        let text = cps("...ab");
        let resolved = resolve_scripts(&text, None);
        assert!(resolved.iter().all(|&s| s == ScriptClass::Latin));
    }
}

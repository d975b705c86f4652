//! End-to-end layout over a synthetic TrueType font.

mod common;

use typeline::binary::read::ReadWindow;
use typeline::font::{MatchingPresentation, ParsedFont};
use typeline::font_data::FontData;
use typeline::position::{self, Alignment, TextOptions};
use typeline::render::{render_text, GlyphRenderer};
use typeline::unicode::CodePoint;
use typeline::pathfinder_geometry::rect::RectF;
use typeline::pathfinder_geometry::vector::Vector2F;

use common::build_test_font;

/// Parse a font binary into a `ParsedFont` bound to the enclosing window.
macro_rules! load_font {
    ($font:ident, $data:expr) => {
        let font_data = ReadWindow::new($data).read::<FontData<'_>>().unwrap();
        let provider = font_data.table_provider(0).unwrap();
        let $font = ParsedFont::new(provider).unwrap();
    };
}

/// Options that keep glyph coordinates in font units (1000 px per em).
fn unit_options() -> TextOptions {
    TextOptions {
        px_per_em: 1000.0,
        ..TextOptions::default()
    }
}

#[test]
fn font_loads_and_maps_glyphs() {
    let data = build_test_font();
    load_font!(font, &data);
    assert_eq!(font.num_glyphs(), 3);
    assert_eq!(font.units_per_em(), 1000);
    let a = font.lookup_glyph_index(
        CodePoint::from('A'),
        MatchingPresentation::NotRequired,
        None,
    );
    let b = font.lookup_glyph_index(
        CodePoint::from('B'),
        MatchingPresentation::NotRequired,
        None,
    );
    let missing = font.lookup_glyph_index(
        CodePoint::from('Z'),
        MatchingPresentation::NotRequired,
        None,
    );
    assert_eq!(a, 1);
    assert_eq!(b, 2);
    assert_eq!(missing, 0);
    assert!(matches!(
        font.require_glyph_index(CodePoint::from('Z')),
        Err(typeline::FontError::GlyphNotFound(0x5A))
    ));
}

#[test]
fn glyph_metrics_come_from_hmtx_and_glyf() {
    let data = build_test_font();
    load_font!(font, &data);
    let metrics = font.glyph_metrics(1).unwrap();
    assert_eq!(metrics.horizontal_advance, 600);
    assert_eq!(metrics.bounding_box.x_max, 100);
    assert_eq!(metrics.bounding_box.y_max, 100);
    // Memoized value is identical.
    assert_eq!(font.glyph_metrics(1).unwrap(), metrics);
}

#[test]
fn ascii_shaping_is_cmap_in_order_with_cumulative_advance() {
    let data = build_test_font();
    load_font!(font, &data);
    let glyphs = position::layout_text(&font, "AB", &unit_options()).unwrap();

    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[0].glyph_id, 1);
    assert_eq!(glyphs[1].glyph_id, 2);
    assert_eq!(glyphs[0].cluster, 0);
    assert_eq!(glyphs[1].cluster, 1);
    // Pen advances by the first glyph's advance.
    assert_eq!(glyphs[0].origin, Vector2F::new(0.0, 0.0));
    assert_eq!(glyphs[1].origin, Vector2F::new(600.0, 0.0));
    // Bounds cover the triangle outline above the baseline.
    assert_eq!(glyphs[0].bounds, RectF::new(Vector2F::new(0.0, -100.0), Vector2F::new(100.0, 100.0)));
}

#[test]
fn layout_is_deterministic() {
    let data = build_test_font();
    load_font!(font, &data);
    let first = position::layout_text(&font, "ABAB", &unit_options()).unwrap();
    let second = position::layout_text(&font, "ABAB", &unit_options()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn utf16_and_utf8_agree() {
    let data = build_test_font();
    load_font!(font, &data);
    let utf16: Vec<u16> = "AB".encode_utf16().collect();
    let from_utf16 = position::layout_text_utf16(&font, &utf16, &unit_options()).unwrap();
    let from_utf8 = position::layout_text(&font, "AB", &unit_options()).unwrap();
    assert_eq!(from_utf16, from_utf8);
}

#[test]
fn newline_advances_line() {
    let data = build_test_font();
    load_font!(font, &data);
    let glyphs = position::layout_text(&font, "A\nA", &unit_options()).unwrap();
    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[0].origin, Vector2F::new(0.0, 0.0));
    // ascender - descender + line gap = 800 + 200 + 0
    assert_eq!(glyphs[1].origin, Vector2F::new(0.0, 1000.0));
}

#[test]
fn tab_expands_to_space_advances() {
    let data = build_test_font();
    load_font!(font, &data);
    let options = TextOptions {
        tab_width: 4,
        ..unit_options()
    };
    let glyphs = position::layout_text(&font, "A\tA", &options).unwrap();
    assert_eq!(glyphs.len(), 2);
    // Space is unmapped and falls back to .notdef (advance 500): the tab
    // covers 4 * 500 after the first glyph's 600.
    assert_eq!(glyphs[1].origin.x(), 600.0 + 4.0 * 500.0);
}

#[test]
fn center_alignment_translates_line() {
    let data = build_test_font();
    load_font!(font, &data);
    let options = TextOptions {
        wrapping_length: Some(2000.0),
        alignment: Alignment::Center,
        ..unit_options()
    };
    let glyphs = position::layout_text(&font, "A", &options).unwrap();
    // Line width 600 centered in 2000 starts at 700.
    assert_eq!(glyphs[0].origin.x(), 700.0);

    let options = TextOptions {
        wrapping_length: Some(2000.0),
        alignment: Alignment::End,
        ..unit_options()
    };
    let glyphs = position::layout_text(&font, "A", &options).unwrap();
    assert_eq!(glyphs[0].origin.x(), 1400.0);
}

#[test]
fn renderer_receives_nested_callbacks() {
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl GlyphRenderer for Recorder {
        fn begin_text(&mut self, _bounds: RectF) {
            self.events.push("begin_text".into());
        }
        fn begin_glyph(&mut self, glyph_id: u16, _bounds: RectF) {
            self.events.push(format!("begin_glyph {}", glyph_id));
        }
        fn move_to(&mut self, _p: Vector2F) {
            self.events.push("move_to".into());
        }
        fn line_to(&mut self, _p: Vector2F) {
            self.events.push("line_to".into());
        }
        fn quadratic_to(&mut self, _c: Vector2F, _p: Vector2F) {
            self.events.push("quadratic_to".into());
        }
        fn cubic_to(&mut self, _c1: Vector2F, _c2: Vector2F, _p: Vector2F) {
            self.events.push("cubic_to".into());
        }
        fn end_figure(&mut self) {
            self.events.push("end_figure".into());
        }
        fn end_glyph(&mut self) {
            self.events.push("end_glyph".into());
        }
        fn end_text(&mut self) {
            self.events.push("end_text".into());
        }
    }

    let data = build_test_font();
    load_font!(font, &data);
    let glyphs = position::layout_text(&font, "A", &unit_options()).unwrap();
    let mut recorder = Recorder::default();
    render_text(&font, &glyphs, 1000.0, &mut recorder).unwrap();

    assert_eq!(recorder.events.first().map(String::as_str), Some("begin_text"));
    assert_eq!(recorder.events.last().map(String::as_str), Some("end_text"));
    assert_eq!(recorder.events[1], "begin_glyph 1");
    // The triangle outline: move + two lines + closing figure.
    assert!(recorder.events.contains(&"move_to".to_string()));
    assert!(recorder.events.contains(&"end_figure".to_string()));
    assert_eq!(recorder.events[recorder.events.len() - 2], "end_glyph");
}

#[test]
fn gsub_ligature_applies_through_full_pipeline() {
    use common::{coverage, layout_table, Buf};

    // A + B ligate to glyph 2 under `liga`.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(18); // coverage offset
    subtable.u16(1); // ligature set count
    subtable.u16(8); // ligature set offset
    subtable.u16(1); // one ligature
    subtable.u16(4);
    subtable.u16(2); // ligature glyph
    subtable.u16(2); // component count
    subtable.u16(2); // second component: glyph 2 (B)
    subtable.bytes(&coverage(&[1]));
    let gsub = layout_table(typeline::tag::LIGA, &[(4, subtable.into_vec())]);

    let data = common::build_test_font_with(Some(gsub), None, None);
    load_font!(font, &data);
    let glyphs = position::layout_text(&font, "AB", &unit_options()).unwrap();
    assert_eq!(glyphs.len(), 1);
    assert_eq!(glyphs[0].glyph_id, 2);
    assert_eq!(glyphs[0].cluster, 0);
}

#[test]
fn gpos_kerning_applies_through_full_pipeline() {
    use common::{coverage, layout_table, Buf};

    // Pair (1, 2) kerns by -100.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(18); // coverage offset
    subtable.u16(0x0004);
    subtable.u16(0);
    subtable.u16(1);
    subtable.u16(12);
    subtable.u16(1);
    subtable.u16(2); // second glyph
    subtable.i16(-100);
    subtable.bytes(&coverage(&[1]));
    let gpos = layout_table(typeline::tag::KERN_FEATURE, &[(2, subtable.into_vec())]);

    let data = common::build_test_font_with(None, Some(gpos), None);
    load_font!(font, &data);
    let glyphs = position::layout_text(&font, "AB", &unit_options()).unwrap();
    // The second glyph starts 100 units earlier than the plain advance.
    assert_eq!(glyphs[1].origin.x(), 500.0);
}

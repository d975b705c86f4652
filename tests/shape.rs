//! Shaping-engine behaviour over synthetic GSUB and GPOS tables.

mod common;

use typeline::binary::read::ReadWindow;
use typeline::gpos::{self, PosFeatureSet};
use typeline::gsub::{self, ShapedGlyph};
use typeline::layout::{GDEFTable, LayoutTable, GPOS, GSUB};
use typeline::tag;

use common::{coverage, gdef_with_classes, layout_table, Buf};

fn buffer(glyphs: &[u16]) -> Vec<ShapedGlyph> {
    glyphs
        .iter()
        .enumerate()
        .map(|(i, &glyph)| ShapedGlyph::from_char('x', glyph, i as u32))
        .collect()
}

fn glyph_ids(glyphs: &[ShapedGlyph]) -> Vec<u16> {
    glyphs.iter().map(|glyph| glyph.glyph_id).collect()
}

fn parse_gsub(data: &[u8]) -> LayoutTable<GSUB> {
    ReadWindow::new(data).read::<LayoutTable<GSUB>>().unwrap()
}

fn parse_gpos(data: &[u8]) -> LayoutTable<GPOS> {
    ReadWindow::new(data).read::<LayoutTable<GPOS>>().unwrap()
}

fn apply_gsub(table: &LayoutTable<GSUB>, feature: u32, glyphs: &mut Vec<ShapedGlyph>) {
    gsub::apply_features(table, None, tag::DFLT, None, &[feature], 1000, glyphs).unwrap();
}

fn apply_gpos(table: &LayoutTable<GPOS>, gdef: Option<&GDEFTable>, glyphs: &mut [ShapedGlyph]) {
    gpos::apply(
        table,
        gdef,
        PosFeatureSet::Cursive,
        true,
        tag::DFLT,
        None,
        glyphs,
    )
    .unwrap();
}

// --- GSUB -----------------------------------------------------------------

#[test]
fn single_substitution_delta() {
    // Format 1: glyphs 2 and 4 shift by +10.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(6); // coverage offset
    subtable.i16(10); // delta
    subtable.bytes(&coverage(&[2, 4]));
    let table = parse_gsub(&layout_table(tag::LIGA, &[(1, subtable.into_vec())]));

    let mut glyphs = buffer(&[2, 3, 4]);
    apply_gsub(&table, tag::LIGA, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![12, 3, 14]);
}

#[test]
fn single_substitution_explicit_list() {
    // Format 2: glyph 5 maps to 99.
    let mut subtable = Buf::new();
    subtable.u16(2); // format
    subtable.u16(8); // coverage offset
    subtable.u16(1); // glyph count
    subtable.u16(99);
    subtable.bytes(&coverage(&[5]));
    let table = parse_gsub(&layout_table(tag::LIGA, &[(1, subtable.into_vec())]));

    let mut glyphs = buffer(&[5]);
    apply_gsub(&table, tag::LIGA, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![99]);
}

#[test]
fn multiple_substitution_expands_and_keeps_cluster() {
    // Glyph 6 expands to [7, 8].
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(14); // coverage offset
    subtable.u16(1); // sequence count
    subtable.u16(8); // sequence offset
    // Sequence @8
    subtable.u16(2).u16(7).u16(8);
    subtable.bytes(&coverage(&[6]));
    let table = parse_gsub(&layout_table(tag::CCMP, &[(2, subtable.into_vec())]));

    let mut glyphs = buffer(&[5, 6]);
    apply_gsub(&table, tag::CCMP, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![5, 7, 8]);
    // Expansion glyphs keep the source cluster: monotonic, non-decreasing.
    assert_eq!(
        glyphs.iter().map(|g| g.cluster).collect::<Vec<_>>(),
        vec![0, 1, 1]
    );
}

#[test]
fn ligature_substitution_merges_components() {
    // Glyphs 4 + 5 ligate to 9.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(18); // coverage offset
    subtable.u16(1); // ligature set count
    subtable.u16(8); // ligature set offset
    // Ligature set @8
    subtable.u16(1); // one ligature
    subtable.u16(4); // at +4 from set start
    // Ligature @12
    subtable.u16(9); // ligature glyph
    subtable.u16(2); // component count
    subtable.u16(5); // second component
    subtable.bytes(&coverage(&[4]));
    let table = parse_gsub(&layout_table(tag::LIGA, &[(4, subtable.into_vec())]));

    let mut glyphs = buffer(&[4, 5, 6]);
    apply_gsub(&table, tag::LIGA, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![9, 6]);
    // Ligature keeps the first component's cluster.
    assert_eq!(glyphs[0].cluster, 0);
    assert_eq!(glyphs[1].cluster, 2);
    assert!(glyphs[0].ligature_id != 0);
    // Clusters remain monotonic.
    assert!(glyphs[0].cluster <= glyphs[1].cluster);
}

#[test]
fn chained_context_applies_nested_lookup() {
    // With backtrack [1] and lookahead [3], glyph 2 runs nested lookup 1
    // (single substitution to 20).
    let mut chain = Buf::new();
    chain.u16(3); // format 3
    chain.u16(1); // backtrack count
    chain.u16(20); // backtrack coverage offset
    chain.u16(1); // input count
    chain.u16(26); // input coverage offset
    chain.u16(1); // lookahead count
    chain.u16(32); // lookahead coverage offset
    chain.u16(1); // one nested lookup
    chain.u16(0).u16(1); // sequence index 0 -> lookup 1
    chain.bytes(&coverage(&[1])); // @20
    chain.bytes(&coverage(&[2])); // @26
    chain.bytes(&coverage(&[3])); // @32

    let mut single = Buf::new();
    single.u16(1);
    single.u16(6);
    single.i16(18); // 2 -> 20
    single.bytes(&coverage(&[2]));

    let table = parse_gsub(&common::layout_table_with_feature_lookups(
        tag::CALT,
        &[(6, chain.into_vec()), (1, single.into_vec())],
        &[0],
    ));

    let mut glyphs = buffer(&[1, 2, 3]);
    apply_gsub(&table, tag::CALT, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![1, 20, 3]);

    // Without the lookahead context nothing happens.
    let mut glyphs = buffer(&[1, 2, 4]);
    apply_gsub(&table, tag::CALT, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![1, 2, 4]);
}

#[test]
fn reverse_chained_substitution() {
    // Glyph 7 becomes 70 when followed by glyph 8.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(14); // coverage offset
    subtable.u16(0); // backtrack count
    subtable.u16(1); // lookahead count
    subtable.u16(20); // lookahead coverage offset
    subtable.u16(1); // glyph count
    subtable.u16(70); // substitute
    subtable.bytes(&coverage(&[7])); // @14
    subtable.bytes(&coverage(&[8])); // @20
    let table = parse_gsub(&layout_table(tag::RLIG, &[(8, subtable.into_vec())]));

    let mut glyphs = buffer(&[7, 8]);
    apply_gsub(&table, tag::RLIG, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![70, 8]);

    let mut glyphs = buffer(&[7, 9]);
    apply_gsub(&table, tag::RLIG, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![7, 9]);
}

#[test]
fn extension_lookup_indirection() {
    // A type 7 lookup wrapping a single substitution behaves like type 1.
    let mut wrapped = Buf::new();
    wrapped.u16(1); // extension format
    wrapped.u16(1); // wrapped lookup type: single subst
    wrapped.u32(8); // wrapped subtable at +8 from the extension subtable
    wrapped.u16(1); // single subst format 1
    wrapped.u16(6); // coverage offset
    wrapped.i16(1); // delta
    wrapped.bytes(&coverage(&[30]));
    let table = parse_gsub(&layout_table(tag::LIGA, &[(7, wrapped.into_vec())]));

    let mut glyphs = buffer(&[30]);
    apply_gsub(&table, tag::LIGA, &mut glyphs);
    assert_eq!(glyph_ids(&glyphs), vec![31]);
}

// --- GPOS -----------------------------------------------------------------

#[test]
fn single_adjustment_formats() {
    // Format 1: uniform x advance +15 for glyph 2.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(8); // coverage offset
    subtable.u16(0x0004); // value format: x advance
    subtable.i16(15);
    subtable.bytes(&coverage(&[2]));
    let table = parse_gpos(&layout_table(tag::DIST, &[(1, subtable.into_vec())]));

    let mut glyphs = buffer(&[2, 3]);
    glyphs[0].x_advance = 100;
    apply_gpos(&table, None, &mut glyphs);
    assert_eq!(glyphs[0].x_advance, 115);
    assert_eq!(glyphs[1].x_advance, 0);

    // Format 2: per-glyph records; placement applies to offsets.
    let mut subtable = Buf::new();
    subtable.u16(2); // format
    subtable.u16(16); // coverage offset
    subtable.u16(0x0003); // x placement | y placement
    subtable.u16(2); // value count
    subtable.i16(-5).i16(7); // glyph 2
    subtable.i16(11).i16(0); // glyph 3
    subtable.bytes(&coverage(&[2, 3]));
    let table = parse_gpos(&layout_table(tag::DIST, &[(1, subtable.into_vec())]));

    let mut glyphs = buffer(&[2, 3]);
    apply_gpos(&table, None, &mut glyphs);
    assert_eq!((glyphs[0].x_offset, glyphs[0].y_offset), (-5, 7));
    assert_eq!((glyphs[1].x_offset, glyphs[1].y_offset), (11, 0));
}

#[test]
fn pair_adjustment_explicit_pairs() {
    // Pair (25, 20): first glyph gains x advance -30.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(18); // coverage offset
    subtable.u16(0x0004); // value format 1
    subtable.u16(0); // value format 2
    subtable.u16(1); // pair set count
    subtable.u16(12); // pair set offset
    // Pair set @12
    subtable.u16(1); // one pair
    subtable.u16(20); // second glyph
    subtable.i16(-30); // value record 1
    subtable.bytes(&coverage(&[25]));
    let table = parse_gpos(&layout_table(tag::KERN_FEATURE, &[(2, subtable.into_vec())]));

    let mut glyphs = buffer(&[25, 20, 22]);
    for glyph in glyphs.iter_mut() {
        glyph.x_advance = 1000;
    }
    apply_gpos(&table, None, &mut glyphs);
    assert_eq!(glyphs[0].x_advance, 970);
    assert_eq!(glyphs[1].x_advance, 1000);
    assert_eq!(glyphs[2].x_advance, 1000);
}

#[test]
fn pair_adjustment_class_kerning() {
    // Class 1 (glyph 40) before class 1 (glyph 50) kerns by -25.
    let mut subtable = Buf::new();
    subtable.u16(2); // format
    subtable.u16(40); // coverage offset
    subtable.u16(0x0004); // value format 1
    subtable.u16(0); // value format 2
    subtable.u16(24); // classdef 1 offset
    subtable.u16(32); // classdef 2 offset
    subtable.u16(2); // class 1 count
    subtable.u16(2); // class 2 count
    // class records: [0][0], [0][1], [1][0], [1][1]
    subtable.i16(0).i16(0).i16(0).i16(-25);
    // ClassDef 1 @24: glyph 40 -> class 1
    subtable.u16(1).u16(40).u16(1).u16(1);
    // ClassDef 2 @32: glyph 50 -> class 1
    subtable.u16(1).u16(50).u16(1).u16(1);
    subtable.bytes(&coverage(&[40]));
    let table = parse_gpos(&layout_table(tag::KERN_FEATURE, &[(2, subtable.into_vec())]));

    let mut glyphs = buffer(&[40, 50]);
    apply_gpos(&table, None, &mut glyphs);
    assert_eq!(glyphs[0].x_advance, -25);
    assert_eq!(glyphs[1].x_advance, 0);

    let mut glyphs = buffer(&[40, 41]);
    apply_gpos(&table, None, &mut glyphs);
    assert_eq!(glyphs[0].x_advance, 0);
}

#[test]
fn cursive_attachment_aligns_entry_with_exit() {
    // Both glyphs are 20; exit anchor (60, 10), entry anchor (10, 20).
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(22); // coverage offset
    subtable.u16(1); // entry/exit count
    subtable.u16(10); // entry anchor offset
    subtable.u16(16); // exit anchor offset
    // Entry anchor @10
    subtable.u16(1).i16(10).i16(20);
    // Exit anchor @16
    subtable.u16(1).i16(60).i16(10);
    subtable.bytes(&coverage(&[20]));
    let table = parse_gpos(&layout_table(tag::CURS, &[(3, subtable.into_vec())]));

    let mut glyphs = buffer(&[20, 20]);
    for glyph in glyphs.iter_mut() {
        glyph.x_advance = 100;
    }
    apply_gpos(&table, None, &mut glyphs);

    // The first glyph's advance is trimmed to its exit anchor; the second
    // is translated so its entry anchor lands on the pen position.
    assert_eq!(glyphs[0].x_advance, 60);
    assert_eq!(glyphs[1].x_offset, -10);
    assert_eq!(glyphs[1].x_advance, 90);
    // Cross-stream: the second glyph takes the exit/entry y difference.
    assert_eq!(glyphs[1].y_offset, -10);
    // Glyph origins overlap: the second starts before the first's full
    // advance.
    assert!(glyphs[0].x_advance + glyphs[1].x_offset < 100);
}

#[test]
fn mark_to_base_attachment() {
    // Base glyph 2 with anchor (300, 400); mark glyph 3 anchored at
    // (50, 60). GDEF classifies glyph 3 as a mark.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(34); // mark coverage offset
    subtable.u16(40); // base coverage offset
    subtable.u16(1); // mark class count
    subtable.u16(12); // mark array offset
    subtable.u16(24); // base array offset
    // Mark array @12
    subtable.u16(1); // one mark record
    subtable.u16(0); // class 0
    subtable.u16(6); // anchor at +6 from the array
    subtable.u16(1).i16(50).i16(60); // anchor @18
    // Base array @24
    subtable.u16(1); // one base record
    subtable.u16(4); // class 0 anchor at +4
    subtable.u16(1).i16(300).i16(400); // anchor @28
    subtable.bytes(&coverage(&[3])); // marks @34
    subtable.bytes(&coverage(&[2])); // bases @40
    let table = parse_gpos(&layout_table(tag::MARK, &[(4, subtable.into_vec())]));

    let gdef_data = gdef_with_classes(3, &[3]); // glyph 3 is class 3 (mark)
    let gdef = ReadWindow::new(&gdef_data).read::<GDEFTable>().unwrap();

    let mut glyphs = buffer(&[2, 3]);
    glyphs[0].x_advance = 500;
    apply_gpos(&table, Some(&gdef), &mut glyphs);

    // Mark origin = base origin + (base anchor - mark anchor), compensating
    // for the base advance already added to the pen.
    assert_eq!(glyphs[1].x_offset, 300 - 50 - 500);
    assert_eq!(glyphs[1].y_offset, 400 - 60);
}

#[test]
fn lookup_flag_ignore_marks_skips_marks_in_pairs() {
    // Kerning pair (25, 20) still applies when a mark glyph intervenes,
    // because the lookup sets IGNORE_MARKS.
    let mut subtable = Buf::new();
    subtable.u16(1); // format
    subtable.u16(18); // coverage offset
    subtable.u16(0x0004);
    subtable.u16(0);
    subtable.u16(1);
    subtable.u16(12);
    subtable.u16(1);
    subtable.u16(20);
    subtable.i16(-30);
    subtable.bytes(&coverage(&[25]));

    // Build the layout table by hand so the lookup flag can be set.
    let mut table_buf = Buf::new();
    table_buf.u16(1).u16(0);
    table_buf.u16(10); // script list
    table_buf.u16(30); // feature list
    table_buf.u16(44); // lookup list
    table_buf.u16(1);
    table_buf.u32(u32::from_be_bytes(*b"DFLT"));
    table_buf.u16(8);
    table_buf.u16(4);
    table_buf.u16(0);
    table_buf.u16(0);
    table_buf.u16(0xFFFF);
    table_buf.u16(1);
    table_buf.u16(0);
    table_buf.u16(1);
    table_buf.u32(tag::KERN_FEATURE);
    table_buf.u16(8);
    table_buf.u16(0);
    table_buf.u16(1);
    table_buf.u16(0);
    table_buf.u16(1); // one lookup
    table_buf.u16(4);
    table_buf.u16(2); // pair pos
    table_buf.u16(0x0008); // IGNORE_MARKS
    table_buf.u16(1);
    table_buf.u16(8);
    table_buf.bytes(&subtable.into_vec());
    let table = parse_gpos(&table_buf.into_vec());

    let gdef_data = gdef_with_classes(3, &[3]);
    let gdef = ReadWindow::new(&gdef_data).read::<GDEFTable>().unwrap();

    let mut glyphs = buffer(&[25, 3, 20]);
    apply_gpos(&table, Some(&gdef), &mut glyphs);
    assert_eq!(glyphs[0].x_advance, -30);
}

//! Shared helpers for building synthetic fonts and tables in tests.
#![allow(dead_code)]

/// Big-endian byte buffer builder.
pub struct Buf {
    data: Vec<u8>,
}

impl Buf {
    pub fn new() -> Buf {
        Buf { data: Vec::new() }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.data.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Build a GSUB or GPOS table with a `DFLT` script whose default language
/// system enables feature 0, which references every lookup.
///
/// Layout: header (10) | script list @10 (20) | feature list @30 (12 + 2n)
/// | lookup list.
pub fn layout_table(feature_tag: u32, lookups: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let all: Vec<u16> = (0..lookups.len() as u16).collect();
    layout_table_with_feature_lookups(feature_tag, lookups, &all)
}

/// As [layout_table], enabling only `feature_lookups` through the feature.
/// Remaining lookups are reachable via nested lookup records only.
pub fn layout_table_with_feature_lookups(
    feature_tag: u32,
    lookups: &[(u16, Vec<u8>)],
    feature_lookups: &[u16],
) -> Vec<u8> {
    let n = lookups.len();
    let feature_list_len = 8 + 4 + 2 * feature_lookups.len(); // count + record + feature table
    let lookup_list_offset = 30 + feature_list_len;

    let mut buf = Buf::new();
    // Header
    buf.u16(1).u16(0); // version 1.0
    buf.u16(10); // script list offset
    buf.u16(30); // feature list offset
    buf.u16(lookup_list_offset as u16);

    // Script list @10
    buf.u16(1); // one script
    buf.u32(u32::from_be_bytes(*b"DFLT"));
    buf.u16(8); // script table at +8
    // Script table @18
    buf.u16(4); // default langsys at +4
    buf.u16(0); // no langsys records
    // LangSys @22
    buf.u16(0); // lookup order
    buf.u16(0xFFFF); // no required feature
    buf.u16(1); // one feature
    buf.u16(0); // feature index 0
    assert_eq!(buf.len(), 30);

    // Feature list @30
    buf.u16(1);
    buf.u32(feature_tag);
    buf.u16(8); // feature table at +8
    // Feature table @38
    buf.u16(0); // params
    buf.u16(feature_lookups.len() as u16);
    for &index in feature_lookups {
        buf.u16(index);
    }
    assert_eq!(buf.len(), lookup_list_offset);

    // Lookup list
    buf.u16(n as u16);
    let mut lookup_offset = 2 + 2 * n;
    for (_, subtable) in lookups {
        buf.u16(lookup_offset as u16);
        lookup_offset += 8 + subtable.len();
    }
    for (lookup_type, subtable) in lookups {
        buf.u16(*lookup_type);
        buf.u16(0); // lookup flag
        buf.u16(1); // one subtable
        buf.u16(8); // at +8 from lookup start
        buf.bytes(subtable);
    }
    buf.into_vec()
}

/// Coverage format 1 over the given glyphs.
pub fn coverage(glyphs: &[u16]) -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(1);
    buf.u16(glyphs.len() as u16);
    for &glyph in glyphs {
        buf.u16(glyph);
    }
    buf.into_vec()
}

/// A GDEF table with a format 1 glyph class definition.
pub fn gdef_with_classes(start_glyph: u16, classes: &[u16]) -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(1).u16(0); // version 1.0
    buf.u16(12); // glyph classdef offset
    buf.u16(0); // attach list
    buf.u16(0); // lig caret list
    buf.u16(0); // mark attach classdef
    // ClassDef format 1 @12
    buf.u16(1);
    buf.u16(start_glyph);
    buf.u16(classes.len() as u16);
    for &class in classes {
        buf.u16(class);
    }
    buf.into_vec()
}

/// Build a complete little TrueType font.
///
/// Three glyphs: `.notdef` (advance 500), `A` → glyph 1 (advance 600), `B`
/// → glyph 2 (advance 700). Glyphs 1 and 2 are a triangle with bbox
/// (0,0)–(100,100). 1000 units per em, ascender 800, descender −200.
pub fn build_test_font() -> Vec<u8> {
    build_test_font_with(None, None, None)
}

/// As [build_test_font], with optional GSUB/GPOS/GDEF tables.
pub fn build_test_font_with(
    gsub: Option<Vec<u8>>,
    gpos: Option<Vec<u8>>,
    gdef: Option<Vec<u8>>,
) -> Vec<u8> {
    let mut tables: Vec<(u32, Vec<u8>)> = vec![
        (u32::from_be_bytes(*b"OS/2"), os2_table()),
        (u32::from_be_bytes(*b"cmap"), cmap_table()),
        (u32::from_be_bytes(*b"glyf"), glyf_table()),
        (u32::from_be_bytes(*b"head"), head_table()),
        (u32::from_be_bytes(*b"hhea"), hhea_table()),
        (u32::from_be_bytes(*b"hmtx"), hmtx_table()),
        (u32::from_be_bytes(*b"loca"), loca_table()),
        (u32::from_be_bytes(*b"maxp"), maxp_table()),
        (u32::from_be_bytes(*b"name"), name_table()),
        (u32::from_be_bytes(*b"post"), post_table()),
    ];
    if let Some(gsub) = gsub {
        tables.push((u32::from_be_bytes(*b"GSUB"), gsub));
    }
    if let Some(gpos) = gpos {
        tables.push((u32::from_be_bytes(*b"GPOS"), gpos));
    }
    if let Some(gdef) = gdef {
        tables.push((u32::from_be_bytes(*b"GDEF"), gdef));
    }
    tables.sort_by_key(|(tag, _)| *tag);

    let num_tables = tables.len();
    let mut offset = 12 + 16 * num_tables;
    let mut buf = Buf::new();
    buf.u32(0x00010000);
    buf.u16(num_tables as u16);
    buf.u16(0).u16(0).u16(0); // search fields, unused by the parser
    for (tag, data) in &tables {
        buf.u32(*tag);
        buf.u32(0); // checksum
        buf.u32(offset as u32);
        buf.u32(data.len() as u32);
        offset += (data.len() + 3) & !3;
    }
    for (_, data) in &tables {
        buf.bytes(data);
        // Long-align table starts.
        while buf.len() % 4 != 0 {
            buf.u8(0);
        }
    }
    buf.into_vec()
}

fn head_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(1).u16(0); // version
    buf.u32(0x00010000); // font revision
    buf.u32(0); // checksum adjustment
    buf.u32(0x5F0F3CF5); // magic
    buf.u16(0); // flags
    buf.u16(1000); // units per em
    buf.i64(0).i64(0); // created / modified
    buf.i16(0).i16(0).i16(100).i16(100); // bbox
    buf.u16(0); // mac style
    buf.u16(8); // lowest rec ppem
    buf.i16(2); // direction hint
    buf.i16(0); // short loca
    buf.i16(0); // glyph data format
    buf.into_vec()
}

fn hhea_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(1).u16(0); // version
    buf.i16(800); // ascender
    buf.i16(-200); // descender
    buf.i16(0); // line gap
    buf.u16(700); // advance width max
    buf.i16(0).i16(0).i16(100); // min lsb/rsb, extent
    buf.i16(1).i16(0).i16(0); // caret
    buf.i16(0).i16(0).i16(0).i16(0); // reserved
    buf.i16(0); // metric data format
    buf.u16(3); // number of h metrics
    buf.into_vec()
}

fn maxp_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u32(0x00005000);
    buf.u16(3);
    buf.into_vec()
}

fn hmtx_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(500).i16(0);
    buf.u16(600).i16(0);
    buf.u16(700).i16(0);
    buf.into_vec()
}

fn cmap_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(0); // version
    buf.u16(1); // one encoding record
    buf.u16(3).u16(1); // windows unicode bmp
    buf.u32(12); // subtable offset
    // Format 4, segments: [0x41..0x42 delta -0x40], terminator
    buf.u16(4);
    buf.u16(32); // length
    buf.u16(0); // language
    buf.u16(4); // segCountX2
    buf.u16(0).u16(0).u16(0); // search fields
    buf.u16(0x42).u16(0xFFFF); // end codes
    buf.u16(0); // reserved pad
    buf.u16(0x41).u16(0xFFFF); // start codes
    buf.i16(-0x40).i16(1); // id deltas
    buf.u16(0).u16(0); // id range offsets
    buf.into_vec()
}

fn triangle_glyph() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.i16(1); // one contour
    buf.i16(0).i16(0).i16(100).i16(100); // bbox
    buf.u16(2); // last point index
    buf.u16(0); // no instructions
    buf.bytes(&[0x01, 0x01, 0x01]); // on-curve flags
    buf.i16(0).i16(100).i16(-50); // x deltas
    buf.i16(0).i16(0).i16(100); // y deltas
    let mut data = buf.into_vec();
    if data.len() % 2 != 0 {
        data.push(0);
    }
    data
}

fn glyf_table() -> Vec<u8> {
    let mut data = triangle_glyph();
    data.extend_from_slice(&triangle_glyph());
    data
}

fn loca_table() -> Vec<u8> {
    let glyph_len = triangle_glyph().len() as u16;
    let mut buf = Buf::new();
    buf.u16(0); // glyph 0: empty
    buf.u16(0);
    buf.u16(glyph_len / 2);
    buf.u16(glyph_len); // == 2 * glyph_len / 2
    buf.into_vec()
}

fn name_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(0); // format
    buf.u16(0); // no records
    buf.u16(6); // string storage
    buf.into_vec()
}

fn post_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u32(0x00030000);
    buf.bytes(&[0; 28]);
    buf.into_vec()
}

fn os2_table() -> Vec<u8> {
    let mut buf = Buf::new();
    buf.u16(0); // version
    buf.i16(550); // x avg char width
    buf.u16(400); // weight
    buf.u16(5); // width
    buf.u16(0); // fsType
    for _ in 0..11 {
        buf.i16(0); // sub/superscript and strikeout metrics, family class
    }
    buf.bytes(&[0; 10]); // panose
    buf.u32(0).u32(0).u32(0).u32(0); // unicode ranges
    buf.u32(u32::from_be_bytes(*b"TEST")); // vendor
    buf.u16(0); // fsSelection
    buf.u16(0x41); // first char
    buf.u16(0x42); // last char
    buf.into_vec()
}

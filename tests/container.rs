//! Container parsing: sfnt, collections, WOFF.

mod common;

use std::io::Write;

use typeline::binary::read::ReadWindow;
use typeline::error::FontError;
use typeline::font_data::FontData;
use typeline::tables::{TableProvider, SfntData, SfntFont};
use typeline::tag;

use common::{build_test_font, Buf};

#[test]
fn sfnt_round_trips_table_bytes() {
    let data = build_test_font();
    let font = ReadWindow::new(&data).read::<SfntFont<'_>>().unwrap();
    let provider = font.table_provider(0).unwrap();
    assert!(provider.has_table(tag::CMAP));
    assert!(provider.has_table(tag::GLYF));
    assert!(!provider.has_table(tag::GSUB));
    let head = provider.read_table_data(tag::HEAD).unwrap();
    assert_eq!(&head[12..16], &0x5F0F3CF5u32.to_be_bytes());
}

#[test]
fn reading_twice_yields_equal_directories() {
    let data = build_test_font();
    let first = ReadWindow::new(&data).read::<SfntFont<'_>>().unwrap();
    let second = ReadWindow::new(&data).read::<SfntFont<'_>>().unwrap();
    match (&first.data, &second.data) {
        (SfntData::Single(a), SfntData::Single(b)) => {
            let records_a: Vec<_> = a.table_records.iter().collect();
            let records_b: Vec<_> = b.table_records.iter().collect();
            assert_eq!(records_a, records_b);
        }
        _ => panic!("expected single fonts"),
    }
}

#[test]
fn collection_exposes_each_font() {
    let sfnt = build_test_font();
    // Two-font collection referencing the same offset table.
    let mut buf = Buf::new();
    buf.u32(u32::from_be_bytes(*b"ttcf"));
    buf.u16(1).u16(0); // version 1.0
    buf.u32(2); // two fonts
    let base = 12 + 8;
    buf.u32(base as u32);
    buf.u32(base as u32);
    buf.bytes(&sfnt);
    let data = buf.into_vec();

    let font = ReadWindow::new(&data).read::<SfntFont<'_>>().unwrap();
    assert_eq!(font.font_count(), 2);
    for index in 0..2 {
        let provider = font.table_provider(index).unwrap();
        assert!(provider.has_table(tag::CMAP));
    }
    assert!(font.table_provider(2).is_err());
}

#[test]
fn font_data_dispatches_all_formats() {
    let sfnt = build_test_font();
    assert!(matches!(
        FontData::parse(&sfnt),
        Ok(FontData::OpenType(_))
    ));
    assert!(matches!(
        FontData::parse(&[0xDE, 0xAD, 0xBE, 0xEF]),
        Err(FontError::UnsupportedFontFormat(0xDEADBEEF))
    ));
}

#[test]
fn woff_wraps_tables_with_zlib() {
    // Wrap the head table of the test font in a WOFF with one compressed
    // table.
    let sfnt = build_test_font();
    let font = ReadWindow::new(&sfnt).read::<SfntFont<'_>>().unwrap();
    let provider = font.table_provider(0).unwrap();
    let head = provider.read_table_data(tag::HEAD).unwrap().into_owned();

    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&head).unwrap();
    let compressed = encoder.finish().unwrap();
    assert!(compressed.len() != head.len());

    let mut buf = Buf::new();
    buf.u32(0x774F4646); // wOFF
    buf.u32(0x00010000); // flavor
    buf.u32(0); // length (unchecked)
    buf.u16(1); // one table
    buf.u16(0); // reserved
    buf.u32(0); // total sfnt size (unchecked)
    buf.u16(0).u16(0); // version
    buf.u32(0).u32(0).u32(0); // metadata
    buf.u32(0).u32(0); // private
    // Directory entry
    let offset = 44 + 20;
    buf.u32(tag::HEAD);
    buf.u32(offset as u32);
    buf.u32(compressed.len() as u32);
    buf.u32(head.len() as u32);
    buf.u32(0); // checksum
    buf.bytes(&compressed);
    let data = buf.into_vec();

    let woff = match FontData::parse(&data).unwrap() {
        FontData::Woff(woff) => woff,
        _ => panic!("expected WOFF"),
    };
    let decompressed = woff.table_data(tag::HEAD).unwrap().unwrap();
    assert_eq!(&*decompressed, &*head);
}

#[test]
fn woff_rejects_truncated_payload() {
    // Declared original length doesn't match the inflated bytes.
    let payload = b"payload bytes here".to_vec();
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&payload).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut buf = Buf::new();
    buf.u32(0x774F4646);
    buf.u32(0x00010000);
    buf.u32(0);
    buf.u16(1);
    buf.u16(0);
    buf.u32(0);
    buf.u16(0).u16(0);
    buf.u32(0).u32(0).u32(0);
    buf.u32(0).u32(0);
    let offset = 44 + 20;
    buf.u32(tag::HEAD);
    buf.u32(offset as u32);
    buf.u32(compressed.len() as u32);
    buf.u32((payload.len() + 5) as u32); // wrong original length
    buf.u32(0);
    buf.bytes(&compressed);
    let data = buf.into_vec();

    let woff = match FontData::parse(&data).unwrap() {
        FontData::Woff(woff) => woff,
        _ => panic!("expected WOFF"),
    };
    assert!(woff.table_data(tag::HEAD).is_err());
}

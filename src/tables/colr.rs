//! Parsing of the `COLR` and `CPAL` tables.
//!
//! Only COLR version 0 layer enumeration is supported; a version 1 table
//! parses its version 0 prefix. Compositing is left to the renderer.

use crate::binary::read::{LazyArray, FromData, ReadCursor, FromRaw};
use crate::binary::{U16, U8};
use crate::error::ParseError;

/// `COLR` table: colour glyph layer records.
pub struct ColrTable<'a> {
    base_glyph_records: LazyArray<'a, BaseGlyphRecord>,
    layer_records: LazyArray<'a, LayerRecord>,
}

#[derive(Debug, Copy, Clone)]
pub struct BaseGlyphRecord {
    pub glyph_id: u16,
    pub first_layer_index: u16,
    pub num_layers: u16,
}

/// One layer of a colour glyph: a glyph outline and a palette entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    pub glyph_id: u16,
    /// Index into the CPAL palette, or 0xFFFF for the text foreground colour.
    pub palette_index: u16,
}

impl<'a> FromData<'a> for ColrTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let version = cursor.read_u16()?;
        // Version 1 extends the header; the version 0 prefix stays valid.
        cursor.check_version(version <= 1)?;
        let num_base_glyph_records = usize::from(cursor.read_u16()?);
        let base_glyph_records_offset = usize::try_from(cursor.read_u32()?)?;
        let layer_records_offset = usize::try_from(cursor.read_u32()?)?;
        let num_layer_records = usize::from(cursor.read_u16()?);

        let base_glyph_records = window
            .offset(base_glyph_records_offset)
            .cursor()
            .read_array::<BaseGlyphRecord>(num_base_glyph_records)?;
        let layer_records = window
            .offset(layer_records_offset)
            .cursor()
            .read_array::<LayerRecord>(num_layer_records)?;

        Ok(ColrTable {
            base_glyph_records,
            layer_records,
        })
    }
}

impl<'a> ColrTable<'a> {
    /// The layers of `glyph_id`, bottom-most first, or `None` when the glyph
    /// has no colour record.
    pub fn layers(&self, glyph_id: u16) -> Result<Option<Vec<LayerRecord>>, ParseError> {
        // Base glyph records are sorted by glyph id.
        let mut lo = 0usize;
        let mut hi = self.base_glyph_records.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let record = self.base_glyph_records.get_item(mid);
            match record.glyph_id.cmp(&glyph_id) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => {
                    let start = usize::from(record.first_layer_index);
                    let end = start + usize::from(record.num_layers);
                    if end > self.layer_records.len() {
                        return Err(ParseError::IndexOutOfBounds);
                    }
                    let layers = (start..end)
                        .map(|i| self.layer_records.get_item(i))
                        .collect();
                    return Ok(Some(layers));
                }
            }
        }
        Ok(None)
    }
}

impl<'a> FromRaw<'a> for BaseGlyphRecord {
    type ReadType = (U16, U16, U16);
    fn from_raw((glyph_id, first_layer_index, num_layers): (u16, u16, u16)) -> Self {
        BaseGlyphRecord {
            glyph_id,
            first_layer_index,
            num_layers,
        }
    }
}

impl<'a> FromRaw<'a> for LayerRecord {
    type ReadType = (U16, U16);
    fn from_raw((glyph_id, palette_index): (u16, u16)) -> Self {
        LayerRecord {
            glyph_id,
            palette_index,
        }
    }
}

/// An RGBA colour from a CPAL palette.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorRecord {
    pub blue: u8,
    pub green: u8,
    pub red: u8,
    pub alpha: u8,
}

impl<'a> FromRaw<'a> for ColorRecord {
    type ReadType = (U8, U8, U8, U8);
    fn from_raw((blue, green, red, alpha): (u8, u8, u8, u8)) -> Self {
        ColorRecord {
            blue,
            green,
            red,
            alpha,
        }
    }
}

/// `CPAL` table: colour palettes.
pub struct CpalTable<'a> {
    num_palette_entries: u16,
    color_record_indices: LazyArray<'a, U16>,
    color_records: LazyArray<'a, ColorRecord>,
}

impl<'a> FromData<'a> for CpalTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let version = cursor.read_u16()?;
        cursor.check_version(version <= 1)?;
        let num_palette_entries = cursor.read_u16()?;
        let num_palettes = usize::from(cursor.read_u16()?);
        let num_color_records = usize::from(cursor.read_u16()?);
        let color_records_offset = usize::try_from(cursor.read_u32()?)?;
        let color_record_indices = cursor.read_array::<U16>(num_palettes)?;

        let color_records = window
            .offset(color_records_offset)
            .cursor()
            .read_array::<ColorRecord>(num_color_records)?;

        Ok(CpalTable {
            num_palette_entries,
            color_record_indices,
            color_records,
        })
    }
}

impl<'a> CpalTable<'a> {
    /// Number of palettes.
    pub fn num_palettes(&self) -> usize {
        self.color_record_indices.len()
    }

    /// Look up a colour within a palette.
    pub fn color(&self, palette: usize, entry: u16) -> Option<ColorRecord> {
        if palette >= self.num_palettes() || entry >= self.num_palette_entries {
            return None;
        }
        let base = usize::from(self.color_record_indices.get_item(palette));
        let index = base + usize::from(entry);
        if index < self.color_records.len() {
            Some(self.color_records.get_item(index))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    fn colr_v0() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&1u16.to_be_bytes()); // one base glyph
        data.extend_from_slice(&14u32.to_be_bytes()); // base records offset
        data.extend_from_slice(&20u32.to_be_bytes()); // layer records offset
        data.extend_from_slice(&2u16.to_be_bytes()); // two layers
        // base glyph record: glyph 5 uses layers 0..2
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        // layer records
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&11u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data
    }

    #[test]
    fn layer_enumeration() {
        let data = colr_v0();
        let colr = ReadWindow::new(&data).read::<ColrTable<'_>>().unwrap();
        let layers = colr.layers(5).unwrap().unwrap();
        assert_eq!(
            layers,
            vec![
                LayerRecord {
                    glyph_id: 10,
                    palette_index: 0
                },
                LayerRecord {
                    glyph_id: 11,
                    palette_index: 1
                },
            ]
        );
        assert!(colr.layers(6).unwrap().is_none());
    }

    #[test]
    fn palette_lookup() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&2u16.to_be_bytes()); // entries per palette
        data.extend_from_slice(&1u16.to_be_bytes()); // one palette
        data.extend_from_slice(&2u16.to_be_bytes()); // two colour records
        data.extend_from_slice(&14u32.to_be_bytes()); // records offset
        data.extend_from_slice(&0u16.to_be_bytes()); // palette 0 starts at 0
        data.extend_from_slice(&[0xFF, 0x00, 0x00, 0xFF]); // blue
        data.extend_from_slice(&[0x00, 0x00, 0xFF, 0xFF]); // red
        let cpal = ReadWindow::new(&data).read::<CpalTable<'_>>().unwrap();
        assert_eq!(cpal.num_palettes(), 1);
        let red = cpal.color(0, 1).unwrap();
        assert_eq!(red.red, 0xFF);
        assert_eq!(red.blue, 0x00);
        assert!(cpal.color(0, 2).is_none());
        assert!(cpal.color(1, 0).is_none());
    }
}

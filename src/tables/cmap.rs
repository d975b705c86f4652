//! Parsing of the `cmap` table.
//!
//! The table maps character codes to glyph ids through one of several
//! subtable formats. [Cmap::preferred_subtable] picks the best encoding in
//! the priority order `(3,10) > (0,6) > (0,4) > (3,1) > (0,3) > (3,0)`.

use crate::binary::read::{FromData, FromRaw, LazyArray, ReadCursor, ReadWindow};
use crate::binary::{I16, U16, U24, U32, U8};
use crate::error::ParseError;

/// Platform identifier within an encoding record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const WINDOWS: PlatformId = PlatformId(3);
}

/// Encoding identifier within an encoding record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP: EncodingId = EncodingId(1);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);
}

/// `cmap` table header and encoding records.
pub struct Cmap<'a> {
    pub window: ReadWindow<'a>,
    encoding_records: LazyArray<'a, EncodingRecord>,
}

/// One encoding record in the `cmap` header.
#[derive(Debug, Copy, Clone)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

/// A character-to-glyph subtable.
pub enum CmapSubtable<'a> {
    Format0 {
        language: u16,
        glyph_id_array: LazyArray<'a, U8>,
    },
    Format4 {
        language: u16,
        end_codes: LazyArray<'a, U16>,
        start_codes: LazyArray<'a, U16>,
        id_deltas: LazyArray<'a, I16>,
        id_range_offsets: LazyArray<'a, U16>,
        glyph_id_array: LazyArray<'a, U16>,
    },
    Format6 {
        language: u16,
        first_code: u16,
        glyph_id_array: LazyArray<'a, U16>,
    },
    Format10 {
        language: u32,
        start_char_code: u32,
        glyph_id_array: LazyArray<'a, U16>,
    },
    Format12 {
        language: u32,
        groups: LazyArray<'a, SequentialMapGroup>,
    },
    Format13 {
        language: u32,
        groups: LazyArray<'a, SequentialMapGroup>,
    },
    Format14(VariationSelectorTable<'a>),
}

/// Format 12/13 mapping group.
#[derive(Debug, Copy, Clone)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    /// Start glyph for format 12; the single glyph for format 13.
    pub glyph_id: u32,
}

/// Format 14 variation-selector subtable.
pub struct VariationSelectorTable<'a> {
    window: ReadWindow<'a>,
    records: LazyArray<'a, VariationSelectorRecord>,
}

#[derive(Debug, Copy, Clone)]
pub struct VariationSelectorRecord {
    pub var_selector: u32,
    pub default_uvs_offset: u32,
    pub non_default_uvs_offset: u32,
}

impl<'a> FromData<'a> for Cmap<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let version = cursor.read_u16()?;
        cursor.check_version(version == 0)?;
        let num_tables = usize::from(cursor.read_u16()?);
        let encoding_records = cursor.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            window,
            encoding_records,
        })
    }
}

impl<'a> Cmap<'a> {
    /// Find the encoding record for a platform/encoding pair.
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    /// Pick the preferred subtable record.
    pub fn preferred_subtable(&self) -> Option<EncodingRecord> {
        // Full-repertoire Unicode encodings first, then BMP-only.
        const PRIORITY: [(u16, u16); 6] = [(3, 10), (0, 6), (0, 4), (3, 1), (0, 3), (3, 0)];
        for (platform, encoding) in PRIORITY {
            if let Some(record) =
                self.find_subtable(PlatformId(platform), EncodingId(encoding))
            {
                return Some(record);
            }
        }
        None
    }
}

impl<'a> FromRaw<'a> for EncodingRecord {
    type ReadType = (U16, U16, U32);
    fn from_raw((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl<'a> FromRaw<'a> for SequentialMapGroup {
    type ReadType = (U32, U32, U32);
    fn from_raw((start_char_code, end_char_code, glyph_id): (u32, u32, u32)) -> Self {
        SequentialMapGroup {
            start_char_code,
            end_char_code,
            glyph_id,
        }
    }
}

impl<'a> FromRaw<'a> for VariationSelectorRecord {
    type ReadType = (U24, U32, U32);
    fn from_raw((var_selector, default_uvs_offset, non_default_uvs_offset): (u32, u32, u32)) -> Self {
        VariationSelectorRecord {
            var_selector,
            default_uvs_offset,
            non_default_uvs_offset,
        }
    }
}

impl<'a> FromData<'a> for CmapSubtable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let subtable = cursor.window();
        match cursor.read_u16()? {
            0 => {
                let length = cursor.read_u16()?;
                cursor.check(usize::from(length) >= 3 * 2 + 256)?;
                let language = cursor.read_u16()?;
                let glyph_id_array = cursor.read_array::<U8>(256)?;
                Ok(CmapSubtable::Format0 {
                    language,
                    glyph_id_array,
                })
            }
            4 => {
                let length = usize::from(cursor.read_u16()?);
                let language = cursor.read_u16()?;
                let seg_count_x2 = usize::from(cursor.read_u16()?);
                cursor.check(seg_count_x2 > 0 && seg_count_x2 % 2 == 0)?;
                let seg_count = seg_count_x2 / 2;
                let _search_range = cursor.read_u16()?;
                let _entry_selector = cursor.read_u16()?;
                let _range_shift = cursor.read_u16()?;
                let end_codes = cursor.read_array::<U16>(seg_count)?;
                let _reserved_pad = cursor.read_u16()?;
                let start_codes = cursor.read_array::<U16>(seg_count)?;
                let id_deltas = cursor.read_array::<I16>(seg_count)?;
                let id_range_offsets = cursor.read_array::<U16>(seg_count)?;
                // The glyph id array fills whatever remains of the declared
                // length.
                let header_size = (8 + 4 * seg_count) * 2;
                let remaining = length.checked_sub(header_size).ok_or(ParseError::InvalidData)?;
                let glyph_id_array = cursor.read_array_upto::<U16>(remaining / 2)?;
                Ok(CmapSubtable::Format4 {
                    language,
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            6 => {
                let _length = cursor.read_u16()?;
                let language = cursor.read_u16()?;
                let first_code = cursor.read_u16()?;
                let entry_count = usize::from(cursor.read_u16()?);
                let glyph_id_array = cursor.read_array::<U16>(entry_count)?;
                Ok(CmapSubtable::Format6 {
                    language,
                    first_code,
                    glyph_id_array,
                })
            }
            10 => {
                let reserved = cursor.read_u16()?;
                cursor.check(reserved == 0)?;
                let _length = cursor.read_u32()?;
                let language = cursor.read_u32()?;
                let start_char_code = cursor.read_u32()?;
                let num_chars = usize::try_from(cursor.read_u32()?)?;
                let glyph_id_array = cursor.read_array::<U16>(num_chars)?;
                Ok(CmapSubtable::Format10 {
                    language,
                    start_char_code,
                    glyph_id_array,
                })
            }
            format @ (12 | 13) => {
                let reserved = cursor.read_u16()?;
                cursor.check(reserved == 0)?;
                let _length = cursor.read_u32()?;
                let language = cursor.read_u32()?;
                let num_groups = usize::try_from(cursor.read_u32()?)?;
                let groups = cursor.read_array::<SequentialMapGroup>(num_groups)?;
                if format == 12 {
                    Ok(CmapSubtable::Format12 { language, groups })
                } else {
                    Ok(CmapSubtable::Format13 { language, groups })
                }
            }
            14 => {
                let _length = cursor.read_u32()?;
                let num_records = usize::try_from(cursor.read_u32()?)?;
                let records = cursor.read_array::<VariationSelectorRecord>(num_records)?;
                Ok(CmapSubtable::Format14(VariationSelectorTable {
                    window: subtable,
                    records,
                }))
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> CmapSubtable<'a> {
    /// Map a character code to a glyph id.
    ///
    /// Returns `None` when the subtable has no mapping; callers substitute
    /// glyph 0.
    pub fn map_glyph(&self, ch: u32) -> Result<Option<u16>, ParseError> {
        match self {
            CmapSubtable::Format0 { glyph_id_array, .. } => {
                if ch < 256 {
                    let glyph = glyph_id_array.get_item(ch as usize);
                    Ok(some_nonzero(u16::from(glyph)))
                } else {
                    Ok(None)
                }
            }
            CmapSubtable::Format4 {
                end_codes,
                start_codes,
                id_deltas,
                id_range_offsets,
                glyph_id_array,
                ..
            } => {
                if ch > 0xFFFF {
                    return Ok(None);
                }
                let ch = ch as u16;
                // Binary search for the first segment with end_code >= ch.
                let seg_count = end_codes.len();
                let mut lo = 0usize;
                let mut hi = seg_count;
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    if end_codes.get_item(mid) < ch {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                if lo == seg_count {
                    return Ok(None);
                }
                let start_code = start_codes.get_item(lo);
                if ch < start_code {
                    return Ok(None);
                }
                let id_delta = id_deltas.get_item(lo);
                let id_range_offset = id_range_offsets.get_item(lo);
                if id_range_offset == 0 {
                    // deltaGlyphID arithmetic is modulo 65536.
                    Ok(some_nonzero((ch as i32 + i32::from(id_delta)) as u16))
                } else {
                    // The range offset counts bytes from its own position in
                    // the id_range_offsets array to the target glyph id.
                    let index = (usize::from(id_range_offset) / 2
                        + usize::from(ch - start_code)
                        + lo)
                        .checked_sub(seg_count);
                    match index {
                        Some(index) if index < glyph_id_array.len() => {
                            let glyph = glyph_id_array.get_item(index);
                            if glyph == 0 {
                                Ok(None)
                            } else {
                                Ok(some_nonzero(
                                    (i32::from(glyph) + i32::from(id_delta)) as u16,
                                ))
                            }
                        }
                        _ => Ok(None),
                    }
                }
            }
            CmapSubtable::Format6 {
                first_code,
                glyph_id_array,
                ..
            } => {
                let first_code = u32::from(*first_code);
                if ch < first_code {
                    return Ok(None);
                }
                let index = (ch - first_code) as usize;
                if index < glyph_id_array.len() {
                    Ok(some_nonzero(glyph_id_array.get_item(index)))
                } else {
                    Ok(None)
                }
            }
            CmapSubtable::Format10 {
                start_char_code,
                glyph_id_array,
                ..
            } => {
                if ch < *start_char_code {
                    return Ok(None);
                }
                let index = (ch - start_char_code) as usize;
                if index < glyph_id_array.len() {
                    Ok(some_nonzero(glyph_id_array.get_item(index)))
                } else {
                    Ok(None)
                }
            }
            CmapSubtable::Format12 { groups, .. } => {
                for group in groups.iter() {
                    if ch >= group.start_char_code && ch <= group.end_char_code {
                        let glyph =
                            group.glyph_id.checked_add(ch - group.start_char_code);
                        return Ok(glyph
                            .and_then(|glyph| u16::try_from(glyph).ok())
                            .and_then(some_nonzero));
                    }
                }
                Ok(None)
            }
            CmapSubtable::Format13 { groups, .. } => {
                for group in groups.iter() {
                    if ch >= group.start_char_code && ch <= group.end_char_code {
                        return Ok(u16::try_from(group.glyph_id).ok().and_then(some_nonzero));
                    }
                }
                Ok(None)
            }
            CmapSubtable::Format14(_) => Ok(None),
        }
    }
}

fn some_nonzero(glyph: u16) -> Option<u16> {
    if glyph == 0 {
        None
    } else {
        Some(glyph)
    }
}

/// Result of a variation-selector lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlyphVariation {
    /// Use the glyph from the base subtable.
    UseDefault,
    /// Use this specific glyph.
    Glyph(u16),
}

impl<'a> VariationSelectorTable<'a> {
    /// Resolve a (codepoint, variation selector) pair.
    ///
    /// Returns `None` when the pair is absent, in which case the caller falls
    /// back to the base subtable.
    pub fn lookup(
        &self,
        ch: u32,
        variation_selector: u32,
    ) -> Result<Option<GlyphVariation>, ParseError> {
        let record = self
            .records
            .iter()
            .find(|record| record.var_selector == variation_selector);
        let Some(record) = record else {
            return Ok(None);
        };

        if record.non_default_uvs_offset != 0 {
            let window = self
                .window
                .offset(usize::try_from(record.non_default_uvs_offset)?);
            let mut cursor = window.cursor();
            let num_mappings = usize::try_from(cursor.read_u32()?)?;
            for _ in 0..num_mappings {
                let unicode_value = cursor.read_u24()?;
                let glyph_id = cursor.read_u16()?;
                if unicode_value == ch {
                    return Ok(Some(GlyphVariation::Glyph(glyph_id)));
                }
            }
        }

        if record.default_uvs_offset != 0 {
            let window = self
                .window
                .offset(usize::try_from(record.default_uvs_offset)?);
            let mut cursor = window.cursor();
            let num_ranges = usize::try_from(cursor.read_u32()?)?;
            for _ in 0..num_ranges {
                let start_unicode_value = cursor.read_u24()?;
                let additional_count = u32::from(cursor.read_u8()?);
                if ch >= start_unicode_value && ch <= start_unicode_value + additional_count {
                    return Ok(Some(GlyphVariation::UseDefault));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a format 4 subtable from segments of (start, end, id_delta).
    fn format4(segments: &[(u16, u16, i16)]) -> Vec<u8> {
        let seg_count = segments.len() + 1; // plus the required 0xFFFF terminator
        let mut data = Vec::new();
        data.extend_from_slice(&4u16.to_be_bytes());
        let length = (8 + 4 * seg_count) * 2;
        data.extend_from_slice(&(length as u16).to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // language
        data.extend_from_slice(&((seg_count * 2) as u16).to_be_bytes());
        data.extend_from_slice(&[0; 6]); // search_range et al.
        for &(_, end, _) in segments {
            data.extend_from_slice(&end.to_be_bytes());
        }
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // reserved_pad
        for &(start, _, _) in segments {
            data.extend_from_slice(&start.to_be_bytes());
        }
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        for &(_, _, delta) in segments {
            data.extend_from_slice(&delta.to_be_bytes());
        }
        data.extend_from_slice(&1u16.to_be_bytes()); // delta for terminator
        for _ in 0..seg_count {
            data.extend_from_slice(&0u16.to_be_bytes()); // id_range_offsets
        }
        data
    }

    #[test]
    fn format4_segment_lookup() {
        // Hand-tabulated: three segments with deltas placing glyphs
        // contiguously from 1.
        let data = format4(&[(10, 20, -9), (30, 90, -18), (153, 480, -27)]);
        let subtable = ReadWindow::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(subtable.map_glyph(10).unwrap(), Some(1));
        assert_eq!(subtable.map_glyph(20).unwrap(), Some(11));
        assert_eq!(subtable.map_glyph(30).unwrap(), Some(12));
        assert_eq!(subtable.map_glyph(90).unwrap(), Some(72));
        assert_eq!(subtable.map_glyph(153).unwrap(), Some(126));
        assert_eq!(subtable.map_glyph(480).unwrap(), Some(453));
        // Outside every segment.
        assert_eq!(subtable.map_glyph(500).unwrap(), None);
        assert_eq!(subtable.map_glyph(25).unwrap(), None);
        assert_eq!(subtable.map_glyph(5).unwrap(), None);
    }

    #[test]
    fn format0_byte_lookup() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&(262u16).to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        let mut glyph_ids = [0u8; 256];
        glyph_ids[b'A' as usize] = 7;
        data.extend_from_slice(&glyph_ids);
        let subtable = ReadWindow::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(subtable.map_glyph(u32::from(b'A')).unwrap(), Some(7));
        assert_eq!(subtable.map_glyph(u32::from(b'B')).unwrap(), None);
        assert_eq!(subtable.map_glyph(0x1F600).unwrap(), None);
    }

    #[test]
    fn format12_linear_groups() {
        let mut data = Vec::new();
        data.extend_from_slice(&12u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&40u32.to_be_bytes()); // length
        data.extend_from_slice(&0u32.to_be_bytes()); // language
        data.extend_from_slice(&2u32.to_be_bytes()); // num groups
        for (start, end, glyph) in [(0x41u32, 0x5Au32, 1u32), (0x1F600, 0x1F64F, 100)] {
            data.extend_from_slice(&start.to_be_bytes());
            data.extend_from_slice(&end.to_be_bytes());
            data.extend_from_slice(&glyph.to_be_bytes());
        }
        let subtable = ReadWindow::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(subtable.map_glyph(0x41).unwrap(), Some(1));
        assert_eq!(subtable.map_glyph(0x44).unwrap(), Some(4));
        assert_eq!(subtable.map_glyph(0x1F601).unwrap(), Some(101));
        assert_eq!(subtable.map_glyph(0x40).unwrap(), None);
    }

    #[test]
    fn format13_many_to_one() {
        let mut data = Vec::new();
        data.extend_from_slice(&13u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&28u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&0x100u32.to_be_bytes());
        data.extend_from_slice(&0x1FF_u32.to_be_bytes());
        data.extend_from_slice(&42u32.to_be_bytes());
        let subtable = ReadWindow::new(&data).read::<CmapSubtable<'_>>().unwrap();
        assert_eq!(subtable.map_glyph(0x100).unwrap(), Some(42));
        assert_eq!(subtable.map_glyph(0x150).unwrap(), Some(42));
        assert_eq!(subtable.map_glyph(0x1FF).unwrap(), Some(42));
        assert_eq!(subtable.map_glyph(0x200).unwrap(), None);
    }

    #[test]
    fn preferred_subtable_priority() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&2u16.to_be_bytes()); // two records
        for (platform, encoding, offset) in [(3u16, 1u16, 20u32), (3, 10, 28)] {
            data.extend_from_slice(&platform.to_be_bytes());
            data.extend_from_slice(&encoding.to_be_bytes());
            data.extend_from_slice(&offset.to_be_bytes());
        }
        let cmap = ReadWindow::new(&data).read::<Cmap<'_>>().unwrap();
        let preferred = cmap.preferred_subtable().unwrap();
        // (3,10) wins over (3,1)
        assert_eq!(preferred.encoding_id, 10);
        assert_eq!(preferred.offset, 28);
    }
}

//! OpenType font table parsing.

pub mod base;
pub mod cmap;
pub mod colr;
pub mod glyf;
pub mod kern;
pub mod loca;
pub mod os2;

use std::borrow::Cow;
use std::convert::TryFrom;

use rustc_hash::FxHashSet;

use crate::binary::read::{
    CheckIndex, LazyArray, FromData, FromDataWith, ReadCursor, FromRaw, ReadWindow,
};
use crate::binary::{size, Fixed, I16, I64, U16, U32};
use crate::error::ParseError;
use crate::tag;

/// Magic value identifying a CFF font (`OTTO`).
pub const CFF_MAGIC: u32 = tag::OTTO;

/// Magic number identifying TrueType 1.0.
///
/// The version number 1.0 as a 16.16 fixed-point value, indicating TrueType
/// glyph data.
pub const TTF_MAGIC: u32 = 0x00010000;

/// Magic value identifying a TrueType font collection (`ttcf`).
pub const TTCF_MAGIC: u32 = tag::TTCF;

/// Date represented in number of seconds since 12:00 midnight, January 1, 1904.
type LongDateTime = i64;

/// A source of font table data.
pub trait TableProvider {
    /// Return data for the specified table if present.
    fn table_data(&self, tag: u32) -> Result<Option<Cow<'_, [u8]>>, ParseError>;

    fn has_table(&self, tag: u32) -> bool;

    fn read_table_data(&self, tag: u32) -> Result<Cow<'_, [u8]>, ParseError> {
        self.table_data(tag)?.ok_or(ParseError::MissingData)
    }
}

/// Access to the sfnt version a provider was built from.
pub trait SfntVersion {
    fn sfnt_version(&self) -> u32;
}

/// The size of the offsets in the `loca` table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexToLocFormat {
    /// Offsets are 16-bit. The actual local offset divided by 2 is stored.
    Short,
    /// Offsets are 32-bit. The actual local offset is stored.
    Long,
}

/// An sfnt font, either standalone or a collection.
pub struct SfntFont<'a> {
    pub window: ReadWindow<'a>,
    pub data: SfntData<'a>,
}

/// The payload of an [SfntFont].
pub enum SfntData<'a> {
    Single(OffsetTable<'a>),
    Collection(CollectionHeader<'a>),
}

/// TrueType collection header.
pub struct CollectionHeader<'a> {
    pub major_version: u16,
    pub minor_version: u16,
    pub offset_tables: LazyArray<'a, U32>,
}

/// OpenType Offset Table.
#[derive(Clone)]
pub struct OffsetTable<'a> {
    pub sfnt_version: u32,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
    pub table_records: LazyArray<'a, TableRecord>,
}

/// [TableProvider] implementation for a single sfnt font.
pub struct SfntTableProvider<'a> {
    window: ReadWindow<'a>,
    offset_table: Cow<'a, OffsetTable<'a>>,
}

/// An entry in the Offset Table.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Hash)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// `head` table.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct HeadTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub font_revision: Fixed,
    pub check_sum_adjustment: u32,
    pub magic_number: u32,
    pub flags: u16,
    pub units_per_em: u16,
    pub created: LongDateTime,
    pub modified: LongDateTime,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    pub index_to_loc_format: IndexToLocFormat,
    pub glyph_data_format: i16,
}

/// `hhea` horizontal header table.
///
/// This struct is also used for the `vhea` table.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct HheaTable {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub num_h_metrics: u16,
}

/// `hmtx` horizontal metrics table.
///
/// This struct is also used for the `vmtx` table.
#[derive(Debug)]
pub struct HmtxTable<'a> {
    pub h_metrics: LazyArray<'a, LongHorMetric>,
    pub left_side_bearings: LazyArray<'a, I16>,
}

/// A `longHorMetric` record in the `hmtx` table.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct LongHorMetric {
    pub advance_width: u16,
    pub lsb: i16,
}

/// `maxp` table.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct MaxpTable {
    pub num_glyphs: u16,
    /// Extra fields, present if the maxp table is version 1.0.
    pub version1_sub_table: Option<MaxpVersion1SubTable>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct MaxpVersion1SubTable {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

/// `name` table.
pub struct NameTable<'a> {
    pub string_storage: ReadWindow<'a>,
    pub name_records: LazyArray<'a, NameRecord>,
    pub opt_langtag_records: Option<LazyArray<'a, LangTagRecord>>,
}

/// Record within the `name` table.
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub length: u16,
    pub offset: u16,
}

/// Language-tag record within the `name` table.
pub struct LangTagRecord {
    pub length: u16,
    pub offset: u16,
}

impl<'a> SfntFont<'a> {
    /// Number of fonts in this file (1 unless a collection).
    pub fn font_count(&self) -> usize {
        match &self.data {
            SfntData::Single(_) => 1,
            SfntData::Collection(ttc) => ttc.offset_tables.len(),
        }
    }

    pub fn table_provider(
        &'a self,
        index: usize,
    ) -> Result<SfntTableProvider<'a>, ParseError> {
        match &self.data {
            SfntData::Single(offset_table) => Ok(SfntTableProvider {
                offset_table: Cow::Borrowed(offset_table),
                window: self.window.clone(),
            }),
            SfntData::Collection(ttc) => ttc
                .offset_tables
                .check_index(index)
                .map(|()| ttc.offset_tables.get_item(index))
                .and_then(|offset| usize::try_from(offset).map_err(ParseError::from))
                .and_then(|offset| self.window.offset(offset).read::<OffsetTable<'_>>())
                .map(|offset_table| SfntTableProvider {
                    offset_table: Cow::Owned(offset_table),
                    window: self.window.clone(),
                }),
        }
    }
}

impl<'a> FromData<'a> for SfntFont<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let mut peek = cursor.clone();
        let magic = peek.read_u32()?;
        match magic {
            TTF_MAGIC | CFF_MAGIC => {
                let offset_table = cursor.read::<OffsetTable<'_>>()?;
                let font = SfntData::Single(offset_table);
                Ok(SfntFont { window, data: font })
            }
            TTCF_MAGIC => {
                let ttc_header = cursor.read::<CollectionHeader<'_>>()?;
                let font = SfntData::Collection(ttc_header);
                Ok(SfntFont { window, data: font })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> FromData<'a> for CollectionHeader<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let ttc_tag = cursor.read_u32()?;
        match ttc_tag {
            TTCF_MAGIC => {
                let major_version = cursor.read_u16()?;
                let minor_version = cursor.read_u16()?;
                cursor.check_version(major_version == 1 || major_version == 2)?;
                let num_fonts = usize::try_from(cursor.read_u32()?)?;
                let offset_tables = cursor.read_array::<U32>(num_fonts)?;
                // Version 2 adds digital signature fields, which are not used
                // here.
                Ok(CollectionHeader {
                    major_version,
                    minor_version,
                    offset_tables,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> FromData<'a> for OffsetTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let sfnt_version = cursor.read_u32()?;
        match sfnt_version {
            TTF_MAGIC | CFF_MAGIC => {
                let num_tables = cursor.read_u16()?;
                let search_range = cursor.read_u16()?;
                let entry_selector = cursor.read_u16()?;
                let range_shift = cursor.read_u16()?;
                let table_records = cursor.read_array::<TableRecord>(usize::from(num_tables))?;
                // Tags must be unique for the directory to be well formed.
                let mut seen = FxHashSet::default();
                for record in &table_records {
                    if !seen.insert(record.table_tag) {
                        return Err(ParseError::InvalidData);
                    }
                }
                Ok(OffsetTable {
                    sfnt_version,
                    search_range,
                    entry_selector,
                    range_shift,
                    table_records,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> TableProvider for SfntTableProvider<'a> {
    fn table_data(&self, tag: u32) -> Result<Option<Cow<'_, [u8]>>, ParseError> {
        self.offset_table
            .read_table(&self.window, tag)
            .map(|window| window.map(|window| Cow::Borrowed(window.data())))
    }

    fn has_table(&self, tag: u32) -> bool {
        self.offset_table.table_record(tag).is_some()
    }
}

impl<'a> SfntVersion for SfntTableProvider<'a> {
    fn sfnt_version(&self) -> u32 {
        self.offset_table.sfnt_version
    }
}

impl<'a> FromRaw<'a> for TableRecord {
    type ReadType = ((U32, U32), (U32, U32));
    fn from_raw(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl<'a> OffsetTable<'a> {
    pub fn table_record(&self, tag: u32) -> Option<TableRecord> {
        self.table_records
            .iter()
            .find(|table_record| table_record.table_tag == tag)
    }

    pub fn read_table(
        &self,
        window: &ReadWindow<'a>,
        tag: u32,
    ) -> Result<Option<ReadWindow<'a>>, ParseError> {
        if let Some(table_record) = self.table_record(tag) {
            let table = table_record.read_table(window)?;
            Ok(Some(table))
        } else {
            Ok(None)
        }
    }
}

impl TableRecord {
    pub const SIZE: usize = 4 * size::U32;

    pub fn read_table<'a>(&self, window: &ReadWindow<'a>) -> Result<ReadWindow<'a>, ParseError> {
        let offset = usize::try_from(self.offset)?;
        let length = usize::try_from(self.length)?;
        window.offset_length(offset, length)
    }

    /// Compute the table checksum over the record's byte range.
    ///
    /// The `head` table's `checkSumAdjustment` is assumed already zeroed by
    /// the caller when verifying it.
    pub fn calc_checksum(&self, window: &ReadWindow<'_>) -> Result<u32, ParseError> {
        let table = self.read_table(window)?;
        let data = table.data();
        let mut sum = 0u32;
        let mut chunks = data.chunks_exact(4);
        for chunk in &mut chunks {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            sum = sum.wrapping_add(word);
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let mut tail = [0u8; 4];
            tail[..remainder.len()].copy_from_slice(remainder);
            sum = sum.wrapping_add(u32::from_be_bytes(tail));
        }
        Ok(sum)
    }
}

impl<'a> FromData<'a> for HeadTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let major_version = cursor.read::<U16>()?;
        let minor_version = cursor.read::<U16>()?;
        let font_revision = cursor.read::<Fixed>()?;
        let check_sum_adjustment = cursor.read::<U32>()?;
        let magic_number = cursor.read::<U32>()?;
        cursor.check(magic_number == 0x5F0F3CF5)?;
        let flags = cursor.read::<U16>()?;
        let units_per_em = cursor.read::<U16>()?;
        let created = cursor.read::<I64>()?;
        let modified = cursor.read::<I64>()?;
        let x_min = cursor.read::<I16>()?;
        let y_min = cursor.read::<I16>()?;
        let x_max = cursor.read::<I16>()?;
        let y_max = cursor.read::<I16>()?;
        let mac_style = cursor.read::<U16>()?;
        let lowest_rec_ppem = cursor.read::<U16>()?;
        let font_direction_hint = cursor.read::<I16>()?;
        let index_to_loc_format = cursor.read::<IndexToLocFormat>()?;
        let glyph_data_format = cursor.read::<I16>()?;

        Ok(HeadTable {
            major_version,
            minor_version,
            font_revision,
            check_sum_adjustment,
            magic_number,
            flags,
            units_per_em,
            created,
            modified,
            x_min,
            y_min,
            x_max,
            y_max,
            mac_style,
            lowest_rec_ppem,
            font_direction_hint,
            index_to_loc_format,
            glyph_data_format,
        })
    }
}

impl HeadTable {
    pub fn is_bold(&self) -> bool {
        self.mac_style & 1 != 0
    }

    pub fn is_italic(&self) -> bool {
        self.mac_style & 2 != 0
    }
}

impl<'a> FromData<'a> for HheaTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let major_version = cursor.read_u16()?;
        let _minor_version = cursor.read_u16()?;
        cursor.check_version(major_version == 1)?;
        let ascender = cursor.read_i16()?;
        let descender = cursor.read_i16()?;
        let line_gap = cursor.read_i16()?;
        let advance_width_max = cursor.read_u16()?;
        let min_left_side_bearing = cursor.read_i16()?;
        let min_right_side_bearing = cursor.read_i16()?;
        let x_max_extent = cursor.read_i16()?;
        let caret_slope_rise = cursor.read_i16()?;
        let caret_slope_run = cursor.read_i16()?;
        let caret_offset = cursor.read_i16()?;
        let _reserved1 = cursor.read_i16()?;
        let _reserved2 = cursor.read_i16()?;
        let _reserved3 = cursor.read_i16()?;
        let _reserved4 = cursor.read_i16()?;
        let metric_data_format = cursor.read_i16()?;
        cursor.check(metric_data_format == 0)?;
        let num_h_metrics = cursor.read_u16()?;

        Ok(HheaTable {
            ascender,
            descender,
            line_gap,
            advance_width_max,
            min_left_side_bearing,
            min_right_side_bearing,
            x_max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            num_h_metrics,
        })
    }
}

impl<'a> FromDataWith<'a> for HmtxTable<'a> {
    type Args = (usize, usize); // num_glyphs, num_h_metrics
    type Parsed = Self;

    fn read_with(
        cursor: &mut ReadCursor<'a>,
        (num_glyphs, num_h_metrics): (usize, usize),
    ) -> Result<Self, ParseError> {
        let h_metrics = cursor.read_array::<LongHorMetric>(num_h_metrics)?;
        let left_side_bearings =
            cursor.read_array::<I16>(num_glyphs.saturating_sub(num_h_metrics))?;
        Ok(HmtxTable {
            h_metrics,
            left_side_bearings,
        })
    }
}

impl<'a> HmtxTable<'a> {
    /// The advance for `glyph_id`.
    ///
    /// The number of metric records can be less than the number of glyphs, in
    /// which case the advance of the last record applies to all remaining
    /// glyph ids.
    pub fn horizontal_advance(&self, glyph_id: u16) -> Result<u16, ParseError> {
        let num_metrics = self.h_metrics.len();
        let index = if usize::from(glyph_id) < num_metrics {
            usize::from(glyph_id)
        } else {
            num_metrics.checked_sub(1).ok_or(ParseError::IndexOutOfBounds)?
        };

        Ok(self.h_metrics.get_item(index).advance_width)
    }

    /// The left side bearing for `glyph_id`.
    pub fn left_side_bearing(&self, glyph_id: u16) -> Result<i16, ParseError> {
        let glyph_id = usize::from(glyph_id);
        let num_metrics = self.h_metrics.len();
        if glyph_id < num_metrics {
            Ok(self.h_metrics.get_item(glyph_id).lsb)
        } else {
            let index = glyph_id - num_metrics;
            self.left_side_bearings.check_index(index)?;
            Ok(self.left_side_bearings.get_item(index))
        }
    }
}

impl<'a> FromRaw<'a> for LongHorMetric {
    type ReadType = (U16, I16);
    fn from_raw((advance_width, lsb): (u16, i16)) -> Self {
        LongHorMetric { advance_width, lsb }
    }
}

impl<'a> FromData<'a> for MaxpTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let version = cursor.read_u32()?;
        let num_glyphs = cursor.read_u16()?;
        let sub_table = if version == 0x00010000 {
            Some(cursor.read::<MaxpVersion1SubTable>()?)
        } else {
            None
        };
        Ok(MaxpTable {
            num_glyphs,
            version1_sub_table: sub_table,
        })
    }
}

impl<'a> FromData<'a> for MaxpVersion1SubTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let max_points = cursor.read_u16()?;
        let max_contours = cursor.read_u16()?;
        let max_composite_points = cursor.read_u16()?;
        let max_composite_contours = cursor.read_u16()?;
        let max_zones = cursor.read_u16()?;
        let max_twilight_points = cursor.read_u16()?;
        let max_storage = cursor.read_u16()?;
        let max_function_defs = cursor.read_u16()?;
        let max_instruction_defs = cursor.read_u16()?;
        let max_stack_elements = cursor.read_u16()?;
        let max_size_of_instructions = cursor.read_u16()?;
        let max_component_elements = cursor.read_u16()?;
        let max_component_depth = cursor.read_u16()?;

        Ok(MaxpVersion1SubTable {
            max_points,
            max_contours,
            max_composite_points,
            max_composite_contours,
            max_zones,
            max_twilight_points,
            max_storage,
            max_function_defs,
            max_instruction_defs,
            max_stack_elements,
            max_size_of_instructions,
            max_component_elements,
            max_component_depth,
        })
    }
}

impl<'a> FromData<'a> for NameTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();

        let format = cursor.read_u16()?;
        cursor.check(format <= 1)?;
        let count = usize::from(cursor.read_u16()?);
        let string_offset = usize::from(cursor.read_u16()?);
        let string_storage = window.offset(string_offset);
        let name_records = cursor.read_array::<NameRecord>(count)?;
        let opt_langtag_records = if format > 0 {
            let langtag_count = usize::from(cursor.read_u16()?);
            let langtag_records = cursor.read_array::<LangTagRecord>(langtag_count)?;
            Some(langtag_records)
        } else {
            None
        };

        Ok(NameTable {
            string_storage,
            name_records,
            opt_langtag_records,
        })
    }
}

/// Well-known `name` table name ids.
pub mod name_id {
    /// Font family name.
    pub const FAMILY: u16 = 1;
    /// Font subfamily name.
    pub const SUBFAMILY: u16 = 2;
    /// Full font name.
    pub const FULL_NAME: u16 = 4;
    /// PostScript name.
    pub const POSTSCRIPT_NAME: u16 = 6;
}

impl<'a> NameTable<'a> {
    const PLATFORM_UNICODE: u16 = 0;
    const PLATFORM_MACINTOSH: u16 = 1;
    const PLATFORM_WINDOWS: u16 = 3;

    /// Return the best available string for `name_id`.
    ///
    /// Prefers Windows Unicode records, then Unicode platform records, then
    /// Macintosh Roman.
    pub fn string_for_id(&self, name_id: u16) -> Option<String> {
        let mut best: Option<(u8, NameRecord)> = None;
        for record in self.name_records.iter_res().flatten() {
            if record.name_id != name_id {
                continue;
            }
            let rank = match (record.platform_id, record.encoding_id) {
                (Self::PLATFORM_WINDOWS, 10) => 5,
                (Self::PLATFORM_WINDOWS, 1) => 4,
                (Self::PLATFORM_UNICODE, _) => 3,
                (Self::PLATFORM_WINDOWS, 0) => 2,
                (Self::PLATFORM_MACINTOSH, 0) => 1,
                _ => 0,
            };
            if rank > 0 && best.as_ref().map_or(true, |(r, _)| rank > *r) {
                best = Some((rank, record));
            }
        }
        let (rank, record) = best?;
        let offset = usize::from(record.offset);
        let length = usize::from(record.length);
        let data = self.string_storage.offset_length(offset, length).ok()?;
        if rank == 1 {
            let (decoded, _, _) = encoding_rs::MACINTOSH.decode(data.data());
            Some(decoded.into_owned())
        } else {
            let (decoded, _, _) = encoding_rs::UTF_16BE.decode(data.data());
            Some(decoded.into_owned())
        }
    }
}

impl<'a> FromRaw<'a> for NameRecord {
    type ReadType = ((U16, U16, U16), (U16, U16, U16));
    fn from_raw(
        ((platform_id, encoding_id, language_id), (name_id, length, offset)): (
            (u16, u16, u16),
            (u16, u16, u16),
        ),
    ) -> Self {
        NameRecord {
            platform_id,
            encoding_id,
            language_id,
            name_id,
            length,
            offset,
        }
    }
}

impl<'a> FromRaw<'a> for LangTagRecord {
    type ReadType = (U16, U16);
    fn from_raw((length, offset): (u16, u16)) -> Self {
        LangTagRecord { length, offset }
    }
}

impl<'a> FromData<'a> for IndexToLocFormat {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let index_to_loc_format = cursor.read_i16()?;

        match index_to_loc_format {
            0 => Ok(IndexToLocFormat::Short),
            1 => Ok(IndexToLocFormat::Long),
            _ => Err(ParseError::InvalidData),
        }
    }
}

impl<T: TableProvider> TableProvider for Box<T> {
    fn table_data(&self, tag: u32) -> Result<Option<Cow<'_, [u8]>>, ParseError> {
        self.as_ref().table_data(tag)
    }

    fn has_table(&self, tag: u32) -> bool {
        self.as_ref().has_table(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    fn sample_offset_table() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&TTF_MAGIC.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes()); // num_tables
        data.extend_from_slice(&[0; 6]); // search_range, entry_selector, range_shift
        for (tag, offset) in [(crate::tag::CMAP, 44u32), (crate::tag::HEAD, 48u32)] {
            data.extend_from_slice(&tag.to_be_bytes());
            data.extend_from_slice(&0u32.to_be_bytes()); // checksum
            data.extend_from_slice(&offset.to_be_bytes());
            data.extend_from_slice(&4u32.to_be_bytes()); // length
        }
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data
    }

    #[test]
    fn parse_offset_table() {
        let data = sample_offset_table();
        let table = ReadWindow::new(&data).read::<OffsetTable<'_>>().unwrap();
        assert_eq!(table.table_records.len(), 2);
        assert!(table.table_record(crate::tag::CMAP).is_some());
        assert!(table.table_record(crate::tag::GLYF).is_none());
    }

    #[test]
    fn parse_is_deterministic() {
        let data = sample_offset_table();
        let a = ReadWindow::new(&data).read::<OffsetTable<'_>>().unwrap();
        let b = ReadWindow::new(&data).read::<OffsetTable<'_>>().unwrap();
        let records_a: Vec<_> = a.table_records.iter().collect();
        let records_b: Vec<_> = b.table_records.iter().collect();
        assert_eq!(records_a, records_b);
    }

    #[test]
    fn duplicate_tags_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&TTF_MAGIC.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&[0; 6]);
        for _ in 0..2 {
            data.extend_from_slice(&crate::tag::CMAP.to_be_bytes());
            data.extend_from_slice(&[0; 12]);
        }
        assert!(ReadWindow::new(&data).read::<OffsetTable<'_>>().is_err());
    }

    #[test]
    fn unknown_magic_rejected() {
        let data = 0xDEADBEEFu32.to_be_bytes();
        assert!(ReadWindow::new(&data).read::<SfntFont<'_>>().is_err());
    }

    #[test]
    fn hmtx_advance_reuses_last_metric() {
        // Two metrics, four glyphs: glyphs 2 and 3 reuse the second advance.
        let data = [
            0x01, 0xF4, 0x00, 0x0A, // advance 500, lsb 10
            0x02, 0x58, 0x00, 0x14, // advance 600, lsb 20
            0x00, 0x1E, // lsb 30
            0x00, 0x28, // lsb 40
        ];
        let hmtx = ReadWindow::new(&data)
            .read_with::<HmtxTable<'_>>((4, 2))
            .unwrap();
        assert_eq!(hmtx.horizontal_advance(0).unwrap(), 500);
        assert_eq!(hmtx.horizontal_advance(1).unwrap(), 600);
        assert_eq!(hmtx.horizontal_advance(2).unwrap(), 600);
        assert_eq!(hmtx.horizontal_advance(3).unwrap(), 600);
        assert_eq!(hmtx.left_side_bearing(1).unwrap(), 20);
        assert_eq!(hmtx.left_side_bearing(3).unwrap(), 40);
    }
}

//! Parsing of the `BASE` table.
//!
//! Exposes per-script baseline records on the horizontal and vertical axes,
//! enough to answer baseline-offset queries. MinMax extents and device
//! tables are not consulted.

use crate::binary::read::{FromData, ReadCursor, ReadWindow};
use crate::error::ParseError;

/// `BASE` baseline table.
pub struct BaseTable {
    pub horiz_axis: Option<BaseAxis>,
    pub vert_axis: Option<BaseAxis>,
}

/// One axis of the `BASE` table.
pub struct BaseAxis {
    /// Baseline tags, sorted.
    pub baseline_tags: Vec<u32>,
    pub script_records: Vec<BaseScriptRecord>,
}

/// Baseline data for one script.
pub struct BaseScriptRecord {
    pub script_tag: u32,
    /// Index of the default baseline within the axis tag list.
    pub default_baseline_index: u16,
    /// Baseline coordinates, one per axis tag.
    pub coordinates: Vec<i16>,
}

impl<'a> FromData<'a> for BaseTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let table = cursor.window();
        let major_version = cursor.read_u16()?;
        let _minor_version = cursor.read_u16()?;
        cursor.check_version(major_version == 1)?;
        let horiz_axis_offset = usize::from(cursor.read_u16()?);
        let vert_axis_offset = usize::from(cursor.read_u16()?);

        let horiz_axis = if horiz_axis_offset != 0 {
            Some(read_axis(&table.offset(horiz_axis_offset))?)
        } else {
            None
        };
        let vert_axis = if vert_axis_offset != 0 {
            Some(read_axis(&table.offset(vert_axis_offset))?)
        } else {
            None
        };

        Ok(BaseTable {
            horiz_axis,
            vert_axis,
        })
    }
}

fn read_axis(window: &ReadWindow<'_>) -> Result<BaseAxis, ParseError> {
    let mut cursor = window.cursor();
    let base_tag_list_offset = usize::from(cursor.read_u16()?);
    let base_script_list_offset = usize::from(cursor.read_u16()?);

    let baseline_tags = if base_tag_list_offset != 0 {
        let mut tags_cursor = window.offset(base_tag_list_offset).cursor();
        let count = usize::from(tags_cursor.read_u16()?);
        tags_cursor
            .read_array::<crate::binary::U32>(count)?
            .to_vec()
    } else {
        Vec::new()
    };

    let script_list_scope = window.offset(base_script_list_offset);
    let mut list_cursor = script_list_scope.cursor();
    let script_count = usize::from(list_cursor.read_u16()?);
    let mut script_records = Vec::with_capacity(script_count);
    for _ in 0..script_count {
        let script_tag = list_cursor.read_u32()?;
        let script_offset = usize::from(list_cursor.read_u16()?);
        if script_offset == 0 {
            continue;
        }
        let record = read_script(&script_list_scope.offset(script_offset), script_tag)?;
        script_records.push(record);
    }

    Ok(BaseAxis {
        baseline_tags,
        script_records,
    })
}

fn read_script(window: &ReadWindow<'_>, script_tag: u32) -> Result<BaseScriptRecord, ParseError> {
    let mut cursor = window.cursor();
    let base_values_offset = usize::from(cursor.read_u16()?);
    let _default_min_max_offset = cursor.read_u16()?;

    let (default_baseline_index, coordinates) = if base_values_offset != 0 {
        let values_scope = window.offset(base_values_offset);
        let mut values_cursor = values_scope.cursor();
        let default_index = values_cursor.read_u16()?;
        let coord_count = usize::from(values_cursor.read_u16()?);
        let mut coordinates = Vec::with_capacity(coord_count);
        for _ in 0..coord_count {
            let coord_offset = usize::from(values_cursor.read_u16()?);
            let mut coord_cursor = values_scope.offset(coord_offset).cursor();
            let format = coord_cursor.read_u16()?;
            // Formats 2 and 3 extend format 1 with hinting data; the
            // coordinate field is common.
            if !(1..=3).contains(&format) {
                return Err(ParseError::UnknownVersion);
            }
            coordinates.push(coord_cursor.read_i16()?);
        }
        (default_index, coordinates)
    } else {
        (0, Vec::new())
    };

    Ok(BaseScriptRecord {
        script_tag,
        default_baseline_index,
        coordinates,
    })
}

impl BaseTable {
    /// Baseline coordinate for `baseline_tag` in `script_tag` on the
    /// horizontal axis.
    pub fn horizontal_baseline(&self, script_tag: u32, baseline_tag: u32) -> Option<i16> {
        let axis = self.horiz_axis.as_ref()?;
        let tag_index = axis.baseline_tags.iter().position(|&t| t == baseline_tag)?;
        let script = axis
            .script_records
            .iter()
            .find(|record| record.script_tag == script_tag)?;
        script.coordinates.get(tag_index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    #[test]
    fn baseline_lookup() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&8u16.to_be_bytes()); // horiz axis at 8
        data.extend_from_slice(&0u16.to_be_bytes()); // no vert axis
        // axis (offset 8): tag list at 4, script list at 10
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(&10u16.to_be_bytes());
        // tag list (offset 12 abs): one tag `romn`
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&crate::tag!(b"romn").to_be_bytes());
        // script list (offset 18 abs): one script `latn` at offset 8 from list
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&crate::tag::LATN.to_be_bytes());
        data.extend_from_slice(&8u16.to_be_bytes());
        // base script (offset 26 abs): values at 4, no minmax
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        // base values (offset 30 abs): default 0, one coord at offset 6
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&6u16.to_be_bytes());
        // base coord format 1, coordinate -120
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&(-120i16).to_be_bytes());

        let base = ReadWindow::new(&data).read::<BaseTable>().unwrap();
        assert_eq!(
            base.horizontal_baseline(crate::tag::LATN, crate::tag!(b"romn")),
            Some(-120)
        );
        assert_eq!(
            base.horizontal_baseline(crate::tag::ARAB, crate::tag!(b"romn")),
            None
        );
    }
}

//! Parsing of the legacy `kern` table.
//!
//! Only format 0 horizontal subtables are consulted; everything else is
//! skipped. The table is applied as a fallback when GPOS provides no `kern`
//! feature.

use crate::binary::read::{LazyArray, FromData, ReadCursor, FromRaw};
use crate::binary::{I16, U16};
use crate::error::ParseError;

const COVERAGE_HORIZONTAL: u16 = 0x0001;
const COVERAGE_CROSS_STREAM: u16 = 0x0004;
const COVERAGE_FORMAT_MASK: u16 = 0xFF00;

/// `kern` table with its format 0 horizontal subtables.
pub struct KernTable<'a> {
    subtables: Vec<KernSubtableFormat0<'a>>,
}

/// A format 0 kerning subtable: sorted glyph pairs with adjustments.
pub struct KernSubtableFormat0<'a> {
    pairs: LazyArray<'a, KernPair>,
}

#[derive(Debug, Copy, Clone)]
struct KernPair {
    left: u16,
    right: u16,
    value: i16,
}

impl<'a> FromRaw<'a> for KernPair {
    type ReadType = (U16, U16, I16);
    fn from_raw((left, right, value): (u16, u16, i16)) -> Self {
        KernPair { left, right, value }
    }
}

impl<'a> FromData<'a> for KernTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let version = cursor.read_u16()?;
        // Microsoft-style version 0 headers only; the Apple variant (fixed
        // 1.0 version) is not consulted.
        cursor.check_version(version == 0)?;
        let num_tables = cursor.read_u16()?;

        let mut subtables = Vec::new();
        for _ in 0..num_tables {
            let _subtable_version = cursor.read_u16()?;
            let length = usize::from(cursor.read_u16()?);
            let coverage = cursor.read_u16()?;
            let body_length = length.saturating_sub(6);
            let body = cursor.read_window(body_length)?;

            let format = (coverage & COVERAGE_FORMAT_MASK) >> 8;
            let horizontal = coverage & COVERAGE_HORIZONTAL != 0;
            let cross_stream = coverage & COVERAGE_CROSS_STREAM != 0;
            if format != 0 || !horizontal || cross_stream {
                continue;
            }

            let mut body_cursor = body.cursor();
            let num_pairs = usize::from(body_cursor.read_u16()?);
            let _search_range = body_cursor.read_u16()?;
            let _entry_selector = body_cursor.read_u16()?;
            let _range_shift = body_cursor.read_u16()?;
            // Tolerate subtables whose declared pair count exceeds the bytes
            // present.
            let pairs = body_cursor.read_array_upto::<KernPair>(num_pairs)?;
            subtables.push(KernSubtableFormat0 { pairs });
        }

        Ok(KernTable { subtables })
    }
}

impl<'a> KernTable<'a> {
    /// Horizontal kerning adjustment for a glyph pair, if any subtable
    /// defines one.
    pub fn horizontal_kerning(&self, left: u16, right: u16) -> Option<i16> {
        self.subtables
            .iter()
            .find_map(|subtable| subtable.lookup(left, right))
    }
}

impl<'a> KernSubtableFormat0<'a> {
    fn lookup(&self, left: u16, right: u16) -> Option<i16> {
        let key = (u32::from(left) << 16) | u32::from(right);
        let mut lo = 0usize;
        let mut hi = self.pairs.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let pair = self.pairs.get_item(mid);
            let pair_key = (u32::from(pair.left) << 16) | u32::from(pair.right);
            match pair_key.cmp(&key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(pair.value),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    fn kern_table(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // version
        data.extend_from_slice(&1u16.to_be_bytes()); // one subtable
        data.extend_from_slice(&0u16.to_be_bytes()); // subtable version
        let length = 6 + 8 + pairs.len() * 6;
        data.extend_from_slice(&(length as u16).to_be_bytes());
        data.extend_from_slice(&0x0001u16.to_be_bytes()); // horizontal, format 0
        data.extend_from_slice(&(pairs.len() as u16).to_be_bytes());
        data.extend_from_slice(&[0; 6]); // search_range et al.
        for &(left, right, value) in pairs {
            data.extend_from_slice(&left.to_be_bytes());
            data.extend_from_slice(&right.to_be_bytes());
            data.extend_from_slice(&value.to_be_bytes());
        }
        data
    }

    #[test]
    fn pair_lookup() {
        let data = kern_table(&[(1, 2, -50), (1, 5, 12), (3, 2, -8)]);
        let kern = ReadWindow::new(&data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 2), Some(-50));
        assert_eq!(kern.horizontal_kerning(1, 5), Some(12));
        assert_eq!(kern.horizontal_kerning(3, 2), Some(-8));
        assert_eq!(kern.horizontal_kerning(2, 1), None);
    }

    #[test]
    fn vertical_subtables_skipped() {
        let mut data = kern_table(&[(1, 2, -50)]);
        data[12] = 0;
        data[13] = 0; // clear horizontal bit
        let kern = ReadWindow::new(&data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 2), None);
    }
}

//! Parsing of the `loca` table.

use crate::binary::read::{FromDataWith, ReadCursor};
use crate::binary::{U16, U32};
use crate::error::ParseError;
use crate::tables::IndexToLocFormat;

/// `loca` table: offsets of glyph records within `glyf`.
#[derive(Clone, Debug)]
pub struct LocaTable {
    pub offsets: Vec<u32>,
}

impl<'a> FromDataWith<'a> for LocaTable {
    type Args = (u16, IndexToLocFormat);
    type Parsed = Self;

    /// Read a `loca` table from `cursor`.
    ///
    /// * `num_glyphs` comes from `maxp`.
    /// * `index_to_loc_format` comes from `head` and selects short or long
    ///   offsets.
    fn read_with(
        cursor: &mut ReadCursor<'a>,
        (num_glyphs, index_to_loc_format): (u16, IndexToLocFormat),
    ) -> Result<Self, ParseError> {
        let count = usize::from(num_glyphs) + 1;
        let offsets = match index_to_loc_format {
            IndexToLocFormat::Short => {
                // The actual offset divided by 2 is stored.
                cursor.read_array::<U16>(count)?
                    .iter()
                    .map(|offset| u32::from(offset) * 2)
                    .collect()
            }
            IndexToLocFormat::Long => cursor.read_array::<U32>(count)?.to_vec(),
        };

        for window in offsets.windows(2) {
            if window[0] > window[1] {
                return Err(ParseError::InvalidData);
            }
        }

        Ok(LocaTable { offsets })
    }
}

impl LocaTable {
    pub fn empty() -> Self {
        LocaTable { offsets: Vec::new() }
    }

    /// Byte range of `glyph_id` within `glyf`, or `None` for an empty glyph.
    pub fn glyph_range(&self, glyph_id: u16) -> Option<(usize, usize)> {
        let index = usize::from(glyph_id);
        let start = *self.offsets.get(index)? as usize;
        let end = *self.offsets.get(index + 1)? as usize;
        if start == end {
            None
        } else {
            Some((start, end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    #[test]
    fn short_offsets_are_doubled() {
        let data = [0x00, 0x00, 0x00, 0x05, 0x00, 0x05];
        let loca = ReadWindow::new(&data)
            .read_with::<LocaTable>((2, IndexToLocFormat::Short))
            .unwrap();
        assert_eq!(loca.offsets, vec![0, 10, 10]);
        assert_eq!(loca.glyph_range(0), Some((0, 10)));
        assert_eq!(loca.glyph_range(1), None);
    }

    #[test]
    fn decreasing_offsets_rejected() {
        let data = [0x00, 0x08, 0x00, 0x00];
        assert!(ReadWindow::new(&data)
            .read_with::<LocaTable>((1, IndexToLocFormat::Short))
            .is_err());
    }
}

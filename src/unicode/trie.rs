//! Compact two-stage codepoint trie.
//!
//! A [UnicodeTrie] encodes a total function from codepoints to `u32` values
//! over U+0000..U+10FFFF. BMP codepoints resolve through a single index
//! stage; supplementary codepoints go through a two-level index. A repeating
//! tail of identical values above `high_start` is stored once as
//! `high_value`, and invalid input (surrogates, out of range) yields
//! `error_value`.
//!
//! Tries are constructed with [UnicodeTrieBuilder], frozen (which
//! deduplicates data blocks and computes the repeating tail), and are
//! immutable from then on. The frozen form serializes to a big-endian blob
//! with the `Trie` magic and round-trips through [UnicodeTrie::from_bytes].

use rustc_hash::FxHashMap;

use crate::binary::read::{FromData, ReadCursor, ReadWindow};
use crate::error::ParseError;

/// Serialized trie magic: `Trie`.
pub const TRIE_MAGIC: u32 = 0x54726965;
/// Current serialization version.
pub const TRIE_VERSION: u8 = 1;

/// One past the largest valid codepoint.
const CODE_POINT_LIMIT: u32 = 0x11_0000;
/// BMP data blocks hold 64 values.
const BMP_SHIFT: u32 = 6;
const BMP_BLOCK_LEN: usize = 1 << BMP_SHIFT;
/// The BMP index stage is sized at 2048 entries; only the first 1024 are
/// reachable but the remainder keeps the supplementary index base fixed.
const BMP_INDEX_LEN: usize = 2048;
/// Supplementary first-stage granularity: 2048 codepoints per entry.
const SUPP_SHIFT_1: u32 = 11;
/// Supplementary second-stage granularity: 32 codepoints per entry.
const SUPP_SHIFT_2: u32 = 5;
const SUPP_BLOCK_LEN: usize = 1 << SUPP_SHIFT_2;
/// Entries in one second-stage index block.
const INDEX_2_BLOCK_LEN: usize = 1 << (SUPP_SHIFT_1 - SUPP_SHIFT_2);
/// Base of the supplementary first stage within the index array. Entries are
/// addressed as `index[INDEX_2_OFFSET + (cp >> 11)]` so slots below
/// 0x10000 >> 11 are never referenced.
const INDEX_2_OFFSET: usize = BMP_INDEX_LEN;
const INDEX_1_LEN: usize = (CODE_POINT_LIMIT >> SUPP_SHIFT_1) as usize;

#[inline]
fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

/// A frozen codepoint → `u32` lookup table.
pub struct UnicodeTrie {
    high_start: u32,
    high_value: u32,
    error_value: u32,
    index: Vec<u16>,
    data: Vec<u32>,
}

impl UnicodeTrie {
    /// Look up the value for `cp`.
    ///
    /// Invalid codepoints (surrogates or beyond U+10FFFF) return the trie's
    /// error value.
    pub fn get(&self, cp: u32) -> u32 {
        if cp >= CODE_POINT_LIMIT || is_surrogate(cp) {
            return self.error_value;
        }
        if cp >= self.high_start {
            return self.high_value;
        }
        if cp < 0x1_0000 {
            let block = self.index[(cp >> BMP_SHIFT) as usize] as usize;
            self.data[block + (cp as usize & (BMP_BLOCK_LEN - 1))]
        } else {
            let i = self.index[INDEX_2_OFFSET + (cp >> SUPP_SHIFT_1) as usize] as usize;
            let j = self.index
                [i + ((cp >> SUPP_SHIFT_2) as usize & (INDEX_2_BLOCK_LEN - 1))]
                as usize;
            self.data[j + (cp as usize & (SUPP_BLOCK_LEN - 1))]
        }
    }

    /// The value returned for invalid codepoints.
    pub fn error_value(&self) -> u32 {
        self.error_value
    }

    /// Serialize to the canonical big-endian form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24 + 2 * self.index.len() + 4 * self.data.len());
        out.extend_from_slice(&TRIE_MAGIC.to_be_bytes());
        out.push(TRIE_VERSION);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&self.high_start.to_be_bytes());
        out.extend_from_slice(&self.error_value.to_be_bytes());
        out.extend_from_slice(&self.high_value.to_be_bytes());
        out.extend_from_slice(&(self.index.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        for entry in &self.index {
            out.extend_from_slice(&entry.to_be_bytes());
        }
        for value in &self.data {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out
    }

    /// Deserialize a trie previously produced by [UnicodeTrie::to_bytes].
    pub fn from_bytes(data: &[u8]) -> Result<UnicodeTrie, ParseError> {
        ReadWindow::new(data).read::<UnicodeTrie>()
    }
}

impl<'a> FromData<'a> for UnicodeTrie {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let magic = cursor.read_u32()?;
        cursor.check_version(magic == TRIE_MAGIC)?;
        let version = cursor.read_u8()?;
        cursor.check_version(version == TRIE_VERSION)?;
        let _reserved = cursor.read_slice(3)?;
        let high_start = cursor.read_u32()?;
        let error_value = cursor.read_u32()?;
        let high_value = cursor.read_u32()?;
        let index_len = usize::try_from(cursor.read_u32()?)?;
        let data_len = usize::try_from(cursor.read_u32()?)?;
        cursor.check(high_start <= CODE_POINT_LIMIT)?;
        cursor.check(index_len >= INDEX_2_OFFSET + INDEX_1_LEN)?;
        let index = cursor.read_array::<crate::binary::U16>(index_len)?.to_vec();
        let data = cursor.read_array::<crate::binary::U32>(data_len)?.to_vec();
        // Every reachable index entry must land inside the arrays.
        for &entry in index.iter().take(BMP_INDEX_LEN / 2) {
            cursor.check(usize::from(entry) + BMP_BLOCK_LEN <= data.len())?;
        }
        for &entry in &index[INDEX_2_OFFSET..INDEX_2_OFFSET + INDEX_1_LEN] {
            cursor.check(usize::from(entry) == 0 || usize::from(entry) + INDEX_2_BLOCK_LEN <= index.len())?;
        }
        for &entry in &index[INDEX_2_OFFSET + INDEX_1_LEN..] {
            cursor.check(usize::from(entry) + SUPP_BLOCK_LEN <= data.len())?;
        }
        Ok(UnicodeTrie {
            high_start,
            high_value,
            error_value,
            index,
            data,
        })
    }
}

/// Mutable construction side of [UnicodeTrie].
///
/// The builder holds an uncompressed value per codepoint; `freeze` interns
/// identical blocks and computes the repeating tail.
pub struct UnicodeTrieBuilder {
    initial_value: u32,
    error_value: u32,
    values: Vec<u32>,
}

impl UnicodeTrieBuilder {
    /// Create a builder where every codepoint holds `initial_value`.
    pub fn new(initial_value: u32, error_value: u32) -> UnicodeTrieBuilder {
        UnicodeTrieBuilder {
            initial_value,
            error_value,
            values: vec![initial_value; CODE_POINT_LIMIT as usize],
        }
    }

    /// Set a single codepoint's value.
    pub fn set(&mut self, cp: u32, value: u32) {
        if cp < CODE_POINT_LIMIT {
            self.values[cp as usize] = value;
        }
    }

    /// Set `[start, end]` (inclusive) to `value`.
    ///
    /// With `overwrite == false` only cells still holding the initial value
    /// are written.
    pub fn set_range(&mut self, start: u32, end: u32, value: u32, overwrite: bool) {
        if start >= CODE_POINT_LIMIT || start > end {
            return;
        }
        let end = end.min(CODE_POINT_LIMIT - 1);
        for cell in &mut self.values[start as usize..=end as usize] {
            if overwrite || *cell == self.initial_value {
                *cell = value;
            }
        }
    }

    /// Current value for `cp`, as the frozen trie would report it.
    pub fn get(&self, cp: u32) -> u32 {
        if cp >= CODE_POINT_LIMIT || is_surrogate(cp) {
            self.error_value
        } else {
            self.values[cp as usize]
        }
    }

    /// Compact into an immutable [UnicodeTrie].
    pub fn freeze(self) -> Result<UnicodeTrie, ParseError> {
        let high_value = self.values[CODE_POINT_LIMIT as usize - 1];
        // Lowest codepoint from which everything equals the repeating tail,
        // rounded down to first-stage granularity and floored at the BMP
        // boundary so the BMP always resolves through the index.
        let mut high_start = CODE_POINT_LIMIT;
        while high_start > 0x1_0000 && self.values[high_start as usize - 1] == high_value {
            high_start -= 1;
        }
        high_start = (high_start + (1 << SUPP_SHIFT_1) - 1) & !((1 << SUPP_SHIFT_1) - 1);

        let mut index = vec![0u16; INDEX_2_OFFSET + INDEX_1_LEN];
        let mut data: Vec<u32> = Vec::new();
        let mut data_blocks: FxHashMap<Vec<u32>, u16> = FxHashMap::default();
        let mut index_blocks: FxHashMap<Vec<u16>, u16> = FxHashMap::default();

        let mut intern_data =
            |data: &mut Vec<u32>, block: Vec<u32>| -> Result<u16, ParseError> {
                if let Some(&offset) = data_blocks.get(&block) {
                    return Ok(offset);
                }
                let offset = u16::try_from(data.len()).map_err(|_| ParseError::LimitExceeded)?;
                data.extend_from_slice(&block);
                data_blocks.insert(block, offset);
                Ok(offset)
            };

        // BMP stage.
        for block_no in 0..(0x1_0000 >> BMP_SHIFT) {
            let start = block_no << BMP_SHIFT;
            let block = self.values[start..start + BMP_BLOCK_LEN].to_vec();
            index[block_no] = intern_data(&mut data, block)?;
        }

        // Supplementary stages.
        for region in (0x1_0000 >> SUPP_SHIFT_1)..(high_start >> SUPP_SHIFT_1) as usize {
            let mut index2 = Vec::with_capacity(INDEX_2_BLOCK_LEN);
            for sub in 0..INDEX_2_BLOCK_LEN {
                let start = (region << SUPP_SHIFT_1) + (sub << SUPP_SHIFT_2);
                let block = self.values[start..start + SUPP_BLOCK_LEN].to_vec();
                index2.push(intern_data(&mut data, block)?);
            }
            let offset = match index_blocks.get(&index2) {
                Some(&offset) => offset,
                None => {
                    let offset =
                        u16::try_from(index.len()).map_err(|_| ParseError::LimitExceeded)?;
                    index.extend_from_slice(&index2);
                    index_blocks.insert(index2, offset);
                    offset
                }
            };
            index[INDEX_2_OFFSET + region] = offset;
        }

        Ok(UnicodeTrie {
            high_start,
            high_value,
            error_value: self.error_value,
            index,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_values_everywhere() {
        let trie = UnicodeTrieBuilder::new(7, 99).freeze().unwrap();
        assert_eq!(trie.get(0), 7);
        assert_eq!(trie.get(0x41), 7);
        assert_eq!(trie.get(0xFFFF), 7);
        assert_eq!(trie.get(0x10000), 7);
        assert_eq!(trie.get(0x10FFFF), 7);
    }

    #[test]
    fn surrogates_and_out_of_range_yield_error_value() {
        let trie = UnicodeTrieBuilder::new(7, 99).freeze().unwrap();
        assert_eq!(trie.get(0xD800), 99);
        assert_eq!(trie.get(0xDFFF), 99);
        assert_eq!(trie.get(0x110000), 99);
        assert_eq!(trie.get(u32::MAX), 99);
    }

    #[test]
    fn set_range_overwrite_semantics() {
        // Literal scenario from the engine contract.
        let mut builder = UnicodeTrieBuilder::new(10, 666);
        builder.set_range(13, 6665, 7788, false);
        builder.set_range(6000, 6999, 9900, true);
        let trie = builder.freeze().unwrap();
        assert_eq!(trie.get(12), 10);
        assert_eq!(trie.get(13), 7788);
        assert_eq!(trie.get(5999), 7788);
        assert_eq!(trie.get(6000), 9900);
        assert_eq!(trie.get(6999), 9900);
        assert_eq!(trie.get(7000), 10);
        assert_eq!(trie.get(0x110000), 666);
    }

    #[test]
    fn non_overwrite_skips_modified_cells() {
        let mut builder = UnicodeTrieBuilder::new(0, 1);
        builder.set_range(100, 200, 5, true);
        builder.set_range(50, 300, 9, false);
        let trie = builder.freeze().unwrap();
        assert_eq!(trie.get(50), 9);
        assert_eq!(trie.get(150), 5);
        assert_eq!(trie.get(250), 9);
        assert_eq!(trie.get(301), 0);
    }

    #[test]
    fn supplementary_values_survive_freeze() {
        let mut builder = UnicodeTrieBuilder::new(0, 1);
        builder.set_range(0x1F600, 0x1F64F, 42, true);
        builder.set(0x10FFFF, 3);
        let trie = builder.freeze().unwrap();
        assert_eq!(trie.get(0x1F5FF), 0);
        assert_eq!(trie.get(0x1F600), 42);
        assert_eq!(trie.get(0x1F64F), 42);
        assert_eq!(trie.get(0x1F650), 0);
        assert_eq!(trie.get(0x10FFFF), 3);
    }

    #[test]
    fn freeze_matches_builder_for_sampled_range() {
        let mut builder = UnicodeTrieBuilder::new(1, 2);
        builder.set_range(0x300, 0x36F, 10, true);
        builder.set_range(0x600, 0x6FF, 11, true);
        builder.set_range(0x20000, 0x2A6DF, 12, true);
        let expected: Vec<u32> = (0..CODE_POINT_LIMIT).map(|cp| builder.get(cp)).collect();
        let trie = builder.freeze().unwrap();
        for cp in 0..CODE_POINT_LIMIT {
            assert_eq!(trie.get(cp), expected[cp as usize], "cp U+{:04X}", cp);
        }
    }

    #[test]
    fn serialization_round_trip() {
        let mut builder = UnicodeTrieBuilder::new(10, 666);
        builder.set_range(13, 6665, 7788, false);
        builder.set_range(6000, 6999, 9900, true);
        builder.set_range(0x1_0000, 0x1_04FF, 17, true);
        let trie = builder.freeze().unwrap();
        let bytes = trie.to_bytes();
        let restored = UnicodeTrie::from_bytes(&bytes).unwrap();
        for cp in (0..CODE_POINT_LIMIT).step_by(7) {
            assert_eq!(trie.get(cp), restored.get(cp), "cp U+{:04X}", cp);
        }
        assert_eq!(trie.get(0xD805), restored.get(0xD805));
        assert_eq!(restored.to_bytes(), bytes);
    }

    #[test]
    fn serialized_header_layout() {
        let trie = UnicodeTrieBuilder::new(0, 9).freeze().unwrap();
        let bytes = trie.to_bytes();
        assert_eq!(&bytes[0..4], b"Trie");
        assert_eq!(bytes[4], TRIE_VERSION);
        assert_eq!(&bytes[5..8], &[0, 0, 0]);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let trie = UnicodeTrieBuilder::new(0, 9).freeze().unwrap();
        let bytes = trie.to_bytes();
        assert!(UnicodeTrie::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(UnicodeTrie::from_bytes(&bytes[..10]).is_err());
        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(UnicodeTrie::from_bytes(&bad_magic).is_err());
    }
}

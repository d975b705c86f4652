//! Reading of the WOFF font format.

use std::borrow::Cow;
use std::io::Read;

use flate2::bufread::ZlibDecoder;

use crate::binary::read::{LazyArray, FromData, TableBuffer, ReadCursor, FromRaw, ReadWindow};
use crate::binary::U32;
use crate::error::ParseError;
use crate::tables::{TableProvider, SfntVersion};

/// The magic number identifying a WOFF file: `wOFF`.
pub const MAGIC: u32 = 0x774F4646;

/// A parsed WOFF file.
#[derive(Clone)]
pub struct WoffFont<'a> {
    pub window: ReadWindow<'a>,
    pub woff_header: WoffHeader,
    pub table_directory: LazyArray<'a, TableDirectoryEntry>,
}

#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct WoffHeader {
    pub flavor: u32,
    pub length: u32,
    pub num_tables: u16,
    pub total_sfnt_size: u32,
    pub meta_offset: u32,
    pub meta_length: u32,
    pub meta_orig_length: u32,
    pub priv_offset: u32,
    pub priv_length: u32,
}

/// A WOFF table directory entry.
///
/// Carries the compressed length in addition to the sfnt fields; when
/// `comp_length == orig_length` the payload is stored uncompressed.
#[derive(Debug, Clone)]
pub struct TableDirectoryEntry {
    pub tag: u32,
    pub offset: u32,
    pub comp_length: u32,
    pub orig_length: u32,
    pub orig_checksum: u32,
}

impl<'a> WoffFont<'a> {
    /// The "sfnt version" of the wrapped font.
    pub fn flavor(&self) -> u32 {
        self.woff_header.flavor
    }

    /// Decompress and return the extended metadata XML if present.
    pub fn extended_metadata(&self) -> Result<Option<String>, ParseError> {
        let offset = usize::try_from(self.woff_header.meta_offset)?;
        let length = usize::try_from(self.woff_header.meta_length)?;
        if offset == 0 || length == 0 {
            return Ok(None);
        }

        let compressed_metadata = self.window.offset_length(offset, length)?;
        let mut z = ZlibDecoder::new(compressed_metadata.data());
        let mut metadata = String::new();
        z.read_to_string(&mut metadata)
            .map_err(|_err| ParseError::Decompression)?;

        Ok(Some(metadata))
    }

    /// Find the table directory entry for the given `tag`.
    pub fn directory_entry(&self, tag: u32) -> Option<TableDirectoryEntry> {
        self.table_directory
            .iter()
            .find(|table_entry| table_entry.tag == tag)
    }
}

impl<'a> FromData<'a> for WoffFont<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let woff_header = cursor.read::<WoffHeader>()?;
        let table_directory =
            cursor.read_array::<TableDirectoryEntry>(usize::from(woff_header.num_tables))?;
        Ok(WoffFont {
            window,
            woff_header,
            table_directory,
        })
    }
}

impl<'a> TableProvider for WoffFont<'a> {
    fn table_data(&self, tag: u32) -> Result<Option<Cow<'_, [u8]>>, ParseError> {
        self.directory_entry(tag)
            .map(|table_entry| {
                table_entry
                    .read_table(&self.window)
                    .map(|table| table.into_data())
            })
            .transpose()
    }

    fn has_table(&self, tag: u32) -> bool {
        self.directory_entry(tag).is_some()
    }
}

impl<'a> SfntVersion for WoffFont<'a> {
    fn sfnt_version(&self) -> u32 {
        self.flavor()
    }
}

impl<'a> FromData<'a> for WoffHeader {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let signature = cursor.read_u32()?;
        match signature {
            MAGIC => {
                let flavor = cursor.read_u32()?;
                let length = cursor.read_u32()?;
                let num_tables = cursor.read_u16()?;
                let reserved = cursor.read_u16()?;
                // The reserved field MUST be zero; a conforming reader rejects
                // the file otherwise.
                cursor.check(reserved == 0)?;
                let total_sfnt_size = cursor.read_u32()?;
                // majorVersion/minorVersion describe the WOFF file itself and
                // have no effect on loading.
                let _major_version = cursor.read_u16()?;
                let _minor_version = cursor.read_u16()?;
                let meta_offset = cursor.read_u32()?;
                let meta_length = cursor.read_u32()?;
                let meta_orig_length = cursor.read_u32()?;
                let priv_offset = cursor.read_u32()?;
                let priv_length = cursor.read_u32()?;

                Ok(WoffHeader {
                    flavor,
                    length,
                    num_tables,
                    total_sfnt_size,
                    meta_offset,
                    meta_length,
                    meta_orig_length,
                    priv_offset,
                    priv_length,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> FromRaw<'a> for TableDirectoryEntry {
    type ReadType = ((U32, U32, U32), (U32, U32));
    fn from_raw(
        ((tag, offset, comp_length), (orig_length, orig_checksum)): ((u32, u32, u32), (u32, u32)),
    ) -> Self {
        TableDirectoryEntry {
            tag,
            offset,
            comp_length,
            orig_length,
            orig_checksum,
        }
    }
}

impl TableDirectoryEntry {
    fn is_compressed(&self) -> bool {
        self.comp_length != self.orig_length
    }

    /// Read and uncompress the contents of a table entry.
    ///
    /// Inflating must produce exactly `orig_length` bytes.
    pub fn read_table<'a>(&self, window: &ReadWindow<'a>) -> Result<TableBuffer<'a>, ParseError> {
        let offset = usize::try_from(self.offset)?;
        let length = usize::try_from(self.comp_length)?;
        let table_data = window.offset_length(offset, length)?;

        if self.is_compressed() {
            let mut z = ZlibDecoder::new(table_data.data());
            let mut uncompressed = Vec::new();
            z.read_to_end(&mut uncompressed)
                .map_err(|_err| ParseError::Decompression)?;
            if uncompressed.len() != usize::try_from(self.orig_length)? {
                return Err(ParseError::Decompression);
            }

            Ok(TableBuffer::from(uncompressed))
        } else {
            Ok(TableBuffer::from(table_data.data()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn woff_header_bytes(num_tables: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC.to_be_bytes());
        data.extend_from_slice(&crate::tables::TTF_MAGIC.to_be_bytes()); // flavor
        data.extend_from_slice(&44u32.to_be_bytes()); // length
        data.extend_from_slice(&num_tables.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // reserved
        data.extend_from_slice(&12u32.to_be_bytes()); // total_sfnt_size
        data.extend_from_slice(&[0; 4]); // major/minor version
        data.extend_from_slice(&[0; 20]); // meta/priv fields
        data
    }

    #[test]
    fn parse_header() {
        let data = woff_header_bytes(0);
        let woff = ReadWindow::new(&data).read::<WoffFont<'_>>().unwrap();
        assert_eq!(woff.flavor(), crate::tables::TTF_MAGIC);
        assert_eq!(woff.table_directory.len(), 0);
    }

    #[test]
    fn nonzero_reserved_rejected() {
        let mut data = woff_header_bytes(0);
        data[14] = 1;
        assert!(ReadWindow::new(&data).read::<WoffFont<'_>>().is_err());
    }

    #[test]
    fn stored_table_read_verbatim() {
        let mut data = woff_header_bytes(1);
        let payload = *b"abcd";
        let offset = (data.len() + 20) as u32;
        data.extend_from_slice(&crate::tag::CMAP.to_be_bytes());
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&4u32.to_be_bytes()); // comp_length
        data.extend_from_slice(&4u32.to_be_bytes()); // orig_length
        data.extend_from_slice(&0u32.to_be_bytes()); // checksum
        data.extend_from_slice(&payload);

        let woff = ReadWindow::new(&data).read::<WoffFont<'_>>().unwrap();
        let table = woff.table_data(crate::tag::CMAP).unwrap().unwrap();
        assert_eq!(&*table, b"abcd");
        assert!(!woff.has_table(crate::tag::GLYF));
    }
}

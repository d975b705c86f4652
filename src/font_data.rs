//! Top-level font file representation.

use std::borrow::Cow;

use crate::binary::read::{FromData, ReadCursor};
use crate::error::{FontError, ParseError};
use crate::tables::{
    TableProvider, SfntFont, SfntVersion, CFF_MAGIC, TTCF_MAGIC, TTF_MAGIC,
};
use crate::woff::{self, WoffFont};
use crate::woff2::{self, Woff2Font};

/// Type that can represent any of the supported font formats.
pub enum FontData<'a> {
    OpenType(SfntFont<'a>),
    Woff(WoffFont<'a>),
    Woff2(Woff2Font<'a>),
}

/// Generic implementation of the `TableProvider` trait.
pub struct DynamicTableProvider<'a> {
    sfnt_version: u32,
    provider: Box<dyn TableProvider + 'a>,
}

impl<'a> FromData<'a> for FontData<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let mut peek = cursor.clone();
        let magic = peek.read_u32()?;
        match magic {
            TTF_MAGIC | CFF_MAGIC | TTCF_MAGIC => {
                Ok(FontData::OpenType(SfntFont::read(cursor)?))
            }
            woff::MAGIC => Ok(FontData::Woff(WoffFont::read(cursor)?)),
            woff2::MAGIC => Ok(FontData::Woff2(Woff2Font::read(cursor)?)),
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> FontData<'a> {
    /// Parse a font file, mapping unknown magic to
    /// [FontError::UnsupportedFontFormat].
    pub fn parse(data: &'a [u8]) -> Result<FontData<'a>, FontError> {
        let window = crate::binary::read::ReadWindow::new(data);
        let mut peek = window.cursor();
        let magic = peek
            .read_u32()
            .map_err(|_| FontError::InvalidFontFile(ParseError::UnexpectedEnd))?;
        match magic {
            TTF_MAGIC | CFF_MAGIC | TTCF_MAGIC | woff::MAGIC | woff2::MAGIC => window
                .read::<FontData<'_>>()
                .map_err(FontError::InvalidFontFile),
            _ => Err(FontError::UnsupportedFontFormat(magic)),
        }
    }

    /// Number of fonts in the file (1 unless a collection).
    pub fn font_count(&self) -> usize {
        match self {
            FontData::OpenType(font) => font.font_count(),
            FontData::Woff(_) => 1,
            FontData::Woff2(font) => font.font_count(),
        }
    }

    /// Obtain an implementation of `TableProvider` for font `index`.
    pub fn table_provider(
        &'a self,
        index: usize,
    ) -> Result<DynamicTableProvider<'a>, ParseError> {
        match self {
            FontData::OpenType(font) => {
                let provider = font.table_provider(index)?;
                Ok(DynamicTableProvider {
                    sfnt_version: provider.sfnt_version(),
                    provider: Box::new(provider),
                })
            }
            FontData::Woff(font) => {
                // The clone is cheap: the font mostly holds borrowed data.
                Ok(DynamicTableProvider {
                    sfnt_version: font.sfnt_version(),
                    provider: Box::new(font.clone()),
                })
            }
            FontData::Woff2(font) => {
                let provider = font.table_provider(index)?;
                Ok(DynamicTableProvider {
                    sfnt_version: provider.sfnt_version(),
                    provider: Box::new(provider),
                })
            }
        }
    }
}

impl<'a> TableProvider for DynamicTableProvider<'a> {
    fn table_data(&self, tag: u32) -> Result<Option<Cow<'_, [u8]>>, ParseError> {
        self.provider.table_data(tag)
    }

    fn has_table(&self, tag: u32) -> bool {
        self.provider.has_table(tag)
    }
}

impl<'a> SfntVersion for DynamicTableProvider<'a> {
    fn sfnt_version(&self) -> u32 {
        self.sfnt_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_magic_is_reported() {
        let data = 0x12345678u32.to_be_bytes();
        match FontData::parse(&data) {
            Err(FontError::UnsupportedFontFormat(magic)) => assert_eq!(magic, 0x12345678),
            other => panic!("expected UnsupportedFontFormat, got {:?}", other.err()),
        }
    }

    #[test]
    fn short_file_is_invalid() {
        assert!(matches!(
            FontData::parse(&[0x00]),
            Err(FontError::InvalidFontFile(_))
        ));
    }
}

//! `post` table parsing.

use std::str;

use crate::binary::read::{LazyArray, FromData, ReadCursor};
use crate::binary::U16;
use crate::error::ParseError;

/// `post` PostScript table.
pub struct PostTable<'a> {
    pub header: Header,
    /// Present for version 2.0 tables.
    pub opt_sub_table: Option<SubTable<'a>>,
}

#[allow(missing_docs)]
pub struct Header {
    pub version: i32,
    pub italic_angle: i32,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: u32,
    pub min_mem_type_42: u32,
    pub max_mem_type_42: u32,
    pub min_mem_type_1: u32,
    pub max_mem_type_1: u32,
}

/// Version 2.0 glyph name data.
pub struct SubTable<'a> {
    pub num_glyphs: u16,
    pub glyph_name_index: LazyArray<'a, U16>,
    pub names: Vec<PascalString<'a>>,
}

/// A length-prefixed name string.
#[derive(Clone)]
pub struct PascalString<'a> {
    pub bytes: &'a [u8],
}

impl<'a> FromData<'a> for Header {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let version = cursor.read_i32()?;
        let italic_angle = cursor.read_i32()?;
        let underline_position = cursor.read_i16()?;
        let underline_thickness = cursor.read_i16()?;
        let is_fixed_pitch = cursor.read_u32()?;
        let min_mem_type_42 = cursor.read_u32()?;
        let max_mem_type_42 = cursor.read_u32()?;
        let min_mem_type_1 = cursor.read_u32()?;
        let max_mem_type_1 = cursor.read_u32()?;

        Ok(Header {
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            min_mem_type_42,
            max_mem_type_42,
            min_mem_type_1,
            max_mem_type_1,
        })
    }
}

impl<'a> FromData<'a> for PostTable<'a> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let header = cursor.read::<Header>()?;
        let opt_sub_table = match header.version {
            0x00020000 => {
                let num_glyphs = cursor.read_u16()?;
                let glyph_name_index = cursor.read_array::<U16>(usize::from(num_glyphs))?;
                let mut names = Vec::new();
                while cursor.bytes_available() {
                    let length = usize::from(cursor.read_u8()?);
                    let bytes = cursor.read_slice(length)?;
                    names.push(PascalString { bytes });
                }
                Some(SubTable {
                    num_glyphs,
                    glyph_name_index,
                    names,
                })
            }
            // 1.0 implies the standard Macintosh order; 3.0 carries no names.
            _ => None,
        };

        Ok(PostTable {
            header,
            opt_sub_table,
        })
    }
}

impl<'a> PostTable<'a> {
    /// The PostScript name of `glyph_id`, if the table defines one.
    pub fn glyph_name(&self, glyph_id: u16) -> Result<Option<&str>, ParseError> {
        match (self.header.version, &self.opt_sub_table) {
            (0x00010000, _) => Ok(macintosh_standard_name(glyph_id)),
            (_, Some(sub_table)) => {
                if glyph_id >= sub_table.num_glyphs {
                    return Ok(None);
                }
                let index = sub_table.glyph_name_index.get_item(usize::from(glyph_id));
                if index < 258 {
                    Ok(macintosh_standard_name(index))
                } else {
                    let name_index = usize::from(index - 258);
                    match sub_table.names.get(name_index) {
                        Some(name) => str::from_utf8(name.bytes)
                            .map(Some)
                            .map_err(|_| ParseError::InvalidData),
                        None => Err(ParseError::IndexOutOfBounds),
                    }
                }
            }
            _ => Ok(None),
        }
    }
}

/// Name from the standard Macintosh glyph order.
fn macintosh_standard_name(index: u16) -> Option<&'static str> {
    MACINTOSH_NAMES.get(usize::from(index)).copied()
}

#[rustfmt::skip]
const MACINTOSH_NAMES: [&str; 258] = [
    ".notdef", ".null", "nonmarkingreturn", "space", "exclam", "quotedbl",
    "numbersign", "dollar", "percent", "ampersand", "quotesingle",
    "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen",
    "period", "slash", "zero", "one", "two", "three", "four", "five", "six",
    "seven", "eight", "nine", "colon", "semicolon", "less", "equal",
    "greater", "question", "at", "A", "B", "C", "D", "E", "F", "G", "H",
    "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V",
    "W", "X", "Y", "Z", "bracketleft", "backslash", "bracketright",
    "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e", "f", "g",
    "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u",
    "v", "w", "x", "y", "z", "braceleft", "bar", "braceright", "asciitilde",
    "Adieresis", "Aring", "Ccedilla", "Eacute", "Ntilde", "Odieresis",
    "Udieresis", "aacute", "agrave", "acircumflex", "adieresis", "atilde",
    "aring", "ccedilla", "eacute", "egrave", "ecircumflex", "edieresis",
    "iacute", "igrave", "icircumflex", "idieresis", "ntilde", "oacute",
    "ograve", "ocircumflex", "odieresis", "otilde", "uacute", "ugrave",
    "ucircumflex", "udieresis", "dagger", "degree", "cent", "sterling",
    "section", "bullet", "paragraph", "germandbls", "registered",
    "copyright", "trademark", "acute", "dieresis", "notequal", "AE",
    "Oslash", "infinity", "plusminus", "lessequal", "greaterequal", "yen",
    "mu", "partialdiff", "summation", "product", "pi", "integral",
    "ordfeminine", "ordmasculine", "Omega", "ae", "oslash", "questiondown",
    "exclamdown", "logicalnot", "radical", "florin", "approxequal",
    "Delta", "guillemotleft", "guillemotright", "ellipsis", "nonbreakingspace",
    "Agrave", "Atilde", "Otilde", "OE", "oe", "endash", "emdash",
    "quotedblleft", "quotedblright", "quoteleft", "quoteright", "divide",
    "lozenge", "ydieresis", "Ydieresis", "fraction", "currency",
    "guilsinglleft", "guilsinglright", "fi", "fl", "daggerdbl",
    "periodcentered", "quotesinglbase", "quotedblbase", "perthousand",
    "Acircumflex", "Ecircumflex", "Aacute", "Edieresis", "Egrave",
    "Iacute", "Icircumflex", "Idieresis", "Igrave", "Oacute",
    "Ocircumflex", "apple", "Ograve", "Uacute", "Ucircumflex", "Ugrave",
    "dotlessi", "circumflex", "tilde", "macron", "breve", "dotaccent",
    "ring", "cedilla", "hungarumlaut", "ogonek", "caron", "Lslash",
    "lslash", "Scaron", "scaron", "Zcaron", "zcaron", "brokenbar", "Eth",
    "eth", "Yacute", "yacute", "Thorn", "thorn", "minus", "multiply",
    "onesuperior", "twosuperior", "threesuperior", "onehalf", "onequarter",
    "threequarters", "franc", "Gbreve", "gbreve", "Idotaccent", "Scedilla",
    "scedilla", "Cacute", "cacute", "Ccaron", "ccaron", "dcroat",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    fn header_bytes(version: i32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&version.to_be_bytes());
        data.extend_from_slice(&[0; 28]);
        data
    }

    #[test]
    fn version_1_uses_standard_order() {
        let data = header_bytes(0x00010000);
        let post = ReadWindow::new(&data).read::<PostTable<'_>>().unwrap();
        assert_eq!(post.glyph_name(0).unwrap(), Some(".notdef"));
        assert_eq!(post.glyph_name(3).unwrap(), Some("space"));
        assert_eq!(post.glyph_name(36).unwrap(), Some("A"));
    }

    #[test]
    fn version_2_custom_names() {
        let mut data = header_bytes(0x00020000);
        data.extend_from_slice(&2u16.to_be_bytes()); // num glyphs
        data.extend_from_slice(&0u16.to_be_bytes()); // glyph 0 -> .notdef
        data.extend_from_slice(&258u16.to_be_bytes()); // glyph 1 -> first custom
        data.push(5);
        data.extend_from_slice(b"alpha");
        let post = ReadWindow::new(&data).read::<PostTable<'_>>().unwrap();
        assert_eq!(post.glyph_name(0).unwrap(), Some(".notdef"));
        assert_eq!(post.glyph_name(1).unwrap(), Some("alpha"));
        assert_eq!(post.glyph_name(2).unwrap(), None);
    }

    #[test]
    fn version_3_has_no_names() {
        let data = header_bytes(0x00030000);
        let post = ReadWindow::new(&data).read::<PostTable<'_>>().unwrap();
        assert_eq!(post.glyph_name(0).unwrap(), None);
    }
}

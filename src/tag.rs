//! OpenType tag utilities and the tag constants this crate consumes.

use crate::error::ParseError;
use std::{fmt, str};

/// Build a 4-byte OpenType tag from a byte string.
///
/// Example:
///
/// ```
/// use typeline::tag;
/// assert_eq!(tag!(b"glyf"), 0x676C7966);
/// ```
#[macro_export]
macro_rules! tag {
    ($w:expr) => {
        $crate::tag::tag_from_bytes(*$w)
    };
}

macro_rules! tags {
    ($($name:ident = $bytes:literal;)*) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` tag.")]
            pub const $name: u32 = tag!($bytes);
        )*
    };
}

#[doc(hidden)]
pub const fn tag_from_bytes(chars: [u8; 4]) -> u32 {
    (chars[3] as u32)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

/// Parse a tag from up to four ASCII characters, space padded.
pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::InvalidData);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::InvalidData);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

/// Wrapper that renders a tag as text (or hex when not printable ASCII).
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            // All four bytes are printable ASCII at this point.
            str::from_utf8(&bytes).unwrap().fmt(f)
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

// Table tags.
tags! {
    BASE = b"BASE";
    CFF = b"CFF ";
    CFF2 = b"CFF2";
    COLR = b"COLR";
    CPAL = b"CPAL";
    GDEF = b"GDEF";
    GPOS = b"GPOS";
    GSUB = b"GSUB";
    OS_2 = b"OS/2";
    OTTO = b"OTTO";
    CMAP = b"cmap";
    CVT = b"cvt ";
    FPGM = b"fpgm";
    GLYF = b"glyf";
    HEAD = b"head";
    HHEA = b"hhea";
    HMTX = b"hmtx";
    KERN = b"kern";
    LOCA = b"loca";
    MAXP = b"maxp";
    NAME = b"name";
    POST = b"post";
    PREP = b"prep";
    TTCF = b"ttcf";
    VHEA = b"vhea";
    VMTX = b"vmtx";
}

// Script tags.
tags! {
    DFLT = b"DFLT";
    ARAB = b"arab";
    BENG = b"beng";
    CYRL = b"cyrl";
    DEVA = b"deva";
    GREK = b"grek";
    GUJR = b"gujr";
    GURU = b"guru";
    HEBR = b"hebr";
    KHMR = b"khmr";
    KNDA = b"knda";
    LAO = b"lao ";
    LATN = b"latn";
    MLYM = b"mlym";
    MYMR = b"mymr";
    ORYA = b"orya";
    SINH = b"sinh";
    SYRC = b"syrc";
    TAML = b"taml";
    TELU = b"telu";
    THAI = b"thai";
}

// Feature tags.
tags! {
    ABVM = b"abvm";
    ABVS = b"abvs";
    AKHN = b"akhn";
    BLWF = b"blwf";
    BLWM = b"blwm";
    BLWS = b"blws";
    CALT = b"calt";
    CCMP = b"ccmp";
    CJCT = b"cjct";
    CLIG = b"clig";
    CURS = b"curs";
    DIST = b"dist";
    FINA = b"fina";
    HALF = b"half";
    HALN = b"haln";
    INIT = b"init";
    ISOL = b"isol";
    KERN_FEATURE = b"kern";
    LIGA = b"liga";
    LOCL = b"locl";
    MARK = b"mark";
    MEDI = b"medi";
    MKMK = b"mkmk";
    NUKT = b"nukt";
    PREF = b"pref";
    PRES = b"pres";
    PSTF = b"pstf";
    PSTS = b"psts";
    RLIG = b"rlig";
    RPHF = b"rphf";
    VATU = b"vatu";
    VERT = b"vert";
    VRT2 = b"vrt2";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_macro() {
        assert_eq!(tag!(b"cmap"), 0x636D6170);
    }

    #[test]
    fn display_ascii_tag() {
        assert_eq!(&DisplayTag(NAME).to_string(), "name");
    }

    #[test]
    fn display_non_ascii_tag() {
        assert_eq!(&DisplayTag(0x12345678).to_string(), "0x12345678");
    }

    #[test]
    fn tag_from_string_pads_with_spaces() {
        assert_eq!(from_string("lao").unwrap(), tag!(b"lao "));
    }
}

//! Error types.
//!
//! Errors are tiered: [ParseError] is produced while decoding binary data,
//! [ShapingError] while applying OpenType layout, and [FontError] is the
//! surface type callers see, carrying the offending tag, codepoint, or value
//! as structured data.

use std::fmt;

use crate::binary::read::UnexpectedEof;
use crate::tag::DisplayTag;

/// Errors that originate when parsing binary data.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    UnexpectedEnd,
    InvalidData,
    UnknownVersion,
    OffsetOutOfBounds,
    IndexOutOfBounds,
    LimitExceeded,
    MissingData,
    Decompression,
    NoSuitableCmap,
    Unsupported,
}

impl From<UnexpectedEof> for ParseError {
    fn from(_error: UnexpectedEof) -> Self {
        ParseError::UnexpectedEnd
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::InvalidData
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEnd => write!(f, "unexpected end of data"),
            ParseError::InvalidData => write!(f, "malformed data"),
            ParseError::UnknownVersion => write!(f, "unrecognised version"),
            ParseError::OffsetOutOfBounds => write!(f, "offset out of bounds"),
            ParseError::IndexOutOfBounds => write!(f, "index out of bounds"),
            ParseError::LimitExceeded => write!(f, "processing limit exceeded"),
            ParseError::MissingData => write!(f, "required data absent"),
            ParseError::Decompression => write!(f, "decompression failed"),
            ParseError::NoSuitableCmap => write!(f, "no usable cmap subtable"),
            ParseError::Unsupported => write!(f, "construct not supported"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Error returned from shaping and layout functions.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ShapingError {
    EmptyBuffer,
    MissingBaseConsonant,
    UnexpectedGlyphSource,
    Parse(ParseError),
}

impl From<ParseError> for ShapingError {
    fn from(error: ParseError) -> Self {
        ShapingError::Parse(error)
    }
}

impl From<std::num::TryFromIntError> for ShapingError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ShapingError::Parse(ParseError::InvalidData)
    }
}

impl fmt::Display for ShapingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapingError::EmptyBuffer => write!(f, "shaping: empty buffer"),
            ShapingError::MissingBaseConsonant => write!(f, "shaping: missing base consonant"),
            ShapingError::UnexpectedGlyphSource => write!(f, "shaping: unexpected glyph origin"),
            ShapingError::Parse(err) => write!(f, "shaping parse: {}", err),
        }
    }
}

impl std::error::Error for ShapingError {}

/// Errors surfaced at the crate boundary.
///
/// Each variant carries the offending tag, codepoint, or raw value so callers
/// can act on errors without string matching.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum FontError {
    /// The byte stream is not a well-formed font container.
    InvalidFontFile(ParseError),
    /// A table the engine requires is absent.
    MissingFontTable(u32),
    /// A table was present but failed to parse.
    InvalidFontTable(u32, ParseError),
    /// The container magic is not one of the supported formats.
    UnsupportedFontFormat(u32),
    /// No glyph mapping exists for the codepoint and lookup was strict.
    GlyphNotFound(u32),
    /// A value outside U+0000..U+10FFFF or in the surrogate range was used as
    /// a codepoint.
    InvalidCodePoint(u32),
}

impl FontError {
    pub(crate) fn invalid_table(tag: u32) -> impl FnOnce(ParseError) -> FontError {
        move |err| FontError::InvalidFontTable(tag, err)
    }
}

impl From<ParseError> for FontError {
    fn from(error: ParseError) -> Self {
        FontError::InvalidFontFile(error)
    }
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::InvalidFontFile(err) => write!(f, "invalid font file: {}", err),
            FontError::MissingFontTable(tag) => {
                write!(f, "font is missing '{}' table", DisplayTag(*tag))
            }
            FontError::InvalidFontTable(tag, err) => {
                write!(f, "invalid '{}' table: {}", DisplayTag(*tag), err)
            }
            FontError::UnsupportedFontFormat(magic) => {
                write!(f, "unsupported font format 0x{:08x}", magic)
            }
            FontError::GlyphNotFound(cp) => write!(f, "no glyph for U+{:04X}", cp),
            FontError::InvalidCodePoint(value) => {
                write!(f, "invalid code point value 0x{:x}", value)
            }
        }
    }
}

impl std::error::Error for FontError {}

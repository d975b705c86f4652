//! Unicode property oracles.
//!
//! Each property is served through a [UnicodeTrie] singleton built once per
//! process. The tries are populated from the ecosystem property crates so the
//! data tracks their Unicode version; [property_tables] is the only way at
//! them, letting tests substitute alternate tables.

use lazy_static::lazy_static;

use crate::unicode::trie::{UnicodeTrie, UnicodeTrieBuilder};

/// General category of a codepoint (Unicode `gc`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum GeneralCategory {
    UppercaseLetter = 0,
    LowercaseLetter,
    TitlecaseLetter,
    ModifierLetter,
    OtherLetter,
    NonspacingMark,
    SpacingMark,
    EnclosingMark,
    DecimalNumber,
    LetterNumber,
    OtherNumber,
    ConnectorPunctuation,
    DashPunctuation,
    OpenPunctuation,
    ClosePunctuation,
    InitialPunctuation,
    FinalPunctuation,
    OtherPunctuation,
    MathSymbol,
    CurrencySymbol,
    ModifierSymbol,
    OtherSymbol,
    SpaceSeparator,
    LineSeparator,
    ParagraphSeparator,
    Control,
    Format,
    Surrogate,
    PrivateUse,
    Unassigned,
}

impl GeneralCategory {
    fn from_u32(value: u32) -> GeneralCategory {
        use GeneralCategory::*;
        match value {
            0 => UppercaseLetter,
            1 => LowercaseLetter,
            2 => TitlecaseLetter,
            3 => ModifierLetter,
            4 => OtherLetter,
            5 => NonspacingMark,
            6 => SpacingMark,
            7 => EnclosingMark,
            8 => DecimalNumber,
            9 => LetterNumber,
            10 => OtherNumber,
            11 => ConnectorPunctuation,
            12 => DashPunctuation,
            13 => OpenPunctuation,
            14 => ClosePunctuation,
            15 => InitialPunctuation,
            16 => FinalPunctuation,
            17 => OtherPunctuation,
            18 => MathSymbol,
            19 => CurrencySymbol,
            20 => ModifierSymbol,
            21 => OtherSymbol,
            22 => SpaceSeparator,
            23 => LineSeparator,
            24 => ParagraphSeparator,
            25 => Control,
            26 => Format,
            27 => Surrogate,
            28 => PrivateUse,
            _ => Unassigned,
        }
    }

    fn of(ch: char) -> GeneralCategory {
        use unicode_general_category::{get_general_category, GeneralCategory as Gc};
        match get_general_category(ch) {
            Gc::UppercaseLetter => GeneralCategory::UppercaseLetter,
            Gc::LowercaseLetter => GeneralCategory::LowercaseLetter,
            Gc::TitlecaseLetter => GeneralCategory::TitlecaseLetter,
            Gc::ModifierLetter => GeneralCategory::ModifierLetter,
            Gc::OtherLetter => GeneralCategory::OtherLetter,
            Gc::NonspacingMark => GeneralCategory::NonspacingMark,
            Gc::SpacingMark => GeneralCategory::SpacingMark,
            Gc::EnclosingMark => GeneralCategory::EnclosingMark,
            Gc::DecimalNumber => GeneralCategory::DecimalNumber,
            Gc::LetterNumber => GeneralCategory::LetterNumber,
            Gc::OtherNumber => GeneralCategory::OtherNumber,
            Gc::ConnectorPunctuation => GeneralCategory::ConnectorPunctuation,
            Gc::DashPunctuation => GeneralCategory::DashPunctuation,
            Gc::OpenPunctuation => GeneralCategory::OpenPunctuation,
            Gc::ClosePunctuation => GeneralCategory::ClosePunctuation,
            Gc::InitialPunctuation => GeneralCategory::InitialPunctuation,
            Gc::FinalPunctuation => GeneralCategory::FinalPunctuation,
            Gc::OtherPunctuation => GeneralCategory::OtherPunctuation,
            Gc::MathSymbol => GeneralCategory::MathSymbol,
            Gc::CurrencySymbol => GeneralCategory::CurrencySymbol,
            Gc::ModifierSymbol => GeneralCategory::ModifierSymbol,
            Gc::OtherSymbol => GeneralCategory::OtherSymbol,
            Gc::SpaceSeparator => GeneralCategory::SpaceSeparator,
            Gc::LineSeparator => GeneralCategory::LineSeparator,
            Gc::ParagraphSeparator => GeneralCategory::ParagraphSeparator,
            Gc::Control => GeneralCategory::Control,
            Gc::Format => GeneralCategory::Format,
            Gc::Surrogate => GeneralCategory::Surrogate,
            Gc::PrivateUse => GeneralCategory::PrivateUse,
            Gc::Unassigned => GeneralCategory::Unassigned,
        }
    }

    /// True for the mark categories (Mn, Mc, Me).
    pub fn is_mark(self) -> bool {
        matches!(
            self,
            GeneralCategory::NonspacingMark
                | GeneralCategory::SpacingMark
                | GeneralCategory::EnclosingMark
        )
    }
}

/// Bidirectional class of a codepoint (UAX#9).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum BidiClass {
    LeftToRight = 0,
    RightToLeft,
    ArabicLetter,
    EuropeanNumber,
    EuropeanSeparator,
    EuropeanTerminator,
    ArabicNumber,
    CommonSeparator,
    NonspacingMark,
    BoundaryNeutral,
    ParagraphSeparator,
    SegmentSeparator,
    WhiteSpace,
    OtherNeutral,
}

impl BidiClass {
    fn from_u32(value: u32) -> BidiClass {
        use BidiClass::*;
        match value {
            0 => LeftToRight,
            1 => RightToLeft,
            2 => ArabicLetter,
            3 => EuropeanNumber,
            4 => EuropeanSeparator,
            5 => EuropeanTerminator,
            6 => ArabicNumber,
            7 => CommonSeparator,
            8 => NonspacingMark,
            9 => BoundaryNeutral,
            10 => ParagraphSeparator,
            11 => SegmentSeparator,
            12 => WhiteSpace,
            _ => OtherNeutral,
        }
    }

    fn of(ch: char) -> BidiClass {
        use unicode_bidi::BidiClass as Bc;
        match unicode_bidi::bidi_class(ch) {
            Bc::L => BidiClass::LeftToRight,
            Bc::R => BidiClass::RightToLeft,
            Bc::AL => BidiClass::ArabicLetter,
            Bc::EN => BidiClass::EuropeanNumber,
            Bc::ES => BidiClass::EuropeanSeparator,
            Bc::ET => BidiClass::EuropeanTerminator,
            Bc::AN => BidiClass::ArabicNumber,
            Bc::CS => BidiClass::CommonSeparator,
            Bc::NSM => BidiClass::NonspacingMark,
            Bc::B => BidiClass::ParagraphSeparator,
            Bc::S => BidiClass::SegmentSeparator,
            Bc::WS => BidiClass::WhiteSpace,
            Bc::ON => BidiClass::OtherNeutral,
            // Explicit embedding/override/isolate codes and BN take no part
            // in the weak and neutral rules here.
            _ => BidiClass::BoundaryNeutral,
        }
    }

    /// True for R and AL.
    pub fn is_rtl(self) -> bool {
        matches!(self, BidiClass::RightToLeft | BidiClass::ArabicLetter)
    }
}

/// Arabic joining type (ArabicShaping.txt).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum JoiningType {
    NonJoining = 0,
    Transparent,
    RightJoining,
    LeftJoining,
    DualJoining,
    JoinCausing,
}

impl JoiningType {
    fn from_u32(value: u32) -> JoiningType {
        use JoiningType::*;
        match value {
            0 => NonJoining,
            1 => Transparent,
            2 => RightJoining,
            3 => LeftJoining,
            4 => DualJoining,
            _ => JoinCausing,
        }
    }

    fn of(ch: char) -> JoiningType {
        use unicode_joining_type::{get_joining_type, JoiningType as Jt};
        match get_joining_type(ch) {
            Jt::NonJoining => JoiningType::NonJoining,
            Jt::Transparent => JoiningType::Transparent,
            Jt::RightJoining => JoiningType::RightJoining,
            Jt::LeftJoining => JoiningType::LeftJoining,
            Jt::DualJoining => JoiningType::DualJoining,
            Jt::JoinCausing => JoiningType::JoinCausing,
        }
    }

    /// Joins with the following (logically later) character.
    pub fn joins_left(self) -> bool {
        matches!(
            self,
            JoiningType::LeftJoining | JoiningType::DualJoining | JoiningType::JoinCausing
        )
    }

    /// Joins with the preceding character.
    pub fn joins_right(self) -> bool {
        matches!(
            self,
            JoiningType::RightJoining | JoiningType::DualJoining | JoiningType::JoinCausing
        )
    }
}

/// Script of a codepoint, reduced to the classes the shaper distinguishes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum ScriptClass {
    Common = 0,
    Inherited,
    Latin,
    Cyrillic,
    Greek,
    Hebrew,
    Arabic,
    Syriac,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Sinhala,
    Thai,
    Lao,
    Myanmar,
    Khmer,
    Han,
    Hiragana,
    Katakana,
    Hangul,
    Unknown,
}

impl ScriptClass {
    fn from_u32(value: u32) -> ScriptClass {
        use ScriptClass::*;
        match value {
            0 => Common,
            1 => Inherited,
            2 => Latin,
            3 => Cyrillic,
            4 => Greek,
            5 => Hebrew,
            6 => Arabic,
            7 => Syriac,
            8 => Devanagari,
            9 => Bengali,
            10 => Gurmukhi,
            11 => Gujarati,
            12 => Oriya,
            13 => Tamil,
            14 => Telugu,
            15 => Kannada,
            16 => Malayalam,
            17 => Sinhala,
            18 => Thai,
            19 => Lao,
            20 => Myanmar,
            21 => Khmer,
            22 => Han,
            23 => Hiragana,
            24 => Katakana,
            25 => Hangul,
            _ => Unknown,
        }
    }

    fn of(ch: char) -> ScriptClass {
        use unicode_script::{Script, UnicodeScript};
        match ch.script() {
            Script::Common => ScriptClass::Common,
            Script::Inherited => ScriptClass::Inherited,
            Script::Latin => ScriptClass::Latin,
            Script::Cyrillic => ScriptClass::Cyrillic,
            Script::Greek => ScriptClass::Greek,
            Script::Hebrew => ScriptClass::Hebrew,
            Script::Arabic => ScriptClass::Arabic,
            Script::Syriac => ScriptClass::Syriac,
            Script::Devanagari => ScriptClass::Devanagari,
            Script::Bengali => ScriptClass::Bengali,
            Script::Gurmukhi => ScriptClass::Gurmukhi,
            Script::Gujarati => ScriptClass::Gujarati,
            Script::Oriya => ScriptClass::Oriya,
            Script::Tamil => ScriptClass::Tamil,
            Script::Telugu => ScriptClass::Telugu,
            Script::Kannada => ScriptClass::Kannada,
            Script::Malayalam => ScriptClass::Malayalam,
            Script::Sinhala => ScriptClass::Sinhala,
            Script::Thai => ScriptClass::Thai,
            Script::Lao => ScriptClass::Lao,
            Script::Myanmar => ScriptClass::Myanmar,
            Script::Khmer => ScriptClass::Khmer,
            Script::Han => ScriptClass::Han,
            Script::Hiragana => ScriptClass::Hiragana,
            Script::Katakana => ScriptClass::Katakana,
            Script::Hangul => ScriptClass::Hangul,
            _ => ScriptClass::Unknown,
        }
    }

    /// The OpenType script tag used to select features for this script.
    pub fn ot_tag(self) -> u32 {
        use crate::tag;
        match self {
            ScriptClass::Latin => tag::LATN,
            ScriptClass::Cyrillic => tag::CYRL,
            ScriptClass::Greek => tag::GREK,
            ScriptClass::Hebrew => tag::HEBR,
            ScriptClass::Arabic => tag::ARAB,
            ScriptClass::Syriac => tag::SYRC,
            ScriptClass::Devanagari => tag::DEVA,
            ScriptClass::Bengali => tag::BENG,
            ScriptClass::Gurmukhi => tag::GURU,
            ScriptClass::Gujarati => tag::GUJR,
            ScriptClass::Oriya => tag::ORYA,
            ScriptClass::Tamil => tag::TAML,
            ScriptClass::Telugu => tag::TELU,
            ScriptClass::Kannada => tag::KNDA,
            ScriptClass::Malayalam => tag::MLYM,
            ScriptClass::Sinhala => tag::SINH,
            ScriptClass::Thai => tag::THAI,
            ScriptClass::Lao => tag::LAO,
            ScriptClass::Myanmar => tag::MYMR,
            ScriptClass::Khmer => tag::KHMR,
            _ => tag::DFLT,
        }
    }

    /// True for scripts shaped by the Indic syllable machinery.
    pub fn is_indic(self) -> bool {
        matches!(
            self,
            ScriptClass::Devanagari
                | ScriptClass::Bengali
                | ScriptClass::Gurmukhi
                | ScriptClass::Gujarati
                | ScriptClass::Oriya
                | ScriptClass::Tamil
                | ScriptClass::Telugu
                | ScriptClass::Kannada
                | ScriptClass::Malayalam
                | ScriptClass::Sinhala
        )
    }

    /// True for scripts that take Arabic-style joining features.
    pub fn is_joining(self) -> bool {
        matches!(self, ScriptClass::Arabic | ScriptClass::Syriac)
    }
}

/// Line-break classification, reduced to the classes the layout engine
/// consumes (mandatory breaks and expandable whitespace).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum LineBreakClass {
    Other = 0,
    Mandatory,
    CarriageReturn,
    LineFeed,
    Space,
    Tab,
}

impl LineBreakClass {
    fn from_u32(value: u32) -> LineBreakClass {
        use LineBreakClass::*;
        match value {
            1 => Mandatory,
            2 => CarriageReturn,
            3 => LineFeed,
            4 => Space,
            5 => Tab,
            _ => Other,
        }
    }

    fn of(ch: char) -> LineBreakClass {
        match ch {
            '\u{000A}' => LineBreakClass::LineFeed,
            '\u{000D}' => LineBreakClass::CarriageReturn,
            '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}' => {
                LineBreakClass::Mandatory
            }
            ' ' => LineBreakClass::Space,
            '\t' => LineBreakClass::Tab,
            _ => LineBreakClass::Other,
        }
    }

    /// True for classes that terminate a line.
    pub fn is_mandatory_break(self) -> bool {
        matches!(
            self,
            LineBreakClass::Mandatory | LineBreakClass::CarriageReturn | LineBreakClass::LineFeed
        )
    }
}

/// The frozen property tries.
pub struct PropertyTables {
    pub general_category: UnicodeTrie,
    pub bidi_class: UnicodeTrie,
    pub script: UnicodeTrie,
    pub joining_type: UnicodeTrie,
    pub line_break: UnicodeTrie,
    /// Maps a codepoint to its bidi-mirrored counterpart; 0 where none.
    pub bidi_mirror: UnicodeTrie,
}

impl PropertyTables {
    fn build() -> PropertyTables {
        PropertyTables {
            general_category: build_trie(GeneralCategory::Unassigned as u32, |ch| {
                GeneralCategory::of(ch) as u32
            }),
            bidi_class: build_trie(BidiClass::LeftToRight as u32, |ch| BidiClass::of(ch) as u32),
            script: build_trie(ScriptClass::Unknown as u32, |ch| ScriptClass::of(ch) as u32),
            joining_type: build_trie(JoiningType::NonJoining as u32, |ch| {
                JoiningType::of(ch) as u32
            }),
            line_break: build_trie(LineBreakClass::Other as u32, |ch| {
                LineBreakClass::of(ch) as u32
            }),
            bidi_mirror: build_trie(0, |ch| {
                unicode_bidi_mirroring::get_mirrored(ch).map_or(0, |m| m as u32)
            }),
        }
    }
}

fn build_trie(initial: u32, classify: impl Fn(char) -> u32) -> UnicodeTrie {
    let mut builder = UnicodeTrieBuilder::new(initial, initial);
    for ch in (0u32..0x11_0000).filter_map(char::from_u32) {
        let value = classify(ch);
        if value != initial {
            builder.set(ch as u32, value);
        }
    }
    // The scalar sweep cannot overflow the block space of a single property.
    builder.freeze().expect("property trie overflow")
}

lazy_static! {
    static ref TABLES: PropertyTables = PropertyTables::build();
}

/// The process-wide property tables.
pub fn property_tables() -> &'static PropertyTables {
    &TABLES
}

/// General category of `cp`.
pub fn general_category(cp: u32) -> GeneralCategory {
    GeneralCategory::from_u32(property_tables().general_category.get(cp))
}

/// Bidirectional class of `cp`.
pub fn bidi_class(cp: u32) -> BidiClass {
    BidiClass::from_u32(property_tables().bidi_class.get(cp))
}

/// Script class of `cp`.
pub fn script(cp: u32) -> ScriptClass {
    ScriptClass::from_u32(property_tables().script.get(cp))
}

/// Arabic joining type of `cp`.
pub fn joining_type(cp: u32) -> JoiningType {
    JoiningType::from_u32(property_tables().joining_type.get(cp))
}

/// Line-break class of `cp`.
pub fn line_break(cp: u32) -> LineBreakClass {
    LineBreakClass::from_u32(property_tables().line_break.get(cp))
}

/// The bidi-mirrored counterpart of `cp`, if any.
pub fn bidi_mirror(cp: u32) -> Option<u32> {
    match property_tables().bidi_mirror.get(cp) {
        0 => None,
        mirrored => Some(mirrored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_properties() {
        assert_eq!(general_category('A' as u32), GeneralCategory::UppercaseLetter);
        assert_eq!(bidi_class('A' as u32), BidiClass::LeftToRight);
        assert_eq!(script('A' as u32), ScriptClass::Latin);
        assert_eq!(joining_type('A' as u32), JoiningType::NonJoining);
    }

    #[test]
    fn arabic_properties() {
        // U+0644 ARABIC LETTER LAM
        assert_eq!(bidi_class(0x0644), BidiClass::ArabicLetter);
        assert_eq!(script(0x0644), ScriptClass::Arabic);
        assert_eq!(joining_type(0x0644), JoiningType::DualJoining);
        // U+0627 ARABIC LETTER ALEF joins only to the right
        assert_eq!(joining_type(0x0627), JoiningType::RightJoining);
        // U+0651 ARABIC SHADDA is a transparent mark
        assert_eq!(joining_type(0x0651), JoiningType::Transparent);
        assert!(general_category(0x0651).is_mark());
    }

    #[test]
    fn digits_and_numbers() {
        assert_eq!(bidi_class('7' as u32), BidiClass::EuropeanNumber);
        // U+0661 ARABIC-INDIC DIGIT ONE
        assert_eq!(bidi_class(0x0661), BidiClass::ArabicNumber);
    }

    #[test]
    fn mirror_pairs() {
        assert_eq!(bidi_mirror('(' as u32), Some(')' as u32));
        assert_eq!(bidi_mirror(')' as u32), Some('(' as u32));
        assert_eq!(bidi_mirror('A' as u32), None);
    }

    #[test]
    fn line_break_classes() {
        assert!(line_break(0x0A).is_mandatory_break());
        assert!(line_break(0x2028).is_mandatory_break());
        assert_eq!(line_break(' ' as u32), LineBreakClass::Space);
        assert_eq!(line_break('\t' as u32), LineBreakClass::Tab);
        assert!(!line_break('x' as u32).is_mandatory_break());
    }

    #[test]
    fn script_tags() {
        assert_eq!(script(0x0915), ScriptClass::Devanagari); // KA
        assert!(script(0x0915).is_indic());
        assert_eq!(ScriptClass::Arabic.ot_tag(), crate::tag::ARAB);
        assert_eq!(ScriptClass::Common.ot_tag(), crate::tag::DFLT);
    }
}

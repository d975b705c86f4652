//! Script-specific shaping support.

pub mod arabic;
pub mod indic;

use crate::gsub::ShapedGlyph;
use crate::unicode::props::ScriptClass;

/// How a script's text is preprocessed before `GSUB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapingModel {
    /// No preprocessing; default feature set.
    Default,
    /// Joining-form assignment (Arabic, Syriac).
    Joining,
    /// Syllable analysis and reordering.
    Indic,
}

/// The shaping model for `script`.
pub fn shaping_model(script: ScriptClass) -> ShapingModel {
    if script.is_joining() {
        ShapingModel::Joining
    } else if script.is_indic() {
        ShapingModel::Indic
    } else {
        ShapingModel::Default
    }
}

/// Run script-specific preprocessing over the mapped buffer.
pub fn preprocess(script: ScriptClass, glyphs: &mut Vec<ShapedGlyph>) {
    match shaping_model(script) {
        ShapingModel::Joining => arabic::assign_joining_forms(glyphs),
        ShapingModel::Indic => indic::reorder_syllables(script, glyphs),
        ShapingModel::Default => {}
    }
}

/// The GSUB features to enable for `script`, in application order.
pub fn substitution_features(script: ScriptClass) -> &'static [u32] {
    use crate::tag;
    match shaping_model(script) {
        ShapingModel::Joining => &[
            tag::CCMP,
            tag::ISOL,
            tag::FINA,
            tag::MEDI,
            tag::INIT,
            tag::RLIG,
            tag::CALT,
            tag::LIGA,
            tag::CLIG,
        ],
        ShapingModel::Indic => &[
            tag::LOCL,
            tag::NUKT,
            tag::AKHN,
            tag::RPHF,
            tag::BLWF,
            tag::HALF,
            tag::PSTF,
            tag::VATU,
            tag::CJCT,
            tag::PRES,
            tag::ABVS,
            tag::BLWS,
            tag::PSTS,
            tag::HALN,
            tag::CALT,
        ],
        ShapingModel::Default => crate::gsub::DEFAULT_FEATURES,
    }
}

//! Joining-form assignment for Arabic-family scripts.
//!
//! Follows the letter-joining state walk from the OpenType Arabic shaping
//! model: every letter starts isolated, and each pair of adjacent joining
//! letters upgrades the earlier one to initial/medial and the later one to
//! final/medial. Transparent glyphs (marks) neither join nor break joining.

use crate::gsub::{FeatureMask, GlyphSource, ShapedGlyph};
use crate::unicode::props::{joining_type, JoiningType};

fn glyph_joining_type(glyph: &ShapedGlyph) -> JoiningType {
    match glyph.source {
        GlyphSource::Char(ch) => joining_type(ch as u32),
        // Without a source character the safest assumption is non-joining.
        GlyphSource::Direct => JoiningType::NonJoining,
    }
}

/// Assign `isol`/`init`/`medi`/`fina` feature memberships across the buffer.
pub fn assign_joining_forms(glyphs: &mut [ShapedGlyph]) {
    // Clear any forms from a previous pass and default letters to isolated.
    for glyph in glyphs.iter_mut() {
        glyph.features.remove(
            FeatureMask::ISOL | FeatureMask::INIT | FeatureMask::MEDI | FeatureMask::FINA,
        );
        if glyph_joining_type(glyph) != JoiningType::Transparent {
            glyph.features.insert(FeatureMask::ISOL);
        }
    }

    let mut prev: Option<usize> = None;
    for i in 0..glyphs.len() {
        let joining = glyph_joining_type(&glyphs[i]);
        if joining == JoiningType::Transparent {
            continue;
        }
        if let Some(prev_index) = prev {
            let prev_joining = glyph_joining_type(&glyphs[prev_index]);
            if prev_joining.joins_left() && joining.joins_right() {
                // The pair joins: upgrade the earlier glyph's form.
                let prev_features = glyphs[prev_index].features;
                if prev_features.contains(FeatureMask::ISOL) {
                    glyphs[prev_index].features.remove(FeatureMask::ISOL);
                    glyphs[prev_index].features.insert(FeatureMask::INIT);
                } else if prev_features.contains(FeatureMask::FINA) {
                    glyphs[prev_index].features.remove(FeatureMask::FINA);
                    glyphs[prev_index].features.insert(FeatureMask::MEDI);
                }
                glyphs[i].features.remove(FeatureMask::ISOL);
                glyphs[i].features.insert(FeatureMask::FINA);
            }
        }
        prev = Some(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &str) -> Vec<ShapedGlyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| ShapedGlyph::from_char(ch, i as u16 + 1, i as u32))
            .collect()
    }

    fn form(glyph: &ShapedGlyph) -> FeatureMask {
        glyph.features
            & (FeatureMask::ISOL | FeatureMask::INIT | FeatureMask::MEDI | FeatureMask::FINA)
    }

    #[test]
    fn lone_letter_is_isolated() {
        // U+0628 BEH is dual-joining
        let mut glyphs = buffer("\u{0628}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::ISOL);
    }

    #[test]
    fn pair_of_dual_joining_letters() {
        // BEH BEH: first becomes initial, second final
        let mut glyphs = buffer("\u{0628}\u{0628}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::INIT);
        assert_eq!(form(&glyphs[1]), FeatureMask::FINA);
    }

    #[test]
    fn triple_produces_medial() {
        let mut glyphs = buffer("\u{0628}\u{0628}\u{0628}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::INIT);
        assert_eq!(form(&glyphs[1]), FeatureMask::MEDI);
        assert_eq!(form(&glyphs[2]), FeatureMask::FINA);
    }

    #[test]
    fn right_joining_letter_stops_the_chain() {
        // BEH ALEF BEH: ALEF joins only rightwards so the final BEH is
        // isolated.
        let mut glyphs = buffer("\u{0628}\u{0627}\u{0628}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::INIT);
        assert_eq!(form(&glyphs[1]), FeatureMask::FINA);
        assert_eq!(form(&glyphs[2]), FeatureMask::ISOL);
    }

    #[test]
    fn transparent_marks_do_not_break_joining() {
        // BEH SHADDA BEH: the mark is skipped, letters still join.
        let mut glyphs = buffer("\u{0628}\u{0651}\u{0628}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::INIT);
        assert_eq!(form(&glyphs[1]), FeatureMask::empty());
        assert_eq!(form(&glyphs[2]), FeatureMask::FINA);
    }

    #[test]
    fn lam_shadda_keeps_lam_isolated() {
        // LAM + SHADDA: nothing for the lam to join with.
        let mut glyphs = buffer("\u{0644}\u{0651}");
        assign_joining_forms(&mut glyphs);
        assert_eq!(form(&glyphs[0]), FeatureMask::ISOL);
    }
}

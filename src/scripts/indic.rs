//! Syllable analysis and reordering for Indic scripts.
//!
//! The nine main Indic blocks share a common layout, so codepoints are
//! classified by their offset within the block with per-script exceptions.
//! Reordering implements the Devanagari-class model: the syllable base is
//! the last consonant (stopping before halant-terminated clusters), an
//! initial Ra+halant pair is tagged `rphf` and moved after the base, and
//! pre-base matras move to the front of the syllable. Clusters are merged
//! across a reordered syllable so cluster ids stay monotonic.

use crate::gsub::{FeatureMask, GlyphSource, ShapedGlyph};
use crate::unicode::props::ScriptClass;

/// Syllabic category of an Indic codepoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Syllabic {
    Consonant,
    VowelIndependent,
    /// Dependent vowel sign (matra).
    Matra,
    Nukta,
    /// Virama / halant.
    Halant,
    /// Anusvara, visarga, candrabindu.
    SyllableModifier,
    Zwj,
    Zwnj,
    Other,
}

/// Positional category of a matra.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Positional {
    PreBase,
    AboveBase,
    BelowBase,
    PostBase,
}

/// First codepoint of the script's block.
fn block_base(script: ScriptClass) -> Option<u32> {
    match script {
        ScriptClass::Devanagari => Some(0x0900),
        ScriptClass::Bengali => Some(0x0980),
        ScriptClass::Gurmukhi => Some(0x0A00),
        ScriptClass::Gujarati => Some(0x0A80),
        ScriptClass::Oriya => Some(0x0B00),
        ScriptClass::Tamil => Some(0x0B80),
        ScriptClass::Telugu => Some(0x0C00),
        ScriptClass::Kannada => Some(0x0C80),
        ScriptClass::Malayalam => Some(0x0D00),
        // Sinhala departs from the shared block layout; its syllables are
        // left in logical order.
        _ => None,
    }
}

/// Syllabic category of `cp` within `script`.
pub fn syllabic_category(script: ScriptClass, cp: u32) -> Syllabic {
    match cp {
        0x200C => return Syllabic::Zwnj,
        0x200D => return Syllabic::Zwj,
        _ => {}
    }
    let Some(base) = block_base(script) else {
        return Syllabic::Other;
    };
    if !(base..base + 0x80).contains(&cp) {
        return Syllabic::Other;
    }
    match cp - base {
        0x00..=0x03 => Syllabic::SyllableModifier,
        0x05..=0x14 => Syllabic::VowelIndependent,
        0x15..=0x39 => Syllabic::Consonant,
        0x3C => Syllabic::Nukta,
        0x3E..=0x4C => Syllabic::Matra,
        0x4D => Syllabic::Halant,
        0x55..=0x57 => Syllabic::Matra,
        0x58..=0x5F => Syllabic::Consonant,
        0x62..=0x63 => Syllabic::Matra,
        _ => Syllabic::Other,
    }
}

/// Positional category of a matra codepoint.
pub fn positional_category(script: ScriptClass, cp: u32) -> Positional {
    let Some(base) = block_base(script) else {
        return Positional::PostBase;
    };
    let offset = cp.wrapping_sub(base);
    let pre_base: &[u32] = match script {
        // vowel sign I
        ScriptClass::Devanagari | ScriptClass::Gurmukhi | ScriptClass::Gujarati => &[0x3F],
        // vowel sign I plus E/AI
        ScriptClass::Bengali => &[0x3F, 0x47, 0x48],
        ScriptClass::Oriya => &[0x3F, 0x47],
        ScriptClass::Tamil | ScriptClass::Malayalam => &[0x46, 0x47, 0x48],
        _ => &[],
    };
    if pre_base.contains(&offset) {
        Positional::PreBase
    } else if matches!(offset, 0x41..=0x44) {
        Positional::BelowBase
    } else if matches!(offset, 0x45 | 0x47 | 0x48 | 0x55 | 0x56) {
        Positional::AboveBase
    } else {
        Positional::PostBase
    }
}

/// True when `cp` is the script's Ra, which can form a reph.
fn is_ra(script: ScriptClass, cp: u32) -> bool {
    block_base(script).map_or(false, |base| cp == base + 0x30)
}

fn category(script: ScriptClass, glyph: &ShapedGlyph) -> Syllabic {
    match glyph.source {
        GlyphSource::Char(ch) => syllabic_category(script, ch as u32),
        GlyphSource::Direct => Syllabic::Other,
    }
}

fn char_of(glyph: &ShapedGlyph) -> Option<u32> {
    match glyph.source {
        GlyphSource::Char(ch) => Some(ch as u32),
        GlyphSource::Direct => None,
    }
}

/// Split the buffer into syllables and reorder each.
pub fn reorder_syllables(script: ScriptClass, glyphs: &mut Vec<ShapedGlyph>) {
    let mut start = 0;
    while start < glyphs.len() {
        let end = syllable_end(script, glyphs, start);
        if end > start {
            reorder_syllable(script, &mut glyphs[start..end]);
            merge_clusters(&mut glyphs[start..end]);
            start = end;
        } else {
            start += 1;
        }
    }
}

/// Find the end of the syllable starting at `start`.
///
/// A syllable is a run of consonant clusters joined by halants, followed by
/// matras and syllable modifiers.
fn syllable_end(script: ScriptClass, glyphs: &[ShapedGlyph], start: usize) -> usize {
    let mut i = start;
    let mut saw_letter = false;
    while i < glyphs.len() {
        match category(script, &glyphs[i]) {
            Syllabic::Consonant | Syllabic::VowelIndependent => {
                if saw_letter {
                    // A new letter only continues the syllable after a
                    // halant.
                    let prev = category(script, &glyphs[i - 1]);
                    if !matches!(prev, Syllabic::Halant | Syllabic::Zwj | Syllabic::Zwnj) {
                        break;
                    }
                }
                saw_letter = true;
                i += 1;
            }
            Syllabic::Nukta | Syllabic::Halant | Syllabic::Zwj | Syllabic::Zwnj => {
                if !saw_letter {
                    break;
                }
                i += 1;
            }
            Syllabic::Matra | Syllabic::SyllableModifier => {
                if !saw_letter {
                    break;
                }
                i += 1;
            }
            Syllabic::Other => break,
        }
    }
    i
}

/// Index of the syllable base within `syllable`.
///
/// The base is the last letter of the syllable, ignoring a reph that has
/// already been rotated past it.
fn find_base(script: ScriptClass, syllable: &[ShapedGlyph]) -> Option<usize> {
    syllable.iter().rposition(|glyph| {
        matches!(
            category(script, glyph),
            Syllabic::Consonant | Syllabic::VowelIndependent
        ) && !glyph.features.contains(FeatureMask::RPHF)
    })
}

fn reorder_syllable(script: ScriptClass, syllable: &mut [ShapedGlyph]) {
    let Some(base) = find_base(script, syllable) else {
        return;
    };

    // Initial Ra + halant forms a reph rendered after the base: tag it and
    // rotate it to the end of the syllable.
    let has_reph = syllable.len() > 2
        && base > 1
        && char_of(&syllable[0]).map_or(false, |cp| is_ra(script, cp))
        && category(script, &syllable[1]) == Syllabic::Halant;
    if has_reph {
        syllable[0].features.insert(FeatureMask::RPHF);
        syllable[1].features.insert(FeatureMask::RPHF);
        syllable.rotate_left(2);
    }

    // Consonants before the base take half forms.
    let base = find_base(script, syllable).unwrap_or(0);
    let (pre_base_glyphs, _) = syllable.split_at_mut(base);
    for glyph in pre_base_glyphs.iter_mut() {
        if matches!(category(script, glyph), Syllabic::Consonant) {
            glyph.features.insert(FeatureMask::HALF);
        }
    }

    // Move pre-base matras to the front of the syllable.
    let mut i = base;
    while i < syllable.len() {
        let is_pre_base_matra = category(script, &syllable[i]) == Syllabic::Matra
            && char_of(&syllable[i])
                .map_or(false, |cp| positional_category(script, cp) == Positional::PreBase);
        if is_pre_base_matra {
            syllable[..=i].rotate_right(1);
        }
        i += 1;
    }
}

/// Give every glyph of a reordered syllable the syllable's first cluster id
/// so cluster order stays non-decreasing.
fn merge_clusters(syllable: &mut [ShapedGlyph]) {
    if let Some(min_cluster) = syllable.iter().map(|glyph| glyph.cluster).min() {
        for glyph in syllable.iter_mut() {
            glyph.cluster = min_cluster;
        }
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

    fn chars(glyphs: &[ShapedGlyph]) -> Vec<char> {
        glyphs
            .iter()
            .filter_map(|glyph| match glyph.source {
                GlyphSource::Char(ch) => Some(ch),
                GlyphSource::Direct => None,
            })
            .collect()
    }

    #[test]
    fn devanagari_classification() {
        let script = ScriptClass::Devanagari;
        assert_eq!(syllabic_category(script, 0x0915), Syllabic::Consonant); // KA
        assert_eq!(syllabic_category(script, 0x0905), Syllabic::VowelIndependent); // A
        assert_eq!(syllabic_category(script, 0x093F), Syllabic::Matra); // vowel sign I
        assert_eq!(syllabic_category(script, 0x094D), Syllabic::Halant);
        assert_eq!(syllabic_category(script, 0x0902), Syllabic::SyllableModifier);
        assert_eq!(syllabic_category(script, 0x0041), Syllabic::Other);
    }

    #[test]
    fn pre_base_matra_moves_forward() {
        // KA + vowel sign I renders with the matra first.
        let mut glyphs = buffer("\u{0915}\u{093F}");
        reorder_syllables(ScriptClass::Devanagari, &mut glyphs);
        assert_eq!(chars(&glyphs), vec!['\u{093F}', '\u{0915}']);
        // Clusters merged to stay monotonic.
        assert_eq!(glyphs[0].cluster, glyphs[1].cluster);
    }

    #[test]
    fn post_base_matra_stays_in_place() {
        // KA + vowel sign AA stays in logical order.
        let mut glyphs = buffer("\u{0915}\u{093E}");
        reorder_syllables(ScriptClass::Devanagari, &mut glyphs);
        assert_eq!(chars(&glyphs), vec!['\u{0915}', '\u{093E}']);
    }

    #[test]
    fn reph_moves_after_base() {
        // RA + halant + KA: the reph is tagged and rotated past the base.
        let mut glyphs = buffer("\u{0930}\u{094D}\u{0915}");
        reorder_syllables(ScriptClass::Devanagari, &mut glyphs);
        assert_eq!(chars(&glyphs), vec!['\u{0915}', '\u{0930}', '\u{094D}']);
        assert!(glyphs[1].features.contains(FeatureMask::RPHF));
        assert!(glyphs[2].features.contains(FeatureMask::RPHF));
    }

    #[test]
    fn half_form_tagged_on_pre_base_consonant() {
        // KA + halant + SSA: KA takes a half form.
        let mut glyphs = buffer("\u{0915}\u{094D}\u{0937}");
        reorder_syllables(ScriptClass::Devanagari, &mut glyphs);
        assert!(glyphs[0].features.contains(FeatureMask::HALF));
    }

    #[test]
    fn independent_syllables_left_alone() {
        let mut glyphs = buffer("\u{0915} \u{0916}");
        let before = chars(&glyphs);
        reorder_syllables(ScriptClass::Devanagari, &mut glyphs);
        assert_eq!(chars(&glyphs), before);
    }
}

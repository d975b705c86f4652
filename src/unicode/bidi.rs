//! Bidirectional level resolution (UAX#9).
//!
//! Resolves per-codepoint embedding levels by running the weak (W1–W7),
//! neutral (N0–N2), and implicit (I1–I2) rules over the bidi-class oracle.
//! Explicit embedding and isolate codes are treated as boundary-neutral;
//! paragraphs with directional formatting characters keep their surrounding
//! direction. Levels fit in 0..126.

use itertools::Itertools;

use crate::unicode::props::{bidi_class, bidi_mirror, BidiClass};
use crate::unicode::CodePoint;

/// Maximum embedding level (UAX#9 max_depth).
pub const MAX_LEVEL: u8 = 125;

/// Maximum bracket-pair nesting tracked by N0.
const BRACKET_STACK_LIMIT: usize = 63;

/// Base paragraph direction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    fn level(self) -> u8 {
        match self {
            Direction::LeftToRight => 0,
            Direction::RightToLeft => 1,
        }
    }
}

/// Detect the base direction from the first strong character (rule P2/P3).
pub fn base_direction(codepoints: &[CodePoint]) -> Direction {
    for cp in codepoints {
        match bidi_class(cp.value()) {
            BidiClass::LeftToRight => return Direction::LeftToRight,
            BidiClass::RightToLeft | BidiClass::ArabicLetter => return Direction::RightToLeft,
            _ => {}
        }
    }
    Direction::LeftToRight
}

/// Resolve embedding levels for a paragraph.
pub fn resolve_levels(codepoints: &[CodePoint], direction: Direction) -> Vec<u8> {
    let base_level = direction.level();
    if codepoints.is_empty() {
        return Vec::new();
    }

    let mut classes: Vec<BidiClass> = codepoints
        .iter()
        .map(|cp| bidi_class(cp.value()))
        .collect();

    // sos/eos for the single run covering the paragraph.
    let sos = if base_level % 2 == 0 {
        BidiClass::LeftToRight
    } else {
        BidiClass::RightToLeft
    };

    weak_rules(&mut classes, sos);
    neutral_rules(codepoints, &mut classes, sos);

    // I1, I2: resolve implicit levels from the remaining classes.
    classes
        .iter()
        .map(|&class| implicit_level(base_level, class))
        .collect()
}

fn weak_rules(classes: &mut [BidiClass], sos: BidiClass) {
    // W1: NSM takes the class of the previous character (sos at run start).
    let mut prev = sos;
    for class in classes.iter_mut() {
        if *class == BidiClass::NonspacingMark {
            *class = prev;
        }
        if *class != BidiClass::BoundaryNeutral {
            prev = *class;
        }
    }

    // W2: EN becomes AN when the last strong type was AL.
    let mut last_strong = sos;
    for class in classes.iter_mut() {
        match *class {
            BidiClass::LeftToRight | BidiClass::RightToLeft | BidiClass::ArabicLetter => {
                last_strong = *class
            }
            BidiClass::EuropeanNumber if last_strong == BidiClass::ArabicLetter => {
                *class = BidiClass::ArabicNumber
            }
            _ => {}
        }
    }

    // W3: AL becomes R.
    for class in classes.iter_mut() {
        if *class == BidiClass::ArabicLetter {
            *class = BidiClass::RightToLeft;
        }
    }

    // W4: single ES between EN pairs becomes EN; single CS between pairs of
    // the same number type takes that type.
    for i in 1..classes.len().saturating_sub(1) {
        let (before, after) = (classes[i - 1], classes[i + 1]);
        match classes[i] {
            BidiClass::EuropeanSeparator
                if before == BidiClass::EuropeanNumber && after == BidiClass::EuropeanNumber =>
            {
                classes[i] = BidiClass::EuropeanNumber;
            }
            BidiClass::CommonSeparator
                if before == after
                    && (before == BidiClass::EuropeanNumber
                        || before == BidiClass::ArabicNumber) =>
            {
                classes[i] = before;
            }
            _ => {}
        }
    }

    // W5: runs of ET adjacent to EN become EN.
    let len = classes.len();
    let mut i = 0;
    while i < len {
        if classes[i] == BidiClass::EuropeanTerminator {
            let start = i;
            while i < len && classes[i] == BidiClass::EuropeanTerminator {
                i += 1;
            }
            let before_en = start > 0 && classes[start - 1] == BidiClass::EuropeanNumber;
            let after_en = i < len && classes[i] == BidiClass::EuropeanNumber;
            if before_en || after_en {
                for class in &mut classes[start..i] {
                    *class = BidiClass::EuropeanNumber;
                }
            }
        } else {
            i += 1;
        }
    }

    // W6: remaining separators and terminators become ON.
    for class in classes.iter_mut() {
        if matches!(
            *class,
            BidiClass::EuropeanSeparator
                | BidiClass::EuropeanTerminator
                | BidiClass::CommonSeparator
        ) {
            *class = BidiClass::OtherNeutral;
        }
    }

    // W7: EN becomes L when the last strong type was L.
    let mut last_strong = sos;
    for class in classes.iter_mut() {
        match *class {
            BidiClass::LeftToRight | BidiClass::RightToLeft => last_strong = *class,
            BidiClass::EuropeanNumber if last_strong == BidiClass::LeftToRight => {
                *class = BidiClass::LeftToRight
            }
            _ => {}
        }
    }
}

fn is_neutral(class: BidiClass) -> bool {
    matches!(
        class,
        BidiClass::ParagraphSeparator
            | BidiClass::SegmentSeparator
            | BidiClass::WhiteSpace
            | BidiClass::OtherNeutral
            | BidiClass::BoundaryNeutral
    )
}

/// Direction a class contributes when deciding neutrals: EN and AN count as R
/// (N1 note).
fn strong_direction(class: BidiClass) -> Option<BidiClass> {
    match class {
        BidiClass::LeftToRight => Some(BidiClass::LeftToRight),
        BidiClass::RightToLeft | BidiClass::EuropeanNumber | BidiClass::ArabicNumber => {
            Some(BidiClass::RightToLeft)
        }
        _ => None,
    }
}

fn neutral_rules(codepoints: &[CodePoint], classes: &mut [BidiClass], sos: BidiClass) {
    resolve_bracket_pairs(codepoints, classes, sos);

    // N1: neutrals between strongs of the same direction take that direction.
    // N2: anything left takes the embedding direction.
    let embedding = sos;
    let len = classes.len();
    let mut i = 0;
    while i < len {
        if is_neutral(classes[i]) {
            let start = i;
            while i < len && is_neutral(classes[i]) {
                i += 1;
            }
            let before = if start > 0 {
                strong_direction(classes[start - 1])
            } else {
                Some(sos)
            };
            let after = if i < len {
                strong_direction(classes[i])
            } else {
                Some(sos)
            };
            let resolved = match (before, after) {
                (Some(b), Some(a)) if b == a => b,
                _ => embedding,
            };
            for class in &mut classes[start..i] {
                *class = resolved;
            }
        } else {
            i += 1;
        }
    }
}

/// N0: resolve paired brackets to the embedding direction when they enclose a
/// strong character matching it.
fn resolve_bracket_pairs(codepoints: &[CodePoint], classes: &mut [BidiClass], sos: BidiClass) {
    struct OpenBracket {
        index: usize,
        close: u32,
    }

    let mut stack: Vec<OpenBracket> = Vec::new();
    let mut pairs: Vec<(usize, usize)> = Vec::new();

    for (i, cp) in codepoints.iter().enumerate() {
        if classes[i] != BidiClass::OtherNeutral {
            continue;
        }
        let value = cp.value();
        match crate::unicode::props::general_category(value) {
            crate::unicode::props::GeneralCategory::OpenPunctuation => {
                if let Some(close) = bidi_mirror(value) {
                    if stack.len() < BRACKET_STACK_LIMIT {
                        stack.push(OpenBracket { index: i, close });
                    } else {
                        // UAX#9: stop processing BD16 when the stack overflows.
                        return;
                    }
                }
            }
            crate::unicode::props::GeneralCategory::ClosePunctuation => {
                if let Some(pos) = stack.iter().rposition(|open| open.close == value) {
                    pairs.push((stack[pos].index, i));
                    stack.truncate(pos);
                }
            }
            _ => {}
        }
    }
    pairs.sort_unstable();

    for (open, close) in pairs {
        let embedding = sos;
        let mut enclosed_embedding = false;
        let mut enclosed_opposite = false;
        for &class in &classes[open + 1..close] {
            if let Some(dir) = strong_direction(class) {
                if dir == embedding {
                    enclosed_embedding = true;
                    break;
                } else {
                    enclosed_opposite = true;
                }
            }
        }
        if enclosed_embedding {
            classes[open] = embedding;
            classes[close] = embedding;
        } else if enclosed_opposite {
            // Opposite-direction strong inside: take the preceding context.
            let mut context = sos;
            for &class in classes[..open].iter().rev() {
                if let Some(dir) = strong_direction(class) {
                    context = dir;
                    break;
                }
            }
            let resolved = if context != embedding { context } else { embedding };
            classes[open] = resolved;
            classes[close] = resolved;
        }
    }
}

fn implicit_level(base_level: u8, class: BidiClass) -> u8 {
    let level = if base_level % 2 == 0 {
        // I1
        match class {
            BidiClass::RightToLeft => base_level + 1,
            BidiClass::EuropeanNumber | BidiClass::ArabicNumber => base_level + 2,
            _ => base_level,
        }
    } else {
        // I2
        match class {
            BidiClass::LeftToRight | BidiClass::EuropeanNumber | BidiClass::ArabicNumber => {
                base_level + 1
            }
            _ => base_level,
        }
    };
    level.min(MAX_LEVEL)
}

/// A maximal run of codepoints sharing one embedding level.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LevelRun {
    pub start: usize,
    pub end: usize,
    pub level: u8,
}

/// Split resolved levels into level runs in logical order.
pub fn level_runs(levels: &[u8]) -> Vec<LevelRun> {
    let mut runs = Vec::new();
    let mut start = 0;
    for (level, group) in &levels.iter().group_by(|&&level| level) {
        let end = start + group.count();
        runs.push(LevelRun { start, end, level });
        start = end;
    }
    runs
}

/// Reorder level runs into visual order (rule L2).
pub fn visual_run_order(runs: &[LevelRun]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..runs.len()).collect();
    let Some(max_level) = runs.iter().map(|run| run.level).max() else {
        return order;
    };
    let min_odd = runs
        .iter()
        .map(|run| run.level)
        .filter(|level| level % 2 == 1)
        .min()
        .unwrap_or(max_level + 1);

    let mut level = max_level;
    while level >= min_odd {
        let mut i = 0;
        while i < order.len() {
            if runs[order[i]].level >= level {
                let start = i;
                while i < order.len() && runs[order[i]].level >= level {
                    i += 1;
                }
                order[start..i].reverse();
            } else {
                i += 1;
            }
        }
        if level == 0 {
            break;
        }
        level -= 1;
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(text: &str) -> Vec<CodePoint> {
        text.chars().map(CodePoint::from).collect()
    }

    #[test]
    fn all_ltr_is_level_zero() {
        let levels = resolve_levels(&cps("hello"), Direction::LeftToRight);
        assert_eq!(levels, vec![0; 5]);
    }

    #[test]
    fn all_rtl_is_level_one() {
        // Hebrew letters
        let levels = resolve_levels(&cps("שלום"), Direction::LeftToRight);
        assert_eq!(levels, vec![1; 4]);
    }

    #[test]
    fn numbers_in_rtl_take_level_two() {
        // Hebrew + European digits under an LTR paragraph
        let levels = resolve_levels(&cps("אב12"), Direction::LeftToRight);
        assert_eq!(levels, vec![1, 1, 2, 2]);
    }

    #[test]
    fn w4_separator_between_numbers() {
        let levels = resolve_levels(&cps("1.2"), Direction::LeftToRight);
        assert_eq!(levels, vec![0, 0, 0]);
        // Under an RTL paragraph the whole number run is level 2.
        let levels = resolve_levels(&cps("1.2"), Direction::RightToLeft);
        assert_eq!(levels, vec![2, 2, 2]);
    }

    #[test]
    fn neutrals_between_matching_strongs() {
        // space between two Hebrew words stays RTL
        let levels = resolve_levels(&cps("אב גד"), Direction::LeftToRight);
        assert_eq!(levels, vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn neutrals_between_mixed_strongs_take_base() {
        // "ab שלום" — the space sits between L and R, takes base level 0
        let levels = resolve_levels(&cps("ab אב"), Direction::LeftToRight);
        assert_eq!(levels, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn nsm_follows_preceding_character() {
        // Arabic letter + shadda (NSM)
        let levels = resolve_levels(&cps("\u{0644}\u{0651}"), Direction::RightToLeft);
        assert_eq!(levels, vec![1, 1]);
    }

    #[test]
    fn base_direction_detection() {
        assert_eq!(base_direction(&cps("hello")), Direction::LeftToRight);
        assert_eq!(base_direction(&cps("שלום")), Direction::RightToLeft);
        assert_eq!(base_direction(&cps("123 אב")), Direction::RightToLeft);
        assert_eq!(base_direction(&cps("...")), Direction::LeftToRight);
    }

    #[test]
    fn run_splitting_and_visual_order() {
        let levels = resolve_levels(&cps("ab אב12 cd"), Direction::LeftToRight);
        let runs = level_runs(&levels);
        // ab + space (0), אב (1), 12 (2), space + cd (0)
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0].level, 0);
        assert_eq!(runs[1].level, 1);
        assert_eq!(runs[2].level, 2);
        assert_eq!(runs[3].level, 0);
        let order = visual_run_order(&runs);
        // L2 reverses the RTL segment, putting the number run before the
        // Hebrew letters visually.
        assert_eq!(order, vec![0, 2, 1, 3]);
    }

    #[test]
    fn bracket_pair_takes_embedding_direction() {
        // "(אב)" inside an RTL paragraph: brackets resolve R
        let levels = resolve_levels(&cps("(\u{05D0}\u{05D1})"), Direction::RightToLeft);
        assert_eq!(levels, vec![1, 1, 1, 1]);
    }
}

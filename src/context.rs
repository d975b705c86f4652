//! Glyph matching and skipping for contextual lookups.
//!
//! Lookup flags determine which glyphs a lookup skips while matching:
//! bases, ligatures, all marks, marks outside an attachment class, or marks
//! outside a GDEF mark filtering set.

use crate::gdef;
use crate::layout::{ClassDef, Coverage, GDEFTable};
use std::marker::PhantomData;
use std::sync::Arc;

/// A lookup's raw flag word.
#[derive(Copy, Clone)]
pub struct LookupFlag(pub u16);

impl LookupFlag {
    /// RIGHT_TO_LEFT: applies only to cursive attachment.
    pub fn rtl(self) -> bool {
        self.0 & 0x0001 != 0
    }

    pub fn ignore_bases(self) -> bool {
        self.0 & 0x0002 != 0
    }

    pub fn ignore_ligatures(self) -> bool {
        self.0 & 0x0004 != 0
    }

    pub fn ignore_marks(self) -> bool {
        self.0 & 0x0008 != 0
    }

    pub fn use_mark_filtering_set(self) -> bool {
        self.0 & 0x0010 != 0
    }

    /// Mark attachment class filter, when non-zero.
    pub fn mark_attachment_type(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// How marks are filtered while matching.
#[derive(Copy, Clone, PartialEq)]
pub enum MarkFilter {
    /// No mark skipping.
    All,
    /// Skip every mark.
    None,
    /// Keep only marks of this GDEF attachment class.
    AttachmentClass(u8),
    /// Keep only marks within this GDEF mark glyph set.
    GlyphSet(u16),
}

/// Resolved skipping behaviour for one lookup.
#[derive(Copy, Clone)]
pub struct GlyphFilter {
    ignore_bases: bool,
    ignore_ligatures: bool,
    marks: MarkFilter,
}

/// Sequence matching data for contextual rules.
pub enum MatchSet<'a> {
    Empty,
    ById(&'a [u16]),
    ByClassDef(&'a ClassDef, &'a [u16]),
    ByCoverage(&'a [Arc<Coverage>]),
}

impl<'a> MatchSet<'a> {
    pub fn len(&self) -> usize {
        match self {
            MatchSet::Empty => 0,
            MatchSet::ById(arr) => arr.len(),
            MatchSet::ByClassDef(_, arr) => arr.len(),
            MatchSet::ByCoverage(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The backtrack, input, and lookahead tables of a contextual rule.
pub struct SequenceMatch<'a> {
    pub backtrack: MatchSet<'a>,
    pub input: MatchSet<'a>,
    pub lookahead: MatchSet<'a>,
}

/// A matched context plus the nested lookup records to apply.
pub struct MatchedContext<'a, T> {
    pub candidate: SequenceMatch<'a>,
    pub nested_lookups: &'a [(u16, u16)],
    phantom: PhantomData<T>,
}

impl<'a, T> MatchedContext<'a, T> {
    pub fn new(
        candidate: SequenceMatch<'a>,
        nested_lookups: &'a [(u16, u16)],
    ) -> MatchedContext<'a, T> {
        MatchedContext {
            candidate,
            nested_lookups,
            phantom: PhantomData,
        }
    }
}

/// Anything that exposes a glyph index; the shaping buffer records
/// implement this.
pub trait Glyph {
    fn glyph_id(&self) -> u16;
}

impl GlyphFilter {
    pub fn ignore_marks() -> GlyphFilter {
        GlyphFilter {
            ignore_bases: false,
            ignore_ligatures: false,
            marks: MarkFilter::None,
        }
    }

    pub fn marks_only() -> GlyphFilter {
        GlyphFilter {
            ignore_bases: true,
            ignore_ligatures: true,
            marks: MarkFilter::All,
        }
    }

    pub fn from_lookup_flag(lookup_flag: LookupFlag, mark_filtering_set: Option<u16>) -> GlyphFilter {
        let marks = if lookup_flag.ignore_marks() {
            MarkFilter::None
        } else if lookup_flag.use_mark_filtering_set() {
            match mark_filtering_set {
                Some(set) => MarkFilter::GlyphSet(set),
                None => MarkFilter::All,
            }
        } else if lookup_flag.mark_attachment_type() != 0 {
            MarkFilter::AttachmentClass(lookup_flag.mark_attachment_type())
        } else {
            MarkFilter::All
        };
        GlyphFilter {
            ignore_bases: lookup_flag.ignore_bases(),
            ignore_ligatures: lookup_flag.ignore_ligatures(),
            marks,
        }
    }

    /// True when `glyph` takes part in matching under this filter.
    pub fn accepts<G: Glyph>(self, gdef: Option<&GDEFTable>, glyph: &G) -> bool {
        if !self.ignore_bases && !self.ignore_ligatures && self.marks == MarkFilter::All {
            // Fast path that doesn't require checking the glyph class.
            return true;
        }
        let glyph_id = glyph.glyph_id();
        let glyph_class = gdef::glyph_class(gdef, glyph_id);
        if self.ignore_bases && glyph_class == crate::layout::glyph_class::BASE {
            return false;
        }
        if self.ignore_ligatures && glyph_class == crate::layout::glyph_class::LIGATURE {
            return false;
        }
        if glyph_class != crate::layout::glyph_class::MARK {
            return true;
        }
        match self.marks {
            MarkFilter::All => true,
            MarkFilter::None => false,
            MarkFilter::AttachmentClass(keep_class) => {
                gdef::mark_attach_class(gdef, glyph_id) == u16::from(keep_class)
            }
            MarkFilter::GlyphSet(set) => gdef::mark_glyph_set_covers(gdef, set, glyph_id),
        }
    }

    /// Search backwards from `glyphs[index - 1]`.
    pub fn prev_match<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        glyphs: &[G],
        mut index: usize,
    ) -> Option<usize> {
        while index > 0 {
            index -= 1;
            if self.accepts(gdef, &glyphs[index]) {
                return Some(index);
            }
        }
        None
    }

    /// Search forwards from `glyphs[index + 1]`.
    pub fn next_match<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        glyphs: &[G],
        mut index: usize,
    ) -> Option<usize> {
        while index + 1 < glyphs.len() {
            index += 1;
            if self.accepts(gdef, &glyphs[index]) {
                return Some(index);
            }
        }
        None
    }

    /// The `count`th matching glyph after `index`; `count == 0` returns
    /// `index` itself.
    pub fn nth_match<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        glyphs: &[G],
        mut index: usize,
        count: usize,
    ) -> Option<usize> {
        for _ in 0..count {
            index = self.next_match(gdef, glyphs, index)?;
        }
        Some(index)
    }

    pub fn first_match<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        glyphs: &[G],
    ) -> Option<usize> {
        glyphs
            .iter()
            .position(|glyph| self.accepts(gdef, glyph))
    }

    /// Match `match_set` backwards from `glyphs[index - 1]`.
    pub fn matches_backward<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        match_set: &MatchSet<'_>,
        glyphs: &[G],
        mut index: usize,
    ) -> bool {
        for i in 0..match_set.len() {
            match self.prev_match(gdef, glyphs, index) {
                Some(prev_index) => {
                    index = prev_index;
                    if !match_set_contains(match_set, i, glyphs[index].glyph_id()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Match `match_set` forwards from `glyphs[index + 1]`, reporting the
    /// last matched position.
    pub fn matches_forward<G: Glyph>(
        self,
        gdef: Option<&GDEFTable>,
        match_set: &MatchSet<'_>,
        glyphs: &[G],
        mut index: usize,
        last_index: &mut usize,
    ) -> bool {
        for i in 0..match_set.len() {
            match self.next_match(gdef, glyphs, index) {
                Some(next_index) => {
                    index = next_index;
                    if !match_set_contains(match_set, i, glyphs[index].glyph_id()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        *last_index = index;
        true
    }
}

impl<'a> SequenceMatch<'a> {
    /// Test backtrack, input, and lookahead around `glyphs[index]`.
    pub fn matches<G: Glyph>(
        &self,
        gdef: Option<&GDEFTable>,
        filter: GlyphFilter,
        glyphs: &[G],
        index: usize,
    ) -> bool {
        let mut front_index = index;
        filter.matches_backward(gdef, &self.backtrack, glyphs, index)
            && filter.matches_forward(
                gdef,
                &self.input,
                glyphs,
                index,
                &mut front_index,
            )
            && filter.matches_forward(
                gdef,
                &self.lookahead,
                glyphs,
                front_index,
                &mut front_index,
            )
    }
}

fn match_set_contains(match_set: &MatchSet<'_>, i: usize, glyph_id: u16) -> bool {
    match *match_set {
        MatchSet::Empty => false,
        MatchSet::ById(table) => table[i] == glyph_id,
        MatchSet::ByClassDef(classdef, table) => {
            classdef.class_of(glyph_id) == table[i]
        }
        MatchSet::ByCoverage(vec) => vec[i].index_of(glyph_id).is_some(),
    }
}

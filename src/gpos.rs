//! Glyph positioning (`GPOS`) implementation.
//!
//! Positioning writes flat x/y offset and advance deltas into the shaping
//! buffer. ValueRecords accumulate directly; cursive attachment and mark
//! attachment resolve their anchors against the advances already present in
//! the buffer, so no second positioning pass is needed.

use crate::context::{MatchedContext, GlyphFilter};
use crate::error::ParseError;
use crate::gdef::gdef_is_mark;
use crate::gsub::{matched_chain_context_shared, ShapedGlyph};
use crate::layout::{
    Adjust, Anchor, ChainContextLookup, ContextLookup, CursivePos, GDEFTable, LayoutTable,
    MarkBasePos, MarkLigPos, PairPos, PosLookup, SinglePos, GPOS,
};
use crate::tables::kern::KernTable;
use crate::tag;
use crate::unicode::props::{general_category, GeneralCategory};

type PosContext<'a> = MatchedContext<'a, GPOS>;

/// Features applied for plain horizontal text.
const DEFAULT_FEATURES: &[u32] = &[tag::DIST, tag::KERN_FEATURE, tag::MARK, tag::MKMK];

/// Features applied for joining scripts.
const CURSIVE_FEATURES: &[u32] = &[
    tag::CURS,
    tag::DIST,
    tag::KERN_FEATURE,
    tag::MARK,
    tag::MKMK,
];

/// Features applied for Indic scripts (mark features come via abvm/blwm).
const INDIC_FEATURES: &[u32] = &[
    tag::ABVM,
    tag::BLWM,
    tag::DIST,
    tag::KERN_FEATURE,
    tag::MARK,
    tag::MKMK,
];

/// Which positioning feature set a script selects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PosFeatureSet {
    Default,
    Cursive,
    Indic,
}

/// Apply glyph positioning for a shaped run.
///
/// `kerning` controls whether the `kern` feature is enabled for non-complex
/// scripts.
pub fn apply(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    feature_set: PosFeatureSet,
    kerning: bool,
    script_tag: u32,
    opt_lang_tag: Option<u32>,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let Some(script) = gpos_table.script_or_default(script_tag) else {
        return Ok(());
    };
    let Some(langsys) = script.langsys_or_default(opt_lang_tag) else {
        return Ok(());
    };

    let feature_tags: Vec<u32> = match feature_set {
        PosFeatureSet::Cursive => CURSIVE_FEATURES.to_vec(),
        PosFeatureSet::Indic => INDIC_FEATURES.to_vec(),
        PosFeatureSet::Default => DEFAULT_FEATURES.to_vec(),
    }
    .into_iter()
    .filter(|&feature| kerning || feature != tag::KERN_FEATURE)
    .collect();

    // Collect lookup indices in LookupList order; the required feature is
    // always applied.
    let mut lookup_indices: Vec<usize> = Vec::new();
    if let Some(required_index) = langsys.required_feature_index {
        let feature_record = gpos_table.feature_by_index(required_index)?;
        lookup_indices.extend(
            feature_record
                .feature_table()
                .lookup_indices
                .iter()
                .map(|&i| usize::from(i)),
        );
    }
    for feature_tag in feature_tags {
        if let Some(feature_table) = gpos_table.langsys_feature(langsys, feature_tag)? {
            lookup_indices.extend(
                feature_table
                    .lookup_indices
                    .iter()
                    .map(|&i| usize::from(i)),
            );
        }
    }
    lookup_indices.sort_unstable();
    lookup_indices.dedup();

    for lookup_index in lookup_indices {
        apply_lookup(gpos_table, gdef, lookup_index, glyphs)?;
    }
    Ok(())
}

/// Basic positioning when no `GPOS` table is available: legacy kern pairs
/// plus overprinting of non-spacing marks.
pub fn apply_fallback(opt_kern_table: Option<&KernTable<'_>>, glyphs: &mut [ShapedGlyph]) {
    if let Some(kern) = opt_kern_table {
        for i in 1..glyphs.len() {
            let left = glyphs[i - 1].glyph_id;
            let right = glyphs[i].glyph_id;
            if let Some(value) = kern.horizontal_kerning(left, right) {
                glyphs[i - 1].x_advance += i32::from(value);
            }
        }
    }

    // Overprint non-spacing marks on their preceding base.
    let mut base_advance = 0i32;
    for i in 0..glyphs.len() {
        let is_mark = glyphs[i]
            .unicodes
            .first()
            .map_or(false, |&ch| {
                general_category(ch as u32) == GeneralCategory::NonspacingMark
            });
        if is_mark && i > 0 {
            glyphs[i].x_offset -= base_advance;
            glyphs[i].x_advance = 0;
        } else {
            base_advance = glyphs[i].x_advance;
        }
    }
}

fn apply_lookup(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    lookup_index: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let lookup = gpos_table.lookup(lookup_index)?;
    let filter = GlyphFilter::from_lookup_flag(lookup.lookup_flag, lookup.mark_filtering_set);
    match lookup.subtables {
        PosLookup::SinglePos(ref subtables) => {
            for i in 0..glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) {
                    apply_single_adjust(subtables, i, glyphs)?;
                }
            }
            Ok(())
        }
        PosLookup::PairPos(ref subtables) => {
            forall_glyph_pairs(filter, gdef, glyphs, |i1, i2, glyphs| {
                apply_pair_adjust(subtables, i1, i2, glyphs)
            })
        }
        PosLookup::CursivePos(ref subtables) => cursive_attachment(
            subtables,
            lookup.lookup_flag.rtl(),
            gdef,
            glyphs,
        ),
        PosLookup::MarkBasePos(ref subtables) => {
            forall_base_mark_pairs(gdef, glyphs, |i1, i2, glyphs| {
                apply_mark_to_base(subtables, i1, i2, glyphs)
            })
        }
        PosLookup::MarkLigPos(ref subtables) => {
            forall_base_mark_pairs(gdef, glyphs, |i1, i2, glyphs| {
                apply_mark_to_ligature(subtables, i1, i2, glyphs)
            })
        }
        PosLookup::MarkMarkPos(ref subtables) => {
            forall_mark_mark_pairs(gdef, glyphs, |i1, i2, glyphs| {
                apply_mark_to_base(subtables, i1, i2, glyphs)
            })
        }
        PosLookup::ContextPos(ref subtables) => {
            for i in 0..glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) {
                    apply_context_pos(
                        gpos_table,
                        gdef,
                        filter,
                        subtables,
                        i,
                        glyphs,
                    )?;
                }
            }
            Ok(())
        }
        PosLookup::ChainContextPos(ref subtables) => {
            for i in 0..glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) {
                    apply_chain_context_pos(
                        gpos_table,
                        gdef,
                        filter,
                        subtables,
                        i,
                        glyphs,
                    )?;
                }
            }
            Ok(())
        }
    }
}

impl Adjust {
    fn apply(&self, glyph: &mut ShapedGlyph) {
        glyph.x_offset += i32::from(self.x_placement);
        glyph.y_offset += i32::from(self.y_placement);
        glyph.x_advance += i32::from(self.x_advance);
        glyph.y_advance += i32::from(self.y_advance);
    }
}

fn apply_single_adjust(subtables: &[SinglePos], i: usize, glyphs: &mut [ShapedGlyph]) -> Result<(), ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    for single_pos in subtables {
        if let Some(adjust) = single_pos.apply(glyph_id)? {
            adjust.apply(&mut glyphs[i]);
            break;
        }
    }
    Ok(())
}

fn apply_pair_adjust(
    subtables: &[PairPos],
    i1: usize,
    i2: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    for pair_pos in subtables {
        if let Some((opt_adj1, opt_adj2)) =
            pair_pos.apply(glyphs[i1].glyph_id, glyphs[i2].glyph_id)?
        {
            if let Some(adj1) = opt_adj1 {
                adj1.apply(&mut glyphs[i1]);
            }
            if let Some(adj2) = opt_adj2 {
                adj2.apply(&mut glyphs[i2]);
            }
            return Ok(());
        }
    }
    Ok(())
}

/// Cursive attachment state machine.
///
/// Walks the matching glyphs in buffer order keeping the previous matched
/// position; on each entry/exit match the preceding glyph's advance is
/// trimmed to its exit anchor and the following glyph is translated so its
/// entry anchor coincides with that exit. The RIGHT_TO_LEFT lookup flag
/// selects which side of the pair takes the cross-stream shift, and the
/// shift is propagated along the attached chain.
fn cursive_attachment(
    subtables: &[CursivePos],
    rtl_flag: bool,
    gdef: Option<&GDEFTable>,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let filter = GlyphFilter::ignore_marks();
    let Some(mut i1) = filter.first_match(gdef, glyphs) else {
        return Ok(());
    };
    // Start of the chain currently attached to glyphs[i1], for shift
    // propagation.
    let mut chain_start: Option<usize> = None;
    while let Some(i2) = filter.next_match(gdef, glyphs, i1) {
        let mut attached = None;
        for cursive_pos in subtables {
            if let Some((exit, entry)) =
                cursive_pos.apply(glyphs[i1].glyph_id, glyphs[i2].glyph_id)?
            {
                attached = Some((exit, entry));
                break;
            }
        }
        if let Some((exit, entry)) = attached {
            attach_cursive(glyphs, i1, i2, exit, entry, rtl_flag, chain_start);
            if chain_start.is_none() {
                chain_start = Some(i1);
            }
        } else {
            chain_start = None;
        }
        i1 = i2;
    }
    Ok(())
}

fn attach_cursive(
    glyphs: &mut [ShapedGlyph],
    i1: usize,
    i2: usize,
    exit: Anchor,
    entry: Anchor,
    rtl_flag: bool,
    chain_start: Option<usize>,
) {
    // Line direction: the pen leaves the first glyph at its exit anchor.
    glyphs[i1].x_advance = i32::from(exit.x) + glyphs[i1].x_offset;
    let d = i32::from(entry.x) + glyphs[i2].x_offset;
    glyphs[i2].x_advance -= d;
    glyphs[i2].x_offset -= d;

    // Cross-stream direction.
    let dy = i32::from(exit.y) - i32::from(entry.y);
    if rtl_flag {
        // The first glyph (and its attached chain) moves to align with the
        // second.
        let shift = glyphs[i2].y_offset - dy - glyphs[i1].y_offset;
        let start = chain_start.unwrap_or(i1);
        for glyph in &mut glyphs[start..=i1] {
            glyph.y_offset += shift;
        }
    } else {
        glyphs[i2].y_offset = glyphs[i1].y_offset + dy;
    }
}

/// Distance covered by the advances of `glyphs[from..to]`.
fn advance_span(glyphs: &[ShapedGlyph], from: usize, to: usize) -> (i32, i32) {
    glyphs[from..to].iter().fold((0, 0), |(x, y), glyph| {
        (x + glyph.x_advance, y + glyph.y_advance)
    })
}

fn attach_mark(glyphs: &mut [ShapedGlyph], base: usize, mark: usize, base_anchor: Anchor, mark_anchor: Anchor) {
    // The pen has advanced past the base (and everything between) by the
    // time the mark is placed; compensate so the anchors coincide.
    let (span_x, span_y) = advance_span(glyphs, base, mark);
    glyphs[mark].x_offset =
        glyphs[base].x_offset + i32::from(base_anchor.x) - i32::from(mark_anchor.x) - span_x;
    glyphs[mark].y_offset =
        glyphs[base].y_offset + i32::from(base_anchor.y) - i32::from(mark_anchor.y) - span_y;
}

fn apply_mark_to_base(
    subtables: &[MarkBasePos],
    i1: usize,
    i2: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<bool, ParseError> {
    for mark_base_pos in subtables {
        if let Some((base_anchor, mark_anchor)) =
            mark_base_pos.apply(glyphs[i1].glyph_id, glyphs[i2].glyph_id)?
        {
            attach_mark(glyphs, i1, i2, base_anchor, mark_anchor);
            return Ok(true);
        }
    }
    Ok(false)
}

fn apply_mark_to_ligature(
    subtables: &[MarkLigPos],
    i1: usize,
    i2: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<bool, ParseError> {
    let component = usize::from(glyphs[i2].liga_component);
    for mark_lig_pos in subtables {
        if let Some((liga_anchor, mark_anchor)) =
            mark_lig_pos.apply(glyphs[i1].glyph_id, glyphs[i2].glyph_id, component)?
        {
            attach_mark(glyphs, i1, i2, liga_anchor, mark_anchor);
            return Ok(true);
        }
    }
    Ok(false)
}

fn forall_glyph_pairs(
    filter: GlyphFilter,
    gdef: Option<&GDEFTable>,
    glyphs: &mut [ShapedGlyph],
    f: impl Fn(usize, usize, &mut [ShapedGlyph]) -> Result<(), ParseError>,
) -> Result<(), ParseError> {
    if let Some(mut i1) = filter.first_match(gdef, glyphs) {
        while let Some(i2) = filter.next_match(gdef, glyphs, i1) {
            f(i1, i2, glyphs)?;
            i1 = i2;
        }
    }
    Ok(())
}

/// Visit (base, mark) pairs: each mark pairs with the nearest preceding
/// non-mark glyph.
fn forall_base_mark_pairs(
    gdef: Option<&GDEFTable>,
    glyphs: &mut [ShapedGlyph],
    f: impl Fn(usize, usize, &mut [ShapedGlyph]) -> Result<bool, ParseError>,
) -> Result<(), ParseError> {
    let mut base: Option<usize> = None;
    for i in 0..glyphs.len() {
        if gdef_is_mark(gdef, glyphs[i].glyph_id) {
            if let Some(base_index) = base {
                f(base_index, i, glyphs)?;
            }
        } else {
            base = Some(i);
        }
    }
    Ok(())
}

/// Visit (mark, mark) pairs: each mark pairs with the immediately preceding
/// mark.
fn forall_mark_mark_pairs(
    gdef: Option<&GDEFTable>,
    glyphs: &mut [ShapedGlyph],
    f: impl Fn(usize, usize, &mut [ShapedGlyph]) -> Result<bool, ParseError>,
) -> Result<(), ParseError> {
    for i in 1..glyphs.len() {
        if !gdef_is_mark(gdef, glyphs[i].glyph_id) {
            continue;
        }
        let mut j = i;
        while j > 0 {
            j -= 1;
            if !gdef_is_mark(gdef, glyphs[j].glyph_id) {
                break;
            }
            if f(j, i, glyphs)? {
                break;
            }
        }
    }
    Ok(())
}

fn apply_context_pos(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    filter: GlyphFilter,
    subtables: &[ContextLookup<GPOS>],
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    let mut matched: Option<Box<PosContext<'_>>> = None;
    for context_lookup in subtables {
        if let Some(context) = matched_context_pos(context_lookup, glyph_id, |context| {
            context.matches(gdef, filter, glyphs, i)
        })? {
            matched = Some(context);
            break;
        }
    }
    match matched {
        Some(pos) => apply_pos_context(gpos_table, gdef, filter, &pos, i, glyphs),
        None => Ok(()),
    }
}

fn apply_chain_context_pos(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    filter: GlyphFilter,
    subtables: &[ChainContextLookup<GPOS>],
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    let mut matched: Option<Box<PosContext<'_>>> = None;
    for chain_context_lookup in subtables {
        if let Some(context) =
            matched_chain_context_shared(chain_context_lookup, glyph_id, |context| {
                context.matches(gdef, filter, glyphs, i)
            })?
        {
            matched = Some(context);
            break;
        }
    }
    match matched {
        Some(pos) => apply_pos_context(gpos_table, gdef, filter, &pos, i, glyphs),
        None => Ok(()),
    }
}

fn matched_context_pos<'a>(
    context_lookup: &'a ContextLookup<GPOS>,
    glyph: u16,
    f: impl Fn(&crate::context::SequenceMatch<'a>) -> bool,
) -> Result<Option<Box<PosContext<'a>>>, ParseError> {
    use crate::context::{MatchSet, SequenceMatch};
    use crate::layout::ContextLookup as CL;
    match context_lookup {
        CL::Format1 {
            coverage,
            rule_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(slot) => match rule_sets.get(usize::from(slot)) {
                Some(Some(rule_set)) => {
                    for rule in &rule_set.rules {
                        let candidate = SequenceMatch {
                            backtrack: MatchSet::Empty,
                            input: MatchSet::ById(&rule.input_sequence),
                            lookahead: MatchSet::Empty,
                        };
                        if f(&candidate) {
                            return Ok(Some(Box::new(MatchedContext::new(
                                candidate,
                                &rule.lookup_actions,
                            ))));
                        }
                    }
                    Ok(None)
                }
                _ => Ok(None),
            },
            None => Ok(None),
        },
        CL::Format2 {
            coverage,
            classdef,
            class_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(_slot) => {
                let class_value = usize::from(classdef.class_of(glyph));
                match class_sets.get(class_value) {
                    Some(Some(class_set)) => {
                        for rule in &class_set.rules {
                            let candidate = SequenceMatch {
                                backtrack: MatchSet::Empty,
                                input: MatchSet::ByClassDef(classdef, &rule.input_sequence),
                                lookahead: MatchSet::Empty,
                            };
                            if f(&candidate) {
                                return Ok(Some(Box::new(MatchedContext::new(
                                    candidate,
                                    &rule.lookup_actions,
                                ))));
                            }
                        }
                        Ok(None)
                    }
                    _ => Ok(None),
                }
            }
            None => Ok(None),
        },
        CL::Format3 {
            coverages,
            lookup_actions,
            phantom: _,
        } => {
            if coverages.is_empty() || coverages[0].index_of(glyph).is_none() {
                return Ok(None);
            }
            let candidate = SequenceMatch {
                backtrack: MatchSet::Empty,
                input: MatchSet::ByCoverage(&coverages[1..]),
                lookahead: MatchSet::Empty,
            };
            if f(&candidate) {
                Ok(Some(Box::new(MatchedContext::new(
                    candidate,
                    lookup_actions,
                ))))
            } else {
                Ok(None)
            }
        }
    }
}

fn apply_pos_context(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    filter: GlyphFilter,
    pos: &PosContext<'_>,
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    for (pos_index, pos_lookup_index) in pos.nested_lookups {
        apply_pos(
            gpos_table,
            gdef,
            filter,
            usize::from(*pos_index),
            usize::from(*pos_lookup_index),
            glyphs,
            i,
        )?;
    }
    Ok(())
}

fn apply_pos(
    gpos_table: &LayoutTable<GPOS>,
    gdef: Option<&GDEFTable>,
    parent_filter: GlyphFilter,
    pos_index: usize,
    lookup_index: usize,
    glyphs: &mut [ShapedGlyph],
    index: usize,
) -> Result<(), ParseError> {
    let lookup = gpos_table.lookup(lookup_index)?;
    let filter = GlyphFilter::from_lookup_flag(lookup.lookup_flag, lookup.mark_filtering_set);
    let i1 = match parent_filter.nth_match(gdef, glyphs, index, pos_index) {
        Some(index1) => index1,
        None => return Ok(()),
    };
    match lookup.subtables {
        PosLookup::SinglePos(ref subtables) => apply_single_adjust(subtables, i1, glyphs),
        PosLookup::PairPos(ref subtables) => {
            if let Some(i2) = filter.next_match(gdef, glyphs, i1) {
                apply_pair_adjust(subtables, i1, i2, glyphs)
            } else {
                Ok(())
            }
        }
        PosLookup::CursivePos(ref subtables) => {
            if let Some(i2) = GlyphFilter::ignore_marks().next_match(gdef, glyphs, i1) {
                let mut attached = None;
                for cursive_pos in subtables {
                    if let Some(anchors) =
                        cursive_pos.apply(glyphs[i1].glyph_id, glyphs[i2].glyph_id)?
                    {
                        attached = Some(anchors);
                        break;
                    }
                }
                if let Some((exit, entry)) = attached {
                    attach_cursive(glyphs, i1, i2, exit, entry, lookup.lookup_flag.rtl(), None);
                }
            }
            Ok(())
        }
        PosLookup::MarkBasePos(ref subtables) => {
            if let Some(base_index) = GlyphFilter::ignore_marks().prev_match(gdef, glyphs, i1)
            {
                apply_mark_to_base(subtables, base_index, i1, glyphs)?;
            }
            Ok(())
        }
        PosLookup::MarkLigPos(ref subtables) => {
            if let Some(base_index) = GlyphFilter::ignore_marks().prev_match(gdef, glyphs, i1)
            {
                apply_mark_to_ligature(subtables, base_index, i1, glyphs)?;
            }
            Ok(())
        }
        PosLookup::MarkMarkPos(ref subtables) => {
            if let Some(prev_index) = filter.prev_match(gdef, glyphs, i1) {
                apply_mark_to_base(subtables, prev_index, i1, glyphs)?;
            }
            Ok(())
        }
        // Nested contextual positioning is not recursed into.
        PosLookup::ContextPos(_) | PosLookup::ChainContextPos(_) => Ok(()),
    }
}

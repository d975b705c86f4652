//! Glyph substitution (`GSUB`) implementation.
//!
//! Lookups walk the mutable shaping buffer in buffer order; within a lookup
//! the first matching subtable wins. Lookups selected by the enabled
//! features apply in LookupList order, so feature ordering never affects the
//! result.

use std::collections::BTreeMap;

use bitflags::bitflags;
use tinyvec::{tiny_vec, TinyVec};

use crate::context::{MatchedContext, Glyph, MatchSet, SequenceMatch, GlyphFilter};
use crate::error::{ParseError, ShapingError};
use crate::gdef;
use crate::layout::{
    AlternateSet, AlternateSubst, ChainContextLookup, ContextLookup, GDEFTable, LangSys,
    LayoutTable, Ligature, LigatureSubst, ParsedLookup, MultipleSubst, ReverseChainSingleSubst,
    RuleSet, SequenceTable, SingleSubst, SubstLookup, GSUB,
};
use crate::tag;
use crate::unicode::VariationSelector;

/// Maximum depth of nested contextual substitutions.
const SUBST_RECURSION_LIMIT: usize = 2;

bitflags! {
    /// Per-glyph feature memberships assigned during preprocessing.
    #[derive(Default)]
    pub struct FeatureMask: u16 {
        const ISOL = 1 << 0;
        const INIT = 1 << 1;
        const MEDI = 1 << 2;
        const FINA = 1 << 3;
        const RPHF = 1 << 4;
        const HALF = 1 << 5;
        const PREF = 1 << 6;
        const BLWF = 1 << 7;
        const PSTF = 1 << 8;
    }
}

impl FeatureMask {
    /// The mask bit controlling `feature_tag`, if it is a per-glyph feature.
    pub fn from_tag(feature_tag: u32) -> Option<FeatureMask> {
        match feature_tag {
            tag::ISOL => Some(FeatureMask::ISOL),
            tag::INIT => Some(FeatureMask::INIT),
            tag::MEDI => Some(FeatureMask::MEDI),
            tag::FINA => Some(FeatureMask::FINA),
            tag::RPHF => Some(FeatureMask::RPHF),
            tag::HALF => Some(FeatureMask::HALF),
            tag::PREF => Some(FeatureMask::PREF),
            tag::BLWF => Some(FeatureMask::BLWF),
            tag::PSTF => Some(FeatureMask::PSTF),
            _ => None,
        }
    }
}

/// Where a buffer glyph came from.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GlyphSource {
    /// Mapped directly from a character.
    Char(char),
    /// Produced by substitution.
    Direct,
}

impl Default for GlyphSource {
    fn default() -> Self {
        GlyphSource::Direct
    }
}

/// One record of the mutable shaping buffer.
///
/// Carries the glyph, its originating codepoints and cluster, ligature
/// bookkeeping, and the positioning deltas that `GPOS` accumulates.
#[derive(Clone, Debug, Default)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    /// The characters this glyph originates from; ligatures accumulate
    /// every component's characters.
    pub unicodes: TinyVec<[char; 1]>,
    /// Identifier of the originating codepoint group. Non-decreasing across
    /// the buffer; ligatures keep the first component's cluster.
    pub cluster: u32,
    pub source: GlyphSource,
    pub variation: Option<VariationSelector>,
    /// Per-glyph feature memberships (joining forms, syllable roles).
    pub features: FeatureMask,
    /// Non-zero for glyphs produced by (or trailing) a ligature.
    pub ligature_id: u16,
    /// Component index a trailing mark attaches to within its ligature.
    pub liga_component: u8,
    /// GDEF mark attachment class.
    pub mark_attach_class: u8,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub y_advance: i32,
}

impl ShapedGlyph {
    /// A buffer record for `ch` mapped to `glyph_id` at `cluster`.
    pub fn from_char(ch: char, glyph_id: u16, cluster: u32) -> ShapedGlyph {
        ShapedGlyph {
            glyph_id,
            unicodes: tiny_vec![[char; 1] => ch],
            cluster,
            source: GlyphSource::Char(ch),
            ..ShapedGlyph::default()
        }
    }
}

impl Glyph for ShapedGlyph {
    fn glyph_id(&self) -> u16 {
        self.glyph_id
    }
}

type SubstContext<'a> = MatchedContext<'a, GSUB>;

impl Ligature {
    pub fn matches(
        &self,
        filter: GlyphFilter,
        gdef: Option<&GDEFTable>,
        i: usize,
        glyphs: &[ShapedGlyph],
    ) -> bool {
        let mut last_index = 0;
        filter.matches_forward(
            gdef,
            &MatchSet::ById(&self.component_glyphs),
            glyphs,
            i,
            &mut last_index,
        )
    }

    /// Merge the matched components into `glyphs[i]`.
    ///
    /// Skipped glyphs (marks) between components stay in the buffer and are
    /// tagged with the component they followed so mark-to-ligature
    /// positioning can find its anchor. Returns the number of glyphs left in
    /// place between `i` and the final component.
    pub fn apply(
        &self,
        filter: GlyphFilter,
        gdef: Option<&GDEFTable>,
        ligature_id: u16,
        i: usize,
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> Result<usize, ParseError> {
        let mut index = i + 1;
        let mut matched = 0;
        let mut skip = 0;
        while matched < self.component_glyphs.len() {
            if index >= glyphs.len() {
                return Err(ParseError::IndexOutOfBounds);
            }
            if filter.accepts(gdef, &glyphs[index]) {
                matched += 1;
                let unicodes = glyphs[index].unicodes.clone();
                glyphs[i].unicodes.extend_from_slice(&unicodes);
                glyphs.remove(index);
            } else {
                glyphs[index].ligature_id = ligature_id;
                glyphs[index].liga_component = matched as u8;
                skip += 1;
                index += 1;
            }
        }
        // Marks following the final component also belong to the ligature.
        while index < glyphs.len()
            && GlyphFilter::marks_only().accepts(gdef, &glyphs[index])
        {
            glyphs[index].ligature_id = ligature_id;
            glyphs[index].liga_component = matched as u8;
            index += 1;
        }
        glyphs[i].glyph_id = self.ligature_glyph;
        glyphs[i].source = GlyphSource::Direct;
        glyphs[i].ligature_id = ligature_id;
        glyphs[i].liga_component = 0;
        Ok(skip)
    }
}

/// Features applied by default for non-complex scripts.
pub const DEFAULT_FEATURES: &[u32] = &[tag::CCMP, tag::LIGA, tag::CLIG, tag::RLIG, tag::CALT];

/// Collect `(lookup index, feature tag)` pairs for the requested features,
/// in LookupList order. The language system's required feature is always
/// included.
pub fn build_lookups(
    gsub_table: &LayoutTable<GSUB>,
    langsys: &LangSys,
    feature_tags: &[u32],
) -> Result<Vec<(usize, u32)>, ParseError> {
    let mut lookups = BTreeMap::new();
    if let Some(required_index) = langsys.required_feature_index {
        let feature_record = gsub_table.feature_by_index(required_index)?;
        for lookup_index in &feature_record.feature_table().lookup_indices {
            lookups.insert(usize::from(*lookup_index), feature_record.feature_tag);
        }
    }
    for feature_tag in feature_tags {
        if let Some(feature_table) = gsub_table.langsys_feature(langsys, *feature_tag)? {
            for lookup_index in &feature_table.lookup_indices {
                lookups.insert(usize::from(*lookup_index), *feature_tag);
            }
        } else if *feature_tag == tag::VRT2 {
            // vert is the fallback for vrt2.
            if let Some(feature_table) = gsub_table.langsys_feature(langsys, tag::VERT)? {
                for lookup_index in &feature_table.lookup_indices {
                    lookups.insert(usize::from(*lookup_index), tag::VERT);
                }
            }
        }
    }
    // BTreeMap iteration yields LookupList order.
    Ok(lookups.into_iter().collect())
}

/// Apply the substitutions selected by `feature_tags` to the buffer.
pub fn apply_features(
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    script_tag: u32,
    opt_lang_tag: Option<u32>,
    feature_tags: &[u32],
    num_glyphs: u16,
    glyphs: &mut Vec<ShapedGlyph>,
) -> Result<(), ShapingError> {
    let Some(script) = gsub_table.script_or_default(script_tag) else {
        return Ok(());
    };
    let Some(langsys) = script.langsys_or_default(opt_lang_tag) else {
        return Ok(());
    };
    let lookups = build_lookups(gsub_table, langsys, feature_tags)?;
    let mut ligature_id = 1u16;
    for (lookup_index, feature_tag) in lookups {
        apply_lookup(
            gsub_table,
            gdef,
            lookup_index,
            feature_tag,
            None,
            glyphs,
            &mut ligature_id,
            |glyph| match FeatureMask::from_tag(feature_tag) {
                Some(mask) => glyph.features.contains(mask),
                None => true,
            },
        )?;
    }
    replace_missing_glyphs(glyphs, num_glyphs);
    Ok(())
}

/// Apply a single lookup to every matching buffer position.
#[allow(clippy::too_many_arguments)]
pub fn apply_lookup(
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    lookup_index: usize,
    feature_tag: u32,
    opt_alternate: Option<usize>,
    glyphs: &mut Vec<ShapedGlyph>,
    ligature_id: &mut u16,
    pred: impl Fn(&ShapedGlyph) -> bool,
) -> Result<(), ParseError> {
    let lookup = gsub_table.lookup(lookup_index)?;
    let filter = GlyphFilter::from_lookup_flag(lookup.lookup_flag, lookup.mark_filtering_set);
    match lookup.subtables {
        SubstLookup::SingleSubst(ref subtables) => {
            for i in 0..glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    apply_single(subtables, feature_tag, i, glyphs)?;
                }
            }
        }
        SubstLookup::MultipleSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    match apply_multiple(subtables, i, glyphs)? {
                        Some(replace_count) => i += replace_count.max(1),
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::AlternateSubst(ref subtables) => {
            for i in 0..glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    let alternate = opt_alternate.unwrap_or(0);
                    apply_alternate(subtables, alternate, i, glyphs)?;
                }
            }
        }
        SubstLookup::LigatureSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    match apply_ligature(
                        gdef,
                        subtables,
                        filter,
                        *ligature_id,
                        i,
                        glyphs,
                    )? {
                        Some(skip_count) => {
                            *ligature_id = ligature_id.wrapping_add(1).max(1);
                            i += skip_count + 1;
                        }
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::ContextSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    match apply_context(
                        SUBST_RECURSION_LIMIT,
                        gsub_table,
                        gdef,
                        subtables,
                        feature_tag,
                        filter,
                        i,
                        glyphs,
                        ligature_id,
                    )? {
                        Some((length, _changes)) => i += length.max(1),
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::ChainContextSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    match apply_chain_context(
                        SUBST_RECURSION_LIMIT,
                        gsub_table,
                        gdef,
                        subtables,
                        feature_tag,
                        filter,
                        i,
                        glyphs,
                        ligature_id,
                    )? {
                        Some((length, _changes)) => i += length.max(1),
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::ReverseChainSingleSubst(ref subtables) => {
            // Right-to-left pass; each position is matched against the
            // original (already updated) following context.
            for i in (0..glyphs.len()).rev() {
                if filter.accepts(gdef, &glyphs[i]) && pred(&glyphs[i]) {
                    apply_reverse_chain(gdef, subtables, filter, i, glyphs)?;
                }
            }
        }
    }
    Ok(())
}

fn apply_single(
    subtables: &[SingleSubst],
    _subst_tag: u32,
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    for single_subst in subtables {
        if let Some(output_glyph) = single_subst.substitute(glyph_id)? {
            glyphs[i].glyph_id = output_glyph;
            glyphs[i].source = GlyphSource::Direct;
            break;
        }
    }
    Ok(())
}

fn apply_multiple(
    subtables: &[MultipleSubst],
    i: usize,
    glyphs: &mut Vec<ShapedGlyph>,
) -> Result<Option<usize>, ParseError> {
    let mut matched: Option<&SequenceTable> = None;
    for multiple_subst in subtables {
        if let Some(sequence_table) = multiple_subst.substitute(glyphs[i].glyph_id)? {
            matched = Some(sequence_table);
            break;
        }
    }
    match matched {
        Some(sequence_table) => {
            if !sequence_table.substitute_glyphs.is_empty() {
                glyphs[i].glyph_id = sequence_table.substitute_glyphs[0];
                glyphs[i].source = GlyphSource::Direct;
                for j in 1..sequence_table.substitute_glyphs.len() {
                    // Expansion glyphs keep the cluster of their source.
                    let glyph = ShapedGlyph {
                        glyph_id: sequence_table.substitute_glyphs[j],
                        unicodes: glyphs[i].unicodes.clone(),
                        cluster: glyphs[i].cluster,
                        source: GlyphSource::Direct,
                        variation: glyphs[i].variation,
                        features: glyphs[i].features,
                        ..ShapedGlyph::default()
                    };
                    glyphs.insert(i + j, glyph);
                }
                Ok(Some(sequence_table.substitute_glyphs.len()))
            } else {
                // The spec forbids empty sequences but implementations treat
                // them as deletion.
                glyphs.remove(i);
                Ok(Some(0))
            }
        }
        None => Ok(None),
    }
}

fn apply_alternate(
    subtables: &[AlternateSubst],
    alternate: usize,
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let mut matched: Option<&AlternateSet> = None;
    for alternate_subst in subtables {
        if let Some(alternate_set) = alternate_subst.substitute(glyphs[i].glyph_id)? {
            matched = Some(alternate_set);
            break;
        }
    }
    if let Some(alternate_set) = matched {
        if alternate < alternate_set.alternate_glyphs.len() {
            glyphs[i].glyph_id = alternate_set.alternate_glyphs[alternate];
            glyphs[i].source = GlyphSource::Direct;
        }
    }
    Ok(())
}

fn apply_ligature(
    gdef: Option<&GDEFTable>,
    subtables: &[LigatureSubst],
    filter: GlyphFilter,
    ligature_id: u16,
    i: usize,
    glyphs: &mut Vec<ShapedGlyph>,
) -> Result<Option<usize>, ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    for ligature_subst in subtables {
        if let Some(ligature_set) = ligature_subst.substitute(glyph_id)? {
            for ligature in &ligature_set.ligatures {
                if ligature.matches(filter, gdef, i, glyphs) {
                    let skip =
                        ligature.apply(filter, gdef, ligature_id, i, glyphs)?;
                    return Ok(Some(skip));
                }
            }
        }
    }
    Ok(None)
}

fn apply_reverse_chain(
    gdef: Option<&GDEFTable>,
    subtables: &[ReverseChainSingleSubst],
    filter: GlyphFilter,
    i: usize,
    glyphs: &mut [ShapedGlyph],
) -> Result<(), ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    for subtable in subtables {
        let ReverseChainSingleSubst::Format1 {
            coverage,
            backtrack_coverages,
            lookahead_coverages,
            substitute_glyphs,
        } = subtable;
        if let Some(slot) = coverage.index_of(glyph_id) {
            let context = SequenceMatch {
                backtrack: MatchSet::ByCoverage(backtrack_coverages),
                input: MatchSet::Empty,
                lookahead: MatchSet::ByCoverage(lookahead_coverages),
            };
            if context.matches(gdef, filter, glyphs, i) {
                let slot = usize::from(slot);
                if slot < substitute_glyphs.len() {
                    glyphs[i].glyph_id = substitute_glyphs[slot];
                    glyphs[i].source = GlyphSource::Direct;
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

fn matched_context<'a>(
    context_lookup: &'a ContextLookup<GSUB>,
    glyph: u16,
    f: impl Fn(&SequenceMatch<'a>) -> bool,
) -> Result<Option<Box<SubstContext<'a>>>, ParseError> {
    match context_lookup {
        ContextLookup::Format1 {
            coverage,
            rule_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(slot) => {
                match rule_sets.get(usize::from(slot)) {
                    Some(Some(rule_set)) => {
                        find_matching_rule(rule_set, |rule| SequenceMatch {
                            backtrack: MatchSet::Empty,
                            input: MatchSet::ById(&rule.input_sequence),
                            lookahead: MatchSet::Empty,
                        }, &f)
                    }
                    _ => Ok(None),
                }
            }
            None => Ok(None),
        },
        ContextLookup::Format2 {
            coverage,
            classdef,
            class_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(_slot) => {
                let class_value = usize::from(classdef.class_of(glyph));
                match class_sets.get(class_value) {
                    Some(Some(class_set)) => {
                        find_matching_rule(class_set, |rule| SequenceMatch {
                            backtrack: MatchSet::Empty,
                            input: MatchSet::ByClassDef(classdef, &rule.input_sequence),
                            lookahead: MatchSet::Empty,
                        }, &f)
                    }
                    _ => Ok(None),
                }
            }
            None => Ok(None),
        },
        ContextLookup::Format3 {
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

fn matched_chain_context<'a>(
    chain_context_lookup: &'a ChainContextLookup<GSUB>,
    glyph: u16,
    f: impl Fn(&SequenceMatch<'a>) -> bool,
) -> Result<Option<Box<SubstContext<'a>>>, ParseError> {
    matched_chain_context_shared(chain_context_lookup, glyph, f)
}

/// Shared between GSUB and GPOS chained-context handling.
pub(crate) fn matched_chain_context_shared<'a, T: crate::layout::LayoutTableType>(
    chain_context_lookup: &'a ChainContextLookup<T>,
    glyph: u16,
    f: impl Fn(&SequenceMatch<'a>) -> bool,
) -> Result<Option<Box<MatchedContext<'a, T>>>, ParseError> {
    match chain_context_lookup {
        ChainContextLookup::Format1 {
            coverage,
            chain_rule_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(slot) => match chain_rule_sets.get(usize::from(slot)) {
                Some(Some(rule_set)) => find_matching_rule(
                    rule_set,
                    |rule| SequenceMatch {
                        backtrack: MatchSet::ById(&rule.backtrack_sequence),
                        input: MatchSet::ById(&rule.input_sequence),
                        lookahead: MatchSet::ById(&rule.lookahead_sequence),
                    },
                    &f,
                ),
                _ => Ok(None),
            },
            None => Ok(None),
        },
        ChainContextLookup::Format2 {
            coverage,
            backtrack_classdef,
            input_classdef,
            lookahead_classdef,
            chain_class_sets,
            phantom: _,
        } => match coverage.index_of(glyph) {
            Some(_slot) => {
                let class_value = usize::from(input_classdef.class_of(glyph));
                match chain_class_sets.get(class_value) {
                    Some(Some(class_set)) => find_matching_rule(
                        class_set,
                        |rule| SequenceMatch {
                            backtrack: MatchSet::ByClassDef(
                                backtrack_classdef,
                                &rule.backtrack_sequence,
                            ),
                            input: MatchSet::ByClassDef(
                                input_classdef,
                                &rule.input_sequence,
                            ),
                            lookahead: MatchSet::ByClassDef(
                                lookahead_classdef,
                                &rule.lookahead_sequence,
                            ),
                        },
                        &f,
                    ),
                    _ => Ok(None),
                }
            }
            None => Ok(None),
        },
        ChainContextLookup::Format3 {
            backtrack_coverages,
            input_coverages,
            lookahead_coverages,
            lookup_actions,
            phantom: _,
        } => {
            if input_coverages.is_empty()
                || input_coverages[0].index_of(glyph).is_none()
            {
                return Ok(None);
            }
            let candidate = SequenceMatch {
                backtrack: MatchSet::ByCoverage(backtrack_coverages),
                input: MatchSet::ByCoverage(&input_coverages[1..]),
                lookahead: MatchSet::ByCoverage(lookahead_coverages),
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

fn find_matching_rule<'a, T>(
    rule_set: &'a RuleSet,
    make_context: impl Fn(&'a crate::layout::Rule) -> SequenceMatch<'a>,
    f: &impl Fn(&SequenceMatch<'a>) -> bool,
) -> Result<Option<Box<MatchedContext<'a, T>>>, ParseError> {
    for rule in &rule_set.rules {
        let candidate = make_context(rule);
        if f(&candidate) {
            return Ok(Some(Box::new(MatchedContext::new(
                candidate,
                &rule.lookup_actions,
            ))));
        }
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn apply_context(
    recursion_limit: usize,
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    subtables: &[ContextLookup<GSUB>],
    feature_tag: u32,
    filter: GlyphFilter,
    i: usize,
    glyphs: &mut Vec<ShapedGlyph>,
    ligature_id: &mut u16,
) -> Result<Option<(usize, isize)>, ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    let mut matched = None;
    for context_lookup in subtables {
        if let Some(context) = matched_context(context_lookup, glyph_id, |context| {
            context.matches(gdef, filter, glyphs, i)
        })? {
            matched = Some(context);
            break;
        }
    }
    match matched {
        Some(subst) => apply_subst_context(
            recursion_limit,
            gsub_table,
            gdef,
            feature_tag,
            filter,
            &subst,
            i,
            glyphs,
            ligature_id,
        ),
        None => Ok(None),
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_chain_context(
    recursion_limit: usize,
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    subtables: &[ChainContextLookup<GSUB>],
    feature_tag: u32,
    filter: GlyphFilter,
    i: usize,
    glyphs: &mut Vec<ShapedGlyph>,
    ligature_id: &mut u16,
) -> Result<Option<(usize, isize)>, ParseError> {
    let glyph_id = glyphs[i].glyph_id;
    let mut matched = None;
    for chain_context_lookup in subtables {
        if let Some(context) =
            matched_chain_context(chain_context_lookup, glyph_id, |context| {
                context.matches(gdef, filter, glyphs, i)
            })?
        {
            matched = Some(context);
            break;
        }
    }
    match matched {
        Some(subst) => apply_subst_context(
            recursion_limit,
            gsub_table,
            gdef,
            feature_tag,
            filter,
            &subst,
            i,
            glyphs,
            ligature_id,
        ),
        None => Ok(None),
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_subst_context(
    recursion_limit: usize,
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    feature_tag: u32,
    filter: GlyphFilter,
    subst: &SubstContext<'_>,
    i: usize,
    glyphs: &mut Vec<ShapedGlyph>,
    ligature_id: &mut u16,
) -> Result<Option<(usize, isize)>, ParseError> {
    let mut changes = 0isize;
    let len = match filter.nth_match(
        gdef,
        glyphs,
        i,
        subst.candidate.input.len(),
    ) {
        Some(last) => last - i + 1,
        None => return Ok(None),
    };
    let nested_lookups = subst.nested_lookups.to_vec();
    for (subst_index, subst_lookup_index) in nested_lookups {
        if let Some(change) = apply_subst(
            recursion_limit,
            gsub_table,
            gdef,
            filter,
            usize::from(subst_index),
            usize::from(subst_lookup_index),
            feature_tag,
            glyphs,
            i,
            ligature_id,
        )? {
            changes += change;
        }
    }
    let new_len = (len as isize) + changes;
    if new_len < 0 {
        return Err(ParseError::InvalidData);
    }
    Ok(Some((new_len as usize, changes)))
}

#[allow(clippy::too_many_arguments)]
fn apply_subst(
    recursion_limit: usize,
    gsub_table: &LayoutTable<GSUB>,
    gdef: Option<&GDEFTable>,
    parent_filter: GlyphFilter,
    subst_index: usize,
    lookup_index: usize,
    feature_tag: u32,
    glyphs: &mut Vec<ShapedGlyph>,
    index: usize,
    ligature_id: &mut u16,
) -> Result<Option<isize>, ParseError> {
    let lookup: &ParsedLookup<SubstLookup> = gsub_table.lookup(lookup_index)?;
    let filter = GlyphFilter::from_lookup_flag(lookup.lookup_flag, lookup.mark_filtering_set);
    let i = match parent_filter.nth_match(gdef, glyphs, index, subst_index) {
        Some(index1) => index1,
        None => return Ok(None),
    };
    match lookup.subtables {
        SubstLookup::SingleSubst(ref subtables) => {
            apply_single(subtables, feature_tag, i, glyphs)?;
            Ok(Some(0))
        }
        SubstLookup::MultipleSubst(ref subtables) => match apply_multiple(subtables, i, glyphs)? {
            Some(replace_count) => Ok(Some((replace_count as isize) - 1)),
            None => Ok(None),
        },
        SubstLookup::AlternateSubst(ref subtables) => {
            apply_alternate(subtables, 0, i, glyphs)?;
            Ok(Some(0))
        }
        SubstLookup::LigatureSubst(ref subtables) => {
            match apply_ligature(gdef, subtables, filter, *ligature_id, i, glyphs)? {
                Some(_skip) => {
                    *ligature_id = ligature_id.wrapping_add(1).max(1);
                    // Component count shrinkage is reflected by the buffer.
                    Ok(Some(0))
                }
                None => Ok(None),
            }
        }
        SubstLookup::ContextSubst(ref subtables) => {
            if recursion_limit > 0 {
                match apply_context(
                    recursion_limit - 1,
                    gsub_table,
                    gdef,
                    subtables,
                    feature_tag,
                    filter,
                    i,
                    glyphs,
                    ligature_id,
                )? {
                    Some((_length, change)) => Ok(Some(change)),
                    None => Ok(None),
                }
            } else {
                Err(ParseError::LimitExceeded)
            }
        }
        SubstLookup::ChainContextSubst(ref subtables) => {
            if recursion_limit > 0 {
                match apply_chain_context(
                    recursion_limit - 1,
                    gsub_table,
                    gdef,
                    subtables,
                    feature_tag,
                    filter,
                    i,
                    glyphs,
                    ligature_id,
                )? {
                    Some((_length, change)) => Ok(Some(change)),
                    None => Ok(None),
                }
            } else {
                Err(ParseError::LimitExceeded)
            }
        }
        SubstLookup::ReverseChainSingleSubst(ref subtables) => {
            apply_reverse_chain(gdef, subtables, filter, i, glyphs)?;
            Ok(Some(0))
        }
    }
}

/// Replace out-of-range glyph indices with `.notdef`.
pub fn replace_missing_glyphs(glyphs: &mut [ShapedGlyph], num_glyphs: u16) {
    for glyph in glyphs.iter_mut() {
        if glyph.glyph_id >= num_glyphs {
            glyph.glyph_id = 0;
            glyph.source = GlyphSource::Direct;
            glyph.liga_component = 0;
            glyph.ligature_id = 0;
        }
    }
}

/// Remove zero-width joiners and non-joiners after shaping.
pub fn strip_joiners(glyphs: &mut Vec<ShapedGlyph>) {
    glyphs.retain(|glyph| {
        !matches!(
            glyph.source,
            GlyphSource::Char('\u{200C}') | GlyphSource::Char('\u{200D}')
        )
    })
}

/// Initialise buffer records' GDEF mark attachment classes.
pub fn assign_mark_attach_classes(glyphs: &mut [ShapedGlyph], gdef: Option<&GDEFTable>) {
    for glyph in glyphs.iter_mut() {
        let class = gdef::mark_attach_class(gdef, glyph.glyph_id);
        glyph.mark_attach_class = u8::try_from(class).unwrap_or(u8::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_monotonicity_preserved_by_buffer_construction() {
        let glyphs: Vec<ShapedGlyph> = "abc"
            .chars()
            .enumerate()
            .map(|(i, ch)| ShapedGlyph::from_char(ch, i as u16 + 1, i as u32))
            .collect();
        for pair in glyphs.windows(2) {
            assert!(pair[0].cluster <= pair[1].cluster);
        }
    }

    #[test]
    fn missing_glyphs_become_notdef() {
        let mut glyphs = vec![
            ShapedGlyph::from_char('a', 5, 0),
            ShapedGlyph::from_char('b', 900, 1),
        ];
        replace_missing_glyphs(&mut glyphs, 100);
        assert_eq!(glyphs[0].glyph_id, 5);
        assert_eq!(glyphs[1].glyph_id, 0);
    }

    #[test]
    fn joiners_are_stripped() {
        let mut glyphs = vec![
            ShapedGlyph::from_char('a', 1, 0),
            ShapedGlyph::from_char('\u{200D}', 2, 1),
            ShapedGlyph::from_char('b', 3, 2),
        ];
        strip_joiners(&mut glyphs);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[1].glyph_id, 3);
    }
}

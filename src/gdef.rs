//! `GDEF` glyph class helpers.

use crate::layout::{glyph_class, GDEFTable};

/// True when GDEF classifies `glyph_id` as a mark.
pub fn gdef_is_mark(gdef: Option<&GDEFTable>, glyph_id: u16) -> bool {
    glyph_class(gdef, glyph_id) == glyph_class::MARK
}

/// GDEF glyph class for `glyph`, 0 when unclassified.
pub fn glyph_class(gdef: Option<&GDEFTable>, glyph: u16) -> u16 {
    gdef
        .and_then(|gdef| gdef.opt_glyph_classdef.as_ref())
        .map_or(0, |classdef| classdef.class_of(glyph))
}

/// GDEF mark attachment class for `glyph`, 0 when unclassified.
pub fn mark_attach_class(gdef: Option<&GDEFTable>, glyph: u16) -> u16 {
    gdef
        .and_then(|gdef| gdef.opt_mark_attach_classdef.as_ref())
        .map_or(0, |classdef| classdef.class_of(glyph))
}

/// True when mark glyph set `set` covers `glyph`.
pub fn mark_glyph_set_covers(gdef: Option<&GDEFTable>, set: u16, glyph: u16) -> bool {
    gdef
        .and_then(|gdef| gdef.mark_glyph_sets.get(usize::from(set)))
        .map_or(false, |coverage| {
            coverage.index_of(glyph).is_some()
        })
}

//! OpenType layout common structures: `GDEF`, and the shared model for
//! `GSUB` and `GPOS`.
//!
//! Both layout tables share the `ScriptList → LangSys → Feature →
//! LookupList` shape. Lookups are parsed eagerly when the table is read —
//! shared coverage and class-definition subtables are interned behind `Arc`
//! during the parse — so a loaded table is immutable and shareable across
//! threads.

use std::cell::RefCell;
use std::convert::TryFrom;
use std::marker::PhantomData;
use std::sync::Arc;

use log::warn;
use rustc_hash::FxHashMap;

use crate::binary::read::{
    CheckIndex, LazyArray, FromData, FromDataWith, ReadCursor, FixedSizeWith, FromRaw,
    ReadWindow,
};
use crate::binary::{size, U16};
use crate::context::LookupFlag;
use crate::error::ParseError;
use crate::tag;

/// Marker type for the `GSUB` table.
pub enum GSUB {}
/// Marker type for the `GPOS` table.
pub enum GPOS {}

/// `GDEF` glyph definition table.
pub struct GDEFTable {
    pub opt_glyph_classdef: Option<ClassDef>,
    pub opt_mark_attach_classdef: Option<ClassDef>,
    /// Mark glyph sets from GDEF 1.2, indexed by mark filtering set.
    pub mark_glyph_sets: Vec<Coverage>,
}

/// GDEF glyph classes.
pub mod glyph_class {
    pub const BASE: u16 = 1;
    pub const LIGATURE: u16 = 2;
    pub const MARK: u16 = 3;
    pub const COMPONENT: u16 = 4;
}

/// `GSUB` or `GPOS` table with its lookups fully parsed.
pub struct LayoutTable<T: LayoutTableType> {
    pub opt_script_list: Option<ScriptList>,
    pub opt_feature_list: Option<FeatureList>,
    pub lookups: Vec<ParsedLookup<T::LookupType>>,
}

/// A parsed lookup with its flag word.
pub struct ParsedLookup<T> {
    pub lookup_flag: LookupFlag,
    pub mark_filtering_set: Option<u16>,
    pub subtables: T,
}

pub struct ScriptList {
    script_records: Vec<ScriptRecord>,
}

pub struct ScriptRecord {
    pub script_tag: u32,
    script_table: ScriptTable,
}

pub struct ScriptTable {
    opt_default_langsys: Option<LangSys>,
    langsys_records: Vec<LangSysRecord>,
}

pub struct LangSysRecord {
    pub langsys_tag: u32,
    langsys_table: LangSys,
}

pub struct LangSys {
    /// Feature required for this language system, always applied.
    pub required_feature_index: Option<u16>,
    feature_indices: Vec<u16>,
}

pub struct FeatureList {
    feature_records: Vec<FeatureRecord>,
}

pub struct FeatureRecord {
    pub feature_tag: u32,
    feature_table: FeatureTable,
}

pub struct FeatureTable {
    pub lookup_indices: Vec<u16>,
}

/// The substitution lookups of one GSUB lookup.
pub enum SubstLookup {
    SingleSubst(Vec<SingleSubst>),
    MultipleSubst(Vec<MultipleSubst>),
    AlternateSubst(Vec<AlternateSubst>),
    LigatureSubst(Vec<LigatureSubst>),
    ContextSubst(Vec<ContextLookup<GSUB>>),
    ChainContextSubst(Vec<ChainContextLookup<GSUB>>),
    ReverseChainSingleSubst(Vec<ReverseChainSingleSubst>),
}

/// The positioning lookups of one GPOS lookup.
pub enum PosLookup {
    SinglePos(Vec<SinglePos>),
    PairPos(Vec<PairPos>),
    CursivePos(Vec<CursivePos>),
    MarkBasePos(Vec<MarkBasePos>),
    MarkLigPos(Vec<MarkLigPos>),
    MarkMarkPos(Vec<MarkBasePos>),
    ContextPos(Vec<ContextLookup<GPOS>>),
    ChainContextPos(Vec<ChainContextLookup<GPOS>>),
}

#[derive(Copy, Clone, PartialEq)]
pub enum SubstLookupType {
    SingleSubst,
    MultipleSubst,
    AlternateSubst,
    LigatureSubst,
    ContextSubst,
    ChainContextSubst,
    ReverseChainSingleSubst,
}

#[derive(Copy, Clone, PartialEq)]
pub enum PosLookupType {
    SinglePos,
    PairPos,
    CursivePos,
    MarkBasePos,
    MarkLigPos,
    MarkMarkPos,
    ContextPos,
    ChainContextPos,
}

pub enum LookupType<T: LayoutTableType> {
    Normal(T::BaseLookupType),
    Extension,
}

/// Shared behaviour of the two layout tables.
pub trait LayoutTableType: Sized {
    type LookupType;
    type BaseLookupType: Copy + PartialEq;
    fn check_lookup_type(lookup_type: u16) -> Result<LookupType<Self>, ParseError>;
    fn read_subtables<'a>(
        lookup_type: Self::BaseLookupType,
        subtables: &[ReadWindow<'a>],
        caches: &ParseCaches,
    ) -> Result<Self::LookupType, ParseError>;
}

/// Interning caches used while parsing a layout table.
///
/// Coverage and class-definition tables are frequently shared between
/// subtables; entries are keyed by their offset within the layout table so
/// each is parsed once and shared through `Arc`. The caches live only for
/// the duration of the parse.
pub struct ParseCaches {
    coverages: RefCell<FxHashMap<usize, Arc<Coverage>>>,
    classdefs: RefCell<FxHashMap<usize, Arc<ClassDef>>>,
}

impl ParseCaches {
    pub fn new() -> ParseCaches {
        ParseCaches {
            coverages: RefCell::new(FxHashMap::default()),
            classdefs: RefCell::new(FxHashMap::default()),
        }
    }

    fn read_coverage(&self, window: ReadWindow<'_>) -> Result<Arc<Coverage>, ParseError> {
        let mut cache = self.coverages.borrow_mut();
        if let Some(coverage) = cache.get(&window.base()) {
            return Ok(Arc::clone(coverage));
        }
        let coverage = Arc::new(window.read::<Coverage>()?);
        cache.insert(window.base(), Arc::clone(&coverage));
        Ok(coverage)
    }

    fn read_classdef(&self, window: ReadWindow<'_>) -> Result<Arc<ClassDef>, ParseError> {
        let mut cache = self.classdefs.borrow_mut();
        if let Some(classdef) = cache.get(&window.base()) {
            return Ok(Arc::clone(classdef));
        }
        // Some fonts point a class definition beyond the subtable extent.
        // Treat the affected class-def as "all glyphs in class 0" rather
        // than rejecting the font.
        let classdef = match window.read::<ClassDef>() {
            Ok(classdef) => Arc::new(classdef),
            Err(err) => {
                warn!("unreadable class definition treated as empty: {}", err);
                Arc::new(ClassDef::empty())
            }
        };
        cache.insert(window.base(), Arc::clone(&classdef));
        Ok(classdef)
    }
}

impl Default for ParseCaches {
    fn default() -> Self {
        ParseCaches::new()
    }
}

impl<'a> FromData<'a> for GDEFTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let table = cursor.window();

        let major_version = cursor.read_u16()?;
        cursor.check_version(major_version == 1)?;
        let minor_version = cursor.read_u16()?;
        let glyph_classdef_offset = usize::from(cursor.read_u16()?);
        let _attach_list_offset = usize::from(cursor.read_u16()?);
        let _lig_caret_list_offset = usize::from(cursor.read_u16()?);
        // MarkAttachClassDef was added in OpenType 1.2 without a version
        // bump, so it is always attempted.
        let mark_attach_classdef_offset = usize::from(cursor.read_u16()?);
        let mark_glyph_sets_offset = if minor_version >= 2 {
            usize::from(cursor.read_u16()?)
        } else {
            0
        };

        let gdef_header_size = 6 * size::U16;

        let opt_glyph_classdef = if glyph_classdef_offset == 0
            || glyph_classdef_offset < gdef_header_size
        {
            None
        } else {
            Some(table.offset(glyph_classdef_offset).read::<ClassDef>()?)
        };

        let opt_mark_attach_classdef = if mark_attach_classdef_offset == 0
            || mark_attach_classdef_offset < gdef_header_size
        {
            None
        } else {
            Some(
                table
                    .offset(mark_attach_classdef_offset)
                    .read::<ClassDef>()?,
            )
        };

        let mark_glyph_sets = if mark_glyph_sets_offset != 0 {
            let sets_scope = table.offset(mark_glyph_sets_offset);
            let mut sets_cursor = sets_scope.cursor();
            let format = sets_cursor.read_u16()?;
            sets_cursor.check_version(format == 1)?;
            let count = usize::from(sets_cursor.read_u16()?);
            let mut sets = Vec::with_capacity(count);
            for _ in 0..count {
                let offset = usize::try_from(sets_cursor.read_u32()?)?;
                sets.push(sets_scope.offset(offset).read::<Coverage>()?);
            }
            sets
        } else {
            Vec::new()
        };

        Ok(GDEFTable {
            opt_glyph_classdef,
            opt_mark_attach_classdef,
            mark_glyph_sets,
        })
    }
}

impl<'a, T: LayoutTableType> FromData<'a> for LayoutTable<T> {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let table = cursor.window();

        let major_version = cursor.read_u16()?;
        let _minor_version = cursor.read_u16()?;
        cursor.check_version(major_version == 1)?;
        let script_list_offset = usize::from(cursor.read_u16()?);
        let feature_list_offset = usize::from(cursor.read_u16()?);
        let lookup_list_offset = usize::from(cursor.read_u16()?);
        // Version 1.1 adds FeatureVariations, which is not used.

        let opt_script_list = if script_list_offset >= table.data().len() {
            return Err(ParseError::OffsetOutOfBounds);
        } else if script_list_offset == 0 {
            None
        } else {
            Some(table.offset(script_list_offset).read::<ScriptList>()?)
        };

        let opt_feature_list = if feature_list_offset >= table.data().len() {
            return Err(ParseError::OffsetOutOfBounds);
        } else if feature_list_offset == 0 {
            None
        } else {
            Some(table.offset(feature_list_offset).read::<FeatureList>()?)
        };

        let lookups = if lookup_list_offset >= table.data().len() {
            return Err(ParseError::OffsetOutOfBounds);
        } else if lookup_list_offset == 0 {
            Vec::new()
        } else {
            read_lookup_list::<T>(table.offset(lookup_list_offset))?
        };

        Ok(LayoutTable {
            opt_script_list,
            opt_feature_list,
            lookups,
        })
    }
}

fn read_lookup_list<T: LayoutTableType>(
    window: ReadWindow<'_>,
) -> Result<Vec<ParsedLookup<T::LookupType>>, ParseError> {
    let caches = ParseCaches::new();
    let mut cursor = window.cursor();
    let lookup_count = usize::from(cursor.read_u16()?);
    let lookup_offsets = cursor.read_array::<U16>(lookup_count)?;
    let mut lookups = Vec::with_capacity(lookup_count);
    for offset in &lookup_offsets {
        let lookup = read_lookup::<T>(window.offset(usize::from(offset)), &caches)?;
        lookups.push(lookup);
    }
    Ok(lookups)
}

/// The USE_MARK_FILTERING_SET lookup flag bit.
const USE_MARK_FILTERING_SET: u16 = 0x0010;

fn read_lookup<T: LayoutTableType>(
    window: ReadWindow<'_>,
    caches: &ParseCaches,
) -> Result<ParsedLookup<T::LookupType>, ParseError> {
    let mut cursor = window.cursor();
    let lookup_type = cursor.read_u16()?;
    let lookup_type = T::check_lookup_type(lookup_type)?;
    let lookup_flag = cursor.read_u16()?;
    let subtable_count = usize::from(cursor.read_u16()?);
    let subtable_offsets = cursor.read_array::<U16>(subtable_count)?;
    let mark_filtering_set = if lookup_flag & USE_MARK_FILTERING_SET != 0 {
        Some(cursor.read_u16()?)
    } else {
        None
    };

    let mut subtables = Vec::with_capacity(subtable_count);
    let mut base_lookup_type = match &lookup_type {
        LookupType::Normal(base) => Some(*base),
        LookupType::Extension => None,
    };
    for offset in &subtable_offsets {
        let subtable = window.offset(usize::from(offset));
        match &lookup_type {
            LookupType::Normal(_) => subtables.push(subtable),
            LookupType::Extension => {
                // Extension format 1: the real lookup type plus a 32-bit
                // offset to the wrapped subtable.
                let mut ext_cursor = subtable.cursor();
                let format = ext_cursor.read_u16()?;
                ext_cursor.check_version(format == 1)?;
                let extension_lookup_type = ext_cursor.read_u16()?;
                let extension_lookup_type = match T::check_lookup_type(extension_lookup_type)? {
                    LookupType::Normal(base) => base,
                    LookupType::Extension => return Err(ParseError::UnknownVersion),
                };
                match base_lookup_type {
                    None => base_lookup_type = Some(extension_lookup_type),
                    Some(base) if base == extension_lookup_type => {}
                    Some(_) => return Err(ParseError::UnknownVersion),
                }
                let extension_offset = usize::try_from(ext_cursor.read_u32()?)?;
                subtables.push(subtable.offset(extension_offset));
            }
        }
    }

    let base_lookup_type = base_lookup_type.ok_or(ParseError::InvalidData)?;
    let subtables = T::read_subtables(base_lookup_type, &subtables, caches)?;
    Ok(ParsedLookup {
        lookup_flag: LookupFlag(lookup_flag),
        mark_filtering_set,
        subtables,
    })
}

/// Read each subtable, skipping those that fail to parse.
fn read_subtable_vec<'a, S>(
    subtables: &[ReadWindow<'a>],
    caches: &'a ParseCaches,
) -> Result<Vec<S::Parsed>, ParseError>
where
    S: FromDataWith<'a, Args = &'a ParseCaches>,
{
    let mut result = Vec::with_capacity(subtables.len());
    for window in subtables {
        match window.read_with::<S>(caches) {
            Ok(subtable) => result.push(subtable),
            Err(err) => warn!("skipping invalid subtable: {}", err),
        }
    }
    Ok(result)
}

impl LayoutTableType for GSUB {
    type LookupType = SubstLookup;
    type BaseLookupType = SubstLookupType;

    fn check_lookup_type(lookup_type: u16) -> Result<LookupType<GSUB>, ParseError> {
        match lookup_type {
            1 => Ok(LookupType::Normal(SubstLookupType::SingleSubst)),
            2 => Ok(LookupType::Normal(SubstLookupType::MultipleSubst)),
            3 => Ok(LookupType::Normal(SubstLookupType::AlternateSubst)),
            4 => Ok(LookupType::Normal(SubstLookupType::LigatureSubst)),
            5 => Ok(LookupType::Normal(SubstLookupType::ContextSubst)),
            6 => Ok(LookupType::Normal(SubstLookupType::ChainContextSubst)),
            7 => Ok(LookupType::Extension),
            8 => Ok(LookupType::Normal(SubstLookupType::ReverseChainSingleSubst)),
            _ => Err(ParseError::UnknownVersion),
        }
    }

    fn read_subtables<'a>(
        lookup_type: SubstLookupType,
        subtables: &[ReadWindow<'a>],
        caches: &ParseCaches,
    ) -> Result<SubstLookup, ParseError> {
        match lookup_type {
            SubstLookupType::SingleSubst => Ok(SubstLookup::SingleSubst(read_subtable_vec::<
                SingleSubst,
            >(subtables, caches)?)),
            SubstLookupType::MultipleSubst => Ok(SubstLookup::MultipleSubst(
                read_subtable_vec::<MultipleSubst>(subtables, caches)?,
            )),
            SubstLookupType::AlternateSubst => Ok(SubstLookup::AlternateSubst(
                read_subtable_vec::<AlternateSubst>(subtables, caches)?,
            )),
            SubstLookupType::LigatureSubst => Ok(SubstLookup::LigatureSubst(
                read_subtable_vec::<LigatureSubst>(subtables, caches)?,
            )),
            SubstLookupType::ContextSubst => Ok(SubstLookup::ContextSubst(read_subtable_vec::<
                ContextLookup<GSUB>,
            >(
                subtables, caches
            )?)),
            SubstLookupType::ChainContextSubst => Ok(SubstLookup::ChainContextSubst(
                read_subtable_vec::<ChainContextLookup<GSUB>>(subtables, caches)?,
            )),
            SubstLookupType::ReverseChainSingleSubst => Ok(SubstLookup::ReverseChainSingleSubst(
                read_subtable_vec::<ReverseChainSingleSubst>(subtables, caches)?,
            )),
        }
    }
}

impl LayoutTableType for GPOS {
    type LookupType = PosLookup;
    type BaseLookupType = PosLookupType;

    fn check_lookup_type(lookup_type: u16) -> Result<LookupType<GPOS>, ParseError> {
        match lookup_type {
            1 => Ok(LookupType::Normal(PosLookupType::SinglePos)),
            2 => Ok(LookupType::Normal(PosLookupType::PairPos)),
            3 => Ok(LookupType::Normal(PosLookupType::CursivePos)),
            4 => Ok(LookupType::Normal(PosLookupType::MarkBasePos)),
            5 => Ok(LookupType::Normal(PosLookupType::MarkLigPos)),
            6 => Ok(LookupType::Normal(PosLookupType::MarkMarkPos)),
            7 => Ok(LookupType::Normal(PosLookupType::ContextPos)),
            8 => Ok(LookupType::Normal(PosLookupType::ChainContextPos)),
            9 => Ok(LookupType::Extension),
            _ => Err(ParseError::UnknownVersion),
        }
    }

    fn read_subtables<'a>(
        lookup_type: PosLookupType,
        subtables: &[ReadWindow<'a>],
        caches: &ParseCaches,
    ) -> Result<PosLookup, ParseError> {
        match lookup_type {
            PosLookupType::SinglePos => Ok(PosLookup::SinglePos(read_subtable_vec::<SinglePos>(
                subtables, caches,
            )?)),
            PosLookupType::PairPos => Ok(PosLookup::PairPos(read_subtable_vec::<PairPos>(
                subtables, caches,
            )?)),
            PosLookupType::CursivePos => Ok(PosLookup::CursivePos(
                read_subtable_vec::<CursivePos>(subtables, caches)?,
            )),
            PosLookupType::MarkBasePos => Ok(PosLookup::MarkBasePos(
                read_subtable_vec::<MarkBasePos>(subtables, caches)?,
            )),
            PosLookupType::MarkLigPos => Ok(PosLookup::MarkLigPos(
                read_subtable_vec::<MarkLigPos>(subtables, caches)?,
            )),
            PosLookupType::MarkMarkPos => Ok(PosLookup::MarkMarkPos(
                read_subtable_vec::<MarkBasePos>(subtables, caches)?,
            )),
            PosLookupType::ContextPos => Ok(PosLookup::ContextPos(read_subtable_vec::<
                ContextLookup<GPOS>,
            >(subtables, caches)?)),
            PosLookupType::ChainContextPos => Ok(PosLookup::ChainContextPos(read_subtable_vec::<
                ChainContextLookup<GPOS>,
            >(
                subtables, caches
            )?)),
        }
    }
}

impl<'a> FromData<'a> for ScriptList {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let script_count = usize::from(cursor.read_u16()?);
        let mut script_records = Vec::with_capacity(script_count);
        for _ in 0..script_count {
            let script_tag = cursor.read_u32()?;
            let script_offset = usize::from(cursor.read_u16()?);
            let script_table = window.offset(script_offset).read::<ScriptTable>()?;
            script_records.push(ScriptRecord {
                script_tag,
                script_table,
            });
        }
        Ok(ScriptList { script_records })
    }
}

impl<'a> FromData<'a> for ScriptTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let default_langsys_offset = usize::from(cursor.read_u16()?);
        let opt_default_langsys = if default_langsys_offset != 0 {
            Some(window.offset(default_langsys_offset).read::<LangSys>()?)
        } else {
            None
        };
        let langsys_count = usize::from(cursor.read_u16()?);
        let mut langsys_records = Vec::with_capacity(langsys_count);
        for _ in 0..langsys_count {
            let langsys_tag = cursor.read_u32()?;
            let langsys_offset = usize::from(cursor.read_u16()?);
            let langsys_table = window.offset(langsys_offset).read::<LangSys>()?;
            langsys_records.push(LangSysRecord {
                langsys_tag,
                langsys_table,
            });
        }
        Ok(ScriptTable {
            opt_default_langsys,
            langsys_records,
        })
    }
}

impl<'a> FromData<'a> for LangSys {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let _lookup_order = cursor.read_u16()?;
        let required_feature_index = match cursor.read_u16()? {
            0xFFFF => None,
            index => Some(index),
        };
        let feature_index_count = usize::from(cursor.read_u16()?);
        let feature_indices = cursor.read_array::<U16>(feature_index_count)?.to_vec();
        Ok(LangSys {
            required_feature_index,
            feature_indices,
        })
    }
}

impl LangSys {
    pub fn feature_indices(&self) -> &[u16] {
        &self.feature_indices
    }
}

impl<'a> FromData<'a> for FeatureList {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let feature_count = usize::from(cursor.read_u16()?);
        let mut feature_records = Vec::with_capacity(feature_count);
        for _ in 0..feature_count {
            let feature_tag = cursor.read_u32()?;
            let feature_offset = usize::from(cursor.read_u16()?);
            let feature_table = window.offset(feature_offset).read::<FeatureTable>()?;
            feature_records.push(FeatureRecord {
                feature_tag,
                feature_table,
            });
        }
        Ok(FeatureList { feature_records })
    }
}

impl FeatureList {
    pub fn feature_record_at(&self, index: usize) -> Result<&FeatureRecord, ParseError> {
        self.feature_records.check_index(index)?;
        Ok(&self.feature_records[index])
    }
}

impl FeatureRecord {
    pub fn feature_table(&self) -> &FeatureTable {
        &self.feature_table
    }
}

impl<'a> FromData<'a> for FeatureTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let _feature_params = cursor.read_u16()?;
        let lookup_index_count = usize::from(cursor.read_u16()?);
        let lookup_indices = cursor.read_array::<U16>(lookup_index_count)?.to_vec();
        Ok(FeatureTable { lookup_indices })
    }
}

impl<T: LayoutTableType> LayoutTable<T> {
    pub fn script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.opt_script_list
            .as_ref()
            .and_then(|script_list| script_list.script(script_tag))
    }

    /// Find a script table, falling back to `DFLT` for unknown scripts.
    pub fn script_or_default(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.script(script_tag)
            .or_else(|| self.script(tag::DFLT))
    }

    /// The feature table for `feature_tag` within `langsys`, if enabled.
    pub fn langsys_feature(
        &self,
        langsys: &LangSys,
        feature_tag: u32,
    ) -> Result<Option<&FeatureTable>, ParseError> {
        if let Some(ref feature_list) = self.opt_feature_list {
            for feature_index in &langsys.feature_indices {
                let feature_record =
                    feature_list.feature_record_at(usize::from(*feature_index))?;
                if feature_record.feature_tag == feature_tag {
                    return Ok(Some(&feature_record.feature_table));
                }
            }
        }
        Ok(None)
    }

    pub fn feature_by_index(&self, feature_index: u16) -> Result<&FeatureRecord, ParseError> {
        let feature_list = self
            .opt_feature_list
            .as_ref()
            .ok_or(ParseError::IndexOutOfBounds)?;
        feature_list.feature_record_at(usize::from(feature_index))
    }

    pub fn lookup(&self, lookup_index: usize) -> Result<&ParsedLookup<T::LookupType>, ParseError> {
        self.lookups.get(lookup_index).ok_or(ParseError::IndexOutOfBounds)
    }
}

impl ScriptList {
    pub fn script_records(&self) -> &[ScriptRecord] {
        &self.script_records
    }

    pub fn script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.script_records
            .iter()
            .find(|record| record.script_tag == script_tag)
            .map(|record| &record.script_table)
    }
}

impl ScriptRecord {
    pub fn script_table(&self) -> &ScriptTable {
        &self.script_table
    }
}

impl ScriptTable {
    pub fn default_langsys_record(&self) -> Option<&LangSys> {
        self.opt_default_langsys.as_ref()
    }

    pub fn langsys(&self, langsys_tag: u32) -> Option<&LangSys> {
        self.langsys_records
            .iter()
            .find(|record| record.langsys_tag == langsys_tag)
            .map(|record| &record.langsys_table)
    }

    /// Find a language system, falling back to the default one.
    pub fn langsys_or_default(&self, opt_lang_tag: Option<u32>) -> Option<&LangSys> {
        match opt_lang_tag {
            Some(lang_tag) => self
                .langsys(lang_tag)
                .or_else(|| self.default_langsys_record()),
            None => self.default_langsys_record(),
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage and class definitions
// ---------------------------------------------------------------------------

pub enum Coverage {
    Format1 {
        glyph_array: Vec<u16>,
    },
    Format2 {
        coverage_range_array: Vec<CoverageRangeRecord>,
    },
}

pub struct CoverageRangeRecord {
    start_glyph: u16,
    end_glyph: u16,
    coverage_base: u16,
}

impl<'a> FromRaw<'a> for CoverageRangeRecord {
    type ReadType = (U16, U16, U16);
    fn from_raw((start_glyph, end_glyph, coverage_base): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            coverage_base,
        }
    }
}

impl<'a> FromData<'a> for Coverage {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        match cursor.read_u16()? {
            1 => {
                let glyph_count = cursor.read_u16()?;
                let glyph_array = cursor.read_array::<U16>(usize::from(glyph_count))?.to_vec();
                // Glyph ids must be sorted for the binary search.
                Ok(Coverage::Format1 { glyph_array })
            }
            2 => {
                let coverage_range_count = cursor.read_u16()?;
                let coverage_range_array = cursor
                    .read_array::<CoverageRangeRecord>(usize::from(coverage_range_count))?
                    .to_vec();
                for coverage_range_record in &coverage_range_array {
                    cursor.check(
                        coverage_range_record.start_glyph <= coverage_range_record.end_glyph,
                    )?
                }
                Ok(Coverage::Format2 {
                    coverage_range_array,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl Coverage {
    /// Coverage index of `glyph`, if covered.
    pub fn index_of(&self, glyph: u16) -> Option<u16> {
        match *self {
            Coverage::Format1 { ref glyph_array } => glyph_array
                .binary_search(&glyph)
                .ok()
                .map(|index| index as u16),
            Coverage::Format2 {
                ref coverage_range_array,
            } => {
                for coverage_range in coverage_range_array {
                    if (glyph >= coverage_range.start_glyph) && (glyph <= coverage_range.end_glyph)
                    {
                        return Some(
                            coverage_range.coverage_base
                                + (glyph - coverage_range.start_glyph),
                        );
                    }
                }
                None
            }
        }
    }

    /// Total number of glyphs covered.
    pub fn glyph_count(&self) -> usize {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array.len(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array.iter().fold(0, |acc, range| {
                acc + usize::from(range.end_glyph) - usize::from(range.start_glyph) + 1
            }),
        }
    }
}

pub enum ClassDef {
    Format1 {
        start_glyph: u16,
        class_value_array: Vec<u16>,
    },
    Format2 {
        class_range_array: Vec<ClassRangeRecord>,
    },
}

pub struct ClassRangeRecord {
    start_glyph: u16,
    end_glyph: u16,
    class_value: u16,
}

impl<'a> FromRaw<'a> for ClassRangeRecord {
    type ReadType = (U16, U16, U16);
    fn from_raw((start_glyph, end_glyph, class_value): (u16, u16, u16)) -> Self {
        ClassRangeRecord {
            start_glyph,
            end_glyph,
            class_value,
        }
    }
}

impl<'a> FromData<'a> for ClassDef {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        match cursor.read_u16()? {
            1 => {
                let start_glyph = cursor.read_u16()?;
                let glyph_count = cursor.read_u16()?;
                let class_value_array =
                    cursor.read_array::<U16>(usize::from(glyph_count))?.to_vec();
                Ok(ClassDef::Format1 {
                    start_glyph,
                    class_value_array,
                })
            }
            2 => {
                let class_range_count = usize::from(cursor.read_u16()?);
                // Some fonts declare more ranges than the subtable holds;
                // read the prefix that is actually present.
                let class_range_array = cursor
                    .read_array::<ClassRangeRecord>(class_range_count)
                    .or_else(|_| cursor.read_array_upto::<ClassRangeRecord>(class_range_count))?
                    .to_vec();
                Ok(ClassDef::Format2 { class_range_array })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl ClassDef {
    /// A class definition mapping every glyph to class 0.
    pub fn empty() -> ClassDef {
        ClassDef::Format2 {
            class_range_array: Vec::new(),
        }
    }

    pub fn class_of(&self, glyph: u16) -> u16 {
        match *self {
            ClassDef::Format1 {
                start_glyph,
                ref class_value_array,
            } => {
                if glyph >= start_glyph
                    && usize::from(glyph - start_glyph) < class_value_array.len()
                {
                    class_value_array[usize::from(glyph - start_glyph)]
                } else {
                    0
                }
            }
            ClassDef::Format2 {
                ref class_range_array,
            } => {
                for class_range in class_range_array {
                    if (glyph >= class_range.start_glyph) && (glyph <= class_range.end_glyph) {
                        return class_range.class_value;
                    }
                }
                0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GSUB subtables
// ---------------------------------------------------------------------------

pub enum SingleSubst {
    Format1 {
        coverage: Arc<Coverage>,
        delta_glyph_index: i16,
    },
    Format2 {
        coverage: Arc<Coverage>,
        substitute_glyph_array: Vec<u16>,
    },
}

impl<'a> FromDataWith<'a> for SingleSubst {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let subtable = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(subtable.offset(coverage_offset))?;
                let delta_glyph_index = cursor.read_i16()?;
                Ok(SingleSubst::Format1 {
                    coverage,
                    delta_glyph_index,
                })
            }
            2 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(subtable.offset(coverage_offset))?;
                let glyph_count = cursor.read_u16()?;
                let substitute_glyph_array =
                    cursor.read_array::<U16>(usize::from(glyph_count))?.to_vec();
                Ok(SingleSubst::Format2 {
                    coverage,
                    substitute_glyph_array,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl SingleSubst {
    pub fn substitute(&self, glyph: u16) -> Result<Option<u16>, ParseError> {
        match *self {
            SingleSubst::Format1 {
                ref coverage,
                delta_glyph_index,
            } => {
                if coverage.index_of(glyph).is_some() {
                    // Addition of deltaGlyphID is modulo 65536.
                    let new_glyph = (i32::from(glyph) + i32::from(delta_glyph_index)) & 0xFFFF;
                    Ok(Some(new_glyph as u16))
                } else {
                    Ok(None)
                }
            }
            SingleSubst::Format2 {
                ref coverage,
                ref substitute_glyph_array,
            } => match coverage.index_of(glyph) {
                Some(slot) => {
                    let slot = usize::from(slot);
                    substitute_glyph_array.check_index(slot)?;
                    Ok(Some(substitute_glyph_array[slot]))
                }
                None => Ok(None),
            },
        }
    }
}

pub struct MultipleSubst {
    coverage: Arc<Coverage>,
    sequences: Vec<SequenceTable>,
}

pub struct SequenceTable {
    pub substitute_glyphs: Vec<u16>,
}

impl<'a> FromDataWith<'a> for MultipleSubst {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let sequence_count = usize::from(cursor.read_u16()?);
                let sequence_offsets = cursor.read_array::<U16>(sequence_count)?;
                let sequences = parse_offset_objects::<SequenceTable>(&window, sequence_offsets)?;
                Ok(MultipleSubst {
                    coverage,
                    sequences,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl MultipleSubst {
    pub fn substitute(&self, glyph: u16) -> Result<Option<&SequenceTable>, ParseError> {
        match self.coverage.index_of(glyph) {
            Some(slot) => {
                let slot = usize::from(slot);
                self.sequences.check_index(slot)?;
                Ok(Some(&self.sequences[slot]))
            }
            None => Ok(None),
        }
    }
}

impl<'a> FromData<'a> for SequenceTable {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(cursor.read_u16()?);
        // The spec requires at least one glyph but implementations accept
        // empty sequences (deletion).
        let substitute_glyphs = cursor.read_array::<U16>(glyph_count)?.to_vec();
        Ok(SequenceTable { substitute_glyphs })
    }
}

pub struct AlternateSubst {
    coverage: Arc<Coverage>,
    alternate_sets: Vec<AlternateSet>,
}

pub struct AlternateSet {
    pub alternate_glyphs: Vec<u16>,
}

impl<'a> FromDataWith<'a> for AlternateSubst {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let alternate_set_count = usize::from(cursor.read_u16()?);
                let alternate_set_offsets = cursor.read_array::<U16>(alternate_set_count)?;
                let alternate_sets = parse_offset_objects::<AlternateSet>(&window, alternate_set_offsets)?;
                Ok(AlternateSubst {
                    coverage,
                    alternate_sets,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl AlternateSubst {
    pub fn substitute(&self, glyph: u16) -> Result<Option<&AlternateSet>, ParseError> {
        match self.coverage.index_of(glyph) {
            Some(slot) => {
                let slot = usize::from(slot);
                self.alternate_sets.check_index(slot)?;
                Ok(Some(&self.alternate_sets[slot]))
            }
            None => Ok(None),
        }
    }
}

impl<'a> FromData<'a> for AlternateSet {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(cursor.read_u16()?);
        cursor.check(glyph_count > 0)?;
        let alternate_glyphs = cursor.read_array::<U16>(glyph_count)?.to_vec();
        Ok(AlternateSet { alternate_glyphs })
    }
}

pub struct LigatureSubst {
    coverage: Arc<Coverage>,
    ligature_sets: Vec<LigatureSet>,
}

pub struct LigatureSet {
    pub ligatures: Vec<Ligature>,
}

pub struct Ligature {
    pub ligature_glyph: u16,
    /// Components after the first, in sequence order.
    pub component_glyphs: Vec<u16>,
}

impl<'a> FromDataWith<'a> for LigatureSubst {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let ligature_set_count = usize::from(cursor.read_u16()?);
                let ligature_set_offsets = cursor.read_array::<U16>(ligature_set_count)?;
                let ligature_sets = parse_offset_objects::<LigatureSet>(&window, ligature_set_offsets)?;
                Ok(LigatureSubst {
                    coverage,
                    ligature_sets,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl LigatureSubst {
    pub fn substitute(&self, glyph: u16) -> Result<Option<&LigatureSet>, ParseError> {
        match self.coverage.index_of(glyph) {
            Some(slot) => {
                let slot = usize::from(slot);
                self.ligature_sets.check_index(slot)?;
                Ok(Some(&self.ligature_sets[slot]))
            }
            None => Ok(None),
        }
    }
}

impl<'a> FromData<'a> for LigatureSet {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let ligature_count = usize::from(cursor.read_u16()?);
        let ligature_offsets = cursor.read_array::<U16>(ligature_count)?;
        let ligatures = parse_offset_objects::<Ligature>(&window, ligature_offsets)?;
        Ok(LigatureSet { ligatures })
    }
}

impl<'a> FromData<'a> for Ligature {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let ligature_glyph = cursor.read_u16()?;
        let component_count = usize::from(cursor.read_u16()?);
        cursor.check(component_count > 0)?;
        let component_glyphs = cursor.read_array::<U16>(component_count - 1)?.to_vec();
        Ok(Ligature {
            ligature_glyph,
            component_glyphs,
        })
    }
}

/// GSUB type 8: reverse chained context single substitution.
pub enum ReverseChainSingleSubst {
    Format1 {
        coverage: Arc<Coverage>,
        backtrack_coverages: Vec<Arc<Coverage>>,
        lookahead_coverages: Vec<Arc<Coverage>>,
        substitute_glyphs: Vec<u16>,
    },
}

impl<'a> FromDataWith<'a> for ReverseChainSingleSubst {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let backtrack_count = usize::from(cursor.read_u16()?);
                let backtrack_coverage_offsets = cursor.read_array::<U16>(backtrack_count)?;
                let lookahead_count = usize::from(cursor.read_u16()?);
                let lookahead_coverage_offsets = cursor.read_array::<U16>(lookahead_count)?;
                let glyph_count = usize::from(cursor.read_u16()?);
                let substitute_glyphs = cursor.read_array::<U16>(glyph_count)?.to_vec();
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let backtrack_coverages =
                    parse_coverage_list(&window, caches, backtrack_coverage_offsets)?;
                let lookahead_coverages =
                    parse_coverage_list(&window, caches, lookahead_coverage_offsets)?;
                cursor.check(coverage.glyph_count() == glyph_count)?;
                Ok(ReverseChainSingleSubst::Format1 {
                    coverage,
                    backtrack_coverages,
                    lookahead_coverages,
                    substitute_glyphs,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

// ---------------------------------------------------------------------------
// GPOS subtables
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct ValueFormat(u16);

impl<'a> FromData<'a> for ValueFormat {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let value_format = cursor.read_u16()?;
        if value_format <= 0xFF {
            Ok(ValueFormat(value_format))
        } else {
            Err(ParseError::InvalidData)
        }
    }
}

impl ValueFormat {
    pub fn size(self) -> usize {
        usize::from(self.0.count_ones() as u16) * size::U16
    }

    fn is_zero(self) -> bool {
        self.0 == 0
    }

    fn bit(self, i: u16) -> bool {
        self.0 & (1 << i) != 0
    }
}

/// A decoded ValueRecord; `None` when the value format is empty.
pub type ValueRecord = Option<Adjust>;

/// Placement and advance adjustments from a ValueRecord.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Adjust {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
}

impl<'a> FromDataWith<'a> for ValueRecord {
    type Args = ValueFormat;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, value_format: ValueFormat) -> Result<Self, ParseError> {
        if value_format.is_zero() {
            return Ok(None);
        }
        let mut adjust = Adjust::default();
        if value_format.bit(0) {
            adjust.x_placement = cursor.read_i16()?;
        }
        if value_format.bit(1) {
            adjust.y_placement = cursor.read_i16()?;
        }
        if value_format.bit(2) {
            adjust.x_advance = cursor.read_i16()?;
        }
        if value_format.bit(3) {
            adjust.y_advance = cursor.read_i16()?;
        }
        // Device table offsets are parsed past but not applied; metrics here
        // are unhinted.
        for i in 4..8 {
            if value_format.bit(i) {
                let _device_offset = cursor.read_u16()?;
            }
        }
        Ok(Some(adjust))
    }
}

impl<'a> FixedSizeWith<'a> for ValueRecord {
    fn size(value_format: ValueFormat) -> usize {
        value_format.size()
    }
}

/// An attachment anchor point.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl<'a> FromData<'a> for Anchor {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        match cursor.read_u16()? {
            // Formats 2 and 3 add a contour point / device tables; the
            // design coordinates are common to all three.
            1 | 2 | 3 => {
                let x = cursor.read_i16()?;
                let y = cursor.read_i16()?;
                Ok(Anchor { x, y })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

pub enum SinglePos {
    Format1 {
        coverage: Arc<Coverage>,
        value_record: ValueRecord,
    },
    Format2 {
        coverage: Arc<Coverage>,
        value_records: Vec<ValueRecord>,
    },
}

impl<'a> FromDataWith<'a> for SinglePos {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let value_format = cursor.read::<ValueFormat>()?;
                let value_record = cursor.read_with::<ValueRecord>(value_format)?;
                Ok(SinglePos::Format1 {
                    coverage,
                    value_record,
                })
            }
            2 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let value_format = cursor.read::<ValueFormat>()?;
                let value_count = usize::from(cursor.read_u16()?);
                let value_records = cursor
                    .read_array_with::<ValueRecord>(value_count, value_format)?
                    .read_to_vec()?;
                Ok(SinglePos::Format2 {
                    coverage,
                    value_records,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl SinglePos {
    pub fn apply(&self, glyph: u16) -> Result<ValueRecord, ParseError> {
        match *self {
            SinglePos::Format1 {
                ref coverage,
                value_record,
            } => match coverage.index_of(glyph) {
                Some(_) => Ok(value_record),
                None => Ok(None),
            },
            SinglePos::Format2 {
                ref coverage,
                ref value_records,
            } => match coverage.index_of(glyph) {
                Some(slot) => {
                    let slot = usize::from(slot);
                    value_records.check_index(slot)?;
                    Ok(value_records[slot])
                }
                None => Ok(None),
            },
        }
    }
}

pub enum PairPos {
    Format1 {
        coverage: Arc<Coverage>,
        pair_sets: Vec<PairSet>,
    },
    Format2 {
        coverage: Arc<Coverage>,
        classdef1: Arc<ClassDef>,
        classdef2: Arc<ClassDef>,
        class2_count: usize,
        class1_records: Vec<Class1Record>,
    },
}

pub struct PairSet {
    pair_value_records: Vec<PairValueRecord>,
}

pub struct PairValueRecord {
    second_glyph: u16,
    value_record1: ValueRecord,
    value_record2: ValueRecord,
}

pub struct Class1Record {
    class2_records: Vec<(ValueRecord, ValueRecord)>,
}

impl<'a> FromDataWith<'a> for PairPos {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let value_format1 = cursor.read::<ValueFormat>()?;
                let value_format2 = cursor.read::<ValueFormat>()?;
                let pair_set_count = usize::from(cursor.read_u16()?);
                let pair_set_offsets = cursor.read_array::<U16>(pair_set_count)?;
                let mut pair_sets = Vec::with_capacity(pair_set_count);
                for offset in &pair_set_offsets {
                    let pair_set = window
                        .offset(usize::from(offset))
                        .read_with::<PairSet>((value_format1, value_format2))?;
                    pair_sets.push(pair_set);
                }
                Ok(PairPos::Format1 {
                    coverage,
                    pair_sets,
                })
            }
            2 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let value_format1 = cursor.read::<ValueFormat>()?;
                let value_format2 = cursor.read::<ValueFormat>()?;
                let classdef1_offset = usize::from(cursor.read_u16()?);
                let classdef2_offset = usize::from(cursor.read_u16()?);
                let classdef1 = caches.read_classdef(window.offset(classdef1_offset))?;
                let classdef2 = caches.read_classdef(window.offset(classdef2_offset))?;
                let class1_count = usize::from(cursor.read_u16()?);
                let class2_count = usize::from(cursor.read_u16()?);
                let mut class1_records = Vec::with_capacity(class1_count);
                for _ in 0..class1_count {
                    let mut class2_records = Vec::with_capacity(class2_count);
                    for _ in 0..class2_count {
                        let value_record1 = cursor.read_with::<ValueRecord>(value_format1)?;
                        let value_record2 = cursor.read_with::<ValueRecord>(value_format2)?;
                        class2_records.push((value_record1, value_record2));
                    }
                    class1_records.push(Class1Record { class2_records });
                }
                Ok(PairPos::Format2 {
                    coverage,
                    classdef1,
                    classdef2,
                    class2_count,
                    class1_records,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a> FromDataWith<'a> for PairSet {
    type Args = (ValueFormat, ValueFormat);
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, args: Self::Args) -> Result<Self, ParseError> {
        let (value_format1, value_format2) = args;
        let pair_value_count = usize::from(cursor.read_u16()?);
        let mut pair_value_records = Vec::with_capacity(pair_value_count);
        for _ in 0..pair_value_count {
            let second_glyph = cursor.read_u16()?;
            let value_record1 = cursor.read_with::<ValueRecord>(value_format1)?;
            let value_record2 = cursor.read_with::<ValueRecord>(value_format2)?;
            pair_value_records.push(PairValueRecord {
                second_glyph,
                value_record1,
                value_record2,
            });
        }
        Ok(PairSet { pair_value_records })
    }
}

impl PairPos {
    pub fn apply(
        &self,
        glyph1: u16,
        glyph2: u16,
    ) -> Result<Option<(ValueRecord, ValueRecord)>, ParseError> {
        match *self {
            PairPos::Format1 {
                ref coverage,
                ref pair_sets,
            } => {
                if let Some(slot) = coverage.index_of(glyph1) {
                    let slot = usize::from(slot);
                    pair_sets.check_index(slot)?;
                    let pair_set = &pair_sets[slot];
                    for record in &pair_set.pair_value_records {
                        if record.second_glyph == glyph2 {
                            return Ok(Some((record.value_record1, record.value_record2)));
                        }
                    }
                }
                Ok(None)
            }
            PairPos::Format2 {
                ref coverage,
                ref classdef1,
                ref classdef2,
                class2_count,
                ref class1_records,
            } => {
                if coverage.index_of(glyph1).is_some() {
                    let class1_value = usize::from(classdef1.class_of(glyph1));
                    let class2_value = usize::from(classdef2.class_of(glyph2));
                    if class1_value < class1_records.len() && class2_value < class2_count {
                        let class1_record = &class1_records[class1_value];
                        let (adj1, adj2) = class1_record.class2_records[class2_value];
                        Ok(Some((adj1, adj2)))
                    } else {
                        Err(ParseError::IndexOutOfBounds)
                    }
                } else {
                    Ok(None)
                }
            }
        }
    }
}

pub struct CursivePos {
    coverage: Arc<Coverage>,
    entry_exit_records: Vec<EntryExitRecord>,
}

struct EntryExitRecord {
    entry_anchor: Option<Anchor>,
    exit_anchor: Option<Anchor>,
}

impl<'a> FromDataWith<'a> for CursivePos {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let entry_exit_count = usize::from(cursor.read_u16()?);
                let mut entry_exit_records = Vec::with_capacity(entry_exit_count);
                for _ in 0..entry_exit_count {
                    let entry_anchor_offset = usize::from(cursor.read_u16()?);
                    let exit_anchor_offset = usize::from(cursor.read_u16()?);
                    let entry_anchor = if entry_anchor_offset != 0 {
                        Some(window.offset(entry_anchor_offset).read::<Anchor>()?)
                    } else {
                        None
                    };
                    let exit_anchor = if exit_anchor_offset != 0 {
                        Some(window.offset(exit_anchor_offset).read::<Anchor>()?)
                    } else {
                        None
                    };
                    entry_exit_records.push(EntryExitRecord {
                        entry_anchor,
                        exit_anchor,
                    });
                }
                Ok(CursivePos {
                    coverage,
                    entry_exit_records,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl CursivePos {
    /// Exit anchor of `glyph1` and entry anchor of `glyph2` when both are
    /// covered and anchored.
    pub fn apply(&self, glyph1: u16, glyph2: u16) -> Result<Option<(Anchor, Anchor)>, ParseError> {
        let coverage_value1 = self.coverage.index_of(glyph1);
        let coverage_value2 = self.coverage.index_of(glyph2);
        match (coverage_value1, coverage_value2) {
            (Some(slot1), Some(slot2)) => {
                let slot1 = usize::from(slot1);
                let slot2 = usize::from(slot2);
                self.entry_exit_records.check_index(slot1)?;
                self.entry_exit_records.check_index(slot2)?;
                let entry_exit1 = &self.entry_exit_records[slot1];
                let entry_exit2 = &self.entry_exit_records[slot2];
                match (entry_exit1.exit_anchor, entry_exit2.entry_anchor) {
                    (Some(glyph1_exit), Some(glyph2_entry)) => {
                        Ok(Some((glyph1_exit, glyph2_entry)))
                    }
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

/// Mark-to-base attachment; also used for mark-to-mark.
pub struct MarkBasePos {
    mark_coverage: Arc<Coverage>,
    base_coverage: Arc<Coverage>,
    mark_class_count: usize,
    mark_array: MarkArray,
    base_array: Vec<Vec<Option<Anchor>>>,
}

struct MarkArray {
    mark_records: Vec<(u16, Anchor)>,
}

impl<'a> FromData<'a> for MarkArray {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let window = cursor.window();
        let mark_count = usize::from(cursor.read_u16()?);
        let mut mark_records = Vec::with_capacity(mark_count);
        for _ in 0..mark_count {
            let mark_class = cursor.read_u16()?;
            let mark_anchor_offset = usize::from(cursor.read_u16()?);
            let mark_anchor = window.offset(mark_anchor_offset).read::<Anchor>()?;
            mark_records.push((mark_class, mark_anchor));
        }
        Ok(MarkArray { mark_records })
    }
}

fn read_anchor_matrix(
    window: &ReadWindow<'_>,
    mark_class_count: usize,
) -> Result<Vec<Vec<Option<Anchor>>>, ParseError> {
    let mut cursor = window.cursor();
    let record_count = usize::from(cursor.read_u16()?);
    let mut records = Vec::with_capacity(record_count);
    for _ in 0..record_count {
        let mut anchors = Vec::with_capacity(mark_class_count);
        for _ in 0..mark_class_count {
            let anchor_offset = usize::from(cursor.read_u16()?);
            let anchor = if anchor_offset != 0 {
                Some(window.offset(anchor_offset).read::<Anchor>()?)
            } else {
                None
            };
            anchors.push(anchor);
        }
        records.push(anchors);
    }
    Ok(records)
}

impl<'a> FromDataWith<'a> for MarkBasePos {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let mark_coverage_offset = usize::from(cursor.read_u16()?);
                let base_coverage_offset = usize::from(cursor.read_u16()?);
                let mark_class_count = usize::from(cursor.read_u16()?);
                let mark_array_offset = usize::from(cursor.read_u16()?);
                let base_array_offset = usize::from(cursor.read_u16()?);
                let mark_coverage = caches.read_coverage(window.offset(mark_coverage_offset))?;
                let base_coverage = caches.read_coverage(window.offset(base_coverage_offset))?;
                let mark_array = window.offset(mark_array_offset).read::<MarkArray>()?;
                let base_array =
                    read_anchor_matrix(&window.offset(base_array_offset), mark_class_count)?;
                Ok(MarkBasePos {
                    mark_coverage,
                    base_coverage,
                    mark_class_count,
                    mark_array,
                    base_array,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl MarkBasePos {
    /// Base anchor of `base_glyph` and mark anchor of `mark_glyph` when the
    /// pair attaches.
    pub fn apply(
        &self,
        base_glyph: u16,
        mark_glyph: u16,
    ) -> Result<Option<(Anchor, Anchor)>, ParseError> {
        let base_coverage_value = self.base_coverage.index_of(base_glyph);
        let mark_coverage_value = self.mark_coverage.index_of(mark_glyph);
        match (base_coverage_value, mark_coverage_value) {
            (Some(base_index), Some(mark_index)) => {
                let base_index = usize::from(base_index);
                let mark_index = usize::from(mark_index);
                self.base_array.check_index(base_index)?;
                self.mark_array.mark_records.check_index(mark_index)?;
                let (mark_class, mark_anchor) = self.mark_array.mark_records[mark_index];
                let mark_class = usize::from(mark_class);
                if mark_class < self.mark_class_count {
                    match self.base_array[base_index][mark_class] {
                        Some(base_anchor) => Ok(Some((base_anchor, mark_anchor))),
                        None => Ok(None),
                    }
                } else {
                    Err(ParseError::IndexOutOfBounds)
                }
            }
            _ => Ok(None),
        }
    }
}

pub struct MarkLigPos {
    mark_coverage: Arc<Coverage>,
    liga_coverage: Arc<Coverage>,
    mark_class_count: usize,
    mark_array: MarkArray,
    /// Per ligature, per component, per mark class.
    ligature_array: Vec<Vec<Vec<Option<Anchor>>>>,
}

impl<'a> FromDataWith<'a> for MarkLigPos {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let mark_coverage_offset = usize::from(cursor.read_u16()?);
                let liga_coverage_offset = usize::from(cursor.read_u16()?);
                let mark_class_count = usize::from(cursor.read_u16()?);
                let mark_array_offset = usize::from(cursor.read_u16()?);
                let liga_array_offset = usize::from(cursor.read_u16()?);
                let mark_coverage = caches.read_coverage(window.offset(mark_coverage_offset))?;
                let liga_coverage = caches.read_coverage(window.offset(liga_coverage_offset))?;
                let mark_array = window.offset(mark_array_offset).read::<MarkArray>()?;

                let liga_array_scope = window.offset(liga_array_offset);
                let mut liga_cursor = liga_array_scope.cursor();
                let ligature_count = usize::from(liga_cursor.read_u16()?);
                let mut ligature_array = Vec::with_capacity(ligature_count);
                for _ in 0..ligature_count {
                    let attach_offset = usize::from(liga_cursor.read_u16()?);
                    let attach =
                        read_anchor_matrix(&liga_array_scope.offset(attach_offset), mark_class_count)?;
                    ligature_array.push(attach);
                }

                Ok(MarkLigPos {
                    mark_coverage,
                    liga_coverage,
                    mark_class_count,
                    mark_array,
                    ligature_array,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl MarkLigPos {
    /// Ligature anchor for the component under `liga_component_index` and
    /// the mark anchor, when the pair attaches.
    pub fn apply(
        &self,
        liga_glyph: u16,
        mark_glyph: u16,
        liga_component_index: usize,
    ) -> Result<Option<(Anchor, Anchor)>, ParseError> {
        let liga_coverage_value = self.liga_coverage.index_of(liga_glyph);
        let mark_coverage_value = self.mark_coverage.index_of(mark_glyph);
        match (liga_coverage_value, mark_coverage_value) {
            (Some(liga_index), Some(mark_index)) => {
                let liga_index = usize::from(liga_index);
                let mark_index = usize::from(mark_index);
                self.mark_array.mark_records.check_index(mark_index)?;
                let (mark_class, mark_anchor) = self.mark_array.mark_records[mark_index];
                let mark_class = usize::from(mark_class);
                if mark_class >= self.mark_class_count {
                    return Err(ParseError::IndexOutOfBounds);
                }
                self.ligature_array.check_index(liga_index)?;
                let components = &self.ligature_array[liga_index];
                match components
                    .get(liga_component_index)
                    .and_then(|anchors| anchors[mark_class])
                {
                    Some(liga_anchor) => Ok(Some((liga_anchor, mark_anchor))),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Contextual lookups (shared between GSUB and GPOS)
// ---------------------------------------------------------------------------

pub enum ContextLookup<T: LayoutTableType> {
    Format1 {
        coverage: Arc<Coverage>,
        rule_sets: Vec<Option<RuleSet>>,
        phantom: PhantomData<T>,
    },
    Format2 {
        coverage: Arc<Coverage>,
        classdef: Arc<ClassDef>,
        class_sets: Vec<Option<RuleSet>>,
        phantom: PhantomData<T>,
    },
    Format3 {
        coverages: Vec<Arc<Coverage>>,
        lookup_actions: Vec<(u16, u16)>,
        phantom: PhantomData<T>,
    },
}

/// Rules for one coverage index or class.
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

/// One (chain) context rule: sequences of glyph ids or classes plus nested
/// lookup records.
pub struct Rule {
    pub backtrack_sequence: Vec<u16>,
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub lookup_actions: Vec<(u16, u16)>,
}

pub enum ChainContextLookup<T: LayoutTableType> {
    Format1 {
        coverage: Arc<Coverage>,
        chain_rule_sets: Vec<Option<RuleSet>>,
        phantom: PhantomData<T>,
    },
    Format2 {
        coverage: Arc<Coverage>,
        backtrack_classdef: Arc<ClassDef>,
        input_classdef: Arc<ClassDef>,
        lookahead_classdef: Arc<ClassDef>,
        chain_class_sets: Vec<Option<RuleSet>>,
        phantom: PhantomData<T>,
    },
    Format3 {
        backtrack_coverages: Vec<Arc<Coverage>>,
        input_coverages: Vec<Arc<Coverage>>,
        lookahead_coverages: Vec<Arc<Coverage>>,
        lookup_actions: Vec<(u16, u16)>,
        phantom: PhantomData<T>,
    },
}

impl<'a, T: LayoutTableType> FromDataWith<'a> for ContextLookup<T> {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let rule_set_count = usize::from(cursor.read_u16()?);
                let rule_set_offsets = cursor.read_array::<U16>(rule_set_count)?;
                let rule_sets =
                    parse_nullable_objects::<RuleSet>(&window, rule_set_offsets, RuleKind::Plain)?;
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                Ok(ContextLookup::Format1 {
                    coverage,
                    rule_sets,
                    phantom: PhantomData,
                })
            }
            2 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let classdef_offset = usize::from(cursor.read_u16()?);
                let class_set_count = usize::from(cursor.read_u16()?);
                let class_set_offsets = cursor.read_array::<U16>(class_set_count)?;
                let class_sets =
                    parse_nullable_objects::<RuleSet>(&window, class_set_offsets, RuleKind::Plain)?;
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let classdef = caches.read_classdef(window.offset(classdef_offset))?;
                Ok(ContextLookup::Format2 {
                    coverage,
                    classdef,
                    class_sets,
                    phantom: PhantomData,
                })
            }
            3 => {
                let glyph_count = usize::from(cursor.read_u16()?);
                cursor.check(glyph_count > 0)?;
                let lookup_count = usize::from(cursor.read_u16()?);
                let coverage_offsets = cursor.read_array::<U16>(glyph_count)?;
                let lookup_actions = cursor.read_array::<(U16, U16)>(lookup_count)?.to_vec();
                let coverages = parse_coverage_list(&window, caches, coverage_offsets)?;
                Ok(ContextLookup::Format3 {
                    coverages,
                    lookup_actions,
                    phantom: PhantomData,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

impl<'a, T: LayoutTableType> FromDataWith<'a> for ChainContextLookup<T> {
    type Args = &'a ParseCaches;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, caches: Self::Args) -> Result<Self, ParseError> {
        let window = cursor.window();
        match cursor.read_u16()? {
            1 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let chain_rule_set_count = usize::from(cursor.read_u16()?);
                let chain_rule_set_offsets = cursor.read_array::<U16>(chain_rule_set_count)?;
                let chain_rule_sets = parse_nullable_objects::<RuleSet>(
                    &window,
                    chain_rule_set_offsets,
                    RuleKind::Chain,
                )?;
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                Ok(ChainContextLookup::Format1 {
                    coverage,
                    chain_rule_sets,
                    phantom: PhantomData,
                })
            }
            2 => {
                let coverage_offset = usize::from(cursor.read_u16()?);
                let backtrack_classdef_offset = usize::from(cursor.read_u16()?);
                let input_classdef_offset = usize::from(cursor.read_u16()?);
                let lookahead_classdef_offset = usize::from(cursor.read_u16()?);
                let chain_class_set_count = usize::from(cursor.read_u16()?);
                let chain_class_set_offsets = cursor.read_array::<U16>(chain_class_set_count)?;
                let chain_class_sets = parse_nullable_objects::<RuleSet>(
                    &window,
                    chain_class_set_offsets,
                    RuleKind::Chain,
                )?;
                let coverage = caches.read_coverage(window.offset(coverage_offset))?;
                let backtrack_classdef =
                    caches.read_classdef(window.offset(backtrack_classdef_offset))?;
                let input_classdef = caches.read_classdef(window.offset(input_classdef_offset))?;
                let lookahead_classdef =
                    caches.read_classdef(window.offset(lookahead_classdef_offset))?;
                Ok(ChainContextLookup::Format2 {
                    coverage,
                    backtrack_classdef,
                    input_classdef,
                    lookahead_classdef,
                    chain_class_sets,
                    phantom: PhantomData,
                })
            }
            3 => {
                let backtrack_count = usize::from(cursor.read_u16()?);
                let backtrack_coverage_offsets = cursor.read_array::<U16>(backtrack_count)?;
                let input_count = usize::from(cursor.read_u16()?);
                cursor.check(input_count > 0)?;
                let input_coverage_offsets = cursor.read_array::<U16>(input_count)?;
                let lookahead_count = usize::from(cursor.read_u16()?);
                let lookahead_coverage_offsets = cursor.read_array::<U16>(lookahead_count)?;
                let lookup_count = usize::from(cursor.read_u16()?);
                let lookup_actions = cursor.read_array::<(U16, U16)>(lookup_count)?.to_vec();
                let backtrack_coverages =
                    parse_coverage_list(&window, caches, backtrack_coverage_offsets)?;
                let input_coverages = parse_coverage_list(&window, caches, input_coverage_offsets)?;
                let lookahead_coverages =
                    parse_coverage_list(&window, caches, lookahead_coverage_offsets)?;
                Ok(ChainContextLookup::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    lookup_actions,
                    phantom: PhantomData,
                })
            }
            _ => Err(ParseError::UnknownVersion),
        }
    }
}

/// Whether a context rule carries backtrack/lookahead sequences.
#[derive(Copy, Clone, PartialEq)]
pub enum RuleKind {
    Plain,
    Chain,
}

impl<'a> FromDataWith<'a> for RuleSet {
    type Args = RuleKind;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, kind: RuleKind) -> Result<Self, ParseError> {
        let window = cursor.window();
        let rule_count = usize::from(cursor.read_u16()?);
        let rule_offsets = cursor.read_array::<U16>(rule_count)?;
        let mut rules = Vec::with_capacity(rule_count);
        for offset in &rule_offsets {
            let rule = window.offset(usize::from(offset)).read_with::<Rule>(kind)?;
            rules.push(rule);
        }
        Ok(RuleSet { rules })
    }
}

impl<'a> FromDataWith<'a> for Rule {
    type Args = RuleKind;
    type Parsed = Self;

    fn read_with(cursor: &mut ReadCursor<'a>, kind: RuleKind) -> Result<Self, ParseError> {
        match kind {
            RuleKind::Plain => {
                let glyph_count = usize::from(cursor.read_u16()?);
                cursor.check(glyph_count > 0)?;
                let lookup_count = usize::from(cursor.read_u16()?);
                let input_sequence = cursor.read_array::<U16>(glyph_count - 1)?.to_vec();
                let lookup_actions = cursor.read_array::<(U16, U16)>(lookup_count)?.to_vec();
                Ok(Rule {
                    backtrack_sequence: Vec::new(),
                    input_sequence,
                    lookahead_sequence: Vec::new(),
                    lookup_actions,
                })
            }
            RuleKind::Chain => {
                let backtrack_count = usize::from(cursor.read_u16()?);
                let backtrack_sequence = cursor.read_array::<U16>(backtrack_count)?.to_vec();
                let input_count = usize::from(cursor.read_u16()?);
                cursor.check(input_count > 0)?;
                let input_sequence = cursor.read_array::<U16>(input_count - 1)?.to_vec();
                let lookahead_count = usize::from(cursor.read_u16()?);
                let lookahead_sequence = cursor.read_array::<U16>(lookahead_count)?.to_vec();
                let lookup_count = usize::from(cursor.read_u16()?);
                let lookup_actions = cursor.read_array::<(U16, U16)>(lookup_count)?.to_vec();
                Ok(Rule {
                    backtrack_sequence,
                    input_sequence,
                    lookahead_sequence,
                    lookup_actions,
                })
            }
        }
    }
}

fn parse_offset_objects<'a, T>(
    window: &ReadWindow<'a>,
    offsets: LazyArray<'a, U16>,
) -> Result<Vec<T::Parsed>, ParseError>
where
    T: FromDataWith<'a, Args = ()>,
{
    let mut objects = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        let object = window.offset(usize::from(offset)).read::<T>()?;
        objects.push(object);
    }
    Ok(objects)
}

fn parse_nullable_objects<'a, T>(
    window: &ReadWindow<'a>,
    offsets: LazyArray<'a, U16>,
    args: T::Args,
) -> Result<Vec<Option<T::Parsed>>, ParseError>
where
    T: FromDataWith<'a>,
{
    let mut objects = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        if offset != 0 {
            let object = window
                .offset(usize::from(offset))
                .read_with::<T>(args.clone())?;
            objects.push(Some(object));
        } else {
            objects.push(None);
        }
    }
    Ok(objects)
}

fn parse_coverage_list<'a>(
    window: &ReadWindow<'a>,
    caches: &ParseCaches,
    offsets: LazyArray<'a, U16>,
) -> Result<Vec<Arc<Coverage>>, ParseError> {
    let mut coverages = Vec::with_capacity(offsets.len());
    for coverage_offset in &offsets {
        let coverage = caches.read_coverage(window.offset(usize::from(coverage_offset)))?;
        coverages.push(coverage);
    }
    Ok(coverages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    fn make_gdef_header(glyph_classdef_offset: u16) -> Vec<u8> {
        let mut data = vec![
            0x00, 0x01, // major version
            0x00, 0x00, // minor version
        ];
        data.extend_from_slice(&glyph_classdef_offset.to_be_bytes());
        data.extend_from_slice(&[
            0x00, 0x00, // attach list offset
            0x00, 0x00, // lig caret list offset
            0x00, 0x00, // mark attach classdef offset
        ]);
        data
    }

    #[test]
    fn gdef_zero_classdef_offset() {
        let data = make_gdef_header(0);
        let gdef = ReadWindow::new(&data).read::<GDEFTable>().unwrap();
        assert!(gdef.opt_glyph_classdef.is_none());
    }

    #[test]
    fn gdef_too_small_classdef_offset() {
        // Offset inside the header is treated as absent.
        let data = make_gdef_header(1);
        let gdef = ReadWindow::new(&data).read::<GDEFTable>().unwrap();
        assert!(gdef.opt_glyph_classdef.is_none());
    }

    #[test]
    fn classdef_lookup() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // format 1
        data.extend_from_slice(&10u16.to_be_bytes()); // start glyph
        data.extend_from_slice(&3u16.to_be_bytes());
        for class in [1u16, 0, 2] {
            data.extend_from_slice(&class.to_be_bytes());
        }
        let classdef = ReadWindow::new(&data).read::<ClassDef>().unwrap();
        assert_eq!(classdef.class_of(10), 1);
        assert_eq!(classdef.class_of(11), 0);
        assert_eq!(classdef.class_of(12), 2);
        assert_eq!(classdef.class_of(9), 0);
        assert_eq!(classdef.class_of(13), 0);
    }

    #[test]
    fn coverage_formats_agree() {
        // Format 1 list
        let mut data1 = Vec::new();
        data1.extend_from_slice(&1u16.to_be_bytes());
        data1.extend_from_slice(&3u16.to_be_bytes());
        for glyph in [5u16, 9, 12] {
            data1.extend_from_slice(&glyph.to_be_bytes());
        }
        let coverage1 = ReadWindow::new(&data1).read::<Coverage>().unwrap();
        // Format 2 ranges covering the same glyphs
        let mut data2 = Vec::new();
        data2.extend_from_slice(&2u16.to_be_bytes());
        data2.extend_from_slice(&2u16.to_be_bytes());
        for (start, end, index) in [(5u16, 5u16, 0u16), (9, 12, 1)] {
            data2.extend_from_slice(&start.to_be_bytes());
            data2.extend_from_slice(&end.to_be_bytes());
            data2.extend_from_slice(&index.to_be_bytes());
        }
        let coverage2 = ReadWindow::new(&data2).read::<Coverage>().unwrap();

        assert_eq!(coverage1.index_of(5), Some(0));
        assert_eq!(coverage1.index_of(9), Some(1));
        assert_eq!(coverage1.index_of(12), Some(2));
        assert_eq!(coverage1.index_of(6), None);
        assert_eq!(coverage2.index_of(5), Some(0));
        assert_eq!(coverage2.index_of(9), Some(1));
        assert_eq!(coverage2.index_of(10), Some(2));
        assert_eq!(coverage2.index_of(8), None);
        assert_eq!(coverage1.glyph_count(), 3);
        assert_eq!(coverage2.glyph_count(), 5);
    }

    #[test]
    fn value_record_honours_format_mask() {
        // x_advance only (bit 2)
        let data = [0x00, 0x32];
        let record = ReadWindow::new(&data)
            .read_with::<ValueRecord>(ValueFormat(0x0004))
            .unwrap()
            .unwrap();
        assert_eq!(record.x_advance, 50);
        assert_eq!(record.x_placement, 0);
        // x_placement + y_placement (bits 0,1)
        let data = [0xFF, 0xCE, 0x00, 0x14];
        let record = ReadWindow::new(&data)
            .read_with::<ValueRecord>(ValueFormat(0x0003))
            .unwrap()
            .unwrap();
        assert_eq!(record.x_placement, -50);
        assert_eq!(record.y_placement, 20);
        // Empty format decodes to None without consuming bytes.
        assert!(ReadWindow::new(&[])
            .read_with::<ValueRecord>(ValueFormat(0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn value_format_size() {
        assert_eq!(ValueFormat(0x0004).size(), 2);
        assert_eq!(ValueFormat(0x000F).size(), 8);
        assert_eq!(ValueFormat(0x00FF).size(), 16);
        assert_eq!(ValueFormat(0).size(), 0);
    }

    #[test]
    fn gpos_header_versions() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes()); // minor version 2 still accepted
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        assert!(ReadWindow::new(&data).read::<LayoutTable<GPOS>>().is_ok());
    }
}

//! Central font handling: table loading policy, glyph mapping, and the
//! shaping pipeline.

use std::convert::TryFrom;

use once_cell::sync::OnceCell;

use crate::binary::read::ReadWindow;
use crate::cff::{Cff2Table, CffTable};
use crate::error::{FontError, ParseError};
use crate::gpos::{self, PosFeatureSet};
use crate::gsub::{self, ShapedGlyph};
use crate::layout::{GDEFTable, LayoutTable, GPOS, GSUB};
use crate::metrics::{GlyphMetrics, OutlineSource};
use crate::outline::OutlineSink;
use crate::scripts::{self, ShapingModel};
use crate::tables::cmap::{Cmap, CmapSubtable, GlyphVariation};
use crate::tables::colr::{ColrTable, CpalTable, LayerRecord};
use crate::tables::glyf::{
    BoundingBox, CompositeGlyphFlag, GlyfTable, Glyph, COMPOSITE_GLYPH_RECURSION_LIMIT,
};
use crate::tables::kern::KernTable;
use crate::tables::loca::LocaTable;
use crate::tables::os2::Os2;
use crate::tables::{
    TableProvider, HeadTable, HheaTable, HmtxTable, MaxpTable, NameTable, SfntVersion,
    CFF_MAGIC,
};
use crate::post::PostTable;
use crate::tag;
use crate::unicode::{CodePoint, VariationSelector, DOTTED_CIRCLE};
use crate::unicode::props::ScriptClass;

/// Which outline format the font carries.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutlineFormat {
    /// TrueType `glyf`/`loca` outlines.
    TrueType,
    /// PostScript `CFF `/`CFF2` outlines.
    Cff,
}

/// Whether glyph mapping must honour the requested presentation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MatchingPresentation {
    Required,
    NotRequired,
}

/// A font with its tables parsed on demand.
///
/// Required tables are loaded (or verified present) at construction;
/// optional tables go through write-once cells, so a `ParsedFont` is
/// shareable across threads once built: the first caller parses, later
/// callers read the frozen value.
pub struct ParsedFont<T: TableProvider> {
    provider: T,
    pub outline_format: OutlineFormat,
    pub head_table: HeadTable,
    pub hhea_table: HheaTable,
    pub maxp_table: MaxpTable,
    cmap_table: Box<[u8]>,
    cmap_subtable_offset: usize,
    hmtx_table: Box<[u8]>,

    loca_table: OnceCell<LocaTable>,
    glyf_data: OnceCell<Option<Box<[u8]>>>,
    cff_data: OnceCell<Option<Box<[u8]>>>,
    vhea_table: OnceCell<Option<HheaTable>>,
    vmtx_data: OnceCell<Option<Box<[u8]>>>,
    gdef_table: OnceCell<Option<GDEFTable>>,
    gsub_table: OnceCell<Option<LayoutTable<GSUB>>>,
    gpos_table: OnceCell<Option<LayoutTable<GPOS>>>,
    kern_data: OnceCell<Option<Box<[u8]>>>,
    name_data: OnceCell<Box<[u8]>>,
    post_data: OnceCell<Option<Box<[u8]>>>,
    os2_table: OnceCell<Option<Os2>>,
    colr_data: OnceCell<Option<Box<[u8]>>>,
    cpal_data: OnceCell<Option<Box<[u8]>>>,
    base_table: OnceCell<Option<crate::tables::base::BaseTable>>,
    glyph_metrics: Vec<OnceCell<GlyphMetrics>>,
}

fn read_and_box_table(
    provider: &impl TableProvider,
    tag: u32,
) -> Result<Box<[u8]>, FontError> {
    match provider.table_data(tag) {
        Ok(Some(data)) => Ok(Box::from(&*data)),
        Ok(None) => Err(FontError::MissingFontTable(tag)),
        Err(err) => Err(FontError::InvalidFontTable(tag, err)),
    }
}

fn read_and_box_optional_table(
    provider: &impl TableProvider,
    tag: u32,
) -> Result<Option<Box<[u8]>>, ParseError> {
    Ok(provider.table_data(tag)?.map(|data| Box::from(&*data)))
}

impl<T: TableProvider + SfntVersion> ParsedFont<T> {
    /// Load a font from a table provider.
    ///
    /// Fails when a required table is missing or unreadable: `cmap`, `head`,
    /// `hhea`, `hmtx`, `maxp`, `name`, `post`, `OS/2`, and either
    /// `loca`+`glyf` or `CFF `/`CFF2`.
    pub fn new(provider: T) -> Result<ParsedFont<T>, FontError> {
        let cmap_table = read_and_box_table(&provider, tag::CMAP)?;
        let cmap_subtable_offset = {
            let cmap = ReadWindow::new(&cmap_table)
                .read::<Cmap<'_>>()
                .map_err(FontError::invalid_table(tag::CMAP))?;
            let record = cmap
                .preferred_subtable()
                .ok_or(FontError::InvalidFontTable(
                    tag::CMAP,
                    ParseError::NoSuitableCmap,
                ))?;
            usize::try_from(record.offset)
                .map_err(|_| FontError::InvalidFontTable(tag::CMAP, ParseError::InvalidData))?
        };

        let head_table = ReadWindow::new(&read_and_box_table(&provider, tag::HEAD)?)
            .read::<HeadTable>()
            .map_err(FontError::invalid_table(tag::HEAD))?;
        let hhea_table = ReadWindow::new(&read_and_box_table(&provider, tag::HHEA)?)
            .read::<HheaTable>()
            .map_err(FontError::invalid_table(tag::HHEA))?;
        let maxp_table = ReadWindow::new(&read_and_box_table(&provider, tag::MAXP)?)
            .read::<MaxpTable>()
            .map_err(FontError::invalid_table(tag::MAXP))?;
        let hmtx_table = read_and_box_table(&provider, tag::HMTX)?;

        for required in [tag::NAME, tag::POST, tag::OS_2] {
            if !provider.has_table(required) {
                return Err(FontError::MissingFontTable(required));
            }
        }

        let outline_format = if provider.has_table(tag::CFF) || provider.has_table(tag::CFF2) {
            OutlineFormat::Cff
        } else if provider.has_table(tag::GLYF) && provider.has_table(tag::LOCA) {
            if provider.sfnt_version() == CFF_MAGIC {
                return Err(FontError::InvalidFontFile(ParseError::UnknownVersion));
            }
            OutlineFormat::TrueType
        } else {
            return Err(FontError::MissingFontTable(tag::GLYF));
        };

        let num_glyphs = usize::from(maxp_table.num_glyphs);
        let mut glyph_metrics = Vec::with_capacity(num_glyphs);
        glyph_metrics.resize_with(num_glyphs, OnceCell::new);

        Ok(ParsedFont {
            provider,
            outline_format,
            head_table,
            hhea_table,
            maxp_table,
            cmap_table,
            cmap_subtable_offset,
            hmtx_table,
            loca_table: OnceCell::new(),
            glyf_data: OnceCell::new(),
            cff_data: OnceCell::new(),
            vhea_table: OnceCell::new(),
            vmtx_data: OnceCell::new(),
            gdef_table: OnceCell::new(),
            gsub_table: OnceCell::new(),
            gpos_table: OnceCell::new(),
            kern_data: OnceCell::new(),
            name_data: OnceCell::new(),
            post_data: OnceCell::new(),
            os2_table: OnceCell::new(),
            colr_data: OnceCell::new(),
            cpal_data: OnceCell::new(),
            base_table: OnceCell::new(),
            glyph_metrics,
        })
    }

    /// Number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.maxp_table.num_glyphs
    }

    /// Design units per em.
    pub fn units_per_em(&self) -> u16 {
        self.head_table.units_per_em
    }

    fn cmap_subtable(&self) -> Result<CmapSubtable<'_>, ParseError> {
        ReadWindow::new(&self.cmap_table)
            .offset(self.cmap_subtable_offset)
            .read::<CmapSubtable<'_>>()
    }

    fn hmtx(&self) -> Result<HmtxTable<'_>, ParseError> {
        ReadWindow::new(&self.hmtx_table).read_with::<HmtxTable<'_>>((
            usize::from(self.maxp_table.num_glyphs),
            usize::from(self.hhea_table.num_h_metrics),
        ))
    }

    /// Map a character to a glyph id; unmapped characters become glyph 0.
    pub fn lookup_glyph_index(
        &self,
        ch: CodePoint,
        match_presentation: MatchingPresentation,
        variation_selector: Option<VariationSelector>,
    ) -> u16 {
        let glyph = self
            .map_glyph_variant(ch.value(), variation_selector)
            .unwrap_or(0);
        if glyph == 0 && match_presentation == MatchingPresentation::Required {
            // Strict matching found nothing for the requested presentation.
            return 0;
        }
        glyph
    }

    /// Map a character to a glyph id, failing with
    /// [FontError::GlyphNotFound] when the font has no mapping.
    pub fn require_glyph_index(&self, ch: CodePoint) -> Result<u16, FontError> {
        self.map_glyph_variant(ch.value(), None)
            .ok_or(FontError::GlyphNotFound(ch.value()))
    }

    fn map_glyph_variant(
        &self,
        char_code: u32,
        variation_selector: Option<VariationSelector>,
    ) -> Option<u16> {
        let subtable = self.cmap_subtable().ok()?;
        // Variation sequences resolve through the format 14 subtable and
        // fall back to the base mapping when the pair is absent.
        if let Some(selector) = variation_selector {
            if let Some(variant_glyph) = self.lookup_variant(&subtable, char_code, selector) {
                return Some(variant_glyph);
            }
        }
        subtable.map_glyph(char_code).ok()?
    }

    fn lookup_variant(
        &self,
        base_subtable: &CmapSubtable<'_>,
        char_code: u32,
        selector: VariationSelector,
    ) -> Option<u16> {
        let _ = base_subtable;
        let selector_value = match selector {
            VariationSelector::VS01 => 0xFE00,
            VariationSelector::VS02 => 0xFE01,
            VariationSelector::VS03 => 0xFE02,
            VariationSelector::VS15 => 0xFE0E,
            VariationSelector::VS16 => 0xFE0F,
        };
        let cmap = ReadWindow::new(&self.cmap_table).read::<Cmap<'_>>().ok()?;
        let uvs_record = cmap.find_subtable(
            crate::tables::cmap::PlatformId::UNICODE,
            crate::tables::cmap::EncodingId(5),
        )?;
        let uvs_subtable = cmap
            .window
            .offset(usize::try_from(uvs_record.offset).ok()?)
            .read::<CmapSubtable<'_>>()
            .ok()?;
        match uvs_subtable {
            CmapSubtable::Format14(ref table) => {
                match table.lookup(char_code, selector_value).ok()? {
                    Some(GlyphVariation::Glyph(glyph)) => Some(glyph),
                    Some(GlyphVariation::UseDefault) | None => None,
                }
            }
            _ => None,
        }
    }

    /// Horizontal advance for `glyph_id` in font units.
    pub fn horizontal_advance(&self, glyph_id: u16) -> Result<u16, ParseError> {
        self.hmtx()?.horizontal_advance(glyph_id)
    }

    /// Vertical advance for `glyph_id`, if the font has vertical metrics.
    pub fn vertical_advance(&self, glyph_id: u16) -> Option<u16> {
        let vhea = self.vhea().ok()??;
        let vmtx_data = self
            .vmtx_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::VMTX))
            .ok()?
            .as_ref()?;
        let vmtx = ReadWindow::new(vmtx_data)
            .read_with::<HmtxTable<'_>>((
                usize::from(self.maxp_table.num_glyphs),
                usize::from(vhea.num_h_metrics),
            ))
            .ok()?;
        vmtx.horizontal_advance(glyph_id).ok()
    }

    fn vhea(&self) -> Result<Option<&HheaTable>, ParseError> {
        self.vhea_table
            .get_or_try_init(|| {
                match self.provider.table_data(tag::VHEA)? {
                    Some(data) => Ok(Some(ReadWindow::new(&data).read::<HheaTable>()?)),
                    None => Ok(None),
                }
            })
            .map(Option::as_ref)
    }

    /// The `GDEF` table, if present and readable.
    pub fn gdef_table(&self) -> Result<Option<&GDEFTable>, ParseError> {
        self.gdef_table
            .get_or_try_init(|| match self.provider.table_data(tag::GDEF)? {
                Some(data) => Ok(Some(ReadWindow::new(&data).read::<GDEFTable>()?)),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }

    /// The `GSUB` table, if present and readable.
    pub fn gsub_table(&self) -> Result<Option<&LayoutTable<GSUB>>, ParseError> {
        self.gsub_table
            .get_or_try_init(|| match self.provider.table_data(tag::GSUB)? {
                Some(data) => Ok(Some(ReadWindow::new(&data).read::<LayoutTable<GSUB>>()?)),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }

    /// The `GPOS` table, if present and readable.
    pub fn gpos_table(&self) -> Result<Option<&LayoutTable<GPOS>>, ParseError> {
        self.gpos_table
            .get_or_try_init(|| match self.provider.table_data(tag::GPOS)? {
                Some(data) => Ok(Some(ReadWindow::new(&data).read::<LayoutTable<GPOS>>()?)),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }

    fn kern_table(&self) -> Option<KernTable<'_>> {
        let data = self
            .kern_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::KERN))
            .ok()?
            .as_ref()?;
        ReadWindow::new(data).read::<KernTable<'_>>().ok()
    }

    /// The `OS/2` table.
    pub fn os2_table(&self) -> Result<Option<&Os2>, ParseError> {
        self.os2_table
            .get_or_try_init(|| match self.provider.table_data(tag::OS_2)? {
                Some(data) => Ok(Some(ReadWindow::new(&data).read::<Os2>()?)),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }

    /// The `BASE` table.
    pub fn base_table(&self) -> Result<Option<&crate::tables::base::BaseTable>, ParseError> {
        self.base_table
            .get_or_try_init(|| match self.provider.table_data(tag::BASE)? {
                Some(data) => Ok(Some(
                    ReadWindow::new(&data).read::<crate::tables::base::BaseTable>()?,
                )),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }

    /// Best-effort name strings from the `name` table.
    pub fn name(&self, name_id: u16) -> Result<Option<String>, ParseError> {
        let data = self.name_data.get_or_try_init(|| {
            self.provider
                .table_data(tag::NAME)?
                .map(|data| Box::from(&*data))
                .ok_or(ParseError::MissingData)
        })?;
        let name = ReadWindow::new(data).read::<NameTable<'_>>()?;
        Ok(name.string_for_id(name_id))
    }

    /// The PostScript name of a glyph from the `post` table.
    pub fn glyph_name(&self, glyph_id: u16) -> Result<Option<String>, ParseError> {
        let data = self
            .post_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::POST))?;
        match data {
            Some(data) => {
                let post = ReadWindow::new(data).read::<PostTable<'_>>()?;
                Ok(post.glyph_name(glyph_id)?.map(str::to_owned))
            }
            None => Ok(None),
        }
    }

    /// COLR v0 layers for a glyph, with CPAL available via
    /// [ParsedFont::palette_color].
    pub fn color_layers(&self, glyph_id: u16) -> Result<Option<Vec<LayerRecord>>, ParseError> {
        let data = self
            .colr_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::COLR))?;
        match data {
            Some(data) => ReadWindow::new(data).read::<ColrTable<'_>>()?.layers(glyph_id),
            None => Ok(None),
        }
    }

    /// A colour from the `CPAL` table.
    pub fn palette_color(
        &self,
        palette: usize,
        entry: u16,
    ) -> Result<Option<crate::tables::colr::ColorRecord>, ParseError> {
        let data = self
            .cpal_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::CPAL))?;
        match data {
            Some(data) => Ok(ReadWindow::new(data)
                .read::<CpalTable<'_>>()?
                .color(palette, entry)),
            None => Ok(None),
        }
    }

    fn loca(&self) -> Result<&LocaTable, ParseError> {
        self.loca_table.get_or_try_init(|| {
            let data = self
                .provider
                .read_table_data(tag::LOCA)?;
            ReadWindow::new(&data).read_with::<LocaTable>((
                self.maxp_table.num_glyphs,
                self.head_table.index_to_loc_format,
            ))
        })
    }

    fn glyf_data(&self) -> Result<Option<&[u8]>, ParseError> {
        self.glyf_data
            .get_or_try_init(|| read_and_box_optional_table(&self.provider, tag::GLYF))
            .map(|data| data.as_deref())
    }

    fn cff_data(&self) -> Result<Option<&[u8]>, ParseError> {
        self.cff_data
            .get_or_try_init(|| {
                if let Some(data) = read_and_box_optional_table(&self.provider, tag::CFF)? {
                    return Ok(Some(data));
                }
                read_and_box_optional_table(&self.provider, tag::CFF2)
            })
            .map(|data| data.as_deref())
    }

    /// Parse the glyph record for `glyph_id` from the `glyf` table.
    fn glyf_glyph(&self, glyph_id: u16) -> Result<Glyph, ParseError> {
        let loca = self.loca()?;
        let data = self.glyf_data()?.ok_or(ParseError::MissingData)?;
        GlyfTable::new(ReadWindow::new(data), loca).glyph(glyph_id)
    }

    /// Metrics for `glyph_id`, computed on first request.
    pub fn glyph_metrics(&self, glyph_id: u16) -> Result<GlyphMetrics, ParseError> {
        let cell = self
            .glyph_metrics
            .get(usize::from(glyph_id))
            .ok_or(ParseError::IndexOutOfBounds)?;
        cell.get_or_try_init(|| self.compute_glyph_metrics(glyph_id))
            .copied()
    }

    fn compute_glyph_metrics(&self, glyph_id: u16) -> Result<GlyphMetrics, ParseError> {
        let hmtx = self.hmtx()?;
        let horizontal_advance = hmtx.horizontal_advance(glyph_id)?;
        let left_side_bearing = hmtx.left_side_bearing(glyph_id)?;
        let (bounding_box, outline) = match self.outline_format {
            OutlineFormat::TrueType => {
                let bbox = self.glyf_glyph(glyph_id)?.bounding_box();
                (bbox, OutlineSource::Glyf)
            }
            OutlineFormat::Cff => {
                let data = self.cff_data()?.ok_or(ParseError::MissingData)?;
                match ReadWindow::new(data).read::<CffTable<'_>>() {
                    Ok(cff) => (cff.glyph_bounding_box(glyph_id)?, OutlineSource::Cff),
                    Err(_) => {
                        let cff2 = ReadWindow::new(data).read::<Cff2Table<'_>>()?;
                        let mut bounds = crate::outline::BoundsSink::default();
                        cff2.visit_outline(glyph_id, &mut bounds)?;
                        let bbox = if bounds.started {
                            BoundingBox {
                                x_min: bounds.min.0.floor() as i16,
                                y_min: bounds.min.1.floor() as i16,
                                x_max: bounds.max.0.ceil() as i16,
                                y_max: bounds.max.1.ceil() as i16,
                            }
                        } else {
                            BoundingBox::default()
                        };
                        (bbox, OutlineSource::Cff2)
                    }
                }
            }
        };
        Ok(GlyphMetrics {
            glyph_id,
            horizontal_advance,
            vertical_advance: self.vertical_advance(glyph_id),
            left_side_bearing,
            top_side_bearing: None,
            bounding_box,
            outline,
        })
    }

    /// Emit the outline of `glyph_id` into `sink`, resolving composite
    /// glyphs with a bounded recursion depth.
    pub fn visit_outline(
        &self,
        glyph_id: u16,
        sink: &mut impl OutlineSink,
    ) -> Result<(), ParseError> {
        match self.outline_format {
            OutlineFormat::TrueType => {
                self.visit_glyf_outline(glyph_id, 0.0, 0.0, COMPOSITE_GLYPH_RECURSION_LIMIT, sink)
            }
            OutlineFormat::Cff => {
                let data = self.cff_data()?.ok_or(ParseError::MissingData)?;
                match ReadWindow::new(data).read::<CffTable<'_>>() {
                    Ok(cff) => cff.visit_outline(glyph_id, sink),
                    Err(_) => {
                        let cff2 = ReadWindow::new(data).read::<Cff2Table<'_>>()?;
                        cff2.visit_outline(glyph_id, sink)
                    }
                }
            }
        }
    }

    fn visit_glyf_outline(
        &self,
        glyph_id: u16,
        dx: f32,
        dy: f32,
        depth: u8,
        sink: &mut impl OutlineSink,
    ) -> Result<(), ParseError> {
        if depth == 0 {
            return Err(ParseError::LimitExceeded);
        }
        match self.glyf_glyph(glyph_id)? {
            Glyph::Empty => Ok(()),
            Glyph::Simple(simple) => {
                for contour in simple.contours() {
                    emit_quadratic_contour(contour, dx, dy, sink);
                }
                Ok(())
            }
            Glyph::Composite(composite) => {
                for component in &composite.components {
                    if !component
                        .flags
                        .contains(CompositeGlyphFlag::ARGS_ARE_XY_VALUES)
                    {
                        // Point-matching components need decoded point
                        // streams from both glyphs; they are rare and
                        // skipped.
                        continue;
                    }
                    // Component transforms beyond the offset are not applied
                    // to the emitted path; renderers that need the 2x2
                    // scaling read it from the parsed component.
                    let cdx = dx + component.argument1 as f32;
                    let cdy = dy + component.argument2 as f32;
                    self.visit_glyf_outline(component.glyph_id, cdx, cdy, depth - 1, sink)?;
                }
                Ok(())
            }
        }
    }

    /// Shape one run of codepoints in logical order.
    ///
    /// The pipeline is: cmap mapping, script preprocessing, `GSUB`,
    /// advance population, then `GPOS` (or the kern/mark fallback).
    pub fn shape_run(
        &self,
        codepoints: &[CodePoint],
        script: ScriptClass,
        opt_lang_tag: Option<u32>,
        kerning: bool,
    ) -> Result<Vec<ShapedGlyph>, FontError> {
        let script_tag = script.ot_tag();

        // 1. Map codepoints to glyphs; cluster = codepoint index.
        let mut glyphs = Vec::with_capacity(codepoints.len());
        let mut cluster = 0u32;
        let mut iter = codepoints.iter().peekable();
        while let Some(&cp) = iter.next() {
            let ch = cp.as_char();
            if VariationSelector::try_from(ch).is_ok() {
                // Selectors attach to the preceding character.
                cluster += 1;
                continue;
            }
            let variation = iter
                .peek()
                .and_then(|&&next| VariationSelector::try_from(next.as_char()).ok());
            let glyph_id =
                self.lookup_glyph_index(cp, MatchingPresentation::NotRequired, variation);
            let mut glyph = ShapedGlyph::from_char(ch, glyph_id, cluster);
            glyph.variation = variation;
            glyphs.push(glyph);
            cluster += 1;
        }

        // 2. Script-specific preprocessing.
        scripts::preprocess(script, &mut glyphs);

        // 3. Substitution.
        let opt_gdef = self.gdef_table().map_err(FontError::invalid_table(tag::GDEF))?;
        if let Some(gsub) = self
            .gsub_table()
            .map_err(FontError::invalid_table(tag::GSUB))?
        {
            let features = scripts::substitution_features(script);
            gsub::apply_features(
                gsub,
                opt_gdef,
                script_tag,
                opt_lang_tag,
                features,
                self.num_glyphs(),
                &mut glyphs,
            )
            .map_err(|err| match err {
                crate::error::ShapingError::Parse(err) => {
                    FontError::InvalidFontTable(tag::GSUB, err)
                }
                _ => FontError::InvalidFontTable(tag::GSUB, ParseError::InvalidData),
            })?;
        }
        gsub::strip_joiners(&mut glyphs);
        gsub::assign_mark_attach_classes(&mut glyphs, opt_gdef);

        // 4. Advances from hmtx for the post-substitution glyph ids.
        for glyph in glyphs.iter_mut() {
            let advance = self
                .horizontal_advance(glyph.glyph_id)
                .map_err(FontError::invalid_table(tag::HMTX))?;
            glyph.x_advance = i32::from(advance);
            glyph.y_advance = 0;
        }

        // 5. Positioning.
        let feature_set = match scripts::shaping_model(script) {
            ShapingModel::Joining => PosFeatureSet::Cursive,
            ShapingModel::Indic => PosFeatureSet::Indic,
            ShapingModel::Default => PosFeatureSet::Default,
        };
        match self
            .gpos_table()
            .map_err(FontError::invalid_table(tag::GPOS))?
        {
            Some(gpos) => {
                gpos::apply(
                    gpos,
                    opt_gdef,
                    feature_set,
                    kerning,
                    script_tag,
                    opt_lang_tag,
                    &mut glyphs,
                )
                .map_err(FontError::invalid_table(tag::GPOS))?;
            }
            None => {
                let kern = self.kern_table();
                gpos::apply_fallback(kern.as_ref(), &mut glyphs);
            }
        }

        Ok(glyphs)
    }

    /// Glyph id of U+25CC DOTTED CIRCLE, used as a base for orphaned marks.
    pub fn dotted_circle_index(&self) -> u16 {
        self.lookup_glyph_index(
            CodePoint::from(DOTTED_CIRCLE),
            MatchingPresentation::NotRequired,
            None,
        )
    }

    /// Line advance height in font units: ascender − descender + line gap.
    pub fn line_height(&self) -> i32 {
        i32::from(self.hhea_table.ascender) - i32::from(self.hhea_table.descender)
            + i32::from(self.hhea_table.line_gap)
    }
}

fn emit_quadratic_contour(
    contour: &[crate::tables::glyf::Point],
    dx: f32,
    dy: f32,
    sink: &mut impl OutlineSink,
) {
    use pathfinder_geometry::vector::Vector2F;

    if contour.is_empty() {
        return;
    }

    let point = |p: &crate::tables::glyf::Point| {
        Vector2F::new(f32::from(p.x) + dx, f32::from(p.y) + dy)
    };
    let midpoint = |a: Vector2F, b: Vector2F| (a + b) * 0.5;

    // Find an on-curve starting point, synthesising one from the midpoint of
    // two off-curve neighbours when necessary.
    let start_index = contour.iter().position(|p| p.on_curve);
    let start = match start_index {
        Some(index) => point(&contour[index]),
        None => midpoint(point(&contour[0]), point(&contour[contour.len() - 1])),
    };
    sink.move_to(start);

    let rotate = start_index.map_or(0, |index| index + 1);
    let mut pending_control: Option<Vector2F> = None;
    for i in 0..contour.len() {
        let p = &contour[(i + rotate) % contour.len()];
        let position = point(p);
        if p.on_curve {
            match pending_control.take() {
                Some(control) => sink.quadratic_curve_to(control, position),
                None => sink.line_to(position),
            }
        } else {
            match pending_control.replace(position) {
                Some(control) => {
                    // Two consecutive off-curve points imply an on-curve
                    // midpoint.
                    let implied = midpoint(control, position);
                    sink.quadratic_curve_to(control, implied);
                }
                None => {}
            }
        }
    }
    if let Some(control) = pending_control {
        sink.quadratic_curve_to(control, start);
    }
    sink.close();
}

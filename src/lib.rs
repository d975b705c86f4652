#![warn(rust_2018_idioms)]

//! # Font parser, shaping engine, and text layout
//!
//! Typeline is a read-only font engine written entirely in Rust. It ingests
//! TrueType and OpenType fonts — including WOFF and WOFF2 wrapped files and
//! TrueType collections — exposes their parsed tables, and shapes
//! Unicode-aware text into positioned glyph rectangles for a downstream
//! rasterizer or vector renderer.
//!
//! ## Features
//!
//! * **Parse** TrueType (`ttf`), OpenType (`otf`), WOFF, WOFF2, and TTC
//!   files, with on-demand decompression and reconstruction of transformed
//!   WOFF2 `glyf`/`loca` tables.
//! * **Shape** text with `GSUB` substitution and `GPOS` positioning
//!   (kerning, cursive attachment, mark attachment, contextual lookups),
//!   with joining-form handling for Arabic-family scripts and syllable
//!   reordering for Indic scripts.
//! * **Lay out** logical text into positioned glyphs: UTF-16 decoding,
//!   UAX#9 bidirectional level resolution, script itemization, pen
//!   accumulation, and line alignment.
//!
//! ## Pipeline
//!
//! Bytes flow through [font_data::FontData] into a
//! [tables::TableProvider], which a [ParsedFont] consumes. Text flows
//! through [position::layout_text] (or the UTF-16 variant), which resolves
//! bidi levels and scripts, calls the shaper per run, and yields
//! [position::PositionedGlyph]s that [render::render_text] can feed to a
//! [render::GlyphRenderer] implementation.
//!
//! Unicode properties are served by compact two-stage tries
//! ([unicode::trie::UnicodeTrie]) built once per process; see
//! [unicode::props].
//!
//! A `ParsedFont` is shareable across threads once constructed: optional
//! tables load through write-once cells, and every parsed table is
//! immutable after its first read.

pub mod binary;
pub mod cff;
pub mod context;
pub mod error;
pub mod font;
pub mod font_data;
pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod layout;
pub mod metrics;
pub mod outline;
pub mod position;
pub mod post;
pub mod render;
pub mod scripts;
pub mod tables;
pub mod tag;
pub mod unicode;
pub mod woff;
pub mod woff2;

pub use error::FontError;
pub use font::ParsedFont;
pub use font_data::FontData;
pub use pathfinder_geometry;
pub use position::{layout_text, layout_text_utf16, PositionedGlyph, TextOptions};
pub use render::{render_text, GlyphRenderer};
pub use tinyvec;
pub use unicode::CodePoint;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

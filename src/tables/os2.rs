//! Parsing of the `OS/2` table.

use crate::binary::read::{FromData, ReadCursor};
use crate::error::ParseError;

/// `OS/2` OS/2 and Windows metrics table.
///
/// Versions 0 through 5 are accepted; fields absent from older versions are
/// `None`.
#[allow(missing_docs)]
pub struct Os2 {
    pub version: u16,
    pub x_avg_char_width: i16,
    pub us_weight_class: u16,
    pub us_width_class: u16,
    pub fs_type: u16,
    pub y_subscript_x_size: i16,
    pub y_subscript_y_size: i16,
    pub y_subscript_x_offset: i16,
    pub y_subscript_y_offset: i16,
    pub y_superscript_x_size: i16,
    pub y_superscript_y_size: i16,
    pub y_superscript_x_offset: i16,
    pub y_superscript_y_offset: i16,
    pub y_strikeout_size: i16,
    pub y_strikeout_position: i16,
    pub s_family_class: i16,
    pub panose: [u8; 10],
    pub ul_unicode_range1: u32,
    pub ul_unicode_range2: u32,
    pub ul_unicode_range3: u32,
    pub ul_unicode_range4: u32,
    pub ach_vend_id: u32,
    pub fs_selection: u16,
    pub us_first_char_index: u16,
    pub us_last_char_index: u16,
    pub version0: Option<Version0>,
    pub version1: Option<Version1>,
    pub version2to4: Option<Version2to4>,
    pub version5: Option<Version5>,
}

#[allow(missing_docs)]
pub struct Version0 {
    pub s_typo_ascender: i16,
    pub s_typo_descender: i16,
    pub s_typo_line_gap: i16,
    pub us_win_ascent: u16,
    pub us_win_descent: u16,
}

#[allow(missing_docs)]
pub struct Version1 {
    pub ul_code_page_range1: u32,
    pub ul_code_page_range2: u32,
}

#[allow(missing_docs)]
pub struct Version2to4 {
    pub sx_height: i16,
    pub s_cap_height: i16,
    pub us_default_char: u16,
    pub us_break_char: u16,
    pub us_max_context: u16,
}

#[allow(missing_docs)]
pub struct Version5 {
    pub us_lower_optical_point_size: u16,
    pub us_upper_optical_point_size: u16,
}

impl<'a> FromData<'a> for Os2 {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let version = cursor.read_u16()?;
        cursor.check_version(version <= 5)?;
        let x_avg_char_width = cursor.read_i16()?;
        let us_weight_class = cursor.read_u16()?;
        let us_width_class = cursor.read_u16()?;
        let fs_type = cursor.read_u16()?;
        let y_subscript_x_size = cursor.read_i16()?;
        let y_subscript_y_size = cursor.read_i16()?;
        let y_subscript_x_offset = cursor.read_i16()?;
        let y_subscript_y_offset = cursor.read_i16()?;
        let y_superscript_x_size = cursor.read_i16()?;
        let y_superscript_y_size = cursor.read_i16()?;
        let y_superscript_x_offset = cursor.read_i16()?;
        let y_superscript_y_offset = cursor.read_i16()?;
        let y_strikeout_size = cursor.read_i16()?;
        let y_strikeout_position = cursor.read_i16()?;
        let s_family_class = cursor.read_i16()?;
        let mut panose = [0u8; 10];
        panose.copy_from_slice(cursor.read_slice(10)?);
        let ul_unicode_range1 = cursor.read_u32()?;
        let ul_unicode_range2 = cursor.read_u32()?;
        let ul_unicode_range3 = cursor.read_u32()?;
        let ul_unicode_range4 = cursor.read_u32()?;
        let ach_vend_id = cursor.read_u32()?;
        let fs_selection = cursor.read_u16()?;
        let us_first_char_index = cursor.read_u16()?;
        let us_last_char_index = cursor.read_u16()?;

        // Some version 0 fonts end here.
        let version0 = if cursor.bytes_available() {
            Some(Version0 {
                s_typo_ascender: cursor.read_i16()?,
                s_typo_descender: cursor.read_i16()?,
                s_typo_line_gap: cursor.read_i16()?,
                us_win_ascent: cursor.read_u16()?,
                us_win_descent: cursor.read_u16()?,
            })
        } else {
            None
        };

        let version1 = if version >= 1 && cursor.bytes_available() {
            Some(Version1 {
                ul_code_page_range1: cursor.read_u32()?,
                ul_code_page_range2: cursor.read_u32()?,
            })
        } else {
            None
        };

        let version2to4 = if version >= 2 && cursor.bytes_available() {
            Some(Version2to4 {
                sx_height: cursor.read_i16()?,
                s_cap_height: cursor.read_i16()?,
                us_default_char: cursor.read_u16()?,
                us_break_char: cursor.read_u16()?,
                us_max_context: cursor.read_u16()?,
            })
        } else {
            None
        };

        let version5 = if version >= 5 && cursor.bytes_available() {
            Some(Version5 {
                us_lower_optical_point_size: cursor.read_u16()?,
                us_upper_optical_point_size: cursor.read_u16()?,
            })
        } else {
            None
        };

        Ok(Os2 {
            version,
            x_avg_char_width,
            us_weight_class,
            us_width_class,
            fs_type,
            y_subscript_x_size,
            y_subscript_y_size,
            y_subscript_x_offset,
            y_subscript_y_offset,
            y_superscript_x_size,
            y_superscript_y_size,
            y_superscript_x_offset,
            y_superscript_y_offset,
            y_strikeout_size,
            y_strikeout_position,
            s_family_class,
            panose,
            ul_unicode_range1,
            ul_unicode_range2,
            ul_unicode_range3,
            ul_unicode_range4,
            ach_vend_id,
            fs_selection,
            us_first_char_index,
            us_last_char_index,
            version0,
            version1,
            version2to4,
            version5,
        })
    }
}

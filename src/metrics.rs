//! Per-glyph metrics.

use crate::tables::glyf::BoundingBox;

/// Which table a glyph's outline comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutlineSource {
    Glyf,
    Cff,
    Cff2,
    None,
}

/// Metrics for one glyph, computed once per glyph id and memoized by the
/// owning font.
///
/// Advances and bearings are in font units. The right side bearing derives
/// from the advance, left side bearing, and bounding box width.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub glyph_id: u16,
    pub horizontal_advance: u16,
    /// Vertical advance; `None` when the font carries no vertical metrics.
    pub vertical_advance: Option<u16>,
    pub left_side_bearing: i16,
    pub top_side_bearing: Option<i16>,
    pub bounding_box: BoundingBox,
    pub outline: OutlineSource,
}

impl GlyphMetrics {
    /// The right side bearing.
    pub fn right_side_bearing(&self) -> i32 {
        i32::from(self.horizontal_advance)
            - i32::from(self.left_side_bearing)
            - (i32::from(self.bounding_box.x_max) - i32::from(self.bounding_box.x_min))
    }

    /// Width of the inked area.
    pub fn width(&self) -> i32 {
        i32::from(self.bounding_box.x_max) - i32::from(self.bounding_box.x_min)
    }

    /// Height of the inked area.
    pub fn height(&self) -> i32 {
        i32::from(self.bounding_box.y_max) - i32::from(self.bounding_box.y_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_metrics() {
        let metrics = GlyphMetrics {
            glyph_id: 1,
            horizontal_advance: 600,
            vertical_advance: None,
            left_side_bearing: 50,
            top_side_bearing: None,
            bounding_box: BoundingBox {
                x_min: 50,
                y_min: 0,
                x_max: 550,
                y_max: 700,
            },
            outline: OutlineSource::Glyf,
        };
        assert_eq!(metrics.width(), 500);
        assert_eq!(metrics.height(), 700);
        assert_eq!(metrics.right_side_bearing(), 50);
    }
}

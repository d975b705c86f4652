//! Parsing of the `glyf` table.

use bitflags::bitflags;

use crate::binary::read::{FromData, ReadCursor, ReadWindow};
use crate::binary::F2Dot14;
use crate::error::ParseError;
use crate::tables::loca::LocaTable;

/// Recursion limit for nested composite glyphs.
pub const COMPOSITE_GLYPH_RECURSION_LIMIT: u8 = 16;

bitflags! {
    #[rustfmt::skip]
    pub struct SimpleGlyphFlag: u8 {
        const ON_CURVE_POINT                       = 0b0000_0001;
        const X_SHORT_VECTOR                       = 0b0000_0010;
        const Y_SHORT_VECTOR                       = 0b0000_0100;
        const REPEAT_FLAG                          = 0b0000_1000;
        const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR = 0b0001_0000;
        const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR = 0b0010_0000;
    }
}

bitflags! {
    pub struct CompositeGlyphFlag: u16 {
        const ARG_1_AND_2_ARE_WORDS     = 0x0001;
        const ARGS_ARE_XY_VALUES        = 0x0002;
        const ROUND_XY_TO_GRID          = 0x0004;
        const WE_HAVE_A_SCALE           = 0x0008;
        const MORE_COMPONENTS           = 0x0020;
        const WE_HAVE_AN_X_AND_Y_SCALE  = 0x0040;
        const WE_HAVE_A_TWO_BY_TWO      = 0x0080;
        const WE_HAVE_INSTRUCTIONS      = 0x0100;
        const USE_MY_METRICS            = 0x0200;
        const OVERLAP_COMPOUND          = 0x0400;
        const SCALED_COMPONENT_OFFSET   = 0x0800;
        const UNSCALED_COMPONENT_OFFSET = 0x1000;
    }
}

/// A glyph outline point in font units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
    pub on_curve: bool,
}

/// Glyph bounding box in font units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl BoundingBox {
    /// Compute the bounding box of a set of points.
    pub fn of_points(points: &[Point]) -> BoundingBox {
        let mut bbox = BoundingBox {
            x_min: i16::MAX,
            y_min: i16::MAX,
            x_max: i16::MIN,
            y_max: i16::MIN,
        };
        if points.is_empty() {
            return BoundingBox::default();
        }
        for point in points {
            bbox.x_min = bbox.x_min.min(point.x);
            bbox.y_min = bbox.y_min.min(point.y);
            bbox.x_max = bbox.x_max.max(point.x);
            bbox.y_max = bbox.y_max.max(point.y);
        }
        bbox
    }
}

/// A parsed glyph record.
#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    Empty,
    Simple(SimpleGlyph),
    Composite(CompositeGlyph),
}

/// A glyph with its own contours.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleGlyph {
    pub bounding_box: BoundingBox,
    pub end_pts_of_contours: Vec<u16>,
    pub instructions: Vec<u8>,
    pub points: Vec<Point>,
}

/// A glyph assembled from other glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeGlyph {
    pub bounding_box: BoundingBox,
    pub components: Vec<CompositeComponent>,
    pub instructions: Vec<u8>,
}

/// One component reference within a composite glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeComponent {
    pub flags: CompositeGlyphFlag,
    pub glyph_id: u16,
    /// Offset (when `ARGS_ARE_XY_VALUES`) or point numbers.
    pub argument1: i32,
    pub argument2: i32,
    pub transform: ComponentTransform,
}

/// The scaling applied to a composite component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ComponentTransform {
    None,
    Scale(F2Dot14),
    XyScale(F2Dot14, F2Dot14),
    TwoByTwo(F2Dot14, F2Dot14, F2Dot14, F2Dot14),
}

impl Glyph {
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Glyph::Empty => BoundingBox::default(),
            Glyph::Simple(simple) => simple.bounding_box,
            Glyph::Composite(composite) => composite.bounding_box,
        }
    }
}

impl SimpleGlyph {
    /// The glyph's contours as point runs.
    pub fn contours(&self) -> impl Iterator<Item = &[Point]> {
        let mut start = 0usize;
        self.end_pts_of_contours.iter().filter_map(move |&end| {
            let end = usize::from(end) + 1;
            let contour = self.points.get(start..end);
            start = end;
            contour
        })
    }
}

impl<'a> FromData<'a> for Glyph {
    type Parsed = Self;

    fn read(cursor: &mut ReadCursor<'a>) -> Result<Self, ParseError> {
        let number_of_contours = cursor.read_i16()?;
        let bounding_box = read_bounding_box(cursor)?;
        if number_of_contours >= 0 {
            let simple = read_simple_glyph(cursor, number_of_contours as u16, bounding_box)?;
            if simple.points.is_empty() {
                Ok(Glyph::Empty)
            } else {
                Ok(Glyph::Simple(simple))
            }
        } else {
            let composite = read_composite_glyph(cursor, bounding_box)?;
            Ok(Glyph::Composite(composite))
        }
    }
}

fn read_bounding_box(cursor: &mut ReadCursor<'_>) -> Result<BoundingBox, ParseError> {
    let x_min = cursor.read_i16()?;
    let y_min = cursor.read_i16()?;
    let x_max = cursor.read_i16()?;
    let y_max = cursor.read_i16()?;
    Ok(BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
    })
}

fn read_simple_glyph(
    cursor: &mut ReadCursor<'_>,
    number_of_contours: u16,
    bounding_box: BoundingBox,
) -> Result<SimpleGlyph, ParseError> {
    let end_pts_of_contours = cursor
        .read_array::<crate::binary::U16>(usize::from(number_of_contours))?
        .to_vec();
    let num_points = match end_pts_of_contours.last() {
        Some(&last) => usize::from(last) + 1,
        None => 0,
    };

    let instruction_length = usize::from(cursor.read_u16()?);
    let instructions = cursor.read_slice(instruction_length)?.to_vec();

    // Flags with run-length expansion.
    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = SimpleGlyphFlag::from_bits_truncate(cursor.read_u8()?);
        flags.push(flag);
        if flag.contains(SimpleGlyphFlag::REPEAT_FLAG) {
            let repeats = cursor.read_u8()?;
            for _ in 0..repeats {
                flags.push(flag);
            }
        }
    }
    if flags.len() != num_points {
        return Err(ParseError::InvalidData);
    }

    let mut points = Vec::with_capacity(num_points);
    let mut x = 0i16;
    for &flag in &flags {
        let dx = if flag.contains(SimpleGlyphFlag::X_SHORT_VECTOR) {
            let value = i16::from(cursor.read_u8()?);
            if flag.contains(SimpleGlyphFlag::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR) {
                value
            } else {
                -value
            }
        } else if flag.contains(SimpleGlyphFlag::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR) {
            0
        } else {
            cursor.read_i16()?
        };
        x = x.wrapping_add(dx);
        points.push(Point {
            x,
            y: 0,
            on_curve: flag.contains(SimpleGlyphFlag::ON_CURVE_POINT),
        });
    }
    let mut y = 0i16;
    for (point, &flag) in points.iter_mut().zip(flags.iter()) {
        let dy = if flag.contains(SimpleGlyphFlag::Y_SHORT_VECTOR) {
            let value = i16::from(cursor.read_u8()?);
            if flag.contains(SimpleGlyphFlag::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR) {
                value
            } else {
                -value
            }
        } else if flag.contains(SimpleGlyphFlag::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR) {
            0
        } else {
            cursor.read_i16()?
        };
        y = y.wrapping_add(dy);
        point.y = y;
    }

    Ok(SimpleGlyph {
        bounding_box,
        end_pts_of_contours,
        instructions,
        points,
    })
}

fn read_composite_glyph(
    cursor: &mut ReadCursor<'_>,
    bounding_box: BoundingBox,
) -> Result<CompositeGlyph, ParseError> {
    let mut components = Vec::new();
    let mut have_instructions = false;
    loop {
        let flags = CompositeGlyphFlag::from_bits_truncate(cursor.read_u16()?);
        let glyph_id = cursor.read_u16()?;
        let (argument1, argument2) = if flags.contains(CompositeGlyphFlag::ARG_1_AND_2_ARE_WORDS) {
            (i32::from(cursor.read_i16()?), i32::from(cursor.read_i16()?))
        } else if flags.contains(CompositeGlyphFlag::ARGS_ARE_XY_VALUES) {
            (i32::from(cursor.read_i8()?), i32::from(cursor.read_i8()?))
        } else {
            (i32::from(cursor.read_u8()?), i32::from(cursor.read_u8()?))
        };
        let transform = if flags.contains(CompositeGlyphFlag::WE_HAVE_A_SCALE) {
            ComponentTransform::Scale(cursor.read::<F2Dot14>()?)
        } else if flags.contains(CompositeGlyphFlag::WE_HAVE_AN_X_AND_Y_SCALE) {
            ComponentTransform::XyScale(cursor.read::<F2Dot14>()?, cursor.read::<F2Dot14>()?)
        } else if flags.contains(CompositeGlyphFlag::WE_HAVE_A_TWO_BY_TWO) {
            ComponentTransform::TwoByTwo(
                cursor.read::<F2Dot14>()?,
                cursor.read::<F2Dot14>()?,
                cursor.read::<F2Dot14>()?,
                cursor.read::<F2Dot14>()?,
            )
        } else {
            ComponentTransform::None
        };
        have_instructions |= flags.contains(CompositeGlyphFlag::WE_HAVE_INSTRUCTIONS);
        components.push(CompositeComponent {
            flags,
            glyph_id,
            argument1,
            argument2,
            transform,
        });
        if !flags.contains(CompositeGlyphFlag::MORE_COMPONENTS) {
            break;
        }
    }
    let instructions = if have_instructions {
        let instruction_length = usize::from(cursor.read_u16()?);
        cursor.read_slice(instruction_length)?.to_vec()
    } else {
        Vec::new()
    };

    Ok(CompositeGlyph {
        bounding_box,
        components,
        instructions,
    })
}

/// `glyf` table: per-glyph outline records located through `loca`.
pub struct GlyfTable<'a> {
    window: ReadWindow<'a>,
    loca: &'a LocaTable,
}

impl<'a> GlyfTable<'a> {
    pub fn new(window: ReadWindow<'a>, loca: &'a LocaTable) -> GlyfTable<'a> {
        GlyfTable { window, loca }
    }

    /// Parse the record for `glyph_id`.
    pub fn glyph(&self, glyph_id: u16) -> Result<Glyph, ParseError> {
        match self.loca.glyph_range(glyph_id) {
            Some((start, end)) => self
                .window
                .offset_length(start, end - start)?
                .read::<Glyph>(),
            None => Ok(Glyph::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadWindow;

    // A triangle: one contour, three on-curve points.
    fn triangle_glyph() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1i16.to_be_bytes()); // contours
        for value in [0i16, 0, 100, 100] {
            data.extend_from_slice(&value.to_be_bytes()); // bbox
        }
        data.extend_from_slice(&2u16.to_be_bytes()); // last point index
        data.extend_from_slice(&0u16.to_be_bytes()); // no instructions
        // flags: on-curve, x/y as i16
        data.extend_from_slice(&[0x01, 0x01, 0x01]);
        for value in [0i16, 100, -50] {
            data.extend_from_slice(&value.to_be_bytes()); // x deltas
        }
        for value in [0i16, 0, 100] {
            data.extend_from_slice(&value.to_be_bytes()); // y deltas
        }
        data
    }

    #[test]
    fn parse_simple_glyph() {
        let data = triangle_glyph();
        let glyph = ReadWindow::new(&data).read::<Glyph>().unwrap();
        match glyph {
            Glyph::Simple(simple) => {
                assert_eq!(simple.points.len(), 3);
                assert_eq!(
                    simple.points[1],
                    Point {
                        x: 100,
                        y: 0,
                        on_curve: true
                    }
                );
                assert_eq!(
                    simple.points[2],
                    Point {
                        x: 50,
                        y: 100,
                        on_curve: true
                    }
                );
                assert_eq!(simple.contours().count(), 1);
            }
            other => panic!("expected simple glyph, got {:?}", other),
        }
    }

    #[test]
    fn short_vector_decoding() {
        let mut data = Vec::new();
        data.extend_from_slice(&1i16.to_be_bytes());
        data.extend_from_slice(&[0; 8]); // bbox
        data.extend_from_slice(&1u16.to_be_bytes()); // two points
        data.extend_from_slice(&0u16.to_be_bytes());
        // point 0: short positive x/y; point 1: short negative x, y same
        data.extend_from_slice(&[0x01 | 0x02 | 0x04 | 0x10 | 0x20, 0x01 | 0x02 | 0x20]);
        data.extend_from_slice(&[5, 3]); // x bytes
        data.extend_from_slice(&[7]); // y bytes
        let glyph = ReadWindow::new(&data).read::<Glyph>().unwrap();
        match glyph {
            Glyph::Simple(simple) => {
                assert_eq!(simple.points[0], Point { x: 5, y: 7, on_curve: true });
                assert_eq!(simple.points[1], Point { x: 2, y: 7, on_curve: true });
            }
            other => panic!("expected simple glyph, got {:?}", other),
        }
    }

    #[test]
    fn bounding_box_of_points() {
        let points = [
            Point { x: -5, y: 2, on_curve: true },
            Point { x: 10, y: -3, on_curve: false },
        ];
        let bbox = BoundingBox::of_points(&points);
        assert_eq!(
            bbox,
            BoundingBox {
                x_min: -5,
                y_min: -3,
                x_max: 10,
                y_max: 2
            }
        );
    }
}

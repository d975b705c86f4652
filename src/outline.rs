//! Glyph outline emission.

use pathfinder_geometry::vector::Vector2F;

/// Receiver for outline path segments in font units.
///
/// TrueType outlines emit quadratic segments, CFF outlines cubic ones; a
/// sink sees whichever the glyph source produces.
pub trait OutlineSink {
    fn move_to(&mut self, to: Vector2F);
    fn line_to(&mut self, to: Vector2F);
    fn quadratic_curve_to(&mut self, control: Vector2F, to: Vector2F);
    fn cubic_curve_to(&mut self, control1: Vector2F, control2: Vector2F, to: Vector2F);
    fn close(&mut self);
}

/// A sink that records the extremes of the emitted points.
///
/// Curve control points are included, giving a conservative bound; this
/// matches how fallback bounding boxes are derived for outlines without
/// stored extents.
#[derive(Debug, Default)]
pub struct BoundsSink {
    pub started: bool,
    pub min: (f32, f32),
    pub max: (f32, f32),
}

impl BoundsSink {
    fn add(&mut self, point: Vector2F) {
        let (x, y) = (point.x(), point.y());
        if self.started {
            self.min.0 = self.min.0.min(x);
            self.min.1 = self.min.1.min(y);
            self.max.0 = self.max.0.max(x);
            self.max.1 = self.max.1.max(y);
        } else {
            self.started = true;
            self.min = (x, y);
            self.max = (x, y);
        }
    }
}

impl OutlineSink for BoundsSink {
    fn move_to(&mut self, to: Vector2F) {
        self.add(to);
    }

    fn line_to(&mut self, to: Vector2F) {
        self.add(to);
    }

    fn quadratic_curve_to(&mut self, control: Vector2F, to: Vector2F) {
        self.add(control);
        self.add(to);
    }

    fn cubic_curve_to(&mut self, control1: Vector2F, control2: Vector2F, to: Vector2F) {
        self.add(control1);
        self.add(control2);
        self.add(to);
    }

    fn close(&mut self) {}
}

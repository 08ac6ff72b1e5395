//! Approximating elliptical arcs with cubic bezier curves.
//!
//! Circles, ellipses, arcs and the corners of rounded clipping rectangles are all
//! drawn with the same approximation: the swept angle is divided into a number of
//! equal steps, and each step is turned into one cubic segment whose control points
//! lie along the tangents at its endpoints, scaled by a third of the step.
//!
//! The approximation is not an exact conic, but it is deterministic, so the same
//! input always produces the same control points.

use tiny_skia_path::Point;

/// The number of segments used when no other number is requested.
pub const DEFAULT_SEGMENTS: u32 = 8;

/// An elliptical arc, in backend coordinates (bottom-left origin, y-up).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ellipse {
    /// The x coordinate of the center.
    pub x: f32,
    /// The y coordinate of the center.
    pub y: f32,
    /// The horizontal radius.
    pub r1: f32,
    /// The vertical radius. A value of zero means "same as `r1`".
    pub r2: f32,
    /// The rotation of the ellipse in degrees.
    pub rotation: f32,
    /// The number of cubic segments. Values below two are clamped to two.
    pub segments: u32,
    /// The start angle in degrees, counter-clockwise from the positive x axis.
    pub start: f32,
    /// The end angle in degrees.
    pub end: f32,
}

impl Ellipse {
    /// A full circle.
    pub fn circle(x: f32, y: f32, r: f32) -> Self {
        Self::arc(x, y, r, r, 0.0, 360.0)
    }

    /// An arc of an axis-aligned ellipse.
    pub fn arc(x: f32, y: f32, r1: f32, r2: f32, start: f32, end: f32) -> Self {
        Self {
            x,
            y,
            r1,
            r2,
            rotation: 0.0,
            segments: DEFAULT_SEGMENTS,
            start,
            end,
        }
    }

    /// Return the same ellipse rotated by `rotation` degrees around its center.
    #[must_use]
    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return the same ellipse approximated with a different number of segments.
    #[must_use]
    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    /// Whether the ellipse has no extent and should not be drawn at all.
    pub fn is_degenerate(&self) -> bool {
        self.r1 == 0.0
    }

    /// The transform that has to be concatenated before drawing a rotated ellipse.
    ///
    /// It places the local origin at the center of the ellipse. Returns `None` if
    /// the ellipse is not rotated.
    pub fn local_transform(&self) -> Option<[f32; 6]> {
        if self.rotation == 0.0 {
            return None;
        }

        let a = -self.rotation.to_radians();
        Some([a.cos(), -a.sin(), a.sin(), a.cos(), self.x, self.y])
    }

    /// Approximate the arc.
    ///
    /// For rotated ellipses, the resulting points are relative to the center, and
    /// [`Ellipse::local_transform`] needs to be applied when drawing them. Returns
    /// `None` for degenerate ellipses.
    pub fn approximate(&self) -> Option<BezierArc> {
        if self.is_degenerate() {
            return None;
        }

        let r1 = self.r1;
        let r2 = if self.r2 == 0.0 { r1 } else { self.r2 };
        let (x0, y0) = if self.rotation == 0.0 {
            (self.x, self.y)
        } else {
            (0.0, 0.0)
        };

        let segments = self.segments.max(2);
        let start = self.start.to_radians();
        let end = self.end.to_radians();
        let dt = (end - start) / segments as f32;
        let dtm = dt / 3.0;

        let point = |t: f32| Point::from_xy(x0 + r1 * t.cos(), y0 + r2 * t.sin());
        let derivative = |t: f32| Point::from_xy(-r1 * t.sin(), r2 * t.cos());

        let first = point(start);
        let mut prev = first;
        let mut prev_d = derivative(start);
        let mut curves = Vec::with_capacity(segments as usize);

        for i in 1..=segments {
            let t = i as f32 * dt + start;
            let cur = point(t);
            let cur_d = derivative(t);

            curves.push(CubicSegment {
                ctrl1: Point::from_xy(prev.x + prev_d.x * dtm, prev.y + prev_d.y * dtm),
                ctrl2: Point::from_xy(cur.x - cur_d.x * dtm, cur.y - cur_d.y * dtm),
                end: cur,
            });

            prev = cur;
            prev_d = cur_d;
        }

        Some(BezierArc {
            start: first,
            curves,
        })
    }
}

/// One cubic bezier segment. The start point is the end of the previous segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CubicSegment {
    /// The first control point.
    pub ctrl1: Point,
    /// The second control point.
    pub ctrl2: Point,
    /// The end point.
    pub end: Point,
}

/// The approximation of an arc: a start point followed by connected cubic segments.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierArc {
    /// The point the arc starts at.
    pub start: Point,
    /// The segments, in drawing order.
    pub curves: Vec<CubicSegment>,
}

impl BezierArc {
    /// The point the arc ends at.
    pub fn end(&self) -> Point {
        self.curves.last().map(|c| c.end).unwrap_or(self.start)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    fn assert_point(p: Point, x: f32, y: f32) {
        assert!(
            approx_eq!(f32, p.x, x, epsilon = 1e-3) && approx_eq!(f32, p.y, y, epsilon = 1e-3),
            "expected ({x}, {y}), got ({}, {})",
            p.x,
            p.y
        );
    }

    #[test]
    fn full_circle_closes() {
        let arc = Ellipse::circle(50.0, 60.0, 20.0).approximate().unwrap();

        assert_eq!(arc.curves.len(), 8);
        assert_point(arc.start, 70.0, 60.0);
        assert_point(arc.end(), arc.start.x, arc.start.y);
    }

    #[test]
    fn quarter_circle_control_points() {
        let arc = Ellipse::arc(0.0, 0.0, 10.0, 10.0, 0.0, 90.0)
            .with_segments(2)
            .approximate()
            .unwrap();

        let dtm = std::f32::consts::FRAC_PI_4 / 3.0;
        let s = std::f32::consts::FRAC_1_SQRT_2;

        assert_point(arc.start, 10.0, 0.0);
        assert_point(arc.curves[0].ctrl1, 10.0, 10.0 * dtm);
        assert_point(
            arc.curves[0].ctrl2,
            10.0 * s + 10.0 * s * dtm,
            10.0 * s - 10.0 * s * dtm,
        );
        assert_point(arc.curves[0].end, 10.0 * s, 10.0 * s);
        assert_point(arc.curves[1].end, 0.0, 10.0);
    }

    #[test]
    fn segments_are_clamped() {
        let arc = Ellipse::circle(0.0, 0.0, 5.0)
            .with_segments(0)
            .approximate()
            .unwrap();
        assert_eq!(arc.curves.len(), 2);
    }

    #[test]
    fn second_radius_defaults_to_first() {
        let circle = Ellipse::arc(0.0, 0.0, 7.0, 0.0, 0.0, 360.0).approximate();
        let explicit = Ellipse::arc(0.0, 0.0, 7.0, 7.0, 0.0, 360.0).approximate();
        assert_eq!(circle, explicit);
    }

    #[test]
    fn ellipse_uses_both_radii() {
        let arc = Ellipse::arc(0.0, 0.0, 10.0, 4.0, 0.0, 360.0)
            .with_segments(4)
            .approximate()
            .unwrap();
        assert_point(arc.curves[0].end, 0.0, 4.0);
        assert_point(arc.curves[1].end, -10.0, 0.0);
        assert_point(arc.curves[2].end, 0.0, -4.0);
    }

    #[test]
    fn zero_radius_is_degenerate() {
        assert!(Ellipse::circle(10.0, 10.0, 0.0).approximate().is_none());
    }

    #[test]
    fn rotated_ellipse_is_centered_at_origin() {
        let ellipse = Ellipse::arc(30.0, 40.0, 10.0, 5.0, 0.0, 360.0).rotated(90.0);
        let arc = ellipse.approximate().unwrap();
        assert_point(arc.start, 10.0, 0.0);

        let [a, b, c, d, e, f] = ellipse.local_transform().unwrap();
        assert!(approx_eq!(f32, a, 0.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, b, 1.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, c, -1.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, d, 0.0, epsilon = 1e-6));
        assert_eq!((e, f), (30.0, 40.0));
    }

    #[test]
    fn unrotated_ellipse_has_no_transform() {
        assert!(Ellipse::circle(1.0, 2.0, 3.0).local_transform().is_none());
    }
}

// src/geometry.rs - Planar primitives: circle intersection, elbow selection, bearings
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used for coincident centers and near-tangent circles.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Point at fraction `t` along the segment from `self` to `other`.
    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Point at `length` from `self` along the bearing `angle_deg`.
    pub fn polar(&self, length: f64, angle_deg: f64) -> Point2 {
        let a = angle_deg.to_radians();
        Point2::new(self.x + length * a.cos(), self.y + length * a.sin())
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("expected a 2-dimensional point, got {0} coordinates")]
    Dimension(usize),
}

impl TryFrom<&[f64]> for Point2 {
    type Error = GeometryError;

    fn try_from(v: &[f64]) -> Result<Self, Self::Error> {
        match v {
            [x, y] => Ok(Point2::new(*x, *y)),
            _ => Err(GeometryError::Dimension(v.len())),
        }
    }
}

impl std::fmt::Display for Point2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub const fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Why two circles produced no intersection pair.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum NoIntersection {
    #[error("negative radius")]
    NegativeRadius,
    #[error("non-finite circle parameters")]
    NonFinite,
    #[error("circles share a center")]
    Concentric,
    #[error("circles are too far apart")]
    TooFar,
    #[error("one circle lies inside the other")]
    Contained,
}

/// Exactly two intersection points, identical for tangent circles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntersectionPair {
    pub first: Point2,
    pub second: Point2,
}

impl IntersectionPair {
    pub fn points(&self) -> [Point2; 2] {
        [self.first, self.second]
    }

    pub fn is_tangent(&self) -> bool {
        self.first == self.second
    }

    /// Select the point with the smaller x coordinate, preferring `first`
    /// on ties. This is the elbow configuration the arms are built for.
    pub fn select(&self) -> Option<Point2> {
        if !self.first.is_finite() || !self.second.is_finite() {
            return None;
        }
        if self.second.x < self.first.x {
            Some(self.second)
        } else {
            Some(self.first)
        }
    }
}

/// Intersect two circles.
///
/// The pair is ordered `p3 + offset`, `p3 - offset`, where `p3` is the foot
/// of the common chord on the line between centers and `offset` is the
/// counter-clockwise perpendicular of that line scaled to the half chord.
pub fn circle_intersections(c1: &Circle, c2: &Circle) -> Result<IntersectionPair, NoIntersection> {
    let (r1, r2) = (c1.radius, c2.radius);
    if !c1.center.is_finite() || !c2.center.is_finite() || !r1.is_finite() || !r2.is_finite() {
        return Err(NoIntersection::NonFinite);
    }
    if r1 < 0.0 || r2 < 0.0 {
        return Err(NoIntersection::NegativeRadius);
    }

    let dx = c2.center.x - c1.center.x;
    let dy = c2.center.y - c1.center.y;
    let d = dx.hypot(dy);
    if d < EPSILON {
        return Err(NoIntersection::Concentric);
    }
    if d > r1 + r2 {
        return Err(NoIntersection::TooFar);
    }
    if d < (r1 - r2).abs() {
        return Err(NoIntersection::Contained);
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let mut h_sq = r1 * r1 - a * a;
    if h_sq < 0.0 {
        // near-tangent rounding
        if h_sq > -EPSILON {
            h_sq = 0.0;
        } else {
            return Err(NoIntersection::TooFar);
        }
    }
    let h = h_sq.sqrt();

    let p3 = Point2::new(c1.center.x + a * dx / d, c1.center.y + a * dy / d);
    let ox = -h * dy / d;
    let oy = h * dx / d;

    Ok(IntersectionPair {
        first: Point2::new(p3.x + ox, p3.y + oy),
        second: Point2::new(p3.x - ox, p3.y - oy),
    })
}

/// Bearing from `from` to `to` in degrees, normalized to `[0, 360)`.
pub fn bearing_deg(from: &Point2, to: &Point2) -> Option<f64> {
    let angle = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    if angle.is_nan() {
        return None;
    }
    let angle = if angle < 0.0 { angle + 360.0 } else { angle };
    // -0.0 and tiny negatives can round up to exactly 360
    if angle >= 360.0 { Some(0.0) } else { Some(angle) }
}

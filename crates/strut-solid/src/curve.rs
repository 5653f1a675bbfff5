//! Strut centerline curves.
//!
//! Upstream stages hand this engine either straight segments or sampled
//! (polyline) curves produced by conformal mapping onto curved domains. Both
//! are exposed through one arc-length-parametrized type so the offset solver
//! and sleeve builder never branch on the concrete shape.

use nalgebra::{Point3, Vector3};

/// A strut centerline, parametrized over `[0, 1]` by arc length.
///
/// `Polyline` curves use chord-length parametrization, which is exact arc
/// length for the sampled geometry this engine receives.
#[derive(Debug, Clone)]
pub enum StrutCurve {
    /// Straight segment between two points.
    Line { start: Point3<f64>, end: Point3<f64> },

    /// Sampled curve through an ordered list of points (at least 2).
    Polyline {
        points: Vec<Point3<f64>>,
        /// Cumulative chord lengths, `cumulative[0] == 0`, last == total length.
        cumulative: Vec<f64>,
    },
}

impl StrutCurve {
    /// Create a straight strut curve.
    pub fn line(start: Point3<f64>, end: Point3<f64>) -> Self {
        StrutCurve::Line { start, end }
    }

    /// Create a polyline strut curve through the given points.
    ///
    /// Consecutive duplicate points are collapsed; a polyline that degenerates
    /// to fewer than 2 distinct points gets a zero length and is dropped by
    /// canonicalization.
    pub fn polyline(points: Vec<Point3<f64>>) -> Self {
        let mut pts: Vec<Point3<f64>> = Vec::with_capacity(points.len());
        for p in points {
            if pts.last().map_or(true, |q: &Point3<f64>| (p - q).norm() > 0.0) {
                pts.push(p);
            }
        }
        if pts.is_empty() {
            // Zero-length curve at the origin; canonicalization drops it.
            pts.push(Point3::origin());
        }

        let mut cumulative = Vec::with_capacity(pts.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for w in pts.windows(2) {
            total += (w[1] - w[0]).norm();
            cumulative.push(total);
        }

        StrutCurve::Polyline {
            points: pts,
            cumulative,
        }
    }

    /// Whether the curve is a straight segment.
    #[inline]
    pub fn is_linear(&self) -> bool {
        matches!(self, StrutCurve::Line { .. })
    }

    /// Check that all coordinates are finite.
    pub fn is_finite(&self) -> bool {
        match self {
            StrutCurve::Line { start, end } => {
                start.coords.iter().all(|c| c.is_finite())
                    && end.coords.iter().all(|c| c.is_finite())
            }
            StrutCurve::Polyline { points, .. } => points
                .iter()
                .all(|p| p.coords.iter().all(|c| c.is_finite())),
        }
    }

    /// Total arc length.
    pub fn length(&self) -> f64 {
        match self {
            StrutCurve::Line { start, end } => (end - start).norm(),
            StrutCurve::Polyline { cumulative, .. } => {
                cumulative.last().copied().unwrap_or(0.0)
            }
        }
    }

    /// Curve start point.
    #[inline]
    pub fn start(&self) -> Point3<f64> {
        match self {
            StrutCurve::Line { start, .. } => *start,
            StrutCurve::Polyline { points, .. } => points[0],
        }
    }

    /// Curve end point.
    #[inline]
    pub fn end(&self) -> Point3<f64> {
        match self {
            StrutCurve::Line { end, .. } => *end,
            StrutCurve::Polyline { points, .. } => *points.last().expect("non-empty polyline"),
        }
    }

    /// Evaluate the curve at normalized arc-length parameter `t ∈ [0, 1]`.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let t = t.clamp(0.0, 1.0);
        match self {
            StrutCurve::Line { start, end } => start + (end - start) * t,
            StrutCurve::Polyline { points, cumulative } => {
                let total = self.length();
                if total <= 0.0 || points.len() < 2 {
                    return points[0];
                }
                let target = t * total;
                let seg = match cumulative
                    .binary_search_by(|s| s.partial_cmp(&target).expect("finite length"))
                {
                    Ok(i) => i.min(points.len() - 2),
                    Err(i) => i.saturating_sub(1).min(points.len() - 2),
                };
                let seg_len = cumulative[seg + 1] - cumulative[seg];
                let local = if seg_len > 0.0 {
                    (target - cumulative[seg]) / seg_len
                } else {
                    0.0
                };
                points[seg] + (points[seg + 1] - points[seg]) * local
            }
        }
    }

    /// Unit tangent at normalized arc-length parameter `t ∈ [0, 1]`.
    ///
    /// For polylines the tangent of the containing segment is returned; at a
    /// degenerate (zero-length) curve the tangent falls back to +X.
    pub fn tangent_at(&self, t: f64) -> Vector3<f64> {
        let t = t.clamp(0.0, 1.0);
        let dir = match self {
            StrutCurve::Line { start, end } => end - start,
            StrutCurve::Polyline { points, cumulative } => {
                let total = self.length();
                if total <= 0.0 || points.len() < 2 {
                    return Vector3::x();
                }
                let target = t * total;
                let mut seg = points.len() - 2;
                for i in 0..points.len() - 1 {
                    if cumulative[i + 1] >= target {
                        seg = i;
                        break;
                    }
                }
                points[seg + 1] - points[seg]
            }
        };
        let norm = dir.norm();
        if norm > 0.0 {
            dir / norm
        } else {
            Vector3::x()
        }
    }

    /// Normalized parameter corresponding to an arc-length distance from the
    /// curve start, clamped to `[0, 1]`.
    #[inline]
    pub fn param_at_length(&self, distance: f64) -> f64 {
        let total = self.length();
        if total <= 0.0 {
            0.0
        } else {
            (distance / total).clamp(0.0, 1.0)
        }
    }

    /// Midpoint of the curve (at half arc length).
    #[inline]
    pub fn midpoint(&self) -> Point3<f64> {
        self.point_at(0.5)
    }

    /// The same curve traversed in the opposite direction.
    pub fn reversed(&self) -> StrutCurve {
        match self {
            StrutCurve::Line { start, end } => StrutCurve::line(*end, *start),
            StrutCurve::Polyline { points, .. } => {
                let mut rev = points.clone();
                rev.reverse();
                StrutCurve::polyline(rev)
            }
        }
    }
}

/// Build an orthonormal frame `(u, v)` perpendicular to a unit tangent.
///
/// The reference axis is picked away from the tangent to keep the cross
/// product well conditioned.
pub fn perpendicular_frame(tangent: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let reference = if tangent.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = tangent.cross(&reference).normalize();
    let v = tangent.cross(&u);
    (u, v)
}

/// Sample `sides` points equally spaced on the circle of the given radius
/// centered at `center`, in the plane perpendicular to `normal`.
///
/// `phase` rotates the whole ring (radians); sleeve rings use it for the
/// alternating half-twist.
pub fn cross_section_ring(
    center: &Point3<f64>,
    normal: &Vector3<f64>,
    radius: f64,
    sides: usize,
    phase: f64,
) -> Vec<Point3<f64>> {
    let (u, v) = perpendicular_frame(normal);
    (0..sides)
        .map(|i| {
            let angle = phase + std::f64::consts::TAU * i as f64 / sides as f64;
            center + u * (angle.cos() * radius) + v * (angle.sin() * radius)
        })
        .collect()
}

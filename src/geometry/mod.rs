//! Planar polygon geometry for cell outlines.
//!
//! Cells live in 2 or 3 spatial dimensions, but every division computation
//! is planar: the boundary ring is projected into an orthonormal in-plane
//! basis derived from the polygon's Newell normal, processed there, and the
//! results are lifted back. Flat 2-D tissues (z = 0) and curved-surface
//! cells in 3-D go through the same code path.

use glam::{DVec2, DVec3};

/// Orthonormal in-plane coordinate frame for one cell outline.
#[derive(Debug, Clone, Copy)]
pub struct PlaneBasis {
    /// Frame origin (first ring vertex).
    pub origin: DVec3,
    /// First in-plane axis.
    pub u: DVec3,
    /// Second in-plane axis.
    pub v: DVec3,
    /// Unit normal (Newell), oriented so the projected ring is
    /// counter-clockwise.
    pub normal: DVec3,
}

impl PlaneBasis {
    /// Build the frame from an ordered boundary ring.
    ///
    /// The ring must contain at least three non-collinear points; collinear
    /// rings produce a degenerate normal and are rejected by the callers'
    /// area guards rather than here.
    pub fn from_ring(points: &[DVec3]) -> Self {
        let normal = newell_normal(points).normalize_or_zero();
        let origin = points[0];

        // Any edge not parallel to the normal seeds the first axis.
        let mut u = DVec3::ZERO;
        for w in points.windows(2) {
            let edge = w[1] - w[0];
            let in_plane = edge - normal * edge.dot(normal);
            if in_plane.length_squared() > 1e-24 {
                u = in_plane.normalize();
                break;
            }
        }
        let v = normal.cross(u);

        Self { origin, u, v, normal }
    }

    /// Project a point into in-plane coordinates.
    #[inline]
    pub fn project(&self, p: DVec3) -> DVec2 {
        let d = p - self.origin;
        DVec2::new(d.dot(self.u), d.dot(self.v))
    }

    /// Lift in-plane coordinates back into world space.
    #[inline]
    pub fn lift(&self, p: DVec2) -> DVec3 {
        self.origin + self.u * p.x + self.v * p.y
    }

    /// Project a whole ring.
    pub fn project_ring(&self, points: &[DVec3]) -> Vec<DVec2> {
        points.iter().map(|&p| self.project(p)).collect()
    }
}

/// Newell normal of a closed ring (not normalized).
///
/// n = ½ Σ (p_i − c) × (p_{i+1} − c); robust for non-convex outlines.
pub fn newell_normal(points: &[DVec3]) -> DVec3 {
    let c = points.iter().copied().sum::<DVec3>() / points.len() as f64;
    let mut n = DVec3::ZERO;
    for i in 0..points.len() {
        let a = points[i] - c;
        let b = points[(i + 1) % points.len()] - c;
        n += a.cross(b);
    }
    n * 0.5
}

/// Signed area of a planar polygon (positive for counter-clockwise rings).
pub fn signed_area(ring: &[DVec2]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

/// Area centroid of a planar polygon.
///
/// Falls back to the vertex mean for near-zero areas so degenerate rings
/// still get a finite reference point before the area guard rejects them.
pub fn centroid(ring: &[DVec2]) -> DVec2 {
    let area = signed_area(ring);
    if area.abs() < 1e-12 {
        return ring.iter().copied().sum::<DVec2>() / ring.len() as f64;
    }
    let mut c = DVec2::ZERO;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        c += (a + b) * a.perp_dot(b);
    }
    c / (6.0 * area)
}

/// Second area moment of a polygon about its centroid.
///
/// Returns (sxx, sxy, syy) with sxx = ∫x² dA, syy = ∫y² dA, sxy = ∫xy dA
/// in centroid coordinates.
pub fn second_moment(ring: &[DVec2]) -> (f64, f64, f64) {
    let area = signed_area(ring);
    let c = centroid(ring);

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.perp_dot(b);
        sxx += (a.x * a.x + a.x * b.x + b.x * b.x) * cross;
        syy += (a.y * a.y + a.y * b.y + b.y * b.y) * cross;
        sxy += (a.x * b.y + 2.0 * a.x * a.y + 2.0 * b.x * b.y + b.x * a.y) * cross;
    }
    sxx /= 12.0;
    syy /= 12.0;
    sxy /= 24.0;

    // Translate from the frame origin to the centroid.
    (
        sxx - area * c.x * c.x,
        sxy - area * c.x * c.y,
        syy - area * c.y * c.y,
    )
}

/// Eigen decomposition of a symmetric 2×2 tensor [[a, b], [b, c]].
///
/// Returns ((λ₁, v₁), (λ₂, v₂)) with |λ₁| ≥ |λ₂| and unit eigenvectors.
pub fn symmetric_eigen(a: f64, b: f64, c: f64) -> ((f64, DVec2), (f64, DVec2)) {
    let mean = 0.5 * (a + c);
    let half_diff = 0.5 * (a - c);
    let radius = (half_diff * half_diff + b * b).sqrt();
    let (lo, hi) = (mean - radius, mean + radius);

    let vector_for = |lambda: f64| -> DVec2 {
        // (A - λI)v = 0; pick the better conditioned row.
        let r1 = DVec2::new(b, lambda - a);
        let r2 = DVec2::new(lambda - c, b);
        let v = if r1.length_squared() > r2.length_squared() { r1 } else { r2 };
        if v.length_squared() < 1e-30 {
            DVec2::X
        } else {
            v.normalize()
        }
    };

    let (first, second) = if hi.abs() >= lo.abs() { (hi, lo) } else { (lo, hi) };
    ((first, vector_for(first)), (second, vector_for(second)))
}

/// Even-odd point-in-polygon test.
pub fn contains_point(ring: &[DVec2], p: DVec2) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersection of the infinite line through `p` with direction `d` and the
/// segment `a`–`b`.
///
/// Returns `(t, s)` with the crossing at `p + t·d` = `a + s·(b − a)` and
/// `s ∈ [0, 1]`; `None` for parallel or out-of-segment crossings.
pub fn line_segment_intersection(p: DVec2, d: DVec2, a: DVec2, b: DVec2) -> Option<(f64, f64)> {
    let e = b - a;
    let denom = d.perp_dot(e);
    if denom.abs() < 1e-15 {
        return None;
    }
    let ap = a - p;
    let t = ap.perp_dot(e) / denom;
    let s = ap.perp_dot(d) / denom;
    if (-1e-12..=1.0 + 1e-12).contains(&s) {
        Some((t, s.clamp(0.0, 1.0)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<DVec2> {
        vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 2.0),
            DVec2::new(0.0, 2.0),
        ]
    }

    #[test]
    fn test_square_area_and_centroid() {
        let ring = square();
        assert!((signed_area(&ring) - 4.0).abs() < 1e-12);
        let c = centroid(&ring);
        assert!((c - DVec2::new(1.0, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_clockwise_ring_has_negative_area() {
        let mut ring = square();
        ring.reverse();
        assert!((signed_area(&ring) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rectangle_second_moment() {
        // 2w × 1h rectangle centered at origin: sxx = w³h/12 = 8/12, syy = wh³/12 = 2/12.
        let ring = vec![
            DVec2::new(-1.0, -0.5),
            DVec2::new(1.0, -0.5),
            DVec2::new(1.0, 0.5),
            DVec2::new(-1.0, 0.5),
        ];
        let (sxx, sxy, syy) = second_moment(&ring);
        assert!((sxx - 8.0 / 12.0).abs() < 1e-12, "sxx = {sxx}");
        assert!((syy - 2.0 / 12.0).abs() < 1e-12, "syy = {syy}");
        assert!(sxy.abs() < 1e-12, "sxy = {sxy}");

        let ((l1, v1), (l2, _)) = symmetric_eigen(sxx, sxy, syy);
        assert!(l1 > l2);
        assert!(v1.x.abs() > 0.999, "long axis should be x, got {v1:?}");
    }

    #[test]
    fn test_second_moment_translation_invariant() {
        let ring = square();
        let shifted: Vec<DVec2> = ring.iter().map(|p| *p + DVec2::new(7.0, -3.0)).collect();
        let (a1, b1, c1) = second_moment(&ring);
        let (a2, b2, c2) = second_moment(&shifted);
        assert!((a1 - a2).abs() < 1e-9);
        assert!((b1 - b2).abs() < 1e-9);
        assert!((c1 - c2).abs() < 1e-9);
    }

    #[test]
    fn test_plane_basis_round_trip() {
        // Tilted triangle in 3-D.
        let ring = vec![
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 2.0),
            DVec3::new(0.0, 1.0, 2.0),
        ];
        let basis = PlaneBasis::from_ring(&ring);
        for &p in &ring {
            let lifted = basis.lift(basis.project(p));
            assert!((lifted - p).length() < 1e-12);
        }
        // The projected ring keeps its area (isometric projection).
        let projected = basis.project_ring(&ring);
        let expected = newell_normal(&ring).length();
        assert!((signed_area(&projected).abs() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_contains_point() {
        let ring = square();
        assert!(contains_point(&ring, DVec2::new(1.0, 1.0)));
        assert!(!contains_point(&ring, DVec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_line_segment_intersection() {
        let p = DVec2::new(1.0, 1.0);
        let d = DVec2::new(0.0, 1.0);
        let hit = line_segment_intersection(p, d, DVec2::new(0.0, 2.0), DVec2::new(2.0, 2.0));
        let (t, s) = hit.expect("vertical line should cross the top edge");
        assert!((t - 1.0).abs() < 1e-12);
        assert!((s - 0.5).abs() < 1e-12);

        let miss = line_segment_intersection(p, d, DVec2::new(3.0, 0.0), DVec2::new(3.0, 2.0));
        assert!(miss.is_none());
    }
}

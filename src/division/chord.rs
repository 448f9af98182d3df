//! Chord search engine.
//!
//! Given a cell flagged for division, this module produces the two wall
//! crossings of the division chord, either by clipping a direction line
//! against the boundary (direction-based rules) or by the shortest-path
//! search: for every pair of non-adjacent walls, the crossing on the first
//! wall is parameterized by `a ∈ [0, 1]`, the partner crossing is slaved to
//! the line through the interior reference point, and the cut position
//! satisfying the target area split is found by a bracketed 1-D root solve.
//! The accepted candidate with globally minimal chord length wins.

use glam::DVec2;
use rand::Rng;

use crate::error::GeometryError;
use crate::geometry::{self, line_segment_intersection, signed_area};

/// Number of bracketing samples per wall pair.
const SCAN_STEPS: usize = 32;
/// Bisection iteration cap for the area root solve.
const MAX_ITERATIONS: u32 = 100;
/// Relative area tolerance accepted as a root.
const AREA_TOLERANCE: f64 = 1e-9;

/// One scored division chord between two specific walls.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Chord length.
    pub distance: f64,
    /// Ring position of the first crossed wall.
    pub wall1: usize,
    /// Ring position of the second crossed wall.
    pub wall2: usize,
    /// Crossing point on `wall1` (in-plane coordinates).
    pub p: DVec2,
    /// Crossing point on `wall2` (in-plane coordinates).
    pub q: DVec2,
    /// Relative cut position along `wall1`, in ring orientation.
    pub t1: f64,
    /// Relative cut position along `wall2`, in ring orientation.
    pub t2: f64,
}

/// One boundary crossing of the chosen chord.
#[derive(Debug, Clone, Copy)]
pub struct WallCut {
    /// Ring position of the crossed wall.
    pub ring_position: usize,
    /// Relative position along the wall, in ring orientation.
    pub t: f64,
}

/// The division chord, as two wall crossings ordered by ring position.
#[derive(Debug, Clone, Copy)]
pub struct Chord {
    pub cuts: [WallCut; 2],
}

/// Fixed geometry of one wall pair during the shortest-path search.
///
/// The first daughter's outline is `[p(a), chain..., q(a)]` where `chain`
/// is the boundary run from the end of the first wall to the start of the
/// second and `q(a)` is the crossing of the line `p(a)`–reference with the
/// second wall.
struct PairGeometry {
    /// First wall endpoints, ring orientation.
    p0: DVec2,
    p1: DVec2,
    /// Second wall endpoints, ring orientation.
    q0: DVec2,
    q1: DVec2,
    /// Interior reference point the chord is routed through.
    reference: DVec2,
    /// First and last chain vertices (`p1` and `q0`).
    chain_first: DVec2,
    chain_last: DVec2,
}

impl PairGeometry {
    #[inline]
    fn point_on_first(&self, a: f64) -> DVec2 {
        self.p0.lerp(self.p1, a)
    }

    /// Partner crossing on the second wall for cut position `a`, as
    /// `(s, q)`; `None` when the line through the reference point misses
    /// the wall or runs away from it.
    fn partner(&self, a: f64) -> Option<(f64, DVec2)> {
        let p = self.point_on_first(a);
        let d = self.reference - p;
        if d.length_squared() < 1e-24 {
            return None;
        }
        let (t, s) = line_segment_intersection(p, d, self.q0, self.q1)?;
        if t <= 0.0 {
            return None;
        }
        Some((s, self.q0.lerp(self.q1, s)))
    }

    /// Area residual of the cut at position `a`.
    ///
    /// `A` is the fixed chain's polygon-area term (half its shoelace
    /// cross-sum), `B` the total cell area, `sigma` the target fraction of
    /// the first daughter. The residual is the first daughter's area minus
    /// `sigma · B`; `None` when no partner crossing exists at `a`.
    fn f(&self, a: f64, sigma: f64, big_a: f64, big_b: f64) -> Option<f64> {
        let p = self.point_on_first(a);
        let (_, q) = self.partner(a)?;
        let moving =
            p.perp_dot(self.chain_first) + self.chain_last.perp_dot(q) + q.perp_dot(p);
        Some(big_a + 0.5 * moving - sigma * big_b)
    }

    /// Cut position in `[0, 1]` satisfying the area constraint, by
    /// bracketed bisection of [`Self::f`].
    ///
    /// The residual is monotonic in the relevant geometric regime, but no
    /// closed form is assumed: the interval is sampled, every sign change
    /// is bisected, and among the admissible roots the most central cut is
    /// preferred (symmetric cells admit a whole family of exact splits).
    fn astar(&self, sigma: f64, big_a: f64, big_b: f64) -> Option<f64> {
        let tol = AREA_TOLERANCE * big_b.abs().max(f64::MIN_POSITIVE);
        let mut roots: Vec<f64> = Vec::new();
        let mut prev: Option<(f64, f64)> = None;

        for k in 0..=SCAN_STEPS {
            let a = k as f64 / SCAN_STEPS as f64;
            let Some(fa) = self.f(a, sigma, big_a, big_b) else {
                prev = None;
                continue;
            };
            if fa.abs() <= tol {
                roots.push(a);
            } else if let Some((pa, pf)) = prev {
                if pf.abs() > tol && pf * fa < 0.0 {
                    if let Some(root) = self.bisect(pa, a, pf, sigma, big_a, big_b, tol) {
                        roots.push(root);
                    }
                }
            }
            prev = Some((a, fa));
        }

        roots
            .into_iter()
            .min_by(|x, y| {
                (x - 0.5)
                    .abs()
                    .partial_cmp(&(y - 0.5).abs())
                    .expect("cut positions are finite")
            })
    }

    fn bisect(
        &self,
        mut lo: f64,
        mut hi: f64,
        mut f_lo: f64,
        sigma: f64,
        big_a: f64,
        big_b: f64,
        tol: f64,
    ) -> Option<f64> {
        let mut mid = 0.5 * (lo + hi);
        for _ in 0..MAX_ITERATIONS {
            mid = 0.5 * (lo + hi);
            let fm = self.f(mid, sigma, big_a, big_b)?;
            if fm.abs() <= tol || hi - lo < 1e-13 {
                return Some(mid);
            }
            if f_lo * fm < 0.0 {
                hi = mid;
            } else {
                lo = mid;
                f_lo = fm;
            }
        }
        Some(mid)
    }
}

/// Shortest area-splitting chord of a counter-clockwise planar ring.
///
/// `reference` is the interior point the chord is routed through; `sigma`
/// the target area fraction (0.5 bisects); `min_rel` the smallest allowed
/// relative cut distance from an existing vertex. Crossings inside the
/// guard band are clamped to it; a pair whose clamped partner leaves its
/// wall, or any pair when `2·min_rel > 1`, is discarded. `None` when no
/// pair is accepted, in which case the caller skips the division this step.
pub fn find_shortest_chord(
    ring: &[DVec2],
    reference: DVec2,
    sigma: f64,
    min_rel: f64,
) -> Option<Candidate> {
    let n = ring.len();
    if n < 4 || 2.0 * min_rel > 1.0 {
        return None;
    }
    let total = signed_area(ring);

    let mut best: Option<Candidate> = None;
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue; // adjacent across the ring seam
            }

            let mut chain_cross = 0.0;
            for k in (i + 1)..j {
                chain_cross += ring[k].perp_dot(ring[k + 1]);
            }
            let pair = PairGeometry {
                p0: ring[i],
                p1: ring[(i + 1) % n],
                q0: ring[j],
                q1: ring[(j + 1) % n],
                reference,
                chain_first: ring[i + 1],
                chain_last: ring[j],
            };
            let big_a = 0.5 * chain_cross;

            // An off-center target can be met with either daughter taking
            // the configured fraction; try both orientations.
            let targets = [sigma, 1.0 - sigma];
            let sigmas = if (sigma - 0.5).abs() < 1e-12 { &targets[..1] } else { &targets[..] };

            for &target in sigmas {
                let Some(root) = pair.astar(target, big_a, total) else {
                    continue;
                };
                let Some(candidate) = resolve_candidate(&pair, i, j, root, min_rel) else {
                    continue;
                };
                if best.is_none_or(|b| candidate.distance < b.distance) {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}

/// Apply the minimum-distance guard to a root and score the chord.
fn resolve_candidate(
    pair: &PairGeometry,
    wall1: usize,
    wall2: usize,
    root: f64,
    min_rel: f64,
) -> Option<Candidate> {
    let a = root.clamp(min_rel, 1.0 - min_rel);
    let (s, q) = pair.partner(a)?;
    let (t2, q) = if s < min_rel || s > 1.0 - min_rel {
        // Clamp the partner too; the split is then only approximate.
        let sc = s.clamp(min_rel, 1.0 - min_rel);
        (sc, pair.q0.lerp(pair.q1, sc))
    } else {
        (s, q)
    };

    let p = pair.point_on_first(a);
    let distance = (p - q).length();
    if distance <= 1e-12 {
        return None;
    }
    Some(Candidate {
        distance,
        wall1,
        wall2,
        p,
        q,
        t1: a,
        t2,
    })
}

/// Clip the line through `point` with direction `direction` against the
/// ring, returning the two nearest boundary crossings on either side as a
/// [`Chord`].
pub fn clip_direction_chord(
    ring: &[DVec2],
    point: DVec2,
    direction: DVec2,
    cell: usize,
) -> Result<Chord, GeometryError> {
    let n = ring.len();
    let extent = ring_extent(ring);
    let dedup_eps = 1e-9 * extent.max(f64::MIN_POSITIVE);

    let mut crossings: Vec<(f64, usize, f64)> = Vec::new();
    for k in 0..n {
        if let Some((t, s)) =
            line_segment_intersection(point, direction, ring[k], ring[(k + 1) % n])
        {
            crossings.push((t, k, s));
        }
    }
    crossings.sort_by(|x, y| x.0.partial_cmp(&y.0).expect("finite line parameters"));
    // A crossing exactly on a shared vertex reports once per incident wall.
    crossings.dedup_by(|a, b| (a.0 - b.0).abs() < dedup_eps);

    let forward = crossings
        .iter()
        .filter(|c| c.0 > 0.0)
        .min_by(|x, y| x.0.partial_cmp(&y.0).expect("finite line parameters"));
    let backward = crossings
        .iter()
        .filter(|c| c.0 <= 0.0)
        .max_by(|x, y| x.0.partial_cmp(&y.0).expect("finite line parameters"));

    let (&(_, k1, s1), &(_, k2, s2)) = match (backward, forward) {
        (Some(b), Some(f)) => (b, f),
        _ => {
            return Err(GeometryError::Degenerate {
                cell,
                reason: "direction line does not cross the boundary twice",
            });
        }
    };
    if k1 == k2 {
        return Err(GeometryError::Degenerate {
            cell,
            reason: "both crossings fall on the same wall",
        });
    }

    let (first, second) = if k1 < k2 { ((k1, s1), (k2, s2)) } else { ((k2, s2), (k1, s1)) };
    Ok(Chord {
        cuts: [
            WallCut { ring_position: first.0, t: first.1 },
            WallCut { ring_position: second.0, t: second.1 },
        ],
    })
}

/// Uniform random point inside the ring, by rejection sampling of the
/// bounding box; falls back to the centroid for pathological outlines.
pub fn random_interior_point<R: Rng + ?Sized>(ring: &[DVec2], rng: &mut R) -> DVec2 {
    let (min, max) = bounds(ring);
    for _ in 0..64 {
        let p = DVec2::new(
            rng.random_range(min.x..=max.x),
            rng.random_range(min.y..=max.y),
        );
        if geometry::contains_point(ring, p) {
            return p;
        }
    }
    geometry::centroid(ring)
}

fn bounds(ring: &[DVec2]) -> (DVec2, DVec2) {
    let mut min = ring[0];
    let mut max = ring[0];
    for &p in ring {
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

fn ring_extent(ring: &[DVec2]) -> f64 {
    let (min, max) = bounds(ring);
    (max - min).max_element()
}

//! Division trigger evaluators.
//!
//! Pure predicates deciding, per cell and per step, whether a division rule
//! fires. Evaluators never mutate attribute tables; the probabilistic
//! variant only consumes the passed entropy source. The step driver calls
//! each evaluator exactly once per cell per step, so decisions are stable
//! within a step.

use rand::Rng;

use crate::tissue::{Tissue, TissueAttributes};

/// Effective volume threshold as a Hill function of a concentration.
///
/// V_th(c) = v_min + (v_max − v_min) · cⁿ / (kⁿ + cⁿ)
///
/// Non-positive concentrations give a zero Hill term, i.e. the threshold
/// collapses to `v_min`.
#[inline]
pub fn hill_threshold(v_min: f64, v_max: f64, k: f64, n: f64, c: f64) -> f64 {
    if c <= 0.0 {
        return v_min;
    }
    let c_n = c.powf(n);
    let k_n = k.powf(n);
    v_min + (v_max - v_min) * c_n / (k_n + c_n)
}

/// Trigger predicate of one division rule.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Cell volume attribute above a fixed threshold.
    Volume { column: usize, threshold: f64 },
    /// Volume threshold, restricted to cells whose centroid lies within
    /// `max_distance` of the tissue's extremal coordinate along `axis`.
    VolumeSpatial {
        column: usize,
        threshold: f64,
        axis: usize,
        max_distance: f64,
    },
    /// Volume above a Hill-modulated threshold of a concentration column.
    HillVolume {
        column: usize,
        concentration_column: usize,
        v_min: f64,
        v_max: f64,
        k: f64,
        n: f64,
    },
    /// An externally written integer-valued attribute equals a sentinel.
    ExternalFlag { column: usize, sentinel: f64 },
    /// Fixed per-step probability, independent of geometry.
    Probability { p: f64 },
}

impl Trigger {
    /// Decide whether the rule fires for `cell` this step.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        tissue: &Tissue,
        cell: usize,
        attrs: &TissueAttributes,
        rng: &mut R,
    ) -> bool {
        match *self {
            Trigger::Volume { column, threshold } => attrs.cells.get(cell, column) > threshold,

            Trigger::VolumeSpatial {
                column,
                threshold,
                axis,
                max_distance,
            } => {
                if attrs.cells.get(cell, column) <= threshold {
                    return false;
                }
                let apex = tissue
                    .vertices
                    .iter()
                    .map(|v| v.position.to_array()[axis])
                    .fold(f64::NEG_INFINITY, f64::max);
                let centroid = tissue.cell_centroid(cell).to_array()[axis];
                (apex - centroid).abs() < max_distance
            }

            Trigger::HillVolume {
                column,
                concentration_column,
                v_min,
                v_max,
                k,
                n,
            } => {
                let c = attrs.cells.get(cell, concentration_column);
                attrs.cells.get(cell, column) > hill_threshold(v_min, v_max, k, n, c)
            }

            Trigger::ExternalFlag { column, sentinel } => {
                (attrs.cells.get(cell, column) - sentinel).abs() < 0.5
            }

            Trigger::Probability { p } => rng.random::<f64>() < p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::tissue::{TableLayout, TissueAttributes};

    fn fixture() -> (Tissue, TissueAttributes) {
        let tissue = Tissue::from_polygon(
            &[
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(2.0, 0.0, 0.0),
                DVec3::new(2.0, 2.0, 0.0),
                DVec3::new(0.0, 2.0, 0.0),
            ],
            2,
        );
        let mut attrs = TissueAttributes::new(TableLayout {
            cell_columns: 3,
            wall_columns: 1,
            vertex_columns: 0,
        });
        attrs.cells.append_row(vec![5.0, 1.0, 0.0]);
        for _ in 0..4 {
            attrs.walls.append_row(vec![2.0]);
        }
        (tissue, attrs)
    }

    #[test]
    fn test_hill_threshold_midpoint() {
        // v_min 2, v_max 10, k 1, n 2, c 1 → 2 + 8 · 1/(1+1) = 6.
        let th = hill_threshold(2.0, 10.0, 1.0, 2.0, 1.0);
        assert!((th - 6.0).abs() < 1e-12, "threshold = {th}");
    }

    #[test]
    fn test_hill_threshold_zero_concentration() {
        assert_eq!(hill_threshold(2.0, 10.0, 1.0, 2.0, 0.0), 2.0);
        assert_eq!(hill_threshold(2.0, 10.0, 1.0, 2.0, -3.0), 2.0);
    }

    #[test]
    fn test_volume_trigger() {
        let (tissue, attrs) = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        let fires = Trigger::Volume { column: 0, threshold: 4.0 };
        let holds = Trigger::Volume { column: 0, threshold: 5.0 };
        assert!(fires.evaluate(&tissue, 0, &attrs, &mut rng));
        assert!(!holds.evaluate(&tissue, 0, &attrs, &mut rng));
    }

    #[test]
    fn test_hill_volume_trigger_scenario() {
        let (tissue, mut attrs) = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        let trigger = Trigger::HillVolume {
            column: 0,
            concentration_column: 1,
            v_min: 2.0,
            v_max: 10.0,
            k: 1.0,
            n: 2.0,
        };
        // Threshold is 6 at c = 1: volume 5.9 must not fire, 6.1 must.
        attrs.cells.set(0, 0, 5.9);
        assert!(!trigger.evaluate(&tissue, 0, &attrs, &mut rng));
        attrs.cells.set(0, 0, 6.1);
        assert!(trigger.evaluate(&tissue, 0, &attrs, &mut rng));
    }

    #[test]
    fn test_spatial_trigger() {
        let (tissue, attrs) = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        // Apex along y is 2, centroid y is 1.
        let near = Trigger::VolumeSpatial {
            column: 0,
            threshold: 4.0,
            axis: 1,
            max_distance: 1.5,
        };
        let far = Trigger::VolumeSpatial {
            column: 0,
            threshold: 4.0,
            axis: 1,
            max_distance: 0.5,
        };
        assert!(near.evaluate(&tissue, 0, &attrs, &mut rng));
        assert!(!far.evaluate(&tissue, 0, &attrs, &mut rng));
    }

    #[test]
    fn test_flag_trigger() {
        let (tissue, mut attrs) = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        let trigger = Trigger::ExternalFlag { column: 2, sentinel: 1.0 };
        assert!(!trigger.evaluate(&tissue, 0, &attrs, &mut rng));
        attrs.cells.set(0, 2, 1.0);
        assert!(trigger.evaluate(&tissue, 0, &attrs, &mut rng));
    }

    #[test]
    fn test_probability_trigger_extremes() {
        let (tissue, attrs) = fixture();
        let mut rng = StdRng::seed_from_u64(42);
        let never = Trigger::Probability { p: 0.0 };
        let always = Trigger::Probability { p: 1.0 };
        for _ in 0..32 {
            assert!(!never.evaluate(&tissue, 0, &attrs, &mut rng));
            assert!(always.evaluate(&tissue, 0, &attrs, &mut rng));
        }
    }
}

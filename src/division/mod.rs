//! Cell division rules.
//!
//! Every rule is the composition of a trigger predicate (when to divide), a
//! placement (where the new wall goes) and an attribute-update plan (what
//! happens to the tables). Variants are selected by configuration, and the
//! topology edit is a single shared routine ([`executor::divide_cell`])
//! parameterized by the chosen chord.

pub mod chord;
pub mod executor;
pub mod trigger;

pub use chord::{Candidate, Chord, WallCut};
pub use executor::{CenterColumns, DivisionOutcome, UpdateConfig};
pub use trigger::{Trigger, hill_threshold};

use glam::DVec2;
use rand::Rng;

use crate::config::{DivisionParameters, RuleKind, RuleSpec};
use crate::error::{ConfigError, GeometryError};
use crate::geometry::{self, PlaneBasis};
use crate::tissue::{TableLayout, Tissue, TissueAttributes};

/// Target area fraction of the first daughter.
#[derive(Debug, Clone, Copy)]
pub enum TargetRatio {
    Fixed(f64),
    /// Sizer/timer/adder style: the fraction drifts with time since the
    /// last division, clamped to `[min, max]`.
    TimeModulated {
        column: usize,
        slope: f64,
        min: f64,
        max: f64,
    },
}

impl TargetRatio {
    fn value(&self, cell: usize, attrs: &TissueAttributes) -> f64 {
        match *self {
            TargetRatio::Fixed(sigma) => sigma,
            TargetRatio::TimeModulated { column, slope, min, max } => {
                (0.5 + slope * attrs.cells.get(cell, column)).clamp(min, max)
            }
        }
    }
}

/// Where the division wall goes once a rule fires.
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    /// Perpendicular to the longest wall, through the reference point.
    LongestWall,
    /// Parallel to the shortest wall, through the reference point.
    ShortestWall,
    /// Along the extremal eigenvector of the second-moment tensor.
    MainAxis,
    /// Perpendicular to the direction of maximal wall stretch.
    Strain,
    /// Perpendicular to a direction stored in the cell's attribute row.
    StoredDirection { start_column: usize },
    /// Uniformly random in-plane direction.
    RandomDirection,
    /// Globally shortest area-splitting chord.
    ShortestPath {
        through_centroid: bool,
        ratio: TargetRatio,
    },
}

/// One configured division rule.
#[derive(Debug, Clone)]
pub struct DivisionRule {
    pub kind: RuleKind,
    pub trigger: Trigger,
    pub placement: Placement,
    pub update: UpdateConfig,
}

/// Record of one committed division.
#[derive(Debug, Clone, Copy)]
pub struct DivisionEvent {
    /// Cell index reused by the first daughter.
    pub parent: usize,
    /// Newly created cell.
    pub daughter: usize,
    /// Rule that fired.
    pub kind: RuleKind,
}

impl DivisionRule {
    /// Decide whether this rule fires for `cell` this step.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        tissue: &Tissue,
        cell: usize,
        attrs: &TissueAttributes,
        rng: &mut R,
    ) -> bool {
        self.trigger.evaluate(tissue, cell, attrs, rng)
    }

    /// Compute the division chord for a cell this rule fired on.
    pub fn geometry<R: Rng + ?Sized>(
        &self,
        tissue: &Tissue,
        cell: usize,
        attrs: &TissueAttributes,
        rng: &mut R,
    ) -> Result<Chord, GeometryError> {
        let outline = tissue.cell_outline(cell);
        if outline.len() < 3 {
            return Err(GeometryError::Degenerate { cell, reason: "ring has fewer than 3 walls" });
        }
        let basis = PlaneBasis::from_ring(&outline);
        let ring2 = basis.project_ring(&outline);

        let reference = self.reference_point(cell, attrs, &basis, &ring2);

        match self.placement {
            Placement::ShortestPath { through_centroid, ratio } => {
                let point = if self.update.center.is_some() {
                    reference
                } else if through_centroid {
                    geometry::centroid(&ring2)
                } else {
                    chord::random_interior_point(&ring2, rng)
                };
                let sigma = ratio.value(cell, attrs);
                let best = chord::find_shortest_chord(
                    &ring2,
                    point,
                    sigma,
                    self.update.min_relative_distance,
                )
                .ok_or(GeometryError::NoCandidate { cell })?;
                Ok(Chord {
                    cuts: [
                        WallCut { ring_position: best.wall1, t: best.t1 },
                        WallCut { ring_position: best.wall2, t: best.t2 },
                    ],
                })
            }
            _ => {
                let direction = self.direction(tissue, cell, attrs, &basis, &ring2, rng)?;
                chord::clip_direction_chord(&ring2, reference, direction, cell)
            }
        }
    }

    /// Interior point the chord is routed through: the stored center when
    /// configured, otherwise the area centroid.
    fn reference_point(
        &self,
        cell: usize,
        attrs: &TissueAttributes,
        basis: &PlaneBasis,
        ring2: &[DVec2],
    ) -> DVec2 {
        if let Some(center) = self.update.center {
            let mut coords = [0.0; 3];
            for (d, coord) in coords.iter_mut().enumerate().take(3) {
                if center.start + d < attrs.cells.columns() {
                    *coord = attrs.cells.get(cell, center.start + d);
                }
            }
            basis.project(glam::DVec3::from_array(coords))
        } else {
            geometry::centroid(ring2)
        }
    }

    /// Division direction for the direction-based placements.
    fn direction<R: Rng + ?Sized>(
        &self,
        tissue: &Tissue,
        cell: usize,
        attrs: &TissueAttributes,
        basis: &PlaneBasis,
        ring2: &[DVec2],
        rng: &mut R,
    ) -> Result<DVec2, GeometryError> {
        let n = ring2.len();
        let edge = |k: usize| ring2[(k + 1) % n] - ring2[k];

        match self.placement {
            Placement::LongestWall => {
                let mut best = 0;
                for k in 1..n {
                    if edge(k).length_squared() > edge(best).length_squared() {
                        best = k;
                    }
                }
                Ok(edge(best).normalize().perp())
            }
            Placement::ShortestWall => {
                let mut best = 0;
                for k in 1..n {
                    if edge(k).length_squared() < edge(best).length_squared() {
                        best = k;
                    }
                }
                Ok(edge(best).normalize())
            }
            Placement::MainAxis => {
                let (sxx, sxy, syy) = geometry::second_moment(ring2);
                let ((_, axis), _) = geometry::symmetric_eigen(sxx, sxy, syy);
                Ok(axis)
            }
            Placement::Strain => {
                // Elastic stretch tensor from current vs resting lengths.
                let rest_col = self.update.wall_resting_length_column;
                let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
                for (k, &wall) in tissue.cells[cell].walls.iter().enumerate() {
                    let rest = attrs.walls.get(wall, rest_col);
                    if rest <= 1e-12 {
                        continue;
                    }
                    let e = edge(k);
                    let len = e.length();
                    if len <= 1e-12 {
                        continue;
                    }
                    let stretch = (len - rest) / rest;
                    let d = e / len;
                    a += stretch * d.x * d.x;
                    b += stretch * d.x * d.y;
                    c += stretch * d.y * d.y;
                }
                if a.abs() + b.abs() + c.abs() < 1e-12 {
                    // Unstrained cell: fall back to the main axis.
                    let (sxx, sxy, syy) = geometry::second_moment(ring2);
                    let ((_, axis), _) = geometry::symmetric_eigen(sxx, sxy, syy);
                    return Ok(axis);
                }
                let ((l1, v1), (l2, v2)) = geometry::symmetric_eigen(a, b, c);
                let max_stretch = if l1 >= l2 { v1 } else { v2 };
                Ok(max_stretch.perp())
            }
            Placement::StoredDirection { start_column } => {
                let mut coords = [0.0; 3];
                for (d, coord) in coords.iter_mut().enumerate().take(tissue.dimension) {
                    *coord = attrs.cells.get(cell, start_column + d);
                }
                let world = glam::DVec3::from_array(coords);
                let in_plane = DVec2::new(world.dot(basis.u), world.dot(basis.v));
                if in_plane.length_squared() < 1e-24 {
                    return Err(GeometryError::Degenerate {
                        cell,
                        reason: "stored direction is undefined",
                    });
                }
                Ok(in_plane.normalize().perp())
            }
            Placement::RandomDirection => {
                let angle = rng.random_range(0.0..std::f64::consts::PI);
                Ok(DVec2::new(angle.cos(), angle.sin()))
            }
            Placement::ShortestPath { .. } => unreachable!("handled by the caller"),
        }
    }

    /// Build a rule from its specification, validating parameter counts,
    /// index-group counts and column ranges against the table layout.
    pub fn from_spec(
        spec: &RuleSpec,
        layout: &TableLayout,
        wall_resting_length_column: usize,
    ) -> Result<Self, ConfigError> {
        Builder {
            spec,
            layout,
            rule: spec.kind.name(),
            wall_resting_length_column,
        }
        .build()
    }
}

/// Validating constructor for one rule spec.
struct Builder<'a> {
    spec: &'a RuleSpec,
    layout: &'a TableLayout,
    rule: &'static str,
    wall_resting_length_column: usize,
}

impl Builder<'_> {
    fn build(self) -> Result<DivisionRule, ConfigError> {
        let kind = self.spec.kind;
        match kind {
            RuleKind::VolumeLongestWall
            | RuleKind::VolumeShortestWall
            | RuleKind::VolumeMainAxis
            | RuleKind::VolumeStrain
            | RuleKind::VolumeRandomDirection => {
                let p = self.params(3)?;
                self.groups(1, 2)?;
                let update = self.update_config(p[1], p[2], Some(1), None)?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::Volume {
                        column: self.volume_column()?,
                        threshold: p[0],
                    },
                    placement: match kind {
                        RuleKind::VolumeLongestWall => Placement::LongestWall,
                        RuleKind::VolumeShortestWall => Placement::ShortestWall,
                        RuleKind::VolumeMainAxis => Placement::MainAxis,
                        RuleKind::VolumeStrain => Placement::Strain,
                        _ => Placement::RandomDirection,
                    },
                    update,
                })
            }

            RuleKind::VolumeStoredDirection => {
                let p = self.params(3)?;
                self.groups(2, 3)?;
                let start = self.single_index(1, "direction")?;
                self.cell_column(start)?;
                self.cell_column(start + 1)?;
                let update = self.update_config(p[1], p[2], Some(2), None)?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::Volume {
                        column: self.volume_column()?,
                        threshold: p[0],
                    },
                    placement: Placement::StoredDirection { start_column: start },
                    update,
                })
            }

            RuleKind::VolumeSpatialLongestWall => {
                let p = self.params(5)?;
                self.groups(1, 2)?;
                let axis = p[1];
                if axis < 0.0 || axis > 2.0 || axis.fract() != 0.0 {
                    return Err(ConfigError::ParameterRange {
                        rule: self.rule,
                        name: "axis",
                        value: axis,
                        reason: "must be 0, 1 or 2",
                    });
                }
                let update = self.update_config(p[3], p[4], Some(1), None)?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::VolumeSpatial {
                        column: self.volume_column()?,
                        threshold: p[0],
                        axis: axis as usize,
                        max_distance: p[2],
                    },
                    placement: Placement::LongestWall,
                    update,
                })
            }

            RuleKind::HillRandomDirection => {
                let p = self.params(6)?;
                self.groups(2, 3)?;
                let concentration = self.single_index(1, "concentration")?;
                self.cell_column(concentration)?;
                let update = self.update_config(p[4], p[5], Some(2), None)?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::HillVolume {
                        column: self.volume_column()?,
                        concentration_column: concentration,
                        v_min: p[0],
                        v_max: p[1],
                        k: p[2],
                        n: p[3],
                    },
                    placement: Placement::RandomDirection,
                    update,
                })
            }

            RuleKind::ShortestPath => {
                let p = self.params(4)?;
                self.groups(1, 3)?;
                let through_centroid = self.flag("center", p[3])?;
                let update = self.update_config(p[1], p[2], Some(1), Some(2))?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::Volume {
                        column: self.volume_column()?,
                        threshold: p[0],
                    },
                    placement: Placement::ShortestPath {
                        through_centroid,
                        ratio: TargetRatio::Fixed(0.5),
                    },
                    update,
                })
            }

            RuleKind::HillShortestPath => {
                let p = self.params(7)?;
                self.groups(2, 4)?;
                let concentration = self.single_index(1, "concentration")?;
                self.cell_column(concentration)?;
                let through_centroid = self.flag("center", p[6])?;
                let update = self.update_config(p[4], p[5], Some(2), Some(3))?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::HillVolume {
                        column: self.volume_column()?,
                        concentration_column: concentration,
                        v_min: p[0],
                        v_max: p[1],
                        k: p[2],
                        n: p[3],
                    },
                    placement: Placement::ShortestPath {
                        through_centroid,
                        ratio: TargetRatio::Fixed(0.5),
                    },
                    update,
                })
            }

            RuleKind::StaShortestPath => {
                let p = self.params(7)?;
                self.groups(2, 3)?;
                let time = self.single_index(1, "time")?;
                self.cell_column(time)?;
                let through_centroid = self.flag("center", p[3])?;
                let (min, max) = (p[5], p[6]);
                if !(0.0 < min && min <= max && max < 1.0) {
                    return Err(ConfigError::ParameterRange {
                        rule: self.rule,
                        name: "ratio bounds",
                        value: min,
                        reason: "need 0 < min <= max < 1",
                    });
                }
                let update = self.update_config(p[1], p[2], Some(1), Some(2))?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::Volume {
                        column: self.volume_column()?,
                        threshold: p[0],
                    },
                    placement: Placement::ShortestPath {
                        through_centroid,
                        ratio: TargetRatio::TimeModulated {
                            column: time,
                            slope: p[4],
                            min,
                            max,
                        },
                    },
                    update,
                })
            }

            RuleKind::FlagShortestPath => {
                let p = self.params(4)?;
                self.groups(2, 4)?;
                let flag = self.single_index(1, "flag")?;
                self.cell_column(flag)?;
                let through_centroid = self.flag("center", p[3])?;
                let mut update = self.update_config(p[1], p[2], Some(2), Some(3))?;
                update.flag_reset = Some(flag);
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::ExternalFlag { column: flag, sentinel: p[0] },
                    placement: Placement::ShortestPath {
                        through_centroid,
                        ratio: TargetRatio::Fixed(0.5),
                    },
                    update,
                })
            }

            RuleKind::Random => {
                let p = self.params(3)?;
                self.groups(1, 2)?;
                if !(0.0..=1.0).contains(&p[0]) {
                    return Err(ConfigError::ParameterRange {
                        rule: self.rule,
                        name: "probability",
                        value: p[0],
                        reason: "must lie in [0, 1]",
                    });
                }
                let update = self.update_config(p[1], p[2], Some(1), None)?;
                Ok(DivisionRule {
                    kind,
                    trigger: Trigger::Probability { p: p[0] },
                    placement: Placement::RandomDirection,
                    update,
                })
            }
        }
    }

    fn params(&self, expected: usize) -> Result<&[f64], ConfigError> {
        if self.spec.parameters.len() != expected {
            return Err(ConfigError::ParameterCount {
                rule: self.rule,
                expected,
                got: self.spec.parameters.len(),
            });
        }
        Ok(&self.spec.parameters)
    }

    fn groups(&self, min: usize, max: usize) -> Result<(), ConfigError> {
        let got = self.spec.indices.len();
        if got < min || got > max {
            return Err(ConfigError::IndexGroupCount { rule: self.rule, min, max, got });
        }
        Ok(())
    }

    fn single_index(&self, group: usize, name: &'static str) -> Result<usize, ConfigError> {
        let g = &self.spec.indices[group];
        if g.len() != 1 {
            return Err(ConfigError::IndexGroupLen {
                rule: self.rule,
                group: name,
                expected: 1,
                got: g.len(),
            });
        }
        Ok(g[0])
    }

    fn cell_column(&self, index: usize) -> Result<(), ConfigError> {
        if index >= self.layout.cell_columns {
            return Err(ConfigError::ColumnOutOfRange {
                rule: self.rule,
                table: "cell",
                index,
                columns: self.layout.cell_columns,
            });
        }
        Ok(())
    }

    fn flag(&self, name: &'static str, value: f64) -> Result<bool, ConfigError> {
        if value == 0.0 {
            Ok(false)
        } else if value == 1.0 {
            Ok(true)
        } else {
            Err(ConfigError::InvalidFlag { rule: self.rule, name, value })
        }
    }

    /// First extensive column doubles as the volume attribute.
    fn volume_column(&self) -> Result<usize, ConfigError> {
        self.spec.indices[0].first().copied().ok_or(ConfigError::IndexGroupLen {
            rule: self.rule,
            group: "extensive",
            expected: 1,
            got: 0,
        })
    }

    /// Assemble the shared update plan. `time_group`/`center_group` give
    /// the positional index-group slots carrying the optional time column
    /// and center columns.
    fn update_config(
        &self,
        wall_length_fraction: f64,
        min_relative_distance: f64,
        time_group: Option<usize>,
        center_group: Option<usize>,
    ) -> Result<UpdateConfig, ConfigError> {
        if wall_length_fraction <= 0.0 {
            return Err(ConfigError::ParameterRange {
                rule: self.rule,
                name: "wall length fraction",
                value: wall_length_fraction,
                reason: "must be positive",
            });
        }
        // Values at 0.5 or above reject every wall pair at run time; that
        // is still a legal (if useless) guard, while values outside (0, 1)
        // are nonsense.
        if min_relative_distance <= 0.0 || min_relative_distance >= 1.0 {
            return Err(ConfigError::ParameterRange {
                rule: self.rule,
                name: "minimum relative distance",
                value: min_relative_distance,
                reason: "must lie in (0, 1)",
            });
        }

        let extensive = self.spec.indices[0].clone();
        for &col in &extensive {
            self.cell_column(col)?;
        }

        let time = match time_group {
            Some(g) if g < self.spec.indices.len() => {
                let col = self.single_index(g, "time")?;
                self.cell_column(col)?;
                Some(col)
            }
            _ => None,
        };

        let center = match center_group {
            Some(g) if g < self.spec.indices.len() => {
                let group = &self.spec.indices[g];
                if group.len() != 2 {
                    return Err(ConfigError::IndexGroupLen {
                        rule: self.rule,
                        group: "center",
                        expected: 2,
                        got: group.len(),
                    });
                }
                let (start, resting_length) = (group[0], group[1]);
                self.cell_column(start)?;
                self.cell_column(start + 1)?;
                self.cell_column(resting_length)?;
                Some(CenterColumns { start, resting_length })
            }
            _ => None,
        };

        Ok(UpdateConfig {
            extensive,
            time,
            center,
            flag_reset: None,
            wall_resting_length_column: self.wall_resting_length_column,
            wall_length_fraction,
            min_relative_distance,
        })
    }
}

/// Build all rules from the division parameters, validating everything
/// before the simulation starts.
pub fn build_rules(params: &DivisionParameters) -> Result<Vec<DivisionRule>, ConfigError> {
    if params.wall_resting_length_column >= params.layout.wall_columns {
        return Err(ConfigError::ColumnOutOfRange {
            rule: "division",
            table: "wall",
            index: params.wall_resting_length_column,
            columns: params.layout.wall_columns,
        });
    }
    params
        .rules
        .iter()
        .map(|spec| DivisionRule::from_spec(spec, &params.layout, params.wall_resting_length_column))
        .collect()
}

/// Run one division pass over the tissue.
///
/// The live cell list is snapshotted first: cells created during the pass
/// are not revisited until the next step. Each cell is handled by the first
/// rule whose trigger fires; a recoverable geometry failure defers that
/// cell to the next step.
pub fn division_step<R: Rng + ?Sized>(
    tissue: &mut Tissue,
    attrs: &mut TissueAttributes,
    rules: &[DivisionRule],
    rng: &mut R,
) -> Vec<DivisionEvent> {
    let snapshot = tissue.cells.len();
    let mut events = Vec::new();

    for cell in 0..snapshot {
        for rule in rules {
            if !rule.evaluate(tissue, cell, attrs, rng) {
                continue;
            }
            let committed = rule
                .geometry(tissue, cell, attrs, rng)
                .and_then(|c| executor::divide_cell(tissue, attrs, cell, &c, &rule.update));
            match committed {
                Ok(outcome) => events.push(DivisionEvent {
                    parent: outcome.parent,
                    daughter: outcome.daughter,
                    kind: rule.kind,
                }),
                Err(e) => log::debug!("division of cell {cell} deferred: {e}"),
            }
            break;
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TableLayout {
        TableLayout { cell_columns: 4, wall_columns: 1, vertex_columns: 0 }
    }

    fn spec(kind: RuleKind, parameters: Vec<f64>, indices: Vec<Vec<usize>>) -> RuleSpec {
        RuleSpec { kind, parameters, indices }
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let s = spec(RuleKind::ShortestPath, vec![2.0, 1.0, 0.05], vec![vec![0]]);
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::ParameterCount { expected: 4, got: 3, .. }));
    }

    #[test]
    fn test_index_group_count_mismatch() {
        let s = spec(RuleKind::ShortestPath, vec![2.0, 1.0, 0.05, 1.0], vec![]);
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::IndexGroupCount { min: 1, .. }));
    }

    #[test]
    fn test_column_out_of_range() {
        let s = spec(RuleKind::ShortestPath, vec![2.0, 1.0, 0.05, 1.0], vec![vec![9]]);
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::ColumnOutOfRange { index: 9, .. }));
    }

    #[test]
    fn test_invalid_center_flag() {
        let s = spec(RuleKind::ShortestPath, vec![2.0, 1.0, 0.05, 2.0], vec![vec![0]]);
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }

    #[test]
    fn test_probability_out_of_range() {
        let s = spec(RuleKind::Random, vec![1.5, 1.0, 0.05], vec![vec![0]]);
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::ParameterRange { name: "probability", .. }));
    }

    #[test]
    fn test_valid_shortest_path_with_time_and_center() {
        let s = spec(
            RuleKind::ShortestPath,
            vec![2.0, 1.0, 0.05, 1.0],
            vec![vec![0], vec![2], vec![1, 3]],
        );
        let rule = DivisionRule::from_spec(&s, &layout(), 0).expect("spec is valid");
        assert_eq!(rule.update.time, Some(2));
        let center = rule.update.center.expect("center configured");
        assert_eq!(center.start, 1);
        assert_eq!(center.resting_length, 3);
    }

    #[test]
    fn test_build_rules_checks_wall_column() {
        let mut params = DivisionParameters::default();
        params.wall_resting_length_column = 5;
        let err = build_rules(&params).unwrap_err();
        assert!(matches!(err, ConfigError::ColumnOutOfRange { table: "wall", .. }));
    }

    #[test]
    fn test_sta_ratio_bounds_validated() {
        let s = spec(
            RuleKind::StaShortestPath,
            vec![2.0, 1.0, 0.05, 1.0, 0.1, 0.9, 0.2],
            vec![vec![0], vec![2]],
        );
        let err = DivisionRule::from_spec(&s, &layout(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::ParameterRange { .. }));
    }
}

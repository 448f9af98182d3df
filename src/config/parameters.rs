//! Division model parameters.
//!
//! A division rule is configured the way the surrounding simulator's model
//! files describe reactions: a rule kind, a flat sequence of numeric
//! parameters, and a grouped sequence of attribute-column-index lists.
//! Counts and column ranges are validated when rules are built (see
//! [`crate::division::build_rules`]); mismatches are fatal before the
//! simulation starts.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::tissue::TableLayout;

/// Top-level parameters container for the division subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionParameters {
    /// Column counts of the cell/wall/vertex attribute tables.
    pub layout: TableLayout,
    /// Wall-table column holding the resting length.
    pub wall_resting_length_column: usize,
    /// Division rules, applied in order; the first rule whose trigger fires
    /// for a cell performs the division.
    pub rules: Vec<RuleSpec>,
}

impl DivisionParameters {
    /// Load parameters from a JSON file, or use defaults if the file is
    /// missing or malformed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(params) => {
                    log::info!("Loaded division parameters from {:?}", path.as_ref());
                    params
                }
                Err(e) => {
                    log::warn!("Failed to parse division parameters: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Division parameters file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a specific directory (`division.json`).
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::load_or_default(dir.as_ref().join("division.json"))
    }
}

impl Default for DivisionParameters {
    fn default() -> Self {
        Self {
            // Cell columns: volume, one concentration, time since division,
            // external flag. One wall column for the resting length.
            layout: TableLayout {
                cell_columns: 4,
                wall_columns: 1,
                vertex_columns: 0,
            },
            wall_resting_length_column: 0,
            rules: vec![RuleSpec {
                kind: RuleKind::ShortestPath,
                // volume threshold, new-wall length fraction,
                // minimum relative cut distance, through-centroid flag
                parameters: vec![2.0, 1.0, 0.05, 1.0],
                indices: vec![vec![0]],
            }],
        }
    }
}

/// The rule variants understood by the division core.
///
/// Most variants differ only in trigger predicate or direction computation;
/// all of them share the same topology-edit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Volume threshold; new wall perpendicular to the longest wall.
    VolumeLongestWall,
    /// Volume threshold; new wall parallel to the shortest wall.
    VolumeShortestWall,
    /// Volume threshold; new wall along the polygon's main axis.
    VolumeMainAxis,
    /// Volume threshold; new wall perpendicular to maximal wall stretch.
    VolumeStrain,
    /// Volume threshold; new wall perpendicular to a cell-stored direction.
    VolumeStoredDirection,
    /// Volume threshold; new wall in a uniformly random direction.
    VolumeRandomDirection,
    /// Volume threshold restricted to cells near the tissue apex.
    VolumeSpatialLongestWall,
    /// Hill-modulated volume threshold; random direction.
    HillRandomDirection,
    /// Volume threshold; shortest area-splitting chord.
    ShortestPath,
    /// Hill-modulated volume threshold; shortest area-splitting chord.
    HillShortestPath,
    /// Volume threshold with a time-modulated target area ratio.
    StaShortestPath,
    /// External flag trigger; shortest chord; flag reset on both daughters.
    FlagShortestPath,
    /// Pure per-step division probability; random direction.
    Random,
}

impl RuleKind {
    /// Stable name used in error reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::VolumeLongestWall => "volume-longest-wall",
            RuleKind::VolumeShortestWall => "volume-shortest-wall",
            RuleKind::VolumeMainAxis => "volume-main-axis",
            RuleKind::VolumeStrain => "volume-strain",
            RuleKind::VolumeStoredDirection => "volume-stored-direction",
            RuleKind::VolumeRandomDirection => "volume-random-direction",
            RuleKind::VolumeSpatialLongestWall => "volume-spatial-longest-wall",
            RuleKind::HillRandomDirection => "hill-random-direction",
            RuleKind::ShortestPath => "shortest-path",
            RuleKind::HillShortestPath => "hill-shortest-path",
            RuleKind::StaShortestPath => "sta-shortest-path",
            RuleKind::FlagShortestPath => "flag-shortest-path",
            RuleKind::Random => "random",
        }
    }
}

/// One configured division rule: kind, flat parameters, grouped column
/// indices.
///
/// Parameter layouts (validated at construction):
///
/// | kind | parameters | index groups |
/// |---|---|---|
/// | volume-longest-wall, volume-shortest-wall, volume-main-axis, volume-strain, volume-random-direction | `[v_th, wall_frac, min_rel]` | `[extensive]` (+ `[time]`) |
/// | volume-stored-direction | `[v_th, wall_frac, min_rel]` | `[extensive], [direction_start]` (+ `[time]`) |
/// | volume-spatial-longest-wall | `[v_th, axis, max_dist, wall_frac, min_rel]` | `[extensive]` (+ `[time]`) |
/// | hill-random-direction | `[v_min, v_max, k, n, wall_frac, min_rel]` | `[extensive], [concentration]` (+ `[time]`) |
/// | shortest-path | `[v_th, wall_frac, min_rel, center_flag]` | `[extensive]` (+ `[time]`) (+ `[center_start, rest_col]`) |
/// | hill-shortest-path | `[v_min, v_max, k, n, wall_frac, min_rel, center_flag]` | `[extensive], [concentration]` (+ `[time]`) (+ `[center_start, rest_col]`) |
/// | sta-shortest-path | `[v_th, wall_frac, min_rel, center_flag, ratio_slope, ratio_min, ratio_max]` | `[extensive], [time]` (+ `[center_start, rest_col]`) |
/// | flag-shortest-path | `[sentinel, wall_frac, min_rel, center_flag]` | `[extensive], [flag]` (+ `[time]`) (+ `[center_start, rest_col]`) |
/// | random | `[p, wall_frac, min_rel]` | `[extensive]` (+ `[time]`) |
///
/// `extensive` lists the cell columns partitioned by daughter area (volume
/// first, then molecule counts); all other columns are copied to both
/// daughters unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub kind: RuleKind,
    pub parameters: Vec<f64>,
    pub indices: Vec<Vec<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = DivisionParameters::default();
        assert_eq!(params.layout.cell_columns, 4);
        assert_eq!(params.rules.len(), 1);
        assert_eq!(params.rules[0].kind, RuleKind::ShortestPath);
    }

    #[test]
    fn test_serialization_round_trip() {
        let params = DivisionParameters::default();
        let json = serde_json::to_string_pretty(&params).unwrap();
        let parsed: DivisionParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules[0].kind, params.rules[0].kind);
        assert_eq!(parsed.rules[0].parameters, params.rules[0].parameters);
    }

    #[test]
    fn test_rule_kind_kebab_case() {
        let json = serde_json::to_string(&RuleKind::ShortestPath).unwrap();
        assert_eq!(json, "\"shortest-path\"");
        let parsed: RuleKind = serde_json::from_str("\"hill-shortest-path\"").unwrap();
        assert_eq!(parsed, RuleKind::HillShortestPath);
    }
}

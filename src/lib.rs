//! Tissue Sim - vertex-based tissue growth simulation engine, division core
//!
//! This library decides when a polygonal cell divides and computes the
//! geometry and topology of the resulting split:
//! - trigger evaluators (volume, Hill-modulated, spatial, flag, random)
//! - the chord search engine (shortest area-splitting chord, direction rules)
//! - the division executor (topology edit + attribute redistribution)
//!
//! Force integration, reaction kinetics, mesh file I/O and model-text
//! parsing are external collaborators and live outside this crate.

pub mod config;
pub mod division;
pub mod error;
pub mod geometry;
pub mod tissue;

pub use config::{DivisionParameters, RuleKind, RuleSpec};
pub use division::{
    Candidate, CenterColumns, Chord, DivisionEvent, DivisionOutcome, DivisionRule, Placement,
    TargetRatio, Trigger, UpdateConfig, WallCut, build_rules, division_step, hill_threshold,
};
pub use error::{ConfigError, GeometryError};
pub use tissue::{AttributeTable, TableLayout, Tissue, TissueAttributes};

//! Division executor: the topology edit and attribute redistribution.
//!
//! Validation happens strictly before mutation: a degenerate chord leaves
//! the mesh and the tables untouched and reports a recoverable geometry
//! error. After a successful commit the parent cell index holds the first
//! daughter, a new cell holds the second, every wall crossed by the chord
//! is split (patching neighbor rings), and one new division wall joins the
//! two cut vertices.

use glam::DVec2;

use crate::error::GeometryError;
use crate::geometry::{self, PlaneBasis};
use crate::tissue::{Tissue, TissueAttributes};

use super::chord::Chord;

/// Relative daughter-area floor below which a split is degenerate.
const AREA_EPSILON: f64 = 1e-9;

/// Cell attribute columns recomputed for center-triangulated cells.
#[derive(Debug, Clone, Copy)]
pub struct CenterColumns {
    /// First of `dimension` columns holding the interior center point.
    pub start: usize,
    /// Column holding the center-to-boundary resting length.
    pub resting_length: usize,
}

/// Attribute-update plan for one division rule.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Cell columns partitioned in proportion to daughter areas (volume
    /// first, then molecule counts); every other column is copied.
    pub extensive: Vec<usize>,
    /// Time-since-division column, reset to zero on both daughters.
    pub time: Option<usize>,
    /// Center-triangulation columns, recomputed from new geometry.
    pub center: Option<CenterColumns>,
    /// Flag column zeroed on both daughters after a flag-triggered split.
    pub flag_reset: Option<usize>,
    /// Wall-table column holding the resting length.
    pub wall_resting_length_column: usize,
    /// Resting length of new and split walls, relative to their euclidean
    /// length (1.0 reproduces the distance between the vertices).
    pub wall_length_fraction: f64,
    /// Smallest allowed relative cut distance from an existing vertex; a
    /// crossing closer than this to a wall endpoint reuses that vertex.
    pub min_relative_distance: f64,
}

/// Result of one committed division.
#[derive(Debug, Clone, Copy)]
pub struct DivisionOutcome {
    /// Cell index reused by the first daughter.
    pub parent: usize,
    /// Newly created second daughter.
    pub daughter: usize,
    /// The new wall separating the daughters.
    pub division_wall: usize,
    /// Daughter areas (first, second) after the split.
    pub areas: (f64, f64),
}

/// How one chord crossing maps onto the mesh.
#[derive(Debug, Clone, Copy)]
enum CutSite {
    /// Split the wall with this id at `local_t` (storage orientation); the
    /// cut sits at ring position `ring_position`, parameter `ring_t` in
    /// ring orientation.
    Split {
        wall: usize,
        local_t: f64,
        ring_position: usize,
        ring_t: f64,
    },
    /// The crossing coincides with an existing ring vertex.
    Reuse { vertex: usize, ring_position: usize },
}

impl CutSite {
    fn ring_position(&self) -> usize {
        match *self {
            CutSite::Split { ring_position, .. } => ring_position,
            CutSite::Reuse { ring_position, .. } => ring_position,
        }
    }

    /// First ring index strictly after the cut, walking forward.
    fn upper_start(&self, n: usize) -> usize {
        (self.ring_position() + 1) % n
    }

    /// Last ring index strictly before the cut.
    fn lower_end(&self, n: usize) -> usize {
        match *self {
            CutSite::Split { ring_position, .. } => ring_position,
            CutSite::Reuse { ring_position, .. } => (ring_position + n - 1) % n,
        }
    }

    fn point(&self, ring2: &[DVec2], n: usize) -> DVec2 {
        match *self {
            CutSite::Split { ring_position, ring_t, .. } => {
                ring2[ring_position].lerp(ring2[(ring_position + 1) % n], ring_t)
            }
            CutSite::Reuse { ring_position, .. } => ring2[ring_position],
        }
    }
}

/// Perform the division of `cell` along `chord`.
pub fn divide_cell(
    tissue: &mut Tissue,
    attrs: &mut TissueAttributes,
    cell: usize,
    chord: &Chord,
    cfg: &UpdateConfig,
) -> Result<DivisionOutcome, GeometryError> {
    let ring_walls = tissue.cells[cell].walls.clone();
    let ring_vertices = tissue.cells[cell].vertices.clone();
    let n = ring_walls.len();
    let outline = tissue.cell_outline(cell);
    let basis = PlaneBasis::from_ring(&outline);
    let ring2 = basis.project_ring(&outline);
    let parent_area = geometry::signed_area(&ring2).abs();

    // Resolve each crossing to a wall split or a vertex reuse.
    let mut sites = [CutSite::Reuse { vertex: 0, ring_position: 0 }; 2];
    for (site, cut) in sites.iter_mut().zip(chord.cuts.iter()) {
        let k = cut.ring_position;
        assert!(k < n, "chord references ring position {k} of a {n}-wall cell");
        *site = if cut.t < cfg.min_relative_distance {
            CutSite::Reuse { vertex: ring_vertices[k], ring_position: k }
        } else if cut.t > 1.0 - cfg.min_relative_distance {
            CutSite::Reuse {
                vertex: ring_vertices[(k + 1) % n],
                ring_position: (k + 1) % n,
            }
        } else {
            let wall = ring_walls[k];
            let aligned = tissue.walls[wall].vertices.0 == ring_vertices[k];
            CutSite::Split {
                wall,
                local_t: if aligned { cut.t } else { 1.0 - cut.t },
                ring_position: k,
                ring_t: cut.t,
            }
        };
    }
    let [site1, site2] = sites;

    // --- validation (no mutation yet) -----------------------------------

    match (site1, site2) {
        (CutSite::Reuse { vertex: v1, .. }, CutSite::Reuse { vertex: v2, .. }) if v1 == v2 => {
            return Err(GeometryError::Degenerate {
                cell,
                reason: "chord collapses to one vertex",
            });
        }
        (CutSite::Split { wall: w1, .. }, CutSite::Split { wall: w2, .. }) if w1 == w2 => {
            return Err(GeometryError::Degenerate {
                cell,
                reason: "both crossings on one wall",
            });
        }
        _ => {}
    }

    let x1 = site1.point(&ring2, n);
    let x2 = site2.point(&ring2, n);
    if (x1 - x2).length_squared() <= AREA_EPSILON * AREA_EPSILON * parent_area {
        return Err(GeometryError::Degenerate { cell, reason: "zero-length division wall" });
    }

    let first_points = planned_outline(&ring2, x1, x2, site1.upper_start(n), site2.lower_end(n));
    let second_points = planned_outline(&ring2, x2, x1, site2.upper_start(n), site1.lower_end(n));
    let area1 = geometry::signed_area(&first_points).abs();
    let area2 = geometry::signed_area(&second_points).abs();
    if first_points.len() < 3
        || second_points.len() < 3
        || area1 < AREA_EPSILON * parent_area
        || area2 < AREA_EPSILON * parent_area
    {
        return Err(GeometryError::ZeroAreaDaughter { cell });
    }

    // --- mutation --------------------------------------------------------

    let parent_row = attrs.cells.row(cell).to_vec();

    // Split the later ring position first so the earlier wall id stays at
    // an untouched position; splits are addressed by wall id, which is
    // stable either way.
    let (early, late) = if site1.ring_position() <= site2.ring_position() {
        (site1, site2)
    } else {
        (site2, site1)
    };
    let cut_late = commit_cut(tissue, attrs, &late, cfg);
    let cut_early = commit_cut(tissue, attrs, &early, cfg);

    // The division wall between the two cut vertices.
    let division_wall = tissue.add_wall(cut_early, cut_late, (Some(cell), None));
    let mut wall_row = vec![0.0; attrs.walls.columns()];
    wall_row[cfg.wall_resting_length_column] =
        cfg.wall_length_fraction * tissue.wall_length(division_wall);
    attrs.walls.append_row(wall_row);

    // Partition the (now updated) ring at the two cut vertices.
    let ring = &tissue.cells[cell];
    let pos_a = ring
        .vertices
        .iter()
        .position(|&v| v == cut_early)
        .expect("first cut vertex on the parent ring");
    let pos_b = ring
        .vertices
        .iter()
        .position(|&v| v == cut_late)
        .expect("second cut vertex on the parent ring");
    let (alpha, beta) = if pos_a < pos_b { (pos_a, pos_b) } else { (pos_b, pos_a) };

    let mut first_walls = ring.walls[alpha..beta].to_vec();
    let first_vertices = ring.vertices[alpha..=beta].to_vec();
    first_walls.push(division_wall);

    let mut second_walls = ring.walls[beta..].to_vec();
    second_walls.extend_from_slice(&ring.walls[..alpha]);
    second_walls.push(division_wall);
    let mut second_vertices = ring.vertices[beta..].to_vec();
    second_vertices.extend_from_slice(&ring.vertices[..=alpha]);

    tissue.cells[cell].walls = first_walls;
    tissue.cells[cell].vertices = first_vertices;
    let daughter = tissue.add_cell(second_walls.clone(), second_vertices);
    tissue.walls[division_wall].cells.1 = Some(daughter);
    for &w in &second_walls {
        if w != division_wall {
            tissue.walls[w].replace_cell(cell, daughter);
        }
    }

    debug_assert!(tissue.ring_is_closed(cell));
    debug_assert!(tissue.ring_is_closed(daughter));

    // --- attribute redistribution ----------------------------------------

    attrs.cells.append_row(parent_row.clone());

    let area_first = tissue.cell_area(cell);
    let area_second = tissue.cell_area(daughter);
    let total = area_first + area_second;
    for &col in &cfg.extensive {
        let value = parent_row[col];
        attrs.cells.set(cell, col, value * area_first / total);
        attrs.cells.set(daughter, col, value * area_second / total);
    }
    if let Some(col) = cfg.time {
        attrs.cells.set(cell, col, 0.0);
        attrs.cells.set(daughter, col, 0.0);
    }
    if let Some(col) = cfg.flag_reset {
        attrs.cells.set(cell, col, 0.0);
        attrs.cells.set(daughter, col, 0.0);
    }
    if let Some(center) = cfg.center {
        for &c in &[cell, daughter] {
            let centroid = tissue.cell_centroid(c);
            let coords = centroid.to_array();
            for d in 0..tissue.dimension {
                attrs.cells.set(c, center.start + d, coords[d]);
            }
            let outline = tissue.cell_outline(c);
            let mean_spoke = outline
                .iter()
                .map(|&p| (p - centroid).length())
                .sum::<f64>()
                / outline.len() as f64;
            attrs.cells.set(c, center.resting_length, mean_spoke);
        }
    }

    log::debug!(
        "cell {cell} divided: daughter {daughter}, wall {division_wall}, areas {area_first:.6}/{area_second:.6}"
    );

    Ok(DivisionOutcome {
        parent: cell,
        daughter,
        division_wall,
        areas: (area_first, area_second),
    })
}

/// Apply one cut to the mesh and tables, returning the cut vertex.
fn commit_cut(
    tissue: &mut Tissue,
    attrs: &mut TissueAttributes,
    site: &CutSite,
    cfg: &UpdateConfig,
) -> usize {
    match *site {
        CutSite::Reuse { vertex, .. } => vertex,
        CutSite::Split { wall, local_t, .. } => {
            let (va, vb) = tissue.endpoints(wall);
            let (nv, nw) = tissue.split_wall(wall, local_t);

            // One attribute row per created entity, immediately.
            let vertex_row = attrs.vertices.lerp_rows(va, vb, local_t);
            attrs.vertices.append_row(vertex_row);
            let wall_row = attrs.walls.row(wall).to_vec();
            attrs.walls.append_row(wall_row);

            let rest = cfg.wall_resting_length_column;
            attrs
                .walls
                .set(wall, rest, cfg.wall_length_fraction * tissue.wall_length(wall));
            attrs
                .walls
                .set(nw, rest, cfg.wall_length_fraction * tissue.wall_length(nw));
            nv
        }
    }
}

/// Planned daughter outline before any mutation: the two cut points plus
/// the ring vertices strictly between them, walking forward. The chain is
/// empty when the cuts sit on adjacent sites.
fn planned_outline(
    ring2: &[DVec2],
    from: DVec2,
    to: DVec2,
    upper_start: usize,
    lower_end: usize,
) -> Vec<DVec2> {
    let n = ring2.len();
    let mut points = vec![from];
    let mut k = upper_start % n;
    if k != (lower_end + 1) % n {
        loop {
            points.push(ring2[k]);
            if k == lower_end % n {
                break;
            }
            k = (k + 1) % n;
        }
    }
    points.push(to);
    points
}

//! Tissue mesh container: cells, walls and vertices with full adjacency.
//!
//! A cell is an ordered ring of walls and the matching ordered ring of
//! vertices; consecutive walls share exactly one vertex and the ring is a
//! closed simple cycle. A wall is shared by at most two cells (boundary
//! walls have one). Division is the only operation in this crate that
//! mutates the topology.
//!
//! Indices into the entity vectors double as entity identifiers; every
//! entity owns the attribute-table row of the same index (see
//! [`attributes`]). Out-of-range indices panic: they indicate corrupted
//! topology upstream, which is not recoverable.

mod attributes;

pub use attributes::{AttributeTable, TableLayout, TissueAttributes};

use glam::{DVec2, DVec3};

use crate::geometry::{self, PlaneBasis};

/// A point in space, referenced by walls and, through them, by cells.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: DVec3,
}

/// A mesh edge bounding one or two cells.
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    /// Endpoint vertex indices, in the wall's own storage orientation
    /// (which may be opposite to a given cell's ring orientation).
    pub vertices: (usize, usize),
    /// Bounding cells; boundary walls have `None` on one side.
    pub cells: (Option<usize>, Option<usize>),
}

impl Wall {
    /// Replace one cell reference, wherever it sits.
    pub fn replace_cell(&mut self, old: usize, new: usize) {
        if self.cells.0 == Some(old) {
            self.cells.0 = Some(new);
        } else if self.cells.1 == Some(old) {
            self.cells.1 = Some(new);
        }
    }
}

/// A polygonal cell: the unit that grows and divides.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    /// Boundary walls in ring order.
    pub walls: Vec<usize>,
    /// Boundary vertices in ring order; `vertices[k]` starts `walls[k]`.
    pub vertices: Vec<usize>,
}

/// The mesh: entity vectors plus the spatial dimension (2 or 3).
#[derive(Debug, Clone)]
pub struct Tissue {
    pub vertices: Vec<Vertex>,
    pub walls: Vec<Wall>,
    pub cells: Vec<Cell>,
    /// 2 for flat tissues (z = 0), 3 for surface meshes.
    pub dimension: usize,
}

impl Tissue {
    pub fn new(dimension: usize) -> Self {
        Self {
            vertices: Vec::new(),
            walls: Vec::new(),
            cells: Vec::new(),
            dimension,
        }
    }

    /// Build a single-cell tissue from an ordered polygon outline.
    pub fn from_polygon(points: &[DVec3], dimension: usize) -> Self {
        let n = points.len();
        let mut tissue = Self::new(dimension);
        for &p in points {
            tissue.add_vertex(p);
        }
        let mut ring_walls = Vec::with_capacity(n);
        for i in 0..n {
            ring_walls.push(tissue.add_wall(i, (i + 1) % n, (Some(0), None)));
        }
        tissue.cells.push(Cell {
            walls: ring_walls,
            vertices: (0..n).collect(),
        });
        tissue
    }

    // --- accessors -------------------------------------------------------

    /// Ordered boundary walls of a cell.
    #[inline]
    pub fn boundary_walls(&self, cell: usize) -> &[usize] {
        &self.cells[cell].walls
    }

    /// Ordered boundary vertices of a cell.
    #[inline]
    pub fn ring_vertices(&self, cell: usize) -> &[usize] {
        &self.cells[cell].vertices
    }

    /// Endpoint vertices of a wall (storage orientation).
    #[inline]
    pub fn endpoints(&self, wall: usize) -> (usize, usize) {
        self.walls[wall].vertices
    }

    /// Bounding cell of a wall on the given side (0 or 1).
    #[inline]
    pub fn neighbor_cell(&self, wall: usize, side: usize) -> Option<usize> {
        match side {
            0 => self.walls[wall].cells.0,
            1 => self.walls[wall].cells.1,
            _ => panic!("wall side must be 0 or 1, got {side}"),
        }
    }

    /// The cell on the other side of a wall from `cell`, if any.
    pub fn opposite_cell(&self, wall: usize, cell: usize) -> Option<usize> {
        let (a, b) = self.walls[wall].cells;
        if a == Some(cell) { b } else { a }
    }

    /// Current euclidean length of a wall.
    pub fn wall_length(&self, wall: usize) -> f64 {
        let (a, b) = self.walls[wall].vertices;
        (self.vertices[a].position - self.vertices[b].position).length()
    }

    /// World-space positions of a cell's boundary ring.
    pub fn cell_outline(&self, cell: usize) -> Vec<DVec3> {
        self.cells[cell]
            .vertices
            .iter()
            .map(|&v| self.vertices[v].position)
            .collect()
    }

    /// In-plane frame and projected outline of a cell.
    pub fn cell_plane(&self, cell: usize) -> (PlaneBasis, Vec<DVec2>) {
        let outline = self.cell_outline(cell);
        let basis = PlaneBasis::from_ring(&outline);
        let ring = basis.project_ring(&outline);
        (basis, ring)
    }

    /// Polygon area of a cell.
    pub fn cell_area(&self, cell: usize) -> f64 {
        let (_, ring) = self.cell_plane(cell);
        geometry::signed_area(&ring).abs()
    }

    /// Area centroid of a cell, in world space.
    pub fn cell_centroid(&self, cell: usize) -> DVec3 {
        let (basis, ring) = self.cell_plane(cell);
        basis.lift(geometry::centroid(&ring))
    }

    // --- mutators --------------------------------------------------------

    pub fn add_vertex(&mut self, position: DVec3) -> usize {
        self.vertices.push(Vertex { position });
        self.vertices.len() - 1
    }

    pub fn add_wall(&mut self, a: usize, b: usize, cells: (Option<usize>, Option<usize>)) -> usize {
        self.walls.push(Wall { vertices: (a, b), cells });
        self.walls.len() - 1
    }

    pub fn add_cell(&mut self, walls: Vec<usize>, vertices: Vec<usize>) -> usize {
        self.cells.push(Cell { walls, vertices });
        self.cells.len() - 1
    }

    /// Split a wall at relative position `t` (in the wall's storage
    /// orientation), inserting a new vertex and a new wall.
    ///
    /// The original wall keeps its first endpoint and is shortened to the
    /// new vertex; the new wall spans the remainder and inherits both cell
    /// references. The boundary rings of every bounding cell are patched in
    /// place, so neighbors stay consistent.
    ///
    /// Returns `(new_vertex, new_wall)`.
    pub fn split_wall(&mut self, wall: usize, t: f64) -> (usize, usize) {
        let (va, vb) = self.walls[wall].vertices;
        let cells = self.walls[wall].cells;

        let position = self.vertices[va]
            .position
            .lerp(self.vertices[vb].position, t);
        let nv = self.add_vertex(position);

        let nw = self.add_wall(nv, vb, cells);
        self.walls[wall].vertices = (va, nv);

        for cell in [cells.0, cells.1].into_iter().flatten() {
            let k = self.cells[cell]
                .walls
                .iter()
                .position(|&w| w == wall)
                .unwrap_or_else(|| panic!("wall {wall} missing from ring of cell {cell}"));
            let aligned = self.cells[cell].vertices[k] == va;
            self.cells[cell].vertices.insert(k + 1, nv);
            if aligned {
                self.cells[cell].walls.insert(k + 1, nw);
            } else {
                self.cells[cell].walls.insert(k, nw);
            }
        }

        (nv, nw)
    }

    // --- consistency -----------------------------------------------------

    /// Check the ring invariant of one cell: same wall and vertex counts,
    /// and `walls[k]` connecting `vertices[k]` to `vertices[k+1]` for every
    /// ring position.
    pub fn ring_is_closed(&self, cell: usize) -> bool {
        let c = &self.cells[cell];
        if c.walls.len() != c.vertices.len() || c.walls.len() < 3 {
            return false;
        }
        let n = c.walls.len();
        for k in 0..n {
            let (a, b) = self.walls[c.walls[k]].vertices;
            let (ra, rb) = (c.vertices[k], c.vertices[(k + 1) % n]);
            if !((a, b) == (ra, rb) || (a, b) == (rb, ra)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Tissue {
        Tissue::from_polygon(
            &[
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            2,
        )
    }

    /// Two unit squares sharing the vertical wall x = 1.
    fn two_cell_strip() -> Tissue {
        let mut t = Tissue::new(2);
        let p = [
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ];
        for (x, y) in p {
            t.add_vertex(DVec3::new(x, y, 0.0));
        }
        let w0 = t.add_wall(0, 1, (Some(0), None));
        let shared = t.add_wall(1, 4, (Some(0), Some(1)));
        let w2 = t.add_wall(4, 5, (Some(0), None));
        let w3 = t.add_wall(5, 0, (Some(0), None));
        let w4 = t.add_wall(1, 2, (Some(1), None));
        let w5 = t.add_wall(2, 3, (Some(1), None));
        let w6 = t.add_wall(3, 4, (Some(1), None));
        t.add_cell(vec![w0, shared, w2, w3], vec![0, 1, 4, 5]);
        // Ring of cell 1 traverses the shared wall from 4 to 1 (reversed).
        t.add_cell(vec![w4, w5, w6, shared], vec![1, 2, 3, 4]);
        t
    }

    #[test]
    fn test_from_polygon_ring_closed() {
        let t = unit_square();
        assert!(t.ring_is_closed(0));
        assert!((t.cell_area(0) - 1.0).abs() < 1e-12);
        assert!((t.cell_centroid(0) - DVec3::new(0.5, 0.5, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_split_wall_patches_single_cell() {
        let mut t = unit_square();
        let (nv, nw) = t.split_wall(0, 0.25);
        assert!((t.vertices[nv].position - DVec3::new(0.25, 0.0, 0.0)).length() < 1e-12);
        assert_eq!(t.cells[0].walls.len(), 5);
        assert!(t.ring_is_closed(0));
        assert_eq!(t.walls[0].vertices, (0, nv));
        assert_eq!(t.walls[nw].vertices, (nv, 1));
        assert!((t.cell_area(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_shared_wall_patches_both_rings() {
        let mut t = two_cell_strip();
        assert!(t.ring_is_closed(0));
        assert!(t.ring_is_closed(1));

        // The shared wall runs from vertex 1 to vertex 4 in storage order,
        // which is cell 0's ring orientation and the reverse of cell 1's.
        let (nv, nw) = t.split_wall(1, 0.5);
        assert!((t.vertices[nv].position - DVec3::new(1.0, 0.5, 0.0)).length() < 1e-12);
        assert!(t.ring_is_closed(0), "cell 0 ring broken after shared split");
        assert!(t.ring_is_closed(1), "cell 1 ring broken after shared split");
        assert_eq!(t.cells[0].walls.len(), 5);
        assert_eq!(t.cells[1].walls.len(), 5);
        assert_eq!(t.walls[nw].cells, (Some(0), Some(1)));
        assert!((t.cell_area(0) - 1.0).abs() < 1e-12);
        assert!((t.cell_area(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_opposite_cell() {
        let t = two_cell_strip();
        assert_eq!(t.opposite_cell(1, 0), Some(1));
        assert_eq!(t.opposite_cell(1, 1), Some(0));
        assert_eq!(t.opposite_cell(0, 0), None);
    }
}

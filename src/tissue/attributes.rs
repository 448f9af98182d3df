//! Per-entity numeric attribute storage.
//!
//! Every vertex, wall and cell owns one row of 64-bit floats in its table;
//! columns are addressed by small integer indices supplied through model
//! configuration (volume index, concentration indices, resting-length
//! index, ...), never hard-coded. Division appends exactly one row per
//! created entity, keeping row index and entity index in lockstep.

use serde::{Deserialize, Serialize};

/// One attribute table: a row of values per entity.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    /// Rows, indexed by entity; all rows share `columns` entries.
    rows: Vec<Vec<f64>>,
    /// Number of columns per row.
    columns: usize,
}

impl AttributeTable {
    /// Create an empty table with a fixed column count.
    pub fn new(columns: usize) -> Self {
        Self { rows: Vec::new(), columns }
    }

    /// Number of columns per row.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows (equals the number of live entities).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Read one value.
    ///
    /// Panics on an out-of-range entity or column: that is a
    /// mesh-consistency bug upstream, not a recoverable condition.
    #[inline]
    pub fn get(&self, entity: usize, column: usize) -> f64 {
        self.rows[entity][column]
    }

    /// Write one value.
    #[inline]
    pub fn set(&mut self, entity: usize, column: usize, value: f64) {
        self.rows[entity][column] = value;
    }

    /// Borrow a full row.
    #[inline]
    pub fn row(&self, entity: usize) -> &[f64] {
        &self.rows[entity]
    }

    /// Append one row, returning the new entity index.
    ///
    /// Panics if the row width does not match the table; entity creation
    /// with a malformed row would corrupt the index correspondence.
    pub fn append_row(&mut self, columns: Vec<f64>) -> usize {
        assert_eq!(
            columns.len(),
            self.columns,
            "attribute row width mismatch: got {}, table has {}",
            columns.len(),
            self.columns
        );
        self.rows.push(columns);
        self.rows.len() - 1
    }

    /// Append a zero row.
    pub fn append_zero_row(&mut self) -> usize {
        self.append_row(vec![0.0; self.columns])
    }

    /// Element-wise linear interpolation of two rows, `t` from row `a`
    /// toward row `b`. Used for attribute rows of vertices created on an
    /// existing wall.
    pub fn lerp_rows(&self, a: usize, b: usize, t: f64) -> Vec<f64> {
        self.rows[a]
            .iter()
            .zip(self.rows[b].iter())
            .map(|(&x, &y)| x + (y - x) * t)
            .collect()
    }
}

/// Column counts of the three tables, used to validate configured column
/// indices at rule construction time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TableLayout {
    pub cell_columns: usize,
    pub wall_columns: usize,
    pub vertex_columns: usize,
}

/// The three attribute tables of a tissue, kept alongside the mesh.
#[derive(Debug, Clone)]
pub struct TissueAttributes {
    pub cells: AttributeTable,
    pub walls: AttributeTable,
    pub vertices: AttributeTable,
}

impl TissueAttributes {
    pub fn new(layout: TableLayout) -> Self {
        Self {
            cells: AttributeTable::new(layout.cell_columns),
            walls: AttributeTable::new(layout.wall_columns),
            vertices: AttributeTable::new(layout.vertex_columns),
        }
    }

    pub fn layout(&self) -> TableLayout {
        TableLayout {
            cell_columns: self.cells.columns(),
            wall_columns: self.walls.columns(),
            vertex_columns: self.vertices.columns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_get() {
        let mut table = AttributeTable::new(3);
        let row = table.append_row(vec![1.0, 2.0, 3.0]);
        assert_eq!(row, 0);
        assert_eq!(table.rows(), 1);
        assert_eq!(table.get(0, 1), 2.0);

        table.set(0, 1, 5.0);
        assert_eq!(table.get(0, 1), 5.0);
    }

    #[test]
    #[should_panic(expected = "attribute row width mismatch")]
    fn test_row_width_mismatch_panics() {
        let mut table = AttributeTable::new(3);
        table.append_row(vec![1.0]);
    }

    #[test]
    fn test_lerp_rows() {
        let mut table = AttributeTable::new(2);
        table.append_row(vec![0.0, 10.0]);
        table.append_row(vec![4.0, 20.0]);
        let mid = table.lerp_rows(0, 1, 0.25);
        assert_eq!(mid, vec![1.0, 12.5]);
    }
}

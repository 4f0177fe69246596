//! Occupancy statistics for the spatial grid

use super::SpatialGrid;

/// Statistics about the spatial grid
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridStats {
    pub axis_count: usize,
    pub cell_count: usize,
    pub occupied_cells: usize,
    pub total_entries: usize,
    pub average_entries_per_cell: f64,
    pub max_entries_per_cell: usize,
}

impl SpatialGrid {
    /// Get statistics about the grid
    #[must_use]
    pub fn stats(&self) -> GridStats {
        let (occupied_cells, total_entries, max_entries_per_cell) = self
            .occupied()
            .fold((0, 0, 0), |(cells, entries, max), (_, bucket)| {
                (cells + 1, entries + bucket.len(), max.max(bucket.len()))
            });

        let average_entries_per_cell = if occupied_cells > 0 {
            total_entries as f64 / occupied_cells as f64
        } else {
            0.0
        };

        GridStats {
            axis_count: self.axis_count(),
            cell_count: self.cell_count(),
            occupied_cells,
            total_entries,
            average_entries_per_cell,
            max_entries_per_cell,
        }
    }
}

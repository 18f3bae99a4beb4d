//! Spatial Grid
//!
//! Uniform partition of the arena into square cells. Every cell keeps one
//! bucket of agent ids per species, and every agent sits in exactly one
//! (cell, species) bucket. Neighbor queries walk a square window of cells
//! around the querying agent instead of the whole population; exact range
//! filtering is left to the force pipeline.
//!
//! Buckets preserve insertion order and removal keeps the remaining order,
//! so neighbor iteration is deterministic for a given history.

use feather_core::{AgentId, Vector2};
use log::warn;
use smallvec::SmallVec;

use crate::error::SimulationError;
use crate::species::{PerSpecies, Species};
use crate::tuning::Arena;

/// Integer cell coordinate `(i, j)`: column then row.
pub type CellCoord = (i32, i32);

type Bucket = SmallVec<[AgentId; 8]>;

/// Upper bound on `columns * rows`.
pub const MAX_GRID_CELLS: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: i32,
    rows: i32,
    // Row-major, one bucket per species per cell
    cells: Vec<PerSpecies<Bucket>>,
}

impl SpatialGrid {
    /// Builds an empty grid covering `arena`. The grid is never resized afterwards.
    pub fn new(arena: &Arena, cell_size: f32) -> Result<Self, SimulationError> {
        arena.validate()?;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimulationError::InvalidCellSize(cell_size));
        }

        let cols = (arena.width as f64 / cell_size as f64).ceil().max(1.0);
        let rows = (arena.height as f64 / cell_size as f64).ceil().max(1.0);
        if cols * rows > MAX_GRID_CELLS as f64 {
            return Err(SimulationError::InvalidCellSize(cell_size));
        }
        let (cols, rows) = (cols as i32, rows as i32);

        let cells = (0..cols as usize * rows as usize)
            .map(|_| PerSpecies::default())
            .collect();

        Ok(Self {
            cell_size,
            cols,
            rows,
            cells,
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// `(columns, rows)`.
    pub fn dimensions(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    /// Cell containing `position`, by floor division, clamped into the grid.
    #[inline]
    pub fn cell_for(&self, position: Vector2) -> CellCoord {
        let i = (position.x / self.cell_size).floor() as i32;
        let j = (position.y / self.cell_size).floor() as i32;
        (i.clamp(0, self.cols - 1), j.clamp(0, self.rows - 1))
    }

    #[inline]
    pub fn in_bounds(&self, (i, j): CellCoord) -> bool {
        (0..self.cols).contains(&i) && (0..self.rows).contains(&j)
    }

    #[inline]
    fn index(&self, cell: CellCoord) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.1 * self.cols + cell.0) as usize)
    }

    /// Adds `id` to the `species` bucket of `cell`.
    pub fn insert(&mut self, id: AgentId, cell: CellCoord, species: Species) {
        match self.index(cell) {
            Some(idx) => self.cells[idx][species].push(id),
            None => warn!("Ignoring insert of agent {} into out-of-bounds cell {:?}", id, cell),
        }
    }

    fn remove(&mut self, id: AgentId, cell: CellCoord, species: Species) -> bool {
        let Some(idx) = self.index(cell) else {
            return false;
        };
        let bucket = &mut self.cells[idx][species];
        match bucket.iter().position(|&member| member == id) {
            Some(pos) => {
                bucket.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Moves `id` from `old_cell` to `new_cell`, keeping its species bucket.
    /// No-op if the cell is unchanged.
    pub fn relocate(
        &mut self,
        id: AgentId,
        species: Species,
        old_cell: CellCoord,
        new_cell: CellCoord,
    ) {
        if old_cell == new_cell {
            return;
        }
        if !self.remove(id, old_cell, species) {
            warn!("Agent {} was not in {:?}/{} during relocate", id, old_cell, species);
        }
        self.insert(id, new_cell, species);
    }

    /// Moves `id` between species buckets inside `cell`. No-op if the species is unchanged.
    pub fn reclassify(
        &mut self,
        id: AgentId,
        cell: CellCoord,
        old_species: Species,
        new_species: Species,
    ) {
        if old_species == new_species {
            return;
        }
        if !self.remove(id, cell, old_species) {
            warn!("Agent {} was not in {:?}/{} during reclassify", id, cell, old_species);
        }
        self.insert(id, cell, new_species);
    }

    /// Window half-width in cells needed to cover `sensing_range`.
    #[inline]
    pub fn window_radius(&self, sensing_range: f32) -> i32 {
        ((sensing_range / self.cell_size).ceil() as i32).max(0)
    }

    /// Collects, per species, every agent in the square window of
    /// `radius_cells` around `cell`. Cells outside the grid are skipped.
    pub fn neighbors_in_window(
        &self,
        cell: CellCoord,
        radius_cells: i32,
    ) -> PerSpecies<Vec<AgentId>> {
        let mut found: PerSpecies<Vec<AgentId>> = PerSpecies::default();

        for dx in -radius_cells..=radius_cells {
            for dy in -radius_cells..=radius_cells {
                let Some(idx) = self.index((cell.0 + dx, cell.1 + dy)) else {
                    continue;
                };
                for (species, bucket) in self.cells[idx].iter() {
                    found[species].extend_from_slice(bucket);
                }
            }
        }

        found
    }

    /// Members of one (cell, species) bucket. Empty for out-of-bounds cells.
    pub fn bucket(&self, cell: CellCoord, species: Species) -> &[AgentId] {
        match self.index(cell) {
            Some(idx) => &self.cells[idx][species],
            None => &[],
        }
    }

    /// Number of buckets that contain `id`. Exactly one for a live agent.
    pub fn occupancy(&self, id: AgentId) -> usize {
        self.cells
            .iter()
            .flat_map(|buckets| buckets.values())
            .filter(|bucket| bucket.contains(&id))
            .count()
    }

    /// Total number of memberships across all buckets.
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|buckets| buckets.values())
            .map(|bucket| bucket.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

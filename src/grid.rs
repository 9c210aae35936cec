//! Uniform spatial grid with periodic ghost entries.
//!
//! Cells are `cell_size` wide (the maximum interaction radius), so every
//! neighbor of a particle lies in the 3x3 block around its cell. On a torus a
//! particle within `cell_size` of an edge is also listed in the cell across that
//! edge (and across the corner when near two edges). Queries then never wrap cell
//! coordinates; the block is simply clipped to the grid.
//!
//! Storage is CSR-style: `cell_starts`/`cell_counts` index into one flat
//! `cell_particle_indices` buffer that is rebuilt from scratch every step.

use rayon::prelude::*;
use simulation_common::{SimParams, Vec2};

/// Up to three columns times three rows. Only tiny worlds (narrower than two
/// cells) ever need more than the primary cell plus three ghosts.
const MAX_CELLS_PER_PARTICLE: usize = 9;

/// The grid cells one particle is listed in during a rebuild.
#[derive(Debug, Clone, Copy)]
struct CellSlots {
    cells: [u32; MAX_CELLS_PER_PARTICLE],
    len: u8,
}

impl Default for CellSlots {
    fn default() -> Self {
        Self { cells: [0; MAX_CELLS_PER_PARTICLE], len: 0 }
    }
}

impl CellSlots {
    #[inline(always)]
    fn as_slice(&self) -> &[u32] {
        &self.cells[..self.len as usize]
    }
}

/// Column (or row) coordinates a particle occupies along one axis.
#[derive(Debug, Clone, Copy)]
struct AxisCells {
    coords: [u32; 3],
    len: usize,
}

impl AxisCells {
    #[inline(always)]
    fn push_unique(&mut self, c: u32) {
        if !self.coords[..self.len].contains(&c) {
            self.coords[self.len] = c;
            self.len += 1;
        }
    }
}

#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    inv_cell_size: f32,
    grid_dim_x: u32,
    grid_dim_y: u32,
    world_width: f32,
    world_height: f32,
    ghost_cells: bool,

    // Cells each particle was assigned to in the last rebuild
    particle_cells: Vec<CellSlots>,
    // Number of entries (primary + ghost) in each grid cell
    cell_counts: Vec<u32>,
    // Start index in cell_particle_indices for each grid cell (prefix sum)
    cell_starts: Vec<u32>,
    // Particle indices grouped by grid cell, ascending within a cell
    cell_particle_indices: Vec<u32>,
}

impl SpatialIndex {
    /// Creates an empty index for the given geometry.
    pub fn new(
        cell_size: f32,
        grid_dim_x: u32,
        grid_dim_y: u32,
        world_width: f32,
        world_height: f32,
        ghost_cells: bool,
    ) -> Self {
        let grid_dim_x = grid_dim_x.max(1);
        let grid_dim_y = grid_dim_y.max(1);
        let num_grid_cells = (grid_dim_x * grid_dim_y) as usize;
        Self {
            cell_size,
            inv_cell_size: if cell_size > 1e-9 { 1.0 / cell_size } else { 0.0 },
            grid_dim_x,
            grid_dim_y,
            world_width,
            world_height,
            ghost_cells,
            particle_cells: Vec::new(),
            cell_counts: vec![0; num_grid_cells],
            cell_starts: vec![0; num_grid_cells],
            cell_particle_indices: Vec::new(),
        }
    }

    /// Creates an empty index matching the runtime parameters.
    pub fn from_params(params: &SimParams) -> Self {
        Self::new(
            params.grid_cell_size,
            params.grid_dim_x,
            params.grid_dim_y,
            params.world_width,
            params.world_height,
            params.uses_ghost_cells(),
        )
    }

    pub fn grid_dims(&self) -> (u32, u32) {
        (self.grid_dim_x, self.grid_dim_y)
    }

    pub fn num_cells(&self) -> usize {
        self.cell_counts.len()
    }

    /// Total number of stored entries, ghosts included.
    pub fn num_entries(&self) -> usize {
        self.cell_particle_indices.len()
    }

    /// Primary cell of a position, clamped to the grid.
    #[inline(always)]
    pub fn cell_of(&self, pos: Vec2) -> (u32, u32) {
        (
            axis_cell(pos.x, self.inv_cell_size, self.grid_dim_x),
            axis_cell(pos.y, self.inv_cell_size, self.grid_dim_y),
        )
    }

    #[inline(always)]
    fn flat_index(&self, cell_x: u32, cell_y: u32) -> usize {
        (cell_y * self.grid_dim_x + cell_x) as usize
    }

    /// Particle indices stored in one cell (primary and ghost entries).
    pub fn cell_contents(&self, cell_x: u32, cell_y: u32) -> &[u32] {
        if cell_x >= self.grid_dim_x || cell_y >= self.grid_dim_y {
            return &[];
        }
        let grid_idx = self.flat_index(cell_x, cell_y);
        let start = self.cell_starts[grid_idx] as usize;
        let end = start + self.cell_counts[grid_idx] as usize;
        &self.cell_particle_indices[start..end]
    }

    /// Rebuilds the whole index from the current positions.
    pub fn rebuild(&mut self, positions_x: &[f32], positions_y: &[f32]) {
        let num_particles = positions_x.len().min(positions_y.len());
        if positions_x.len() != positions_y.len() {
            log::error!(
                "Position slices differ in length ({} vs {}); indexing the first {}.",
                positions_x.len(),
                positions_y.len(),
                num_particles
            );
        }

        // Phase 1: Assign grid cells to each particle (Parallel).
        let this = &*self;
        let assigned: Vec<CellSlots> = (0..num_particles)
            .into_par_iter()
            .map(|idx| this.cells_for(positions_x[idx], positions_y[idx]))
            .collect();
        self.particle_cells = assigned;

        // Phase 2: Count entries in each grid cell (Serial).
        self.cell_counts.iter_mut().for_each(|c| *c = 0);
        for slots in &self.particle_cells {
            for &grid_idx in slots.as_slice() {
                self.cell_counts[grid_idx as usize] += 1;
            }
        }

        // Phase 3: Calculate cell start indices using a prefix sum (Serial).
        let mut total_sum = 0u32;
        for (start, &count) in self.cell_starts.iter_mut().zip(self.cell_counts.iter()) {
            *start = total_sum;
            total_sum += count;
        }

        // Phase 4: Scatter particle indices into their cells (Serial).
        // Walking particles in order keeps every cell sorted by index.
        self.cell_particle_indices.clear();
        self.cell_particle_indices.resize(total_sum as usize, 0);
        let mut write_offsets = self.cell_starts.clone();
        for (particle_idx, slots) in self.particle_cells.iter().enumerate() {
            for &grid_idx in slots.as_slice() {
                let slot = &mut write_offsets[grid_idx as usize];
                self.cell_particle_indices[*slot as usize] = particle_idx as u32;
                *slot += 1;
            }
        }
    }

    /// Primary cell plus ghost cells for one position.
    fn cells_for(&self, x: f32, y: f32) -> CellSlots {
        let cols = self.axis_cells(x, self.world_width, self.grid_dim_x);
        let rows = self.axis_cells(y, self.world_height, self.grid_dim_y);

        let mut slots = CellSlots::default();
        for &row in &rows.coords[..rows.len] {
            for &col in &cols.coords[..cols.len] {
                slots.cells[slots.len as usize] = row * self.grid_dim_x + col;
                slots.len += 1;
            }
        }
        slots
    }

    fn axis_cells(&self, v: f32, world_extent: f32, dim: u32) -> AxisCells {
        let mut cells = AxisCells { coords: [0; 3], len: 0 };
        cells.push_unique(axis_cell(v, self.inv_cell_size, dim));
        if self.ghost_cells {
            // Near the low edge: also visible from the far column/row.
            if v < self.cell_size {
                cells.push_unique(dim - 1);
            }
            // Near the high edge: also visible from the first column/row.
            if v >= world_extent - self.cell_size {
                cells.push_unique(0);
            }
        }
        cells
    }

    /// Writes into `out` the sorted, de-duplicated particle indices stored in the
    /// 3x3 block centred on `(cell_x, cell_y)`, clipped to the grid.
    ///
    /// Ghost and primary entries of the same particle can share a block on grids
    /// fewer than four cells across, hence the de-duplication.
    pub fn neighbors_of(&self, cell_x: u32, cell_y: u32, out: &mut Vec<u32>) {
        out.clear();
        let center_x = cell_x as i64;
        let center_y = cell_y as i64;
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                let check_x = center_x + dx;
                let check_y = center_y + dy;
                if check_x < 0
                    || check_y < 0
                    || check_x >= self.grid_dim_x as i64
                    || check_y >= self.grid_dim_y as i64
                {
                    continue;
                }
                out.extend_from_slice(self.cell_contents(check_x as u32, check_y as u32));
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

// Calculates the cell coordinate along one axis, clamped to `[0, dim)`.
#[inline(always)]
fn axis_cell(v: f32, inv_cell_size: f32, dim: u32) -> u32 {
    let c = (v * inv_cell_size).floor() as i64; // NaN casts to 0
    c.clamp(0, dim as i64 - 1) as u32
}

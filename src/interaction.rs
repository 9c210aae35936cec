//! The type-by-type interaction matrix and the edits a UI can send it.

use anyhow::Result;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use simulation_common::config::validate_matrix_shape;
use simulation_common::ConfigError;

pub const MIN_STRENGTH: f32 = -1.0;
pub const MAX_STRENGTH: f32 = 1.0;

/// Square `size x size` matrix of strengths in `[-1, 1]`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    size: usize,
    values: Vec<f32>,
}

/// A single change requested by an external collaborator. Applied between steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatrixEdit {
    /// Overwrite one cell; the value is clamped into `[-1, 1]`.
    Set { row: usize, col: usize, value: f32 },
    /// Nudge one cell by `delta` (a scroll-wheel tick), clamped into `[-1, 1]`.
    Adjust { row: usize, col: usize, delta: f32 },
    /// Draw every cell independently from `U[-1, 1]`.
    Randomize,
    /// Set every cell to 0.
    Reset,
}

#[inline(always)]
fn clamp_strength(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(MIN_STRENGTH, MAX_STRENGTH)
}

impl InteractionMatrix {
    /// All-zero matrix.
    pub fn zeros(size: usize) -> Self {
        Self { size, values: vec![0.0; size * size] }
    }

    /// Builds a matrix from rows, failing unless it is square. Values are clamped.
    pub fn from_rows(rows: &[Vec<f32>]) -> std::result::Result<Self, ConfigError> {
        let size = rows.len();
        validate_matrix_shape(size, rows)?;
        let values = rows.iter().flatten().map(|&v| clamp_strength(v)).collect();
        Ok(Self { size, values })
    }

    /// Like [`InteractionMatrix::from_rows`] but also requires `size == type_count`.
    pub fn for_types(type_count: u32, rows: &[Vec<f32>]) -> std::result::Result<Self, ConfigError> {
        validate_matrix_shape(type_count as usize, rows)?;
        Self::from_rows(rows)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.size + col]
    }

    pub fn rows(&self) -> Vec<Vec<f32>> {
        self.values.chunks(self.size.max(1)).map(|row| row.to_vec()).collect()
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.size || col >= self.size {
            anyhow::bail!(
                "Matrix cell ({}, {}) is outside a {}x{} interaction matrix.",
                row,
                col,
                self.size,
                self.size
            );
        }
        Ok(row * self.size + col)
    }

    /// Stores `value` clamped into `[-1, 1]` and returns what was stored.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<f32> {
        let idx = self.check_cell(row, col)?;
        self.values[idx] = clamp_strength(value);
        Ok(self.values[idx])
    }

    /// Adds `delta` to one cell, clamped into `[-1, 1]`, and returns the new value.
    pub fn adjust(&mut self, row: usize, col: usize, delta: f32) -> Result<f32> {
        let idx = self.check_cell(row, col)?;
        self.values[idx] = clamp_strength(self.values[idx] + delta);
        Ok(self.values[idx])
    }

    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        self.values
            .iter_mut()
            .for_each(|v| *v = rng.random_range(MIN_STRENGTH..=MAX_STRENGTH));
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Applies one edit. Only out-of-range cell coordinates fail; values never do.
    pub fn apply<R: Rng>(&mut self, edit: MatrixEdit, rng: &mut R) -> Result<()> {
        match edit {
            MatrixEdit::Set { row, col, value } => {
                self.set(row, col, value)?;
            }
            MatrixEdit::Adjust { row, col, delta } => {
                self.adjust(row, col, delta)?;
            }
            MatrixEdit::Randomize => self.randomize(rng),
            MatrixEdit::Reset => self.reset(),
        }
        Ok(())
    }
}

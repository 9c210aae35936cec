//! Pairwise force model.
//!
//! Three regimes by separation `r`:
//! - `r < radius_min`: repulsion falling linearly from `repulsion_strength` to 0.
//! - `radius_min <= r < radius_max`: signed interaction from the matrix, shaped by a
//!   triangle that peaks at the midpoint of the band.
//! - otherwise zero.
//!
//! The force returned for `(self, neighbor)` acts on `self` only.

use crate::interaction::InteractionMatrix;
use simulation_common::{BoundaryMode, ForceSymmetry, SimParams, Vec2};

/// Separations shorter than this are treated as coincident particles.
pub const MIN_SEPARATION: f32 = 1e-6;

/// Brings one displacement component into `[-extent/2, extent/2]`.
#[inline(always)]
fn wrap_component(d: f32, extent: f32) -> f32 {
    let half = 0.5 * extent;
    if d > half {
        d - extent
    } else if d < -half {
        d + extent
    } else {
        d
    }
}

/// Shortest displacement from `from` to `to` on a `width x height` torus.
#[inline(always)]
pub fn toroidal_displacement(from: Vec2, to: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(wrap_component(to.x - from.x, width), wrap_component(to.y - from.y, height))
}

/// Displacement from `from` to `to` under the configured boundary mode.
#[inline(always)]
pub fn displacement(from: Vec2, to: Vec2, params: &SimParams) -> Vec2 {
    match params.boundary {
        BoundaryMode::Wrap => toroidal_displacement(from, to, params.world_width, params.world_height),
        BoundaryMode::Bounce => to - from,
    }
}

/// Long-range strength felt by a type-`a` particle from a type-`b` neighbor.
#[inline(always)]
pub fn interaction_strength(a: u32, b: u32, matrix: &InteractionMatrix, symmetry: ForceSymmetry) -> f32 {
    match symmetry {
        ForceSymmetry::Asymmetric => matrix.get(a as usize, b as usize),
        ForceSymmetry::Symmetric => {
            0.5 * (matrix.get(a as usize, b as usize) + matrix.get(b as usize, a as usize))
        }
    }
}

/// Triangular weight in `[0, 1]`: 0 at `radius_min` and `radius_max`, 1 at the midpoint.
#[inline(always)]
pub fn band_profile(r: f32, params: &SimParams) -> f32 {
    if params.half_band <= 0.0 {
        return 0.0;
    }
    (1.0 - (r - params.ideal_radius).abs() / params.half_band).max(0.0)
}

/// Force on a type-`self_type` particle from a type-`neighbor_type` particle at
/// displacement `d` (neighbor minus self).
#[inline(always)]
pub fn pair_force(
    self_type: u32,
    neighbor_type: u32,
    d: Vec2,
    params: &SimParams,
    matrix: &InteractionMatrix,
) -> Vec2 {
    let r_sq = d.length_squared();
    if r_sq >= params.radius_max_sq {
        return Vec2::zero();
    }
    let r = r_sq.sqrt();
    if r < MIN_SEPARATION {
        return Vec2::zero();
    }
    let direction = d / r;

    if r < params.radius_min {
        let magnitude = params.repulsion_strength * (1.0 - r / params.radius_min);
        return -direction * magnitude;
    }

    let strength = interaction_strength(self_type, neighbor_type, matrix, params.force_symmetry);
    direction * (strength * band_profile(r, params))
}

//! Explicit Euler update with friction, speed cap, stiction and boundary handling.

use simulation_common::{BoundaryMode, SimParams, Vec2};

/// `v mod extent`, always in `[0, extent)`.
#[inline(always)]
pub fn wrap_coordinate(v: f32, extent: f32) -> f32 {
    let wrapped = v.rem_euclid(extent);
    // rem_euclid of a tiny negative value can round up to `extent` itself
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Reflects a coordinate that left `[0, extent]` and flips the matching velocity component.
#[inline(always)]
fn bounce_coordinate(pos: &mut f32, vel: &mut f32, extent: f32) {
    if *pos < 0.0 || *pos > extent {
        *vel = -*vel;
        *pos = pos.clamp(0.0, extent);
    }
}

/// Applies the per-particle update, in order:
/// velocity += force * dt, friction, speed cap, stiction, position += velocity * dt,
/// then the boundary. Returns the new `(position, velocity)`.
#[inline(always)]
pub fn integrate(position: Vec2, velocity: Vec2, net_force: Vec2, params: &SimParams) -> (Vec2, Vec2) {
    let mut vel = velocity + net_force * params.dt;
    vel = vel * (1.0 - params.friction);

    let speed = vel.length();
    if speed > params.max_velocity {
        vel = vel * (params.max_velocity / speed);
    }

    // Stiction reads the capped speed
    if params.damping_threshold > 0.0 && vel.length() < params.damping_threshold {
        vel = Vec2::zero();
    }

    let mut pos = position + vel * params.dt;
    match params.boundary {
        BoundaryMode::Wrap => {
            pos.x = wrap_coordinate(pos.x, params.world_width);
            pos.y = wrap_coordinate(pos.y, params.world_height);
        }
        BoundaryMode::Bounce => {
            bounce_coordinate(&mut pos.x, &mut vel.x, params.world_width);
            bounce_coordinate(&mut pos.y, &mut vel.y, params.world_height);
        }
    }
    (pos, vel)
}

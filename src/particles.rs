use anyhow::Result;
use rand::distr::Uniform;
use rand::prelude::*;
use rayon::prelude::*;
use simulation_common::Vec2;

/// Per-particle state in structure-of-arrays layout.
///
/// All vectors are index-aligned and have the same length for the whole run;
/// index `i` names one particle from initialization to the end.
#[derive(Debug)]
pub struct ParticleStore {
    pub positions_x: Vec<f32>,
    pub positions_y: Vec<f32>,
    pub velocities_x: Vec<f32>,
    pub velocities_y: Vec<f32>,
    pub types: Vec<u32>,
}

impl ParticleStore {
    /// Draws `count` uniform positions in `[0, width) x [0, height)`, then `count`
    /// type labels in `[0, type_count)`, all from `rng`. Velocities start at zero.
    pub fn initialize(
        count: u32,
        type_count: u32,
        rng: &mut StdRng,
        width: f32,
        height: f32,
    ) -> Result<Self> {
        if count == 0 {
            anyhow::bail!("Particle count must be greater than 0.");
        }
        if type_count == 0 {
            anyhow::bail!("Particle type count must be greater than 0.");
        }
        if !(width > 0.0 && height > 0.0) {
            anyhow::bail!("World dimensions must be positive (got {}x{}).", width, height);
        }

        let n = count as usize;
        let dist_x = Uniform::new(0.0f32, width)?;
        let dist_y = Uniform::new(0.0f32, height)?;
        let mut positions_x = Vec::with_capacity(n);
        let mut positions_y = Vec::with_capacity(n);
        for _ in 0..n {
            positions_x.push(rng.sample(&dist_x));
            positions_y.push(rng.sample(&dist_y));
        }

        let type_dist = Uniform::new(0u32, type_count)?;
        let types: Vec<u32> = (0..n).map(|_| rng.sample(&type_dist)).collect();

        log::info!("ParticleStore initialized with {} particles of {} types.", count, type_count);
        Ok(Self {
            positions_x,
            positions_y,
            velocities_x: vec![0.0; n],
            velocities_y: vec![0.0; n],
            types,
        })
    }

    /// Same as [`ParticleStore::initialize`] with a fresh generator seeded from `seed`.
    pub fn from_seed(count: u32, type_count: u32, seed: u64, width: f32, height: f32) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::initialize(count, type_count, &mut rng, width, height)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.positions_x.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.positions_x.is_empty()
    }

    #[inline(always)]
    pub fn position(&self, idx: usize) -> Vec2 {
        Vec2::new(self.positions_x[idx], self.positions_y[idx])
    }

    #[inline(always)]
    pub fn velocity(&self, idx: usize) -> Vec2 {
        Vec2::new(self.velocities_x[idx], self.velocities_y[idx])
    }

    #[inline(always)]
    pub fn particle_type(&self, idx: usize) -> u32 {
        self.types[idx]
    }

    /// Positions as `(x, y)` tuples, in particle order.
    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.positions_x.iter().copied().zip(self.positions_y.iter().copied()).collect()
    }

    pub fn mean_speed(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let total: f32 = (0..self.len())
            .into_par_iter()
            .map(|idx| self.velocity(idx).length())
            .sum();
        total / self.len() as f32
    }

    pub fn max_speed(&self) -> f32 {
        (0..self.len())
            .into_par_iter()
            .map(|idx| self.velocity(idx).length())
            .reduce(|| 0.0, f32::max)
    }

    /// Number of particles of each type in `0..type_count`.
    pub fn type_counts(&self, type_count: u32) -> Vec<u32> {
        let mut counts = vec![0u32; type_count as usize];
        for &t in &self.types {
            if let Some(count) = counts.get_mut(t as usize) {
                *count += 1;
            }
        }
        counts
    }
}

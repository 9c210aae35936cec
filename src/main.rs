use anyhow::Result;
use clap::Parser;
use log::{debug, info, trace, warn};
use particle_life::output::save_outputs;
use particle_life::ParticleLifeSimulation;
use simulation_common::SimulationConfig;
use std::path::PathBuf;
use std::time::Instant;

/// Headless particle life driver.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override `run.total_steps` from the configuration.
    #[arg(short, long)]
    steps: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger, defaulting to info level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Starting Particle Life Engine...");

    // --- Load Configuration ---
    let config = SimulationConfig::load(&args.config)?;
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = ParticleLifeSimulation::new(config)?;
    info!("Simulation initialized with {} particles.", sim.current_particle_count());
    debug!("Simulation Parameters: {:#?}", sim.params());

    let run = sim.config().run.clone();
    let total_steps = args.steps.unwrap_or(run.total_steps);
    let log_throttle = if run.log_throttle_steps == 0 {
        warn!("log_throttle_steps is 0; logging progress every 100 steps.");
        100
    } else {
        run.log_throttle_steps
    };
    let record_interval = run.record_interval_steps;

    // --- Initial Snapshot (step = 0) ---
    sim.record_snapshot();

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        sim.step();
        let step_duration = step_start_time.elapsed();

        let step_num = step + 1;
        let is_record_step = record_interval > 0 && step_num % record_interval == 0;
        let is_last_step = step_num == total_steps;

        if step_num % log_throttle == 0 || is_last_step {
            info!(
                "Step [{}/{}] | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step_num,
                total_steps,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            debug!("Step {} | Average Velocity: {:.4}", step_num, sim.particles().mean_speed());
        } else {
            trace!("Step [{}/{}] completed in {:.2} ms", step_num, total_steps, step_duration.as_secs_f64() * 1000.0);
        }

        if is_record_step || is_last_step {
            sim.record_snapshot();
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({:.3} ms/step).",
        total_duration.as_secs_f64(),
        if total_steps > 0 { total_duration.as_secs_f64() * 1000.0 / total_steps as f64 } else { 0.0 }
    );

    // --- Save Recorded Data ---
    info!("Saving recorded data...");
    save_outputs(&sim.config().output, sim.get_recorded_snapshots());

    info!("Simulation Complete.");
    Ok(())
}

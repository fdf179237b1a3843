use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, trace, warn};
use rand::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use particle_life_engine::{create_random_population, OrganismTemplate, SimulationConfig, Simulator, TelemetryRecord};

/// Headless particle-life run: seeds a random population and steps it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file. Defaults are used if it does not exist.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the number of steps to run.
    #[arg(short, long)]
    steps: Option<u32>,

    /// Override the population seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Particle Life Engine (headless)...");

    // --- Load Configuration ---
    let mut config = if args.config.exists() {
        SimulationConfig::load(&args.config)?
    } else {
        warn!("Config file '{}' not found, using defaults.", args.config.display());
        SimulationConfig::default()
    };
    if let Some(steps) = args.steps {
        config.run.total_steps = steps;
    }
    if let Some(seed) = args.seed {
        config.population.seed = seed;
    }

    // --- Initialize Simulation ---
    let params = config.get_sim_params();
    debug!("Simulation Parameters: {:#?}", params);
    let mut sim = Simulator::with_params(params).context("Failed to create simulator")?;

    let mut rng = StdRng::seed_from_u64(config.population.seed);
    let template = OrganismTemplate::from(&config.population);
    info!("Generating population of {} organisms...", config.population.organism_count);
    let population = create_random_population(
        config.population.organism_count as usize,
        config.population.max_population as usize,
        &template,
        &mut rng,
    )?;
    sim.add_organisms(population)?;
    info!(
        "Population registered: {} organisms, {} particles.",
        sim.organism_count(),
        sim.particle_count()
    );

    // --- Simulation Loop ---
    let total_steps = config.run.total_steps;
    let record_interval_steps = config.run.record_interval_steps.max(1);
    let mut records: Vec<TelemetryRecord> = vec![sim.telemetry()];

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        sim.step();
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if is_record_step || is_last_step {
            records.push(sim.telemetry());
        }

        if should_print_status || is_last_step {
            info!(
                "Step [{}/{}] | Particles: {} | Avg KE: {:.4} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.particle_count(),
                sim.compute_average_kinetic_energy(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({:.1} steps/s).",
        total_duration.as_secs_f64(),
        total_steps as f64 / total_duration.as_secs_f64().max(1e-9)
    );

    // --- Save Telemetry ---
    if config.output.save_telemetry {
        save_telemetry(&records, &config.output.base_filename, &config.output.format)?;
    } else {
        info!("Skipping telemetry export as per config (save_telemetry is false).");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn save_telemetry(records: &[TelemetryRecord], base_filename: &str, format: &str) -> Result<()> {
    match format {
        "json" => {
            let filename = format!("{}_telemetry.json", base_filename);
            let json_string = serde_json::to_string(records).context("Failed to serialize telemetry to JSON")?;
            let mut file = File::create(&filename)
                .with_context(|| format!("Failed to create telemetry file '{}'", filename))?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("Failed to write telemetry file '{}'", filename))?;
            info!("Telemetry ({} records) saved to {}", records.len(), filename);
        }
        _ => {
            let filename = format!("{}_telemetry.csv", base_filename);
            let mut writer = csv::Writer::from_path(&filename)
                .with_context(|| format!("Failed to create telemetry file '{}'", filename))?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
            info!("Telemetry ({} records) saved to {}", records.len(), filename);
        }
    }
    Ok(())
}

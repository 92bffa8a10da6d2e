use clap::{Parser, Subcommand};
use sensor_feature_alignment::data_loader::save_sensor_features;
use sensor_feature_alignment::io::{object_from_json, save_transformation};
use sensor_feature_alignment::synthetic::{SyntheticConfig, generate_sample_data};
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic multi-sensor feature dataset
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Generator configuration JSON
        #[arg(short, long)]
        config: Option<String>,

        /// Random seed, overrides the config
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Generate { output, config, seed } => {
            let mut config: SyntheticConfig = match config {
                Some(path) => object_from_json(path)?,
                None => SyntheticConfig::default(),
            };
            if let Some(seed) = seed {
                config.seed = seed;
            }
            generate_dataset(&output, &config)?;
        }
    }

    Ok(())
}

fn generate_dataset(
    output_dir: &str,
    config: &SyntheticConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;
    let data = generate_sample_data(config);
    save_sensor_features(Path::new(output_dir).join("sensors.json"), &data.sensors)?;

    // ground truth, to compare against the aligner's output
    let truth_dir = Path::new(output_dir).join("ground_truth");
    std::fs::create_dir_all(&truth_dir)?;
    for (sensor_id, transform) in data.ground_truth.iter() {
        save_transformation(sensor_id, transform, truth_dir.join(format!("{}.json", sensor_id)))?;
    }

    for (sensor_id, features) in data.sensors.iter() {
        log::info!("{}: {} features", sensor_id, features.len());
    }
    log::info!("generated dataset in {}", output_dir);
    Ok(())
}

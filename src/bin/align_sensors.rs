use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use sensor_feature_alignment::data_loader::{load_sensor_features, save_sensor_features};
use sensor_feature_alignment::io::{object_from_json, save_transformation, write_alignment_report};
use sensor_feature_alignment::{AlignerConfig, MultiSensorAligner, SensorMap, transform_features};

#[derive(Parser)]
#[command(version, about, author)]
struct SfaCli {
    /// path to sensor feature dataset (json)
    path: String,

    /// aligner config json, defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// output folder
    #[arg(short, long, default_value = "output")]
    output: String,

    /// features per sensor used for quality scoring
    #[arg(long, default_value = "100")]
    sample_size: usize,

    /// align sensors one after another
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = SfaCli::parse();

    let mut config: AlignerConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => AlignerConfig::default(),
    };
    if cli.sequential {
        config.parallel = false;
    }

    let sensor_features = load_sensor_features(&cli.path)?;
    for (sensor_id, features) in sensor_features.iter() {
        log::info!("{}: {} features", sensor_id, features.len());
    }

    let now = Instant::now();
    let mut aligner = MultiSensorAligner::new(config);
    let transforms = aligner.align_sensor_data(&sensor_features);
    log::info!("alignment took {:.6} sec", now.elapsed().as_secs_f64());

    let matcher = aligner.config().matcher();
    if let Some((reference_id, reference_features)) = sensor_features.first() {
        for (sensor_id, features) in sensor_features.iter().skip(1) {
            let Some(transform) = transforms.get(sensor_id) else {
                continue;
            };
            let moved = transform_features(features, transform);
            log::info!(
                "{}: {} / {} features within {} m of {}",
                sensor_id,
                matcher.match_nearby(&moved, reference_features).len(),
                features.len(),
                matcher.max_distance,
                reference_id
            );
        }
    }

    let fused = aligner.fuse_aligned_features(&sensor_features);
    log::info!("fused {} features from {} sensors", fused.len(), sensor_features.len());

    let quality = aligner.evaluate_alignment_quality(&sensor_features, cli.sample_size);
    for (sensor_id, error) in quality.iter() {
        log::info!("{}: avg error = {:.4} m", sensor_id, error);
    }

    let output = PathBuf::from(&cli.output);
    let transform_dir = output.join("transforms");
    std::fs::create_dir_all(&transform_dir)?;
    for (sensor_id, transform) in transforms.iter() {
        let path = transform_dir.join(format!("{}.json", sensor_id));
        save_transformation(sensor_id, transform, path)?;
    }

    let mut fused_map = SensorMap::new();
    fused_map.insert("fused", fused);
    save_sensor_features(output.join("fused.json"), &fused_map)?;
    write_alignment_report(
        output.join("report.json"),
        aligner.reference_sensor(),
        aligner.results(),
        &quality,
    )?;
    Ok(())
}

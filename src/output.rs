use anyhow::{Context, Result};
use log::{error, info};
use simulation_common::{OutputConfig, Snapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialization format for the recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    /// Parses the `output.format` setting. Unknown names fall back to JSON.
    pub fn from_config(format: Option<&str>) -> Self {
        match format.unwrap_or("json") {
            "json" => SnapshotFormat::Json,
            "bincode" => SnapshotFormat::Bincode,
            "messagepack" | "msgpack" => SnapshotFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                SnapshotFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes all snapshots to `path` in the given format.
pub fn write_snapshots(path: &Path, snapshots: &[Snapshot], format: SnapshotFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .context("Error serializing snapshots to JSON")?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .context("Error serializing snapshots to bincode")?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshots)
            .context("Error serializing snapshots to MessagePack")?,
    }
    writer.flush()?;
    Ok(())
}

/// Writes one CSV row of summary statistics per snapshot.
pub fn write_stats_csv(path: &Path, snapshots: &[Snapshot]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;

    let type_count = snapshots.first().map_or(0, |s| s.type_counts.len());
    let mut header = vec![
        "step".to_string(),
        "time".to_string(),
        "particles".to_string(),
        "mean_speed".to_string(),
        "max_speed".to_string(),
    ];
    header.extend((0..type_count).map(|t| format!("type_{}", t)));
    writer.write_record(&header)?;

    for snapshot in snapshots {
        let mut record = vec![
            snapshot.step.to_string(),
            format!("{:.4}", snapshot.time),
            snapshot.total_particle_count.to_string(),
            format!("{:.6}", snapshot.mean_speed),
            format!("{:.6}", snapshot.max_speed),
        ];
        record.extend(snapshot.type_counts.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Saves whatever the output section asks for. Failures are logged, not propagated.
pub fn save_outputs(output: &OutputConfig, snapshots: &[Snapshot]) -> Vec<PathBuf> {
    let mut written = Vec::new();

    if output.save_stats {
        let format = SnapshotFormat::from_config(output.format.as_deref());
        let path = PathBuf::from(format!("{}_snapshots.{}", output.base_filename, format.extension()));
        match write_snapshots(&path, snapshots, format) {
            Ok(()) => {
                info!("{} snapshots saved to {} ({:?} format)", snapshots.len(), path.display(), format);
                written.push(path);
            }
            Err(e) => error!("{:#}", e),
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_stats_csv {
        let path = PathBuf::from(format!("{}_stats.csv", output.base_filename));
        match write_stats_csv(&path, snapshots) {
            Ok(()) => {
                info!("Statistics saved to {}", path.display());
                written.push(path);
            }
            Err(e) => error!("{:#}", e),
        }
    }

    written
}

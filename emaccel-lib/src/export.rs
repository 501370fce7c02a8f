use crate::constants::EXPORT_HEADER;
use crate::error::Result;
use crate::extract::DataPoint;
use chrono::Utc;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write one header row and one row per data point
pub fn write_csv<W: io::Write>(writer: W, points: &[DataPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for point in points {
        let mut record = Vec::with_capacity(EXPORT_HEADER.len());
        record.push(point.time_micros.to_string());
        record.extend(point.states.iter().map(|s| s.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Export to `results<unix seconds>.csv` inside `dir`, returning the file path
pub fn export_to_dir(dir: impl AsRef<Path>, points: &[DataPoint]) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("results{}.csv", Utc::now().timestamp()));
    let file = File::create(&path)?;
    write_csv(file, points)?;
    info!(path = %path.display(), rows = points.len(), "Exported data points");
    Ok(path)
}

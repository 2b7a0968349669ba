use std::io::Write;

use anyhow::{Context, Result};
use lab_core::{MeasurementEntry, TimestampMs};
use serde::Serialize;

#[derive(Serialize)]
struct MeasurementRow<'a> {
    id: &'a str,
    apparatus_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    value: f64,
    timestamp: TimestampMs,
}

/// One CSV row per entry, in log order, under the header
/// `id,apparatus_id,type,value,timestamp`.
pub fn write_measurements_csv<W: Write>(writer: W, measurements: &[MeasurementEntry]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if measurements.is_empty() {
        csv.write_record(["id", "apparatus_id", "type", "value", "timestamp"])
            .context("writing measurement header")?;
    }
    for entry in measurements {
        csv.serialize(MeasurementRow {
            id: &entry.id.0,
            apparatus_id: &entry.apparatus_id.0,
            kind: entry.kind.name(),
            value: entry.value,
            timestamp: entry.timestamp,
        })
        .with_context(|| format!("writing measurement {}", entry.id))?;
    }
    csv.flush().context("flushing measurement csv")?;
    Ok(())
}

pub fn measurements_csv(measurements: &[MeasurementEntry]) -> Result<String> {
    let mut buffer = Vec::new();
    write_measurements_csv(&mut buffer, measurements)?;
    String::from_utf8(buffer).context("measurement csv is not UTF-8")
}

use super::runner::CubeReport;
use anyhow::Context;
use radarcube::telemetry::MetricsSnapshot;
use radarcube::Detection;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    /// `.csv` selects CSV, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ReportFormat::Csv,
            _ => ReportFormat::Json,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metrics: MetricsSnapshot,
    cubes: &'a [CubeReport],
}

pub fn write_report(
    path: &Path,
    reports: &[CubeReport],
    metrics: MetricsSnapshot,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("creating report {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match ReportFormat::from_path(path) {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(
                &mut writer,
                &JsonReport {
                    metrics,
                    cubes: reports,
                },
            )
            .context("serializing report")?;
            writeln!(writer)?;
        }
        ReportFormat::Csv => {
            writeln!(writer, "source,{}", Detection::CSV_HEADER)?;
            for report in reports {
                for detection in &report.report.detections {
                    writeln!(writer, "{},{}", report.source, detection.to_csv_row())?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// One-line summary per cube for the console.
pub fn summarize(report: &CubeReport) -> String {
    let best = report.report.detections.first().map_or_else(
        || "none".to_string(),
        |d| format!("{:.1} m / {:.2} m/s", d.range_m, d.velocity_mps),
    );
    format!(
        "{}: {} detections (strongest {}), {} degenerate cells",
        report.source,
        report.report.detections.len(),
        best,
        report.report.degenerate_cells
    )
}

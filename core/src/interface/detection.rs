use serde::{Deserialize, Serialize};

/// Target report for one CFAR-flagged range-Doppler cell.
///
/// `doppler_bin` indexes the zero-centered Doppler axis. Angle fields are
/// only populated when the extractor was given the full radar cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub range_bin: usize,
    pub doppler_bin: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_bin: Option<usize>,
    pub range_m: f64,
    pub velocity_mps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
    /// Cell value minus its adaptive threshold, in map units.
    pub confidence: f32,
    pub value: f32,
    pub threshold: f32,
}

impl Detection {
    pub const CSV_HEADER: &'static str =
        "range_bin,doppler_bin,angle_bin,range_m,velocity_mps,angle_deg,confidence,value,threshold";

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{:.3},{:.3},{},{:.4},{:.4},{:.4}",
            self.range_bin,
            self.doppler_bin,
            self.angle_bin.map(|b| b.to_string()).unwrap_or_default(),
            self.range_m,
            self.velocity_mps,
            self.angle_deg.map(|a| format!("{a:.2}")).unwrap_or_default(),
            self.confidence,
            self.value,
            self.threshold
        )
    }
}

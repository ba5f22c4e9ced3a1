//! Configuration shared by the cube-processing components.
//!
//! Defaults follow the 6 GHz FMCW analysis setup: 20 MHz chirps of 4.6 µs
//! repeated every 5 µs, sampled at 46 MHz on a four-channel receive array.

use crate::math::Window;
use crate::prelude::{invalid, RadarResult};
use crate::processing::{CfarConfig, ExtractorConfig};
use serde::{Deserialize, Serialize};

/// Scalar description of the radar that captured the cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParameters {
    pub center_frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub chirp_duration_s: f64,
    pub pulse_repetition_period_s: f64,
    pub sample_rate_hz: f64,
}

impl Default for RadarParameters {
    fn default() -> Self {
        Self {
            center_frequency_hz: 6.0e9,
            bandwidth_hz: 20.0e6,
            chirp_duration_s: 4.6e-6,
            pulse_repetition_period_s: 5.0e-6,
            sample_rate_hz: 46.0e6,
        }
    }
}

/// Amplitude taper applied to one cube axis before its FFT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaperConfig {
    Chebyshev { attenuation_db: f64 },
    Rectangular,
}

impl TaperConfig {
    pub fn build(&self, len: usize) -> RadarResult<Window> {
        match self {
            TaperConfig::Chebyshev { attenuation_db } => Window::chebyshev(len, *attenuation_db),
            TaperConfig::Rectangular => Window::rectangular(len),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub range: TaperConfig,
    pub doppler: TaperConfig,
    pub angle: TaperConfig,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            range: TaperConfig::Chebyshev {
                attenuation_db: 90.0,
            },
            doppler: TaperConfig::Chebyshev {
                attenuation_db: 60.0,
            },
            angle: TaperConfig::Chebyshev { attenuation_db: 6.0 },
        }
    }
}

/// Requested FFT lengths per axis; `None` keeps the input length.
///
/// CFAR guard and training widths are counted in output bins, so heavy
/// Doppler padding stretches the window main lobe past the guard cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftBins {
    pub range: Option<usize>,
    pub doppler: Option<usize>,
    pub angle: Option<usize>,
}

impl Default for FftBins {
    fn default() -> Self {
        Self {
            range: Some(256),
            doppler: Some(256),
            angle: Some(36),
        }
    }
}

impl FftBins {
    /// Output lengths equal to the input lengths (no zero padding).
    pub fn unpadded() -> Self {
        Self {
            range: None,
            doppler: None,
            angle: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeScale {
    /// `k * c / (2 * bandwidth)`. Only valid for an unpadded range FFT.
    Resolution,
    /// `k * max_range / bins` with `max_range = c * fs * chirp / (2 * bandwidth)`.
    MaxRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleScale {
    /// Bins spread linearly over the configured span.
    Linear,
    /// Arcsine of the spatial frequency of a half-wavelength linear array.
    Sine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub range_scale: RangeScale,
    pub angle_scale: AngleScale,
    pub angle_span_deg: [f64; 2],
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            range_scale: RangeScale::MaxRange,
            angle_scale: AngleScale::Sine,
            angle_span_deg: [-90.0, 90.0],
        }
    }
}

/// Everything needed to turn a captured cube into a detection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub radar: RadarParameters,
    pub windows: WindowConfig,
    pub bins: FftBins,
    pub axes: AxisConfig,
    pub cfar: CfarConfig,
    pub extractor: ExtractorConfig,
}

pub(crate) fn require_positive(name: &str, value: f64) -> RadarResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        invalid(format!("{name} must be positive, got {value}"))
    }
}

use crate::config::{require_positive, AngleScale, AxisConfig, RadarParameters, RangeScale};
use crate::math::fft::centered_index;
use crate::prelude::{invalid, RadarResult};
use serde::{Deserialize, Serialize};

/// Propagation speed used for every range and wavelength conversion.
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Physical labels for the bins of a (centered) radar cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Meters, ascending from zero.
    pub range_axis: Vec<f64>,
    /// Meters per second, ascending, zero at `len / 2`.
    pub doppler_axis: Vec<f64>,
    /// Degrees, ascending.
    pub angle_axis: Vec<f64>,
    pub range_resolution_m: f64,
    pub velocity_resolution_mps: f64,
    pub max_velocity_mps: f64,
}

impl AxisCalibration {
    pub fn range_bins(&self) -> usize {
        self.range_axis.len()
    }

    pub fn doppler_bins(&self) -> usize {
        self.doppler_axis.len()
    }

    pub fn angle_bins(&self) -> usize {
        self.angle_axis.len()
    }
}

/// Computes axis labels from scalar radar parameters; never looks at cube data.
#[derive(Debug, Clone)]
pub struct AxisCalibrator {
    radar: RadarParameters,
    axes: AxisConfig,
}

impl AxisCalibrator {
    pub fn new(radar: RadarParameters, axes: AxisConfig) -> RadarResult<Self> {
        require_positive("bandwidth", radar.bandwidth_hz)?;
        require_positive("pulse repetition period", radar.pulse_repetition_period_s)?;
        require_positive("center frequency", radar.center_frequency_hz)?;
        if axes.range_scale == RangeScale::MaxRange {
            require_positive("sample rate", radar.sample_rate_hz)?;
            require_positive("chirp duration", radar.chirp_duration_s)?;
        }
        let [start, end] = axes.angle_span_deg;
        if !(start.is_finite() && end.is_finite() && start < end) {
            return invalid(format!("angle span [{start}, {end}] must be ascending"));
        }
        Ok(Self { radar, axes })
    }

    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT / self.radar.center_frequency_hz
    }

    /// Distance covered by one range bin of an unpadded range FFT.
    pub fn range_resolution(&self) -> f64 {
        SPEED_OF_LIGHT / (2.0 * self.radar.bandwidth_hz)
    }

    /// Beat-frequency range at the IF sample rate.
    pub fn max_range(&self) -> f64 {
        SPEED_OF_LIGHT * self.radar.sample_rate_hz * self.radar.chirp_duration_s
            / self.radar.bandwidth_hz
            / 2.0
    }

    /// Unambiguous radial velocity, `wavelength / (4 * prp)`.
    pub fn max_velocity(&self) -> f64 {
        self.wavelength() / (4.0 * self.radar.pulse_repetition_period_s)
    }

    pub fn velocity_resolution(&self, doppler_bins: usize) -> f64 {
        2.0 * self.max_velocity() / doppler_bins as f64
    }

    pub fn range_axis(&self, bins: usize) -> Vec<f64> {
        let step = match self.axes.range_scale {
            RangeScale::Resolution => self.range_resolution(),
            RangeScale::MaxRange => self.max_range() / bins as f64,
        };
        (0..bins).map(|k| k as f64 * step).collect()
    }

    /// Velocities of the Doppler bins after `center_doppler_axis`: spans
    /// `[-v_max, v_max)` with the zero-velocity bin at `bins / 2`.
    pub fn doppler_axis(&self, bins: usize) -> Vec<f64> {
        let step = self.velocity_resolution(bins);
        let zero = centered_index(0, bins) as f64;
        (0..bins).map(|i| (i as f64 - zero) * step).collect()
    }

    pub fn angle_axis(&self, bins: usize) -> Vec<f64> {
        let [start, end] = self.axes.angle_span_deg;
        match self.axes.angle_scale {
            AngleScale::Linear => {
                if bins == 1 {
                    return vec![(start + end) / 2.0];
                }
                let step = (end - start) / (bins - 1) as f64;
                (0..bins).map(|i| start + i as f64 * step).collect()
            }
            AngleScale::Sine => {
                let zero = centered_index(0, bins) as f64;
                (0..bins)
                    .map(|i| {
                        // Cycles per element; a half-wavelength array maps
                        // +/-0.5 cycles onto +/-90 degrees.
                        let spatial = (i as f64 - zero) / bins as f64;
                        (2.0 * spatial).clamp(-1.0, 1.0).asin().to_degrees()
                    })
                    .collect()
            }
        }
    }

    pub fn calibrate(
        &self,
        range_bins: usize,
        doppler_bins: usize,
        angle_bins: usize,
    ) -> RadarResult<AxisCalibration> {
        if range_bins == 0 || doppler_bins == 0 || angle_bins == 0 {
            return invalid(format!(
                "bin counts must be positive, got range {range_bins}, doppler {doppler_bins}, angle {angle_bins}"
            ));
        }
        let range_axis = self.range_axis(range_bins);
        let range_resolution_m = range_axis.get(1).copied().unwrap_or(self.range_resolution());
        Ok(AxisCalibration {
            range_axis,
            doppler_axis: self.doppler_axis(doppler_bins),
            angle_axis: self.angle_axis(angle_bins),
            range_resolution_m,
            velocity_resolution_mps: self.velocity_resolution(doppler_bins),
            max_velocity_mps: self.max_velocity(),
        })
    }
}

use anyhow::{bail, Context};
use ndarray::Array3;
use num_complex::Complex32;
use radarcube::calibration::SPEED_OF_LIGHT;
use radarcube::config::RadarParameters;
use radarcube::IqCube;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Point reflector placed in a synthetic capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub range_m: f64,
    pub velocity_mps: f64,
    pub angle_deg: f64,
    pub amplitude: f64,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            range_m: 500.0,
            velocity_mps: 0.0,
            angle_deg: 0.0,
            amplitude: 1.0,
        }
    }
}

/// Configuration for generating a synthetic FMCW capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub channels: usize,
    pub pulses: usize,
    /// Samples per chirp; defaults to `sample_rate * chirp_duration`.
    pub samples: Option<usize>,
    /// Receive element spacing in wavelengths.
    pub element_spacing: f64,
    pub noise_std: f64,
    pub seed: u64,
    pub targets: Vec<TargetSpec>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            pulses: 128,
            samples: None,
            element_spacing: 0.5,
            noise_std: 0.0,
            seed: 0,
            targets: vec![
                TargetSpec {
                    range_m: 500.0,
                    velocity_mps: 10.0,
                    ..TargetSpec::default()
                },
                TargetSpec {
                    range_m: 1000.0,
                    amplitude: 0.5,
                    ..TargetSpec::default()
                },
            ],
        }
    }
}

impl ScenarioConfig {
    fn samples_per_chirp(&self, radar: &RadarParameters) -> usize {
        self.samples
            .unwrap_or_else(|| (radar.sample_rate_hz * radar.chirp_duration_s).round() as usize)
    }
}

/// Dechirped beat signal of every target plus complex Gaussian noise.
pub fn build_iq_cube(radar: &RadarParameters, scenario: &ScenarioConfig) -> anyhow::Result<IqCube> {
    let samples = scenario.samples_per_chirp(radar);
    if scenario.channels == 0 || scenario.pulses == 0 || samples == 0 {
        bail!(
            "scenario cube must be non-empty, got {}x{}x{}",
            scenario.channels,
            scenario.pulses,
            samples
        );
    }
    if !(radar.chirp_duration_s > 0.0 && radar.sample_rate_hz > 0.0) {
        bail!("chirp duration and sample rate must be positive to synthesize a capture");
    }

    let wavelength = SPEED_OF_LIGHT / radar.center_frequency_hz;
    let slope = radar.bandwidth_hz / radar.chirp_duration_s;
    let mut cube = Array3::<Complex32>::zeros((scenario.channels, scenario.pulses, samples));

    for target in &scenario.targets {
        let beat_hz = 2.0 * target.range_m * slope / SPEED_OF_LIGHT;
        let doppler_hz = 2.0 * target.velocity_mps / wavelength;
        let spatial = scenario.element_spacing * target.angle_deg.to_radians().sin();
        let carrier = 4.0 * PI * target.range_m / wavelength;

        for ((c, p, s), value) in cube.indexed_iter_mut() {
            let phase = carrier
                + 2.0
                    * PI
                    * (beat_hz * s as f64 / radar.sample_rate_hz
                        + doppler_hz * p as f64 * radar.pulse_repetition_period_s
                        + spatial * c as f64);
            *value += Complex32::new(
                (target.amplitude * phase.cos()) as f32,
                (target.amplitude * phase.sin()) as f32,
            );
        }
    }

    if scenario.noise_std > 0.0 {
        let normal = Normal::new(0.0, scenario.noise_std / 2f64.sqrt())
            .context("building noise distribution")?;
        let mut rng = StdRng::seed_from_u64(scenario.seed);
        for value in cube.iter_mut() {
            *value += Complex32::new(
                normal.sample(&mut rng) as f32,
                normal.sample(&mut rng) as f32,
            );
        }
    }

    IqCube::new(cube).context("assembling synthetic capture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_derives_sample_count_from_chirp() {
        let cube = build_iq_cube(&RadarParameters::default(), &ScenarioConfig::default()).unwrap();
        assert_eq!(cube.channels(), 4);
        assert_eq!(cube.pulses(), 128);
        // 46 MHz * 4.6 us
        assert_eq!(cube.samples(), 212);
    }

    #[test]
    fn generator_is_reproducible_for_a_seed() {
        let scenario = ScenarioConfig {
            pulses: 8,
            samples: Some(32),
            noise_std: 0.1,
            seed: 13,
            ..ScenarioConfig::default()
        };
        let radar = RadarParameters::default();
        let first = build_iq_cube(&radar, &scenario).unwrap();
        let second = build_iq_cube(&radar, &scenario).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_scenario_is_rejected() {
        let scenario = ScenarioConfig {
            channels: 0,
            ..ScenarioConfig::default()
        };
        assert!(build_iq_cube(&RadarParameters::default(), &scenario).is_err());
    }

    #[test]
    fn target_amplitude_sets_sample_magnitude() {
        let scenario = ScenarioConfig {
            channels: 1,
            pulses: 2,
            samples: Some(4),
            targets: vec![TargetSpec {
                amplitude: 2.0,
                ..TargetSpec::default()
            }],
            ..ScenarioConfig::default()
        };
        let cube = build_iq_cube(&RadarParameters::default(), &scenario).unwrap();
        for value in cube.view().iter() {
            assert!((value.norm() - 2.0).abs() < 1e-4);
        }
    }
}

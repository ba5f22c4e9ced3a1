use crate::generator::profile::ScenarioConfig;
use anyhow::Context;
use radarcube::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// YAML workflow: pipeline settings plus the synthetic scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub pipeline: PipelineConfig,
    pub scenario: ScenarioConfig,
}

/// Command-line values that take precedence over the YAML file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub range_bins: Option<usize>,
    pub doppler_bins: Option<usize>,
    pub angle_bins: Option<usize>,
    pub guard: Option<usize>,
    pub training: Option<usize>,
    pub pfa: Option<f64>,
    pub margin: Option<f32>,
    pub blanking: Option<usize>,
    pub cluster: Option<usize>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        let pipeline = &mut self.pipeline;
        if let Some(bins) = overrides.range_bins {
            pipeline.bins.range = Some(bins);
        }
        if let Some(bins) = overrides.doppler_bins {
            pipeline.bins.doppler = Some(bins);
        }
        if let Some(bins) = overrides.angle_bins {
            pipeline.bins.angle = Some(bins);
        }
        if let Some(guard) = overrides.guard {
            pipeline.cfar.guard = guard;
        }
        if let Some(training) = overrides.training {
            pipeline.cfar.training = training;
        }
        if let Some(pfa) = overrides.pfa {
            pipeline.cfar.pfa = pfa;
        }
        if let Some(margin) = overrides.margin {
            pipeline.cfar.margin = margin;
        }
        if let Some(blanking) = overrides.blanking {
            pipeline.extractor.near_range_blanking = blanking;
        }
        if let Some(separation) = overrides.cluster {
            pipeline.extractor.cluster_separation = Some(separation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcube::processing::MarginScale;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn overrides_replace_yaml_values() {
        let mut cfg = WorkflowConfig::default();
        cfg.apply(&Overrides {
            range_bins: Some(512),
            guard: Some(3),
            blanking: Some(0),
            ..Overrides::default()
        });
        assert_eq!(cfg.pipeline.bins.range, Some(512));
        assert_eq!(cfg.pipeline.bins.doppler, Some(256));
        assert_eq!(cfg.pipeline.cfar.guard, 3);
        assert_eq!(cfg.pipeline.extractor.near_range_blanking, 0);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"pipeline:\n  radar:\n    center_frequency_hz: 5.8e9\n  cfar:\n    guard: 1\n    margin_scale: decibel\n  windows:\n    angle:\n      kind: rectangular\nscenario:\n  pulses: 64\n  targets:\n    - range_m: 250.0\n      velocity_mps: -3.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.pipeline.radar.center_frequency_hz, 5.8e9);
        assert_eq!(cfg.pipeline.radar.bandwidth_hz, 20.0e6);
        assert_eq!(cfg.pipeline.cfar.guard, 1);
        assert_eq!(cfg.pipeline.cfar.training, 12);
        assert_eq!(cfg.pipeline.cfar.margin_scale, MarginScale::Decibel);
        assert_eq!(cfg.scenario.pulses, 64);
        assert_eq!(cfg.scenario.targets.len(), 1);
        assert_eq!(cfg.scenario.targets[0].amplitude, 1.0);
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}

use crate::calibration::AxisCalibration;
use crate::interface::Detection;
use crate::math::StatsHelper;
use crate::prelude::{invalid, mismatch, RadarResult};
use crate::processing::cfar::CfarOutput;
use crate::processing::cube::{PowerMap, Projection, RadarCube};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Leading range bins ignored to suppress transmit leakage.
    pub near_range_blanking: usize,
    /// Merge flagged cells closer than this many bins (Chebyshev distance),
    /// keeping the most confident one. `None` reports every flagged cell,
    /// including the main-lobe neighbours of every target.
    pub cluster_separation: Option<usize>,
    pub max_detections: Option<usize>,
    /// Look up the strongest angle bin of each detection in the radar cube.
    pub estimate_angle: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            near_range_blanking: 5,
            cluster_separation: Some(9),
            max_detections: None,
            estimate_angle: true,
        }
    }
}

/// Converts CFAR hits on a range-Doppler map into ranked target reports.
#[derive(Debug, Clone, Default)]
pub struct TargetExtractor {
    config: ExtractorConfig,
}

impl TargetExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(
        &self,
        map: &PowerMap,
        cfar: &CfarOutput,
        axes: &AxisCalibration,
    ) -> RadarResult<Vec<Detection>> {
        self.check_inputs(map, cfar, axes)?;
        let values = map.view();

        let mut detections: Vec<Detection> = cfar
            .flagged_cells()
            .filter(|&(_, range_bin)| range_bin >= self.config.near_range_blanking)
            .filter_map(|(doppler_bin, range_bin)| {
                let threshold = cfar.thresholds[[doppler_bin, range_bin]]?;
                let value = values[[doppler_bin, range_bin]];
                Some(Detection {
                    range_bin,
                    doppler_bin,
                    angle_bin: None,
                    range_m: axes.range_axis[range_bin],
                    velocity_mps: axes.doppler_axis[doppler_bin],
                    angle_deg: None,
                    confidence: value - threshold,
                    value,
                    threshold,
                })
            })
            .collect();

        rank(&mut detections);
        if let Some(separation) = self.config.cluster_separation {
            detections = cluster(detections, separation);
        }
        if let Some(limit) = self.config.max_detections {
            detections.truncate(limit);
        }
        Ok(detections)
    }

    /// As [`extract`](Self::extract), then tags each detection with the
    /// angle bin holding the most energy for its range-Doppler cell.
    pub fn extract_with_angles(
        &self,
        map: &PowerMap,
        cfar: &CfarOutput,
        axes: &AxisCalibration,
        cube: &RadarCube,
    ) -> RadarResult<Vec<Detection>> {
        if !cube.is_angle_centered() || !cube.is_doppler_centered() {
            return invalid("angle lookup needs a cube centered on both Doppler and angle axes");
        }
        if cube.angle_bins() != axes.angle_bins()
            || (cube.doppler_bins(), cube.range_bins()) != map.dim()
        {
            return mismatch(format!(
                "cube {}x{}x{} does not match {} angle bins and a {:?} map",
                cube.angle_bins(),
                cube.doppler_bins(),
                cube.range_bins(),
                axes.angle_bins(),
                map.dim()
            ));
        }

        let mut detections = self.extract(map, cfar, axes)?;
        for detection in detections.iter_mut() {
            let profile = cube.angle_profile(detection.doppler_bin, detection.range_bin);
            if let Some((bin, _)) = StatsHelper::peak(profile) {
                detection.angle_bin = Some(bin);
                detection.angle_deg = Some(axes.angle_axis[bin]);
            }
        }
        Ok(detections)
    }

    fn check_inputs(
        &self,
        map: &PowerMap,
        cfar: &CfarOutput,
        axes: &AxisCalibration,
    ) -> RadarResult<()> {
        if map.projection() != Projection::RangeDoppler {
            return invalid(format!(
                "target extraction needs a range-Doppler map, got {:?}",
                map.projection()
            ));
        }
        if !map.is_doppler_centered() {
            return invalid("range-Doppler map must be Doppler-centered before extraction");
        }
        let dim = map.dim();
        if cfar.mask.dim() != dim || cfar.thresholds.dim() != dim {
            return mismatch(format!(
                "CFAR output {:?} does not match map {:?}",
                cfar.mask.dim(),
                dim
            ));
        }
        if axes.doppler_bins() != dim.0 || axes.range_bins() != dim.1 {
            return mismatch(format!(
                "axes ({} doppler, {} range) do not label a {:?} map",
                axes.doppler_bins(),
                axes.range_bins(),
                dim
            ));
        }
        Ok(())
    }
}

/// Most confident first; ties fall back to bin order so output is stable.
fn rank(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then(a.doppler_bin.cmp(&b.doppler_bin))
            .then(a.range_bin.cmp(&b.range_bin))
    });
}

fn cluster(ranked: Vec<Detection>, separation: usize) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in ranked {
        let dominated = kept.iter().any(|k| {
            let dr = candidate.range_bin.abs_diff(k.range_bin);
            let dd = candidate.doppler_bin.abs_diff(k.doppler_bin);
            dr.max(dd) < separation
        });
        if !dominated {
            kept.push(candidate);
        }
    }
    kept
}

use crate::calibration::{AxisCalibration, AxisCalibrator};
use crate::config::{PipelineConfig, RangeScale};
use crate::interface::{CubeShape, Detection, IqCube};
use crate::prelude::RadarResult;
use crate::processing::{
    CfarDetector, CfarOutput, PowerMap, Projection, RadarCube, RadarCubeBuilder, TargetExtractor,
    WindowSet,
};
use crate::telemetry::PipelineMetrics;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Detection list plus the resolution figures needed to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub shape: CubeShape,
    pub detections: Vec<Detection>,
    pub degenerate_cells: usize,
    pub range_resolution_m: f64,
    pub velocity_resolution_mps: f64,
    pub max_velocity_mps: f64,
}

/// Report together with the intermediate products, for plotting collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: PipelineReport,
    pub cube: RadarCube,
    pub range_doppler: PowerMap,
    pub cfar: CfarOutput,
}

/// Builder, calibration, CFAR and extraction prepared for one configuration
/// and one input cube shape. Safe to share between threads.
pub struct RadarPipeline {
    config: PipelineConfig,
    builder: RadarCubeBuilder,
    calibration: Arc<AxisCalibration>,
    detector: CfarDetector,
    extractor: TargetExtractor,
    metrics: Arc<PipelineMetrics>,
}

impl RadarPipeline {
    pub fn new(config: PipelineConfig, shape: CubeShape) -> RadarResult<Self> {
        Self::with_metrics(config, shape, Arc::new(PipelineMetrics::new()))
    }

    pub fn with_metrics(
        config: PipelineConfig,
        shape: CubeShape,
        metrics: Arc<PipelineMetrics>,
    ) -> RadarResult<Self> {
        let detector = CfarDetector::new(config.cfar.clone())?;
        let calibrator = AxisCalibrator::new(config.radar.clone(), config.axes.clone())?;
        let windows = WindowSet::from_config(&config.windows, shape)?;
        let builder = RadarCubeBuilder::new(windows, config.bins)?;

        let range_bins = config.bins.range.unwrap_or(shape.samples);
        if config.axes.range_scale == RangeScale::Resolution && range_bins != shape.samples {
            warn!(
                "range FFT pads {} samples to {} bins but the axis is labelled at c/2B per bin; \
                 ranges will be scaled by {:.3}",
                shape.samples,
                range_bins,
                range_bins as f64 / shape.samples as f64
            );
        }
        let calibration = calibrator.calibrate(
            range_bins,
            config.bins.doppler.unwrap_or(shape.pulses),
            config.bins.angle.unwrap_or(shape.channels),
        )?;
        info!(
            "pipeline for {}x{}x{} cube: range res {:.3} m, velocity res {:.3} m/s, max velocity {:.2} m/s",
            shape.channels,
            shape.pulses,
            shape.samples,
            calibration.range_resolution_m,
            calibration.velocity_resolution_mps,
            calibration.max_velocity_mps
        );

        Ok(Self {
            extractor: TargetExtractor::new(config.extractor.clone()),
            config,
            builder,
            calibration: Arc::new(calibration),
            detector,
            metrics,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn shape(&self) -> CubeShape {
        self.builder.input_shape()
    }

    pub fn calibration(&self) -> &Arc<AxisCalibration> {
        &self.calibration
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn process(&self, iq: &IqCube) -> RadarResult<PipelineReport> {
        self.process_detailed(iq).map(|output| output.report)
    }

    pub fn process_detailed(&self, iq: &IqCube) -> RadarResult<PipelineOutput> {
        let result = self.run(iq);
        match &result {
            Ok(output) => self.metrics.record_cube(
                output.report.detections.len(),
                output.report.degenerate_cells,
            ),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    fn run(&self, iq: &IqCube) -> RadarResult<PipelineOutput> {
        let cube = self
            .builder
            .build(iq)?
            .center_doppler_axis()
            .center_angle_axis();
        let range_doppler = cube.project(Projection::RangeDoppler);
        let cfar = self.detector.run(range_doppler.view());

        let axes = self.calibration.as_ref();
        let detections = if self.config.extractor.estimate_angle {
            self.extractor
                .extract_with_angles(&range_doppler, &cfar, axes, &cube)?
        } else {
            self.extractor.extract(&range_doppler, &cfar, axes)?
        };
        info!(
            "processed cube {:?}: {} detections, {} flagged cells, {} degenerate cells",
            iq.shape(),
            detections.len(),
            cfar.detection_count(),
            cfar.degenerate_cells
        );

        let report = PipelineReport {
            shape: iq.shape(),
            detections,
            degenerate_cells: cfar.degenerate_cells,
            range_resolution_m: axes.range_resolution_m,
            velocity_resolution_mps: axes.velocity_resolution_mps,
            max_velocity_mps: axes.max_velocity_mps,
        };
        Ok(PipelineOutput {
            report,
            cube,
            range_doppler,
            cfar,
        })
    }
}

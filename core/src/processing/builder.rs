use crate::config::{FftBins, WindowConfig};
use crate::interface::{CubeShape, IqCube};
use crate::math::Window;
use crate::prelude::{mismatch, ProcessingStage, RadarResult};
use crate::processing::cube::RadarCube;
use crate::processing::stage::{AxisFftStage, StageKind};

/// Per-axis tapers for one input cube shape.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    pub range: Window,
    pub doppler: Window,
    pub angle: Window,
}

impl WindowSet {
    pub fn from_config(config: &WindowConfig, shape: CubeShape) -> RadarResult<Self> {
        Ok(Self {
            range: config.range.build(shape.samples)?,
            doppler: config.doppler.build(shape.pulses)?,
            angle: config.angle.build(shape.channels)?,
        })
    }

    /// Input shape these windows taper.
    pub fn shape(&self) -> CubeShape {
        CubeShape {
            channels: self.angle.len(),
            pulses: self.doppler.len(),
            samples: self.range.len(),
        }
    }
}

/// Runs the range, Doppler and angle FFT stages in that order.
///
/// The angle stage treats the channel axis as a uniform linear array; the
/// builder cannot check array geometry, so irregular layouts yield
/// meaningless angle bins.
pub struct RadarCubeBuilder {
    shape: CubeShape,
    stages: Vec<Box<dyn ProcessingStage>>,
}

impl RadarCubeBuilder {
    pub fn new(windows: WindowSet, bins: FftBins) -> RadarResult<Self> {
        let shape = windows.shape();
        let stages: Vec<Box<dyn ProcessingStage>> = vec![
            Box::new(AxisFftStage::new(StageKind::Range, windows.range, bins.range)?),
            Box::new(AxisFftStage::new(
                StageKind::Doppler,
                windows.doppler,
                bins.doppler,
            )?),
            Box::new(AxisFftStage::new(StageKind::Angle, windows.angle, bins.angle)?),
        ];
        Ok(Self { shape, stages })
    }

    pub fn input_shape(&self) -> CubeShape {
        self.shape
    }

    pub fn build(&self, iq: &IqCube) -> RadarResult<RadarCube> {
        let shape = iq.shape();
        if shape != self.shape {
            return mismatch(format!(
                "builder expects a {}x{}x{} cube, got {}x{}x{}",
                self.shape.channels,
                self.shape.pulses,
                self.shape.samples,
                shape.channels,
                shape.pulses,
                shape.samples
            ));
        }

        let spectrum = self
            .stages
            .iter()
            .try_fold(iq.view().to_owned(), |data, stage| stage.execute(data.view()))?;
        Ok(RadarCube::from_spectrum(spectrum))
    }
}

/// One-shot build with explicit windows and optional FFT lengths.
pub fn build_radar_cube(
    iq: &IqCube,
    range_window: &Window,
    doppler_window: &Window,
    angle_window: &Window,
    bins: FftBins,
) -> RadarResult<RadarCube> {
    let windows = WindowSet {
        range: range_window.clone(),
        doppler: doppler_window.clone(),
        angle: angle_window.clone(),
    };
    RadarCubeBuilder::new(windows, bins)?.build(iq)
}

use crate::math::{FftHelper, Window};
use crate::prelude::{mismatch, ProcessingStage, RadarResult};
use log::debug;
use ndarray::{Array3, ArrayView3, Axis, Zip};
use num_complex::Complex32;

/// Which cube axis a stage transforms. Axis indices are shared by the IQ
/// cube (channel, pulse, sample) and the radar cube (angle, Doppler, range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Range,
    Doppler,
    Angle,
}

impl StageKind {
    pub fn axis(self) -> Axis {
        match self {
            StageKind::Angle => Axis(0),
            StageKind::Doppler => Axis(1),
            StageKind::Range => Axis(2),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Range => "range",
            StageKind::Doppler => "doppler",
            StageKind::Angle => "angle",
        }
    }
}

/// Windowed, zero-padded FFT along a single cube axis.
pub struct AxisFftStage {
    kind: StageKind,
    window: Window,
    fft: FftHelper,
}

impl AxisFftStage {
    /// `bins` defaults to the window length; it may exceed the window length
    /// (zero padding) but never fall short of it.
    pub fn new(kind: StageKind, window: Window, bins: Option<usize>) -> RadarResult<Self> {
        let bins = bins.unwrap_or(window.len());
        if bins < window.len() {
            return mismatch(format!(
                "{} FFT length {} is shorter than its {}-sample input",
                kind.name(),
                bins,
                window.len()
            ));
        }
        Ok(Self {
            kind,
            fft: FftHelper::new(bins),
            window,
        })
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn input_len(&self) -> usize {
        self.window.len()
    }

    pub fn bins(&self) -> usize {
        self.fft.size()
    }
}

impl ProcessingStage for AxisFftStage {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn axis(&self) -> Axis {
        self.kind.axis()
    }

    fn execute(&self, data: ArrayView3<Complex32>) -> RadarResult<Array3<Complex32>> {
        let axis = self.axis();
        let input_len = data.len_of(axis);
        if input_len != self.window.len() {
            return mismatch(format!(
                "{} window has {} taps but the axis holds {} samples",
                self.name(),
                self.window.len(),
                input_len
            ));
        }

        let mut dim = data.raw_dim();
        dim[axis.index()] = self.fft.size();
        let mut output = Array3::zeros(dim);

        let taps = self.window.as_slice();
        let mut buffer = self.fft.buffer();
        let mut scratch = self.fft.scratch();
        Zip::from(data.lanes(axis))
            .and(output.lanes_mut(axis))
            .for_each(|lane, mut spectrum| {
                self.fft.windowed_forward(lane, taps, &mut buffer, &mut scratch);
                for (slot, value) in spectrum.iter_mut().zip(buffer.iter()) {
                    *slot = *value;
                }
            });

        debug!("{} stage: {:?} -> {:?}", self.name(), data.dim(), output.dim());
        Ok(output)
    }
}

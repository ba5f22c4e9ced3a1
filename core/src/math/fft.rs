use ndarray::ArrayView1;
use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps a planned `rustfft` transform for reuse across lanes.
///
/// The plan is immutable and thread-safe; callers own the working buffers so
/// a single helper can serve concurrent cube builds.
pub struct FftHelper {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn buffer(&self) -> Vec<Complex32> {
        vec![Complex32::zero(); self.size]
    }

    pub fn scratch(&self) -> Vec<Complex32> {
        vec![Complex32::zero(); self.fft.get_inplace_scratch_len()]
    }

    /// Tapers `lane` with `window`, zero-pads it to the planned size and
    /// transforms it into `buffer`.
    ///
    /// `lane` must not be longer than the planned size and `window` must be
    /// as long as `lane`.
    pub fn windowed_forward(
        &self,
        lane: ArrayView1<Complex32>,
        window: &[f32],
        buffer: &mut [Complex32],
        scratch: &mut [Complex32],
    ) {
        debug_assert_eq!(lane.len(), window.len());
        debug_assert!(lane.len() <= self.size);

        for (slot, (&sample, &weight)) in buffer.iter_mut().zip(lane.iter().zip(window)) {
            *slot = sample * weight;
        }
        for slot in buffer[lane.len()..].iter_mut() {
            *slot = Complex32::zero();
        }
        self.fft.process_with_scratch(buffer, scratch);
    }
}

/// Position of FFT bin `bin` after a zero-centering shift of an axis with
/// `len` bins (the zero-frequency bin lands on `len / 2`).
pub fn centered_index(bin: usize, len: usize) -> usize {
    (bin + len / 2) % len
}

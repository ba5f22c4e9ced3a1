use crate::prelude::{invalid, RadarResult};
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use std::sync::Arc;

/// Real, peak-normalized amplitude taper for one cube axis.
///
/// Coefficients live behind an `Arc` so one window can be handed to many
/// builders and worker threads without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    coefficients: Arc<[f32]>,
}

impl Window {
    /// Dolph-Chebyshev taper of length `n` whose sidelobes sit `attenuation_db`
    /// below the main lobe.
    pub fn chebyshev(n: usize, attenuation_db: f64) -> RadarResult<Self> {
        if n < 1 {
            return invalid("window length must be at least 1");
        }
        if !(attenuation_db > 0.0) || !attenuation_db.is_finite() {
            return invalid(format!(
                "window attenuation must be positive, got {attenuation_db}"
            ));
        }
        if n == 1 {
            return Ok(Self::from_coefficients(vec![1.0]));
        }

        let order = (n - 1) as f64;
        let ripple = 10f64.powf(attenuation_db / 20.0);
        let beta = (ripple.acosh() / order).cosh();
        let odd = n % 2 == 1;

        // Sample the Chebyshev polynomial on the frequency grid, then move
        // back to the time domain with a DFT.
        let mut spectrum: Vec<Complex64> = (0..n)
            .map(|k| {
                let x = beta * (PI * k as f64 / n as f64).cos();
                let value = chebyshev_poly(order, x, odd);
                if odd {
                    Complex64::new(value, 0.0)
                } else {
                    Complex64::from_polar(value, PI * k as f64 / n as f64)
                }
            })
            .collect();

        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut spectrum);
        let real: Vec<f64> = spectrum.iter().map(|c| c.re).collect();

        let taps: Vec<f64> = if odd {
            let half = (n + 1) / 2;
            real[1..half]
                .iter()
                .rev()
                .chain(real[..half].iter())
                .copied()
                .collect()
        } else {
            let half = n / 2 + 1;
            real[1..half]
                .iter()
                .rev()
                .chain(real[1..half].iter())
                .copied()
                .collect()
        };

        let peak = taps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(peak > 0.0) {
            return invalid(format!(
                "attenuation {attenuation_db} dB produced a degenerate window of length {n}"
            ));
        }

        Ok(Self::from_coefficients(
            taps.iter()
                .map(|&w| (w / peak).max(0.0) as f32)
                .collect(),
        ))
    }

    /// Flat (untapered) window.
    pub fn rectangular(n: usize) -> RadarResult<Self> {
        if n < 1 {
            return invalid("window length must be at least 1");
        }
        Ok(Self::from_coefficients(vec![1.0; n]))
    }

    fn from_coefficients(coefficients: Vec<f32>) -> Self {
        Self {
            coefficients: coefficients.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coefficients
    }

    /// Sum of the taps, i.e. the amplitude gain of a tone centred on a bin.
    pub fn coherent_gain(&self) -> f32 {
        self.coefficients.iter().sum()
    }
}

fn chebyshev_poly(order: f64, x: f64, odd_length: bool) -> f64 {
    if x > 1.0 {
        (order * x.acosh()).cosh()
    } else if x < -1.0 {
        let sign = if odd_length { 1.0 } else { -1.0 };
        sign * (order * (-x).acosh()).cosh()
    } else {
        (order * x.acos()).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn chebyshev_window_is_symmetric_and_peak_normalized() {
        for n in [2, 5, 16, 33] {
            let window = Window::chebyshev(n, 60.0).unwrap();
            let taps = window.as_slice();
            assert_eq!(taps.len(), n);
            let peak = taps.iter().copied().fold(f32::MIN, f32::max);
            assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-6);
            for i in 0..n {
                assert_abs_diff_eq!(taps[i], taps[n - 1 - i], epsilon = 1e-5);
                assert!(taps[i] >= 0.0);
            }
        }
    }

    #[test]
    fn chebyshev_window_matches_reference_values() {
        // chebwin(5, at=50)
        let expected = [0.20549422, 0.70104634, 1.0, 0.70104634, 0.20549422];
        let window = Window::chebyshev(5, 50.0).unwrap();
        for (tap, want) in window.as_slice().iter().zip(expected) {
            assert_abs_diff_eq!(*tap, want, epsilon = 1e-4);
        }
    }

    #[test]
    fn chebyshev_window_tapers_towards_edges() {
        let window = Window::chebyshev(64, 90.0).unwrap();
        let taps = window.as_slice();
        assert!(taps[0] < taps[16]);
        assert!(taps[16] < taps[31]);
    }

    #[test]
    fn single_tap_window_is_unity() {
        assert_eq!(Window::chebyshev(1, 30.0).unwrap().as_slice(), &[1.0]);
    }

    #[test]
    fn invalid_window_parameters_are_rejected() {
        assert!(Window::chebyshev(0, 60.0).is_err());
        assert!(Window::chebyshev(8, 0.0).is_err());
        assert!(Window::chebyshev(8, -3.0).is_err());
        assert!(Window::chebyshev(8, f64::NAN).is_err());
        assert!(Window::rectangular(0).is_err());
    }

    #[test]
    fn rectangular_window_has_full_gain() {
        let window = Window::rectangular(8).unwrap();
        assert_eq!(window.coherent_gain(), 8.0);
    }
}

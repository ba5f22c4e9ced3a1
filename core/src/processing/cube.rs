use crate::math::fft::centered_index;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// Amplitudes below this are clamped before converting to decibels.
const DB_FLOOR: f32 = 1e-12;

/// Complex output of the range/Doppler/angle FFT chain, indexed
/// (angle bin, Doppler bin, range bin).
#[derive(Debug, Clone, PartialEq)]
pub struct RadarCube {
    data: Array3<Complex32>,
    doppler_centered: bool,
    angle_centered: bool,
}

/// Two-axis view of the magnitude cube obtained by summing over the third.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Rows are Doppler bins, columns range bins (summed over angle).
    RangeDoppler,
    /// Rows are angle bins, columns range bins (summed over Doppler).
    AngleRange,
    /// Rows are angle bins, columns Doppler bins (summed over range).
    AngleDoppler,
}

impl Projection {
    fn collapsed_axis(self) -> Axis {
        match self {
            Projection::RangeDoppler => Axis(0),
            Projection::AngleRange => Axis(1),
            Projection::AngleDoppler => Axis(2),
        }
    }
}

impl RadarCube {
    pub(crate) fn from_spectrum(data: Array3<Complex32>) -> Self {
        Self {
            data,
            doppler_centered: false,
            angle_centered: false,
        }
    }

    pub fn angle_bins(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn doppler_bins(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn range_bins(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn view(&self) -> ArrayView3<'_, Complex32> {
        self.data.view()
    }

    pub fn is_doppler_centered(&self) -> bool {
        self.doppler_centered
    }

    pub fn is_angle_centered(&self) -> bool {
        self.angle_centered
    }

    /// Rotates the Doppler axis so zero velocity sits at `doppler_bins / 2`,
    /// matching the ascending axis produced by `AxisCalibrator::doppler_axis`.
    /// A cube that is already centered is returned unchanged.
    pub fn center_doppler_axis(mut self) -> Self {
        if !self.doppler_centered {
            self.data = shift_axis(&self.data, Axis(1));
            self.doppler_centered = true;
        }
        self
    }

    /// Same zero-centering for the spatial-frequency (angle) axis.
    pub fn center_angle_axis(mut self) -> Self {
        if !self.angle_centered {
            self.data = shift_axis(&self.data, Axis(0));
            self.angle_centered = true;
        }
        self
    }

    pub fn magnitude(&self) -> Array3<f32> {
        self.data.mapv(|v| v.norm())
    }

    pub fn project(&self, projection: Projection) -> PowerMap {
        PowerMap {
            values: self.magnitude().sum_axis(projection.collapsed_axis()),
            projection,
            doppler_centered: self.doppler_centered,
            angle_centered: self.angle_centered,
        }
    }

    /// Magnitudes along the angle axis for one range-Doppler cell.
    pub fn angle_profile(&self, doppler_bin: usize, range_bin: usize) -> Vec<f32> {
        self.data
            .slice(ndarray::s![.., doppler_bin, range_bin])
            .iter()
            .map(|v| v.norm())
            .collect()
    }
}

fn shift_axis(data: &Array3<Complex32>, axis: Axis) -> Array3<Complex32> {
    let len = data.len_of(axis);
    let mut shifted = Array3::zeros(data.raw_dim());
    for (bin, plane) in data.axis_iter(axis).enumerate() {
        shifted
            .index_axis_mut(axis, centered_index(bin, len))
            .assign(&plane);
    }
    shifted
}

/// Summed magnitude map handed to the CFAR detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerMap {
    values: Array2<f32>,
    projection: Projection,
    doppler_centered: bool,
    angle_centered: bool,
}

impl PowerMap {
    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.values.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn is_doppler_centered(&self) -> bool {
        self.doppler_centered
    }

    pub fn is_angle_centered(&self) -> bool {
        self.angle_centered
    }

    pub fn to_decibels(&self) -> Array2<f32> {
        self.values.mapv(|v| 20.0 * v.max(DB_FLOOR).log10())
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.values
    }
}

//! Radar cube processing: turns a captured (channel, pulse, sample) IQ cube
//! into a calibrated range-Doppler-angle cube and a ranked CA-CFAR
//! detection list.
//!
//! Each component validates its parameters up front and is a pure function
//! of its inputs, so windows, calibrations and whole pipelines can be shared
//! read-only between worker threads.

pub mod calibration;
pub mod config;
pub mod interface;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use calibration::{AxisCalibration, AxisCalibrator};
pub use config::PipelineConfig;
pub use interface::{CubeShape, Detection, IqCube};
pub use pipeline::{PipelineOutput, PipelineReport, RadarPipeline};
pub use prelude::{RadarError, RadarResult};

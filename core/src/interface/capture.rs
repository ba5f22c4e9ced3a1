use crate::prelude::{RadarError, RadarResult};
use ndarray::{Array3, ArrayView3};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"IQCB";
const VERSION: u32 = 1;

/// Dimensions of a captured cube: receive channels, pulses, range samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeShape {
    pub channels: usize,
    pub pulses: usize,
    pub samples: usize,
}

/// Captured baseband samples indexed (channel, pulse, range sample).
///
/// The cube is immutable once constructed; processing borrows it read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct IqCube {
    data: Array3<Complex32>,
}

impl IqCube {
    pub fn new(data: Array3<Complex32>) -> RadarResult<Self> {
        let (channels, pulses, samples) = data.dim();
        if channels == 0 || pulses == 0 || samples == 0 {
            return Err(RadarError::InvalidParameter(format!(
                "IQ cube dimensions must be positive, got {channels}x{pulses}x{samples}"
            )));
        }
        Ok(Self { data })
    }

    pub fn from_shape_vec(
        channels: usize,
        pulses: usize,
        samples: usize,
        values: Vec<Complex32>,
    ) -> RadarResult<Self> {
        let data = Array3::from_shape_vec((channels, pulses, samples), values).map_err(|err| {
            RadarError::DimensionMismatch(format!(
                "cannot shape samples into {channels}x{pulses}x{samples}: {err}"
            ))
        })?;
        Self::new(data)
    }

    pub fn zeros(channels: usize, pulses: usize, samples: usize) -> RadarResult<Self> {
        Self::new(Array3::zeros((channels, pulses, samples)))
    }

    pub fn channels(&self) -> usize {
        self.data.dim().0
    }

    pub fn pulses(&self) -> usize {
        self.data.dim().1
    }

    pub fn samples(&self) -> usize {
        self.data.dim().2
    }

    pub fn shape(&self) -> CubeShape {
        CubeShape {
            channels: self.channels(),
            pulses: self.pulses(),
            samples: self.samples(),
        }
    }

    pub fn view(&self) -> ArrayView3<'_, Complex32> {
        self.data.view()
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            data: self.data.mapv(|v| v * factor),
        }
    }

    /// Reads a capture blob: `IQCB` magic, version, the three dimensions as
    /// little-endian `u32`, then interleaved little-endian `f32` I/Q pairs.
    pub fn read_from<R: Read>(mut reader: R) -> RadarResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(RadarError::Format(format!("bad magic {magic:?}")));
        }
        let version = read_u32(&mut reader)?;
        if version != VERSION {
            return Err(RadarError::Format(format!(
                "unsupported capture version {version}"
            )));
        }
        let channels = read_u32(&mut reader)? as usize;
        let pulses = read_u32(&mut reader)? as usize;
        let samples = read_u32(&mut reader)? as usize;

        let count = channels
            .checked_mul(pulses)
            .and_then(|n| n.checked_mul(samples))
            .ok_or_else(|| RadarError::Format("capture dimensions overflow".into()))?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() != count * 8 {
            return Err(RadarError::Format(format!(
                "expected {} payload bytes for {channels}x{pulses}x{samples}, found {}",
                count * 8,
                payload.len()
            )));
        }

        let values = payload
            .chunks_exact(8)
            .map(|pair| {
                let re = f32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
                let im = f32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
                Complex32::new(re, im)
            })
            .collect();

        Self::from_shape_vec(channels, pulses, samples, values)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> RadarResult<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        for dim in [self.channels(), self.pulses(), self.samples()] {
            let dim = u32::try_from(dim)
                .map_err(|_| RadarError::Format(format!("dimension {dim} exceeds u32")))?;
            writer.write_all(&dim.to_le_bytes())?;
        }
        for value in self.data.iter() {
            writer.write_all(&value.re.to_le_bytes())?;
            writer.write_all(&value.im.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> RadarResult<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}

fn read_u32<R: Read>(reader: &mut R) -> RadarResult<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_cube() -> IqCube {
        let values = (0..2 * 3 * 4)
            .map(|i| Complex32::new(i as f32, -(i as f32) * 0.5))
            .collect();
        IqCube::from_shape_vec(2, 3, 4, values).unwrap()
    }

    #[test]
    fn capture_blob_preserves_shape_and_ordering() {
        let cube = ramp_cube();
        let mut blob = Vec::new();
        cube.write_to(&mut blob).unwrap();
        assert_eq!(blob.len(), 20 + 24 * 8);

        let restored = IqCube::read_from(blob.as_slice()).unwrap();
        assert_eq!(restored.channels(), 2);
        assert_eq!(restored.pulses(), 3);
        assert_eq!(restored.samples(), 4);
        assert_eq!(restored.view()[[1, 2, 3]], Complex32::new(23.0, -11.5));
    }

    #[test]
    fn truncated_capture_is_a_format_error() {
        let mut blob = Vec::new();
        ramp_cube().write_to(&mut blob).unwrap();
        blob.truncate(blob.len() - 3);
        assert!(matches!(
            IqCube::read_from(blob.as_slice()),
            Err(RadarError::Format(_))
        ));
    }

    #[test]
    fn foreign_magic_is_rejected() {
        let blob = b"NOPE\x01\x00\x00\x00".to_vec();
        assert!(matches!(
            IqCube::read_from(blob.as_slice()),
            Err(RadarError::Format(_))
        ));
    }

    #[test]
    fn empty_dimensions_are_invalid() {
        assert!(matches!(
            IqCube::zeros(0, 4, 4),
            Err(RadarError::InvalidParameter(_))
        ));
        assert!(matches!(
            IqCube::from_shape_vec(2, 2, 2, vec![Complex32::new(0.0, 0.0); 7]),
            Err(RadarError::DimensionMismatch(_))
        ));
    }
}

pub mod builder;
pub mod cfar;
pub mod cube;
pub mod extract;
pub mod stage;

pub use builder::{build_radar_cube, RadarCubeBuilder, WindowSet};
pub use cfar::{ca_alpha, CfarConfig, CfarDetector, CfarOutput, MarginScale};
pub use cube::{PowerMap, Projection, RadarCube};
pub use extract::{ExtractorConfig, TargetExtractor};
pub use stage::{AxisFftStage, StageKind};

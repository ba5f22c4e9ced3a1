pub mod capture;
pub mod detection;

pub use capture::{CubeShape, IqCube};
pub use detection::Detection;

pub mod frame_data;
pub mod synthetic;
pub mod video;

pub use frame_data::RgbFrame;
pub use synthetic::SyntheticSource;
pub use video::{CameraSource, CaptureTarget};

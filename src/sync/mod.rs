pub mod pacer;

pub use pacer::{FramePacer, Pace};

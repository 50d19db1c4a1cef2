pub mod capture;
pub mod config;
pub mod endpoints;
pub mod fps;
pub mod frame_pool;
pub mod index_channel;
pub mod pipeline;
pub mod render;
pub mod runner;
pub mod shutdown;
pub mod spin;

pub use capture::OverflowPolicy;
pub use config::PipelineConfig;
pub use endpoints::{FrameSink, FrameSource};
pub use runner::{run_pipeline, PipelineReport};
pub use shutdown::{install_interrupt_handler, ShutdownReason, ShutdownSignal};
pub use spin::SpinPolicy;

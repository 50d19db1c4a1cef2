pub mod cell;
pub mod display;
pub mod headless;
pub mod overlay;
pub mod processor;
pub mod terminal_sink;

pub use display::DisplayMode;
pub use headless::HeadlessSink;
pub use terminal_sink::{terminal_frame_size, TerminalSink};

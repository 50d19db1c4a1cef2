pub const APP_NAME: &str = "framepipe";

pub const CONFIG_FILE: &str = "framepipe.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

/// Number of reusable frame slots (and channel capacity).
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const MIN_POOL_SIZE: usize = 2;

/// Capture resolution requested from the camera.
pub const DEFAULT_FRAME_WIDTH: u32 = 940;
pub const DEFAULT_FRAME_HEIGHT: u32 = 720;
pub const DEFAULT_TARGET_FPS: f64 = 30.0;

pub const FPS_WINDOW_MS: u64 = 1000;

pub const CAPTURE_THREAD_NAME: &str = "capture";

/// FPS label colour (green) and its cell position on the terminal grid.
pub const OVERLAY_FG: (u8, u8, u8) = (0, 255, 0);
pub const OVERLAY_BG: (u8, u8, u8) = (0, 0, 0);
pub const OVERLAY_ORIGIN: (usize, usize) = (1, 0);

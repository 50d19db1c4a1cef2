use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::capture::OverflowPolicy;
use super::spin::SpinPolicy;
use crate::renderer::DisplayMode;
use crate::shared::constants;

/// Run settings. Every field has a default, so a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pool_size: usize,
    /// Capture resolution requested from the camera.
    pub width: u32,
    pub height: u32,
    pub target_fps: f64,
    pub fps_window_ms: u64,
    pub spin: SpinPolicy,
    pub overflow: OverflowPolicy,
    pub max_frames: Option<u64>,
    pub mode: DisplayMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool_size: constants::DEFAULT_POOL_SIZE,
            width: constants::DEFAULT_FRAME_WIDTH,
            height: constants::DEFAULT_FRAME_HEIGHT,
            target_fps: constants::DEFAULT_TARGET_FPS,
            fps_window_ms: constants::FPS_WINDOW_MS,
            spin: SpinPolicy::Auto,
            overflow: OverflowPolicy::Drop,
            max_frames: None,
            mode: DisplayMode::Rgb,
        }
    }
}

impl PipelineConfig {
    /// Reads `path` if given, otherwise `framepipe.json` in the working
    /// directory when it exists, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = std::env::current_dir()?.join(constants::CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size < constants::MIN_POOL_SIZE {
            bail!(
                "pool_size must be at least {} (got {})",
                constants::MIN_POOL_SIZE,
                self.pool_size
            );
        }
        if self.width == 0 || self.height == 0 {
            bail!("width and height must be non-zero (got {}x{})", self.width, self.height);
        }
        if self.fps_window_ms == 0 {
            bail!("fps_window_ms must be at least 1");
        }
        if self.target_fps.is_nan() || self.target_fps <= 0.0 {
            bail!("target_fps must be positive (got {})", self.target_fps);
        }
        Ok(())
    }

    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{ "pool_size": 4, "spin": "backoff" }"#).unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.spin, SpinPolicy::Backoff);
        assert_eq!(config.width, constants::DEFAULT_FRAME_WIDTH);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert_eq!(config.fps_window(), Duration::from_millis(1000));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(PipelineConfig::from_json(r#"{ "pool_size": 1 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "width": 0 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "fps_window_ms": 0 }"#).is_err());
        assert!(PipelineConfig::from_json(r#"{ "overflow": "overwrite" }"#).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("framepipe_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert!(PipelineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let path = std::env::temp_dir().join("framepipe_test_config.json");
        std::fs::write(&path, r#"{ "overflow": "wait", "max_frames": 120 }"#).unwrap();
        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.overflow, OverflowPolicy::Wait);
        assert_eq!(config.max_frames, Some(120));
        let _ = std::fs::remove_file(&path);
    }
}

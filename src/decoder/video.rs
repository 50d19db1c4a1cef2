use anyhow::{anyhow, bail, Context, Result};
use fast_image_resize as fr;
use fr::images::Image;
#[cfg(target_os = "macos")]
use opencv::core;
use opencv::{imgproc, prelude::*, videoio};
use std::path::PathBuf;

use super::frame_data::RgbFrame;
use crate::core::{FrameSource, PipelineConfig};
use crate::utils::logger;

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum CaptureTarget {
    Device(i32),
    File { path: PathBuf, looped: bool },
}

/// OpenCV-backed source for a camera or a video file.
///
/// Frames are converted BGR → RGB and scaled to fit the slot's fixed
/// dimensions, letterboxed in the centre.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    raw: Mat,
    rgb: Mat,
    resizer: fr::Resizer,
    target: CaptureTarget,
    sequence: u64,
}

impl CameraSource {
    /// Opens and configures the device or file. Fails if it cannot be opened,
    /// which is fatal for the run.
    pub fn open(target: &CaptureTarget, config: &PipelineConfig) -> Result<Self> {
        let mut capture = match target {
            CaptureTarget::Device(index) => {
                #[cfg(target_os = "linux")]
                let backend = videoio::CAP_V4L2;
                #[cfg(not(target_os = "linux"))]
                let backend = videoio::CAP_ANY;
                videoio::VideoCapture::new(*index, backend)
                    .with_context(|| format!("Failed to create capture for camera {}", index))?
            }
            CaptureTarget::File { path, .. } => {
                let path_str = path
                    .to_str()
                    .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {:?}", path))?;
                videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
                    .with_context(|| format!("Failed to create capture for {:?}", path))?
            }
        };

        if !capture.is_opened()? {
            let err_msg = match target {
                CaptureTarget::Device(index) => format!("Could not open camera {}", index),
                CaptureTarget::File { path, .. } => format!("Could not open video file {:?}", path),
            };
            logger::error(&err_msg);
            bail!(err_msg);
        }

        if let CaptureTarget::Device(_) = target {
            // Not every backend honours these; the letterbox step copes with
            // whatever size actually arrives.
            let mjpg = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')?;
            let _ = capture.set(videoio::CAP_PROP_FOURCC, f64::from(mjpg));
            let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(config.width));
            let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(config.height));
            let _ = capture.set(videoio::CAP_PROP_FPS, config.target_fps);
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        logger::info(&format!(
            "Capture opened: {:?} ({}x{} @ {:.2} fps)",
            target, width, height, fps
        ));

        Ok(Self {
            capture,
            raw: Mat::default(),
            rgb: Mat::default(),
            resizer: fr::Resizer::new(),
            target: target.clone(),
            sequence: 0,
        })
    }

    fn rewind_if_looping(&mut self) -> Result<()> {
        if let CaptureTarget::File { looped: true, .. } = self.target {
            self.capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?;
            logger::debug("End of video, rewinding");
        }
        Ok(())
    }
}

impl FrameSource<RgbFrame> for CameraSource {
    fn acquire_into(&mut self, frame: &mut RgbFrame) -> Result<bool> {
        if !self.capture.read(&mut self.raw)? || self.raw.empty() {
            self.rewind_if_looping()?;
            return Ok(false);
        }

        #[cfg(target_os = "macos")]
        imgproc::cvt_color(&self.raw, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0, core::AlgorithmHint::ALGO_HINT_DEFAULT)?;

        #[cfg(not(target_os = "macos"))]
        imgproc::cvt_color(&self.raw, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)?;

        if !self.rgb.is_continuous() {
            return Err(anyhow!("Frame is not continuous"));
        }

        let src_w = self.rgb.cols() as u32;
        let src_h = self.rgb.rows() as u32;
        let bytes = self.rgb.data_bytes()?;

        if src_w == frame.width && src_h == frame.height {
            frame.buffer.copy_from_slice(bytes);
        } else {
            let (fit_w, fit_h) = fit_within(src_w, src_h, frame.width, frame.height);
            let src_image = Image::from_vec_u8(src_w, src_h, bytes.to_vec(), fr::PixelType::U8x3)?;
            let mut dst_image = Image::new(fit_w, fit_h, fr::PixelType::U8x3);
            self.resizer.resize(&src_image, &mut dst_image, None)?;
            blit_centered(dst_image.buffer(), fit_w, fit_h, frame);
        }

        frame.sequence = self.sequence;
        self.sequence += 1;
        Ok(true)
    }
}

/// Largest size with the source's aspect ratio that fits in `max_w × max_h`.
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale_w = max_w as f64 / src_w as f64;
    let scale_h = max_h as f64 / src_h as f64;
    let scale = scale_w.min(scale_h);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Copies a `src_w × src_h` RGB24 image into the middle of `frame`, blacking
/// out the borders. `src` must not be larger than the frame.
pub fn blit_centered(src: &[u8], src_w: u32, src_h: u32, frame: &mut RgbFrame) {
    frame.buffer.fill(0);
    let x_off = ((frame.width - src_w.min(frame.width)) / 2) as usize;
    let y_off = ((frame.height - src_h.min(frame.height)) / 2) as usize;
    let row_len = src_w.min(frame.width) as usize * 3;
    let stride = frame.stride();

    for (y, src_row) in src.chunks_exact(src_w as usize * 3).take(frame.height as usize).enumerate() {
        let dst_start = (y_off + y) * stride + x_off * 3;
        if let Some(dst_row) = frame.buffer.get_mut(dst_start..dst_start + row_len) {
            dst_row.copy_from_slice(&src_row[..row_len]);
        }
    }
}

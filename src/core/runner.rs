use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::thread;
use std::time::Instant;

use super::capture::{CaptureLoop, CaptureStats};
use super::config::PipelineConfig;
use super::endpoints::{FrameSink, FrameSource};
use super::fps::{Clock, SystemClock};
use super::pipeline::FramePipeline;
use super::render::{RenderLoop, RenderSettings, RenderStats};
use super::shutdown::{ShutdownReason, ShutdownSignal};
use crate::shared::constants;
use crate::utils::logger;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub pool_size: usize,
    pub capture: CaptureStats,
    pub render: RenderStats,
    pub elapsed_secs: f64,
    pub shutdown: Option<ShutdownReason>,
}

/// Runs capture on a spawned thread and rendering on the calling thread until
/// `shutdown` is requested, then joins the capture thread.
///
/// The source is moved into the capture thread and dropped there, so it is
/// released before this returns. The sink stays with the caller, who should
/// drop it only after this returns.
pub fn run_pipeline<F, S, K>(
    config: &PipelineConfig,
    make_frame: impl FnMut() -> F,
    source: S,
    sink: &mut K,
    shutdown: ShutdownSignal,
) -> Result<PipelineReport>
where
    F: Send + 'static,
    S: FrameSource<F> + Send + 'static,
    K: FrameSink<F>,
{
    run_pipeline_with_clock(config, make_frame, source, sink, shutdown, SystemClock)
}

pub fn run_pipeline_with_clock<F, S, K, C>(
    config: &PipelineConfig,
    make_frame: impl FnMut() -> F,
    source: S,
    sink: &mut K,
    shutdown: ShutdownSignal,
    clock: C,
) -> Result<PipelineReport>
where
    F: Send + 'static,
    S: FrameSource<F> + Send + 'static,
    K: FrameSink<F>,
    C: Clock,
{
    config.validate()?;
    let started = Instant::now();
    let FramePipeline { capture, render } =
        FramePipeline::new(config.pool_size, make_frame, shutdown.clone())?;

    let mut capture_loop = CaptureLoop::new(capture, source, config.overflow, config.spin);
    let capture_handle = thread::Builder::new()
        .name(constants::CAPTURE_THREAD_NAME.to_string())
        .spawn(move || capture_loop.run())
        .context("Failed to spawn capture thread")?;

    let settings = RenderSettings {
        fps_window: config.fps_window(),
        spin: config.spin,
        max_frames: config.max_frames,
    };
    let render_stats = RenderLoop::new(render, sink, clock, settings).run();

    // The render loop only exits once shutdown is set, which the capture loop
    // also observes at its next iteration.
    let capture_stats = capture_handle
        .join()
        .map_err(|_| anyhow!("Capture thread panicked"))?;

    let report = PipelineReport {
        pool_size: config.pool_size,
        capture: capture_stats,
        render: render_stats,
        elapsed_secs: started.elapsed().as_secs_f64(),
        shutdown: shutdown.reason(),
    };
    logger::info(&format!(
        "Pipeline stopped ({:?}): rendered={} published={} dropped={}",
        report.shutdown, report.render.rendered, report.capture.published, report.capture.dropped_full
    ));
    Ok(report)
}

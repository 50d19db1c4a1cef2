mod core;
mod decoder;
mod renderer;
mod shared;
mod sync;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::{
    install_interrupt_handler, run_pipeline, OverflowPolicy, PipelineConfig, PipelineReport,
    ShutdownSignal, SpinPolicy,
};
use crate::decoder::{CameraSource, CaptureTarget, RgbFrame, SyntheticSource};
use crate::renderer::{terminal_frame_size, DisplayMode, HeadlessSink, TerminalSink};
use crate::utils::logger;

#[derive(Parser)]
#[command(author, version, about = "Lock-free capture/render frame pipeline", long_about = None)]
struct Cli {
    /// JSON config file (defaults to ./framepipe.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory for error.log and debug.log
    #[arg(long, global = true, default_value = ".")]
    log_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

/// Pipeline knobs shared by every subcommand; unset flags keep the config value.
#[derive(Args, Debug, Default)]
struct Tuning {
    #[arg(long)]
    pool_size: Option<usize>,
    #[arg(long, value_enum)]
    spin: Option<SpinPolicy>,
    #[arg(long, value_enum)]
    overflow: Option<OverflowPolicy>,
    /// Stop after rendering this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

impl Tuning {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(n) = self.pool_size {
            config.pool_size = n;
        }
        if let Some(spin) = self.spin {
            config.spin = spin;
        }
        if let Some(overflow) = self.overflow {
            config.overflow = overflow;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a camera or video file in the terminal
    Live {
        #[arg(short, long, default_value_t = 0)]
        device: i32,
        /// Read this video file instead of a camera
        #[arg(long)]
        file: Option<PathBuf>,
        /// Restart the file when it ends
        #[arg(long = "loop", requires = "file")]
        looped: bool,
        /// Requested capture width
        #[arg(short = 'W', long)]
        width: Option<u32>,
        /// Requested capture height
        #[arg(short = 'H', long)]
        height: Option<u32>,
        #[arg(short, long)]
        fps: Option<f64>,
        #[arg(short, long, value_enum)]
        mode: Option<DisplayMode>,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Show a generated test pattern in the terminal
    Synthetic {
        #[arg(short, long)]
        fps: Option<f64>,
        /// Make every K-th acquisition come back empty
        #[arg(long, value_name = "K")]
        flaky: Option<u64>,
        #[arg(short, long, value_enum)]
        mode: Option<DisplayMode>,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Run the synthetic source into a headless sink and report throughput
    Bench {
        #[arg(long, default_value_t = 600)]
        frames: u64,
        #[arg(short = 'W', long, default_value_t = 640)]
        width: u32,
        #[arg(short = 'H', long, default_value_t = 360)]
        height: u32,
        /// Pace the source; unpaced when omitted
        #[arg(short, long)]
        fps: Option<f64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        tuning: Tuning,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.log_dir);

    // A previous crash may have left the terminal raw.
    let _ = crossterm::terminal::disable_raw_mode();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    let shutdown = ShutdownSignal::new();
    install_interrupt_handler(&shutdown)?;

    match cli.command {
        Commands::Live { device, file, looped, width, height, fps, mode, tuning } => {
            tuning.apply(&mut config);
            if let Some(w) = width {
                config.width = w;
            }
            if let Some(h) = height {
                config.height = h;
            }
            if let Some(fps) = fps {
                config.target_fps = fps;
            }
            if let Some(mode) = mode {
                config.mode = mode;
            }
            config.validate()?;

            let target = match file {
                Some(path) => CaptureTarget::File { path, looped },
                None => CaptureTarget::Device(device),
            };
            let source = CameraSource::open(&target, &config)?;
            let report = run_in_terminal(&config, source, shutdown)?;
            print_summary(&report);
        }
        Commands::Synthetic { fps, flaky, mode, tuning } => {
            tuning.apply(&mut config);
            if let Some(fps) = fps {
                config.target_fps = fps;
            }
            if let Some(mode) = mode {
                config.mode = mode;
            }
            config.validate()?;

            let source = SyntheticSource::new(Some(config.target_fps), flaky)?;
            let report = run_in_terminal(&config, source, shutdown)?;
            print_summary(&report);
        }
        Commands::Bench { frames, width, height, fps, json, tuning } => {
            config.max_frames = Some(frames);
            tuning.apply(&mut config);
            config.width = width;
            config.height = height;

            let source = SyntheticSource::new(fps, None).context("Invalid --fps for bench")?;
            let mut sink = HeadlessSink::new();
            let report = run_pipeline(
                &config,
                || RgbFrame::new(width, height),
                source,
                &mut sink,
                shutdown,
            )?;

            if json {
                let out = serde_json::json!({ "report": report, "sink": sink });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_summary(&report);
                if sink.out_of_order > 0 {
                    println!("Out-of-order frames: {}", sink.out_of_order);
                }
            }
        }
    }

    Ok(())
}

/// Slot size for the current terminal: the largest 16:9 area that fits, with
/// an even pixel height so every text row gets two pixel rows.
fn terminal_slot_size() -> Result<(u32, u32)> {
    let (max_w, max_h) = terminal_frame_size()?;
    let (w, h) = decoder::video::fit_within(16, 9, max_w, max_h);
    Ok((w, (h & !1).max(2)))
}

fn run_in_terminal<S>(config: &PipelineConfig, source: S, shutdown: ShutdownSignal) -> Result<PipelineReport>
where
    S: crate::core::FrameSource<RgbFrame> + Send + 'static,
{
    let (w, h) = terminal_slot_size()?;
    logger::info(&format!("Terminal slot size: {}x{} ({:?})", w, h, config.mode));

    let mut sink = TerminalSink::new(config.mode, w, h)?;
    let report = run_pipeline(config, || RgbFrame::new(w, h), source, &mut sink, shutdown);
    // Restore the terminal before anything is printed.
    drop(sink);
    report
}

fn print_summary(report: &PipelineReport) {
    println!("=== Run Complete ===");
    println!("Pool size:        {}", report.pool_size);
    println!("Frames captured:  {}", report.capture.published);
    println!("Frames dropped:   {}", report.capture.dropped_full);
    println!("Empty frames:     {}", report.capture.empty_frames);
    println!("Source errors:    {}", report.capture.source_errors);
    println!("Frames rendered:  {}", report.render.rendered);
    println!("Sink errors:      {}", report.render.sink_errors);
    println!("Last FPS:         {:.0}", report.render.fps);
    println!("Elapsed:          {:.2}s", report.elapsed_secs);
    match report.shutdown {
        Some(reason) => println!("Stopped by:       {:?}", reason),
        None => println!("Stopped by:       unknown"),
    }
}

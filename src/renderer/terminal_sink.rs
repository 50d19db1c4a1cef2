use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyEventKind};
use std::time::Duration;

use super::cell::CellData;
use super::display::{DisplayManager, DisplayMode};
use super::overlay;
use super::processor::FrameProcessor;
use crate::core::FrameSink;
use crate::decoder::RgbFrame;
use crate::shared::constants;

/// Pixel size that fills the current terminal with half-block cells: one
/// column per pixel, two pixel rows per text row.
pub fn terminal_frame_size() -> Result<(u32, u32)> {
    let (cols, rows) = DisplayManager::terminal_size_chars()?;
    Ok((cols.max(1) as u32, (rows.max(1) as u32) * 2))
}

/// Renders frames as TrueColor half-blocks with an FPS label in the corner.
/// Any key press counts as a quit request.
pub struct TerminalSink {
    display: DisplayManager,
    processor: FrameProcessor,
    cells: Vec<CellData>,
}

impl TerminalSink {
    /// Takes over the terminal. Frames handed to `render` must be exactly
    /// `pixel_w × pixel_h`.
    pub fn new(mode: DisplayMode, pixel_w: u32, pixel_h: u32) -> Result<Self> {
        let processor = FrameProcessor::new(pixel_w as usize, pixel_h as usize);
        let cells = vec![CellData::default(); processor.cell_count()];
        let display = DisplayManager::new(mode)?;
        Ok(Self { display, processor, cells })
    }
}

impl FrameSink<RgbFrame> for TerminalSink {
    fn render(&mut self, frame: &mut RgbFrame, fps: f64) -> Result<()> {
        if frame.width as usize != self.processor.width || frame.height as usize != self.processor.height {
            bail!(
                "Frame is {}x{}, sink expects {}x{}",
                frame.width,
                frame.height,
                self.processor.width,
                self.processor.height
            );
        }

        self.processor.process_frame_into(&frame.buffer, &mut self.cells);
        overlay::draw_label(
            &mut self.cells,
            self.processor.width,
            constants::OVERLAY_ORIGIN,
            &overlay::fps_label(fps),
        );
        self.display.render_diff(&self.cells, self.processor.width)
    }

    fn poll_quit(&mut self) -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

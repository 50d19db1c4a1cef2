use anyhow::Result;
use serde::Serialize;

use crate::core::FrameSink;
use crate::decoder::RgbFrame;

/// Sink without a terminal, for benchmarks. It folds every frame into a
/// checksum so the pixel data is actually read.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HeadlessSink {
    pub frames: u64,
    pub checksum: u64,
    pub last_fps: f64,
    pub last_sequence: Option<u64>,
    pub out_of_order: u64,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink<RgbFrame> for HeadlessSink {
    fn render(&mut self, frame: &mut RgbFrame, fps: f64) -> Result<()> {
        // Sources number frames in publish order; anything else means a slot
        // was overwritten or replayed.
        if let Some(prev) = self.last_sequence {
            if frame.sequence <= prev {
                self.out_of_order += 1;
            }
        }
        self.last_sequence = Some(frame.sequence);

        self.checksum = frame
            .buffer
            .chunks(64)
            .fold(self.checksum, |acc, chunk| acc.rotate_left(5) ^ chunk.iter().map(|&b| b as u64).sum::<u64>());
        self.frames += 1;
        self.last_fps = fps;
        Ok(())
    }

    fn poll_quit(&mut self) -> Result<bool> {
        Ok(false)
    }
}

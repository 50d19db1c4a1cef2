use anyhow::Result;

use super::frame_data::RgbFrame;
use crate::core::FrameSource;
use crate::sync::{FramePacer, Pace};
use crate::utils::logger;

const BARS: [(u8, u8, u8); 8] = [
    (192, 192, 192),
    (192, 192, 0),
    (0, 192, 192),
    (0, 192, 0),
    (192, 0, 192),
    (192, 0, 0),
    (0, 0, 192),
    (16, 16, 16),
];

/// Scrolling colour bars with a sweeping white line, for running the pipeline
/// without a camera.
pub struct SyntheticSource {
    pacer: Option<FramePacer>,
    /// Every n-th acquisition comes back empty.
    empty_every: Option<u64>,
    calls: u64,
    sequence: u64,
}

impl SyntheticSource {
    /// `fps` of `None` produces frames as fast as they are asked for. A rate
    /// that cannot be paced is an error.
    pub fn new(fps: Option<f64>, empty_every: Option<u64>) -> Result<Self> {
        Ok(Self {
            pacer: fps.map(FramePacer::new).transpose()?,
            empty_every: empty_every.filter(|&n| n > 0),
            calls: 0,
            sequence: 0,
        })
    }

    fn draw(&self, frame: &mut RgbFrame) {
        let (w, h) = (frame.width, frame.height);
        if w == 0 || h == 0 {
            return;
        }
        let shift = (self.sequence * 2 % u64::from(w)) as u32;
        let sweep = (self.sequence % u64::from(h)) as u32;
        let stride = frame.stride();

        for (y, row) in frame.buffer.chunks_exact_mut(stride).enumerate() {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let color = if y as u32 == sweep {
                    (255, 255, 255)
                } else {
                    let bar = ((x as u32 + shift) % w) as usize * BARS.len() / w as usize;
                    BARS[bar]
                };
                px[0] = color.0;
                px[1] = color.1;
                px[2] = color.2;
            }
        }
    }
}

impl FrameSource<RgbFrame> for SyntheticSource {
    fn acquire_into(&mut self, frame: &mut RgbFrame) -> Result<bool> {
        self.calls += 1;
        if let Some(pacer) = self.pacer.as_mut() {
            if let Pace::Resynced { missed } = pacer.pace() {
                logger::debug(&format!(
                    "Synthetic source fell behind by {} frames ({:?} interval), resync #{}",
                    missed,
                    pacer.interval(),
                    pacer.resyncs()
                ));
            }
        }
        if let Some(n) = self.empty_every {
            if self.calls % n == 0 {
                return Ok(false);
            }
        }

        self.draw(frame);
        frame.sequence = self.sequence;
        self.sequence += 1;
        Ok(true)
    }
}

use rayon::prelude::*;
use super::cell::CellData;

const HALF_BLOCK: char = '▀';

/// Maps an RGB24 frame onto half-block cells: each cell shows two vertically
/// stacked pixels, the upper one as foreground and the lower as background.
pub struct FrameProcessor {
    pub width: usize,
    pub height: usize,
}

impl FrameProcessor {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> usize {
        self.width * (self.height / 2)
    }

    pub fn process_frame_into(&self, pixel_data: &[u8], cells: &mut [CellData]) {
        let w = self.width;
        if w == 0 || cells.len() != self.cell_count() {
            return;
        }

        let chunk_size = if cells.len() > 10000 {
            2000
        } else {
            (cells.len() / rayon::current_num_threads().max(1)).max(1)
        };

        let get_pixel = |x: usize, y: usize| -> (u8, u8, u8) {
            let offset = (y * w + x) * 3;
            match pixel_data.get(offset..offset + 3) {
                Some(px) => (px[0], px[1], px[2]),
                None => (0, 0, 0),
            }
        };

        cells
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let start_idx = chunk_idx * chunk_size;
                for (i, cell) in chunk.iter_mut().enumerate() {
                    let idx = start_idx + i;
                    let cx = idx % w;
                    let cy = idx / w;
                    *cell = CellData {
                        char: HALF_BLOCK,
                        fg: get_pixel(cx, cy * 2),
                        bg: get_pixel(cx, cy * 2 + 1),
                    };
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_frame_half_block() {
        let proc = FrameProcessor::new(2, 4);
        let mut frame = vec![0u8; 2 * 4 * 3];
        // Row 0 red, row 1 green, row 2 blue, row 3 yellow.
        for x in 0..2 {
            frame[x * 3] = 255;
            frame[6 + x * 3 + 1] = 255;
            frame[12 + x * 3 + 2] = 255;
            frame[18 + x * 3] = 255;
            frame[18 + x * 3 + 1] = 255;
        }

        let mut cells = vec![CellData::default(); proc.cell_count()];
        proc.process_frame_into(&frame, &mut cells);
        assert_eq!(cells.len(), 2 * 2);
        assert_eq!(cells[0].fg, (255, 0, 0));
        assert_eq!(cells[0].bg, (0, 255, 0));
        assert_eq!(cells[3].fg, (0, 0, 255));
        assert_eq!(cells[3].bg, (255, 255, 0));
        assert_eq!(cells[3].char, HALF_BLOCK);
    }

    #[test]
    fn test_mismatched_cell_buffer_is_left_alone() {
        let proc = FrameProcessor::new(2, 4);
        let mut cells = vec![CellData::default(); 3];
        proc.process_frame_into(&[255u8; 24], &mut cells);
        assert!(cells.iter().all(|c| *c == CellData::default()));
    }
}

/// Packed RGB24 image with fixed dimensions, used as a pool slot.
///
/// The buffer is allocated once at `width * height * 3` bytes and written in
/// place by the sources; it never grows.
#[derive(Clone)]
pub struct RgbFrame {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Source-assigned frame number.
    pub sequence: u64,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: vec![0u8; (width as usize) * (height as usize) * 3],
            width,
            height,
            sequence: 0,
        }
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(px) = self.buffer.get_mut(offset..offset + 3) {
            px[0] = rgb.0;
            px[1] = rgb.1;
            px[2] = rgb.2;
        }
    }

    #[allow(dead_code)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        self.buffer
            .get(offset..offset + 3)
            .map(|px| (px[0], px[1], px[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sized_for_rgb24() {
        let frame = RgbFrame::new(4, 3);
        assert_eq!(frame.buffer.len(), 36);
        assert_eq!(frame.stride(), 12);
    }

    #[test]
    fn test_out_of_bounds_pixels_are_ignored() {
        let mut frame = RgbFrame::new(2, 2);
        frame.put_pixel(1, 1, (9, 8, 7));
        frame.put_pixel(5, 5, (1, 1, 1));
        assert_eq!(frame.pixel(1, 1), Some((9, 8, 7)));
        assert_eq!(frame.pixel(5, 5), None);
    }
}

use super::cell::CellData;
use crate::shared::constants;

/// Writes `text` into the cell grid starting at `origin` (column, row),
/// clipped to the grid. Cells under the label become plain text cells.
pub fn draw_label(cells: &mut [CellData], width: usize, origin: (usize, usize), text: &str) {
    if width == 0 {
        return;
    }
    let (col, row) = origin;
    let rows = cells.len() / width;
    if row >= rows || col >= width {
        return;
    }

    let start = row * width + col;
    let room = width - col;
    for (cell, ch) in cells[start..start + room].iter_mut().zip(text.chars()) {
        *cell = CellData {
            char: ch,
            fg: constants::OVERLAY_FG,
            bg: constants::OVERLAY_BG,
        };
    }
}

pub fn fps_label(fps: f64) -> String {
    format!(" FPS: {} ", fps as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_clipped_to_row() {
        let mut cells = vec![CellData::default(); 6 * 2];
        draw_label(&mut cells, 6, (3, 1), "FPS: 30");
        let row: String = cells[6..].iter().map(|c| c.char).collect();
        assert_eq!(row, "   FPS");
        assert_eq!(cells[9].fg, constants::OVERLAY_FG);
        assert_eq!(cells[0], CellData::default());
    }

    #[test]
    fn test_label_outside_grid_is_ignored() {
        let mut cells = vec![CellData::default(); 4];
        draw_label(&mut cells, 2, (0, 5), "x");
        assert!(cells.iter().all(|c| *c == CellData::default()));
    }

    #[test]
    fn test_fps_label_truncates() {
        assert_eq!(fps_label(29.97), " FPS: 29 ");
    }
}

use anyhow::Result;
use crossterm::{
    cursor,
    style::Print,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Stdout, Write};

use super::cell::CellData;
use crate::utils::logger;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Ascii,
    #[default]
    Rgb,
}

const ASCII_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

fn ascii_for(rgb: (u8, u8, u8)) -> char {
    let luma = (rgb.0 as u32 * 299 + rgb.1 as u32 * 587 + rgb.2 as u32 * 114) / 1000;
    ASCII_RAMP[((luma * (ASCII_RAMP.len() as u32 - 1)) / 255) as usize]
}

/// Turns a cell grid into the escape sequences needed to bring the screen from
/// the previously encoded grid to this one.
pub struct CellDiffer {
    mode: DisplayMode,
    last_cells: Option<Vec<CellData>>,
}

impl CellDiffer {
    pub fn new(mode: DisplayMode) -> Self {
        Self { mode, last_cells: None }
    }

    /// Appends the update for `cells` to `out`, centred in a `term` sized
    /// screen (columns, rows). A grid of a different size forces a full
    /// redraw.
    pub fn encode(&mut self, cells: &[CellData], width: usize, term: (u16, u16), out: &mut Vec<u8>) {
        if width == 0 {
            return;
        }
        out.extend_from_slice(b"\x1b[?2026h");

        let force_redraw = self.last_cells.as_ref().map_or(true, |v| v.len() != cells.len());
        if force_redraw {
            out.extend_from_slice(b"\x1b[2J");
            self.last_cells = Some(vec![CellData::default(); cells.len()]);
        }
        let Some(last_cells) = self.last_cells.as_mut() else {
            return;
        };

        let (term_cols, term_rows) = term;
        let content_w = width as u16;
        let content_h = (cells.len() / width) as u16;
        let offset_x = term_cols.saturating_sub(content_w) / 2;
        let offset_y = term_rows.saturating_sub(content_h) / 2;

        let mut cursor: Option<(u16, u16)> = None;
        let mut last_fg = None;
        let mut last_bg = None;

        for (i, cell) in cells.iter().enumerate() {
            if !force_redraw && *cell == last_cells[i] {
                cursor = None;
                continue;
            }

            let x = (i % width) as u16 + offset_x;
            let y = (i / width) as u16 + offset_y;
            if x >= term_cols || y >= term_rows {
                cursor = None;
                continue;
            }

            if cursor != Some((x, y)) {
                let _ = write!(out, "\x1b[{};{}H", y + 1, x + 1);
            }

            let glyph = match self.mode {
                DisplayMode::Rgb => {
                    if last_fg != Some(cell.fg) {
                        let _ = write!(out, "\x1b[38;2;{};{};{}m", cell.fg.0, cell.fg.1, cell.fg.2);
                        last_fg = Some(cell.fg);
                    }
                    if last_bg != Some(cell.bg) {
                        let _ = write!(out, "\x1b[48;2;{};{};{}m", cell.bg.0, cell.bg.1, cell.bg.2);
                        last_bg = Some(cell.bg);
                    }
                    cell.char
                }
                // Overlay text keeps its glyph; pixel cells become a luma ramp.
                DisplayMode::Ascii if cell.char.is_ascii_graphic() || cell.char == ' ' => cell.char,
                DisplayMode::Ascii => ascii_for(cell.fg),
            };

            let mut utf8 = [0u8; 4];
            out.extend_from_slice(glyph.encode_utf8(&mut utf8).as_bytes());
            last_cells[i] = *cell;
            cursor = Some((x + 1, y));
        }

        out.extend_from_slice(b"\x1b[0m");
        out.extend_from_slice(b"\x1b[?2026l");
    }
}

/// Owns the terminal for the duration of a run: alternate screen, raw mode
/// and hidden cursor, all restored on drop.
pub struct DisplayManager {
    stdout: BufWriter<Stdout>,
    differ: CellDiffer,
    render_buffer: Vec<u8>,
}

impl DisplayManager {
    pub fn new(mode: DisplayMode) -> Result<Self> {
        let stdout = BufWriter::with_capacity(4 * 1024 * 1024, std::io::stdout());
        let mut dm = Self {
            stdout,
            differ: CellDiffer::new(mode),
            render_buffer: Vec::with_capacity(4 * 1024 * 1024),
        };
        dm.initialize_terminal()?;
        Ok(dm)
    }

    fn initialize_terminal(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.stdout.execute(EnterAlternateScreen)?;
        self.stdout.execute(cursor::Hide)?;
        // No autowrap, so the last column never scrolls the screen.
        self.stdout.execute(Print("\x1b[?7l"))?;
        Ok(())
    }

    /// Terminal size in character columns and rows. Some terminals report
    /// pixels; `CHAR_WIDTH`/`CHAR_HEIGHT` convert those back.
    pub fn terminal_size_chars() -> Result<(u16, u16)> {
        let (mut cols, mut rows) = terminal::size()?;
        if let (Ok(cw), Ok(ch)) = (std::env::var("CHAR_WIDTH"), std::env::var("CHAR_HEIGHT")) {
            if let (Ok(cw), Ok(ch)) = (cw.parse::<u16>(), ch.parse::<u16>()) {
                if cw > 0 && cols > cw * 16 {
                    cols = (cols / cw).max(1);
                }
                if ch > 0 && rows > ch * 8 {
                    rows = (rows / ch).max(1);
                }
            }
        }
        Ok((cols, rows))
    }

    pub fn render_diff(&mut self, cells: &[CellData], width: usize) -> Result<()> {
        let started = std::time::Instant::now();
        let term = Self::terminal_size_chars().unwrap_or((80, 24));

        self.render_buffer.clear();
        self.differ.encode(cells, width, term, &mut self.render_buffer);
        self.stdout.write_all(&self.render_buffer)?;
        self.stdout.flush()?;

        let elapsed = started.elapsed();
        if elapsed.as_millis() > 10 {
            logger::debug(&format!(
                "Slow render: {}us for {} cells ({} bytes)",
                elapsed.as_micros(),
                cells.len(),
                self.render_buffer.len()
            ));
        }
        Ok(())
    }
}

impl Drop for DisplayManager {
    fn drop(&mut self) {
        let _ = self.stdout.execute(Print("\x1b[?7h"));
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

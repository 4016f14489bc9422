// VGA Text Mode Driver
//
// Owns the 80x25 character/attribute grid that firmware maps at 0xB8000
// and the cursor that walks across it. This is the only output device the
// shell has; the serial port is reserved for logs.
//
// Key responsibilities:
// - Clear the grid to spaces on the default attribute
// - Place single cells without touching the cursor
// - Advance the cursor for teletype output
//
// Implementation details:
// - Each cell is a 16-bit value: ASCII byte + color attribute
// - `CellBuffer` separates the cursor logic from the memory it drives;
//   `VgaBuffer` is the volatile MMIO region, tests use a plain array
// - There is no scrolling: when output runs past the last row the whole
//   grid is erased and the cursor returns to (0, 0)
//
// Correctness notes:
// - All MMIO writes are volatile
// - Positioned writes are bounds-checked and rejected, never clamped
// - Cursor row and column stay inside the grid after every operation

use core::fmt;
use core::ptr;

pub const VGA_WIDTH: usize = 80;
pub const VGA_HEIGHT: usize = 25;
pub const VGA_CELLS: usize = VGA_WIDTH * VGA_HEIGHT;

const VGA_BUFFER_ADDR: usize = 0xB8000;

/// Light gray on black, used by `clear` and as the base color.
pub const DEFAULT_ATTRIBUTE: u8 = 0x07;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[inline]
pub const fn attribute(fg: Color, bg: Color) -> u8 {
    (bg as u8) << 4 | (fg as u8)
}

#[inline]
const fn make_vga_entry(c: u8, attr: u8) -> u16 {
    (attr as u16) << 8 | c as u16
}

/// Backing storage for the character grid.
pub trait CellBuffer {
    fn write_cell(&mut self, index: usize, entry: u16);
    fn read_cell(&self, index: usize) -> u16;
}

impl CellBuffer for [u16; VGA_CELLS] {
    fn write_cell(&mut self, index: usize, entry: u16) {
        self[index] = entry;
    }

    fn read_cell(&self, index: usize) -> u16 {
        self[index]
    }
}

/// The memory-mapped text buffer.
pub struct VgaBuffer {
    base: *mut u16,
}

impl VgaBuffer {
    /// # Safety
    ///
    /// The display adapter must be in 80x25 text mode with its buffer
    /// identity-mapped at 0xB8000, and this must be the only writer.
    pub const unsafe fn new() -> Self {
        VgaBuffer {
            base: VGA_BUFFER_ADDR as *mut u16,
        }
    }
}

impl CellBuffer for VgaBuffer {
    fn write_cell(&mut self, index: usize, entry: u16) {
        debug_assert!(index < VGA_CELLS);
        unsafe { ptr::write_volatile(self.base.add(index), entry) }
    }

    fn read_cell(&self, index: usize) -> u16 {
        debug_assert!(index < VGA_CELLS);
        unsafe { ptr::read_volatile(self.base.add(index)) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    OutOfBounds { x: usize, y: usize },
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::OutOfBounds { x, y } => {
                write!(f, "cell ({}, {}) is outside the {}x{} grid", x, y, VGA_WIDTH, VGA_HEIGHT)
            }
        }
    }
}

/// Text sink used by shell commands.
pub trait Console {
    fn write_str(&mut self, text: &str, attr: u8);
    fn write_byte(&mut self, byte: u8, attr: u8);
    fn clear(&mut self);
}

pub struct Display<B: CellBuffer> {
    buffer: B,
    row: usize,
    col: usize,
    base_attr: u8,
}

impl<B: CellBuffer> Display<B> {
    pub fn new(buffer: B) -> Self {
        Display {
            buffer,
            row: 0,
            col: 0,
            base_attr: DEFAULT_ATTRIBUTE,
        }
    }

    pub fn base_attribute(&self) -> u8 {
        self.base_attr
    }

    pub fn set_base_attribute(&mut self, attr: u8) {
        self.base_attr = attr;
    }

    /// Cursor position as (row, column).
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn clear(&mut self) {
        let blank = make_vga_entry(b' ', DEFAULT_ATTRIBUTE);
        for i in 0..VGA_CELLS {
            self.buffer.write_cell(i, blank);
        }
        self.row = 0;
        self.col = 0;
    }

    pub fn write_char_at(&mut self, c: u8, attr: u8, x: usize, y: usize) -> Result<(), DisplayError> {
        if x >= VGA_WIDTH || y >= VGA_HEIGHT {
            return Err(DisplayError::OutOfBounds { x, y });
        }
        self.buffer.write_cell(y * VGA_WIDTH + x, make_vga_entry(c, attr));
        Ok(())
    }

    pub fn write_char(&mut self, c: u8, attr: u8) {
        if c == b'\n' {
            self.col = 0;
            self.row += 1;
        } else {
            self.buffer
                .write_cell(self.row * VGA_WIDTH + self.col, make_vga_entry(c, attr));
            self.col += 1;
            if self.col >= VGA_WIDTH {
                self.col = 0;
                self.row += 1;
            }
        }

        if self.row >= VGA_HEIGHT {
            self.clear();
        }
    }

    pub fn write_string(&mut self, text: &str, attr: u8) {
        for byte in text.bytes() {
            self.write_char(byte, attr);
        }
    }

    /// Step the cursor back one cell and blank it. Returns false at (0, 0).
    pub fn erase_previous(&mut self, attr: u8) -> bool {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = VGA_WIDTH - 1;
        } else {
            return false;
        }
        self.buffer
            .write_cell(self.row * VGA_WIDTH + self.col, make_vga_entry(b' ', attr));
        true
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<(u8, u8)> {
        if x >= VGA_WIDTH || y >= VGA_HEIGHT {
            return None;
        }
        let entry = self.buffer.read_cell(y * VGA_WIDTH + x);
        Some((entry as u8, (entry >> 8) as u8))
    }
}

impl<B: CellBuffer> Console for Display<B> {
    fn write_str(&mut self, text: &str, attr: u8) {
        self.write_string(text, attr);
    }

    fn write_byte(&mut self, byte: u8, attr: u8) {
        self.write_char(byte, attr);
    }

    fn clear(&mut self) {
        Display::clear(self);
    }
}

impl<B: CellBuffer> fmt::Write for Display<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let attr = self.base_attr;
        self.write_string(s, attr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> Display<[u16; VGA_CELLS]> {
        let mut d = Display::new([0u16; VGA_CELLS]);
        d.clear();
        d
    }

    fn row_text(d: &Display<[u16; VGA_CELLS]>, row: usize) -> String {
        (0..VGA_WIDTH)
            .map(|x| d.char_at(x, row).map(|(c, _)| c as char).unwrap_or('?'))
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_clear_blanks_every_cell() {
        let mut d = Display::new([0xFFFFu16; VGA_CELLS]);
        d.clear();
        assert!(d.buffer().iter().all(|&e| e == 0x0720));
        assert_eq!(d.cursor(), (0, 0));
    }

    #[test]
    fn test_write_char_at_leaves_cursor() {
        let mut d = display();
        d.write_char_at(b'X', 0x1E, 79, 24).unwrap();
        assert_eq!(d.char_at(79, 24), Some((b'X', 0x1E)));
        assert_eq!(d.cursor(), (0, 0));
    }

    #[test]
    fn test_write_char_at_rejects_out_of_range() {
        let mut d = display();
        assert_eq!(
            d.write_char_at(b'X', 0x07, 80, 0),
            Err(DisplayError::OutOfBounds { x: 80, y: 0 })
        );
        assert_eq!(
            d.write_char_at(b'X', 0x07, 0, 25),
            Err(DisplayError::OutOfBounds { x: 0, y: 25 })
        );
    }

    #[test]
    fn test_newline_moves_to_next_row() {
        let mut d = display();
        d.write_string("ab\ncd", 0x0F);
        assert_eq!(row_text(&d, 0), "ab");
        assert_eq!(row_text(&d, 1), "cd");
        assert_eq!(d.cursor(), (1, 2));
    }

    #[test]
    fn test_column_wraps_into_next_row() {
        let mut d = display();
        for _ in 0..VGA_WIDTH {
            d.write_char(b'x', 0x07);
        }
        assert_eq!(d.cursor(), (1, 0));
        d.write_char(b'y', 0x07);
        assert_eq!(d.char_at(0, 1), Some((b'y', 0x07)));
    }

    #[test]
    fn test_row_overflow_erases_grid() {
        let mut d = display();
        for _ in 0..VGA_HEIGHT - 1 {
            d.write_char(b'\n', 0x07);
        }
        d.write_string("last", 0x07);
        assert_eq!(d.cursor(), (24, 4));
        d.write_char(b'\n', 0x07);
        assert_eq!(d.cursor(), (0, 0));
        assert_eq!(row_text(&d, 24), "");
    }

    #[test]
    fn test_cursor_stays_in_grid_for_long_output() {
        let mut d = display();
        let mut clears = 0;
        for i in 0..(VGA_CELLS * 3 + 17) {
            d.write_char(b'a' + (i % 26) as u8, 0x07);
            let (row, col) = d.cursor();
            assert!(row < VGA_HEIGHT);
            assert!(col < VGA_WIDTH);
            if (row, col) == (0, 0) {
                clears += 1;
            }
        }
        assert_eq!(clears, 3);
    }

    #[test]
    fn test_erase_previous_crosses_row_boundary() {
        let mut d = display();
        for _ in 0..VGA_WIDTH {
            d.write_char(b'z', 0x07);
        }
        assert!(d.erase_previous(0x07));
        assert_eq!(d.cursor(), (0, 79));
        assert_eq!(d.char_at(79, 0), Some((b' ', 0x07)));

        let mut fresh = display();
        assert!(!fresh.erase_previous(0x07));
    }
}

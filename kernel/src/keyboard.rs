// PS/2 Keyboard Driver (Polled)
//
// Reads set-1 scancodes straight from the 8042 controller by spinning on
// the status port, and turns them into an edited input line with echo on
// the VGA console.
//
// Key responsibilities:
// - Poll 0x64 for "output buffer full" and read codes from 0x60
// - Track a single shift flag shared by both shift keys
// - Translate make codes through the unshifted/shifted 128-entry tables
// - Handle backspace and Enter, echo everything else
// - Wait for the release of each accepted key before reading the next one
//
// Limitations:
// - One key at a time: the release wait expects releases in press order,
//   so true multi-key rollover is not supported
// - While a key is held nothing else is read
// - Extended (0xE0) sequences, Ctrl, Alt and Caps Lock are not modelled

use core::fmt;

use crate::port::{wait_status, PollBudget, PollTimeout, PortIo};
use crate::vga::{CellBuffer, Display};
use crate::log_debug;

const LOG_ORIGIN: &str = "keyboard";

pub const PS2_DATA_PORT: u16 = 0x60;
pub const PS2_STATUS_PORT: u16 = 0x64;
const STATUS_OUTPUT_FULL: u8 = 0x01;

pub const SC_LEFT_SHIFT: u8 = 0x2A;
pub const SC_RIGHT_SHIFT: u8 = 0x36;
pub const SC_LEFT_SHIFT_RELEASE: u8 = 0xAA;
pub const SC_RIGHT_SHIFT_RELEASE: u8 = 0xB6;
pub const SC_ENTER: u8 = 0x1C;
const BREAK_BIT: u8 = 0x80;

const BACKSPACE: u8 = 0x08;

#[rustfmt::skip]
static SCANCODE_TO_ASCII: [u8; 128] = {
    let mut t = [0u8; 128];
    let row: [u8; 59] = [
        0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', BACKSPACE,
        b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
        0, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`',
        0, b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ', 0,
    ];
    let mut i = 0;
    while i < row.len() {
        t[i] = row[i];
        i += 1;
    }
    t
};

#[rustfmt::skip]
static SCANCODE_TO_ASCII_SHIFT: [u8; 128] = {
    let mut t = [0u8; 128];
    let row: [u8; 59] = [
        0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', BACKSPACE,
        b'\t', b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n',
        0, b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~',
        0, b'|', b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ', 0,
    ];
    let mut i = 0;
    while i < row.len() {
        t[i] = row[i];
        i += 1;
    }
    t
};

/// A raw scancode split into press and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Make(u8),
    Break(u8),
}

impl KeyEvent {
    pub const fn from_scancode(code: u8) -> Self {
        if code & BREAK_BIT != 0 {
            KeyEvent::Break(code & !BREAK_BIT)
        } else {
            KeyEvent::Make(code)
        }
    }
}

/// Table lookup for a make code. Zero entries are unmapped keys.
pub fn decode(code: u8, shift: bool) -> Option<u8> {
    let table = if shift {
        &SCANCODE_TO_ASCII_SHIFT
    } else {
        &SCANCODE_TO_ASCII
    };
    match table.get(code as usize).copied() {
        Some(0) | None => None,
        Some(c) => Some(c),
    }
}

/// Fixed-capacity input line. Holds at most `N - 1` bytes.
pub struct LineBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        LineBuffer { bytes: [0; N], len: 0 }
    }

    pub const fn capacity(&self) -> usize {
        N.saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends `byte`, refusing when the line is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.bytes[self.len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Every byte pushed comes from the ASCII tables, so this only fails
    /// if the buffer was filled by other means.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a line read ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Entered,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardError {
    Timeout(PollTimeout),
}

impl From<PollTimeout> for KeyboardError {
    fn from(t: PollTimeout) -> Self {
        KeyboardError::Timeout(t)
    }
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyboardError::Timeout(t) => write!(f, "keyboard {}", t),
        }
    }
}

pub struct Keyboard<P: PortIo> {
    ports: P,
    budget: PollBudget,
}

impl<P: PortIo> Keyboard<P> {
    pub fn new(ports: P, budget: PollBudget) -> Self {
        Keyboard { ports, budget }
    }

    fn read_code(&mut self) -> Result<u8, KeyboardError> {
        wait_status(&mut self.ports, PS2_STATUS_PORT, self.budget, |s| {
            s & STATUS_OUTPUT_FULL != 0
        })?;
        Ok(self.ports.read_u8(PS2_DATA_PORT))
    }

    /// Block until a make code for a non-shift key arrives.
    fn next_make(&mut self, shift: &mut bool) -> Result<u8, KeyboardError> {
        loop {
            match self.read_code()? {
                SC_LEFT_SHIFT | SC_RIGHT_SHIFT => *shift = true,
                SC_LEFT_SHIFT_RELEASE | SC_RIGHT_SHIFT_RELEASE => *shift = false,
                0 => {}
                code => {
                    if let KeyEvent::Make(code) = KeyEvent::from_scancode(code) {
                        return Ok(code);
                    }
                }
            }
        }
    }

    fn wait_release(&mut self, code: u8) -> Result<(), KeyboardError> {
        loop {
            let release = self.read_code()?;
            if release & !BREAK_BIT == code {
                return Ok(());
            }
        }
    }

    /// Read one line into `line`, echoing with `attr`. The shift flag lives
    /// only for the duration of this call.
    pub fn read_line<B: CellBuffer, const N: usize>(
        &mut self,
        display: &mut Display<B>,
        line: &mut LineBuffer<N>,
        attr: u8,
    ) -> Result<LineStatus, KeyboardError> {
        line.clear();
        let mut shift = false;

        let status = loop {
            if line.is_full() {
                break LineStatus::Full;
            }

            let code = self.next_make(&mut shift)?;
            if code == SC_ENTER {
                break LineStatus::Entered;
            }

            match decode(code, shift) {
                Some(BACKSPACE) => {
                    if line.pop().is_some() {
                        display.erase_previous(attr);
                    }
                }
                Some(c) => {
                    if line.push(c) {
                        display.write_char(c, attr);
                    }
                }
                None => log_debug!(LOG_ORIGIN, "unmapped scancode 0x{:02X}", code),
            }

            self.wait_release(code)?;
        };

        display.write_char(b'\n', attr);
        Ok(status)
    }
}

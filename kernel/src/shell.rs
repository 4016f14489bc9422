// Console Shell
//
// The whole running system after boot: prompt, read a line from the
// keyboard, tokenize it, dispatch it, repeat. The shell owns the display,
// the keyboard and the disk; nothing else in the kernel touches them.
//
// Loop states:
//   PROMPT -> READ_LINE -> PARSE -> DISPATCH -> PROMPT
//
// An empty line skips DISPATCH. Nothing survives between iterations except
// what a command wrote to disk.

use crate::ata::AtaDrive;
use crate::build_info;
use crate::commands::{self, CommandContext, CommandResult};
use crate::config::ShellConfig;
use crate::keyboard::{Keyboard, KeyboardError, LineBuffer, LineStatus};
use crate::parser::parse_command;
use crate::port::PortIo;
use crate::vga::{CellBuffer, Display};
use crate::{log_debug, log_error, log_info, log_warn};

const LOG_ORIGIN: &str = "shell";

/// Input line size, terminator slot included.
pub const LINE_CAPACITY: usize = 100;

pub struct Shell<B: CellBuffer, K: PortIo, D: PortIo> {
    display: Display<B>,
    keyboard: Keyboard<K>,
    disk: AtaDrive<D>,
    config: ShellConfig,
    line: LineBuffer<LINE_CAPACITY>,
}

impl<B: CellBuffer, K: PortIo, D: PortIo> Shell<B, K, D> {
    pub fn new(
        display: Display<B>,
        keyboard: Keyboard<K>,
        disk: AtaDrive<D>,
        config: ShellConfig,
    ) -> Self {
        Shell {
            display,
            keyboard,
            disk,
            config,
            line: LineBuffer::new(),
        }
    }

    pub fn display(&self) -> &Display<B> {
        &self.display
    }

    pub fn disk(&self) -> &AtaDrive<D> {
        &self.disk
    }

    /// Clear the screen, print the banner and probe the disk once.
    pub fn boot(&mut self) {
        let palette = self.config.palette;
        self.display.set_base_attribute(palette.base);
        self.display.clear();
        self.display.write_string(build_info::BOOT_BANNER, palette.help);
        self.display.write_char(b'\n', palette.help);

        if let Err(e) = commands::report_drive(&mut self.display, &mut self.disk, &self.config) {
            log_warn!(LOG_ORIGIN, "drive probe failed: {}", e);
            self.display.write_string("Disk: probe failed\n", palette.error);
        }
        log_info!(LOG_ORIGIN, "shell ready");
    }

    /// One prompt/read/dispatch cycle. `Ok(None)` for an empty line.
    pub fn step(&mut self) -> Result<Option<CommandResult>, KeyboardError> {
        let palette = self.config.palette;
        self.display.write_string(self.config.prompt, palette.prompt);

        let status = self
            .keyboard
            .read_line(&mut self.display, &mut self.line, palette.input)?;
        if status == LineStatus::Full {
            log_debug!(LOG_ORIGIN, "input line truncated at {} bytes", self.line.len());
        }

        let cmd = match parse_command(self.line.as_str()) {
            Some(cmd) => cmd,
            None => return Ok(None),
        };

        let mut ctx = CommandContext {
            console: &mut self.display,
            disk: &mut self.disk,
            config: &self.config,
        };
        Ok(Some(commands::dispatch(&cmd, &mut ctx)))
    }

    pub fn run(&mut self) -> ! {
        loop {
            if let Err(e) = self.step() {
                log_error!(LOG_ORIGIN, "{}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PollBudget;
    use crate::sim::{SimDisk, SimKeyboard};
    use crate::vga::{VGA_CELLS, VGA_WIDTH};

    type TestShell = Shell<[u16; VGA_CELLS], SimKeyboard, SimDisk>;

    fn shell(typed: &str, disk: SimDisk) -> TestShell {
        Shell::new(
            Display::new([0u16; VGA_CELLS]),
            Keyboard::new(SimKeyboard::typing(typed), PollBudget::Spins(8)),
            AtaDrive::primary(disk, PollBudget::Spins(64)),
            ShellConfig::DEFAULT,
        )
    }

    fn row(shell: &TestShell, y: usize) -> String {
        (0..VGA_WIDTH)
            .filter_map(|x| shell.display().char_at(x, y))
            .map(|(c, _)| c as char)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn test_boot_prints_banner_and_drive() {
        let mut sh = shell("", SimDisk::new());
        sh.boot();
        assert_eq!(row(&sh, 0), build_info::BOOT_BANNER);
        assert_eq!(row(&sh, 1), "Disk: SIM HARDDISK, 20480 sectors (10 MiB)");
        assert_eq!(sh.display().cursor(), (2, 0));
    }

    #[test]
    fn test_boot_without_drive() {
        let mut sh = shell("", SimDisk::absent());
        sh.boot();
        assert_eq!(row(&sh, 1), "Disk: not detected");
    }

    #[test]
    fn test_echo_cycle_on_screen() {
        let mut sh = shell("echo hello world", SimDisk::new());
        sh.boot();
        assert_eq!(sh.step(), Ok(Some(CommandResult::Ok)));
        assert_eq!(row(&sh, 2), "$> echo hello world");
        assert_eq!(row(&sh, 3), "hello world");
        assert_eq!(sh.display().char_at(0, 2), Some((b'$', 0x02)));
        assert_eq!(sh.display().char_at(3, 2), Some((b'e', 0x0F)));
        assert_eq!(sh.display().cursor(), (4, 0));
    }

    #[test]
    fn test_empty_line_skips_dispatch() {
        let mut sh = shell("   ", SimDisk::new());
        sh.boot();
        assert_eq!(sh.step(), Ok(None));
        assert_eq!(row(&sh, 3), "");
    }

    #[test]
    fn test_unknown_command_in_red() {
        let mut sh = shell("Echo hi", SimDisk::new());
        sh.boot();
        assert_eq!(sh.step(), Ok(Some(CommandResult::NotFound)));
        assert_eq!(row(&sh, 3), "Unknown command");
        assert_eq!(sh.display().char_at(0, 3), Some((b'U', 0x0C)));
    }

    #[test]
    fn test_write_persists_across_cycles() {
        let mut sh = shell("write 5 hi\nread 5", SimDisk::new());
        sh.boot();
        assert_eq!(sh.step(), Ok(Some(CommandResult::Ok)));
        assert_eq!(&sh.disk().ports().sector(5)[..3], b"hi\0");
        assert_eq!(sh.step(), Ok(Some(CommandResult::Ok)));
        assert_eq!(row(&sh, 3), "$> read 5");
        assert_eq!(row(&sh, 4), "hi");
    }

    #[test]
    fn test_keyboard_timeout_surfaces() {
        let mut sh = shell("help", SimDisk::new());
        sh.boot();
        assert!(sh.step().is_ok());
        assert!(matches!(sh.step(), Err(KeyboardError::Timeout(_))));
    }

    #[test]
    fn test_clear_resets_screen() {
        let mut sh = shell("clear", SimDisk::new());
        sh.boot();
        assert_eq!(sh.step(), Ok(Some(CommandResult::Ok)));
        assert_eq!(sh.display().cursor(), (0, 0));
        assert_eq!(row(&sh, 0), "");
    }
}

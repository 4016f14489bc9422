// Kernel Configuration
//
// Compile-time configuration for the console. There is no configuration
// file or command line at this level, so every knob is a constant the
// entry point hands to the drivers and the shell.

use crate::log::LogLevel;
use crate::port::PollBudget;
use crate::vga::{attribute, Color, DEFAULT_ATTRIBUTE};

/// Attributes used by the shell for each kind of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub base: u8,
    pub prompt: u8,
    pub input: u8,
    pub output: u8,
    pub help: u8,
    pub error: u8,
}

impl Palette {
    pub const DEFAULT: Palette = Palette {
        base: DEFAULT_ATTRIBUTE,
        prompt: attribute(Color::Green, Color::Black),
        input: attribute(Color::White, Color::Black),
        output: attribute(Color::White, Color::Black),
        help: attribute(Color::Yellow, Color::Black),
        error: attribute(Color::LightRed, Color::Black),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: &'static str,
    /// Print "Wrong number of arguments" instead of folding arity errors
    /// into "Unknown command".
    pub report_arity: bool,
    pub palette: Palette,
}

impl ShellConfig {
    pub const DEFAULT: ShellConfig = ShellConfig {
        prompt: "$> ",
        report_arity: false,
        palette: Palette::DEFAULT,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Waiting for a human; never time out.
    pub keyboard_poll: PollBudget,
    pub disk_poll: PollBudget,
    pub log_level: LogLevel,
    pub shell: ShellConfig,
}

impl KernelConfig {
    pub const DEFAULT: KernelConfig = KernelConfig {
        keyboard_poll: PollBudget::Unbounded,
        disk_poll: PollBudget::Spins(1_000_000),
        log_level: LogLevel::Info,
        shell: ShellConfig::DEFAULT,
    };
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette_attributes() {
        let p = Palette::DEFAULT;
        assert_eq!(p.base, 0x07);
        assert_eq!(p.prompt, 0x02);
        assert_eq!(p.input, 0x0F);
        assert_eq!(p.help, 0x0E);
        assert_eq!(p.error, 0x0C);
    }

    #[test]
    fn test_disk_waits_are_bounded_by_default() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.keyboard_poll, PollBudget::Unbounded);
        assert!(matches!(cfg.disk_poll, PollBudget::Spins(n) if n > 0));
        assert!(!cfg.shell.report_arity);
    }
}

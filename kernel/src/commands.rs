// Commands Module
//
// Built-in shell commands and the dispatcher that runs them. A command name
// is resolved against the table first; only a resolved command has its
// argument count checked, so "unknown name" and "wrong arity" are separate
// outcomes even when the console shows the same text for both.

use core::fmt;

use crate::ata::{AtaDrive, AtaError, Lba, Sector, SECTOR_SIZE};
use crate::config::ShellConfig;
use crate::parser::{parse_block_number, Command};
use crate::port::PortIo;
use crate::vga::Console;
use crate::{log_info, log_warn};

const LOG_ORIGIN: &str = "shell";

/// Accepted argument counts for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Any,
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Any => true,
            Arity::Exactly(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Echo,
    Clear,
    Help,
    Read,
    Write,
    Disk,
}

pub struct CommandSpec {
    pub name: &'static str,
    pub builtin: Builtin,
    pub arity: Arity,
    pub usage: &'static str,
}

/// Dispatch order; `help` lists names in this order.
#[rustfmt::skip]
pub static COMMANDS: [CommandSpec; 6] = [
    CommandSpec { name: "echo", builtin: Builtin::Echo, arity: Arity::AtLeast(1), usage: "echo <text...>" },
    CommandSpec { name: "clear", builtin: Builtin::Clear, arity: Arity::Any, usage: "clear" },
    CommandSpec { name: "help", builtin: Builtin::Help, arity: Arity::Any, usage: "help" },
    CommandSpec { name: "read", builtin: Builtin::Read, arity: Arity::Exactly(1), usage: "read <lba>" },
    CommandSpec { name: "write", builtin: Builtin::Write, arity: Arity::Exactly(2), usage: "write <lba> <text>" },
    CommandSpec { name: "disk", builtin: Builtin::Disk, arity: Arity::Exactly(0), usage: "disk" },
];

/// Exact, case-sensitive lookup.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    InvalidBlockNumber,
    Disk(AtaError),
}

impl From<AtaError> for CommandError {
    fn from(e: AtaError) -> Self {
        CommandError::Disk(e)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidBlockNumber => write!(f, "Invalid block number"),
            CommandError::Disk(e) => write!(f, "Disk error: {}", e),
        }
    }
}

/// Result of command execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    NotFound,
    WrongArity { expected: Arity, got: usize },
    Failed(CommandError),
}

/// Resources a command may touch.
pub struct CommandContext<'a, C: Console, P: PortIo> {
    pub console: &'a mut C,
    pub disk: &'a mut AtaDrive<P>,
    pub config: &'a ShellConfig,
}

/// `fmt::Write` adapter that prints through a `Console` in one attribute.
pub struct ConsoleWriter<'a, C: Console> {
    console: &'a mut C,
    attr: u8,
}

impl<'a, C: Console> ConsoleWriter<'a, C> {
    pub fn new(console: &'a mut C, attr: u8) -> Self {
        ConsoleWriter { console, attr }
    }
}

impl<C: Console> fmt::Write for ConsoleWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.write_str(s, self.attr);
        Ok(())
    }
}

/// Resolve, check arity, run, and print any failure.
pub fn dispatch<C: Console, P: PortIo>(
    cmd: &Command<'_>,
    ctx: &mut CommandContext<'_, C, P>,
) -> CommandResult {
    let result = match lookup(cmd.name) {
        None => CommandResult::NotFound,
        Some(spec) if !spec.arity.accepts(cmd.argc()) => CommandResult::WrongArity {
            expected: spec.arity,
            got: cmd.argc(),
        },
        Some(spec) => match run(spec.builtin, cmd, ctx) {
            Ok(()) => CommandResult::Ok,
            Err(e) => CommandResult::Failed(e),
        },
    };

    report(&result, cmd, ctx);
    result
}

fn report<C: Console, P: PortIo>(
    result: &CommandResult,
    cmd: &Command<'_>,
    ctx: &mut CommandContext<'_, C, P>,
) {
    let error = ctx.config.palette.error;
    match result {
        CommandResult::Ok => {}
        CommandResult::NotFound => {
            log_info!(LOG_ORIGIN, "unknown command \"{}\"", cmd.name);
            ctx.console.write_str("Unknown command\n", error);
        }
        CommandResult::WrongArity { expected, got } => {
            log_info!(
                LOG_ORIGIN,
                "\"{}\" called with {} argument(s), expected {:?}",
                cmd.name,
                got,
                expected
            );
            if ctx.config.report_arity {
                use core::fmt::Write;
                let usage = lookup(cmd.name).map(|spec| spec.usage).unwrap_or(cmd.name);
                let _ = writeln!(
                    ConsoleWriter::new(ctx.console, error),
                    "Wrong number of arguments (usage: {})",
                    usage
                );
            } else {
                ctx.console.write_str("Unknown command\n", error);
            }
        }
        CommandResult::Failed(e) => {
            log_warn!(LOG_ORIGIN, "\"{}\" failed: {}", cmd.name, e);
            use core::fmt::Write;
            let _ = writeln!(ConsoleWriter::new(ctx.console, error), "{}", e);
        }
    }
}

fn run<C: Console, P: PortIo>(
    builtin: Builtin,
    cmd: &Command<'_>,
    ctx: &mut CommandContext<'_, C, P>,
) -> Result<(), CommandError> {
    match builtin {
        Builtin::Echo => {
            cmd_echo(cmd, ctx);
            Ok(())
        }
        Builtin::Clear => {
            ctx.console.clear();
            Ok(())
        }
        Builtin::Help => {
            cmd_help(ctx);
            Ok(())
        }
        Builtin::Read => cmd_read(cmd, ctx),
        Builtin::Write => cmd_write(cmd, ctx),
        Builtin::Disk => {
            report_drive(ctx.console, ctx.disk, ctx.config)?;
            Ok(())
        }
    }
}

/// Each argument is followed by a space, then the line ends.
fn cmd_echo<C: Console, P: PortIo>(cmd: &Command<'_>, ctx: &mut CommandContext<'_, C, P>) {
    let attr = ctx.config.palette.output;
    for arg in cmd.args() {
        ctx.console.write_str(arg, attr);
        ctx.console.write_str(" ", attr);
    }
    ctx.console.write_str("\n", attr);
}

fn cmd_help<C: Console, P: PortIo>(ctx: &mut CommandContext<'_, C, P>) {
    let attr = ctx.config.palette.help;
    ctx.console.write_str("Available commands: ", attr);
    for (i, spec) in COMMANDS.iter().enumerate() {
        if i > 0 {
            ctx.console.write_str(", ", attr);
        }
        ctx.console.write_str(spec.name, attr);
    }
    ctx.console.write_str("\n", attr);
}

fn block_arg(text: Option<&str>) -> Result<Lba, CommandError> {
    text.and_then(parse_block_number)
        .and_then(Lba::new)
        .ok_or(CommandError::InvalidBlockNumber)
}

/// Print the printable ASCII bytes of a sector; everything else is skipped.
fn cmd_read<C: Console, P: PortIo>(
    cmd: &Command<'_>,
    ctx: &mut CommandContext<'_, C, P>,
) -> Result<(), CommandError> {
    let lba = block_arg(cmd.arg(0))?;
    let mut sector: Sector = [0; SECTOR_SIZE];
    ctx.disk.read_sector(lba, &mut sector)?;

    let attr = ctx.config.palette.output;
    let mut printed = false;
    for &byte in sector.iter().filter(|b| (0x20..=0x7E).contains(*b)) {
        ctx.console.write_byte(byte, attr);
        printed = true;
    }
    if printed {
        ctx.console.write_str("\n", attr);
    }
    Ok(())
}

/// Store the text argument zero-padded (or truncated) to one sector.
fn cmd_write<C: Console, P: PortIo>(
    cmd: &Command<'_>,
    ctx: &mut CommandContext<'_, C, P>,
) -> Result<(), CommandError> {
    let lba = block_arg(cmd.arg(0))?;
    let text = cmd.arg(1).unwrap_or("").as_bytes();

    let mut sector: Sector = [0; SECTOR_SIZE];
    let n = text.len().min(SECTOR_SIZE);
    sector[..n].copy_from_slice(&text[..n]);

    ctx.disk.write_sector(lba, &sector)?;
    log_info!(LOG_ORIGIN, "wrote {} byte(s) to sector {}", n, lba);
    Ok(())
}

/// Print what IDENTIFY reports about the primary master.
pub fn report_drive<C: Console, P: PortIo>(
    console: &mut C,
    disk: &mut AtaDrive<P>,
    config: &ShellConfig,
) -> Result<(), AtaError> {
    use core::fmt::Write;

    let attr = config.palette.output;
    match disk.identify()? {
        Some(info) => {
            let _ = writeln!(
                ConsoleWriter::new(console, attr),
                "Disk: {}, {} sectors ({} MiB)",
                info.model_str(),
                info.total_sectors,
                info.capacity_mib()
            );
        }
        None => console.write_str("Disk: not detected\n", attr),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_command;
    use crate::port::PollBudget;
    use crate::sim::SimDisk;

    #[derive(Default)]
    struct Transcript {
        text: String,
        clears: usize,
    }

    impl Console for Transcript {
        fn write_str(&mut self, text: &str, _attr: u8) {
            self.text.push_str(text);
        }

        fn write_byte(&mut self, byte: u8, _attr: u8) {
            self.text.push(byte as char);
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.text.clear();
        }
    }

    struct Harness {
        out: Transcript,
        disk: AtaDrive<SimDisk>,
        config: ShellConfig,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                out: Transcript::default(),
                disk: AtaDrive::primary(SimDisk::new(), PollBudget::Spins(64)),
                config: ShellConfig::DEFAULT,
            }
        }

        fn run(&mut self, line: &str) -> CommandResult {
            let cmd = parse_command(line).unwrap();
            let mut ctx = CommandContext {
                console: &mut self.out,
                disk: &mut self.disk,
                config: &self.config,
            };
            dispatch(&cmd, &mut ctx)
        }

        fn take(&mut self) -> String {
            core::mem::take(&mut self.out.text)
        }
    }

    #[test]
    fn test_echo_prints_trailing_space() {
        let mut h = Harness::new();
        assert_eq!(h.run("echo hello world"), CommandResult::Ok);
        assert_eq!(h.take(), "hello world \n");
    }

    #[test]
    fn test_echo_without_arguments_is_unknown() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("echo"),
            CommandResult::WrongArity { expected: Arity::AtLeast(1), got: 0 }
        );
        assert_eq!(h.take(), "Unknown command\n");
    }

    #[test]
    fn test_unknown_and_wrong_arity_print_the_same() {
        let mut h = Harness::new();
        assert_eq!(h.run("frobnicate"), CommandResult::NotFound);
        assert_eq!(h.take(), "Unknown command\n");
        assert_eq!(
            h.run("read 1 2"),
            CommandResult::WrongArity { expected: Arity::Exactly(1), got: 2 }
        );
        assert_eq!(h.take(), "Unknown command\n");
    }

    #[test]
    fn test_report_arity_distinguishes_misuse() {
        let mut h = Harness::new();
        h.config.report_arity = true;
        h.run("write 5");
        assert_eq!(
            h.take(),
            "Wrong number of arguments (usage: write <lba> <text>)\n"
        );
        h.run("nope");
        assert_eq!(h.take(), "Unknown command\n");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut h = Harness::new();
        assert_eq!(h.run("HELP"), CommandResult::NotFound);
    }

    #[test]
    fn test_help_lists_commands() {
        let mut h = Harness::new();
        h.run("help");
        assert_eq!(
            h.take(),
            "Available commands: echo, clear, help, read, write, disk\n"
        );
    }

    #[test]
    fn test_clear_ignores_arguments() {
        let mut h = Harness::new();
        h.out.text.push_str("old");
        assert_eq!(h.run("clear now please"), CommandResult::Ok);
        assert_eq!(h.out.clears, 1);
        assert_eq!(h.take(), "");
    }

    #[test]
    fn test_read_blank_sector_prints_nothing() {
        let mut h = Harness::new();
        assert_eq!(h.run("read 0"), CommandResult::Ok);
        assert_eq!(h.take(), "");
    }

    #[test]
    fn test_write_then_read() {
        let mut h = Harness::new();
        assert_eq!(h.run("write 5 hi"), CommandResult::Ok);
        assert_eq!(h.take(), "");
        let stored = h.disk.ports().sector(5);
        assert_eq!(&stored[..2], b"hi");
        assert!(stored[2..].iter().all(|&b| b == 0));

        assert_eq!(h.run("read 5"), CommandResult::Ok);
        assert_eq!(h.take(), "hi\n");
    }

    #[test]
    fn test_read_skips_non_printable_bytes() {
        let mut h = Harness::new();
        let mut raw = [0u8; SECTOR_SIZE];
        raw[..6].copy_from_slice(b"a\x01b\nc\x7f");
        raw[511] = b'z';
        h.disk = AtaDrive::primary(
            {
                let mut disk = SimDisk::new();
                disk.sectors.insert(7, raw);
                disk
            },
            PollBudget::Spins(64),
        );
        h.run("read 7");
        assert_eq!(h.take(), "abcz\n");
    }

    #[test]
    fn test_write_truncates_to_sector() {
        let mut h = Harness::new();
        let long = "x".repeat(600);
        let line = format!("write 2 {}", long);
        assert_eq!(h.run(&line), CommandResult::Ok);
        assert!(h.disk.ports().sector(2).iter().all(|&b| b == b'x'));
    }

    #[test]
    fn test_bad_block_numbers() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("read abc"),
            CommandResult::Failed(CommandError::InvalidBlockNumber)
        );
        assert_eq!(h.take(), "Invalid block number\n");
        assert_eq!(
            h.run("write 268435456 x"),
            CommandResult::Failed(CommandError::InvalidBlockNumber)
        );
    }

    #[test]
    fn test_disk_failure_is_surfaced() {
        let mut h = Harness::new();
        h.disk = AtaDrive::primary(SimDisk::absent(), PollBudget::Spins(16));
        let result = h.run("read 1");
        assert!(matches!(
            result,
            CommandResult::Failed(CommandError::Disk(AtaError::Timeout(_)))
        ));
        assert_eq!(h.take(), "Disk error: timeout\n");
    }

    #[test]
    fn test_disk_reports_identify() {
        let mut h = Harness::new();
        h.run("disk");
        assert_eq!(h.take(), "Disk: SIM HARDDISK, 20480 sectors (10 MiB)\n");

        h.disk = AtaDrive::primary(SimDisk::absent(), PollBudget::Spins(16));
        h.run("disk");
        assert_eq!(h.take(), "Disk: not detected\n");
    }
}

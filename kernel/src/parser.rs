// Command Parser Module
//
// Splits a shell input line into a command name and its arguments.
// Tokens are slices of the input line, so a parsed command cannot outlive
// the line it came from. Only the space character separates tokens.

/// Maximum number of arguments a command can have
pub const MAX_ARGS: usize = 10;

/// A parsed command with its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// The command name (first token)
    pub name: &'a str,
    args: [&'a str; MAX_ARGS],
    argc: usize,
}

impl<'a> Command<'a> {
    /// Get argument by index (0-based)
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        if index < self.argc {
            Some(self.args[index])
        } else {
            None
        }
    }

    pub fn args(&self) -> &[&'a str] {
        &self.args[..self.argc]
    }

    pub fn argc(&self) -> usize {
        self.argc
    }
}

/// Parse a command line. `None` when the line is empty or all spaces.
///
/// Runs of spaces collapse into one separator. Arguments past `MAX_ARGS`
/// are scanned but not captured.
pub fn parse_command(input: &str) -> Option<Command<'_>> {
    let mut tokens = input.split(' ').filter(|t| !t.is_empty());
    let name = tokens.next()?;

    let mut args: [&str; MAX_ARGS] = [""; MAX_ARGS];
    let mut argc = 0;
    for token in tokens {
        if argc == MAX_ARGS {
            break;
        }
        args[argc] = token;
        argc += 1;
    }

    Some(Command { name, args, argc })
}

/// Parse a non-negative decimal block number.
pub fn parse_block_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let cmd = parse_command("help").unwrap();
        assert_eq!(cmd.name, "help");
        assert_eq!(cmd.argc(), 0);
    }

    #[test]
    fn test_parse_collapses_spaces() {
        let cmd = parse_command("  echo   a  b c  ").unwrap();
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args(), &["a", "b", "c"]);
        assert_eq!(cmd.arg(1), Some("b"));
        assert_eq!(cmd.arg(3), None);
    }

    #[test]
    fn test_parse_empty_lines() {
        assert!(parse_command("").is_none());
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_parse_caps_argument_count() {
        let cmd = parse_command("x 1 2 3 4 5 6 7 8 9 10 11 12").unwrap();
        assert_eq!(cmd.argc(), MAX_ARGS);
        assert_eq!(cmd.arg(MAX_ARGS - 1), Some("10"));
    }

    #[test]
    fn test_tabs_are_not_separators() {
        let cmd = parse_command("echo a\tb").unwrap();
        assert_eq!(cmd.args(), &["a\tb"]);
    }

    #[test]
    fn test_parse_block_number() {
        assert_eq!(parse_block_number("0"), Some(0));
        assert_eq!(parse_block_number("4096"), Some(4096));
        assert_eq!(parse_block_number("-1"), None);
        assert_eq!(parse_block_number("+5"), None);
        assert_eq!(parse_block_number("12ab"), None);
        assert_eq!(parse_block_number(""), None);
        assert_eq!(parse_block_number("99999999999"), None);
    }
}

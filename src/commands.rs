// Transport commands typed at the terminal, one per line

/// What a line of input asks the player to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// "1"
    TogglePause,
    /// "2"
    ToggleLoop,
    /// Anything else, including a blank line: just redraw
    Refresh,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "1" => Command::TogglePause,
            "2" => Command::ToggleLoop,
            _ => Command::Refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_commands() {
        assert_eq!(Command::parse("1"), Command::TogglePause);
        assert_eq!(Command::parse("2"), Command::ToggleLoop);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(Command::parse("  1\r\n"), Command::TogglePause);
        assert_eq!(Command::parse("\t2 "), Command::ToggleLoop);
    }

    #[test]
    fn test_everything_else_refreshes() {
        for line in ["", "   ", "3", "12", "pause", "1 2"] {
            assert_eq!(Command::parse(line), Command::Refresh, "{:?}", line);
        }
    }
}

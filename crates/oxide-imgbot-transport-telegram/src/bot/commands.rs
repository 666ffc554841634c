//! Chat command parsing.
//!
//! Commands use the `!` prefix and are case-sensitive. The argument is
//! everything after the first whitespace, trimmed.

/// A recognized chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `!search <query>`; the query may be empty
    Search(String),
    /// `!next`
    Next,
    /// `!settings <n>`; the raw argument is validated by the controller
    Settings(String),
    /// `!help`, or Telegram's `/start`
    Help,
}

impl ChatCommand {
    /// Parse a message text. Returns `None` for anything that is not a command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();

        if let Some(first) = text.split_whitespace().next() {
            if first == "/start" || first.starts_with("/start@") {
                return Some(Self::Help);
            }
        }

        let rest = text.strip_prefix('!')?;
        let (name, arg) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };

        match name {
            "search" => Some(Self::Search(arg.to_string())),
            "next" => Some(Self::Next),
            "settings" => Some(Self::Settings(arg.to_string())),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChatCommand;

    #[test]
    fn test_parse_search_keeps_query() {
        assert_eq!(
            ChatCommand::parse("!search  рыжие кошки "),
            Some(ChatCommand::Search("рыжие кошки".to_string()))
        );
        assert_eq!(
            ChatCommand::parse("!search"),
            Some(ChatCommand::Search(String::new()))
        );
        assert_eq!(
            ChatCommand::parse("!search   "),
            Some(ChatCommand::Search(String::new()))
        );
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(ChatCommand::parse("!next"), Some(ChatCommand::Next));
        assert_eq!(
            ChatCommand::parse("!settings 3"),
            Some(ChatCommand::Settings("3".to_string()))
        );
        assert_eq!(
            ChatCommand::parse("!settings"),
            Some(ChatCommand::Settings(String::new()))
        );
        assert_eq!(ChatCommand::parse("!help"), Some(ChatCommand::Help));
        assert_eq!(ChatCommand::parse("/start"), Some(ChatCommand::Help));
        assert_eq!(ChatCommand::parse("/start@imgbot"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert_eq!(ChatCommand::parse("search cats"), None);
        assert_eq!(ChatCommand::parse("!Search cats"), None);
        assert_eq!(ChatCommand::parse("!searchcats"), None);
        assert_eq!(ChatCommand::parse("!"), None);
        assert_eq!(ChatCommand::parse(""), None);
        assert_eq!(ChatCommand::parse("/help"), None);
    }
}

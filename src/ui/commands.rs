use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new conversation
    New,
    /// Browse and switch between saved conversations
    Sessions,
    /// Copy the last reply as plain text
    Copy,
    /// Export the conversation as an HTML transcript
    Export,
    /// Toggle between dark and light theme
    Theme,
    /// Delete all saved conversations
    Clear,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.keyword(),
            description: command.description(),
        })
        .collect()
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new conversation",
            SlashCommand::Sessions => "browse and switch between saved conversations",
            SlashCommand::Copy => "copy the last reply as plain text",
            SlashCommand::Export => "export the conversation as an HTML transcript",
            SlashCommand::Theme => "toggle between dark and light theme",
            SlashCommand::Clear => "delete ALL saved conversations and start fresh",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn keyword(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input.
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(SlashCommand::Bye),
            "n" => Some(SlashCommand::New),
            "s" | "history" => Some(SlashCommand::Sessions),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands.
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }
    help.push_str("\nAliases: /q for /bye, /n for /new, /s or /history for /sessions, /h for /help");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_kebab_case() {
        assert_eq!(SlashCommand::Sessions.keyword(), "sessions");
        assert_eq!(SlashCommand::New.keyword(), "new");
    }

    #[test]
    fn parses_command_with_aliases() {
        assert_eq!(
            parse_slash_command("/q").map(|c| c.command),
            Some(SlashCommand::Bye)
        );
        assert_eq!(
            parse_slash_command("/history").map(|c| c.command),
            Some(SlashCommand::Sessions)
        );
    }

    #[test]
    fn non_commands_pass_through() {
        assert!(parse_slash_command("hello /world").is_none());
        assert!(parse_slash_command("/definitely-not-a-command").is_none());
    }

    #[test]
    fn argument_is_collected() {
        let parsed = parse_slash_command("/sessions some filter").expect("parses");
        assert_eq!(parsed.argument.as_deref(), Some("some filter"));
    }

    #[test]
    fn help_mentions_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(entry.keyword));
        }
    }
}

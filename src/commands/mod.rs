//! Command Interpreter.
//!
//! Classifies the text of an editable field at the moment Enter is pressed.
//! Classification never touches the page; running the result is the
//! orchestrator's job.

mod registry;

pub use registry::{all_commands, find_command, Command, CommandKind};

use crate::core::settings::{Settings, ALTERNATE_PREFIX};
use regex::RegexBuilder;
use tracing::warn;

/// A slash command split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// The first token, lower-cased, including the leading slash.
    pub token: String,
    /// `None` for unrecognized commands.
    pub kind: Option<CommandKind>,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Command(CommandInvocation),
    /// Prompt text with the prefix stripped.
    Prompt(String),
    /// Not ours; let the keystroke through.
    Passthrough,
}

pub fn classify(text: &str, settings: &Settings) -> Classification {
    let trimmed = text.trim();

    if trimmed.starts_with('/') {
        return Classification::Command(parse_command(trimmed));
    }

    match strip_prompt_prefix(trimmed, settings.effective_prefix()) {
        Some(prompt) => Classification::Prompt(prompt),
        None => Classification::Passthrough,
    }
}

fn parse_command(trimmed: &str) -> CommandInvocation {
    let mut parts = trimmed.split_whitespace();
    let token = parts.next().unwrap_or("/").to_lowercase();
    let kind = find_command(&token[1..]).map(|command| command.kind);
    CommandInvocation {
        token,
        kind,
        args: parts.map(str::to_owned).collect(),
    }
}

/// Strip the configured prefix (any case) or the alternate prefix (exact
/// case only) and any whitespace after it. `None` when neither starts the
/// text.
pub fn strip_prompt_prefix(text: &str, prefix: &str) -> Option<String> {
    let pattern = format!(r"^{}\s*", regex::escape(prefix));
    let matcher = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(matcher) => matcher,
        Err(err) => {
            warn!(%err, "Unusable command prefix");
            return None;
        }
    };
    if let Some(found) = matcher.find(text) {
        return Some(text[found.end()..].trim().to_string());
    }
    text.strip_prefix(ALTERNATE_PREFIX)
        .map(|rest| rest.trim().to_string())
}

/// The text `/help` writes into the field.
pub fn help_text(tone_ids: &[&str]) -> String {
    let mut help = String::from("Available Commands:\n\n");
    for command in all_commands() {
        help.push_str(command.usage);
        help.push_str(" - ");
        help.push_str(command.help);
        if command.kind == CommandKind::Tone && !tone_ids.is_empty() {
            help.push_str(&format!(" ({})", tone_ids.join(", ")));
        }
        help.push('\n');
    }
    help.push_str("\nExample: /tone friendly");
    help
}

pub fn unknown_command_message(token: &str) -> String {
    format!("❌ Unknown command: {token}\nType /help for available commands")
}

pub fn tone_usage_message(tone_ids: &[&str]) -> String {
    format!(
        "❌ Usage: /tone <name>\nValid tones: {}",
        tone_ids.join(", ")
    )
}

pub fn invalid_tone_message(name: &str, tone_ids: &[&str]) -> String {
    format!(
        "❌ Invalid tone: {name}\nValid tones: {}",
        tone_ids.join(", ")
    )
}

pub fn tone_changed_message(id: &str) -> String {
    format!("✅ Tone changed to: {id}")
}

pub const SETTINGS_MESSAGE: &str = "⚙️ Click the extension icon to open settings";

#[cfg(test)]
mod tests;

/// What the orchestrator does for a recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Tone,
    Settings,
}

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub kind: CommandKind,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show this help message",
        kind: CommandKind::Help,
    },
    Command {
        name: "tone",
        usage: "/tone <name>",
        help: "Change AI response tone",
        kind: CommandKind::Tone,
    },
    Command {
        name: "settings",
        usage: "/settings",
        help: "Open extension settings (click extension icon)",
        kind: CommandKind::Settings,
    },
];

use super::*;
use crate::core::settings::Settings;

fn settings_with_prefix(prefix: &str) -> Settings {
    Settings {
        command_prefix: prefix.to_string(),
        ..Settings::default()
    }
}

#[test]
fn slash_lines_are_always_commands() {
    let settings = settings_with_prefix("/ask");
    for input in ["/help", "/ask what is rust", "/TONE friendly", "/", "  /settings  "] {
        assert!(
            matches!(classify(input, &settings), Classification::Command(_)),
            "{input} should be a command"
        );
    }
}

#[test]
fn command_token_is_case_folded() {
    let classification = classify("/Tone Friendly", &Settings::default());
    let Classification::Command(invocation) = classification else {
        panic!("expected a command");
    };
    assert_eq!(invocation.token, "/tone");
    assert_eq!(invocation.kind, Some(CommandKind::Tone));
    assert_eq!(invocation.args, vec!["Friendly".to_string()]);
}

#[test]
fn unknown_command_keeps_token() {
    let Classification::Command(invocation) = classify("/dance now", &Settings::default()) else {
        panic!("expected a command");
    };
    assert_eq!(invocation.kind, None);
    assert_eq!(invocation.token, "/dance");
    assert!(unknown_command_message(&invocation.token).contains("/dance"));
}

#[test]
fn configured_prefix_is_case_insensitive() {
    let settings = Settings::default();
    assert_eq!(
        classify("prompt: say hi", &settings),
        Classification::Prompt("say hi".to_string())
    );
    assert_eq!(
        classify("PROMPT:   say hi  ", &settings),
        Classification::Prompt("say hi".to_string())
    );
}

#[test]
fn alternate_prefix_always_applies() {
    let settings = settings_with_prefix("ai:");
    assert_eq!(
        classify("gpt: tell a joke", &settings),
        Classification::Prompt("tell a joke".to_string())
    );
    assert_eq!(
        classify("ai: tell a joke", &settings),
        Classification::Prompt("tell a joke".to_string())
    );
}

#[test]
fn alternate_prefix_is_case_sensitive() {
    let settings = Settings::default();
    assert_eq!(classify("GPT: hello there", &settings), Classification::Passthrough);
    assert_eq!(classify("Gpt: hello there", &settings), Classification::Passthrough);
    assert_eq!(
        classify("gpt:hello there", &settings),
        Classification::Prompt("hello there".to_string())
    );
}

#[test]
fn prefix_metacharacters_are_literal() {
    let settings = settings_with_prefix("a.i+");
    assert_eq!(
        classify("a.i+ hello", &settings),
        Classification::Prompt("hello".to_string())
    );
    assert_eq!(classify("abii hello", &settings), Classification::Passthrough);
}

#[test]
fn prefix_must_be_at_the_start() {
    let settings = Settings::default();
    assert_eq!(classify("hello prompt: there", &settings), Classification::Passthrough);
    assert_eq!(classify("just chatting", &settings), Classification::Passthrough);
    assert_eq!(classify("", &settings), Classification::Passthrough);
}

#[test]
fn blank_prefix_uses_default() {
    let settings = settings_with_prefix("   ");
    assert_eq!(
        classify("prompt: ok", &settings),
        Classification::Prompt("ok".to_string())
    );
}

#[test]
fn help_lists_every_command_and_tone() {
    let help = help_text(&["default", "friendly"]);
    assert!(help.starts_with("Available Commands:"));
    for command in all_commands() {
        assert!(help.contains(command.usage), "missing {}", command.usage);
    }
    assert!(help.contains("(default, friendly)"));
    assert!(help.ends_with("Example: /tone friendly"));
}

#[test]
fn tone_messages_name_the_argument() {
    let message = invalid_tone_message("xyz", &["default"]);
    assert!(message.contains("xyz"));
    assert!(message.contains("Valid tones: default"));
    assert_eq!(tone_changed_message("nerd"), "✅ Tone changed to: nerd");
}

use super::*;
use crate::core::protocol::Reply;
use crate::core::settings::SettingsPatch;
use crate::core::storage::{MemoryStore, StorageAdapter};
use crate::core::tones::DEFAULT_TONE_ID;
use crate::utils::test_utils::{FakeChannel, FakePage, PageEvent};

const THREAD: &str = "https://www.facebook.com/messages/t/100";

struct Harness {
    orchestrator: Arc<Orchestrator>,
    page: Arc<FakePage>,
    channel: Arc<FakeChannel>,
    context: Arc<PageContext>,
    field: ElementId,
}

fn harness(text: &str, patch: SettingsPatch) -> Harness {
    let storage = StorageAdapter::new(Arc::new(MemoryStore::new()));
    storage.apply_settings_patch(&patch).unwrap();
    let context = PageContext::load(storage).unwrap();
    let page = Arc::new(FakePage::new(THREAD));
    let field = page.add_editable(text);
    let channel = Arc::new(FakeChannel::new());
    let orchestrator = Arc::new(
        Orchestrator::new(context.clone(), page.clone(), channel.clone())
            .with_timings(PageTimings::immediate()),
    );
    Harness {
        orchestrator,
        page,
        channel,
        context,
        field,
    }
}

fn with_format(format: ResponseFormat, auto_send: bool) -> SettingsPatch {
    SettingsPatch {
        response_format: Some(format),
        auto_send: Some(auto_send),
        ..SettingsPatch::default()
    }
}

impl Harness {
    async fn enter(&self) -> CycleOutcome {
        self.orchestrator
            .handle_enter(self.field, KeyPress::default())
            .await
    }

    fn field_text(&self) -> String {
        self.page.text(self.field)
    }

    fn retype(&self, text: &str) {
        self.page.set_text(self.field, text);
        self.page.clear_events();
    }
}

#[tokio::test]
async fn prompt_in_edit_mode_replaces_field_and_records_history() {
    let h = harness("prompt: say hi", SettingsPatch::default());

    let outcome = h.enter().await;

    assert_eq!(outcome, CycleOutcome::Completed);
    assert_eq!(h.field_text(), "Hi there!");
    assert_eq!(h.page.inserts(), vec!["Hi there!".to_string()]);
    assert_eq!(h.page.submissions(), 0);
    assert!(h.page.sent().is_empty());

    let default_instruction = h
        .context
        .tones()
        .get(DEFAULT_TONE_ID)
        .map(|tone| tone.system_instruction.clone());
    assert_eq!(
        h.channel.sent(),
        vec![Request::GenerateResponse {
            prompt: "say hi".to_string(),
            system_instruction: default_instruction,
        }]
    );

    let history = h.context.storage().history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].prompt, "say hi");
    assert_eq!(history[0].tone, DEFAULT_TONE_ID);
    assert_eq!(history[0].response.as_deref(), Some("Hi there!"));
    assert_eq!(history[0].response_format, ResponseFormat::Edit);
}

#[tokio::test]
async fn overlay_wraps_the_provider_call() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.enter().await;

    let events = h.page.events();
    let show = events.iter().position(|e| *e == PageEvent::ShowOverlay).unwrap();
    let hide = events.iter().position(|e| *e == PageEvent::HideOverlay).unwrap();
    let first_insert = events
        .iter()
        .position(|e| matches!(e, PageEvent::Insert(..)))
        .unwrap();
    assert!(show < hide && hide < first_insert);
    assert!(!h.page.overlay_visible());
}

#[tokio::test]
async fn edit_mode_with_auto_send_submits_once() {
    let h = harness("prompt: say hi", with_format(ResponseFormat::Edit, true));

    h.enter().await;

    assert_eq!(h.page.inserts(), vec!["Hi there!".to_string()]);
    assert_eq!(h.page.submissions(), 1);
    assert_eq!(h.page.sent(), vec!["Hi there!".to_string()]);
}

#[tokio::test]
async fn both_mode_puts_original_first() {
    let h = harness("prompt: say hi", with_format(ResponseFormat::Both, false));

    h.enter().await;

    let text = h.field_text();
    assert_eq!(text, "[prompt: say hi] \n\n Hi there!");
    let original = text.find("prompt: say hi").unwrap();
    let response = text.find("Hi there!").unwrap();
    assert!(original < response);
    assert_eq!(h.page.submissions(), 0);
}

#[tokio::test]
async fn separate_mode_sends_original_then_response() {
    let h = harness("prompt: say hi", with_format(ResponseFormat::Separate, false));
    let button = h.page.add_send_control(h.field);

    h.enter().await;

    assert_eq!(
        h.page.sent(),
        vec!["prompt: say hi".to_string(), "Hi there!".to_string()]
    );
    let clicks = h
        .page
        .events()
        .into_iter()
        .filter(|event| *event == PageEvent::Click(button))
        .count();
    assert_eq!(clicks, 2);
}

#[tokio::test]
async fn ordinary_text_passes_through() {
    let h = harness("see you tomorrow", SettingsPatch::default());

    let outcome = h.enter().await;

    assert_eq!(outcome, CycleOutcome::Passthrough);
    assert!(!outcome.intercepted());
    assert!(h.page.events().is_empty());
    assert_eq!(h.channel.sent_count(), 0);
}

#[tokio::test]
async fn modified_enter_is_ignored() {
    let h = harness("prompt: say hi", SettingsPatch::default());

    let outcome = h
        .orchestrator
        .handle_enter(
            h.field,
            KeyPress {
                shift: true,
                ..KeyPress::default()
            },
        )
        .await;

    assert_eq!(outcome, CycleOutcome::Passthrough);
    assert_eq!(h.channel.sent_count(), 0);
}

#[tokio::test]
async fn second_prompt_while_busy_is_dropped() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.channel.hold();

    let first = tokio::spawn({
        let orchestrator = h.orchestrator.clone();
        let field = h.field;
        async move { orchestrator.handle_enter(field, KeyPress::default()).await }
    });
    h.channel.wait_for_sent(1).await;

    let second = h.enter().await;
    assert_eq!(second, CycleOutcome::Busy);
    assert!(second.intercepted());
    assert_eq!(h.channel.sent_count(), 1);

    h.channel.release();
    assert_eq!(first.await.unwrap(), CycleOutcome::Completed);
    assert!(!h.context.is_busy());

    h.retype("prompt: again");
    assert_eq!(h.enter().await, CycleOutcome::Completed);
    assert_eq!(h.channel.sent_count(), 2);
}

#[tokio::test]
async fn invalid_tone_keeps_current_tone() {
    let h = harness("/tone xyz", SettingsPatch::default());
    let before = h.context.active_tone();

    let outcome = h.enter().await;

    assert_eq!(outcome, CycleOutcome::Command);
    assert!(h.field_text().contains("xyz"));
    assert!(h.field_text().starts_with("❌ Invalid tone: xyz"));
    assert_eq!(h.context.active_tone(), before);
    assert_eq!(h.channel.sent_count(), 0);
    assert!(h.channel.broadcasts().is_empty());
}

#[tokio::test]
async fn tone_change_applies_to_the_next_prompt() {
    let h = harness("/tone Friendly", SettingsPatch::default());

    h.enter().await;

    assert_eq!(h.field_text(), "✅ Tone changed to: friendly");
    assert_eq!(h.context.active_tone().id, "friendly");
    assert_eq!(
        h.context.storage().selected_preset_id().unwrap().as_deref(),
        Some("friendly")
    );
    assert_eq!(
        h.channel.broadcasts(),
        vec![Request::ToneUpdated {
            preset_id: "friendly".to_string()
        }]
    );

    h.retype("prompt: how are you");
    h.enter().await;

    let history = h.context.storage().history().unwrap();
    assert_eq!(history[0].tone, "friendly");
    let Request::GenerateResponse {
        system_instruction, ..
    } = &h.channel.sent()[0]
    else {
        panic!("expected a generation request");
    };
    assert_eq!(
        system_instruction.as_deref(),
        h.context
            .tones()
            .get("friendly")
            .map(|tone| tone.system_instruction.as_str())
    );
}

#[tokio::test]
async fn tone_without_argument_shows_usage() {
    let h = harness("/tone", SettingsPatch::default());
    h.enter().await;
    assert!(h.field_text().starts_with("❌ Usage: /tone <name>"));
}

#[tokio::test]
async fn help_and_settings_stay_local() {
    let h = harness("/help", SettingsPatch::default());
    h.enter().await;
    assert!(h.field_text().starts_with("Available Commands:"));
    assert_eq!(h.page.submissions(), 0);

    h.retype("/settings");
    h.enter().await;
    assert_eq!(h.field_text(), commands::SETTINGS_MESSAGE);

    h.retype("/dance");
    h.enter().await;
    assert!(h.field_text().contains("Unknown command: /dance"));

    assert_eq!(h.channel.sent_count(), 0);
}

#[tokio::test]
async fn slash_text_with_prefix_is_still_a_command() {
    let h = harness(
        "/prompt: hi",
        SettingsPatch {
            command_prefix: Some("/prompt:".to_string()),
            ..SettingsPatch::default()
        },
    );

    assert_eq!(h.enter().await, CycleOutcome::Command);
    assert_eq!(h.channel.sent_count(), 0);
}

#[tokio::test]
async fn provider_failure_is_written_and_unlocks() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.channel.respond_with(|_| {
        Reply::failure("Invalid API key for Gemini. Please set a valid API key in settings.")
    });

    let outcome = h.enter().await;

    let expected =
        "❌ Error: Invalid API key for Gemini. Please set a valid API key in settings.".to_string();
    assert_eq!(outcome, CycleOutcome::Failed(expected.clone()));
    assert_eq!(h.field_text(), expected);
    assert!(h.context.storage().history().unwrap().is_empty());
    assert!(!h.context.is_busy());
    assert!(!h.page.overlay_visible());
}

#[tokio::test]
async fn failure_without_message_uses_generic_text() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.channel.respond_with(|_| Reply::rejected());

    h.enter().await;

    assert_eq!(h.field_text(), format!("❌ Error: {NO_RESPONSE}"));
}

#[tokio::test]
async fn reloaded_extension_asks_for_refresh() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.channel.invalidate();

    let outcome = h.enter().await;

    assert_eq!(outcome, CycleOutcome::Failed(RELOAD_MESSAGE.to_string()));
    assert_eq!(h.field_text(), RELOAD_MESSAGE);
    assert_eq!(h.channel.sent_count(), 0);
    assert!(!h.context.is_busy());
}

#[tokio::test]
async fn identical_prompts_each_get_an_entry() {
    let h = harness("prompt: say hi", SettingsPatch::default());
    h.enter().await;
    h.retype("prompt: say hi");
    h.enter().await;

    let history = h.context.storage().history().unwrap();
    assert_eq!(history.len(), 2);
    assert_ne!(history[0].id, history[1].id);
}

#[tokio::test]
async fn alternate_prefix_uses_ai_flow() {
    let h = harness("gpt: write a haiku", SettingsPatch::default());

    assert_eq!(h.enter().await, CycleOutcome::Completed);
    assert!(matches!(
        &h.channel.sent()[0],
        Request::GenerateResponse { prompt, .. } if prompt == "write a haiku"
    ));
}

#[tokio::test]
async fn uppercase_alternate_prefix_is_ordinary_text() {
    let h = harness("GPT: is great, right?", SettingsPatch::default());

    assert_eq!(h.enter().await, CycleOutcome::Passthrough);
    assert_eq!(h.channel.sent_count(), 0);
    assert_eq!(h.field_text(), "GPT: is great, right?");
}

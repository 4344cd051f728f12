//! Response Orchestrator.
//!
//! One cycle runs from the Enter keypress to the final field state:
//! classify, take the page's busy flag, generate through the background,
//! write the result, optionally submit, release the flag. Replies land in
//! the field only after the provider call has resolved.

use crate::commands::{self, Classification, CommandInvocation, CommandKind};
use crate::core::context::PageContext;
use crate::core::history::HistoryEntry;
use crate::core::protocol::{safe_send, ChannelError, Request, RuntimeChannel};
use crate::core::settings::{ResponseFormat, Settings};
use crate::core::tones::ActiveTone;
use crate::page::{pause, replace_text, submit, ElementId, PageAdapter, PageTimings};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const RELOAD_MESSAGE: &str =
    "⚠️ Extension was reloaded. Please refresh this page (F5) to continue.";
pub const NO_RESPONSE: &str = "No response from the API";

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Generation(String),
}

impl CycleError {
    /// Text written into the field for this failure.
    pub fn user_message(&self) -> String {
        match self {
            CycleError::Channel(err) if err.requires_reload() => RELOAD_MESSAGE.to_string(),
            other => format!("❌ Error: {other}"),
        }
    }
}

/// Modifier state of the Enter keypress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn is_plain(&self) -> bool {
        !(self.shift || self.ctrl || self.meta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Not ours: the keystroke goes through untouched.
    Passthrough,
    /// Intercepted but dropped because another cycle holds the page.
    Busy,
    /// A slash command ran.
    Command,
    /// A generated reply was delivered.
    Completed,
    /// An error message was written into the field.
    Failed(String),
}

impl CycleOutcome {
    /// Whether the default Enter behaviour must be suppressed.
    pub fn intercepted(&self) -> bool {
        !matches!(self, CycleOutcome::Passthrough)
    }
}

pub struct Orchestrator {
    context: Arc<PageContext>,
    page: Arc<dyn PageAdapter>,
    channel: Arc<dyn RuntimeChannel>,
    timings: PageTimings,
}

impl Orchestrator {
    pub fn new(
        context: Arc<PageContext>,
        page: Arc<dyn PageAdapter>,
        channel: Arc<dyn RuntimeChannel>,
    ) -> Self {
        Self {
            context,
            page,
            channel,
            timings: PageTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: PageTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn context(&self) -> &Arc<PageContext> {
        &self.context
    }

    /// Entry point for an Enter keypress inside an editable field.
    pub async fn handle_enter(&self, target: ElementId, key: KeyPress) -> CycleOutcome {
        if !key.is_plain() {
            return CycleOutcome::Passthrough;
        }

        let original = self.page.text(target).trim().to_string();
        let settings = self.context.settings();
        let classification = commands::classify(&original, &settings);
        debug!(?classification, "Classified field text");

        if classification == Classification::Passthrough {
            return CycleOutcome::Passthrough;
        }
        let Some(_busy) = self.context.try_lock() else {
            debug!("Cycle already running, dropping keypress");
            return CycleOutcome::Busy;
        };

        match classification {
            Classification::Command(invocation) => {
                self.run_command(target, &invocation).await;
                CycleOutcome::Command
            }
            Classification::Prompt(prompt) => {
                self.run_prompt(target, &original, &prompt, &settings).await
            }
            Classification::Passthrough => CycleOutcome::Passthrough,
        }
    }

    async fn write(&self, target: ElementId, text: &str) {
        replace_text(self.page.as_ref(), target, text, &self.timings).await;
    }

    async fn run_command(&self, target: ElementId, invocation: &CommandInvocation) {
        match invocation.kind {
            Some(CommandKind::Help) => {
                let tones = self.context.tones();
                self.write(target, &commands::help_text(&tones.ids())).await;
            }
            Some(CommandKind::Tone) => self.run_tone(target, invocation.first_arg()).await,
            Some(CommandKind::Settings) => self.write(target, commands::SETTINGS_MESSAGE).await,
            None => {
                self.write(target, &commands::unknown_command_message(&invocation.token))
                    .await
            }
        }
    }

    async fn run_tone(&self, target: ElementId, arg: Option<&str>) {
        let tones = self.context.tones();
        let ids = tones.ids();
        let Some(arg) = arg else {
            self.write(target, &commands::tone_usage_message(&ids)).await;
            return;
        };

        let name = arg.to_lowercase();
        if !tones.contains(&name) {
            self.write(target, &commands::invalid_tone_message(arg, &ids))
                .await;
            return;
        }

        self.context.set_active_tone(tones.resolve(&name));
        self.write(target, &commands::tone_changed_message(&name))
            .await;

        if let Err(err) = self.context.storage().set_selected_preset_id(&name) {
            warn!(%err, "Could not persist selected tone");
        }
        // Nobody listening is fine.
        if let Err(err) = self.channel.broadcast(Request::ToneUpdated { preset_id: name }) {
            debug!(%err, "Tone broadcast not delivered");
        }
    }

    async fn run_prompt(
        &self,
        target: ElementId,
        original: &str,
        prompt: &str,
        settings: &Settings,
    ) -> CycleOutcome {
        let tone = self.context.active_tone();
        info!(tone = %tone.id, format = %settings.response_format, "Generating response");

        self.page.show_loading_overlay();
        let generated = self.generate(prompt, &tone).await;
        self.page.hide_loading_overlay();

        match generated {
            Ok(text) => {
                self.record_history(prompt, &tone, &text, settings.response_format);
                self.deliver(target, original, &text, settings).await;
                CycleOutcome::Completed
            }
            Err(err) => {
                warn!(%err, "Generation failed");
                let message = err.user_message();
                self.write(target, &message).await;
                CycleOutcome::Failed(message)
            }
        }
    }

    async fn generate(&self, prompt: &str, tone: &ActiveTone) -> Result<String, CycleError> {
        let request = Request::GenerateResponse {
            prompt: prompt.to_string(),
            system_instruction: Some(tone.system_instruction.clone()),
        };
        let reply = safe_send(self.channel.as_ref(), request).await?;
        if !reply.success {
            return Err(CycleError::Generation(
                reply.error.unwrap_or_else(|| NO_RESPONSE.to_string()),
            ));
        }
        reply
            .text
            .ok_or_else(|| CycleError::Generation(NO_RESPONSE.to_string()))
    }

    fn record_history(&self, prompt: &str, tone: &ActiveTone, text: &str, format: ResponseFormat) {
        let storage = self.context.storage();
        let result = storage.history().and_then(|history| {
            let entry = HistoryEntry::new(
                &history,
                prompt,
                tone.id.clone(),
                Some(text.to_string()),
                format,
                Utc::now().timestamp_millis(),
            );
            storage.append_history(entry)
        });
        if let Err(err) = result {
            warn!(%err, "Failed to save prompt to history");
        }
    }

    async fn deliver(&self, target: ElementId, original: &str, text: &str, settings: &Settings) {
        let page = self.page.as_ref();
        match settings.response_format {
            ResponseFormat::Edit => {
                self.write(target, text).await;
                if settings.auto_send {
                    submit(page, target);
                }
            }
            ResponseFormat::Both => {
                self.write(target, &format!("[{original}] \n\n {text}")).await;
                if settings.auto_send {
                    submit(page, target);
                }
            }
            ResponseFormat::Separate => {
                self.write(target, original).await;
                pause(self.timings.enter_delay).await;
                submit(page, target);
                pause(self.timings.separate_pause).await;
                self.write(target, text).await;
                pause(self.timings.enter_delay).await;
                submit(page, target);
            }
        }
    }
}

#[cfg(test)]
mod tests;

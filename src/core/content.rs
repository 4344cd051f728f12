//! Requests a page answers for the popup and the background.

use crate::core::context::PageContext;
use crate::core::protocol::{ChannelError, Reply, Request, RuntimeChannel};
use crate::page::{
    is_chat_thread_path, is_main_site, pause, replace_text, visible_chats, PageAdapter,
    PageTimings, EDITABLE_SEARCH_DEPTH,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ContentHandler {
    context: Arc<PageContext>,
    page: Arc<dyn PageAdapter>,
    channel: Arc<dyn RuntimeChannel>,
    timings: PageTimings,
}

impl ContentHandler {
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

    pub async fn handle(&self, request: Request) -> Reply {
        debug!(kind = request.kind(), "Page request");
        match request {
            Request::GetChatName => self.chat_names(),
            Request::UpdateSystemInstruction { preset_id } => {
                self.update_system_instruction(preset_id);
                Reply::ack()
            }
            Request::ReplaceSelectedText { text } => {
                if let Some(target) = self.page.active_editable() {
                    replace_text(self.page.as_ref(), target, &text, &self.timings).await;
                }
                Reply::ack()
            }
            Request::InsertText { text, chat_index } => self.insert_text(&text, chat_index).await,
            Request::ExecuteCommand { command } => {
                self.execute_command(&command).await;
                Reply::ack()
            }
            Request::UpdateSettings { settings } => {
                self.context.apply_settings_patch(&settings);
                Reply::ack()
            }
            Request::GetSettings => Reply::settings(self.context.settings()),
            Request::GetHistory => match self.context.storage().history() {
                Ok(history) => Reply::history(history),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::ClearHistory => match self.context.storage().clear_history() {
                Ok(()) => Reply::ack(),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::ToneUpdated { .. } => Reply::ack(),
            other @ (Request::GenerateResponse { .. }
            | Request::GetModels
            | Request::GetOpenChats) => {
                Reply::failure(ChannelError::Unsupported(other.kind()).to_string())
            }
        }
    }

    fn chat_names(&self) -> Reply {
        if !is_main_site(&self.page.location()) {
            return Reply::visible_chats(Vec::new());
        }
        Reply::visible_chats(visible_chats(&self.page.chat_headers()))
    }

    fn update_system_instruction(&self, preset_id: String) {
        if let Err(err) = self.context.reload_tones() {
            warn!(%err, "Could not reload custom tones");
        }
        let tone = self.context.tones().resolve(&preset_id);
        info!(tone = %tone.id, "Tone updated");
        self.context.set_active_tone(tone);

        if let Err(err) = self.channel.broadcast(Request::ToneUpdated { preset_id }) {
            debug!(%err, "Tone broadcast not delivered");
        }
    }

    async fn insert_text(&self, text: &str, chat_index: Option<usize>) -> Reply {
        let target = if is_chat_thread_path(&self.page.location()) {
            self.page.first_editable()
        } else {
            let Some(index) = chat_index else {
                return Reply::rejected();
            };
            self.page.editable_near_header(index, EDITABLE_SEARCH_DEPTH)
        };

        match target {
            Some(target) => replace_text(self.page.as_ref(), target, text, &self.timings).await,
            None => debug!("No input found for INSERT_TEXT"),
        }
        Reply::ack()
    }

    async fn execute_command(&self, command: &str) {
        let Some(target) = self
            .page
            .active_editable()
            .or_else(|| self.page.first_editable())
        else {
            debug!("No input found for EXECUTE_COMMAND");
            return;
        };
        self.page.focus(target);
        self.page.set_text(target, command);
        pause(self.timings.enter_delay).await;
        self.page.dispatch_enter(target);
    }
}

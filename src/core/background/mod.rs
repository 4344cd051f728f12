//! Background Coordinator.
//!
//! Owns the process-wide settings cache and brokers everything the page
//! cannot do itself: keyed provider calls, cross-tab chat discovery, the
//! popup window and context-menu rewrites.

mod discovery;
mod popup;
mod rewrite;

pub use discovery::{
    chat_reference, open_chats, parse_chat_reference, ChatReferenceError, TabBroker, TabId,
    TabInfo, CHAT_TAB_PATTERN,
};
pub use popup::{PopupActivation, PopupWindow, WindowError, WindowId, WindowManager};
pub use rewrite::RewriteAction;

use crate::api::models::all_models;
use crate::core::protocol::{ChannelError, Reply, Request, RuntimeChannel};
use crate::core::providers::{Completer, ProviderError};
use crate::core::settings::{Settings, SettingsPatch, SETTINGS_KEYS};
use crate::core::storage::{StorageAdapter, StorageError};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const NOTIFICATION_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Nothing is selected")]
    EmptySelection,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

pub struct Coordinator {
    storage: StorageAdapter,
    completer: Arc<dyn Completer>,
    tabs: Arc<dyn TabBroker>,
    popup: PopupWindow,
    settings: Arc<RwLock<Option<Settings>>>,
    notifications: broadcast::Sender<Request>,
}

impl Coordinator {
    pub fn new(
        storage: StorageAdapter,
        completer: Arc<dyn Completer>,
        tabs: Arc<dyn TabBroker>,
        windows: Arc<dyn WindowManager>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            storage,
            completer,
            tabs,
            popup: PopupWindow::new(windows),
            settings: Arc::new(RwLock::new(None)),
            notifications,
        }
    }

    pub fn storage(&self) -> &StorageAdapter {
        &self.storage
    }

    pub fn popup(&self) -> &PopupWindow {
        &self.popup
    }

    /// Listen for broadcasts such as TONE_UPDATED.
    pub fn subscribe(&self) -> broadcast::Receiver<Request> {
        self.notifications.subscribe()
    }

    /// Settings, loaded from storage on first use and after any change.
    pub fn settings(&self) -> Result<Settings, StorageError> {
        if let Some(settings) = self
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(settings.clone());
        }
        let settings = self.storage.load_settings()?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(settings)
    }

    /// Drop the settings cache whenever a settings key changes in storage.
    pub fn watch_storage(&self) -> JoinHandle<()> {
        let mut changes = self.storage.subscribe();
        let cache = Arc::downgrade(&self.settings);
        tokio::spawn(async move {
            loop {
                let stale = match changes.recv().await {
                    Ok(change) => SETTINGS_KEYS.contains(&change.key.as_str()),
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                };
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                if stale {
                    cache.write().unwrap_or_else(PoisonError::into_inner).take();
                }
            }
        })
    }

    pub async fn handle(&self, request: Request) -> Reply {
        debug!(kind = request.kind(), "Background request");
        match request {
            Request::GenerateResponse {
                prompt,
                system_instruction,
            } => self.generate(&prompt, system_instruction.as_deref()).await,
            Request::GetSettings => match self.settings() {
                Ok(settings) => Reply::settings(settings),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::UpdateSettings { settings } => match self.update_settings(&settings) {
                Ok(()) => Reply::ack(),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::GetModels => Reply::models(all_models().to_vec()),
            Request::GetHistory => match self.storage.history() {
                Ok(history) => Reply::history(history),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::ClearHistory => match self.storage.clear_history() {
                Ok(()) => Reply::ack(),
                Err(err) => Reply::failure(err.to_string()),
            },
            Request::GetOpenChats => Reply::open_chats(open_chats(self.tabs.as_ref()).await),
            Request::ToneUpdated { preset_id } => {
                self.notify(Request::ToneUpdated { preset_id });
                Reply::ack()
            }
            other @ (Request::GetChatName
            | Request::UpdateSystemInstruction { .. }
            | Request::InsertText { .. }
            | Request::ReplaceSelectedText { .. }
            | Request::ExecuteCommand { .. }) => {
                Reply::failure(ChannelError::Unsupported(other.kind()).to_string())
            }
        }
    }

    async fn generate(&self, prompt: &str, system_instruction: Option<&str>) -> Reply {
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(err) => return Reply::failure(err.to_string()),
        };
        match self
            .completer
            .complete(prompt, system_instruction, &settings)
            .await
        {
            Ok(text) => Reply::text(text),
            Err(err) => {
                warn!(%err, "Completion failed");
                Reply::failure(err.to_string())
            }
        }
    }

    /// Persist the provided fields and merge them into the cache.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<(), StorageError> {
        self.storage.apply_settings_patch(patch)?;
        if let Some(settings) = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            settings.apply(patch);
        }
        Ok(())
    }

    fn notify(&self, request: Request) {
        // No receivers just means no popup is open.
        let _ = self.notifications.send(request);
    }

    /// Rewrite `selection` with one of the canned instructions and send the
    /// result back to the tab it came from.
    pub async fn rewrite_selection(
        &self,
        action: RewriteAction,
        tab_id: TabId,
        selection: &str,
    ) -> Result<String, RewriteError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(RewriteError::EmptySelection);
        }
        let settings = self.settings()?;
        info!(action = action.id(), tab = tab_id, "Rewriting selection");
        let text = self
            .completer
            .complete(selection, Some(action.instruction()), &settings)
            .await?;
        self.tabs
            .send_to_tab(
                tab_id,
                Request::ReplaceSelectedText { text: text.clone() },
            )
            .await?;
        Ok(text)
    }

    /// Insert text into a chat found by [`open_chats`].
    pub async fn insert_into_chat(&self, chat: &str, text: &str) -> Result<Reply, InsertError> {
        let (tab_id, chat_index) = parse_chat_reference(chat)?;
        let reply = self
            .tabs
            .send_to_tab(
                tab_id,
                Request::InsertText {
                    text: text.to_string(),
                    chat_index: Some(chat_index),
                },
            )
            .await?;
        Ok(reply)
    }
}

#[derive(Debug, Error)]
pub enum InsertError {
    #[error(transparent)]
    Reference(#[from] ChatReferenceError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// In-process channel: a page context talking straight to the coordinator.
#[async_trait]
impl RuntimeChannel for Coordinator {
    fn is_context_valid(&self) -> bool {
        true
    }

    async fn send(&self, request: Request) -> Result<Reply, ChannelError> {
        Ok(self.handle(request).await)
    }

    fn broadcast(&self, request: Request) -> Result<(), ChannelError> {
        self.notify(request);
        Ok(())
    }
}

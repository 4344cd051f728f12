//! Messages exchanged between the page, the background and the popup.
//!
//! Requests are a closed set tagged by `type`. Replies keep the loose
//! `{ success, ... }` shape every context already expects on the wire.

use crate::api::models::ModelDescriptor;
use crate::core::history::HistoryEntry;
use crate::core::settings::{Settings, SettingsPatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    GenerateResponse {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_instruction: Option<String>,
    },
    GetSettings,
    UpdateSettings {
        settings: SettingsPatch,
    },
    GetModels,
    GetHistory,
    ClearHistory,
    GetOpenChats,
    GetChatName,
    UpdateSystemInstruction {
        preset_id: String,
    },
    InsertText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chat_index: Option<usize>,
    },
    ReplaceSelectedText {
        text: String,
    },
    ExecuteCommand {
        command: String,
    },
    /// Broadcast only; no reply is expected.
    ToneUpdated {
        preset_id: String,
    },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::GenerateResponse { .. } => "GENERATE_RESPONSE",
            Request::GetSettings => "GET_SETTINGS",
            Request::UpdateSettings { .. } => "UPDATE_SETTINGS",
            Request::GetModels => "GET_MODELS",
            Request::GetHistory => "GET_HISTORY",
            Request::ClearHistory => "CLEAR_HISTORY",
            Request::GetOpenChats => "GET_OPEN_CHATS",
            Request::GetChatName => "GET_CHAT_NAME",
            Request::UpdateSystemInstruction { .. } => "UPDATE_SYSTEM_INSTRUCTION",
            Request::InsertText { .. } => "INSERT_TEXT",
            Request::ReplaceSelectedText { .. } => "REPLACE_SELECTED_TEXT",
            Request::ExecuteCommand { .. } => "EXECUTE_COMMAND",
            Request::ToneUpdated { .. } => "TONE_UPDATED",
        }
    }
}

/// A chat window found in one of the monitored tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChat {
    pub id: String,
    pub title: String,
    pub chat_index: usize,
    pub tab_id: u64,
}

/// A visible chat header as reported by a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleChat {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatList {
    Open(Vec<OpenChat>),
    Visible(Vec<VisibleChat>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<ModelDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chats: Option<ChatList>,
}

impl Reply {
    pub fn ack() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn rejected() -> Self {
        Self::default()
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::ack()
        }
    }

    pub fn settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::ack()
        }
    }

    pub fn models(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: Some(models),
            ..Self::ack()
        }
    }

    pub fn history(history: Vec<HistoryEntry>) -> Self {
        Self {
            history: Some(history),
            ..Self::ack()
        }
    }

    pub fn open_chats(chats: Vec<OpenChat>) -> Self {
        Self {
            chats: Some(ChatList::Open(chats)),
            ..Self::ack()
        }
    }

    pub fn visible_chats(chats: Vec<VisibleChat>) -> Self {
        Self {
            chats: Some(ChatList::Visible(chats)),
            ..Self::ack()
        }
    }

    /// Visible chats carried by a GET_CHAT_NAME reply, empty for any other shape.
    pub fn into_visible_chats(self) -> Vec<VisibleChat> {
        match self.chats {
            Some(ChatList::Visible(chats)) => chats,
            // An empty array deserializes as the first untagged variant.
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Extension context invalidated. Please reload the page.")]
    ContextInvalidated,

    #[error("Extension was reloaded. Please refresh the page to continue using the extension.")]
    ExtensionReloaded,

    #[error("Could not reach the receiving end: {0}")]
    Disconnected(String),

    #[error("{0} is not handled here")]
    Unsupported(&'static str),
}

impl ChannelError {
    /// The page has to be reloaded before any further request can succeed.
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            ChannelError::ContextInvalidated | ChannelError::ExtensionReloaded
        )
    }
}

/// The messaging API a context uses to talk to the others.
#[async_trait]
pub trait RuntimeChannel: Send + Sync {
    /// Capability probe: false once the hosting extension has been
    /// unloaded or replaced underneath this context.
    fn is_context_valid(&self) -> bool;

    async fn send(&self, request: Request) -> Result<Reply, ChannelError>;

    /// Fire-and-forget notification to every listener.
    fn broadcast(&self, request: Request) -> Result<(), ChannelError>;
}

/// Probe the context, send one request and normalize "port closed"
/// failures into `ExtensionReloaded`.
pub async fn safe_send<C>(channel: &C, request: Request) -> Result<Reply, ChannelError>
where
    C: RuntimeChannel + ?Sized,
{
    if !channel.is_context_valid() {
        return Err(ChannelError::ContextInvalidated);
    }
    match channel.send(request).await {
        Ok(reply) => Ok(reply),
        Err(ChannelError::ContextInvalidated) => Err(ChannelError::ExtensionReloaded),
        Err(ChannelError::Disconnected(reason)) if reason.contains("message port closed") => {
            Err(ChannelError::ExtensionReloaded)
        }
        Err(other) => Err(other),
    }
}

use crate::core::protocol::{ChannelError, OpenChat, Reply, Request};
use crate::page::is_main_site;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Tabs that may host chat windows.
pub const CHAT_TAB_PATTERN: &str = "*://*.facebook.com/*";

pub type TabId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub active: bool,
}

/// Cross-tab operations available to the background.
#[async_trait]
pub trait TabBroker: Send + Sync {
    async fn query_tabs(&self, url_pattern: &str) -> Vec<TabInfo>;
    async fn send_to_tab(&self, tab_id: TabId, request: Request) -> Result<Reply, ChannelError>;
}

/// Ask every chat-hosting tab for its visible chats and flatten the
/// answers. A tab that does not answer contributes nothing.
pub async fn open_chats<T>(tabs: &T) -> Vec<OpenChat>
where
    T: TabBroker + ?Sized,
{
    let mut chats = Vec::new();
    for tab in tabs.query_tabs(CHAT_TAB_PATTERN).await {
        if !is_main_site(&tab.url) {
            continue;
        }
        match tabs.send_to_tab(tab.id, Request::GetChatName).await {
            Ok(reply) => chats.extend(reply.into_visible_chats().into_iter().map(|chat| {
                OpenChat {
                    id: chat_reference(tab.id, chat.index),
                    title: chat.name,
                    chat_index: chat.index,
                    tab_id: tab.id,
                }
            })),
            Err(err) => debug!(tab = tab.id, %err, "Tab did not report chats"),
        }
    }
    chats
}

pub fn chat_reference(tab_id: TabId, chat_index: usize) -> String {
    format!("{tab_id}-{chat_index}")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Not a chat reference: '{0}'")]
pub struct ChatReferenceError(pub String);

/// Split a `"<tab>-<index>"` reference produced by [`chat_reference`].
pub fn parse_chat_reference(reference: &str) -> Result<(TabId, usize), ChatReferenceError> {
    let invalid = || ChatReferenceError(reference.to_string());
    let (tab, index) = reference.split_once('-').ok_or_else(invalid)?;
    let tab = tab.trim().parse().map_err(|_| invalid())?;
    let index = index.trim().parse().map_err(|_| invalid())?;
    Ok((tab, index))
}

use super::ChatHeader;
use crate::core::protocol::VisibleChat;
use std::collections::HashSet;

pub const MAIN_SITE: &str = "facebook.com";

/// Header texts containing any of these are page chrome, not chat names.
pub const EXCLUDED_HEADER_WORDS: &[&str] = &[
    "Menu",
    "Facebook",
    "Messenger",
    "Active",
    "Aktywny",
    "Wiadomości",
];

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 49;

/// Full-page conversation views, where there are no floating chat windows.
pub fn is_chat_thread_path(url: &str) -> bool {
    url.contains("/messages") || url.contains("/t/")
}

/// The main site page that hosts floating chat windows.
pub fn is_main_site(url: &str) -> bool {
    url.contains(MAIN_SITE) && !is_chat_thread_path(url)
}

/// Chat names from visible headers, first occurrence wins.
pub fn visible_chats(headers: &[ChatHeader]) -> Vec<VisibleChat> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .filter(|header| header.visible)
        .filter_map(|header| {
            let name = header.text.trim();
            let len = name.chars().count();
            if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
                return None;
            }
            if EXCLUDED_HEADER_WORDS.iter().any(|word| name.contains(word)) {
                return None;
            }
            if !seen.insert(name.to_string()) {
                return None;
            }
            Some(VisibleChat {
                name: name.to_string(),
                index: header.index,
            })
        })
        .collect()
}

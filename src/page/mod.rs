//! The narrow slice of a chat page the orchestration core touches.
//!
//! Everything DOM-shaped sits behind [`PageAdapter`]. Elements are opaque
//! handles owned by the adapter; handles may go stale when the page
//! re-renders and every method tolerates that by doing nothing.

mod replace;
mod scan;

pub(crate) use replace::pause;
pub use replace::{replace_text, submit, PageTimings};
pub use scan::{is_chat_thread_path, is_main_site, visible_chats, EXCLUDED_HEADER_WORDS};

/// Opaque handle for an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// A chat window header in DOM order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHeader {
    /// Position among all headers in the current scan.
    pub index: usize,
    pub text: String,
    pub visible: bool,
}

/// How many ancestors to climb from a chat header looking for its input.
pub const EDITABLE_SEARCH_DEPTH: usize = 15;

pub trait PageAdapter: Send + Sync {
    /// Full URL of the page.
    fn location(&self) -> String;

    /// The focused element when it is editable.
    fn active_editable(&self) -> Option<ElementId>;

    /// The first editable element in document order.
    fn first_editable(&self) -> Option<ElementId>;

    fn text(&self, element: ElementId) -> String;

    fn focus(&self, element: ElementId);

    /// Editor-level "select all" command.
    fn select_all(&self, element: ElementId);

    /// Text of the current document selection.
    fn selection_text(&self) -> String;

    /// Build a selection range spanning the element's contents.
    fn select_contents(&self, element: ElementId);

    /// Insert text, replacing the current selection.
    fn insert_text(&self, element: ElementId, text: &str);

    /// Overwrite the element's text directly, bypassing the editor.
    fn set_text(&self, element: ElementId, text: &str);

    /// The send button belonging to the conversation `element` lives in.
    fn find_send_control(&self, element: ElementId) -> Option<ElementId>;

    fn click(&self, control: ElementId);

    /// Dispatch a synthetic Enter keydown at the element.
    fn dispatch_enter(&self, element: ElementId);

    fn show_loading_overlay(&self);

    fn hide_loading_overlay(&self);

    fn chat_headers(&self) -> Vec<ChatHeader>;

    /// Nearest editable found by climbing at most `max_levels` ancestors
    /// of the header at `index`.
    fn editable_near_header(&self, index: usize, max_levels: usize) -> Option<ElementId>;
}

use super::{ElementId, PageAdapter};
use std::time::Duration;
use tracing::debug;

/// Pauses inserted between DOM steps so focus and editor state can settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimings {
    /// After focusing and after selecting, before inserting
    pub settle: Duration,
    /// Before a synthetic Enter for EXECUTE_COMMAND and the separate format
    pub enter_delay: Duration,
    /// Between the original message being sent and the response replacing it
    pub separate_pause: Duration,
}

impl Default for PageTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(10),
            enter_delay: Duration::from_millis(100),
            separate_pause: Duration::from_millis(800),
        }
    }
}

impl PageTimings {
    /// No pauses at all.
    pub const fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            enter_delay: Duration::ZERO,
            separate_pause: Duration::ZERO,
        }
    }
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Replace everything in `target` with `text`.
///
/// Editor "select all" is not reliable across rich-text editors, so an
/// empty selection afterwards falls back to an explicit range over the
/// element's contents.
pub async fn replace_text<P>(page: &P, target: ElementId, text: &str, timings: &PageTimings)
where
    P: PageAdapter + ?Sized,
{
    page.focus(target);
    pause(timings.settle).await;

    page.select_all(target);
    if page.selection_text().is_empty() {
        debug!("select-all left no selection, using a content range");
        page.select_contents(target);
    }
    pause(timings.settle).await;

    page.insert_text(target, text);
}

/// Simulate sending the message in `target`: click the send control when
/// there is one, otherwise press Enter in the field.
pub fn submit<P>(page: &P, target: ElementId)
where
    P: PageAdapter + ?Sized,
{
    match page.find_send_control(target) {
        Some(control) => page.click(control),
        None => {
            debug!("no send control found, dispatching Enter");
            page.dispatch_enter(target);
        }
    }
}

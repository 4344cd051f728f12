use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub type WindowId = u64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Window operation failed: {0}")]
pub struct WindowError(pub String);

/// Browser window operations the popup singleton needs.
#[async_trait]
pub trait WindowManager: Send + Sync {
    async fn window_exists(&self, id: WindowId) -> bool;
    async fn focus(&self, id: WindowId) -> Result<(), WindowError>;
    async fn create_popup(&self) -> Result<WindowId, WindowError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupActivation {
    Focused(WindowId),
    Created(WindowId),
}

/// Tracks at most one popup window.
pub struct PopupWindow {
    windows: Arc<dyn WindowManager>,
    tracked: Mutex<Option<WindowId>>,
}

impl PopupWindow {
    pub fn new(windows: Arc<dyn WindowManager>) -> Self {
        Self {
            windows,
            tracked: Mutex::new(None),
        }
    }

    /// Focus the tracked popup if it is still open, otherwise open a new
    /// one and track it instead.
    pub async fn activate(&self) -> Result<PopupActivation, WindowError> {
        let mut tracked = self.tracked.lock().await;
        if let Some(id) = *tracked {
            if self.windows.window_exists(id).await {
                self.windows.focus(id).await?;
                return Ok(PopupActivation::Focused(id));
            }
            debug!(id, "Tracked popup is gone");
        }

        let id = self.windows.create_popup().await?;
        *tracked = Some(id);
        Ok(PopupActivation::Created(id))
    }

    /// Window-closed notification.
    pub async fn on_window_removed(&self, id: WindowId) {
        let mut tracked = self.tracked.lock().await;
        if *tracked == Some(id) {
            *tracked = None;
        }
    }

    pub async fn tracked(&self) -> Option<WindowId> {
        *self.tracked.lock().await
    }
}

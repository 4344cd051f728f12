//! Per-page state: cached settings, the tone map, the active tone and the
//! busy flag that keeps one orchestration cycle in flight at a time.

use crate::core::settings::{Settings, SettingsPatch, SETTINGS_KEYS};
use crate::core::storage::{
    StorageAdapter, StorageChange, StorageError, KEY_CUSTOM_TONES, KEY_SELECTED_PRESET_ID,
};
use crate::core::tones::{ActiveTone, ToneMap, DEFAULT_TONE_ID};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct PageContext {
    storage: StorageAdapter,
    settings: RwLock<Settings>,
    tones: RwLock<ToneMap>,
    active_tone: RwLock<ActiveTone>,
    busy: AtomicBool,
}

/// Holds the page's busy flag; releases it when dropped.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl PageContext {
    /// Read settings, custom tones and the selected tone from storage.
    pub fn load(storage: StorageAdapter) -> Result<Arc<Self>, StorageError> {
        let settings = storage.load_settings()?;
        let tones = ToneMap::with_custom(&storage.custom_tones()?);
        let active_tone = storage
            .selected_preset_id()?
            .map(|id| tones.resolve(&id))
            .unwrap_or_else(|| tones.resolve(DEFAULT_TONE_ID));

        Ok(Arc::new(Self {
            storage,
            settings: RwLock::new(settings),
            tones: RwLock::new(tones),
            active_tone: RwLock::new(active_tone),
            busy: AtomicBool::new(false),
        }))
    }

    pub fn storage(&self) -> &StorageAdapter {
        &self.storage
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge a patch into this page's cached copy only.
    pub fn apply_settings_patch(&self, patch: &SettingsPatch) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(patch);
    }

    pub fn tones(&self) -> ToneMap {
        self.tones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_tone(&self) -> ActiveTone {
        self.active_tone
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_active_tone(&self, tone: ActiveTone) {
        debug!(tone = %tone.id, "Active tone changed");
        *self
            .active_tone
            .write()
            .unwrap_or_else(PoisonError::into_inner) = tone;
    }

    /// Take the busy flag, or `None` if a cycle is already running.
    pub fn try_lock(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn reload_settings(&self) -> Result<(), StorageError> {
        let settings = self.storage.load_settings()?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }

    /// Re-read custom tones. The active tone keeps its id and picks up an
    /// edited instruction when the id is still defined.
    pub fn reload_tones(&self) -> Result<(), StorageError> {
        let tones = ToneMap::with_custom(&self.storage.custom_tones()?);
        let active_id = self.active_tone().id;
        if tones.contains(&active_id) {
            self.set_active_tone(tones.resolve(&active_id));
        }
        *self.tones.write().unwrap_or_else(PoisonError::into_inner) = tones;
        Ok(())
    }

    fn reload_selected_tone(&self) -> Result<(), StorageError> {
        if let Some(id) = self.storage.selected_preset_id()? {
            let tone = self.tones().resolve(&id);
            if tone != self.active_tone() {
                self.set_active_tone(tone);
            }
        }
        Ok(())
    }

    fn reload_all(&self) -> Result<(), StorageError> {
        self.reload_settings()?;
        self.reload_tones()?;
        self.reload_selected_tone()
    }

    pub fn handle_change(&self, change: &StorageChange) {
        let key = change.key.as_str();
        let result = if SETTINGS_KEYS.contains(&key) {
            self.reload_settings()
        } else if key == KEY_CUSTOM_TONES {
            self.reload_tones()
        } else if key == KEY_SELECTED_PRESET_ID {
            self.reload_selected_tone()
        } else {
            Ok(())
        };
        if let Err(err) = result {
            warn!(key, %err, "Could not refresh cached state");
        }
    }

    /// Keep the caches in step with storage until the store goes away or
    /// the context is dropped.
    pub fn watch_storage(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.storage.subscribe();
        let context = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let received = changes.recv().await;
                let Some(context) = context.upgrade() else {
                    break;
                };
                match received {
                    Ok(change) => context.handle_change(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Storage change feed lagged, reloading everything");
                        if let Err(err) = context.reload_all() {
                            warn!(%err, "Could not refresh cached state");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

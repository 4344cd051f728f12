//! One-shot generation from the terminal.

use std::error::Error;

use chrono::Utc;
use tracing::warn;

use crate::cli::Environment;
use crate::core::history::HistoryEntry;
use crate::core::orchestrator::NO_RESPONSE;
use crate::core::protocol::Request;
use crate::core::storage::StorageAdapter;
use crate::core::tones::{ActiveTone, ToneMap, DEFAULT_TONE_ID};

/// Pick the tone for a CLI generation. An explicit id must exist; the
/// stored selection falls back to the generic instruction like a page does.
pub fn resolve_tone(
    storage: &StorageAdapter,
    requested: Option<&str>,
) -> Result<ActiveTone, Box<dyn Error>> {
    let tones = ToneMap::with_custom(&storage.custom_tones()?);
    match requested {
        Some(id) => {
            let id = id.trim().to_lowercase();
            if !tones.contains(&id) {
                return Err(format!(
                    "Unknown tone '{id}'. Available tones: {}",
                    tones.ids().join(", ")
                )
                .into());
            }
            Ok(tones.resolve(&id))
        }
        None => Ok(storage
            .selected_preset_id()?
            .map(|id| tones.resolve(&id))
            .unwrap_or_else(|| tones.resolve(DEFAULT_TONE_ID))),
    }
}

pub async fn run_say(
    env: &Environment,
    prompt: Vec<String>,
    tone: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("Usage: promptline say <prompt>".into());
    }

    let tone = resolve_tone(&env.storage, tone.as_deref())?;
    let coordinator = env.coordinator()?;
    let reply = coordinator
        .handle(Request::GenerateResponse {
            prompt: prompt.to_string(),
            system_instruction: Some(tone.system_instruction.clone()),
        })
        .await;

    let text = match reply.text {
        Some(text) if reply.success => text,
        _ => {
            let message = reply.error.unwrap_or_else(|| NO_RESPONSE.to_string());
            return Err(format!("Error: {message}").into());
        }
    };
    println!("{text}");

    let settings = coordinator.settings()?;
    let history = env.storage.history()?;
    let entry = HistoryEntry::new(
        &history,
        prompt,
        tone.id,
        Some(text),
        settings.response_format,
        Utc::now().timestamp_millis(),
    );
    if let Err(err) = env.storage.append_history(entry) {
        warn!(%err, "Could not record history");
    }
    Ok(())
}

//! Read-only listings and template management.

use std::error::Error;

use chrono::Utc;

use crate::api::models::all_models;
use crate::cli::TemplateCommands;
use crate::core::history::{format_relative, HistoryQuery};
use crate::core::storage::StorageAdapter;
use crate::core::tones::ToneMap;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn list_models(storage: &StorageAdapter) {
    let current = storage.load_settings().map(|s| s.model).ok();

    println!("🤖 Available Models");
    println!("{RULE}");
    for model in all_models() {
        let marker = if current.as_deref() == Some(model.id.as_str()) {
            "→"
        } else {
            " "
        };
        let free = if model.free { " (free)" } else { "" };
        println!(
            "{marker} {:<28} {:<10} {}{free}",
            model.id,
            model.provider.display_name(),
            model.label
        );
    }
}

pub fn list_tones(storage: &StorageAdapter) -> Result<(), Box<dyn Error>> {
    let custom = storage.custom_tones()?;
    let tones = ToneMap::with_custom(&custom);
    let selected = storage.selected_preset_id()?;

    println!("🎭 Tones");
    println!("{RULE}");
    for tone in tones.list() {
        let marker = if selected.as_deref() == Some(tone.id.as_str()) {
            "→"
        } else {
            " "
        };
        let origin = if custom.iter().any(|c| c.id == tone.id) {
            " [custom]"
        } else {
            ""
        };
        println!("{marker} {:<16} {}{origin}", tone.id, tone.label);
        if !tone.description.is_empty() {
            println!("    {}", tone.description);
        }
    }
    Ok(())
}

pub fn list_history(
    storage: &StorageAdapter,
    search: Option<String>,
    tone: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let history = storage.history()?;
    let query = HistoryQuery { search, tone };
    let matches = query.filter(&history);
    if matches.is_empty() {
        println!("No history entries");
        return Ok(());
    }

    let now = Utc::now().timestamp_millis();
    for entry in matches {
        println!(
            "[{}] {} · {}",
            format_relative(entry.timestamp, now),
            entry.tone,
            entry.response_format.as_str()
        );
        println!("  > {}", entry.prompt);
        if let Some(response) = &entry.response {
            println!("  {response}");
        }
        println!();
    }
    Ok(())
}

pub fn templates(
    storage: &StorageAdapter,
    command: TemplateCommands,
) -> Result<(), Box<dyn Error>> {
    match command {
        TemplateCommands::List => {
            let templates = storage.templates()?;
            if templates.is_empty() {
                println!("No templates");
            }
            for template in templates {
                println!("{}  {}", template.id, template.title);
                println!("    {}", template.content);
            }
        }
        TemplateCommands::Add { title, content } => {
            let template =
                storage.add_template(&title, &content.join(" "), Utc::now().timestamp_millis())?;
            println!("✅ Added template {}", template.id);
        }
        TemplateCommands::Edit { id, title, content } => {
            let existing = storage
                .templates()?
                .into_iter()
                .find(|template| template.id == id)
                .ok_or_else(|| format!("Template '{id}' not found"))?;
            storage.update_template(
                &id,
                title.as_deref().unwrap_or(&existing.title),
                content.as_deref().unwrap_or(&existing.content),
            )?;
            println!("✅ Updated template {id}");
        }
        TemplateCommands::Rm { id } => {
            storage.delete_template(&id)?;
            println!("✅ Removed template {id}");
        }
    }
    Ok(())
}

//! Reusable message templates. Uncapped; stored as one flat list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template title and content must not be empty")]
    EmptyField,
    #[error("Template '{0}' not found")]
    NotFound(String),
}

fn validate(title: &str, content: &str) -> Result<(), TemplateError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(TemplateError::EmptyField);
    }
    Ok(())
}

pub fn add_template(
    templates: &mut Vec<Template>,
    title: &str,
    content: &str,
    now_ms: i64,
) -> Result<Template, TemplateError> {
    validate(title, content)?;
    let newest = templates
        .iter()
        .filter_map(|template| template.id.parse::<i64>().ok())
        .max();
    let id = match newest {
        Some(newest) if newest >= now_ms => newest + 1,
        _ => now_ms,
    };
    let template = Template {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    };
    templates.push(template.clone());
    Ok(template)
}

pub fn update_template(
    templates: &mut [Template],
    id: &str,
    title: &str,
    content: &str,
) -> Result<(), TemplateError> {
    validate(title, content)?;
    let template = templates
        .iter_mut()
        .find(|template| template.id == id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    template.title = title.to_string();
    template.content = content.to_string();
    Ok(())
}

pub fn delete_template(templates: &mut Vec<Template>, id: &str) -> Result<(), TemplateError> {
    let before = templates.len();
    templates.retain(|template| template.id != id);
    if templates.len() == before {
        return Err(TemplateError::NotFound(id.to_string()));
    }
    Ok(())
}

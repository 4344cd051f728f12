//! Static model catalog.
//!
//! Loaded from `builtins/models.toml` at build time. Model ids resolve to a
//! provider through this table; ids that are not listed route to the
//! provider of the first entry.

use crate::core::providers::Provider;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    #[serde(default)]
    pub free: bool,
}

#[derive(Debug, Deserialize)]
struct ModelCatalogFile {
    models: Vec<ModelDescriptor>,
}

static CATALOG: LazyLock<Vec<ModelDescriptor>> = LazyLock::new(|| {
    const CONFIG_CONTENT: &str = include_str!("../../builtins/models.toml");
    let file: ModelCatalogFile =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtins/models.toml");
    file.models
});

pub fn all_models() -> &'static [ModelDescriptor] {
    &CATALOG
}

pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    all_models().iter().find(|model| model.id == id)
}

/// Provider used when a model id is not in the catalog.
pub fn default_provider() -> Provider {
    all_models()
        .first()
        .map(|model| model.provider)
        .unwrap_or_default()
}

pub fn provider_for_model(id: &str) -> Provider {
    find_model(id)
        .map(|model| model.provider)
        .unwrap_or_else(default_provider)
}

use crate::core::builtin_tones::builtin_tones;
use serde::{Deserialize, Serialize};

/// Instruction used when no tone (or an unknown tone) is selected.
pub const GENERIC_INSTRUCTION: &str = "You are a helpful AI assistant.";
pub const DEFAULT_TONE_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonePreset {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub system_instruction: String,
}

/// Built-in tones merged with user-defined ones.
///
/// User tones replace built-ins with the same id in place; new ids are
/// appended after the built-ins in the order they were saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneMap {
    tones: Vec<TonePreset>,
}

impl Default for ToneMap {
    fn default() -> Self {
        Self::merged(builtin_tones(), &[])
    }
}

impl ToneMap {
    pub fn merged(builtins: &[TonePreset], custom: &[TonePreset]) -> Self {
        let mut tones: Vec<TonePreset> = builtins.to_vec();
        for tone in custom {
            match tones.iter_mut().find(|existing| existing.id == tone.id) {
                Some(existing) => *existing = tone.clone(),
                None => tones.push(tone.clone()),
            }
        }
        Self { tones }
    }

    pub fn with_custom(custom: &[TonePreset]) -> Self {
        Self::merged(builtin_tones(), custom)
    }

    pub fn get(&self, id: &str) -> Option<&TonePreset> {
        self.tones.iter().find(|tone| tone.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn list(&self) -> &[TonePreset] {
        &self.tones
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tones.iter().map(|tone| tone.id.as_str()).collect()
    }

    /// Resolve a tone id to the tone that should become active. Unknown ids
    /// keep the id but fall back to the generic instruction.
    pub fn resolve(&self, id: &str) -> ActiveTone {
        match self.get(id) {
            Some(tone) => ActiveTone {
                id: tone.id.clone(),
                system_instruction: tone.system_instruction.clone(),
            },
            None => ActiveTone {
                id: if id.is_empty() {
                    DEFAULT_TONE_ID.to_string()
                } else {
                    id.to_string()
                },
                system_instruction: GENERIC_INSTRUCTION.to_string(),
            },
        }
    }
}

/// The tone a page is currently generating with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTone {
    pub id: String,
    pub system_instruction: String,
}

impl Default for ActiveTone {
    fn default() -> Self {
        Self {
            id: DEFAULT_TONE_ID.to_string(),
            system_instruction: GENERIC_INSTRUCTION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, instruction: &str) -> TonePreset {
        TonePreset {
            id: id.to_string(),
            label: id.to_string(),
            description: String::new(),
            system_instruction: instruction.to_string(),
        }
    }

    #[test]
    fn custom_tone_shadows_builtin_in_place() {
        let map = ToneMap::with_custom(&[custom("friendly", "Be extremely warm.")]);
        assert_eq!(
            map.get("friendly").unwrap().system_instruction,
            "Be extremely warm."
        );
        assert_eq!(map.ids()[2], "friendly");
        assert_eq!(map.list().len(), builtin_tones().len());
    }

    #[test]
    fn new_custom_tone_is_appended() {
        let map = ToneMap::with_custom(&[custom("pirate", "Talk like a pirate.")]);
        assert_eq!(map.ids().last(), Some(&"pirate"));
        assert!(map.contains("pirate"));
        assert!(map.contains("nerd"));
    }

    #[test]
    fn resolve_unknown_uses_generic_instruction() {
        let map = ToneMap::default();
        let active = map.resolve("ghost");
        assert_eq!(active.id, "ghost");
        assert_eq!(active.system_instruction, GENERIC_INSTRUCTION);

        let active = map.resolve("");
        assert_eq!(active.id, DEFAULT_TONE_ID);
    }

    #[test]
    fn resolve_known_uses_preset_instruction() {
        let map = ToneMap::default();
        let active = map.resolve("cynic");
        assert!(active.system_instruction.contains("cynical"));
    }
}

use crate::core::tones::TonePreset;
use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Deserialize)]
struct BuiltinToneConfig {
    tones: Vec<TonePreset>,
}

static BUILTIN_TONES: LazyLock<Vec<TonePreset>> = LazyLock::new(|| {
    const CONFIG_CONTENT: &str = include_str!("../../builtins/tones.toml");
    let config: BuiltinToneConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtins/tones.toml");
    config.tones
});

pub fn builtin_tones() -> &'static [TonePreset] {
    &BUILTIN_TONES
}

pub fn builtin_tone_ids() -> Vec<&'static str> {
    builtin_tones().iter().map(|tone| tone.id.as_str()).collect()
}

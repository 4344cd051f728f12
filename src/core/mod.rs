pub mod background;
pub mod builtin_tones;
pub mod config;
pub mod content;
pub mod context;
pub mod history;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod settings;
pub mod storage;
pub mod templates;
pub mod tones;

//! Promptline turns a prefixed line typed into a chat composer into an
//! AI-generated reply.
//!
//! The crate is organized around the three contexts a browser extension
//! runs in:
//! - [`commands`] classifies the composer text as a slash command, an AI
//!   prompt or ordinary text.
//! - [`core`] holds the per-page orchestration cycle, the request protocol
//!   between contexts, the background coordinator, the provider client and
//!   the key-value storage every context shares.
//! - [`page`] is the seam to the hosting page: element handles, text
//!   replacement and the chat header scan.
//! - [`api`] defines provider wire payloads and the static model catalog.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`], which
//! runs the same coordinator against a file-backed store and serves it as
//! a native messaging host.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod page;
pub mod utils;

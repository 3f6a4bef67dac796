//! omnils: language intelligence for the Omni scripting language.
//!
//! A layout-aware lexer and definition outline feed a workspace symbol
//! index; the language service answers completion, hover, signature help
//! and go-to-definition from that plus a static catalog of the standard
//! library. Served over LSP on stdio, or queried one-shot from the CLI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod lsp;
pub mod outline;
pub mod server;
pub mod syntax;

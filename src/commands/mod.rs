//! Command-line command handlers for nightcolors.
//!
//! This module contains implementations for one-shot CLI commands like --reload,
//! --status and --apply. Each command is implemented in its own submodule.

pub mod apply;
pub mod reload;
pub mod status;

//! # Command Handlers
//!
//! This module contains the command handlers for the equidectl CLI application.
//! Each command is implemented in a dedicated submodule.
//!
//! ## Structure
//!
//! - `genealogy` - Ancestry tree of a horse, as JSON or an indented text tree
//! - `stats` - Race statistics and data availability for a horse
//! - `horse` - Canonical pedigree record by id
//! - `shared` - Shared utilities and validation functions

pub mod errors;
pub mod genealogy;
pub mod horse;
pub mod shared;
pub mod stats;

pub use genealogy::handle_genealogy_command;
pub use horse::handle_horse_command;
pub use stats::{handle_availability_command, handle_stats_command};

use crate::http_utils;

const USAGE: &str = r#"Usage: equidectl [options] <command> [args...]

Options:
  --base-url <url>     Base URL of the equide API server (default: http://localhost:8080)
  --json               Print raw JSON instead of text

Commands:
  genealogy <name> [--depth N] [--id N] [--age-window] [--breed B]
                                   Ancestry tree of a horse
  stats <name>                     Race statistics of a horse
  availability <name>              What is recorded about a horse
  horse <id>                       Canonical pedigree record by id"#;

/// Dispatches `args` (command first) to its handler.
pub async fn run_command(args: &[String], client: &http_utils::EquideClient, json: bool) {
    shared::dispatch_command!(USAGE, args, client, json, {
        "genealogy" => handle_genealogy_command,
        "stats" => handle_stats_command,
        "availability" => handle_availability_command,
        "horse" => handle_horse_command,
    });
}

/// Usage text of equidectl.
pub fn usage() -> &'static str {
    USAGE
}

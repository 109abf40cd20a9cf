//! # Shared Command Utilities
//!
//! This module provides shared validation, parsing, and utility functions
//! used across multiple command handlers to reduce code duplication.

use std::fmt::Display;
use std::str::FromStr;

use handled::Handle;

use crate::cli_utils;
use crate::commands::errors::UserError;

/// Parses `raw` or exits with the message and hint its error provides.
pub fn parse_or_exit<T, E>(raw: &str, what: &str) -> T
where
    T: FromStr<Err = E>,
    E: Handle<UserError> + Display,
{
    raw.parse().unwrap_or_else(|e: E| {
        if let Some(user_error) = e.handle() {
            if let Some(ref hint) = user_error.usage_hint {
                cli_utils::exit_with_usage_error(&user_error.message, hint);
            } else {
                cli_utils::exit_with_error(&user_error.message);
            }
        } else {
            cli_utils::exit_with_error(&format!("Invalid {}: {}", what, e));
        }
    })
}

/// Validates both minimum and maximum argument counts.
///
/// # Arguments
/// * `args` - The command arguments array
/// * `min_count` - The minimum number of arguments required
/// * `max_count` - The maximum number of arguments allowed
/// * `command` - The command name for error message
/// * `usage` - The usage string to display
pub fn validate_args_count_or_exit(
    args: &[String],
    min_count: usize,
    max_count: usize,
    command: &str,
    usage: &str,
) {
    if args.len() < min_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command requires more arguments", command),
            usage,
        );
    }
    if args.len() > max_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command has too many arguments", command),
            usage,
        );
    }
}

/// Macro to generate command dispatcher boilerplate.
macro_rules! dispatch_command {
    ($usage:expr, $args:expr, $client:expr, $json:expr, {
        $($command:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            crate::cli_utils::exit_with_usage_error("No command specified", $usage);
        }

        match $args[0].as_str() {
            $(
                $command => $handler(&$args[1..], $client, $json).await,
            )*
            _ => {
                let available_commands = vec![$($command),*];
                crate::cli_utils::exit_with_error(&format!(
                    "Unknown command '{}'. Available commands: {}",
                    $args[0],
                    available_commands.join(", ")
                ));
            }
        }
    };
}

pub(crate) use dispatch_command;

//! # Command Error Handling
//!
//! This module provides error handling utilities for equidectl commands
//! using the handled crate for consistent error property extraction.

use handled::Handle;

use crate::{DepthError, HorseNameError, ModeParseError};

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

impl Handle<UserError> for HorseNameError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: self.to_string(),
            usage_hint: Some(
                "Quote names that contain spaces: equidectl genealogy \"READY CASH\"".to_string(),
            ),
        })
    }
}

impl Handle<UserError> for DepthError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("Invalid depth: {}", self),
            usage_hint: Some(format!(
                "--depth takes a whole number of generations between 0 and {}",
                crate::MAX_DEPTH
            )),
        })
    }
}

impl Handle<UserError> for ModeParseError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: self.to_string(),
            usage_hint: Some("Use --age-window to filter ancestors by birth year".to_string()),
        })
    }
}

/// HTTP operation errors that provide user-friendly messages
#[derive(Debug)]
pub struct HttpOperationError {
    /// The name of the operation that failed
    pub operation: String,
    /// The HTTP status code if available
    pub status: Option<u16>,
    /// Detailed error information
    pub details: String,
}

impl std::fmt::Display for HttpOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(
                f,
                "{} failed (HTTP {}): {}",
                self.operation, status, self.details
            )
        } else {
            write!(f, "{} failed: {}", self.operation, self.details)
        }
    }
}

impl std::error::Error for HttpOperationError {}

impl Handle<UserError> for HttpOperationError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self.status {
            Some(404) => Some(
                "Names are matched exactly after uppercasing; check the spelling or pass --id."
                    .to_string(),
            ),
            Some(400) => Some("Invalid request. Check your arguments and try again.".to_string()),
            Some(503) => Some("The database is unreachable. Try again shortly.".to_string()),
            Some(500..=599) => {
                Some("Server error. The service may be temporarily unavailable.".to_string())
            }
            None => Some("Is equided running? Pass --base-url to point elsewhere.".to_string()),
            _ => None,
        };

        Some(UserError {
            message: self.to_string(),
            usage_hint,
        })
    }
}

impl HttpOperationError {
    /// Creates an HttpOperationError from a reqwest Response
    pub async fn from_response(response: reqwest::Response, operation: &str) -> Self {
        let status = response.status().as_u16();
        let details = response
            .text()
            .await
            .unwrap_or_else(|_| "No error details".to_string());

        Self {
            operation: operation.to_string(),
            status: Some(status),
            details: if details.is_empty() {
                "No error details".to_string()
            } else {
                details
            },
        }
    }

    /// Creates an HttpOperationError with a custom message
    pub fn new(operation: &str, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            status: None,
            details: details.to_string(),
        }
    }
}

/// Enhanced error formatting for CLI output
pub fn format_cli_error<E>(error: &E) -> String
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        let mut output = format!("Error: {}", user_error.message);
        if let Some(hint) = user_error.usage_hint {
            output.push_str(&format!("\nHint: {}", hint));
        }
        output
    } else {
        format!("Error: {}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_errors_carry_a_hint() {
        let formatted = format_cli_error(&DepthError::Negative(-2));
        assert!(formatted.starts_with("Error: Invalid depth: depth -2 is negative"));
        assert!(formatted.contains("Hint: --depth takes"));
    }

    #[test]
    fn http_errors_hint_by_status() {
        let not_found = HttpOperationError {
            operation: "genealogy".to_string(),
            status: Some(404),
            details: "horse GHOST is not recorded in any table".to_string(),
        };
        let user = not_found.handle().unwrap();
        assert_eq!(
            user.message,
            "genealogy failed (HTTP 404): horse GHOST is not recorded in any table"
        );
        assert!(user.usage_hint.unwrap().contains("--id"));

        let offline = HttpOperationError::new("stats", "connection refused");
        assert!(format_cli_error(&offline).contains("equided"));
    }
}

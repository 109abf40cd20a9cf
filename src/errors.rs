//! Error types for equide storage operations.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur while reading from a horse record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataStoreError {
    /// The requested item was not found in the data store.
    #[error("Item not found in data store")]
    NotFound,
    /// The store could not hand out a connection or lost it mid-query.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A row could not be decoded into its record type.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// An internal storage system error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataStoreError {
    /// HTTP status reported when a request fails on this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DataStoreError::NotFound => StatusCode::NOT_FOUND,
            DataStoreError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            DataStoreError::SerializationError(_) | DataStoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for DataStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DataStoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataStoreError::Connection(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DataStoreError::SerializationError(e.to_string())
            }
            _ => DataStoreError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(
            DataStoreError::from(sqlx::Error::RowNotFound),
            DataStoreError::NotFound
        );
    }

    #[test]
    fn pool_errors_map_to_connection() {
        assert!(matches!(
            DataStoreError::from(sqlx::Error::PoolTimedOut),
            DataStoreError::Connection(_)
        ));
        assert!(matches!(
            DataStoreError::from(sqlx::Error::PoolClosed),
            DataStoreError::Connection(_)
        ));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            DataStoreError::Connection("refused".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            DataStoreError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(DataStoreError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn display_includes_detail() {
        let err = DataStoreError::Internal("boom".to_string());
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}

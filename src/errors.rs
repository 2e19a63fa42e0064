//! The single error type every service returns. Kinds map to HTTP status
//! codes at the HTTP edge (see [`crate::http`]) and to short alert strings
//! at the bot edge (see [`crate::bot`]); nothing else is allowed to
//! construct an ad-hoc error representation.

use serde::Serialize;

/// Stable, surface-facing error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    RateOrReplay,
    Internal,
}

/// The application-wide error type. `detail` is shown to the caller for
/// every kind except `Internal`, where it is logged but replaced with a
/// generic message plus `trace_id` on the wire.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {detail}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub detail: String,
    pub trace_id: Option<String>,
}

impl AppError {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            trace_id: None,
        }
    }

    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, detail)
    }

    pub fn rate_or_replay(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateOrReplay, detail)
    }

    /// Wraps an unexpected fault. A random trace id is attached so the
    /// caller can quote it back to support without exposing `detail`.
    pub fn internal(detail: impl Into<String>) -> Self {
        let trace_id = uuid::Uuid::new_v4().to_string();
        Self {
            kind: ErrorKind::Internal,
            detail: detail.into(),
            trace_id: Some(trace_id),
        }
    }

    /// The message safe to place on the wire: `detail` verbatim except for
    /// `Internal`, which is replaced by a generic message carrying the
    /// trace id for correlation.
    pub fn public_message(&self) -> String {
        match self.kind {
            ErrorKind::Internal => format!(
                "internal error, reference {}",
                self.trace_id.as_deref().unwrap_or("unknown")
            ),
            _ => self.detail.clone(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::not_found("entity not found"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::conflict(format!("uniqueness violation: {db_err}"))
            }
            other => AppError::internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_hides_detail_but_keeps_trace_id() {
        let err = AppError::internal("db pool exhausted");
        assert_eq!(err.kind, ErrorKind::Internal);
        let msg = err.public_message();
        assert!(!msg.contains("db pool exhausted"));
        assert!(msg.contains(err.trace_id.as_deref().unwrap()));
    }

    #[test]
    fn conflict_shows_detail_verbatim() {
        let err = AppError::conflict("session already running");
        assert_eq!(err.public_message(), "session already running");
    }

    #[test]
    fn row_not_found_maps_to_not_found_kind() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}

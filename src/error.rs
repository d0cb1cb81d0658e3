use crate::store::StoreError;
use thiserror::Error;

/// Generic message shown in place of any storage failure.
pub const SERVER_ERROR_MESSAGE: &str = "Sunucu hatası oluştu.";

/// Request-level failures. None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field was blank or otherwise unusable.
    #[error("{0}")]
    Validation(String),

    /// A write collided with an existing row.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Bad credentials or missing session.
    #[error("{0}")]
    Auth(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        AppError::Auth(message.into())
    }

    /// Failures the caller cannot fix; their detail belongs in the log.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::PasswordHash(_))
    }

    /// Text safe to show the caller. Internal details are never echoed.
    pub fn user_message(&self) -> String {
        if self.is_internal() {
            SERVER_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_hide_their_detail() {
        let err = AppError::from(StoreError::UniqueViolation("words.tr".into()));
        assert_eq!(err.user_message(), SERVER_ERROR_MESSAGE);
        assert!(err.to_string().contains("words.tr"));
    }

    #[test]
    fn only_storage_and_hashing_failures_are_internal() {
        assert!(AppError::PasswordHash("bad salt".into()).is_internal());
        assert!(AppError::from(StoreError::Sqlite(rusqlite::Error::InvalidQuery)).is_internal());
        assert!(!AppError::auth("Email veya şifre yanlış.").is_internal());
        assert!(!AppError::not_found("Kelime bulunamadı.").is_internal());
        let err = AppError::PasswordHash("bad salt".into());
        assert_eq!(err.user_message(), err.user_message());
        assert_eq!(err.user_message(), SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn recoverable_errors_show_their_message() {
        assert_eq!(
            AppError::validation("TR ve EN alanlarını doldur.").user_message(),
            "TR ve EN alanlarını doldur."
        );
    }
}

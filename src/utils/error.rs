use thiserror::Error;

use crate::models::NodeKind;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidEndpoint(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(NodeKind),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Spool error: {0}")]
    Spool(String),

    #[error("{0}")]
    TokenInvalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 是否属于调用方的错误（映射到 4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::BadRequest(_) | AppError::InvalidEndpoint(_) | AppError::TokenInvalid(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::BadRequest("x".into()).is_client_error());
        assert!(AppError::InvalidEndpoint("x".into()).is_client_error());
        assert!(AppError::TokenInvalid("x".into()).is_client_error());
        assert!(!AppError::Spool("x".into()).is_client_error());
        assert!(!AppError::Upstream("x".into()).is_client_error());
        assert!(!AppError::UnknownComponent(NodeKind::Tso).is_client_error());
    }

    #[test]
    fn test_bad_request_message_is_verbatim() {
        let err = AppError::BadRequest("parameter 'pathParam' is required".into());
        assert_eq!(err.to_string(), "parameter 'pathParam' is required");
    }
}

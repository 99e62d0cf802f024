use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use products_hr::{HrError, Rejection, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// A structural edit was refused; the message is safe to show.
    #[error("{0}")]
    Rejected(String),
    #[error("resource not found")]
    NotFound,
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Rejected(_) => "REJECTED",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }
}

// Persistence failures are logged where they happen; this only classifies.
impl From<HrError> for ApiError {
    fn from(value: HrError) -> Self {
        match value {
            HrError::Rejected(Rejection::UnknownEmployee(_)) => ApiError::NotFound,
            HrError::Rejected(rejection) => ApiError::Rejected(rejection.to_string()),
            HrError::Repository(RepositoryError::NotFound(_)) => ApiError::NotFound,
            HrError::Repository(err) => ApiError::internal(err.into()),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::InvalidInput(_) = self {
            err = err.extend_with(|_err, e| {
                e.set("type", "BAD_REQUEST");
            });
        }
        err
    }
}

/// Map an org chart failure onto a coded GraphQL error.
pub fn hr_error(err: HrError) -> Error {
    ApiError::from(err).extend()
}

/// Reject a malformed argument before it reaches the org chart.
pub fn invalid_input(message: impl Into<String>) -> Error {
    ApiError::InvalidInput(message.into()).extend()
}

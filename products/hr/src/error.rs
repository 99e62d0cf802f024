use thiserror::Error;

use crate::repository::RepositoryError;

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HrError {
    /// The edit was refused before anything was written.
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The persistence collaborator failed the call.
    #[error("persistence failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl HrError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            HrError::Rejected(rejection) => Some(rejection),
            HrError::Repository(_) => None,
        }
    }
}

/// Reasons a structural edit is refused. Callers surface these to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("employee {0} cannot be their own manager")]
    SelfManager(String),
    #[error("moving {node_id} under {manager_id} would create a reporting cycle")]
    CycleDetected { node_id: String, manager_id: String },
    #[error("please select a node first")]
    NoSelection,
    #[error("employee {0} not found")]
    UnknownEmployee(String),
    #[error("manager {0} not found")]
    UnknownManager(String),
    #[error("{field} of top-level employee {id} cannot be changed")]
    LockedField { id: String, field: &'static str },
    #[error("employee id {0} is already taken")]
    DuplicateId(String),
    #[error("the editor panel is closed")]
    EditorClosed,
}

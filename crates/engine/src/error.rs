//! The module contains the error the engine can throw.
//!
//! Most variants are expected outcomes of a request (validation, missing
//! rows, guarded membership transitions) and carry enough context for the HTTP
//! layer to pick a status code. Only [`Database`], [`CorruptedRole`] and
//! [`Internal`] describe unexpected conditions.
//!
//!  [`Database`]: EngineError::Database
//!  [`CorruptedRole`]: EngineError::CorruptedRole
//!  [`Internal`]: EngineError::Internal
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("{0} not found")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("user not found")]
    UserNotFound,
    #[error("already a member")]
    AlreadyMember,
    #[error("member not found")]
    MemberNotFound,
    #[error("owner cannot self demote")]
    CannotSelfDemote,
    #[error("cannot remove last owner")]
    LastOwner,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("corrupted role value: {0}")]
    CorruptedRole(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether the error is an unexpected failure rather than a rejected request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::CorruptedRole(_) | Self::Internal(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::UserNotFound, Self::UserNotFound) => true,
            (Self::AlreadyMember, Self::AlreadyMember) => true,
            (Self::MemberNotFound, Self::MemberNotFound) => true,
            (Self::CannotSelfDemote, Self::CannotSelfDemote) => true,
            (Self::LastOwner, Self::LastOwner) => true,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::InvalidRefreshToken, Self::InvalidRefreshToken) => true,
            (Self::CorruptedRole(a), Self::CorruptedRole(b)) => a == b,
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

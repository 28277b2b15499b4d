//! Crate-wide error type and the stable numeric error-code surface.
//!
//! Every fallible engine operation returns [`Result<T>`]. The numeric codes
//! in [`VxError::code`] are part of the external contract: they must not be
//! renumbered once assigned, since language bindings built atop the public
//! operation surface key off them directly.

use thiserror::Error;

/// The stable numeric error surface. Values are fixed externally — do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    InvalidParam = 1,
    NullPointer = 2,
    OutOfMemory = 3,
    NotFound = 4,
    AlreadyExists = 5,
    Io = 6,
    Database = 7,
    JsonParse = 8,
    JsonSerialize = 9,
    InvalidState = 10,
    NotInitialized = 11,
    AlreadyInitialized = 12,
    PermissionDenied = 13,
    Unsupported = 14,
    Unknown = 999,
}

#[derive(Error, Debug)]
pub enum VxError {
    #[error("invalid argument: {0}")]
    InvalidParam(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json parse error: {0}")]
    JsonParse(serde_json::Error),

    #[error("json serialize error: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("notebook not initialized: {0}")]
    NotInitialized(String),

    #[error("already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl VxError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VxError::InvalidParam(_) => ErrorCode::InvalidParam,
            VxError::NotFound(_) => ErrorCode::NotFound,
            VxError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            VxError::Io(_) => ErrorCode::Io,
            VxError::Database(_) => ErrorCode::Database,
            VxError::JsonParse(_) => ErrorCode::JsonParse,
            VxError::JsonSerialize(_) => ErrorCode::JsonSerialize,
            VxError::InvalidState(_) => ErrorCode::InvalidState,
            VxError::NotInitialized(_) => ErrorCode::NotInitialized,
            VxError::AlreadyInitialized(_) => ErrorCode::AlreadyInitialized,
            VxError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            VxError::Unsupported(_) => ErrorCode::Unsupported,
            VxError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Convert a `serde_json` read-side failure into the `JsonParse` variant,
    /// distinguishing it from a write-side `JsonSerialize` failure even though
    /// both wrap the same upstream error type.
    pub fn parse(e: serde_json::Error) -> Self {
        VxError::JsonParse(e)
    }

    pub fn serialize(e: serde_json::Error) -> Self {
        VxError::JsonSerialize(e)
    }
}

pub type Result<T> = std::result::Result<T, VxError>;

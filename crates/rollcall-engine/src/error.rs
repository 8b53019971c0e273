use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] rollcall_store::StoreError),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Attendance log {0} not found")]
    LogNotFound(String),

    #[error("User {0} is already checked in")]
    AlreadyCheckedIn(String),

    #[error("User {0} is not checked in")]
    NotCheckedIn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Sender and Receiver can't be same")]
    SameAccount,

    /// Store failures pass through with their own message.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    /// The underlying store error, if this failure came from the store.
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            AppError::Store(err) => Some(err),
            AppError::SameAccount => None,
        }
    }
}

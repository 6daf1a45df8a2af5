mod error;
mod locking;
mod repository;

pub use error::*;
pub use repository::*;

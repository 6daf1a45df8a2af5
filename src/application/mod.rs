// Application layer - use cases and orchestration.
// The store owns ledger invariants; this layer adds request-shape rules and
// the post-commit notification side effect.

pub mod error;
pub mod notification;
pub mod service;

pub use error::*;
pub use notification::*;
pub use service::*;

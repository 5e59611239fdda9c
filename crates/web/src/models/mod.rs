//! Request-scoped models shared by middleware and handlers.

pub mod session;
pub mod submission;

pub use session::{CurrentIdentity, keys};
pub use submission::Submission;

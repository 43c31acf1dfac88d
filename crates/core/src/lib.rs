//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{ListingError, NestwalkError, NestwalkResult};
pub use types::{GroupId, GroupNode, GroupRef, NodeStatus, Traversal, TraversalStats, Truncation};

//! Listing-client abstraction for nestwalk.

pub mod gitlab;
pub mod memory;

use async_trait::async_trait;
use nestwalk_core::{GroupId, GroupRef, ListingError};
use std::sync::Arc;

pub use gitlab::GitLabLister;
pub use memory::InMemoryLister;

/// Lists the direct subgroups of one group, in the order the source returns
/// them.
#[async_trait]
pub trait GroupLister: Send + Sync {
    async fn list_subgroups(&self, group: &GroupId) -> Result<Vec<GroupRef>, ListingError>;
}

/// Shareable handle; the walker clones it into spawned tasks.
pub type SharedLister = Arc<dyn GroupLister>;

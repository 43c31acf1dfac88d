//! Deterministic in-memory listing source.
//!
//! Backs tests, benches and `nestwalk walk --fixture`. A group is "known"
//! once it has been registered as a parent or appeared as a child; listing a
//! known group without registered children yields an empty list, listing an
//! unknown group fails with `NotFound`.

use crate::GroupLister;
use async_trait::async_trait;
use nestwalk_core::error::{NestwalkError, NestwalkResult};
use nestwalk_core::{GroupId, GroupRef, ListingError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryLister {
    children: HashMap<GroupId, Vec<GroupRef>>,
    known: HashSet<GroupId>,
    failures: HashMap<GroupId, ListingError>,
    calls: AtomicUsize,
}

impl InMemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `children` under `parent`, in listing order.
    pub fn with_children(mut self, parent: impl Into<GroupId>, children: Vec<GroupRef>) -> Self {
        self.insert(parent.into(), children);
        self
    }

    /// Makes every listing of `group` fail with `err`.
    pub fn with_failure(mut self, group: impl Into<GroupId>, err: ListingError) -> Self {
        let group = group.into();
        self.known.insert(group.clone());
        self.failures.insert(group, err);
        self
    }

    pub fn insert(&mut self, parent: GroupId, children: Vec<GroupRef>) {
        self.known.extend(children.iter().map(GroupRef::group_id));
        self.known.insert(parent.clone());
        self.children.entry(parent).or_default().extend(children);
    }

    /// Listing calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Loads `{"<group id or path>": [{"id", "name", "full_path"}, ...]}`.
    pub fn from_json(json: &str) -> NestwalkResult<Self> {
        let raw: HashMap<String, Vec<GroupRef>> = serde_json::from_str(json)
            .map_err(|e| NestwalkError::InvalidInput(format!("Invalid fixture: {e}")))?;

        let mut lister = Self::new();
        // Sorted so fixture loading is independent of map iteration order.
        let mut entries: Vec<_> = raw.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (parent, children) in entries {
            lister.insert(GroupId::parse(&parent)?, children);
        }
        Ok(lister)
    }
}

#[async_trait]
impl GroupLister for InMemoryLister {
    async fn list_subgroups(&self, group: &GroupId) -> Result<Vec<GroupRef>, ListingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(err) = self.failures.get(group) {
            return Err(err.clone());
        }
        if !self.known.contains(group) {
            return Err(ListingError::NotFound {
                group: group.to_string(),
            });
        }
        Ok(self.children.get(group).cloned().unwrap_or_default())
    }
}

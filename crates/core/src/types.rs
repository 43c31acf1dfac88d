//! Domain types for the nestwalk subgroup traversal.

use crate::error::{ListingError, NestwalkError, NestwalkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A GitLab group identifier: numeric id or full path.
///
/// GitLab accepts either form wherever a group id is expected. Children
/// discovered during a walk are always addressed by their numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupId {
    Numeric(u64),
    Path(String),
}

impl GroupId {
    /// Parses caller input. All digits is numeric, anything else a path.
    ///
    /// Surrounding whitespace and slashes are stripped; nothing left is an
    /// error.
    pub fn parse(raw: &str) -> NestwalkResult<Self> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(NestwalkError::InvalidInput(
                "group id must not be empty".into(),
            ));
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<u64>() {
                return Ok(Self::Numeric(id));
            }
        }
        Ok(Self::Path(trimmed.to_string()))
    }
}

impl FromStr for GroupId {
    type Err = NestwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// One child-group descriptor as returned by the listing client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: u64,
    pub name: String,
    pub full_path: String,
}

impl GroupRef {
    pub fn new(id: u64, name: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            full_path: full_path.into(),
        }
    }

    pub fn group_id(&self) -> GroupId {
        GroupId::Numeric(self.id)
    }

    /// Whether `id` addresses this group, by numeric id or by full path.
    /// GitLab resolves paths case-insensitively.
    pub fn is_addressed_by(&self, id: &GroupId) -> bool {
        match id {
            GroupId::Numeric(n) => *n == self.id,
            GroupId::Path(p) => p.eq_ignore_ascii_case(&self.full_path),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome tree
// ---------------------------------------------------------------------------

/// How far a node was expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    /// Listed successfully; every child carries its own status.
    Complete,
    /// Below the depth bound, never listed. May or may not have children.
    DepthExceeded,
    /// Already on the path from the root; recorded but not expanded.
    CycleDetected,
    /// The listing call failed; children are unknown.
    ListingFailed { reason: ListingError },
}

impl NodeStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// A discovered group plus its expanded subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    pub group: GroupRef,
    #[serde(flatten)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GroupNode>,
}

/// A non-complete node, in pre-order position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    pub group: GroupId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(flatten)]
    pub status: NodeStatus,
}

/// Result of walking one root group.
///
/// `children` holds the direct subgroups of `root`; the root itself is not
/// part of the flattened result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traversal {
    pub root: GroupId,
    pub max_depth: u32,
    #[serde(flatten)]
    pub status: NodeStatus,
    pub children: Vec<GroupNode>,
    pub listing_calls: usize,
}

/// Summary counters over a [`Traversal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub groups: usize,
    pub listing_calls: usize,
    /// Deepest hierarchy level present in the result (root = 0).
    pub max_level: u32,
    pub depth_exceeded: usize,
    pub cycles: usize,
    pub listing_failures: usize,
}

impl Traversal {
    /// Pre-order flat view: parent before children, one subtree fully
    /// before the next sibling.
    pub fn flatten(&self) -> Vec<GroupRef> {
        let mut out = Vec::with_capacity(self.len());
        for child in &self.children {
            push_preorder(child, &mut out);
        }
        out
    }

    /// Number of descendants in the result.
    pub fn len(&self) -> usize {
        self.children.iter().map(subtree_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// True when the root and every discovered node were fully listed.
    pub fn is_complete(&self) -> bool {
        self.status.is_complete() && self.children.iter().all(subtree_complete)
    }

    /// True when the root listing itself failed with `NotFound`.
    pub fn root_not_found(&self) -> bool {
        matches!(&self.status, NodeStatus::ListingFailed { reason } if reason.is_not_found())
    }

    /// Every non-complete node, root first, then pre-order.
    pub fn truncations(&self) -> Vec<Truncation> {
        let mut out = Vec::new();
        if !self.status.is_complete() {
            out.push(Truncation {
                group: self.root.clone(),
                full_path: None,
                status: self.status.clone(),
            });
        }
        for child in &self.children {
            collect_truncations(child, &mut out);
        }
        out
    }

    pub fn stats(&self) -> TraversalStats {
        let mut stats = TraversalStats {
            listing_calls: self.listing_calls,
            ..TraversalStats::default()
        };
        if let NodeStatus::ListingFailed { .. } = self.status {
            stats.listing_failures += 1;
        }
        for child in &self.children {
            tally(child, 1, &mut stats);
        }
        stats
    }
}

fn push_preorder(node: &GroupNode, out: &mut Vec<GroupRef>) {
    out.push(node.group.clone());
    for child in &node.children {
        push_preorder(child, out);
    }
}

fn subtree_len(node: &GroupNode) -> usize {
    1 + node.children.iter().map(subtree_len).sum::<usize>()
}

fn subtree_complete(node: &GroupNode) -> bool {
    node.status.is_complete() && node.children.iter().all(subtree_complete)
}

fn collect_truncations(node: &GroupNode, out: &mut Vec<Truncation>) {
    if !node.status.is_complete() {
        out.push(Truncation {
            group: node.group.group_id(),
            full_path: Some(node.group.full_path.clone()),
            status: node.status.clone(),
        });
    }
    for child in &node.children {
        collect_truncations(child, out);
    }
}

fn tally(node: &GroupNode, level: u32, stats: &mut TraversalStats) {
    stats.groups += 1;
    stats.max_level = stats.max_level.max(level);
    match node.status {
        NodeStatus::Complete => {}
        NodeStatus::DepthExceeded => stats.depth_exceeded += 1,
        NodeStatus::CycleDetected => stats.cycles += 1,
        NodeStatus::ListingFailed { .. } => stats.listing_failures += 1,
    }
    for child in &node.children {
        tally(child, level + 1, stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u64, path: &str) -> GroupNode {
        GroupNode {
            group: GroupRef::new(id, path.rsplit('/').next().unwrap(), path),
            status: NodeStatus::Complete,
            children: Vec::new(),
        }
    }

    fn sample() -> Traversal {
        let mut b = leaf(2, "a/b");
        let mut d = leaf(4, "a/b/d");
        d.status = NodeStatus::ListingFailed {
            reason: ListingError::Transport {
                message: "reset".into(),
            },
        };
        b.children.push(d);
        Traversal {
            root: GroupId::Path("a".into()),
            max_depth: 10,
            status: NodeStatus::Complete,
            children: vec![b, leaf(3, "a/c")],
            listing_calls: 3,
        }
    }

    #[test]
    fn parse_numeric_and_path() {
        assert_eq!(GroupId::parse("42").unwrap(), GroupId::Numeric(42));
        assert_eq!(
            GroupId::parse(" /gitlab-org/frontend/ ").unwrap(),
            GroupId::Path("gitlab-org/frontend".into())
        );
        assert_eq!(
            GroupId::parse("42abc").unwrap(),
            GroupId::Path("42abc".into())
        );
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(GroupId::parse("").is_err());
        assert!(GroupId::parse("  / ").is_err());
    }

    #[test]
    fn oversized_digits_fall_back_to_path() {
        let raw = "99999999999999999999999";
        assert_eq!(GroupId::parse(raw).unwrap(), GroupId::Path(raw.into()));
    }

    #[test]
    fn group_ref_is_addressed_by_id_or_path() {
        let g = GroupRef::new(7, "Team", "Org/Team");
        assert!(g.is_addressed_by(&GroupId::Numeric(7)));
        assert!(g.is_addressed_by(&GroupId::Path("org/team".into())));
        assert!(!g.is_addressed_by(&GroupId::Numeric(8)));
        assert!(!g.is_addressed_by(&GroupId::Path("org".into())));
    }

    #[test]
    fn flatten_is_preorder() {
        let ids: Vec<u64> = sample().flatten().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![2, 4, 3]);
        assert_eq!(sample().len(), 3);
    }

    #[test]
    fn truncations_and_completeness() {
        let t = sample();
        assert!(!t.is_complete());
        let truncs = t.truncations();
        assert_eq!(truncs.len(), 1);
        assert_eq!(truncs[0].group, GroupId::Numeric(4));
        assert_eq!(truncs[0].full_path.as_deref(), Some("a/b/d"));
    }

    #[test]
    fn stats_count_levels_and_failures() {
        let stats = sample().stats();
        assert_eq!(stats.groups, 3);
        assert_eq!(stats.max_level, 2);
        assert_eq!(stats.listing_failures, 1);
        assert_eq!(stats.listing_calls, 3);
    }

    #[test]
    fn root_not_found_is_detected() {
        let t = Traversal {
            root: GroupId::Numeric(9),
            max_depth: 10,
            status: NodeStatus::ListingFailed {
                reason: ListingError::NotFound { group: "9".into() },
            },
            children: Vec::new(),
            listing_calls: 1,
        };
        assert!(t.root_not_found());
        assert!(t.is_empty());
        assert_eq!(t.truncations().len(), 1);
    }

    #[test]
    fn node_serializes_flat_status() {
        let v = serde_json::to_value(leaf(7, "x/y")).unwrap();
        assert_eq!(v["status"], "complete");
        assert_eq!(v["group"]["full_path"], "x/y");
        assert!(v.get("children").is_none());
    }
}

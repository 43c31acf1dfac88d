//! Depth-bounded, depth-first subgroup walk.
//!
//! Output order is pre-order over the listing order the source returns:
//! a child is recorded before its own listing is attempted, and a child's
//! subtree is fully expanded before the next sibling. With fan-out enabled
//! sibling subtrees are expanded concurrently and stitched back in listing
//! order, so the result is identical to the sequential walk.

use nestwalk_core::{GroupId, GroupNode, GroupRef, ListingError, NodeStatus, Traversal};
use nestwalk_provider::SharedLister;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default recursion bound.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Sequential by default.
const DEFAULT_CONCURRENCY: usize = 1;

type Expansion = Pin<Box<dyn Future<Output = (NodeStatus, Vec<GroupNode>)> + Send>>;

/// Walks the subgroup hierarchy below a root group.
///
/// Root is depth 0. The listing call at `depth == max_depth` still runs, so
/// groups one level below the bound are included (marked
/// [`NodeStatus::DepthExceeded`]) and nothing deeper is listed.
///
/// ```ignore
/// let walker = Walker::new(lister).with_max_depth(5).with_concurrency(8);
/// let traversal = walker.walk(&GroupId::parse("gitlab-org")?).await;
/// let flat = traversal.flatten();
/// ```
#[derive(Clone)]
pub struct Walker {
    lister: SharedLister,
    max_depth: u32,
    concurrency: usize,
}

impl Walker {
    pub fn new(lister: SharedLister) -> Self {
        Self {
            lister,
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Max in-flight listing calls. `1` keeps siblings strictly sequential.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub async fn walk(&self, root: &GroupId) -> Traversal {
        self.walk_from(root, 0).await
    }

    /// Walks as if `root` sat at `depth`.
    pub async fn walk_from(&self, root: &GroupId, depth: u32) -> Traversal {
        if depth > self.max_depth {
            return Traversal {
                root: root.clone(),
                max_depth: self.max_depth,
                status: NodeStatus::DepthExceeded,
                children: Vec::new(),
                listing_calls: 0,
            };
        }

        let t0 = Instant::now();
        let ctx = Arc::new(WalkCtx {
            lister: self.lister.clone(),
            max_depth: self.max_depth,
            permits: (self.concurrency > 1).then(|| Semaphore::new(self.concurrency)),
            calls: AtomicUsize::new(0),
        });

        tracing::info!(
            root = %root,
            depth,
            max_depth = self.max_depth,
            concurrency = self.concurrency,
            "walking subgroups"
        );

        let (status, children) =
            expand(ctx.clone(), root.clone(), depth, vec![root.clone()]).await;

        let traversal = Traversal {
            root: root.clone(),
            max_depth: self.max_depth,
            status,
            children,
            listing_calls: ctx.calls.load(Ordering::Relaxed),
        };

        tracing::info!(
            root = %root,
            groups = traversal.len(),
            listing_calls = traversal.listing_calls,
            complete = traversal.is_complete(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "walk done"
        );
        traversal
    }
}

/// Flat pre-order list of every descendant of `root`.
///
/// Listing failures are logged and swallowed: the failed subtree is cut
/// short and whatever was gathered elsewhere is returned. Use [`Walker`]
/// directly to see where the result was truncated.
pub async fn traverse(
    lister: SharedLister,
    root: &GroupId,
    depth: u32,
    max_depth: u32,
) -> Vec<GroupRef> {
    Walker::new(lister)
        .with_max_depth(max_depth)
        .walk_from(root, depth)
        .await
        .flatten()
}

/// Per-walk state shared by every branch.
struct WalkCtx {
    lister: SharedLister,
    max_depth: u32,
    permits: Option<Semaphore>,
    calls: AtomicUsize,
}

impl WalkCtx {
    async fn list(&self, group: &GroupId) -> Result<Vec<GroupRef>, ListingError> {
        // Held only for the call itself; parents never wait on children
        // while holding a permit.
        let _permit = match &self.permits {
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.lister.list_subgroups(group).await
    }

    fn fans_out(&self) -> bool {
        self.permits.is_some()
    }
}

/// Lists `group` and expands every child. `path` is the chain of ids from
/// the root down to `group`, inclusive.
fn expand(ctx: Arc<WalkCtx>, group: GroupId, depth: u32, path: Vec<GroupId>) -> Expansion {
    Box::pin(async move {
        let children = match ctx.list(&group).await {
            Ok(children) => children,
            Err(reason) => {
                tracing::warn!(
                    group = %group,
                    depth,
                    error = %reason,
                    "listing failed, subtree truncated"
                );
                return (NodeStatus::ListingFailed { reason }, Vec::new());
            }
        };

        tracing::debug!(group = %group, depth, children = children.len(), "expanding");

        let nodes = if ctx.fans_out() && children.len() > 1 {
            expand_concurrent(&ctx, children, depth + 1, &path).await
        } else {
            let mut nodes = Vec::with_capacity(children.len());
            for child in children {
                nodes.push(child_node(ctx.clone(), child, depth + 1, path.clone()).await);
            }
            nodes
        };

        (NodeStatus::Complete, nodes)
    })
}

/// Records `child` (at `depth`) and expands it unless it closes a cycle or
/// sits past the depth bound.
async fn child_node(
    ctx: Arc<WalkCtx>,
    child: GroupRef,
    depth: u32,
    mut path: Vec<GroupId>,
) -> GroupNode {
    let id = child.group_id();

    if path.iter().any(|ancestor| child.is_addressed_by(ancestor)) {
        tracing::warn!(group = %id, full_path = %child.full_path, depth, "cycle detected");
        return leaf(child, NodeStatus::CycleDetected);
    }
    if depth > ctx.max_depth {
        return leaf(child, NodeStatus::DepthExceeded);
    }

    path.push(id.clone());
    let (status, children) = expand(ctx, id, depth, path).await;
    GroupNode {
        group: child,
        status,
        children,
    }
}

/// Expands siblings as tasks and reassembles them in listing order.
async fn expand_concurrent(
    ctx: &Arc<WalkCtx>,
    children: Vec<GroupRef>,
    depth: u32,
    path: &[GroupId],
) -> Vec<GroupNode> {
    let mut slots: Vec<Option<GroupNode>> = vec![None; children.len()];
    let mut tasks = JoinSet::new();

    for (idx, child) in children.iter().cloned().enumerate() {
        let ctx = ctx.clone();
        let path = path.to_vec();
        tasks.spawn(async move { (idx, child_node(ctx, child, depth, path).await) });
    }

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok((idx, node)) => slots[idx] = Some(node),
            Err(e) => tracing::warn!(error = %e, "subtree task panicked"),
        }
    }

    // A panicked task leaves its slot empty; keep the child's own record.
    slots
        .into_iter()
        .zip(children)
        .map(|(slot, child)| {
            slot.unwrap_or_else(|| {
                leaf(
                    child,
                    NodeStatus::ListingFailed {
                        reason: ListingError::Transport {
                            message: "subtree task panicked".into(),
                        },
                    },
                )
            })
        })
        .collect()
}

fn leaf(group: GroupRef, status: NodeStatus) -> GroupNode {
    GroupNode {
        group,
        status,
        children: Vec::new(),
    }
}

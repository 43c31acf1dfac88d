//! Human-readable walk report.
//!
//! Takes a [`Traversal`] and renders a summary box, the indented group tree,
//! and every truncated subtree.

use nestwalk_core::{GroupNode, NodeStatus, Traversal, TraversalStats, Truncation};
use std::fmt::Write as _;
use std::time::Duration;

/// Report built from one walk.
#[derive(Debug)]
pub struct Report<'a> {
    pub traversal: &'a Traversal,
    pub stats: TraversalStats,
    pub truncations: Vec<Truncation>,
    pub elapsed: Duration,
}

impl<'a> Report<'a> {
    pub fn build(traversal: &'a Traversal, elapsed: Duration) -> Self {
        Self {
            traversal,
            stats: traversal.stats(),
            truncations: traversal.truncations(),
            elapsed,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let t = self.traversal;

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                   NESTWALK SUBGROUP REPORT                   ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        let _ = writeln!(out, "║  Root:               {:>39} ║", t.root.to_string());
        let _ = writeln!(out, "║  Groups found:       {:>39} ║", self.stats.groups);
        let _ = writeln!(out, "║  Deepest level:      {:>39} ║", self.stats.max_level);
        let _ = writeln!(out, "║  Max depth:          {:>39} ║", t.max_depth);
        let _ = writeln!(out, "║  Listing calls:      {:>39} ║", self.stats.listing_calls);
        let _ = writeln!(
            out,
            "║  Complete:           {:>39} ║",
            if t.is_complete() { "yes" } else { "no" }
        );
        let _ = writeln!(out, "║  Elapsed:            {:>39} ║", format!("{:?}", self.elapsed));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if t.is_empty() {
            out.push_str("║  No subgroups.                                               ║\n");
        } else {
            for node in &t.children {
                render_node(node, 0, &mut out);
            }
        }

        if !self.truncations.is_empty() {
            out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
            out.push_str("║  TRUNCATED                                                   ║\n");
            for (i, tr) in self.truncations.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "║  {}. {} ({}) {}",
                    i + 1,
                    tr.full_path.as_deref().unwrap_or("<root>"),
                    tr.group,
                    status_label(&tr.status)
                );
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}

fn render_node(node: &GroupNode, indent: usize, out: &mut String) {
    let marker = match node.status {
        NodeStatus::Complete => String::new(),
        ref other => format!("  [{}]", status_label(other)),
    };
    let _ = writeln!(
        out,
        "║  {}{} ({}){}",
        "  ".repeat(indent),
        node.group.full_path,
        node.group.id,
        marker
    );
    for child in &node.children {
        render_node(child, indent + 1, out);
    }
}

fn status_label(status: &NodeStatus) -> String {
    match status {
        NodeStatus::Complete => "complete".into(),
        NodeStatus::DepthExceeded => "depth limit".into(),
        NodeStatus::CycleDetected => "cycle".into(),
        NodeStatus::ListingFailed { reason } => format!("listing failed: {reason}"),
    }
}

//! Selecting the nodes worth announcing.
use chrono::{DateTime, Utc};

use crate::node::NodeRecord;

/// Why a node was or was not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    /// First seen at or before the cutoff.
    Stale,
    /// Recent, but without a location to geocode.
    NoLocation,
}

/// A node is new iff it was first seen strictly after `cutoff` and has a
/// location.
pub fn classify(node: &NodeRecord, cutoff: DateTime<Utc>) -> Verdict {
    if node.first_seen_at <= cutoff {
        Verdict::Stale
    } else if !node.has_location() {
        Verdict::NoLocation
    } else {
        Verdict::New
    }
}

/// Keep the new nodes, in directory order.
pub fn filter_new_nodes(nodes: Vec<NodeRecord>, cutoff: DateTime<Utc>) -> Vec<NodeRecord> {
    let total = nodes.len();
    let mut stale = 0usize;
    let mut no_location = 0usize;

    let fresh: Vec<NodeRecord> = nodes
        .into_iter()
        .filter(|node| match classify(node, cutoff) {
            Verdict::New => true,
            Verdict::Stale => {
                stale += 1;
                false
            }
            Verdict::NoLocation => {
                no_location += 1;
                tracing::debug!(node_id = %node.id, "filter.skip.no_location");
                false
            }
        })
        .collect();

    tracing::info!(
        %cutoff,
        total,
        new = fresh.len(),
        stale,
        no_location,
        "filter.done"
    );
    fresh
}

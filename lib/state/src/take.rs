// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Snapshot takers: project the cluster state onto one partitioning kind.

use std::collections::BTreeMap;

use tracing::warn;

use tessera_core::{GpuError, PartitioningKind, labels, mig, mps};

use crate::cluster::ClusterState;
use crate::node_view::PartitionableNode;
use crate::snapshot::ClusterSnapshot;

/// A taken snapshot plus the nodes that were refused.
///
/// A node with a matching partitioning label but broken GPU labels cannot
/// be planned for; it is surfaced here while the remaining nodes proceed.
pub struct TakeResult {
    pub snapshot: ClusterSnapshot,
    pub rejected: Vec<(String, GpuError)>,
}

/// Take a point-in-time snapshot of every node enrolled in `kind`.
///
/// Runs O(nodes + bindings) under the cluster state's read lock (the deep
/// copy happens in `ClusterState::get_nodes`).
pub fn take_snapshot(state: &ClusterState, kind: PartitioningKind) -> TakeResult {
    let mut nodes = BTreeMap::new();
    let mut rejected = Vec::new();

    for (name, info) in state.get_nodes() {
        if labels::partitioning_kind(info.node()) != Some(kind) {
            continue;
        }
        let view = match kind {
            PartitioningKind::Mig => mig::Node::from_node_info(info).map(PartitionableNode::Mig),
            PartitioningKind::Mps => mps::Node::from_node_info(info).map(PartitionableNode::Mps),
        };
        match view {
            Ok(node) => {
                nodes.insert(name, node);
            }
            Err(err) => {
                warn!(node = %name, error = %err, "refusing node for snapshot");
                rejected.push((name, err));
            }
        }
    }

    TakeResult {
        snapshot: ClusterSnapshot::new(kind, nodes),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::labels::{
        LABEL_GPU_PARTITIONING, LABEL_NVIDIA_COUNT, LABEL_NVIDIA_MEMORY, LABEL_NVIDIA_PRODUCT,
    };
    use tessera_core::testing::NodeBuilder;

    #[test]
    fn keeps_only_matching_kind_and_surfaces_broken_nodes() {
        let state = ClusterState::new();
        state.update_node(
            NodeBuilder::new("mig-node")
                .label(LABEL_GPU_PARTITIONING, "mig")
                .label(LABEL_NVIDIA_PRODUCT, "A30")
                .label(LABEL_NVIDIA_COUNT, "1")
                .build(),
            vec![],
        );
        state.update_node(
            NodeBuilder::new("mps-node")
                .label(LABEL_GPU_PARTITIONING, "mps")
                .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
                .label(LABEL_NVIDIA_COUNT, "1")
                .label(LABEL_NVIDIA_MEMORY, "40000")
                .build(),
            vec![],
        );
        // MIG-labeled but without GPU labels: refused, not fatal.
        state.update_node(
            NodeBuilder::new("broken-node")
                .label(LABEL_GPU_PARTITIONING, "mig")
                .build(),
            vec![],
        );

        let result = take_snapshot(&state, PartitioningKind::Mig);
        assert_eq!(result.snapshot.get_nodes().len(), 1);
        assert!(result.snapshot.get_node("mig-node").is_some());
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].0, "broken-node");
        assert!(matches!(result.rejected[0].1, GpuError::InvalidNodeLabels { .. }));

        let result = take_snapshot(&state, PartitioningKind::Mps);
        assert_eq!(result.snapshot.get_nodes().len(), 1);
        assert!(result.snapshot.get_node("mps-node").is_some());
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_the_cluster_state() {
        let state = ClusterState::new();
        state.update_node(
            NodeBuilder::new("mig-node")
                .label(LABEL_GPU_PARTITIONING, "mig")
                .label(LABEL_NVIDIA_PRODUCT, "A30")
                .label(LABEL_NVIDIA_COUNT, "1")
                .build(),
            vec![],
        );

        let result = take_snapshot(&state, PartitioningKind::Mig);
        state.delete_node("mig-node");
        // The snapshot still sees the node it deep-copied at take time.
        assert!(result.snapshot.get_node("mig-node").is_some());
    }
}

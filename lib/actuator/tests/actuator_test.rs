// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tessera_actuator::{Actuator, MemoryStore, MpsActuatorConfig};
use tessera_core::labels::{
    LABEL_DEVICE_PLUGIN_CONFIG, LABEL_GPU_PARTITIONING, LABEL_NVIDIA_COUNT, LABEL_NVIDIA_MEMORY,
    LABEL_NVIDIA_PRODUCT,
};
use tessera_core::testing::NodeBuilder;
use tessera_core::{NodeInfo, PartitioningKind, mps};
use tessera_planner::PartitioningPlan;
use tessera_state::{
    ClusterSnapshot, GpuPartitioning, NodePartitioning, PartitioningState, PartitionableNode,
};

fn mps_config() -> MpsActuatorConfig {
    MpsActuatorConfig {
        config_map_namespace: "gpu-operator".to_string(),
        config_map_name: "device-plugin-configs".to_string(),
        propagation_delay: Duration::from_millis(0),
    }
}

fn mps_snapshot(nodes: Vec<PartitionableNode>) -> ClusterSnapshot {
    ClusterSnapshot::new(
        PartitioningKind::Mps,
        nodes
            .into_iter()
            .map(|node| (node.name().to_string(), node))
            .collect(),
    )
}

fn mps_view(name: &str) -> PartitionableNode {
    let node = NodeBuilder::new(name)
        .label(LABEL_GPU_PARTITIONING, "mps")
        .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
        .label(LABEL_NVIDIA_COUNT, "1")
        .label(LABEL_NVIDIA_MEMORY, "40000")
        .build();
    PartitionableNode::Mps(mps::Node::from_node_info(NodeInfo::new(node)).unwrap())
}

fn node_partitioning(resources: &[(&str, u32)]) -> NodePartitioning {
    NodePartitioning {
        gpus: vec![GpuPartitioning {
            gpu_index: 0,
            resources: resources
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }],
    }
}

// P7: a plan equal to the snapshot's state applies nothing.
#[tokio::test]
async fn unchanged_plan_is_not_applied() {
    let store = Arc::new(MemoryStore::new());
    let snapshot = mps_snapshot(vec![mps_view("node-1")]);
    let plan = PartitioningPlan::new(snapshot.get_partitioning_state());

    let actuator = Actuator::new(store, mps_config());
    let applied = actuator
        .apply(&CancellationToken::new(), &snapshot, &plan)
        .await
        .unwrap();
    assert!(!applied);
}

// S1: an empty snapshot and an empty plan apply nothing.
#[tokio::test]
async fn empty_plan_is_not_applied() {
    let store = Arc::new(MemoryStore::new());
    let snapshot = mps_snapshot(vec![]);
    // An empty desired state differs from nothing and must still be a no-op.
    let plan = PartitioningPlan::new(PartitioningState::new());

    let actuator = Actuator::new(store, mps_config());
    let applied = actuator
        .apply(&CancellationToken::new(), &snapshot, &plan)
        .await
        .unwrap();
    assert!(!applied);
}

// S4 tail: the MPS discipline writes the ConfigMap entry, drops stale
// entries for the node and flips the node label to the new key.
#[tokio::test]
async fn mps_apply_writes_config_map_and_label() {
    let store = Arc::new(MemoryStore::new());
    store.insert_node(
        NodeBuilder::new("node-1")
            .label(LABEL_GPU_PARTITIONING, "mps")
            .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
            .label(LABEL_NVIDIA_COUNT, "1")
            .label(LABEL_NVIDIA_MEMORY, "40000")
            .build(),
    );

    let snapshot = mps_snapshot(vec![mps_view("node-1")]);
    let mut desired = PartitioningState::new();
    desired.insert(
        "node-1".to_string(),
        node_partitioning(&[("nvidia.com/gpu-10gb", 1), ("nvidia.com/gpu-5gb", 1)]),
    );
    let plan = PartitioningPlan::new(desired);

    let actuator = Actuator::new(store.clone(), mps_config());
    let applied = actuator
        .apply(&CancellationToken::new(), &snapshot, &plan)
        .await
        .unwrap();
    assert!(applied);

    let config_map = store.config_map("gpu-operator", "device-plugin-configs").unwrap();
    let data = config_map.data.unwrap();
    let key = format!("node-1-{}", plan.id());
    let yaml = data.get(&key).expect("config entry for the node");
    assert!(yaml.contains("rename: gpu-10gb"));
    assert!(yaml.contains("rename: gpu-5gb"));
    assert!(yaml.contains("migStrategy: none"));

    let node = store.node("node-1").unwrap();
    let labels = node.metadata.labels.unwrap();
    assert_eq!(labels.get(LABEL_DEVICE_PLUGIN_CONFIG), Some(&key));
}

// Re-applying for the same node replaces its previous ConfigMap entries.
#[tokio::test]
async fn stale_config_entries_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    store.insert_node(
        NodeBuilder::new("node-1")
            .label(LABEL_GPU_PARTITIONING, "mps")
            .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
            .label(LABEL_NVIDIA_COUNT, "1")
            .label(LABEL_NVIDIA_MEMORY, "40000")
            .build(),
    );

    let snapshot = mps_snapshot(vec![mps_view("node-1")]);
    let actuator = Actuator::new(store.clone(), mps_config());

    let mut first = PartitioningState::new();
    first.insert("node-1".to_string(), node_partitioning(&[("nvidia.com/gpu-10gb", 1)]));
    let first_plan = PartitioningPlan::new(first);
    actuator
        .apply(&CancellationToken::new(), &snapshot, &first_plan)
        .await
        .unwrap();

    let mut second = PartitioningState::new();
    second.insert("node-1".to_string(), node_partitioning(&[("nvidia.com/gpu-20gb", 2)]));
    let second_plan = PartitioningPlan::new(second);
    actuator
        .apply(&CancellationToken::new(), &snapshot, &second_plan)
        .await
        .unwrap();

    let data = store
        .config_map("gpu-operator", "device-plugin-configs")
        .unwrap()
        .data
        .unwrap();
    assert_eq!(data.len(), 1);
    assert!(data.contains_key(&format!("node-1-{}", second_plan.id())));

    // Entries of other nodes would be untouched: keys are node-scoped.
    let entry: Vec<&String> = data.keys().collect();
    assert!(entry[0].starts_with("node-1-"));
}

// A missing node aborts the call with a node-scoped error.
#[tokio::test]
async fn missing_node_aborts_apply() {
    let store = Arc::new(MemoryStore::new());
    let snapshot = mps_snapshot(vec![mps_view("node-1")]);
    let mut desired = PartitioningState::new();
    desired.insert("node-1".to_string(), node_partitioning(&[("nvidia.com/gpu-10gb", 1)]));
    let plan = PartitioningPlan::new(desired);

    let actuator = Actuator::new(store, mps_config());
    let err = actuator
        .apply(&CancellationToken::new(), &snapshot, &plan)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("node-1"));
}

// MIG plans land as spec annotations on the node.
#[tokio::test]
async fn mig_apply_patches_annotations() {
    let store = Arc::new(MemoryStore::new());
    store.insert_node(
        NodeBuilder::new("node-1")
            .label(LABEL_GPU_PARTITIONING, "mig")
            .label(LABEL_NVIDIA_PRODUCT, "A30")
            .label(LABEL_NVIDIA_COUNT, "1")
            .build(),
    );

    let node_view = {
        let node = store.node("node-1").unwrap();
        PartitionableNode::Mig(tessera_core::mig::Node::from_node_info(NodeInfo::new(node)).unwrap())
    };
    let snapshot = ClusterSnapshot::new(
        PartitioningKind::Mig,
        BTreeMap::from([("node-1".to_string(), node_view)]),
    );

    let mut desired = PartitioningState::new();
    desired.insert("node-1".to_string(), node_partitioning(&[("nvidia.com/mig-1g.6gb", 4)]));
    let plan = PartitioningPlan::new(desired);

    let actuator = Actuator::new(store.clone(), mps_config());
    let applied = actuator
        .apply(&CancellationToken::new(), &snapshot, &plan)
        .await
        .unwrap();
    assert!(applied);

    let annotations = store.node("node-1").unwrap().metadata.annotations.unwrap();
    assert_eq!(
        annotations.get("tessera.nvidia.com/spec-gpu-0-1g.6gb"),
        Some(&"4".to_string())
    );
    assert_eq!(
        annotations.get("tessera.nvidia.com/spec-partitioning-plan"),
        Some(&plan.id().to_string())
    );
}

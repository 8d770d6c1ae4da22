// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MIG actuation: declare the desired geometry through node annotations.
//!
//! The actuator owns the `spec-gpu-*` annotation namespace: every stale key
//! is deleted and the new set written in a single merge patch, together
//! with the plan id. Status annotations belong to the node agent and are
//! never touched.

use k8s_openapi::api::core::v1::Node;
use serde_json::json;
use tracing::debug;

use tessera_core::annotations::{
    ANNOTATION_GPU_SPEC_PREFIX, ANNOTATION_PARTITIONING_PLAN, SpecAnnotation,
};
use tessera_core::mig::ProfileName;
use tessera_planner::PlanId;
use tessera_state::NodePartitioning;

use crate::error::ActuateError;
use crate::store::ObjectStore;

pub(crate) async fn apply_partitioning(
    store: &dyn ObjectStore,
    node: &Node,
    plan_id: &PlanId,
    partitioning: &NodePartitioning,
) -> Result<(), ActuateError> {
    let node_name = node.metadata.name.as_deref().unwrap_or_default();

    let mut annotations = serde_json::Map::new();
    // Delete every existing spec annotation; the new set is re-added below.
    for key in node.metadata.annotations.iter().flatten().map(|(k, _)| k) {
        if key.starts_with(ANNOTATION_GPU_SPEC_PREFIX) {
            annotations.insert(key.clone(), serde_json::Value::Null);
        }
    }
    for gpu in &partitioning.gpus {
        for (resource, quantity) in &gpu.resources {
            let profile = ProfileName::from_resource_name(resource)
                .ok_or_else(|| ActuateError::InvalidResource(resource.clone()))?;
            let annotation = SpecAnnotation {
                index: gpu.gpu_index,
                profile: profile.to_string(),
                quantity: *quantity,
            };
            annotations.insert(annotation.key(), annotation.value().into());
        }
    }
    annotations.insert(
        ANNOTATION_PARTITIONING_PLAN.to_string(),
        plan_id.as_str().into(),
    );

    let patch = json!({"metadata": {"annotations": annotations}});
    store.patch_node(node_name, &patch).await?;
    debug!(node = %node_name, plan = %plan_id, "patched node annotations");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tessera_core::testing::NodeBuilder;
    use tessera_state::GpuPartitioning;

    use crate::store::MemoryStore;

    fn partitioning(entries: &[(usize, &str, u32)]) -> NodePartitioning {
        let mut gpus: BTreeMap<usize, GpuPartitioning> = BTreeMap::new();
        for (index, resource, quantity) in entries {
            gpus.entry(*index)
                .or_insert_with(|| GpuPartitioning {
                    gpu_index: *index,
                    resources: BTreeMap::new(),
                })
                .resources
                .insert(resource.to_string(), *quantity);
        }
        NodePartitioning {
            gpus: gpus.into_values().collect(),
        }
    }

    #[tokio::test]
    async fn replaces_spec_annotations_and_sets_plan() {
        let store = MemoryStore::new();
        store.insert_node(
            NodeBuilder::new("node-1")
                .annotation("tessera.nvidia.com/spec-gpu-0-4g.24gb", "1")
                .annotation("tessera.nvidia.com/status-gpu-0-4g.24gb-free", "1")
                .annotation("other.io/keep", "yes")
                .build(),
        );

        let plan_id = PlanId::from("plan-1".to_string());
        let desired = partitioning(&[(0, "nvidia.com/mig-1g.6gb", 4)]);
        let node = store.node("node-1").unwrap();
        apply_partitioning(&store, &node, &plan_id, &desired)
            .await
            .unwrap();

        let annotations = store.node("node-1").unwrap().metadata.annotations.unwrap();
        assert!(!annotations.contains_key("tessera.nvidia.com/spec-gpu-0-4g.24gb"));
        assert_eq!(
            annotations.get("tessera.nvidia.com/spec-gpu-0-1g.6gb"),
            Some(&"4".to_string())
        );
        assert_eq!(
            annotations.get("tessera.nvidia.com/spec-partitioning-plan"),
            Some(&"plan-1".to_string())
        );
        // Status annotations and foreign annotations survive.
        assert!(annotations.contains_key("tessera.nvidia.com/status-gpu-0-4g.24gb-free"));
        assert!(annotations.contains_key("other.io/keep"));
    }

    #[tokio::test]
    async fn rejects_non_mig_resources() {
        let store = MemoryStore::new();
        store.insert_node(NodeBuilder::new("node-1").build());
        let node = store.node("node-1").unwrap();
        let desired = partitioning(&[(0, "nvidia.com/gpu-10gb", 1)]);
        assert!(matches!(
            apply_partitioning(&store, &node, &PlanId::from("p".to_string()), &desired).await,
            Err(ActuateError::InvalidResource(_))
        ));
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MIG node initialization.
//!
//! A MIG-labeled node may join the cluster state only once it declares a
//! geometry. On first observation the initializer picks a default geometry
//! for every blank GPU (the legal one holding the most instances) and
//! writes it with a fresh plan id.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Node;
use tracing::{debug, info};

use tessera_core::{GpuError, NodeInfo, PartitioningKind, labels, mig};
use tessera_planner::PlanId;
use tessera_state::{GpuPartitioning, NodePartitioning};

use crate::error::ActuateError;
use crate::mig as mig_actuation;
use crate::store::ObjectStore;

pub struct NodeInitializer {
    store: Arc<dyn ObjectStore>,
}

impl NodeInitializer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Give every blank GPU on the node a default geometry and patch the
    /// spec annotations. A node whose GPUs all carry a geometry is left
    /// untouched.
    pub async fn init_node_partitioning(&self, node: &Node) -> Result<(), ActuateError> {
        let node_name = node.metadata.name.as_deref().unwrap_or_default();
        if labels::partitioning_kind(node) != Some(PartitioningKind::Mig) {
            return Err(GpuError::invalid_labels(node_name, "MIG partitioning is not enabled").into());
        }

        let view = mig::Node::from_node_info(NodeInfo::new(node.clone()))?;
        let mut gpus = view.gpus().to_vec();
        let mut initialized = 0;
        for gpu in &mut gpus {
            if !gpu.geometry().is_empty() {
                continue;
            }
            info!(node = %node_name, gpu = gpu.index(), "initializing MIG geometry");
            gpu.init_geometry()?;
            initialized += 1;
        }

        if initialized == 0 {
            debug!(node = %node_name, "all MIG GPUs are already initialized");
            return Ok(());
        }

        let partitioning = NodePartitioning {
            gpus: gpus
                .iter()
                .map(|gpu| GpuPartitioning {
                    gpu_index: gpu.index(),
                    resources: gpu.geometry_as_resources(),
                })
                .collect(),
        };
        let plan_id = PlanId::generate();
        info!(node = %node_name, plan = %plan_id, "applying initial partitioning");
        mig_actuation::apply_partitioning(self.store.as_ref(), node, &plan_id, &partitioning).await
    }
}

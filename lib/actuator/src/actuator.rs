// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Applies a partitioning plan to the cluster.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tessera_core::PartitioningKind;
use tessera_planner::PartitioningPlan;
use tessera_state::ClusterSnapshot;

use crate::error::ActuateError;
use crate::mig;
use crate::mps::MpsPartitioner;
use crate::store::ObjectStore;

/// Where the MPS device-plugin configuration lives and how long the plugin
/// needs to pick up a new entry.
#[derive(Debug, Clone)]
pub struct MpsActuatorConfig {
    pub config_map_namespace: String,
    pub config_map_name: String,
    pub propagation_delay: Duration,
}

impl Default for MpsActuatorConfig {
    fn default() -> Self {
        Self {
            config_map_namespace: "gpu-operator".to_string(),
            config_map_name: "device-plugin-configs".to_string(),
            propagation_delay: Duration::from_secs(30),
        }
    }
}

pub struct Actuator {
    store: Arc<dyn ObjectStore>,
    mps: MpsActuatorConfig,
}

impl Actuator {
    pub fn new(store: Arc<dyn ObjectStore>, mps: MpsActuatorConfig) -> Self {
        Self { store, mps }
    }

    /// Commit the plan. Returns false without touching anything when the
    /// plan matches the snapshot's state or is empty. A failing node aborts
    /// the call; nodes already patched stay patched and the next cycle
    /// retries the rest.
    pub async fn apply(
        &self,
        cancel: &CancellationToken,
        snapshot: &ClusterSnapshot,
        plan: &PartitioningPlan,
    ) -> Result<bool, ActuateError> {
        if plan.desired.same_as(&snapshot.get_partitioning_state()) {
            info!("current and desired partitioning states are equal, nothing to do");
            return Ok(false);
        }
        if plan.desired.is_empty() {
            info!("desired partitioning state is empty, nothing to do");
            return Ok(false);
        }

        for (node_name, partitioning) in plan.desired.iter() {
            if cancel.is_cancelled() {
                return Err(ActuateError::Canceled);
            }
            let node = self
                .store
                .get_node(node_name)
                .await
                .map_err(|err| ActuateError::for_node(node_name, err.into()))?;
            info!(node = %node_name, plan = %plan.id(), "partitioning node");

            let applied = match snapshot.kind() {
                PartitioningKind::Mig => {
                    mig::apply_partitioning(self.store.as_ref(), &node, plan.id(), partitioning)
                        .await
                }
                PartitioningKind::Mps => {
                    let partitioner = MpsPartitioner {
                        store: self.store.as_ref(),
                        config_map_namespace: &self.mps.config_map_namespace,
                        config_map_name: &self.mps.config_map_name,
                        propagation_delay: self.mps.propagation_delay,
                    };
                    partitioner
                        .apply_partitioning(cancel, &node, plan.id(), partitioning)
                        .await
                }
            };
            applied.map_err(|err| ActuateError::for_node(node_name, err))?;
        }

        info!(plan = %plan.id(), "plan applied");
        Ok(true)
    }
}

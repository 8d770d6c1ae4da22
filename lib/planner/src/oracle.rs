// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The scheduling admission oracle.
//!
//! The planner never decides by itself whether a pod would actually be
//! schedulable on a node; it asks an oracle. A production deployment can
//! forward to a full scheduler's prefilter+filter pipeline, while the
//! built-in [`ResourceFitOracle`] applies the standard resource-fit checks
//! against the node view. Implementations must be pure with respect to the
//! snapshot.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use tessera_core::{NodeInfo, resources};

#[async_trait]
pub trait SchedulingOracle: Send + Sync {
    /// Would this pod be admissible on this node view, given everything
    /// already bound to it?
    async fn can_schedule(&self, pod: &Pod, node: &NodeInfo) -> bool;
}

/// Resource-fit admission: the pod's request must fit into
/// `allocatable - requested` in every dimension, and the node must have a
/// pod slot left.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFitOracle;

impl ResourceFitOracle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SchedulingOracle for ResourceFitOracle {
    async fn can_schedule(&self, pod: &Pod, node: &NodeInfo) -> bool {
        let request = resources::compute_pod_request(pod);
        let available = node
            .allocatable()
            .subtract_non_negative(node.requested());

        if node.allocatable().pods > 0 && node.requested().pods >= node.allocatable().pods {
            debug!(node = %node.name(), "no pod slots left");
            return false;
        }
        let fits = request.fits_within(&available);
        if !fits {
            debug!(node = %node.name(), "pod request does not fit node");
        }
        fits
    }
}

/// Test oracle replaying a scripted sequence of verdicts, then admitting
/// everything.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    verdicts: parking_lot::Mutex<std::collections::VecDeque<bool>>,
}

impl ScriptedOracle {
    pub fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            verdicts: parking_lot::Mutex::new(verdicts.into_iter().collect()),
        }
    }

    /// An oracle that rejects the first `n` checks.
    pub fn rejecting_first(n: usize) -> Self {
        Self::new(std::iter::repeat(false).take(n))
    }
}

#[async_trait]
impl SchedulingOracle for ScriptedOracle {
    async fn can_schedule(&self, _pod: &Pod, _node: &NodeInfo) -> bool {
        self.verdicts.lock().pop_front().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::testing::{NodeBuilder, PodBuilder};

    #[tokio::test]
    async fn resource_fit_checks_scalars_and_cpu() {
        let node = NodeBuilder::new("node-1")
            .allocatable_cpu_millis(1000)
            .allocatable_scalar("nvidia.com/mig-1g.5gb", 1)
            .build();
        let mut info = NodeInfo::new(node);

        let fitting = PodBuilder::new("ns-1", "pd-1")
            .container(|c| c.cpu_millis(500).scalar("nvidia.com/mig-1g.5gb", 1))
            .build();
        let oracle = ResourceFitOracle::new();
        assert!(oracle.can_schedule(&fitting, &info).await);

        info.add_pod(fitting);
        let second = PodBuilder::new("ns-1", "pd-2")
            .container(|c| c.scalar("nvidia.com/mig-1g.5gb", 1))
            .build();
        assert!(!oracle.can_schedule(&second, &info).await);
    }

    #[tokio::test]
    async fn scripted_oracle_replays_then_admits() {
        let oracle = ScriptedOracle::rejecting_first(1);
        let node = NodeInfo::new(NodeBuilder::new("node-1").build());
        let pod = PodBuilder::new("ns-1", "pd-1").build();
        assert!(!oracle.can_schedule(&pod, &node).await);
        assert!(oracle.can_schedule(&pod, &node).await);
    }
}

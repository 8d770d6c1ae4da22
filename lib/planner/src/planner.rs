// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The partitioning search.
//!
//! Given a snapshot and the pending pods that could be helped, the planner
//! walks the candidate nodes in name order and, inside a fork of the
//! snapshot, tries to admit the sorted pods one by one. A pod that still
//! lacks slices triggers a geometry update for the tracker's aggregated
//! demand before it is given up on; pods whose demand is already served
//! get first pick of the existing free devices, so high-priority pods are
//! never starved by a reshape for lower-priority ones. A fork that admits
//! no pod is reverted, so the planner never leaves a GPU more fragmented
//! than it found it.

use std::collections::HashSet;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tessera_core::pod;
use tessera_state::{ClusterSnapshot, StateError};

use crate::oracle::SchedulingOracle;
use crate::plan::PartitioningPlan;
use crate::sort::sort_candidate_pods;
use crate::tracker::SliceTracker;

pub struct Planner {
    oracle: Arc<dyn SchedulingOracle>,
}

impl Planner {
    pub fn new(oracle: Arc<dyn SchedulingOracle>) -> Self {
        Self { oracle }
    }

    /// Compute the desired partitioning state for the snapshot, admitting
    /// as many of the candidate pods as possible.
    ///
    /// On cancellation the current fork is abandoned and the last committed
    /// partitioning state is returned unchanged.
    pub async fn plan(
        &self,
        cancel: &CancellationToken,
        snapshot: &mut ClusterSnapshot,
        candidate_pods: &[Pod],
    ) -> Result<PartitioningPlan, StateError> {
        info!(pods = candidate_pods.len(), kind = %snapshot.kind(), "planning desired GPU partitioning");

        let mut partitioning = snapshot.get_partitioning_state();
        let mut tracker = SliceTracker::new(snapshot, candidate_pods);
        if tracker.is_satisfied() {
            debug!("no lacking slices, nothing to do");
            return Ok(PartitioningPlan::new(partitioning));
        }

        let sorted_pods = sort_candidate_pods(candidate_pods, snapshot.kind());
        let candidate_nodes = snapshot.get_candidate_nodes();
        debug!(nodes = candidate_nodes.len(), "found candidate nodes");

        // A pod is placed on at most one node per cycle.
        let mut admitted: HashSet<(String, String)> = HashSet::new();

        for node_name in candidate_nodes {
            if tracker.is_satisfied() {
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            snapshot.fork()?;
            let mut added = 0usize;

            for candidate in &sorted_pods {
                if cancel.is_cancelled() {
                    snapshot.revert();
                    return Ok(PartitioningPlan::new(partitioning));
                }
                let key = pod::namespaced_name(candidate);
                if admitted.contains(&key) {
                    continue;
                }
                if self.try_add_pod(snapshot, &tracker, &node_name, candidate).await {
                    tracker.remove(candidate);
                    admitted.insert(key);
                    added += 1;
                    debug!(
                        namespace = %candidate.metadata.namespace.as_deref().unwrap_or(""),
                        pod = %candidate.metadata.name.as_deref().unwrap_or(""),
                        node = %node_name,
                        "pod fits node"
                    );
                }
            }

            if added == 0 {
                snapshot.revert();
            } else {
                if let Some(node) = snapshot.get_node(&node_name) {
                    partitioning.insert(node_name.clone(), node.partitioning());
                }
                snapshot.commit();
            }
        }

        Ok(PartitioningPlan::new(partitioning))
    }

    /// Try to admit one pod on one node inside the current fork. Returns
    /// true iff the pod was added to the snapshot.
    async fn try_add_pod(
        &self,
        snapshot: &mut ClusterSnapshot,
        tracker: &SliceTracker,
        node_name: &str,
        pod: &Pod,
    ) -> bool {
        // The cluster cannot serve this pod yet: reshape this node for the
        // aggregated lacking demand before giving up on the pod.
        if !snapshot.get_lacking_slices(pod).is_empty() {
            let Some(node) = snapshot.get_node(node_name) else {
                return false;
            };
            let mut node = node.clone();
            if node.update_geometry_for(tracker.lacking()) {
                debug!(node = %node_name, geometry = ?node.geometry(), "updated node geometry");
                snapshot.set_node(node);
            }
            // Still lacking: skip without a pointless oracle call.
            if !snapshot.get_lacking_slices(pod).is_empty() {
                return false;
            }
        }

        let Some(node) = snapshot.get_node(node_name) else {
            return false;
        };
        if !self.oracle.can_schedule(pod, node.node_info()).await {
            return false;
        }
        match snapshot.add_pod(node_name, pod) {
            Ok(()) => true,
            Err(err) => {
                debug!(node = %node_name, error = %err, "pod does not fit node");
                false
            }
        }
    }
}

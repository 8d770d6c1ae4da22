// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The per-kind partitioning cycle: batch pending pods, wait for the nodes
//! to report the previous plan, snapshot, plan, apply.
//!
//! One run loop exists per partitioning kind and never runs concurrently
//! with itself; the snapshot it takes is owned by the cycle alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tessera_actuator::Actuator;
use tessera_core::annotations::ANNOTATION_REPORTED_PARTITIONING_PLAN;
use tessera_core::{PartitioningKind, labels, pod};
use tessera_planner::{PlanId, Planner};
use tessera_state::{ClusterState, take_snapshot};

use crate::batcher::Batcher;

const REPORT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct PartitioningRunLoop {
    kind: PartitioningKind,
    state: Arc<ClusterState>,
    planner: Planner,
    actuator: Actuator,
    batcher: Batcher<Pod>,
    last_applied_plan: Option<PlanId>,
}

impl PartitioningRunLoop {
    pub fn new(
        kind: PartitioningKind,
        state: Arc<ClusterState>,
        planner: Planner,
        actuator: Actuator,
        batcher: Batcher<Pod>,
    ) -> Self {
        Self {
            kind,
            state,
            planner,
            actuator,
            batcher,
            last_applied_plan: None,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => return,
                batch = self.batcher.next_batch() => batch,
            };
            if batch.is_empty() {
                // Every sender is gone; the process is shutting down.
                return;
            }
            if let Err(err) = self.process(&cancel, batch).await {
                error!(kind = %self.kind, error = %err, "partitioning cycle failed");
            }
        }
    }

    async fn process(
        &mut self,
        cancel: &CancellationToken,
        batch: Vec<Pod>,
    ) -> tessera_core::Result<()> {
        // A pod may have been enqueued several times while it waited.
        let mut candidates: HashMap<(String, String), Pod> = HashMap::new();
        for p in batch {
            if pod::extra_resources_could_help(&p) {
                candidates.insert(pod::namespaced_name(&p), p);
            }
        }
        let candidates: Vec<Pod> = candidates.into_values().collect();
        info!(kind = %self.kind, pods = candidates.len(), "processing pending pods");
        if candidates.is_empty() {
            return Ok(());
        }
        if !self.state.is_partitioning_enabled(self.kind) {
            debug!(kind = %self.kind, "partitioning not enabled on any node");
            return Ok(());
        }

        self.wait_for_reported_plan(cancel).await;
        if cancel.is_cancelled() {
            return Ok(());
        }

        let take = take_snapshot(&self.state, self.kind);
        for (node, err) in &take.rejected {
            warn!(node = %node, error = %err, "node excluded from snapshot");
        }
        let mut snapshot = take.snapshot;

        let plan = self.planner.plan(cancel, &mut snapshot, &candidates).await?;
        let applied = self.actuator.apply(cancel, &snapshot, &plan).await?;
        if applied {
            self.last_applied_plan = Some(plan.id().clone());
        }
        Ok(())
    }

    /// Block until every node of this kind reports the last applied plan.
    /// Planning against nodes that have not converged yet would double
    /// count the slices the previous plan already created.
    async fn wait_for_reported_plan(&self, cancel: &CancellationToken) {
        let Some(last) = &self.last_applied_plan else {
            return;
        };
        loop {
            let all_reported = self.state.get_nodes().values().all(|info| {
                if labels::partitioning_kind(info.node()) != Some(self.kind) {
                    return true;
                }
                info.annotations()
                    .and_then(|a| a.get(ANNOTATION_REPORTED_PARTITIONING_PLAN))
                    .is_some_and(|reported| reported == last.as_str())
            });
            if all_reported {
                return;
            }
            info!(kind = %self.kind, plan = %last, "waiting for nodes to report last plan");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(REPORT_POLL_INTERVAL) => {}
            }
        }
    }
}

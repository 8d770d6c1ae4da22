// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The thread-safe in-memory mirror of the cluster.
//!
//! Mutated exclusively by the watch-event handlers, read by the planner
//! through point-in-time snapshots. A single readers-writer lock guards the
//! whole structure: mutations are short and never block on I/O, so the
//! simple lock matches the read-heavy workload.

use std::collections::HashMap;

use k8s_openapi::api::core::v1::{Node, Pod};
use parking_lot::RwLock;
use tracing::debug;

use tessera_core::{NodeInfo, PartitioningKind, labels, pod};

use crate::StateError;

#[derive(Default)]
struct ClusterStateInner {
    nodes: HashMap<String, NodeInfo>,
    /// Pod (namespace, name) -> node name.
    bindings: HashMap<(String, String), String>,
    /// Partitioning kind -> number of nodes enrolled in it.
    kinds: HashMap<PartitioningKind, usize>,
}

impl ClusterStateInner {
    fn refresh_partitioning_kinds(&mut self) {
        self.kinds.clear();
        for info in self.nodes.values() {
            if let Some(kind) = labels::partitioning_kind(info.node()) {
                *self.kinds.entry(kind).or_default() += 1;
            }
        }
    }
}

/// Cluster-wide mutable state shared across the reconcile tasks.
#[derive(Default)]
pub struct ClusterState {
    inner: RwLock<ClusterStateInner>,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node(&self, name: &str) -> Option<NodeInfo> {
        self.inner.read().nodes.get(name).cloned()
    }

    /// A deep copy of the node map, taken under the read lock.
    pub fn get_nodes(&self) -> HashMap<String, NodeInfo> {
        self.inner.read().nodes.clone()
    }

    /// True if at least one node is enrolled in the given partitioning kind.
    pub fn is_partitioning_enabled(&self, kind: PartitioningKind) -> bool {
        self.inner.read().kinds.get(&kind).copied().unwrap_or(0) > 0
    }

    /// Replace the cached entry for a node. Only Running pods join the
    /// node's pod set; the binding index is rebuilt for every passed pod.
    pub fn update_node(&self, node: Node, pods: Vec<Pod>) {
        let mut inner = self.inner.write();
        let name = node.metadata.name.clone().unwrap_or_default();

        let mut info = NodeInfo::new(node);
        for p in &pods {
            if pod::is_running(p) {
                info.add_pod(p.clone());
            }
        }
        inner.nodes.insert(name.clone(), info);

        inner.bindings.retain(|_, bound| *bound != name);
        for p in &pods {
            inner.bindings.insert(pod::namespaced_name(p), name.clone());
        }

        inner.refresh_partitioning_kinds();
    }

    /// Drop a node and every binding pointing at it.
    pub fn delete_node(&self, name: &str) {
        let mut inner = self.inner.write();
        inner.nodes.remove(name);
        inner.bindings.retain(|_, bound| bound != name);
        inner.refresh_partitioning_kinds();
    }

    /// Remove a pod from its bound node. Fails when the binding is unknown;
    /// the binding itself is dropped either way.
    pub fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        let key = (namespace.to_string(), name.to_string());
        let Some(node_name) = inner.bindings.remove(&key) else {
            return Err(StateError::PodNotTracked {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };
        if let Some(info) = inner.nodes.get_mut(&node_name) {
            info.remove_pod(namespace, name);
        }
        Ok(())
    }

    /// Reconcile the cached usage for a pod event.
    ///
    /// No-op for pods without a node assignment. When the assignment moved,
    /// the pod transfers from the old node to the new one (if Running); when
    /// it stayed but the pod left Running, it leaves the node's pod set.
    /// The binding is refreshed in every case.
    pub fn update_usage(&self, p: &Pod) {
        let Some(node_name) = pod::node_name(p).map(str::to_string) else {
            return;
        };

        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&node_name) {
            debug!(node = %node_name, "usage update for node not in cluster state");
            return;
        }

        let key = pod::namespaced_name(p);
        match inner.bindings.get(&key).cloned() {
            Some(cached) if cached != node_name => {
                if let Some(old) = inner.nodes.get_mut(&cached) {
                    old.remove_pod(&key.0, &key.1);
                }
                if pod::is_running(p) {
                    if let Some(new) = inner.nodes.get_mut(&node_name) {
                        new.add_pod(p.clone());
                    }
                }
            }
            Some(_) => {
                if !pod::is_running(p) {
                    if let Some(info) = inner.nodes.get_mut(&node_name) {
                        info.remove_pod(&key.0, &key.1);
                    }
                }
            }
            None => {
                if pod::is_running(p) {
                    if let Some(info) = inner.nodes.get_mut(&node_name) {
                        info.add_pod(p.clone());
                    }
                }
            }
        }
        inner.bindings.insert(key, node_name);
    }
}

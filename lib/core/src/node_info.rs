// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The scheduler's view of a node.
//!
//! Carries the raw node object plus the accounting the scheduling oracle
//! needs: the allocatable resource vector, the requested vector and the set
//! of running pods. The raw `Node` and the pods are shared by reference and
//! treated as immutable; cloning a `NodeInfo` deep-copies only the vectors.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Node, Pod};

use crate::resources::{self, Resources};

#[derive(Debug, Clone)]
pub struct NodeInfo {
    node: Arc<Node>,
    pods: Vec<Arc<Pod>>,
    allocatable: Resources,
    requested: Resources,
}

impl NodeInfo {
    pub fn new(node: Node) -> Self {
        let allocatable = node
            .status
            .as_ref()
            .and_then(|s| s.allocatable.as_ref())
            .map(Resources::from_resource_list)
            .unwrap_or_default();
        Self {
            node: Arc::new(node),
            pods: Vec::new(),
            allocatable,
            requested: Resources::new(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn name(&self) -> &str {
        self.node
            .metadata
            .name
            .as_deref()
            .unwrap_or_default()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.node.metadata.labels.as_ref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.node.metadata.annotations.as_ref()
    }

    pub fn pods(&self) -> &[Arc<Pod>] {
        &self.pods
    }

    pub fn allocatable(&self) -> &Resources {
        &self.allocatable
    }

    pub fn requested(&self) -> &Resources {
        &self.requested
    }

    /// Account a pod on this node: it joins the pod set and its request is
    /// added to the requested vector.
    pub fn add_pod(&mut self, pod: Pod) {
        self.requested.add(&resources::compute_pod_request(&pod));
        self.requested.pods += 1;
        self.pods.push(Arc::new(pod));
    }

    /// Remove a pod by namespace and name. Returns false when the pod is
    /// not on this node.
    pub fn remove_pod(&mut self, namespace: &str, name: &str) -> bool {
        let Some(position) = self.pods.iter().position(|p| {
            p.metadata.namespace.as_deref() == Some(namespace)
                && p.metadata.name.as_deref() == Some(name)
        }) else {
            return false;
        };
        let pod = self.pods.remove(position);
        self.requested.subtract(&resources::compute_pod_request(&pod));
        self.requested.pods -= 1;
        true
    }

    /// Replace the allocatable entries for scalar resources matching
    /// `prefix` with `updated`. Geometry changes in a planning fork use this
    /// to keep the oracle's view consistent with the new devices.
    pub fn set_scalar_allocatable(&mut self, prefix: &str, updated: BTreeMap<String, u32>) {
        self.allocatable.scalars.retain(|name, _| !name.starts_with(prefix));
        for (name, count) in updated {
            self.allocatable.scalars.insert(name, count as i64);
        }
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Builders for Kubernetes fixtures used across the workspace's tests.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, Node, NodeStatus, Pod, PodCondition, PodSpec, PodStatus, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

#[derive(Default)]
pub struct ContainerBuilder {
    requests: BTreeMap<String, Quantity>,
}

impl ContainerBuilder {
    pub fn cpu_millis(mut self, millis: i64) -> Self {
        self.requests
            .insert("cpu".to_string(), Quantity(format!("{millis}m")));
        self
    }

    pub fn memory_gi(mut self, gi: i64) -> Self {
        self.requests
            .insert("memory".to_string(), Quantity(format!("{gi}Gi")));
        self
    }

    pub fn scalar(mut self, name: &str, quantity: i64) -> Self {
        self.requests
            .insert(name.to_string(), Quantity(quantity.to_string()));
        self
    }

    fn build(self, name: &str) -> Container {
        Container {
            name: name.to_string(),
            image: Some("test".to_string()),
            resources: Some(ResourceRequirements {
                requests: Some(self.requests),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub struct PodBuilder {
    pod: Pod,
    containers: Vec<Container>,
    init_containers: Vec<Container>,
}

impl PodBuilder {
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut pod = Pod::default();
        pod.metadata.namespace = Some(namespace.to_string());
        pod.metadata.name = Some(name.to_string());
        Self {
            pod,
            containers: Vec::new(),
            init_containers: Vec::new(),
        }
    }

    pub fn container(mut self, build: impl FnOnce(ContainerBuilder) -> ContainerBuilder) -> Self {
        let container = build(ContainerBuilder::default());
        let name = format!("c-{}", self.containers.len() + 1);
        self.containers.push(container.build(&name));
        self
    }

    pub fn init_container(
        mut self,
        build: impl FnOnce(ContainerBuilder) -> ContainerBuilder,
    ) -> Self {
        let container = build(ContainerBuilder::default());
        let name = format!("init-{}", self.init_containers.len() + 1);
        self.init_containers.push(container.build(&name));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.spec().priority = Some(priority);
        self
    }

    pub fn node_name(mut self, node: &str) -> Self {
        self.spec().node_name = Some(node.to_string());
        self
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.status().phase = Some(phase.to_string());
        self
    }

    pub fn unschedulable(mut self) -> Self {
        let status = self.status();
        status
            .conditions
            .get_or_insert_with(Vec::new)
            .push(PodCondition {
                type_: "PodScheduled".to_string(),
                status: "False".to_string(),
                reason: Some("Unschedulable".to_string()),
                ..Default::default()
            });
        self
    }

    fn spec(&mut self) -> &mut PodSpec {
        self.pod.spec.get_or_insert_with(PodSpec::default)
    }

    fn status(&mut self) -> &mut PodStatus {
        self.pod.status.get_or_insert_with(PodStatus::default)
    }

    pub fn build(mut self) -> Pod {
        if !self.containers.is_empty() || !self.init_containers.is_empty() || self.pod.spec.is_some()
        {
            let containers = std::mem::take(&mut self.containers);
            let init_containers = std::mem::take(&mut self.init_containers);
            let spec = self.spec();
            spec.containers = containers;
            if !init_containers.is_empty() {
                spec.init_containers = Some(init_containers);
            }
        }
        self.pod
    }
}

pub struct NodeBuilder {
    node: Node,
    allocatable: BTreeMap<String, Quantity>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        Self {
            node,
            allocatable: BTreeMap::new(),
        }
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.node
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.node
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn allocatable_cpu_millis(mut self, millis: i64) -> Self {
        self.allocatable
            .insert("cpu".to_string(), Quantity(format!("{millis}m")));
        self
    }

    pub fn allocatable_memory_gi(mut self, gi: i64) -> Self {
        self.allocatable
            .insert("memory".to_string(), Quantity(format!("{gi}Gi")));
        self
    }

    pub fn allocatable_pods(mut self, pods: i64) -> Self {
        self.allocatable
            .insert("pods".to_string(), Quantity(pods.to_string()));
        self
    }

    pub fn allocatable_scalar(mut self, name: &str, quantity: i64) -> Self {
        self.allocatable
            .insert(name.to_string(), Quantity(quantity.to_string()));
        self
    }

    pub fn build(mut self) -> Node {
        if !self.allocatable.is_empty() {
            self.node
                .status
                .get_or_insert_with(NodeStatus::default)
                .allocatable = Some(self.allocatable);
        }
        self.node
    }
}

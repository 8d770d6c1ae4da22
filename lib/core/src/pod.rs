// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pod predicates and accessors used by the planner and the reconcile shell.

use k8s_openapi::api::core::v1::Pod;

pub const POD_PHASE_PENDING: &str = "Pending";
pub const POD_PHASE_RUNNING: &str = "Running";

pub fn namespaced_name(pod: &Pod) -> (String, String) {
    (
        pod.metadata.namespace.clone().unwrap_or_default(),
        pod.metadata.name.clone().unwrap_or_default(),
    )
}

pub fn phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref()?.phase.as_deref()
}

pub fn node_name(pod: &Pod) -> Option<&str> {
    pod.spec.as_ref()?.node_name.as_deref()
}

pub fn priority(pod: &Pod) -> i32 {
    pod.spec.as_ref().and_then(|s| s.priority).unwrap_or(0)
}

pub fn is_running(pod: &Pod) -> bool {
    phase(pod) == Some(POD_PHASE_RUNNING)
}

pub fn is_pending(pod: &Pod) -> bool {
    phase(pod) == Some(POD_PHASE_PENDING)
}

pub fn is_scheduled(pod: &Pod) -> bool {
    node_name(pod).is_some_and(|n| !n.is_empty())
}

pub fn is_preempting(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.nominated_node_name.as_deref())
        .is_some_and(|n| !n.is_empty())
}

pub fn is_unschedulable(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.type_ == "PodScheduled" && c.reason.as_deref() == Some("Unschedulable")
            })
        })
}

fn is_owned_by_daemon_set(pod: &Pod) -> bool {
    pod.metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.kind == "DaemonSet")
}

fn is_owned_by_node(pod: &Pod) -> bool {
    pod.metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.kind == "Node")
}

/// True when the pod is stuck pending and creating additional GPU slices
/// could make it schedulable: pending, marked unschedulable, not already
/// assigned or preempting, and not node- or daemonset-owned.
pub fn extra_resources_could_help(pod: &Pod) -> bool {
    !is_scheduled(pod)
        && is_pending(pod)
        && is_unschedulable(pod)
        && !is_preempting(pod)
        && !is_owned_by_daemon_set(pod)
        && !is_owned_by_node(pod)
}

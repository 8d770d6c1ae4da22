// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! GPU spec and status annotations.
//!
//! The partitioner declares the desired geometry of a node through `spec`
//! annotations; the on-node agent reports the observed devices through
//! `status` annotations. Formats:
//!
//!   tessera.nvidia.com/spec-gpu-<index>-<profile>            = <count>
//!   tessera.nvidia.com/status-gpu-<index>-<profile>-<status> = <count>
//!
//! where `<status>` is `free` or `used`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Node;

use crate::device::DeviceStatus;

pub const ANNOTATION_GPU_SPEC_PREFIX: &str = "tessera.nvidia.com/spec-gpu";
pub const ANNOTATION_GPU_STATUS_PREFIX: &str = "tessera.nvidia.com/status-gpu";
/// The id of the partitioning plan last applied to the node.
pub const ANNOTATION_PARTITIONING_PLAN: &str = "tessera.nvidia.com/spec-partitioning-plan";
/// The id of the partitioning plan last reported by the node agent.
pub const ANNOTATION_REPORTED_PARTITIONING_PLAN: &str =
    "tessera.nvidia.com/status-partitioning-plan";

/// Desired devices on one GPU: `<count>` instances of `<profile>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAnnotation {
    pub index: usize,
    pub profile: String,
    pub quantity: u32,
}

impl SpecAnnotation {
    pub fn key(&self) -> String {
        format!("{ANNOTATION_GPU_SPEC_PREFIX}-{}-{}", self.index, self.profile)
    }

    pub fn value(&self) -> String {
        self.quantity.to_string()
    }

    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let rest = key.strip_prefix(ANNOTATION_GPU_SPEC_PREFIX)?.strip_prefix('-')?;
        let (index, profile) = rest.split_once('-')?;
        Some(Self {
            index: index.parse().ok()?,
            profile: profile.to_string(),
            quantity: value.parse().ok()?,
        })
    }
}

/// Observed devices on one GPU: `<count>` free or used instances of
/// `<profile>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAnnotation {
    pub index: usize,
    pub profile: String,
    pub status: DeviceStatus,
    pub quantity: u32,
}

impl StatusAnnotation {
    pub fn key(&self) -> String {
        format!(
            "{ANNOTATION_GPU_STATUS_PREFIX}-{}-{}-{}",
            self.index, self.profile, self.status
        )
    }

    pub fn value(&self) -> String {
        self.quantity.to_string()
    }

    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let rest = key
            .strip_prefix(ANNOTATION_GPU_STATUS_PREFIX)?
            .strip_prefix('-')?;
        let (index, rest) = rest.split_once('-')?;
        let (profile, status) = rest.rsplit_once('-')?;
        Some(Self {
            index: index.parse().ok()?,
            profile: profile.to_string(),
            status: DeviceStatus::parse(status)?,
            quantity: value.parse().ok()?,
        })
    }

    pub fn is_used(&self) -> bool {
        self.status == DeviceStatus::Used
    }

    pub fn is_free(&self) -> bool {
        self.status == DeviceStatus::Free
    }
}

/// Split a node's annotations into the status and spec sets, ignoring
/// everything else.
pub fn parse_node_annotations(node: &Node) -> (Vec<StatusAnnotation>, Vec<SpecAnnotation>) {
    let mut status = Vec::new();
    let mut spec = Vec::new();
    for (key, value) in node.metadata.annotations.iter().flatten() {
        if let Some(annotation) = SpecAnnotation::parse(key, value) {
            spec.push(annotation);
        } else if let Some(annotation) = StatusAnnotation::parse(key, value) {
            status.push(annotation);
        }
    }
    (status, spec)
}

/// Group status annotations by the GPU index they refer to.
pub fn group_status_by_gpu(annotations: Vec<StatusAnnotation>) -> BTreeMap<usize, Vec<StatusAnnotation>> {
    let mut grouped: BTreeMap<usize, Vec<StatusAnnotation>> = BTreeMap::new();
    for annotation in annotations {
        grouped.entry(annotation.index).or_default().push(annotation);
    }
    grouped
}

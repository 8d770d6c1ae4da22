// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Node labels the partitioner consults.
//!
//! The partitioning kind comes from our own domain; GPU model, count and
//! memory are the labels published by NVIDIA GPU feature discovery.

use k8s_openapi::api::core::v1::Node;

use crate::{GpuModel, PartitioningKind};

/// Selects the partitioning regime of a node: `mig` or `mps`.
pub const LABEL_GPU_PARTITIONING: &str = "tessera.nvidia.com/gpu-partitioning";

/// GPU product name, e.g. `NVIDIA-A100-40GB-SXM4`.
pub const LABEL_NVIDIA_PRODUCT: &str = "nvidia.com/gpu.product";
/// Number of physical GPUs on the node.
pub const LABEL_NVIDIA_COUNT: &str = "nvidia.com/gpu.count";
/// Memory of each GPU, in megabytes.
pub const LABEL_NVIDIA_MEMORY: &str = "nvidia.com/gpu.memory";

/// Device-plugin configuration key currently applied to the node.
pub const LABEL_DEVICE_PLUGIN_CONFIG: &str = "nvidia.com/device-plugin.config";

fn label<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(key))
        .map(String::as_str)
}

pub fn partitioning_kind(node: &Node) -> Option<PartitioningKind> {
    PartitioningKind::parse(label(node, LABEL_GPU_PARTITIONING)?)
}

pub fn gpu_model(node: &Node) -> Option<GpuModel> {
    label(node, LABEL_NVIDIA_PRODUCT).map(GpuModel::from)
}

pub fn gpu_count(node: &Node) -> Option<usize> {
    label(node, LABEL_NVIDIA_COUNT)?.parse().ok()
}

/// Per-GPU memory in gigabytes. GPU feature discovery reports megabytes.
pub fn gpu_memory_gb(node: &Node) -> Option<u32> {
    let mb: u64 = label(node, LABEL_NVIDIA_MEMORY)?.parse().ok()?;
    Some((mb / 1000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NodeBuilder;

    #[test]
    fn reads_gpu_labels() {
        let node = NodeBuilder::new("node-1")
            .label(LABEL_GPU_PARTITIONING, "mps")
            .label(LABEL_NVIDIA_PRODUCT, "A30")
            .label(LABEL_NVIDIA_COUNT, "2")
            .label(LABEL_NVIDIA_MEMORY, "24000")
            .build();
        assert_eq!(partitioning_kind(&node), Some(PartitioningKind::Mps));
        assert_eq!(gpu_model(&node), Some(GpuModel::from("A30")));
        assert_eq!(gpu_count(&node), Some(2));
        assert_eq!(gpu_memory_gb(&node), Some(24));
    }

    #[test]
    fn missing_or_invalid_labels_yield_none() {
        let node = NodeBuilder::new("node-1")
            .label(LABEL_GPU_PARTITIONING, "exclusive")
            .label(LABEL_NVIDIA_COUNT, "two")
            .build();
        assert_eq!(partitioning_kind(&node), None);
        assert_eq!(gpu_model(&node), None);
        assert_eq!(gpu_count(&node), None);
    }
}

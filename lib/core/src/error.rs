// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Typed error kinds for GPU partitioning.

/// Errors produced while constructing or mutating partitionable GPU views.
///
/// Callers dispatch on the variant: `InsufficientCapacity` and
/// `InfeasibleGeometry` are recoverable inside a planning cycle (skip the
/// pod or node and keep searching), while `InvalidNodeLabels` marks a node
/// that cannot participate in partitioning at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GpuError {
    #[error("node {node} cannot be partitioned: {reason}")]
    InvalidNodeLabels { node: String, reason: String },

    #[error("model {0} is not associated with any known GPU")]
    UnknownModel(String),

    #[error("not enough free devices (requested {requested} {profile}, but GPU only has {free})")]
    InsufficientCapacity {
        profile: String,
        requested: u32,
        free: u32,
    },

    #[error("no legal geometry satisfies the requested profiles without deleting used devices")]
    InfeasibleGeometry,
}

impl GpuError {
    pub fn invalid_labels(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeLabels {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use tessera_core::GpuError;

/// Errors from cluster-state and snapshot mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateError {
    #[error("node {0} is not tracked in the cluster state")]
    UnknownNode(String),

    #[error("pod {namespace}/{name} is not tracked in the cluster state")]
    PodNotTracked { namespace: String, name: String },

    /// Programmer error: a fork is already in progress. The caller must
    /// commit or revert first.
    #[error("snapshot already forked")]
    AlreadyForked,

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

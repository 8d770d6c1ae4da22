// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use tessera_core::GpuError;

use crate::store::StoreError;

/// Errors while applying a partitioning plan.
///
/// A per-node failure aborts the whole call; already-patched nodes are not
/// rolled back, the next reconcile cycle re-converges them.
#[derive(Debug, thiserror::Error)]
pub enum ActuateError {
    #[error("error partitioning node {node}: {source}")]
    Node {
        node: String,
        #[source]
        source: Box<ActuateError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("resource {0} is not a valid slice of the plan's partitioning kind")]
    InvalidResource(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("canceled")]
    Canceled,
}

impl ActuateError {
    pub fn for_node(node: impl Into<String>, source: ActuateError) -> Self {
        Self::Node {
            node: node.into(),
            source: Box::new(source),
        }
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tessera core: the data model of partitionable GPUs.
//!
//! This crate hosts everything the planner and actuator agree on but that does
//! not depend on cluster state: GPU models and their geometry catalog, MIG and
//! MPS profiles, the partitionable GPU/node views, resource arithmetic and the
//! node label/annotation wire formats.

pub use anyhow::{
    Context as ErrorContext, Error, Ok as OK, Result, anyhow as error, bail as raise,
};
pub use tokio_util::sync::CancellationToken;

pub mod annotations;
pub mod catalog;
pub mod device;
pub mod error;
pub mod labels;
pub mod mig;
pub mod mps;
pub mod node_info;
pub mod pod;
pub mod resources;
pub mod slice;
pub mod testing;

pub use error::GpuError;
pub use node_info::NodeInfo;
pub use resources::Resources;
pub use slice::{PartitioningKind, Slice, SliceMap};

/// GPU model identifier, as reported by GPU feature discovery
/// (e.g. `A30`, `NVIDIA-A100-40GB-SXM4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuModel(pub String);

impl std::fmt::Display for GpuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GpuModel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

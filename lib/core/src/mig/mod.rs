// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MIG partitioning: catalog-restricted hardware slices.

mod gpu;
mod node;
mod profile;

pub use gpu::{Geometry, Gpu, geometry_instances};
pub use node::Node;
pub use profile::ProfileName;

/// Resource-name prefix for MIG devices exposed by the NVIDIA device plugin.
pub const MIG_RESOURCE_PREFIX: &str = "nvidia.com/mig-";

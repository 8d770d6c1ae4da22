// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MPS partitioning: software memory shares on whole GPUs.

mod gpu;
mod node;
mod profile;

pub use gpu::Gpu;
pub use node::Node;
pub use profile::Profile;

/// Resource-name prefix for MPS shares exposed by the NVIDIA device plugin.
pub const MPS_RESOURCE_PREFIX: &str = "nvidia.com/gpu-";

/// Smallest share the device plugin accepts.
pub const MIN_SLICE_MEMORY_GB: u32 = 1;

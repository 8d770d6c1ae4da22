// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-model MIG geometry catalog.
//!
//! Every supported GPU model publishes the finite list of profile multisets
//! a single physical GPU may hold, taken from NVIDIA's MIG documentation.
//! The catalog is process-wide constant state: initialized on first access,
//! never mutated afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::mig::{Geometry, ProfileName};
use crate::{GpuError, GpuModel};

pub const MODEL_A30: &str = "A30";
pub const MODEL_A100_SXM4_40GB: &str = "NVIDIA-A100-40GB-SXM4";
pub const MODEL_A100_PCIE_80GB: &str = "NVIDIA-A100-80GB-PCIe";

fn geometry(entries: &[(u32, u32, u32)]) -> Geometry {
    entries
        .iter()
        .map(|&(gi, gb, count)| (ProfileName::new(gi, gb), count))
        .collect()
}

static CATALOG: Lazy<HashMap<GpuModel, Vec<Geometry>>> = Lazy::new(|| {
    let mut models = HashMap::new();

    models.insert(
        GpuModel::from(MODEL_A30),
        vec![
            geometry(&[(4, 24, 1)]),
            geometry(&[(2, 12, 2)]),
            geometry(&[(2, 12, 1), (1, 6, 2)]),
            geometry(&[(1, 6, 4)]),
        ],
    );

    models.insert(
        GpuModel::from(MODEL_A100_SXM4_40GB),
        vec![
            geometry(&[(7, 40, 1)]),
            geometry(&[(4, 20, 1), (2, 10, 1), (1, 5, 1)]),
            geometry(&[(4, 20, 1), (1, 5, 3)]),
            geometry(&[(3, 20, 2)]),
            geometry(&[(3, 20, 1), (2, 10, 1), (1, 5, 1)]),
            geometry(&[(3, 20, 1), (1, 5, 3)]),
            geometry(&[(3, 20, 1), (2, 10, 2)]),
            geometry(&[(3, 20, 1), (2, 10, 1), (1, 5, 2)]),
            geometry(&[(2, 10, 3), (1, 5, 1)]),
            geometry(&[(2, 10, 2), (1, 5, 3)]),
            geometry(&[(2, 10, 1), (1, 5, 5)]),
            geometry(&[(1, 5, 7)]),
        ],
    );

    models.insert(
        GpuModel::from(MODEL_A100_PCIE_80GB),
        vec![
            geometry(&[(7, 80, 1)]),
            geometry(&[(4, 40, 1), (2, 20, 1), (1, 10, 1)]),
            geometry(&[(4, 40, 1), (1, 10, 3)]),
            geometry(&[(3, 40, 2)]),
            geometry(&[(3, 40, 1), (2, 20, 1), (1, 10, 1)]),
            geometry(&[(3, 40, 1), (1, 10, 3)]),
            geometry(&[(3, 40, 1), (2, 20, 2)]),
            geometry(&[(3, 40, 1), (2, 20, 1), (1, 10, 2)]),
            geometry(&[(2, 20, 3), (1, 10, 1)]),
            geometry(&[(2, 20, 2), (1, 10, 3)]),
            geometry(&[(2, 20, 1), (1, 10, 5)]),
            geometry(&[(1, 10, 7)]),
        ],
    );

    models
});

/// The legal geometries for a GPU model.
pub fn legal_geometries(model: &GpuModel) -> Result<&'static [Geometry], GpuError> {
    CATALOG
        .get(model)
        .map(Vec::as_slice)
        .ok_or_else(|| GpuError::UnknownModel(model.to_string()))
}

/// Upper bound on the instances of `profile` a single GPU of `model` can
/// hold, across all legal geometries.
pub fn max_instances(model: &GpuModel, profile: &ProfileName) -> u32 {
    CATALOG
        .get(model)
        .map(|geometries| {
            geometries
                .iter()
                .filter_map(|g| g.get(profile).copied())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use tessera_state::PartitioningState;

static PLAN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier of a partitioning plan.
///
/// Timestamp-derived so that external plumbing can break ties by recency,
/// sanitized for use in annotation values and ConfigMap keys, and suffixed
/// with a process-wide sequence number so that two plans produced within
/// the same instant never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanId(String);

impl PlanId {
    pub fn generate() -> Self {
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S%.9f").to_string();
        let timestamp = timestamp.replace('.', "-");
        let sequence = PLAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{timestamp}-{sequence}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PlanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The desired cluster partitioning produced by a planning cycle.
#[derive(Debug, Clone)]
pub struct PartitioningPlan {
    pub desired: PartitioningState,
    id: PlanId,
}

impl PartitioningPlan {
    pub fn new(desired: PartitioningState) -> Self {
        Self {
            desired,
            id: PlanId::generate(),
        }
    }

    pub fn id(&self) -> &PlanId {
        &self.id
    }
}

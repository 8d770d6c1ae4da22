// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tessera planner: searches for a cluster partitioning that admits as many
//! pending pods as possible, without ever touching running work.

mod oracle;
mod plan;
mod planner;
mod sort;
mod tracker;

pub use oracle::{ResourceFitOracle, SchedulingOracle, ScriptedOracle};
pub use plan::{PartitioningPlan, PlanId};
pub use planner::Planner;
pub use sort::sort_candidate_pods;
pub use tracker::SliceTracker;

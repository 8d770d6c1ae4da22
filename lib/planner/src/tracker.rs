// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;

use tessera_core::{SliceMap, pod};
use tessera_state::ClusterSnapshot;

/// Tracks, per slice, how much of the candidate pods' demand the cluster
/// cannot currently serve.
///
/// Each pod's lacking contribution is indexed so that removing an admitted
/// pod is O(its slices).
pub struct SliceTracker {
    kind: tessera_core::PartitioningKind,
    requested: SliceMap,
    lacking: SliceMap,
    per_pod: HashMap<(String, String), SliceMap>,
}

impl SliceTracker {
    pub fn new(snapshot: &ClusterSnapshot, pods: &[Pod]) -> Self {
        let kind = snapshot.kind();
        let mut requested = SliceMap::new();
        let mut lacking = SliceMap::new();
        let mut per_pod: HashMap<(String, String), SliceMap> = HashMap::new();

        for p in pods {
            let pod_lacking = snapshot.get_lacking_slices(p);
            for (slice, quantity) in &pod_lacking {
                *lacking.entry(*slice).or_default() += quantity;
            }
            let entry = per_pod.entry(pod::namespaced_name(p)).or_default();
            for (slice, quantity) in pod_lacking {
                *entry.entry(slice).or_default() += quantity;
            }
            for (slice, quantity) in kind.requested_slices(p) {
                *requested.entry(slice).or_default() += quantity;
            }
        }

        Self {
            kind,
            requested,
            lacking,
            per_pod,
        }
    }

    pub fn lacking(&self) -> &SliceMap {
        &self.lacking
    }

    pub fn requested(&self) -> &SliceMap {
        &self.requested
    }

    pub fn is_satisfied(&self) -> bool {
        self.lacking.is_empty()
    }

    /// Drop an admitted pod's contribution from the totals.
    pub fn remove(&mut self, p: &Pod) {
        for (slice, quantity) in self.kind.requested_slices(p) {
            if let Some(total) = self.requested.get_mut(&slice) {
                *total = total.saturating_sub(quantity);
                if *total == 0 {
                    self.requested.remove(&slice);
                }
            }
        }
        if let Some(pod_lacking) = self.per_pod.remove(&pod::namespaced_name(p)) {
            for (slice, quantity) in pod_lacking {
                if let Some(total) = self.lacking.get_mut(&slice) {
                    *total = total.saturating_sub(quantity);
                    if *total == 0 {
                        self.lacking.remove(&slice);
                    }
                }
            }
        }
    }
}

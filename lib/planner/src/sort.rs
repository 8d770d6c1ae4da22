// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use k8s_openapi::api::core::v1::Pod;

use tessera_core::{PartitioningKind, pod};

/// Sort candidate pods for planning: higher priority first; among equal
/// priorities, the pod with the smaller smallest-requested-slice first so
/// that more pods fit. Pods requesting no slice of this kind keep their
/// relative order at the back of each priority band (the sort is stable).
pub fn sort_candidate_pods(pods: &[Pod], kind: PartitioningKind) -> Vec<Pod> {
    let mut sorted = pods.to_vec();
    sorted.sort_by(|a, b| {
        let by_priority = pod::priority(b).cmp(&pod::priority(a));
        if by_priority != Ordering::Equal {
            return by_priority;
        }
        let a_smallest = kind.requested_slices(a).keys().next().copied();
        let b_smallest = kind.requested_slices(b).keys().next().copied();
        match (a_smallest, b_smallest) {
            (Some(a_slice), Some(b_slice)) => a_slice.cmp(&b_slice),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::testing::PodBuilder;

    fn names(pods: &[Pod]) -> Vec<&str> {
        pods.iter()
            .map(|p| p.metadata.name.as_deref().unwrap())
            .collect()
    }

    #[test]
    fn priority_dominates_slice_size() {
        let pods = vec![
            PodBuilder::new("ns-1", "small-low")
                .priority(1)
                .container(|c| c.scalar("nvidia.com/mig-1g.5gb", 1))
                .build(),
            PodBuilder::new("ns-1", "big-high")
                .priority(10)
                .container(|c| c.scalar("nvidia.com/mig-7g.40gb", 1))
                .build(),
        ];
        let sorted = sort_candidate_pods(&pods, PartitioningKind::Mig);
        assert_eq!(names(&sorted), vec!["big-high", "small-low"]);
    }

    #[test]
    fn smaller_slices_first_within_a_priority_band() {
        let pods = vec![
            PodBuilder::new("ns-1", "big")
                .container(|c| c.scalar("nvidia.com/mig-3g.20gb", 1))
                .build(),
            PodBuilder::new("ns-1", "none")
                .container(|c| c.cpu_millis(100))
                .build(),
            PodBuilder::new("ns-1", "small")
                .container(|c| c.scalar("nvidia.com/mig-1g.5gb", 1))
                .build(),
        ];
        let sorted = sort_candidate_pods(&pods, PartitioningKind::Mig);
        assert_eq!(names(&sorted), vec!["small", "big", "none"]);
    }

    #[test]
    fn foreign_kind_slices_count_as_no_slice() {
        let pods = vec![
            PodBuilder::new("ns-1", "mps-pod")
                .container(|c| c.scalar("nvidia.com/gpu-10gb", 1))
                .build(),
            PodBuilder::new("ns-1", "mig-pod")
                .container(|c| c.scalar("nvidia.com/mig-1g.5gb", 1))
                .build(),
        ];
        let sorted = sort_candidate_pods(&pods, PartitioningKind::Mig);
        assert_eq!(names(&sorted), vec!["mig-pod", "mps-pod"]);
    }
}

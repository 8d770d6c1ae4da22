// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Resource-vector arithmetic for the scheduler view.
//!
//! Mirrors the resource accounting a scheduler performs per node: CPU in
//! millicores, memory and ephemeral storage in bytes, a pod count, and a map
//! of scalar (extended) resources. GPU slices appear here as scalar
//! resources (`nvidia.com/mig-1g.5gb`, `nvidia.com/gpu-10gb`, ...).

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const RESOURCE_CPU: &str = "cpu";
const RESOURCE_MEMORY: &str = "memory";
const RESOURCE_EPHEMERAL_STORAGE: &str = "ephemeral-storage";
const RESOURCE_PODS: &str = "pods";

/// A resource vector over the dimensions the scheduling oracle checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    pub milli_cpu: i64,
    pub memory: i64,
    pub ephemeral_storage: i64,
    pub pods: i64,
    pub scalars: BTreeMap<String, i64>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a Kubernetes resource list (requests, limits or
    /// allocatable). Unparseable quantities count as zero.
    pub fn from_resource_list(list: &BTreeMap<String, Quantity>) -> Self {
        let mut res = Resources::new();
        for (name, quantity) in list {
            res.insert(name, quantity);
        }
        res
    }

    fn insert(&mut self, name: &str, quantity: &Quantity) {
        match name {
            RESOURCE_CPU => self.milli_cpu += quantity_millis(quantity),
            RESOURCE_MEMORY => self.memory += quantity_value(quantity),
            RESOURCE_EPHEMERAL_STORAGE => self.ephemeral_storage += quantity_value(quantity),
            RESOURCE_PODS => self.pods += quantity_value(quantity),
            _ => {
                *self.scalars.entry(name.to_string()).or_default() += quantity_value(quantity);
            }
        }
    }

    pub fn add(&mut self, other: &Resources) {
        self.milli_cpu += other.milli_cpu;
        self.memory += other.memory;
        self.ephemeral_storage += other.ephemeral_storage;
        self.pods += other.pods;
        for (k, v) in &other.scalars {
            *self.scalars.entry(k.clone()).or_default() += v;
        }
    }

    pub fn subtract(&mut self, other: &Resources) {
        self.milli_cpu -= other.milli_cpu;
        self.memory -= other.memory;
        self.ephemeral_storage -= other.ephemeral_storage;
        self.pods -= other.pods;
        for (k, v) in &other.scalars {
            *self.scalars.entry(k.clone()).or_default() -= v;
        }
    }

    /// `self - other` clamped at zero in every dimension.
    pub fn subtract_non_negative(&self, other: &Resources) -> Resources {
        let mut diff = self.clone();
        diff.subtract(other);
        diff.milli_cpu = diff.milli_cpu.max(0);
        diff.memory = diff.memory.max(0);
        diff.ephemeral_storage = diff.ephemeral_storage.max(0);
        diff.pods = diff.pods.max(0);
        diff.scalars.retain(|_, v| *v > 0);
        diff
    }

    /// The absolute value of the strictly negative components of `self`,
    /// every non-negative component dropped. This is the "lacking" part of
    /// a difference.
    pub fn negative_components(&self) -> Resources {
        let mut res = Resources::new();
        res.milli_cpu = (-self.milli_cpu).max(0);
        res.memory = (-self.memory).max(0);
        res.ephemeral_storage = (-self.ephemeral_storage).max(0);
        res.pods = (-self.pods).max(0);
        for (k, v) in &self.scalars {
            if *v < 0 {
                res.scalars.insert(k.clone(), -v);
            }
        }
        res
    }

    /// True iff `self` fits within `available` in every dimension.
    pub fn fits_within(&self, available: &Resources) -> bool {
        if self.milli_cpu > available.milli_cpu
            || self.memory > available.memory
            || self.ephemeral_storage > available.ephemeral_storage
        {
            return false;
        }
        self.scalars
            .iter()
            .all(|(k, v)| *v <= available.scalars.get(k).copied().unwrap_or(0))
    }

    pub fn is_zero(&self) -> bool {
        self.milli_cpu == 0
            && self.memory == 0
            && self.ephemeral_storage == 0
            && self.pods == 0
            && self.scalars.values().all(|v| *v == 0)
    }
}

/// Compute a pod's effective resource request.
///
/// Regular containers run simultaneously, so their requests sum; init
/// containers run sequentially, so the result covers the max of each
/// dimension instead. Pod overhead, when set, is added on top.
pub fn compute_pod_request(pod: &Pod) -> Resources {
    let mut request = Resources::new();
    let Some(spec) = pod.spec.as_ref() else {
        return request;
    };

    for container in &spec.containers {
        if let Some(requests) = container.resources.as_ref().and_then(|r| r.requests.as_ref()) {
            request.add(&Resources::from_resource_list(requests));
        }
    }

    for container in spec.init_containers.iter().flatten() {
        if let Some(requests) = container.resources.as_ref().and_then(|r| r.requests.as_ref()) {
            request = max_components(&request, &Resources::from_resource_list(requests));
        }
    }

    if let Some(overhead) = spec.overhead.as_ref() {
        request.add(&Resources::from_resource_list(overhead));
    }

    request
}

fn max_components(a: &Resources, b: &Resources) -> Resources {
    let mut res = Resources {
        milli_cpu: a.milli_cpu.max(b.milli_cpu),
        memory: a.memory.max(b.memory),
        ephemeral_storage: a.ephemeral_storage.max(b.ephemeral_storage),
        pods: a.pods.max(b.pods),
        scalars: a.scalars.clone(),
    };
    for (k, v) in &b.scalars {
        let entry = res.scalars.entry(k.clone()).or_default();
        *entry = (*entry).max(*v);
    }
    res
}

/// Parse a quantity into its base-unit integer value (bytes for memory,
/// plain count for scalars). Millis round up to one.
pub fn quantity_value(q: &Quantity) -> i64 {
    parse_quantity(&q.0).map(|v| v.ceil() as i64).unwrap_or(0)
}

/// Parse a quantity into millicores.
pub fn quantity_millis(q: &Quantity) -> i64 {
    parse_quantity(&q.0)
        .map(|v| (v * 1000.0).round() as i64)
        .unwrap_or(0)
}

fn parse_quantity(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e' || c == 'E'))
        .unwrap_or(s.len());
    // Exponent notation: the 'e' is part of the number, not a suffix.
    let (num, suffix) = if split > 0 && (s.as_bytes()[split - 1] == b'e' || s.as_bytes()[split - 1] == b'E')
    {
        (s, "")
    } else {
        s.split_at(split)
    };
    let value: f64 = num.parse().ok()?;
    let multiplier: f64 = match suffix {
        "" => 1.0,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => f64::powi(1024.0, 4),
        "Pi" => f64::powi(1024.0, 5),
        _ => return None,
    };
    Some(value * multiplier)
}

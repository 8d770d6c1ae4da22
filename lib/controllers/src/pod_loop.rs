// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pod watch loop: keeps the cache's usage accounting current and feeds
//! pending pods that could be helped by repartitioning into the per-kind
//! batchers.

use std::pin::pin;
use std::sync::Arc;

use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher;
use kube::{Api, Client};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tessera_core::{PartitioningKind, Result, pod};
use tessera_state::{ClusterState, StateError};

pub async fn run_pod_loop(
    client: Client,
    state: Arc<ClusterState>,
    mig_batch: UnboundedSender<Pod>,
    mps_batch: UnboundedSender<Pod>,
    cancel: CancellationToken,
) -> Result<()> {
    let pods: Api<Pod> = Api::all(client);
    let stream = watcher(pods, watcher::Config::default()).default_backoff();
    let mut stream = pin!(stream);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            event = stream.try_next() => event?,
        };
        let Some(event) = event else {
            return Ok(());
        };
        match event {
            watcher::Event::Apply(p) | watcher::Event::InitApply(p) => {
                state.update_usage(&p);
                enqueue_candidate(&p, &mig_batch, &mps_batch);
            }
            watcher::Event::Delete(p) => {
                let (namespace, name) = pod::namespaced_name(&p);
                match state.delete_pod(&namespace, &name) {
                    Ok(()) => {}
                    Err(StateError::PodNotTracked { .. }) => {
                        debug!(namespace = %namespace, pod = %name, "deleted pod was not tracked");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            watcher::Event::Init | watcher::Event::InitDone => {}
        }
    }
}

/// Route a pending pod to the batcher of the partitioning kind it requests
/// slices of. Pods requesting no slice opt out of planning.
fn enqueue_candidate(p: &Pod, mig_batch: &UnboundedSender<Pod>, mps_batch: &UnboundedSender<Pod>) {
    if !pod::extra_resources_could_help(p) {
        return;
    }
    if !PartitioningKind::Mig.requested_slices(p).is_empty() {
        let _ = mig_batch.send(p.clone());
    }
    if !PartitioningKind::Mps.requested_slices(p).is_empty() {
        let _ = mps_batch.send(p.clone());
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Node watch loop: mirrors partitioning-enabled nodes into the cluster
//! state.
//!
//! MIG nodes without spec annotations are handed to the initializer first
//! and join the cache only once their geometry is declared; the follow-up
//! watch event after the initializer's patch brings them in.

use std::pin::pin;
use std::sync::Arc;

use futures::TryStreamExt;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::ListParams;
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tessera_actuator::NodeInitializer;
use tessera_core::{PartitioningKind, Result, annotations, labels};
use tessera_state::ClusterState;

pub async fn run_node_loop(
    client: Client,
    state: Arc<ClusterState>,
    initializer: Arc<NodeInitializer>,
    cancel: CancellationToken,
) -> Result<()> {
    let nodes: Api<Node> = Api::all(client.clone());
    let config = watcher::Config::default().labels(labels::LABEL_GPU_PARTITIONING);
    let stream = watcher(nodes, config).default_backoff();
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
            watcher::Event::Apply(node) | watcher::Event::InitApply(node) => {
                if let Err(err) = handle_node(&client, &state, &initializer, node).await {
                    error!(error = %err, "failed to handle node event");
                }
            }
            watcher::Event::Delete(node) => {
                let name = node.metadata.name.as_deref().unwrap_or_default();
                info!(node = %name, "deleting node from cluster state");
                state.delete_node(name);
            }
            watcher::Event::Init | watcher::Event::InitDone => {}
        }
    }
}

async fn handle_node(
    client: &Client,
    state: &ClusterState,
    initializer: &NodeInitializer,
    node: Node,
) -> Result<()> {
    let name = node.metadata.name.clone().unwrap_or_default();

    if labels::partitioning_kind(&node) == Some(PartitioningKind::Mig) {
        let (_, spec_annotations) = annotations::parse_node_annotations(&node);
        if spec_annotations.is_empty() {
            info!(node = %name, "node has no partitioning spec yet, initializing");
            initializer.init_node_partitioning(&node).await?;
            // Not initialized yet from the cache's point of view; the patch
            // triggers another watch event that will admit it.
            return Ok(());
        }
    }

    let pods = pods_on_node(client, &name).await?;
    state.update_node(node, pods);
    Ok(())
}

async fn pods_on_node(client: &Client, node_name: &str) -> Result<Vec<Pod>> {
    let pods: Api<Pod> = Api::all(client.clone());
    let params = ListParams::default().fields(&format!("spec.nodeName={node_name}"));
    let list = pods.list(&params).await?;
    Ok(list.items)
}

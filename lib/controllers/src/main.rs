// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The tessera partitioner process: watch loops plus one partitioning run
//! loop per kind.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tessera_actuator::{Actuator, KubeStore, MpsActuatorConfig, NodeInitializer};
use tessera_controllers::{Batcher, PartitioningRunLoop, run_node_loop, run_pod_loop};
use tessera_core::PartitioningKind;
use tessera_planner::{Planner, ResourceFitOracle};
use tessera_state::ClusterState;

#[derive(Parser, Debug)]
#[command(name = "tessera-partitioner", about = "Cluster GPU partition planner")]
struct Args {
    /// Namespace of the NVIDIA device plugin ConfigMap.
    #[arg(long, env = "TESSERA_DEVICE_PLUGIN_NAMESPACE", default_value = "gpu-operator")]
    device_plugin_namespace: String,

    /// Name of the NVIDIA device plugin ConfigMap.
    #[arg(long, env = "TESSERA_DEVICE_PLUGIN_CONFIG_MAP", default_value = "device-plugin-configs")]
    device_plugin_config_map: String,

    /// Seconds to wait after updating the device plugin configuration
    /// before pointing a node at it.
    #[arg(long, env = "TESSERA_DEVICE_PLUGIN_DELAY_SECONDS", default_value_t = 30)]
    device_plugin_delay_seconds: u64,

    /// Idle seconds that close a batch of pending pods.
    #[arg(long, default_value_t = 5)]
    batch_idle_seconds: u64,

    /// Max seconds a batch of pending pods may stay open.
    #[arg(long, default_value_t = 60)]
    batch_max_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let client = Client::try_default().await?;
    let cancel = CancellationToken::new();

    let state = Arc::new(ClusterState::new());
    let store = Arc::new(KubeStore::new(client.clone()));
    let initializer = Arc::new(NodeInitializer::new(store.clone()));
    let mps_config = MpsActuatorConfig {
        config_map_namespace: args.device_plugin_namespace.clone(),
        config_map_name: args.device_plugin_config_map.clone(),
        propagation_delay: Duration::from_secs(args.device_plugin_delay_seconds),
    };

    let batch_idle = Duration::from_secs(args.batch_idle_seconds);
    let batch_max = Duration::from_secs(args.batch_max_seconds);
    let (mig_tx, mig_batcher) = Batcher::channel(batch_idle, batch_max);
    let (mps_tx, mps_batcher) = Batcher::channel(batch_idle, batch_max);

    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(run_node_loop(
        client.clone(),
        state.clone(),
        initializer,
        cancel.clone(),
    ));
    tasks.spawn(run_pod_loop(
        client.clone(),
        state.clone(),
        mig_tx,
        mps_tx,
        cancel.clone(),
    ));

    for (kind, batcher) in [
        (PartitioningKind::Mig, mig_batcher),
        (PartitioningKind::Mps, mps_batcher),
    ] {
        let run_loop = PartitioningRunLoop::new(
            kind,
            state.clone(),
            Planner::new(Arc::new(ResourceFitOracle::new())),
            Actuator::new(store.clone(), mps_config.clone()),
            batcher,
        );
        let cancel = cancel.clone();
        tasks.spawn(async move {
            run_loop.run(cancel).await;
            Ok(())
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            cancel.cancel();
        }
        Some(result) = tasks.join_next() => {
            cancel.cancel();
            result??;
        }
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! MPS actuation: reconfigure the NVIDIA device plugin.
//!
//! The desired shares are written as a new entry in the cluster-wide
//! device-plugin ConfigMap, keyed `<node>-<plan-id>`; stale entries for the
//! node are dropped in the same patch. Only after a propagation delay is
//! the node's config label flipped to the new key: flipping early opens a
//! window where the plugin still serves the old config and the node
//! advertises stale capacity.

use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Node};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tessera_core::labels::LABEL_DEVICE_PLUGIN_CONFIG;
use tessera_core::mps::Profile;
use tessera_planner::PlanId;
use tessera_state::NodePartitioning;

use crate::error::ActuateError;
use crate::store::ObjectStore;

const PLUGIN_CONFIG_VERSION: &str = "v1";
const RESOURCE_NVIDIA_GPU: &str = "nvidia.com/gpu";

/// NVIDIA device-plugin configuration, the YAML value of a ConfigMap entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub version: String,
    pub flags: PluginFlags,
    pub sharing: Sharing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFlags {
    #[serde(rename = "migStrategy")]
    pub mig_strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sharing {
    pub mps: MpsSharing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpsSharing {
    pub resources: Vec<MpsResource>,
}

/// One replicated share: `replicas` devices of `memoryGB` each, renamed so
/// that pods can request the share size as its own resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpsResource {
    pub name: String,
    pub rename: String,
    #[serde(rename = "memoryGB")]
    pub memory_gb: u32,
    pub devices: Vec<String>,
    pub replicas: u32,
}

/// Translate a node partitioning into the device-plugin configuration.
/// Resources that do not name an MPS share are refused.
pub fn plugin_config_for(partitioning: &NodePartitioning) -> Result<PluginConfig, ActuateError> {
    let mut resources = Vec::new();
    for gpu in &partitioning.gpus {
        for (resource, quantity) in &gpu.resources {
            let profile = Profile::from_resource_name(resource)
                .ok_or_else(|| ActuateError::InvalidResource(resource.clone()))?;
            resources.push(MpsResource {
                name: RESOURCE_NVIDIA_GPU.to_string(),
                rename: format!("gpu-{profile}"),
                memory_gb: profile.memory_gb(),
                devices: vec![gpu.gpu_index.to_string()],
                replicas: *quantity,
            });
        }
    }
    Ok(PluginConfig {
        version: PLUGIN_CONFIG_VERSION.to_string(),
        flags: PluginFlags {
            mig_strategy: "none".to_string(),
        },
        sharing: Sharing {
            mps: MpsSharing { resources },
        },
    })
}

pub(crate) struct MpsPartitioner<'a> {
    pub store: &'a dyn ObjectStore,
    pub config_map_namespace: &'a str,
    pub config_map_name: &'a str,
    pub propagation_delay: Duration,
}

impl MpsPartitioner<'_> {
    pub async fn apply_partitioning(
        &self,
        cancel: &CancellationToken,
        node: &Node,
        plan_id: &PlanId,
        partitioning: &NodePartitioning,
    ) -> Result<(), ActuateError> {
        let node_name = node.metadata.name.as_deref().unwrap_or_default();

        let config_map = self
            .store
            .get_config_map(self.config_map_namespace, self.config_map_name)
            .await?;
        let config_map = match config_map {
            Some(existing) => existing,
            None => {
                info!(
                    name = self.config_map_name,
                    namespace = self.config_map_namespace,
                    "device plugin ConfigMap not found, creating it"
                );
                let mut created = ConfigMap::default();
                created.metadata.name = Some(self.config_map_name.to_string());
                created.metadata.namespace = Some(self.config_map_namespace.to_string());
                self.store.create_config_map(created.clone()).await?;
                created
            }
        };

        // Stale entries for this node go away in the same patch that adds
        // the new one.
        let mut data = serde_json::Map::new();
        for key in config_map.data.iter().flatten().map(|(k, _)| k) {
            if key.starts_with(&format!("{node_name}-")) {
                data.insert(key.clone(), serde_json::Value::Null);
            }
        }
        let key = format!("{node_name}-{plan_id}");
        let config = plugin_config_for(partitioning)?;
        let config_yaml =
            serde_yaml::to_string(&config).expect("plugin config serializes to YAML");
        data.insert(key.clone(), config_yaml.into());

        self.store
            .patch_config_map(
                self.config_map_namespace,
                self.config_map_name,
                &json!({"data": data}),
            )
            .await?;
        debug!(node = %node_name, key = %key, "device plugin ConfigMap updated");

        // Give the plugin time to observe the new entry before pointing the
        // node label at it.
        tokio::select! {
            _ = tokio::time::sleep(self.propagation_delay) => {}
            _ = cancel.cancelled() => return Err(ActuateError::Canceled),
        }

        let patch = json!({"metadata": {"labels": {LABEL_DEVICE_PLUGIN_CONFIG: key.clone()}}});
        self.store.patch_node(node_name, &patch).await?;
        info!(node = %node_name, plan = %plan_id, "node partitioning config updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tessera_state::GpuPartitioning;

    #[test]
    fn renders_the_device_plugin_yaml_shape() {
        let partitioning = NodePartitioning {
            gpus: vec![GpuPartitioning {
                gpu_index: 0,
                resources: BTreeMap::from([
                    ("nvidia.com/gpu-10gb".to_string(), 1),
                    ("nvidia.com/gpu-5gb".to_string(), 2),
                ]),
            }],
        };
        let config = plugin_config_for(&partitioning).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("version: v1"));
        assert!(yaml.contains("migStrategy: none"));
        assert!(yaml.contains("rename: gpu-10gb"));
        assert!(yaml.contains("memoryGB: 10"));
        assert!(yaml.contains("replicas: 2"));

        let parsed: PluginConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.sharing.mps.resources.len(), 2);
        assert_eq!(parsed.sharing.mps.resources[0].devices, vec!["0"]);
    }

    #[test]
    fn refuses_mig_resources() {
        let partitioning = NodePartitioning {
            gpus: vec![GpuPartitioning {
                gpu_index: 0,
                resources: BTreeMap::from([("nvidia.com/mig-1g.5gb".to_string(), 1)]),
            }],
        };
        assert!(matches!(
            plugin_config_for(&partitioning),
            Err(ActuateError::InvalidResource(_))
        ));
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The object-store seam between the actuator and the cluster.
//!
//! The actuator only needs to fetch nodes and the device-plugin ConfigMap
//! and merge-patch them back; everything else stays out of reach. The kube
//! implementation talks to the API server, the in-memory implementation
//! backs the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use parking_lot::Mutex;

const FIELD_MANAGER: &str = "tessera-partitioner";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Access to the persistent cluster objects the actuator touches.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_node(&self, name: &str) -> Result<Node, StoreError>;
    async fn patch_node(&self, name: &str, patch: &serde_json::Value) -> Result<(), StoreError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError>;
    async fn create_config_map(&self, config_map: ConfigMap) -> Result<(), StoreError>;
    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Object store backed by the Kubernetes API server. All writes are merge
/// patches, so annotations and data owned by others survive.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_node(&self, name: &str) -> Result<Node, StoreError> {
        Ok(self.nodes().get(name).await?)
    }

    async fn patch_node(&self, name: &str, patch: &serde_json::Value) -> Result<(), StoreError> {
        self.nodes()
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        Ok(self.config_maps(namespace).get_opt(name).await?)
    }

    async fn create_config_map(&self, config_map: ConfigMap) -> Result<(), StoreError> {
        let namespace = config_map.metadata.namespace.clone().unwrap_or_default();
        self.config_maps(&namespace)
            .create(&Default::default(), &config_map)
            .await?;
        Ok(())
    }

    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.config_maps(namespace)
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}

/// In-memory object store for tests: applies RFC 7386 merge patches to the
/// stored objects.
#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<HashMap<String, Node>>,
    config_maps: Mutex<HashMap<(String, String), ConfigMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&self, node: Node) {
        let name = node.metadata.name.clone().unwrap_or_default();
        self.nodes.lock().insert(name, node);
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        self.nodes.lock().get(name).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.config_maps
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(Default::default());
    }
    let target_map = target.as_object_mut().unwrap();
    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
        } else {
            merge_patch(
                target_map
                    .entry(key.clone())
                    .or_insert(serde_json::Value::Null),
                value,
            );
        }
    }
}

fn apply_patch<T: serde::Serialize + serde::de::DeserializeOwned>(
    object: &T,
    patch: &serde_json::Value,
) -> T {
    let mut value = serde_json::to_value(object).expect("object serializes");
    merge_patch(&mut value, patch);
    serde_json::from_value(value).expect("patched object deserializes")
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_node(&self, name: &str) -> Result<Node, StoreError> {
        self.nodes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "node",
                name: name.to_string(),
            })
    }

    async fn patch_node(&self, name: &str, patch: &serde_json::Value) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock();
        let node = nodes.get_mut(name).ok_or_else(|| StoreError::NotFound {
            kind: "node",
            name: name.to_string(),
        })?;
        *node = apply_patch(node, patch);
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        Ok(self.config_map(namespace, name))
    }

    async fn create_config_map(&self, config_map: ConfigMap) -> Result<(), StoreError> {
        let key = (
            config_map.metadata.namespace.clone().unwrap_or_default(),
            config_map.metadata.name.clone().unwrap_or_default(),
        );
        self.config_maps.lock().insert(key, config_map);
        Ok(())
    }

    async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut config_maps = self.config_maps.lock();
        let key = (namespace.to_string(), name.to_string());
        let config_map = config_maps.get_mut(&key).ok_or_else(|| StoreError::NotFound {
            kind: "configmap",
            name: name.to_string(),
        })?;
        *config_map = apply_patch(config_map, patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::testing::NodeBuilder;

    #[tokio::test]
    async fn merge_patch_adds_and_removes_annotations() {
        let store = MemoryStore::new();
        store.insert_node(NodeBuilder::new("node-1").annotation("keep", "1").annotation("drop", "2").build());

        store
            .patch_node(
                "node-1",
                &json!({"metadata": {"annotations": {"drop": null, "new": "3"}}}),
            )
            .await
            .unwrap();

        let node = store.node("node-1").unwrap();
        let annotations = node.metadata.annotations.unwrap();
        assert_eq!(annotations.get("keep").map(String::as_str), Some("1"));
        assert_eq!(annotations.get("new").map(String::as_str), Some("3"));
        assert!(!annotations.contains_key("drop"));
    }

    #[tokio::test]
    async fn patching_unknown_objects_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.patch_node("nope", &json!({})).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}

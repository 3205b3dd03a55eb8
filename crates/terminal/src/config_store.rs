//! Configuration registry interface
//!
//! The terminal publishes configuration registries but does not own them.
//! Anything implementing [`ConfigStore`] can be exposed; [`MemoryConfigStore`]
//! is a self-contained implementation for applications without their own.
//!
//! Every registry carries an update fence that increases whenever one of its
//! entities changes, so the terminal only republishes what moved.

use std::collections::BTreeMap;
use std::mem;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use vantage_protocol::{CategoryScheme, EntityScheme, EntityValue};

/// One entity as enumerated from a registry
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntityInfo {
    /// Registry-wide key
    pub key: u64,
    /// Category names followed by the entity name
    pub path: Vec<String>,
    pub value: Value,
    pub metadata: Value,
}

/// Source of configuration registries
pub trait ConfigStore: Send + Sync {
    /// Names of every registry
    fn registries(&self) -> Vec<String>;

    /// Every entity of `registry`, empty if unknown
    fn entities(&self, registry: &str) -> Vec<ConfigEntityInfo>;

    /// Current update fence of `registry`
    fn fence(&self, registry: &str) -> u64;

    /// Entities changed after `fence`, with the fence they are current to
    fn dirty_since(&self, registry: &str, fence: u64) -> (u64, Vec<EntityValue>);

    /// Current value of one entity
    fn serialize(&self, registry: &str, key: u64) -> Option<Value>;

    /// Overwrite one entity; returns false if unknown or rejected
    fn deserialize(&self, registry: &str, key: u64, value: Value) -> bool;
}

/// Build the category tree for a registry announcement
pub fn category_tree(name: &str, entities: Vec<ConfigEntityInfo>) -> CategoryScheme {
    let mut root = CategoryScheme {
        name: name.to_string(),
        ..Default::default()
    };

    for entity in entities {
        let Some((entity_name, categories)) = entity.path.split_last() else {
            continue;
        };

        let mut category = &mut root;
        for segment in categories {
            let found = category
                .subcategories
                .iter()
                .position(|c| &c.name == segment);
            let index = match found {
                Some(index) => index,
                None => {
                    category.subcategories.push(CategoryScheme {
                        name: segment.clone(),
                        ..Default::default()
                    });
                    category.subcategories.len() - 1
                }
            };
            category = &mut category.subcategories[index];
        }

        category.entities.push(EntityScheme {
            name: entity_name.clone(),
            config_key: entity.key,
            value: entity.value,
            metadata: entity.metadata,
        });
    }

    root
}

#[derive(Debug)]
struct Entry {
    path: Vec<String>,
    value: Value,
    metadata: Value,
    fence: u64,
}

#[derive(Debug, Default)]
struct Registry {
    entries: BTreeMap<u64, Entry>,
    fence: u64,
    next_key: u64,
}

impl Registry {
    fn touch(&mut self) -> u64 {
        self.fence += 1;
        self.fence
    }
}

/// In-memory [`ConfigStore`]
///
/// Entities are addressed by dotted paths (`"render.shadow.enabled"`); the
/// last segment is the entity name, the rest are categories. Writes through
/// [`ConfigStore::deserialize`] must keep the JSON kind of the current value.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    registries: RwLock<BTreeMap<String, Registry>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, creating the registry if needed; returns its key
    ///
    /// Re-inserting an existing path replaces its value and keeps its key.
    pub fn insert(&self, registry: &str, path: &str, value: Value) -> u64 {
        self.insert_with_metadata(registry, path, value, Value::Null)
    }

    /// Add an entity with UI metadata (ranges, descriptions, ...)
    pub fn insert_with_metadata(
        &self,
        registry: &str,
        path: &str,
        value: Value,
        metadata: Value,
    ) -> u64 {
        let path: Vec<String> = path.split('.').map(str::to_string).collect();
        let mut registries = self.registries.write();
        let registry = registries.entry(registry.to_string()).or_default();
        let fence = registry.touch();

        if let Some((key, entry)) = registry.entries.iter_mut().find(|(_, e)| e.path == path) {
            entry.value = value;
            entry.metadata = metadata;
            entry.fence = fence;
            return *key;
        }

        let key = registry.next_key;
        registry.next_key += 1;
        registry.entries.insert(
            key,
            Entry {
                path,
                value,
                metadata,
                fence,
            },
        );
        key
    }

    /// Look up a value by dotted path
    pub fn get(&self, registry: &str, path: &str) -> Option<Value> {
        let registries = self.registries.read();
        registries
            .get(registry)?
            .entries
            .values()
            .find(|e| e.path.iter().map(String::as_str).eq(path.split('.')))
            .map(|e| e.value.clone())
    }

    /// Set a value by dotted path; returns false if the path is unknown
    pub fn set(&self, registry: &str, path: &str, value: Value) -> bool {
        let mut registries = self.registries.write();
        let Some(registry) = registries.get_mut(registry) else {
            return false;
        };

        let fence = registry.fence + 1;
        let Some(entry) = registry
            .entries
            .values_mut()
            .find(|e| e.path.iter().map(String::as_str).eq(path.split('.')))
        else {
            return false;
        };

        entry.value = value;
        entry.fence = fence;
        registry.fence = fence;
        true
    }
}

impl ConfigStore for MemoryConfigStore {
    fn registries(&self) -> Vec<String> {
        self.registries.read().keys().cloned().collect()
    }

    fn entities(&self, registry: &str) -> Vec<ConfigEntityInfo> {
        let registries = self.registries.read();
        let Some(registry) = registries.get(registry) else {
            return Vec::new();
        };

        registry
            .entries
            .iter()
            .map(|(key, e)| ConfigEntityInfo {
                key: *key,
                path: e.path.clone(),
                value: e.value.clone(),
                metadata: e.metadata.clone(),
            })
            .collect()
    }

    fn fence(&self, registry: &str) -> u64 {
        self.registries
            .read()
            .get(registry)
            .map_or(0, |r| r.fence)
    }

    fn dirty_since(&self, registry: &str, fence: u64) -> (u64, Vec<EntityValue>) {
        let registries = self.registries.read();
        let Some(registry) = registries.get(registry) else {
            return (fence, Vec::new());
        };

        let changed = registry
            .entries
            .iter()
            .filter(|(_, e)| e.fence > fence)
            .map(|(key, e)| EntityValue {
                config_key: *key,
                value: e.value.clone(),
            })
            .collect();
        (registry.fence, changed)
    }

    fn serialize(&self, registry: &str, key: u64) -> Option<Value> {
        let registries = self.registries.read();
        registries
            .get(registry)?
            .entries
            .get(&key)
            .map(|e| e.value.clone())
    }

    fn deserialize(&self, registry: &str, key: u64, value: Value) -> bool {
        let mut registries = self.registries.write();
        let Some(registry) = registries.get_mut(registry) else {
            return false;
        };

        let fence = registry.fence + 1;
        let Some(entry) = registry.entries.get_mut(&key) else {
            return false;
        };

        if mem::discriminant(&entry.value) != mem::discriminant(&value) {
            debug!(key, "rejected config value of a different kind");
            return false;
        }

        entry.value = value;
        entry.fence = fence;
        registry.fence = fence;
        true
    }
}

#[cfg(test)]
#[path = "config_store_test.rs"]
mod tests;

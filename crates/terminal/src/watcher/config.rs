//! Config registry publisher

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use vantage_protocol::{ConfigEntityUpdate, NewConfigClass};

use crate::config_store::{ConfigStore, category_tree};
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Tracks which registries observers know and how current they are
pub struct ConfigWatcher {
    store: Arc<dyn ConfigStore>,
    /// Registry name -> fence last published
    published: BTreeMap<String, u64>,
}

impl ConfigWatcher {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            published: BTreeMap::new(),
        }
    }

    /// Forget everything published; the next pass announces every registry
    pub fn reset(&mut self) {
        self.published.clear();
    }

    /// Announce registries observers have not seen yet
    ///
    /// Returns the number of registries announced.
    pub fn publish_new(&mut self, dispatcher: &Dispatcher) -> Result<usize> {
        let mut announced = 0;

        for name in self.store.registries() {
            if self.published.contains_key(&name) {
                continue;
            }

            // Fence first: a change racing the enumeration is resent, not lost
            let fence = self.store.fence(&name);
            let root = category_tree(&name, self.store.entities(&name));
            dispatcher.send(&NewConfigClass {
                key: name.clone(),
                root,
            })?;

            debug!(registry = %name, fence, "published config class");
            self.published.insert(name, fence);
            announced += 1;
        }

        Ok(announced)
    }

    /// Push entities changed since the last pass
    ///
    /// Returns the number of entity values sent.
    pub fn publish_dirty(&mut self, dispatcher: &Dispatcher) -> Result<usize> {
        let mut sent = 0;

        for (name, fence) in self.published.iter_mut() {
            let (current, content) = self.store.dirty_since(name, *fence);
            *fence = current;
            if content.is_empty() {
                continue;
            }

            sent += content.len();
            dispatcher.send(&ConfigEntityUpdate {
                class_key: name.clone(),
                content,
            })?;
        }

        Ok(sent)
    }

    /// Registries announced so far
    #[inline]
    pub fn published(&self) -> usize {
        self.published.len()
    }
}

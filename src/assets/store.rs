// src/assets/store.rs
// Name-keyed asset records for emoji animations and icons

use log::trace;
use std::collections::HashMap;
use std::sync::Arc;

use super::cache::AssetBuffer;
use super::container::{AssetRef, Container};
use crate::exceptions::Result;

/// Reference to an asset's bytes plus the container that keeps them valid
#[derive(Debug, Clone)]
pub struct AssetData {
    container: Arc<Container>,
    reference: AssetRef,
}

impl AssetData {
    pub fn new(container: Arc<Container>, reference: AssetRef) -> Self {
        AssetData {
            container,
            reference,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn reference(&self) -> &AssetRef {
        &self.reference
    }

    pub fn size(&self) -> usize {
        self.reference.len()
    }

    pub fn materialize(&self) -> Result<AssetBuffer> {
        self.container.materialize(&self.reference)
    }
}

/// Emoji animation record; `fps == 0` means "use the default rate"
#[derive(Debug, Clone)]
pub struct EmojiRecord {
    pub data: AssetData,
    pub fps: u32,
    pub looping: bool,
}

#[derive(Debug, Clone)]
pub struct IconRecord {
    pub data: AssetData,
}

/// Uniquely keyed name -> record map
#[derive(Debug)]
pub struct AssetStore<R> {
    kind: &'static str,
    records: HashMap<String, R>,
}

impl<R> AssetStore<R> {
    pub fn new(kind: &'static str) -> Self {
        AssetStore {
            kind,
            records: HashMap::new(),
        }
    }

    /// Insert or replace; returns the record previously stored under `name`.
    /// Allocation failure leaves existing entries untouched.
    pub fn set(&mut self, name: &str, record: R) -> Result<Option<R>> {
        if !self.records.contains_key(name) {
            self.records.try_reserve(1)?;
        }
        let previous = self.records.insert(name.to_string(), record);
        trace!(
            "🗃️ {} '{}' {}",
            self.kind,
            name,
            if previous.is_some() { "replaced" } else { "stored" }
        );
        Ok(previous)
    }

    pub fn get(&self, name: &str) -> Option<&R> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

pub type EmojiStore = AssetStore<EmojiRecord>;
pub type IconStore = AssetStore<IconRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::container::AssetSource;
    use crate::assets::partition::PartitionTable;
    use crate::assets::writer::ContainerBuilder;

    #[test]
    fn test_set_then_get() {
        let mut store: AssetStore<u32> = AssetStore::new("test");
        for (i, name) in ["happy", "sad", "angry", ""].iter().enumerate() {
            assert!(store.set(name, i as u32).unwrap().is_none());
            assert_eq!(store.get(name), Some(&(i as u32)));
        }
        assert_eq!(store.len(), 4);
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.kind(), "test");
        let mut names: Vec<&str> = store.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["", "angry", "happy", "sad"]);
    }

    #[test]
    fn test_reinsert_replaces_and_releases_prior() {
        let mut builder = ContainerBuilder::new();
        builder.add("joy.eaf", vec![0u8; 8]).unwrap();
        let partitions = PartitionTable::new();
        partitions.register("p", builder.build().unwrap());
        let container =
            Arc::new(Container::open(&AssetSource::Partition("p".into()), &partitions).unwrap());
        let reference = container.resolve("joy.eaf").unwrap();

        let mut store = EmojiStore::new("emoji");
        let first = EmojiRecord {
            data: AssetData::new(Arc::clone(&container), reference),
            fps: 0,
            looping: false,
        };
        store.set("joy", first).unwrap();
        assert_eq!(Arc::strong_count(&container), 2);

        let second = EmojiRecord {
            data: AssetData::new(Arc::clone(&container), reference),
            fps: 20,
            looping: true,
        };
        let previous = store.set("joy", second).unwrap();
        drop(previous);

        // Only the live record and the local handle remain
        assert_eq!(Arc::strong_count(&container), 2);
        assert_eq!(store.get("joy").map(|r| r.fps), Some(20));
        assert_eq!(store.len(), 1);

        drop(store);
        assert_eq!(Arc::strong_count(&container), 1);
    }
}

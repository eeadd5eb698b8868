// src/assets/partition.rs
// Registry of named storage regions that containers can be opened from

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::exceptions::{EmoteError, Result};

/// Label-addressed storage regions, shared between clones.
///
/// On a device these are flash partitions; on a host they are images loaded
/// into memory, which gives the same zero-copy access path.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    regions: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the region behind `label`
    pub fn register(&self, label: &str, data: impl Into<Arc<[u8]>>) {
        let data = data.into();
        debug!("🗂️ Registered partition '{label}' ({} bytes)", data.len());
        self.regions.write().insert(label.to_string(), data);
    }

    /// Load a partition image from disk under `label`
    pub fn register_file(&self, label: &str, path: &Path) -> Result<()> {
        let data = fs::read(path)?;
        self.register(label, data);
        Ok(())
    }

    pub fn find(&self, label: &str) -> Result<Arc<[u8]>> {
        self.regions
            .read()
            .get(label)
            .map(Arc::clone)
            .ok_or_else(|| EmoteError::AssetNotFound(format!("partition '{label}'")))
    }

    pub fn remove(&self, label: &str) -> bool {
        self.regions.write().remove(label).is_some()
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.regions.read().keys().cloned().collect();
        labels.sort();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_find_remove() {
        let table = PartitionTable::new();
        let shared = table.clone();
        table.register("anim_icon", vec![1u8, 2, 3]);

        assert_eq!(&*shared.find("anim_icon").unwrap(), &[1, 2, 3]);
        assert!(matches!(
            shared.find("missing"),
            Err(EmoteError::AssetNotFound(_))
        ));
        assert_eq!(table.labels(), vec!["anim_icon".to_string()]);
        assert!(shared.remove("anim_icon"));
        assert!(table.find("anim_icon").is_err());
    }
}

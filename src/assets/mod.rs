//! Asset containers, stores, cache slots and the manifest loader

pub mod backends;
pub mod cache;
pub mod constants;
pub mod container;
pub mod defaults;
pub mod loader;
pub mod manifest;
pub mod partition;
pub mod store;
pub mod writer;

pub use cache::{AssetBuffer, CacheKind, CacheSlot, CacheSlots};
pub use container::{AssetRef, AssetSource, Container, ContainerEntry, ContainerHeader};
pub use loader::{LoadReport, Section, SkippedEntry, load_assets};
pub use partition::PartitionTable;
pub use store::{AssetData, AssetStore, EmojiRecord, EmojiStore, IconRecord, IconStore};
pub use writer::ContainerBuilder;

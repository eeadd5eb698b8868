// src/assets/cache.rs
// Cache slots: one owned asset buffer per logical consumer, replaced on every acquisition

use log::trace;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::store::AssetData;
use crate::exceptions::{EmoteError, Result};

/// Immutable asset bytes handed to the rendering engine.
///
/// Either a private copy taken out of a file-backed container, or a
/// zero-copy view into a mapped storage region.
#[derive(Clone)]
pub struct AssetBuffer {
    bytes: Arc<[u8]>,
    start: usize,
    len: usize,
    mapped: bool,
}

impl AssetBuffer {
    /// Take ownership of freshly copied bytes
    pub fn owned(data: Vec<u8>) -> Self {
        let len = data.len();
        AssetBuffer {
            bytes: Arc::from(data),
            start: 0,
            len,
            mapped: false,
        }
    }

    /// View `len` bytes at `start` inside a mapped region without copying
    pub fn view(region: &Arc<[u8]>, start: usize, len: usize) -> Result<Self> {
        let end = start
            .checked_add(len)
            .filter(|end| *end <= region.len())
            .ok_or_else(|| {
                EmoteError::ContainerIntegrity(format!(
                    "view {start}+{len} exceeds region of {} bytes",
                    region.len()
                ))
            })?;
        trace!("🔍 Mapped view {start}..{end}");
        Ok(AssetBuffer {
            bytes: Arc::clone(region),
            start,
            len,
            mapped: true,
        })
    }

    /// Sub-buffer starting `from` bytes in, sharing the same storage
    pub fn tail(&self, from: usize) -> Result<Self> {
        if from > self.len {
            return Err(EmoteError::Parse(format!(
                "offset {from} past end of {}-byte buffer",
                self.len
            )));
        }
        Ok(AssetBuffer {
            bytes: Arc::clone(&self.bytes),
            start: self.start + from,
            len: self.len - from,
            mapped: self.mapped,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.start..self.start + self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the bytes live in a mapped region rather than a private copy
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }
}

impl Deref for AssetBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for AssetBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBuffer")
            .field("len", &self.len)
            .field("mapped", &self.mapped)
            .finish()
    }
}

/// Logical consumers that each own one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Font,
    BootAnim,
    ListenAnim,
    MoodAnim,
    DialogAnim,
    TipsIcon,
    ChargeIcon,
}

impl CacheKind {
    pub const ALL: [CacheKind; 7] = [
        CacheKind::Font,
        CacheKind::BootAnim,
        CacheKind::ListenAnim,
        CacheKind::MoodAnim,
        CacheKind::DialogAnim,
        CacheKind::TipsIcon,
        CacheKind::ChargeIcon,
    ];

    fn index(self) -> usize {
        match self {
            CacheKind::Font => 0,
            CacheKind::BootAnim => 1,
            CacheKind::ListenAnim => 2,
            CacheKind::MoodAnim => 3,
            CacheKind::DialogAnim => 4,
            CacheKind::TipsIcon => 5,
            CacheKind::ChargeIcon => 6,
        }
    }
}

/// Single-owner buffer slot. Acquiring drops the previous buffer before the
/// next one is materialized.
#[derive(Debug, Default)]
pub struct CacheSlot {
    buffer: Option<AssetBuffer>,
}

impl CacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize `data` for this consumer.
    ///
    /// Mapped references come back as views and are not retained; offset
    /// references are copied and the copy is kept until the next acquisition.
    pub fn acquire(&mut self, data: &AssetData) -> Result<AssetBuffer> {
        self.release();
        let buffer = data.materialize()?;
        if !buffer.is_mapped() {
            self.buffer = Some(buffer.clone());
        }
        Ok(buffer)
    }

    /// Drop the held buffer; returns whether there was one
    pub fn release(&mut self) -> bool {
        self.buffer.take().is_some()
    }

    pub fn current(&self) -> Option<&AssetBuffer> {
        self.buffer.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.buffer.is_some()
    }
}

/// The full set of cache slots owned by a session
#[derive(Debug, Default)]
pub struct CacheSlots {
    slots: [CacheSlot; 7],
}

impl CacheSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: CacheKind) -> &CacheSlot {
        &self.slots[kind.index()]
    }

    pub fn slot_mut(&mut self, kind: CacheKind) -> &mut CacheSlot {
        &mut self.slots[kind.index()]
    }

    pub fn acquire(&mut self, kind: CacheKind, data: &AssetData) -> Result<AssetBuffer> {
        trace!("📥 Acquiring {kind:?} ({} bytes)", data.size());
        self.slot_mut(kind).acquire(data)
    }

    pub fn release(&mut self, kind: CacheKind) -> bool {
        self.slot_mut(kind).release()
    }

    /// Release every slot; returns how many held a buffer
    pub fn release_all(&mut self) -> usize {
        CacheKind::ALL
            .iter()
            .filter(|kind| self.release(**kind))
            .count()
    }

    /// Release every slot but `keep`
    pub fn release_all_except(&mut self, keep: CacheKind) -> usize {
        CacheKind::ALL
            .iter()
            .filter(|kind| **kind != keep && self.release(**kind))
            .count()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }
}

// src/assets/container.rs
// Asset container reader - header, entry table, integrity check, entry lookup

use log::{debug, trace};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use super::backends::{Backend, FileBackend, RegionBackend, checksum_from};
use super::cache::AssetBuffer;
use super::constants::{
    CONTAINER_HEADER_SIZE, ENTRY_MAGIC, ENTRY_MAGIC_SIZE, ENTRY_NAME_LEN, TABLE_ENTRY_SIZE,
};
use super::partition::PartitionTable;
use crate::exceptions::{EmoteError, Result};

/// Where a container's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Container file on a filesystem
    Path(PathBuf),
    /// Labelled storage region registered in a `PartitionTable`
    Partition(String),
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::Path(path) => write!(f, "{}", path.display()),
            AssetSource::Partition(label) => write!(f, "partition:{label}"),
        }
    }
}

/// Fixed-size header at the start of every container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub stored_files: u32,
    /// Adler-32 of every byte after the header
    pub checksum: u32,
    /// Number of bytes after the header
    pub stored_len: u32,
}

impl ContainerHeader {
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CONTAINER_HEADER_SIZE {
            return Err(EmoteError::ContainerIntegrity(format!(
                "header needs {CONTAINER_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(ContainerHeader {
            stored_files: read_u32(bytes, 0),
            checksum: read_u32(bytes, 4),
            stored_len: read_u32(bytes, 8),
        })
    }

    pub fn pack(&self) -> [u8; CONTAINER_HEADER_SIZE] {
        let mut out = [0u8; CONTAINER_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.stored_files.to_le_bytes());
        out[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        out[8..12].copy_from_slice(&self.stored_len.to_le_bytes());
        out
    }

    pub fn table_len(&self) -> u64 {
        u64::from(self.stored_files) * TABLE_ENTRY_SIZE as u64
    }
}

/// One named blob in the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub name: String,
    pub size: u32,
    /// Offset of the entry marker, relative to the data section
    pub offset: u32,
    pub width: u16,
    pub height: u16,
}

impl ContainerEntry {
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TABLE_ENTRY_SIZE {
            return Err(EmoteError::ContainerIntegrity("truncated entry table".into()));
        }
        let raw_name = &bytes[..ENTRY_NAME_LEN];
        let name_len = raw_name.iter().position(|b| *b == 0).unwrap_or(ENTRY_NAME_LEN);
        let name = std::str::from_utf8(&raw_name[..name_len])
            .map_err(|_| EmoteError::ContainerIntegrity("entry name is not UTF-8".into()))?;
        if name.is_empty() {
            return Err(EmoteError::ContainerIntegrity("entry with empty name".into()));
        }

        Ok(ContainerEntry {
            name: name.to_string(),
            size: read_u32(bytes, ENTRY_NAME_LEN),
            offset: read_u32(bytes, ENTRY_NAME_LEN + 4),
            width: read_u16(bytes, ENTRY_NAME_LEN + 8),
            height: read_u16(bytes, ENTRY_NAME_LEN + 10),
        })
    }

    pub fn pack(&self) -> Result<[u8; TABLE_ENTRY_SIZE]> {
        let name = self.name.as_bytes();
        if name.is_empty() || name.len() > ENTRY_NAME_LEN {
            return Err(EmoteError::InvalidArgument(format!(
                "entry name '{}' must be 1..={ENTRY_NAME_LEN} bytes",
                self.name
            )));
        }
        let mut out = [0u8; TABLE_ENTRY_SIZE];
        out[..name.len()].copy_from_slice(name);
        out[ENTRY_NAME_LEN..ENTRY_NAME_LEN + 4].copy_from_slice(&self.size.to_le_bytes());
        out[ENTRY_NAME_LEN + 4..ENTRY_NAME_LEN + 8].copy_from_slice(&self.offset.to_le_bytes());
        out[ENTRY_NAME_LEN + 8..ENTRY_NAME_LEN + 10].copy_from_slice(&self.width.to_le_bytes());
        out[ENTRY_NAME_LEN + 10..ENTRY_NAME_LEN + 12].copy_from_slice(&self.height.to_le_bytes());
        Ok(out)
    }
}

/// Location of an asset's payload.
///
/// The tag decides how the bytes are materialized: offsets are copied out of
/// the container, mapped ranges are handed out as views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRef {
    /// Absolute byte offset inside a file-backed container
    Offset { offset: u64, len: usize },
    /// Byte range inside a mapped region
    Mapped { offset: u64, len: usize },
}

impl AssetRef {
    pub fn len(&self) -> usize {
        match self {
            AssetRef::Offset { len, .. } | AssetRef::Mapped { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An opened and verified asset container
#[derive(Debug)]
pub struct Container {
    backend: Box<dyn Backend>,
    source: AssetSource,
    header: ContainerHeader,
    entries: Vec<ContainerEntry>,
    data_start: u64,
}

impl Container {
    /// Open `source`, verify it and read its entry table
    pub fn open(source: &AssetSource, partitions: &PartitionTable) -> Result<Self> {
        let backend: Box<dyn Backend> = match source {
            AssetSource::Path(path) => Box::new(FileBackend::open(path)?),
            AssetSource::Partition(label) => {
                Box::new(RegionBackend::new(label, partitions.find(label)?))
            }
        };
        Self::from_backend(backend, source.clone())
    }

    pub fn from_backend(backend: Box<dyn Backend>, source: AssetSource) -> Result<Self> {
        let timer = Instant::now();
        if backend.len() < CONTAINER_HEADER_SIZE as u64 {
            return Err(EmoteError::ContainerIntegrity(format!(
                "{} is too small ({} bytes)",
                backend.describe(),
                backend.len()
            )));
        }

        let header = ContainerHeader::unpack(&backend.read_at(0, CONTAINER_HEADER_SIZE)?)?;
        trace!("📑 Container header: {:?}", header);

        let data_start = CONTAINER_HEADER_SIZE as u64 + header.table_len();
        let mut container = Container {
            backend,
            source,
            header,
            entries: Vec::new(),
            data_start,
        };
        container.full_check()?;

        debug!(
            "✅ Opened container {} with {} entries in {:?}",
            container.source,
            container.entries.len(),
            timer.elapsed()
        );
        Ok(container)
    }

    /// Verify length, checksum, entry table bounds and entry markers
    fn full_check(&mut self) -> Result<()> {
        let body_len = self.backend.len() - CONTAINER_HEADER_SIZE as u64;
        if u64::from(self.header.stored_len) != body_len {
            return Err(EmoteError::ContainerIntegrity(format!(
                "stored length {} does not match {} body bytes",
                self.header.stored_len, body_len
            )));
        }
        if self.header.stored_files == 0 {
            return Err(EmoteError::ContainerIntegrity("container has no entries".into()));
        }
        if self.header.table_len() > body_len {
            return Err(EmoteError::ContainerIntegrity(format!(
                "entry table of {} entries overruns container",
                self.header.stored_files
            )));
        }

        let checksum = checksum_from(self.backend.as_ref(), CONTAINER_HEADER_SIZE as u64)?;
        if checksum != self.header.checksum {
            return Err(EmoteError::ContainerIntegrity(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                self.header.checksum, checksum
            )));
        }

        let table_len = usize::try_from(self.header.table_len())
            .map_err(|_| EmoteError::ContainerIntegrity("entry table too large".into()))?;
        let table = self.backend.read_at(CONTAINER_HEADER_SIZE as u64, table_len)?;
        let data_len = self.backend.len() - self.data_start;

        let mut entries = Vec::new();
        entries.try_reserve_exact(self.header.stored_files as usize)?;
        for raw in table.chunks_exact(TABLE_ENTRY_SIZE) {
            let entry = ContainerEntry::unpack(raw)?;
            let end = u64::from(entry.offset) + ENTRY_MAGIC_SIZE as u64 + u64::from(entry.size);
            if end > data_len {
                return Err(EmoteError::ContainerIntegrity(format!(
                    "entry '{}' overruns data section",
                    entry.name
                )));
            }
            let marker = self
                .backend
                .read_at(self.data_start + u64::from(entry.offset), ENTRY_MAGIC_SIZE)?;
            if marker != ENTRY_MAGIC {
                return Err(EmoteError::ContainerIntegrity(format!(
                    "entry '{}' has a bad marker",
                    entry.name
                )));
            }
            entries.push(entry);
        }

        self.entries = entries;
        Ok(())
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries are few; a linear scan by exact name
    pub fn find(&self, name: &str) -> Option<&ContainerEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Payload reference for `entry`, tagged by how the backend serves bytes
    pub fn asset_ref(&self, entry: &ContainerEntry) -> AssetRef {
        let offset = self.data_start + u64::from(entry.offset) + ENTRY_MAGIC_SIZE as u64;
        let len = entry.size as usize;
        if self.backend.is_mapped() {
            AssetRef::Mapped { offset, len }
        } else {
            AssetRef::Offset { offset, len }
        }
    }

    pub fn resolve(&self, name: &str) -> Result<AssetRef> {
        self.find(name)
            .map(|entry| self.asset_ref(entry))
            .ok_or_else(|| {
                EmoteError::AssetNotFound(format!("'{name}' not in {}", self.source))
            })
    }

    /// Copy the referenced bytes out of the container
    pub fn read(&self, reference: &AssetRef) -> Result<Vec<u8>> {
        match *reference {
            AssetRef::Offset { offset, len } | AssetRef::Mapped { offset, len } => {
                self.backend.read_at(offset, len)
            }
        }
    }

    /// Turn a reference into usable bytes: a view for mapped data, a fresh
    /// copy for offsets
    pub fn materialize(&self, reference: &AssetRef) -> Result<AssetBuffer> {
        match *reference {
            AssetRef::Mapped { offset, len } => self.backend.view_at(offset, len),
            AssetRef::Offset { offset, len } => {
                Ok(AssetBuffer::owned(self.backend.read_at(offset, len)?))
            }
        }
    }

    /// Read a whole entry by name
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        self.read(&self.resolve(name)?)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

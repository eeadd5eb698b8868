// src/assets/writer.rs
// Container builder - lays out header, entry table and marked payloads

use log::{debug, trace};
use std::fs;
use std::path::Path;

use super::constants::{CONTAINER_HEADER_SIZE, ENTRY_MAGIC, ENTRY_MAGIC_SIZE, ENTRY_NAME_LEN, TABLE_ENTRY_SIZE};
use super::container::{ContainerEntry, ContainerHeader};
use crate::exceptions::{EmoteError, Result};

#[derive(Debug, Clone)]
struct PendingEntry {
    name: String,
    data: Vec<u8>,
    width: u16,
    height: u16,
}

/// Accumulates named blobs and writes them as one container.
///
/// Entries keep insertion order; the first entry of a boot container is the
/// boot animation.
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    entries: Vec<PendingEntry>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, data: Vec<u8>) -> Result<&mut Self> {
        self.add_image(name, data, 0, 0)
    }

    /// Add an entry carrying pixel dimensions in its table record
    pub fn add_image(&mut self, name: &str, data: Vec<u8>, width: u16, height: u16) -> Result<&mut Self> {
        if name.is_empty() || name.len() > ENTRY_NAME_LEN || name.contains('\0') {
            return Err(EmoteError::InvalidArgument(format!(
                "entry name '{name}' must be 1..={ENTRY_NAME_LEN} bytes without NUL"
            )));
        }
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(EmoteError::InvalidArgument(format!("duplicate entry '{name}'")));
        }
        trace!("➕ Adding entry {name} ({} bytes)", data.len());
        self.entries.push(PendingEntry {
            name: name.to_string(),
            data,
            width,
            height,
        });
        Ok(self)
    }

    /// Add every regular file in `dir`, sorted by file name
    pub fn add_dir(&mut self, dir: &Path) -> Result<&mut Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    EmoteError::InvalidArgument(format!("unusable file name {}", path.display()))
                })?
                .to_string();
            self.add(&name, fs::read(&path)?)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the container
    pub fn build(&self) -> Result<Vec<u8>> {
        if self.entries.is_empty() {
            return Err(EmoteError::InvalidArgument("container needs at least one entry".into()));
        }

        let mut table = Vec::with_capacity(self.entries.len() * TABLE_ENTRY_SIZE);
        let mut data = Vec::new();
        for pending in &self.entries {
            let entry = ContainerEntry {
                name: pending.name.clone(),
                size: to_u32(pending.data.len(), &pending.name)?,
                offset: to_u32(data.len(), &pending.name)?,
                width: pending.width,
                height: pending.height,
            };
            table.extend_from_slice(&entry.pack()?);
            data.extend_from_slice(&ENTRY_MAGIC);
            data.extend_from_slice(&pending.data);
        }

        let mut body = table;
        body.append(&mut data);

        let header = ContainerHeader {
            stored_files: to_u32(self.entries.len(), "entry count")?,
            checksum: adler::adler32_slice(&body),
            stored_len: to_u32(body.len(), "container body")?,
        };

        let mut out = Vec::with_capacity(CONTAINER_HEADER_SIZE + body.len());
        out.extend_from_slice(&header.pack());
        out.extend_from_slice(&body);
        debug!(
            "📦 Built container: {} entries, {} bytes, checksum {:08x}",
            self.entries.len(),
            out.len(),
            header.checksum
        );
        Ok(out)
    }

    /// Build and write to `path`; returns the number of bytes written
    pub fn write_to(&self, path: &Path) -> Result<u64> {
        let bytes = self.build()?;
        fs::write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| EmoteError::InvalidArgument(format!("{what}: {value} exceeds the 32-bit container limit")))
}

/// Bytes a payload of `size` occupies in the data section
pub fn stored_size(size: usize) -> usize {
    ENTRY_MAGIC_SIZE + size
}

// src/assets/backends.rs
// Backends for asset container access - file reads and mapped storage regions

use log::{debug, trace};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::cache::AssetBuffer;
use crate::exceptions::{EmoteError, Result};

/// Chunk size for streaming checksum passes
pub const CHECK_CHUNK_SIZE: usize = 64 * 1024;

/// Trait for asset container access backends
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Total size of the backing storage in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `size` bytes at `offset` into a new buffer
    fn read_at(&self, offset: u64, size: usize) -> Result<Vec<u8>>;

    /// Get a view of data without copying (if supported)
    fn view_at(&self, _offset: u64, _size: usize) -> Result<AssetBuffer> {
        Err(EmoteError::Generic(
            "View not supported by this backend".into(),
        ))
    }

    /// Whether `view_at` is available
    fn is_mapped(&self) -> bool {
        false
    }

    /// Human readable origin, for logs
    fn describe(&self) -> String;
}

fn checked_range(offset: u64, size: usize, len: u64) -> Result<()> {
    let end = offset.checked_add(size as u64);
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(EmoteError::ContainerIntegrity(format!(
            "read {offset}+{size} past end of {len}-byte container"
        ))),
    }
}

/// Traditional file I/O backend; every read is a copy
pub struct FileBackend {
    file: Mutex<File>,
    path: PathBuf,
    len: u64,
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish()
    }
}

impl FileBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let timer = Instant::now();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        debug!(
            "📁 File backend opened {} ({} bytes) in {:?}",
            path.display(),
            len,
            timer.elapsed()
        );

        Ok(FileBackend {
            file: Mutex::new(file),
            path: path.to_path_buf(),
            len,
        })
    }
}

impl Backend for FileBackend {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, size: usize) -> Result<Vec<u8>> {
        trace!("🔍 File read_at: offset={}, size={}", offset, size);
        checked_range(offset, size, self.len)?;

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size)?;
        buffer.resize(size, 0);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Backend over a storage region that is already addressable in memory
/// (a registered partition image)
pub struct RegionBackend {
    label: String,
    region: Arc<[u8]>,
}

impl std::fmt::Debug for RegionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionBackend")
            .field("label", &self.label)
            .field("region", &format!("<{} bytes>", self.region.len()))
            .finish()
    }
}

impl RegionBackend {
    pub fn new(label: &str, region: Arc<[u8]>) -> Self {
        debug!("🗺️ Region backend for partition '{label}' ({} bytes)", region.len());
        RegionBackend {
            label: label.to_string(),
            region,
        }
    }
}

impl Backend for RegionBackend {
    fn len(&self) -> u64 {
        self.region.len() as u64
    }

    fn read_at(&self, offset: u64, size: usize) -> Result<Vec<u8>> {
        Ok(self.view_at(offset, size)?.as_slice().to_vec())
    }

    fn view_at(&self, offset: u64, size: usize) -> Result<AssetBuffer> {
        checked_range(offset, size, self.len())?;
        let start = usize::try_from(offset).map_err(|_| {
            EmoteError::ContainerIntegrity(format!("offset {offset} not addressable"))
        })?;
        AssetBuffer::view(&self.region, start, size)
    }

    fn is_mapped(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("partition:{}", self.label)
    }
}

/// Adler-32 over `[offset, backend.len())`, streamed in chunks
pub fn checksum_from(backend: &dyn Backend, offset: u64) -> Result<u32> {
    let timer = Instant::now();
    let mut adler = adler::Adler32::new();
    let mut position = offset;
    let end = backend.len();

    while position < end {
        let chunk = CHECK_CHUNK_SIZE.min((end - position) as usize);
        if backend.is_mapped() {
            adler.write_slice(backend.view_at(position, chunk)?.as_slice());
        } else {
            adler.write_slice(&backend.read_at(position, chunk)?);
        }
        position += chunk as u64;
    }

    trace!("🔢 Checksummed {} bytes in {:?}", end.saturating_sub(offset), timer.elapsed());
    Ok(adler.checksum())
}

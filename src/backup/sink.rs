//! Storage sinks
//!
//! A sink is a byte-stream endpoint the caller has already resolved: a file
//! path picked by the user, an in-memory buffer, anything that can be opened
//! for writing (export) or reading (restore). The engine never resolves
//! destinations itself.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A destination for export or a source for restore
pub trait StorageSink: Send + Sync {
    /// Open for writing, truncating previous contents
    fn open_write(&self) -> io::Result<Box<dyn Write + '_>>;

    /// Open for reading from the start
    fn open_read(&self) -> io::Result<Box<dyn Read + '_>>;

    /// Description for logs and messages
    fn describe(&self) -> String;
}

/// A sink backed by a file path
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSink for FileSink {
    fn open_write(&self) -> io::Result<Box<dyn Write + '_>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(BufWriter::new(File::create(&self.path)?)))
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A sink backed by a shared in-memory buffer
///
/// Clones share the same buffer, so one clone can be exported into and
/// another restored from.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink pre-filled with `bytes`
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(bytes.into())),
        }
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }
}

/// Writes into a private buffer and publishes it on flush
struct MemoryWriter {
    target: Arc<Mutex<Vec<u8>>>,
    pending: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut target = self
            .target
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink lock poisoned"))?;
        target.clone_from(&self.pending);
        Ok(())
    }
}

impl StorageSink for MemorySink {
    fn open_write(&self) -> io::Result<Box<dyn Write + '_>> {
        let mut target = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink lock poisoned"))?;
        target.clear();
        Ok(Box::new(MemoryWriter {
            target: Arc::clone(&self.buffer),
            pending: Vec::new(),
        }))
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + '_>> {
        let buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink lock poisoned"))?;
        Ok(Box::new(Cursor::new(buffer.clone())))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

//! Protocol adapter.
//!
//! [`FsOps`] is the surface a kernel protocol engine drives. Calls are
//! path-based with explicit offsets and sizes. Each one resolves its path
//! against the live tree and delegates to the node, so a concurrent bind or
//! unbind is observed on the next call.

use std::path::Path;

use async_trait::async_trait;
use tracing::trace;

use crate::attr::{DirEntry, FileAttr, OpenFlags, SetAttr};
use crate::error::{TreeError, TreeResult};
use crate::fs::FileSystem;
use crate::node::NodeRef;

/// Chunk size used by [`FsOps::read_all`].
pub const READ_CHUNK: u32 = 4096;

/// Core protocol operations.
///
/// Node operations are synchronous and short; no implementation holds a
/// lock across an await point.
#[async_trait]
pub trait FsOps: Send + Sync {
    /// Get attributes.
    async fn getattr(&self, path: &Path) -> TreeResult<FileAttr>;

    /// List a directory.
    async fn readdir(&self, path: &Path) -> TreeResult<Vec<DirEntry>>;

    /// Find `name` in the directory at `dir`.
    async fn lookup(&self, dir: &Path, name: &str) -> TreeResult<NodeRef>;

    /// Open a node. The returned node is the I/O handle.
    async fn open(&self, path: &Path, flags: OpenFlags) -> TreeResult<NodeRef>;

    /// Read up to `size` bytes at `offset`. Returns fewer at end of data.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> TreeResult<Vec<u8>>;

    /// Write `data` at `offset`, returning the number of bytes accepted.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> TreeResult<u32>;

    async fn flush(&self, path: &Path) -> TreeResult<()>;

    async fn release(&self, path: &Path) -> TreeResult<()>;

    /// Apply a setattr request.
    async fn setattr(&self, path: &Path, attr: SetAttr) -> TreeResult<FileAttr>;

    /// Read a whole file in [`READ_CHUNK`] pieces.
    async fn read_all(&self, path: &Path) -> TreeResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let chunk = self.read(path, out.len() as u64, READ_CHUNK).await?;
            if chunk.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }
}

fn offset(offset: u64) -> TreeResult<i64> {
    i64::try_from(offset).map_err(|_| TreeError::invalid_input(format!("offset {offset}")))
}

impl FileSystem {
    fn resolve(&self, op: &'static str, path: &Path) -> TreeResult<NodeRef> {
        Ok(self.walk_path(op, &path.to_string_lossy())?)
    }
}

#[async_trait]
impl FsOps for FileSystem {
    async fn getattr(&self, path: &Path) -> TreeResult<FileAttr> {
        self.resolve("getattr", path)?.getattr()
    }

    async fn readdir(&self, path: &Path) -> TreeResult<Vec<DirEntry>> {
        self.resolve("readdir", path)?.readdir()
    }

    async fn lookup(&self, dir: &Path, name: &str) -> TreeResult<NodeRef> {
        let node = self.resolve("lookup", dir)?;
        if node.as_dir().is_none() {
            return Err(TreeError::not_a_directory("lookup", dir.to_string_lossy()));
        }
        node.lookup(name)
    }

    async fn open(&self, path: &Path, flags: OpenFlags) -> TreeResult<NodeRef> {
        let node = self.resolve("open", path)?;
        node.open(flags)?;
        trace!(path = %path.display(), ?flags, "open");
        Ok(node)
    }

    async fn read(&self, path: &Path, off: u64, size: u32) -> TreeResult<Vec<u8>> {
        self.resolve("read", path)?.read(offset(off)?, size)
    }

    async fn write(&self, path: &Path, off: u64, data: &[u8]) -> TreeResult<u32> {
        self.resolve("write", path)?.write(offset(off)?, data)
    }

    async fn flush(&self, path: &Path) -> TreeResult<()> {
        self.resolve("flush", path)?.flush()
    }

    async fn release(&self, path: &Path) -> TreeResult<()> {
        self.resolve("release", path)?.release()
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> TreeResult<FileAttr> {
        self.resolve("setattr", path)?.setattr(&attr)
    }
}

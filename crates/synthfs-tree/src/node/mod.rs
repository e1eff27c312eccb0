//! Tree nodes.
//!
//! A node is a [`Dir`] or one of three file variants that differ only in the
//! capabilities of their backend:
//!
//! - [`RoFile`] - read
//! - [`WoFile`] - write, flush, setattr
//! - [`RwFile`] - read, write, flush, setattr
//!
//! Nodes hold no reference to their parent. Each holds a weak back-reference
//! to the [`FileSystem`] that owns it, used for the clock and for cache
//! invalidation. The filesystem keeps that reference consistent through
//! `sync`, `bind` and `unbind`.
//!
//! ## Locking
//!
//! Every node guards its attributes, back-reference and backend (or child
//! map) with its own mutex. A directory holds its lock while querying its
//! children during a listing, so locks are only ever taken parent before
//! child. The filesystem's structural lock is always taken before any node
//! lock.

mod dir;
mod file;
mod ro;
mod rw;
mod wo;

pub use dir::Dir;
pub use ro::RoFile;
pub use rw::RwFile;
pub use wo::WoFile;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::attr::{DirEntry, FileAttr, OpenFlags, SetAttr};
use crate::error::{TreeError, TreeResult};
use crate::fs::FileSystem;

/// Identity of the root directory, as in the kernel protocol.
pub const ROOT_INO: u64 = 1;

/// Path separator. Node names may not contain it.
pub const SEPARATOR: char = '/';

/// Shared handle to a node.
pub type NodeRef = Arc<dyn Node>;

static NEXT_INO: AtomicU64 = AtomicU64::new(ROOT_INO + 1);

fn alloc_ino() -> u64 {
    NEXT_INO.fetch_add(1, Ordering::Relaxed)
}

fn check_name(name: &str) -> TreeResult<()> {
    if name.contains(SEPARATOR) {
        return Err(TreeError::BadName(name.to_string()));
    }
    Ok(())
}

/// Current time from the filesystem behind `fs`, or the epoch when detached.
fn now_of(fs: &Weak<FileSystem>) -> SystemTime {
    fs.upgrade().map(|fs| fs.now()).unwrap_or(UNIX_EPOCH)
}

/// The contract every node implements.
///
/// Identity and binding methods are required. Protocol operations default to
/// `NotSupported` where a variant lacks the capability; `open`, `flush` and
/// `release` default to success since a node with nothing to do there is
/// still a valid handle.
pub trait Node: Send + Sync + fmt::Debug {
    /// Name of the node within its directory.
    fn name(&self) -> &str;

    /// Stable numeric identity.
    fn ino(&self) -> u64;

    /// Weak reference to the owning filesystem.
    fn sys(&self) -> Weak<FileSystem>;

    /// Rebind to `fs`, stamping access, modify and change time with `now`.
    ///
    /// Passing `Weak::new()` detaches the node.
    fn set_sys(&self, fs: Weak<FileSystem>, now: SystemTime);

    /// Owning filesystem, if the node is bound to a live one.
    fn filesystem(&self) -> Option<Arc<FileSystem>> {
        self.sys().upgrade()
    }

    /// Attribute query.
    fn getattr(&self) -> TreeResult<FileAttr>;

    /// Directory view of this node.
    fn as_dir(&self) -> Option<&Dir> {
        None
    }

    /// List children.
    fn readdir(&self) -> TreeResult<Vec<DirEntry>> {
        Err(TreeError::NotSupported("readdir"))
    }

    /// Find the child called `name`.
    fn lookup(&self, name: &str) -> TreeResult<NodeRef> {
        let _ = name;
        Err(TreeError::NotSupported("lookup"))
    }

    /// Open the node. The node is its own handle.
    fn open(&self, flags: OpenFlags) -> TreeResult<()> {
        let _ = flags;
        Ok(())
    }

    /// Read at most `size` bytes at `offset`. Short reads are not errors.
    fn read(&self, offset: i64, size: u32) -> TreeResult<Vec<u8>> {
        let _ = (offset, size);
        Err(TreeError::NotSupported("read"))
    }

    /// Write `data` at `offset`, returning the number of bytes accepted.
    fn write(&self, offset: i64, data: &[u8]) -> TreeResult<u32> {
        let _ = (offset, data);
        Err(TreeError::NotSupported("write"))
    }

    fn flush(&self) -> TreeResult<()> {
        Ok(())
    }

    fn release(&self) -> TreeResult<()> {
        Ok(())
    }

    /// Apply a setattr request, returning the updated attributes.
    fn setattr(&self, req: &SetAttr) -> TreeResult<FileAttr> {
        let _ = req;
        Err(TreeError::NotSupported("setattr"))
    }
}

/// Conversion into a shared node handle.
pub trait IntoNode {
    fn into_node(self) -> NodeRef;
}

impl<N: Node + 'static> IntoNode for N {
    fn into_node(self) -> NodeRef {
        Arc::new(self)
    }
}

impl IntoNode for NodeRef {
    fn into_node(self) -> NodeRef {
        self
    }
}

/// Ask the node's filesystem to drop any kernel cache of the node.
///
/// A detached node cannot be cached, so this succeeds trivially.
pub fn invalidate(node: &dyn Node) -> TreeResult<()> {
    match node.filesystem() {
        Some(fs) => fs.invalidate(node),
        None => Ok(()),
    }
}

//! Write-only file node.

use std::sync::Weak;
use std::time::SystemTime;

use super::Node;
use super::file::FileCore;
use crate::attr::{FileAttr, PERM_MASK, READ_BITS, S_IFREG, SetAttr};
use crate::backends::Writer;
use crate::error::TreeResult;
use crate::fs::FileSystem;

/// A write-only file, typically a command file backed by a [`Func`].
///
/// [`Func`]: crate::backends::Func
#[derive(Debug)]
pub struct WoFile {
    core: FileCore<dyn Writer>,
}

impl WoFile {
    /// Create a write-only file. Read permission bits are cleared from `mode`.
    pub fn new(name: impl Into<String>, mode: u32, dev: impl Writer + 'static) -> TreeResult<Self> {
        Ok(Self {
            core: FileCore::<dyn Writer>::new(name.into(), Self::file_mode(mode), Box::new(dev))?,
        })
    }

    /// Like [`WoFile::new`] but panics if `name` contains a separator.
    pub fn must(name: impl Into<String>, mode: u32, dev: impl Writer + 'static) -> Self {
        match Self::new(name, mode, dev) {
            Ok(f) => f,
            Err(e) => panic!("WoFile::must: {e}"),
        }
    }

    /// Set the owner and group.
    pub fn own(mut self, uid: u32, gid: u32) -> Self {
        self.core.own(uid, gid);
        self
    }

    fn file_mode(mode: u32) -> u32 {
        S_IFREG | (mode & PERM_MASK & !READ_BITS)
    }
}

impl Node for WoFile {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn ino(&self) -> u64 {
        self.core.ino()
    }

    fn sys(&self) -> Weak<FileSystem> {
        self.core.sys()
    }

    fn set_sys(&self, fs: Weak<FileSystem>, now: SystemTime) {
        self.core.set_sys(fs, now)
    }

    fn getattr(&self) -> TreeResult<FileAttr> {
        self.core.getattr()
    }

    fn write(&self, offset: i64, data: &[u8]) -> TreeResult<u32> {
        self.core.write(offset, data)
    }

    fn flush(&self) -> TreeResult<()> {
        self.core.flush()
    }

    fn release(&self) -> TreeResult<()> {
        self.core.release()
    }

    fn setattr(&self, req: &SetAttr) -> TreeResult<FileAttr> {
        self.core.setattr(req, Self::file_mode)
    }
}

//! Read-write file node.

use std::sync::Weak;
use std::time::SystemTime;

use super::Node;
use super::file::FileCore;
use crate::attr::{FileAttr, PERM_MASK, S_IFREG, SetAttr};
use crate::backends::ReadWriter;
use crate::error::TreeResult;
use crate::fs::FileSystem;

/// A read-write file.
#[derive(Debug)]
pub struct RwFile {
    core: FileCore<dyn ReadWriter>,
}

impl RwFile {
    /// Create a read-write file with `mode` as given, minus any type bits.
    pub fn new(
        name: impl Into<String>,
        mode: u32,
        dev: impl ReadWriter + 'static,
    ) -> TreeResult<Self> {
        Ok(Self {
            core: FileCore::<dyn ReadWriter>::new(name.into(), Self::file_mode(mode), Box::new(dev))?,
        })
    }

    /// Like [`RwFile::new`] but panics if `name` contains a separator.
    pub fn must(name: impl Into<String>, mode: u32, dev: impl ReadWriter + 'static) -> Self {
        match Self::new(name, mode, dev) {
            Ok(f) => f,
            Err(e) => panic!("RwFile::must: {e}"),
        }
    }

    /// Set the owner and group.
    pub fn own(mut self, uid: u32, gid: u32) -> Self {
        self.core.own(uid, gid);
        self
    }

    fn file_mode(mode: u32) -> u32 {
        S_IFREG | (mode & PERM_MASK)
    }
}

impl Node for RwFile {
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

    fn read(&self, offset: i64, size: u32) -> TreeResult<Vec<u8>> {
        self.core.read(offset, size)
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

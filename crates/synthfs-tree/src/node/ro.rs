//! Read-only file node.

use std::sync::Weak;
use std::time::SystemTime;

use super::Node;
use super::file::FileCore;
use crate::attr::{FileAttr, PERM_MASK, S_IFREG, WRITE_BITS};
use crate::backends::Reader;
use crate::error::TreeResult;
use crate::fs::FileSystem;

/// A read-only file.
#[derive(Debug)]
pub struct RoFile {
    core: FileCore<dyn Reader>,
}

impl RoFile {
    /// Create a read-only file. Write permission bits are cleared from `mode`.
    pub fn new(name: impl Into<String>, mode: u32, dev: impl Reader + 'static) -> TreeResult<Self> {
        Ok(Self {
            core: FileCore::<dyn Reader>::new(name.into(), Self::file_mode(mode), Box::new(dev))?,
        })
    }

    /// Like [`RoFile::new`] but panics if `name` contains a separator.
    pub fn must(name: impl Into<String>, mode: u32, dev: impl Reader + 'static) -> Self {
        match Self::new(name, mode, dev) {
            Ok(f) => f,
            Err(e) => panic!("RoFile::must: {e}"),
        }
    }

    /// Set the owner and group.
    pub fn own(mut self, uid: u32, gid: u32) -> Self {
        self.core.own(uid, gid);
        self
    }

    fn file_mode(mode: u32) -> u32 {
        S_IFREG | (mode & PERM_MASK & !WRITE_BITS)
    }
}

impl Node for RoFile {
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

    fn release(&self) -> TreeResult<()> {
        self.core.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{S_IFDIR, SetAttr};
    use crate::backends::{Device, ReadOutcome, Text};
    use crate::error::TreeError;

    #[test]
    fn test_mode_drops_write_and_dir_bits() {
        let f = RoFile::must("event", S_IFDIR | 0o666, Text::new("x"));
        let attr = f.getattr().unwrap();
        assert!(attr.is_file());
        assert_eq!(attr.mode, S_IFREG | 0o444);
    }

    #[test]
    fn test_read_reports_available_bytes() {
        let f = RoFile::must("event", 0o444, Text::new("constant data\n"));
        assert_eq!(f.read(0, 4096).unwrap(), b"constant data\n");
        assert_eq!(f.read(9, 4).unwrap(), b"data");
        assert_eq!(f.read(14, 10).unwrap(), b"");
        assert_eq!(f.read(100, 10).unwrap(), b"");
        assert_eq!(f.getattr().unwrap().size, 14);
    }

    #[test]
    fn test_no_write_capability() {
        let f = RoFile::must("event", 0o444, Text::new("x"));
        assert!(matches!(f.write(0, b"y"), Err(TreeError::NotSupported(_))));
        assert!(matches!(
            f.setattr(&SetAttr::new().with_size(0)),
            Err(TreeError::NotSupported(_))
        ));
        f.flush().unwrap();
    }

    #[test]
    fn test_own() {
        let f = RoFile::must("event", 0o444, Text::new("x")).own(1000, 20);
        let attr = f.getattr().unwrap();
        assert_eq!((attr.uid, attr.gid), (1000, 20));
    }

    struct Closing(bool);

    impl Device for Closing {
        fn size(&self) -> TreeResult<u64> {
            Ok(0)
        }

        fn close(&mut self) -> TreeResult<()> {
            if self.0 {
                Err(TreeError::other("already closed"))
            } else {
                Ok(())
            }
        }
    }

    impl Reader for Closing {
        fn read_at(&self, _buf: &mut [u8], _offset: i64) -> TreeResult<ReadOutcome> {
            Err(TreeError::EndOfData)
        }
    }

    #[test]
    fn test_release_propagates_close_failure() {
        RoFile::must("ok", 0o444, Closing(false)).release().unwrap();
        let err = RoFile::must("bad", 0o444, Closing(true)).release().unwrap_err();
        assert!(matches!(err, TreeError::DeviceUnavailable(_)));
    }
}

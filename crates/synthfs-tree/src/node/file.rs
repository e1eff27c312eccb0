//! State and I/O shared by the three file variants.

use std::fmt;
use std::sync::Weak;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::trace;

use super::{alloc_ino, check_name, now_of};
use crate::attr::{Attr, FileAttr, SetAttr};
use crate::backends::{Device, Reader, Writer};
use crate::error::{TreeError, TreeResult};
use crate::fs::FileSystem;

struct FileState<D: ?Sized> {
    attr: Attr,
    fs: Weak<FileSystem>,
    dev: Box<D>,
}

/// A named file over a backend of type `D`.
pub(super) struct FileCore<D: ?Sized> {
    name: String,
    ino: u64,
    state: Mutex<FileState<D>>,
}

impl<D: Device + ?Sized> FileCore<D> {
    pub(super) fn new(name: String, mode: u32, dev: Box<D>) -> TreeResult<Self> {
        check_name(&name)?;
        Ok(Self {
            name,
            ino: alloc_ino(),
            state: Mutex::new(FileState {
                attr: Attr::new(mode),
                fs: Weak::new(),
                dev,
            }),
        })
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn ino(&self) -> u64 {
        self.ino
    }

    pub(super) fn own(&mut self, uid: u32, gid: u32) {
        let state = self.state.get_mut();
        state.attr.uid = uid;
        state.attr.gid = gid;
    }

    pub(super) fn sys(&self) -> Weak<FileSystem> {
        self.state.lock().fs.clone()
    }

    pub(super) fn set_sys(&self, fs: Weak<FileSystem>, now: SystemTime) {
        let mut state = self.state.lock();
        state.fs = fs;
        state.attr.stamp(now);
    }

    /// Stored attributes plus the backend's current size.
    pub(super) fn getattr(&self) -> TreeResult<FileAttr> {
        let state = self.state.lock();
        let size = state.dev.size().map_err(TreeError::device)?;
        Ok(state.attr.to_file_attr(self.ino, size))
    }

    pub(super) fn flush(&self) -> TreeResult<()> {
        self.state.lock().dev.sync().map_err(TreeError::device)
    }

    pub(super) fn release(&self) -> TreeResult<()> {
        self.state.lock().dev.close().map_err(TreeError::device)
    }
}

impl<D: Reader + ?Sized> FileCore<D> {
    pub(super) fn read(&self, offset: i64, size: u32) -> TreeResult<Vec<u8>> {
        let mut state = self.state.lock();
        let now = now_of(&state.fs);
        state.attr.atime = now;

        // Never allocate past the end of the backing data.
        let len = match state.dev.size() {
            Ok(total) => u64::from(size).min(total.saturating_sub(offset.max(0) as u64)),
            Err(_) => u64::from(size),
        };
        let mut buf = vec![0u8; len as usize];
        let n = match state.dev.read_at(&mut buf, offset) {
            Ok(out) => out.n,
            Err(TreeError::EndOfData) => 0,
            Err(e) => return Err(e),
        };
        buf.truncate(n);
        trace!(name = %self.name, offset, size, n, "read");
        Ok(buf)
    }
}

impl<D: Writer + ?Sized> FileCore<D> {
    pub(super) fn write(&self, offset: i64, data: &[u8]) -> TreeResult<u32> {
        let mut state = self.state.lock();
        let now = now_of(&state.fs);
        state.attr.mtime = now;

        let n = state.dev.write_at(data, offset)?;
        trace!(name = %self.name, offset, len = data.len(), n, "write");
        u32::try_from(n).map_err(|_| TreeError::invalid_input(format!("write of {n} bytes")))
    }

    /// Truncate first if a size is requested, then merge the remaining
    /// fields. `mask` normalizes a requested mode for the variant.
    pub(super) fn setattr(&self, req: &SetAttr, mask: fn(u32) -> u32) -> TreeResult<FileAttr> {
        let mut state = self.state.lock();

        if let Some(size) = req.size {
            let size = i64::try_from(size)
                .map_err(|_| TreeError::invalid_input(format!("truncate to {size}")))?;
            state.dev.truncate(size)?;
        }
        let size = state.dev.size().map_err(TreeError::device)?;

        let req = SetAttr {
            mode: req.mode.map(mask),
            ..req.clone()
        };
        let mut resp = state.attr.to_file_attr(self.ino, size);
        state.attr.merge(&req, &mut resp);
        trace!(name = %self.name, ?req, "setattr");
        Ok(resp)
    }
}

impl<D: ?Sized> fmt::Debug for FileCore<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCore")
            .field("name", &self.name)
            .field("ino", &self.ino)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Bytes, ReadOutcome};
    use crate::node::{Dir, IntoNode, Node, RoFile, RwFile};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// `/dev/foo` on a filesystem whose clock the test advances.
    fn bound_foo() -> (Arc<AtomicU64>, Arc<FileSystem>) {
        let secs = Arc::new(AtomicU64::new(100));
        let c = Arc::clone(&secs);
        let dev = Dir::must("dev", 0o775).with([RwFile::must(
            "foo",
            0o666,
            Bytes::new("with data already here"),
        )]);
        let fs = FileSystem::new(0o775, move || at(c.load(Ordering::SeqCst))).with([dev]);
        fs.sync();
        (secs, fs)
    }

    #[test]
    fn test_read_stamps_atime() {
        let (secs, fs) = bound_foo();
        let foo = fs.lookup_path("/dev/foo").unwrap();
        assert_eq!(foo.getattr().unwrap().atime, at(100));

        secs.store(200, Ordering::SeqCst);
        foo.read(0, 4).unwrap();
        let attr = foo.getattr().unwrap();
        assert_eq!(attr.atime, at(200));
        assert_eq!(attr.mtime, at(100));

        // A read past the end is still an access.
        secs.store(250, Ordering::SeqCst);
        assert!(foo.read(1000, 4).unwrap().is_empty());
        assert_eq!(foo.getattr().unwrap().atime, at(250));
    }

    #[test]
    fn test_write_stamps_mtime() {
        let (secs, fs) = bound_foo();
        let foo = fs.lookup_path("/dev/foo").unwrap();

        secs.store(300, Ordering::SeqCst);
        foo.write(0, b"WITH").unwrap();
        let attr = foo.getattr().unwrap();
        assert_eq!(attr.mtime, at(300));
        assert_eq!(attr.atime, at(100));
    }

    #[test]
    fn test_detached_io_stamps_epoch() {
        let foo = RwFile::must("foo", 0o666, Bytes::new("abc"));
        foo.write(3, b"d").unwrap();
        foo.read(0, 4).unwrap();
        let attr = foo.getattr().unwrap();
        assert_eq!(attr.atime, UNIX_EPOCH);
        assert_eq!(attr.mtime, UNIX_EPOCH);
    }

    /// Reports a fixed size and records the largest buffer it is handed.
    struct Small {
        widest: Arc<AtomicUsize>,
    }

    impl Device for Small {
        fn size(&self) -> TreeResult<u64> {
            Ok(3)
        }
    }

    impl Reader for Small {
        fn read_at(&self, buf: &mut [u8], offset: i64) -> TreeResult<ReadOutcome> {
            self.widest.fetch_max(buf.len(), Ordering::SeqCst);
            let src: &[u8] = b"abc";
            let start = usize::try_from(offset).unwrap_or(usize::MAX).min(src.len());
            let n = buf.len().min(src.len() - start);
            if n == 0 {
                return Err(TreeError::EndOfData);
            }
            buf[..n].copy_from_slice(&src[start..start + n]);
            Ok(ReadOutcome {
                n,
                eof: start + n == src.len(),
            })
        }
    }

    #[test]
    fn test_read_buffer_bounded_by_size() {
        let widest = Arc::new(AtomicUsize::new(0));
        let f = RoFile::must(
            "small",
            0o444,
            Small {
                widest: Arc::clone(&widest),
            },
        )
        .into_node();

        assert_eq!(f.read(0, u32::MAX).unwrap(), b"abc");
        assert_eq!(widest.load(Ordering::SeqCst), 3);
        assert_eq!(f.read(2, u32::MAX).unwrap(), b"c");
        assert!(f.read(3, u32::MAX).unwrap().is_empty());
        assert_eq!(widest.load(Ordering::SeqCst), 3);
    }
}

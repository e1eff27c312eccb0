//! Node attributes and the protocol-facing records built from them.
//!
//! Every node embeds an [`Attr`]. The protocol boundary never sees it
//! directly: attribute queries copy it into a [`FileAttr`], and setattr
//! requests arrive as a [`SetAttr`] whose `Some` fields are the validity mask.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// File type mask.
pub const S_IFMT: u32 = 0o170000;
/// Directory.
pub const S_IFDIR: u32 = 0o040000;
/// Regular file.
pub const S_IFREG: u32 = 0o100000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Named pipe.
pub const S_IFIFO: u32 = 0o010000;
/// Socket.
pub const S_IFSOCK: u32 = 0o140000;

/// Permission, setuid, setgid and sticky bits.
pub const PERM_MASK: u32 = 0o7777;
/// Write permission for owner, group and other.
pub const WRITE_BITS: u32 = 0o222;
/// Read permission for owner, group and other.
pub const READ_BITS: u32 = 0o444;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Derive the type from mode bits. Anything that is not a directory is a file.
    pub fn from_mode(mode: u32) -> Self {
        if mode & S_IFMT == S_IFDIR {
            FileType::Directory
        } else {
            FileType::File
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Attributes stored in a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Attr {
    /// Attributes with the given mode, owned by root, all times at the epoch.
    pub fn new(mode: u32) -> Self {
        Self {
            mode,
            uid: 0,
            gid: 0,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
        }
    }

    /// Set access, modify and change time to `now`.
    pub fn stamp(&mut self, now: SystemTime) {
        self.atime = now;
        self.mtime = now;
        self.ctime = now;
    }

    /// Copy into a protocol-facing record.
    pub fn to_file_attr(&self, ino: u64, size: u64) -> FileAttr {
        let kind = FileType::from_mode(self.mode);
        FileAttr {
            ino,
            size,
            kind,
            mode: self.mode,
            nlink: if kind.is_dir() { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }

    /// Apply the present fields of `req`, mirroring each into `resp`.
    ///
    /// `size` is left to the caller, which owns the backend. A new mode only
    /// replaces permission bits; the type bits stay with the node.
    pub fn merge(&mut self, req: &SetAttr, resp: &mut FileAttr) {
        if let Some(mode) = req.mode {
            self.mode = (self.mode & S_IFMT) | (mode & PERM_MASK);
            resp.mode = self.mode;
        }
        if let Some(uid) = req.uid {
            self.uid = uid;
            resp.uid = uid;
        }
        if let Some(gid) = req.gid {
            self.gid = gid;
            resp.gid = gid;
        }
        if let Some(atime) = req.atime {
            self.atime = atime;
            resp.atime = atime;
        }
        if let Some(mtime) = req.mtime {
            self.mtime = mtime;
            resp.mtime = mtime;
        }
    }
}

/// File attributes as reported to the protocol boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Stable node identity.
    pub ino: u64,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Type and permission bits.
    pub mode: u32,
    /// Number of hard links.
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileAttr {
    /// Permission bits only.
    pub fn perm(&self) -> u32 {
        self.mode & PERM_MASK
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Identity of the child, from its attribute query.
    pub ino: u64,
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(ino: u64, name: impl Into<String>, kind: FileType) -> Self {
        Self {
            ino,
            name: name.into(),
            kind,
        }
    }
}

/// Attributes to set (for setattr operation).
///
/// Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAttr {
    /// New size (truncate).
    pub size: Option<u64>,
    /// New permissions.
    pub mode: Option<u32>,
    /// New user ID.
    pub uid: Option<u32>,
    /// New group ID.
    pub gid: Option<u32>,
    /// New access time.
    pub atime: Option<SystemTime>,
    /// New modification time.
    pub mtime: Option<SystemTime>,
}

impl SetAttr {
    /// Create a new empty SetAttr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set permissions.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set owner and group.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Set the access time.
    pub fn with_atime(mut self, atime: SystemTime) -> Self {
        self.atime = Some(atime);
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }
}

/// Open file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Append mode.
    pub append: bool,
    /// Truncate on open.
    pub truncate: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            truncate: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Write-only access.
    pub fn write_only() -> Self {
        Self {
            read: false,
            write: true,
            ..Default::default()
        }
    }

    /// Read and write access.
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Decode raw `open(2)` flags as delivered by the kernel.
    pub fn from_raw(flags: i32) -> Self {
        let (read, write) = match flags & libc::O_ACCMODE {
            libc::O_WRONLY => (false, true),
            libc::O_RDWR => (true, true),
            _ => (true, false),
        };
        Self {
            read,
            write,
            append: flags & libc::O_APPEND != 0,
            truncate: flags & libc::O_TRUNC != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_file_type_from_mode() {
        assert!(FileType::from_mode(S_IFDIR | 0o755).is_dir());
        assert!(FileType::from_mode(S_IFREG | 0o644).is_file());
        assert!(FileType::from_mode(0o644).is_file());
    }

    #[test]
    fn test_to_file_attr() {
        let mut attr = Attr::new(S_IFREG | 0o644);
        attr.uid = 1000;
        attr.gid = 100;
        let now = UNIX_EPOCH + Duration::from_secs(42);
        attr.stamp(now);

        let fa = attr.to_file_attr(7, 12);
        assert_eq!(fa.ino, 7);
        assert_eq!(fa.size, 12);
        assert_eq!(fa.perm(), 0o644);
        assert_eq!(fa.uid, 1000);
        assert_eq!(fa.gid, 100);
        assert_eq!(fa.atime, now);
        assert_eq!(fa.mtime, now);
        assert_eq!(fa.ctime, now);
        assert_eq!(fa.nlink, 1);

        let dir = Attr::new(S_IFDIR | 0o755).to_file_attr(1, 0);
        assert!(dir.is_dir());
        assert_eq!(dir.nlink, 2);
    }

    #[test]
    fn test_merge_only_present_fields() {
        let mut attr = Attr::new(S_IFREG | 0o644);
        let mut resp = attr.to_file_attr(3, 0);
        let mtime = UNIX_EPOCH + Duration::from_secs(1000);

        attr.merge(&SetAttr::new().with_owner(5, 6).with_mtime(mtime), &mut resp);

        assert_eq!((attr.uid, attr.gid), (5, 6));
        assert_eq!((resp.uid, resp.gid), (5, 6));
        assert_eq!(attr.mtime, mtime);
        assert_eq!(resp.mtime, mtime);
        // untouched
        assert_eq!(attr.mode, S_IFREG | 0o644);
        assert_eq!(attr.atime, UNIX_EPOCH);
    }

    #[test]
    fn test_merge_mode_keeps_type_bits() {
        let mut attr = Attr::new(S_IFREG | 0o644);
        let mut resp = attr.to_file_attr(3, 0);
        attr.merge(&SetAttr::new().with_mode(S_IFDIR | 0o600), &mut resp);
        assert_eq!(attr.mode, S_IFREG | 0o600);
        assert_eq!(resp.mode, S_IFREG | 0o600);
    }

    #[test]
    fn test_setattr_builder() {
        let attr = SetAttr::new().with_size(2048).with_mode(0o600);
        assert_eq!(attr.size, Some(2048));
        assert_eq!(attr.mode, Some(0o600));
        assert!(attr.mtime.is_none());
    }

    #[test]
    fn test_open_flags_from_raw() {
        let flags = OpenFlags::from_raw(libc::O_WRONLY | libc::O_TRUNC);
        assert!(!flags.read);
        assert!(flags.write);
        assert!(flags.truncate);

        let flags = OpenFlags::from_raw(libc::O_RDWR | libc::O_APPEND);
        assert!(flags.read && flags.write && flags.append);

        assert_eq!(OpenFlags::from_raw(libc::O_RDONLY), OpenFlags::read());
    }
}

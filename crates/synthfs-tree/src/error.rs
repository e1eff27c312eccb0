//! Tree error types.

use std::io;
use thiserror::Error;

use crate::attr::DirEntry;

// EBADFD is Linux-specific; elsewhere the closest code is EBADF.
#[cfg(target_os = "linux")]
const EBADFD: i32 = libc::EBADFD;
#[cfg(not(target_os = "linux"))]
const EBADFD: i32 = libc::EBADF;

/// Tree error type.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A node name contains the path separator.
    #[error("base name {0:?} contains path separator")]
    BadName(String),

    /// A path element is missing.
    #[error("{op} {path}: no such file or directory")]
    NotFound { op: &'static str, path: String },

    /// A non-terminal path element is not a directory.
    #[error("{op} {path}: not a directory")]
    NotADirectory { op: &'static str, path: String },

    /// Operation rejected for this path (e.g. unbinding the root).
    #[error("{op} {path}: invalid argument")]
    InvalidArgument { op: &'static str, path: String },

    /// Malformed offset, length or configuration value.
    #[error("invalid argument: {0}")]
    InvalidInput(String),

    /// A write would grow the data past what can be allocated.
    #[error("file too large: {0} bytes")]
    FileTooLarge(i64),

    /// The backing device failed or is not ready.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(#[source] Box<TreeError>),

    /// No more bytes. Folded into a short read at the node boundary.
    #[error("end of data")]
    EndOfData,

    /// The session holds no cached copy of a node.
    #[error("node not cached")]
    NotCached,

    /// The node variant does not support the operation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// A child's attribute query failed part way through a listing.
    #[error("listing aborted after {} entries: {source}", .collected.len())]
    ListingAborted {
        collected: Vec<DirEntry>,
        #[source]
        source: Box<TreeError>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl TreeError {
    /// Create a NotFound error.
    pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            path: path.into(),
        }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotADirectory {
            op,
            path: path.into(),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(op: &'static str, path: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op,
            path: path.into(),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap a backend failure as a device fault.
    pub fn device(err: TreeError) -> Self {
        match err {
            e @ Self::DeviceUnavailable(_) => e,
            e => Self::DeviceUnavailable(Box::new(e)),
        }
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true if this error means a path element was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The errno a kernel protocol engine should put on the wire.
    pub fn errno(&self) -> i32 {
        match self {
            Self::BadName(_) | Self::InvalidArgument { .. } | Self::InvalidInput(_) => {
                libc::EINVAL
            }
            Self::NotFound { .. } => libc::ENOENT,
            Self::NotADirectory { .. } => libc::ENOTDIR,
            Self::FileTooLarge(_) => libc::EFBIG,
            Self::DeviceUnavailable(_) => EBADFD,
            Self::EndOfData | Self::NotCached => 0,
            Self::NotSupported(_) => libc::ENOSYS,
            Self::ListingAborted { source, .. } => source.errno(),
            Self::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            Self::Other(_) => libc::EIO,
        }
    }
}

/// Convert TreeError to std::io::Error for compatibility.
impl From<TreeError> for io::Error {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            TreeError::NotADirectory { .. } => {
                io::Error::new(io::ErrorKind::NotADirectory, e.to_string())
            }
            TreeError::BadName(_)
            | TreeError::InvalidArgument { .. }
            | TreeError::InvalidInput(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            TreeError::FileTooLarge(_) => {
                io::Error::new(io::ErrorKind::FileTooLarge, e.to_string())
            }
            TreeError::EndOfData => io::Error::new(io::ErrorKind::UnexpectedEof, "end of data"),
            TreeError::NotSupported(_) => io::Error::new(io::ErrorKind::Unsupported, e.to_string()),
            TreeError::Io(e) => e,
            e => io::Error::other(e.to_string()),
        }
    }
}

/// Tree result type.
pub type TreeResult<T> = Result<T, TreeError>;

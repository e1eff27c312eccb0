//! # synthfs-tree
//!
//! A mutable in-memory tree of directories and files that a kernel
//! filesystem protocol engine can serve, typically as a synthetic mirror of
//! a hardware control tree.
//!
//! Trees are composed from node builders and attached to a [`FileSystem`]:
//!
//! ```
//! use synthfs_tree::{Bytes, Dir, FileSystem, IntoNode, Node, RoFile, RwFile, Text};
//!
//! let fs = FileSystem::system(0o775).with([
//!     Dir::must("dev", 0o775)
//!         .with([
//!             RwFile::must("foo", 0o666, Bytes::new("with data already here")).into_node(),
//!             RoFile::must("version", 0o444, Text::new("1.0\n")).into_node(),
//!         ])
//!         .into_node(),
//! ]);
//! fs.sync();
//!
//! let foo = fs.lookup_path("/dev/foo").unwrap();
//! assert_eq!(foo.read(0, 9).unwrap(), b"with data");
//! ```
//!
//! Once served, the shape of the tree can change live with
//! [`FileSystem::bind`] and [`FileSystem::unbind`]. The protocol engine
//! drives the tree through [`FsOps`] or directly through the [`Node`]
//! contract.

pub mod attr;
pub mod backends;
pub mod config;
pub mod error;
pub mod fs;
pub mod node;
pub mod ops;
pub mod session;

pub use attr::{Attr, DirEntry, FileAttr, FileType, OpenFlags, SetAttr};
pub use backends::{Bytes, Device, Func, ReadOutcome, ReadWriter, Reader, Text, WriteFn, Writer};
pub use config::{ClockConfig, FsConfig};
pub use error::{TreeError, TreeResult};
pub use fs::{Clock, FileSystem, WalkMiss, clean_path};
pub use node::{Dir, IntoNode, Node, NodeRef, ROOT_INO, RoFile, RwFile, WoFile, invalidate};
pub use ops::FsOps;
pub use session::Session;

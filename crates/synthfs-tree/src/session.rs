//! The serving side of a mounted tree.
//!
//! A kernel protocol engine that serves a [`FileSystem`] registers itself
//! with [`FileSystem::serve`]. The tree only ever calls back into it to ask
//! for cached node data to be dropped.
//!
//! [`FileSystem`]: crate::FileSystem
//! [`FileSystem::serve`]: crate::FileSystem::serve

use crate::error::TreeResult;
use crate::node::Node;

/// An active protocol session.
pub trait Session: Send + Sync {
    /// Drop any kernel-side cache of `node`'s data.
    ///
    /// Return `Err(TreeError::NotCached)` when the kernel holds nothing for
    /// the node; the filesystem treats that as success.
    ///
    /// [`TreeError::NotCached`]: crate::TreeError::NotCached
    fn invalidate_node_data(&self, node: &dyn Node) -> TreeResult<()>;
}

//! Directory node.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Weak;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::trace;

use super::{IntoNode, Node, NodeRef, ROOT_INO, alloc_ino, check_name, now_of};
use crate::attr::{Attr, DirEntry, FileAttr, PERM_MASK, S_IFDIR};
use crate::error::{TreeError, TreeResult};
use crate::fs::FileSystem;

struct DirState {
    attr: Attr,
    fs: Weak<FileSystem>,
    children: BTreeMap<String, NodeRef>,
}

/// A directory: a named map of child nodes.
///
/// Children are keyed by their own name. Inserting a node whose name is
/// already present replaces the previous child.
pub struct Dir {
    name: String,
    ino: u64,
    state: Mutex<DirState>,
}

impl Dir {
    /// Create an empty directory.
    ///
    /// `"/"` is the only name allowed to contain the separator; a directory
    /// with that name takes the root identity.
    pub fn new(name: impl Into<String>, mode: u32) -> TreeResult<Self> {
        let name = name.into();
        if name == "/" {
            return Ok(Self::root(mode));
        }
        check_name(&name)?;
        Ok(Self::with_ino(name, alloc_ino(), mode))
    }

    /// The root directory, named `"/"`.
    pub(crate) fn root(mode: u32) -> Self {
        Self::with_ino("/".to_string(), ROOT_INO, mode)
    }

    fn with_ino(name: String, ino: u64, mode: u32) -> Self {
        Self {
            name,
            ino,
            state: Mutex::new(DirState {
                attr: Attr::new(S_IFDIR | (mode & PERM_MASK)),
                fs: Weak::new(),
                children: BTreeMap::new(),
            }),
        }
    }

    /// Like [`Dir::new`] but panics on a bad name.
    pub fn must(name: impl Into<String>, mode: u32) -> Self {
        match Self::new(name, mode) {
            Ok(d) => d,
            Err(e) => panic!("Dir::must: {e}"),
        }
    }

    /// Set the owner and group, stamping the modify time.
    pub fn own(mut self, uid: u32, gid: u32) -> Self {
        let state = self.state.get_mut();
        state.attr.uid = uid;
        state.attr.gid = gid;
        state.attr.mtime = now_of(&state.fs);
        self
    }

    /// Add children. Back-references are not touched; run
    /// [`FileSystem::sync`] once the tree is composed.
    pub fn with<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoNode,
    {
        let children = &mut self.state.get_mut().children;
        for node in nodes {
            let node = node.into_node();
            children.insert(node.name().to_string(), node);
        }
        self
    }

    /// Set the owner and group of a shared directory.
    pub fn set_owner(&self, uid: u32, gid: u32) {
        let mut state = self.state.lock();
        state.attr.uid = uid;
        state.attr.gid = gid;
        state.attr.mtime = now_of(&state.fs);
    }

    /// Insert `node` under its name, returning any child it replaced.
    pub fn insert(&self, node: NodeRef) -> Option<NodeRef> {
        let mut state = self.state.lock();
        state.children.insert(node.name().to_string(), node)
    }

    /// Remove and return the child called `name`.
    pub fn remove(&self, name: &str) -> Option<NodeRef> {
        self.state.lock().children.remove(name)
    }

    /// The child called `name`, without touching access time.
    pub fn get(&self, name: &str) -> Option<NodeRef> {
        self.state.lock().children.get(name).cloned()
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<NodeRef> {
        self.state.lock().children.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().children.is_empty()
    }

    /// Set the modify time. Used when the child set changes.
    pub fn touch(&self, now: SystemTime) {
        self.state.lock().attr.mtime = now;
    }
}

impl Node for Dir {
    fn name(&self) -> &str {
        &self.name
    }

    fn ino(&self) -> u64 {
        self.ino
    }

    fn sys(&self) -> Weak<FileSystem> {
        self.state.lock().fs.clone()
    }

    fn set_sys(&self, fs: Weak<FileSystem>, now: SystemTime) {
        let mut state = self.state.lock();
        state.fs = fs;
        state.attr.stamp(now);
    }

    fn getattr(&self) -> TreeResult<FileAttr> {
        Ok(self.state.lock().attr.to_file_attr(self.ino, 0))
    }

    fn as_dir(&self) -> Option<&Dir> {
        Some(self)
    }

    fn readdir(&self) -> TreeResult<Vec<DirEntry>> {
        let mut state = self.state.lock();

        let mut entries = Vec::with_capacity(state.children.len());
        for (name, child) in &state.children {
            match child.getattr() {
                Ok(attr) => entries.push(DirEntry::new(attr.ino, name.clone(), attr.kind)),
                Err(e) => {
                    return Err(TreeError::ListingAborted {
                        collected: entries,
                        source: Box::new(e),
                    });
                }
            }
        }

        state.attr.atime = now_of(&state.fs);
        trace!(dir = %self.name, entries = entries.len(), "readdir");
        Ok(entries)
    }

    fn lookup(&self, name: &str) -> TreeResult<NodeRef> {
        let mut state = self.state.lock();
        state.attr.atime = now_of(&state.fs);
        state
            .children
            .get(name)
            .cloned()
            .ok_or_else(|| TreeError::not_found("lookup", name))
    }
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.state.lock().children.keys().cloned().collect();
        f.debug_struct("Dir")
            .field("name", &self.name)
            .field("ino", &self.ino)
            .field("children", &names)
            .finish()
    }
}

//! The filesystem: root directory, clock, structural mutation and path
//! resolution.
//!
//! ## Structure and back-references
//!
//! Every node reachable from the root holds a weak reference to the
//! [`FileSystem`] that owns it. [`FileSystem::sync`] restores that property
//! after a tree has been composed with `with`. [`FileSystem::bind`] and
//! [`FileSystem::unbind`] maintain it as part of the same locked operation.
//!
//! Structural operations serialize on a filesystem-wide lock. Lookups, reads
//! and writes never take it; they only take the locks of the nodes they touch.

use std::fmt;
use std::path::{Component, Path};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::FsConfig;
use crate::error::{TreeError, TreeResult};
use crate::node::{Dir, IntoNode, Node, NodeRef, SEPARATOR};
use crate::session::Session;

/// Injected time source.
pub type Clock = Arc<dyn Fn() -> SystemTime + Send + Sync>;

/// A failed path walk.
///
/// When only the last element is missing, `parent` is the directory that
/// would have contained it.
#[derive(Debug)]
pub struct WalkMiss {
    pub parent: Option<NodeRef>,
    pub error: TreeError,
}

impl From<WalkMiss> for TreeError {
    fn from(miss: WalkMiss) -> Self {
        miss.error
    }
}

/// A virtual filesystem tree.
pub struct FileSystem {
    this: Weak<FileSystem>,
    structure: Mutex<()>,
    root: Arc<Dir>,
    session: RwLock<Option<Arc<dyn Session>>>,
    clock: Clock,
}

impl FileSystem {
    /// Create a filesystem with an empty root of the given mode.
    pub fn new<F>(mode: u32, clock: F) -> Arc<Self>
    where
        F: Fn() -> SystemTime + Send + Sync + 'static,
    {
        let clock: Clock = Arc::new(clock);
        Arc::new_cyclic(|this| {
            let root = Arc::new(Dir::root(mode));
            root.set_sys(this.clone(), clock());
            Self {
                this: this.clone(),
                structure: Mutex::new(()),
                root,
                session: RwLock::new(None),
                clock,
            }
        })
    }

    /// Create a filesystem on the system clock.
    pub fn system(mode: u32) -> Arc<Self> {
        Self::new(mode, SystemTime::now)
    }

    /// Create a filesystem from configuration.
    pub fn from_config(config: &FsConfig) -> Arc<Self> {
        let clock = config.clock.into_clock();
        let fs = Self::new(config.root_mode, move || clock());
        fs.root.set_owner(config.uid, config.gid);
        fs
    }

    /// Current time on the filesystem clock.
    pub fn now(&self) -> SystemTime {
        (self.clock)()
    }

    /// The root directory.
    pub fn root(&self) -> Arc<Dir> {
        Arc::clone(&self.root)
    }

    /// Add nodes to the root, replacing same-named children.
    ///
    /// Back-references are left alone; call [`FileSystem::sync`] once the
    /// tree is complete.
    pub fn with<I>(self: Arc<Self>, nodes: I) -> Arc<Self>
    where
        I: IntoIterator,
        I::Item: IntoNode,
    {
        for node in nodes {
            self.root.insert(node.into_node());
        }
        self
    }

    /// Point every reachable node at this filesystem.
    ///
    /// Only nodes whose back-reference is stale are rebound, so a second
    /// pass over a consistent tree changes nothing. Returns the number of
    /// nodes rebound.
    pub fn sync(&self) -> usize {
        let _structure = self.structure.lock();
        let now = self.now();
        let n = rebind(self.root.as_ref(), &self.this, now);
        debug!(rebound = n, "sync");
        n
    }

    /// Attach `node` to the directory at `dir`, replacing a same-named child.
    ///
    /// The attached subtree is synced before the structural lock is released.
    /// A replaced child is detached. A node still bound elsewhere, or a
    /// directory that contains `dir`, is rejected with `InvalidArgument`.
    pub fn bind(&self, dir: &str, node: impl IntoNode) -> TreeResult<()> {
        let node = node.into_node();
        let path = clean_path(dir);
        if node.name() == "/" {
            return Err(TreeError::BadName(node.name().to_string()));
        }

        let _structure = self.structure.lock();
        let target = self.walk_path("bind", &path)?;
        let Some(parent) = target.as_dir() else {
            return Err(TreeError::not_a_directory("bind", path));
        };

        let rebinding = parent
            .get(node.name())
            .is_some_and(|current| Arc::ptr_eq(&current, &node));
        if !rebinding && node.filesystem().is_some() {
            return Err(TreeError::invalid_argument("bind", path));
        }
        if reaches(&node, &target) {
            return Err(TreeError::invalid_argument("bind", path));
        }

        let now = self.now();
        if let Some(old) = parent.insert(Arc::clone(&node)) {
            if !Arc::ptr_eq(&old, &node) {
                rebind(old.as_ref(), &Weak::new(), UNIX_EPOCH);
            }
        }
        parent.touch(now);
        let n = rebind(node.as_ref(), &self.this, now);
        debug!(dir = %path, name = node.name(), rebound = n, "bind");
        Ok(())
    }

    /// Detach and return the node at `path`.
    ///
    /// The node and its subtree lose their back-reference and keep their
    /// children, ready to be bound elsewhere.
    pub fn unbind(&self, path: &str) -> TreeResult<NodeRef> {
        let path = clean_path(path);
        if path == "/" {
            return Err(TreeError::invalid_argument("unbind", path));
        }

        let _structure = self.structure.lock();
        let (dir, name) = split_path(&path);
        let target = self.walk_path("unbind", dir)?;
        let Some(parent) = target.as_dir() else {
            return Err(TreeError::not_a_directory("unbind", path.as_str()));
        };
        let node = parent
            .remove(name)
            .ok_or_else(|| TreeError::not_found("unbind", path.as_str()))?;

        parent.touch(self.now());
        let n = rebind(node.as_ref(), &Weak::new(), UNIX_EPOCH);
        debug!(path = %path, detached = n, "unbind");
        Ok(node)
    }

    /// Resolve `path` from the root.
    ///
    /// The root path resolves to the root. A missing or non-directory
    /// intermediate element fails with no parent; a missing final element
    /// fails with its containing directory in [`WalkMiss::parent`].
    pub fn walk_path(&self, op: &'static str, path: &str) -> Result<NodeRef, WalkMiss> {
        let path = clean_path(path);
        let elements = path_elements(&path);

        let mut node: NodeRef = self.root.clone();
        for (i, name) in elements.iter().enumerate() {
            let child = match node.as_dir() {
                Some(dir) => dir.get(name),
                None => {
                    return Err(WalkMiss {
                        parent: None,
                        error: TreeError::not_a_directory(op, path.as_str()),
                    });
                }
            };
            match child {
                Some(child) => node = child,
                None => {
                    let last = i + 1 == elements.len();
                    return Err(WalkMiss {
                        parent: last.then_some(node),
                        error: TreeError::not_found(op, path.as_str()),
                    });
                }
            }
        }
        Ok(node)
    }

    /// Resolve `path`, discarding the parent on a miss.
    pub fn lookup_path(&self, path: &str) -> TreeResult<NodeRef> {
        Ok(self.walk_path("lookup", path)?)
    }

    /// Ask the active session to drop its cache of `node`.
    ///
    /// Succeeds trivially when nothing is serving the tree, and when the
    /// session reports the node was not cached.
    pub fn invalidate(&self, node: &dyn Node) -> TreeResult<()> {
        let Some(session) = self.session() else {
            trace!(name = node.name(), "invalidate without session");
            return Ok(());
        };
        match session.invalidate_node_data(node) {
            Ok(()) | Err(TreeError::NotCached) => Ok(()),
            Err(e) => {
                warn!(name = node.name(), ino = node.ino(), error = %e, "invalidate failed");
                Err(e)
            }
        }
    }

    /// Ask the active session to drop its cache of the node at `path`.
    pub fn invalidate_path(&self, path: &str) -> TreeResult<()> {
        let node = self.walk_path("invalidate", path)?;
        self.invalidate(node.as_ref())
    }

    /// Record the session now serving this tree.
    pub fn serve(&self, session: Arc<dyn Session>) {
        *self.session.write() = Some(session);
        debug!("session attached");
    }

    /// Forget the serving session.
    pub fn session_ended(&self) {
        if self.session.write().take().is_some() {
            debug!("session ended");
        }
    }

    /// The session serving this tree, if any.
    pub fn session(&self) -> Option<Arc<dyn Session>> {
        self.session.read().clone()
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("root", &self.root)
            .field("serving", &self.session.read().is_some())
            .finish_non_exhaustive()
    }
}

/// Rebind `node` and its subtree to `fs` where the back-reference differs.
fn rebind(node: &dyn Node, fs: &Weak<FileSystem>, now: SystemTime) -> usize {
    let mut n = 0;
    if !node.sys().ptr_eq(fs) {
        node.set_sys(fs.clone(), now);
        n += 1;
    }
    if let Some(dir) = node.as_dir() {
        for child in dir.children() {
            n += rebind(child.as_ref(), fs, now);
        }
    }
    n
}

/// Whether `target` is `node` or lies in its subtree.
fn reaches(node: &NodeRef, target: &NodeRef) -> bool {
    if Arc::ptr_eq(node, target) {
        return true;
    }
    node.as_dir()
        .is_some_and(|dir| dir.children().iter().any(|child| reaches(child, target)))
}

/// Lexically clean `path` into rooted form.
///
/// `.` is dropped, `..` removes the preceding element and never climbs
/// above the root. The result always starts with the separator.
pub fn clean_path(path: &str) -> String {
    let mut elements: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(s) => elements.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                elements.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    let mut clean = String::with_capacity(path.len() + 1);
    for e in &elements {
        clean.push(SEPARATOR);
        clean.push_str(e);
    }
    if clean.is_empty() {
        clean.push(SEPARATOR);
    }
    clean
}

/// Elements of a cleaned path. The root has none.
pub fn path_elements(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|e| !e.is_empty()).collect()
}

/// Split a cleaned path into its directory and final element.
fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once(SEPARATOR) {
        Some(("", name)) => ("/", name),
        Some((dir, name)) => (dir, name),
        None => ("/", path),
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory directory tree
//!
//! Every node carries its own [`LockState`]; deleting a node drops its lock
//! slot together with any waiters still queued on it.

use std::collections::HashMap;

use dfs_api_contract::Path;

use crate::error::{NamingError, NamingResult};
use crate::lock::LockState;
use crate::registry::{HostSet, StorageNodeId};

#[derive(Debug)]
pub(crate) enum NodeKind {
    File {
        hosts: HostSet,
        /// Shared locks ever granted on this file
        access_count: u64,
        /// `access_count` when replication was last triggered
        replicated_at: u64,
        replicating: bool,
    },
    Directory {
        children: HashMap<String, Node>,
    },
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) lock: LockState,
}

impl Node {
    fn directory() -> Self {
        Self {
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
            lock: LockState::default(),
        }
    }

    fn file(hosts: HostSet) -> Self {
        Self {
            kind: NodeKind::File {
                hosts,
                access_count: 0,
                replicated_at: 0,
                replicating: false,
            },
            lock: LockState::default(),
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Every file at or below this node, with the hosts of each
    pub(crate) fn files(&self, path: &Path) -> Vec<(Path, HostSet)> {
        let mut out = Vec::new();
        self.collect_files(path, &mut out);
        out
    }

    fn collect_files(&self, path: &Path, out: &mut Vec<(Path, HostSet)>) {
        match &self.kind {
            NodeKind::File { hosts, .. } => out.push((path.clone(), hosts.clone())),
            NodeKind::Directory { children } => {
                for (name, child) in children {
                    if let Ok(child_path) = path.join(name) {
                        child.collect_files(&child_path, out);
                    }
                }
            }
        }
    }
}

/// The namespace: a directory root with files and directories below it
#[derive(Debug)]
pub struct DirectoryTree {
    root: Node,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self {
            root: Node::directory(),
        }
    }

    pub(crate) fn node(&self, path: &Path) -> NamingResult<&Node> {
        let mut current = &self.root;
        for name in path.components() {
            current = match &current.kind {
                NodeKind::Directory { children } => {
                    children.get(name).ok_or_else(|| NamingError::not_found(path))?
                }
                NodeKind::File { .. } => return Err(NamingError::not_found(path)),
            };
        }
        Ok(current)
    }

    pub(crate) fn node_mut(&mut self, path: &Path) -> NamingResult<&mut Node> {
        let mut current = &mut self.root;
        for name in path.components() {
            current = match &mut current.kind {
                NodeKind::Directory { children } => children
                    .get_mut(name)
                    .ok_or_else(|| NamingError::not_found(path))?,
                NodeKind::File { .. } => return Err(NamingError::not_found(path)),
            };
        }
        Ok(current)
    }

    pub(crate) fn lock_state_mut(&mut self, path: &Path) -> NamingResult<&mut LockState> {
        Ok(&mut self.node_mut(path)?.lock)
    }

    /// Children map of the directory at `dirs`, creating missing directories.
    ///
    /// Only an existing file along the way fails, and since every component
    /// before it already existed nothing is created in that case.
    fn ensure_directories(
        &mut self,
        dirs: &[String],
        full: &Path,
    ) -> NamingResult<&mut HashMap<String, Node>> {
        let mut current = &mut self.root;
        for name in dirs {
            current = match &mut current.kind {
                NodeKind::Directory { children } => {
                    children.entry(name.clone()).or_insert_with(Node::directory)
                }
                NodeKind::File { .. } => return Err(NamingError::not_found(full)),
            };
        }
        match &mut current.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(NamingError::not_found(full)),
        }
    }

    fn split_leaf(path: &Path) -> NamingResult<(&[String], &String)> {
        path.components()
            .split_last()
            .map(|(leaf, dirs)| (dirs, leaf))
            .ok_or_else(|| NamingError::InvalidArgument("the root directory is fixed".into()))
    }

    /// Create a file hosted by `hosts`, along with missing parent directories.
    ///
    /// Returns `false` if anything already exists at `path`.
    pub fn insert_file(&mut self, path: &Path, hosts: HostSet) -> NamingResult<bool> {
        let (dirs, leaf) = Self::split_leaf(path)?;
        let children = self.ensure_directories(dirs, path)?;
        if children.contains_key(leaf) {
            return Ok(false);
        }
        children.insert(leaf.clone(), Node::file(hosts));
        Ok(true)
    }

    /// Create a directory and its missing parents; `false` if `path` exists.
    pub fn insert_directory(&mut self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let (dirs, leaf) = Self::split_leaf(path)?;
        let children = self.ensure_directories(dirs, path)?;
        if children.contains_key(leaf) {
            return Ok(false);
        }
        children.insert(leaf.clone(), Node::directory());
        Ok(true)
    }

    /// Detach the subtree at `path`
    pub(crate) fn remove(&mut self, path: &Path) -> NamingResult<Node> {
        let (_, leaf) = Self::split_leaf(path)?;
        let parent = path.parent()?;
        match &mut self.node_mut(&parent)?.kind {
            NodeKind::Directory { children } => {
                children.remove(leaf).ok_or_else(|| NamingError::not_found(path))
            }
            NodeKind::File { .. } => Err(NamingError::not_found(path)),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.node(path).is_ok()
    }

    pub fn is_directory(&self, path: &Path) -> NamingResult<bool> {
        Ok(self.node(path)?.is_directory())
    }

    /// Sorted child names of a directory
    pub fn list(&self, path: &Path) -> NamingResult<Vec<String>> {
        match &self.node(path)?.kind {
            NodeKind::Directory { children } => {
                let mut names: Vec<String> = children.keys().cloned().collect();
                names.sort();
                Ok(names)
            }
            NodeKind::File { .. } => Err(NamingError::FileNotFound(format!(
                "{} is not a directory",
                path
            ))),
        }
    }

    fn file_mut(&mut self, path: &Path) -> NamingResult<&mut NodeKind> {
        let node = self.node_mut(path)?;
        if node.is_directory() {
            return Err(NamingError::FileNotFound(format!("{} is not a file", path)));
        }
        Ok(&mut node.kind)
    }

    pub fn hosting_set(&self, path: &Path) -> NamingResult<HostSet> {
        match &self.node(path)?.kind {
            NodeKind::File { hosts, .. } => Ok(hosts.clone()),
            NodeKind::Directory { .. } => {
                Err(NamingError::FileNotFound(format!("{} is not a file", path)))
            }
        }
    }

    /// Add a replica host; `false` if it was already hosting the file.
    pub fn add_host(&mut self, path: &Path, host: StorageNodeId) -> NamingResult<bool> {
        match self.file_mut(path)? {
            NodeKind::File { hosts, .. } => Ok(hosts.insert(host)),
            NodeKind::Directory { .. } => Ok(false),
        }
    }

    pub fn replace_hosts(&mut self, path: &Path, replacement: HostSet) -> NamingResult<()> {
        if let NodeKind::File { hosts, .. } = self.file_mut(path)? {
            *hosts = replacement;
        }
        Ok(())
    }

    /// Count a shared access to a file.
    ///
    /// Returns `true` when `threshold` accesses have accumulated since the
    /// last replication and none is in flight; the caller then owns the
    /// replication and must call [`Self::finish_replication`]. Directories
    /// are not counted.
    pub fn record_shared_access(&mut self, path: &Path, threshold: u64) -> bool {
        let Ok(node) = self.node_mut(path) else {
            return false;
        };
        match &mut node.kind {
            NodeKind::File {
                access_count,
                replicated_at,
                replicating,
                ..
            } => {
                *access_count += 1;
                if *replicating || *access_count - *replicated_at < threshold {
                    return false;
                }
                *replicated_at = *access_count;
                *replicating = true;
                true
            }
            NodeKind::Directory { .. } => false,
        }
    }

    pub fn finish_replication(&mut self, path: &Path) {
        if let Ok(NodeKind::File { replicating, .. }) = self.file_mut(path) {
            *replicating = false;
        }
    }

    pub fn access_count(&self, path: &Path) -> NamingResult<u64> {
        match &self.node(path)?.kind {
            NodeKind::File { access_count, .. } => Ok(*access_count),
            NodeKind::Directory { .. } => Ok(0),
        }
    }

    /// Directory under which `path` would be created.
    ///
    /// That is the deepest existing ancestor. `None` means `path` already
    /// exists. An ancestor that is a file is `FileNotFound`.
    pub fn creation_anchor(&self, path: &Path) -> NamingResult<Option<Path>> {
        let mut current = &self.root;
        let mut anchor = Path::root();
        for name in path.components() {
            let NodeKind::Directory { children } = &current.kind else {
                return Err(NamingError::FileNotFound(format!(
                    "{} is not a directory",
                    anchor
                )));
            };
            match children.get(name) {
                Some(child) => {
                    current = child;
                    anchor = anchor.join(name)?;
                }
                None => return Ok(Some(anchor)),
            }
        }
        Ok(None)
    }
}

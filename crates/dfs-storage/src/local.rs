// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Files under the node's local root directory
//!
//! A logical path `/a/b` lives at `<root>/a/b`. The root itself is never a
//! file and can be neither created nor deleted.

use std::io::SeekFrom;
use std::path::PathBuf;

use dfs_api_contract::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn local_path(&self, path: &Path) -> PathBuf {
        path.to_local(&self.root)
    }

    /// Length of a regular file
    async fn file_len(&self, path: &Path) -> StorageResult<u64> {
        let not_found = || StorageError::FileNotFound(format!("{} is not a file", path));
        if path.is_root() {
            return Err(not_found());
        }
        match fs::metadata(self.local_path(path)).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(not_found()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn size(&self, path: &Path) -> StorageResult<u64> {
        self.file_len(path).await
    }

    pub async fn is_file(&self, path: &Path) -> bool {
        self.file_len(path).await.is_ok()
    }

    /// Read `length` bytes at `offset`; the range must lie inside the file.
    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> StorageResult<Vec<u8>> {
        if offset < 0 || length < 0 {
            return Err(StorageError::IndexOutOfBounds(format!(
                "negative offset or length ({offset}, {length})"
            )));
        }
        let size = self.file_len(path).await?;
        let (offset, length) = (offset as u64, length as u64);
        let end = offset.checked_add(length).unwrap_or(u64::MAX);
        if end > size {
            return Err(StorageError::IndexOutOfBounds(format!(
                "range {offset}..{end} exceeds {path} of {size} bytes"
            )));
        }

        let mut file = fs::File::open(self.local_path(path)).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Write `data` at `offset`, extending the file as needed.
    ///
    /// A write at offset 0 that is shorter than the file replaces its
    /// content: the file is truncated to `data.len()`.
    pub async fn write(&self, path: &Path, offset: i64, data: &[u8]) -> StorageResult<()> {
        if offset < 0 {
            return Err(StorageError::IndexOutOfBounds(format!(
                "negative offset {offset}"
            )));
        }
        let size = self.file_len(path).await?;
        let offset = offset as u64;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(self.local_path(path))
            .await?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        file.flush().await?;
        if offset == 0 && (data.len() as u64) < size {
            file.set_len(data.len() as u64).await?;
        }
        Ok(())
    }

    /// Create an empty file and any missing parent directories.
    ///
    /// `false` for the root or when something already exists at `path`.
    pub async fn create(&self, path: &Path) -> StorageResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let local = self.local_path(path);
        if fs::try_exists(&local).await? {
            return Ok(false);
        }
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).await?;
        }
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&local)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a file or a whole directory tree; `false` if nothing was there.
    pub async fn delete(&self, path: &Path) -> StorageResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let local = self.local_path(path);
        let meta = match fs::symlink_metadata(&local).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        if meta.is_dir() {
            fs::remove_dir_all(&local).await?;
        } else {
            fs::remove_file(&local).await?;
        }
        Ok(true)
    }

    /// Every regular file under the root, sorted
    pub async fn list_files(&self) -> StorageResult<Vec<Path>> {
        let mut files = Vec::new();
        let mut pending = vec![Path::root()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(self.local_path(&dir)).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    warn!(entry = ?entry.path(), "skipping non UTF-8 file name");
                    continue;
                };
                let Ok(child) = dir
                    .join(&name)
                    .and_then(|child| Path::parse(&child.to_string()))
                else {
                    warn!(entry = ?entry.path(), "skipping file name that is not a valid path");
                    continue;
                };
                let kind = entry.file_type().await?;
                if kind.is_dir() {
                    pending.push(child);
                } else if kind.is_file() {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Remove every empty directory below the root, deepest first
    pub async fn prune_empty_directories(&self) -> StorageResult<usize> {
        let mut dirs = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    pending.push(entry.path());
                    dirs.push(entry.path());
                }
            }
        }

        // Children always sort after their parents
        dirs.sort();
        let mut removed = 0;
        for dir in dirs.iter().rev() {
            if is_empty_dir(dir).await? {
                fs::remove_dir(dir).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned empty directories");
        }
        Ok(removed)
    }

    /// Remove empty directories from the parent of `path` upward, stopping
    /// at the first non-empty one or the root.
    pub async fn prune_empty_parents(&self, path: &Path) -> StorageResult<()> {
        let mut current = path.clone();
        while let Ok(parent) = current.parent() {
            if parent.is_root() {
                break;
            }
            let local = self.local_path(&parent);
            if fs::try_exists(&local).await? {
                if !is_empty_dir(&local).await? {
                    break;
                }
                fs::remove_dir(&local).await?;
            }
            current = parent;
        }
        Ok(())
    }
}

async fn is_empty_dir(dir: &std::path::Path) -> StorageResult<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

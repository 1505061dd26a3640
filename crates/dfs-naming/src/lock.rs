// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Hierarchical shared/exclusive locks
//!
//! Each tree node owns a [`LockState`]: the current holders plus a FIFO of
//! waiters. A request is granted on arrival only when nobody is queued and
//! the mode is compatible with the holders, so a queued exclusive request is
//! never overtaken by later shared ones.
//!
//! Locking a path first takes short-lived shared locks on every strict
//! ancestor, root first, then locks the path itself and lets the ancestor
//! locks go. Because every request walks the same root-to-leaf order, two
//! requests never wait on each other in opposite directions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dfs_api_contract::Path;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{NamingError, NamingResult};
use crate::tree::DirectoryTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn from_exclusive(exclusive: bool) -> Self {
        if exclusive {
            LockMode::Exclusive
        } else {
            LockMode::Shared
        }
    }
}

/// Who currently holds a node's lock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Holders {
    #[default]
    Free,
    Shared(usize),
    Exclusive,
}

#[derive(Debug)]
struct Waiter {
    mode: LockMode,
    grant: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
pub struct LockState {
    holders: Holders,
    queue: VecDeque<Waiter>,
}

impl LockState {
    pub fn holders(&self) -> Holders {
        self.holders
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn admits(&self, mode: LockMode) -> bool {
        matches!(
            (self.holders, mode),
            (Holders::Free, _) | (Holders::Shared(_), LockMode::Shared)
        )
    }

    fn grant(&mut self, mode: LockMode) {
        self.holders = match (self.holders, mode) {
            (Holders::Shared(n), LockMode::Shared) => Holders::Shared(n + 1),
            (_, LockMode::Shared) => Holders::Shared(1),
            (_, LockMode::Exclusive) => Holders::Exclusive,
        };
    }

    /// Undo one grant of `mode`; `false` if no such grant is held.
    fn revoke(&mut self, mode: LockMode) -> bool {
        self.holders = match (self.holders, mode) {
            (Holders::Exclusive, LockMode::Exclusive) | (Holders::Shared(1), LockMode::Shared) => {
                Holders::Free
            }
            (Holders::Shared(n), LockMode::Shared) if n > 1 => Holders::Shared(n - 1),
            _ => return false,
        };
        true
    }

    pub(crate) fn try_acquire(&mut self, mode: LockMode) -> bool {
        self.drop_abandoned();
        if self.queue.is_empty() && self.admits(mode) {
            self.grant(mode);
            true
        } else {
            false
        }
    }

    pub(crate) fn enqueue(&mut self, mode: LockMode) -> oneshot::Receiver<()> {
        let (grant, receiver) = oneshot::channel();
        self.queue.push_back(Waiter { mode, grant });
        receiver
    }

    /// Release one grant of `mode` and hand the lock to the next waiters.
    pub(crate) fn release(&mut self, mode: LockMode) -> bool {
        if !self.revoke(mode) {
            return false;
        }
        self.wake();
        true
    }

    /// Forget waiters that stopped waiting, then wake whoever is now at the front.
    pub(crate) fn drop_abandoned(&mut self) {
        self.queue.retain(|waiter| !waiter.grant.is_closed());
        self.wake();
    }

    /// Grant from the front of the queue for as long as the front is
    /// compatible: one exclusive waiter, or a run of shared ones.
    fn wake(&mut self) {
        while self.queue.front().is_some_and(|w| self.admits(w.mode)) {
            let Some(waiter) = self.queue.pop_front() else {
                break;
            };
            self.grant(waiter.mode);
            if waiter.grant.send(()).is_err() {
                self.revoke(waiter.mode);
            }
        }
    }
}

/// Lock operations over the nodes of a shared [`DirectoryTree`]
#[derive(Clone)]
pub struct LockManager {
    tree: Arc<Mutex<DirectoryTree>>,
}

impl LockManager {
    pub fn new(tree: Arc<Mutex<DirectoryTree>>) -> Self {
        Self { tree }
    }

    fn tree(&self) -> MutexGuard<'_, DirectoryTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock `path` in `mode`, waiting behind earlier requests.
    ///
    /// Fails with `FileNotFound` if `path` or an ancestor does not exist, or
    /// is deleted while this request waits. The lock stays held until
    /// [`Self::release`].
    pub async fn acquire(&self, path: &Path, mode: LockMode) -> NamingResult<()> {
        let mut traversal = LockChain::default();
        for ancestor in path.ancestors_inclusive() {
            if &ancestor == path {
                break;
            }
            self.acquire_node(&ancestor, LockMode::Shared).await?;
            traversal.push(HeldLock::new(self.clone(), ancestor, LockMode::Shared));
        }
        self.acquire_node(path, mode).await
    }

    /// Like [`Self::acquire`], returning a guard that releases on drop
    pub async fn acquire_guard(&self, path: &Path, mode: LockMode) -> NamingResult<HeldLock> {
        self.acquire(path, mode).await?;
        Ok(HeldLock::new(self.clone(), path.clone(), mode))
    }

    /// Release a lock previously granted in `mode`.
    ///
    /// `InvalidArgument` if `path` is not currently locked in that mode.
    pub fn release(&self, path: &Path, mode: LockMode) -> NamingResult<()> {
        let mut tree = self.tree();
        let released = tree
            .lock_state_mut(path)
            .map(|state| state.release(mode))
            .unwrap_or(false);
        if released {
            Ok(())
        } else {
            Err(NamingError::InvalidArgument(format!(
                "{} is not locked {}",
                path,
                match mode {
                    LockMode::Shared => "shared",
                    LockMode::Exclusive => "exclusively",
                }
            )))
        }
    }

    /// Holders of the lock on `path`, for inspection
    pub fn holders(&self, path: &Path) -> NamingResult<Holders> {
        Ok(self.tree().node(path)?.lock.holders())
    }

    async fn acquire_node(&self, path: &Path, mode: LockMode) -> NamingResult<()> {
        let receiver = {
            let mut tree = self.tree();
            let state = tree.lock_state_mut(path)?;
            if state.try_acquire(mode) {
                return Ok(());
            }
            state.enqueue(mode)
        };
        debug!(%path, ?mode, "waiting for lock");

        let mut pending = PendingGrant {
            manager: self,
            path,
            mode,
            receiver,
            settled: false,
        };
        pending.wait().await
    }
}

/// A queued request; if dropped before it resolves (the caller went away)
/// it gives back any grant that raced in and clears its queue slot.
struct PendingGrant<'a> {
    manager: &'a LockManager,
    path: &'a Path,
    mode: LockMode,
    receiver: oneshot::Receiver<()>,
    settled: bool,
}

impl PendingGrant<'_> {
    async fn wait(&mut self) -> NamingResult<()> {
        let result = (&mut self.receiver).await;
        self.settled = true;
        result.map_err(|_| {
            NamingError::FileNotFound(format!("{} was deleted while waiting for a lock", self.path))
        })
    }
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.receiver.close();
        let granted = self.receiver.try_recv().is_ok();
        let mut tree = self.manager.tree();
        if let Ok(state) = tree.lock_state_mut(self.path) {
            if granted {
                state.release(self.mode);
            } else {
                state.drop_abandoned();
            }
        }
    }
}

/// A granted lock released when dropped
pub struct HeldLock {
    manager: LockManager,
    path: Path,
    mode: LockMode,
    armed: bool,
}

impl HeldLock {
    fn new(manager: LockManager, path: Path, mode: LockMode) -> Self {
        Self {
            manager,
            path,
            mode,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Drop without releasing; for locks whose node was removed.
    pub fn forget(mut self) {
        self.armed = false;
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.manager.release(&self.path, self.mode) {
            debug!(path = %self.path, error = %err, "lock vanished before release");
        }
    }
}

/// Ancestor locks, released innermost first
#[derive(Default)]
struct LockChain {
    locks: Vec<HeldLock>,
}

impl LockChain {
    fn push(&mut self, lock: HeldLock) {
        self.locks.push(lock);
    }
}

impl Drop for LockChain {
    fn drop(&mut self) {
        while let Some(lock) = self.locks.pop() {
            drop(lock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HostSet;
    use std::time::Duration;
    use tokio::time::timeout;

    fn p(raw: &str) -> Path {
        Path::parse(raw).unwrap()
    }

    fn manager_with(paths: &[&str]) -> (LockManager, Arc<Mutex<DirectoryTree>>) {
        let mut tree = DirectoryTree::new();
        for raw in paths {
            tree.insert_file(&p(raw), HostSet::new()).unwrap();
        }
        let tree = Arc::new(Mutex::new(tree));
        (LockManager::new(tree.clone()), tree)
    }

    async fn blocked<F: std::future::Future>(future: F) -> bool {
        timeout(Duration::from_millis(100), future).await.is_err()
    }

    #[test]
    fn state_machine_grants_and_revokes() {
        let mut state = LockState::default();
        assert!(state.try_acquire(LockMode::Shared));
        assert!(state.try_acquire(LockMode::Shared));
        assert_eq!(state.holders(), Holders::Shared(2));
        assert!(!state.try_acquire(LockMode::Exclusive));

        assert!(state.release(LockMode::Shared));
        assert!(state.release(LockMode::Shared));
        assert_eq!(state.holders(), Holders::Free);
        assert!(!state.release(LockMode::Shared));

        assert!(state.try_acquire(LockMode::Exclusive));
        assert!(!state.release(LockMode::Shared));
        assert!(state.release(LockMode::Exclusive));
    }

    #[test]
    fn queued_exclusive_blocks_later_shared() {
        let mut state = LockState::default();
        assert!(state.try_acquire(LockMode::Shared));
        let mut exclusive = state.enqueue(LockMode::Exclusive);

        // Compatible with the holder, but an exclusive request is queued
        assert!(!state.try_acquire(LockMode::Shared));
        let mut shared = state.enqueue(LockMode::Shared);

        state.release(LockMode::Shared);
        assert!(exclusive.try_recv().is_ok());
        assert!(shared.try_recv().is_err());
        assert_eq!(state.holders(), Holders::Exclusive);

        state.release(LockMode::Exclusive);
        assert!(shared.try_recv().is_ok());
        assert_eq!(state.holders(), Holders::Shared(1));
    }

    #[test]
    fn consecutive_shared_waiters_wake_together() {
        let mut state = LockState::default();
        assert!(state.try_acquire(LockMode::Exclusive));
        let mut a = state.enqueue(LockMode::Shared);
        let mut b = state.enqueue(LockMode::Shared);
        let mut c = state.enqueue(LockMode::Exclusive);

        state.release(LockMode::Exclusive);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
        assert!(c.try_recv().is_err());
        assert_eq!(state.holders(), Holders::Shared(2));
        assert_eq!(state.queued(), 1);
    }

    #[test]
    fn abandoned_waiters_are_skipped() {
        let mut state = LockState::default();
        assert!(state.try_acquire(LockMode::Shared));
        let gone = state.enqueue(LockMode::Exclusive);
        drop(gone);

        // The dead exclusive waiter must not hold back a new shared request
        assert!(state.try_acquire(LockMode::Shared));
        assert_eq!(state.queued(), 0);
    }

    #[tokio::test]
    async fn exclusive_waits_for_shared_holders() {
        let (locks, _tree) = manager_with(&["/f"]);
        let f = p("/f");

        locks.acquire(&f, LockMode::Shared).await.unwrap();
        assert!(blocked(locks.acquire(&f, LockMode::Exclusive)).await);

        let waiter = {
            let locks = locks.clone();
            let f = f.clone();
            tokio::spawn(async move { locks.acquire(&f, LockMode::Exclusive).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        locks.release(&f, LockMode::Shared).unwrap();
        timeout(Duration::from_secs(2), waiter).await.unwrap().unwrap().unwrap();
        assert_eq!(locks.holders(&f).unwrap(), Holders::Exclusive);
    }

    #[tokio::test]
    async fn ancestor_locks_are_released_after_acquisition() {
        let (locks, _tree) = manager_with(&["/a/b/c"]);
        locks.acquire(&p("/a/b/c"), LockMode::Exclusive).await.unwrap();

        assert_eq!(locks.holders(&Path::root()).unwrap(), Holders::Free);
        assert_eq!(locks.holders(&p("/a")).unwrap(), Holders::Free);
        assert_eq!(locks.holders(&p("/a/b")).unwrap(), Holders::Free);
        assert_eq!(locks.holders(&p("/a/b/c")).unwrap(), Holders::Exclusive);
    }

    #[tokio::test]
    async fn exclusive_ancestor_blocks_descendants() {
        let (locks, _tree) = manager_with(&["/a/b"]);
        locks.acquire(&p("/a"), LockMode::Exclusive).await.unwrap();

        assert!(blocked(locks.acquire(&p("/a/b"), LockMode::Shared)).await);

        // The timed-out attempt left nothing behind
        locks.release(&p("/a"), LockMode::Exclusive).unwrap();
        assert_eq!(locks.holders(&Path::root()).unwrap(), Holders::Free);
        locks.acquire(&p("/a/b"), LockMode::Shared).await.unwrap();
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let (locks, _tree) = manager_with(&["/f"]);
        let err = locks.acquire(&p("/g"), LockMode::Shared).await.unwrap_err();
        assert!(matches!(err, NamingError::FileNotFound(_)));
        assert_eq!(locks.holders(&Path::root()).unwrap(), Holders::Free);
    }

    #[tokio::test]
    async fn waiters_fail_when_node_is_deleted() {
        let (locks, tree) = manager_with(&["/f"]);
        let f = p("/f");
        locks.acquire(&f, LockMode::Exclusive).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            let f = f.clone();
            tokio::spawn(async move { locks.acquire(&f, LockMode::Shared).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        tree.lock().unwrap().remove(&f).unwrap();
        let result = timeout(Duration::from_secs(2), waiter).await.unwrap().unwrap();
        assert!(matches!(result, Err(NamingError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn releasing_an_unheld_lock_is_invalid() {
        let (locks, _tree) = manager_with(&["/f"]);
        assert!(matches!(
            locks.release(&p("/f"), LockMode::Shared),
            Err(NamingError::InvalidArgument(_))
        ));
        assert!(matches!(
            locks.release(&p("/missing"), LockMode::Exclusive),
            Err(NamingError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn guards_release_on_drop() {
        let (locks, _tree) = manager_with(&["/f"]);
        let guard = locks.acquire_guard(&p("/f"), LockMode::Exclusive).await.unwrap();
        assert_eq!(guard.mode(), LockMode::Exclusive);
        drop(guard);
        assert_eq!(locks.holders(&p("/f")).unwrap(), Holders::Free);
    }
}

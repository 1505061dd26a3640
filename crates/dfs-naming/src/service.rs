// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Naming operations over the tree, lock manager and registry

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dfs_api_contract::{Path, RegisterRequest, ServerInfo};
use tracing::{debug, info, warn};

use crate::commands::StorageCommands;
use crate::error::{NamingError, NamingResult};
use crate::lock::{HeldLock, LockManager, LockMode};
use crate::registry::{HostSet, StorageNodeId, StorageRegistry};
use crate::tree::DirectoryTree;

pub const DEFAULT_REPLICATION_THRESHOLD: u64 = 20;

pub struct NamingService {
    tree: Arc<Mutex<DirectoryTree>>,
    locks: LockManager,
    registry: StorageRegistry,
    commands: Arc<dyn StorageCommands>,
    replication_threshold: u64,
    registration: tokio::sync::Mutex<()>,
}

impl NamingService {
    pub fn new(commands: Arc<dyn StorageCommands>, replication_threshold: u64) -> Self {
        let tree = Arc::new(Mutex::new(DirectoryTree::new()));
        Self {
            locks: LockManager::new(tree.clone()),
            tree,
            registry: StorageRegistry::new(),
            commands,
            replication_threshold: replication_threshold.max(1),
            registration: tokio::sync::Mutex::new(()),
        }
    }

    fn tree(&self) -> MutexGuard<'_, DirectoryTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn is_valid_path(&self, raw: &str) -> bool {
        Path::is_valid(raw)
    }

    pub fn is_directory(&self, path: &Path) -> NamingResult<bool> {
        self.tree().is_directory(path)
    }

    pub fn list(&self, path: &Path) -> NamingResult<Vec<String>> {
        self.tree().list(path)
    }

    pub fn hosting_set(&self, path: &Path) -> NamingResult<HostSet> {
        self.tree().hosting_set(path)
    }

    /// Client address of a node holding the file
    pub fn get_storage(&self, path: &Path) -> NamingResult<ServerInfo> {
        let hosts = self.tree().hosting_set(path)?;
        hosts
            .iter()
            .next()
            .map(StorageNodeId::client_info)
            .ok_or_else(|| NamingError::FileNotFound(format!("{} has no storage node", path)))
    }

    /// Register a storage node and its files.
    ///
    /// Returns the reported paths the node must delete because the namespace
    /// already has something at (or blocking) them.
    pub async fn register(&self, request: &RegisterRequest) -> NamingResult<Vec<String>> {
        let _serial = self.registration.lock().await;
        let id = StorageNodeId::from(request);
        self.registry.add(id.clone())?;

        let mut duplicates = Vec::new();
        for raw in &request.files {
            let path = match Path::parse(raw) {
                Ok(path) if !path.is_root() => path,
                _ => {
                    warn!(node = %id, path = %raw, "ignoring unusable path in registration");
                    continue;
                }
            };
            match self.adopt_reported_file(&id, &path).await {
                Ok(true) => self.registry.note_hosting(&id, &path),
                Ok(false) | Err(_) => duplicates.push(path.to_string()),
            }
        }

        info!(
            node = %id,
            files = request.files.len(),
            duplicates = duplicates.len(),
            "storage node registered"
        );
        Ok(duplicates)
    }

    /// Record a file a node reported at registration; `false` if the
    /// namespace already has something at (or blocking) `path`.
    async fn adopt_reported_file(&self, id: &StorageNodeId, path: &Path) -> NamingResult<bool> {
        let Some(anchor) = self.lock_creation_anchor(path).await? else {
            return Ok(false);
        };
        let mut tree = self.tree();
        if !tree.contains(anchor.path()) {
            return Ok(false);
        }
        tree.insert_file(path, HostSet::from([id.clone()]))
    }

    /// Lock `path`, then apply the replication policy for files.
    ///
    /// A shared grant counts as a read access and may add a replica; an
    /// exclusive grant shrinks the hosts to one before the writer proceeds.
    pub async fn lock(&self, path: &Path, exclusive: bool) -> NamingResult<()> {
        self.tree().is_directory(path)?;
        let mode = LockMode::from_exclusive(exclusive);
        // Released again if the caller goes away before the policy step ends
        let grant = self.locks.acquire_guard(path, mode).await?;
        debug!(%path, ?mode, "lock granted");

        let is_file = matches!(self.tree().is_directory(path), Ok(false));
        if is_file {
            match mode {
                LockMode::Shared => {
                    let due = self
                        .tree()
                        .record_shared_access(path, self.replication_threshold);
                    if due {
                        self.replicate(path).await;
                    }
                }
                LockMode::Exclusive => self.invalidate_replicas(path).await,
            }
        }
        // Held until Unlock
        grant.forget();
        Ok(())
    }

    pub fn unlock(&self, path: &Path, exclusive: bool) -> NamingResult<()> {
        self.locks.release(path, LockMode::from_exclusive(exclusive))
    }

    async fn replicate(&self, path: &Path) {
        let _mark = ReplicationMark {
            service: self,
            path,
        };
        let outcome = self.add_replica(path).await;
        match outcome {
            Ok(Some(node)) => info!(%path, %node, "replicated file"),
            Ok(None) => debug!(%path, "no storage node available for another replica"),
            Err(err) => warn!(%path, error = %err, "replication failed"),
        }
    }

    async fn add_replica(&self, path: &Path) -> NamingResult<Option<StorageNodeId>> {
        let hosts = self.tree().hosting_set(path)?;
        let Some(source) = hosts.iter().next().cloned() else {
            return Ok(None);
        };
        let target = match self.registry.select_node(&hosts) {
            Ok(target) => target,
            Err(NamingError::IllegalState(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        if !self.commands.copy(&target, path, &source).await? {
            return Err(NamingError::IoFailure(format!(
                "{} refused to copy {}",
                target, path
            )));
        }
        self.tree().add_host(path, target.clone())?;
        self.registry.note_hosting(&target, path);
        Ok(Some(target))
    }

    /// Keep only the primary host and delete every other replica
    async fn invalidate_replicas(&self, path: &Path) {
        let Ok(hosts) = self.tree().hosting_set(path) else {
            return;
        };
        let mut hosts = hosts.into_iter();
        let Some(primary) = hosts.next() else {
            return;
        };
        let stale: Vec<StorageNodeId> = hosts.collect();
        if stale.is_empty() {
            return;
        }

        let narrowed = self
            .tree()
            .replace_hosts(path, HostSet::from([primary.clone()]));
        if let Err(err) = narrowed {
            warn!(%path, error = %err, "could not narrow hosts");
            return;
        }

        for node in stale {
            self.registry.note_removed(&node, path);
            match self.commands.delete(&node, path).await {
                Ok(true) => debug!(%path, %node, "deleted stale replica"),
                Ok(false) => warn!(%path, %node, "stale replica was already gone"),
                Err(err) => warn!(%path, %node, error = %err, "failed to delete stale replica"),
            }
        }
        info!(%path, %primary, "invalidated replicas");
    }

    /// Share-lock the deepest existing directory `path` would be created
    /// under, which keeps it from being deleted or written meanwhile.
    ///
    /// `None` when `path` already exists. The anchor is re-checked after
    /// locking because the tree may have grown while we waited. Concurrent
    /// creators under the same anchor race on the tree insert.
    async fn lock_creation_anchor(&self, path: &Path) -> NamingResult<Option<HeldLock>> {
        loop {
            let Some(anchor) = self.tree().creation_anchor(path)? else {
                return Ok(None);
            };
            let guard = match self.locks.acquire_guard(&anchor, LockMode::Shared).await {
                Ok(guard) => guard,
                Err(NamingError::FileNotFound(_)) => continue,
                Err(err) => return Err(err),
            };
            let current = self.tree().creation_anchor(path);
            match current? {
                None => return Ok(None),
                Some(current) if current == anchor => return Ok(Some(guard)),
                Some(_) => drop(guard),
            }
        }
    }

    pub async fn create_directory(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let Some(anchor) = self.lock_creation_anchor(path).await? else {
            return Ok(false);
        };
        let created = {
            let mut tree = self.tree();
            if !tree.contains(anchor.path()) {
                return Err(NamingError::not_found(anchor.path()));
            }
            tree.insert_directory(path)?
        };
        if created {
            debug!(%path, "created directory");
        }
        Ok(created)
    }

    /// Create an empty file on one storage node, then record it.
    ///
    /// A storage failure leaves the namespace unchanged and yields `false`.
    pub async fn create_file(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let Some(anchor) = self.lock_creation_anchor(path).await? else {
            return Ok(false);
        };
        let node = self.registry.select_node(&HostSet::new())?;

        match self.commands.create(&node, path).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(%path, %node, "storage node refused to create file");
                return Ok(false);
            }
            Err(err) => {
                warn!(%path, %node, error = %err, "storage node failed to create file");
                return Ok(false);
            }
        }

        let inserted = {
            let mut tree = self.tree();
            if tree.contains(anchor.path()) {
                tree.insert_file(path, HostSet::from([node.clone()]))
            } else {
                Err(NamingError::not_found(anchor.path()))
            }
        };
        match inserted {
            Ok(true) => {
                self.registry.note_hosting(&node, path);
                debug!(%path, %node, "created file");
                Ok(true)
            }
            other => {
                // Parent vanished or the name was taken meanwhile
                if let Err(err) = self.commands.delete(&node, path).await {
                    warn!(%path, %node, error = %err, "failed to roll back storage create");
                }
                other
            }
        }
    }

    /// Remove `path` and everything below it, then delete the files from
    /// the storage nodes that held them.
    pub async fn delete(&self, path: &Path) -> NamingResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        self.tree().is_directory(path)?;

        let guard = self.locks.acquire_guard(path, LockMode::Exclusive).await?;
        let removed = self.tree().remove(path);
        let removed = match removed {
            Ok(node) => {
                guard.forget();
                node
            }
            Err(err) => return Err(err),
        };

        let mut hosts = HostSet::new();
        for (_, file_hosts) in removed.files(path) {
            hosts.extend(file_hosts);
        }
        drop(removed);

        for node in hosts {
            self.registry.note_removed(&node, path);
            match self.commands.delete(&node, path).await {
                Ok(_) => debug!(%path, %node, "deleted from storage node"),
                Err(err) => warn!(%path, %node, error = %err, "storage delete failed"),
            }
        }
        info!(%path, "deleted");
        Ok(true)
    }
}

/// Clears a file's in-flight replication mark when dropped
struct ReplicationMark<'a> {
    service: &'a NamingService,
    path: &'a Path,
}

impl Drop for ReplicationMark<'_> {
    fn drop(&mut self) {
        self.service.tree().finish_replication(self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::Holders;
    use crate::testing::{FakeFleet, FleetCall};
    use std::time::Duration;
    use tokio::time::timeout;

    fn p(raw: &str) -> Path {
        Path::parse(raw).unwrap()
    }

    fn node(port: u16) -> StorageNodeId {
        StorageNodeId::new("127.0.0.1", port, port + 1)
    }

    fn register_request(id: &StorageNodeId, files: &[&str]) -> RegisterRequest {
        RegisterRequest {
            storage_ip: id.ip.clone(),
            client_port: id.client_port,
            command_port: id.command_port,
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    async fn service_with_nodes(threshold: u64, ports: &[u16]) -> (NamingService, Arc<FakeFleet>) {
        let fleet = Arc::new(FakeFleet::new());
        let service = NamingService::new(fleet.clone(), threshold);
        for port in ports {
            service.register(&register_request(&node(*port), &[])).await.unwrap();
        }
        (service, fleet)
    }

    #[tokio::test]
    async fn register_adopts_new_files_and_reports_duplicates() {
        let (service, _fleet) = service_with_nodes(20, &[]).await;

        let first = service
            .register(&register_request(&node(7000), &["/a/x", "/b"]))
            .await
            .unwrap();
        assert!(first.is_empty());

        let second = service
            .register(&register_request(&node(7010), &["/a/x", "/a", "/b/c", "/y"]))
            .await
            .unwrap();
        assert_eq!(second, vec!["/a/x", "/a", "/b/c"]);

        assert_eq!(service.hosting_set(&p("/y")).unwrap(), HostSet::from([node(7010)]));
        assert_eq!(service.hosting_set(&p("/a/x")).unwrap(), HostSet::from([node(7000)]));
        assert_eq!(service.list(&p("/")).unwrap(), vec!["a", "b", "y"]);
    }

    #[tokio::test]
    async fn registering_twice_is_illegal_state() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        let err = service
            .register(&register_request(&node(7000), &["/z"]))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::IllegalState(_)));
        assert!(!service.tree().contains(&p("/z")));
    }

    #[tokio::test]
    async fn create_file_places_on_a_storage_node() {
        let (service, fleet) = service_with_nodes(20, &[7000]).await;
        assert!(service.create_file(&p("/dir/f")).await.unwrap());
        assert!(!service.create_file(&p("/dir/f")).await.unwrap());

        assert!(service.is_directory(&p("/dir")).unwrap());
        assert!(!service.is_directory(&p("/dir/f")).unwrap());
        assert_eq!(service.get_storage(&p("/dir/f")).unwrap().server_port, 7000);
        assert_eq!(fleet.files_on(&node(7000)), vec![p("/dir/f")]);
    }

    #[tokio::test]
    async fn create_file_without_nodes_is_illegal_state() {
        let (service, _fleet) = service_with_nodes(20, &[]).await;
        let err = service.create_file(&p("/f")).await.unwrap_err();
        assert!(matches!(err, NamingError::IllegalState(_)));
        assert!(!service.tree().contains(&p("/f")));
    }

    #[tokio::test]
    async fn create_file_storage_failure_leaves_tree_untouched() {
        let (service, fleet) = service_with_nodes(20, &[7000]).await;
        fleet.set_unreachable(&node(7000), true);
        assert!(!service.create_file(&p("/d/f")).await.unwrap());
        assert!(!service.tree().contains(&p("/d")));
    }

    #[tokio::test]
    async fn create_under_a_file_is_not_found() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        service.create_file(&p("/f")).await.unwrap();
        assert!(matches!(
            service.create_file(&p("/f/g")).await,
            Err(NamingError::FileNotFound(_))
        ));
        assert!(matches!(
            service.create_directory(&p("/f/g")).await,
            Err(NamingError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn root_is_fixed() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        assert!(!service.create_directory(&Path::root()).await.unwrap());
        assert!(!service.create_file(&Path::root()).await.unwrap());
        assert!(!service.delete(&Path::root()).await.unwrap());
        assert!(service.is_directory(&Path::root()).unwrap());
    }

    #[tokio::test]
    async fn create_directory_is_idempotent_false() {
        let (service, _fleet) = service_with_nodes(20, &[]).await;
        assert!(service.create_directory(&p("/a/b")).await.unwrap());
        assert!(!service.create_directory(&p("/a/b")).await.unwrap());
        assert!(!service.create_directory(&p("/a")).await.unwrap());
        assert_eq!(service.list(&p("/a")).unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn get_storage_on_directory_or_missing_is_not_found() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        service.create_directory(&p("/d")).await.unwrap();
        assert!(matches!(service.get_storage(&p("/d")), Err(NamingError::FileNotFound(_))));
        assert!(matches!(service.get_storage(&p("/x")), Err(NamingError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn delete_fans_out_to_hosting_nodes() {
        let (service, fleet) = service_with_nodes(20, &[7000, 7010]).await;
        service.create_file(&p("/d/a")).await.unwrap();
        service.create_file(&p("/d/b")).await.unwrap();
        service.create_file(&p("/other")).await.unwrap();

        assert!(service.delete(&p("/d")).await.unwrap());
        assert!(!service.tree().contains(&p("/d")));
        assert!(service.tree().contains(&p("/other")));

        let deletes: Vec<FleetCall> = fleet
            .calls()
            .into_iter()
            .filter(|call| matches!(call, FleetCall::Delete(..)))
            .collect();
        assert_eq!(
            deletes,
            vec![
                FleetCall::Delete(node(7000), p("/d")),
                FleetCall::Delete(node(7010), p("/d")),
            ]
        );
        assert!(fleet.files_on(&node(7000)).iter().all(|f| !f.is_subpath_of(&p("/d"))));

        assert!(matches!(service.delete(&p("/d")).await, Err(NamingError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn shared_locks_replicate_at_threshold() {
        let (service, fleet) = service_with_nodes(3, &[7000, 7010]).await;
        let f = p("/f");
        service.create_file(&f).await.unwrap();
        fleet.put(&node(7000), &f, b"payload");

        for _ in 0..2 {
            service.lock(&f, false).await.unwrap();
            service.unlock(&f, false).unwrap();
        }
        assert_eq!(service.hosting_set(&f).unwrap().len(), 1);

        service.lock(&f, false).await.unwrap();
        service.unlock(&f, false).unwrap();
        assert_eq!(
            service.hosting_set(&f).unwrap(),
            HostSet::from([node(7000), node(7010)])
        );
        assert_eq!(fleet.get(&node(7010), &f).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn failed_replication_leaves_hosts_alone() {
        let (service, fleet) = service_with_nodes(1, &[7000, 7010]).await;
        let f = p("/f");
        service.create_file(&f).await.unwrap();
        fleet.set_unreachable(&node(7010), true);

        service.lock(&f, false).await.unwrap();
        service.unlock(&f, false).unwrap();
        assert_eq!(service.hosting_set(&f).unwrap(), HostSet::from([node(7000)]));
    }

    #[tokio::test]
    async fn exclusive_lock_invalidates_replicas() {
        let (service, fleet) = service_with_nodes(1, &[7000, 7010]).await;
        let f = p("/f");
        service.create_file(&f).await.unwrap();
        service.lock(&f, false).await.unwrap();
        service.unlock(&f, false).unwrap();
        assert_eq!(service.hosting_set(&f).unwrap().len(), 2);

        service.lock(&f, true).await.unwrap();
        assert_eq!(service.hosting_set(&f).unwrap(), HostSet::from([node(7000)]));
        assert!(fleet.calls().contains(&FleetCall::Delete(node(7010), f.clone())));
        assert_eq!(fleet.get(&node(7010), &f), None);
        service.unlock(&f, true).unwrap();
    }

    #[tokio::test]
    async fn lock_on_missing_path_is_not_found() {
        let (service, _fleet) = service_with_nodes(20, &[]).await;
        assert!(matches!(
            service.lock(&p("/missing"), false).await,
            Err(NamingError::FileNotFound(_))
        ));
        assert!(matches!(
            service.unlock(&p("/missing"), false),
            Err(NamingError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn delete_waits_for_holders() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        let service = Arc::new(service);
        let f = p("/f");
        service.create_file(&f).await.unwrap();
        service.lock(&f, false).await.unwrap();

        let deleter = {
            let service = service.clone();
            let f = f.clone();
            tokio::spawn(async move { service.delete(&f).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!deleter.is_finished());
        assert!(service.tree().contains(&f));

        service.unlock(&f, false).unwrap();
        let deleted = timeout(Duration::from_secs(2), deleter).await.unwrap().unwrap().unwrap();
        assert!(deleted);
        assert!(!service.tree().contains(&f));
    }

    #[tokio::test]
    async fn abandoned_lock_during_replication_releases_everything() {
        let (service, fleet) = service_with_nodes(1, &[7000, 7010, 7020]).await;
        let f = p("/f");
        service.create_file(&f).await.unwrap();

        fleet.set_stall_copies(true);
        assert!(timeout(Duration::from_millis(100), service.lock(&f, false))
            .await
            .is_err());
        assert_eq!(service.locks().holders(&f).unwrap(), Holders::Free);
        assert_eq!(service.hosting_set(&f).unwrap().len(), 1);

        fleet.set_stall_copies(false);
        service.lock(&f, false).await.unwrap();
        service.unlock(&f, false).unwrap();
        assert_eq!(service.hosting_set(&f).unwrap().len(), 2);

        timeout(Duration::from_secs(2), service.lock(&f, true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(service.hosting_set(&f).unwrap().len(), 1);
        service.unlock(&f, true).unwrap();
        assert_eq!(service.locks().holders(&f).unwrap(), Holders::Free);
    }

    #[tokio::test]
    async fn create_under_a_shared_locked_directory_proceeds() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        service.create_directory(&p("/d")).await.unwrap();
        service.lock(&p("/d"), false).await.unwrap();

        let wait = Duration::from_secs(2);
        assert!(timeout(wait, service.create_file(&p("/d/f"))).await.unwrap().unwrap());
        assert!(timeout(wait, service.create_file(&p("/d/e/g"))).await.unwrap().unwrap());
        assert!(timeout(wait, service.create_directory(&p("/d/h"))).await.unwrap().unwrap());

        service.lock(&Path::root(), false).await.unwrap();
        assert!(timeout(wait, service.create_file(&p("/top"))).await.unwrap().unwrap());

        assert_eq!(service.locks().holders(&p("/d")).unwrap(), Holders::Shared(1));
        service.unlock(&Path::root(), false).unwrap();
        service.unlock(&p("/d"), false).unwrap();
        assert_eq!(service.list(&p("/d")).unwrap(), vec!["e", "f", "h"]);
    }

    #[tokio::test]
    async fn registration_waits_for_a_writer_on_the_parent() {
        let (service, _fleet) = service_with_nodes(20, &[]).await;
        let service = Arc::new(service);
        service.create_directory(&p("/d")).await.unwrap();
        service.lock(&p("/d"), true).await.unwrap();

        let registering = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .register(&register_request(&node(7000), &["/d/x", "/y"]))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!registering.is_finished());
        assert!(!service.tree().contains(&p("/d/x")));

        service.unlock(&p("/d"), true).unwrap();
        let duplicates = timeout(Duration::from_secs(2), registering)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(duplicates.is_empty());
        assert_eq!(service.hosting_set(&p("/d/x")).unwrap(), HostSet::from([node(7000)]));
        assert_eq!(service.locks().holders(&p("/d")).unwrap(), Holders::Free);
    }

    #[tokio::test]
    async fn create_waits_for_exclusive_parent() {
        let (service, _fleet) = service_with_nodes(20, &[7000]).await;
        let service = Arc::new(service);
        service.create_directory(&p("/d")).await.unwrap();
        service.lock(&p("/d"), true).await.unwrap();

        let creator = {
            let service = service.clone();
            tokio::spawn(async move { service.create_file(&p("/d/f")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!creator.is_finished());

        service.unlock(&p("/d"), true).unwrap();
        let created = timeout(Duration::from_secs(2), creator).await.unwrap().unwrap().unwrap();
        assert!(created);
        assert_eq!(service.locks().holders(&p("/d")).unwrap(), Holders::Free);
    }
}

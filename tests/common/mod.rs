#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docsort::cache::key::RemoteId;
use docsort::cache::overlay::CacheOverlay;
use docsort::cache::store::{MemoryStore, StoreError};
use docsort::cache::traits::{PersistentStore, Snapshot};
use docsort::remote::{RemoteError, RemoteNode, RemoteStorage};
use docsort::resolve::Resolver;

/// In-memory remote hierarchy with call counters and failure/latency injection.
#[derive(Default)]
pub struct MockRemote {
    nodes: Mutex<HashMap<RemoteId, RemoteNode>>,
    next_id: AtomicUsize,
    create_delay: Mutex<Option<Duration>>,
    probe_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<&'static str>>,
    probes_in_flight: AtomicUsize,
    max_probes_in_flight: AtomicUsize,
    fail_creates: AtomicBool,
    fail_probes: AtomicBool,
    pub finds: AtomicUsize,
    pub creates: AtomicUsize,
    pub probes: AtomicUsize,
    pub lists: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_container` sleeps this long before answering.
    pub fn with_create_delay(self, delay: Duration) -> Self {
        *self.create_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Every `get_node` sleeps this long before answering.
    pub fn with_probe_delay(self, delay: Duration) -> Self {
        *self.probe_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probes(&self, fail: bool) {
        self.fail_probes.store(fail, Ordering::SeqCst);
    }

    /// Add a folder as if someone created it out of band.
    pub fn insert_folder(&self, parent: &RemoteId, name: &str) -> RemoteId {
        let id = RemoteId::from(format!(
            "ext-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        self.nodes.lock().unwrap().insert(
            id.clone(),
            RemoteNode {
                id: id.clone(),
                name: name.to_owned(),
                parent: Some(parent.clone()),
                trashed: false,
            },
        );
        id
    }

    pub fn trash(&self, id: &RemoteId) {
        if let Some(node) = self.nodes.lock().unwrap().get_mut(id) {
            node.trashed = true;
        }
    }

    pub fn delete(&self, id: &RemoteId) {
        self.nodes.lock().unwrap().remove(id);
    }

    pub fn node(&self, id: &RemoteId) -> Option<RemoteNode> {
        self.nodes.lock().unwrap().get(id).cloned()
    }

    /// Live folders named `name` directly under `parent`.
    pub fn children_named(&self, parent: &RemoteId, name: &str) -> Vec<RemoteNode> {
        self.nodes
            .lock()
            .unwrap()
            .values()
            .filter(|n| !n.trashed && n.name == name && n.parent.as_ref() == Some(parent))
            .cloned()
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Remote calls in the order they were made: "find", "create", "probe" or "list".
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// The most `get_node` calls that were ever running at once.
    pub fn max_probes_in_flight(&self) -> usize {
        self.max_probes_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn total_calls(&self) -> usize {
        self.creates() + self.finds() + self.probes() + self.lists()
    }
}

impl RemoteStorage for MockRemote {
    async fn find_child_by_name(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<Option<RemoteNode>, RemoteError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.record("find");
        Ok(self.children_named(parent, name).into_iter().next())
    }

    async fn create_container(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteNode, RemoteError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.record("create");
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 500,
                message: "backend error".to_owned(),
            });
        }

        let id = RemoteId::from(format!(
            "id-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        let node = RemoteNode {
            id: id.clone(),
            name: name.to_owned(),
            parent: Some(parent.clone()),
            trashed: false,
        };
        self.nodes.lock().unwrap().insert(id, node.clone());
        Ok(node)
    }

    async fn get_node(&self, id: &RemoteId) -> Result<RemoteNode, RemoteError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.record("probe");
        let running = self.probes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_probes_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = *self.probe_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.probes_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".to_owned()));
        }
        self.node(id)
            .ok_or_else(|| RemoteError::NotFound { id: id.clone() })
    }

    async fn list_all_containers_named(&self, name: &str) -> Result<Vec<RemoteNode>, RemoteError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.record("list");
        let mut found: Vec<RemoteNode> = self
            .nodes
            .lock()
            .unwrap()
            .values()
            .filter(|n| !n.trashed && n.name == name)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

/// A store whose saves always fail.
#[derive(Default)]
pub struct FailingStore;

impl PersistentStore for FailingStore {
    async fn load(&self) -> Snapshot {
        Snapshot::new()
    }

    async fn save(&self, _snapshot: &Snapshot) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed {
            path: "/dev/full".into(),
            source: std::io::Error::other("disk full"),
        })
    }
}

/// A resolver over a fresh [`MockRemote`] and an in-memory store.
pub async fn memory_resolver(
    remote: MockRemote,
) -> (
    Arc<Resolver<MockRemote, MemoryStore>>,
    Arc<MockRemote>,
    Arc<MemoryStore>,
) {
    memory_resolver_with(remote, Snapshot::new()).await
}

/// Like [`memory_resolver`], with the store pre-populated.
pub async fn memory_resolver_with(
    remote: MockRemote,
    snapshot: Snapshot,
) -> (
    Arc<Resolver<MockRemote, MemoryStore>>,
    Arc<MockRemote>,
    Arc<MemoryStore>,
) {
    let remote = Arc::new(remote);
    let store = Arc::new(MemoryStore::with_snapshot(snapshot));
    let overlay = Arc::new(CacheOverlay::load(Arc::clone(&store)).await);
    let resolver = Arc::new(Resolver::new(Arc::clone(&remote), overlay));
    (resolver, remote, store)
}

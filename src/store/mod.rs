//! Remote task stores
//!
//! A [`TaskStore`] is a document collection that lives somewhere else (usually a server).
//! Writes are plain async calls that report success or failure. Reads only happen through a [`Subscription`],
//! that delivers the whole collection once when it is created, then every time it changes.

pub mod firestore;
#[cfg(feature = "mock_services")]
pub mod mock_store;

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::document::Snapshot;
use crate::task::{NewTask, TaskId, TaskPatch};

pub use firestore::FirestoreStore;
#[cfg(feature = "mock_services")]
pub use mock_store::MockStore;


#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a new document, and return the key the store has picked for it
    async fn create(&self, task: NewTask) -> Result<TaskId, Box<dyn Error>>;
    /// Merge some fields into an existing document
    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), Box<dyn Error>>;
    /// Remove a document
    async fn delete(&self, id: &TaskId) -> Result<(), Box<dyn Error>>;

    /// Start listening to the collection.
    /// The current contents are delivered right away, then again after every change
    async fn subscribe(&self) -> Result<Subscription, Box<dyn Error>>;
    /// Stop listening. Nothing will be delivered to this subscription anymore
    fn unsubscribe(&self, subscription: Subscription);
}



#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Pick a process-wide unique id
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// The receiving end of a store subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, receiver: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns a pending snapshot, if any. This never waits
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next snapshot.
    /// Returns `None` once the store has stopped delivering to this subscription
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }
}


/// Keeps track of the live subscriptions of a store, and fans snapshots out to them
#[derive(Debug, Default)]
pub struct SubscriptionHub {
    senders: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<Snapshot>>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription, and immediately deliver `current` to it
    pub fn add(&self, current: Snapshot) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::next();
        // The receiver is alive, this cannot fail
        let _ = sender.send(current);
        lock(&self.senders).insert(id, sender);
        log::debug!("New subscription {:?}", id);
        Subscription::new(id, receiver)
    }

    pub fn remove(&self, id: SubscriptionId) {
        if lock(&self.senders).remove(&id).is_none() {
            log::warn!("Subscription {:?} was not registered", id);
        }
    }

    /// Deliver a snapshot to every subscriber. Subscribers that have gone away are forgotten
    pub fn broadcast(&self, snapshot: &Snapshot) {
        lock(&self.senders).retain(|id, sender| {
            if sender.send(snapshot.clone()).is_err() {
                log::debug!("Dropping closed subscription {:?}", id);
                return false;
            }
            true
        });
    }

    /// The number of subscriptions that are still registered
    pub fn len(&self) -> usize {
        lock(&self.senders).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock a std mutex, recovering the data in case a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}



/// What happens when several writes target the same task at the same time
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Writes are sent as soon as they are requested. The store keeps whichever arrives last
    LastWriteWins,
    /// Writes to the same task wait for the previous one to complete
    SerializePerTask,
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy::LastWriteWins
    }
}

/// Wrap a store so that it follows a given write policy
pub fn with_policy<S: TaskStore + 'static>(store: S, policy: WritePolicy) -> Arc<dyn TaskStore> {
    match policy {
        WritePolicy::LastWriteWins => Arc::new(store),
        WritePolicy::SerializePerTask => Arc::new(SerializedStore::new(store)),
    }
}


/// A store wrapper that never has two writes in flight for the same task
pub struct SerializedStore<S> {
    inner: S,
    locks: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: TaskStore> SerializedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, locks: Mutex::new(HashMap::new()) }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn lock_for(&self, id: &TaskId) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.locks)
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Forget the lock of a task, unless someone is still holding or waiting for it
    fn release(&self, id: &TaskId) {
        let mut locks = lock(&self.locks);
        let unused = locks.get(id).map(|l| Arc::strong_count(l) == 1).unwrap_or(false);
        if unused {
            locks.remove(id);
        }
    }
}

#[async_trait]
impl<S: TaskStore> TaskStore for SerializedStore<S> {
    async fn create(&self, task: NewTask) -> Result<TaskId, Box<dyn Error>> {
        self.inner.create(task).await
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), Box<dyn Error>> {
        let task_lock = self.lock_for(id);
        let result = {
            let _guard = task_lock.lock().await;
            self.inner.update(id, patch).await
        };
        drop(task_lock);
        self.release(id);
        result
    }

    async fn delete(&self, id: &TaskId) -> Result<(), Box<dyn Error>> {
        let task_lock = self.lock_for(id);
        let result = {
            let _guard = task_lock.lock().await;
            self.inner.delete(id).await
        };
        drop(task_lock);
        self.release(id);
        result
    }

    async fn subscribe(&self) -> Result<Subscription, Box<dyn Error>> {
        self.inner.subscribe().await
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.inner.unsubscribe(subscription)
    }
}

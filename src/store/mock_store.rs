//! An in-memory task store, that records every call it receives.
//!
//! It behaves like a remote store (auto-generated keys, partial merges, snapshots pushed to subscribers),
//! and can be told to fail using a [`MockBehaviour`]
#![cfg(feature = "mock_services")]

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::document::{Document, Snapshot};
use crate::mock_behaviour::MockBehaviour;
use crate::store::{lock, Subscription, SubscriptionHub, TaskStore};
use crate::task::{to_fields, NewTask, TaskId, TaskPatch};


/// A call that has been made to a [`MockStore`]
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Create(NewTask),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Default)]
struct MockState {
    documents: Vec<Document>,
    calls: Vec<StoreCall>,
    behaviour: MockBehaviour,

    in_flight: HashMap<TaskId, usize>,
    max_in_flight: HashMap<TaskId, usize>,
}

/// A fake [`TaskStore`]. Clones share the same contents
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
    hub: Arc<SubscriptionHub>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already contains some documents
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let store = Self::new();
        lock(&store.state).documents = documents;
        store
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        lock(&self.state).behaviour = behaviour;
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.state).calls.clone()
    }

    pub fn documents(&self) -> Snapshot {
        lock(&self.state).documents.clone()
    }

    /// The number of subscriptions that have not been cancelled yet
    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    /// The highest number of writes that have been in progress at the same time for this task
    pub fn max_concurrent_writes(&self, id: &TaskId) -> usize {
        lock(&self.state).max_in_flight.get(id).copied().unwrap_or(0)
    }

    /// Simulate a change made by another client: the collection now holds exactly `documents`
    pub fn replace_documents(&self, documents: Vec<Document>) {
        lock(&self.state).documents = documents;
        self.notify();
    }

    fn notify(&self) {
        let snapshot = self.documents();
        self.hub.broadcast(&snapshot);
    }

    fn record(&self, call: StoreCall) {
        lock(&self.state).calls.push(call);
    }

    fn begin_write(&self, id: &TaskId) {
        let mut state = lock(&self.state);
        let current = {
            let counter = state.in_flight.entry(id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let max = state.max_in_flight.entry(id.clone()).or_insert(0);
        if current > *max {
            *max = current;
        }
    }

    fn end_write(&self, id: &TaskId) {
        if let Some(counter) = lock(&self.state).in_flight.get_mut(id) {
            *counter -= 1;
        }
    }

    /// Let other futures run, like a network round-trip would
    async fn round_trip(&self, id: &TaskId) {
        self.begin_write(id);
        tokio::task::yield_now().await;
        self.end_write(id);
    }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn create(&self, task: NewTask) -> Result<TaskId, Box<dyn Error>> {
        self.record(StoreCall::Create(task.clone()));
        lock(&self.state).behaviour.can_create()?;

        let fields = to_fields(&task)?;
        let id = TaskId::random();
        lock(&self.state).documents.push(Document::new(id.clone(), fields));
        log::debug!("Mock store: created {}", id);
        self.notify();
        Ok(id)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), Box<dyn Error>> {
        self.record(StoreCall::Update(id.clone(), patch.clone()));
        self.round_trip(id).await;
        lock(&self.state).behaviour.can_update()?;

        let fields = to_fields(&patch)?;
        {
            let mut state = lock(&self.state);
            match state.documents.iter_mut().find(|doc| doc.id() == id) {
                None => return Err(format!("No document to update for key {}", id).into()),
                Some(doc) => doc.merge(fields),
            }
        }
        log::debug!("Mock store: updated {}", id);
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), Box<dyn Error>> {
        self.record(StoreCall::Delete(id.clone()));
        self.round_trip(id).await;
        lock(&self.state).behaviour.can_delete()?;

        let removed = {
            let mut state = lock(&self.state);
            let before = state.documents.len();
            state.documents.retain(|doc| doc.id() != id);
            before != state.documents.len()
        };
        if removed == false {
            // Remote stores do not complain about deleting missing documents either
            log::debug!("Mock store: nothing to delete for {}", id);
            return Ok(());
        }
        log::debug!("Mock store: deleted {}", id);
        self.notify();
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, Box<dyn Error>> {
        self.record(StoreCall::Subscribe);
        lock(&self.state).behaviour.can_subscribe()?;
        Ok(self.hub.add(self.documents()))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.record(StoreCall::Unsubscribe);
        self.hub.remove(subscription.id());
    }
}

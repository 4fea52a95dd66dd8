//! The task list screen

use std::error::Error;
use std::sync::Arc;

use crate::document::Snapshot;
use crate::navigation::{Navigation, Route};
use crate::store::{Subscription, TaskStore};
use crate::task::{tasks_from_snapshot, NewTask, Task, TaskId, TaskPatch};

/// Shown in the draft input when it is empty
pub const DRAFT_PLACEHOLDER: &str = "Add new task";


/// Displays the tasks of a store, and forwards user actions to it.
///
/// The displayed list is never modified locally: it is replaced as a whole every time the store delivers a snapshot.
/// Deliveries are only applied while the screen is active (see [`Self::activate`])
pub struct TaskListScreen<S: TaskStore + ?Sized> {
    store: Arc<S>,
    draft: String,
    tasks: Vec<Task>,
    subscription: Option<Subscription>,
}

impl<S: TaskStore + ?Sized> TaskListScreen<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            draft: String::new(),
            tasks: Vec::new(),
            subscription: None,
        }
    }

    pub fn draft(&self) -> &str   { &self.draft }
    pub fn tasks(&self) -> &[Task] { &self.tasks }

    pub fn set_draft<T: ToString>(&mut self, text: T) {
        self.draft = text.to_string();
    }

    /// Whether the "add" button is enabled
    pub fn can_submit(&self) -> bool {
        self.draft.is_empty() == false
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start listening to the store. This does nothing if the screen is active already
    pub async fn activate(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_active() {
            return Ok(());
        }
        let subscription = self.store.subscribe().await?;
        self.subscription = Some(subscription);
        log::debug!("Task list is now active");
        Ok(())
    }

    /// Stop listening to the store. Snapshots that are delivered afterwards are never applied
    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
            log::debug!("Task list is now inactive");
        }
    }

    /// Apply every snapshot that has been delivered so far, without waiting.
    ///
    /// Returns how many snapshots have been applied
    pub fn process_notifications(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(subscription) = self.subscription.as_mut() {
            while let Some(snapshot) = subscription.try_next() {
                pending.push(snapshot);
            }
        }

        let n_applied = pending.len();
        for snapshot in pending {
            self.apply_snapshot(snapshot);
        }
        n_applied
    }

    /// Wait for the next snapshot and apply it.
    ///
    /// Returns false if the screen is inactive, or if the store has stopped delivering
    pub async fn next_notification(&mut self) -> bool {
        let snapshot = match self.subscription.as_mut() {
            None => return false,
            Some(subscription) => subscription.next().await,
        };
        match snapshot {
            None => {
                log::warn!("The store has closed the subscription");
                false
            },
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            },
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.tasks = tasks_from_snapshot(&snapshot);
        log::debug!("Task list now has {} tasks", self.tasks.len());
    }

    /// Create a task from the current draft.
    ///
    /// Once the store has created the document, its key is written into the document itself, then the draft is cleared.
    /// In case of failure, the draft is kept
    pub async fn submit_draft(&mut self) -> Result<TaskId, Box<dyn Error>> {
        if self.can_submit() == false {
            return Err("Cannot add a task with an empty title".into());
        }

        let id = match self.store.create(NewTask::new(self.draft.clone())).await {
            Ok(id) => id,
            Err(err) => {
                log::error!("Error adding document: {}", err);
                return Err(err);
            },
        };
        if let Err(err) = self.store.update(&id, TaskPatch::stamp_id(&id)).await {
            log::error!("Error writing the id of document {}: {}", id, err);
            return Err(err);
        }

        self.draft.clear();
        Ok(id)
    }

    /// Flip the completion status of a task
    pub async fn toggle(&self, task: &Task) -> Result<(), Box<dyn Error>> {
        let result = self.store.update(task.id(), TaskPatch::set_done(task.done() == false)).await;
        if let Err(err) = &result {
            log::error!("Error toggling task {}: {}", task.id(), err);
        }
        result
    }

    pub async fn delete(&self, task: &Task) -> Result<(), Box<dyn Error>> {
        let result = self.store.delete(task.id()).await;
        if let Err(err) = &result {
            log::error!("Error deleting task {}: {}", task.id(), err);
        }
        result
    }

    pub fn navigate(&self) -> Navigation {
        Navigation::To(Route::PrayerTimes)
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            "Sa'Ae".to_string(),
            "[Go to Prayer Times]".to_string(),
        ];

        let input = if self.draft.is_empty() { DRAFT_PLACEHOLDER } else { self.draft.as_str() };
        let button = if self.can_submit() { "[Add Task]" } else { "(Add Task)" };
        lines.push(format!("> {}  {}", input, button));

        for (index, task) in self.tasks.iter().enumerate() {
            let completion = if task.done() { "✓" } else { "○" };
            lines.push(format!("{}. {} {}", index + 1, completion, task.title()));
        }
        lines
    }
}

impl<S: TaskStore + ?Sized> Drop for TaskListScreen<S> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

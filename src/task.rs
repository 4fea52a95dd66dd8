//! To-do tasks

use std::error::Error;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Document, DocumentId};

/// A task is keyed by the id of the document that holds it
pub type TaskId = DocumentId;

/// A to-do task, as displayed by the task list.
///
/// This is a read-only projection of a remote document: changes are requested to the store, and only become visible when the store delivers a new snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The key of the backing document
    id: TaskId,
    /// The display name of the task
    title: String,
    /// The completion status of this task
    done: bool,
}


impl Task {
    pub fn new(id: TaskId, title: String, done: bool) -> Self {
        Self { id, title, done }
    }

    /// Validate a raw document and turn it into a Task.
    ///
    /// The id always comes from the document key, whatever its `id` field says.
    /// A missing `done` field means the task is not completed yet
    pub fn from_document(doc: &Document) -> Result<Self, Box<dyn Error>> {
        let title = match doc.get("title") {
            Some(Value::String(s)) if s.is_empty() == false => s.clone(),
            Some(Value::String(_)) => return Err(format!("Document {} has an empty title", doc.id()).into()),
            Some(other) => return Err(format!("Document {} has a non-string title ({})", doc.id(), other).into()),
            None => return Err(format!("Document {} has no title", doc.id()).into()),
        };

        let done = match doc.get("done") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => return Err(format!("Document {} has a non-boolean done flag ({})", doc.id(), other).into()),
        };

        Ok(Self::new(doc.id().clone(), title, done))
    }

    pub fn id(&self) -> &TaskId   { &self.id    }
    pub fn title(&self) -> &str   { &self.title }
    pub fn done(&self) -> bool    { self.done   }
}

/// Turn a whole snapshot into tasks, in the same order. Invalid documents are skipped
pub fn tasks_from_snapshot(docs: &[Document]) -> Vec<Task> {
    docs.iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(err) => {
                log::warn!("Invalid task document: {}. Ignoring it", err);
                None
            }
        })
        .collect()
}


/// The fields of a task that is about to be created
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub done: bool,
}

impl NewTask {
    pub fn new(title: String) -> Self {
        Self { title, done: false }
    }
}

/// A partial update of a task document. Fields that are `None` are left unchanged in the store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TaskPatch {
    pub fn set_done(done: bool) -> Self {
        Self { done: Some(done), ..Self::default() }
    }

    /// Write the store-assigned id back into the document
    pub fn stamp_id(id: &TaskId) -> Self {
        Self { id: Some(id.to_string()), ..Self::default() }
    }
}

/// Serialize a struct into the field map of a document
pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, Box<dyn Error>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(format!("Expected an object, got {}", other).into()),
    }
}

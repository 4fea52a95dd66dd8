//! Raw documents, as a remote store delivers them

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// The opaque key of a document in a remote collection
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId {
    content: String,
}

impl DocumentId {
    /// Generate a random DocumentId, the way a store auto-generates keys
    pub fn random() -> Self {
        let random = uuid::Uuid::new_v4().to_simple().to_string();
        Self { content: random }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl From<String> for DocumentId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for DocumentId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}
impl FromStr for DocumentId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains('/') {
            return Err(format!("{:?} is not a valid document id", s));
        }
        Ok(Self::from(s))
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}



/// A single record in a remote collection.
///
/// Its fields are untyped: they are validated when turned into a [`Task`](crate::Task)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> &DocumentId         { &self.id     }
    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Merge some fields into this document. Fields that are not in `patch` are left untouched
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.fields.insert(key, value);
        }
    }
}


/// The full, ordered contents of a collection at a given time
pub type Snapshot = Vec<Document>;

//! A task store backed by a Cloud Firestore collection, through the Firestore REST API.
//!
//! The REST API has no push channel, so subscriptions are served by a task that lists the collection
//! every `poll_interval`, and right after every write made through this store.
//! A snapshot is only delivered when it differs from the previous one.

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::StoreSettings;
use crate::document::{Document, DocumentId, Snapshot};
use crate::store::{lock, Subscription, SubscriptionId, TaskStore};
use crate::task::{to_fields, NewTask, TaskId, TaskPatch};

/// How many documents are requested per page when listing the collection
const LIST_PAGE_SIZE: u32 = 300;


/// A [`TaskStore`] that talks to Firestore. Clones share the same connection and subscriptions
#[derive(Clone, Debug)]
pub struct FirestoreStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    collection_url: Url,
    api_key: Option<String>,
    poll_interval: Duration,

    /// Bumped after every successful write, so that pollers refresh right away
    changes: watch::Sender<u64>,
    changes_rx: watch::Receiver<u64>,
    pollers: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl FirestoreStore {
    /// Create a store. This does not start a connection
    pub fn new(settings: &StoreSettings) -> Result<Self, Box<dyn Error>> {
        let collection_url = collection_url(&settings.base_url, &settings.project_id, &settings.collection)?;
        let http = reqwest::Client::builder()
            .user_agent(crate::config::user_agent())
            .build()?;
        let (changes, changes_rx) = watch::channel(0);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                collection_url,
                api_key: settings.api_key.clone(),
                poll_interval: settings.poll_interval(),
                changes,
                changes_rx,
                pollers: Mutex::new(HashMap::new()),
            })
        })
    }

    pub fn collection_url(&self) -> &Url {
        &self.inner.collection_url
    }

    /// The number of subscriptions whose poller is still running
    pub fn subscription_count(&self) -> usize {
        self.prune_pollers();
        lock(&self.inner.pollers).len()
    }

    /// Forget pollers that have stopped on their own, because their subscription was dropped without being unsubscribed
    fn prune_pollers(&self) {
        lock(&self.inner.pollers).retain(|id, handle| {
            if handle.is_finished() {
                log::debug!("Forgetting the stopped poller of {:?}", id);
                return false;
            }
            true
        });
    }
}

/// `{base}/v1/projects/{project}/databases/(default)/documents/{collection}`
pub fn collection_url(base_url: &str, project_id: &str, collection: &str) -> Result<Url, Box<dyn Error>> {
    if project_id.is_empty() {
        return Err("A Firestore project id is required".into());
    }
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| format!("{} cannot be used as a base URL", base_url))?
        .pop_if_empty()
        .extend(&["v1", "projects", project_id, "databases", "(default)", "documents", collection]);
    Ok(url)
}

impl Inner {
    fn with_key(&self, mut url: Url) -> Url {
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    fn create_url(&self) -> Url {
        self.with_key(self.collection_url.clone())
    }

    fn document_url(&self, id: &DocumentId) -> Url {
        let mut url = self.collection_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id.as_str());
        }
        url
    }

    /// The URL of a partial update: only the fields in `fields` are overwritten, and the document must exist already
    fn update_url(&self, id: &DocumentId, fields: &Map<String, Value>) -> Url {
        let mut url = self.document_url(id);
        {
            let mut query = url.query_pairs_mut();
            for field in fields.keys() {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }
        self.with_key(url)
    }

    fn delete_url(&self, id: &DocumentId) -> Url {
        self.with_key(self.document_url(id))
    }

    fn list_url(&self, page_token: Option<&str>) -> Url {
        let mut url = self.collection_url.clone();
        url.query_pairs_mut().append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }
        self.with_key(url)
    }

    fn signal_change(&self) {
        let next = *self.changes.borrow() + 1;
        let _ = self.changes.send(next);
    }

    /// List the whole collection, following pagination
    async fn list(&self) -> Result<Snapshot, Box<dyn Error>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.list_url(page_token.as_deref());
            log::trace!("Listing {}", url);
            let response = self.http.get(url).send().await?;
            let text = success_text(response).await?;
            let page: Value = serde_json::from_str(&text)?;

            if let Some(raw_docs) = page.get("documents").and_then(Value::as_array) {
                for raw in raw_docs {
                    documents.push(decode_document(raw)?);
                }
            }

            page_token = page.get("nextPageToken").and_then(Value::as_str).map(String::from);
            if page_token.is_none() {
                break;
            }
        }
        Ok(documents)
    }
}

/// Returns the body of a successful response, or an error for any other status
async fn success_text(response: Response) -> Result<String, Box<dyn Error>> {
    if response.status().is_success() == false {
        return Err(format!("Unexpected HTTP status code {:?}", response.status()).into());
    }
    Ok(response.text().await?)
}

/// The subscription task: list the collection whenever something may have changed, and deliver what is new
async fn poll(inner: Arc<Inner>, sender: mpsc::UnboundedSender<Snapshot>, mut last: Snapshot) {
    let mut interval = tokio::time::interval(inner.poll_interval);
    let mut changes = inner.changes_rx.clone();
    // The first tick completes immediately, and the first snapshot has been delivered already
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {},
            _ = changes.changed() => {},
        }
        if sender.is_closed() {
            break;
        }

        let snapshot = match inner.list().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("Unable to list {}: {}. Will retry at next poll", inner.collection_url, err);
                continue;
            },
        };
        if snapshot == last {
            continue;
        }
        if sender.send(snapshot.clone()).is_err() {
            break;
        }
        last = snapshot;
    }
    log::debug!("Poller of {} has stopped", inner.collection_url);
}


#[async_trait]
impl TaskStore for FirestoreStore {
    async fn create(&self, task: NewTask) -> Result<TaskId, Box<dyn Error>> {
        let body = json!({ "fields": encode_fields(&to_fields(&task)?) }).to_string();

        let response = self.inner.http
            .post(self.inner.create_url())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let text = success_text(response).await?;
        let created = decode_document(&serde_json::from_str(&text)?)?;

        log::debug!("Created document {}", created.id());
        self.inner.signal_change();
        Ok(created.id().clone())
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), Box<dyn Error>> {
        let fields = to_fields(&patch)?;
        let url = self.inner.update_url(id, &fields);
        let body = json!({ "fields": encode_fields(&fields) }).to_string();

        let response = self.inner.http
            .patch(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        success_text(response).await?;

        log::debug!("Updated document {}", id);
        self.inner.signal_change();
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), Box<dyn Error>> {
        let response = self.inner.http
            .delete(self.inner.delete_url(id))
            .send()
            .await?;
        success_text(response).await?;

        log::debug!("Deleted document {}", id);
        self.inner.signal_change();
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, Box<dyn Error>> {
        let current = self.inner.list().await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, this cannot fail
        let _ = sender.send(current.clone());

        self.prune_pollers();
        let id = SubscriptionId::next();
        let handle = tokio::spawn(poll(self.inner.clone(), sender, current));
        lock(&self.inner.pollers).insert(id, handle);
        log::info!("Subscribed to {}", self.inner.collection_url);
        Ok(Subscription::new(id, receiver))
    }

    fn unsubscribe(&self, subscription: Subscription) {
        match lock(&self.inner.pollers).remove(&subscription.id()) {
            None => log::warn!("Subscription {:?} was not registered", subscription.id()),
            Some(handle) => {
                handle.abort();
                log::info!("Unsubscribed from {}", self.inner.collection_url);
            },
        }
    }
}



/// Turn plain JSON fields into Firestore typed values
pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(fields.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect())
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_f64() => json!({ "doubleValue": n }),
        Value::Number(n) => json!({ "integerValue": n.to_string() }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({ "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() } }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Turn a Firestore typed value back into plain JSON.
/// Returns `None` for value kinds that have no JSON counterpart (references, geo points...)
fn decode_value(value: &Value) -> Option<Value> {
    let (kind, inner) = value.as_object()?.iter().next()?;
    match kind.as_str() {
        "nullValue" => Some(Value::Null),
        "booleanValue" => inner.as_bool().map(Value::Bool),
        "stringValue" | "timestampValue" => inner.as_str().map(|s| Value::String(s.to_string())),
        "integerValue" => inner.as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from),
        "doubleValue" => inner.as_f64().map(Value::from),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            Some(Value::Array(values
                .map(|values| values.iter().filter_map(decode_value).collect())
                .unwrap_or_default()))
        },
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            Some(Value::Object(fields.map(decode_fields).unwrap_or_default()))
        },
        other => {
            log::debug!("Ignoring a Firestore value of kind {}", other);
            None
        },
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter()
        .filter_map(|(key, value)| decode_value(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Parse a Firestore document resource. Its key is the last segment of its `name`
pub fn decode_document(raw: &Value) -> Result<Document, Box<dyn Error>> {
    let name = raw.get("name")
        .and_then(Value::as_str)
        .ok_or("Firestore document without a name")?;
    let key = name.rsplit('/').next().unwrap_or(name);
    let id: DocumentId = key.parse()?;

    let fields = raw.get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default();

    Ok(Document::new(id, fields))
}

//! Tests of the Firestore store, against a local stub of the Firestore REST API.
//!
//! The stub serves one page per document, so that every listing goes through pagination

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::form_urlencoded;

use saae::{NewTask, TaskId, TaskPatch};
use saae::config::StoreSettings;
use saae::screen::TaskListScreen;
use saae::store::{FirestoreStore, TaskStore};

const COLLECTION_PATH: &str = "/v1/projects/demo/databases/(default)/documents/todos";
const API_KEY: &str = "k3y";


#[derive(Default)]
struct Collection {
    /// Document keys and their Firestore-typed fields
    documents: Vec<(String, Value)>,
    created: u32,
    patch_queries: Vec<String>,
}

type Shared = Arc<Mutex<Collection>>;

fn params(query: &Option<String>) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_deref().unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

fn has_key(query: &Option<String>) -> bool {
    params(query).contains(&("key".to_string(), API_KEY.to_string()))
}

fn resource(key: &str, fields: &Value) -> Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/todos/{}", key),
        "fields": fields,
        "createTime": "2026-10-19T08:00:00.000000Z",
    })
}

async fn list(State(shared): State<Shared>, RawQuery(query): RawQuery) -> Result<Json<Value>, StatusCode> {
    if has_key(&query) == false {
        return Err(StatusCode::FORBIDDEN);
    }
    let page: usize = params(&query).into_iter()
        .find(|(name, _)| name == "pageToken")
        .and_then(|(_, token)| token.parse().ok())
        .unwrap_or(0);

    let collection = shared.lock().unwrap();
    match collection.documents.get(page) {
        None => Ok(Json(json!({}))),
        Some((key, fields)) => {
            let mut reply = json!({ "documents": [resource(key, fields)] });
            if page + 1 < collection.documents.len() {
                reply["nextPageToken"] = json!((page + 1).to_string());
            }
            Ok(Json(reply))
        },
    }
}

async fn create(State(shared): State<Shared>, RawQuery(query): RawQuery, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if has_key(&query) == false {
        return Err(StatusCode::FORBIDDEN);
    }
    let mut collection = shared.lock().unwrap();
    collection.created += 1;
    let key = format!("doc{}", collection.created);
    let fields = body["fields"].clone();
    collection.documents.push((key.clone(), fields.clone()));
    Ok(Json(resource(&key, &fields)))
}

async fn update(State(shared): State<Shared>, Path(key): Path<String>, RawQuery(query): RawQuery, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if has_key(&query) == false {
        return Err(StatusCode::FORBIDDEN);
    }
    let mut collection = shared.lock().unwrap();
    collection.patch_queries.push(query.clone().unwrap_or_default());

    let (_, fields) = collection.documents.iter_mut()
        .find(|(k, _)| *k == key)
        .ok_or(StatusCode::NOT_FOUND)?;
    for (name, path) in params(&query) {
        if name == "updateMask.fieldPaths" {
            fields[path.as_str()] = body["fields"][path.as_str()].clone();
        }
    }
    Ok(Json(resource(&key, fields)))
}

async fn delete(State(shared): State<Shared>, Path(key): Path<String>, RawQuery(query): RawQuery) -> Result<Json<Value>, StatusCode> {
    if has_key(&query) == false {
        return Err(StatusCode::FORBIDDEN);
    }
    shared.lock().unwrap().documents.retain(|(k, _)| *k != key);
    Ok(Json(json!({})))
}

async fn serve(documents: Vec<(&str, Value)>) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(Collection {
        documents: documents.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ..Collection::default()
    }));
    let router = Router::new()
        .route(COLLECTION_PATH, get(list).post(create))
        .route(&format!("{}/{{key}}", COLLECTION_PATH), patch(update).delete(delete))
        .with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", address), shared)
}

fn store(base_url: &str, api_key: Option<&str>, poll_interval_ms: u64) -> FirestoreStore {
    FirestoreStore::new(&StoreSettings {
        base_url: base_url.to_string(),
        project_id: "demo".to_string(),
        api_key: api_key.map(String::from),
        collection: "todos".to_string(),
        poll_interval_ms,
    }).unwrap()
}

fn typed(title: &str, done: bool) -> Value {
    json!({ "title": { "stringValue": title }, "done": { "booleanValue": done } })
}

const NO_POLLING: u64 = 3_600_000;


#[tokio::test]
async fn writes_reach_the_collection() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (base_url, shared) = serve(Vec::new()).await;
    let store = store(&base_url, Some(API_KEY), NO_POLLING);

    let id = store.create(NewTask::new("Buy milk".to_string())).await.unwrap();
    assert_eq!(id, TaskId::from("doc1"));
    assert_eq!(shared.lock().unwrap().documents[0].1, typed("Buy milk", false));

    store.update(&id, TaskPatch::stamp_id(&id)).await.unwrap();
    store.update(&id, TaskPatch::set_done(true)).await.unwrap();
    {
        let collection = shared.lock().unwrap();
        assert_eq!(collection.documents[0].1, json!({
            "title": { "stringValue": "Buy milk" },
            "done": { "booleanValue": true },
            "id": { "stringValue": "doc1" },
        }));
        assert_eq!(collection.patch_queries, vec![
            "updateMask.fieldPaths=id&currentDocument.exists=true&key=k3y".to_string(),
            "updateMask.fieldPaths=done&currentDocument.exists=true&key=k3y".to_string(),
        ]);
    }

    store.delete(&id).await.unwrap();
    assert!(shared.lock().unwrap().documents.is_empty());
}

#[tokio::test]
async fn updating_a_missing_document_fails() {
    let (base_url, shared) = serve(vec![("a", typed("A", false))]).await;
    let store = store(&base_url, Some(API_KEY), NO_POLLING);

    assert!(store.update(&TaskId::from("gone"), TaskPatch::set_done(true)).await.is_err());
    // Nothing has been created on the way
    assert_eq!(shared.lock().unwrap().documents.len(), 1);
}

#[tokio::test]
async fn requests_without_the_api_key_are_refused() {
    let (base_url, _shared) = serve(vec![("a", typed("A", false))]).await;
    let store = store(&base_url, None, NO_POLLING);

    assert!(store.subscribe().await.is_err());
    assert!(store.create(NewTask::new("B".to_string())).await.is_err());
}

#[tokio::test]
async fn a_subscription_starts_with_the_whole_collection() {
    let (base_url, _shared) = serve(vec![
        ("a", typed("A", false)),
        ("b", typed("B", true)),
        ("c", typed("C", false)),
    ]).await;
    let store = store(&base_url, Some(API_KEY), NO_POLLING);

    let mut subscription = store.subscribe().await.unwrap();
    let first = subscription.try_next().unwrap();
    let keys: Vec<&str> = first.iter().map(|doc| doc.id().as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(first[1].get("done"), Some(&json!(true)));

    store.unsubscribe(subscription);
}

#[tokio::test]
async fn own_writes_are_delivered_without_waiting_for_the_next_poll() {
    let (base_url, _shared) = serve(vec![("a", typed("A", false))]).await;
    let store = store(&base_url, Some(API_KEY), NO_POLLING);

    let mut subscription = store.subscribe().await.unwrap();
    assert_eq!(subscription.try_next().map(|snapshot| snapshot.len()), Some(1));

    store.create(NewTask::new("B".to_string())).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), subscription.next()).await
        .unwrap()
        .unwrap();
    assert_eq!(next.len(), 2);
    assert_eq!(next[1].get("title"), Some(&json!("B")));

    store.unsubscribe(subscription);
}

#[tokio::test]
async fn changes_from_other_clients_are_polled() {
    let (base_url, shared) = serve(vec![("a", typed("A", false))]).await;
    let store = store(&base_url, Some(API_KEY), 50);

    let mut subscription = store.subscribe().await.unwrap();
    subscription.try_next().unwrap();

    shared.lock().unwrap().documents.push(("z".to_string(), typed("From the web", false)));
    let next = tokio::time::timeout(Duration::from_secs(5), subscription.next()).await
        .unwrap()
        .unwrap();
    let keys: Vec<&str> = next.iter().map(|doc| doc.id().as_str()).collect();
    assert_eq!(keys, vec!["a", "z"]);

    store.unsubscribe(subscription);
}

#[tokio::test]
async fn dropped_subscriptions_are_forgotten() {
    let (base_url, _shared) = serve(vec![("a", typed("A", false))]).await;
    let store = store(&base_url, Some(API_KEY), NO_POLLING);

    let kept = store.subscribe().await.unwrap();
    let dropped = store.subscribe().await.unwrap();
    assert_eq!(store.subscription_count(), 2);

    drop(dropped);
    // Any write wakes the pollers up, and the orphaned one stops
    store.create(NewTask::new("B".to_string())).await.unwrap();
    let pruned = tokio::time::timeout(Duration::from_secs(5), async {
        while store.subscription_count() > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }).await;
    assert!(pruned.is_ok());

    store.unsubscribe(kept);
    assert_eq!(store.subscription_count(), 0);
}

#[tokio::test]
async fn the_task_list_on_top_of_firestore() {
    let (base_url, shared) = serve(Vec::new()).await;
    let mut screen = TaskListScreen::new(Arc::new(store(&base_url, Some(API_KEY), NO_POLLING)));
    screen.activate().await.unwrap();
    screen.process_notifications();
    assert!(screen.tasks().is_empty());

    screen.set_draft("Pray Isha");
    let id = screen.submit_draft().await.unwrap();

    while screen.tasks().is_empty() {
        let delivered = tokio::time::timeout(Duration::from_secs(5), screen.next_notification()).await.unwrap();
        assert!(delivered);
    }
    assert_eq!(screen.tasks()[0].title(), "Pray Isha");
    assert_eq!(screen.tasks()[0].id(), &id);
    assert_eq!(shared.lock().unwrap().documents[0].1["id"], json!({ "stringValue": "doc1" }));
}

//! A minimal self-hosted relay speaking the same two endpoints the client
//! uses. It keeps only the newest body per topic, like the public relay.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Entry {
    content: Value,
    created: DateTime<Utc>,
}

/// Last-write-wins topic store behind the relay endpoints.
#[derive(Debug, Clone, Default)]
pub struct RelayStore {
    topics: Arc<DashMap<String, Entry>>,
}

impl RelayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, topic: &str, content: Value) {
        self.topics.insert(
            topic.to_string(),
            Entry {
                content,
                created: Utc::now(),
            },
        );
    }

    pub fn latest(&self, topic: &str) -> Option<Value> {
        self.topics.get(topic).map(|e| e.content.clone())
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// The newest entry for `topic` in the relay's GET response shape.
    pub fn latest_envelope(&self, topic: &str) -> Option<Value> {
        let entry = self.topics.get(topic)?;
        Some(json!({
            "this": "succeeded",
            "by": "getting",
            "the": "dweets",
            "with": [{
                "thing": topic,
                "created": entry.created.to_rfc3339(),
                "content": entry.content,
            }]
        }))
    }
}

pub fn router(store: RelayStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/dweet/for/{topic}", post(publish_handler))
        .route("/get/latest/dweet/for/{topic}", get(fetch_handler))
        .layer(cors)
        .with_state(store)
}

async fn publish_handler(
    Path(topic): Path<String>,
    State(store): State<RelayStore>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    debug!(%topic, "relay store write");
    store.put(&topic, body.clone());
    Json(json!({
        "this": "succeeded",
        "by": "dweeting",
        "the": "dweet",
        "with": {"thing": topic, "content": body},
    }))
}

async fn fetch_handler(
    Path(topic): Path<String>,
    State(store): State<RelayStore>,
) -> impl IntoResponse {
    match store.latest_envelope(&topic) {
        Some(envelope) => (StatusCode::OK, Json(envelope)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "this": "failed",
                "with": 404,
                "because": format!("we couldn't find this: {topic}"),
            })),
        ),
    }
}

/// Serves the relay until the listener fails.
pub async fn serve(listener: tokio::net::TcpListener, store: RelayStore) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Relay listening on http://{}", addr);
    }
    axum::serve(listener, router(store)).await
}

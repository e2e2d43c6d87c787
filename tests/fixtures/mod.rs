//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use image_arena::api::create_router;
use image_arena::config::AppConfig;
use image_arena::{AppState, ItemId, RatingStore};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Configuration for an isolated in-memory service with no discovery
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.in_memory = true;
    config.images.auto_discover = false;
    config
}

/// Configuration backed by a SQLite file at `path`
pub fn sqlite_config(path: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.database_path = path.to_path_buf();
    config.images.auto_discover = false;
    config
}

/// Fresh in-memory application state holding the given image references
pub fn seeded_state(references: &[&str]) -> Arc<AppState> {
    let state = AppState::new(test_config()).expect("failed to build app state");
    seed_all(state.store().as_ref(), references);
    Arc::new(state)
}

/// Seed every reference with a label derived from its position
pub fn seed_all(store: &dyn RatingStore, references: &[&str]) {
    for (index, reference) in references.iter().enumerate() {
        store
            .seed(reference, &format!("Image {}", index + 1))
            .expect("failed to seed image");
    }
}

/// Id of a seeded reference
pub fn id_of(state: &AppState, reference: &str) -> ItemId {
    state
        .store()
        .find_by_reference(reference)
        .expect("lookup failed")
        .expect("reference was not seeded")
}

/// Current rating of an item
pub fn rating_of(state: &AppState, id: ItemId) -> f64 {
    state
        .store()
        .get(id)
        .expect("lookup failed")
        .expect("item missing")
        .rating
}

/// Router and state sharing the same store
pub fn test_app(references: &[&str]) -> (Router, Arc<AppState>) {
    let state = seeded_state(references);
    (create_router(state.clone()), state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("invalid request")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("invalid request")
}

/// Collect a response body as raw bytes
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response was not JSON")
}

//! Test helpers for tnse-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod stub;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::{Map, json};
use tnse_core::ConfigEntry;
use tnse_server::{AppState, create_router_with_state, metrics::detached_handle};
use tnse_sync::{MemoryStore, RefreshCoordinator, RetryPolicy, TnseApi};

pub use client::{TestClient, TestResponse, client};
pub use stub::{ACCOUNT, StubApi};

pub const ENTRY_ID: &str = "entry-1";

/// A registered, refreshed entry behind the full router.
pub struct TestApp {
    pub client: TestClient,
    pub state: AppState,
    pub api: Arc<StubApi>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub bill_dir: tempfile::TempDir,
}

pub fn coordinator(api: &Arc<StubApi>) -> Arc<RefreshCoordinator> {
    let mut data = Map::new();
    data.insert("region".into(), json!("rostov"));
    data.insert("email".into(), json!("user@example.com"));
    data.insert("password".into(), json!("secret"));
    let store = Arc::new(MemoryStore::new(ConfigEntry::new(data)).unwrap());

    let api: Arc<dyn TnseApi> = api.clone();
    let retry = RetryPolicy::new(1, Duration::from_secs(5), Duration::ZERO);
    Arc::new(RefreshCoordinator::new(ENTRY_ID, store, retry, move |_, _| api).unwrap())
}

/// Builds an app with one entry; the first cycle runs when `refreshed` is set.
pub async fn app(refreshed: bool) -> TestApp {
    let api = StubApi::new();
    let coordinator = coordinator(&api);
    if refreshed {
        coordinator.first_refresh().await.unwrap();
    }

    let bill_dir = tempfile::tempdir().unwrap();
    let state = AppState::new(bill_dir.path());
    state.register(coordinator.clone());

    let router: Router = create_router_with_state(state.clone(), detached_handle());
    TestApp {
        client: TestClient::new(router),
        state,
        api,
        coordinator,
        bill_dir,
    }
}

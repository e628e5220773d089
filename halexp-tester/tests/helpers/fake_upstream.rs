//! Fake halexp search service on 127.0.0.1:0
//!
//! Routes, relative to the base URL:
//! - `ok/authors/query`: one author per requested `hits` (default 3), named
//!   after the `rank_metric` parameter
//! - `ok/docs/query`: two documents
//! - `broken/{mode}/query`: 500
//! - `garbled/{mode}/query`: 200 with a non-JSON body

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::task::JoinHandle;

use super::{author_record, document_record, envelope};

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

pub struct FakeUpstream {
    pub addr: SocketAddr,
    seen: Seen,
    server: JoinHandle<()>,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/:instance/:mode/query", get(query))
            .with_state(Arc::clone(&seen));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, seen, server }
    }

    /// Base URL of one simulated instance (trailing slash included)
    pub fn instance(&self, name: &str) -> String {
        format!("http://{}/{}/", self.addr, name)
    }

    /// Query parameters of every request received so far
    pub fn seen(&self) -> Vec<HashMap<String, String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn query(
    State(seen): State<Seen>,
    Path((instance, mode)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    seen.lock().unwrap().push(params.clone());

    match instance.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "index offline").into_response(),
        "garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ if mode == "docs" => Json(envelope(vec![
            document_record("First paper", "https://hal.test/doc-1"),
            document_record("Second paper", "https://hal.test/doc-2"),
        ]))
        .into_response(),
        _ => {
            let hits: usize = params.get("hits").and_then(|h| h.parse().ok()).unwrap_or(3);
            let metric = params.get("rank_metric").cloned().unwrap_or_default();
            let records = (0..hits)
                .map(|i| author_record(&format!("{} author {}", metric, i), &format!("id-{}", i)))
                .collect();
            Json(envelope(records)).into_response()
        }
    }
}

//! Local stand-in for the Ollama HTTP API, served on an ephemeral port.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;

/// What the server answers to every request.
#[derive(Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
    /// 200 with a chunked body, one frame per entry.
    Chunks(Vec<String>),
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub body: Value,
    pub authorization: Option<String>,
}

type Shared = (Reply, Arc<Mutex<Vec<SeenRequest>>>);

pub struct MockOllama {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockOllama {
    /// Serve `reply` on `POST path` until the test runtime shuts down.
    pub async fn serve(path: &str, reply: Reply) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(path, post(handle))
            .with_state((reply, seen.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

async fn handle(
    State((reply, seen)): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    seen.lock().unwrap().push(SeenRequest {
        body,
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    match reply {
        Reply::Json(status, value) => (status, Json(value)).into_response(),
        Reply::Text(status, text) => (status, text).into_response(),
        Reply::Chunks(chunks) => {
            let frames = futures_util::stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
            Response::builder()
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(Body::from_stream(frames))
                .unwrap()
        }
    }
}

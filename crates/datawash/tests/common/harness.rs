//! In-process stand-in for the cleaning service.
//!
//! Runs a real HTTP and WebSocket server on an ephemeral loopback port so
//! tests exercise the production transports end to end. Each test hands
//! the service a `ServiceScript` describing what to serve.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use datawash::Endpoints;

/// What the mock service serves for one test.
#[derive(Clone)]
pub struct ServiceScript {
    /// Job id returned by the upload endpoint.
    pub job_id: String,
    /// Whether the upload endpoint succeeds.
    pub upload_ok: bool,
    /// Whether the WebSocket endpoint accepts upgrades at all.
    pub push_enabled: bool,
    /// Frames pushed over the WebSocket after accept, in order. The
    /// socket closes once they are exhausted.
    pub push_frames: Vec<String>,
    /// Replies for successive status pulls; the last one repeats. An
    /// empty list serves 500 on every pull.
    pub status_replies: Vec<StatusReply>,
    /// Body of the report download.
    pub report_body: String,
}

#[derive(Clone)]
pub enum StatusReply {
    /// 200 with the given JSON body.
    Body(String),
    /// A bare status code.
    Error(u16),
}

impl Default for ServiceScript {
    fn default() -> Self {
        Self {
            job_id: "job-42".to_string(),
            upload_ok: true,
            push_enabled: true,
            push_frames: Vec::new(),
            status_replies: Vec::new(),
            report_body: "Quality report for job-42\n".to_string(),
        }
    }
}

struct ServiceState {
    script: ServiceScript,
    upload_calls: AtomicUsize,
    process_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

/// Scripted cleaning service bound to an ephemeral port.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<ServiceState>,
    server: JoinHandle<()>,
}

impl MockService {
    pub async fn start(script: ServiceScript) -> Self {
        let state = Arc::new(ServiceState {
            script,
            upload_calls: AtomicUsize::new(0),
            process_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/v1/upload", post(upload))
            .route("/api/v1/process/:job_id", post(process_job))
            .route("/api/v1/status/:job_id", get(job_status))
            .route("/api/v1/ws/:job_id", get(push_socket))
            .route("/api/v1/download/:job_id/:artifact", get(download))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock service");
        let addr = listener.local_addr().expect("mock service address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Endpoints pointing at this instance.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            &format!("http://{}/api/v1", self.addr),
            &format!("ws://{}/api/v1", self.addr),
        )
        .expect("mock endpoints")
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    pub fn process_calls(&self) -> usize {
        self.state.process_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.state.status_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn upload(State(state): State<Arc<ServiceState>>) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    if state.script.upload_ok {
        Json(json!({ "job_id": state.script.job_id })).into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

async fn process_job(
    Path(_job_id): Path<String>,
    State(state): State<Arc<ServiceState>>,
) -> Response {
    state.process_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK.into_response()
}

async fn job_status(
    Path(_job_id): Path<String>,
    State(state): State<Arc<ServiceState>>,
) -> Response {
    let call = state.status_calls.fetch_add(1, Ordering::SeqCst);
    if state.script.status_replies.is_empty() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let idx = call.min(state.script.status_replies.len() - 1);
    match &state.script.status_replies[idx] {
        StatusReply::Body(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        StatusReply::Error(code) => StatusCode::from_u16(*code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

async fn push_socket(
    ws: WebSocketUpgrade,
    Path(_job_id): Path<String>,
    State(state): State<Arc<ServiceState>>,
) -> Response {
    if !state.script.push_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    ws.on_upgrade(move |socket| stream_frames(socket, state))
}

async fn stream_frames(mut socket: WebSocket, state: Arc<ServiceState>) {
    for frame in &state.script.push_frames {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn download(
    Path((_job_id, artifact)): Path<(String, String)>,
    State(state): State<Arc<ServiceState>>,
) -> Response {
    match artifact.as_str() {
        "report" => (StatusCode::OK, state.script.report_body.clone()).into_response(),
        "csv" => (StatusCode::OK, "name,age\nalice,34\n".to_string()).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Writes a small CSV into the given temp directory and returns its path.
pub fn write_csv_fixture(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "name,age\nalice,34\nbob,\n").expect("write csv fixture");
    path
}

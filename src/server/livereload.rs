//! LiveReload server (protocol 7)
//!
//! Browsers load `/livereload.js`, open a WebSocket on `/livereload` and
//! greet with `hello`. Every change pushed through [`LiveReload::changed`]
//! or the `/changed` endpoints reaches all connected browsers as a `reload`
//! command.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Protocol identifier exchanged in the `hello` handshake.
pub const PROTOCOL_7: &str = "http://livereload.com/protocols/official-7";

/// Port browsers expect the LiveReload server on.
pub const DEFAULT_PORT: u16 = 35729;

/// Browser client served at `/livereload.js`.
pub const CLIENT_SCRIPT: &str = include_str!("livereload.js");

/// Pending changes a slow client may fall behind by before it misses some.
const CHANNEL_CAPACITY: usize = 64;

/// Handle for pushing changes to connected browsers.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<String>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Number of connected browsers.
    pub fn clients(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Notify every connected browser that `files` changed.
    ///
    /// Returns the number of browsers that received the notification.
    pub fn changed<S: AsRef<str>>(&self, files: &[S]) -> usize {
        let mut clients = 0;
        for file in files {
            // send only fails when nobody is listening
            clients = self.tx.send(file.as_ref().to_string()).unwrap_or(0);
        }
        tracing::debug!(files = files.len(), clients, "live reload notified");
        clients
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Message pushed to browsers when a file changed.
#[derive(Debug, Serialize)]
pub struct ReloadCommand<'a> {
    command: &'static str,
    path: &'a str,
    #[serde(rename = "liveCSS")]
    live_css: bool,
}

impl<'a> ReloadCommand<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { command: "reload", path, live_css: true }
    }
}

#[derive(Debug, Deserialize)]
struct ClientCommand {
    command: String,
    #[serde(default)]
    protocols: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HelloReply {
    command: &'static str,
    protocols: [&'static str; 1],
    #[serde(rename = "serverName")]
    server_name: &'static str,
}

/// Reply to a client message, if it needs one.
fn reply_to(text: &str) -> Option<String> {
    let message: ClientCommand = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!("ignoring malformed live reload message: {}", e);
            return None;
        }
    };

    match message.command.as_str() {
        "hello" => {
            if !message.protocols.is_empty() && !message.protocols.iter().any(|p| p == PROTOCOL_7) {
                tracing::warn!("live reload client does not speak protocol 7");
            }
            let hello = HelloReply {
                command: "hello",
                protocols: [PROTOCOL_7],
                server_name: env!("CARGO_PKG_NAME"),
            };
            serde_json::to_string(&hello).ok()
        }
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ChangedQuery {
    #[serde(default)]
    files: String,
}

/// Body accepted by `POST /changed`.
#[derive(Debug, Deserialize)]
pub struct ChangedBody {
    #[serde(default)]
    pub files: Vec<String>,
}

/// Response of both `/changed` endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangedResponse {
    pub clients: usize,
    pub files: Vec<String>,
}

/// Router for the LiveReload server.
pub fn livereload_router(livereload: LiveReload) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/livereload.js", get(client_script))
        .route("/livereload", get(ws_upgrade))
        .route("/changed", get(changed_get).post(changed_post))
        .with_state(livereload)
}

async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({ "tinylr": "Welcome", "version": env!("CARGO_PKG_VERSION") }))
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], CLIENT_SCRIPT)
}

fn notify(livereload: &LiveReload, files: Vec<String>) -> Json<ChangedResponse> {
    let files: Vec<String> =
        files.into_iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect();
    for file in &files {
        tracing::info!("... Reload {}", file);
    }
    livereload.changed(&files);
    Json(ChangedResponse { clients: livereload.clients(), files })
}

async fn changed_get(
    State(livereload): State<LiveReload>,
    Query(query): Query<ChangedQuery>,
) -> Json<ChangedResponse> {
    notify(&livereload, query.files.split(',').map(str::to_string).collect())
}

async fn changed_post(
    State(livereload): State<LiveReload>,
    Json(body): Json<ChangedBody>,
) -> Json<ChangedResponse> {
    notify(&livereload, body.files)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(livereload): State<LiveReload>) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no change is lost in between.
    let rx = livereload.subscribe();
    tracing::debug!("live reload client connected");
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = reply_to(&text) {
                        if sink.send(Message::Text(reply)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            change = rx.recv() => match change {
                Ok(path) => {
                    let Ok(json) = serde_json::to_string(&ReloadCommand::new(&path)) else {
                        continue;
                    };
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "live reload client fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let _ = sink.close().await;
    tracing::debug!("live reload client disconnected");
}

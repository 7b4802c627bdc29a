//! Static file server for the source tree
//!
//! Serves files with `tower-http`'s `ServeDir` and rewrites HTML responses so
//! every page loads the LiveReload client.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;

/// Largest HTML page the injector buffers.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

/// Script tag that loads the LiveReload client from the page's own host.
pub fn snippet(livereload_port: u16) -> String {
    format!(
        "<script>document.write('<script src=\"//' + (location.hostname || 'localhost') + ':{}/livereload.js?snipver=1\"><\\/script>')</script>",
        livereload_port
    )
}

/// Insert `snippet` before the last `</body>`, or append it when the page
/// has none.
pub fn inject_snippet(html: &str, snippet: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let position = html.to_ascii_lowercase().rfind("</body>");
    match position {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..pos]);
            out.push_str(snippet);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{}{}", html, snippet),
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

async fn inject_livereload(State(port): State<u16>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_snippet(&String::from_utf8_lossy(&bytes), &snippet(port));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::ETAG);
    parts.headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Response::from_parts(parts, Body::from(html))
}

/// Router serving `root`, with `index.html` for directories and the
/// LiveReload snippet in every HTML page.
pub fn static_router(root: &Path, livereload_port: u16) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root).append_index_html_on_directories(true))
        .layer(middleware::from_fn_with_state(livereload_port, inject_livereload))
}

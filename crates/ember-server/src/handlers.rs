//! HTTP handlers for the ember relay.
//!
//! This module maps the hub's verbs onto routes and its reply shapes onto
//! HTTP responses. Every verb is mounted GET-only, so axum answers other
//! methods with 405. Query parsing is deliberately lenient: missing or
//! malformed parameters fall back to their defaults, they never 400.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use ember_core::{
    CloseReply, Hub, PubReply, SignReply, SubReply, SubRequest, TOO_MANY_CHANNELS_BODY,
};
use ember_protocol::DEFAULT_JSONP_CALLBACK;

use crate::config::Config;
use crate::metrics;
use crate::sink::StreamSink;
use crate::sweeper;

const TEXT_JAVASCRIPT: &str = "text/javascript; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Shared server state.
pub struct AppState {
    /// The hub; every state transition happens under this lock, and no
    /// handler awaits while holding it.
    pub hub: Mutex<Hub>,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            hub: Mutex::new(Hub::new(config.hub_config())),
            config,
        }
    }
}

/// Run the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    sweeper::spawn(state.clone());

    let app = router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("ember server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sub", get(sub_handler))
        .route("/pub", get(pub_handler))
        .route("/sign", get(sign_handler))
        .route("/close", get(close_handler))
        .route("/ping", get(ping_handler))
        .route("/info", get(info_handler))
        .route("/check", get(check_handler))
        .route("/psub", get(psub_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

type Params = HashMap<String, String>;

fn get_str<'a>(params: &'a Params, name: &str, default: &'a str) -> &'a str {
    params.get(name).map_or(default, String::as_str)
}

fn get_u32(params: &Params, name: &str, default: u32) -> u32 {
    params
        .get(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_i32(params: &Params, name: &str, default: i32) -> i32 {
    params
        .get(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Long-poll response headers: javascript, keep-alive, uncacheable.
fn no_cache(body: impl IntoResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, TEXT_JAVASCRIPT),
            (header::CONNECTION, "keep-alive"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        body,
    )
        .into_response()
}

fn javascript(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_JAVASCRIPT)], body).into_response()
}

fn html(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_HTML)], body).into_response()
}

fn not_found(body: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, TEXT_HTML)],
        body,
    )
        .into_response()
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `ping` handler.
async fn ping_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cb = get_str(&params, "cb", DEFAULT_JSONP_CALLBACK);
    no_cache(state.hub.lock().ping(cb))
}

/// `sub` handler: backlog replies return at once, fresh polls park.
async fn sub_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let request = SubRequest {
        cname: get_str(&params, "cname", "").to_string(),
        seq: get_u32(&params, "seq", 0),
        noop: get_u32(&params, "noop", 0),
        cb: get_str(&params, "cb", DEFAULT_JSONP_CALLBACK).to_string(),
        token: get_str(&params, "token", "").to_string(),
    };
    metrics::record_poll();

    let (sink, rx) = StreamSink::new();
    let reply = state.hub.lock().sub(request, sink.clone());
    match reply {
        SubReply::Done(body) => no_cache(body),
        SubReply::TooManyChannels => {
            metrics::record_error("too_many_channels");
            not_found(TOO_MANY_CHANNELS_BODY.to_string())
        }
        SubReply::Parked(id) => {
            let watcher = state.clone();
            tokio::spawn(async move {
                if sink.wait_disconnected().await {
                    debug!("subscriber disconnected");
                    watcher.hub.lock().sub_end(id);
                }
            });
            no_cache(StreamSink::body(rx))
        }
    }
}

/// `pub` handler.
async fn pub_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cname = get_str(&params, "cname", "");
    let content = get_str(&params, "content", "");
    let cb = params.get("cb").map(String::as_str);

    let reply = state.hub.lock().publish(cname, content, cb);
    match reply {
        PubReply::Ok(body) => {
            metrics::record_publish();
            javascript(body)
        }
        PubReply::NotConnected(body) => {
            metrics::record_error("not_connected");
            not_found(body)
        }
    }
}

/// `sign` handler.
async fn sign_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cname = get_str(&params, "cname", "");
    let expires = get_i32(&params, "expires", -1);
    let cb = params.get("cb").map(String::as_str);

    let reply = state.hub.lock().sign(cname, expires, cb);
    match reply {
        SignReply::Ok(body) => html(body),
        SignReply::TooManyChannels => {
            metrics::record_error("too_many_channels");
            not_found(TOO_MANY_CHANNELS_BODY.to_string())
        }
    }
}

/// `close` handler.
async fn close_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cname = get_str(&params, "cname", "");

    let reply = state.hub.lock().close(cname);
    match reply {
        CloseReply::Ok(body) => html(body),
        CloseReply::NotFound(body) => {
            metrics::record_error("not_connected");
            not_found(body)
        }
    }
}

/// `info` handler.
async fn info_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cname = get_str(&params, "cname", "");
    html(state.hub.lock().info(cname))
}

/// `check` handler.
async fn check_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Response {
    let cname = get_str(&params, "cname", "");
    html(state.hub.lock().check(cname))
}

/// `psub` handler: park a presence subscriber for the channel
/// online/offline stream.
async fn psub_handler(State(state): State<Arc<AppState>>) -> Response {
    let (sink, rx) = StreamSink::new();
    let id = state.hub.lock().psub(sink.clone());

    let watcher = state.clone();
    tokio::spawn(async move {
        // presence subscribers are only ever released by disconnect
        sink.wait_disconnected().await;
        debug!("presence subscriber disconnected");
        watcher.hub.lock().psub_end(id);
    });

    no_cache(StreamSink::body(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_str_defaults() {
        let p = params(&[("cb", "jsonp")]);
        assert_eq!(get_str(&p, "cb", DEFAULT_JSONP_CALLBACK), "jsonp");
        assert_eq!(get_str(&p, "cname", ""), "");
    }

    #[test]
    fn test_get_int_lenient() {
        let p = params(&[("seq", "42"), ("noop", "junk")]);
        assert_eq!(get_u32(&p, "seq", 0), 42);
        assert_eq!(get_u32(&p, "noop", 0), 0);
        assert_eq!(get_u32(&p, "missing", 7), 7);
        assert_eq!(get_i32(&p, "expires", -1), -1);
    }
}

//! WebSocket transport server using Axum.
//!
//! Handles the HTTP upgrade to WebSocket, spawns the single writer task for
//! each connection, and hands the connection to a [`SessionHandler`]. Also
//! serves the small HTTP surface (liveness, health, greeting) behind CORS.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{
    SinkExt, StreamExt, future,
    stream::{SplitSink, SplitStream},
};
use relay_protocol::WireFormat;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use crate::connection::{
    ConnectionHandle, DEFAULT_OUTBOUND_CAPACITY, InboundFrames, Outbound, OutboundReceiver,
    TransportError,
};

/// Trait implemented by the chat server to drive one connection.
///
/// The transport calls this once per upgraded socket and keeps the
/// connection open until the returned future completes.
pub trait SessionHandler: Send + Sync + 'static {
    /// Run a whole session: admission, message loop, departure.
    ///
    /// `username` is the raw `username` query parameter of the upgrade
    /// request. `inbound` ends when the peer closes the socket.
    fn run_session(
        &self,
        username: Option<String>,
        handle: ConnectionHandle,
        inbound: InboundFrames,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Origins allowed by CORS; `*` mirrors any origin. Empty disables CORS.
    pub allowed_origins: Vec<String>,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,
    /// Encoding of outbound frames
    pub wire_format: WireFormat,
    /// Enable verbose connection logging
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            hostname: "127.0.0.1".into(),
            allowed_origins: vec!["http://localhost:3000".into()],
            max_connections: None,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            wire_format: WireFormat::Text,
            verbose_logging: false,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: SessionHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    /// Open WebSocket count (for health check)
    client_count: Arc<AtomicUsize>,
}

/// Query parameter carrying the requested identity.
const USERNAME_PARAM: &str = "username";

/// Pick the requested identity out of the upgrade query.
///
/// A repeated parameter is not an upgrade failure; the last value wins so
/// every request reaches admission.
fn username_param(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .filter(|(key, _)| key == USERNAME_PARAM)
        .map(|(_, value)| value)
        .last()
}

/// One reserved slot in the open-connection count. Released on drop, so an
/// upgrade that never completes gives its slot back.
struct ConnectionSlot {
    count: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Reserve a slot, failing if `max` are already taken.
    fn acquire(count: &Arc<AtomicUsize>, max: Option<usize>) -> Option<Self> {
        count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match max {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .ok()?;
        Some(Self { count: count.clone() })
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The transport server — accepts connections and runs sessions.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
    client_count: Arc<AtomicUsize>,
}

impl TransportServer {
    /// Start the transport server with the given session handler.
    pub async fn start<H: SessionHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::start_shared(config, Arc::new(handler)).await
    }

    /// Start the transport server with a handler that is also held elsewhere.
    pub async fn start_shared<H: SessionHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let client_count = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            client_count: client_count.clone(),
        });

        let mut app = Router::new()
            .route("/", get(root_handler))
            .route("/api/hello", get(hello_handler))
            .route("/health", get(health_handler::<H>))
            .route("/ws", get(ws_upgrade_handler::<H>))
            .with_state(state);

        if let Some(cors) = cors_layer(&config.allowed_origins) {
            app = app.layer(cors);
        }

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Chat relay listening on ws://{}:{}/ws", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
            client_count,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of currently open WebSocket connections.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Chat relay transport stopped");
    }
}

/// Build the CORS layer for the configured origins.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|o| o == "*") {
        // A literal wildcard is not allowed together with credentials.
        AllowOrigin::mirror_request()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {o}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: SessionHandler>(
    ws: WebSocketUpgrade,
    Query(params): Query<Vec<(String, String)>>,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    // Check and reserve in one step so concurrent upgrades cannot overshoot.
    let Some(slot) = ConnectionSlot::acquire(&state.client_count, state.config.max_connections)
    else {
        warn!(
            "Connection rejected: max connections reached ({})",
            state.config.max_connections.unwrap_or_default()
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let username = username_param(params);
    ws.on_upgrade(move |socket| handle_ws_connection(socket, username, state, slot))
        .into_response()
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Chat backend is running!" }))
}

async fn hello_handler() -> impl IntoResponse {
    Json(json!({ "data": { "hello": "Hello from Chat Backend!" } }))
}

async fn health_handler<H: SessionHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection<H: SessionHandler>(
    socket: WebSocket,
    username: Option<String>,
    state: Arc<AppState<H>>,
    slot: ConnectionSlot,
) {
    let total = slot.current();

    let client_id = uuid::Uuid::new_v4().to_string();
    if state.config.verbose_logging {
        info!("Client connected: {client_id} (username: {username:?}, total: {total})");
    } else {
        debug!("Client connected: {client_id}");
    }

    let (ws_tx, ws_rx) = socket.split();
    let (handle, outbound_rx) =
        ConnectionHandle::channel(client_id.clone(), state.config.outbound_capacity);

    let writer = tokio::spawn(run_writer(
        ws_tx,
        outbound_rx,
        state.config.wire_format,
        client_id.clone(),
    ));

    let inbound = inbound_frames(ws_rx, client_id.clone());
    state.handler.run_session(username, handle.clone(), inbound).await;

    // Idempotent; covers handlers that return without closing.
    handle.close().await;
    drop(handle);
    if let Err(e) = writer.await {
        warn!("Writer task for {client_id} failed: {e}");
    }

    drop(slot);
    debug!(
        "Client disconnected: {client_id} (total: {})",
        state.client_count.load(Ordering::Acquire)
    );
}

/// Drain one connection's outbound queue into its socket.
///
/// This is the only code that writes to the socket.
async fn run_writer(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: OutboundReceiver,
    format: WireFormat,
    client_id: String,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Notify(notification) => {
                let text = format.render(&notification);
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    debug!("Write to {client_id} failed: {e}");
                    break;
                }
            }
            Outbound::Close => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
    // Refuse further sends so routers see the connection as gone.
    rx.close();
}

/// Adapt the socket's read half into a stream of text frames.
fn inbound_frames(ws_rx: SplitStream<WebSocket>, client_id: String) -> InboundFrames {
    ws_rx
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(move |msg| {
            let frame = match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(_)) => {
                    debug!("Ignoring binary frame from {client_id}");
                    None
                }
                // Ping/pong are answered by the socket itself.
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
            };
            future::ready(frame)
        })
        .boxed()
}

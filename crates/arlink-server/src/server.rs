use std::net::IpAddr;
use std::sync::Arc;

use arlink_core::TelemetryMessage;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::client::ClientRegistry;
use crate::{dispatch, netinfo};

/// Server configuration.
pub struct ServerConfig {
    /// Listening port on all interfaces. 0 picks a random free port.
    pub port: u16,
    /// Capacity of the in-process telemetry broadcast channel.
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            event_capacity: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    pub events: broadcast::Sender<TelemetryMessage>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ClientRegistry::new());
    let (events, _) = broadcast::channel::<TelemetryMessage>(config.event_capacity);

    let state = AppState {
        registry: Arc::clone(&registry),
        events: events.clone(),
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    let port = listener.local_addr()?.port();
    let local_ip = netinfo::local_ip();

    tracing::info!("Telemetry server started at ws://0.0.0.0:{port}/ws");
    tracing::info!("Reachable on the local network at ws://{local_ip}:{port}/ws");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port,
        local_ip,
        registry,
        events,
        _server: server,
    })
}

/// Handle returned by [`start`]. Dropping it leaves the server task running;
/// call [`ServerHandle::shutdown`] to stop accepting connections.
pub struct ServerHandle {
    pub port: u16,
    pub local_ip: IpAddr,
    pub registry: Arc<ClientRegistry>,
    events: broadcast::Sender<TelemetryMessage>,
    _server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Subscribe to decoded telemetry messages.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.events.subscribe()
    }

    /// Stop the accept loop. In-flight connection tasks observe channel
    /// closure and unwind through their normal disconnect path.
    pub fn shutdown(self) {
        self._server.abort();
        tracing::info!("Server stopped");
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection task: register, consume frames until the channel closes
/// or errors, then unregister. Nothing is ever written back to the peer.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = state.registry.register();

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            WsMessage::Text(text) => {
                if let Some(decoded) = dispatch::handle_message(&client_id, text.as_str()) {
                    // No subscribers is fine; the log line is the product.
                    let _ = state.events.send(decoded);
                }
            }
            WsMessage::Close(_) => break,
            // axum answers pings automatically; binary frames are not part
            // of the protocol and are ignored.
            _ => {}
        }
    }

    state.registry.unregister(&client_id);
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "clients": state.registry.count(),
    }))
}

//! Reload websocket server.
//!
//! Serves two routes on the hot reload port:
//! - `GET /ws` upgrades to a websocket and hands it to the broadcaster
//! - `GET /__kiln_reload__.js` serves the browser client performing the handshake

use crate::dev::{ReloadBroadcaster, ReloadTransport};
use crate::error::{CliError, Result, TransportError};
use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Path of the reload websocket endpoint.
pub const WS_PATH: &str = "/ws";

/// Path of the browser reload client.
pub const CLIENT_SCRIPT_PATH: &str = "/__kiln_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

#[async_trait]
impl ReloadTransport for WebSocket {
    async fn recv_text(&mut self) -> std::result::Result<Option<String>, TransportError> {
        loop {
            let message = match self.recv().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
                None => return Ok(None),
            };

            match message {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Message::Close(_) => return Ok(None),
                // Ping/pong are answered by axum
                _ => {}
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> std::result::Result<(), TransportError> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}

/// Websocket server feeding connections into a [`ReloadBroadcaster`].
#[derive(Debug)]
pub struct ReloadServer {
    listener: TcpListener,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl ReloadServer {
    /// Bind the server without accepting connections yet.
    ///
    /// # Errors
    ///
    /// Returns error if the address is in use or cannot be bound
    pub async fn bind(addr: SocketAddr, broadcaster: Arc<ReloadBroadcaster>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            broadcaster,
        })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the axum router with all routes.
    pub fn router(broadcaster: Arc<ReloadBroadcaster>) -> Router {
        Router::new()
            .route(WS_PATH, get(handle_ws))
            .route(CLIENT_SCRIPT_PATH, get(handle_reload_script))
            .layer(
                // Pages are served from another port
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(broadcaster)
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!("Reload server listening on ws://{}{}", addr, WS_PATH);

        axum::serve(self.listener, Self::router(self.broadcaster))
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// Upgrade and hand the socket to the broadcaster.
async fn handle_ws(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Arc<ReloadBroadcaster>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        broadcaster.accept_connection(socket).await;
    })
}

/// Serve the reload client script.
async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_script_speaks_protocol() {
        assert!(RELOAD_SCRIPT.contains("socket.send(route)"));
        assert!(RELOAD_SCRIPT.contains(r#""Connected""#));
        assert!(RELOAD_SCRIPT.contains(r#""reload""#));
        assert!(RELOAD_SCRIPT.contains("/ws"));
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let server = ReloadServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), broadcaster)
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_server_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = ReloadServer::bind(addr, Arc::new(ReloadBroadcaster::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Server(_)));
    }
}

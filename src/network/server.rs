//! WebSocket relay server
//!
//! Binds first, serves second, so callers (and tests) can bind port 0 and
//! read the resolved address before any peer connects.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use crate::error::{NetworkError, Result};
use crate::network::hub::HubHandle;
use crate::network::session;

struct AppState {
    hub: HubHandle,
}

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Live relay state reported by `/status`
#[derive(serde::Serialize)]
pub struct RelayStatus {
    pub peers: usize,
}

/// The relay's HTTP/WebSocket front
pub struct RelayServer {
    listener: TcpListener,
    app: Router,
}

impl RelayServer {
    /// Bind the listener and assemble the routes
    pub async fn bind(addr: &str, hub: HubHandle) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| NetworkError::BindFailed(format!("{addr}: {e}")))?;

        let state = Arc::new(AppState { hub });
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/status", get(status))
            .route("/", get(index))
            .with_state(state);

        Ok(Self { listener, app })
    }

    /// The address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until the process is shut down
    pub async fn serve(self) -> Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "relay server listening");
        axum::serve(
            self.listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| session::handle_socket(socket, addr, hub))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<RelayStatus>> {
    let peers = state.hub.peer_count().await;
    Json(ApiResponse::ok(RelayStatus { peers }))
}

async fn index() -> &'static str {
    "audio relay is running"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_payload_shape() {
        let body = serde_json::to_string(&ApiResponse::ok(RelayStatus { peers: 2 })).unwrap();
        assert_eq!(body, r#"{"success":true,"data":{"peers":2}}"#);
    }
}

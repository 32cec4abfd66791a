//! Server-side peer connection loop
//!
//! Each upgraded connection runs two directions concurrently: inbound frames
//! become hub broadcasts, outbound frames drain the peer's mailbox into the
//! socket. Either direction ending tears the other down; a peer is never
//! left half-connected.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use crate::network::hub::HubHandle;
use crate::network::peer::Peer;

/// Drive one upgraded connection until it ends, then unregister the peer
pub async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: HubHandle) {
    let peer = Arc::new(Peer::new());
    let peer_id = peer.id();
    tracing::info!(peer = %peer_id, %addr, "peer connected");

    hub.register(peer.clone()).await;

    let (ws_tx, ws_rx) = socket.split();

    let mut outbound = tokio::spawn(run_outbound(peer.clone(), ws_tx));
    let mut inbound = tokio::spawn(run_inbound(peer, ws_rx, hub.clone()));

    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }

    // Harmless if the hub already evicted this peer.
    hub.unregister(peer_id).await;
    tracing::info!(peer = %peer_id, %addr, "peer disconnected");
}

/// Mailbox -> transport. Ends on write failure or when the mailbox closes.
async fn run_outbound(peer: Arc<Peer>, mut ws_tx: SplitSink<WebSocket, Message>) {
    while let Some(frame) = peer.mailbox().pop().await {
        if ws_tx.send(Message::Binary(frame.to_vec())).await.is_err() {
            break;
        }
    }
}

/// Transport -> hub broadcast. Only binary messages carry audio; a read
/// failure ends the direction without touching any other peer.
async fn run_inbound(peer: Arc<Peer>, mut ws_rx: SplitStream<WebSocket>, hub: HubHandle) {
    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                hub.broadcast(peer.id(), Bytes::from(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(peer = %peer.id(), "read error: {e}");
                break;
            }
        }
    }
}

//! Client connection loops: capture out, relayed audio in
//!
//! The session runs two directions against one dialed socket. Transport
//! failure tears the session down without retrying and without propagating
//! into the audio pipeline; capture and playback keep running locally.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::AudioPlayback;
use crate::codec;
use crate::error::{NetworkError, Result};
use crate::queue::SharedQueue;

/// A dialed relay connection
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the relay. Failing here means the process never reaches streaming
/// state, so callers treat the error as fatal.
pub async fn connect(url: &str) -> Result<WsStream> {
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|e| NetworkError::ConnectionFailed(format!("{url}: {e}")))?;
    tracing::info!(%url, "connected to relay");
    Ok(socket)
}

/// Stream until the capture queue closes, the server hangs up, or either
/// direction fails. Session errors are logged and end the session; they are
/// never retried and never reach the audio pipeline.
pub async fn stream(
    socket: WsStream,
    capture_queue: SharedQueue<Vec<i16>>,
    playback: &AudioPlayback,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let send_loop = async {
        while let Some(samples) = capture_queue.pop().await {
            let frame = codec::encode(&samples);
            if let Err(e) = ws_tx.send(Message::Binary(frame.to_vec())).await {
                return Err(NetworkError::SendFailed(e.to_string()));
            }
        }
        // Capture queue closed: local shutdown, not an error.
        Ok(())
    };

    let recv_loop = async {
        while let Some(message) = ws_rx.next().await {
            match message {
                Ok(Message::Binary(data)) => {
                    playback.write(&codec::decode(&data));
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => return Err(NetworkError::ReceiveFailed(e.to_string())),
            }
        }
        Ok(())
    };

    tokio::select! {
        result = send_loop => {
            if let Err(e) = result {
                tracing::warn!("session ended: {e}");
            }
        }
        result = recv_loop => {
            if let Err(e) = result {
                tracing::warn!("session ended: {e}");
            }
        }
    }
}

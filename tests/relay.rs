//! End-to-end fan-out over a real socket

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use audio_relay::network::client::WsStream;
use audio_relay::network::{HubHandle, RelayHub, RelayServer};

async fn start_relay() -> (String, HubHandle) {
    let (hub, _task) = RelayHub::spawn();
    let server = RelayServer::bind("127.0.0.1:0", hub.clone())
        .await
        .expect("bind");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.serve());
    (format!("ws://{addr}/ws"), hub)
}

async fn wait_for_peers(hub: &HubHandle, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.peer_count().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peers did not settle in time");
}

async fn next_binary(ws: &mut WsStream) -> Vec<u8> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Binary(data))) => return data,
                Some(Ok(_)) => {}
                other => panic!("connection ended early: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

#[tokio::test]
async fn broadcast_reaches_everyone_but_the_sender() {
    let (url, hub) = start_relay().await;

    let (mut a, _) = connect_async(&url).await.expect("connect a");
    let (mut b, _) = connect_async(&url).await.expect("connect b");
    let (mut c, _) = connect_async(&url).await.expect("connect c");
    wait_for_peers(&hub, 3).await;

    a.send(Message::Binary(vec![0x01, 0x02, 0x03, 0x04]))
        .await
        .expect("send");

    assert_eq!(next_binary(&mut b).await, vec![0x01, 0x02, 0x03, 0x04]);
    assert_eq!(next_binary(&mut c).await, vec![0x01, 0x02, 0x03, 0x04]);

    // The sender never hears itself.
    let echo = tokio::time::timeout(Duration::from_millis(200), a.next()).await;
    assert!(echo.is_err(), "sender must not receive its own frame");
}

#[tokio::test]
async fn frames_arrive_in_send_order() {
    let (url, hub) = start_relay().await;

    let (mut sender, _) = connect_async(&url).await.expect("connect sender");
    let (mut receiver, _) = connect_async(&url).await.expect("connect receiver");
    wait_for_peers(&hub, 2).await;

    for i in 0..10u8 {
        sender
            .send(Message::Binary(vec![i, 0]))
            .await
            .expect("send");
    }

    for i in 0..10u8 {
        assert_eq!(next_binary(&mut receiver).await, vec![i, 0]);
    }
}

#[tokio::test]
async fn disconnect_unregisters_the_peer() {
    let (url, hub) = start_relay().await;

    let (a, _) = connect_async(&url).await.expect("connect a");
    let (_b, _) = connect_async(&url).await.expect("connect b");
    wait_for_peers(&hub, 2).await;

    drop(a);
    wait_for_peers(&hub, 1).await;
}

#[tokio::test]
async fn text_messages_carry_no_audio() {
    let (url, hub) = start_relay().await;

    let (mut a, _) = connect_async(&url).await.expect("connect a");
    let (mut b, _) = connect_async(&url).await.expect("connect b");
    wait_for_peers(&hub, 2).await;

    a.send(Message::Text("hello".into())).await.expect("send");
    a.send(Message::Binary(vec![0x05, 0x00]))
        .await
        .expect("send");

    // Only the binary frame comes through.
    assert_eq!(next_binary(&mut b).await, vec![0x05, 0x00]);
}

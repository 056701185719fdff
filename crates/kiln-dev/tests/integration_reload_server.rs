//! Integration tests for the reload websocket protocol.
//!
//! A real server is bound on an ephemeral port and driven with a
//! tokio-tungstenite client, the same way a browser would.

use futures::{SinkExt, StreamExt};
use kiln_dev::dev::{CLIENT_SCRIPT_PATH, ReloadBroadcaster, ReloadServer, WS_PATH};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (Arc<ReloadBroadcaster>, SocketAddr) {
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let server = ReloadServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), broadcaster.clone())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    (broadcaster, addr)
}

async fn connect(addr: SocketAddr, route: &str) -> Client {
    let (mut client, _) = connect_async(format!("ws://{}{}", addr, WS_PATH))
        .await
        .unwrap();
    client.send(Message::text(route)).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("Connected"));
    client
}

async fn next_text(client: &mut Client) -> Option<String> {
    let message = tokio::time::timeout(Duration::from_millis(500), client.next())
        .await
        .ok()??
        .ok()?;
    match message {
        Message::Text(text) => Some(text.as_str().to_owned()),
        _ => None,
    }
}

#[tokio::test]
async fn test_handshake_then_reload_only_for_subscribed_route() {
    let (broadcaster, addr) = start_server().await;
    let mut home = connect(addr, "/app/frontend/Home.tsx").await;
    let mut about = connect(addr, "/app/frontend/About.tsx").await;

    assert_eq!(broadcaster.subscriber_count("/app/frontend/Home.tsx"), 1);

    let delivered = broadcaster
        .broadcast([Path::new("/app/frontend/Home.tsx")])
        .await;
    assert_eq!(delivered, 1);

    assert_eq!(next_text(&mut home).await.as_deref(), Some("reload"));
    assert_eq!(next_text(&mut about).await, None);
}

#[tokio::test]
async fn test_binary_handshake_is_accepted() {
    let (broadcaster, addr) = start_server().await;
    let (mut client, _) = connect_async(format!("ws://{}{}", addr, WS_PATH))
        .await
        .unwrap();
    client
        .send(Message::binary(b"/app/frontend/Home.tsx".to_vec()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("Connected"));
    assert_eq!(broadcaster.subscriber_count("/app/frontend/Home.tsx"), 1);
}

#[tokio::test]
async fn test_closed_client_is_unsubscribed() {
    let (broadcaster, addr) = start_server().await;
    let mut client = connect(addr, "/app/frontend/Home.tsx").await;
    assert_eq!(broadcaster.client_count(), 1);

    client.close(None).await.unwrap();
    for _ in 0..50 {
        if broadcaster.client_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(broadcaster.client_count(), 0);
    assert_eq!(
        broadcaster
            .broadcast([Path::new("/app/frontend/Home.tsx")])
            .await,
        0
    );
}

#[tokio::test]
async fn test_reload_client_script_is_served() {
    let (_, addr) = start_server().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        CLIENT_SCRIPT_PATH, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("application/javascript"));
    assert!(response.contains("socket.send(route)"));
}

//! Shared fixtures: a host on 127.0.0.1:0 and protocol helpers.

use futures::{SinkExt, StreamExt};
use host_runtime::{build_router, HostConfig};
use serde_json::{json, Value as Json};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use subgraph_gateway::CompositionRouter;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub(crate) type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Interval between stream events in tests
pub(crate) const EVENT_INTERVAL: Duration = Duration::from_millis(40);

/// Upper bound for any single wait on the wire
pub(crate) const WIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn test_config(mocks: &[&str]) -> HostConfig {
    let mut config = HostConfig {
        hostname: "test-host".to_string(),
        mocks: mocks.iter().map(|m| m.to_string()).collect(),
        ..HostConfig::default()
    };
    config.gateway.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.gateway.http.port = 0;
    config.gateway.streaming.event_interval = EVENT_INTERVAL;
    config.gateway.shutdown.drain_grace = Duration::from_secs(1);
    config.gateway.shutdown.deadline = Duration::from_secs(3);
    config
}

/// Start the catalog host and return it with its bound address.
pub(crate) async fn start_host(mocks: &[&str]) -> (CompositionRouter, SocketAddr) {
    let mut router = build_router(&test_config(mocks)).unwrap();
    let addr = router.start().await.unwrap();
    (router, addr)
}

pub(crate) async fn post_query(addr: SocketAddr, subgraph: &str, query: &str) -> (u16, Json) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/{}/graphql", addr, subgraph))
        .json(&json!({ "query": query }))
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

pub(crate) async fn get_json(addr: SocketAddr, path: &str) -> (u16, Json) {
    let response = reqwest::get(format!("http://{}{}", addr, path)).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Open a `graphql-transport-ws` session on `subgraph` without initializing it.
pub(crate) async fn connect(addr: SocketAddr, subgraph: &str) -> Result<WsClient, tungstenite::Error> {
    let mut request = format!("ws://{}/{}/graphql", addr, subgraph).into_client_request()?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static("graphql-transport-ws"),
    );
    let (socket, _) = tokio_tungstenite::connect_async(request).await?;
    Ok(socket)
}

pub(crate) async fn send_json(socket: &mut WsClient, message: Json) {
    socket
        .send(Message::text(message.to_string()))
        .await
        .unwrap();
}

/// Next frame within [`WIRE_TIMEOUT`], `None` once the stream has ended.
pub(crate) async fn next_frame(socket: &mut WsClient) -> Option<Message> {
    tokio::time::timeout(WIRE_TIMEOUT, socket.next())
        .await
        .expect("timed out waiting for a frame")
        .map(|frame| frame.unwrap())
}

/// Next text frame parsed as JSON, skipping pings.
pub(crate) async fn next_json(socket: &mut WsClient) -> Json {
    loop {
        match next_frame(socket).await {
            Some(Message::Text(text)) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Message::Ping(_)) | Some(Message::Pong(_)) => continue,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }
}

/// Connect and complete `connection_init` / `connection_ack`.
pub(crate) async fn open_session(addr: SocketAddr, subgraph: &str) -> WsClient {
    let mut socket = connect(addr, subgraph).await.unwrap();
    send_json(&mut socket, json!({ "type": "connection_init" })).await;
    assert_eq!(next_json(&mut socket).await["type"], "connection_ack");
    socket
}

pub(crate) async fn subscribe(socket: &mut WsClient, id: &str, query: &str) {
    send_json(
        socket,
        json!({ "id": id, "type": "subscribe", "payload": { "query": query } }),
    )
    .await;
}

/// Payload `data` of the next `next` message for subscription `id`.
pub(crate) async fn next_data(socket: &mut WsClient, id: &str) -> Json {
    loop {
        let message = next_json(socket).await;
        if message["id"] != id {
            continue;
        }
        assert_eq!(message["type"], "next", "unexpected message {}", message);
        return message["payload"]["data"].clone();
    }
}

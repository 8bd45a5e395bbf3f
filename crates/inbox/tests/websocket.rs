//! `WebSocketTransport` against a local axum WebSocket endpoint.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::Response,
    routing::get,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use inbox::ManagerConfig;
use inbox::stream::{FrameTransport, InboundFrame, OutboundFrame, WebSocketTransport, decode_frame};
use inbox::NotificationId;

#[derive(Default)]
struct Server {
    cookie: Mutex<Option<String>>,
    received: Mutex<Vec<String>>,
}

async fn upgrade(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    *server.cookie.lock() = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    ws.on_upgrade(move |socket| session(socket, server))
}

async fn session(mut socket: WebSocket, server: Arc<Server>) {
    let hello = json!({"type": "unread_count", "count": 2}).to_string();
    if socket.send(Message::Text(hello.into())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Text(text) = message {
            server.received.lock().push(text.to_string());
            break;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn start() -> (Arc<Server>, ManagerConfig) {
    let server = Arc::new(Server::default());
    let router = Router::new()
        .route("/ws/notifications/", get(upgrade))
        .with_state(server.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server");
    });
    (server, ManagerConfig::new(format!("http://{addr}")))
}

#[tokio::test]
async fn test_round_trip_over_websocket() {
    let (server, config) = start().await;
    let url = config.stream_url().unwrap();
    assert_eq!(url.scheme(), "ws");

    let transport = WebSocketTransport::new(Some("sessionid=s1; csrftoken=tok".to_string()));
    let mut channel = transport.open(&url).await.expect("connected");

    let first = channel.next_text().await.expect("frame").expect("text");
    assert_eq!(decode_frame(&first).unwrap(), InboundFrame::UnreadCount(2));

    let frame = OutboundFrame::MarkRead {
        id: NotificationId::from("n1"),
    };
    channel.send_text(frame.encode().unwrap()).await.unwrap();

    // The server closes after the first client frame.
    assert!(channel.next_text().await.is_none());

    let received = server.received.lock().clone();
    let sent: Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(sent, json!({"type": "mark_read", "id": "n1"}));
    assert_eq!(
        server.cookie.lock().as_deref(),
        Some("sessionid=s1; csrftoken=tok")
    );
}

#[tokio::test]
async fn test_open_fails_without_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let config = ManagerConfig::new(format!("http://{}", listener.local_addr().unwrap()));
    drop(listener);

    let transport = WebSocketTransport::default();
    let result = transport.open(&config.stream_url().unwrap()).await;
    assert!(matches!(result, Err(inbox::NotificationError::Connection(_))));
}

//! WebSocket round-trip through the real client endpoint and event workers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use cb_domain::config::Config;
use cb_domain::{ClientId, OperatorId};
use cb_gateway::bootstrap::{build_app_state, spawn_background_tasks};
use cb_gateway::state::AppState;
use cb_gateway::transport::OperatorEvent;
use cb_protocol::WsMessage;

use common::RecordingOperators;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OP: i64 = 7;

struct Harness {
    addr: std::net::SocketAddr,
    state: AppState,
    operators: Arc<RecordingOperators>,
    operator_tx: tokio::sync::mpsc::Sender<OperatorEvent>,
}

async fn start() -> Harness {
    let mut config = Config::default();
    config.telegram.main_user_id = Some(OP);
    let operators = Arc::new(RecordingOperators::new(&[OP]));
    let (state, inbox) = build_app_state(Arc::new(config), operators.clone()).unwrap();
    let operator_tx = inbox.operator_tx.clone();
    spawn_background_tasks(&state, inbox);

    let app = cb_gateway::api::router(&state).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        addr,
        state,
        operators,
        operator_tx,
    }
}

async fn connect(addr: std::net::SocketAddr, query: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws{query}")).await.unwrap();
    socket
}

async fn next_frame(socket: &mut Socket) -> WsMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return WsMessage::from_text(&text).unwrap();
        }
    }
}

async fn send_frame(socket: &mut Socket, msg: &WsMessage) {
    socket
        .send(Message::Text(msg.to_text().unwrap()))
        .await
        .unwrap();
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

async fn welcome_id(socket: &mut Socket) -> ClientId {
    match next_frame(socket).await {
        WsMessage::Welcome { client_id } => client_id,
        other => panic!("expected welcome, got {other:?}"),
    }
}

#[tokio::test]
async fn dm_and_operator_reply_round_trip() {
    let h = start().await;
    let mut socket = connect(h.addr, "").await;
    let id = welcome_id(&mut socket).await;
    // Registration completes before the welcome frame goes out.
    assert!(h.state.router.sessions().is_active(&id));

    send_frame(
        &mut socket,
        &WsMessage::Command {
            command: "dm".into(),
            option: None,
            content: Some("copied text".into()),
            target_user_id: Some(OP),
        },
    )
    .await;
    assert_eq!(
        next_frame(&mut socket).await,
        WsMessage::CommandResult {
            response: "Message sent to the specified Telegram user".into()
        }
    );
    let notification = h.operators.last_to(OP).unwrap();
    assert_eq!(notification.action, Some(format!("reply:{id}")));

    h.operator_tx
        .send(OperatorEvent::Callback {
            operator: OperatorId(OP),
            data: format!("reply:{id}"),
            event_id: Some("cbq_1".into()),
        })
        .await
        .unwrap();
    h.operator_tx
        .send(OperatorEvent::Text {
            operator: OperatorId(OP),
            text: "pasted back".into(),
            event_id: Some("msg_7_2".into()),
        })
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut socket).await,
        WsMessage::Reply {
            response: "pasted back".into()
        }
    );

    socket.close(None).await.unwrap();
    wait_until(|| h.state.router.sessions().is_disconnected(&id)).await;
    assert!(h.state.clients.is_empty());
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let h = start().await;
    let mut socket = connect(h.addr, "").await;
    welcome_id(&mut socket).await;

    send_frame(&mut socket, &WsMessage::Ping { timestamp: 42 }).await;
    assert_eq!(next_frame(&mut socket).await, WsMessage::Pong { timestamp: 42 });
}

#[tokio::test]
async fn invalid_frame_gets_error_and_connection_survives() {
    let h = start().await;
    let mut socket = connect(h.addr, "").await;
    welcome_id(&mut socket).await;

    socket.send(Message::Text("not json".into())).await.unwrap();
    assert!(matches!(next_frame(&mut socket).await, WsMessage::Error { .. }));

    send_frame(&mut socket, &WsMessage::Ping { timestamp: 1 }).await;
    assert_eq!(next_frame(&mut socket).await, WsMessage::Pong { timestamp: 1 });
}

#[tokio::test]
async fn superseded_connection_close_keeps_session_active() {
    let h = start().await;
    let mut first = connect(h.addr, "?client_id=laptop").await;
    let id = welcome_id(&mut first).await;
    assert_eq!(id, ClientId::from("laptop"));

    let mut second = connect(h.addr, "?client_id=laptop").await;
    assert_eq!(welcome_id(&mut second).await, id);
    assert!(h.state.router.sessions().is_active(&id));

    first.close(None).await.unwrap();
    // Give the server time to process the close of the old socket.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.state.router.sessions().is_active(&id));
    assert_eq!(h.state.clients.len(), 1);

    second.close(None).await.unwrap();
    wait_until(|| h.state.router.sessions().is_disconnected(&id)).await;
}

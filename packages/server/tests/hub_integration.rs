//! Integration tests for the messaging hub.
//!
//! Each test starts the real axum router in-process on an ephemeral port and
//! drives it with WebSocket clients (tokio-tungstenite) and HTTP calls (reqwest).

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use gymates_hub_server::{
    infrastructure::auth::QueryParamAuthenticator,
    ui::{AppState, Server},
};
use gymates_hub_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// In-process hub bound to an ephemeral port
struct TestServer {
    port: u16,
    handle: JoinHandle<()>,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState::in_memory(Arc::new(QueryParamAuthenticator), Arc::new(SystemClock));
        let server = Server::new(state, None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = server.router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            port,
            handle,
            http: reqwest::Client::new(),
        }
    }

    fn ws_url(&self, user_id: &str) -> String {
        format!("ws://127.0.0.1:{}/ws?user_id={}", self.port, user_id)
    }

    fn api(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn create_chat(&self, chat_id: &str, members: &[&str]) {
        let response = self
            .http
            .post(self.api("/api/chats"))
            .json(&json!({"chat_id": chat_id, "members": members}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }

    async fn get_json(&self, path: &str) -> Value {
        self.http
            .get(self.api(path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Connect and consume the `connected` greeting
    async fn connect(&self, user_id: &str) -> TestClient {
        let (socket, _response) = connect_async(self.ws_url(user_id)).await.unwrap();
        let (sink, stream) = socket.split();
        let mut client = TestClient {
            sink,
            stream,
            next_ping: 0,
        };
        let greeting = client.next_frame().await;
        assert_eq!(greeting["type"], "connected");
        assert_eq!(greeting["user_id"], user_id);
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct TestClient {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
    next_ping: i64,
}

impl TestClient {
    async fn send(&mut self, frame: Value) {
        self.sink
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    /// Next text frame as JSON; `None` when the connection was closed
    async fn try_next_frame(&mut self) -> Option<Value> {
        loop {
            let message = tokio::time::timeout(FRAME_TIMEOUT, self.stream.next())
                .await
                .expect("timed out waiting for a frame");
            match message {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).unwrap());
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn next_frame(&mut self) -> Value {
        self.try_next_frame()
            .await
            .expect("connection closed while waiting for a frame")
    }

    /// Round-trip a ping so every frame sent before it has been dispatched.
    /// Returns the frames received before the matching pong.
    async fn sync(&mut self) -> Vec<Value> {
        self.next_ping += 1;
        let time = self.next_ping;
        self.send(json!({"type": "ping", "time": time})).await;

        let mut before = Vec::new();
        loop {
            let frame = self.next_frame().await;
            if frame["type"] == "pong" && frame["time"] == time {
                return before;
            }
            before.push(frame);
        }
    }

    /// Assert that nothing arrives for a short while
    async fn expect_silence(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(300), self.stream.next()).await;
        if let Ok(Some(Ok(Message::Text(text)))) = result {
            panic!("unexpected frame: {}", text.as_str());
        }
    }

    async fn close(mut self) {
        self.sink.send(Message::Close(None)).await.unwrap();
    }
}

#[tokio::test]
async fn test_chat_message_reaches_other_member_only() {
    // テスト項目: r1 に購読中の bob にだけ alice のメッセージが 1 通届く
    // given (前提条件):
    let server = TestServer::start().await;
    server.create_chat("r1", &["alice", "bob"]).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    alice.send(json!({"type": "join_chat", "chat_id": "r1"})).await;
    bob.send(json!({"type": "join_chat", "chat_id": "r1"})).await;
    let before = alice.sync().await;
    assert_eq!(before[0]["type"], "online_status");
    assert!(bob.sync().await.is_empty());

    // when (操作):
    alice
        .send(json!({"type": "message", "chat_id": "r1", "content": "leg day?"}))
        .await;

    // then (期待する結果):
    let message = bob.next_frame().await;
    assert_eq!(message["type"], "message");
    assert_eq!(message["chat_id"], "r1");
    assert_eq!(message["user_id"], "alice");
    assert_eq!(message["content"], "leg day?");
    assert!(message["message_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(alice.sync().await.is_empty());
    bob.expect_silence().await;

    let members = server.get_json("/api/rooms/r1/members").await;
    assert_eq!(members["members"], json!(["alice", "bob"]));
}

#[tokio::test]
async fn test_pings_are_answered_in_order() {
    // テスト項目: T1<T2<T3 の ping に、同じ順序で pong が返る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    for time in [100, 200, 300] {
        alice.send(json!({"type": "ping", "time": time})).await;
    }

    // then (期待する結果):
    for time in [100, 200, 300] {
        let pong = alice.next_frame().await;
        assert_eq!(pong, json!({"type": "pong", "time": time}));
    }
}

#[tokio::test]
async fn test_invite_to_offline_user_is_not_queued() {
    // テスト項目: オフラインの相手への招待は成功し、後から接続しても届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    alice
        .send(json!({"type": "video_call_invite", "data": {"callee_id": "bob"}}))
        .await;
    let replies = alice.sync().await;

    // then (期待する結果):
    assert!(replies.is_empty(), "caller is not told about delivery");
    let mut bob = server.connect("bob").await;
    bob.expect_silence().await;

    // セッションは残っているので、bob は応答できる
    bob.send(json!({"type": "video_call_accept", "data": {"caller_id": "alice"}}))
        .await;
    assert!(bob.sync().await.is_empty());
    let frames = alice.sync().await;
    assert!(frames.iter().any(|f| f["type"] == "video_call_accept"));
}

// ========================================
// テスト作業記録
// ========================================
// 【何をテストするか】
// - 通話中に切断すると、相手に video_call_end が 1 通だけ届き、オフライン通知が続く
// 【どのような状況を想定しているか】
// - alice → bob の招待、bob が応答、SDP offer を中継した後に alice が切断
// ========================================
#[tokio::test]
async fn test_disconnect_during_call_ends_it_once() {
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    alice.sync().await;

    alice
        .send(json!({"type": "video_call_invite", "data": {"callee_id": "bob", "call_type": "video"}}))
        .await;
    let invite = bob.next_frame().await;
    assert_eq!(invite["type"], "video_call_invite");
    assert_eq!(invite["user_id"], "alice");
    assert_eq!(invite["data"]["call_type"], "video");

    bob.send(json!({"type": "video_call_accept", "data": {"caller_id": "alice"}}))
        .await;
    assert_eq!(alice.next_frame().await["type"], "video_call_accept");

    alice
        .send(json!({"type": "sdp_offer", "data": {"other_user_id": "bob", "sdp": "v=0"}}))
        .await;
    let offer = bob.next_frame().await;
    assert_eq!(offer["type"], "sdp_offer");
    assert_eq!(offer["data"]["sdp"], "v=0");

    // when (操作):
    alice.close().await;

    // then (期待する結果):
    let end = bob.next_frame().await;
    assert_eq!(end["type"], "video_call_end");
    assert_eq!(end["user_id"], "alice");
    assert_eq!(end["data"]["reason"], "peer_disconnected");
    let presence = bob.next_frame().await;
    assert_eq!(presence["type"], "online_status");
    assert_eq!(presence["user_id"], "alice");
    assert_eq!(presence["is_online"], false);
    bob.expect_silence().await;

    // セッションは消えているので ICE の中継はエラーになる
    bob.send(json!({"type": "ice_candidate", "data": {"other_user_id": "alice", "candidate": "c"}}))
        .await;
    let error = bob.next_frame().await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "call_not_found");
}

#[tokio::test]
async fn test_claimed_user_id_is_overwritten() {
    // テスト項目: フレーム中の user_id を詐称しても、接続のユーザーが送信者になる
    // given (前提条件):
    let server = TestServer::start().await;
    server.create_chat("r1", &["alice", "bob", "carol"]).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    alice.sync().await;
    for client in [&mut alice, &mut bob] {
        client.send(json!({"type": "join_chat", "chat_id": "r1"})).await;
        assert!(client.sync().await.is_empty());
    }

    // when (操作):
    alice
        .send(json!({"type": "typing", "chat_id": "r1", "user_id": "carol"}))
        .await;

    // then (期待する結果):
    let typing = bob.next_frame().await;
    assert_eq!(typing["type"], "typing_status");
    assert_eq!(typing["user_id"], "alice");
    assert_eq!(typing["is_typing"], true);

    alice
        .send(json!({"type": "stop_typing", "chat_id": "r1"}))
        .await;
    let stopped = bob.next_frame().await;
    assert_eq!(stopped["is_typing"], false);
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    // テスト項目: 同じユーザーの 2 本目の接続が 1 本目を置き換え、新しい接続は生き続ける
    // given (前提条件):
    let server = TestServer::start().await;
    let mut first = server.connect("alice").await;

    // when (操作):
    let mut second = server.connect("alice").await;

    // then (期待する結果):
    assert!(first.try_next_frame().await.is_none());
    assert!(second.sync().await.is_empty());
    let online = server.get_json("/api/online").await;
    assert_eq!(online, json!({"users": ["alice"], "count": 1}));
    let presence = server.get_json("/api/online/alice").await;
    assert_eq!(presence, json!({"user_id": "alice", "online": true}));
}

#[tokio::test]
async fn test_notification_is_pushed_live() {
    // テスト項目: オンラインの宛先には notification フレームが届き、オフラインなら delivered=false
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let body = json!({
        "user_id": "alice",
        "type": "buddy_request",
        "title": "New gym buddy",
        "content": "bob wants to train with you",
    });

    // when (操作):
    let response = server
        .http
        .post(server.api("/api/notifications"))
        .json(&body)
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["delivered"], true);

    let frame = alice.next_frame().await;
    assert_eq!(frame["type"], "notification");
    assert_eq!(frame["user_id"], "alice");
    assert_eq!(frame["data"]["notification"]["id"], created["id"]);
    assert_eq!(frame["data"]["notification"]["type"], "buddy_request");
    assert_eq!(frame["data"]["notification"]["is_read"], false);

    let offline: Value = server
        .http
        .post(server.api("/api/notifications"))
        .json(&json!({"user_id": "bob", "type": "like", "title": "t", "content": "c"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(offline["delivered"], false);
}

#[tokio::test]
async fn test_protocol_misuse_keeps_connection_open() {
    // テスト項目: 未知の種類は黙って捨てられ、型の無いフレーム・非メンバーの join はエラーフレーム
    // given (前提条件):
    let server = TestServer::start().await;
    server.create_chat("r1", &["bob"]).await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    alice.send(json!({"type": "deadlift", "kg": 200})).await;
    alice.send(json!({"chat_id": "r1"})).await;
    alice.send(json!({"type": "join_chat", "chat_id": "r1"})).await;
    alice.send(json!({"type": "join_chat", "chat_id": "nope"})).await;
    let replies = alice.sync().await;

    // then (期待する結果):
    let codes: Vec<&str> = replies
        .iter()
        .map(|f| {
            assert_eq!(f["type"], "error");
            f["code"].as_str().unwrap()
        })
        .collect();
    assert_eq!(codes, vec!["missing_type", "not_a_member", "chat_not_found"]);
    let members = server.get_json("/api/rooms/r1/members").await;
    assert_eq!(members["members"], json!([]));
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    // テスト項目: JSON でないテキストは転送エラーとして接続が閉じられ、オフライン扱いになる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    alice
        .sink
        .send(Message::Text("this is not json".into()))
        .await
        .unwrap();

    // then (期待する結果):
    assert!(alice.try_next_frame().await.is_none());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let presence = server.get_json("/api/online/alice").await;
    assert_eq!(presence["online"], false);
}

#[tokio::test]
async fn test_upgrade_without_identity_is_unauthorized() {
    // テスト項目: user_id が無い接続は 401 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(format!("ws://127.0.0.1:{}/ws", server.port)).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP 401, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let health = server.get_json("/api/health").await;

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
}

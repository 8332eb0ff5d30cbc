mod support;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn connect() -> Socket {
    let (socket, _response) = connect_async(support::ws_url())
        .await
        .expect("websocket connect");
    socket
}

async fn send(socket: &mut Socket, msg: Value) {
    socket
        .send(Message::text(msg.to_string()))
        .await
        .expect("send");
}

// Reads text frames until one of the wanted type arrives; world updates are skipped.
async fn next_of_type(socket: &mut Socket, wanted: &str) -> Value {
    timeout(WAIT, async {
        loop {
            let msg = socket
                .next()
                .await
                .expect("socket open")
                .expect("frame");
            let Message::Text(text) = msg else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).expect("json");
            if value["type"] == wanted {
                return value;
            }
        }
    })
    .await
    .expect("message in time")
}

async fn check(socket: &mut Socket, user: &str, pass: &str) -> Value {
    send(
        socket,
        json!({ "type": "CheckPlayer", "data": { "user": user, "pass": pass } }),
    )
    .await;
    next_of_type(socket, "CheckPlayer").await["data"]["result"].clone()
}

#[tokio::test]
async fn when_new_account_logs_in_then_it_appears_in_world_updates() {
    support::ensure_server();
    let name = support::unique_name();
    let mut socket = connect().await;

    assert_eq!(check(&mut socket, &name, "pw").await, "account_created");
    assert_eq!(check(&mut socket, &name, "wrong").await, "bad");
    assert_eq!(check(&mut socket, &name, "pw").await, "good");

    send(&mut socket, json!({ "type": "Login", "data": { "user": name } })).await;
    let login = next_of_type(&mut socket, "Login").await;
    assert_eq!(login["data"]["accepted"], true);
    assert_eq!(login["data"]["map"], "default");
    assert_eq!(login["data"]["x"], 200);
    assert_eq!(login["data"]["y"], 200);

    let seen = timeout(WAIT, async {
        loop {
            let update = next_of_type(&mut socket, "WorldUpdate").await;
            assert_eq!(update["data"]["map"], "default");
            let players = update["data"]["players"].as_array().cloned().unwrap_or_default();
            if players.iter().any(|p| p["name"] == name.as_str()) {
                return update;
            }
        }
    })
    .await
    .expect("player in a world update");
    assert_eq!(seen["data"]["enemies"].as_array().map(Vec::len), Some(4));

    send(
        &mut socket,
        json!({
            "type": "Actions",
            "data": { "actions": [format!("ATTR_UP,{name},0"), format!("EQUIP,{name},29"), "JUNK"] }
        }),
    )
    .await;
    let results = next_of_type(&mut socket, "ActionResults").await;
    let results = results["data"]["results"].as_array().cloned().expect("results");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[1]["ok"], false);
    assert_eq!(results[1]["kind"], "invalid_target");
    assert_eq!(results[2]["kind"], "malformed");

    send(&mut socket, json!({ "type": "Logoff" })).await;
    let logged_off = next_of_type(&mut socket, "LoggedOff").await;
    assert_eq!(logged_off["data"]["saved"], true);
}

#[tokio::test]
async fn when_client_drops_right_after_login_then_the_name_is_released() {
    support::ensure_server();
    let name = support::unique_name();
    let mut socket = connect().await;

    assert_eq!(check(&mut socket, &name, "pw").await, "account_created");
    assert_eq!(check(&mut socket, &name, "pw").await, "good");
    send(&mut socket, json!({ "type": "Login", "data": { "user": name } })).await;
    drop(socket);

    let mut retry = connect().await;
    let released = timeout(WAIT, async {
        loop {
            if check(&mut retry, &name, "pw").await == "good" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "player stayed online after its connection dropped");
}

#[tokio::test]
async fn when_login_skips_the_account_check_then_it_is_rejected() {
    support::ensure_server();
    let name = support::unique_name();
    let mut socket = connect().await;

    send(&mut socket, json!({ "type": "Login", "data": { "user": name } })).await;
    let login = next_of_type(&mut socket, "Login").await;
    assert_eq!(login["data"]["accepted"], false);
}

#[tokio::test]
async fn when_client_moves_before_login_then_socket_is_closed() {
    support::ensure_server();
    let mut socket = connect().await;

    send(
        &mut socket,
        json!({ "type": "Move", "data": { "x_speed": 5, "y_speed": 0 } }),
    )
    .await;

    let frame = timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(frame))) => return frame,
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("close in time")
    .expect("close frame");
    assert_eq!(&*frame.reason, "login required");
}

#[tokio::test]
async fn when_status_is_requested_then_tick_and_online_maps_are_reported() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/status"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let body: Value = res.json().await.expect("json body");
    assert!(body["tick"].is_u64());
    assert!(body["online"].is_object());
}

//! HTTP and WebSocket tests against a live server on an ephemeral port.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use shopfloor_gateway::api::build_app;
use shopfloor_gateway::app_state::AppState;

async fn spawn_server(state: AppState) -> SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has an address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });
    addr
}

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_frame(ws: &mut Ws) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_millis(500), ws.next())
            .await
            .ok()??
            .ok()?;
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
}

async fn get_json(url: String) -> (u16, Value) {
    let Ok(resp) = reqwest::get(url).await else {
        panic!("request failed");
    };
    let status = resp.status().as_u16();
    let Ok(body) = resp.json::<Value>().await else {
        panic!("body should be JSON");
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_live_connections() {
    let shop = common::shop();
    let addr = spawn_server(shop.state).await;

    let Ok((_ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect");
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = get_json(format!("http://{addr}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"], 1);
}

#[tokio::test]
async fn unknown_entities_are_404_with_error_codes() {
    let shop = common::shop();
    let addr = spawn_server(shop.state).await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = get_json(format!("http://{addr}/api/v1/machines/{missing}")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2002);

    let (status, body) = get_json(format!("http://{addr}/api/v1/departments/{missing}")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2001);

    let (status, body) = get_json(format!("http://{addr}/api/v1/workflows/npi/{missing}")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2004);
}

#[tokio::test]
async fn rest_views_expose_offline_machine_and_job_progress() {
    let shop = common::shop();
    let (m1, j1) = (shop.m1, shop.j1);
    let addr = spawn_server(shop.state).await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/machines/{m1}/status")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "offline");

    let (status, body) = get_json(format!("http://{addr}/api/v1/jobs/{j1}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["progress"]["percent_complete"], 50.0);

    let (status, body) = get_json(format!("http://{addr}/api/v1/workflows/npi/active")).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn subscribed_client_receives_status_update_once() {
    let shop = common::shop();
    let m1 = shop.m1;
    let addr = spawn_server(shop.state).await;

    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect");
    };
    for payload in [
        json!({"command": "subscribe_shop"}),
        json!({"command": "subscribe", "topic_kind": "machine", "topic_id": m1.to_string()}),
    ] {
        let frame = json!({"id": "sub", "type": "command", "payload": payload});
        let Ok(()) = ws.send(Message::text(frame.to_string())).await else {
            panic!("ws send");
        };
        let Some(reply) = next_frame(&mut ws).await else {
            panic!("expected a subscribe response");
        };
        assert_eq!(reply["type"], "response");
    }

    let client = reqwest::Client::new();
    let Ok(resp) = client
        .post(format!("http://{addr}/api/v1/machines/{m1}/status"))
        .json(&json!({"status": "running", "utilization_percent": 72.5}))
        .send()
        .await
    else {
        panic!("post status");
    };
    assert_eq!(resp.status().as_u16(), 202);
    let Ok(ack) = resp.json::<Value>().await else {
        panic!("ack should be JSON");
    };
    assert_eq!(ack["cached"], true);
    assert_eq!(ack["delivered"], 1);

    let Some(event) = next_frame(&mut ws).await else {
        panic!("expected a status event");
    };
    assert_eq!(event["type"], "event");
    assert_eq!(event["payload"]["event_type"], "machine_status_update");
    assert_eq!(event["payload"]["status"], "running");
    assert!(next_frame(&mut ws).await.is_none(), "event must arrive once");
}

#[tokio::test]
async fn invalid_commands_get_error_frames() {
    let shop = common::shop();
    let addr = spawn_server(shop.state).await;

    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect");
    };
    let frame = json!({
        "id": "bad",
        "type": "command",
        "payload": {"command": "subscribe", "topic_kind": "department"},
    });
    let Ok(()) = ws.send(Message::text(frame.to_string())).await else {
        panic!("ws send");
    };
    let Some(reply) = next_frame(&mut ws).await else {
        panic!("expected an error frame");
    };
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["id"], "bad");
    assert_eq!(reply["payload"]["code"], 1002);
}

#[tokio::test]
async fn empty_alarm_code_is_rejected() {
    let shop = common::shop();
    let m1 = shop.m1;
    let addr = spawn_server(shop.state).await;

    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/machines/{m1}/alarms"))
        .json(&json!({"alarm_code": " ", "severity": "warning"}))
        .send()
        .await
    else {
        panic!("post alarm");
    };
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn alarm_ack_reports_fan_out_only() {
    let shop = common::shop();
    let m1 = shop.m1;
    let addr = spawn_server(shop.state).await;

    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/machines/{m1}/alarms"))
        .json(&json!({"alarm_code": "2041", "severity": "critical", "message": "chuck pressure low"}))
        .send()
        .await
    else {
        panic!("post alarm");
    };
    assert_eq!(resp.status().as_u16(), 202);
    let Ok(ack) = resp.json::<Value>().await else {
        panic!("ack should be JSON");
    };
    assert!(ack.get("cached").is_none());
    assert_eq!(ack["targeted"], 0);
    assert_eq!(ack["delivered"], 0);
}

#[tokio::test]
async fn posted_status_keeps_optional_readings() {
    let shop = common::shop();
    let (m1, j1) = (shop.m1, shop.j1);
    let addr = spawn_server(shop.state).await;

    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/machines/{m1}/status"))
        .json(&json!({
            "status": "running",
            "utilization_percent": 64.0,
            "spindle_load": 38.5,
            "feed_rate": 1200.0,
            "current_work": {"job_id": j1},
        }))
        .send()
        .await
    else {
        panic!("post status");
    };
    assert_eq!(resp.status().as_u16(), 202);

    let (status, body) = get_json(format!("http://{addr}/api/v1/machines/{m1}/status")).await;
    assert_eq!(status, 200);
    assert_eq!(body["spindle_load"], 38.5);
    assert_eq!(body["feed_rate"], 1200.0);
    assert_eq!(body["current_work"]["job_id"], j1.to_string());
}

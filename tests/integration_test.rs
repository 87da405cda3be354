//! End-to-end tests: the full service wired against a fake device/backend.
//!
//! The fake serves thresholds, sensor data and buzzer endpoints on an
//! ephemeral port; the service under test runs on another one and is driven
//! over HTTP with `reqwest`.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use sensorwatch::{build_app, Config};

const KNOWN_USER: &str = "alice@example.com";

#[derive(Clone, Default)]
struct Device {
    polls: Arc<AtomicUsize>,
    activations: Arc<AtomicUsize>,
    deactivations: Arc<AtomicUsize>,
    /// Buzzer endpoints answer 500 instead of acting.
    buzzer_broken: bool,
}

async fn serve(router: Router) -> Result<SocketAddr> {
    // ---
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

async fn spawn_device(device: Device) -> Result<SocketAddr> {
    // ---
    async fn thresholds(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        match params.get("email").map(String::as_str) {
            Some(KNOWN_USER) => (
                StatusCode::OK,
                Json(json!({ "temperature": 25, "humidity": 80, "light": null, "smoke": 40 })),
            ),
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Device not found" })),
            ),
        }
    }

    async fn data(State(device): State<Device>) -> Json<Value> {
        device.polls.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "temperature": 30.0, "humidity": 50.0, "lightLevel": 70.0, "coLevel": 10.0 }))
    }

    async fn buzzer(State(device): State<Device>) -> (StatusCode, Json<Value>) {
        if device.buzzer_broken {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "relay stuck" })));
        }
        device.activations.fetch_add(1, Ordering::SeqCst);
        (StatusCode::OK, Json(json!({ "status": "Buzzer activated" })))
    }

    async fn buzzer_off(State(device): State<Device>) -> (StatusCode, Json<Value>) {
        if device.buzzer_broken {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "relay stuck" })));
        }
        device.deactivations.fetch_add(1, Ordering::SeqCst);
        (StatusCode::OK, Json(json!({ "status": "Buzzer deactivated" })))
    }

    let router = Router::new()
        .route("/get_thresholds", get(thresholds))
        .route("/data", get(data))
        .route("/buzzer", post(buzzer))
        .route("/buzzer/deactivate", post(buzzer_off))
        .with_state(device);

    serve(router).await
}

async fn spawn_service(device: SocketAddr, user_id: &str) -> Result<String> {
    // ---
    let cfg = Config {
        threshold_api_url: format!("http://{}/get_thresholds", device),
        sensor_data_url: format!("http://{}/data", device),
        buzzer_url: format!("http://{}/buzzer", device),
        buzzer_deactivate_url: format!("http://{}/buzzer/deactivate", device),
        user_id: user_id.to_string(),
        poll_interval_secs: 1,
        http_timeout_secs: 2,
        http_port: 0,
        auto_start: false,
    };

    let app = build_app(&cfg)?;
    let addr = serve(app.router).await?;
    Ok(format!("http://{}", addr))
}

async fn eventually(mut check: impl FnMut() -> bool) {
    // ---
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn health_endpoint_ok() -> Result<()> {
    // ---
    let device = spawn_device(Device::default()).await?;
    let base = spawn_service(device, KNOWN_USER).await?;

    let body: Value = Client::new()
        .get(format!("{}/health", base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn monitoring_displays_and_alarms_once() -> Result<()> {
    // ---
    let device = Device::default();
    let device_addr = spawn_device(device.clone()).await?;
    let base = spawn_service(device_addr, KNOWN_USER).await?;
    let client = Client::new();

    // Nothing is polled before monitoring starts.
    let latest: Value = client.get(format!("{}/readings/latest", base)).send().await?.json().await?;
    assert_eq!(latest["cards"]["temperature"]["text"], "--");
    assert_eq!(device.polls.load(Ordering::SeqCst), 0);

    let started: Value = client
        .post(format!("{}/monitor/start", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(started["active"], true);
    assert_eq!(started["alarms_enabled"], true);
    assert_eq!(started["thresholds"], json!({ "temperature": 25.0, "humidity": 80.0, "smoke": 40.0 }));
    assert!(started.get("warning").is_none());

    // Temperature 30 >= 25 fires the buzzer on the first poll.
    eventually(|| device.activations.load(Ordering::SeqCst) >= 1).await;

    // Let two more identical readings arrive; the alarm must not re-fire.
    let polls = device.polls.load(Ordering::SeqCst);
    eventually(|| device.polls.load(Ordering::SeqCst) >= polls + 2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(device.activations.load(Ordering::SeqCst), 1);

    let latest: Value = client.get(format!("{}/readings/latest", base)).send().await?.json().await?;
    assert_eq!(latest["cards"]["temperature"]["text"], "30.00 °C");
    assert_eq!(latest["cards"]["smoke"]["text"], "10.00 ppm");
    assert!(latest["last_updated"].is_string());

    let status: Value = client.get(format!("{}/monitor/status", base)).send().await?.json().await?;
    assert_eq!(status["active"], true);
    assert_eq!(status["alarm_asserted"]["temperature"], true);
    assert_eq!(status["alarm_asserted"]["smoke"], false);

    let stopped: Value = client
        .post(format!("{}/monitor/stop", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stopped, json!({ "active": false }));

    // Polling halts with the session.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let polls = device.polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(device.polls.load(Ordering::SeqCst), polls);

    Ok(())
}

#[tokio::test]
async fn unknown_user_monitors_without_alarms() -> Result<()> {
    // ---
    let device = Device::default();
    let device_addr = spawn_device(device.clone()).await?;
    let base = spawn_service(device_addr, "nobody@example.com").await?;
    let client = Client::new();

    let started: Value = client
        .post(format!("{}/monitor/start", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(started["active"], true);
    assert_eq!(started["alarms_enabled"], false);
    assert!(started["warning"].as_str().unwrap_or_default().contains("Device not found"));

    eventually(|| device.polls.load(Ordering::SeqCst) >= 2).await;

    let latest: Value = client.get(format!("{}/readings/latest", base)).send().await?.json().await?;
    assert_eq!(latest["cards"]["humidity"]["text"], "50.00 %");
    assert_eq!(device.activations.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn manual_buzzer_controls() -> Result<()> {
    // ---
    let device = Device::default();
    let device_addr = spawn_device(device.clone()).await?;
    let base = spawn_service(device_addr, KNOWN_USER).await?;
    let client = Client::new();

    let response = client.post(format!("{}/buzzer/activate", base)).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({ "status": "Buzzer activated" }));

    let response = client.post(format!("{}/buzzer/deactivate", base)).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({ "status": "Buzzer deactivated" }));

    // The device was called before the response came back.
    assert_eq!(device.activations.load(Ordering::SeqCst), 1);
    assert_eq!(device.deactivations.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn manual_buzzer_reports_device_failure() -> Result<()> {
    // ---
    let device = Device {
        buzzer_broken: true,
        ..Device::default()
    };
    let device_addr = spawn_device(device.clone()).await?;
    let base = spawn_service(device_addr, KNOWN_USER).await?;
    let client = Client::new();

    let response = client.post(format!("{}/buzzer/activate", base)).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    let status = body["status"].as_str().unwrap_or_default();
    assert!(status.starts_with("Failed to activate buzzer"), "{}", status);
    assert!(status.contains("500"), "{}", status);

    let response = client.post(format!("{}/buzzer/deactivate", base)).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert!(body["status"].as_str().unwrap_or_default().starts_with("Failed to deactivate buzzer"));

    assert_eq!(device.activations.load(Ordering::SeqCst), 0);
    assert_eq!(device.deactivations.load(Ordering::SeqCst), 0);

    Ok(())
}

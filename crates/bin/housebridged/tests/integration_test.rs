//! End-to-end tests for the full housebridged stack.
//!
//! Each test wires the real bridge, event bus and axum router to a loopback
//! transport standing in for the broker: every command published on a
//! `…/control/…` topic is answered on the matching `…/status/…` topic with
//! the same payload, the way well-behaved firmware acknowledges. No TCP port
//! is bound.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use housebridge_adapter_http_axum::router;
use housebridge_adapter_http_axum::state::AppState;
use housebridge_app::coordinator::CoordinatorConfig;
use housebridge_app::event_bus::InProcessEventBus;
use housebridge_app::ports::{InboundHandler, Transport};
use housebridge_app::registry::TopicRegistry;
use housebridge_app::services::bridge_service::HardwareBridge;
use housebridge_domain::error::TransportError;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Publishing half of the fake broker.
#[derive(Clone)]
struct Loopback {
    outbound: mpsc::UnboundedSender<(String, String)>,
    mute: Arc<AtomicBool>,
}

impl Transport for Loopback {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if !self.mute.load(Ordering::SeqCst) {
            let _ = self.outbound.send((topic.to_string(), payload.to_string()));
        }
        Ok(())
    }

    async fn subscribe(&self, _filter: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

type Bridge = HardwareBridge<Loopback, Arc<InProcessEventBus>>;

struct Harness {
    app: axum::Router,
    bridge: Arc<Bridge>,
    mute: Arc<AtomicBool>,
}

fn harness() -> Harness {
    let (outbound, mut commands) = mpsc::unbounded_channel::<(String, String)>();
    let mute = Arc::new(AtomicBool::new(false));
    let transport = Loopback {
        outbound,
        mute: Arc::clone(&mute),
    };

    let event_bus = Arc::new(InProcessEventBus::new(64));
    let bridge = Arc::new(HardwareBridge::new(
        transport,
        Arc::clone(&event_bus),
        TopicRegistry::with_defaults().expect("default schema should parse"),
        CoordinatorConfig::default(),
    ));

    let dispatcher = bridge.dispatcher();
    tokio::spawn(async move {
        while let Some((topic, payload)) = commands.recv().await {
            let status_topic = topic.replace("/control/", "/status/");
            dispatcher
                .on_message(&status_topic, payload.as_bytes())
                .await;
        }
    });

    let app = router::build(AppState::new(Arc::clone(&bridge), event_bus));
    Harness { app, bridge, mute }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_broker_connected_on_health_check() {
    let Harness { app, .. } = harness();
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["broker_connected"], json!(true));
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_list_sensors_reported_over_the_broker() {
    let Harness { app, bridge, .. } = harness();
    let dispatcher = bridge.dispatcher();
    dispatcher
        .on_message("house/h1/sensor/temperature/2", b"21.0")
        .await;
    dispatcher
        .on_message("house/h1/sensors/1", br#"{"temp": 19.5, "humi": 40.0}"#)
        .await;
    dispatcher
        .on_message("house/h2/sensor/light/1", b"300")
        .await;

    let response = app
        .clone()
        .oneshot(get("/api/houses/h1/sensors"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get("/api/houses/h1/sensors/1/temp-humi"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["temperature"]["value"], json!(19.5));
    assert_eq!(body["humidity"]["value"], json!(40.0));
}

// ---------------------------------------------------------------------------
// Device control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_acknowledged_status_when_device_answers() {
    let Harness { app, .. } = harness();
    let response = app
        .clone()
        .oneshot(post(
            "/api/houses/h1/devices/3/control",
            &json!({"kind": "fan", "action": "on"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["on"], json!(true));

    let response = app.oneshot(get("/api/houses/h1/devices/3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["kind"], json!("fan"));
    assert_eq!(body["on"], json!(true));
}

#[tokio::test]
async fn should_control_registered_device_on_its_own_topics() {
    let Harness { app, bridge, .. } = harness();
    let response = app
        .clone()
        .oneshot(post(
            "/api/houses/h1/devices/40/register",
            &json!({
                "kind": "door",
                "status_topic": "garage/status/door",
                "control_topic": "garage/control/door"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post(
            "/api/houses/h1/devices/40/control",
            &json!({"kind": "door", "action": "open"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(bridge.subscriptions().contains(&"garage/status/door".to_string()));
}

#[tokio::test(start_paused = true)]
async fn should_time_out_when_device_stays_silent() {
    let Harness { app, mute, .. } = harness();
    mute.store(true, Ordering::SeqCst);

    let response = app
        .clone()
        .oneshot(post(
            "/api/houses/h1/devices/12/control",
            &json!({"kind": "rgb", "action": "color", "color": "255,0,0", "timeout_ms": 300}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    // The optimistic status stays until the device says otherwise.
    let response = app
        .oneshot(get("/api/houses/h1/devices/12"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["color"], json!("255,0,0"));
}

#[tokio::test]
async fn should_reject_malformed_control_request() {
    let Harness { app, .. } = harness();
    let response = app
        .oneshot(post(
            "/api/houses/h1/devices/12/control",
            &json!({"kind": "rgb", "action": "color", "color": "red"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

//! Axum router assembly.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use housebridge_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response using the `tracing` ecosystem.
pub fn build<T, P>(state: AppState<T, P>) -> Router
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    Router::new()
        .route("/health", get(health_check::<T, P>))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    broker_connected: bool,
}

/// The process is healthy even while the broker is away; the flag tells
/// callers whether control requests can currently succeed.
async fn health_check<T, P>(State(state): State<AppState<T, P>>) -> Json<Health>
where
    T: Transport + Clone + 'static,
    P: EventPublisher + Clone + 'static,
{
    Json(Health {
        status: "ok",
        broker_connected: state.bridge.is_connected(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use housebridge_app::coordinator::CoordinatorConfig;
    use housebridge_app::event_bus::InProcessEventBus;
    use housebridge_app::registry::TopicRegistry;
    use housebridge_app::services::bridge_service::HardwareBridge;
    use housebridge_domain::error::TransportError;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubTransport {
        offline: AtomicBool,
        published: Mutex<Vec<(String, String)>>,
    }

    impl Transport for StubTransport {
        async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }

        async fn subscribe(&self, _filter: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.offline.load(Ordering::SeqCst)
        }
    }

    type Bridge = HardwareBridge<Arc<StubTransport>, Arc<InProcessEventBus>>;

    fn test_app() -> (Router, Arc<StubTransport>, Arc<Bridge>) {
        let transport = Arc::new(StubTransport::default());
        let event_bus = Arc::new(InProcessEventBus::new(16));
        let bridge = Arc::new(HardwareBridge::new(
            Arc::clone(&transport),
            Arc::clone(&event_bus),
            TopicRegistry::with_defaults().unwrap(),
            CoordinatorConfig::default(),
        ));
        let app = build(AppState::new(Arc::clone(&bridge), event_bus));
        (app, transport, bridge)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (app, transport, _) = test_app();
        transport.offline.store(true, Ordering::SeqCst);

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "ok", "broker_connected": false})
        );
    }

    #[tokio::test]
    async fn should_return_empty_list_when_house_has_no_sensors() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(get_request("/api/houses/h1/sensors"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn should_return_not_found_when_sensor_never_reported() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(get_request("/api/houses/h1/sensors/1/temp-humi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn should_reject_invalid_house_id() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(get_request("/api/houses/a+b/devices"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_serve_readings_merged_from_the_broker() {
        let (app, _, bridge) = test_app();
        let dispatcher = bridge.dispatcher();
        dispatcher
            .dispatch("house/h1/sensor/temperature/1", b"27.5")
            .await;
        dispatcher
            .dispatch("house/h1/sensor/humidity/1", b"65.3")
            .await;

        let response = app
            .oneshot(get_request("/api/houses/h1/sensors/1/temp-humi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["temperature"]["value"], json!(27.5));
        assert_eq!(body["humidity"]["value"], json!(65.3));
    }

    #[tokio::test]
    async fn should_return_door_status() {
        let (app, _, bridge) = test_app();
        bridge
            .dispatcher()
            .dispatch("house/h1/status/door/7", b"OPEN")
            .await;

        let response = app
            .oneshot(get_request("/api/houses/h1/devices/7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["kind"], json!("door"));
        assert_eq!(body["on"], json!(true));
        assert_eq!(body["locked"], json!(false));
    }

    #[tokio::test]
    async fn should_reject_control_of_unknown_device_type() {
        let (app, transport, _) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/houses/h1/devices/1/control",
                &json!({"kind": "toaster", "action": "on"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(transport.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_unlock_without_code() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/houses/h1/devices/7/control",
                &json!({"kind": "door", "action": "unlock"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_return_service_unavailable_when_broker_is_down() {
        let (app, transport, _) = test_app();
        transport.offline.store(true, Ordering::SeqCst);
        let response = app
            .oneshot(post_json(
                "/api/houses/h1/devices/3/control",
                &json!({"kind": "fan", "action": "on"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_gateway_timeout_when_device_stays_silent() {
        let (app, _, bridge) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/houses/h1/devices/3/control",
                &json!({"kind": "fan", "action": "on", "timeout_ms": 200}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let status = bridge
            .get_status(
                &housebridge_domain::id::HouseId::new("h1").unwrap(),
                housebridge_domain::id::DeviceId::new(3),
            )
            .unwrap();
        assert!(status.on);
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_acked_status_when_device_answers() {
        let (app, transport, bridge) = test_app();
        let request = tokio::spawn(app.oneshot(post_json(
            "/api/houses/h1/devices/12/control",
            &json!({"kind": "rgb", "action": "color", "color": "0,0,255"}),
        )));
        while transport.published.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            transport.published.lock().unwrap()[0],
            ("house/h1/control/rgb/12".to_string(), "0,0,255".to_string())
        );

        bridge
            .dispatcher()
            .dispatch("house/h1/status/rgb/12", b"0,0,255")
            .await;

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["color"], json!("0,0,255"));
    }

    #[tokio::test]
    async fn should_register_device_once() {
        let (app, _, _) = test_app();
        let body = json!({
            "kind": "door",
            "status_topic": "garage/door/state",
            "control_topic": "garage/door/set"
        });

        let response = app
            .clone()
            .oneshot(post_json("/api/houses/h1/devices/40/register", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_json("/api/houses/h1/devices/41/register", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn should_open_event_stream() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(get_request("/api/events/stream"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
    }
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{MonitorState, SensorReading};
use crate::registry::{self, Location, RegistrationError, RegistrationForm};

type SharedState = Arc<Mutex<MonitorState>>;

pub async fn list_sensors(State(state): State<SharedState>) -> Json<Vec<SensorReading>> {
    let state = state.lock().await;
    let mut sensors: Vec<SensorReading> = state.sensors.values().cloned().collect();
    sensors.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id));
    Json(sensors)
}

/// The registration wizard: one-shot form validation, no retries. The new
/// location's sensors show up as `Unknown` until the next cycle.
pub async fn register_location(
    State(state): State<SharedState>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<Location>), (StatusCode, Json<serde_json::Value>)> {
    let mut state = state.lock().await;
    match registry::register_into(&form, &mut state) {
        Ok(location) => {
            info!("Registered {}", location.title);
            Ok((StatusCode::CREATED, Json(location)))
        }
        Err(e) => {
            let code = match e {
                RegistrationError::AlreadyConfigured(_) => StatusCode::CONFLICT,
                RegistrationError::EmptyStreet => StatusCode::UNPROCESSABLE_ENTITY,
            };
            Err((code, Json(json!({ "error": e.to_string() }))))
        }
    }
}

pub async fn remove_location(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut state = state.lock().await;
    if state.remove_location(&id) {
        info!("Removed location {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/sensors", get(list_sensors))
        .route("/api/locations", post(register_location))
        .route("/api/locations/{id}", delete(remove_location))
        .with_state(state)
}

pub async fn start_server(port: u16, state: SharedState) {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Sensor API: http://localhost:{}/api/sensors", addr.port());
    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind API port");
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn shared_state() -> SharedState {
        Arc::new(Mutex::new(MonitorState::new()))
    }

    fn post_location(street: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/locations")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "street": street, "zone": "centru" }).to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn registration_creates_location_and_sensors() {
        let state = shared_state();
        let app = create_router(state.clone());

        let response = app.oneshot(post_location("Calea Victoriei")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], "calea_victoriei_centru");
        assert_eq!(body["title"], "Termoenergetica - Calea Victoriei");

        let state = state.lock().await;
        assert_eq!(state.sensors.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let state = shared_state();
        let app = create_router(state);

        let first = app.clone().oneshot(post_location("Calea Victoriei")).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.oneshot(post_location("  CALEA  VICTORIEI ")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = body_json(second).await;
        assert!(body["error"].as_str().unwrap().contains("already configured"));
    }

    #[tokio::test]
    async fn blank_street_is_unprocessable() {
        let app = create_router(shared_state());
        let response = app.oneshot(post_location("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sensors_endpoint_lists_readings() {
        let state = shared_state();
        let app = create_router(state);

        app.clone().oneshot(post_location("Calea Victoriei")).await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let sensors = body.as_array().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0]["status"], "Unknown");
        assert_eq!(sensors[0]["street"], "Calea Victoriei");
    }

    #[tokio::test]
    async fn removal_deletes_location_and_is_idempotent_at_404() {
        let state = shared_state();
        let app = create_router(state.clone());

        app.clone().oneshot(post_location("Calea Victoriei")).await.unwrap();

        let delete_req = || {
            Request::builder()
                .method("DELETE")
                .uri("/api/locations/calea_victoriei_centru")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(delete_req()).await.unwrap();
        assert_eq!(first.status(), StatusCode::NO_CONTENT);
        assert!(state.lock().await.sensors.is_empty());

        let second = app.oneshot(delete_req()).await.unwrap();
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }
}

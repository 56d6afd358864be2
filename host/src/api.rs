//! ==============================================================================
//! api.rs - http routes
//! ==============================================================================
//!
//! routes:
//!     GET /             dashboard page (polls the json endpoints)
//!     GET /api/current  fresh sensor reading (stored when successful)
//!     GET /api/history  buffered readings, oldest first
//!     GET /api/stats    min/max/avg/current or {"error": "..."}
//!     GET /on, /off     switch the status led
//!     GET /api/led      {"on": bool}
//!
//! ==============================================================================

use crate::domain::Reading;
use crate::hal::DigitalOutput;
use crate::service::QueryService;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

pub type SharedOutput = Arc<Mutex<Box<dyn DigitalOutput>>>;

#[derive(Clone)]
pub struct AppState {
    pub service: QueryService,
    /// None when the led is disabled in config
    pub led: Option<SharedOutput>,
    pub show_sensor_data: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/current", get(current_handler))
        .route("/api/history", get(history_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/led", get(led_state_handler))
        .route("/on", get(led_on_handler))
        .route("/off", get(led_off_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn current_handler(State(state): State<AppState>) -> Json<Reading> {
    let reading = state.service.current().await;
    if state.show_sensor_data {
        if let Some((t, h)) = reading.values() {
            tracing::info!("[DHT11] Temp: {:.1}°C | Humidity: {:.1}%", t, h);
        }
    }
    Json(reading)
}

async fn history_handler(State(state): State<AppState>) -> Json<Vec<Reading>> {
    Json(state.service.history())
}

/// no data is reported in the body with a 200, the dashboard checks `error`
async fn stats_handler(State(state): State<AppState>) -> Response {
    match state.service.stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })).into_response(),
    }
}

async fn led_on_handler(State(state): State<AppState>) -> Response {
    switch_led(&state, true).await
}

async fn led_off_handler(State(state): State<AppState>) -> Response {
    switch_led(&state, false).await
}

async fn switch_led(state: &AppState, on: bool) -> Response {
    let Some(led) = &state.led else {
        return (StatusCode::SERVICE_UNAVAILABLE, "LED is disabled").into_response();
    };

    let mut led = led.lock().await;
    match led.set(on) {
        Ok(()) => {
            let text = if on { "LED is ON" } else { "LED is OFF" };
            tracing::info!("[LED] {}", text);
            text.into_response()
        }
        Err(e) => {
            tracing::error!("[LED] ⚠ switch failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("LED error: {}", e)).into_response()
        }
    }
}

async fn led_state_handler(State(state): State<AppState>) -> Response {
    match &state.led {
        Some(led) => Json(serde_json::json!({ "on": led.lock().await.is_on() })).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "LED is disabled" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ReadingBuffer;
    use crate::hal::{MockOutput, Sample, SensorFault, SensorReader};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// succeeds on odd reads, fails on even ones
    struct Alternating(u32);

    impl SensorReader for Alternating {
        fn read(&mut self) -> Result<Sample, SensorFault> {
            self.0 += 1;
            if self.0 % 2 == 0 {
                return Err(SensorFault::Transient("A full buffer was not returned. Try again.".into()));
            }
            Ok(Sample { temperature: 20.0 + self.0 as f64, humidity: 40.0 })
        }

        fn name(&self) -> String {
            "alternating".to_string()
        }
    }

    fn app(led: bool) -> Router {
        let led: Option<SharedOutput> = if led {
            let output: Box<dyn DigitalOutput> = Box::new(MockOutput::default());
            Some(Arc::new(Mutex::new(output)))
        } else {
            None
        };
        router(AppState {
            service: QueryService::new(Box::new(Alternating(0)), ReadingBuffer::new(10)),
            led,
            show_sensor_data: false,
        })
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_stats_before_any_reading() {
        let app = app(false);
        let (status, body) = get_json(&app, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "error": "no data available" }));
    }

    #[tokio::test]
    async fn test_current_history_stats_flow() {
        let app = app(false);

        let (_, first) = get_json(&app, "/api/current").await;
        assert_eq!(first["success"], true);
        assert_eq!(first["temperature"], 21.0);

        let (status, second) = get_json(&app, "/api/current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["success"], false);
        assert!(second["error"].is_string());

        get_json(&app, "/api/current").await;

        let (_, history) = get_json(&app, "/api/history").await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], first);
        assert_eq!(history[1]["temperature"], 23.0);

        let (_, stats) = get_json(&app, "/api/stats").await;
        assert_eq!(stats["temperature"]["min"], 21.0);
        assert_eq!(stats["temperature"]["max"], 23.0);
        assert_eq!(stats["temperature"]["avg"], 22.0);
        assert_eq!(stats["temperature"]["current"], 23.0);
        assert_eq!(stats["readings_count"], 2);
    }

    #[tokio::test]
    async fn test_led_routes() {
        let app = app(true);
        let (_, state) = get_json(&app, "/api/led").await;
        assert_eq!(state["on"], false);

        let (status, text) = get_text(&app, "/on").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "LED is ON");
        let (_, state) = get_json(&app, "/api/led").await;
        assert_eq!(state["on"], true);

        let (_, text) = get_text(&app, "/off").await;
        assert_eq!(text, "LED is OFF");
    }

    #[tokio::test]
    async fn test_led_disabled() {
        let app = app(false);
        let (status, _) = get_text(&app, "/on").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, body) = get_json(&app, "/api/led").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "LED is disabled");
    }

    #[tokio::test]
    async fn test_dashboard_page() {
        let (status, html) = get_text(&app(false), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("/api/current"));
    }
}

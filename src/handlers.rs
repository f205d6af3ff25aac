//! ==============================================================================
//! handlers.rs - ingestion and query endpoints
//! ==============================================================================
//!
//! purpose:
//!     the four http handlers of the relay:
//!     - POST /update-waste        classifier message from the esp32
//!     - POST /update-coordinates  gps fix from the esp32
//!     - POST /update-bin-fill     compartment fill levels
//!     - GET  /latest-data         everything above, for the polling app
//!
//! decoding:
//!     bodies are taken as raw bytes and decoded here instead of through
//!     axum's Json extractor. a broken body must produce the endpoint's own
//!     400 ack, not axum's rejection text, and an empty body counts as {}.
//!
//! relationships:
//!     - used by: server.rs (mounted on the router)
//!     - writes/reads: store.rs
//!
//! ==============================================================================

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use std::sync::Arc;

use crate::domain::{Ack, BinFill, BinFillPayload, Coordinates, CoordinatesPayload, Snapshot, WastePayload};
use crate::error::IngestError;
use crate::store::TelemetryStore;

/// state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    /// log accepted telemetry at info level
    pub show_telemetry: bool,
}

impl AppState {
    pub fn new(store: Arc<TelemetryStore>, show_telemetry: bool) -> Self {
        Self { store, show_telemetry }
    }
}

/// decode a request body into a payload struct
///
/// returns None when the body is not a json object or a field has the
/// wrong type. whitespace-only bodies decode to the payload's default.
fn decode<T: DeserializeOwned + Default>(body: &[u8]) -> Option<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(T::default());
    }
    match serde_json::from_slice::<Value>(body).ok()? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    }
}

/// latitude/longitude of exactly 0 are treated as missing
fn present(v: Option<Number>) -> Option<Number> {
    v.filter(|n| n.as_f64().is_some_and(|x| x != 0.0))
}

pub async fn update_waste(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    let payload: WastePayload = decode(&body).ok_or_else(|| {
        tracing::warn!("update-waste: undecodable body");
        IngestError::MissingMessage
    })?;

    let message = match payload.message {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => {
            tracing::warn!("update-waste: no message in request");
            return Err(IngestError::MissingMessage);
        }
    };

    let shown = state.show_telemetry.then(|| message.clone());
    let revision = state.store.set_message(message);
    if let Some(message) = shown {
        tracing::info!(revision, "Received message: {}", message);
    }
    Ok(Json(Ack::ok()))
}

pub async fn update_coordinates(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    let payload: CoordinatesPayload = decode(&body).ok_or_else(|| {
        tracing::warn!("update-coordinates: undecodable body");
        IngestError::InvalidCoordinates
    })?;

    let (latitude, longitude) = (payload.latitude, payload.longitude);
    let (Some(lat), Some(lon)) = (present(latitude.clone()), present(longitude.clone())) else {
        tracing::warn!(?latitude, ?longitude, "update-coordinates: rejected");
        return Err(IngestError::InvalidCoordinates);
    };

    let revision = state.store.set_coordinates(Coordinates::new(lat, lon));
    tracing::debug!(revision, ?latitude, ?longitude, "Received coordinates");
    Ok(Json(Ack::ok()))
}

pub async fn update_bin_fill(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    let payload: BinFillPayload = decode(&body).ok_or_else(|| {
        tracing::warn!("update-bin-fill: undecodable body");
        IngestError::MalformedBinFill
    })?;

    let fill = BinFill::from(payload);
    let shown = state.show_telemetry.then(|| fill.clone());
    let revision = state.store.set_bin_fill(fill);
    if let Some(fill) = shown {
        tracing::info!(
            revision,
            wet = %fill.wet_bin,
            dry = %fill.dry_bin,
            metal = %fill.metal_bin,
            "Updated bin fill levels"
        );
    }
    Ok(Json(Ack::ok()))
}

/// latest value of every facet, never fails
pub async fn latest_data(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.store.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<TelemetryStore>) {
        let store = Arc::new(TelemetryStore::new());
        let router = build_router(AppState::new(store.clone(), false), true);
        (router, store)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post(app: &Router, path: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let req = Request::post(path)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        send(app, req).await
    }

    async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        post(app, path, body.to_string()).await
    }

    async fn latest(app: &Router) -> Value {
        let (status, body) = send(app, Request::get("/latest-data").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn latest_data_starts_with_defaults() {
        let (app, _) = app();
        let body = latest(&app).await;
        assert_eq!(body["message"], json!(""));
        assert_eq!(body["coordinates"], json!({ "latitude": null, "longitude": null }));
        assert_eq!(body["binFill"], json!({ "wetBin": 0, "dryBin": 0, "metalBin": 0 }));
    }

    #[tokio::test]
    async fn message_is_stored_and_returned() {
        let (app, _) = app();
        let (status, ack) = post_json(&app, "/update-waste", json!({ "message": "metal detected" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "success": true }));
        assert_eq!(latest(&app).await["message"], json!("metal detected"));
    }

    #[tokio::test]
    async fn missing_message_keeps_previous_value() {
        let (app, _) = app();
        post_json(&app, "/update-waste", json!({ "message": "dry waste" })).await;

        for body in [json!({}), json!({ "message": "" }), json!({ "message": null }), json!({ "message": 7 })] {
            let (status, ack) = post_json(&app, "/update-waste", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(ack, json!({ "success": false, "error": "No message provided" }));
        }
        assert_eq!(latest(&app).await["message"], json!("dry waste"));
    }

    #[tokio::test]
    async fn coordinates_are_replaced_as_a_pair() {
        let (app, _) = app();
        let (status, ack) =
            post_json(&app, "/update-coordinates", json!({ "latitude": 12.5, "longitude": 77.5 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "success": true }));
        assert_eq!(
            latest(&app).await["coordinates"],
            json!({ "latitude": 12.5, "longitude": 77.5 })
        );
    }

    #[tokio::test]
    async fn zero_latitude_is_rejected_as_missing() {
        let (app, store) = app();
        post_json(&app, "/update-coordinates", json!({ "latitude": 12.5, "longitude": 77.5 })).await;

        let (status, ack) =
            post_json(&app, "/update-coordinates", json!({ "latitude": 0, "longitude": 77.5 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ack, json!({ "success": false, "error": "Invalid coordinates" }));
        assert_eq!(
            serde_json::to_value(store.snapshot().coordinates).unwrap(),
            json!({ "latitude": 12.5, "longitude": 77.5 })
        );
    }

    #[tokio::test]
    async fn partial_or_mistyped_coordinates_are_rejected() {
        let (app, store) = app();
        for body in [
            json!({ "latitude": 12.5 }),
            json!({ "longitude": 77.5 }),
            json!({ "latitude": null, "longitude": 77.5 }),
            json!({ "latitude": "12.5", "longitude": 77.5 }),
        ] {
            let (status, _) = post_json(&app, "/update-coordinates", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert_eq!(store.snapshot().coordinates, Coordinates::default());
        assert_eq!(store.revisions().coordinates, 0);
    }

    #[tokio::test]
    async fn bin_fill_replaces_without_merging() {
        let (app, _) = app();
        post_json(&app, "/update-bin-fill", json!({ "wetBin": 10, "dryBin": 20, "metalBin": 30 })).await;

        let (status, ack) = post_json(&app, "/update-bin-fill", json!({ "wetBin": 40 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "success": true }));

        assert_eq!(
            latest(&app).await["binFill"],
            json!({ "wetBin": 40, "dryBin": 0, "metalBin": 0 })
        );
    }

    #[tokio::test]
    async fn null_bin_level_counts_as_omitted() {
        let (app, _) = app();
        post_json(&app, "/update-bin-fill", json!({ "wetBin": 10, "dryBin": 20, "metalBin": 30 })).await;

        let (status, _) =
            post_json(&app, "/update-bin-fill", json!({ "wetBin": null, "dryBin": 55, "metalBin": null })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            latest(&app).await["binFill"],
            json!({ "wetBin": 0, "dryBin": 55, "metalBin": 0 })
        );
    }

    #[tokio::test]
    async fn bin_levels_are_stored_without_type_checks() {
        let (app, _) = app();
        let (status, ack) =
            post_json(&app, "/update-bin-fill", json!({ "wetBin": "full", "dryBin": 20 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "success": true }));
        assert_eq!(
            latest(&app).await["binFill"],
            json!({ "wetBin": "full", "dryBin": 20, "metalBin": 0 })
        );
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_still_decoded() {
        let (app, store) = app();
        let req = Request::post("/update-coordinates")
            .body(Body::from(r#"{"latitude": 12.5, "longitude": 77.5}"#))
            .unwrap();
        let (status, ack) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "success": true }));
        assert_eq!(store.revisions().coordinates, 1);

        let req = Request::post("/update-waste")
            .header("content-type", "text/plain")
            .body(Body::from(r#"{"message": "wet waste"}"#))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest(&app).await["message"], json!("wet waste"));
    }

    #[tokio::test]
    async fn bin_fill_accepts_out_of_range_and_empty_bodies() {
        let (app, store) = app();
        post_json(&app, "/update-bin-fill", json!({ "wetBin": -3, "dryBin": 180.5, "metalBin": 100 })).await;
        assert_eq!(
            serde_json::to_value(store.snapshot().bin_fill).unwrap(),
            json!({ "wetBin": -3, "dryBin": 180.5, "metalBin": 100 })
        );

        let (status, _) = post(&app, "/update-bin-fill", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.snapshot().bin_fill, BinFill::default());
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_errors() {
        let (app, store) = app();
        let cases = [
            ("/update-waste", "No message provided"),
            ("/update-coordinates", "Invalid coordinates"),
            ("/update-bin-fill", "Invalid bin fill payload"),
        ];
        for (path, error) in cases {
            let (status, ack) = post(&app, path, "{not json").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(ack, json!({ "success": false, "error": error }));
        }

        // arrays are not payload objects
        let (status, _) = post(&app, "/update-coordinates", "[12.5, 77.5]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post(&app, "/update-bin-fill", "[40, 0, 0]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(store.snapshot(), Snapshot::default());

        // the relay is still serving afterwards
        let (status, _) = post_json(&app, "/update-waste", json!({ "message": "ok" })).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn repeated_write_yields_same_state() {
        let (app, store) = app();
        let body = json!({ "latitude": 12.5, "longitude": 77.5 });
        post_json(&app, "/update-coordinates", body.clone()).await;
        let once = store.snapshot();
        post_json(&app, "/update-coordinates", body).await;
        assert_eq!(store.snapshot(), once);
    }

    #[tokio::test]
    async fn concurrent_messages_leave_exactly_one_winner() {
        let (app, store) = app();
        let sent: Vec<String> = (0..16).map(|i| format!("reading-{i}")).collect();

        let tasks: Vec<_> = sent
            .iter()
            .cloned()
            .map(|m| {
                let app = app.clone();
                tokio::spawn(async move { post_json(&app, "/update-waste", json!({ "message": m })).await })
            })
            .collect();
        for t in tasks {
            assert_eq!(t.await.unwrap().0, StatusCode::OK);
        }

        let message = latest(&app).await["message"].as_str().unwrap().to_string();
        assert!(sent.contains(&message));
        assert_eq!(store.revisions().message, 16);
    }
}

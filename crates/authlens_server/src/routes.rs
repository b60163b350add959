//! HTTP routes for the inference service.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use authlens_core::backend::AdNdArray;
use authlens_core::CaptureClassifier;

use crate::{ApiError, DetectionEngine};

/// Upload size cap (the detector input is 299x299; anything bigger than
/// this is not a plausible photo upload).
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for route handlers.
pub struct AppState<M>
where
    M: CaptureClassifier<AdNdArray>,
{
    /// The inference engine.
    pub engine: Arc<DetectionEngine<M>>,
    /// One-permit gate so queued requests wait in the async layer instead
    /// of occupying blocking threads on the engine's model lock.
    pub gate: Arc<Semaphore>,
}

impl<M> Clone for AppState<M>
where
    M: CaptureClassifier<AdNdArray>,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            gate: self.gate.clone(),
        }
    }
}

/// Response body for `POST /predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted class: 0 = real, 1 = manipulated.
    pub prediction: usize,
    /// Confidence percentage, rounded to two decimals.
    pub confidence: f32,
    /// GradCAM overlay as base64 JPEG; null for real images.
    pub heatmap: Option<String>,
}

/// Build the service router around an engine.
pub fn app<M>(engine: Arc<DetectionEngine<M>>) -> Router
where
    M: CaptureClassifier<AdNdArray> + 'static,
{
    let state = AppState {
        engine,
        gate: Arc::new(Semaphore::new(1)),
    };

    Router::new()
        .route("/predict", post(predict::<M>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// `POST /predict` - classify one uploaded image.
///
/// Accepts multipart form data with a single image file field. Responds
/// with the class index, the confidence, and - only for manipulated
/// results - the heatmap overlay as base64 JPEG.
async fn predict<M>(
    State(state): State<AppState<M>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError>
where
    M: CaptureClassifier<AdNdArray> + 'static,
{
    let field = multipart
        .next_field()
        .await?
        .ok_or_else(|| ApiError::new("missing image file field"))?;
    let upload = field.bytes().await?;

    // Queue here rather than on the engine's model lock.
    let _permit = state
        .gate
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ApiError::new(format!("inference gate closed: {e}")))?;

    let engine = state.engine.clone();
    let analysis = tokio::task::spawn_blocking(move || engine.analyze(&upload)).await??;

    Ok(Json(PredictResponse {
        prediction: analysis.prediction.label.as_index(),
        confidence: analysis.prediction.confidence,
        heatmap: analysis.overlay_jpeg.map(|jpeg| BASE64.encode(jpeg)),
    }))
}

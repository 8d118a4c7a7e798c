use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::error::{ApiError, ImageDecodeError, InferenceError};
use crate::models::PredictionResponse;
use crate::preprocess::{preprocess, ImageBatch};
use crate::verdict::Verdict;

const IMAGE_FIELD: &str = "image";
const HEALTHY: &str = "It's a Match! 🐝🌼 Let's check out some 🖼️...";
const UNAVAILABLE: &str = "The BEEpi is currently unavailable 🐝💔... Please try again later.";

/// Shared, read-only state handed to every request.
pub struct AppState {
    classifier: Option<Arc<dyn Classifier>>,
    emoji: bool,
}

impl AppState {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, emoji: bool) -> Self {
        Self { classifier, emoji }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/bee_check").route(web::post().to(bee_check)))
        .service(web::resource("/health").route(web::get().to(health)));
}

pub async fn bee_check(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, "Received request to /api/bee_check");

    let bytes = match read_image_field(payload).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            tracing::warn!(%request_id, "No image provided");
            return Err(ApiError::MissingImage);
        }
        Err(e) => {
            tracing::error!(%request_id, "Error processing the image: {}", e);
            return Err(e.into());
        }
    };

    let batch = match web::block(move || preprocess(&bytes)).await {
        Ok(Ok(batch)) => batch,
        Ok(Err(e)) => {
            tracing::error!(%request_id, "Error processing the image: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            tracing::error!(%request_id, "Error processing the image: {}", e);
            return Err(ImageDecodeError::Upload(e.to_string()).into());
        }
    };
    tracing::debug!(%request_id, "Image processed successfully");

    let prediction = match run_inference(state.classifier.clone(), batch).await {
        Ok(score) => score,
        Err(e) => {
            tracing::error!(%request_id, "Error during the inference: {}", e);
            return Err(e.into());
        }
    };

    let verdict = Verdict::from_score(prediction);
    if state.emoji {
        tracing::info!(
            %request_id,
            "Prediction: {} ({} {})",
            prediction,
            verdict.label(),
            verdict.emoji()
        );
    } else {
        tracing::info!(%request_id, "Prediction: {} ({})", prediction, verdict.label());
    }

    Ok(HttpResponse::Ok().json(PredictionResponse {
        prediction,
        tldr: state.emoji.then_some(verdict),
    }))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    tracing::info!("Health Check Requested 🐝👩‍⚕️");
    if state.model_loaded() {
        HttpResponse::Ok().body(HEALTHY)
    } else {
        HttpResponse::ServiceUnavailable().body(UNAVAILABLE)
    }
}

/// Drains the multipart stream and returns the bytes of the `image` file part.
/// A body that is not valid multipart counts as having no image.
async fn read_image_field(mut payload: Multipart) -> Result<Option<Vec<u8>>, ImageDecodeError> {
    let mut image = None;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                tracing::debug!("Stopped reading multipart body: {}", e);
                break;
            }
        };

        // Only file parts count as uploads; a text part named `image` does not.
        let disposition = field.content_disposition();
        let is_image =
            disposition.get_name() == Some(IMAGE_FIELD) && disposition.get_filename().is_some();
        let mut buf = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ImageDecodeError::Upload(e.to_string()))?;
            if is_image {
                buf.extend_from_slice(&data);
            }
        }

        if is_image && image.is_none() {
            image = Some(buf);
        }
    }

    Ok(image)
}

async fn run_inference(
    classifier: Option<Arc<dyn Classifier>>,
    batch: ImageBatch,
) -> Result<f32, InferenceError> {
    let classifier = classifier.ok_or_else(|| InferenceError::new("model is not loaded"))?;
    web::block(move || classifier.predict(&batch))
        .await
        .map_err(|e| InferenceError::new(e.to_string()))?
}

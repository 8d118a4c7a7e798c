use std::path::PathBuf;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
#[error("failed to load model from {}: {reason}", .path.display())]
pub struct ModelLoadError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ImageDecodeError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("could not build input tensor: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("could not read upload: {0}")]
    Upload(String),
}

#[derive(Error, Debug)]
#[error("{0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure of one `/api/bee_check` call. The `Display` output carries the
/// internal detail for logs; the HTTP body only ever carries `public_message`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no image field in request")]
    MissingImage,

    #[error("{0}")]
    ImageProcessing(#[from] ImageDecodeError),

    #[error("{0}")]
    Inference(#[from] InferenceError),
}

impl ApiError {
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "No image provided",
            ApiError::ImageProcessing(_) => "Error processing the image",
            ApiError::Inference(_) => "Error during the inference",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            ApiError::ImageProcessing(_) | ApiError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

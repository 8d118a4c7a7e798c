use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;

use bee_check::preprocess::ImageBatch;
use bee_check::{handlers, AppState, Classifier, InferenceError, OnnxClassifier};

const BOUNDARY: &str = "----beecheckboundary";

/// Returns a fixed score and counts how often it was asked.
struct FixedScore {
    score: f32,
    calls: AtomicUsize,
}

impl FixedScore {
    fn new(score: f32) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Classifier for FixedScore {
    fn predict(&self, batch: &ImageBatch) -> Result<f32, InferenceError> {
        assert_eq!(batch.shape(), &[1, 480, 480, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

struct Broken;

impl Classifier for Broken {
    fn predict(&self, _batch: &ImageBatch) -> Result<f32, InferenceError> {
        Err(InferenceError::new("CUDA out of memory at layer conv2d_7"))
    }
}

fn red_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn multipart(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_part(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

fn post_multipart(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/bee_check")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

fn upload(field: &str, data: &[u8]) -> test::TestRequest {
    post_multipart(multipart(field, data))
}

async fn call(state: AppState, req: test::TestRequest) -> (StatusCode, Vec<u8>) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(handlers::configure),
    )
    .await;
    let resp = test::call_service(&app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    (status, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[actix_rt::test]
async fn health_reports_loaded_model() {
    let state = AppState::new(Some(FixedScore::new(0.5)), false);
    let (status, body) = call(state, test::TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("It's a Match!"));
}

#[actix_rt::test]
async fn health_reports_missing_model() {
    let state = AppState::new(None, false);
    let (status, body) = call(state, test::TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(String::from_utf8(body).unwrap().contains("unavailable"));
}

#[actix_rt::test]
async fn red_png_yields_prediction() {
    let model = FixedScore::new(0.42);
    let state = AppState::new(Some(model.clone()), false);
    let (status, body) = call(state, upload("image", &red_png())).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let prediction = body["prediction"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&prediction));
    assert!((prediction - 0.42).abs() < 1e-6);
    assert!(body.get("tldr").is_none());
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn emoji_mode_adds_tldr() {
    for (score, label) in [(0.9, "positive"), (0.7, "uncertain"), (0.2, "negative")] {
        let state = AppState::new(Some(FixedScore::new(score)), true);
        let (status, body) = call(state, upload("image", &red_png())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["tldr"], label);
    }
}

#[actix_rt::test]
async fn no_tldr_without_emoji_mode() {
    for score in [0.0, 0.3, 0.7, 0.99] {
        let state = AppState::new(Some(FixedScore::new(score)), false);
        let (_, body) = call(state, upload("image", &red_png())).await;
        let body = json(&body);
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert!(body.get("tldr").is_none());
    }
}

#[actix_rt::test]
async fn missing_image_field_is_rejected() {
    let model = FixedScore::new(0.5);
    let state = AppState::new(Some(model.clone()), true);
    let (status, body) = call(state, upload("picture", &red_png())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), serde_json::json!({"error": "No image provided"}));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn text_field_named_image_is_not_an_upload() {
    let model = FixedScore::new(0.5);
    let state = AppState::new(Some(model.clone()), false);
    let (status, body) = call(state, post_multipart(text_part("image", "not-a-file"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), serde_json::json!({"error": "No image provided"}));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn non_multipart_body_counts_as_missing_image() {
    let model = FixedScore::new(0.5);
    let state = AppState::new(Some(model.clone()), false);
    let req = test::TestRequest::post()
        .uri("/api/bee_check")
        .set_payload("hello");
    let (status, body) = call(state, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "No image provided");
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn malformed_image_is_a_processing_error() {
    let model = FixedScore::new(0.5);
    let state = AppState::new(Some(model.clone()), false);
    let (status, body) = call(state, upload("image", b"\x89PNG but not really")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body), serde_json::json!({"error": "Error processing the image"}));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn inference_failure_hides_detail() {
    let state = AppState::new(Some(Arc::new(Broken)), false);
    let (status, body) = call(state, upload("image", &red_png())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body), serde_json::json!({"error": "Error during the inference"}));
    assert!(!String::from_utf8(body).unwrap().contains("CUDA"));
}

#[actix_rt::test]
async fn unloaded_model_fails_inference() {
    let state = AppState::new(None, true);
    let (status, body) = call(state, upload("image", &red_png())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "Error during the inference");
}

#[actix_rt::test]
async fn red_png_through_onnx_model() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mean_sigmoid.onnx");
    let model = OnnxClassifier::load(path).unwrap();
    let state = AppState::new(Some(Arc::new(model)), true);
    let (status, body) = call(state, upload("image", &red_png())).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    // Solid red averages to 1/3 across the three channels.
    let expected = 1.0 / (1.0 + (-1.0_f64 / 3.0).exp());
    let prediction = body["prediction"].as_f64().unwrap();
    assert!((prediction - expected).abs() < 1e-3, "{prediction}");
    assert_eq!(body["tldr"], "uncertain");
}

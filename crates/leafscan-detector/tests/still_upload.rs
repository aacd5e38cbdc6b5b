//! Still-image upload flow, against fakes and a mock HTTP service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use leafscan_client::{
    ClientConfig, ClientError, ClientResult, ImageUpload, InferenceClient, InferenceService,
    LiveFrame, StillPrediction,
};
use leafscan_detector::{LiveError, StillImageDetector};
use leafscan_media::MediaError;
use leafscan_models::{BoundingBox, CropRect, DetectionResult, LiveDetection, PixelRect, Prediction, Size};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::sigatoka;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Records each upload and answers with a fixed result.
struct CapturingInference {
    result: DetectionResult,
    uploads: Mutex<Vec<ImageUpload>>,
}

impl CapturingInference {
    fn new(result: DetectionResult) -> Self {
        Self {
            result,
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InferenceService for CapturingInference {
    async fn predict_image(&self, upload: ImageUpload) -> ClientResult<StillPrediction> {
        self.uploads.lock().push(upload);
        Ok(StillPrediction {
            result: self.result.clone(),
            elapsed: Duration::from_millis(120),
        })
    }

    async fn live_detect(&self, _frame: LiveFrame) -> ClientResult<LiveDetection> {
        Err(ClientError::InvalidConfig("still-image fake".to_string()))
    }
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    }))
}

fn client_for(server: &MockServer) -> Arc<InferenceClient> {
    Arc::new(
        InferenceClient::new(ClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            ..Default::default()
        })
        .expect("client"),
    )
}

#[tokio::test]
async fn crop_submits_exact_natural_region() {
    let inference = Arc::new(CapturingInference::new(sigatoka()));
    let detector = StillImageDetector::new(inference.clone());
    let image = gradient(1000, 500);

    // Preview is 500x250, so display coordinates double in natural space.
    let crop = CropRect::new(PixelRect::new(10.0, 20.0, 100.0, 50.0));
    let outcome = detector.detect(&image, Some(&crop)).await.unwrap();

    assert!(outcome.cropped);
    assert_eq!(outcome.natural, Size::new(200.0, 100.0));
    assert_eq!(outcome.display, Size::new(200.0, 100.0));

    let uploads = inference.uploads.lock();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "cropped.jpg");
    assert_eq!(uploads[0].mime, "image/jpeg");

    let sent = image::load_from_memory(&uploads[0].bytes).unwrap();
    assert_eq!(sent.dimensions(), (200, 100));
    for (x, y) in [(0, 0), (100, 50), (199, 99)] {
        let expected = image.get_pixel(x + 20, y + 40);
        let actual = sent.get_pixel(x, y);
        for channel in 0..3 {
            let diff = (expected.0[channel] as i32 - actual.0[channel] as i32).abs();
            assert!(diff <= 12, "pixel ({x},{y}) channel {channel}: {expected:?} vs {actual:?}");
        }
    }
}

#[tokio::test]
async fn uncropped_overlay_is_scaled_to_display() {
    let inference = Arc::new(CapturingInference::new(sigatoka()));
    let detector = StillImageDetector::new(inference.clone());

    let outcome = detector.detect(&gradient(1000, 500), None).await.unwrap();

    assert!(!outcome.cropped);
    assert_eq!(inference.uploads.lock()[0].file_name, "image.jpg");
    assert_eq!(outcome.display, Size::new(500.0, 250.0));

    // Box (10,10)-(50,60) at half scale lands at (5,5)-(25,30).
    let annotated = outcome.annotated.image();
    assert_eq!(annotated.dimensions(), (500, 250));
    assert_eq!(*annotated.get_pixel(5, 20), RED);
    assert_ne!(*annotated.get_pixel(15, 20), RED);
}

#[tokio::test]
async fn guidance_follows_detected_disease() {
    let wilt = DetectionResult::new(vec![Prediction::new(
        "Fusarium Wilt",
        0.77,
        BoundingBox::new(0.0, 0.0, 20.0, 20.0),
    )]);
    let detector = StillImageDetector::new(Arc::new(CapturingInference::new(wilt)));
    let outcome = detector.detect(&gradient(64, 64), None).await.unwrap();
    assert_eq!(outcome.guidance.unwrap().title, "Fusarium Wilt Solution");

    let healthy = DetectionResult::new(vec![Prediction::new(
        "healthy",
        0.99,
        BoundingBox::new(0.0, 0.0, 20.0, 20.0),
    )]);
    let detector = StillImageDetector::new(Arc::new(CapturingInference::new(healthy)));
    let outcome = detector.detect(&gradient(64, 64), None).await.unwrap();
    assert!(outcome.guidance.is_none());

    let summary = serde_json::to_value(outcome.summary()).unwrap();
    assert_eq!(summary["predictions"][0]["class"], "healthy");
    assert!(summary["treatment"].is_null());
}

#[tokio::test]
async fn detect_file_round_trip_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predict/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{
                "class": "black sigatoka",
                "confidence": 0.92,
                "bbox": {"x1": 10.0, "y1": 10.0, "x2": 50.0, "y2": 60.0}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("leaf.png");
    gradient(300, 200).save(&file).unwrap();

    let detector = StillImageDetector::new(client_for(&server));
    let outcome = detector.detect_file(&file, None).await.unwrap();

    assert_eq!(outcome.result.len(), 1);
    assert_eq!(outcome.guidance.unwrap().title, "Black Sigatoka Solution");
    assert_eq!(outcome.display, Size::new(300.0, 200.0));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("filename=\"image.jpg\""));

    let saved = dir.path().join("annotated.png");
    outcome.annotated.save(&saved).unwrap();
    assert!(saved.exists());
}

#[tokio::test]
async fn service_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/predict/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "No image provided"})))
        .mount(&server)
        .await;

    let detector = StillImageDetector::new(client_for(&server));
    let err = match detector.detect(&gradient(32, 32), None).await {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };

    match err {
        LiveError::Inference(ClientError::Status { status, detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail.as_deref(), Some("No image provided"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_and_bad_crop_are_rejected() {
    let inference = Arc::new(CapturingInference::new(sigatoka()));
    let detector = StillImageDetector::new(inference.clone());

    let missing = detector
        .detect_file(std::path::Path::new("/nonexistent/leaf.jpg"), None)
        .await;
    assert!(matches!(missing, Err(LiveError::Media(MediaError::FileNotFound(_)))));

    let outside = CropRect::new(PixelRect::new(400.0, 200.0, 200.0, 200.0));
    let result = detector.detect(&gradient(1000, 500), Some(&outside)).await;
    assert!(matches!(result, Err(LiveError::Media(MediaError::CropOutOfBounds { .. }))));

    assert!(inference.uploads.lock().is_empty());
}

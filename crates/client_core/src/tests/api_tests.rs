use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode as HttpStatus,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::PredictionId;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Debug)]
struct UploadedPart {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

struct CaptureState<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for CaptureState<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> CaptureState<T> {
    fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    async fn capture(&self, value: T) {
        if let Some(tx) = self.tx.lock().await.take() {
            let _ = tx.send(value);
        }
    }
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn handle_predict(
    State(state): State<CaptureState<Vec<UploadedPart>>>,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("field") {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("bytes").to_vec();
        parts.push(UploadedPart {
            field: field_name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.capture(parts).await;
    Json(json!({
        "label": "Cimex",
        "probability": 0.12,
        "confidence": 0.88,
        "model_version": "ignored"
    }))
}

#[tokio::test]
async fn predict_uploads_single_image_field() {
    let (state, rx) = CaptureState::new();
    let app = Router::new()
        .route("/predict", post(handle_predict))
        .with_state(state);
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    let image = ImageFile::new("bite.jpg", "image/jpeg", b"jpeg-bytes".to_vec());
    let result = api.predict(&image).await.expect("predict");
    assert_eq!(
        result,
        PredictionResult {
            label: "Cimex".into(),
            probability: 0.12,
            confidence: 0.88,
        }
    );

    let parts = rx.await.expect("upload captured");
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].field, "image");
    assert_eq!(parts[0].file_name.as_deref(), Some("bite.jpg"));
    assert_eq!(parts[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(parts[0].bytes, b"jpeg-bytes");
}

#[tokio::test]
async fn predict_surfaces_fastapi_error_detail() {
    let app = Router::new().route(
        "/predict",
        post(|| async {
            (
                HttpStatus::BAD_REQUEST,
                Json(json!({ "detail": "Only JPG or PNG images allowed" })),
            )
        }),
    );
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    let image = ImageFile::new("bite.gif", "image/gif", b"gif".to_vec());
    let err = api.predict(&image).await.expect_err("must fail");
    match err {
        ApiClientError::Status { status, detail } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(detail, "Only JPG or PNG images allowed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn predict_rejects_body_missing_fields() {
    let app = Router::new().route(
        "/predict",
        post(|| async { Json(json!({ "label": "Cimex" })) }),
    );
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    let image = ImageFile::new("bite.jpg", "image/jpeg", b"jpeg".to_vec());
    let err = api.predict(&image).await.expect_err("must fail");
    assert!(matches!(err, ApiClientError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn save_posts_summary_json() {
    let (state, rx) = CaptureState::<Value>::new();
    let app = Router::new()
        .route(
            "/save",
            post(
                |State(state): State<CaptureState<Value>>, Json(body): Json<Value>| async move {
                    state.capture(body).await;
                    Json(json!({ "status": "saved", "id": 1 }))
                },
            ),
        )
        .with_state(state);
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    api.save(&SavePredictionRequest {
        label: "Non-Cimex".into(),
        confidence: 0.75,
        image_name: "sheet.png".into(),
    })
    .await
    .expect("save");

    let body = rx.await.expect("body captured");
    assert_eq!(
        body,
        json!({ "label": "Non-Cimex", "confidence": 0.75, "image_name": "sheet.png" })
    );
}

#[tokio::test]
async fn save_reports_server_failure() {
    let app = Router::new().route(
        "/save",
        post(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "") }),
    );
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    let err = api
        .save(&SavePredictionRequest {
            label: "Cimex".into(),
            confidence: 0.9,
            image_name: "a.png".into(),
        })
        .await
        .expect_err("must fail");
    match err {
        ApiClientError::Status { status, detail } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(detail, "Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn reads_health_history_and_stats() {
    let app = Router::new()
        .route(
            "/health",
            get(|| async {
                Json(json!({ "status": "healthy", "model_loaded": true, "api_version": "1.0.0" }))
            }),
        )
        .route(
            "/history",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let limit: usize = query
                    .get("limit")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100);
                let records: Vec<Value> = (0..3)
                    .rev()
                    .take(limit)
                    .map(|id| {
                        json!({
                            "id": id,
                            "label": "Cimex",
                            "confidence": 0.9,
                            "probability": 0.1,
                            "image_name": format!("img{id}.png"),
                            "created_at": "2025-01-05T08:00:00"
                        })
                    })
                    .collect();
                Json(records)
            }),
        )
        .route(
            "/stats",
            get(|| async {
                Json(json!({
                    "total_predictions": 7,
                    "cimex_detected": 3,
                    "non_cimex": 2,
                    "uncertain": 2
                }))
            }),
        );
    let api = DetectorApi::new(&spawn_server(app).await).expect("api");

    assert!(api.health().await.expect("health").is_ready());

    let history = api.history(2).await.expect("history");
    let ids: Vec<_> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, [PredictionId(2), PredictionId(1)]);

    let stats = api.stats().await.expect("stats");
    assert_eq!(stats.total_predictions, 7);
    assert_eq!(stats.cimex_detected, 3);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let api = DetectorApi::new(&format!("http://{addr}")).expect("api");
    let err = api.health().await.expect_err("must fail");
    assert!(matches!(err, ApiClientError::Transport(_)), "{err:?}");
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let api = DetectorApi::new("http://localhost:8000/").expect("api");
    assert_eq!(api.base_url(), "http://localhost:8000");
    assert_eq!(api.endpoint("predict"), "http://localhost:8000/predict");
}

#[test]
fn rejects_unusable_base_urls() {
    for raw in ["", "localhost:8000", "ftp://example.com", "not a url"] {
        let err = DetectorApi::new(raw).expect_err(raw);
        assert!(
            matches!(err, ApiClientError::InvalidBaseUrl { .. }),
            "{raw}: {err:?}"
        );
    }
}

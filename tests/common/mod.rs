//! Shared helpers for router tests: a counting fake model and request builders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use base64::Engine;
use gemini_relay::credential::CredentialGate;
use gemini_relay::error::RelayError;
use gemini_relay::gateway::Gateway;
use gemini_relay::http::{build_router, AppState};
use gemini_relay::model::ModelRoles;
use gemini_relay::ports::{
    ContentRequest, FileUpload, GenerativeModel, ModelFuture, ModelResponse, Part, RemoteFile,
};
use gemini_relay::storage::ImageStore;
use tower::ServiceExt;

pub const BOUNDARY: &str = "gemini-relay-test-boundary";

/// Model that answers every call with the same parts and counts calls.
#[derive(Default)]
pub struct FakeModel {
    parts: Vec<Part>,
    failure: Option<String>,
    calls: AtomicUsize,
    deletes: AtomicUsize,
    uploads: Mutex<Vec<FileUpload>>,
    requests: Mutex<Vec<ContentRequest>>,
}

impl FakeModel {
    pub fn answering(parts: Vec<Part>) -> Arc<Self> {
        Arc::new(Self { parts, ..Self::default() })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self { failure: Some(message.to_string()), ..Self::default() })
    }

    /// Every upstream call, including uploads and deletes.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Every `generate_content` request, in call order.
    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().iter().map(|u| u.path.clone()).collect()
    }
}

impl GenerativeModel for FakeModel {
    fn generate_content(&self, request: &ContentRequest) -> ModelFuture<'_, ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let result = match &self.failure {
            Some(message) => Err(RelayError::Api { status: 500, message: message.clone() }),
            None => Ok(ModelResponse { parts: self.parts.clone() }),
        };
        Box::pin(async move { result })
    }

    fn upload_file(&self, upload: &FileUpload) -> ModelFuture<'_, RemoteFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(upload.path.exists(), "staged file must exist while uploading");
        self.uploads.lock().unwrap().push(upload.clone());
        let remote = RemoteFile {
            name: "files/fake".into(),
            uri: "https://generativelanguage.googleapis.com/v1beta/files/fake".into(),
            mime_type: upload.mime_type.clone(),
        };
        Box::pin(async move { Ok(remote) })
    }

    fn delete_file(&self, _name: &str) -> ModelFuture<'_, ()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(()) })
    }
}

/// Fresh, empty image directory for one test.
pub fn image_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gemini_relay_http_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Router over a model, with or without an API key.
pub fn app_with(model: Arc<dyn GenerativeModel>, key: Option<&str>, images: &Path) -> Router {
    let gateway = Gateway::new(
        model,
        CredentialGate::new(key.map(str::to_string)),
        ModelRoles::resolve("flash", "nano-banana").unwrap(),
    );
    build_router(AppState::new(Arc::new(gateway), ImageStore::new(images)), 1024 * 1024)
}

pub fn app(model: &Arc<FakeModel>, key: Option<&str>, images: &Path) -> Router {
    app_with(Arc::clone(model) as Arc<dyn GenerativeModel>, key, images)
}

pub fn text(t: &str) -> Part {
    Part::Text { text: t.into() }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = std::io::Cursor::new(Vec::<u8>::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn png_part(width: u32, height: u32) -> Part {
    Part::InlineData { mime_type: "image/png".into(), data: png_bytes(width, height) }
}

pub fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart request with text fields and an optional `file` part.
pub fn post_multipart(uri: &str, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// Send one request and return status plus raw body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Response<Body>) {
    let response = app.oneshot(request).await.unwrap();
    (response.status(), response)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

/// Send one request and parse the JSON body.
pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, response) = send(app, request).await;
    let bytes = body_bytes(response).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

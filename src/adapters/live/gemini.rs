//! Live adapter for the Gemini `generateContent` and Files APIs.

use std::time::Duration;

use base64::Engine;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::credential::CredentialGate;
use crate::error::RelayError;
use crate::ports::generative_model::{
    ContentRequest, FileUpload, GenerativeModel, Modality, ModelFuture, ModelResponse, Part,
    RemoteFile, RequestPart, Tool,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_UPLOAD_BASE: &str = "https://generativelanguage.googleapis.com/upload/v1beta/files";

/// Polls spent waiting for an uploaded file to leave `PROCESSING`.
const ACTIVE_POLL_ATTEMPTS: usize = 15;
const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Live Gemini client that calls the Google AI API.
pub struct GeminiClient {
    client: Client,
    gate: CredentialGate,
    api_base: String,
    upload_base: String,
    poll_attempts: usize,
    poll_interval: Duration,
}

impl GeminiClient {
    /// Create a client that takes its API key from the gate on every call.
    #[must_use]
    pub fn new(gate: CredentialGate) -> Self {
        Self::with_endpoints(gate, GEMINI_API_BASE, GEMINI_UPLOAD_BASE)
    }

    /// Create a client against other API and upload roots.
    #[must_use]
    pub fn with_endpoints(gate: CredentialGate, api_base: &str, upload_base: &str) -> Self {
        Self {
            client: Client::new(),
            gate,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.to_string(),
            poll_attempts: ACTIVE_POLL_ATTEMPTS,
            poll_interval: ACTIVE_POLL_INTERVAL,
        }
    }

    /// Override how long an upload may stay in `PROCESSING`.
    #[must_use]
    pub fn with_polling(mut self, attempts: usize, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    async fn wait_for_active(&self, key: &str, mut file: GeminiFile) -> Result<GeminiFile, RelayError> {
        for _ in 0..self.poll_attempts {
            match file.state.as_deref().unwrap_or("ACTIVE") {
                "ACTIVE" => return Ok(file),
                "FAILED" => {
                    return Err(RelayError::Api {
                        status: 200,
                        message: format!("File processing failed for {}", file.name),
                    });
                }
                _ => {}
            }

            tokio::time::sleep(self.poll_interval).await;
            let response = self
                .client
                .get(format!("{}/{}", self.api_base, file.name))
                .header("x-goog-api-key", key)
                .send()
                .await?;
            file = ensure_success(response).await?.json::<GeminiFile>().await?;
        }

        Err(RelayError::Api {
            status: 200,
            message: format!("Timed out waiting for file {} to become active", file.name),
        })
    }

    async fn remove(&self, key: &str, name: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .delete(format!("{}/{name}", self.api_base))
            .header("x-goog-api-key", key)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

impl GenerativeModel for GeminiClient {
    fn generate_content(&self, request: &ContentRequest) -> ModelFuture<'_, ModelResponse> {
        let request = request.clone();
        Box::pin(async move {
            let key = self.gate.verify()?;
            let url = format!("{}/models/{}:generateContent", self.api_base, request.model);

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", key)
                .json(&request_body(&request))
                .send()
                .await?;

            let response_text = ensure_success(response).await?.text().await?;

            let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
                RelayError::Api { status: 200, message: format!("Failed to parse response: {e}") }
            })?;

            parse_response(parsed)
        })
    }

    fn upload_file(&self, upload: &FileUpload) -> ModelFuture<'_, RemoteFile> {
        let upload = upload.clone();
        Box::pin(async move {
            let key = self.gate.verify()?;
            let bytes = tokio::fs::read(&upload.path).await?;

            let start = self
                .client
                .post(&self.upload_base)
                .header("x-goog-api-key", key)
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
                .header("X-Goog-Upload-Header-Content-Type", &upload.mime_type)
                .json(&json!({ "file": { "display_name": upload.display_name } }))
                .send()
                .await?;
            let start = ensure_success(start).await?;

            let upload_url = start
                .headers()
                .get("x-goog-upload-url")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| RelayError::Api {
                    status: start.status().as_u16(),
                    message: "File upload did not return an upload URL".to_string(),
                })?;

            let finalize = self
                .client
                .post(upload_url)
                .header("X-Goog-Upload-Command", "upload, finalize")
                .header("X-Goog-Upload-Offset", "0")
                .body(bytes)
                .send()
                .await?;
            let uploaded = ensure_success(finalize).await?.json::<GeminiFileEnvelope>().await?.file;

            let name = uploaded.name.clone();
            let file = match self.wait_for_active(key, uploaded).await {
                Ok(file) => file,
                Err(e) => {
                    if let Err(cleanup) = self.remove(key, &name).await {
                        tracing::warn!(remote = %name, "Failed to delete unusable upload: {cleanup}");
                    }
                    return Err(e);
                }
            };
            Ok(RemoteFile {
                name: file.name,
                uri: file.uri,
                mime_type: file.mime_type.unwrap_or(upload.mime_type),
            })
        })
    }

    fn delete_file(&self, name: &str) -> ModelFuture<'_, ()> {
        let name = name.to_string();
        Box::pin(async move {
            let key = self.gate.verify()?;
            self.remove(key, &name).await
        })
    }
}

/// Turn a non-2xx response into [`RelayError::Api`] carrying the upstream message.
async fn ensure_success(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Api { status: status.as_u16(), message: error_message(&body) })
}

/// Pull `error.message` out of a Google error body, falling back to a truncated body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| truncate(body, 500))
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    }
}

fn request_body(request: &ContentRequest) -> Value {
    let parts: Vec<Value> = request.parts.iter().map(part_json).collect();
    let mut body = json!({
        "contents": [{ "role": "user", "parts": parts }]
    });

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| match tool {
                Tool::GoogleSearch => json!({ "google_search": {} }),
                Tool::UrlContext => json!({ "url_context": {} }),
            })
            .collect();
        body["tools"] = Value::Array(tools);
    }

    if !request.response_modalities.is_empty() {
        let modalities: Vec<&str> = request
            .response_modalities
            .iter()
            .map(|m| match m {
                Modality::Text => "TEXT",
                Modality::Image => "IMAGE",
            })
            .collect();
        body["generationConfig"] = json!({ "responseModalities": modalities });
    }

    body
}

fn part_json(part: &RequestPart) -> Value {
    match part {
        RequestPart::Text { text } => json!({ "text": text }),
        RequestPart::FileData { file_uri, mime_type } => {
            let mut file_data = json!({ "fileUri": file_uri });
            if let Some(mime) = mime_type {
                file_data["mimeType"] = json!(mime);
            }
            json!({ "fileData": file_data })
        }
        RequestPart::InlineData { mime_type, data } => json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(data),
            }
        }),
    }
}

fn parse_response(parsed: GeminiResponse) -> Result<ModelResponse, RelayError> {
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map_or_else(String::new, |r| format!(" (blocked: {r})"));
        return Err(RelayError::Api {
            status: 200,
            message: format!("No candidates in response{reason}"),
        });
    };

    let parts = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .map(GeminiPart::into_part)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelResponse { parts })
}

// --- Gemini API response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
    #[serde(default)]
    thought: bool,
}

impl GeminiPart {
    fn into_part(self) -> Result<Part, RelayError> {
        if let Some(inline) = self.inline_data {
            let data = base64::engine::general_purpose::STANDARD.decode(&inline.data).map_err(
                |e| RelayError::Api { status: 200, message: format!("Failed to decode base64: {e}") },
            )?;
            return Ok(Part::InlineData { mime_type: inline.mime_type, data });
        }
        match self.text {
            Some(text) if !self.thought => Ok(Part::Text { text }),
            _ => Ok(Part::Other),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GeminiFileEnvelope {
    file: GeminiFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    uri: String,
    mime_type: Option<String>,
    state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_with_search_tool_and_text_modality() {
        let request = ContentRequest::new("gemini-2.5-flash", vec![RequestPart::text("news?")])
            .with_tools(vec![Tool::GoogleSearch, Tool::UrlContext])
            .with_modalities(vec![Modality::Text]);
        let body = request_body(&request);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "news?");
        assert_eq!(body["tools"][0], json!({ "google_search": {} }));
        assert_eq!(body["tools"][1], json!({ "url_context": {} }));
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["TEXT"]));
    }

    #[test]
    fn body_without_tools_omits_keys() {
        let request = ContentRequest::new("gemini-2.5-flash", vec![RequestPart::text("hi")]);
        let body = request_body(&request);
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn file_and_inline_parts() {
        let file = part_json(&RequestPart::FileData {
            file_uri: "https://www.youtube.com/watch?v=abc".into(),
            mime_type: None,
        });
        assert_eq!(file["fileData"]["fileUri"], "https://www.youtube.com/watch?v=abc");
        assert!(file["fileData"].get("mimeType").is_none());

        let inline =
            part_json(&RequestPart::InlineData { mime_type: "image/png".into(), data: vec![1, 2, 3] });
        assert_eq!(inline["inlineData"]["mimeType"], "image/png");
        assert_eq!(inline["inlineData"]["data"], "AQID");
    }

    #[test]
    fn parse_mixed_parts_in_order() {
        let raw = r#"{"candidates":[{"content":{"parts":[
            {"text":"Here is your cat"},
            {"inlineData":{"mimeType":"image/png","data":"AQID"}},
            {"functionCall":{"name":"x"}},
            {"text":"thinking...","thought":true}
        ]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let response = parse_response(parsed).unwrap();
        assert_eq!(
            response.parts,
            vec![
                Part::Text { text: "Here is your cat".into() },
                Part::InlineData { mime_type: "image/png".into(), data: vec![1, 2, 3] },
                Part::Other,
                Part::Other,
            ]
        );
    }

    #[test]
    fn parse_blocked_prompt() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let err = parse_response(parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("plain failure"), "plain failure");
        assert!(error_message(&"x".repeat(600)).ends_with("..."));
    }

    mod files_api {
        use std::io::Write;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        use axum::extract::State;
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use serde_json::{json, Value};

        use crate::adapters::live::gemini::GeminiClient;
        use crate::credential::CredentialGate;
        use crate::ports::generative_model::{FileUpload, GenerativeModel};

        #[derive(Clone)]
        struct FakeFiles {
            base: String,
            poll_state: &'static str,
            deletes: Arc<AtomicUsize>,
        }

        fn file_json(state: &str) -> Value {
            json!({
                "name": "files/abc",
                "uri": "https://example.invalid/v1beta/files/abc",
                "mimeType": "text/plain",
                "state": state,
            })
        }

        /// Serve a Files API stand-in whose uploads stay `PROCESSING` until
        /// polled, then report `poll_state`.
        async fn serve(poll_state: &'static str) -> (String, Arc<AtomicUsize>) {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let deletes = Arc::new(AtomicUsize::new(0));
            let state = FakeFiles { base: base.clone(), poll_state, deletes: Arc::clone(&deletes) };

            let app = Router::new()
                .route(
                    "/upload",
                    post(|State(s): State<FakeFiles>| async move {
                        ([("x-goog-upload-url", format!("{}/session", s.base))], Json(json!({})))
                    }),
                )
                .route(
                    "/session",
                    post(|| async { Json(json!({ "file": file_json("PROCESSING") })) }),
                )
                .route(
                    "/files/:id",
                    get(|State(s): State<FakeFiles>| async move { Json(file_json(s.poll_state)) })
                        .delete(|State(s): State<FakeFiles>| async move {
                            s.deletes.fetch_add(1, Ordering::SeqCst);
                            Json(json!({}))
                        }),
                )
                .with_state(state);
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (base, deletes)
        }

        fn client(base: &str, attempts: usize) -> GeminiClient {
            GeminiClient::with_endpoints(
                CredentialGate::new(Some("test-key".into())),
                base,
                &format!("{base}/upload"),
            )
            .with_polling(attempts, Duration::from_millis(5))
        }

        fn staged() -> tempfile::NamedTempFile {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"hello").unwrap();
            file
        }

        fn upload_of(file: &tempfile::NamedTempFile) -> FileUpload {
            FileUpload {
                path: file.path().to_path_buf(),
                mime_type: "text/plain".into(),
                display_name: "notes.txt".into(),
            }
        }

        #[tokio::test]
        async fn active_upload_is_kept() {
            let (base, deletes) = serve("ACTIVE").await;
            let file = staged();
            let remote = client(&base, 3).upload_file(&upload_of(&file)).await.unwrap();
            assert_eq!(remote.name, "files/abc");
            assert_eq!(remote.mime_type, "text/plain");
            assert_eq!(deletes.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn failed_processing_deletes_remote_file() {
            let (base, deletes) = serve("FAILED").await;
            let file = staged();
            let err = client(&base, 3).upload_file(&upload_of(&file)).await.unwrap_err();
            assert!(err.to_string().contains("processing failed"), "{err}");
            assert_eq!(deletes.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn processing_timeout_deletes_remote_file() {
            let (base, deletes) = serve("PROCESSING").await;
            let file = staged();
            let err = client(&base, 2).upload_file(&upload_of(&file)).await.unwrap_err();
            assert!(err.to_string().contains("Timed out"), "{err}");
            assert_eq!(deletes.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn delete_file_targets_resource_name() {
            let (base, deletes) = serve("ACTIVE").await;
            client(&base, 1).delete_file("files/abc").await.unwrap();
            assert_eq!(deletes.load(Ordering::SeqCst), 1);
        }
    }
}

//! Axum route handler for the upload-to-analysis pipeline.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::analysis::extract::{classify_mime, extract_text};
use crate::analysis::prompts::CRITIQUE_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub analysis: String,
}

/// POST /upload
///
/// Accepts exactly one file per invocation via multipart form encoding,
/// extracts its text (PDF text layer or OCR), and returns the upstream
/// critique as a single HTML-tagged string.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload_field(&mut multipart).await?;

    let kind = classify_mime(&upload.mime)
        .ok_or_else(|| AppError::UnsupportedMediaType(upload.mime.clone()))?;

    debug!(
        "Uploaded file: name={:?}, mime={}, bytes={}",
        upload.file_name,
        upload.mime,
        upload.data.len()
    );

    // Transient storage: a uniquely named file, removed on drop whether
    // extraction succeeds or fails.
    let temp = NamedTempFile::new_in(&state.config.upload_dir)
        .map_err(|e| AppError::Internal(e.into()))?;
    tokio::fs::write(temp.path(), &upload.data)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let extracted = extract_text(kind, temp.path())
        .await
        .map_err(|e| AppError::Extraction(format!("{e:#}")))?;
    drop(temp);

    let prompt = CRITIQUE_PROMPT_TEMPLATE.replace("{extracted_text}", &extracted);
    let segments = state
        .llm
        .complete(&prompt)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(UploadResponse {
        analysis: segments.join("\n"),
    }))
}

struct UploadField {
    file_name: Option<String>,
    mime: String,
    data: Bytes,
}

/// Scans the multipart body for the single `file` field.
async fn read_upload_field(multipart: &mut Multipart) -> Result<UploadField, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(String::from);
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {e}")))?;

        return Ok(UploadField {
            file_name,
            mime,
            data,
        });
    }

    Err(AppError::MissingFile)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::{CompletionClient, LlmError};
    use crate::routes::build_router;

    /// One-page fixture whose text layer is exactly "Hello World".
    const HELLO_PDF: &[u8] = include_bytes!("../../testdata/hello.pdf");
    const BOUNDARY: &str = "X-UPLOAD-TEST-BOUNDARY";

    /// Mock upstream: records every prompt, returns canned segments.
    struct MockCompletion {
        prompts: Mutex<Vec<String>>,
        response: Result<Vec<String>, String>,
    }

    impl MockCompletion {
        fn returning(segments: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                response: Ok(segments.iter().map(|s| s.to_string()).collect()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                response: Err(message.to_string()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for MockCompletion {
        async fn complete(&self, prompt: &str) -> Result<Vec<String>, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(segments) => Ok(segments.clone()),
                Err(message) => Err(LlmError::Api {
                    status: 500,
                    message: message.clone(),
                }),
            }
        }
    }

    fn test_state(llm: Arc<MockCompletion>, upload_dir: &Path) -> AppState {
        AppState {
            llm,
            config: Config {
                anthropic_api_key: "test-key".to_string(),
                port: 0,
                upload_dir: upload_dir.to_string_lossy().into_owned(),
                model: "claude-3-sonnet-20240229".to_string(),
                max_tokens: 500,
                rust_log: "info".to_string(),
            },
        }
    }

    fn multipart_request(
        field_name: &str,
        file_name: &str,
        mime: &str,
        data: &[u8],
    ) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_pdf_upload_returns_analysis_and_prompt_carries_extracted_text() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::returning(&["<p>Great layout.</p>"]);
        let app = build_router(test_state(mock.clone(), upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "file",
                "hello.pdf",
                "application/pdf",
                HELLO_PDF,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["analysis"], "<p>Great layout.</p>");

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Hello World"));
        assert!(dir_is_empty(upload_dir.path()));
    }

    #[tokio::test]
    async fn test_analysis_joins_content_segments_with_newline() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::returning(&["A.", "B."]);
        let app = build_router(test_state(mock, upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "file",
                "hello.pdf",
                "application/pdf",
                HELLO_PDF,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["analysis"], "A.\nB.");
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_400_and_never_calls_upstream() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::returning(&["should never be returned"]);
        let app = build_router(test_state(mock.clone(), upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "file",
                "notes.txt",
                "text/plain",
                b"just some text",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("text/plain"));

        assert!(mock.prompts().is_empty());
        assert!(dir_is_empty(upload_dir.path()));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400_and_writes_no_temp_file() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::returning(&["unused"]);
        let app = build_router(test_state(mock.clone(), upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "attachment",
                "hello.pdf",
                "application/pdf",
                HELLO_PDF,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"], "No file uploaded");

        assert!(mock.prompts().is_empty());
        assert!(dir_is_empty(upload_dir.path()));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_and_leaves_no_temp_file() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::failing("upstream down");
        let app = build_router(test_state(mock, upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "file",
                "hello.pdf",
                "application/pdf",
                HELLO_PDF,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
        assert!(dir_is_empty(upload_dir.path()));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_500_and_leaves_no_temp_file() {
        let upload_dir = tempfile::tempdir().unwrap();
        let mock = MockCompletion::returning(&["unused"]);
        let app = build_router(test_state(mock.clone(), upload_dir.path()));

        let response = app
            .oneshot(multipart_request(
                "file",
                "broken.pdf",
                "application/pdf",
                b"%PDF-1.4 truncated garbage",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await;
        assert!(body["error"].as_str().is_some());

        assert!(mock.prompts().is_empty());
        assert!(dir_is_empty(upload_dir.path()));
    }
}

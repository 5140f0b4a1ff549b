//! Recognition service: the page image goes in, untrusted text and tables
//! come out.
//!
//! [`RecognitionClient`] is the seam the orchestrator calls. Its outcome is
//! never trusted: `raw_text` may itself be a serialised copy of the whole
//! answer, which [`crate::pipeline::normalize`] repairs afterwards.
//!
//! [`VlmRecognitionClient`] implements it over any `edgequake_llm`
//! provider.
//!
//! ## Retry Strategy
//!
//! Transient failures are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`). Quota errors (HTTP 429) are returned
//! immediately: retrying inside the quota window only burns the next one.

use crate::config::ExtractionConfig;
use crate::error::RecognitionError;
use crate::output::{DocumentType, TableSet};
use crate::pipeline::cleanup::{clean_recognized_text, strip_code_fences};
use crate::pipeline::encode::encode_page_file;
use crate::pipeline::normalize::{
    looks_like_object, tables_from_value, KEY_DOCUMENT_TYPE, KEY_TABLES, KEY_TEXT, KEY_TRANSLATED,
};
use crate::prompts::{
    translation_request, PLAIN_OCR_PROMPT, STRUCTURED_EXTRACTION_PROMPT,
    TRANSLATION_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// What the recognition service returned for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub succeeded: bool,
    pub raw_text: String,
    pub translated_text: Option<String>,
    pub document_type: DocumentType,
    pub structured_tables: TableSet,
    pub model_id: String,
    pub error: Option<String>,
}

impl RecognitionOutcome {
    /// A successful outcome carrying only text.
    pub fn succeeded(text: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            raw_text: text.into(),
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    /// An unsuccessful outcome with an error description.
    pub fn failed(error: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            model_id: model_id.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_translation(mut self, text: impl Into<String>) -> Self {
        self.translated_text = Some(text.into());
        self
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn with_tables(mut self, tables: TableSet) -> Self {
        self.structured_tables = tables;
        self
    }
}

/// External recognition and translation capability.
///
/// An `Err` and an outcome with `succeeded == false` are handled the same way.
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Identifier recorded in raw records.
    fn model_id(&self) -> &str;

    /// Full text, translation, document type and tables in one call.
    async fn recognize_structured(
        &self,
        image: &Path,
    ) -> Result<RecognitionOutcome, RecognitionError>;

    /// Text only.
    async fn recognize_plain(&self, image: &Path) -> Result<RecognitionOutcome, RecognitionError>;

    /// Translate `text` written in `source_language` (a short code such as `it`).
    async fn translate(&self, text: &str, source_language: &str)
        -> Result<String, RecognitionError>;
}

// ── VLM implementation ───────────────────────────────────────────────────

/// [`RecognitionClient`] backed by a vision-capable `edgequake_llm` provider.
pub struct VlmRecognitionClient {
    provider: Arc<dyn LLMProvider>,
    model_id: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl VlmRecognitionClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            model_id: config.model_label(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    /// One chat call with timeout, retries and backoff. Returns the content.
    async fn chat(&self, messages: &[ChatMessage], label: &str) -> Result<String, RecognitionError> {
        let start = Instant::now();
        let options = self.options();
        let mut last_err: Option<String> = None;
        let mut timed_out = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    label, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = self.provider.chat(messages, Some(&options));
            match timeout(Duration::from_secs(self.api_timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        label,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    let message = format!("{}", e);
                    if is_quota_error(&message) {
                        warn!("{}: quota exceeded, not retrying: {}", label, message);
                        return Err(RecognitionError::RateLimited { message });
                    }
                    warn!("{}: attempt {} failed: {}", label, attempt + 1, message);
                    timed_out = false;
                    last_err = Some(message);
                }
                Err(_) => {
                    warn!(
                        "{}: attempt {} timed out after {}s",
                        label,
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    timed_out = true;
                }
            }
        }

        if timed_out {
            return Err(RecognitionError::Timeout {
                secs: self.api_timeout_secs,
            });
        }
        Err(RecognitionError::Api {
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
            retries: self.max_retries,
        })
    }
}

#[async_trait]
impl RecognitionClient for VlmRecognitionClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn recognize_structured(
        &self,
        image: &Path,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let image_data = encode_page_file(image).await?;
        let messages = vec![
            ChatMessage::system(STRUCTURED_EXTRACTION_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let content = self.chat(&messages, "structured").await?;
        Ok(parse_structured_response(&content, &self.model_id))
    }

    async fn recognize_plain(&self, image: &Path) -> Result<RecognitionOutcome, RecognitionError> {
        let image_data = encode_page_file(image).await?;
        let messages = vec![
            ChatMessage::system(PLAIN_OCR_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let content = self.chat(&messages, "plain").await?;
        let text = clean_recognized_text(&content);
        if text.is_empty() {
            return Err(RecognitionError::EmptyResponse);
        }
        Ok(RecognitionOutcome::succeeded(text, self.model_id.clone()))
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
    ) -> Result<String, RecognitionError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let messages = vec![
            ChatMessage::system(TRANSLATION_SYSTEM_PROMPT),
            ChatMessage::user_with_images(translation_request(text, source_language), vec![]),
        ];
        let content = self.chat(&messages, "translate").await?;
        let translated = clean_recognized_text(&content);
        if translated.is_empty() {
            return Err(RecognitionError::EmptyResponse);
        }
        Ok(translated)
    }
}

/// Interpret the model's answer to the structured prompt.
///
/// A bare JSON object is split into its fields. Anything else is kept
/// verbatim as text; if it looks like a broken object the normaliser will
/// discard it.
pub fn parse_structured_response(content: &str, model_id: &str) -> RecognitionOutcome {
    let body = strip_code_fences(content);
    if body.is_empty() {
        return RecognitionOutcome::failed("empty response from recognition service", model_id);
    }

    let map = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        _ => {
            debug!("Structured answer is not a JSON object; keeping it as text");
            return RecognitionOutcome::succeeded(body, model_id);
        }
    };

    let raw_text = text_field(&map, KEY_TEXT).unwrap_or_default();
    let raw_text = if looks_like_object(&raw_text) {
        raw_text
    } else {
        clean_recognized_text(&raw_text)
    };

    let mut outcome = RecognitionOutcome::succeeded(raw_text, model_id)
        .with_document_type(
            map.get(KEY_DOCUMENT_TYPE)
                .and_then(Value::as_str)
                .map(DocumentType::from_label)
                .unwrap_or_default(),
        )
        .with_tables(map.get(KEY_TABLES).map(tables_from_value).unwrap_or_default());

    if let Some(translated) = text_field(&map, KEY_TRANSLATED).filter(|t| !t.trim().is_empty()) {
        outcome = outcome.with_translation(translated);
    }
    outcome
}

/// A text field as a string. Objects are re-serialised so the normaliser
/// can open them.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        v @ Value::Object(_) => Some(v.to_string()),
        _ => None,
    }
}

/// Whether a provider error means the quota is exhausted.
pub fn is_quota_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    message.contains("429")
        || ((lower.contains("quota") || lower.contains("exceeded"))
            && (lower.contains("rate")
                || lower.contains("limit")
                || lower.contains("per minute")
                || lower.contains("per day")))
}

//! Configuration types for PDF-to-JSON extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The orchestrator reads the config once
//! when it is constructed; nothing is re-read while pages are in flight.

use crate::error::Pdf2JsonError;
use crate::output::Language;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when a provider is named without an explicit model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for a PDF-to-JSON extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .concurrency(4)
///     .structured_extraction(false)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Number of pages in flight at once. Default: 7.
    ///
    /// Each page holds a rasterised PNG on disk and one recognition call in
    /// flight; lower this if the provider starts answering with `429`.
    pub concurrency: usize,

    /// Try the structured tier (pre-structured tables from the service)
    /// before falling back to plain text. Default: true.
    pub structured_extraction: bool,

    /// Only process the first `max_pages` pages. Default: all.
    pub max_pages: Option<usize>,

    /// Languages that are never translated. Default: Spanish, English.
    pub native_languages: Vec<Language>,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps either dimension regardless of physical page size so an
    /// oversized scan cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    ///
    /// Structured answers repeat the page text twice (original and
    /// translation) next to the tables, so they run longer than plain OCR.
    pub max_tokens: usize,

    /// Retry attempts on a transient recognition failure. Default: 3.
    /// Quota errors are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory receiving `raw/` and `structured/` artifacts. Default: `output`.
    pub output_dir: PathBuf,

    /// Directory for per-anomaly JSON files. None disables anomaly tracking.
    pub anomaly_dir: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-call recognition timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Receives `(message, percentage)` progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: 7,
            structured_extraction: true,
            max_pages: None,
            native_languages: vec![Language::Spanish, Language::English],
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            output_dir: PathBuf::from("output"),
            anomaly_dir: None,
            download_timeout_secs: 120,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("concurrency", &self.concurrency)
            .field("structured_extraction", &self.structured_extraction)
            .field("max_pages", &self.max_pages)
            .field("native_languages", &self.native_languages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("output_dir", &self.output_dir)
            .field("anomaly_dir", &self.anomaly_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model label recorded in raw records.
    pub fn model_label(&self) -> String {
        match (&self.model, &self.provider) {
            (Some(m), _) => m.clone(),
            (None, Some(_)) => "custom".to_string(),
            (None, None) if self.provider_name.is_some() => DEFAULT_MODEL.to_string(),
            (None, None) => "auto".to_string(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn structured_extraction(mut self, enabled: bool) -> Self {
        self.config.structured_extraction = enabled;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn native_languages(mut self, languages: Vec<Language>) -> Self {
        self.config.native_languages = languages;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn anomaly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.anomaly_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2JsonError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Pdf2JsonError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_pages == Some(0) {
            return Err(Pdf2JsonError::InvalidConfig(
                "max_pages must be ≥ 1 when set".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Pdf2JsonError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Pdf2JsonError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.concurrency, 7);
        assert!(c.structured_extraction);
        assert_eq!(c.native_languages, vec![Language::Spanish, Language::English]);
        assert_eq!(c.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn builder_clamps_values() {
        let c = ExtractionConfig::builder()
            .concurrency(0)
            .temperature(5.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn build_rejects_zero_max_pages() {
        let err = ExtractionConfig::builder().max_pages(0).build().unwrap_err();
        assert!(err.to_string().contains("max_pages"));
    }

    #[test]
    fn model_label_prefers_explicit_model() {
        let c = ExtractionConfig::builder().model("gemini-2.0-flash").build().unwrap();
        assert_eq!(c.model_label(), "gemini-2.0-flash");
        assert_eq!(ExtractionConfig::default().model_label(), "auto");
        let named = ExtractionConfig::builder().provider_name("openai").build().unwrap();
        assert_eq!(named.model_label(), DEFAULT_MODEL);
    }
}

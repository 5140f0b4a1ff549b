//! Page-extraction orchestration and the top-level entry points.
//!
//! [`PageOrchestrator`] fans a document's pages out to a bounded pool, runs
//! the two-tier extraction for each page, and reassembles the results in
//! page order. Every page that was split off the PDF comes back as exactly
//! one [`PageResult`]: a page that cannot be extracted is replaced by a
//! degraded result carrying the error. The one exception is a page whose
//! degraded result could not be built either; it is listed in
//! [`ExtractionStats::missing_pages`].
//!
//! [`extract`] and friends wire the default collaborators (pdfium, a vision
//! LLM, the heuristic mapper) from an [`ExtractionConfig`].

use crate::anomaly::{
    find_anomalies, record_findings, AnomalyKind, AnomalyRecord, AnomalyTracker,
    JsonDirAnomalyTracker, NoopAnomalyTracker,
};
use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{PageError, Pdf2JsonError};
use crate::output::{
    ExtractionOutput, ExtractionStats, ExtractionTier, Language, PageHeader, PageResult,
    RawRecord, RecognitionSummary, RecordKind, RecordMetadata, TableSet,
};
use crate::pipeline::assemble::assemble;
use crate::pipeline::input;
use crate::pipeline::mapper::{DocumentMapper, HeuristicDocumentMapper};
use crate::pipeline::normalize::{normalize, Payload};
use crate::pipeline::persist::{
    raw_file_name, structured_file_name, DirectoryStore, ResultStore, RAW_SUBFOLDER,
    STRUCTURED_SUBFOLDER,
};
use crate::pipeline::recognition::{RecognitionClient, RecognitionOutcome, VlmRecognitionClient};
use crate::pipeline::render::{PageImage, PageSource, PdfiumPageSource};
use crate::progress::{
    page_percentage, ExtractionProgressCallback, PROGRESS_DONE, PROGRESS_SPLIT, PROGRESS_START,
};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives the per-page pipeline for one document at a time.
///
/// Collaborators are injected as trait objects; the structured-tier toggle,
/// pool width and native languages are fixed at construction.
pub struct PageOrchestrator {
    source: Arc<dyn PageSource>,
    client: Arc<dyn RecognitionClient>,
    mapper: Arc<dyn DocumentMapper>,
    tracker: Arc<dyn AnomalyTracker>,
    concurrency: usize,
    structured_extraction: bool,
    native_languages: Arc<[Language]>,
}

impl PageOrchestrator {
    pub fn new(
        source: Arc<dyn PageSource>,
        client: Arc<dyn RecognitionClient>,
        mapper: Arc<dyn DocumentMapper>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            source,
            client,
            mapper,
            tracker: Arc::new(NoopAnomalyTracker),
            concurrency: config.concurrency.max(1),
            structured_extraction: config.structured_extraction,
            native_languages: config.native_languages.clone().into(),
        }
    }

    /// Record anomalies into `tracker` instead of discarding them.
    pub fn with_tracker(mut self, tracker: Arc<dyn AnomalyTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Split `pdf_path` into pages and extract each one.
    ///
    /// Returns `Err` only if the document cannot be split into pages. Once
    /// pages exist, per-page failures are folded into degraded results and
    /// progress always ends at 100.
    pub async fn process_document(
        &self,
        pdf_path: &Path,
        progress: Option<&dyn ExtractionProgressCallback>,
        max_pages: Option<usize>,
    ) -> Result<ExtractionOutput, Pdf2JsonError> {
        let start = Instant::now();
        let document_name = input::document_name(pdf_path);
        let report = |message: &str, percentage: u8| {
            if let Some(cb) = progress {
                cb.on_progress(message, percentage);
            }
        };
        info!("Starting extraction: {}", pdf_path.display());

        // ── Step 1: Split the PDF into page images ───────────────────────────
        report("splitting PDF", PROGRESS_START);
        let work_dir = tempfile::Builder::new()
            .prefix("pdf2json-")
            .tempdir()
            .map_err(|e| Pdf2JsonError::Internal(format!("tempdir: {e}")))?;

        let mut images = self
            .source
            .rasterize(pdf_path, work_dir.path(), max_pages)
            .await?;
        if let Some(limit) = max_pages {
            images.truncate(limit);
        }
        let total = images.len();
        report(&format!("PDF split into {total} pages"), PROGRESS_SPLIT);
        info!(
            "{}: {} pages, {} in flight",
            document_name, total, self.concurrency
        );

        // ── Step 2: Fan out, one task per page ───────────────────────────────
        let completed = Mutex::new(0usize);
        let outcomes: Vec<(usize, Option<PageResult>)> = stream::iter(images.into_iter().map(|image| {
            let page_index = image.page_index();
            let ctx = self.page_context(&document_name);
            let completed = &completed;
            async move {
                let handle = tokio::spawn(ctx.clone().run(image));
                let result = match handle.await {
                    Ok(result) => Some(result),
                    Err(join_err) => {
                        let recovered = ctx.recover(page_index, join_err);
                        if let Some(ref degraded) = recovered {
                            ctx.record_failure(degraded).await;
                        }
                        recovered
                    }
                };

                let mut done = completed.lock().unwrap_or_else(|e| e.into_inner());
                *done += 1;
                report(
                    &format!("page {page_index} done ({}/{total})", *done),
                    page_percentage(*done, total),
                );
                drop(done);

                (page_index, result)
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        // ── Step 3: Fan in, ascending page order ─────────────────────────────
        let mut ordered = BTreeMap::new();
        let mut missing_pages = Vec::new();
        for (page_index, result) in outcomes {
            match result {
                Some(result) => {
                    ordered.insert(page_index, result);
                }
                None => missing_pages.push(page_index),
            }
        }
        missing_pages.sort_unstable();
        let pages: Vec<PageResult> = ordered.into_values().collect();

        // ── Step 4: Stats ────────────────────────────────────────────────────
        let count_tier = |tier: ExtractionTier| pages.iter().filter(|p| p.tier == tier).count();
        let stats = ExtractionStats {
            total_pages: total,
            succeeded_pages: pages.iter().filter(|p| !p.is_degraded()).count(),
            degraded_pages: pages.iter().filter(|p| p.is_degraded()).count(),
            missing_pages,
            structured_pages: count_tier(ExtractionTier::Structured),
            plain_pages: count_tier(ExtractionTier::Plain),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Extraction complete: {}/{} pages, {} degraded, {} missing, {}ms",
            stats.succeeded_pages,
            total,
            stats.degraded_pages,
            stats.missing_pages.len(),
            stats.duration_ms
        );
        report("extraction complete", PROGRESS_DONE);

        Ok(ExtractionOutput {
            document_name,
            pages,
            stats,
        })
    }

    /// Persist each page's raw record and structured document.
    ///
    /// Returns the written paths, raw before structured, in page order.
    pub async fn save_results(
        &self,
        pages: &[PageResult],
        store: &dyn ResultStore,
    ) -> Result<Vec<PathBuf>, Pdf2JsonError> {
        let mut written = Vec::with_capacity(pages.len() * 2);
        for page in pages {
            let raw_name = raw_file_name(&page.document_name, page.page_index);
            let raw = to_json(&raw_name, &page.raw)?;
            written.push(store.save_json(RAW_SUBFOLDER, &raw_name, &raw).await?);

            let structured_name = structured_file_name(&page.document_name, page.page_index);
            let structured = to_json(&structured_name, &page.structured)?;
            written.push(
                store
                    .save_json(STRUCTURED_SUBFOLDER, &structured_name, &structured)
                    .await?,
            );
        }
        info!("Saved {} artifacts", written.len());
        Ok(written)
    }

    fn page_context(&self, document_name: &str) -> PageContext {
        PageContext {
            document_name: document_name.into(),
            client: Arc::clone(&self.client),
            mapper: Arc::clone(&self.mapper),
            tracker: Arc::clone(&self.tracker),
            structured_extraction: self.structured_extraction,
            native_languages: Arc::clone(&self.native_languages),
        }
    }
}

fn to_json<T: serde::Serialize>(name: &str, value: &T) -> Result<serde_json::Value, Pdf2JsonError> {
    serde_json::to_value(value).map_err(|e| Pdf2JsonError::SerializationFailed {
        name: name.to_string(),
        source: e,
    })
}

// ── Per-page work ────────────────────────────────────────────────────────

/// Everything one page task needs, owned so it can cross `tokio::spawn`.
#[derive(Clone)]
struct PageContext {
    document_name: Arc<str>,
    client: Arc<dyn RecognitionClient>,
    mapper: Arc<dyn DocumentMapper>,
    tracker: Arc<dyn AnomalyTracker>,
    structured_extraction: bool,
    native_languages: Arc<[Language]>,
}

/// Output of whichever tier succeeded.
struct TierOutput {
    tier: ExtractionTier,
    outcome: RecognitionOutcome,
    header: PageHeader,
    table_set: TableSet,
    /// The service already supplied a translation.
    translated: bool,
}

impl PageContext {
    /// Extract one page. The image is released when this returns.
    async fn run(self, image: PageImage) -> PageResult {
        let page_index = image.page_index();
        match self.extract_page(&image).await {
            Ok(result) => result,
            Err(err) => {
                warn!("{} page {}: {}", self.document_name, page_index, err);
                let degraded = self.degraded(page_index, err);
                self.record_failure(&degraded).await;
                degraded
            }
        }
    }

    async fn extract_page(&self, image: &PageImage) -> Result<PageResult, PageError> {
        let page_index = image.page_index();

        // ── Tier 1: structured, unless disabled ──
        let structured = if self.structured_extraction {
            self.structured_tier(image.path(), page_index).await
        } else {
            None
        };

        // ── Tier 2: plain-text fallback ──
        let TierOutput {
            tier,
            outcome,
            mut header,
            table_set,
            translated,
        } = match structured {
            Some(output) => output,
            None => self.plain_tier(image.path(), page_index).await?,
        };

        if !translated {
            header.translated_text = self.translate_if_needed(&header, page_index).await;
        }

        let document = assemble(header, &table_set);
        let findings = find_anomalies(
            &self.document_name,
            page_index,
            &outcome.raw_text,
            &document,
        );
        self.record_anomalies(page_index, findings).await;

        debug!(
            "{} page {}: {:?} tier, {:?}",
            self.document_name,
            page_index,
            tier,
            document.tables.counts()
        );

        Ok(PageResult {
            document_name: self.document_name.to_string(),
            page_index,
            tier,
            raw: self.raw_record(page_index, &outcome),
            structured: document,
            error: None,
        })
    }

    async fn structured_tier(&self, path: &Path, page_index: usize) -> Option<TierOutput> {
        let mut outcome = match self.client.recognize_structured(path).await {
            Ok(outcome) if outcome.succeeded => outcome,
            Ok(outcome) => {
                warn!(
                    "{} page {}: structured extraction unsuccessful ({}), falling back to plain text",
                    self.document_name,
                    page_index,
                    outcome.error.as_deref().unwrap_or("no detail")
                );
                return None;
            }
            Err(e) => {
                warn!(
                    "{} page {}: structured extraction failed ({}), falling back to plain text",
                    self.document_name, page_index, e
                );
                return None;
            }
        };

        let payload = normalize(Payload {
            raw_text: std::mem::take(&mut outcome.raw_text),
            translated_text: outcome.translated_text.take(),
            document_type: outcome.document_type,
            tables: std::mem::take(&mut outcome.structured_tables),
        });
        outcome.raw_text = payload.raw_text;
        outcome.translated_text = payload.translated_text;
        outcome.document_type = payload.document_type;
        outcome.structured_tables = payload.tables;

        let mut header = self.mapper.map_to_header(&outcome);
        let translation = outcome
            .translated_text
            .as_deref()
            .filter(|t| !t.trim().is_empty());
        if let Some(text) = translation {
            header.translated_text = text.to_string();
        }
        let translated = translation.is_some();

        let table_set = self.mapper.validate_and_enhance(
            outcome.structured_tables.clone(),
            &outcome.raw_text,
            header.document_type(),
        );

        Some(TierOutput {
            tier: ExtractionTier::Structured,
            outcome,
            header,
            table_set,
            translated,
        })
    }

    async fn plain_tier(&self, path: &Path, page_index: usize) -> Result<TierOutput, PageError> {
        let outcome = match self.client.recognize_plain(path).await {
            Ok(outcome) if outcome.succeeded => outcome,
            Ok(outcome) => {
                return Err(PageError::RecognitionFailed {
                    page: page_index,
                    detail: outcome
                        .error
                        .unwrap_or_else(|| "plain recognition unsuccessful".to_string()),
                })
            }
            Err(e) => {
                return Err(PageError::RecognitionFailed {
                    page: page_index,
                    detail: e.to_string(),
                })
            }
        };

        let mut header = self.mapper.map_to_header(&outcome);
        let document_type = self.mapper.classify_type(&outcome.raw_text);
        header.document_type_id = document_type.id();
        let table_set = self.mapper.extract_tables(&outcome.raw_text, document_type);

        Ok(TierOutput {
            tier: ExtractionTier::Plain,
            outcome,
            header,
            table_set,
            translated: false,
        })
    }

    /// The translation to store: the service's answer for foreign pages,
    /// the original text otherwise or when translation fails.
    async fn translate_if_needed(&self, header: &PageHeader, page_index: usize) -> String {
        let text = &header.canonical_text;
        if text.trim().is_empty() || self.native_languages.contains(&header.language) {
            return text.clone();
        }

        match self.client.translate(text, header.language.code()).await {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => {
                warn!(
                    "{} page {}: empty translation, keeping original text",
                    self.document_name, page_index
                );
                text.clone()
            }
            Err(e) => {
                warn!(
                    "{} page {}: translation failed ({}), keeping original text",
                    self.document_name, page_index, e
                );
                text.clone()
            }
        }
    }

    fn raw_record(&self, page_index: usize, outcome: &RecognitionOutcome) -> RawRecord {
        let model = if outcome.model_id.is_empty() {
            self.client.model_id().to_string()
        } else {
            outcome.model_id.clone()
        };
        RawRecord {
            metadata: RecordMetadata::new(&self.document_name, page_index, RecordKind::Raw),
            recognition: RecognitionSummary {
                succeeded: outcome.succeeded,
                text: outcome.raw_text.clone(),
                model,
                error: outcome.error.clone(),
            },
            raw_text: outcome.raw_text.clone(),
        }
    }

    /// Record a degraded page's error as a parse_error anomaly.
    async fn record_failure(&self, degraded: &PageResult) {
        if let Some(ref error) = degraded.error {
            let anomaly = AnomalyRecord::new(
                &self.document_name,
                degraded.page_index,
                AnomalyKind::ParseError,
                error.to_string(),
            );
            self.record_anomalies(degraded.page_index, vec![anomaly]).await;
        }
    }

    /// Trackers may block on file I/O, so recording runs on the blocking pool.
    async fn record_anomalies(&self, page_index: usize, findings: Vec<AnomalyRecord>) {
        if findings.is_empty() {
            return;
        }
        let tracker = Arc::clone(&self.tracker);
        let document_name = Arc::clone(&self.document_name);
        let recorded = tokio::task::spawn_blocking(move || {
            record_findings(tracker.as_ref(), &document_name, page_index, findings)
        })
        .await;
        if let Err(e) = recorded {
            warn!(
                "{} page {}: anomaly recording aborted: {}",
                self.document_name, page_index, e
            );
        }
    }

    /// Valid but empty result standing in for a failed page.
    fn degraded(&self, page_index: usize, error: PageError) -> PageResult {
        let outcome = RecognitionOutcome::failed(error.to_string(), self.client.model_id());

        let mut header = self.mapper.map_to_header(&outcome);
        header.canonical_text.clear();
        header.translated_text.clear();
        let structured = assemble(header, &TableSet::new());

        PageResult {
            document_name: self.document_name.to_string(),
            page_index,
            tier: ExtractionTier::Failed,
            raw: self.raw_record(page_index, &outcome),
            structured,
            error: Some(error),
        }
    }

    /// Turn a panicked page task into a degraded result. `None` if even
    /// that panics.
    fn recover(&self, page_index: usize, join_err: tokio::task::JoinError) -> Option<PageResult> {
        let detail = if join_err.is_panic() {
            panic_message(join_err.into_panic())
        } else {
            join_err.to_string()
        };
        error!(
            "{} page {}: task panicked: {}",
            self.document_name, page_index, detail
        );

        let error = PageError::AssemblyFailed {
            page: page_index,
            detail,
        };
        match catch_unwind(AssertUnwindSafe(|| self.degraded(page_index, error))) {
            Ok(result) => Some(result),
            Err(payload) => {
                error!(
                    "{} page {}: no result could be built: {}",
                    self.document_name,
                    page_index,
                    panic_message(payload)
                );
                None
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ── Entry points with default collaborators ──────────────────────────────

/// Extract a PDF file or URL with the default collaborators.
///
/// # Errors
/// Returns `Err(Pdf2JsonError)` only for fatal errors: unreadable input,
/// not a PDF, pdfium or provider unavailable. Page failures show up as
/// degraded pages in the output.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let (_, output) = run_default(input_str.as_ref(), config).await?;
    Ok(output)
}

/// Extract and write every page's artifacts below `config.output_dir`.
pub async fn extract_to_dir(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let (orchestrator, output) = run_default(input_str.as_ref(), config).await?;
    let store = DirectoryStore::new(&config.output_dir);
    orchestrator.save_results(&output.pages, &store).await?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2JsonError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract a PDF held in memory. `document_name` names the artifacts.
///
/// ```rust,no_run
/// use edgequake_pdf2json::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("receipts.pdf")?;
/// let output = extract_from_bytes(&bytes, "receipts", &ExtractionConfig::default()).await?;
/// println!("{} pages", output.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    document_name: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let dir = tempfile::tempdir().map_err(|e| Pdf2JsonError::Internal(format!("tempdir: {e}")))?;
    let path = dir.path().join(format!("{document_name}.pdf"));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Pdf2JsonError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
    // `dir` is dropped (and the file deleted) when `extract` returns
    extract(path.to_string_lossy(), config).await
}

async fn run_default(
    input_str: &str,
    config: &ExtractionConfig,
) -> Result<(PageOrchestrator, ExtractionOutput), Pdf2JsonError> {
    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config).await?;

    // ── Step 3: Wire collaborators ───────────────────────────────────────
    let orchestrator = PageOrchestrator::new(
        Arc::new(PdfiumPageSource::from_config(config)),
        Arc::new(VlmRecognitionClient::new(provider, config)),
        Arc::new(HeuristicDocumentMapper::new()),
        config,
    )
    .with_tracker(anomaly_tracker(config));

    // ── Step 4: Process ──────────────────────────────────────────────────
    let output = orchestrator
        .process_document(
            resolved.path(),
            config.progress_callback.as_deref(),
            config.max_pages,
        )
        .await?;
    Ok((orchestrator, output))
}

fn anomaly_tracker(config: &ExtractionConfig) -> Arc<dyn AnomalyTracker> {
    match config.anomaly_dir {
        Some(ref dir) => match JsonDirAnomalyTracker::new(dir) {
            Ok(tracker) => Arc::new(tracker),
            Err(e) => {
                warn!("Anomaly tracking disabled: {}", e);
                Arc::new(NoopAnomalyTracker)
            }
        },
        None => Arc::new(NoopAnomalyTracker),
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2JsonError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2JsonError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`].
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, Pdf2JsonError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2JsonError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic");
    }

    #[test]
    fn orchestrator_width_is_at_least_one() {
        use crate::pipeline::recognition::RecognitionOutcome;
        use async_trait::async_trait;

        struct NoPages;
        #[async_trait]
        impl PageSource for NoPages {
            async fn rasterize(
                &self,
                _: &Path,
                _: &Path,
                _: Option<usize>,
            ) -> Result<Vec<PageImage>, Pdf2JsonError> {
                Ok(Vec::new())
            }
        }

        struct Silent;
        #[async_trait]
        impl RecognitionClient for Silent {
            fn model_id(&self) -> &str {
                "silent"
            }
            async fn recognize_structured(
                &self,
                _: &Path,
            ) -> Result<RecognitionOutcome, crate::error::RecognitionError> {
                Ok(RecognitionOutcome::failed("silent", "silent"))
            }
            async fn recognize_plain(
                &self,
                _: &Path,
            ) -> Result<RecognitionOutcome, crate::error::RecognitionError> {
                Ok(RecognitionOutcome::failed("silent", "silent"))
            }
            async fn translate(
                &self,
                text: &str,
                _: &str,
            ) -> Result<String, crate::error::RecognitionError> {
                Ok(text.to_string())
            }
        }

        let config = ExtractionConfig {
            concurrency: 0,
            ..Default::default()
        };
        let orchestrator = PageOrchestrator::new(
            Arc::new(NoPages),
            Arc::new(Silent),
            Arc::new(HeuristicDocumentMapper::new()),
            &config,
        );
        assert_eq!(orchestrator.concurrency(), 1);

        let output = tokio_test::block_on(orchestrator.process_document(
            Path::new("empty.pdf"),
            None,
            None,
        ))
        .unwrap();
        assert!(output.pages.is_empty());
        assert_eq!(output.document_name, "empty");
        assert_eq!(output.stats.total_pages, 0);
    }
}

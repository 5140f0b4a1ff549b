//! Input resolution: turn a user-supplied path or URL into a local PDF.
//!
//! pdfium opens files, not byte buffers, so a URL is streamed into a
//! `TempDir` owned by the returned [`ResolvedInput`] and removed with it.
//! Both paths check the `%PDF` magic first, so a wrong file fails with
//! [`Pdf2JsonError::NotAPdf`] rather than somewhere inside pdfium.

use crate::error::Pdf2JsonError;
use futures::StreamExt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF on local disk, possibly inside a temp directory that lives as long
/// as this value.
#[derive(Debug)]
pub struct ResolvedInput {
    path: PathBuf,
    download_dir: Option<TempDir>,
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the PDF was fetched over HTTP.
    pub fn is_downloaded(&self) -> bool {
        self.download_dir.is_some()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` (a path or an http(s) URL) to a readable local PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2JsonError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Document name used in artifact file names: the file stem.
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// `Err(magic)` unless `head` starts with `%PDF`. Short heads are
/// zero-padded.
fn check_magic(head: &[u8]) -> Result<(), [u8; 4]> {
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    if &magic == PDF_MAGIC {
        Ok(())
    } else {
        Err(magic)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, Pdf2JsonError> {
    let path = PathBuf::from(path_str);

    let mut file = std::fs::File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2JsonError::PermissionDenied { path: path.clone() },
        _ => Pdf2JsonError::FileNotFound { path: path.clone() },
    })?;

    let mut head = Vec::with_capacity(4);
    file.by_ref()
        .take(4)
        .read_to_end(&mut head)
        .map_err(|_| Pdf2JsonError::PermissionDenied { path: path.clone() })?;
    if let Err(magic) = check_magic(&head) {
        return Err(Pdf2JsonError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput {
        path,
        download_dir: None,
    })
}

/// Stream `url` into a temp directory. The magic is checked on the first
/// bytes so an HTML error page is rejected before the body is written.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2JsonError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| Pdf2JsonError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let transport = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2JsonError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {status}")));
    }

    let download_dir = TempDir::new().map_err(|e| Pdf2JsonError::Internal(e.to_string()))?;
    let path = download_dir.path().join(download_file_name(url));
    let write_err = |e: std::io::Error| Pdf2JsonError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
    let mut body = response.bytes_stream();
    let mut head: Vec<u8> = Vec::with_capacity(4);
    let mut written = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(transport)?;
        if head.len() < 4 {
            let need = 4 - head.len();
            head.extend_from_slice(&chunk[..need.min(chunk.len())]);
            if head.len() == 4 {
                if let Err(magic) = check_magic(&head) {
                    return Err(Pdf2JsonError::NotAPdf { path: path.clone(), magic });
                }
            }
        }
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len();
    }
    file.flush().await.map_err(write_err)?;

    if let Err(magic) = check_magic(&head) {
        return Err(Pdf2JsonError::NotAPdf { path, magic });
    }

    info!("Downloaded {} bytes to {}", written, path.display());
    Ok(ResolvedInput {
        path,
        download_dir: Some(download_dir),
    })
}

/// Last path segment of `url`, forced to a `.pdf` name.
fn download_file_name(url: &str) -> String {
    let segment = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|last| !last.is_empty())
            .map(str::to_string)
    });
    match segment {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name,
        Some(name) => format!("{name}.pdf"),
        None => "downloaded.pdf".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_check_pads_short_input() {
        assert!(check_magic(b"%PDF-1.4").is_ok());
        assert_eq!(check_magic(b"%P"), Err(*b"%P\0\0"));
        assert_eq!(check_magic(b""), Err([0; 4]));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local("/no/such/file.pdf").unwrap_err();
        assert!(matches!(err, Pdf2JsonError::FileNotFound { .. }));
    }

    #[test]
    fn zip_file_is_rejected() {
        let file = temp_file(b"PK\x03\x04zip");
        let err = resolve_local(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Pdf2JsonError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = temp_file(b"");
        let err = resolve_local(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Pdf2JsonError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn local_pdf_resolves_in_place() {
        let file = temp_file(b"%PDF-1.7\n");
        let resolved = resolve_input(file.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), file.path());
        assert!(!resolved.is_downloaded());
    }

    #[test]
    fn download_names_end_in_pdf() {
        assert_eq!(download_file_name("https://x.org/files/inv-7.pdf?dl=1"), "inv-7.pdf");
        assert_eq!(download_file_name("https://x.org/get/12345"), "12345.pdf");
        assert_eq!(download_file_name("https://x.org/download/"), "downloaded.pdf");
    }

    #[test]
    fn document_name_is_file_stem() {
        assert_eq!(document_name(Path::new("/tmp/receipts_2024.pdf")), "receipts_2024");
        assert_eq!(document_name(Path::new("")), "document");
    }
}

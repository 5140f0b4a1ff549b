//! PDF rasterisation: split a document into one PNG file per page.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so the
//! Tokio workers driving recognition calls never stall on rendering.
//!
//! ## Page files
//!
//! Every rendered page is written to `{stem}_page_{n}.png` and handed out as
//! a [`PageImage`]. The handle owns the file: dropping it deletes it, so a
//! page's image disappears as soon as that page is finished, whatever the
//! outcome.

use crate::config::ExtractionConfig;
use crate::error::Pdf2JsonError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A rasterised page on disk. The file is removed when the handle drops.
#[derive(Debug)]
pub struct PageImage {
    page_index: usize,
    path: PathBuf,
}

impl PageImage {
    /// Take ownership of an existing image file for 1-indexed `page_index`.
    pub fn new(page_index: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            page_index,
            path: path.into(),
        }
    }

    /// 1-indexed page number.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PageImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed page image {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove page image {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Splits a PDF into page images.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Render the document's pages (at most `max_pages`) into `out_dir`,
    /// in ascending page order.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        max_pages: Option<usize>,
    ) -> Result<Vec<PageImage>, Pdf2JsonError>;
}

/// File name used for page `page_index` (1-indexed) of `pdf_path`.
pub fn page_file_name(pdf_path: &Path, page_index: usize) -> String {
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("{stem}_page_{page_index}.png")
}

/// [`PageSource`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumPageSource {
    max_rendered_pixels: u32,
    password: Option<String>,
}

impl PdfiumPageSource {
    pub fn new(max_rendered_pixels: u32, password: Option<String>) -> Self {
        Self {
            max_rendered_pixels,
            password,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.max_rendered_pixels, config.password.clone())
    }
}

#[async_trait]
impl PageSource for PdfiumPageSource {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        max_pages: Option<usize>,
    ) -> Result<Vec<PageImage>, Pdf2JsonError> {
        let path = pdf_path.to_path_buf();
        let out = out_dir.to_path_buf();
        let max_pixels = self.max_rendered_pixels;
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            render_pages_blocking(&path, &out, max_pixels, password.as_deref(), max_pages)
        })
        .await
        .map_err(|e| Pdf2JsonError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    max_pixels: u32,
    password: Option<&str>,
    max_pages: Option<usize>,
) -> Result<Vec<PageImage>, Pdf2JsonError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| Pdf2JsonError::PdfiumBindingFailed(e.to_string()))?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2JsonError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2JsonError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2JsonError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    std::fs::create_dir_all(out_dir).map_err(|e| Pdf2JsonError::OutputWriteFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let selected = max_pages.map_or(total_pages, |n| n.min(total_pages));
    info!("PDF loaded: {} pages, rendering {}", total_pages, selected);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    // Images already rendered are dropped (and deleted) if a later page fails.
    let mut images = Vec::with_capacity(selected);

    for idx in 0..selected {
        let page_index = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| Pdf2JsonError::RasterisationFailed {
                page: page_index,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2JsonError::RasterisationFailed {
                page: page_index,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let file = out_dir.join(page_file_name(pdf_path, page_index));
        image
            .save_with_format(&file, image::ImageFormat::Png)
            .map_err(|e| Pdf2JsonError::RasterisationFailed {
                page: page_index,
                detail: format!("cannot write {}: {}", file.display(), e),
            })?;

        debug!(
            "Rendered page {} → {}x{} px at {}",
            page_index,
            image.width(),
            image.height(),
            file.display()
        );
        images.push(PageImage::new(page_index, file));
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_file_names_are_one_indexed_with_stem() {
        assert_eq!(
            page_file_name(Path::new("/in/expenses_march.pdf"), 1),
            "expenses_march_page_1.png"
        );
        assert_eq!(page_file_name(Path::new("scan.pdf"), 12), "scan_page_12.png");
    }

    #[test]
    fn dropping_page_image_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc_page_1.png");
        std::fs::write(&file, b"png").unwrap();

        let image = PageImage::new(1, &file);
        assert_eq!(image.page_index(), 1);
        assert!(image.path().exists());
        drop(image);
        assert!(!file.exists());
    }

    #[test]
    fn dropping_handle_for_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        drop(PageImage::new(3, dir.path().join("gone.png")));
    }
}

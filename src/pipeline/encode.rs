//! Image encoding: rasterised page file → base64 PNG wrapped in `ImageData`.
//!
//! Pages are already PNG on disk, so the bytes are sent as-is. `detail:
//! "high"` keeps fine print such as stamp numbers and line-item amounts
//! legible to tiling vision models.

use crate::error::RecognitionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Read a page image and encode it for the vision API.
pub async fn encode_page_file(path: &Path) -> Result<ImageData, RecognitionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| RecognitionError::ImageUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded {} → {} bytes base64", path.display(), b64.len());

    Ok(ImageData::new(b64, mime_for(path)).with_detail("high"))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[tokio::test]
    async fn encode_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc_page_1.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let data = encode_page_file(&path).await.expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = encode_page_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::ImageUnreadable { .. }));
    }

    #[test]
    fn jpeg_extension_sets_mime() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
    }
}

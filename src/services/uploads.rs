//! Image upload persistence.
//!
//! Files are stored under `<upload_dir>/<kind>_images/` with a UUID file
//! name. Uploads over the soft size target are re-encoded as JPEG at
//! stepped-down quality until they fit; the step is best-effort and a
//! failure keeps the original bytes.

use crate::errors::ServiceError;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const JPEG_QUALITY_STEPS: [u8; 5] = [80, 65, 50, 35, 20];

/// Upload category, determining the target directory and the extension
/// allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Profile,
    Banner,
    Product,
}

impl UploadKind {
    fn dir_name(&self) -> &'static str {
        match self {
            UploadKind::Profile => "profile_images",
            UploadKind::Banner => "banner_images",
            UploadKind::Product => "product_images",
        }
    }

    /// Profile images are restricted to jpeg/jpg/png; catalog media also
    /// accepts webp.
    fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Profile => &["jpeg", "jpg", "png"],
            UploadKind::Banner | UploadKind::Product => &["jpeg", "jpg", "png", "webp"],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    /// Path relative to the upload root, suitable for persisting on a record.
    pub relative_path: String,
    pub mime_type: String,
    pub bytes_written: usize,
}

#[derive(Clone)]
pub struct UploadService {
    root: PathBuf,
    max_bytes: usize,
    soft_target_bytes: usize,
}

impl UploadService {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize, soft_target_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
            soft_target_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and persist an uploaded image, recompressing oversized files
    /// toward the soft target.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save_image(
        &self,
        kind: UploadKind,
        original_name: &str,
        data: Vec<u8>,
    ) -> Result<StoredUpload, ServiceError> {
        if data.is_empty() {
            return Err(ServiceError::ValidationError(
                "Uploaded file is empty".to_string(),
            ));
        }
        if data.len() > self.max_bytes {
            return Err(ServiceError::ValidationError(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let extension = original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "File type '.{}' is not allowed; expected one of: {}",
                extension,
                kind.allowed_extensions().join(", ")
            )));
        }
        let mime_type = match extension.as_str() {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            _ => unreachable!("extension already checked against the allowlist"),
        };

        let data = if data.len() > self.soft_target_bytes {
            let target = self.soft_target_bytes;
            let original = data;
            // Best-effort: a decode or encode failure keeps the original file.
            let attempt =
                tokio::task::spawn_blocking(move || (compress_to_target(&original, target), original))
                    .await
                    .map_err(|e| ServiceError::InternalError(e.to_string()))?;
            match attempt {
                (Ok(Some(compressed)), _) => {
                    debug!("Recompressed upload to {} bytes", compressed.len());
                    compressed
                }
                (Ok(None), original) => original,
                (Err(e), original) => {
                    warn!("Image recompression failed, keeping original: {}", e);
                    original
                }
            }
        } else {
            data
        };

        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok(StoredUpload {
            relative_path: format!("{}/{}", kind.dir_name(), file_name),
            mime_type: mime_type.to_string(),
            bytes_written: data.len(),
        })
    }
}

/// Re-encode an image as JPEG at stepped-down quality until it fits the
/// target. Returns `None` when no attempt beats the original size.
fn compress_to_target(data: &[u8], target: usize) -> Result<Option<Vec<u8>>, image::ImageError> {
    let decoded = image::load_from_memory(data)?;
    // JPEG has no alpha channel.
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut best: Option<Vec<u8>> = None;
    for quality in JPEG_QUALITY_STEPS {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
        rgb.write_with_encoder(encoder)?;

        let fits = buf.len() <= target;
        if best.as_ref().map_or(true, |b| buf.len() < b.len()) {
            best = Some(buf);
        }
        if fits {
            break;
        }
    }

    Ok(best.filter(|b| b.len() < data.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    fn service(root: &std::path::Path) -> UploadService {
        UploadService::new(root, 10 * 1024 * 1024, 400 * 1024)
    }

    #[tokio::test]
    async fn accepts_png_profile_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = service(dir.path());

        let stored = svc
            .save_image(UploadKind::Profile, "avatar.png", png_bytes(16, 16))
            .await
            .expect("save image");

        assert_eq!(stored.mime_type, "image/png");
        assert!(stored.relative_path.starts_with("profile_images/"));
        assert!(dir.path().join(&stored.relative_path).exists());
    }

    #[tokio::test]
    async fn rejects_gif_profile_image_without_persisting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = service(dir.path());

        let err = svc
            .save_image(UploadKind::Profile, "avatar.gif", vec![0u8; 128])
            .await
            .expect_err("gif must be rejected");
        assert!(matches!(err, ServiceError::ValidationError(_)));

        // Nothing was written.
        assert!(!dir.path().join("profile_images").exists());
    }

    #[tokio::test]
    async fn rejects_webp_for_profile_but_allows_for_product() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = service(dir.path());
        let bytes = png_bytes(8, 8);

        let err = svc
            .save_image(UploadKind::Profile, "pic.webp", bytes.clone())
            .await
            .expect_err("webp profile image must be rejected");
        assert!(matches!(err, ServiceError::ValidationError(_)));

        // A .webp extension is allowed for product media; the body here is a
        // PNG, which only matters to the recompression path, not validation.
        let stored = svc
            .save_image(UploadKind::Product, "pic.webp", bytes)
            .await
            .expect("product webp accepted");
        assert_eq!(stored.mime_type, "image/webp");
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = UploadService::new(dir.path(), 1024, 512);

        let err = svc
            .save_image(UploadKind::Profile, "big.png", vec![0u8; 2048])
            .await
            .expect_err("oversized upload must be rejected");
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn rejects_empty_upload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = service(dir.path());

        let err = svc
            .save_image(UploadKind::Profile, "empty.png", Vec::new())
            .await
            .expect_err("empty upload must be rejected");
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn compression_shrinks_large_images() {
        let original = png_bytes(512, 512);
        let target = original.len() / 4;

        let compressed = compress_to_target(&original, target)
            .expect("compression should not error")
            .expect("a smaller encoding should exist");
        assert!(compressed.len() < original.len());
    }

    #[test]
    fn compression_of_garbage_reports_error() {
        let err = compress_to_target(b"definitely not an image", 1024);
        assert!(err.is_err());
    }
}

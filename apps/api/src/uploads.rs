//! Item image storage.
//!
//! Item updates may carry images as `data:` URIs. Before the patch is
//! merged into the catalog each one is decoded, written under the
//! uploads directory and replaced with its static path:
//!
//! ```text
//! data:image/png;base64,iVBORw0...  ──►  uploads/3f2c...e1.png  ──►  /uploads/3f2c...e1.png
//! ```
//!
//! All images are decoded before anything is written. Callers get back a
//! [`StoredImages`] and discard it when the catalog write fails, so a
//! rejected request leaves no files behind.
//!
//! `GET /uploads/{filename}` serves the stored files back.

use std::path::{Path, PathBuf};

use axum::extract::{Path as UrlPath, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stockroom_core::ItemImage;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Public URL prefix of stored files.
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Supported image types: (mime, extension)
const SUPPORTED_FORMATS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{filename}", get(serve))
}

/// A decoded `data:` URI.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes `data:<mime>;base64,<payload>`.
pub fn decode_data_uri(uri: &str) -> ApiResult<DecodedImage> {
    let invalid = |reason: &str| ApiError::validation("images", format!("Invalid image data: {}", reason));

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("expected a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("only base64 payloads are supported"))?;

    let extension = SUPPORTED_FORMATS
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
        .ok_or_else(|| invalid(&format!("unsupported type '{}'", mime)))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&e.to_string()))?;
    if bytes.is_empty() {
        return Err(invalid("empty image"));
    }

    Ok(DecodedImage { extension, bytes })
}

/// Files written for one request.
#[derive(Debug, Default)]
#[must_use]
pub struct StoredImages {
    paths: Vec<PathBuf>,
}

impl StoredImages {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Removes every file written for the request.
    pub async fn discard(self) {
        for path in self.paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(file = %path.display(), "Discarded image"),
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to discard image"),
            }
        }
    }
}

/// Writes every data-URI image to disk and swaps its url for the static path.
pub async fn persist_images(uploads_dir: &Path, images: &mut [ItemImage]) -> ApiResult<StoredImages> {
    let decoded = images
        .iter()
        .filter(|i| i.is_data_uri())
        .map(|i| decode_data_uri(&i.url))
        .collect::<ApiResult<Vec<_>>>()?;
    if decoded.is_empty() {
        return Ok(StoredImages::default());
    }

    tokio::fs::create_dir_all(uploads_dir).await?;

    let mut stored = StoredImages::default();
    let pending = images.iter_mut().filter(|i| i.is_data_uri());
    for (image, decoded) in pending.zip(decoded) {
        let filename = format!("{}.{}", Uuid::new_v4().simple(), decoded.extension);
        let path = uploads_dir.join(&filename);

        if let Err(e) = tokio::fs::write(&path, &decoded.bytes).await {
            stored.discard().await;
            return Err(e.into());
        }
        info!(file = %filename, size = decoded.bytes.len(), "Image stored");

        stored.paths.push(path);
        image.url = format!("{}{}", UPLOADS_URL_PREFIX, filename);
    }

    Ok(stored)
}

/// Rejects names that could leave the uploads directory.
pub fn validate_filename(filename: &str) -> ApiResult<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(ApiError::bad_request("Invalid filename"));
    }
    Ok(())
}

fn content_type(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// GET /uploads/{filename}
async fn serve(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> ApiResult<impl IntoResponse> {
    validate_filename(&filename)?;

    let path = state.config.uploads_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(file = %filename, "Upload not found");
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(([(CONTENT_TYPE, content_type(&filename))], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG"));
        let decoded = decode_data_uri(&uri).unwrap();
        assert_eq!(decoded.extension, "png");
        assert_eq!(decoded.bytes, b"\x89PNG");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_data_uri("https://cdn/x.png").is_err());
        assert!(decode_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_uri("data:image/png,raw").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("abc.png").is_ok());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename("a\\b.png").is_err());
    }

    #[tokio::test]
    async fn test_persist_images_rewrites_urls() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = vec![
            ItemImage {
                url: format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpegdata")),
                alt: None,
                is_primary: true,
            },
            ItemImage {
                url: "/uploads/existing.png".to_string(),
                alt: None,
                is_primary: false,
            },
        ];

        let stored = persist_images(dir.path(), &mut images).await.unwrap();
        assert_eq!(stored.paths().len(), 1);

        assert!(images[0].url.starts_with(UPLOADS_URL_PREFIX));
        assert!(images[0].url.ends_with(".jpg"));
        assert_eq!(images[1].url, "/uploads/existing.png");

        let stored = images[0].url.trim_start_matches(UPLOADS_URL_PREFIX);
        let bytes = std::fs::read(dir.path().join(stored)).unwrap();
        assert_eq!(bytes, b"jpegdata");
    }

    #[tokio::test]
    async fn test_bad_image_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = vec![
            ItemImage {
                url: format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG")),
                alt: None,
                is_primary: true,
            },
            ItemImage {
                url: "data:text/plain;base64,aGk=".to_string(),
                alt: None,
                is_primary: false,
            },
        ];

        assert!(persist_images(dir.path(), &mut images).await.is_err());
        assert!(images[0].url.starts_with("data:"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_removes_stored_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = vec![ItemImage {
            url: format!("data:image/gif;base64,{}", STANDARD.encode(b"GIF89a")),
            alt: None,
            is_primary: true,
        }];

        let stored = persist_images(dir.path(), &mut images).await.unwrap();
        let path = stored.paths()[0].clone();
        assert!(path.exists());

        stored.discard().await;
        assert!(!path.exists());
    }
}

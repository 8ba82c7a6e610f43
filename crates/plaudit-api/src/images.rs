use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{StatusCode, header};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// At most this many images per review.
pub const MAX_IMAGES: usize = 5;

/// 5 MB limit per image
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Room for a full set of images plus the review JSON and multipart framing.
pub const MAX_REQUEST_BODY: usize = MAX_IMAGES * MAX_IMAGE_SIZE + 1024 * 1024;

/// URL prefix under which stored images are served.
pub const URL_PREFIX: &str = "/uploads";

/// An accepted image held in memory until the review it belongs to is known.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub extension: Option<String>,
    pub bytes: Bytes,
}

/// The parsed parts of a review multipart body.
#[derive(Debug)]
pub struct ReviewForm<T> {
    pub review: T,
    pub images: Vec<PendingImage>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Validation(e.body_text())
    }
}

/// Extension of the client's filename, kept only if it is plain alphanumeric.
fn safe_extension(file_name: Option<&str>) -> Option<String> {
    Path::new(file_name?)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

/// Read a `review` JSON part and up to [`MAX_IMAGES`] `images` parts.
///
/// A missing `review` part yields `T::default()`. Other part names are ignored.
pub async fn read_review_form<T>(mut multipart: Multipart) -> Result<ReviewForm<T>, ApiError>
where
    T: DeserializeOwned + Default,
{
    let mut review = None;
    let mut images = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "review" => {
                let text = field.text().await.map_err(multipart_error)?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::Validation(format!("Invalid review data: {}", e)))?;
                review = Some(parsed);
            }
            "images" => {
                if images.len() == MAX_IMAGES {
                    return Err(ApiError::Validation(format!(
                        "At most {} images are allowed",
                        MAX_IMAGES
                    )));
                }
                let is_image = field
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(ApiError::Validation("Only image files are allowed".into()));
                }
                let extension = safe_extension(field.file_name());

                let mut buf = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if buf.len() + chunk.len() > MAX_IMAGE_SIZE {
                        return Err(ApiError::PayloadTooLarge(format!(
                            "Images are limited to {} bytes",
                            MAX_IMAGE_SIZE
                        )));
                    }
                    buf.extend_from_slice(&chunk);
                }
                if buf.is_empty() {
                    continue;
                }
                images.push(PendingImage {
                    extension,
                    bytes: Bytes::from(buf),
                });
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(ReviewForm {
        review: review.unwrap_or_default(),
        images,
    })
}

/// Read a review body that is either plain JSON or multipart.
///
/// `application/json` bodies carry the review fields directly and no images.
/// Anything else is read as a multipart form by [`read_review_form`].
pub async fn read_review_body<T>(request: Request) -> Result<ReviewForm<T>, ApiError>
where
    T: DeserializeOwned + Default + Send,
{
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let Json(review) = Json::<T>::from_request(request, &()).await?;
        return Ok(ReviewForm {
            review,
            images: Vec::new(),
        });
    }

    let multipart = Multipart::from_request(request, &()).await?;
    read_review_form(multipart).await
}

/// A path segment that maps to exactly one directory entry.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Review images on disk.
///
/// Each image lives at `{dir}/{item_id}/{uuid}.{ext}` and is referenced by the
/// URL `/uploads/{item_id}/{uuid}.{ext}`.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating upload directory {}", dir.display()))?;
        info!("Image upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `images` under the item's directory and return their URLs in order.
    /// On failure, files written so far are removed.
    pub async fn save(
        &self,
        item_id: &str,
        images: Vec<PendingImage>,
    ) -> Result<Vec<String>, ApiError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        if !is_safe_segment(item_id) {
            return Err(ApiError::Validation(
                "itemId cannot be used as an image directory".into(),
            ));
        }

        let item_dir = self.dir.join(item_id);
        fs::create_dir_all(&item_dir)
            .await
            .with_context(|| format!("creating image directory {}", item_dir.display()))?;

        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            let file_name = match &image.extension {
                Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
                None => Uuid::new_v4().to_string(),
            };
            let path = item_dir.join(&file_name);
            if let Err(e) = fs::write(&path, &image.bytes).await {
                self.remove_urls(&urls).await;
                return Err(anyhow::Error::new(e)
                    .context(format!("writing image {}", path.display()))
                    .into());
            }
            debug!("Stored image {} ({} bytes)", path.display(), image.bytes.len());
            urls.push(format!("{}/{}/{}", URL_PREFIX, item_id, file_name));
        }
        Ok(urls)
    }

    /// Map an image URL produced by [`ImageStore::save`] back to its file.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(URL_PREFIX)?.strip_prefix('/')?;
        let (item_id, file_name) = rest.split_once('/')?;
        if !is_safe_segment(item_id) || !is_safe_segment(file_name) {
            return None;
        }
        Some(self.dir.join(item_id).join(file_name))
    }

    /// Best-effort removal of stored images. Missing files and foreign URLs
    /// are logged and skipped.
    pub async fn remove_urls(&self, urls: &[String]) {
        for url in urls {
            let Some(path) = self.path_for_url(url) else {
                warn!("Not removing image outside upload directory: {}", url);
                continue;
            };
            match fs::remove_file(&path).await {
                Ok(()) => info!("Deleted image {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Image {} already gone", path.display())
                }
                Err(e) => warn!("Failed to delete image {}: {}", path.display(), e),
            }
        }
    }
}

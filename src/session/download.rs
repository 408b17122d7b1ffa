//! Saving the generated image under a timestamped name.

use crate::error::Result;
use crate::image::{GeneratedImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix of every downloaded file.
pub const DOWNLOAD_PREFIX: &str = "reimagine-generated-image";

/// `reimagine-generated-image-<unix millis>.<ext>` for the given instant.
pub fn download_filename(format: ImageFormat, at: SystemTime) -> String {
    let millis = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{DOWNLOAD_PREFIX}-{millis}.{}", format.extension())
}

/// Writes `image` into `dir`, named for the instant `at`.
pub async fn save_to_dir(image: &GeneratedImage, dir: &Path, at: SystemTime) -> Result<PathBuf> {
    let path = dir.join(download_filename(image.format, at));
    image.save(&path).await?;
    tracing::info!(path = %path.display(), bytes = image.size(), "saved generated image");
    Ok(path)
}

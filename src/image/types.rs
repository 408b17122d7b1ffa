//! Core types for source and generated images.

use crate::error::{ReimagineError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF87a / GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratio choices offered to the user.
///
/// Each choice maps to a fixed size understood by the synthesis service;
/// `Auto` lets the service pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectChoice {
    /// 1:1 square.
    #[default]
    Square,
    /// 3:2 landscape.
    Landscape,
    /// 2:3 portrait.
    Portrait,
    /// Service-default sizing.
    Auto,
}

impl AspectChoice {
    /// All choices, in selector order.
    pub const ALL: [AspectChoice; 4] = [Self::Square, Self::Landscape, Self::Portrait, Self::Auto];

    /// Returns the target size string sent to the synthesis service.
    pub fn size(&self) -> &'static str {
        match self {
            Self::Square => "1024x1024",
            Self::Landscape => "1536x1024",
            Self::Portrait => "1024x1536",
            Self::Auto => "auto",
        }
    }

    /// Returns the selector label (e.g., "Landscape (3:2)").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Square => "Square (1:1)",
            Self::Landscape => "Landscape (3:2)",
            Self::Portrait => "Portrait (2:3)",
            Self::Auto => "Auto",
        }
    }
}

impl std::fmt::Display for AspectChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for AspectChoice {
    type Err = ReimagineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "square" | "1:1" => Ok(Self::Square),
            "landscape" | "3:2" => Ok(Self::Landscape),
            "portrait" | "2:3" => Ok(Self::Portrait),
            "auto" => Ok(Self::Auto),
            other => Err(ReimagineError::InvalidInput(format!(
                "unknown aspect ratio '{other}' (expected square, landscape, portrait or auto)"
            ))),
        }
    }
}

/// The user's reference image. Immutable once selected.
#[derive(Debug, Clone)]
pub struct SourceImage {
    data: Arc<[u8]>,
    format: ImageFormat,
    name: Option<String>,
}

impl SourceImage {
    /// Wraps raw bytes, detecting the format from magic bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let format = ImageFormat::from_magic_bytes(&data)
            .ok_or_else(|| ReimagineError::InvalidInput("not a supported image file".into()))?;
        Ok(Self::with_format(data, format))
    }

    /// Wraps raw bytes with an explicitly known format.
    pub fn with_format(data: impl Into<Vec<u8>>, format: ImageFormat) -> Self {
        Self {
            data: Arc::from(data.into()),
            format,
            name: None,
        }
    }

    /// Reads an image file, accepting only image types.
    ///
    /// The format comes from the file contents, falling back to the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                ReimagineError::InvalidInput(format!("{} is not an image file", path.display()))
            })?;

        let mut image = Self::with_format(data, format);
        image.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(image)
    }

    /// Sets a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Display name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        data_url(self.format, &self.data)
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for synthesis.
    pub model: Option<String>,
    /// Description the synthesis prompt was built from.
    pub description: Option<String>,
    /// Wall time of the whole generation, both stages included, in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be stored or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Decodes a base64 payload, detecting the format (PNG when unknown).
    pub fn from_base64(payload: &str, metadata: GenerationMetadata) -> Result<Self> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ReimagineError::Decode(e.to_string()))?;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();
        Ok(Self::new(data, format, metadata))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a displayable data URL.
    pub fn to_data_url(&self) -> String {
        data_url(self.format, &self.data)
    }
}

fn data_url(format: ImageFormat, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}


#[cfg(test)]
mod tests {
    use super::fixtures::{JPEG_BYTES, PNG_BYTES};
    use super::*;

    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_BYTES),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_BYTES),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(b"GIF89a\x01\x00"),
            Some(ImageFormat::Gif)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"hello"), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_aspect_sizes() {
        assert_eq!(AspectChoice::Square.size(), "1024x1024");
        assert_eq!(AspectChoice::Landscape.size(), "1536x1024");
        assert_eq!(AspectChoice::Portrait.size(), "1024x1536");
        assert_eq!(AspectChoice::Auto.size(), "auto");
    }

    #[test]
    fn test_aspect_parsing() {
        assert_eq!("landscape".parse::<AspectChoice>().unwrap(), AspectChoice::Landscape);
        assert_eq!("3:2".parse::<AspectChoice>().unwrap(), AspectChoice::Landscape);
        assert_eq!(" AUTO ".parse::<AspectChoice>().unwrap(), AspectChoice::Auto);
        assert!("16:9".parse::<AspectChoice>().is_err());
    }

    #[test]
    fn test_source_image_rejects_non_images() {
        let err = SourceImage::new(b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, ReimagineError::InvalidInput(_)));
    }

    #[test]
    fn test_source_image_data_url_uses_mime() {
        let image = SourceImage::new(JPEG_BYTES.to_vec()).unwrap();
        assert!(image.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[tokio::test]
    async fn test_source_image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, PNG_BYTES).unwrap();

        let image = SourceImage::from_path(&path).await.unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.name(), Some("cat.png"));
        assert_eq!(image.size(), PNG_BYTES.len());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "not an image").unwrap();
        assert!(SourceImage::from_path(&text).await.is_err());
    }

    #[test]
    fn test_generated_image_from_base64() {
        let payload = base64::engine::general_purpose::STANDARD.encode(PNG_BYTES);
        let image = GeneratedImage::from_base64(&payload, GenerationMetadata::default()).unwrap();
        assert_eq!(image.data, PNG_BYTES);
        assert_eq!(image.format, ImageFormat::Png);
        assert!(image.to_data_url().starts_with("data:image/png;base64,"));

        assert!(matches!(
            GeneratedImage::from_base64("***", GenerationMetadata::default()),
            Err(ReimagineError::Decode(_))
        ));
    }
}

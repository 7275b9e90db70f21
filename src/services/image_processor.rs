// src/services/image_processor.rs
use crate::config::AnalysisConfig;
use crate::errors::{EngineError, ValidationError};
use crate::models::ImageAsset;
use bytes::Bytes;
use image::{GenericImageView, ImageFormat as ImgFormat};
use std::io::Cursor;
use uuid::Uuid;

const SHRINK_PASSES: usize = 6;

/// Turns user-selected files into `ImageAsset`s, enforcing the acceptance policy.
pub struct ImageProcessor {
    accepted_types: Vec<String>,
    max_bytes: usize,
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            accepted_types: config
                .accepted_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
            max_bytes: config.max_image_bytes,
            max_dimension: config.max_dimension,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn accepts_type(&self, mime_type: &str) -> bool {
        self.accepted_types.iter().any(|t| t == mime_type)
    }

    /// Validate a selected file. `declared_type` is what the client claimed; when
    /// absent the sniffed format is used.
    pub fn accept(
        &self,
        filename: impl Into<String>,
        declared_type: Option<&str>,
        data: Bytes,
    ) -> Result<ImageAsset, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::Empty);
        }

        if data.len() > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes: data.len(),
                max_bytes: self.max_bytes,
            });
        }

        let declared = declared_type
            .map(normalize_mime)
            .filter(|t| t != "application/octet-stream");

        if let Some(declared) = &declared {
            if !self.accepts_type(declared) {
                return Err(ValidationError::UnsupportedType {
                    mime_type: declared.clone(),
                });
            }
        }

        let sniffed = match sniff_mime(&data) {
            Some(mime) if self.accepts_type(mime) => mime,
            _ => {
                return Err(match declared {
                    Some(declared) => ValidationError::ContentMismatch { declared },
                    None => ValidationError::UnsupportedType {
                        mime_type: "application/octet-stream".to_string(),
                    },
                });
            }
        };

        if let Some(declared) = &declared {
            if declared != sniffed {
                return Err(ValidationError::ContentMismatch {
                    declared: declared.clone(),
                });
            }
        }

        let dimensions = self.validate_dimensions(&data, sniffed)?;

        Ok(ImageAsset {
            id: Uuid::new_v4(),
            filename: filename.into(),
            mime_type: sniffed.to_string(),
            size_bytes: data.len(),
            dimensions: Some(dimensions),
            data,
            selected_at: chrono::Utc::now(),
        })
    }

    fn validate_dimensions(&self, data: &[u8], mime: &str) -> Result<(u32, u32), ValidationError> {
        let (width, height) = image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .ok_or_else(|| ValidationError::ContentMismatch {
                declared: mime.to_string(),
            })?;

        if width > self.max_dimension || height > self.max_dimension {
            return Err(ValidationError::DimensionsTooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        Ok((width, height))
    }

    /// Re-encode as JPEG, scaling down each pass, until the payload fits `max_bytes`.
    /// Providers with a hard upload limit get the shrunken copy; the request keeps
    /// the original. Never upscales.
    pub fn shrink_to_fit(&self, data: &[u8], max_bytes: usize) -> Result<Vec<u8>, EngineError> {
        if data.len() <= max_bytes {
            return Ok(data.to_vec());
        }

        let img = image::load_from_memory(data)
            .map_err(|e| EngineError::invalid_image(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();
        let mut scale = ((max_bytes as f64 / data.len() as f64).sqrt() * 0.9).min(1.0);

        for _ in 0..SHRINK_PASSES {
            let new_width = ((width as f64 * scale) as u32).clamp(1, width);
            let new_height = ((height as f64 * scale) as u32).clamp(1, height);

            let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

            let mut output = Vec::new();
            image::DynamicImage::ImageRgb8(resized.to_rgb8())
                .write_to(&mut Cursor::new(&mut output), ImgFormat::Jpeg)
                .map_err(|e| {
                    EngineError::invalid_image(format!("Failed to encode resized image: {}", e))
                })?;

            if output.len() <= max_bytes {
                return Ok(output);
            }
            scale *= 0.7;
        }

        Err(EngineError::invalid_image(format!(
            "Image could not be shrunk below {} bytes",
            max_bytes
        )))
    }
}

fn normalize_mime(raw: &str) -> String {
    let mime = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    // image/jpg shows up from some pickers
    if mime == "image/jpg" {
        return "image/jpeg".to_string();
    }
    mime
}

fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImgFormat::Jpeg => Some("image/jpeg"),
        ImgFormat::Png => Some("image/png"),
        ImgFormat::WebP => Some("image/webp"),
        ImgFormat::Gif => Some("image/gif"),
        ImgFormat::Bmp => Some("image/bmp"),
        ImgFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

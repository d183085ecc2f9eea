//! Image normalization for public uploads.
//!
//! Gallery and blog images are always stored as JPEG. JPEG input is kept
//! byte-for-byte; any other decodable format is re-encoded. HEIC/HEIF is
//! refused up front since browsers cannot display it.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use thiserror::Error;
use tracing::debug;

use crate::extension;

pub const JPEG_QUALITY: u8 = 95;
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image format. Please upload a JPG, PNG, or WebP image.")]
    Unsupported,
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not encode image: {0}")]
    Encode(String),
}

#[derive(Debug)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    /// True when the input was already JPEG and kept as-is.
    pub passthrough: bool,
}

/// Blocking: decoding and encoding are CPU-bound, call from `spawn_blocking`.
pub fn normalize_to_jpeg(
    file_name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<NormalizedImage, ImageError> {
    if is_heif(file_name, content_type, data) {
        return Err(ImageError::Unsupported);
    }

    let sniffed = image::guess_format(data).ok();
    if sniffed == Some(ImageFormat::Jpeg) {
        return Ok(NormalizedImage {
            data: data.to_vec(),
            passthrough: true,
        });
    }

    let img = decode(file_name, data)?;
    let data = encode_jpeg(&img)?;
    debug!(
        file_name,
        width = img.width(),
        height = img.height(),
        size = data.len(),
        "Re-encoded upload as JPEG"
    );

    Ok(NormalizedImage {
        data,
        passthrough: false,
    })
}

fn decode(file_name: &str, data: &[u8]) -> Result<DynamicImage, ImageError> {
    match image::load_from_memory(data) {
        Ok(img) => Ok(img),
        Err(first) => {
            // Fall back to the format the file name claims.
            let format = extension(file_name)
                .and_then(ImageFormat::from_extension)
                .ok_or_else(|| ImageError::Decode(first.to_string()))?;
            image::load_from_memory_with_format(data, format)
                .map_err(|e| ImageError::Decode(e.to_string()))
        }
    }
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buf)
}

fn is_heif(file_name: &str, content_type: Option<&str>, data: &[u8]) -> bool {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.starts_with("image/heic") || ct.starts_with("image/heif") {
            return true;
        }
    }
    if matches!(extension(file_name).as_deref(), Some("heic" | "heif")) {
        return true;
    }
    // ISO-BMFF `ftyp` box with a HEIF brand.
    data.len() >= 12
        && &data[4..8] == b"ftyp"
        && matches!(
            &data[8..12],
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"mif1" | b"msf1" | b"heif"
        )
}

/// Content type for a stored object, guessed from its key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    match extension(key).as_deref() {
        Some("jpg" | "jpeg") => JPEG_CONTENT_TYPE,
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

use base64::Engine as _;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use crate::error::{CertificateError, Result};

/// An image flattened onto a white background, ready for either backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl DecodedImage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u32;
            for channel in [r, g, b] {
                rgb.push(((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
            }
        }

        Ok(Self { width, height, rgb })
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let buffer = image::RgbImage::from_raw(self.width, self.height, self.rgb.clone())
            .ok_or_else(|| CertificateError::Raster("image buffer size mismatch".to_string()))?;
        let mut out = Cursor::new(Vec::new());
        buffer.write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Largest box with this image's aspect ratio that fits in `width` x `height`,
    /// centred. Returns `(dx, dy, w, h)` relative to the box origin.
    pub fn fit(&self, width: f32, height: f32) -> (f32, f32, f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (0.0, 0.0, width, height);
        }
        let (iw, ih) = (self.width as f32, self.height as f32);
        // The constraining axis takes the box size exactly, so offsets never go negative.
        let (w, h) = if width * ih <= height * iw {
            (width, (ih * width / iw).min(height))
        } else {
            ((iw * height / ih).min(width), height)
        };
        ((width - w) / 2.0, (height - h) / 2.0, w, h)
    }
}

/// Resolves a `data:` URI or a path under `base_dir` and decodes it.
pub fn load_image(source: &str, base_dir: &Path) -> Result<DecodedImage> {
    let bytes = if let Some(rest) = source.strip_prefix("data:") {
        decode_data_uri(rest)?
    } else {
        std::fs::read(resolve_path(source, base_dir)?)?
    };
    DecodedImage::from_bytes(&bytes)
}

fn decode_data_uri(rest: &str) -> Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CertificateError::InvalidImageSource("malformed data URI".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(CertificateError::InvalidImageSource(
            "data URI is not base64 encoded".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| CertificateError::InvalidImageSource(e.to_string()))
}

fn resolve_path(source: &str, base_dir: &Path) -> Result<PathBuf> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Err(CertificateError::InvalidImageSource(format!(
            "remote images are not fetched: {}",
            source
        )));
    }

    let relative = Path::new(source.trim_start_matches('/'));
    let relative = relative.strip_prefix("uploads").unwrap_or(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(CertificateError::InvalidImageSource(format!(
            "path escapes upload folder: {}",
            source
        )));
    }
    Ok(base_dir.join(relative))
}

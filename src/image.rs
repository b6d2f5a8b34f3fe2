use crate::error::{FlorenceError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Content type declared for every uploaded image.
pub const CONTENT_TYPE: &str = "image/jpeg";

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Longest base64 payload the inference endpoint accepts inline.
pub const MAX_INLINE_BASE64_LEN: usize = 180_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

pub fn detect_kind(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageKind::Png)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageKind::Webp)
    } else {
        None
    }
}

/// Reads the image and checks it looks like something the model can take.
pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| FlorenceError::io("read", path, e))?;
    let kind = check_image(path, &bytes)?;
    debug!(path = %path.display(), ?kind, bytes = bytes.len(), "image loaded");
    Ok(bytes)
}

fn check_image(path: &Path, bytes: &[u8]) -> Result<ImageKind> {
    let invalid = |reason: String| FlorenceError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };
    if bytes.is_empty() {
        return Err(invalid("file is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(invalid(format!(
            "image is {} bytes, limit is {} bytes",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    detect_kind(bytes).ok_or_else(|| invalid("not a JPEG, PNG or WebP image".into()))
}

/// Base64 form of the image, or `None` when it is too large to inline.
pub fn inline_base64(bytes: &[u8]) -> Option<String> {
    // 4 output characters per 3 input bytes, padded
    if bytes.len().div_ceil(3) * 4 > MAX_INLINE_BASE64_LEN {
        return None;
    }
    Some(STANDARD.encode(bytes))
}

//! `data:` URL helpers for embedding rendered images in JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::ImageFormat;

/// Encode raw image bytes as `data:{mime};base64,{payload}`.
pub fn encode(bytes: &[u8], format: ImageFormat) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes))
}

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime(&self.mime_type)
    }
}

/// Decode a base64 `data:` URL. Returns `None` for anything else.
pub fn decode(url: &str) -> Option<DataUrl> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some(DataUrl {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

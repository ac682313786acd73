//! Data-URL packing and human-readable size labels.
//!
//! Slices leave the pipeline as self-contained `data:` URLs so a caller can
//! display or download them without touching the filesystem. Their size label
//! is **estimated from the base64 payload length** (`len * 3 / 4`), not from
//! the decoded bytes: it can overshoot the real file size by up to two bytes
//! of padding. Treat it as a display hint, not a limit check.

use crate::imaging::ExportFormat;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

const BASE64_MARKER: &str = ";base64,";

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("not a base64 data URL")]
    NotDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Pack encoded image bytes as `data:<mime>;base64,<payload>`.
pub fn to_data_url(bytes: &[u8], format: ExportFormat) -> String {
    format!(
        "data:{}{}{}",
        format.mime_type(),
        BASE64_MARKER,
        STANDARD.encode(bytes)
    )
}

/// The base64 payload of a data URL (everything after `;base64,`).
fn payload(url: &str) -> Option<&str> {
    if !url.starts_with("data:") {
        return None;
    }
    url.find(BASE64_MARKER)
        .map(|start| &url[start + BASE64_MARKER.len()..])
}

/// Decode a data URL produced by [`to_data_url`] back into file bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, EncodingError> {
    let data = payload(url).ok_or(EncodingError::NotDataUrl)?;
    Ok(STANDARD.decode(data.trim())?)
}

/// Estimated byte size of the file inside a data URL.
///
/// Non-data URLs estimate as their whole length.
pub fn estimate_payload_bytes(url: &str) -> u64 {
    let len = payload(url).map_or(url.len(), str::len) as u64;
    len * 3 / 4
}

/// Format a byte count with 1024-based units.
///
/// ```
/// # use longstrip::encoding::format_size;
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(12_800), "12.5 KB");
/// assert_eq!(format_size(1_310_720), "1.25 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.2} MB", b / MB)
    }
}

/// Display label for a data URL's estimated size.
pub fn size_label(url: &str) -> String {
    format_size(estimate_payload_bytes(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_has_mime_prefix() {
        let url = to_data_url(b"abc", ExportFormat::Png);
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn decode_recovers_bytes() {
        let bytes = vec![0u8, 1, 2, 254, 255];
        let url = to_data_url(&bytes, ExportFormat::Jpeg);
        assert_eq!(decode_data_url(&url).unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_plain_strings() {
        assert!(matches!(
            decode_data_url("hello"),
            Err(EncodingError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png,raw"),
            Err(EncodingError::NotDataUrl)
        ));
    }

    #[test]
    fn decode_rejects_bad_base64() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(EncodingError::Base64(_))
        ));
    }

    #[test]
    fn estimate_is_three_quarters_of_payload() {
        // 3 bytes → 4 base64 chars → estimate 3
        let url = to_data_url(b"abc", ExportFormat::Gif);
        assert_eq!(estimate_payload_bytes(&url), 3);
        // 4 bytes → 8 chars with padding → estimate 6 (overshoots by padding)
        let url = to_data_url(b"abcd", ExportFormat::Gif);
        assert_eq!(estimate_payload_bytes(&url), 6);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.50 MB");
    }

    #[test]
    fn size_label_uses_estimate() {
        let url = to_data_url(&vec![7u8; 3 * 1024], ExportFormat::Jpeg);
        assert_eq!(size_label(&url), "3.0 KB");
    }
}

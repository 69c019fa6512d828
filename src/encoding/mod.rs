//! Encoding detection and transcoding for raw byte inputs.
//!
//! Implements BOM sniffing and XML declaration encoding detection per
//! XML 1.0 Section 4.3.3 and Appendix F, bridging to `encoding_rs` for the
//! actual transcoding. The detected encoding is reported back so the
//! document node can record its input encoding.

use std::fmt;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// The result of decoding a raw byte input.
#[derive(Debug)]
pub struct Decoded {
    /// The input transcoded to UTF-8, BOM stripped.
    pub text: String,
    /// The IANA name of the encoding the input was decoded from.
    pub encoding: String,
}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order
/// Mark.
///
/// Returns the IANA encoding name and the number of BOM bytes to skip.
/// Per XML 1.0 Appendix F:
/// - `EF BB BF` -> UTF-8
/// - `FE FF`    -> UTF-16 BE
/// - `FF FE`    -> UTF-16 LE
/// - No BOM     -> UTF-8 (the XML default)
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        ("UTF-8", 3)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        ("UTF-16BE", 2)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        ("UTF-16LE", 2)
    } else {
        ("UTF-8", 0)
    }
}

/// Extracts the encoding name from an XML declaration at the start of the
/// input, if one is present.
fn encoding_from_declaration(text: &str) -> Option<String> {
    let trimmed = text.trim_start_matches('\u{FEFF}');
    if !trimmed.starts_with("<?xml") {
        return None;
    }
    let decl = &trimmed[..trimmed.find("?>")?];
    let after_key = decl.find("encoding")? + "encoding".len();
    let rest = decl[after_key..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}

/// Transcodes raw XML bytes to UTF-8, detecting the encoding from the BOM
/// and, failing that, from the XML declaration.
///
/// # Errors
///
/// Returns [`EncodingError`] if a named encoding is not recognized or the
/// bytes are malformed under the detected encoding.
///
/// # Examples
///
/// ```
/// use oxiom::encoding::decode_to_utf8;
///
/// let decoded = decode_to_utf8(b"<?xml version=\"1.0\"?><r/>").unwrap();
/// assert_eq!(decoded.encoding, "UTF-8");
/// assert!(decoded.text.starts_with("<?xml"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<Decoded, EncodingError> {
    let (bom_encoding, skip) = detect_encoding(bytes);
    let body = &bytes[skip..];

    if skip > 0 {
        // The BOM is authoritative.
        return decode_with(bom_encoding, body);
    }

    // No BOM: decode provisionally as UTF-8 far enough to read the
    // declaration, then honor its encoding attribute.
    let probe_len = body.len().min(128);
    let probe = String::from_utf8_lossy(&body[..probe_len]);
    match encoding_from_declaration(&probe) {
        Some(declared) if !declared.eq_ignore_ascii_case("utf-8") => {
            decode_with(&declared, body)
        }
        _ => decode_with("UTF-8", body),
    }
}

fn decode_with(label: &str, bytes: &[u8]) -> Result<Decoded, EncodingError> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding '{label}'")))?;
    let (text, actual, malformed) = encoding.decode(bytes);
    if malformed {
        return Err(EncodingError::new(format!(
            "input contains byte sequences that are malformed in {}",
            actual.name()
        )));
    }
    Ok(Decoded {
        text: text
            .strip_prefix('\u{FEFF}')
            .map_or_else(|| text.to_string(), str::to_string),
        encoding: actual.name().to_string(),
    })
}

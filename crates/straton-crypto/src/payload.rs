//! Wire-payload parsing: one tagged-variant boundary instead of string sniffing
//!
//! Two layers:
//!   1. [`WireText`]: what sits in a message's `text` column. The `:`
//!      delimiter separates the base64 IV and ciphertext segments; base64
//!      never contains `:`, so a delimiter-free payload is legacy plaintext
//!      from before encryption was rolled out and passes through unchanged.
//!   2. [`MessageBody`]: what a decrypted payload means. A body of the form
//!      `__img__:<mime>:<storage path>` references an encrypted attachment
//!      in the blob store; anything else is displayable text.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};

use crate::error::CryptoError;
use crate::{IV_SIZE, WIRE_DELIMITER};

/// Marker prefix for encrypted image attachment references.
pub const IMAGE_MARKER: &str = "__img__";

/// A message `text` field, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireText {
    /// Pre-encryption plaintext; rendered as-is for backward compatibility.
    Legacy(String),
    /// Decoded IV and ciphertext segments of an encrypted payload.
    Sealed { iv: Vec<u8>, ciphertext: Vec<u8> },
}

/// Parse a raw `text` field.
///
/// Any malformed encrypted payload (bad base64, wrong IV length) is
/// [`CryptoError::Undisplayable`]: an attacker-controlled `"AAAA:BBBB"` must
/// never surface as fake plaintext or halt rendering of its neighbors.
pub fn parse_wire_text(raw: &str) -> Result<WireText, CryptoError> {
    let Some((iv_b64, ct_b64)) = raw.split_once(WIRE_DELIMITER) else {
        return Ok(WireText::Legacy(raw.to_string()));
    };

    let iv = B64.decode(iv_b64).map_err(|_| CryptoError::Undisplayable)?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::Undisplayable);
    }
    let ciphertext = B64.decode(ct_b64).map_err(|_| CryptoError::Undisplayable)?;

    Ok(WireText::Sealed { iv, ciphertext })
}

/// Encode IV and ciphertext into the text wire form.
pub fn encode_wire_text(iv: &[u8], ciphertext: &[u8]) -> String {
    format!("{}{}{}", B64.encode(iv), WIRE_DELIMITER, B64.encode(ciphertext))
}

/// The meaning of a successfully decrypted message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// Reference to an encrypted attachment in the blob store.
    ImageRef { mime: String, path: String },
}

/// Classify a decrypted body. A marker missing either of its fields is
/// treated as ordinary text rather than rejected; only our own client
/// produces markers, and truncated ones should stay visible for debugging.
pub fn parse_body(decrypted: &str) -> MessageBody {
    if let Some(rest) = decrypted.strip_prefix(IMAGE_MARKER) {
        if let Some(rest) = rest.strip_prefix(WIRE_DELIMITER) {
            if let Some((mime, path)) = rest.split_once(WIRE_DELIMITER) {
                if !mime.is_empty() && !path.is_empty() {
                    return MessageBody::ImageRef {
                        mime: mime.to_string(),
                        path: path.to_string(),
                    };
                }
            }
        }
    }
    MessageBody::Text(decrypted.to_string())
}

/// Build the marker string for an uploaded attachment.
pub fn image_marker(mime: &str, path: &str) -> String {
    format!("{IMAGE_MARKER}{WIRE_DELIMITER}{mime}{WIRE_DELIMITER}{path}")
}

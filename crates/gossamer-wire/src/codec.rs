//! Line codec.
//!
//! One envelope per line, UTF-8, newline terminated. Encoding never emits
//! embedded newlines (`serde_json` escapes them inside strings), so a line
//! is always a complete message.

use crate::envelope::Envelope;
use crate::error::{WireError, WireResult};

/// Decodes a single line into an envelope.
///
/// Surrounding whitespace, including a trailing `\r\n`, is ignored.
pub fn decode_line(line: &str) -> WireResult<Envelope> {
    serde_json::from_str(line.trim()).map_err(|source| WireError::Decode {
        line: line.to_string(),
        source,
    })
}

/// Encodes an envelope as a line, including the trailing newline.
pub fn encode_line(envelope: &Envelope) -> WireResult<String> {
    let mut line = serde_json::to_string(envelope).map_err(WireError::Encode)?;
    line.push('\n');
    Ok(line)
}

/// Returns true for lines that carry no message and should be skipped
/// without complaint.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

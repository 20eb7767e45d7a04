//! Data-channel byte decoding.
//!
//! The raw data channel delivers response text in whichever encoding the
//! renderer-side plugin was built with: engine builds have been observed
//! emitting both UTF-16LE and UTF-8. The payload is JSON, so the ASCII
//! range dominates and UTF-16LE frames are recognizable by their zeroed
//! high bytes.

// ============================================================================
// Imports
// ============================================================================

use tracing::warn;

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a raw data-channel frame into text.
///
/// Even-length frames whose odd-index bytes are mostly zero are decoded
/// as UTF-16LE; everything else is tried as UTF-8. Returns `None` when
/// neither decoding yields valid text.
#[must_use]
pub fn decode_frame(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    if looks_utf16le(bytes) {
        if let Some(text) = decode_utf16le(bytes) {
            return Some(text);
        }
        warn!(len = bytes.len(), "UTF-16LE-shaped frame failed to decode, retrying as UTF-8");
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "Undecodable data-channel frame dropped");
            None
        }
    }
}

/// Heuristic: JSON text in UTF-16LE has zero high bytes for the entire
/// ASCII range, so a majority of zeroed odd-index bytes marks the frame.
fn looks_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    let high_zero = bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    high_zero * 2 > bytes.len() / 2
}

fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

// ============================================================================
// Tests
// ============================================================================

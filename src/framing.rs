//! Octet-count framing decoder (C1).
//!
//! Reconstructs discrete syslog records from a byte stream delivered over
//! the TLS transport. The wire format is `<ASCII decimal length> <SP>
//! <length bytes of payload>`; this module owns the buffer and the resync
//! rules that let a single malformed frame be skipped without tearing down
//! the session.

use tracing::warn;

/// A record longer than this many bytes is never well-formed traffic;
/// declaring it triggers frame-skip recovery rather than an attempt to
/// buffer it.
pub const DEFAULT_MAX_MSG_LEN: usize = 65_535;

/// The buffer is never allowed to grow past this many bytes. Exceeding it
/// resets the buffer to empty rather than letting a pathological sender
/// exhaust memory.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Per-session octet-count frame decoder.
///
/// One `FrameDecoder` is created per stream session and lives for the
/// session's duration; its buffer is never shared across sessions.
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_msg_len: usize,
    max_buffer_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MSG_LEN, DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl FrameDecoder {
    /// Creates a decoder with explicit length ceilings.
    pub fn new(max_msg_len: usize, max_buffer_size: usize) -> Self {
        Self { buffer: Vec::new(), max_msg_len, max_buffer_size }
    }

    /// Feeds newly-read bytes into the decoder and returns every complete
    /// record now extractable, in wire order.
    ///
    /// Malformed length prefixes and oversize declared lengths are
    /// recovered from locally (§4.1) and never surface as an error; the
    /// only externally visible effect is a shorter (possibly empty)
    /// output vector and a warning log.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(data);

        if self.buffer.len() > self.max_buffer_size {
            warn!(
                buffer_len = self.buffer.len(),
                max = self.max_buffer_size,
                "frame buffer exceeded ceiling, discarding"
            );
            self.buffer.clear();
            return Vec::new();
        }

        let mut records = Vec::new();
        loop {
            let Some(space_idx) = self.buffer.iter().position(|&b| b == b' ') else {
                break;
            };

            let prefix = &self.buffer[..space_idx];
            let Some(length) = parse_decimal_length(prefix) else {
                warn!("invalid octet count, resyncing by one byte");
                self.buffer.drain(..1);
                continue;
            };

            if length > self.max_msg_len {
                warn!(length, max = self.max_msg_len, "declared frame length too large, skipping");
                let skip_from = space_idx;
                match self.buffer[skip_from..].iter().position(|&b| b == b'\n') {
                    Some(rel_nl) => {
                        self.buffer.drain(..skip_from + rel_nl + 1);
                    }
                    None => self.buffer.clear(),
                }
                continue;
            }

            let frame_len = space_idx + 1 + length;
            if self.buffer.len() < frame_len {
                break;
            }

            let payload = &self.buffer[space_idx + 1..frame_len];
            records.push(String::from_utf8_lossy(payload).into_owned());
            self.buffer.drain(..frame_len);
        }

        records
    }
}

/// Parses a non-negative ASCII decimal length prefix. Rejects empty input,
/// non-digit bytes, and values that would overflow `usize` — all of these
/// are "not a well-formed non-negative decimal" per §4.1.
fn parse_decimal_length(prefix: &[u8]) -> Option<usize> {
    if prefix.is_empty() || !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(prefix).ok()?.parse().ok()
}

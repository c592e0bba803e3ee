//! Crate-wide error type.
//!
//! Per-message failures (malformed frames, parser fallbacks, individual
//! write failures) never reach this type — they are handled locally and
//! logged, as described in each component's own module. `Error` is reserved
//! for start-up and transport-level failures that a session or the whole
//! process cannot recover from on its own.

use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal or session-fatal error conditions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transient or fatal I/O failure on a socket or file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A TLS handshake or record-layer operation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Self-signed certificate generation failed at start-up.
    #[error("certificate generation failed: {0}")]
    CertGeneration(String),

    /// A configuration value could not be parsed or was out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

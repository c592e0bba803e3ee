//! TLS receiver (§4.5): one TCP+TLS session per client, octet-count framed.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::framing::FrameDecoder;
use crate::net::cert;
use crate::pipeline::Pipeline;

const READ_BUF: usize = 4096;
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs the TLS accept loop until `running` is cleared, spawning one task
/// per accepted connection.
pub async fn serve(
    port: u16,
    cert_path: &Path,
    key_path: &Path,
    pipeline: Arc<Pipeline>,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let tls_config = cert::load_or_generate(cert_path, key_path)?;
    let acceptor = TlsAcceptor::from(tls_config);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "TLS receiver listening");

    while running.load(Ordering::SeqCst) {
        match timeout(POLL_TIMEOUT, listener.accept()).await {
            Ok(Ok((stream, addr))) => {
                let acceptor = acceptor.clone();
                let pipeline = pipeline.clone();
                let running = running.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, acceptor, pipeline, running).await {
                        warn!(peer = %addr, error = %e, "TLS session ended with error");
                    }
                });
            }
            Ok(Err(e)) => error!(error = %e, "TLS accept failed"),
            Err(_) => {
                // Poll timeout; loop back around to recheck `running`.
            }
        }
    }

    debug!("TLS receiver stopped");
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    acceptor: TlsAcceptor,
    pipeline: Arc<Pipeline>,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut tls_stream = acceptor.accept(stream).await.map_err(|e| Error::Tls(e.to_string()))?;
    let source_ip = addr.ip().to_string();
    let mut decoder = FrameDecoder::default();
    let mut buf = [0u8; READ_BUF];

    info!(peer = %addr, "TLS session established");

    while running.load(Ordering::SeqCst) {
        match timeout(POLL_TIMEOUT, tls_stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                for message in decoder.feed(&buf[..n]) {
                    pipeline.ingest(&message, &source_ip).await;
                }
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                // Poll timeout; loop back around to recheck `running`.
            }
        }
    }

    debug!(peer = %addr, "TLS session closed");
    Ok(())
}

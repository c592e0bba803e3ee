//! UDP receiver (§4.5): one datagram is one message, no framing involved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::pipeline::Pipeline;

/// Datagrams larger than this are not legal syslog-over-UDP traffic, but
/// are still decoded best-effort rather than dropped.
const MAX_DATAGRAM: usize = 65_535;

/// Read budget per `recvfrom` poll; bounds how promptly `running` is
/// rechecked after it flips to `false`.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs the UDP receive loop until `running` is cleared.
///
/// Every datagram is decoded (invalid UTF-8 bytes are replaced, never
/// rejected) and handed to the shared [`Pipeline`] tagged with the sender's
/// address.
pub async fn serve(port: u16, pipeline: Arc<Pipeline>, running: Arc<AtomicBool>) -> Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    info!(port, "UDP receiver listening");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    while running.load(Ordering::SeqCst) {
        match timeout(POLL_TIMEOUT, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, addr))) => {
                let message = String::from_utf8_lossy(&buf[..len]).into_owned();
                pipeline.ingest(&message, &addr.ip().to_string()).await;
            }
            Ok(Err(e)) => {
                error!(error = %e, "UDP recv failed");
            }
            Err(_) => {
                // Poll timeout; loop back around to recheck `running`.
            }
        }
    }

    debug!("UDP receiver stopped");
    Ok(())
}

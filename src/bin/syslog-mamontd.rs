//! Thin binary entry point (§10.8): wires configuration, logging, the
//! pipeline, and the enabled receivers together, then waits for a signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use syslog_mamont::config::Config;
use syslog_mamont::dedup::WindowedDeduplicator;
use syslog_mamont::net::{tls, udp};
use syslog_mamont::pipeline::Pipeline;
use syslog_mamont::writer::{FileWriter, Writer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = Config::parse().resolve();
    info!(
        udp_port = settings.udp_port,
        tls_port = settings.tls_port,
        log_dir = %settings.log_dir.display(),
        enable_udp = settings.enable_udp,
        enable_tls = settings.enable_tls,
        "starting syslog collector"
    );

    let writer = match FileWriter::new(&settings.log_dir, settings.max_bytes, settings.backup_count) {
        Ok(writer) => Arc::new(writer),
        Err(e) => {
            error!(error = %e, "failed to initialise writer");
            std::process::exit(1);
        }
    };

    let dedup = Arc::new(WindowedDeduplicator::new(settings.dedup_window));
    let reaper = dedup.spawn_reaper();

    let pipeline = Arc::new(Pipeline::new(dedup, writer.clone()));
    let running = Arc::new(AtomicBool::new(true));

    let mut receivers = Vec::new();

    if settings.enable_udp {
        let pipeline = pipeline.clone();
        let running = running.clone();
        let port = settings.udp_port;
        receivers.push(tokio::spawn(async move {
            if let Err(e) = udp::serve(port, pipeline, running).await {
                error!(error = %e, "UDP receiver exited");
            }
        }));
    }

    if settings.enable_tls {
        let pipeline = pipeline.clone();
        let running = running.clone();
        let port = settings.tls_port;
        let cert_file = settings.cert_file.clone();
        let key_file = settings.key_file.clone();
        receivers.push(tokio::spawn(async move {
            if let Err(e) = tls::serve(port, &cert_file, &key_file, pipeline, running).await {
                error!(error = %e, "TLS receiver exited");
            }
        }));
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
    }
    info!("shutdown signal received, stopping receivers");

    running.store(false, Ordering::SeqCst);
    for receiver in receivers {
        let _ = receiver.await;
    }

    reaper.abort();
    writer.close().await;
    info!("syslog collector stopped");
}

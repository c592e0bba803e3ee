//! Runtime configuration (§10.3): environment variables with CLI overrides.
//!
//! Every setting has an environment-variable default; command-line flags,
//! when present, take precedence over the environment. This mirrors the
//! original collector's `os.environ.get(NAME, default)` surface while
//! giving operators a discoverable `--help`.

use std::path::PathBuf;

use clap::Parser;

use crate::dedup::DEFAULT_WINDOW;
use crate::writer::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(var: &str, default: bool) -> bool {
    match std::env::var(var) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// A syslog collection daemon: UDP and TLS ingestion, RFC 3164/5424
/// parsing, deduplication, and severity-partitioned storage.
#[derive(Debug, Parser)]
#[command(name = "syslog-mamontd", about, version)]
pub struct Config {
    /// UDP listen port. Overrides `SYSLOG_UDP_PORT` (default 514).
    #[arg(long)]
    udp_port: Option<u16>,

    /// TLS listen port. Overrides `SYSLOG_TLS_PORT` (default 6514).
    #[arg(long)]
    tls_port: Option<u16>,

    /// Directory severity-partitioned log files are written to. Overrides
    /// `SYSLOG_LOG_DIR` (default `logs`).
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// TLS certificate file. Generated on first run if missing. Overrides
    /// `SYSLOG_CERT_FILE` (default `cert.pem`).
    #[arg(long)]
    cert_file: Option<PathBuf>,

    /// TLS private key file. Generated on first run if missing. Overrides
    /// `SYSLOG_KEY_FILE` (default `key.pem`).
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Enable the UDP receiver. Overrides `SYSLOG_ENABLE_UDP` (default
    /// true).
    #[arg(long)]
    enable_udp: Option<bool>,

    /// Enable the TLS receiver. Overrides `SYSLOG_ENABLE_TLS` (default
    /// true).
    #[arg(long)]
    enable_tls: Option<bool>,

    /// Deduplication window, in minutes. Overrides
    /// `SYSLOG_DEDUP_WINDOW_MINUTES` (default 10).
    #[arg(long)]
    dedup_window_minutes: Option<u64>,

    /// Rotation threshold, in bytes, for each severity's log file.
    /// Overrides `SYSLOG_MAX_BYTES` (default 10 MiB).
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Number of rotated backups to retain per severity. Overrides
    /// `SYSLOG_BACKUP_COUNT` (default 5).
    #[arg(long)]
    backup_count: Option<u32>,
}

/// Resolved settings the daemon runs with, after layering CLI flags over
/// environment variables over built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub udp_port: u16,
    pub tls_port: u16,
    pub log_dir: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub enable_udp: bool,
    pub enable_tls: bool,
    pub dedup_window: std::time::Duration,
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Config {
    /// Resolves environment defaults layered with any CLI overrides.
    pub fn resolve(self) -> Settings {
        Settings {
            udp_port: self.udp_port.unwrap_or_else(|| env_or("SYSLOG_UDP_PORT", 514)),
            tls_port: self.tls_port.unwrap_or_else(|| env_or("SYSLOG_TLS_PORT", 6514)),
            log_dir: self.log_dir.unwrap_or_else(|| env_path("SYSLOG_LOG_DIR", "logs")),
            cert_file: self.cert_file.unwrap_or_else(|| env_path("SYSLOG_CERT_FILE", "cert.pem")),
            key_file: self.key_file.unwrap_or_else(|| env_path("SYSLOG_KEY_FILE", "key.pem")),
            enable_udp: self.enable_udp.unwrap_or_else(|| env_bool("SYSLOG_ENABLE_UDP", true)),
            enable_tls: self.enable_tls.unwrap_or_else(|| env_bool("SYSLOG_ENABLE_TLS", true)),
            dedup_window: self
                .dedup_window_minutes
                .map(|m| std::time::Duration::from_secs(m * 60))
                .unwrap_or_else(|| {
                    std::env::var("SYSLOG_DEDUP_WINDOW_MINUTES")
                        .ok()
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(|m| std::time::Duration::from_secs(m * 60))
                        .unwrap_or(DEFAULT_WINDOW)
                }),
            max_bytes: self.max_bytes.unwrap_or_else(|| env_or("SYSLOG_MAX_BYTES", DEFAULT_MAX_BYTES)),
            backup_count: self
                .backup_count
                .unwrap_or_else(|| env_or("SYSLOG_BACKUP_COUNT", DEFAULT_BACKUP_COUNT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialise tests that touch
    // them so they cannot observe each other's mutations.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "SYSLOG_UDP_PORT",
            "SYSLOG_TLS_PORT",
            "SYSLOG_LOG_DIR",
            "SYSLOG_CERT_FILE",
            "SYSLOG_KEY_FILE",
            "SYSLOG_ENABLE_UDP",
            "SYSLOG_ENABLE_TLS",
            "SYSLOG_DEDUP_WINDOW_MINUTES",
            "SYSLOG_MAX_BYTES",
            "SYSLOG_BACKUP_COUNT",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let settings = Config { udp_port: None, tls_port: None, log_dir: None, cert_file: None, key_file: None, enable_udp: None, enable_tls: None, dedup_window_minutes: None, max_bytes: None, backup_count: None }.resolve();
        assert_eq!(settings.udp_port, 514);
        assert_eq!(settings.tls_port, 6514);
        assert_eq!(settings.log_dir, PathBuf::from("logs"));
        assert!(settings.enable_udp);
        assert!(settings.enable_tls);
        assert_eq!(settings.dedup_window, DEFAULT_WINDOW);
    }

    #[test]
    fn cli_flag_overrides_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("SYSLOG_UDP_PORT", "9000");
        let settings = Config { udp_port: Some(1514), tls_port: None, log_dir: None, cert_file: None, key_file: None, enable_udp: None, enable_tls: None, dedup_window_minutes: None, max_bytes: None, backup_count: None }.resolve();
        assert_eq!(settings.udp_port, 1514);
        clear_env();
    }

    #[test]
    fn environment_overrides_builtin_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("SYSLOG_ENABLE_TLS", "false");
        let settings = Config { udp_port: None, tls_port: None, log_dir: None, cert_file: None, key_file: None, enable_udp: None, enable_tls: None, dedup_window_minutes: None, max_bytes: None, backup_count: None }.resolve();
        assert!(!settings.enable_tls);
        clear_env();
    }
}

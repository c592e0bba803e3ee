//! End-to-end message pipeline (C5): parse, stamp, deduplicate, persist.
//!
//! Both receivers hand raw message text to the same [`Pipeline`] so the
//! parsing, tagging, and dedup rules are applied identically regardless of
//! transport.

use std::sync::Arc;

use tracing::debug;

use crate::dedup::Deduplicator;
use crate::parser;
use crate::writer::Writer;

/// Wires a [`Deduplicator`] and a [`Writer`] together behind the one
/// operation receivers call per inbound message.
pub struct Pipeline {
    dedup: Arc<dyn Deduplicator>,
    writer: Arc<dyn Writer>,
}

impl Pipeline {
    pub fn new(dedup: Arc<dyn Deduplicator>, writer: Arc<dyn Writer>) -> Self {
        Self { dedup, writer }
    }

    /// Parses `raw`, tags it with `source_ip` and a receipt timestamp, and
    /// writes it unless the deduplicator suppresses it.
    pub async fn ingest(&self, raw: &str, source_ip: &str) {
        let mut record = parser::parse(raw);
        record.source_ip = Some(source_ip.to_string());
        record.received_at = Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true));

        let should_write = self
            .dedup
            .should_write(source_ip, record.priority_or_zero(), record.message_or_empty())
            .await;

        if !should_write {
            debug!(source_ip, "suppressed duplicate message");
            return;
        }

        self.writer.write(&record).await;
    }
}

//! Syslog header parser (C2).
//!
//! Recognises RFC 5424, RFC 3164, a priority-only fallback, and a plain
//! fallback, in that order, and extracts facility/severity/message from the
//! first grammar that matches.
//!
//! <https://datatracker.ietf.org/doc/html/rfc5424>
//! <https://datatracker.ietf.org/doc/html/rfc3164>

use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::{Format, Record};
use crate::severity::{facility_name, Severity};

// Compiled once and shared across every call, as required by the parser
// regexes being process-lifetime global state (§9). No DOTALL flag: `.`
// stops at a newline here, matching the original grammar exactly, so a
// payload with an embedded newline falls through to the next grammar
// rather than being swallowed into `msg`.
static RFC5424_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^<(?P<pri>\d+)>(?P<ver>\d+)\s+(?P<timestamp>\S+)\s+(?P<hostname>\S+)\s+(?P<app>\S+)\s+(?P<procid>\S+)\s+(?P<msgid>\S+)\s+(?P<sd>\S+)\s*(?P<msg>.*)$",
    )
    .expect("static RFC5424 pattern is valid")
});

static RFC3164_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^<(?P<pri>\d+)>(?P<timestamp>\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(?P<hostname>\S+)\s+(?P<msg>.*)$",
    )
    .expect("static RFC3164 pattern is valid")
});

static PRIORITY_ONLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(\d+)>(.*)$").expect("static priority-only pattern is valid"));

/// Default priority (`user.notice`) used when a message carries no `PRI`
/// at all.
const DEFAULT_PRIORITY: u64 = 13;

/// Parses one syslog message and returns a fully-populated [`Record`].
///
/// This never returns an error: an internal failure degrades the result to
/// a `severity: "error"` record carrying `parse_error` rather than
/// propagating (§7).
pub fn parse(message: &str) -> Record {
    match std::panic::catch_unwind(|| parse_inner(message)) {
        Ok(record) => record,
        Err(_) => error_record(message, "internal parser failure"),
    }
}

fn parse_inner(message: &str) -> Record {
    if let Some(caps) = RFC5424_PATTERN.captures(message) {
        return parse_rfc5424(message, &caps);
    }
    if let Some(caps) = RFC3164_PATTERN.captures(message) {
        return parse_rfc3164(message, &caps);
    }
    if let Some(caps) = PRIORITY_ONLY_PATTERN.captures(message) {
        return parse_priority_only(message, &caps);
    }
    plain_record(message)
}

fn parse_rfc5424(raw: &str, caps: &regex::Captures) -> Record {
    let pri = resolve_pri(&caps["pri"]);
    Record {
        priority: pri.value,
        facility: Some(pri.facility.to_string()),
        severity: Some(pri.severity.to_string()),
        version: Some(caps["ver"].to_string()),
        timestamp: Some(caps["timestamp"].to_string()),
        hostname: Some(caps["hostname"].to_string()),
        app_name: Some(caps["app"].to_string()),
        proc_id: Some(caps["procid"].to_string()),
        msg_id: Some(caps["msgid"].to_string()),
        structured_data: Some(caps["sd"].to_string()),
        message: Some(caps["msg"].to_string()),
        raw: Some(raw.to_string()),
        format: Some(Format::Rfc5424),
        ..Default::default()
    }
}

fn parse_rfc3164(raw: &str, caps: &regex::Captures) -> Record {
    let pri = resolve_pri(&caps["pri"]);
    Record {
        priority: pri.value,
        facility: Some(pri.facility.to_string()),
        severity: Some(pri.severity.to_string()),
        timestamp: Some(caps["timestamp"].to_string()),
        hostname: Some(caps["hostname"].to_string()),
        message: Some(caps["msg"].to_string()),
        raw: Some(raw.to_string()),
        format: Some(Format::Rfc3164),
        ..Default::default()
    }
}

fn parse_priority_only(raw: &str, caps: &regex::Captures) -> Record {
    let pri = resolve_pri(&caps[1]);
    Record {
        priority: pri.value,
        facility: Some(pri.facility.to_string()),
        severity: Some(pri.severity.to_string()),
        message: Some(caps[2].to_string()),
        raw: Some(raw.to_string()),
        timestamp: Some(receipt_timestamp()),
        ..Default::default()
    }
}

fn plain_record(raw: &str) -> Record {
    Record {
        priority: Some(DEFAULT_PRIORITY),
        facility: Some("user".to_string()),
        severity: Some("notice".to_string()),
        message: Some(raw.to_string()),
        raw: Some(raw.to_string()),
        timestamp: Some(receipt_timestamp()),
        ..Default::default()
    }
}

fn error_record(raw: &str, reason: &str) -> Record {
    Record {
        priority: Some(DEFAULT_PRIORITY),
        facility: Some("user".to_string()),
        severity: Some("error".to_string()),
        message: Some(raw.to_string()),
        raw: Some(raw.to_string()),
        parse_error: Some(reason.to_string()),
        timestamp: Some(receipt_timestamp()),
        ..Default::default()
    }
}

/// The outcome of resolving a matched `PRI` digit string.
struct ResolvedPri {
    /// The numeric value, or `None` if the digit string overflowed `u64`
    /// (the matched group is `\d+` with no length cap, so an adversarial
    /// sender can supply more digits than fit).
    value: Option<u64>,
    facility: &'static str,
    severity: &'static str,
}

/// Parses a `PRI` digit string into its numeric value and the facility and
/// severity names it maps to. An out-of-range value (too many digits to
/// fit `u64`) resolves to `facility`/`severity` of `"unknown"` and a `None`
/// value rather than silently falling back to a plausible-looking default
/// priority — the full original text is still preserved in `Record::raw`.
fn resolve_pri(digits: &str) -> ResolvedPri {
    match digits.parse::<u64>() {
        Ok(pri) => ResolvedPri {
            value: Some(pri),
            facility: facility_name(pri),
            severity: Severity::from_pri(pri).map(Severity::name).unwrap_or("unknown"),
        },
        Err(_) => ResolvedPri { value: None, facility: "unknown", severity: "unknown" },
    }
}

fn receipt_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

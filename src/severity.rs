//! The fixed severity and facility tables from the syslog priority byte.
//!
//! `PRI = facility * 8 + severity`. Both tables are small, constant, and
//! compiled in; there is no mutable process-global state here (§9 of the
//! design).

/// One of the eight syslog severities, the lower three bits of `PRI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

const SEVERITY_NAMES: [&str; 8] =
    ["emergency", "alert", "critical", "error", "warning", "notice", "info", "debug"];

impl Severity {
    /// Looks up a severity by the lower three bits of a `PRI` value.
    pub fn from_pri(pri: u64) -> Option<Self> {
        Self::from_code((pri & 0x07) as u8)
    }

    /// Looks up a severity by its 0–7 numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            7 => Severity::Debug,
            _ => return None,
        })
    }

    /// Looks up a severity by its lowercase name, e.g. `"notice"`.
    pub fn from_name(name: &str) -> Option<Self> {
        SEVERITY_NAMES.iter().position(|&n| n == name).map(|idx| Self::from_code(idx as u8).unwrap())
    }

    /// The lowercase name used both in `Record::severity` and as the log
    /// file stem (`<name>.log`).
    pub fn name(self) -> &'static str {
        SEVERITY_NAMES[self as usize]
    }

    /// All eight severities in ascending numeric order, for iterating the
    /// writer's fixed file set.
    pub fn all() -> [Severity; 8] {
        [
            Severity::Emergency,
            Severity::Alert,
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Notice,
            Severity::Info,
            Severity::Debug,
        ]
    }
}

const FACILITY_NAMES: [&str; 24] = [
    "kern",
    "user",
    "mail",
    "daemon",
    "auth",
    "syslog",
    "lpr",
    "news",
    "uucp",
    "cron",
    "authpriv",
    "ftp",
    "ntp",
    "security",
    "console",
    "solaris-cron",
    "local0",
    "local1",
    "local2",
    "local3",
    "local4",
    "local5",
    "local6",
    "local7",
];

/// Looks up the facility name for the upper bits of a `PRI` value.
/// Returns `"unknown"` for any out-of-range index, matching the parser's
/// fallback behaviour rather than panicking.
pub fn facility_name(pri: u64) -> &'static str {
    FACILITY_NAMES.get((pri >> 3) as usize).copied().unwrap_or("unknown")
}

use std::fmt;
use std::time::{Duration, Instant};

/// How long a notice stays up unless dismissed or superseded.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// Ephemeral user-facing message. A new notice replaces the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub lifetime: Duration,
    posted_at: Instant,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message.into())
    }

    fn new(severity: Severity, message: String) -> Self {
        Self {
            severity,
            message,
            lifetime: NOTICE_LIFETIME,
            posted_at: Instant::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.posted_at) >= self.lifetime
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

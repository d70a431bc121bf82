//! Trash retention policy.
//!
//! The obligation string has the form `"<min>, <max>"` where each part is a
//! number of days or `auto`. A single value is the minimum. `disabled` turns
//! expiration off entirely.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};
use crate::constants::{DEFAULT_RETENTION_DAYS, SECONDS_PER_DAY};
use crate::sweep::ExpirationPolicy;

const AUTO: &str = "auto";
const DISABLED: &str = "disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Days an item is kept at least; `None` means it may go at any time.
    pub min_days: Option<i64>,
    /// Days after which an item is always removed; `None` means never by age alone.
    pub max_days: Option<i64>,
    /// Whether items may be purged early when the owner is over quota.
    pub can_purge_to_save_space: bool,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            min_days: Some(DEFAULT_RETENTION_DAYS),
            max_days: None,
            can_purge_to_save_space: true,
        }
    }
}

impl Retention {
    /// Parse an obligation string. Returns `None` for `disabled`.
    pub fn parse(obligation: &str) -> Option<Self> {
        let obligation = obligation.trim();
        if obligation.eq_ignore_ascii_case(DISABLED) {
            return None;
        }

        let parts: Vec<&str> = obligation.split(',').map(str::trim).collect();
        if parts.len() > 2 {
            return Some(fallback(obligation));
        }
        // A missing or empty part means `auto`.
        let part = |idx: usize| {
            parts
                .get(idx)
                .copied()
                .filter(|v| !v.is_empty())
                .unwrap_or(AUTO)
        };
        let (min, max) = (part(0), part(1));

        let retention = match (min, max) {
            (AUTO, AUTO) => Self::default(),
            (min, AUTO) => match parse_days(min) {
                Some(min_days) => Self {
                    min_days: Some(min_days),
                    max_days: None,
                    can_purge_to_save_space: true,
                },
                None => return Some(fallback(obligation)),
            },
            (AUTO, max) => match parse_days(max) {
                Some(max_days) => Self {
                    min_days: None,
                    max_days: Some(max_days),
                    can_purge_to_save_space: true,
                },
                None => return Some(fallback(obligation)),
            },
            (min, max) => match (parse_days(min), parse_days(max)) {
                (Some(min_days), Some(max_days)) => Self {
                    min_days: Some(min_days),
                    max_days: Some(max_days.max(min_days)),
                    can_purge_to_save_space: false,
                },
                _ => return Some(fallback(obligation)),
            },
        };
        Some(retention)
    }
}

fn parse_days(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|days| *days >= 0)
}

fn fallback(obligation: &str) -> Retention {
    tracing::warn!(
        obligation,
        "Invalid trash retention obligation, using default"
    );
    Retention::default()
}

/// Retention policy evaluated against an injectable clock.
#[derive(Clone)]
pub struct RetentionPolicy {
    retention: Option<Retention>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionPolicy")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl RetentionPolicy {
    pub fn from_obligation(obligation: &str) -> Self {
        Self::with_clock(obligation, Arc::new(SystemClock))
    }

    pub fn with_clock(obligation: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            retention: Retention::parse(obligation),
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.retention.is_some()
    }

    pub fn retention(&self) -> Option<Retention> {
        self.retention
    }
}

fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::seconds(days.saturating_mul(SECONDS_PER_DAY))
}

impl ExpirationPolicy for RetentionPolicy {
    fn max_age_timestamp(&self) -> Option<DateTime<Utc>> {
        let max_days = self.retention?.max_days?;
        Some(days_before(self.clock.now(), max_days))
    }

    fn is_expired(&self, timestamp: DateTime<Utc>, quota_exceeded: bool) -> bool {
        let Some(retention) = self.retention else {
            return false;
        };
        if quota_exceeded && retention.can_purge_to_save_space {
            return true;
        }

        let now = self.clock.now();
        // Items dated in the future come from clock skew; never expire them.
        if timestamp > now {
            return false;
        }

        let older_than_max = retention
            .max_days
            .is_some_and(|days| timestamp < days_before(now, days));
        let min_reached_under_pressure = retention
            .min_days
            .is_some_and(|days| quota_exceeded && timestamp < days_before(now, days));

        older_than_max || min_reached_under_pressure
    }
}

//! Usage telemetry side channel.
//!
//! Every evaluation produces a [`UsageRecord`]. The default sink,
//! [`UsageBuffer`], keeps records in memory until an external collector
//! drains them. Bounding the buffer is the collector's job: it is expected
//! to drain periodically.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Mode, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub flag_id: String,
    pub enabled: bool,
    pub role: Option<Role>,
    pub mode: Mode,
    pub screen_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Destination for usage records.
///
/// Implementations must be cheap and non-blocking: `record` runs on the
/// caller's evaluation path.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, record: UsageRecord) -> Result<()>;

    /// Return and clear everything recorded since the last drain. Sinks that
    /// forward records elsewhere keep nothing and return an empty list.
    fn drain(&self) -> Vec<UsageRecord> {
        Vec::new()
    }
}

/// In-memory append-only buffer.
#[derive(Debug, Default)]
pub struct UsageBuffer {
    records: Mutex<Vec<UsageRecord>>,
}

impl UsageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for UsageBuffer {
    fn record(&self, record: UsageRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    fn drain(&self) -> Vec<UsageRecord> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

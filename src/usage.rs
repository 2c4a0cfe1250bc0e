//! Usage tracking and abandoned object reporting

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Evidence of where a pooled object was borrowed or last used
#[derive(Debug, Clone)]
pub enum CallSite {
    /// Source location of the calling code
    Location(&'static Location<'static>),

    /// Full backtrace captured at the call
    Backtrace(Arc<Backtrace>),
}

impl CallSite {
    pub(crate) fn capture(full: bool, caller: &'static Location<'static>) -> Self {
        if full {
            CallSite::Backtrace(Arc::new(Backtrace::force_capture()))
        } else {
            CallSite::Location(caller)
        }
    }

    /// Source location, when only the cheap marker was captured
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            CallSite::Location(location) => Some(location),
            CallSite::Backtrace(_) => None,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Location(location) => write!(f, "{location}"),
            CallSite::Backtrace(backtrace) => write!(f, "{backtrace}"),
        }
    }
}

/// Everything known about an object reclaimed as abandoned
#[derive(Debug, Clone)]
pub struct AbandonedReport {
    pub pool_id: u64,
    pub object_id: u64,
    pub borrow_count: u64,
    /// Time since the later of the last borrow and the last tracked use
    pub unused_for: Duration,
    pub borrowed_by: Option<CallSite>,
    pub last_used_by: Option<CallSite>,
}

/// Destination for abandoned object reports
pub trait AbandonedLogSink: Send + Sync {
    fn report(&self, report: &AbandonedReport);
}

/// Sink that emits each report as a `tracing` warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl AbandonedLogSink for TracingLogSink {
    fn report(&self, report: &AbandonedReport) {
        tracing::warn!(
            pool = report.pool_id,
            object_id = report.object_id,
            borrow_count = report.borrow_count,
            unused_for = ?report.unused_for,
            borrowed_by = report.borrowed_by.as_ref().map(tracing::field::display),
            last_used_by = report.last_used_by.as_ref().map(tracing::field::display),
            "pooled object abandoned by its borrower and reclaimed"
        );
    }
}

#[derive(Debug, Clone)]
struct UsageRecord {
    last_used: Instant,
    call_site: Option<CallSite>,
}

/// Last-use evidence per borrowed object
///
/// Borrowers record uses concurrently, so records live in their own map
/// rather than behind the registry lock.
pub(crate) struct UsageTracker {
    records: DashMap<u64, UsageRecord>,
    enabled: bool,
    /// `Some(full)` when evidence should be captured
    capture: Option<bool>,
}

impl UsageTracker {
    pub fn new(enabled: bool, capture: Option<bool>) -> Self {
        Self {
            records: DashMap::new(),
            enabled,
            capture,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, None)
    }

    pub fn track(&self, object_id: u64, caller: &'static Location<'static>) {
        if !self.enabled {
            return;
        }
        let call_site = self.capture.map(|full| CallSite::capture(full, caller));
        self.records.insert(
            object_id,
            UsageRecord {
                last_used: Instant::now(),
                call_site,
            },
        );
    }

    pub fn last_used(&self, object_id: u64) -> Option<Instant> {
        self.records.get(&object_id).map(|record| record.last_used)
    }

    pub fn last_call_site(&self, object_id: u64) -> Option<CallSite> {
        self.records
            .get(&object_id)
            .and_then(|record| record.call_site.clone())
    }

    pub fn forget(&self, object_id: u64) {
        self.records.remove(&object_id);
    }
}

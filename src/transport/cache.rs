//! Response and range caches
//!
//! Shared state between the listener thread (writer) and correlator waits
//! (readers). One mutex/condition-variable pair guards both maps; message
//! rates stay in the tens per second.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::protocol::OscArg;

/// Condvar wait slice; waits re-scan at least this often
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Most recent response seen for one address. Last-write-wins; no history.
#[derive(Debug, Clone)]
pub struct ResponseEntry {
    /// When the datagram was received (local monotonic clock)
    pub received_at: Instant,

    /// Arguments carried by the response
    pub args: Vec<OscArg>,
}

/// Cached `[min, max]` lists for one `(track, device)` pair
#[derive(Debug, Clone)]
pub struct RangeEntry {
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,

    /// When the range was fetched; entries expire after the configured TTL
    pub fetched_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    responses: HashMap<String, ResponseEntry>,
    ranges: HashMap<(i32, i32), RangeEntry>,
}

/// Shared response/range cache with waiter notification
#[derive(Default)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    cv: Condvar,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the latest response for `address` and wake all waiters.
    ///
    /// Called from the listener thread for every decoded datagram.
    pub fn insert(&self, address: String, args: Vec<OscArg>) {
        let mut inner = self.inner.lock();
        inner.responses.insert(
            address,
            ResponseEntry {
                received_at: Instant::now(),
                args,
            },
        );
        self.cv.notify_all();
    }

    /// Wait for a response on any of `accept` that is no older than `sent_at`.
    ///
    /// Scans for the entry with the newest `received_at >= sent_at`; if none
    /// is present, blocks on the condvar in bounded slices and re-scans until
    /// `timeout` elapses. Entries received before `sent_at` are never
    /// returned: a stale reply from a previous call must not satisfy a new
    /// request.
    pub fn wait_matching(
        &self,
        accept: &[String],
        sent_at: Instant,
        timeout: Duration,
    ) -> Option<(String, Vec<OscArg>)> {
        let deadline = sent_at + timeout;
        let mut inner = self.inner.lock();

        loop {
            let mut best: Option<(&String, &ResponseEntry)> = None;
            for address in accept {
                if let Some(entry) = inner.responses.get(address) {
                    if entry.received_at >= sent_at
                        && best.map_or(true, |(_, b)| entry.received_at > b.received_at)
                    {
                        best = Some((address, entry));
                    }
                }
            }
            if let Some((address, entry)) = best {
                return Some((address.clone(), entry.args.clone()));
            }

            let remaining = deadline.checked_duration_since(Instant::now())?;
            self.cv.wait_for(&mut inner, remaining.min(WAIT_SLICE));
        }
    }

    /// Fresh `[min, max]` range for `(track, device)`, if cached within `ttl`
    pub fn range(&self, track: i32, device: i32, ttl: Duration) -> Option<RangeEntry> {
        let inner = self.inner.lock();
        let entry = inner.ranges.get(&(track, device))?;
        if entry.fetched_at.elapsed() <= ttl {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Store a freshly fetched `[min, max]` range
    pub fn put_range(&self, track: i32, device: i32, mins: Vec<f64>, maxs: Vec<f64>) {
        let mut inner = self.inner.lock();
        inner.ranges.insert(
            (track, device),
            RangeEntry {
                mins,
                maxs,
                fetched_at: Instant::now(),
            },
        );
    }
}

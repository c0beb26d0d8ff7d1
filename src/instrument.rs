//! Run instrumentation listeners
//!
//! ## Table of Contents
//! - **ElapsedTime**: Logs wall time between the Start and Stop events
//! - **SiteCounter**: Counts events, e.g. computed sites per run
//!
//! Cross-cutting concerns hook into the event vocabulary instead of the
//! stages themselves; dispatch hands listeners `&self`, so state lives
//! behind interior mutability.

use crate::event::{EventKind, Listener};
use crate::pipe::Pipe;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::info;

/// Logs the elapsed wall time of a run
///
/// Register the same instance for both `Start` and `Stop`.
#[derive(Default)]
pub struct ElapsedTime {
    started: Mutex<Option<Instant>>,
}

impl ElapsedTime {
    /// Create an idle timer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Listener for ElapsedTime {
    fn on_event(&self, event: EventKind, _pipe: &Pipe) {
        match event {
            EventKind::Start => {
                *self.started.lock() = Some(Instant::now());
            }
            EventKind::Stop => {
                if let Some(started) = self.started.lock().take() {
                    info!(elapsed_ms = started.elapsed().as_millis() as u64, "run finished");
                }
            }
            _ => {}
        }
    }
}

/// Counts how many times its events fired
///
/// Registered on a validator's success event this counts computed sites;
/// on the failure event, skipped ones.
#[derive(Debug, Default)]
pub struct SiteCounter {
    count: AtomicUsize,
}

impl SiteCounter {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events seen so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Listener for SiteCounter {
    fn on_event(&self, _event: EventKind, _pipe: &Pipe) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Region, Site};

    fn pipe() -> Pipe {
        let site = Site::new(1.0, 1.0).unwrap();
        Pipe::new(site, Region::single_cell_region(site))
    }

    #[test]
    fn test_site_counter_counts_events() {
        let counter = SiteCounter::new();
        let p = pipe();
        counter.on_event(EventKind::ValidationSucceeded, &p);
        counter.on_event(EventKind::ValidationSucceeded, &p);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_elapsed_time_clears_on_stop() {
        let timer = ElapsedTime::new();
        let p = pipe();
        timer.on_event(EventKind::Start, &p);
        assert!(timer.started.lock().is_some());
        timer.on_event(EventKind::Stop, &p);
        assert!(timer.started.lock().is_none());
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let timer = ElapsedTime::new();
        timer.on_event(EventKind::Stop, &pipe());
    }
}

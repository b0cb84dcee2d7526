//! Per-tick snapshot consumers.

use std::collections::VecDeque;

use rb_ir::Snapshot;

/// Receives one snapshot per tick. Must not block.
pub trait TelemetrySink: Send {
    fn record(&mut self, snapshot: &Snapshot);
}

pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _snapshot: &Snapshot) {}
}

/// Logs a one-line summary at debug level every `every` ticks.
pub struct LogSink {
    every: u32,
    count: u32,
}

impl LogSink {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }
}

impl TelemetrySink for LogSink {
    fn record(&mut self, s: &Snapshot) {
        self.count += 1;
        if self.count < self.every {
            return;
        }
        self.count = 0;
        log::debug!(
            "{:>8.2}s {} {:<14} thr {:.2}/{:.2} rpm {:>5.0} gear {} idle {:.2} voices {}{}",
            s.time.as_secs(),
            s.profile,
            s.state.name(),
            s.raw_throttle,
            s.smoothed_throttle,
            s.rpm,
            s.gear.map_or('-', |g| char::from(b'0' + g)),
            s.idle_volume,
            s.busy_voices(),
            if s.switching { " [switching]" } else { "" }
        );
    }
}

/// Keeps the most recent `capacity` snapshots.
pub struct RecordingSink {
    capacity: usize,
    history: VecDeque<Snapshot>,
}

impl RecordingSink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn history(&self) -> &VecDeque<Snapshot> {
        &self.history
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&mut self, snapshot: &Snapshot) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(snapshot.clone());
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn record(&mut self, snapshot: &Snapshot) {
        (**self).record(snapshot)
    }
}

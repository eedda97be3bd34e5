//! Shared state for a condensation run.
//!
//! The [`AnalysisContext`] holds everything passes and the scheduler share
//! across methods: the event log and the per-method outcome sets. All fields
//! use thread-safe types so that methods can be processed in parallel against
//! a shared reference.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use dashmap::{DashMap, DashSet};

use crate::{
    compiler::events::{DerivedStats, EventLog},
    Error,
};

/// Identifies a method within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(usize);

impl MethodId {
    /// Creates a method identifier from its position in the batch.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position in the batch.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

/// Thread-safe state shared by all passes of a run.
pub struct AnalysisContext {
    /// Accumulated events from all passes.
    pub events: EventLog,

    /// Methods abandoned because a pass reported an internal fault.
    pub failed_methods: DashMap<MethodId, Error>,

    /// Methods that were changed by at least one pass.
    pub processed_methods: DashSet<MethodId>,

    /// Scheduler iterations summed over all methods.
    iterations: AtomicUsize,

    start_time: Instant,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: EventLog::new(),
            failed_methods: DashMap::new(),
            processed_methods: DashSet::new(),
            iterations: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Adds the iterations one method took to the run total.
    pub fn add_iterations(&self, iterations: usize) {
        self.iterations.fetch_add(iterations, Ordering::Relaxed);
    }

    /// Summarizes the run so far: event counts, iterations and elapsed time.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events)
            .with_iterations(self.iterations.load(Ordering::Relaxed))
            .with_time(self.elapsed())
    }

    /// Records that `method` was abandoned with `error`.
    pub fn mark_failed(&self, method: MethodId, error: Error) {
        self.failed_methods.insert(method, error);
    }

    /// Checks if `method` was abandoned.
    #[must_use]
    pub fn is_failed(&self, method: MethodId) -> bool {
        self.failed_methods.contains_key(&method)
    }

    /// The error `method` was abandoned with, if any.
    #[must_use]
    pub fn failure(&self, method: MethodId) -> Option<Error> {
        self.failed_methods.get(&method).map(|entry| entry.value().clone())
    }

    /// Marks `method` as changed.
    pub fn mark_processed(&self, method: MethodId) {
        self.processed_methods.insert(method);
    }

    /// Checks if `method` was changed.
    #[must_use]
    pub fn is_processed(&self, method: MethodId) -> bool {
        self.processed_methods.contains(&method)
    }
}

//! Unified event logging for the condensation pipeline.
//!
//! Every rewrite a pass performs is recorded as an [`Event`] in the shared
//! [`EventLog`] of the [`crate::compiler::AnalysisContext`]. Events can be
//! inspected for debugging, summarized through [`DerivedStats`], or safely
//! ignored.
//!
//! # Example
//!
//! ```rust
//! use refold::compiler::{EventKind, EventLog, MethodId};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConditionalsFolded)
//!     .at(MethodId::new(0), 3)
//!     .message("if (a || b)");
//! log.record(EventKind::StatementErased).at(MethodId::new(0), 4);
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.count_kind(EventKind::StatementErased), 1);
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
    time::Duration,
};

use crate::compiler::context::MethodId;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Two consecutive conditionals were folded into one.
    ConditionalsFolded,
    /// A single-use stack value was inlined into its use.
    ValueInlined,
    /// An allocation and its initializer call were fused.
    ConstructionCondensed,
    /// A stack value was allocated or initialized more than once.
    ConstructionAmbiguous,
    /// A statement was erased.
    StatementErased,

    /// A pass started.
    PassStarted,
    /// A pass completed.
    PassCompleted,
    /// A method was abandoned and fell back to its untouched body.
    MethodFailed,
    /// Something unexpected but recoverable, such as hitting the iteration limit.
    Warning,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConditionalsFolded => "conditionals folded",
            Self::ValueInlined => "values inlined",
            Self::ConstructionCondensed => "constructions condensed",
            Self::ConstructionAmbiguous => "ambiguous constructions",
            Self::StatementErased => "statements erased",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::MethodFailed => "method failed",
            Self::Warning => "warning",
        }
    }

    /// Returns true if this event represents a change to a method body.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::ConditionalsFolded
                | Self::ValueInlined
                | Self::ConstructionCondensed
                | Self::StatementErased
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The method where the event occurred (if applicable).
    pub method: Option<MethodId>,
    /// Container index within the method.
    pub location: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<&'static str>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the
/// builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    method: Option<MethodId>,
    location: Option<usize>,
    message: Option<String>,
    pass: Option<&'static str>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            method: None,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the method and container index where the event occurred.
    pub fn at(mut self, method: MethodId, location: usize) -> Self {
        self.method = Some(method);
        self.location = Some(location);
        self
    }

    /// Sets only the method.
    pub fn method(mut self, method: MethodId) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets only the location.
    pub fn location(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: &'static str) -> Self {
        self.pass = Some(pass_name);
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            method: self.method.take(),
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Collection of events from a condensation run.
///
/// This type is thread-safe: events can be appended concurrently from
/// multiple threads using shared references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events for a specific method.
    pub fn filter_method(&self, method: MethodId) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.method == Some(method))
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of distinct methods with transformation events.
    #[must_use]
    pub fn methods_affected(&self) -> usize {
        self.iter()
            .filter(|e| e.kind.is_transformation())
            .filter_map(|e| e.method)
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Statistics derived from an [`EventLog`].
#[derive(Debug, Clone, Default)]
pub struct DerivedStats {
    /// Number of methods that had any transformations.
    pub methods_transformed: usize,
    /// Number of conditional folds.
    pub conditionals_folded: usize,
    /// Number of inlined stack values.
    pub values_inlined: usize,
    /// Number of fused constructions.
    pub constructions_condensed: usize,
    /// Number of stack values skipped as ambiguous.
    pub constructions_ambiguous: usize,
    /// Number of methods that fell back to their untouched body.
    pub methods_failed: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of pass iterations.
    pub iterations: usize,
    /// Processing time.
    pub total_time: Duration,
}

impl DerivedStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            methods_transformed: log.methods_affected(),
            conditionals_folded: get(EventKind::ConditionalsFolded),
            values_inlined: get(EventKind::ValueInlined),
            constructions_condensed: get(EventKind::ConstructionCondensed),
            constructions_ambiguous: get(EventKind::ConstructionAmbiguous),
            methods_failed: get(EventKind::MethodFailed),
            warnings: get(EventKind::Warning),
            iterations: 0,
            total_time: Duration::ZERO,
        }
    }

    /// Sets the total processing time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Sets the number of iterations.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.methods_transformed > 0 {
            parts.push(format!("{} methods", self.methods_transformed));
        }
        if self.conditionals_folded > 0 {
            parts.push(format!("{} conditionals folded", self.conditionals_folded));
        }
        if self.values_inlined > 0 {
            parts.push(format!("{} values inlined", self.values_inlined));
        }
        if self.constructions_condensed > 0 {
            parts.push(format!(
                "{} constructions condensed",
                self.constructions_condensed
            ));
        }
        if self.methods_failed > 0 {
            parts.push(format!("{} failed", self.methods_failed));
        }
        if self.warnings > 0 {
            parts.push(format!("{} warnings", self.warnings));
        }

        let stats = if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        };

        if self.total_time.as_millis() > 0 {
            format!(
                "{} in {:?} ({} iterations)",
                stats, self.total_time, self.iterations
            )
        } else {
            stats
        }
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert!(!log.has(EventKind::ValueInlined));
        assert_eq!(DerivedStats::from_log(&log).to_string(), "no transformations");
    }

    #[test]
    fn test_record_event() {
        let log = EventLog::new();
        let method = MethodId::new(4);

        log.record(EventKind::ValueInlined)
            .at(method, 2)
            .pass("inlining")
            .message("v0 -> 1 + x");

        let event = log.iter().next().unwrap();
        assert_eq!(event.method, Some(method));
        assert_eq!(event.location, Some(2));
        assert_eq!(event.pass, Some("inlining"));
        assert_eq!(event.message, "v0 -> 1 + x");
    }

    #[test]
    fn test_default_message() {
        let log = EventLog::new();
        log.record(EventKind::StatementErased).location(1);
        assert_eq!(log.iter().next().unwrap().message, "statements erased");
    }

    #[test]
    fn test_derived_stats() {
        let log = EventLog::new();
        log.record(EventKind::ConditionalsFolded).at(MethodId::new(0), 1);
        log.record(EventKind::ConditionalsFolded).at(MethodId::new(1), 1);
        log.record(EventKind::ValueInlined).at(MethodId::new(0), 3);
        log.record(EventKind::MethodFailed).method(MethodId::new(2));
        log.record(EventKind::Warning).method(MethodId::new(1));

        let stats = DerivedStats::from_log(&log);
        assert_eq!(stats.methods_transformed, 2);
        assert_eq!(stats.conditionals_folded, 2);
        assert_eq!(stats.values_inlined, 1);
        assert_eq!(stats.methods_failed, 1);
        assert_eq!(stats.warnings, 1);
        assert_eq!(
            stats.summary(),
            "2 methods, 2 conditionals folded, 1 values inlined, 1 failed, 1 warnings"
        );

        let timed = stats
            .with_iterations(6)
            .with_time(Duration::from_millis(12));
        assert_eq!(
            timed.summary(),
            "2 methods, 2 conditionals folded, 1 values inlined, 1 failed, 1 warnings in 12ms (6 iterations)"
        );
    }

    #[test]
    fn test_filter_method() {
        let log = EventLog::new();
        log.record(EventKind::ValueInlined).at(MethodId::new(0), 0);
        log.record(EventKind::ValueInlined).at(MethodId::new(1), 0);
        log.record(EventKind::PassCompleted).method(MethodId::new(1));

        assert_eq!(log.filter_method(MethodId::new(1)).count(), 2);
        assert_eq!(log.methods_affected(), 2);
        assert_eq!(log.count_by_kind().get(&EventKind::ValueInlined), Some(&2));
    }

    #[test]
    fn test_thread_safe_append() {
        use std::{sync::Arc, thread};

        let log = Arc::new(EventLog::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for j in 0..50 {
                        log.record(EventKind::ValueInlined).at(MethodId::new(i), j);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 200);
    }
}

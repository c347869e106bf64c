//! Match metrics collection for profiling and diagnostics.
//!
//! When the `tracing` feature is enabled the counters are live atomics.
//! When disabled, only progress rejections are counted; every other
//! `record_*` call is a no-op and reports zero.
//!
//! # Usage
//!
//! ```rust,ignore
//! use occmatch::metrics::MatchMetrics;
//!
//! let metrics = MatchMetrics::new();
//! // ... run matches ...
//! let report = metrics.report();
//! println!("FO successes: {}", report.fo_successes);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters of the matching engine.
///
/// Counters use relaxed ordering; a report taken after a match returns is exact.
#[cfg(feature = "tracing")]
pub struct MatchMetrics {
    /// Subterms that passed the keyed head filter
    pub candidates: AtomicU64,
    /// First-order unification attempts
    pub fo_attempts: AtomicU64,
    /// First-order attempts that survived finishing
    pub fo_successes: AtomicU64,
    /// Higher-order unification attempts
    pub ho_attempts: AtomicU64,
    /// Higher-order attempts that survived finishing
    pub ho_successes: AtomicU64,
    /// Rounds of the unification finisher
    pub finisher_rounds: AtomicU64,
    /// Matches rejected by the progress predicate
    pub progress_rejections: AtomicU64,
    /// Occurrences counted during selection
    pub occurrences_counted: AtomicU64,
    /// Occurrences replaced by the abstraction variable
    pub occurrences_abstracted: AtomicU64,
}

#[cfg(feature = "tracing")]
impl MatchMetrics {
    pub fn new() -> Self {
        Self {
            candidates: AtomicU64::new(0),
            fo_attempts: AtomicU64::new(0),
            fo_successes: AtomicU64::new(0),
            ho_attempts: AtomicU64::new(0),
            ho_successes: AtomicU64::new(0),
            finisher_rounds: AtomicU64::new(0),
            progress_rejections: AtomicU64::new(0),
            occurrences_counted: AtomicU64::new(0),
            occurrences_abstracted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_candidate(&self) {
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unification attempt of the given pass.
    #[inline]
    pub fn record_attempt(&self, higher_order: bool) {
        if higher_order {
            self.ho_attempts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fo_attempts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an attempt that unified and finished.
    #[inline]
    pub fn record_success(&self, higher_order: bool) {
        if higher_order {
            self.ho_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fo_successes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_finisher_round(&self) {
        self.finisher_rounds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_progress_rejection(&self) {
        self.progress_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_occurrence(&self, abstracted: bool) {
        self.occurrences_counted.fetch_add(1, Ordering::Relaxed);
        if abstracted {
            self.occurrences_abstracted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of all counters.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            candidates: self.candidates.load(Ordering::Relaxed),
            fo_attempts: self.fo_attempts.load(Ordering::Relaxed),
            fo_successes: self.fo_successes.load(Ordering::Relaxed),
            ho_attempts: self.ho_attempts.load(Ordering::Relaxed),
            ho_successes: self.ho_successes.load(Ordering::Relaxed),
            finisher_rounds: self.finisher_rounds.load(Ordering::Relaxed),
            progress_rejections: self.progress_rejections.load(Ordering::Relaxed),
            occurrences_counted: self.occurrences_counted.load(Ordering::Relaxed),
            occurrences_abstracted: self.occurrences_abstracted.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.candidates.store(0, Ordering::Relaxed);
        self.fo_attempts.store(0, Ordering::Relaxed);
        self.fo_successes.store(0, Ordering::Relaxed);
        self.ho_attempts.store(0, Ordering::Relaxed);
        self.ho_successes.store(0, Ordering::Relaxed);
        self.finisher_rounds.store(0, Ordering::Relaxed);
        self.progress_rejections.store(0, Ordering::Relaxed);
        self.occurrences_counted.store(0, Ordering::Relaxed);
        self.occurrences_abstracted.store(0, Ordering::Relaxed);
    }
}

#[cfg(feature = "tracing")]
impl Default for MatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsReport {
    pub candidates: u64,
    pub fo_attempts: u64,
    pub fo_successes: u64,
    pub ho_attempts: u64,
    pub ho_successes: u64,
    pub finisher_rounds: u64,
    pub progress_rejections: u64,
    pub occurrences_counted: u64,
    pub occurrences_abstracted: u64,
}

impl MetricsReport {
    /// Fraction of first-order attempts that succeeded.
    pub fn fo_success_rate(&self) -> f64 {
        if self.fo_attempts == 0 {
            1.0
        } else {
            self.fo_successes as f64 / self.fo_attempts as f64
        }
    }

    /// Did the last failure come from the progress predicate rather than a
    /// plain mismatch? Callers use this to word a "no progress" message.
    pub fn rejected_for_progress(&self) -> bool {
        self.progress_rejections > 0
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Match Metrics ===")?;
        writeln!(f, "Candidates:         {}", self.candidates)?;
        writeln!(
            f,
            "FO attempts:        {} ({} succeeded, {:.1}%)",
            self.fo_attempts,
            self.fo_successes,
            self.fo_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "HO attempts:        {} ({} succeeded)",
            self.ho_attempts, self.ho_successes
        )?;
        writeln!(f, "Finisher rounds:    {}", self.finisher_rounds)?;
        writeln!(f, "Progress rejected:  {}", self.progress_rejections)?;
        writeln!(
            f,
            "Occurrences:        {} counted, {} abstracted",
            self.occurrences_counted, self.occurrences_abstracted
        )?;
        Ok(())
    }
}

// Without tracing only progress rejections are counted.
#[cfg(not(feature = "tracing"))]
pub struct MatchMetrics {
    progress_rejections: AtomicU64,
}

#[cfg(not(feature = "tracing"))]
impl MatchMetrics {
    #[inline]
    pub fn new() -> Self {
        MatchMetrics {
            progress_rejections: AtomicU64::new(0),
        }
    }
    #[inline]
    pub fn record_candidate(&self) {}
    #[inline]
    pub fn record_attempt(&self, _higher_order: bool) {}
    #[inline]
    pub fn record_success(&self, _higher_order: bool) {}
    #[inline]
    pub fn record_finisher_round(&self) {}
    #[inline]
    pub fn record_progress_rejection(&self) {
        self.progress_rejections.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn record_occurrence(&self, _abstracted: bool) {}
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            progress_rejections: self.progress_rejections.load(Ordering::Relaxed),
            ..MetricsReport::default()
        }
    }
    pub fn reset(&self) {
        self.progress_rejections.store(0, Ordering::Relaxed);
    }
}

#[cfg(not(feature = "tracing"))]
impl Default for MatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

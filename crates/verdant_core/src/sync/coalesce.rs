//! Elapsed-time coalescing for single-in-flight step requests.

use tracing::trace;

/// Accumulates frame time while a simulation step is outstanding.
///
/// Time keeps accruing every frame. When no request is in flight the whole
/// accumulated amount (capped at `max_step`) is handed out as one request
/// and the in-flight flag is raised until [`StepCoalescer::complete`].
///
/// # Example
///
/// ```rust
/// use verdant_core::StepCoalescer;
///
/// let mut steps = StepCoalescer::new(0.25);
/// steps.accumulate(0.016);
/// assert_eq!(steps.try_begin(), Some(0.016));
///
/// // In flight: further frames only accumulate.
/// steps.accumulate(0.016);
/// steps.accumulate(0.016);
/// assert_eq!(steps.try_begin(), None);
///
/// steps.complete();
/// assert_eq!(steps.try_begin(), Some(0.032));
/// ```
#[derive(Debug, Clone)]
pub struct StepCoalescer {
    /// Seconds accumulated since the last request was sent.
    pending: f32,
    /// Upper bound for a single request.
    max_step: f32,
    /// Whether a request is outstanding.
    in_flight: bool,
    /// Seconds dropped by the cap since construction.
    discarded: f64,
    /// Requests handed out since construction.
    issued: u64,
}

impl StepCoalescer {
    /// Creates a coalescer whose requests never exceed `max_step` seconds.
    ///
    /// Non-finite or negative caps are treated as zero.
    #[must_use]
    pub fn new(max_step: f32) -> Self {
        let max_step = if max_step.is_finite() { max_step.max(0.0) } else { 0.0 };
        Self {
            pending: 0.0,
            max_step,
            in_flight: false,
            discarded: 0.0,
            issued: 0,
        }
    }

    /// Adds one frame's elapsed time.
    ///
    /// Negative and non-finite values are ignored. The pending total is
    /// clamped to the cap; the excess is recorded in [`Self::discarded`].
    pub fn accumulate(&mut self, elapsed: f32) {
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return;
        }
        let total = self.pending + elapsed;
        if total > self.max_step {
            let excess = total - self.max_step;
            trace!(excess, "Step coalescer capped pending time");
            self.discarded += f64::from(excess);
            self.pending = self.max_step;
        } else {
            self.pending = total;
        }
    }

    /// Starts a request if none is in flight.
    ///
    /// Returns the elapsed time to send and resets the pending total.
    /// Returns `None` while a previous request is outstanding.
    pub fn try_begin(&mut self) -> Option<f32> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        self.issued += 1;
        Some(std::mem::take(&mut self.pending))
    }

    /// Marks the outstanding request as answered.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    /// Whether a request is outstanding.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Seconds waiting for the next request.
    #[inline]
    #[must_use]
    pub const fn pending(&self) -> f32 {
        self.pending
    }

    /// Cap applied to each request.
    #[inline]
    #[must_use]
    pub const fn max_step(&self) -> f32 {
        self.max_step
    }

    /// Seconds dropped by the cap.
    #[inline]
    #[must_use]
    pub const fn discarded(&self) -> f64 {
        self.discarded
    }

    /// Number of requests started.
    #[inline]
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}

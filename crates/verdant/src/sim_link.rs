//! # Simulation Link
//!
//! Request/response channel to a simulation running on its own thread.
//!
//! ```text
//! render thread                          worker thread
//! ─────────────                          ─────────────
//! poll(dt) ── accumulate ──┐
//!                          ├─ try_begin ─► SimRequest ──► Simulation::step
//!          ◄── Snapshot ───┴──────────── SimResponse ◄──┘
//! ```
//!
//! At most one request is outstanding. Frames that pass while the worker is
//! busy only add to the pending time, which goes out (capped) with the next
//! request. `poll` never blocks.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use verdant_core::StepCoalescer;
use verdant_shared::{SimRequest, SimResponse, Snapshot};

use crate::error::{VerdantError, VerdantResult};

/// Something that advances the world and reports it.
pub trait Simulation: Send + 'static {
    /// Advances by `elapsed` seconds and returns the resulting state.
    fn step(&mut self, elapsed: f32) -> Snapshot;
}

/// Counters shared between the render thread and the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkStats {
    /// Requests sent to the worker.
    pub requests: u64,
    /// Steps completed by the worker.
    pub steps: u64,
    /// Responses received by the render thread.
    pub responses: u64,
    /// Simulated seconds requested in total.
    pub simulated_seconds: f64,
    /// Wall time of the last step, in microseconds.
    pub last_step_us: u64,
    /// Slowest step so far, in microseconds.
    pub max_step_us: u64,
}

/// Render-side end of the simulation worker.
pub struct SimulationLink {
    /// `None` once shut down; dropping it stops the worker.
    requests: Option<Sender<SimRequest>>,
    responses: Receiver<SimResponse>,
    worker: Option<JoinHandle<()>>,
    coalescer: StepCoalescer,
    /// Sequence number of the outstanding request.
    expected: u64,
    next_sequence: u64,
    connected: bool,
    stats: Arc<Mutex<LinkStats>>,
}

impl SimulationLink {
    /// Starts `simulation` on a worker thread.
    ///
    /// Each request carries at most `max_step` seconds.
    ///
    /// # Errors
    ///
    /// [`VerdantError::Spawn`] if the thread cannot be created.
    pub fn spawn<S: Simulation>(simulation: S, max_step: f32) -> VerdantResult<Self> {
        let (request_tx, request_rx) = bounded::<SimRequest>(1);
        let (response_tx, response_rx) = bounded::<SimResponse>(1);
        let stats = Arc::new(Mutex::new(LinkStats::default()));

        let worker_stats = Arc::clone(&stats);
        let worker = std::thread::Builder::new()
            .name("verdant-sim".into())
            .spawn(move || run_worker(simulation, &request_rx, &response_tx, &worker_stats))
            .map_err(VerdantError::Spawn)?;

        debug!(max_step, "Simulation link started");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            coalescer: StepCoalescer::new(max_step),
            expected: 0,
            next_sequence: 1,
            connected: true,
            stats,
        })
    }

    /// Adds one frame's elapsed time, collects a finished step if there is
    /// one and sends the next request if none is outstanding.
    ///
    /// Returns the new snapshot, if one arrived this frame.
    pub fn poll(&mut self, elapsed: f32) -> Option<Snapshot> {
        self.coalescer.accumulate(elapsed);
        let snapshot = match self.responses.try_recv() {
            Ok(response) => self.accept(response),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.disconnect();
                None
            }
        };
        self.send_next();
        snapshot
    }

    /// Lockstep variant of [`Self::poll`]: sends the pending time and waits
    /// up to `timeout` for the answer. No follow-up request is sent, so
    /// each call simulates exactly the time accumulated so far.
    pub fn poll_blocking(&mut self, elapsed: f32, timeout: Duration) -> Option<Snapshot> {
        self.coalescer.accumulate(elapsed);
        self.send_next();
        match self.responses.recv_timeout(timeout) {
            Ok(response) => self.accept(response),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.disconnect();
                None
            }
        }
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.coalescer.is_in_flight()
    }

    /// Whether the worker is still reachable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Time coalescing state.
    #[must_use]
    pub const fn coalescer(&self) -> &StepCoalescer {
        &self.coalescer
    }

    /// Copy of the shared counters.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        *self.stats.lock()
    }

    /// Closes the request channel and waits for the worker to finish its
    /// current step.
    pub fn shutdown(&mut self) {
        if self.requests.take().is_none() {
            return;
        }
        self.connected = false;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Simulation worker panicked");
            }
        }
        debug!(stats = ?self.stats(), "Simulation link shut down");
    }

    /// Any response ends the single outstanding request. One that answers
    /// a different sequence is dropped, and the next poll sends again.
    fn accept(&mut self, response: SimResponse) -> Option<Snapshot> {
        self.coalescer.complete();
        if response.sequence != self.expected {
            warn!(got = response.sequence, expected = self.expected, "Dropping stale response");
            return None;
        }
        self.stats.lock().responses += 1;
        Some(response.snapshot)
    }

    fn send_next(&mut self) {
        if !self.connected {
            return;
        }
        let Some(requests) = &self.requests else {
            return;
        };
        let Some(elapsed) = self.coalescer.try_begin() else {
            return;
        };
        let request = SimRequest { sequence: self.next_sequence, elapsed };
        if requests.send(request).is_err() {
            self.disconnect();
            return;
        }
        self.expected = request.sequence;
        self.next_sequence += 1;
        let mut stats = self.stats.lock();
        stats.requests += 1;
        stats.simulated_seconds += f64::from(elapsed);
    }

    fn disconnect(&mut self) {
        if self.connected {
            warn!("Simulation worker disconnected; keeping last snapshot");
            self.connected = false;
        }
    }
}

impl Drop for SimulationLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SimulationLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationLink")
            .field("connected", &self.connected)
            .field("in_flight", &self.coalescer.is_in_flight())
            .field("pending", &self.coalescer.pending())
            .finish_non_exhaustive()
    }
}

fn run_worker<S: Simulation>(
    mut simulation: S,
    requests: &Receiver<SimRequest>,
    responses: &Sender<SimResponse>,
    stats: &Mutex<LinkStats>,
) {
    for request in requests {
        let start = Instant::now();
        let snapshot = simulation.step(request.elapsed);
        let took = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        {
            let mut stats = stats.lock();
            stats.steps += 1;
            stats.last_step_us = took;
            stats.max_step_us = stats.max_step_us.max(took);
        }
        trace!(sequence = request.sequence, elapsed = request.elapsed, took_us = took, "Simulation step");
        let response = SimResponse { sequence: request.sequence, snapshot };
        if responses.send(response).is_err() {
            break;
        }
    }
    debug!("Simulation worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        tick: u64,
    }

    impl Simulation for Counter {
        fn step(&mut self, _elapsed: f32) -> Snapshot {
            self.tick += 1;
            Snapshot { tick: self.tick, ..Snapshot::default() }
        }
    }

    #[test]
    fn test_first_poll_sends_request() {
        let mut link = SimulationLink::spawn(Counter { tick: 0 }, 0.25).unwrap();
        assert!(!link.is_in_flight());
        let _ = link.poll(0.016);
        assert!(link.is_in_flight());
        assert_eq!(link.stats().requests, 1);
    }

    #[test]
    fn test_blocking_poll_returns_steps_in_order() {
        let mut link = SimulationLink::spawn(Counter { tick: 0 }, 0.25).unwrap();
        let mut ticks = Vec::new();
        for _ in 0..5 {
            if let Some(snapshot) = link.poll_blocking(0.016, Duration::from_secs(5)) {
                ticks.push(snapshot.tick);
            }
        }
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_stale_response_ends_request() {
        let mut link = SimulationLink::spawn(Counter { tick: 0 }, 0.25).unwrap();
        let _ = link.poll(0.016);
        assert!(link.is_in_flight());

        let stale = SimResponse { sequence: 7, snapshot: Snapshot::default() };
        assert!(link.accept(stale).is_none());
        assert!(!link.is_in_flight(), "stale response left the link waiting");
        assert_eq!(link.stats().responses, 0);

        let _ = link.poll(0.016);
        assert!(link.is_in_flight());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut link = SimulationLink::spawn(Counter { tick: 0 }, 0.25).unwrap();
        link.shutdown();
        link.shutdown();
        assert!(!link.is_connected());
        assert!(link.poll(0.016).is_none());
    }
}

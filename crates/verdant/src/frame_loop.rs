//! # VERDANT Frame Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. POLL SIMULATION LINK                                             │
//! │    ├─ Add frame time to the pending step                            │
//! │    ├─ Collect a finished snapshot, if any                           │
//! │    └─ Send the next request if none is in flight                    │
//! │                                                                     │
//! │ 2. RENDER UPDATE                                                    │
//! │    ├─ Snapshot arrived: removal, classification, reconciliation     │
//! │    └─ No snapshot: re-classify last known records, hide or restore  │
//! │                                                                     │
//! │ 3. FLUSH (inside the orchestrator)                                  │
//! │    └─ Each dirty instance buffer uploaded once                      │
//! │                                                                     │
//! │ 4. ANIMATE                                                          │
//! │    └─ Advance detailed renderer timers                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use tracing::warn;
use verdant_rendering::{
    Camera, DetailFactory, FrameReport, InstanceUploader, ProceduralFactory, Ray, RenderConfig,
    Selection, UpdateOrchestrator,
};

use crate::error::VerdantResult;
use crate::sim_link::{Simulation, SimulationLink};

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Maximum allowed frame time before warning.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(33);

/// Timing of one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameTiming {
    /// Whole frame, in microseconds.
    pub total_us: u64,
    /// Render update (orchestrator), in microseconds.
    pub render_us: u64,
    /// Whether a snapshot was applied.
    pub applied_snapshot: bool,
}

/// Accumulator for frame timings.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Frames that applied a snapshot.
    pub snapshot_frames: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of render update times.
    pub render_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            snapshot_frames: 0,
            total_us_sum: 0,
            render_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records one frame.
    pub fn record(&mut self, timing: FrameTiming) {
        self.frames_recorded += 1;
        self.snapshot_frames += u64::from(timing.applied_snapshot);
        self.total_us_sum += timing.total_us;
        self.render_us_sum += timing.render_us;
        self.min_frame_us = self.min_frame_us.min(timing.total_us);
        self.max_frame_us = self.max_frame_us.max(timing.total_us);
        if u128::from(timing.total_us) > TARGET_FRAME_TIME.as_micros() {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Average render update time in milliseconds.
    #[must_use]
    pub fn avg_render_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.render_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the renderer from a simulation link, one call per frame.
pub struct FrameLoop<U: InstanceUploader, F: DetailFactory = ProceduralFactory> {
    orchestrator: UpdateOrchestrator<F>,
    link: SimulationLink,
    uploader: U,
    camera: Camera,
    stats: FrameStatsAccumulator,
}

impl<U: InstanceUploader> FrameLoop<U> {
    /// Validates `config`, starts `simulation` on its worker and builds the
    /// renderer with the procedural detail factory.
    ///
    /// # Errors
    ///
    /// Invalid configuration or a worker that fails to start.
    pub fn new<S: Simulation>(
        config: RenderConfig,
        simulation: S,
        uploader: U,
        camera: Camera,
    ) -> VerdantResult<Self> {
        let max_step = config.simulation.max_step;
        let orchestrator = UpdateOrchestrator::new(config)?;
        let link = SimulationLink::spawn(simulation, max_step)?;
        Ok(Self::from_parts(orchestrator, link, uploader, camera))
    }
}

impl<U: InstanceUploader, F: DetailFactory> FrameLoop<U, F> {
    /// Assembles a loop from already built parts.
    #[must_use]
    pub fn from_parts(
        orchestrator: UpdateOrchestrator<F>,
        link: SimulationLink,
        uploader: U,
        camera: Camera,
    ) -> Self {
        Self {
            orchestrator,
            link,
            uploader,
            camera,
            stats: FrameStatsAccumulator::new(),
        }
    }

    /// Runs one frame with `dt` seconds of elapsed time. Never blocks.
    pub fn frame(&mut self, dt: f32) -> FrameReport {
        let snapshot = self.link.poll(dt);
        self.render(snapshot, dt)
    }

    /// Runs one frame in lockstep with the simulation, waiting up to
    /// `timeout` for the step.
    pub fn frame_lockstep(&mut self, dt: f32, timeout: Duration) -> FrameReport {
        let snapshot = self.link.poll_blocking(dt, timeout);
        self.render(snapshot, dt)
    }

    /// Moves the camera. Takes effect next frame.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Current camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Resolves a pick ray against the last rendered frame.
    #[must_use]
    pub fn pick(&self, ray: &Ray) -> Option<Selection> {
        self.orchestrator.pick(ray)
    }

    /// The renderer.
    #[must_use]
    pub const fn orchestrator(&self) -> &UpdateOrchestrator<F> {
        &self.orchestrator
    }

    /// The simulation link.
    #[must_use]
    pub const fn link(&self) -> &SimulationLink {
        &self.link
    }

    /// The upload sink.
    #[must_use]
    pub const fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Mutable upload sink.
    pub fn uploader_mut(&mut self) -> &mut U {
        &mut self.uploader
    }

    /// Frame timings so far.
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// Stops the simulation worker.
    pub fn shutdown(&mut self) {
        self.link.shutdown();
    }

    fn render(&mut self, snapshot: Option<verdant_shared::Snapshot>, dt: f32) -> FrameReport {
        let start = Instant::now();
        let applied_snapshot = snapshot.is_some();
        let report = match snapshot {
            Some(snapshot) => self.orchestrator.apply_snapshot(snapshot, &self.camera, &mut self.uploader),
            None => self.orchestrator.refresh(&self.camera, &mut self.uploader),
        };
        let render_us = micros(start.elapsed());
        self.orchestrator.tick(dt);
        let total = start.elapsed();

        if total > MAX_FRAME_TIME {
            warn!(
                frame = report.frame,
                total_ms = total.as_secs_f64() * 1000.0,
                "Frame exceeded budget"
            );
        }
        self.stats.record(FrameTiming {
            total_us: micros(total),
            render_us,
            applied_snapshot,
        });
        report
    }
}

impl<U: InstanceUploader, F: DetailFactory> std::fmt::Debug for FrameLoop<U, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("orchestrator", &self.orchestrator)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

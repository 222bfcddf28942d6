//! # Frame Loop Tests
//!
//! The renderer fed by a real simulation worker: lockstep runs, elapsed
//! time coalescing while a step is outstanding, and worker shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use verdant::rendering::{Camera, RecordingUploader, RenderConfig};
use verdant::shared::{Snapshot, Vec3};
use verdant::{DemoConfig, FrameLoop, Simulation, SimulationLink, WanderSimulation};

fn overview_camera() -> Camera {
    Camera::looking_at(Vec3::new(0.0, 60.0, 120.0), Vec3::ZERO, 16.0 / 9.0, 0.1, 1000.0)
}

/// Records the elapsed time of every step and takes `delay` per step.
struct SlowSimulation {
    delay: Duration,
    seen: Arc<Mutex<Vec<f32>>>,
    dropped: Arc<AtomicBool>,
}

impl SlowSimulation {
    fn new(delay: Duration) -> (Self, Arc<Mutex<Vec<f32>>>, Arc<AtomicBool>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dropped = Arc::new(AtomicBool::new(false));
        let sim = Self { delay, seen: Arc::clone(&seen), dropped: Arc::clone(&dropped) };
        (sim, seen, dropped)
    }
}

impl Simulation for SlowSimulation {
    fn step(&mut self, elapsed: f32) -> Snapshot {
        std::thread::sleep(self.delay);
        let mut seen = self.seen.lock();
        seen.push(elapsed);
        Snapshot { tick: seen.len() as u64, ..Snapshot::default() }
    }
}

impl Drop for SlowSimulation {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Test: In lockstep every frame applies a fresh snapshot and the renderer
/// stays consistent.
#[test]
fn test_lockstep_demo_run() {
    let demo = DemoConfig { creatures: 300, plants: 300, world_radius: 150.0, ..DemoConfig::default() };
    let mut config = RenderConfig::default();
    config.detail.max_detailed = 25;

    let mut frame_loop = FrameLoop::new(
        config,
        WanderSimulation::new(demo),
        RecordingUploader::new(),
        overview_camera(),
    )
    .unwrap();

    for n in 1..=30u64 {
        let report = frame_loop.frame_lockstep(1.0 / 60.0, Duration::from_secs(5));
        assert_eq!(report.tick, Some(n), "frame {n} should carry step {n}");
        assert!(report.tiers.detailed <= 25);
        assert!(frame_loop.orchestrator().audit().is_empty());
    }

    let stats = frame_loop.orchestrator().stats();
    println!("Renderer stats: {stats:?}");
    assert_eq!(stats.snapshots, 30);
    assert!(stats.peak_detailed > 0, "camera should see some creatures up close");
    assert_eq!(frame_loop.stats().snapshot_frames, 30);
}

/// Test: Frames that pass while a step is running are folded into one
/// capped request.
#[test]
fn test_busy_worker_coalesces_elapsed_time() {
    let (sim, seen, _) = SlowSimulation::new(Duration::from_millis(100));
    let mut link = SimulationLink::spawn(sim, 0.25).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut responses = 0;
    while responses < 2 && Instant::now() < deadline {
        if link.poll(0.05).is_some() {
            responses += 1;
        }
        let stats = link.stats();
        assert!(stats.requests - stats.responses <= 1, "more than one request in flight");
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(responses, 2);

    let seen = seen.lock().clone();
    println!("Requested steps: {seen:?}");
    assert!((seen[0] - 0.05).abs() < 1e-6, "first request carries one frame");
    assert!((seen[1] - 0.25).abs() < 1e-6, "second request is capped");
    assert!(link.coalescer().discarded() > 0.0);
}

/// Test: Without a snapshot the frame still runs from the last known records.
#[test]
fn test_frames_continue_while_waiting() {
    let (sim, _, _) = SlowSimulation::new(Duration::from_millis(200));
    let mut frame_loop = FrameLoop::new(
        RenderConfig::default(),
        sim,
        RecordingUploader::new(),
        overview_camera(),
    )
    .unwrap();

    let report = frame_loop.frame(1.0 / 60.0);
    assert_eq!(report.tick, None);
    assert_eq!(report.frame, 1);
    assert!(frame_loop.link().is_in_flight());

    let report = frame_loop.frame(1.0 / 60.0);
    assert_eq!(report.frame, 2);
    assert_eq!(frame_loop.stats().frames_recorded, 2);
}

/// Test: Dropping the link stops the worker and drops the simulation.
#[test]
fn test_drop_joins_worker() {
    let (sim, _, dropped) = SlowSimulation::new(Duration::from_millis(20));
    let mut link = SimulationLink::spawn(sim, 0.25).unwrap();
    let _ = link.poll(0.1);
    drop(link);
    assert!(dropped.load(Ordering::SeqCst), "simulation outlived its link");
}

//! # VERDANT Headless
//!
//! Runs the demo simulation through the full renderer pipeline without a
//! window or GPU. Instance uploads are recorded and counted instead of
//! written to device buffers.
//!
//! ```text
//! verdant_headless [--config FILE] [--frames N] [--lockstep]
//! ```
//!
//! Set `RUST_LOG=verdant_rendering=debug` for per-frame reports.

use std::time::{Duration, Instant};

use tracing::{error, info};
use verdant::rendering::{Camera, RecordingUploader};
use verdant::shared::Vec3;
use verdant::{AppConfig, FrameLoop, WanderSimulation, TARGET_FRAME_TIME};

/// Seconds of simulated time per frame.
const FRAME_DT: f32 = 1.0 / 60.0;

/// How long a lockstep frame waits for the simulation.
const LOCKSTEP_TIMEOUT: Duration = Duration::from_secs(2);

struct Args {
    config: Option<String>,
    frames: u64,
    lockstep: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args { config: None, frames: 600, lockstep: false };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(iter.next().ok_or("--config needs a path")?),
            "--frames" => {
                let value = iter.next().ok_or("--frames needs a number")?;
                args.frames = value.parse().map_err(|_| format!("bad frame count: {value}"))?;
            }
            "--lockstep" => args.lockstep = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

/// Camera circling the origin once every 20 seconds.
fn orbit_camera(time: f32) -> Camera {
    let angle = time * std::f32::consts::TAU / 20.0;
    let eye = Vec3::new(angle.cos() * 150.0, 40.0, angle.sin() * 150.0);
    Camera::looking_at(eye, Vec3::ZERO, 16.0 / 9.0, 0.1, 1000.0)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            error!("{message}");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    VERDANT HEADLESS v0.1.0");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();
    println!("  Creatures:     {}", config.demo.creatures);
    println!("  Plants:        {}", config.demo.plants);
    println!("  Max detailed:  {}", config.render.detail.max_detailed);
    println!("  Frames:        {} ({})", args.frames, if args.lockstep { "lockstep" } else { "real time" });
    println!();

    let simulation = WanderSimulation::new(config.demo.clone());
    let mut frame_loop = match FrameLoop::new(config.render, simulation, RecordingUploader::new(), orbit_camera(0.0)) {
        Ok(frame_loop) => frame_loop,
        Err(err) => {
            error!(error = %err, "Failed to start renderer");
            std::process::exit(1);
        }
    };

    let mut uploaded_bytes = 0u64;
    let mut uploads = 0u64;
    let started = Instant::now();

    for frame in 0..args.frames {
        let frame_start = Instant::now();
        frame_loop.set_camera(orbit_camera(frame as f32 * FRAME_DT));

        let report = if args.lockstep {
            frame_loop.frame_lockstep(FRAME_DT, LOCKSTEP_TIMEOUT)
        } else {
            frame_loop.frame(FRAME_DT)
        };

        let uploader = frame_loop.uploader_mut();
        uploaded_bytes += uploader.total_bytes();
        uploads += uploader.records().len() as u64;
        uploader.clear();

        if report.frame % 120 == 0 {
            info!(
                frame = report.frame,
                detailed = report.tiers.detailed,
                proxy = report.tiers.proxy,
                culled = report.tiers.culled,
                "Progress"
            );
        }

        if !args.lockstep {
            if let Some(rest) = TARGET_FRAME_TIME.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    frame_loop.shutdown();
    let wall = started.elapsed();
    let timing = frame_loop.stats();
    let render = frame_loop.orchestrator().stats();
    let link = frame_loop.link().stats();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                      HEADLESS RUN SUMMARY                        ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ TIMING ───────────────────────────────────────────────────────┐");
    println!("│ Wall time:          {:.2} s", wall.as_secs_f64());
    println!("│ Frames:             {}", timing.frames_recorded);
    println!("│ Average frame:      {:.3} ms", timing.avg_frame_ms());
    println!("│ Average render:     {:.3} ms", timing.avg_render_ms());
    println!("│ Over budget:        {:.1}%", timing.over_budget_ratio() * 100.0);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ RENDERER ─────────────────────────────────────────────────────┐");
    println!("│ Snapshots applied:  {}", render.snapshots);
    println!("│ Peak detailed:      {}", render.peak_detailed);
    println!("│ Promotions:         {}", render.promotions);
    println!("│ Demotions:          {}", render.demotions);
    println!("│ Proxy overflows:    {}", render.proxy_overflows);
    println!("│ Uploads:            {uploads} ({:.2} per frame)", render.uploads_per_frame());
    println!("│ Uploaded:           {:.1} MiB", uploaded_bytes as f64 / (1024.0 * 1024.0));
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ SIMULATION ───────────────────────────────────────────────────┐");
    println!("│ Steps:              {}", link.steps);
    println!("│ Simulated:          {:.2} s", link.simulated_seconds);
    println!("│ Slowest step:       {:.3} ms", link.max_step_us as f64 / 1000.0);
    println!("└──────────────────────────────────────────────────────────────────┘");
}

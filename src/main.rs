// src/main.rs
mod body;
mod client;
mod command;
mod config;
mod dispatch;
mod error;
mod geometry;
mod jump;
mod rip;
mod source;
mod tracking;
mod volume;
mod zone;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::client::HttpControlClient;
use crate::config::Config;
use crate::dispatch::{spawn_worker, CommandQueue, EventDispatcher};
use crate::source::{spawn_frame_source, ReplaySource, SimulatedSource, SourceHandle};
use crate::tracking::GestureTracker;

#[derive(Parser, Debug)]
#[command(
    name = "eigen_gesture",
    about = "Turns body gestures into loop, volume and tempo commands"
)]
struct Args {
    /// JSON configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Control service base url, overrides the config file
    #[arg(long)]
    base_url: Option<String>,

    /// Replay frames recorded as JSON lines instead of simulating a performer
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// Stop the simulation after this many frames
    #[arg(long, conflicts_with = "replay")]
    frames: Option<u64>,

    /// Frame rate for simulation and replay pacing
    #[arg(long)]
    fps: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config =
        Config::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.service.base_url = base_url;
    }
    if let Some(fps) = args.fps {
        config.source.fps = fps;
    }
    config.validate().context("Invalid configuration")?;

    // Dispatch gets its own runtime so recognition never waits on the network
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("dispatch")
        .enable_all()
        .build()
        .context("Failed to start dispatch runtime")?;

    let client =
        HttpControlClient::new(&config.service.base_url, config.service.request_timeout())?;
    info!("Control service: {}", client.base_url());
    if let Err(e) = runtime.block_on(client.ping()) {
        warn!("Control service not answering yet: {}", e);
    }

    let queue = CommandQueue::new(config.service.queue_capacity);
    let worker = spawn_worker(runtime.handle(), queue.clone(), client);
    let dispatcher = EventDispatcher::new(queue.clone(), config.cues.clone());

    let interval = config.source.frame_interval()?;
    let source = match &args.replay {
        Some(path) => {
            info!("Replaying frames from {}", path.display());
            let replay = ReplaySource::open(path, Some(interval))
                .with_context(|| format!("Failed to open recording {}", path.display()))?;
            spawn_frame_source(replay)
        }
        None => {
            info!("No recording given, simulating a performer at {} fps", config.source.fps);
            spawn_frame_source(SimulatedSource::new(config.source.fps, args.frames, true))
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = stop.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            stop_signal.store(true, Ordering::Relaxed);
        }
    });

    let mut tracker = GestureTracker::new(config.gestures.clone());
    let report_every = Duration::from_secs(config.source.report_interval_s.max(1));
    run_recognition(&mut tracker, &dispatcher, &source, &stop, report_every);

    let metrics = tracker.metrics();
    info!(
        "Recognition finished: {} frames processed, {} dropped, {} gesture events",
        metrics.frames_processed, metrics.frames_dropped, metrics.events_emitted
    );
    // Hanging up the receiver stops a source that is still producing
    let SourceHandle { frames, thread, .. } = source;
    drop(frames);
    if thread.join().is_err() {
        warn!("Frame source thread panicked");
    }

    queue.close();
    if !queue.is_empty() {
        info!("Draining {} queued commands", queue.len());
    }
    let drain = config.service.drain_timeout();
    match runtime.block_on(async { tokio::time::timeout(drain, worker).await }) {
        Ok(Ok(stats)) => info!(
            "Dispatch finished: {} delivered, {} failed, {} dropped on overflow",
            stats.delivered,
            stats.failed,
            queue.dropped()
        ),
        Ok(Err(e)) => warn!("Dispatch worker stopped abnormally: {}", e),
        Err(_) => warn!("Gave up on {} queued commands after {:?}", queue.len(), drain),
    }
    runtime.shutdown_timeout(Duration::from_millis(100));

    Ok(())
}

/// Processes frames as they arrive until the source hangs up or `stop` is set.
fn run_recognition(
    tracker: &mut GestureTracker,
    dispatcher: &EventDispatcher,
    source: &SourceHandle,
    stop: &AtomicBool,
    report_every: Duration,
) {
    let mut last_report = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        let frame = match source.frames.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let (events, metrics) = tracker.process_frame_with_metrics(&frame, Instant::now());
        dispatcher.dispatch_all(&events);
        tracker.set_frames_dropped(source.stats.dropped());

        if last_report.elapsed() >= report_every {
            info!(
                "{} bodies, {:.2} ms/frame ({:.0} fps capacity), {} of {} frames, {} dropped",
                metrics.tracked_bodies,
                metrics.avg_processing_time * 1000.0,
                metrics.avg_fps,
                metrics.frames_processed,
                source.stats.delivered(),
                source.stats.dropped()
            );
            last_report = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyFrame, BodySnapshot, Joint, JointType};
    use crate::command::ControlCommand;
    use crate::dispatch::EventCues;
    use crate::source::FrameStats;
    use crate::tracking::GestureConfig;
    use std::sync::mpsc;
    use std::thread;

    /// Left wrist above the head, right arm out at 90 degrees.
    fn arm_out(id: u64) -> BodySnapshot {
        let mut body = BodySnapshot::new(id);
        for (joint_type, x, y) in [
            (JointType::Head, 0.0, 1.6),
            (JointType::WristLeft, -0.3, 1.8),
            (JointType::ShoulderRight, 0.2, 1.4),
            (JointType::ElbowRight, 0.5, 1.4),
            (JointType::HipRight, 0.2, 0.95),
        ] {
            body.set_joint(joint_type, Joint::tracked(x, y, 2.0));
        }
        body
    }

    fn handle(frames: mpsc::Receiver<BodyFrame>) -> SourceHandle {
        SourceHandle {
            frames,
            stats: Arc::new(FrameStats::default()),
            thread: thread::spawn(|| {}),
        }
    }

    fn drain(queue: &CommandQueue) -> Vec<ControlCommand> {
        queue.close();
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let mut out = Vec::new();
            while let Some(command) = queue.next().await {
                out.push(command);
            }
            out
        })
    }

    #[test]
    fn test_recognition_runs_until_source_hangs_up() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(BodyFrame::new(0.0, vec![arm_out(1)])).unwrap();
        tx.send(BodyFrame::new(0.033, vec![arm_out(1)])).unwrap();
        drop(tx);

        let source = handle(rx);
        let queue = CommandQueue::new(16);
        let dispatcher = EventDispatcher::new(queue.clone(), EventCues::default());
        let mut tracker = GestureTracker::new(GestureConfig::default());
        let stop = AtomicBool::new(false);

        run_recognition(&mut tracker, &dispatcher, &source, &stop, Duration::from_secs(60));

        assert_eq!(tracker.metrics().frames_processed, 2);
        // Zone entry only on the first frame
        assert_eq!(drain(&queue), vec![ControlCommand::Play("1".into())]);
    }

    #[test]
    fn test_recognition_stops_when_asked() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(BodyFrame::new(0.0, vec![arm_out(1)])).unwrap();

        let source = handle(rx);
        let queue = CommandQueue::new(16);
        let dispatcher = EventDispatcher::new(queue.clone(), EventCues::default());
        let mut tracker = GestureTracker::new(GestureConfig::default());
        let stop = AtomicBool::new(true);

        // Sender still alive: only the flag can end the loop
        run_recognition(&mut tracker, &dispatcher, &source, &stop, Duration::from_secs(60));

        assert_eq!(tracker.metrics().frames_processed, 0);
        assert!(drain(&queue).is_empty());
        drop(tx);
    }

    #[test]
    fn test_frames_conflicts_with_replay() {
        let args = Args::try_parse_from(["eigen_gesture", "--frames", "10"]).unwrap();
        assert_eq!(args.frames, Some(10));

        let err = Args::try_parse_from([
            "eigen_gesture",
            "--replay",
            "session.jsonl",
            "--frames",
            "10",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}

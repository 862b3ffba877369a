// src/source.rs - Frame sources feeding the recognition loop
use crate::body::{BodyFrame, BodySnapshot, Joint, JointType};
use crate::error::SourceError;
use nalgebra::Vector3;
use std::f32::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, trace};

/// Anything that produces skeletal frames: sensor bridge, simulator, recording.
pub trait FrameSource: Send + 'static {
    /// Blocks until the next frame is available. `Ok(None)` ends the stream.
    fn next_frame(&mut self) -> Result<Option<BodyFrame>, SourceError>;
}

#[derive(Debug, Default)]
pub struct FrameStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl FrameStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct SourceHandle {
    pub frames: Receiver<BodyFrame>,
    pub stats: Arc<FrameStats>,
    pub thread: JoinHandle<()>,
}

/// Runs `source` on its own thread.
///
/// The hand-off holds a single frame. A frame that arrives while that slot is
/// still occupied is dropped and the waiting frame is kept, so a slow consumer
/// is at most one frame behind and never works through a backlog.
pub fn spawn_frame_source<S: FrameSource>(mut source: S) -> SourceHandle {
    let (tx, rx) = mpsc::sync_channel(1);
    let stats = Arc::new(FrameStats::default());
    let thread_stats = stats.clone();

    let thread = thread::spawn(move || loop {
        match source.next_frame() {
            Ok(Some(frame)) => match tx.try_send(frame) {
                Ok(()) => {
                    thread_stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(frame)) => {
                    thread_stats.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("Recognition busy, dropped frame at {:.3}s", frame.timestamp);
                }
                Err(TrySendError::Disconnected(_)) => return,
            },
            Ok(None) => {
                info!("Frame source finished");
                return;
            }
            Err(e) => {
                error!("Frame source failed: {}", e);
                return;
            }
        }
    });

    SourceHandle {
        frames: rx,
        stats,
        thread,
    }
}

/// Replays frames recorded as JSON lines, one [`BodyFrame`] per line.
pub struct ReplaySource<R> {
    reader: R,
    line: usize,
    interval: Option<Duration>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, interval: Option<Duration>) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), interval))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, interval: Option<Duration>) -> Self {
        Self {
            reader,
            line: 0,
            interval,
        }
    }
}

impl<R: BufRead + Send + 'static> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<BodyFrame>, SourceError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            if !buf.trim().is_empty() {
                break;
            }
        }

        let frame = serde_json::from_str(buf.trim()).map_err(|source| SourceError::Frame {
            line: self.line,
            source,
        })?;

        if let Some(interval) = self.interval {
            thread::sleep(interval);
        }
        Ok(Some(frame))
    }
}

/// Synthetic performer for running without a sensor.
///
/// One body holds the left wrist above the head while the right arm sweeps
/// between hanging and overhead, the feet take turns hopping every two
/// seconds, and the hands drift apart and together.
pub struct SimulatedSource {
    sim_time: f32,
    dt: f32,
    frames_left: Option<u64>,
    pace: bool,
}

const SIM_BODY_ID: u64 = 1;

impl SimulatedSource {
    pub fn new(fps: f32, max_frames: Option<u64>, pace: bool) -> Self {
        Self {
            sim_time: 0.0,
            dt: 1.0 / fps,
            frames_left: max_frames,
            pace,
        }
    }

    fn generate_body(&self) -> BodySnapshot {
        let t = self.sim_time;
        let mut body = BodySnapshot::new(SIM_BODY_ID);

        // Static torso and head
        let rest = [
            (JointType::SpineBase, (0.0, 0.95)),
            (JointType::SpineMid, (0.0, 1.2)),
            (JointType::SpineShoulder, (0.0, 1.42)),
            (JointType::Neck, (0.0, 1.5)),
            (JointType::Head, (0.0, 1.65)),
            (JointType::ShoulderLeft, (-0.2, 1.4)),
            (JointType::ShoulderRight, (0.2, 1.4)),
            (JointType::HipLeft, (-0.1, 0.95)),
            (JointType::HipRight, (0.2, 0.95)),
            (JointType::KneeLeft, (-0.1, 0.5)),
            (JointType::KneeRight, (0.12, 0.5)),
        ];
        for (joint_type, (x, y)) in rest.iter() {
            body.set_joint(*joint_type, Joint::tracked(*x, *y, 2.0));
        }

        // Left arm raised above the head
        let wrist_left = Vector3::new(-0.35, 1.85 + 0.05 * t.sin(), 2.0);
        let spread = 0.15 * (1.0 + (0.7 * t).sin());
        body.set_joint(JointType::ElbowLeft, Joint::tracked(-0.3, 1.5, 2.0));
        let hand_x = wrist_left.x - spread;
        for (joint_type, x, y) in [
            (JointType::WristLeft, wrist_left.x, wrist_left.y),
            (JointType::HandLeft, hand_x, wrist_left.y + 0.08),
            (JointType::HandTipLeft, hand_x, wrist_left.y + 0.15),
            (JointType::ThumbLeft, hand_x + 0.03, wrist_left.y + 0.1),
        ] {
            body.set_joint(joint_type, Joint::tracked(x, y, wrist_left.z));
        }

        // Right arm sweeps 10..170 degrees away from the hip
        let shoulder = Vector3::new(0.2, 1.4, 2.0);
        let theta = (90.0 + 80.0 * (0.4 * t).sin()).to_radians();
        let direction = Vector3::new(theta.sin(), -theta.cos(), 0.0);
        for (joint_type, reach) in [
            (JointType::ElbowRight, 0.3),
            (JointType::WristRight, 0.55),
            (JointType::HandRight, 0.62),
            (JointType::HandTipRight, 0.7),
            (JointType::ThumbRight, 0.66),
        ] {
            let p = shoulder + direction * reach;
            body.set_joint(joint_type, Joint::tracked(p.x, p.y, p.z));
        }

        // Alternating hops, right foot first
        let phase = 2.0 * PI * t / 4.0;
        let lift_right = 0.3 * phase.sin().max(0.0);
        let lift_left = 0.3 * (-phase.sin()).max(0.0);
        body.set_joint(JointType::AnkleLeft, Joint::tracked(-0.1, 0.08 + lift_left, 2.0));
        body.set_joint(JointType::FootLeft, Joint::tracked(-0.1, lift_left, 1.9));
        body.set_joint(JointType::AnkleRight, Joint::tracked(0.12, 0.08 + lift_right, 2.0));
        body.set_joint(JointType::FootRight, Joint::tracked(0.12, lift_right, 1.9));

        body
    }
}

impl FrameSource for SimulatedSource {
    fn next_frame(&mut self) -> Result<Option<BodyFrame>, SourceError> {
        if let Some(left) = self.frames_left.as_mut() {
            if *left == 0 {
                return Ok(None);
            }
            *left -= 1;
        }

        let frame = BodyFrame::new(self.sim_time as f64, vec![self.generate_body()]);
        self.sim_time += self.dt;

        if self.pace {
            thread::sleep(Duration::from_secs_f32(self.dt));
        }
        Ok(Some(frame))
    }
}

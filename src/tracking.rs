// src/tracking.rs - Per-body gesture recognition
use crate::body::{BodyFrame, BodySnapshot};
use crate::command::GestureEvent;
use crate::jump::{JumpDetector, JumpThresholds, LegSide};
use crate::rip::{RipTimer, DEFAULT_RIP_INTERVAL};
use crate::volume::{VolumeMapper, VolumeNormalization};
use crate::zone::{ZoneClassifier, ZoneThresholds};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub events_emitted: u64,
    pub tracked_bodies: usize,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(30),
            ..Default::default()
        }
    }

    fn record(&mut self, elapsed: f32) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > 30 {
            self.frame_times.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub zone: ZoneThresholds,
    pub jump: JumpThresholds,
    pub rip_interval_ms: u64,
    pub volume_normalization: VolumeNormalization,
    /// Bodies beyond this many in one frame are ignored.
    pub max_bodies: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            zone: ZoneThresholds::default(),
            jump: JumpThresholds::default(),
            rip_interval_ms: DEFAULT_RIP_INTERVAL.as_millis() as u64,
            volume_normalization: VolumeNormalization::Raw,
            max_bodies: 6,
        }
    }
}

/// All recognizer state belonging to one tracked person.
///
/// Created the first frame a tracking id shows up and dropped as soon as the
/// sensor stops reporting it, so nothing leaks between people.
#[derive(Debug, Clone)]
pub struct BodyContext {
    zone: ZoneClassifier,
    volume: VolumeMapper,
    jump_right: JumpDetector,
    jump_left: JumpDetector,
    rip: RipTimer,
}

impl BodyContext {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            zone: ZoneClassifier::new(config.zone),
            volume: VolumeMapper::new(config.volume_normalization),
            jump_right: JumpDetector::new(LegSide::Right, config.jump),
            jump_left: JumpDetector::new(LegSide::Left, config.jump),
            rip: RipTimer::new(Duration::from_millis(config.rip_interval_ms)),
        }
    }

    #[cfg(test)]
    pub fn zone(&self) -> Option<crate::zone::Zone> {
        self.zone.current()
    }

    /// Runs every recognizer over one snapshot of this body.
    pub fn process(&mut self, body: &BodySnapshot, now: Instant, events: &mut Vec<GestureEvent>) {
        let id = body.tracking_id;

        if let Some(zone) = self.zone.observe(body) {
            events.push(GestureEvent::ZoneChanged { body: id, zone });
        }

        // Volume follows the active zone, Zone0 until one has been selected
        if let Some(level) = self.volume.level(body) {
            let zone = self.zone.current().unwrap_or_default();
            events.push(GestureEvent::Volume { body: id, zone, level });
        }

        for detector in [&mut self.jump_right, &mut self.jump_left] {
            if detector.observe(body) {
                events.push(GestureEvent::Jump { body: id, side: detector.side() });
            }
        }

        if self.rip.observe(body, now) {
            events.push(GestureEvent::Rip { body: id });
        }
    }
}

pub struct GestureTracker {
    config: GestureConfig,
    bodies: HashMap<u64, BodyContext>,
    metrics: PerformanceMetrics,
}

impl GestureTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            bodies: HashMap::new(),
            metrics: PerformanceMetrics::new(),
        }
    }

    #[cfg(test)]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[cfg(test)]
    pub fn context(&self, tracking_id: u64) -> Option<&BodyContext> {
        self.bodies.get(&tracking_id)
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn set_frames_dropped(&mut self, dropped: u64) {
        self.metrics.frames_dropped = dropped;
    }

    pub fn process_frame(&mut self, frame: &BodyFrame, now: Instant) -> Vec<GestureEvent> {
        let tracked: Vec<&BodySnapshot> = frame
            .tracked_bodies()
            .take(self.config.max_bodies)
            .collect();

        let skipped = frame.tracked_bodies().count() - tracked.len();
        if skipped > 0 {
            debug!("Ignoring {} bodies over the limit of {}", skipped, self.config.max_bodies);
        }

        self.bodies.retain(|id, _| {
            let present = tracked.iter().any(|b| b.tracking_id == *id);
            if !present {
                info!("Body {} lost, discarding gesture state", id);
            }
            present
        });

        let mut events = Vec::new();
        for body in tracked {
            let config = &self.config;
            let context = self.bodies.entry(body.tracking_id).or_insert_with(|| {
                info!("Body {} acquired", body.tracking_id);
                BodyContext::new(config)
            });
            context.process(body, now, &mut events);
        }

        self.metrics.frames_processed += 1;
        self.metrics.events_emitted += events.len() as u64;
        self.metrics.tracked_bodies = self.bodies.len();
        events
    }

    pub fn process_frame_with_metrics(
        &mut self,
        frame: &BodyFrame,
        now: Instant,
    ) -> (Vec<GestureEvent>, PerformanceMetrics) {
        let start = Instant::now();
        let events = self.process_frame(frame, now);
        self.metrics.record(start.elapsed().as_secs_f32());
        (events, self.metrics.clone())
    }
}

// src/zone.rs
use crate::body::{BodySnapshot, JointType};
use crate::command::ControlCommand;
use crate::geometry;
use serde::{Deserialize, Serialize};

/// Discrete bucket of the right arm's raise angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Zone {
    #[default]
    Zone0,
    Zone1,
    Zone2,
}

impl Zone {
    /// Identifier of the loop/section this zone drives on the control service.
    pub fn id(&self) -> &'static str {
        match self {
            Zone::Zone0 => "0",
            Zone::Zone1 => "1",
            Zone::Zone2 => "2",
        }
    }

    /// Command sent when the arm enters this zone.
    pub fn entry_command(&self) -> ControlCommand {
        match self {
            Zone::Zone0 => ControlCommand::StartLoop(self.id().to_string()),
            Zone::Zone1 | Zone::Zone2 => ControlCommand::Play(self.id().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneThresholds {
    /// Inclusive lower bound of Zone0, degrees.
    pub zone0_min: f32,
    /// Inclusive lower bound of Zone1, degrees. Everything below is Zone2.
    pub zone1_min: f32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            zone0_min: 140.0,
            zone1_min: 60.0,
        }
    }
}

impl ZoneThresholds {
    /// Checked top-down, lower bounds inclusive.
    pub fn classify(&self, angle: f32) -> Zone {
        if angle >= self.zone0_min {
            Zone::Zone0
        } else if angle >= self.zone1_min {
            Zone::Zone1
        } else {
            Zone::Zone2
        }
    }
}

/// Tracks which zone a body's right arm is in and reports transitions.
#[derive(Debug, Clone, Default)]
pub struct ZoneClassifier {
    thresholds: ZoneThresholds,
    current: Option<Zone>,
}

impl ZoneClassifier {
    pub fn new(thresholds: ZoneThresholds) -> Self {
        Self {
            thresholds,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Zone> {
        self.current
    }

    /// Feed one gated angle. Returns the new zone only on a transition.
    pub fn update(&mut self, angle: f32) -> Option<Zone> {
        let candidate = self.thresholds.classify(angle);
        if self.current == Some(candidate) {
            return None;
        }
        self.current = Some(candidate);
        Some(candidate)
    }

    /// Runs the classifier for one body frame.
    ///
    /// Classification only happens while the left wrist is held above the head.
    /// Frames with untracked joints or an indeterminate arm angle are skipped
    /// and leave the stored zone untouched.
    pub fn observe(&mut self, body: &BodySnapshot) -> Option<Zone> {
        let head = body.position(JointType::Head)?;
        let wrist_left = body.position(JointType::WristLeft)?;
        if wrist_left.y <= head.y {
            return None;
        }

        let shoulder = body.position(JointType::ShoulderRight)?;
        let elbow = body.position(JointType::ElbowRight)?;
        let hip = body.position(JointType::HipRight)?;
        let angle = geometry::angle_between_joints(&shoulder, &elbow, &hip)?;

        self.update(angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Joint;

    #[test]
    fn test_zone_boundaries() {
        let thresholds = ZoneThresholds::default();
        assert_eq!(thresholds.classify(180.0), Zone::Zone0);
        assert_eq!(thresholds.classify(140.0), Zone::Zone0);
        assert_eq!(thresholds.classify(139.99), Zone::Zone1);
        assert_eq!(thresholds.classify(60.0), Zone::Zone1);
        assert_eq!(thresholds.classify(59.99), Zone::Zone2);
        assert_eq!(thresholds.classify(0.0), Zone::Zone2);
    }

    #[test]
    fn test_emits_only_on_change() {
        let mut classifier = ZoneClassifier::default();
        let emitted: Vec<ControlCommand> = [170.0, 170.0, 100.0, 100.0, 30.0]
            .iter()
            .filter_map(|angle| classifier.update(*angle))
            .map(|zone| zone.entry_command())
            .collect();

        assert_eq!(
            emitted,
            vec![
                ControlCommand::StartLoop("0".into()),
                ControlCommand::Play("1".into()),
                ControlCommand::Play("2".into()),
            ]
        );
        assert_eq!(classifier.current(), Some(Zone::Zone2));
    }

    fn arm_body(wrist_left_y: f32, elbow: (f32, f32)) -> BodySnapshot {
        BodySnapshot::new(1)
            .with_joint(JointType::Head, Joint::tracked(0.0, 1.6, 2.0))
            .with_joint(JointType::WristLeft, Joint::tracked(-0.3, wrist_left_y, 2.0))
            .with_joint(JointType::ShoulderRight, Joint::tracked(0.2, 1.4, 2.0))
            .with_joint(JointType::ElbowRight, Joint::tracked(elbow.0, elbow.1, 2.0))
            .with_joint(JointType::HipRight, Joint::tracked(0.2, 0.9, 2.0))
    }

    #[test]
    fn test_gate_requires_raised_left_wrist() {
        let mut classifier = ZoneClassifier::default();

        // Arm straight out to the side: 90 degrees from the hip
        let lowered = arm_body(1.0, (0.5, 1.4));
        assert_eq!(classifier.observe(&lowered), None);
        assert_eq!(classifier.current(), None);

        let raised = arm_body(1.8, (0.5, 1.4));
        assert_eq!(classifier.observe(&raised), Some(Zone::Zone1));
        assert_eq!(classifier.observe(&raised), None);

        // Arm straight up
        let overhead = arm_body(1.8, (0.2, 1.7));
        assert_eq!(classifier.observe(&overhead), Some(Zone::Zone0));
    }

    #[test]
    fn test_degenerate_arm_skips_frame() {
        let mut classifier = ZoneClassifier::default();
        // Elbow reported on top of the shoulder
        let body = arm_body(1.8, (0.2, 1.4));
        assert_eq!(classifier.observe(&body), None);
        assert_eq!(classifier.current(), None);
    }
}

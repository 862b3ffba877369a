// src/jump.rs
use crate::body::{BodySnapshot, JointType};
use serde::{Deserialize, Serialize};

/// Which foot leaves the floor for this detector to count a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegSide {
    Right,
    Left,
}

impl LegSide {
    /// Returns `(primary, secondary)` feet for the height differential.
    ///
    /// `diff = (-primary.y - -secondary.y) * 100`, which grows as the
    /// secondary foot rises above the primary one.
    pub fn leg_pair(&self) -> (JointType, JointType) {
        match self {
            LegSide::Right => (JointType::FootLeft, JointType::FootRight),
            LegSide::Left => (JointType::FootRight, JointType::FootLeft),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpThresholds {
    /// Differential (cm) above which the foot counts as raised.
    pub rise: f32,
    /// Differential (cm) below which a raised foot counts as landed.
    pub fall: f32,
}

impl Default for JumpThresholds {
    fn default() -> Self {
        Self {
            rise: 20.0,
            fall: 10.0,
        }
    }
}

/// Edge-triggered jump state machine for one leg orientation.
///
/// Idle -> Raised on `diff > rise` (silent), Raised -> Idle on `diff < fall`
/// (emits). Differentials inside `[fall, rise]` keep the current state.
#[derive(Debug, Clone)]
pub struct JumpDetector {
    side: LegSide,
    thresholds: JumpThresholds,
    raised: bool,
}

impl JumpDetector {
    pub fn new(side: LegSide, thresholds: JumpThresholds) -> Self {
        Self {
            side,
            thresholds,
            raised: false,
        }
    }

    pub fn side(&self) -> LegSide {
        self.side
    }

    #[cfg(test)]
    pub fn is_raised(&self) -> bool {
        self.raised
    }

    /// Feed one differential. Returns true on landing.
    pub fn update(&mut self, diff: f32) -> bool {
        if !self.raised {
            if diff > self.thresholds.rise {
                self.raised = true;
            }
            false
        } else if diff < self.thresholds.fall {
            self.raised = false;
            true
        } else {
            false
        }
    }

    /// Computes the leg differential for this orientation. `None` when either
    /// foot is not tracked.
    pub fn differential(&self, body: &BodySnapshot) -> Option<f32> {
        let (primary, secondary) = self.side.leg_pair();
        let primary = -body.position(primary)?.y;
        let secondary = -body.position(secondary)?.y;
        Some((primary - secondary) * 100.0)
    }

    pub fn observe(&mut self, body: &BodySnapshot) -> bool {
        match self.differential(body) {
            Some(diff) => self.update(diff),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Joint;

    fn landings(detector: &mut JumpDetector, diffs: &[f32]) -> Vec<usize> {
        diffs
            .iter()
            .enumerate()
            .filter_map(|(i, d)| detector.update(*d).then_some(i))
            .collect()
    }

    #[test]
    fn test_single_jump_fires_on_landing() {
        let mut detector = JumpDetector::new(LegSide::Right, JumpThresholds::default());
        assert_eq!(landings(&mut detector, &[0.0, 25.0, 25.0, 5.0]), vec![3]);
        assert!(!detector.is_raised());
    }

    #[test]
    fn test_hysteresis_band_holds_raised() {
        let mut detector = JumpDetector::new(LegSide::Right, JumpThresholds::default());
        assert_eq!(landings(&mut detector, &[0.0, 25.0, 15.0, 25.0, 5.0]), vec![4]);
    }

    #[test]
    fn test_exact_thresholds_do_not_transition() {
        let mut detector = JumpDetector::new(LegSide::Left, JumpThresholds::default());
        assert!(!detector.update(20.0));
        assert!(!detector.is_raised());
        assert!(!detector.update(20.5));
        assert!(detector.is_raised());
        assert!(!detector.update(10.0));
        assert!(detector.is_raised());
        assert!(detector.update(9.9));
    }

    fn feet(left_y: f32, right_y: f32) -> BodySnapshot {
        BodySnapshot::new(3)
            .with_joint(JointType::FootLeft, Joint::tracked(-0.15, left_y, 2.0))
            .with_joint(JointType::FootRight, Joint::tracked(0.15, right_y, 2.0))
    }

    #[test]
    fn test_orientation_follows_raised_foot() {
        let mut right = JumpDetector::new(LegSide::Right, JumpThresholds::default());
        let mut left = JumpDetector::new(LegSide::Left, JumpThresholds::default());

        // Right foot 30cm off the floor
        let body = feet(0.0, 0.3);
        assert!((right.differential(&body).unwrap() - 30.0).abs() < 1e-3);
        assert!((left.differential(&body).unwrap() + 30.0).abs() < 1e-3);

        right.observe(&body);
        left.observe(&body);
        assert!(right.is_raised());
        assert!(!left.is_raised());
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let mut right = JumpDetector::new(LegSide::Right, JumpThresholds::default());
        let mut left = JumpDetector::new(LegSide::Left, JumpThresholds::default());

        // Both see a rising edge on the same frame, then both land
        assert!(!right.update(25.0));
        assert!(!left.update(30.0));
        assert!(right.update(0.0));
        assert!(left.update(2.0));
    }

    #[test]
    fn test_untracked_foot_skips_frame() {
        let mut detector = JumpDetector::new(LegSide::Right, JumpThresholds::default());
        let body = BodySnapshot::new(3)
            .with_joint(JointType::FootRight, Joint::tracked(0.15, 0.4, 2.0));
        assert_eq!(detector.differential(&body), None);
        assert!(!detector.observe(&body));
        assert!(!detector.is_raised());
    }
}

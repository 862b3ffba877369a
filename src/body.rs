// src/body.rs
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Landmarks reported by the skeletal sensor (Kinect v2 joint set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Camera-space meters. Y up, X lateral, Z depth.
    pub position: Vector3<f32>,
    #[serde(default)]
    pub tracking_state: TrackingState,
}

impl Joint {
    pub fn new(position: Vector3<f32>, tracking_state: TrackingState) -> Self {
        Self { position, tracking_state }
    }

    pub fn tracked(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vector3::new(x, y, z), TrackingState::Tracked)
    }

    pub fn is_usable(&self) -> bool {
        self.tracking_state != TrackingState::NotTracked
    }
}

/// One tracked human in one frame.
///
/// Owned by the frame it arrived in; detectors only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub tracking_id: u64,
    #[serde(default = "default_is_tracked")]
    pub is_tracked: bool,
    pub joints: HashMap<JointType, Joint>,
}

fn default_is_tracked() -> bool {
    true
}

impl BodySnapshot {
    pub fn new(tracking_id: u64) -> Self {
        Self {
            tracking_id,
            is_tracked: true,
            joints: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_joint(mut self, joint_type: JointType, joint: Joint) -> Self {
        self.joints.insert(joint_type, joint);
        self
    }

    pub fn set_joint(&mut self, joint_type: JointType, joint: Joint) {
        self.joints.insert(joint_type, joint);
    }

    /// Returns the joint only if the sensor reported it as tracked or inferred.
    pub fn joint(&self, joint_type: JointType) -> Option<&Joint> {
        self.joints.get(&joint_type).filter(|j| j.is_usable())
    }

    pub fn position(&self, joint_type: JointType) -> Option<Vector3<f32>> {
        self.joint(joint_type).map(|j| j.position)
    }
}

/// Everything the sensor delivered for a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyFrame {
    /// Sensor-relative frame time in seconds.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub bodies: Vec<BodySnapshot>,
}

impl BodyFrame {
    pub fn new(timestamp: f64, bodies: Vec<BodySnapshot>) -> Self {
        Self { timestamp, bodies }
    }

    pub fn tracked_bodies(&self) -> impl Iterator<Item = &BodySnapshot> {
        self.bodies.iter().filter(|b| b.is_tracked)
    }
}

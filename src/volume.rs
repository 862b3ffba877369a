// src/volume.rs
use crate::body::{BodySnapshot, JointType};
use crate::geometry::{self, DEGENERATE_EPSILON};
use serde::{Deserialize, Serialize};

/// How the raw hand separation is scaled before it becomes a volume level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeNormalization {
    /// Raw lateral distance in meters.
    #[default]
    Raw,
    /// Divided by the right shoulder to right hip distance.
    ShoulderHip,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeMapper {
    normalization: VolumeNormalization,
}

impl VolumeMapper {
    pub fn new(normalization: VolumeNormalization) -> Self {
        Self { normalization }
    }

    /// Volume level for this frame, or `None` if a required joint is missing.
    ///
    /// Stateless: every usable frame yields a level, changed or not.
    pub fn level(&self, body: &BodySnapshot) -> Option<f32> {
        let left = body.position(JointType::HandLeft)?;
        let right = body.position(JointType::HandRight)?;
        let depth = geometry::depth(&left, &right);

        match self.normalization {
            VolumeNormalization::Raw => Some(depth),
            VolumeNormalization::ShoulderHip => {
                let shoulder = body.position(JointType::ShoulderRight)?;
                let hip = body.position(JointType::HipRight)?;
                let scale = geometry::distance(&shoulder, &hip);
                if scale < DEGENERATE_EPSILON {
                    return None;
                }
                Some(depth / scale)
            }
        }
    }
}

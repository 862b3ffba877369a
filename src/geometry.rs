// src/geometry.rs
//! Angle and distance helpers over camera-space joint positions.

use nalgebra::Vector3;

/// Vectors shorter than this (meters) have no usable direction.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Angle at `center` between the rays towards `top` and `bottom`, in degrees
/// rounded to two decimals.
///
/// Returns `None` when either ray is degenerate (coincident joints), so callers
/// can skip the frame instead of classifying a NaN.
pub fn angle_between_joints(
    center: &Vector3<f32>,
    top: &Vector3<f32>,
    bottom: &Vector3<f32>,
) -> Option<f32> {
    let first = bottom - center;
    let second = top - center;
    angle_between_vectors(&first, &second)
}

pub fn angle_between_vectors(a: &Vector3<f32>, b: &Vector3<f32>) -> Option<f32> {
    let a = a.try_normalize(DEGENERATE_EPSILON)?;
    let b = b.try_normalize(DEGENERATE_EPSILON)?;

    // Rounding error can push the dot product just past +-1
    let dot = a.dot(&b).clamp(-1.0, 1.0);
    Some(round2(dot.acos().to_degrees()))
}

/// Horizontal separation between the two hands.
pub fn depth(hand_left: &Vector3<f32>, hand_right: &Vector3<f32>) -> f32 {
    (hand_left.x - hand_right.x).abs()
}

pub fn distance(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    (a - b).norm()
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

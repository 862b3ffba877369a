// src/command.rs
use crate::jump::LegSide;
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A request understood by the audio control service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum ControlCommand {
    StartLoop(String),
    Play(String),
    Pause(String),
    SetVolume(String, String),
    SetTempo(String, String),
}

impl ControlCommand {
    /// Volume levels go over the wire with two decimals.
    pub fn set_volume(zone: Zone, level: f32) -> Self {
        ControlCommand::SetVolume(zone.id().to_string(), format!("{:.2}", level))
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::StartLoop(id) => write!(f, "start {}", id),
            ControlCommand::Play(id) => write!(f, "play {}", id),
            ControlCommand::Pause(id) => write!(f, "pause {}", id),
            ControlCommand::SetVolume(id, value) => write!(f, "volume {}={}", id, value),
            ControlCommand::SetTempo(id, value) => write!(f, "beat {}={}", id, value),
        }
    }
}

/// Output of the recognizers for one body on one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    ZoneChanged { body: u64, zone: Zone },
    Volume { body: u64, zone: Zone, level: f32 },
    Jump { body: u64, side: LegSide },
    Rip { body: u64 },
}

impl GestureEvent {
    #[cfg(test)]
    pub fn body(&self) -> u64 {
        match self {
            GestureEvent::ZoneChanged { body, .. }
            | GestureEvent::Volume { body, .. }
            | GestureEvent::Jump { body, .. }
            | GestureEvent::Rip { body } => *body,
        }
    }

    /// Continuous events are sent every frame and are not worth an info log.
    pub fn is_discrete(&self) -> bool {
        !matches!(self, GestureEvent::Volume { .. })
    }
}

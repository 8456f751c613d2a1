use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute microseconds on some clock. Which clock a value belongs to
/// (reference playback vs. microphone capture) is a property of the field
/// holding it, not of the type.
pub type Micros = i64;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub id: DeviceId,
    pub name: String,
}

/// One result from the external pitch estimator. `pitch` is a note number
/// (absent when no pitch was detected in the analysis window);
/// `capture_time` is on the capture clock and marks the estimator's result
/// time, not the analysis window's onset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PitchObservation {
    pub pitch: Option<i32>,
    pub buffer_duration: Micros,
    pub capture_time: Micros,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

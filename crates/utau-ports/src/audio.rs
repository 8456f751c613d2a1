use crate::types::{AudioOutputDevice, DeviceId, Micros};

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// A train of short fixed-pitch tone bursts, used by latency calibration.
/// All times are relative to the moment `play_schedule` is called.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSchedule {
    /// Silence before the first burst (capture-path warm-up).
    pub lead_in: Micros,
    pub count: u32,
    /// Burst-to-burst spacing.
    pub period: Micros,
    /// Length of each burst.
    pub burst: Micros,
    pub frequency_hz: f32,
}

/// Playing schedule handle: close stops playback and releases the output.
pub trait ToneScheduleHandle: Send {
    fn close(self: Box<Self>);
}

pub trait ToneOutputPort: Send + Sync {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError>;

    /// Start the schedule on the given output (default output if `None`).
    fn play_schedule(
        &self,
        device_id: Option<&DeviceId>,
        schedule: ToneSchedule,
    ) -> Result<Box<dyn ToneScheduleHandle>, AudioError>;
}

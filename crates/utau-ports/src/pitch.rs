use crate::types::{Micros, PitchObservation};

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture source closed")]
    Closed,
    #[error("backend error: {0}")]
    Backend(String),
}

/// External pitch estimator contract. Each call blocks until the next
/// analysis result is available; the engine never owns the underlying
/// capture device beyond this handle.
pub trait PitchSource: Send {
    fn next_observation(&mut self) -> Result<PitchObservation, CaptureError>;

    /// Release the capture resource.
    fn close(self: Box<Self>);
}

/// Clock of the capture/analysis pipeline, independent of the reference
/// clock. Monotonic while the capture stream is open.
pub trait CaptureClock: Send + Sync {
    fn now(&self) -> Micros;
}

/// Clock tied to reference melody/video playback: advances while playing,
/// frozen while paused. Same microsecond domain as the note timeline.
pub trait ReferenceClock: Send + Sync {
    fn now(&self) -> Micros;
}

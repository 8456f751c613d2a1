//! The live alignment session.
//!
//! Pitch observations arrive stamped on the capture clock; the score plays
//! on the reference clock. Each accepted observation is projected onto the
//! score timeline, judged against the reference melody, and appended to the
//! performance. The singable MIDI range and the dedup on capture timestamps
//! keep detector noise and repeated analysis frames out of the record.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

use utau_domain_eval::{correct_octave, PerformedNote};
use utau_domain_score::{last_starting_before, Note};
use utau_ports::pitch::{CaptureClock, CaptureError, PitchSource, ReferenceClock};
use utau_ports::types::{Micros, PitchObservation};

/// Default end-to-end latency compensation: 300 ms.
pub const DEFAULT_TIME_OFFSET_US: Micros = 300_000;

/// Lowest and highest pitch a singing voice plausibly produces.
const PITCH_FLOOR: i32 = 36;
const PITCH_CEIL: i32 = 88;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("pitch capture failed: {0}")]
    Capture(#[from] CaptureError),
}

/// Live-tunable session parameters. Shared with whatever UI or control
/// surface adjusts them mid-song; a change applies from the next accepted
/// observation onward.
#[derive(Debug)]
pub struct SessionTuning {
    time_offset_us: AtomicI64,
    pitch_offset: AtomicI32,
}

impl SessionTuning {
    pub fn new(time_offset_us: Micros, pitch_offset: i32) -> Self {
        Self {
            time_offset_us: AtomicI64::new(time_offset_us),
            pitch_offset: AtomicI32::new(pitch_offset),
        }
    }

    pub fn set_time_offset_us(&self, value: Micros) {
        self.time_offset_us.store(value, Ordering::Relaxed);
    }

    pub fn set_pitch_offset(&self, value: i32) {
        self.pitch_offset.store(value, Ordering::Relaxed);
    }

    pub fn time_offset_us(&self) -> Micros {
        self.time_offset_us.load(Ordering::Relaxed)
    }

    pub fn pitch_offset(&self) -> i32 {
        self.pitch_offset.load(Ordering::Relaxed)
    }
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_OFFSET_US, 0)
    }
}

/// Handle for stopping a running session from another thread.
#[derive(Clone, Debug)]
pub struct SessionControl {
    running: Arc<AtomicBool>,
}

impl SessionControl {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct AlignmentSession {
    timeline: Vec<Note>,
    tuning: Arc<SessionTuning>,
    running: Arc<AtomicBool>,
    performed: Vec<PerformedNote>,
    last_capture_time: Option<Micros>,
}

impl AlignmentSession {
    pub fn new(timeline: Vec<Note>, tuning: Arc<SessionTuning>) -> Self {
        Self {
            timeline,
            tuning,
            running: Arc::new(AtomicBool::new(false)),
            performed: Vec::new(),
            last_capture_time: None,
        }
    }

    pub fn control(&self) -> SessionControl {
        SessionControl {
            running: Arc::clone(&self.running),
        }
    }

    pub fn performed(&self) -> &[PerformedNote] {
        &self.performed
    }

    /// Pump observations until stopped via [`SessionControl`] or the source
    /// fails. With an empty timeline there is nothing to align against, so
    /// the session never starts and the source is left untouched.
    pub fn run(
        &mut self,
        source: &mut dyn PitchSource,
        reference: &dyn ReferenceClock,
        capture: &dyn CaptureClock,
    ) -> Result<&[PerformedNote], SessionError> {
        if self.timeline.is_empty() {
            return Ok(&self.performed);
        }

        // Each run is a fresh performance; nothing carries over from a
        // previous take, including the duplicate-suppression timestamp.
        self.performed.clear();
        self.last_capture_time = None;

        self.running.store(true, Ordering::SeqCst);
        let result = self.pump(source, reference, capture);
        self.running.store(false, Ordering::SeqCst);
        result?;
        Ok(&self.performed)
    }

    fn pump(
        &mut self,
        source: &mut dyn PitchSource,
        reference: &dyn ReferenceClock,
        capture: &dyn CaptureClock,
    ) -> Result<(), SessionError> {
        while self.running.load(Ordering::SeqCst) {
            let obs = source.next_observation()?;
            self.ingest(obs, reference, capture);
        }
        Ok(())
    }

    fn ingest(
        &mut self,
        obs: PitchObservation,
        reference: &dyn ReferenceClock,
        capture: &dyn CaptureClock,
    ) {
        // The timestamp repeats when the detector re-analyzes the same
        // capture buffer; silence updates it too so a later repeat of an
        // older buffer is still rejected.
        let duplicate = self.last_capture_time == Some(obs.capture_time);
        self.last_capture_time = Some(obs.capture_time);

        let Some(pitch) = obs.pitch else {
            return;
        };
        if duplicate || !(PITCH_FLOOR..=PITCH_CEIL).contains(&pitch) {
            return;
        }

        let time_offset = self.tuning.time_offset_us();
        let transpose = self.tuning.pitch_offset();

        // Where the score was when this buffer was actually sung: the
        // reference position, minus the configured compensation, minus the
        // age of the buffer (capture delay plus the buffer's own length).
        let age = capture.now() - obs.capture_time + obs.buffer_duration;
        let tpos = reference.now() - time_offset - age;

        let covering = last_starting_before(&self.timeline, tpos).map(|i| &self.timeline[i]);
        let outcome = correct_octave(pitch, covering, transpose, tpos);

        self.performed.push(PerformedNote {
            tpos,
            duration: obs.buffer_duration,
            pitch: outcome.pitch,
            correct: outcome.correct,
        });
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use utau_core::{measure_latency, CalibrationError, LatencyEstimate};
use utau_ports::audio::{AudioError, ToneOutputPort, ToneSchedule, ToneScheduleHandle};
use utau_ports::pitch::{CaptureClock, CaptureError, PitchSource};
use utau_ports::types::{AudioOutputDevice, DeviceId, Micros, PitchObservation};

struct FakeToneHandle {
    closed: Arc<AtomicBool>,
}

impl ToneScheduleHandle for FakeToneHandle {
    fn close(self: Box<Self>) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeTonePort {
    closed: Arc<AtomicBool>,
    played: Mutex<Option<ToneSchedule>>,
}

impl FakeTonePort {
    fn new() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            played: Mutex::new(None),
        }
    }
}

impl ToneOutputPort for FakeTonePort {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        Ok(Vec::new())
    }

    fn play_schedule(
        &self,
        _device_id: Option<&DeviceId>,
        schedule: ToneSchedule,
    ) -> Result<Box<dyn ToneScheduleHandle>, AudioError> {
        *self.played.lock().unwrap() = Some(schedule);
        Ok(Box::new(FakeToneHandle {
            closed: Arc::clone(&self.closed),
        }))
    }
}

/// Advances by `step` on every read, like a polled wall clock.
struct SteppingClock {
    now: AtomicI64,
    step: Micros,
}

impl SteppingClock {
    fn new(step: Micros) -> Self {
        Self {
            now: AtomicI64::new(0),
            step,
        }
    }
}

impl CaptureClock for SteppingClock {
    fn now(&self) -> Micros {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

struct ScriptedSource {
    queue: VecDeque<PitchObservation>,
    fallback_time: Micros,
}

impl ScriptedSource {
    fn new(script: Vec<PitchObservation>) -> Self {
        Self {
            queue: script.into(),
            fallback_time: 0,
        }
    }
}

impl PitchSource for ScriptedSource {
    fn next_observation(&mut self) -> Result<PitchObservation, CaptureError> {
        match self.queue.pop_front() {
            Some(o) => Ok(o),
            None => {
                // Endless silence with fresh timestamps.
                self.fallback_time += 1;
                Ok(PitchObservation {
                    pitch: None,
                    buffer_duration: 0,
                    capture_time: self.fallback_time,
                })
            }
        }
    }

    fn close(self: Box<Self>) {}
}

struct FailingSource;

impl PitchSource for FailingSource {
    fn next_observation(&mut self) -> Result<PitchObservation, CaptureError> {
        Err(CaptureError::Closed)
    }

    fn close(self: Box<Self>) {}
}

const BUFFER: Micros = 50_000;

/// A detection answering burst `index`, heard `latency` after the burst's
/// scheduled start. The clock reads 0 when the schedule starts, so the
/// first burst plays at 2 000 000 (the lead-in).
fn detection(pitch: i32, index: i64, latency: Micros) -> PitchObservation {
    let base = 2_000_000;
    PitchObservation {
        pitch: Some(pitch),
        buffer_duration: BUFFER,
        capture_time: base + index * 1_000_000 + latency + BUFFER,
    }
}

#[test]
fn one_sample_per_burst_yields_the_mean_latency() {
    let port = FakeTonePort::new();
    let clock = SteppingClock::new(1_000);

    let mut script = vec![
        detection(69, 0, 150_000),
        // Second hit in the same burst window is ignored.
        detection(69, 0, 300_000),
        // Wrong pitch class never counts.
        detection(60, 1, 150_000),
        // A harmonic an octave up does.
        detection(81, 1, 150_002),
    ];
    for index in 2..10 {
        script.push(detection(69, index, 150_000));
    }
    let mut source = ScriptedSource::new(script);

    let estimate = measure_latency(&port, None, &mut source, &clock)
        .expect("calibration should succeed");

    // Nine exact samples at 150 000 plus one at 150 002 for bucket 1.
    assert_eq!(
        estimate,
        LatencyEstimate {
            mean: 150_000,
            std_dev: 1,
        }
    );
    assert!(port.closed.load(Ordering::SeqCst));

    let played = port.played.lock().unwrap().expect("schedule should play");
    assert_eq!(played.count, 10);
    assert_eq!(played.lead_in, 2_000_000);
    assert_eq!(played.period, 1_000_000);
    assert_eq!(played.frequency_hz, 440.0);
}

#[test]
fn silence_until_the_deadline_reports_no_observations() {
    let port = FakeTonePort::new();
    // Big steps so the deadline is reached after a handful of polls.
    let clock = SteppingClock::new(1_000_000);
    let mut source = ScriptedSource::new(Vec::new());

    let err = measure_latency(&port, None, &mut source, &clock).unwrap_err();
    assert!(matches!(err, CalibrationError::NoObservations));
    assert!(port.closed.load(Ordering::SeqCst));
}

#[test]
fn capture_failure_still_closes_the_tone_handle() {
    let port = FakeTonePort::new();
    let clock = SteppingClock::new(1_000);
    let mut source = FailingSource;

    let err = measure_latency(&port, None, &mut source, &clock).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::Capture(CaptureError::Closed)
    ));
    assert!(port.closed.load(Ordering::SeqCst));
}

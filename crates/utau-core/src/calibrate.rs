//! Round-trip latency calibration.
//!
//! The output port plays a train of A440 bursts on a known schedule; the
//! microphone hears them back through the same speaker-to-analysis path a
//! performance travels. Each detection is bucketed to the burst it answers
//! and its offset within the bucket is the round-trip latency sample.

use utau_ports::audio::{AudioError, ToneOutputPort, ToneSchedule};
use utau_ports::pitch::{CaptureClock, CaptureError, PitchSource};
use utau_ports::types::{DeviceId, Micros};

/// MIDI pitch of the probe tone (A4, 440 Hz).
pub const CALIBRATION_PITCH: i32 = 69;

const TONE_FREQUENCY_HZ: f32 = 440.0;
const BURST_COUNT: u32 = 10;
const LEAD_IN: Micros = 2_000_000;
const PERIOD: Micros = 1_000_000;
const BURST: Micros = 100_000;

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("no probe tone observations captured")]
    NoObservations,
    #[error("tone playback failed: {0}")]
    Audio(#[from] AudioError),
    #[error("pitch capture failed: {0}")]
    Capture(#[from] CaptureError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencyEstimate {
    pub mean: Micros,
    pub std_dev: Micros,
}

/// Play the probe schedule and estimate the capture-path latency. The tone
/// handle is closed before returning, also on the error paths.
pub fn measure_latency(
    tones: &dyn ToneOutputPort,
    device: Option<&DeviceId>,
    source: &mut dyn PitchSource,
    capture: &dyn CaptureClock,
) -> Result<LatencyEstimate, CalibrationError> {
    let schedule = ToneSchedule {
        lead_in: LEAD_IN,
        count: BURST_COUNT,
        period: PERIOD,
        burst: BURST,
        frequency_hz: TONE_FREQUENCY_HZ,
    };

    let handle = tones.play_schedule(device, schedule)?;
    let base = capture.now() + LEAD_IN;
    let samples = collect_samples(source, capture, base);
    handle.close();

    let samples = samples?;
    if samples.is_empty() {
        return Err(CalibrationError::NoObservations);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    Ok(LatencyEstimate {
        mean: mean.round() as Micros,
        std_dev: variance.sqrt().round() as Micros,
    })
}

/// One latency sample per burst: the first fresh detection of the probe's
/// pitch class inside a burst's period, offset from that burst's scheduled
/// start. Stops after the last burst or a one-second grace past it.
fn collect_samples(
    source: &mut dyn PitchSource,
    capture: &dyn CaptureClock,
    base: Micros,
) -> Result<Vec<Micros>, CaptureError> {
    let deadline = base + i64::from(BURST_COUNT) * PERIOD + 1_000_000;
    let mut samples = Vec::with_capacity(BURST_COUNT as usize);
    let mut last_capture_time: Option<Micros> = None;
    let mut prev_index: i64 = -1;

    while capture.now() < deadline {
        let obs = source.next_observation()?;

        let duplicate = last_capture_time == Some(obs.capture_time);
        last_capture_time = Some(obs.capture_time);

        let Some(pitch) = obs.pitch else {
            continue;
        };
        // Octave-agnostic: the capture path may hear a harmonic.
        if duplicate || pitch.rem_euclid(12) != CALIBRATION_PITCH % 12 {
            continue;
        }

        let heard_at = obs.capture_time - obs.buffer_duration - base;
        let index = heard_at.div_euclid(PERIOD);

        if (0..i64::from(BURST_COUNT)).contains(&index) && index != prev_index {
            samples.push(heard_at - index * PERIOD);
            prev_index = index;
        }
        if samples.len() == BURST_COUNT as usize || index >= i64::from(BURST_COUNT) {
            break;
        }
    }

    Ok(samples)
}

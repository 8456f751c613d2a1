use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::mpsc;
use std::thread;
use utau_ports::audio::{AudioError, ToneOutputPort, ToneSchedule, ToneScheduleHandle};
use utau_ports::types::{AudioOutputDevice, DeviceId};

const AMPLITUDE: f32 = 0.3;

pub struct CpalToneOutput {
    host: cpal::Host,
}

impl CpalToneOutput {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn with_host(host: cpal::Host) -> Self {
        Self { host }
    }

    fn list_devices_from_host(
        host: &cpal::Host,
    ) -> Result<Vec<(DeviceId, cpal::Device)>, AudioError> {
        let host_id = format!("{:?}", host.id());
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let mut list = Vec::new();
        for (index, device) in devices.enumerate() {
            let name = device
                .name()
                .unwrap_or_else(|_| "Unknown Output".to_string());
            let id = DeviceId(format!("cpal:{}:{}:{}", host_id, index, name));
            list.push((id, device));
        }

        Ok(list)
    }
}

impl Default for CpalToneOutput {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CpalToneHandle {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl ToneScheduleHandle for CpalToneHandle {
    fn close(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl ToneOutputPort for CpalToneOutput {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        let devices = Self::list_devices_from_host(&self.host)?;
        let mut results = Vec::new();

        for (id, device) in devices {
            let name = device
                .name()
                .unwrap_or_else(|_| "Unknown Output".to_string());
            results.push(AudioOutputDevice { id, name });
        }

        Ok(results)
    }

    fn play_schedule(
        &self,
        device_id: Option<&DeviceId>,
        schedule: ToneSchedule,
    ) -> Result<Box<dyn ToneScheduleHandle>, AudioError> {
        let device_id = device_id.cloned();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel();

        let join_handle = thread::spawn(move || {
            let host = cpal::default_host();
            let device = match device_id {
                Some(id) => {
                    let devices = match Self::list_devices_from_host(&host) {
                        Ok(list) => list,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    match devices.into_iter().find(|(device_id, _)| device_id == &id) {
                        Some((_, device)) => device,
                        None => {
                            let _ = ready_tx.send(Err(AudioError::DeviceNotFound(id.to_string())));
                            return;
                        }
                    }
                }
                None => match host.default_output_device() {
                    Some(device) => device,
                    None => {
                        let _ = ready_tx.send(Err(AudioError::DeviceNotFound(
                            "default output".to_string(),
                        )));
                        return;
                    }
                },
            };

            let default_config = match device.default_output_config() {
                Ok(config) => config,
                Err(err) => {
                    let _ = ready_tx.send(Err(AudioError::DeviceUnavailable(err.to_string())));
                    return;
                }
            };

            let sample_format = default_config.sample_format();
            let config: cpal::StreamConfig = default_config.into();
            let channels = config.channels as usize;
            let mut renderer = ToneRenderer::new(schedule, config.sample_rate.0);

            let error_callback = |err| {
                eprintln!("cpal stream error: {}", err);
            };

            let stream = match sample_format {
                SampleFormat::F32 => device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let sample = renderer.next_sample();
                            frame.fill(sample);
                        }
                    },
                    error_callback,
                    None,
                ),
                SampleFormat::I16 => device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                        for frame in data.chunks_mut(channels) {
                            let sample = f32_to_i16(renderer.next_sample());
                            frame.fill(sample);
                        }
                    },
                    error_callback,
                    None,
                ),
                other => {
                    let _ = ready_tx.send(Err(AudioError::UnsupportedConfig(format!(
                        "sample format {:?}",
                        other
                    ))));
                    return;
                }
            };

            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                    return;
                }
            };

            if let Err(err) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))?
        {
            Ok(()) => Ok(Box::new(CpalToneHandle {
                stop_tx,
                join_handle: Some(join_handle),
            })),
            Err(err) => Err(err),
        }
    }
}

/// Mono sine renderer gated by the burst schedule. The phase runs
/// continuously so the bursts stay phase-aligned with each other.
struct ToneRenderer {
    schedule: ToneSchedule,
    step_us: f64,
    t_us: f64,
    phase: f32,
    phase_step: f32,
}

impl ToneRenderer {
    fn new(schedule: ToneSchedule, sample_rate_hz: u32) -> Self {
        Self {
            schedule,
            step_us: 1_000_000.0 / f64::from(sample_rate_hz),
            t_us: 0.0,
            phase: 0.0,
            phase_step: std::f32::consts::TAU * schedule.frequency_hz / sample_rate_hz as f32,
        }
    }

    fn gate(&self) -> bool {
        let t = self.t_us as i64 - self.schedule.lead_in;
        if t < 0 {
            return false;
        }
        let index = t.div_euclid(self.schedule.period);
        index < i64::from(self.schedule.count) && t.rem_euclid(self.schedule.period) < self.schedule.burst
    }

    fn next_sample(&mut self) -> f32 {
        let sample = if self.gate() {
            AMPLITUDE * self.phase.sin()
        } else {
            0.0
        };
        self.t_us += self.step_us;
        self.phase = (self.phase + self.phase_step) % std::f32::consts::TAU;
        sample
    }
}

fn f32_to_i16(value: f32) -> i16 {
    let v = value.clamp(-1.0, 1.0);
    (v * i16::MAX as f32) as i16
}

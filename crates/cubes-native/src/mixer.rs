// ---------------- Native audio (cpal) ----------------
//
// A tiny additive mixer: each note becomes an enveloped oscillator that
// waits out its scheduled start before emitting samples.

use std::f32::consts::{FRAC_PI_4, PI, TAU};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use cubes_core::{Layer, NoteEvent, Synth, SynthRack};

const ATTACK_SEC: f32 = 0.02;
const RELEASE_SEC: f32 = 0.08;
const MASTER: f32 = 0.8;

#[derive(Clone, Copy, Debug)]
pub enum WaveKind {
    Sine,
    Square,
    Triangle,
}

#[derive(Clone)]
struct ActiveOscillator {
    amplitude: f32,
    phase: f32,     // radians
    phase_inc: f32, // radians per sample
    delay_samples: u32,
    total_samples: u32,
    samples_emitted: u32,
    attack_samples: u32,
    release_samples: u32,
    wave: WaveKind,
    left_gain: f32,
    right_gain: f32,
}

pub struct AudioState {
    sample_rate: f32,
    clock_origin: Instant,
    oscillators: Vec<ActiveOscillator>,
}

/// Handle kept alive for as long as sound should play.
pub struct Mixer {
    state: Arc<Mutex<AudioState>>,
    _stream: cpal::Stream,
}

impl Mixer {
    /// Open the default output device. `clock_origin` is the instant that
    /// note start times are measured from.
    pub fn start(clock_origin: Instant) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no default output device"))?;
        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        log::info!(
            "[audio] {} Hz, {} channels, {:?}",
            sample_rate,
            channels,
            config.sample_format()
        );

        let state = Arc::new(Mutex::new(AudioState {
            sample_rate,
            clock_origin,
            oscillators: Vec::new(),
        }));
        let err_fn = |err| log::error!("audio stream error: {err}");
        let stream_config: cpal::StreamConfig = config.clone().into();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, channels, state.clone(), err_fn)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, channels, state.clone(), err_fn)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, channels, state.clone(), err_fn)?
            }
            other => anyhow::bail!("unsupported sample format {:?}", other),
        };
        stream.play()?;
        Ok(Self {
            state,
            _stream: stream,
        })
    }

    /// One synth per layer, all feeding this mixer.
    pub fn rack(&self) -> SynthRack {
        let voice = |wave, pan| {
            Box::new(MixerSynth {
                state: Arc::clone(&self.state),
                wave,
                pan,
            }) as Box<dyn Synth>
        };
        SynthRack::default()
            .with_layer(Layer::Chord, voice(WaveKind::Triangle, -0.25))
            .with_layer(Layer::Bass, voice(WaveKind::Sine, 0.0))
            .with_layer(Layer::Melody, voice(WaveKind::Square, 0.3))
    }

    pub fn active_voices(&self) -> usize {
        self.state.lock().map(|g| g.oscillators.len()).unwrap_or(0)
    }
}

struct MixerSynth {
    state: Arc<Mutex<AudioState>>,
    wave: WaveKind,
    pan: f32, // -1 left .. 1 right
}

impl Synth for MixerSynth {
    fn play(&mut self, note: &NoteEvent) {
        let Ok(mut guard) = self.state.lock() else {
            log::error!("[audio] mixer state poisoned; dropping note {}", note.midi);
            return;
        };
        let sr = guard.sample_rate;
        let now_sec = guard.clock_origin.elapsed().as_secs_f64();
        let delay = ((note.start_time_sec - now_sec).max(0.0) as f32 * sr) as u32;
        let total = ((note.duration_sec + RELEASE_SEC) * sr) as u32;
        // equal-power pan
        let angle = (self.pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        guard.oscillators.push(ActiveOscillator {
            amplitude: note.velocity.min(1.0),
            phase: 0.0,
            phase_inc: TAU * note.frequency_hz / sr,
            delay_samples: delay,
            total_samples: total.max(1),
            samples_emitted: 0,
            attack_samples: ((ATTACK_SEC * sr) as u32).min(total),
            release_samples: ((RELEASE_SEC * sr) as u32).min(total),
            wave: self.wave,
            left_gain: angle.cos(),
            right_gain: angle.sin(),
        });
    }
}

fn render_wave_sample(phase: f32, wave: WaveKind) -> f32 {
    match wave {
        WaveKind::Sine => phase.sin(),
        WaveKind::Square => {
            if phase < PI {
                0.6
            } else {
                -0.6
            }
        }
        WaveKind::Triangle => {
            let t = phase / TAU;
            1.0 - 4.0 * (t - 0.5).abs()
        }
    }
}

fn mix_sample_stereo(oscillators: &mut Vec<ActiveOscillator>) -> (f32, f32) {
    let mut left = 0.0f32;
    let mut right = 0.0f32;
    let mut i = 0usize;
    while i < oscillators.len() {
        let osc = &mut oscillators[i];
        if osc.delay_samples > 0 {
            osc.delay_samples -= 1;
            i += 1;
            continue;
        }
        let n = osc.samples_emitted;
        let release_from = osc.total_samples.saturating_sub(osc.release_samples);
        let env = if n < osc.attack_samples {
            n as f32 / osc.attack_samples.max(1) as f32
        } else if n > release_from {
            1.0 - (n - release_from) as f32 / osc.release_samples.max(1) as f32
        } else {
            1.0
        };
        let raw = render_wave_sample(osc.phase, osc.wave) * osc.amplitude * env;
        left += raw * osc.left_gain;
        right += raw * osc.right_gain;
        osc.phase += osc.phase_inc;
        if osc.phase >= TAU {
            osc.phase -= TAU;
        }
        osc.samples_emitted += 1;
        if osc.samples_emitted >= osc.total_samples {
            oscillators.swap_remove(i);
            continue;
        }
        i += 1;
    }
    ((left * MASTER).tanh(), (right * MASTER).tanh())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    state: Arc<Mutex<AudioState>>,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let Ok(mut guard) = state.lock() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };
            let oscillators = &mut guard.oscillators;
            for frame in data.chunks_mut(channels.max(1)) {
                let (l, r) = mix_sample_stereo(oscillators);
                match frame {
                    [mono] => *mono = T::from_sample(0.5 * (l + r)),
                    [left, right, rest @ ..] => {
                        *left = T::from_sample(l);
                        *right = T::from_sample(r);
                        rest.fill(T::EQUILIBRIUM);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )
}

use cubes_core::{Layer, NoteEvent, Synth, SynthRack};
use web_sys as web;

const MASTER_GAIN: f32 = 0.6;
const ATTACK_SEC: f64 = 0.02;
const RELEASE_TAIL_SEC: f64 = 0.05;

fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    label: &str,
) -> Result<web::GainNode, ()> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(())
        }
    }
}

/// One oscillator per note, routed through a per-layer bus.
pub struct OscillatorSynth {
    audio_ctx: web::AudioContext,
    waveform: web::OscillatorType,
    bus: web::GainNode,
}

impl OscillatorSynth {
    pub fn new(
        audio_ctx: &web::AudioContext,
        waveform: web::OscillatorType,
        destination: &web::AudioNode,
        label: &str,
    ) -> Result<Self, ()> {
        let bus = create_gain(audio_ctx, 1.0, label)?;
        bus.connect_with_audio_node(destination).map_err(|e| {
            log::error!("{} bus connect error: {:?}", label, e);
        })?;
        Ok(Self {
            audio_ctx: audio_ctx.clone(),
            waveform,
            bus,
        })
    }
}

impl Synth for OscillatorSynth {
    fn play(&mut self, note: &NoteEvent) {
        let Ok(src) = web::OscillatorNode::new(&self.audio_ctx) else {
            log::error!("[audio] OscillatorNode unavailable");
            return;
        };
        src.set_type(self.waveform);
        src.frequency().set_value(note.frequency_hz);
        let Ok(g) = web::GainNode::new(&self.audio_ctx) else {
            return;
        };
        g.gain().set_value(0.0);
        // never schedule in the past
        let t0 = note.start_time_sec.max(self.audio_ctx.current_time());
        let dur = note.duration_sec as f64;
        let _ = g.gain().set_value_at_time(0.0, t0);
        let _ = g
            .gain()
            .linear_ramp_to_value_at_time(note.velocity, t0 + ATTACK_SEC);
        let _ = g.gain().linear_ramp_to_value_at_time(0.0, t0 + dur);
        let _ = src.connect_with_audio_node(&g);
        let _ = g.connect_with_audio_node(&self.bus);
        let _ = src.start_with_when(t0);
        let _ = src.stop_with_when(t0 + dur + RELEASE_TAIL_SEC);
    }
}

/// Master gain plus one oscillator synth per layer. A layer that fails to
/// build is left out of the rack and its notes are skipped.
pub fn build_rack(audio_ctx: &web::AudioContext) -> Result<SynthRack, ()> {
    let master = create_gain(audio_ctx, MASTER_GAIN, "Master")?;
    master
        .connect_with_audio_node(&audio_ctx.destination())
        .map_err(|e| log::error!("Master connect error: {:?}", e))?;

    let mut rack = SynthRack::default();
    let layers = [
        (Layer::Chord, web::OscillatorType::Triangle),
        (Layer::Bass, web::OscillatorType::Sine),
        (Layer::Melody, web::OscillatorType::Square),
    ];
    for (layer, waveform) in layers {
        match OscillatorSynth::new(audio_ctx, waveform, &master, layer.name()) {
            Ok(synth) => rack.set_layer(layer, Some(Box::new(synth))),
            Err(()) => log::warn!("[audio] {} layer disabled", layer.name()),
        }
    }
    Ok(rack)
}

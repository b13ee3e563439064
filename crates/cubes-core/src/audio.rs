//! Pitch selection for the chord-bed, bass and melody layers, and the synth
//! seam the frontends implement.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    AUDITION_CHORD_GAIN, AUDITION_DURATION_SEC, BASS_BASE, BASS_GAIN, BASS_RANGE, CHORD_BED_BASE,
    CHORD_GAIN, DEFAULT_BPM, MAX_BPM, MELODY_BASE, MELODY_GAIN, MELODY_RANGE, MIN_BPM,
    NOTE_DURATION_SEC,
};
use crate::music::{midi_to_hz, tones_for, voice_lead, wrap_into, ChordTones, Key, VoiceLeadingMode};
use crate::voicing::{face_order, Face, Inversion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Chord,
    Bass,
    Melody,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Chord, Layer::Bass, Layer::Melody];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Chord => "chord",
            Layer::Bass => "bass",
            Layer::Melody => "melody",
        }
    }
}

/// A scheduled note for one synth layer.
///
/// - `start_time_sec` is on the caller's clock (AudioContext time on the web)
/// - `velocity` is the relative gain of the layer
#[derive(Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub layer: Layer,
    pub midi: i32,
    pub frequency_hz: f32,
    pub velocity: f32,
    pub start_time_sec: f64,
    pub duration_sec: f32,
}

impl NoteEvent {
    pub fn new(layer: Layer, midi: i32, velocity: f32, start_time_sec: f64, duration_sec: f32) -> Self {
        Self {
            layer,
            midi,
            frequency_hz: midi_to_hz(midi as f32),
            velocity,
            start_time_sec,
            duration_sec,
        }
    }
}

/// One playable instrument voice.
pub trait Synth {
    fn play(&mut self, note: &NoteEvent);
}

/// The three layer instruments. Any of them may be missing.
#[derive(Default)]
pub struct SynthRack {
    chord: Option<Box<dyn Synth>>,
    bass: Option<Box<dyn Synth>>,
    melody: Option<Box<dyn Synth>>,
}

impl SynthRack {
    pub fn with_layer(mut self, layer: Layer, synth: Box<dyn Synth>) -> Self {
        self.set_layer(layer, Some(synth));
        self
    }

    pub fn set_layer(&mut self, layer: Layer, synth: Option<Box<dyn Synth>>) {
        *self.slot(layer) = synth;
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        match layer {
            Layer::Chord => self.chord.is_some(),
            Layer::Bass => self.bass.is_some(),
            Layer::Melody => self.melody.is_some(),
        }
    }

    fn slot(&mut self, layer: Layer) -> &mut Option<Box<dyn Synth>> {
        match layer {
            Layer::Chord => &mut self.chord,
            Layer::Bass => &mut self.bass,
            Layer::Melody => &mut self.melody,
        }
    }

    /// Route each event to its layer; events for a missing layer are skipped.
    /// Returns how many notes were played.
    pub fn dispatch(&mut self, events: &[NoteEvent]) -> usize {
        let mut played = 0;
        let mut warned: SmallVec<[Layer; 3]> = SmallVec::new();
        for ev in events {
            match self.slot(ev.layer) {
                Some(synth) => {
                    synth.play(ev);
                    played += 1;
                }
                None if !warned.contains(&ev.layer) => {
                    log::warn!("[audio] {} layer unavailable; skipping", ev.layer.name());
                    warned.push(ev.layer);
                }
                None => {}
            }
        }
        played
    }
}

/// User-facing playback controls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub key: Key,
    pub bpm: f32,
    pub include_seventh: bool,
    pub chord_enabled: bool,
    pub bass_enabled: bool,
    pub melody_enabled: bool,
    pub voice_leading: VoiceLeadingMode,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            key: Key::C,
            bpm: DEFAULT_BPM,
            include_seventh: false,
            chord_enabled: true,
            bass_enabled: true,
            melody_enabled: false,
            voice_leading: VoiceLeadingMode::NearestOctave,
        }
    }
}

impl PlaybackSettings {
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// One chord per beat.
    pub fn chord_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm.clamp(MIN_BPM, MAX_BPM) as f64
    }
}

/// Last pitches played on the voice-led layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceLeadingState {
    pub last_bass: Option<i32>,
    pub last_melody: Option<i32>,
}

/// Register-locked chord bed: the first three (or four) tones in `[60, 71]`, ascending.
pub fn chord_bed(tones: &ChordTones, include_seventh: bool) -> SmallVec<[i32; 4]> {
    let count = if include_seventh { 4 } else { 3 };
    let mut bed: SmallVec<[i32; 4]> = tones.pitch_classes[..count]
        .iter()
        .map(|pc| CHORD_BED_BASE + pc.rem_euclid(12))
        .collect();
    bed.sort_unstable();
    bed
}

fn root_anchored(tones: &ChordTones, tone_index: usize, base: i32) -> i32 {
    let root = tones.root_pc();
    let diff = (tones.pitch_classes[tone_index] - root).rem_euclid(12);
    base + root + diff
}

/// Bottom-face tone in the bass register, before voice leading.
pub fn bass_target(tones: &ChordTones, inversion: Inversion, include_seventh: bool) -> i32 {
    let bottom = face_order(inversion, include_seventh)[0];
    wrap_into(root_anchored(tones, bottom, BASS_BASE), BASS_RANGE)
}

/// Top-face tone in the melody register, before voice leading.
pub fn melody_target(tones: &ChordTones, inversion: Inversion, include_seventh: bool) -> i32 {
    let top = face_order(inversion, include_seventh)[2];
    wrap_into(root_anchored(tones, top, MELODY_BASE), MELODY_RANGE)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Voicing {
    pub tones: ChordTones,
    pub bed: SmallVec<[i32; 4]>,
    pub bass: i32,
    pub melody: i32,
}

#[derive(Debug, Default)]
pub struct AudioEngine {
    pub settings: PlaybackSettings,
    pub leading: VoiceLeadingState,
    locked_bass: Option<Vec<i32>>,
    locked_melody: Option<Vec<i32>>,
}

impl AudioEngine {
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn voicing(&self, symbol: &str, inversion: Inversion) -> Voicing {
        let tones = tones_for(symbol, self.settings.key);
        let seventh = self.settings.include_seventh;
        Voicing {
            bed: chord_bed(&tones, seventh),
            bass: bass_target(&tones, inversion, seventh),
            melody: melody_target(&tones, inversion, seventh),
            tones,
        }
    }

    fn lead(&self, target: i32, reference: Option<i32>, range: (i32, i32)) -> i32 {
        voice_lead(wrap_into(target, range), reference, self.settings.voice_leading)
    }

    /// Emit the full voicing of a chord. `lineup_index` selects a locked line
    /// entry when one exists.
    pub fn play_chord(
        &mut self,
        symbol: &str,
        inversion: Inversion,
        lineup_index: Option<usize>,
        start_sec: f64,
        out: &mut Vec<NoteEvent>,
    ) {
        let v = self.voicing(symbol, inversion);
        if self.settings.chord_enabled {
            for &m in &v.bed {
                out.push(NoteEvent::new(Layer::Chord, m, CHORD_GAIN, start_sec, NOTE_DURATION_SEC));
            }
        }
        if self.settings.bass_enabled {
            let target = locked_at(&self.locked_bass, lineup_index).unwrap_or(v.bass);
            let midi = self.lead(target, self.leading.last_bass, BASS_RANGE);
            out.push(NoteEvent::new(Layer::Bass, midi, BASS_GAIN, start_sec, NOTE_DURATION_SEC));
            self.leading.last_bass = Some(midi);
        }
        if self.settings.melody_enabled {
            let target = locked_at(&self.locked_melody, lineup_index).unwrap_or(v.melody);
            let midi = self.lead(target, self.leading.last_melody, MELODY_RANGE);
            out.push(NoteEvent::new(Layer::Melody, midi, MELODY_GAIN, start_sec, NOTE_DURATION_SEC));
            self.leading.last_melody = Some(midi);
        }
    }

    /// Audition the voice shown on one face of a cube.
    pub fn play_face(
        &mut self,
        symbol: &str,
        inversion: Inversion,
        face: Face,
        start_sec: f64,
        out: &mut Vec<NoteEvent>,
    ) {
        let v = self.voicing(symbol, inversion);
        let order = face_order(inversion, self.settings.include_seventh);
        match face {
            Face::Bottom => {
                let midi = self.lead(v.bass, self.leading.last_bass, BASS_RANGE);
                out.push(NoteEvent::new(Layer::Bass, midi, BASS_GAIN, start_sec, AUDITION_DURATION_SEC));
                self.leading.last_bass = Some(midi);
            }
            Face::Top => {
                let midi = self.lead(v.melody, self.leading.last_melody, MELODY_RANGE);
                out.push(NoteEvent::new(Layer::Melody, midi, MELODY_GAIN, start_sec, AUDITION_DURATION_SEC));
                self.leading.last_melody = Some(midi);
            }
            Face::Left | Face::Right => {
                let slot = if face == Face::Left { 3 } else { 1 };
                // the left face is the seventh; silent for triads
                let Some(&tone) = order.get(slot) else {
                    log::debug!("[audio] {} has no seventh face voiced", symbol);
                    return;
                };
                let midi = CHORD_BED_BASE + v.tones.pitch_classes[tone];
                out.push(NoteEvent::new(
                    Layer::Chord,
                    midi,
                    AUDITION_CHORD_GAIN,
                    start_sec,
                    AUDITION_DURATION_SEC,
                ));
            }
            Face::Front | Face::Back => self.play_chord(symbol, inversion, None, start_sec, out),
        }
    }

    /// Snapshot the current bass of each lineup member, in order.
    pub fn lock_bass<'a>(&mut self, members: impl IntoIterator<Item = (&'a str, Inversion)>) -> usize {
        let line: Vec<i32> = members
            .into_iter()
            .map(|(symbol, inv)| self.voicing(symbol, inv).bass)
            .collect();
        let n = line.len();
        log::info!("[audio] locked bass line of {} notes", n);
        self.locked_bass = Some(line);
        n
    }

    pub fn lock_melody<'a>(&mut self, members: impl IntoIterator<Item = (&'a str, Inversion)>) -> usize {
        let line: Vec<i32> = members
            .into_iter()
            .map(|(symbol, inv)| self.voicing(symbol, inv).melody)
            .collect();
        let n = line.len();
        log::info!("[audio] locked melody line of {} notes", n);
        self.locked_melody = Some(line);
        n
    }

    pub fn unlock_bass(&mut self) {
        self.locked_bass = None;
    }

    pub fn unlock_melody(&mut self) {
        self.locked_melody = None;
    }

    pub fn locked_bass(&self) -> Option<&[i32]> {
        self.locked_bass.as_deref()
    }

    pub fn locked_melody(&self) -> Option<&[i32]> {
        self.locked_melody.as_deref()
    }

    pub fn reset(&mut self) {
        self.leading = VoiceLeadingState::default();
        self.locked_bass = None;
        self.locked_melody = None;
    }
}

fn locked_at(line: &Option<Vec<i32>>, index: Option<usize>) -> Option<i32> {
    line.as_ref()?.get(index?).copied()
}

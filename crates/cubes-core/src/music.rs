use serde::{Deserialize, Serialize};

use crate::error::{CubesError, Result};

/// Tonal centre used to transpose the C-based chord table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    #[default]
    C,
    Db,
    D,
    Eb,
    E,
    F,
    #[serde(rename = "F#", alias = "Gb")]
    FSharp,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::C,
        Key::Db,
        Key::D,
        Key::Eb,
        Key::E,
        Key::F,
        Key::FSharp,
        Key::G,
        Key::Ab,
        Key::A,
        Key::Bb,
        Key::B,
    ];

    /// Semitones above C.
    pub fn offset(self) -> i32 {
        match self {
            Key::C => 0,
            Key::Db => 1,
            Key::D => 2,
            Key::Eb => 3,
            Key::E => 4,
            Key::F => 5,
            Key::FSharp => 6,
            Key::G => 7,
            Key::Ab => 8,
            Key::A => 9,
            Key::Bb => 10,
            Key::B => 11,
        }
    }

    /// Sharp keys spell transposed tones with sharps, all others with flats.
    pub fn prefers_sharps(self) -> bool {
        matches!(
            self,
            Key::G | Key::D | Key::A | Key::E | Key::B | Key::FSharp
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::FSharp => "F#",
            other => NOTE_FLAT[other.offset() as usize],
        }
    }

    pub fn parse(name: &str) -> Option<Key> {
        match name.trim() {
            "C" | "c" => Some(Key::C),
            "Db" | "db" | "C#" => Some(Key::Db),
            "D" | "d" => Some(Key::D),
            "Eb" | "eb" => Some(Key::Eb),
            "E" | "e" => Some(Key::E),
            "F" | "f" => Some(Key::F),
            "F#" | "f#" | "Gb" | "gb" => Some(Key::FSharp),
            "G" | "g" => Some(Key::G),
            "Ab" | "ab" => Some(Key::Ab),
            "A" | "a" => Some(Key::A),
            "Bb" | "bb" => Some(Key::Bb),
            "B" | "b" => Some(Key::B),
            _ => None,
        }
    }
}

/// Chord family; each shelf palette shows one family (or all of them).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Major,
    Minor,
    Applied,
    All,
}

impl Palette {
    pub fn contains(self, family: Palette) -> bool {
        self == Palette::All || self == family
    }
}

/// How bass and melody octaves follow the previously played pitch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceLeadingMode {
    /// Snap to the octave nearest the reference.
    #[default]
    NearestOctave,
    /// Search two octaves either side for the smallest semitone distance.
    BoundedSearch,
}

#[derive(Clone, Copy, Debug)]
pub struct ChordSpec {
    pub symbol: &'static str,
    pub family: Palette,
    /// Root, third, fifth, seventh (or colour tone) spelled in C.
    pub tones_in_c: [&'static str; 4],
    /// Scale-degree labels matching `tones_in_c`.
    pub degrees: [&'static str; 4],
}

const fn chord(
    symbol: &'static str,
    family: Palette,
    tones_in_c: [&'static str; 4],
    degrees: [&'static str; 4],
) -> ChordSpec {
    ChordSpec {
        symbol,
        family,
        tones_in_c,
        degrees,
    }
}

use Palette::{Applied, Major, Minor};

pub const CHORDS: &[ChordSpec] = &[
    chord("I", Major, ["C", "E", "G", "B"], ["1", "3", "5", "7"]),
    chord("ii", Major, ["D", "F", "A", "C"], ["2", "4", "6", "1"]),
    chord("iii", Major, ["E", "G", "B", "D"], ["3", "5", "7", "2"]),
    chord("IV", Major, ["F", "A", "C", "E"], ["4", "6", "1", "3"]),
    chord("V", Major, ["G", "B", "D", "F"], ["5", "7", "2", "4"]),
    chord("vi", Major, ["A", "C", "E", "G"], ["6", "1", "3", "5"]),
    chord("viiø", Major, ["B", "D", "F", "A"], ["7", "2", "4", "6"]),
    chord("i", Minor, ["C", "Eb", "G", "Bb"], ["1", "b3", "5", "b7"]),
    chord("iiø", Minor, ["D", "F", "Ab", "C"], ["2", "4", "b6", "1"]),
    chord("bIII", Minor, ["Eb", "G", "Bb", "D"], ["b3", "5", "b7", "2"]),
    chord("iv", Minor, ["F", "Ab", "C", "Eb"], ["4", "b6", "1", "b3"]),
    chord("v", Minor, ["G", "Bb", "D", "F"], ["5", "b7", "2", "4"]),
    chord("bVI", Minor, ["Ab", "C", "Eb", "G"], ["b6", "1", "b3", "5"]),
    chord("bVII", Minor, ["Bb", "D", "F", "Ab"], ["b7", "2", "4", "b6"]),
    chord("V(7)(b9)", Minor, ["G", "B", "D", "Ab"], ["5", "7", "2", "b2"]),
    chord("viiº7", Minor, ["B", "D", "F", "Ab"], ["7", "2", "4", "b6"]),
    chord("i7", Minor, ["C", "Eb", "G", "Bb"], ["1", "b3", "5", "b7"]),
    chord("I7", Applied, ["C", "E", "G", "Bb"], ["1", "3", "5", "b7"]),
    chord("iiiø", Applied, ["E", "G", "Bb", "D"], ["3", "5", "b7", "2"]),
    chord("II(7)", Applied, ["D", "F#", "A", "C"], ["2", "#4", "6", "1"]),
    chord("II", Applied, ["D", "F#", "A", "C#"], ["2", "#4", "6", "#1"]),
    chord("#ivø", Applied, ["F#", "A", "C", "E"], ["#4", "6", "1", "3"]),
    chord("III(7)", Applied, ["E", "G#", "B", "D"], ["3", "#5", "7", "2"]),
    chord("#vº", Applied, ["G#", "B", "D", "F"], ["#5", "7", "2", "4"]),
    chord("VI(7)", Applied, ["A", "C#", "E", "G"], ["6", "#1", "3", "5"]),
    chord("#iº", Applied, ["C#", "E", "G", "Bb"], ["#1", "3", "5", "b7"]),
    chord("VII(7)", Applied, ["B", "D#", "F#", "A"], ["7", "#2", "#4", "6"]),
    chord("VII", Applied, ["B", "D#", "F#", "A#"], ["7", "#2", "#4", "#6"]),
    chord("#iiº", Applied, ["D#", "F#", "A", "C"], ["#2", "#4", "6", "1"]),
];

/// Symbol substituted when a lookup fails; its tones are the C major seventh.
pub const FALLBACK_SYMBOL: &str = "I";

const NOTE_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch class (0..12) of a spelled note name such as `"F#"` or `"Bb"`.
pub fn pitch_class(name: &str) -> Option<i32> {
    let pc = match name {
        "C" | "B#" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" | "Fb" => 4,
        "F" | "E#" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" | "Cb" => 11,
        _ => return None,
    };
    Some(pc)
}

/// Canonical spelling of a user- or config-supplied symbol.
///
/// Accepts the usual typographic variants: `°`/`o` for diminished,
/// `Ø` for half-diminished and the unicode accidentals.
pub fn normalize_symbol(raw: &str) -> String {
    let mut s: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '°' | '˚' => 'º',
            'Ø' => 'ø',
            '♭' => 'b',
            '♯' => '#',
            other => other,
        })
        .collect();
    // "#vo", "viio7": a trailing o after the numeral means diminished
    for suffix in ["o7", "o"] {
        if let Some(stem) = s.strip_suffix(suffix) {
            if stem.ends_with(|c: char| matches!(c, 'i' | 'v' | 'I' | 'V')) {
                s = format!("{stem}º{}", &suffix[1..]);
                break;
            }
        }
    }
    s
}

/// Strict lookup after alias normalization.
pub fn lookup(symbol: &str) -> Result<&'static ChordSpec> {
    let normalized = normalize_symbol(symbol);
    CHORDS
        .iter()
        .find(|c| c.symbol == normalized)
        .ok_or(CubesError::UnknownSymbol(symbol.to_string()))
}

/// Tones of a chord resolved in a key.
#[derive(Clone, Debug, PartialEq)]
pub struct ChordTones {
    pub symbol: &'static str,
    pub names: [&'static str; 4],
    pub pitch_classes: [i32; 4],
    pub degrees: [&'static str; 4],
    /// Set when the requested symbol was unknown and the fallback was used.
    pub fallback: bool,
}

impl ChordTones {
    pub fn root_pc(&self) -> i32 {
        self.pitch_classes[0]
    }
}

/// Resolve a symbol to spelled tones in `key`, never failing.
pub fn tones_for(symbol: &str, key: Key) -> ChordTones {
    let (spec, fallback) = match lookup(symbol) {
        Ok(spec) => (spec, false),
        Err(_) => {
            log::warn!("[music] unknown symbol {:?}; using {}", symbol, FALLBACK_SYMBOL);
            (&CHORDS[0], true)
        }
    };
    let spelling = if key.prefers_sharps() {
        &NOTE_SHARP
    } else {
        &NOTE_FLAT
    };
    let mut names = [""; 4];
    let mut pitch_classes = [0; 4];
    for (i, tone) in spec.tones_in_c.iter().enumerate() {
        let pc = (pitch_class(tone).unwrap_or(0) + key.offset()).rem_euclid(12);
        pitch_classes[i] = pc;
        names[i] = spelling[pc as usize];
    }
    ChordTones {
        symbol: spec.symbol,
        names,
        pitch_classes,
        degrees: spec.degrees,
        fallback,
    }
}

pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}

/// Octave of `target` nearest `reference`; exact half-octave ties move up.
pub fn nearest_octave(target: i32, reference: Option<i32>) -> i32 {
    match reference {
        Some(r) => target + 12 * (r - target + 6).div_euclid(12),
        None => target,
    }
}

/// Closest of `target ± 0..=2` octaves to `reference`; the lowest candidate wins ties.
pub fn bounded_octave_search(target: i32, reference: Option<i32>) -> i32 {
    let Some(r) = reference else {
        return target;
    };
    let mut best = target;
    let mut best_dist = i32::MAX;
    for octave in -2..=2 {
        let candidate = target + octave * 12;
        let dist = (candidate - r).abs();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

pub fn voice_lead(target: i32, reference: Option<i32>, mode: VoiceLeadingMode) -> i32 {
    match mode {
        VoiceLeadingMode::NearestOctave => nearest_octave(target, reference),
        VoiceLeadingMode::BoundedSearch => bounded_octave_search(target, reference),
    }
}

/// Shift by whole octaves until `midi` lies in `[lo, hi]`.
pub fn wrap_into(mut midi: i32, (lo, hi): (i32, i32)) -> i32 {
    while midi > hi {
        midi -= 12;
    }
    while midi < lo {
        midi += 12;
    }
    midi
}

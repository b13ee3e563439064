pub mod arrangement;
pub mod audio;
pub mod camera;
pub mod collision;
pub mod constants;
pub mod drag;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod music;
pub mod picking;
pub mod sequence;
pub mod shelf;
pub mod stage;
pub mod tween;
pub mod voicing;

pub use arrangement::{Arrangement, ArrangementState, ChordObject, Membership, ObjectId, Transform};
pub use audio::{AudioEngine, Layer, NoteEvent, PlaybackSettings, Synth, SynthRack};
pub use error::{CubesError, Result};
pub use music::{Key, Palette, VoiceLeadingMode};
pub use shelf::ShelfMap;
pub use stage::{Stage, StageConfig, StageEvent};
pub use voicing::{Face, Inversion};

// Shared layout, gesture and audio tuning constants used by both web and native frontends.

// Scene layout
pub const GRID_SIZE: f32 = 1.4; // lineup slot spacing along x
pub const CUBE_SIZE: f32 = 1.2; // cube edge length at scale 1.0
pub const FRONT_ROW_SCALE: f32 = 1.0; // lineup members normalize to this scale
pub const FRONT_ROW_FORWARD_Z: f32 = 1.2; // deepest pulled-forward z while dragging
pub const SHELF_Z: f32 = -4.2; // depth of every shelf anchor
pub const SHELF_Y: f32 = 1.6; // shelf anchors are authored relative to this height
pub const X_LIMIT: f32 = 8.0; // |x| bound for dragged and pushed objects

// Gesture classification
pub const DRAG_START_PX: f32 = 8.0; // movement before a press becomes a drag
pub const CLICK_MAX_PX: f32 = 5.0; // max movement for a click
pub const CLICK_MAX_MS: f64 = 250.0; // max press duration for a click
pub const FLICK_MAX_MS: f64 = 240.0; // flick must release faster than this
pub const FLICK_MIN_PX: f32 = 42.0; // and travel at least this far shelf-ward (up)
pub const DRAG_Z_PER_PX: f32 = 0.012; // vertical pointer px -> world z
pub const DRAG_SMOOTH_TAU_MS: f32 = 50.0; // catch-up time constant for dragged objects
pub const SHELF_CLICK_DEADZONE: f32 = 0.10; // centre area of a shelf face that keeps root position

// Drag progress thresholds (0 = shelf depth, 1 = front row)
pub const REPULSION_START_T: f32 = 0.4; // collision resolver runs above this
pub const MAKE_WAY_START_T: f32 = 0.6; // lineup opens a gap above this

// Collision resolver
pub const REPULSION_K: f32 = 0.08; // impulse strength
pub const MIN_DIST_FACTOR: f32 = 0.9; // min planar distance as a fraction of GRID_SIZE
pub const VELOCITY_DAMPING: f32 = 0.85; // per-frame velocity retention
pub const POSITION_FOLLOW: f32 = 0.5; // lerp toward the integrated position
pub const Y_SETTLE: f32 = 0.4; // per-frame lerp of pushed objects back to y = 0
pub const ACTIVE_Z_MARGIN: f32 = 0.6; // extra depth beyond FRONT_ROW_FORWARD_Z still counted active

// Tween durations
pub const REFLOW_MS: f64 = 400.0;
pub const MAKE_WAY_MS: f64 = 250.0;
pub const FLY_IN_MS: f64 = 520.0;
pub const ROTATE_MS: f64 = 650.0;

// Audio registers (MIDI)
pub const CHORD_BED_BASE: i32 = 60; // C4; bed occupies [60, 71]
pub const BASS_BASE: i32 = 36; // C2
pub const BASS_RANGE: (i32, i32) = (36, 55);
pub const MELODY_BASE: i32 = 72; // C5
pub const MELODY_RANGE: (i32, i32) = (60, 84);

// Audio levels and timing
pub const CHORD_GAIN: f32 = 0.18;
pub const BASS_GAIN: f32 = 0.34;
pub const MELODY_GAIN: f32 = 0.3;
pub const AUDITION_CHORD_GAIN: f32 = 0.22; // single bed note from a side-face click
pub const NOTE_DURATION_SEC: f32 = 1.1;
pub const AUDITION_DURATION_SEC: f32 = 0.45;
pub const PLAY_LEAD_SEC: f64 = 0.02; // schedule slightly ahead of "now"

// Sequence tempo (one chord per beat)
pub const DEFAULT_BPM: f32 = 60.0;
pub const MIN_BPM: f32 = 10.0;
pub const MAX_BPM: f32 = 240.0;

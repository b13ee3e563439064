//! Inversion state of a chord cube and the face/tone assignments derived from it.

use glam::Vec2;
use smallvec::SmallVec;

use crate::constants::SHELF_CLICK_DEADZONE;

/// Which of the four chord tones sits on the bottom face. Always in `0..4`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Inversion(u8);

impl Inversion {
    pub const ROOT: Inversion = Inversion(0);

    pub fn new(index: i32) -> Self {
        Inversion(index.rem_euclid(4) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Rotate by signed quarter turns; positive is clockwise.
    pub fn rotate(self, quarter_turns: i32) -> Self {
        Inversion::new(self.0 as i32 + quarter_turns)
    }

    /// Minimal signed quarter turns reaching `target`; a half turn goes clockwise.
    pub fn quarter_turns_to(self, target: Inversion) -> i32 {
        let cw = (target.0 as i32 - self.0 as i32).rem_euclid(4);
        let ccw = (self.0 as i32 - target.0 as i32).rem_euclid(4);
        if cw <= ccw {
            cw
        } else {
            -ccw
        }
    }
}

/// Chord-tone index shown on each face for a given inversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceOrder {
    pub bottom: usize,
    pub right: usize,
    pub top: usize,
    pub left: usize,
}

impl FaceOrder {
    pub fn new(inversion: Inversion) -> Self {
        let r = inversion.index();
        Self {
            bottom: r,
            right: (r + 1) % 4,
            top: (r + 2) % 4,
            left: (r + 3) % 4,
        }
    }
}

/// Chord-tone indices voiced by the faces of a cube, bottom first.
///
/// With sevenths this is {bottom, right, top, left}. Triads read the fourth
/// tone as a repeated root and keep three distinct tones: bottom, then the
/// next new tones going round right, top, left. Entry 0 is the bass tone,
/// entry 1 the right-hand chord tone and entry 2 the melody tone; a fourth
/// entry (the left face) exists only with sevenths.
pub fn face_order(inversion: Inversion, include_seventh: bool) -> SmallVec<[usize; 4]> {
    let f = FaceOrder::new(inversion);
    let faces = [f.bottom, f.right, f.top, f.left];
    if include_seventh {
        return SmallVec::from_slice(&faces);
    }
    let mut order: SmallVec<[usize; 4]> = SmallVec::new();
    for tone in faces.map(|i| if i == 3 { 0 } else { i }) {
        if !order.contains(&tone) {
            order.push(tone);
        }
    }
    order
}

/// Face of a cube hit by a pick ray, in world axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
    Top,
    Bottom,
    Left,
    Right,
}

impl Face {
    /// Classify from a local hit point normalized to `[-1, 1]` per axis.
    pub fn from_local(local: glam::Vec3) -> Face {
        let a = local.abs();
        if a.z >= a.x && a.z >= a.y {
            if local.z >= 0.0 {
                Face::Front
            } else {
                Face::Back
            }
        } else if a.y >= a.x {
            if local.y >= 0.0 {
                Face::Top
            } else {
                Face::Bottom
            }
        } else if local.x >= 0.0 {
            Face::Right
        } else {
            Face::Left
        }
    }
}

/// Target inversion for a click at `local` (x, y) on the front face.
pub fn quadrant_target(local: Vec2) -> Inversion {
    if local.x.abs() > local.y.abs() {
        Inversion::new(if local.x > 0.0 { 1 } else { 3 })
    } else {
        Inversion::new(if local.y > 0.0 { 2 } else { 0 })
    }
}

/// Quarter turns pre-applied to a clone spawned by clicking a shelf cube.
pub fn shelf_click_turns(local: Vec2) -> i32 {
    let (ax, ay) = (local.x.abs(), local.y.abs());
    if ax < SHELF_CLICK_DEADZONE && ay < SHELF_CLICK_DEADZONE {
        return 0;
    }
    if ay >= ax {
        if local.y > 0.0 {
            2
        } else {
            0
        }
    } else if local.x > 0.0 {
        1
    } else {
        -1
    }
}

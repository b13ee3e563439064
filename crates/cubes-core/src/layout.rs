//! Rest-state geometry: shelf anchors, lineup slots and the reflow that moves
//! lineup members onto their slots.

use glam::Vec3;

use crate::arrangement::{ArrangementState, Membership, ObjectId, Transform};
use crate::constants::FRONT_ROW_SCALE;
use crate::error::{CubesError, Result};
use crate::shelf::ShelfMap;
use crate::tween::{Channel, Easing, Scheduler};

const AT_REST_EPS: f32 = 1e-4;

pub fn shelf_transform_for(map: &ShelfMap, symbol: &str) -> Result<Transform> {
    map.get(symbol)
        .map(|a| Transform {
            position: a.position,
            scale: a.scale,
        })
        .ok_or_else(|| CubesError::UnknownSymbol(symbol.to_string()))
}

/// `n` slot positions centred on x = 0, `spacing` apart, on the row plane.
pub fn lineup_slots(n: usize, spacing: f32) -> Vec<Vec3> {
    let start_x = -((n as f32 - 1.0) * spacing) / 2.0;
    (0..n)
        .map(|i| Vec3::new(start_x + i as f32 * spacing, 0.0, 0.0))
        .collect()
}

/// Index of the slot (out of `n`) nearest `target_x`; the first minimum wins.
pub fn insertion_index(target_x: f32, n: usize, spacing: f32) -> usize {
    let mut best_i = 0usize;
    let mut best_dx = f32::MAX;
    for (i, slot) in lineup_slots(n, spacing).iter().enumerate() {
        let dx = (target_x - slot.x).abs();
        if dx < best_dx {
            best_dx = dx;
            best_i = i;
        }
    }
    best_i
}

/// Tween `id` to `target` at front-row scale.
///
/// Returns `false` without touching the scheduler when the object is already
/// there or already heading there, which is what makes reflow idempotent.
pub fn animate_to_slot(
    state: &mut ArrangementState,
    tweens: &mut Scheduler<ArrangementState>,
    id: ObjectId,
    target: Vec3,
    duration_ms: f64,
) -> bool {
    let Some(obj) = state.get_mut(id) else {
        return false;
    };
    let moving = tweens.is_active(id, Channel::Transform);
    if moving && obj.slot_target == Some(target) {
        return false;
    }
    if !moving
        && obj.transform.position.distance(target) < AT_REST_EPS
        && (obj.transform.scale - FRONT_ROW_SCALE).abs() < AT_REST_EPS
    {
        return false;
    }
    let from = obj.transform;
    obj.slot_target = Some(target);
    tweens.animate_then(
        id,
        Channel::Transform,
        duration_ms,
        Easing::InOutCubic,
        move |s: &mut ArrangementState, t| {
            if let Some(o) = s.get_mut(id) {
                o.transform.position = from.position.lerp(target, t);
                o.transform.scale = from.scale + (FRONT_ROW_SCALE - from.scale) * t;
            }
        },
        move |s: &mut ArrangementState| {
            if let Some(o) = s.get_mut(id) {
                o.transform = Transform {
                    position: target,
                    scale: FRONT_ROW_SCALE,
                };
                o.slot_target = None;
            }
        },
    );
    true
}

/// Move every lineup member toward its slot. Returns the number of tweens started.
pub fn reflow(
    state: &mut ArrangementState,
    tweens: &mut Scheduler<ArrangementState>,
    spacing: f32,
    duration_ms: f64,
) -> usize {
    let slots = lineup_slots(state.lineup().len(), spacing);
    let targets: Vec<(ObjectId, Vec3)> = state.lineup().iter().copied().zip(slots).collect();
    animate_all(state, tweens, &targets, duration_ms)
}

/// Lay the lineup out as a row of `len + 1` slots, leaving `gap` empty.
pub fn make_way(
    state: &mut ArrangementState,
    tweens: &mut Scheduler<ArrangementState>,
    gap: usize,
    spacing: f32,
    duration_ms: f64,
) -> usize {
    let n = state.lineup().len();
    let slots = lineup_slots(n + 1, spacing);
    let targets: Vec<(ObjectId, Vec3)> = state
        .lineup()
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, slots[if i < gap { i } else { i + 1 }]))
        .collect();
    animate_all(state, tweens, &targets, duration_ms)
}

fn animate_all(
    state: &mut ArrangementState,
    tweens: &mut Scheduler<ArrangementState>,
    targets: &[(ObjectId, Vec3)],
    duration_ms: f64,
) -> usize {
    let mut started = 0;
    for &(id, target) in targets {
        let Some(o) = state.get_mut(id) else {
            continue;
        };
        if o.membership != Membership::Lineup {
            continue;
        }
        // repulsion left over from a drag must not outlive the re-snap
        o.velocity = Vec3::ZERO;
        if animate_to_slot(state, tweens, id, target, duration_ms) {
            started += 1;
        }
    }
    started
}

//! Transient repulsion between front-row cubes while a drag is near the lineup.
//!
//! Positions are re-snapped onto slots or anchors once the drag ends, so this
//! only smooths the visual overlap; it is not a physics engine.

use glam::Vec3;

use crate::arrangement::{ArrangementState, Membership, ObjectId};
use crate::constants::{
    ACTIVE_Z_MARGIN, FRONT_ROW_FORWARD_Z, MIN_DIST_FACTOR, POSITION_FOLLOW, REPULSION_K, SHELF_Z,
    VELOCITY_DAMPING, X_LIMIT, Y_SETTLE,
};

#[derive(Clone, Debug)]
pub struct CollisionResolver {
    pub k: f32,
    pub min_dist: f32,
    pub damping: f32,
}

impl CollisionResolver {
    pub fn new(spacing: f32) -> Self {
        Self {
            k: REPULSION_K,
            min_dist: spacing * MIN_DIST_FACTOR,
            damping: VELOCITY_DAMPING,
        }
    }

    /// One frame of repulsion. `dragged` pushes others but is never pushed,
    /// and neither is any object for which `pinned` holds (e.g. mid-tween).
    pub fn step(
        &self,
        state: &mut ArrangementState,
        dragged: Option<ObjectId>,
        pinned: impl Fn(ObjectId) -> bool,
    ) {
        let active: Vec<(ObjectId, Vec3)> = state
            .objects()
            .filter(|o| {
                matches!(o.membership, Membership::Lineup | Membership::Dragging)
                    && o.transform.position.z.abs() <= FRONT_ROW_FORWARD_Z + ACTIVE_Z_MARGIN
            })
            .map(|o| (o.id, o.transform.position))
            .collect();
        let mut impulses = vec![Vec3::ZERO; active.len()];
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                let mut d = active[i].1 - active[j].1;
                d.y = 0.0;
                let dist = d.length();
                if dist >= self.min_dist {
                    continue;
                }
                let n = if dist > 1e-6 { d / dist } else { Vec3::X };
                let influence = (self.min_dist - dist) / self.min_dist;
                let f = self.k * influence * influence;
                impulses[i] += n * f;
                impulses[j] -= n * f;
            }
        }
        for ((id, _), impulse) in active.iter().zip(impulses) {
            if Some(*id) == dragged || pinned(*id) {
                continue;
            }
            let Some(o) = state.get_mut(*id) else {
                continue;
            };
            o.velocity += impulse;
            let p = o.transform.position;
            let next = Vec3::new(
                (p.x + o.velocity.x).clamp(-X_LIMIT, X_LIMIT),
                p.y,
                (p.z + o.velocity.z).clamp(SHELF_Z, FRONT_ROW_FORWARD_Z),
            );
            o.transform.position.x += (next.x - p.x) * POSITION_FOLLOW;
            o.transform.position.z += (next.z - p.z) * POSITION_FOLLOW;
            o.transform.position.y += (0.0 - p.y) * Y_SETTLE;
            o.velocity *= self.damping;
        }
    }
}


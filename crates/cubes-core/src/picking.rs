use glam::Vec3;

use crate::arrangement::{ArrangementState, ChordObject, Membership, ObjectId};
use crate::camera::Ray;
use crate::constants::CUBE_SIZE;
use crate::voicing::Face;

/// Result of a pick: the chosen object and where the ray struck it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pick {
    pub id: ObjectId,
    pub distance: f32,
    /// Hit point relative to the cube centre, normalized to `[-1, 1]` per axis.
    pub local: Vec3,
    pub face: Face,
}

/// Slab test against an axis-aligned box. Returns the entry distance.
#[inline]
pub fn ray_aabb(ray: &Ray, center: Vec3, half_extent: f32) -> Option<f32> {
    let inv = ray.dir.recip();
    let t1 = (center - Vec3::splat(half_extent) - ray.origin) * inv;
    let t2 = (center + Vec3::splat(half_extent) - ray.origin) * inv;
    let t_near = t1.min(t2).max_element();
    let t_far = t1.max(t2).min_element();
    if t_far < 0.0 || t_near > t_far || t_near.is_nan() {
        return None;
    }
    Some(t_near.max(0.0))
}

fn hit(ray: &Ray, o: &ChordObject) -> Option<Pick> {
    let half = 0.5 * CUBE_SIZE * o.transform.scale;
    let center = o.transform.position;
    let t = ray_aabb(ray, center, half)?;
    let local = ((ray.at(t) - center) / half).clamp(Vec3::splat(-1.0), Vec3::splat(1.0));
    Some(Pick {
        id: o.id,
        distance: t,
        local,
        face: Face::from_local(local),
    })
}

/// Deterministic best hit along `ray`.
///
/// Lineup members win over shelf cubes. Among lineup hits the nearest wins;
/// among shelf hits the smallest cube wins, then the nearest. Remaining ties
/// go to the lowest id. Hidden and dragged objects are never picked.
pub fn pick(state: &ArrangementState, ray: &Ray) -> Option<Pick> {
    let front = state
        .objects()
        .filter(|o| o.membership == Membership::Lineup && o.visible)
        .filter_map(|o| hit(ray, o))
        .min_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
    if front.is_some() {
        return front;
    }
    state
        .objects()
        .filter(|o| o.membership == Membership::Shelf && o.visible)
        .filter_map(|o| hit(ray, o).map(|p| (o.transform.scale, p)))
        .min_by(|(sa, a), (sb, b)| {
            sa.total_cmp(sb)
                .then(a.distance.total_cmp(&b.distance))
                .then(a.id.cmp(&b.id))
        })
        .map(|(_, p)| p)
}

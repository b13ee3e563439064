//! Drag session: maps pointer samples to a desired transform between shelf
//! depth and the front row, eases the dragged cube toward it, and classifies
//! the release.

use glam::Vec2;

use crate::arrangement::{Membership, ObjectId, Transform};
use crate::camera::Ray;
use crate::constants::{
    DRAG_Z_PER_PX, FRONT_ROW_FORWARD_Z, FRONT_ROW_SCALE, SHELF_Z, X_LIMIT,
};
use crate::interaction::{GestureConfig, ReleaseGesture};
use crate::layout::insertion_index;

/// How a drag ended. Every drag ends in exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    FlickReturn,
    SettleFront { index: usize },
    SettleShelf,
}

/// Normalized progress from shelf depth (0) to the row plane (1).
#[inline]
pub fn drag_progress(z: f32) -> f32 {
    ((z - SHELF_Z) / (0.0 - SHELF_Z)).clamp(0.0, 1.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Clone, Debug)]
pub struct DragSession {
    pub id: ObjectId,
    pub from: Membership,
    pub origin: Transform,
    pub desired: Transform,
    pub started_ms: f64,
    /// Gap currently opened in the lineup by the make-way preview.
    pub preview_gap: Option<usize>,
    press: Vec2,
    start_z: f32,
    plane_y: f32,
    offset_x: f32,
}

impl DragSession {
    /// `press_ray` is the pick ray at the press position; the ground plane is
    /// the horizontal plane through the shelf origin.
    pub fn begin(
        id: ObjectId,
        from: Membership,
        current: Transform,
        origin: Transform,
        press: Vec2,
        press_ray: &Ray,
        now_ms: f64,
    ) -> Self {
        let plane_y = origin.position.y;
        let offset_x = press_ray
            .intersect_plane_y(plane_y)
            .map(|hit| hit.x - current.position.x)
            .unwrap_or(0.0);
        Self {
            id,
            from,
            origin,
            desired: current,
            started_ms: now_ms,
            preview_gap: None,
            press,
            start_z: current.position.z,
            plane_y,
            offset_x,
        }
    }

    /// Recompute the desired transform. `None` when the pointer ray misses the
    /// ground plane; the caller skips that frame and keeps the last target.
    pub fn update(&mut self, pointer: Vec2, ray: &Ray) -> Option<Transform> {
        let hit = ray.intersect_plane_y(self.plane_y)?;
        let dy = pointer.y - self.press.y;
        let z = (self.start_z + dy * DRAG_Z_PER_PX).clamp(SHELF_Z, FRONT_ROW_FORWARD_Z);
        let t = drag_progress(z);
        let mut desired = self.desired;
        desired.position.x = (hit.x - self.offset_x).clamp(-X_LIMIT, X_LIMIT);
        desired.position.y = lerp(self.origin.position.y, 0.0, t);
        desired.position.z = z;
        desired.scale = lerp(self.origin.scale, FRONT_ROW_SCALE, t);
        self.desired = desired;
        Some(desired)
    }

    pub fn desired_progress(&self) -> f32 {
        drag_progress(self.desired.position.z)
    }

    /// Ease `current` toward the desired transform over `dt_ms`.
    pub fn smooth(&self, current: &mut Transform, dt_ms: f32, tau_ms: f32) {
        let alpha = if tau_ms > 0.0 {
            1.0 - (-dt_ms.max(0.0) / tau_ms).exp()
        } else {
            1.0
        };
        current.position = current.position.lerp(self.desired.position, alpha);
        current.scale = lerp(current.scale, self.desired.scale, alpha);
    }

    /// Decide where the dragged cube comes to rest.
    pub fn classify(
        &self,
        current: Transform,
        gesture: &ReleaseGesture,
        config: &GestureConfig,
        lineup_len: usize,
        spacing: f32,
    ) -> DragOutcome {
        if gesture.is_flick(config) {
            return DragOutcome::FlickReturn;
        }
        let z = current.position.z;
        if z.abs() <= (z - SHELF_Z).abs() {
            DragOutcome::SettleFront {
                index: insertion_index(current.position.x, lineup_len + 1, spacing),
            }
        } else {
            DragOutcome::SettleShelf
        }
    }
}

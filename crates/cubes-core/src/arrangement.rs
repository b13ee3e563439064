//! Authoritative membership state (shelf canonicals, lineup clones, the one
//! dragged object) and the controller that keeps layout in step with it.

use std::f32::consts::FRAC_PI_2;
use std::fmt;

use fnv::FnvHashMap;
use glam::Vec3;

use crate::constants::{FLY_IN_MS, FRONT_ROW_SCALE, REFLOW_MS, ROTATE_MS};
use crate::error::{CubesError, Result};
use crate::layout;
use crate::music::{self, Palette};
use crate::shelf::ShelfMap;
use crate::tween::{Channel, Easing, Scheduler, TweenHandle};
use crate::voicing::Inversion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    Shelf,
    Lineup,
    Dragging,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f32,
}

/// A placed chord cube.
#[derive(Clone, Debug)]
pub struct ChordObject {
    pub id: ObjectId,
    pub symbol: &'static str,
    pub family: Palette,
    pub membership: Membership,
    pub transform: Transform,
    pub inversion: Inversion,
    /// Visual roll about z in radians; follows `inversion` through a tween.
    pub rotation_z: f32,
    pub rotation_target: f32,
    pub velocity: Vec3,
    pub slot_target: Option<Vec3>,
    pub canonical: bool,
    pub visible: bool,
    origin: Transform,
}

impl ChordObject {
    /// Shelf anchor this object snaps back to. Fixed at creation.
    pub fn origin(&self) -> Transform {
        self.origin
    }
}

#[derive(Debug)]
pub struct ArrangementState {
    objects: Vec<ChordObject>,
    shelf: FnvHashMap<&'static str, ObjectId>,
    lineup: Vec<ObjectId>,
    dragging: Option<ObjectId>,
    palette: Palette,
    next_id: u32,
}

impl ArrangementState {
    /// One visible-or-hidden canonical per symbol with a shelf anchor.
    pub fn new(map: &ShelfMap, palette: Palette) -> Self {
        let mut state = Self {
            objects: Vec::new(),
            shelf: FnvHashMap::default(),
            lineup: Vec::new(),
            dragging: None,
            palette,
            next_id: 1,
        };
        for symbol in map.symbols() {
            let (Ok(spec), Some(anchor)) = (music::lookup(symbol), map.get(symbol)) else {
                continue;
            };
            let origin = Transform {
                position: anchor.position,
                scale: anchor.scale,
            };
            let id = state.alloc_id();
            state.objects.push(ChordObject {
                id,
                symbol: spec.symbol,
                family: spec.family,
                membership: Membership::Shelf,
                transform: origin,
                inversion: Inversion::ROOT,
                rotation_z: 0.0,
                rotation_target: 0.0,
                velocity: Vec3::ZERO,
                slot_target: None,
                canonical: true,
                visible: palette.contains(spec.family),
                origin,
            });
            state.shelf.insert(spec.symbol, id);
        }
        state
    }

    fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&ChordObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ChordObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn require(&self, id: ObjectId) -> Result<&ChordObject> {
        self.get(id).ok_or(CubesError::UnknownObject(id))
    }

    fn require_mut(&mut self, id: ObjectId) -> Result<&mut ChordObject> {
        self.get_mut(id).ok_or(CubesError::UnknownObject(id))
    }

    pub fn objects(&self) -> impl Iterator<Item = &ChordObject> {
        self.objects.iter()
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = &mut ChordObject> {
        self.objects.iter_mut()
    }

    pub fn lineup(&self) -> &[ObjectId] {
        &self.lineup
    }

    pub fn lineup_index(&self, id: ObjectId) -> Option<usize> {
        self.lineup.iter().position(|&m| m == id)
    }

    pub fn lineup_objects(&self) -> impl Iterator<Item = &ChordObject> {
        self.lineup.iter().filter_map(|&id| self.get(id))
    }

    pub fn lineup_symbols(&self) -> Vec<&'static str> {
        self.lineup_objects().map(|o| o.symbol).collect()
    }

    pub fn dragging(&self) -> Option<ObjectId> {
        self.dragging
    }

    pub fn shelf_canonical(&self, symbol: &str) -> Option<ObjectId> {
        let spec = music::lookup(symbol).ok()?;
        self.shelf.get(spec.symbol).copied()
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Hide shelf canonicals outside `palette`. Lineup clones stay visible.
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        for o in self.objects.iter_mut().filter(|o| o.canonical) {
            o.visible = palette.contains(o.family);
        }
    }

    /// Copy a shelf canonical into a new object with the given membership.
    fn spawn_clone(
        &mut self,
        canonical: ObjectId,
        membership: Membership,
        inversion: Inversion,
    ) -> Result<ObjectId> {
        let source = self.require(canonical)?.clone();
        let id = self.alloc_id();
        let angle = -(inversion.index() as f32) * FRAC_PI_2;
        self.objects.push(ChordObject {
            id,
            membership,
            inversion,
            rotation_z: angle,
            rotation_target: angle,
            velocity: Vec3::ZERO,
            slot_target: None,
            canonical: false,
            visible: true,
            ..source
        });
        Ok(id)
    }

    /// Place `id` at `index` (clamped) in the lineup; any prior position or drag is cleared.
    pub fn insert_into_lineup(&mut self, id: ObjectId, index: usize) -> Result<usize> {
        let obj = self.require_mut(id)?;
        if obj.canonical {
            return Err(CubesError::Invariant(format!(
                "shelf canonical {id} cannot join the lineup"
            )));
        }
        obj.membership = Membership::Lineup;
        self.lineup.retain(|&m| m != id);
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        let index = index.min(self.lineup.len());
        self.lineup.insert(index, id);
        Ok(index)
    }

    /// Start dragging `id`. Shelf canonicals hand out a fresh clone instead of moving.
    pub fn begin_drag(&mut self, id: ObjectId) -> Result<ObjectId> {
        if let Some(current) = self.dragging {
            return Err(CubesError::Invariant(format!(
                "drag of {id} requested while {current} is dragging"
            )));
        }
        let obj = self.require(id)?;
        let dragged = if obj.canonical {
            let inversion = obj.inversion;
            self.spawn_clone(id, Membership::Dragging, inversion)?
        } else {
            self.lineup.retain(|&m| m != id);
            self.require_mut(id)?.membership = Membership::Dragging;
            id
        };
        self.dragging = Some(dragged);
        Ok(dragged)
    }

    /// Drop a clone entirely. Canonicals are never destroyed.
    pub fn destroy(&mut self, id: ObjectId) -> Result<ChordObject> {
        let idx = self
            .objects
            .iter()
            .position(|o| o.id == id)
            .ok_or(CubesError::UnknownObject(id))?;
        if self.objects[idx].canonical {
            return Err(CubesError::Invariant(format!(
                "shelf canonical {id} cannot be destroyed"
            )));
        }
        self.lineup.retain(|&m| m != id);
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        Ok(self.objects.remove(idx))
    }

    /// Pin lineup members to the row plane and canonicals to their anchors.
    /// Objects for which `skip` is true (dragged, tweening) are left alone.
    pub fn enforce_rest_zones(&mut self, skip: impl Fn(ObjectId) -> bool) {
        for o in self.objects.iter_mut() {
            if skip(o.id) {
                continue;
            }
            match o.membership {
                Membership::Lineup => {
                    o.transform.position.y = 0.0;
                    o.transform.position.z = 0.0;
                }
                Membership::Shelf if o.canonical => {
                    o.transform = o.origin;
                    o.velocity = Vec3::ZERO;
                }
                _ => {}
            }
        }
    }

    /// Remove every clone and restore canonicals. Returns the destroyed ids.
    pub fn clear(&mut self) -> Vec<ObjectId> {
        let removed: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|o| !o.canonical)
            .map(|o| o.id)
            .collect();
        self.objects.retain(|o| o.canonical);
        self.lineup.clear();
        self.dragging = None;
        for o in self.objects.iter_mut() {
            o.transform = o.origin;
            o.velocity = Vec3::ZERO;
            o.slot_target = None;
        }
        removed
    }

    /// Verify membership bookkeeping: every lineup member appears once and
    /// nothing else does; at most one object is dragging.
    pub fn check_invariants(&self) -> Result<()> {
        let fail = |msg: String| Err(CubesError::Invariant(msg));
        for (i, id) in self.lineup.iter().enumerate() {
            if self.lineup[..i].contains(id) {
                return fail(format!("{id} appears twice in the lineup"));
            }
        }
        let mut dragging = 0;
        for o in &self.objects {
            let in_lineup = self.lineup.contains(&o.id);
            match o.membership {
                Membership::Lineup if !in_lineup => {
                    return fail(format!("{} is Lineup but not in the sequence", o.id))
                }
                Membership::Shelf | Membership::Dragging if in_lineup => {
                    return fail(format!("{} is in the sequence but not Lineup", o.id))
                }
                Membership::Dragging => {
                    dragging += 1;
                    if self.dragging != Some(o.id) {
                        return fail(format!("{} is Dragging but not the drag target", o.id));
                    }
                }
                _ => {}
            }
            if o.canonical && o.membership != Membership::Shelf {
                return fail(format!("canonical {} left the shelf", o.id));
            }
        }
        if dragging > 1 {
            return fail(format!("{dragging} objects dragging at once"));
        }
        for id in &self.lineup {
            if self.get(*id).is_none() {
                return fail(format!("lineup refers to missing {id}"));
            }
        }
        Ok(())
    }
}

/// Membership state plus the tweens animating it.
pub struct Arrangement {
    pub state: ArrangementState,
    pub tweens: Scheduler<ArrangementState>,
    spacing: f32,
}

impl Arrangement {
    pub fn new(map: &ShelfMap, palette: Palette, spacing: f32) -> Self {
        Self {
            state: ArrangementState::new(map, palette),
            tweens: Scheduler::new(),
            spacing,
        }
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn tick(&mut self, now_ms: f64) -> Vec<TweenHandle> {
        self.tweens.tick(now_ms, &mut self.state)
    }

    pub fn reflow(&mut self) -> usize {
        layout::reflow(&mut self.state, &mut self.tweens, self.spacing, REFLOW_MS)
    }

    pub fn pull_from_shelf(&mut self, symbol: &str) -> Result<ObjectId> {
        self.pull_from_shelf_turned(symbol, 0)
    }

    /// Append a clone of `symbol`'s canonical, pre-rotated by `quarter_turns`.
    pub fn pull_from_shelf_turned(&mut self, symbol: &str, quarter_turns: i32) -> Result<ObjectId> {
        let canonical = self
            .state
            .shelf_canonical(symbol)
            .ok_or_else(|| CubesError::UnknownSymbol(symbol.to_string()))?;
        let inversion = self.state.require(canonical)?.inversion.rotate(quarter_turns);
        let id = self
            .state
            .spawn_clone(canonical, Membership::Lineup, inversion)?;
        let index = self.state.lineup.len();
        self.state.insert_into_lineup(id, index)?;
        let slot = layout::lineup_slots(index + 1, self.spacing)[index];
        layout::animate_to_slot(&mut self.state, &mut self.tweens, id, slot, FLY_IN_MS);
        self.reflow();
        log::info!("[shelf] pulled {} as {} at slot {}", symbol, id, index);
        Ok(id)
    }

    /// Snap `id` to its shelf anchor and retire it. Returns the final record.
    pub fn return_to_shelf(&mut self, id: ObjectId) -> Result<ChordObject> {
        if self.state.require(id)?.canonical {
            return Ok(self.state.require(id)?.clone());
        }
        self.tweens.cancel_for(id);
        let obj = self.state.require_mut(id)?;
        obj.transform = obj.origin;
        obj.velocity = Vec3::ZERO;
        obj.membership = Membership::Shelf;
        let retired = self.state.destroy(id)?;
        self.reflow();
        Ok(retired)
    }

    pub fn reorder(&mut self, id: ObjectId, new_index: usize) -> Result<usize> {
        if self.state.lineup_index(id).is_none() {
            return Err(CubesError::NotInLineup(id));
        }
        let index = self.state.insert_into_lineup(id, new_index)?;
        self.reflow();
        Ok(index)
    }

    pub fn remove_and_reflow(&mut self, id: ObjectId) -> Result<ChordObject> {
        if self.state.lineup_index(id).is_none() {
            return Err(CubesError::NotInLineup(id));
        }
        self.tweens.cancel_for(id);
        let removed = self.state.destroy(id)?;
        self.reflow();
        Ok(removed)
    }

    /// Hand `id` to a drag session. Returns the object actually being dragged.
    pub fn begin_drag(&mut self, id: ObjectId) -> Result<ObjectId> {
        let dragged = self.state.begin_drag(id)?;
        self.tweens.cancel_channel(dragged, Channel::Transform);
        if let Some(o) = self.state.get_mut(dragged) {
            o.slot_target = None;
            o.velocity = Vec3::ZERO;
        }
        self.reflow();
        Ok(dragged)
    }

    /// Commit a dragged object to the lineup at `index`, on the row plane.
    pub fn settle_front(&mut self, id: ObjectId, index: usize) -> Result<usize> {
        let index = self.state.insert_into_lineup(id, index)?;
        let obj = self.state.require_mut(id)?;
        obj.transform.position.y = 0.0;
        obj.transform.position.z = 0.0;
        obj.transform.scale = FRONT_ROW_SCALE;
        obj.velocity = Vec3::ZERO;
        self.reflow();
        Ok(index)
    }

    pub fn make_way(&mut self, gap: usize, duration_ms: f64) -> usize {
        layout::make_way(&mut self.state, &mut self.tweens, gap, self.spacing, duration_ms)
    }

    /// Turn `id` to `target`, animating the shorter way. Returns signed quarter turns.
    pub fn rotate_to(&mut self, id: ObjectId, target: Inversion) -> Result<i32> {
        let obj = self.state.require_mut(id)?;
        let turns = obj.inversion.quarter_turns_to(target);
        obj.inversion = target;
        if turns == 0 {
            return Ok(0);
        }
        let from = obj.rotation_z;
        let to = obj.rotation_target - turns as f32 * FRAC_PI_2;
        obj.rotation_target = to;
        self.tweens.animate(
            id,
            Channel::Rotation,
            ROTATE_MS,
            Easing::InOutCubic,
            move |s: &mut ArrangementState, t| {
                if let Some(o) = s.get_mut(id) {
                    o.rotation_z = from + (to - from) * t;
                }
            },
        );
        Ok(turns)
    }

    pub fn reset(&mut self) {
        for id in self.state.clear() {
            self.tweens.cancel_for(id);
        }
    }
}

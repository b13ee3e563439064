//! The stage controller: owns the arrangement, drives gestures through the
//! interaction FSM, runs the per-frame pipeline and produces note events.
//!
//! Frame order is fixed: pointer intents are applied as they arrive, then
//! `tick` advances tweens, eases the dragged cube, resolves collisions,
//! enforces rest zones and finally advances sequence playback.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::arrangement::{Arrangement, ArrangementState, Membership, ObjectId, Transform};
use crate::audio::{AudioEngine, NoteEvent, PlaybackSettings};
use crate::camera::Camera;
use crate::collision::CollisionResolver;
use crate::constants::{GRID_SIZE, MAKE_WAY_MS, MAKE_WAY_START_T, PLAY_LEAD_SEC, REPULSION_START_T};
use crate::drag::{drag_progress, DragOutcome, DragSession};
use crate::error::Result;
use crate::interaction::{GestureConfig, Intent, InteractionFsm, ReleaseGesture};
use crate::layout::insertion_index;
use crate::music::Palette;
use crate::picking::{self, Pick};
use crate::sequence::SequencePlayer;
use crate::shelf::ShelfMap;
use crate::tween::Channel;
use crate::voicing::{quadrant_target, shelf_click_turns, Face, Inversion};

/// Runtime-tunable settings, loadable from JSON. Missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub gestures: GestureConfig,
    pub grid_size: f32,
    pub palette: Palette,
    pub playback: PlaybackSettings,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            gestures: GestureConfig::default(),
            grid_size: GRID_SIZE,
            palette: Palette::Major,
            playback: PlaybackSettings::default(),
        }
    }
}

impl StageConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Notifications for frontends (highlighting, logging, UI state).
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    Pulled {
        id: ObjectId,
        symbol: &'static str,
        index: usize,
    },
    Rotated {
        id: ObjectId,
        quarter_turns: i32,
        inversion: Inversion,
    },
    DragStarted {
        id: ObjectId,
        from: Membership,
    },
    Released {
        id: ObjectId,
        outcome: DragOutcome,
        transform: Transform,
    },
    SequenceStep {
        index: usize,
        id: ObjectId,
    },
    SequenceFinished,
}

pub struct Stage {
    arrangement: Arrangement,
    audio: AudioEngine,
    camera: Camera,
    viewport: Vec2,
    fsm: InteractionFsm,
    collision: CollisionResolver,
    drag: Option<DragSession>,
    sequence: Option<SequencePlayer>,
    events: Vec<StageEvent>,
    last_tick_ms: Option<f64>,
}

#[inline]
fn start_sec(now_ms: f64) -> f64 {
    now_ms / 1000.0 + PLAY_LEAD_SEC
}

impl Stage {
    pub fn new(config: StageConfig, shelf: &ShelfMap) -> Self {
        let viewport = Vec2::new(1280.0, 720.0);
        let mut camera = Camera::default();
        camera.set_viewport(viewport);
        Self {
            arrangement: Arrangement::new(shelf, config.palette, config.grid_size),
            audio: AudioEngine::new(config.playback),
            camera,
            viewport,
            fsm: InteractionFsm::new(config.gestures),
            collision: CollisionResolver::new(config.grid_size),
            drag: None,
            sequence: None,
            events: Vec::new(),
            last_tick_ms: None,
        }
    }

    pub fn state(&self) -> &ArrangementState {
        &self.arrangement.state
    }

    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    pub fn arrangement_mut(&mut self) -> &mut Arrangement {
        &mut self.arrangement
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn settings_mut(&mut self) -> &mut PlaybackSettings {
        &mut self.audio.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport.max(Vec2::ONE);
        self.camera.set_viewport(self.viewport);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_playing_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pick_at(&self, pointer: Vec2) -> Option<Pick> {
        let ray = self.camera.screen_ray(pointer, self.viewport);
        picking::pick(&self.arrangement.state, &ray)
    }

    /// Screen position of an object's centre, for scripted input and overlays.
    pub fn screen_position(&self, id: ObjectId) -> Option<Vec2> {
        let o = self.arrangement.state.get(id)?;
        self.camera.world_to_screen(o.transform.position, self.viewport)
    }

    // ---------------- Pointer input ----------------

    pub fn handle_pointer_down(&mut self, pointer: Vec2, now_ms: f64) -> bool {
        self.arrangement.tweens.sync_clock(now_ms);
        let pick = self.pick_at(pointer);
        self.fsm.pointer_down(pointer, now_ms, pick)
    }

    pub fn handle_pointer_move(&mut self, pointer: Vec2, now_ms: f64, out: &mut Vec<NoteEvent>) {
        self.arrangement.tweens.sync_clock(now_ms);
        if let Some(intent) = self.fsm.pointer_move(pointer, now_ms) {
            self.apply(intent, now_ms, out);
        }
    }

    pub fn handle_pointer_up(&mut self, pointer: Vec2, now_ms: f64, out: &mut Vec<NoteEvent>) {
        self.arrangement.tweens.sync_clock(now_ms);
        if let Some(intent) = self.fsm.pointer_up(pointer, now_ms) {
            self.apply(intent, now_ms, out);
        }
    }

    fn apply(&mut self, intent: Intent, now_ms: f64, out: &mut Vec<NoteEvent>) {
        match intent {
            Intent::Click(pick) => self.click(pick, now_ms, out),
            Intent::BeginDrag {
                target,
                press,
                pointer,
            } => {
                self.begin_drag(target, press, now_ms);
                self.update_drag(pointer);
            }
            Intent::UpdateDrag { pointer } => self.update_drag(pointer),
            Intent::EndDrag { gesture, .. } => self.end_drag(gesture, now_ms, out),
        }
    }

    fn click(&mut self, pick: Pick, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let Some((membership, symbol, inversion, roll)) = self
            .arrangement
            .state
            .get(pick.id)
            .map(|o| (o.membership, o.symbol, o.inversion, o.rotation_target))
        else {
            log::warn!("[mouse] click on vanished object {}", pick.id);
            return;
        };
        match membership {
            Membership::Shelf => {
                let turns = shelf_click_turns(pick.local.truncate());
                if let Err(e) = self.pull_symbol(symbol, turns, now_ms, out) {
                    log::warn!("[shelf] pull of {} failed: {}", symbol, e);
                }
            }
            Membership::Lineup if pick.face == Face::Front => {
                // classify in the cube's own frame so repeated clicks keep turning
                let local = Quat::from_rotation_z(-roll) * pick.local;
                let target = quadrant_target(local.truncate());
                match self.arrangement.rotate_to(pick.id, target) {
                    Ok(quarter_turns) => {
                        log::info!(
                            "[rotate] {} {} by {} to inversion {}",
                            symbol,
                            pick.id,
                            quarter_turns,
                            target.index()
                        );
                        self.events.push(StageEvent::Rotated {
                            id: pick.id,
                            quarter_turns,
                            inversion: target,
                        });
                    }
                    Err(e) => {
                        log::warn!("[rotate] {}", e);
                        return;
                    }
                }
                if let Err(e) = self.play_object(pick.id, now_ms, out) {
                    log::warn!("[audio] {}", e);
                }
            }
            Membership::Lineup => {
                self.audio
                    .play_face(symbol, inversion, pick.face, start_sec(now_ms), out);
            }
            Membership::Dragging => {}
        }
    }

    // ---------------- Drag ----------------

    fn begin_drag(&mut self, target: ObjectId, press: Vec2, now_ms: f64) {
        let Some(from) = self.arrangement.state.get(target).map(|o| o.membership) else {
            return;
        };
        let id = match self.arrangement.begin_drag(target) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("[drag] cannot begin on {}: {}", target, e);
                return;
            }
        };
        let Some((current, origin)) = self
            .arrangement
            .state
            .get(id)
            .map(|o| (o.transform, o.origin()))
        else {
            return;
        };
        let ray = self.camera.screen_ray(press, self.viewport);
        self.drag = Some(DragSession::begin(id, from, current, origin, press, &ray, now_ms));
        log::info!("[drag] begin {} from {:?}", id, from);
        self.events.push(StageEvent::DragStarted { id, from });
    }

    fn update_drag(&mut self, pointer: Vec2) {
        let ray = self.camera.screen_ray(pointer, self.viewport);
        let Some(session) = self.drag.as_mut() else {
            return;
        };
        if session.update(pointer, &ray).is_none() {
            log::debug!("[drag] pointer ray misses the ground plane; frame skipped");
            return;
        }
        let spacing = self.arrangement.spacing();
        if session.desired_progress() > MAKE_WAY_START_T {
            let n = self.arrangement.state.lineup().len();
            let gap = insertion_index(session.desired.position.x, n + 1, spacing);
            if session.preview_gap != Some(gap) {
                session.preview_gap = Some(gap);
                self.arrangement.make_way(gap, MAKE_WAY_MS);
            }
        } else if session.preview_gap.take().is_some() {
            self.arrangement.reflow();
        }
    }

    fn end_drag(&mut self, gesture: ReleaseGesture, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let Some(session) = self.drag.take() else {
            return;
        };
        let Some(current) = self.arrangement.state.get(session.id).map(|o| o.transform) else {
            return;
        };
        let outcome = session.classify(
            current,
            &gesture,
            self.fsm.config(),
            self.arrangement.state.lineup().len(),
            self.arrangement.spacing(),
        );
        let settled = match outcome {
            DragOutcome::FlickReturn | DragOutcome::SettleShelf => self
                .arrangement
                .return_to_shelf(session.id)
                .map(|retired| retired.transform),
            DragOutcome::SettleFront { index } => self
                .arrangement
                .settle_front(session.id, index)
                .and_then(|_| self.arrangement.state.require(session.id).map(|o| o.transform)),
        };
        match settled {
            Ok(transform) => {
                log::info!("[drag] end {} -> {:?}", session.id, outcome);
                self.events.push(StageEvent::Released {
                    id: session.id,
                    outcome,
                    transform,
                });
                if matches!(outcome, DragOutcome::SettleFront { .. }) {
                    if let Err(e) = self.play_object(session.id, now_ms, out) {
                        log::warn!("[audio] {}", e);
                    }
                }
            }
            Err(e) => log::warn!("[drag] release of {} failed: {}", session.id, e),
        }
    }

    // ---------------- Frame ----------------

    pub fn tick(&mut self, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let dt_ms = self
            .last_tick_ms
            .map(|t| (now_ms - t).max(0.0))
            .unwrap_or(0.0);
        self.last_tick_ms = Some(now_ms);

        self.arrangement.tick(now_ms);

        if let Some(session) = &self.drag {
            let tau = self.fsm.config().smoothing_tau_ms;
            let mut progress = 0.0;
            if let Some(o) = self.arrangement.state.get_mut(session.id) {
                session.smooth(&mut o.transform, dt_ms as f32, tau);
                progress = drag_progress(o.transform.position.z);
            }
            if progress > REPULSION_START_T {
                let tweens = &self.arrangement.tweens;
                self.collision.step(&mut self.arrangement.state, Some(session.id), |id| {
                    tweens.is_active(id, Channel::Transform)
                });
            }
        }

        let dragged = self.drag.as_ref().map(|s| s.id);
        let tweens = &self.arrangement.tweens;
        self.arrangement
            .state
            .enforce_rest_zones(|id| Some(id) == dragged || tweens.is_active(id, Channel::Transform));

        self.advance_sequence(now_ms, out);
    }

    // ---------------- Playback ----------------

    /// Clone `symbol` from the shelf into the lineup and play it.
    pub fn pull_symbol(
        &mut self,
        symbol: &str,
        quarter_turns: i32,
        now_ms: f64,
        out: &mut Vec<NoteEvent>,
    ) -> Result<ObjectId> {
        self.arrangement.tweens.sync_clock(now_ms);
        let id = self.arrangement.pull_from_shelf_turned(symbol, quarter_turns)?;
        let obj = self.arrangement.state.require(id)?;
        let index = self.arrangement.state.lineup().len().saturating_sub(1);
        self.events.push(StageEvent::Pulled {
            id,
            symbol: obj.symbol,
            index,
        });
        self.play_object(id, now_ms, out)?;
        Ok(id)
    }

    pub fn play_object(&mut self, id: ObjectId, now_ms: f64, out: &mut Vec<NoteEvent>) -> Result<()> {
        let obj = self.arrangement.state.require(id)?;
        let index = self.arrangement.state.lineup_index(id);
        self.audio
            .play_chord(obj.symbol, obj.inversion, index, start_sec(now_ms), out);
        Ok(())
    }

    /// Start playing the lineup in order from `now_ms`. Returns the step count.
    pub fn play_sequence(&mut self, now_ms: f64) -> usize {
        let steps = self.arrangement.state.lineup().to_vec();
        if steps.is_empty() {
            return 0;
        }
        let n = steps.len();
        let interval = self.audio.settings.chord_interval_ms();
        log::info!("[sequence] {} chords every {:.0} ms", n, interval);
        self.sequence = Some(SequencePlayer::new(steps, now_ms, interval));
        n
    }

    pub fn stop_sequence(&mut self) {
        if self.sequence.take().is_some() {
            log::info!("[sequence] stopped");
        }
    }

    fn advance_sequence(&mut self, now_ms: f64, out: &mut Vec<NoteEvent>) {
        let Some(seq) = self.sequence.as_mut() else {
            return;
        };
        let mut due: SmallVec<[(usize, ObjectId); 2]> = SmallVec::new();
        while let Some(step) = seq.due(now_ms) {
            due.push(step);
        }
        let finished = seq.is_finished();
        for (index, id) in due {
            let Some(obj) = self.arrangement.state.get(id) else {
                log::debug!("[sequence] step {} skipped; {} was removed", index, id);
                continue;
            };
            self.audio
                .play_chord(obj.symbol, obj.inversion, Some(index), start_sec(now_ms), out);
            self.events.push(StageEvent::SequenceStep { index, id });
        }
        if finished {
            self.sequence = None;
            self.events.push(StageEvent::SequenceFinished);
        }
    }

    pub fn lock_bass(&mut self) -> usize {
        let members: Vec<(&'static str, Inversion)> = self
            .arrangement
            .state
            .lineup_objects()
            .map(|o| (o.symbol, o.inversion))
            .collect();
        self.audio.lock_bass(members)
    }

    pub fn lock_melody(&mut self) -> usize {
        let members: Vec<(&'static str, Inversion)> = self
            .arrangement
            .state
            .lineup_objects()
            .map(|o| (o.symbol, o.inversion))
            .collect();
        self.audio.lock_melody(members)
    }

    pub fn unlock_bass(&mut self) {
        self.audio.unlock_bass();
    }

    pub fn unlock_melody(&mut self) {
        self.audio.unlock_melody();
    }

    // ---------------- Arrangement controls ----------------

    pub fn set_palette(&mut self, palette: Palette) {
        self.arrangement.state.set_palette(palette);
        log::info!("[shelf] palette {:?}", palette);
    }

    pub fn remove_member(&mut self, id: ObjectId) -> Result<()> {
        self.arrangement.remove_and_reflow(id).map(|_| ())
    }

    /// Destroy all lineup clones and clear drag, playback and voice-leading state.
    pub fn reset(&mut self) {
        self.arrangement.reset();
        self.fsm.reset();
        self.drag = None;
        self.sequence = None;
        self.audio.reset();
        log::info!("[stage] reset");
    }

    /// World position of the dragged cube's target, if a drag is active.
    pub fn drag_target(&self) -> Option<Vec3> {
        self.drag.as_ref().map(|s| s.desired.position)
    }
}

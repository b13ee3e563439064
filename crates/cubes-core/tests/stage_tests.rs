// End-to-end gesture tests: pointer samples go through the default camera,
// so every press lands on a real projected cube face.

use cubes_core::arrangement::ObjectId;
use cubes_core::audio::{Layer, NoteEvent};
use cubes_core::constants::{AUDITION_DURATION_SEC, CUBE_SIZE, GRID_SIZE};
use cubes_core::drag::DragOutcome;
use cubes_core::music::Palette;
use cubes_core::shelf::ShelfMap;
use cubes_core::stage::{Stage, StageConfig, StageEvent};
use cubes_core::voicing::Inversion;
use glam::{Vec2, Vec3};

const FRAME_MS: f64 = 16.0;

struct Harness {
    stage: Stage,
    now: f64,
    notes: Vec<NoteEvent>,
}

impl Harness {
    fn new() -> Self {
        Self {
            stage: Stage::new(StageConfig::default(), &ShelfMap::builtin()),
            now: 1000.0,
            notes: Vec::new(),
        }
    }

    fn run(&mut self, ms: f64) {
        let end = self.now + ms;
        while self.now < end {
            self.now += FRAME_MS;
            self.stage.tick(self.now, &mut self.notes);
        }
    }

    // Screen position of a point on the front face, `local` in [-1, 1].
    fn front_face_px(&self, id: ObjectId, local: Vec2) -> Vec2 {
        let o = self.stage.state().get(id).unwrap();
        let half = 0.5 * CUBE_SIZE * o.transform.scale;
        let p = o.transform.position + Vec3::new(local.x * half, local.y * half, half);
        self.stage
            .camera()
            .world_to_screen(p, self.stage.viewport())
            .unwrap()
    }

    fn top_face_px(&self, id: ObjectId) -> Vec2 {
        let o = self.stage.state().get(id).unwrap();
        let half = 0.5 * CUBE_SIZE * o.transform.scale;
        let p = o.transform.position + Vec3::new(0.0, half, 0.0);
        self.stage
            .camera()
            .world_to_screen(p, self.stage.viewport())
            .unwrap()
    }

    fn click(&mut self, px: Vec2) {
        assert!(self.stage.handle_pointer_down(px, self.now), "press missed");
        self.now += 40.0;
        self.stage.handle_pointer_up(px, self.now, &mut self.notes);
    }

    // Press, move in `steps` frames spaced `step_ms` apart, release at `to`.
    fn drag(&mut self, from: Vec2, to: Vec2, steps: usize, step_ms: f64) {
        assert!(self.stage.handle_pointer_down(from, self.now), "press missed");
        for i in 1..=steps {
            self.now += step_ms;
            let p = from.lerp(to, i as f32 / steps as f32);
            self.stage.handle_pointer_move(p, self.now, &mut self.notes);
            self.stage.tick(self.now, &mut self.notes);
        }
        self.stage.handle_pointer_up(to, self.now, &mut self.notes);
    }

    fn canonical(&self, symbol: &str) -> ObjectId {
        self.stage.state().shelf_canonical(symbol).unwrap()
    }

    fn lineup_xs(&self) -> Vec<f32> {
        self.stage
            .state()
            .lineup_objects()
            .map(|o| o.transform.position.x)
            .collect()
    }
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn three_shelf_clicks_build_a_centred_row() {
    let mut h = Harness::new();
    for symbol in ["I", "IV", "V"] {
        let px = h.front_face_px(h.canonical(symbol), Vec2::ZERO);
        h.click(px);
        h.run(700.0);
    }
    assert_eq!(h.stage.state().lineup_symbols(), vec!["I", "IV", "V"]);
    let xs = h.lineup_xs();
    for (x, want) in xs.iter().zip([-GRID_SIZE, 0.0, GRID_SIZE]) {
        assert!(approx(*x, want), "x {x} != {want}");
    }
    for o in h.stage.state().lineup_objects() {
        assert!(approx(o.transform.position.y, 0.0));
        assert!(approx(o.transform.position.z, 0.0));
        assert_eq!(o.inversion, Inversion::ROOT);
    }
    // chord bed (3) + bass per click
    assert_eq!(h.notes.len(), 12);
    let pulled = h
        .stage
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, StageEvent::Pulled { .. }))
        .count();
    assert_eq!(pulled, 3);
    h.stage.state().check_invariants().unwrap();
}

#[test]
fn shelf_click_off_centre_pre_rotates_the_clone() {
    let mut h = Harness::new();
    let px = h.front_face_px(h.canonical("I"), Vec2::new(0.6, 0.0));
    h.click(px);
    let clone = h.stage.state().lineup()[0];
    assert_eq!(h.stage.state().get(clone).unwrap().inversion, Inversion::new(1));
    // canonical itself never turns
    let canonical = h.canonical("I");
    assert_eq!(h.stage.state().get(canonical).unwrap().inversion, Inversion::ROOT);
}

#[test]
fn front_quadrant_click_rotates_and_plays_new_bass() {
    let mut h = Harness::new();
    let id = h.stage.pull_symbol("I", 0, h.now, &mut h.notes).unwrap();
    h.run(700.0);
    h.stage.drain_events();
    h.notes.clear();

    let px = h.front_face_px(id, Vec2::new(0.67, 0.0));
    h.click(px);
    let events = h.stage.drain_events();
    assert!(events.contains(&StageEvent::Rotated {
        id,
        quarter_turns: 1,
        inversion: Inversion::new(1),
    }));
    assert_eq!(h.stage.state().get(id).unwrap().inversion, Inversion::new(1));
    // E is on the bottom face now; previous bass was C2 (36)
    let bass: Vec<i32> = h
        .notes
        .iter()
        .filter(|n| n.layer == Layer::Bass)
        .map(|n| n.midi)
        .collect();
    assert_eq!(bass, vec![40]);

    h.run(700.0);
    let rot = h.stage.state().get(id).unwrap().rotation_z;
    assert!(approx(rot, -std::f32::consts::FRAC_PI_2), "rotation {rot}");
}

#[test]
fn repeated_quadrant_clicks_read_the_turned_face() {
    let mut h = Harness::new();
    let id = h.stage.pull_symbol("I", 0, h.now, &mut h.notes).unwrap();
    h.run(700.0);
    h.stage.drain_events();

    let rotated = |h: &mut Harness| -> Vec<(i32, Inversion)> {
        h.stage
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                StageEvent::Rotated {
                    quarter_turns,
                    inversion,
                    ..
                } => Some((quarter_turns, inversion)),
                _ => None,
            })
            .collect()
    };

    let right = h.front_face_px(id, Vec2::new(0.6, 0.0));
    h.click(right);
    assert_eq!(rotated(&mut h), vec![(1, Inversion::new(1))]);
    h.run(800.0);

    // the same screen point now lands on the cube's old top edge
    h.click(right);
    assert_eq!(rotated(&mut h), vec![(1, Inversion::new(2))]);
    assert_eq!(h.stage.state().get(id).unwrap().inversion, Inversion::new(2));
    h.run(800.0);

    // upside down, the world-left edge is the cube's right
    let left = h.front_face_px(id, Vec2::new(-0.6, 0.0));
    h.click(left);
    assert_eq!(rotated(&mut h), vec![(-1, Inversion::new(1))]);
    h.run(800.0);
    let rot = h.stage.state().get(id).unwrap().rotation_z;
    assert!(approx(rot, -std::f32::consts::FRAC_PI_2), "rotation {rot}");
}

#[test]
fn click_on_current_quadrant_still_plays() {
    let mut h = Harness::new();
    let id = h.stage.pull_symbol("IV", 0, h.now, &mut h.notes).unwrap();
    h.run(700.0);
    h.stage.drain_events();
    h.notes.clear();

    let px = h.front_face_px(id, Vec2::new(0.0, -0.67));
    h.click(px);
    assert!(h.stage.drain_events().contains(&StageEvent::Rotated {
        id,
        quarter_turns: 0,
        inversion: Inversion::ROOT,
    }));
    assert_eq!(h.notes.len(), 4);
}

#[test]
fn top_face_click_auditions_the_melody_voice() {
    let mut h = Harness::new();
    let id = h.stage.pull_symbol("I", 0, h.now, &mut h.notes).unwrap();
    h.run(700.0);
    h.notes.clear();

    let px = h.top_face_px(id);
    h.click(px);
    assert_eq!(h.notes.len(), 1);
    let note = &h.notes[0];
    assert_eq!(note.layer, Layer::Melody);
    // G above C5
    assert_eq!(note.midi, 79);
    assert_eq!(note.duration_sec, AUDITION_DURATION_SEC);
    // auditions never rotate
    assert_eq!(h.stage.state().get(id).unwrap().inversion, Inversion::ROOT);
}

#[test]
fn drag_reorders_the_lineup() {
    let mut h = Harness::new();
    for symbol in ["I", "IV", "V"] {
        h.stage.pull_symbol(symbol, 0, h.now, &mut h.notes).unwrap();
    }
    h.run(700.0);
    let iv = h.stage.state().lineup()[1];

    let press = h.front_face_px(iv, Vec2::ZERO);
    let origin_y = h.stage.state().get(iv).unwrap().origin().position.y;
    let ray = h.stage.camera().screen_ray(press, h.stage.viewport());
    let hit = ray.intersect_plane_y(origin_y).unwrap();
    let target = h
        .stage
        .camera()
        .world_to_screen(hit + Vec3::new(-1.5, 0.0, 0.0), h.stage.viewport())
        .unwrap();

    h.drag(press, target, 20, FRAME_MS);
    assert!(!h.stage.is_dragging());
    assert_eq!(h.stage.state().lineup_symbols(), vec!["IV", "I", "V"]);

    h.run(600.0);
    let xs = h.lineup_xs();
    for (x, want) in xs.iter().zip([-GRID_SIZE, 0.0, GRID_SIZE]) {
        assert!(approx(*x, want), "x {x} != {want}");
    }
    h.stage.state().check_invariants().unwrap();
}

#[test]
fn upward_flick_returns_the_clone_to_its_shelf_anchor() {
    let mut h = Harness::new();
    let id = h.stage.pull_symbol("I", 0, h.now, &mut h.notes).unwrap();
    h.run(700.0);
    h.stage.drain_events();
    let anchor = h.stage.state().get(id).unwrap().origin();

    let press = h.front_face_px(id, Vec2::ZERO);
    h.drag(press, press - Vec2::new(0.0, 60.0), 3, 50.0);

    let released = h
        .stage
        .drain_events()
        .into_iter()
        .find_map(|e| match e {
            StageEvent::Released {
                id: rid,
                outcome,
                transform,
            } if rid == id => Some((outcome, transform)),
            _ => None,
        })
        .unwrap();
    assert_eq!(released.0, DragOutcome::FlickReturn);
    assert_eq!(released.1, anchor);
    assert!(h.stage.state().lineup().is_empty());
    assert!(h.stage.state().get(id).is_none());
    h.stage.state().check_invariants().unwrap();
}

#[test]
fn slow_drag_from_shelf_settles_at_the_front() {
    let mut h = Harness::new();
    let canonical = h.canonical("V");
    let press = h.front_face_px(canonical, Vec2::ZERO);
    h.drag(press, press + Vec2::new(0.0, 400.0), 30, FRAME_MS);
    h.run(600.0);

    assert_eq!(h.stage.state().lineup_symbols(), vec!["V"]);
    let clone = h.stage.state().lineup()[0];
    assert_ne!(clone, canonical);
    let o = h.stage.state().get(clone).unwrap();
    assert!(approx(o.transform.position.z, 0.0));
    assert!(approx(o.transform.scale, 1.0));
    // canonical stays home
    let c = h.stage.state().get(canonical).unwrap();
    assert_eq!(c.transform, c.origin());
    // settling plays the chord
    assert!(h.notes.iter().any(|n| n.layer == Layer::Bass));
}

#[test]
fn press_on_empty_space_does_nothing() {
    let mut h = Harness::new();
    assert!(!h.stage.handle_pointer_down(Vec2::new(5.0, 710.0), h.now));
    h.stage
        .handle_pointer_up(Vec2::new(5.0, 710.0), h.now + 30.0, &mut h.notes);
    assert!(h.notes.is_empty());
    assert!(h.stage.state().lineup().is_empty());
}

#[test]
fn sequence_plays_one_chord_per_beat() {
    let mut h = Harness::new();
    for symbol in ["I", "vi", "IV", "V"] {
        h.stage.pull_symbol(symbol, 0, h.now, &mut h.notes).unwrap();
    }
    h.run(700.0);
    h.stage.drain_events();
    h.notes.clear();

    let start = h.now;
    assert_eq!(h.stage.play_sequence(start), 4);
    let mut out = Vec::new();
    h.stage.tick(start, &mut out);
    h.stage.tick(start + 999.0, &mut out);
    let steps = |events: &[StageEvent]| {
        events
            .iter()
            .filter(|e| matches!(e, StageEvent::SequenceStep { .. }))
            .count()
    };
    assert_eq!(steps(&h.stage.drain_events()), 1);

    h.stage.tick(start + 1000.0, &mut out);
    h.stage.tick(start + 3000.0, &mut out);
    let events = h.stage.drain_events();
    assert_eq!(steps(&events), 3);
    assert_eq!(events.last(), Some(&StageEvent::SequenceFinished));
    assert!(!h.stage.is_playing_sequence());
    assert_eq!(out.iter().filter(|n| n.layer == Layer::Bass).count(), 4);
}

#[test]
fn palette_switch_hides_shelf_cubes_from_picking() {
    let mut h = Harness::new();
    let px = h.front_face_px(h.canonical("IV"), Vec2::ZERO);
    h.stage.set_palette(Palette::Minor);
    assert!(!h.stage.handle_pointer_down(px, h.now));
    h.stage.set_palette(Palette::All);
    assert!(h.stage.handle_pointer_down(px, h.now));
}

#[test]
fn reset_clears_lineup_and_voice_leading() {
    let mut h = Harness::new();
    for symbol in ["ii", "V", "I"] {
        h.stage.pull_symbol(symbol, 0, h.now, &mut h.notes).unwrap();
    }
    h.stage.lock_bass();
    h.stage.play_sequence(h.now);
    h.stage.reset();
    assert!(h.stage.state().lineup().is_empty());
    assert!(!h.stage.is_playing_sequence());
    assert!(h.stage.audio().locked_bass().is_none());
    assert_eq!(h.stage.audio().leading.last_bass, None);
    assert_eq!(h.stage.arrangement().tweens.live_count(), 0);
    h.stage.state().check_invariants().unwrap();
}

//! Headless native session: clicks a progression onto the lineup through the
//! same pointer path as the browser, turns the first chord, then plays the
//! lineup through cpal.
//!
//! Usage: `cubes-native [--shelf FILE] [--config FILE] [SYMBOL...]`

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use cubes_core::constants::CUBE_SIZE;
use cubes_core::{NoteEvent, ObjectId, ShelfMap, Stage, StageConfig, StageEvent, SynthRack};
use glam::{Vec2, Vec3};

mod mixer;

const FRAME: Duration = Duration::from_millis(16);
const CLICK_HOLD_MS: u64 = 40;
const SETTLE_MS: u64 = 800;
const TAIL_MS: u64 = 1500;
const DEFAULT_PROGRESSION: [&str; 4] = ["I", "vi", "IV", "V"];

struct Args {
    shelf: Option<String>,
    config: Option<String>,
    symbols: Vec<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        shelf: None,
        config: None,
        symbols: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--shelf" => args.shelf = Some(it.next().context("--shelf needs a path")?),
            "--config" => args.config = Some(it.next().context("--config needs a path")?),
            _ => args.symbols.push(arg),
        }
    }
    if args.symbols.is_empty() {
        args.symbols = DEFAULT_PROGRESSION.iter().map(|s| s.to_string()).collect();
    }
    Ok(args)
}

/// Drives a stage on a wall clock and sends its notes to the mixer.
struct Session {
    stage: Stage,
    rack: SynthRack,
    origin: Instant,
    notes: Vec<NoteEvent>,
}

impl Session {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn flush(&mut self) {
        if !self.notes.is_empty() {
            self.rack.dispatch(&self.notes);
            self.notes.clear();
        }
        for ev in self.stage.drain_events() {
            match ev {
                StageEvent::Pulled { symbol, index, .. } => {
                    log::info!("[click] {} -> slot {}", symbol, index)
                }
                StageEvent::Rotated { id, inversion, .. } => {
                    log::info!("[click] {} now inversion {}", id, inversion.index())
                }
                StageEvent::SequenceStep { index, id } => {
                    let symbol = self.stage.state().get(id).map(|o| o.symbol).unwrap_or("?");
                    log::info!("[sequence] {} {}", index, symbol)
                }
                other => log::debug!("[stage] {:?}", other),
            }
        }
    }

    fn run_for(&mut self, ms: u64) {
        let until = self.origin.elapsed() + Duration::from_millis(ms);
        while self.origin.elapsed() < until {
            let now = self.now_ms();
            self.stage.tick(now, &mut self.notes);
            self.flush();
            thread::sleep(FRAME);
        }
    }

    fn click(&mut self, at: Vec2) {
        let now = self.now_ms();
        if !self.stage.handle_pointer_down(at, now) {
            log::warn!("[click] nothing under ({:.0}, {:.0})", at.x, at.y);
            return;
        }
        self.run_for(CLICK_HOLD_MS);
        let now = self.now_ms();
        self.stage.handle_pointer_up(at, now, &mut self.notes);
        self.flush();
    }

    /// Screen point on the front face of `id`, offset within the face by `local`.
    fn front_face_px(&self, id: ObjectId, local: Vec2) -> Option<Vec2> {
        let o = self.stage.state().get(id)?;
        let half = 0.5 * CUBE_SIZE * o.transform.scale;
        let p = o.transform.position + Vec3::new(local.x * half, local.y * half, half);
        self.stage
            .camera()
            .world_to_screen(p, self.stage.viewport())
    }
}

fn load_shelf(path: Option<&str>) -> anyhow::Result<ShelfMap> {
    let mut map = ShelfMap::builtin();
    if let Some(path) = path {
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let applied = map.merge_json(&json)?;
        log::info!("[config] {} shelf overrides from {}", applied, path);
    }
    Ok(map)
}

fn load_config(path: Option<&str>) -> anyhow::Result<StageConfig> {
    match path {
        Some(path) => {
            let json =
                std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            Ok(StageConfig::from_json(&json)?)
        }
        None => Ok(StageConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = parse_args()?;
    let shelf = load_shelf(args.shelf.as_deref())?;
    let config = load_config(args.config.as_deref())?;

    let origin = Instant::now();
    let mixer = match mixer::Mixer::start(origin) {
        Ok(m) => Some(m),
        Err(e) => {
            log::warn!("[audio] output unavailable ({e}); running silent");
            None
        }
    };
    let rack = mixer.as_ref().map(|m| m.rack()).unwrap_or_default();

    let mut session = Session {
        stage: Stage::new(config, &shelf),
        rack,
        origin,
        notes: Vec::new(),
    };
    for symbol in &args.symbols {
        let Some(id) = session.stage.state().shelf_canonical(symbol) else {
            log::warn!("[click] `{}` is not on the shelf; skipping", symbol);
            continue;
        };
        // families share shelf space, so show only the one being clicked
        let family = session.stage.state().get(id).map(|o| o.family);
        if let Some(family) = family.filter(|f| *f != session.stage.state().palette()) {
            session.stage.set_palette(family);
        }
        let Some(at) = session.front_face_px(id, Vec2::ZERO) else {
            log::warn!("[click] `{}` is off screen; skipping", symbol);
            continue;
        };
        session.click(at);
        session.run_for(SETTLE_MS);
    }

    // turn the first chord to first inversion with a right-quadrant click
    if let Some(&first) = session.stage.state().lineup().first() {
        if let Some(at) = session.front_face_px(first, Vec2::new(0.6, 0.0)) {
            session.click(at);
            session.run_for(SETTLE_MS);
        }
    }

    let now = session.now_ms();
    let steps = session.stage.play_sequence(now);
    if steps == 0 {
        log::warn!("[sequence] nothing to play");
        return Ok(());
    }
    let beat_ms = session.stage.audio().settings.chord_interval_ms() as u64;
    session.run_for(beat_ms * steps as u64 + TAIL_MS);
    while session.stage.is_playing_sequence() {
        session.run_for(100);
    }
    if let Some(m) = &mixer {
        log::info!("[audio] {} voices still sounding at exit", m.active_voices());
    }
    log::info!(
        "[session] lineup: {}",
        session.stage.state().lineup_symbols().join(" ")
    );
    Ok(())
}

//! Canvas2D scene drawing: painter-sorted cubes with tone labels and a
//! one-line status header.

use cubes_core::constants::CUBE_SIZE;
use cubes_core::music::tones_for;
use cubes_core::voicing::face_order;
use cubes_core::{ChordObject, Membership, ObjectId, Palette, Stage, VoiceLeadingMode};
use glam::{Quat, Vec2, Vec3};
use web_sys as web;

const BACKGROUND: &str = "#101218";
const EDGE: &str = "rgba(0,0,0,0.55)";
const LABEL: &str = "#f4f1ea";
const HIGHLIGHT: &str = "#ffd166";

// Outward normal plus the two in-plane axes of each cube face.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
];

fn family_rgb(family: Palette) -> [u8; 3] {
    match family {
        Palette::Major => [76, 132, 214],
        Palette::Minor => [150, 92, 196],
        Palette::Applied => [222, 132, 64],
        Palette::All => [140, 140, 140],
    }
}

fn shade(rgb: [u8; 3], k: f32, alpha: f32) -> String {
    let c = |v: u8| ((v as f32 * k).clamp(0.0, 255.0)) as u8;
    format!("rgba({},{},{},{:.2})", c(rgb[0]), c(rgb[1]), c(rgb[2]), alpha)
}

pub struct SceneStyle {
    pub highlight: Option<ObjectId>,
    pub started: bool,
}

pub fn draw(ctx: &web::CanvasRenderingContext2d, stage: &Stage, style: &SceneStyle) {
    let viewport = stage.viewport();
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, viewport.x as f64, viewport.y as f64);

    let eye = stage.camera().eye;
    let mut visible: Vec<&ChordObject> = stage.state().objects().filter(|o| o.visible).collect();
    // far to near
    visible.sort_by(|a, b| {
        let da = a.transform.position.distance_squared(eye);
        let db = b.transform.position.distance_squared(eye);
        db.total_cmp(&da)
    });
    for obj in visible {
        draw_cube(ctx, stage, obj, style.highlight == Some(obj.id));
    }
    draw_header(ctx, stage, viewport);
    if !style.started {
        draw_banner(ctx, viewport, "click to start audio");
    }
}

fn draw_cube(ctx: &web::CanvasRenderingContext2d, stage: &Stage, obj: &ChordObject, lit: bool) {
    let camera = stage.camera();
    let viewport = stage.viewport();
    let half = 0.5 * CUBE_SIZE * obj.transform.scale;
    let rot = Quat::from_rotation_z(obj.rotation_z);
    let center = obj.transform.position;
    let world = |local: Vec3| center + rot * (local * half);

    let rgb = family_rgb(obj.family);
    let alpha = match obj.membership {
        Membership::Shelf => 0.75,
        Membership::Lineup | Membership::Dragging => 0.95,
    };
    let key = stage.audio().settings.key;
    let tones = tones_for(obj.symbol, key);
    let seventh = stage.audio().settings.include_seventh;

    for (normal, u, v) in FACES {
        let n_world = rot * normal;
        let face_center = world(normal);
        if n_world.dot(eye_dir(camera.eye, face_center)) <= 0.0 {
            continue;
        }
        let corners = [
            normal - u - v,
            normal + u - v,
            normal + u + v,
            normal - u + v,
        ];
        let mut pts: [Vec2; 4] = [Vec2::ZERO; 4];
        let mut ok = true;
        for (p, c) in pts.iter_mut().zip(corners) {
            match camera.world_to_screen(world(c), viewport) {
                Some(s) => *p = s,
                None => ok = false,
            }
        }
        if !ok {
            continue;
        }
        // light from above and slightly in front
        let light = 0.55 + 0.45 * n_world.dot(Vec3::new(0.0, 0.8, 0.6).normalize()).max(0.0);
        ctx.begin_path();
        ctx.move_to(pts[0].x as f64, pts[0].y as f64);
        for p in &pts[1..] {
            ctx.line_to(p.x as f64, p.y as f64);
        }
        ctx.close_path();
        ctx.set_fill_style_str(&shade(rgb, light, alpha));
        ctx.fill();
        ctx.set_stroke_style_str(if lit { HIGHLIGHT } else { EDGE });
        ctx.set_line_width(if lit { 3.0 } else { 1.0 });
        ctx.stroke();
    }

    let Some(front_center) = camera.world_to_screen(world(Vec3::Z), viewport) else {
        return;
    };
    let Some(front_top) = camera.world_to_screen(world(Vec3::new(0.0, 1.0, 1.0)), viewport) else {
        return;
    };
    let px_half = front_center.distance(front_top).max(1.0);
    ctx.set_fill_style_str(LABEL);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_font(&format!("bold {:.0}px sans-serif", (px_half * 0.5).clamp(8.0, 40.0)));
    let _ = ctx.fill_text(obj.symbol, front_center.x as f64, front_center.y as f64);

    // local edges turn with the cube; edge j rests at world slot j - r
    ctx.set_font(&format!("{:.0}px sans-serif", (px_half * 0.28).clamp(6.0, 22.0)));
    let order = face_order(obj.inversion, seventh);
    let r = obj.inversion.index();
    let edges = [
        Vec3::new(0.0, -0.72, 1.0),
        Vec3::new(0.72, 0.0, 1.0),
        Vec3::new(0.0, 0.72, 1.0),
        Vec3::new(-0.72, 0.0, 1.0),
    ];
    for (j, local) in edges.into_iter().enumerate() {
        let Some(&tone) = order.get((j + 4 - r) % 4) else {
            continue;
        };
        if let Some(p) = camera.world_to_screen(world(local), viewport) {
            let _ = ctx.fill_text(tones.names[tone], p.x as f64, p.y as f64);
        }
    }
}

#[inline]
fn eye_dir(eye: Vec3, p: Vec3) -> Vec3 {
    (eye - p).normalize_or_zero()
}

fn draw_header(ctx: &web::CanvasRenderingContext2d, stage: &Stage, viewport: Vec2) {
    let s = &stage.audio().settings;
    let on = |b: bool| if b { "on" } else { "off" };
    let mode = match s.voice_leading {
        VoiceLeadingMode::NearestOctave => "nearest",
        VoiceLeadingMode::BoundedSearch => "search",
    };
    let status = format!(
        "key {}  |  {:.0} bpm  |  chord {}  bass {}{}  melody {}{}  7th {}  |  {}  |  {:?}{}",
        s.key.name(),
        s.bpm,
        on(s.chord_enabled),
        on(s.bass_enabled),
        if stage.audio().locked_bass().is_some() { " (locked)" } else { "" },
        on(s.melody_enabled),
        if stage.audio().locked_melody().is_some() { " (locked)" } else { "" },
        on(s.include_seventh),
        mode,
        stage.state().palette(),
        if stage.is_playing_sequence() { "  |  playing" } else { "" },
    );
    let size = (viewport.y * 0.022).clamp(11.0, 22.0);
    ctx.set_font(&format!("{:.0}px monospace", size));
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    ctx.set_fill_style_str("rgba(244,241,234,0.85)");
    let _ = ctx.fill_text(&status, 12.0, 10.0);
    ctx.set_fill_style_str("rgba(244,241,234,0.45)");
    let _ = ctx.fill_text(
        "a-g key (shift: flat)  7 seventh  q bass  w melody  x chord  v voice-leading  1-4 palette  space play  l/k lock  +/- tempo  backspace remove  r reset",
        12.0,
        10.0 + size as f64 * 1.5,
    );
}

fn draw_banner(ctx: &web::CanvasRenderingContext2d, viewport: Vec2, text: &str) {
    ctx.set_font(&format!("{:.0}px sans-serif", (viewport.y * 0.04).clamp(14.0, 36.0)));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(HIGHLIGHT);
    let _ = ctx.fill_text(text, viewport.x as f64 * 0.5, viewport.y as f64 * 0.88);
}

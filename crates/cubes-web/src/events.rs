use std::cell::RefCell;
use std::rc::Rc;

use cubes_core::{Key, NoteEvent, Palette, Stage, SynthRack, VoiceLeadingMode};
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::input;

const BPM_STEP: f32 = 5.0;

#[inline]
fn now_ms(audio_ctx: &web::AudioContext) -> f64 {
    audio_ctx.current_time() * 1000.0
}

fn toggle(flag: &mut bool, label: &str) {
    *flag = !*flag;
    log::info!("[keys] {} {}", label, if *flag { "on" } else { "off" });
}

pub fn handle_global_keydown(
    ev: &web::KeyboardEvent,
    stage: &Rc<RefCell<Stage>>,
    audio_ctx: &web::AudioContext,
) {
    let key = ev.key();
    let mut stage = stage.borrow_mut();
    match key.as_str() {
        "a" | "b" | "c" | "d" | "e" | "f" | "g" => {
            if let Some(k) = Key::parse(&key) {
                stage.settings_mut().key = k;
                log::info!("[keys] key {}", k.name());
            }
        }
        // shift+letter selects the flat key a semitone below
        "A" | "B" | "C" | "D" | "E" | "F" | "G" => {
            match Key::parse(&format!("{}b", key)) {
                Some(k) => {
                    stage.settings_mut().key = k;
                    log::info!("[keys] key {}", k.name());
                }
                None => log::debug!("[keys] no key {}b", key),
            }
        }
        "7" => toggle(&mut stage.settings_mut().include_seventh, "seventh"),
        "q" => toggle(&mut stage.settings_mut().bass_enabled, "bass"),
        "w" => toggle(&mut stage.settings_mut().melody_enabled, "melody"),
        "x" => toggle(&mut stage.settings_mut().chord_enabled, "chord"),
        "v" => {
            let s = stage.settings_mut();
            s.voice_leading = match s.voice_leading {
                VoiceLeadingMode::NearestOctave => VoiceLeadingMode::BoundedSearch,
                VoiceLeadingMode::BoundedSearch => VoiceLeadingMode::NearestOctave,
            };
            log::info!("[keys] voice leading {:?}", s.voice_leading);
        }
        " " => {
            if stage.is_playing_sequence() {
                stage.stop_sequence();
            } else if stage.play_sequence(now_ms(audio_ctx)) == 0 {
                log::info!("[sequence] lineup is empty");
            }
            ev.prevent_default();
        }
        "Escape" => stage.stop_sequence(),
        "l" => {
            if stage.audio().locked_bass().is_some() {
                stage.unlock_bass();
                log::info!("[keys] bass unlocked");
            } else {
                let n = stage.lock_bass();
                log::info!("[keys] bass locked over {} chords", n);
            }
        }
        "k" => {
            if stage.audio().locked_melody().is_some() {
                stage.unlock_melody();
                log::info!("[keys] melody unlocked");
            } else {
                let n = stage.lock_melody();
                log::info!("[keys] melody locked over {} chords", n);
            }
        }
        "1" => stage.set_palette(Palette::Major),
        "2" => stage.set_palette(Palette::Minor),
        "3" => stage.set_palette(Palette::Applied),
        "4" => stage.set_palette(Palette::All),
        "+" | "=" | "ArrowRight" => {
            let s = stage.settings_mut();
            let bpm = s.bpm + BPM_STEP;
            s.set_bpm(bpm);
            log::info!("[keys] {:.0} bpm", s.bpm);
        }
        "-" | "_" | "ArrowLeft" => {
            let s = stage.settings_mut();
            let bpm = s.bpm - BPM_STEP;
            s.set_bpm(bpm);
            log::info!("[keys] {:.0} bpm", s.bpm);
        }
        "Backspace" => {
            if let Some(&last) = stage.state().lineup().last() {
                if let Err(e) = stage.remove_member(last) {
                    log::warn!("[keys] remove failed: {}", e);
                }
            }
            ev.prevent_default();
        }
        "r" => stage.reset(),
        _ => {}
    }
}

pub fn wire_global_keydown(stage: Rc<RefCell<Stage>>, audio_ctx: web::AudioContext) {
    if let Some(window) = web::window() {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
                handle_global_keydown(&ev, &stage, &audio_ctx);
            }) as Box<dyn FnMut(_)>);
        let _ =
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub stage: Rc<RefCell<Stage>>,
    pub rack: Rc<RefCell<SynthRack>>,
    pub audio_ctx: web::AudioContext,
}

fn dispatch(rack: &Rc<RefCell<SynthRack>>, notes: &[NoteEvent]) {
    if !notes.is_empty() {
        rack.borrow_mut().dispatch(notes);
    }
}

pub fn wire_input_handlers(w: InputWiring) {
    // pointerdown
    {
        let stage_m = w.stage.clone();
        let audio_m = w.audio_ctx.clone();
        let canvas_target = w.canvas.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
            if ev.button() != 0 {
                return;
            }
            let pos = input::pointer_canvas_px(&ev, &canvas_target);
            let hit = stage_m
                .borrow_mut()
                .handle_pointer_down(pos, now_ms(&audio_m));
            if hit {
                let _ = canvas_target.set_pointer_capture(ev.pointer_id());
            }
            ev.prevent_default();
        }) as Box<dyn FnMut(_)>);
        let _ = w
            .canvas
            .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // pointermove
    {
        let stage_m = w.stage.clone();
        let rack_m = w.rack.clone();
        let audio_m = w.audio_ctx.clone();
        let canvas_m = w.canvas.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_px(&ev, &canvas_m);
            let mut notes = Vec::new();
            stage_m
                .borrow_mut()
                .handle_pointer_move(pos, now_ms(&audio_m), &mut notes);
            dispatch(&rack_m, &notes);
        }) as Box<dyn FnMut(_)>);
        if let Some(wnd) = web::window() {
            let _ = wnd
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
        }
        closure.forget();
    }

    // pointerup
    {
        let stage_m = w.stage.clone();
        let rack_m = w.rack.clone();
        let audio_m = w.audio_ctx.clone();
        let canvas_m = w.canvas.clone();
        let closure = wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_px(&ev, &canvas_m);
            let mut notes = Vec::new();
            stage_m
                .borrow_mut()
                .handle_pointer_up(pos, now_ms(&audio_m), &mut notes);
            dispatch(&rack_m, &notes);
            let _ = canvas_m.release_pointer_capture(ev.pointer_id());
        }) as Box<dyn FnMut(_)>);
        if let Some(wnd) = web::window() {
            let _ =
                wnd.add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
        }
        closure.forget();
    }
}

#![cfg(target_arch = "wasm32")]
//! Browser frontend: Canvas2D drawing, pointer and keyboard wiring, and one
//! WebAudio oscillator synth per playback layer.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use cubes_core::{ShelfMap, Stage, StageConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

mod audio;
mod dom;
mod events;
mod frame;
mod input;
mod render;

const CONFIG_STORAGE_KEY: &str = "chord-cubes.config";
const SHELF_STORAGE_KEY: &str = "chord-cubes.shelf";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("cubes-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

fn load_config() -> StageConfig {
    match dom::local_storage_item(CONFIG_STORAGE_KEY) {
        Some(json) => StageConfig::from_json(&json).unwrap_or_else(|e| {
            log::warn!("[config] ignoring stored config: {}", e);
            StageConfig::default()
        }),
        None => StageConfig::default(),
    }
}

fn load_shelf() -> ShelfMap {
    let mut map = ShelfMap::builtin();
    if let Some(json) = dom::local_storage_item(SHELF_STORAGE_KEY) {
        match map.merge_json(&json) {
            Ok(n) => log::info!("[config] {} shelf overrides applied", n),
            Err(e) => log::warn!("[config] ignoring stored shelf map: {}", e),
        }
    }
    map
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;

    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id("app-canvas")
        .ok_or_else(|| anyhow::anyhow!("missing #app-canvas"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let ctx2d = dom::context_2d(&canvas)?;

    dom::sync_canvas_backing_size(&canvas);
    {
        let canvas_resize = canvas.clone();
        let resize_closure = Closure::wrap(Box::new(move || {
            dom::sync_canvas_backing_size(&canvas_resize);
        }) as Box<dyn FnMut()>);
        window
            .add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref())
            .ok();
        resize_closure.forget();
    }

    let stage = Rc::new(RefCell::new(Stage::new(load_config(), &load_shelf())));
    {
        let mut s = stage.borrow_mut();
        s.set_viewport(input::canvas_size(&canvas));
        render::draw(
            &ctx2d,
            &s,
            &render::SceneStyle {
                highlight: None,
                started: false,
            },
        );
    }

    // Browsers only allow audio after a user gesture; the first click
    // builds the audio graph and hands the canvas to the stage.
    static STARTED: AtomicBool = AtomicBool::new(false);
    let canvas_for_click = canvas.clone();
    let closure = Closure::wrap(Box::new(move || {
        if STARTED.swap(true, Ordering::SeqCst) {
            log::debug!("[gesture] start already triggered; ignoring extra click");
            return;
        }
        let audio_ctx = match web::AudioContext::new() {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("AudioContext error: {:?}", e);
                STARTED.store(false, Ordering::SeqCst);
                return;
            }
        };
        let rack = match audio::build_rack(&audio_ctx) {
            Ok(rack) => rack,
            Err(()) => {
                log::error!("[audio] master bus unavailable; running silent");
                cubes_core::SynthRack::default()
            }
        };
        let rack = Rc::new(RefCell::new(rack));
        log::info!("[gesture] audio started; wiring input");

        events::wire_input_handlers(events::InputWiring {
            canvas: canvas_for_click.clone(),
            stage: stage.clone(),
            rack: rack.clone(),
            audio_ctx: audio_ctx.clone(),
        });
        events::wire_global_keydown(stage.clone(), audio_ctx.clone());

        let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
            stage: stage.clone(),
            rack,
            canvas: canvas_for_click.clone(),
            ctx2d: ctx2d.clone(),
            audio_ctx,
            highlight: None,
            notes: Vec::new(),
        }));
        frame::start_loop(frame_ctx);
    }) as Box<dyn FnMut()>);
    canvas
        .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
        .ok();
    closure.forget();
    Ok(())
}

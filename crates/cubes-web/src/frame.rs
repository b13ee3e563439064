use std::cell::RefCell;
use std::rc::Rc;

use cubes_core::{NoteEvent, ObjectId, Stage, StageEvent, SynthRack};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

use crate::{input, render};

pub struct FrameContext {
    pub stage: Rc<RefCell<Stage>>,
    pub rack: Rc<RefCell<SynthRack>>,
    pub canvas: web::HtmlCanvasElement,
    pub ctx2d: web::CanvasRenderingContext2d,
    pub audio_ctx: web::AudioContext,
    pub highlight: Option<ObjectId>,
    pub notes: Vec<NoteEvent>,
}

impl FrameContext {
    pub fn frame(&mut self) {
        let now_ms = self.audio_ctx.current_time() * 1000.0;
        let size = input::canvas_size(&self.canvas);

        let stage_rc = self.stage.clone();
        let mut stage = stage_rc.borrow_mut();
        if stage.viewport() != size {
            stage.set_viewport(size);
        }
        self.notes.clear();
        stage.tick(now_ms, &mut self.notes);
        if !self.notes.is_empty() {
            self.rack.borrow_mut().dispatch(&self.notes);
        }
        for ev in stage.drain_events() {
            self.on_stage_event(&ev);
        }
        render::draw(
            &self.ctx2d,
            &stage,
            &render::SceneStyle {
                highlight: self.highlight,
                started: true,
            },
        );
    }

    fn on_stage_event(&mut self, ev: &StageEvent) {
        match ev {
            StageEvent::SequenceStep { index, id } => {
                log::debug!("[sequence] step {} -> {}", index, id);
                self.highlight = Some(*id);
            }
            StageEvent::SequenceFinished => {
                log::info!("[sequence] finished");
                self.highlight = None;
            }
            StageEvent::Pulled { id, symbol, index } => {
                log::info!("[click] pulled {} as {} at {}", symbol, id, index);
            }
            StageEvent::Rotated {
                id,
                quarter_turns,
                inversion,
            } => {
                log::info!(
                    "[click] {} turned {} -> inversion {}",
                    id,
                    quarter_turns,
                    inversion.index()
                );
            }
            StageEvent::DragStarted { id, from } => {
                log::info!("[drag] {} from {:?}", id, from);
            }
            StageEvent::Released { id, outcome, .. } => {
                log::info!("[drag] {} released: {:?}", id, outcome);
            }
        }
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    let frame_ctx_tick = frame_ctx.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx_tick.borrow_mut().frame();
        if let (Some(w), Some(cb)) = (web::window(), tick_clone.borrow().as_ref()) {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut()>));
    if let (Some(w), Some(cb)) = (web::window(), tick.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

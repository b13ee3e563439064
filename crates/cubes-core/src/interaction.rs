//! Pointer-session state machine: turns raw press/move/release samples into
//! click and drag intents. It never mutates arrangement state itself.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::arrangement::ObjectId;
use crate::constants::{
    CLICK_MAX_MS, CLICK_MAX_PX, DRAG_SMOOTH_TAU_MS, DRAG_START_PX, FLICK_MAX_MS, FLICK_MIN_PX,
};
use crate::picking::Pick;

/// Pixel and time thresholds for gesture classification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub drag_start_px: f32,
    pub click_max_px: f32,
    pub click_max_ms: f64,
    pub flick_max_ms: f64,
    pub flick_min_px: f32,
    pub smoothing_tau_ms: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_start_px: DRAG_START_PX,
            click_max_px: CLICK_MAX_PX,
            click_max_ms: CLICK_MAX_MS,
            flick_max_ms: FLICK_MAX_MS,
            flick_min_px: FLICK_MIN_PX,
            smoothing_tau_ms: DRAG_SMOOTH_TAU_MS,
        }
    }
}

/// Summary of a finished drag, evaluated once on release.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReleaseGesture {
    pub duration_ms: f64,
    /// Net upward screen motion since the press; positive is toward the shelf.
    pub shelfward_px: f32,
}

impl ReleaseGesture {
    pub fn is_flick(&self, config: &GestureConfig) -> bool {
        self.duration_ms < config.flick_max_ms && self.shelfward_px > config.flick_min_px
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Click(Pick),
    BeginDrag {
        target: ObjectId,
        press: Vec2,
        pointer: Vec2,
    },
    UpdateDrag {
        pointer: Vec2,
    },
    EndDrag {
        pointer: Vec2,
        gesture: ReleaseGesture,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum PointerState {
    #[default]
    Idle,
    Pressed {
        target: Pick,
        press: Vec2,
        started_ms: f64,
    },
    Dragging {
        press: Vec2,
        started_ms: f64,
    },
}

#[derive(Debug, Default)]
pub struct InteractionFsm {
    config: GestureConfig,
    state: PointerState,
}

impl InteractionFsm {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: PointerState::Idle,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn state(&self) -> &PointerState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, PointerState::Dragging { .. })
    }

    /// Press on a picked object. Ignored unless idle or when nothing was hit.
    pub fn pointer_down(&mut self, pointer: Vec2, now_ms: f64, pick: Option<Pick>) -> bool {
        match (&self.state, pick) {
            (PointerState::Idle, Some(target)) => {
                self.state = PointerState::Pressed {
                    target,
                    press: pointer,
                    started_ms: now_ms,
                };
                true
            }
            _ => false,
        }
    }

    pub fn pointer_move(&mut self, pointer: Vec2, _now_ms: f64) -> Option<Intent> {
        match self.state {
            PointerState::Pressed {
                target,
                press,
                started_ms,
            } => {
                if pointer.distance(press) <= self.config.drag_start_px {
                    return None;
                }
                self.state = PointerState::Dragging { press, started_ms };
                Some(Intent::BeginDrag {
                    target: target.id,
                    press,
                    pointer,
                })
            }
            PointerState::Dragging { .. } => Some(Intent::UpdateDrag { pointer }),
            PointerState::Idle => None,
        }
    }

    /// Release. A press that was neither a click nor a drag resolves to nothing.
    pub fn pointer_up(&mut self, pointer: Vec2, now_ms: f64) -> Option<Intent> {
        match std::mem::take(&mut self.state) {
            PointerState::Pressed {
                target,
                press,
                started_ms,
            } => {
                let moved = pointer.distance(press);
                let elapsed = now_ms - started_ms;
                (moved <= self.config.click_max_px && elapsed <= self.config.click_max_ms)
                    .then_some(Intent::Click(target))
            }
            PointerState::Dragging { press, started_ms } => Some(Intent::EndDrag {
                pointer,
                gesture: ReleaseGesture {
                    duration_ms: now_ms - started_ms,
                    shelfward_px: press.y - pointer.y,
                },
            }),
            PointerState::Idle => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = PointerState::Idle;
    }
}

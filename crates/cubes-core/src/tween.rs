//! Frame-driven tween scheduler with per-owner cancellation.
//!
//! Tweens mutate a caller-supplied target (`T`) through boxed update closures,
//! so the scheduler never holds references into the state it animates. Time is
//! always passed in explicitly, which keeps tests deterministic.

use crate::arrangement::ObjectId;

/// Property group a tween writes; one live tween per (owner, channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Transform,
    Rotation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    Linear,
    #[default]
    InOutCubic,
    OutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InOutCubic => ease_in_out_cubic(t),
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

type UpdateFn<T> = Box<dyn FnMut(&mut T, f32)>;
type CompleteFn<T> = Box<dyn FnOnce(&mut T)>;

struct Tween<T> {
    handle: TweenHandle,
    owner: ObjectId,
    channel: Channel,
    start_ms: f64,
    duration_ms: f64,
    easing: Easing,
    update: UpdateFn<T>,
    on_complete: Option<CompleteFn<T>>,
    cancelled: bool,
}

impl<T> Tween<T> {
    fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }
}

pub struct Scheduler<T> {
    now_ms: f64,
    next_handle: u64,
    active: Vec<Tween<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0.0,
            next_handle: 0,
            active: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Move the clock forward without advancing tweens; new tweens start here.
    pub fn sync_clock(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Start a tween, cancelling any live tween on the same owner and channel.
    pub fn animate(
        &mut self,
        owner: ObjectId,
        channel: Channel,
        duration_ms: f64,
        easing: Easing,
        update: impl FnMut(&mut T, f32) + 'static,
    ) -> TweenHandle {
        self.push(owner, channel, duration_ms, easing, Box::new(update), None)
    }

    /// Like [`Scheduler::animate`] but runs `on_complete` once `t` reaches 1.
    /// Cancelled tweens never run it.
    pub fn animate_then(
        &mut self,
        owner: ObjectId,
        channel: Channel,
        duration_ms: f64,
        easing: Easing,
        update: impl FnMut(&mut T, f32) + 'static,
        on_complete: impl FnOnce(&mut T) + 'static,
    ) -> TweenHandle {
        self.push(
            owner,
            channel,
            duration_ms,
            easing,
            Box::new(update),
            Some(Box::new(on_complete)),
        )
    }

    fn push(
        &mut self,
        owner: ObjectId,
        channel: Channel,
        duration_ms: f64,
        easing: Easing,
        update: UpdateFn<T>,
        on_complete: Option<CompleteFn<T>>,
    ) -> TweenHandle {
        self.cancel_channel(owner, channel);
        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        self.active.push(Tween {
            handle,
            owner,
            channel,
            start_ms: self.now_ms,
            duration_ms,
            easing,
            update,
            on_complete,
            cancelled: false,
        });
        handle
    }

    /// Mark every tween of `owner` cancelled; they are dropped on the next tick.
    pub fn cancel_for(&mut self, owner: ObjectId) -> usize {
        let mut n = 0;
        for tw in self.active.iter_mut().filter(|tw| tw.owner == owner && !tw.cancelled) {
            tw.cancelled = true;
            n += 1;
        }
        n
    }

    pub fn cancel_channel(&mut self, owner: ObjectId, channel: Channel) {
        for tw in self
            .active
            .iter_mut()
            .filter(|tw| tw.owner == owner && tw.channel == channel)
        {
            tw.cancelled = true;
        }
    }

    pub fn is_active(&self, owner: ObjectId, channel: Channel) -> bool {
        self.active
            .iter()
            .any(|tw| tw.owner == owner && tw.channel == channel && !tw.cancelled)
    }

    pub fn live_count(&self) -> usize {
        self.active.iter().filter(|tw| !tw.cancelled).count()
    }

    /// Advance every live tween to `now_ms`. Returns the handles that completed.
    pub fn tick(&mut self, now_ms: f64, target: &mut T) -> Vec<TweenHandle> {
        self.now_ms = self.now_ms.max(now_ms);
        self.active.retain(|tw| !tw.cancelled);
        let now = self.now_ms;
        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.active.len() {
            let tw = &mut self.active[i];
            let t = tw.progress(now);
            let eased = tw.easing.apply(t);
            (tw.update)(target, eased);
            if t >= 1.0 {
                let mut done = self.active.remove(i);
                if let Some(on_complete) = done.on_complete.take() {
                    on_complete(target);
                }
                finished.push(done.handle);
            } else {
                i += 1;
            }
        }
        finished
    }
}

//! Named countdown timers owned by an entity
//!
//! Sibling behaviors start timers by name and poll them; the timer behavior
//! itself only counts down during its own `tick`.

use ahash::AHashMap;

use crate::ecs::behavior::{Behavior, Siblings};
use crate::ecs::context::BehaviorContext;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    remaining: f32,
    finished: bool,
}

#[derive(Debug, Default)]
pub struct TimerBehavior {
    timers: AHashMap<&'static str, Timer>,
}

impl TimerBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or restart `name` with `seconds` to run
    pub fn start(&mut self, name: &'static str, seconds: f32) {
        self.timers.insert(
            name,
            Timer {
                remaining: seconds.max(0.0),
                finished: false,
            },
        );
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.timers.get(name).is_some_and(|t| !t.finished)
    }

    /// Seconds left on `name`, zero when finished or never started
    pub fn remaining(&self, name: &str) -> f32 {
        self.timers
            .get(name)
            .filter(|t| !t.finished)
            .map_or(0.0, |t| t.remaining)
    }

    /// True once after `name` runs out; the timer is forgotten afterwards
    pub fn take_finished(&mut self, name: &str) -> bool {
        match self.timers.get(name) {
            Some(timer) if timer.finished => {
                self.timers.remove(name);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, name: &str) -> bool {
        self.timers.remove(name).is_some()
    }

    /// Count every running timer down by `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        for timer in self.timers.values_mut().filter(|t| !t.finished) {
            timer.remaining -= delta;
            if timer.remaining <= 0.0 {
                timer.remaining = 0.0;
                timer.finished = true;
            }
        }
    }
}

impl Behavior for TimerBehavior {
    fn tick(&mut self, ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        self.advance(ctx.delta());
    }
}

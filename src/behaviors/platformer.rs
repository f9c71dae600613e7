//! Side-view character movement: run, jump, fall, land
//!
//! Movement is a small state machine over [`MoveState`]. Each tick picks the
//! next state from input and the previous tick's ground contact, integrates
//! velocity, then moves the owner through the collision resolver and reads
//! ground, ceiling and wall contacts back from the resolved collisions. An
//! owner that was not pushed out of anything probes one pixel down for
//! ground it is resting on.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::behaviors::damageable::DamageListener;
use crate::collision::resolver::Contact;
use crate::core::types::LayerMask;
use crate::ecs::behavior::{Behavior, Siblings};
use crate::ecs::context::BehaviorContext;
use crate::input::Button;

/// How far below the owner a resting contact is looked for
const GROUND_PROBE: f32 = 1.0;

/// Tuning values, in pixels and seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformerParams {
    pub move_acceleration: f32,
    pub max_move_speed: f32,
    /// Fraction of horizontal velocity kept each tick
    pub drag: f32,
    /// Longest time the jump button keeps lifting
    pub max_jump_time: f32,
    pub jump_velocity: f32,
    /// Exponent of the jump curve; lower values hang longer near the apex
    pub jump_control: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Upward speed applied when the owner is hurt
    pub knockback: f32,
}

impl Default for PlatformerParams {
    fn default() -> Self {
        Self {
            move_acceleration: 1500.0,
            max_move_speed: 400.0,
            drag: 0.8,
            max_jump_time: 0.35,
            jump_velocity: -1500.0,
            jump_control: 0.14,
            gravity: 1200.0,
            max_fall_speed: 250.0,
            knockback: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MoveState {
    #[default]
    Idle,
    Moving,
    Jumping,
    Falling,
}

/// What the state machine looks at when choosing the next state
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveInput {
    /// -1, 0 or 1
    pub movement: f32,
    pub jump_pressed: bool,
    pub jump_held: bool,
    pub grounded: bool,
    /// The jump ran for its full duration
    pub jump_expired: bool,
}

impl MoveState {
    pub fn next(self, input: MoveInput) -> MoveState {
        let on_ground = |input: MoveInput| {
            if input.movement != 0.0 {
                MoveState::Moving
            } else {
                MoveState::Idle
            }
        };

        match self {
            MoveState::Idle | MoveState::Moving => {
                if !input.grounded {
                    MoveState::Falling
                } else if input.jump_pressed {
                    MoveState::Jumping
                } else {
                    on_ground(input)
                }
            }
            MoveState::Jumping => {
                if input.jump_expired || !input.jump_held {
                    MoveState::Falling
                } else {
                    MoveState::Jumping
                }
            }
            MoveState::Falling => {
                if input.grounded {
                    on_ground(input)
                } else {
                    MoveState::Falling
                }
            }
        }
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, MoveState::Jumping | MoveState::Falling)
    }
}

#[derive(Debug, Clone)]
pub struct PlatformerBehavior {
    params: PlatformerParams,
    state: MoveState,
    velocity: Vec2,
    jump_time: f32,
    grounded: bool,
    facing_left: bool,
    collide_with: LayerMask,
}

impl Default for PlatformerBehavior {
    fn default() -> Self {
        Self::new(PlatformerParams::default())
    }
}

impl PlatformerBehavior {
    pub fn new(params: PlatformerParams) -> Self {
        Self {
            params,
            state: MoveState::Idle,
            velocity: Vec2::ZERO,
            jump_time: 0.0,
            grounded: false,
            facing_left: false,
            collide_with: LayerMask::DEFAULT,
        }
    }

    /// Layers of `Solid` entities that block this character
    pub fn colliding_with(mut self, mask: LayerMask) -> Self {
        self.collide_with = mask;
        self
    }

    pub fn params(&self) -> &PlatformerParams {
        &self.params
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_facing_left(&self) -> bool {
        self.facing_left
    }

    /// Drop all momentum, e.g. after a respawn
    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.jump_time = 0.0;
        self.grounded = false;
        self.state = MoveState::Falling;
    }

    fn integrate(&mut self, movement: f32, jump_held: bool, delta: f32) {
        let p = self.params;

        self.velocity.x += p.move_acceleration * movement * delta;
        self.velocity.x *= p.drag;
        self.velocity.x = self.velocity.x.clamp(-p.max_move_speed, p.max_move_speed);

        if self.state == MoveState::Jumping {
            self.jump_time += delta;
            if self.jump_time <= p.max_jump_time && jump_held {
                let t = self.jump_time / p.max_jump_time;
                self.velocity.y = p.jump_velocity * (1.0 - t.powf(p.jump_control));
                return;
            }
            self.state = MoveState::Falling;
        }

        self.velocity.y = (self.velocity.y + p.gravity * delta).clamp(-p.max_fall_speed, p.max_fall_speed);
    }
}

impl Behavior for PlatformerBehavior {
    fn tick(&mut self, ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        let delta = ctx.delta();
        let input = *ctx.input();
        let movement = input.horizontal();
        if movement != 0.0 {
            self.facing_left = movement < 0.0;
        }

        let next = self.state.next(MoveInput {
            movement,
            jump_pressed: input.pressed(Button::Jump),
            jump_held: input.is_down(Button::Jump),
            grounded: self.grounded,
            jump_expired: self.jump_time > self.params.max_jump_time,
        });
        if next != self.state {
            tracing::trace!("{} {:?} -> {:?}", ctx.owner_id(), self.state, next);
            if next == MoveState::Jumping || self.state == MoveState::Jumping {
                self.jump_time = 0.0;
            }
            self.state = next;
        }

        self.integrate(movement, input.is_down(Button::Jump), delta);

        let collisions = ctx.move_and_collide(self.velocity * delta, self.collide_with);

        self.grounded = false;
        for collision in &collisions {
            match collision.contact() {
                Contact::Ground => {
                    self.grounded = true;
                    self.velocity.y = self.velocity.y.min(0.0);
                }
                Contact::Ceiling => {
                    self.velocity.y = self.velocity.y.max(0.0);
                    if self.state == MoveState::Jumping {
                        self.state = MoveState::Falling;
                        self.jump_time = 0.0;
                    }
                }
                Contact::WallLeft | Contact::WallRight => self.velocity.x = 0.0,
            }
        }

        // A zero-length step leaves no contact even when standing on a ledge
        if !self.grounded && self.velocity.y >= 0.0 {
            self.grounded = ctx
                .test_overlap_solid_offset(Vec2::new(0.0, GROUND_PROBE), self.collide_with)
                .is_some();
        }
    }

    fn as_damage_listener(&mut self) -> Option<&mut dyn DamageListener> {
        Some(self)
    }
}

impl DamageListener for PlatformerBehavior {
    fn on_damaged(&mut self, _amount: u32, _remaining_health: u32) {
        self.velocity.y = -self.params.knockback;
        self.grounded = false;
        self.state = MoveState::Falling;
    }
}

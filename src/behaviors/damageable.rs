//! Health with a short invulnerability window after each hit
//!
//! Damage dealt by other entities is queued and applied during the owner's
//! own tick. Sibling behaviors that implement [`DamageListener`] are told
//! about every hit that lands.

use crate::behaviors::timer::TimerBehavior;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::ecs::behavior::{Behavior, BehaviorSlot, Siblings};
use crate::ecs::context::BehaviorContext;

const INVULNERABLE_TIMER: &str = "damageable.invulnerable";

/// Seconds an entity ignores damage after being hit
pub const DEFAULT_INVULNERABILITY: f32 = 0.1;

/// Implemented by behaviors that react to their owner being hurt
pub trait DamageListener {
    fn on_damaged(&mut self, amount: u32, remaining_health: u32);

    /// Health reached zero; the owner is already queued for destruction
    fn on_killed(&mut self) {}
}

#[derive(Debug)]
pub struct DamageableBehavior {
    health: u32,
    max_health: u32,
    invulnerability: f32,
    pending_damage: u32,
    timer: Option<BehaviorSlot<TimerBehavior>>,
}

impl DamageableBehavior {
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            max_health,
            invulnerability: DEFAULT_INVULNERABILITY,
            pending_damage: 0,
            timer: None,
        }
    }

    pub fn with_invulnerability(mut self, seconds: f32) -> Self {
        self.invulnerability = seconds.max(0.0);
        self
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Queue `amount` damage; applied on the owner's next tick
    pub fn damage(&mut self, amount: u32) {
        self.pending_damage = self.pending_damage.saturating_add(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        if !self.is_dead() {
            self.health = self.health.saturating_add(amount).min(self.max_health);
        }
    }

    /// Whether hits are currently ignored
    pub fn is_invulnerable(&self, siblings: &Siblings<'_>) -> bool {
        self.timer
            .and_then(|slot| siblings.get(slot))
            .is_some_and(|timer| timer.is_running(INVULNERABLE_TIMER))
    }
}

impl Default for DamageableBehavior {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Behavior for DamageableBehavior {
    fn resolve(&mut self, owner: EntityId, siblings: &Siblings<'_>) -> Result<()> {
        self.timer = Some(siblings.require::<TimerBehavior>(owner)?);
        Ok(())
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_>, siblings: &mut Siblings<'_>) {
        let amount = std::mem::take(&mut self.pending_damage);
        if amount == 0 || self.is_dead() || self.is_invulnerable(siblings) {
            return;
        }

        let dealt = amount.min(self.health);
        self.health -= dealt;
        tracing::debug!("{} took {} damage, {} left", ctx.owner_id(), dealt, self.health);

        if let Some(timer) = self.timer.and_then(|slot| siblings.get_mut(slot)) {
            timer.start(INVULNERABLE_TIMER, self.invulnerability);
        }

        let remaining = self.health;
        let killed = remaining == 0;
        siblings.for_each_mut(|behavior| {
            if let Some(listener) = behavior.as_damage_listener() {
                listener.on_damaged(dealt, remaining);
                if killed {
                    listener.on_killed();
                }
            }
        });

        if killed {
            ctx.destroy_owner();
        }
    }
}

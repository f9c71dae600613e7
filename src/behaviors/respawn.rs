//! Put an entity back on solid ground after it falls out of the layout

use glam::Vec2;

use crate::behaviors::platformer::PlatformerBehavior;
use crate::core::error::Result;
use crate::core::types::{EntityId, LayerMask};
use crate::ecs::behavior::{Behavior, BehaviorSlot, Siblings};
use crate::ecs::context::BehaviorContext;

#[derive(Debug, Clone)]
pub struct FallRespawnBehavior {
    /// How far below the owner's feet ground still counts as underfoot
    pub probe_depth: f32,
    /// Horizontal step back from the edge the owner walked off
    pub retreat: f32,
    pub ground_layers: LayerMask,
    last_ground: Option<Vec2>,
    retreat_dir: f32,
    respawns: u32,
    platformer: Option<BehaviorSlot<PlatformerBehavior>>,
}

impl Default for FallRespawnBehavior {
    fn default() -> Self {
        Self {
            probe_depth: 1.0,
            retreat: 32.0,
            ground_layers: LayerMask::DEFAULT,
            last_ground: None,
            retreat_dir: -1.0,
            respawns: 0,
            platformer: None,
        }
    }
}

impl FallRespawnBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the owner lands on its next respawn, before the retreat step
    pub fn last_ground(&self) -> Option<Vec2> {
        self.last_ground
    }

    pub fn respawns(&self) -> u32 {
        self.respawns
    }

    /// Remember where the owner stands while it has ground underfoot
    fn probe_ground(&mut self, ctx: &BehaviorContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        let Some(ground) = ctx
            .test_overlap_solid_offset(Vec2::new(0.0, self.probe_depth), self.ground_layers)
            .and_then(|id| ctx.entity(id))
        else {
            return;
        };

        // Stand on the ground's top edge
        let position = owner.position();
        let y = ground.bounds().top() + owner.origin().y - owner.size().y;
        self.last_ground = Some(Vec2::new(position.x, y));

        let travel = position.x - owner.previous_position().x;
        if travel != 0.0 {
            self.retreat_dir = -travel.signum();
        }
    }
}

impl Behavior for FallRespawnBehavior {
    fn resolve(&mut self, _owner: EntityId, siblings: &Siblings<'_>) -> Result<()> {
        self.platformer = siblings.find::<PlatformerBehavior>();
        Ok(())
    }

    fn on_owner_created(&mut self, ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        self.last_ground = ctx.owner().map(|owner| owner.position());
    }

    fn post_tick(&mut self, ctx: &mut BehaviorContext<'_>, siblings: &mut Siblings<'_>) {
        self.probe_ground(ctx);

        let fell_out = ctx
            .owner()
            .is_some_and(|owner| owner.bounds().top() > ctx.world_bounds().bottom());
        if !fell_out {
            return;
        }
        let Some(ground) = self.last_ground else {
            return;
        };

        let target = ground + Vec2::new(self.retreat * self.retreat_dir, 0.0);
        ctx.set_owner_position(target);
        self.respawns += 1;

        if let Some(platformer) = self.platformer.and_then(|slot| siblings.get_mut(slot)) {
            platformer.stop();
        }
        tracing::debug!("{} fell out of the layout, respawned at {}", ctx.owner_id(), target);
    }
}

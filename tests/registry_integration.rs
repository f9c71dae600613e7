//! Integration tests for deferred spawn/destroy and behavior dispatch

use std::sync::{Arc, Mutex};

use layout_core::behaviors::{DamageableBehavior, TimerBehavior};
use layout_core::ecs::EntityRegistry;
use layout_core::{
    Behavior, BehaviorContext, EntityDefinition, EntityId, FrameInput, InputSnapshot, Layout, LayoutConfig,
    LayoutError, Siblings, SpatialGrid, Vec2,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records every hook it receives as `label:hook`
struct Probe {
    label: &'static str,
    log: Log,
}

impl Probe {
    fn push(&self, hook: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.label, hook));
    }
}

impl Behavior for Probe {
    fn on_owner_created(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        self.push("created");
    }

    fn tick(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        self.push("tick");
    }

    fn on_owner_destroyed(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        self.push("destroyed");
    }
}

fn logged(label: &'static str, log: &Log) -> EntityDefinition {
    let log = log.clone();
    EntityDefinition::new(Vec2::new(8.0, 8.0))
        .overlap()
        .with_behavior(move || Probe {
            label,
            log: log.clone(),
        })
}

/// Destroys a fixed target on its first tick
struct Assassin {
    target: EntityId,
    done: bool,
}

impl Behavior for Assassin {
    fn tick(&mut self, ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        if !self.done {
            ctx.destroy(self.target);
            self.done = true;
        }
    }
}

/// Spawns one copy of a definition on its first tick
struct Spawner {
    definition: EntityDefinition,
    spawned: Arc<Mutex<Option<EntityId>>>,
}

impl Behavior for Spawner {
    fn tick(&mut self, ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {
        let mut spawned = self.spawned.lock().unwrap();
        if spawned.is_none() {
            *spawned = Some(ctx.spawn(&self.definition, Vec2::new(40.0, 40.0)));
        }
    }
}

fn layout() -> Layout {
    Layout::new(LayoutConfig::with_world(16.0, 128.0, 128.0)).unwrap()
}

fn step(layout: &mut Layout) {
    layout.step(1.0 / 60.0, InputSnapshot::idle()).unwrap();
}

#[test]
fn test_spawn_then_destroy_before_commit() {
    let log = new_log();
    let mut registry = EntityRegistry::new();
    let mut grid = SpatialGrid::new(16.0, 64.0, 64.0).unwrap();

    let e = registry.spawn(&logged("e", &log), Vec2::new(10.0, 10.0));
    assert!(registry.destroy(e));
    assert!(!registry.destroy(e));

    let summary = registry.commit(&mut grid, &FrameInput::new(0, 1.0 / 60.0)).unwrap();
    assert_eq!(summary.spawned, 1);
    assert_eq!(summary.destroyed, 1);
    assert_eq!(entries(&log), vec!["e:created", "e:destroyed"]);
    assert!(!registry.is_live(e));
    assert!(registry.live_ids().is_empty());
    assert_eq!(grid.membership_count(), 0);
}

#[test]
fn test_destroy_during_tick_is_deferred() {
    let log = new_log();
    let mut layout = layout();
    let victim = layout.spawn(&logged("victim", &log), Vec2::new(50.0, 50.0));
    let assassin = EntityDefinition::new(Vec2::ONE).with_behavior(move || Assassin {
        target: victim,
        done: false,
    });
    layout.spawn(&assassin, Vec2::ZERO);

    step(&mut layout);
    // Still live for the rest of the frame it was marked in
    assert!(layout.registry().is_live(victim));
    assert!(layout.entity(victim).unwrap().is_destroyed());
    assert_eq!(entries(&log), vec!["victim:created", "victim:tick"]);

    let stats = layout.step(1.0 / 60.0, InputSnapshot::idle()).unwrap();
    assert_eq!(stats.destroyed, 1);
    assert!(layout.entity(victim).is_none());
    assert_eq!(entries(&log), vec!["victim:created", "victim:tick", "victim:destroyed"]);
}

#[test]
fn test_spawn_during_tick_waits_for_next_frame() {
    let log = new_log();
    let mut layout = layout();
    let spawned = Arc::new(Mutex::new(None));
    let child = logged("child", &log);
    let slot = spawned.clone();
    let spawner = EntityDefinition::new(Vec2::ONE).with_behavior(move || Spawner {
        definition: child.clone(),
        spawned: slot.clone(),
    });
    layout.spawn(&spawner, Vec2::ZERO);

    step(&mut layout);
    let child_id = spawned.lock().unwrap().expect("spawned during tick");
    assert!(!layout.registry().is_live(child_id));
    assert!(entries(&log).is_empty());

    step(&mut layout);
    assert!(layout.registry().is_live(child_id));
    assert_eq!(entries(&log), vec!["child:created", "child:tick"]);
}

#[test]
fn test_live_order_is_creation_order() {
    let log = new_log();
    let mut layout = layout();
    let a = layout.spawn(&logged("a", &log), Vec2::ZERO);
    let b = layout.spawn(&logged("b", &log), Vec2::ZERO);
    let c = layout.spawn(&logged("c", &log), Vec2::ZERO);
    step(&mut layout);

    assert_eq!(layout.registry().live_ids(), &[a, b, c]);
    assert_eq!(
        entries(&log),
        vec!["a:created", "b:created", "c:created", "a:tick", "b:tick", "c:tick"]
    );

    layout.destroy(b);
    step(&mut layout);
    assert_eq!(layout.registry().live_ids(), &[a, c]);
}

#[test]
fn test_missing_sibling_fails_commit() {
    let mut layout = layout();
    let broken = EntityDefinition::new(Vec2::ONE).with_behavior(|| DamageableBehavior::new(3));
    let id = layout.spawn(&broken, Vec2::ZERO);
    let wall = layout.spawn(&EntityDefinition::new(Vec2::new(8.0, 8.0)).solid(), Vec2::new(20.0, 20.0));

    match layout.step(1.0 / 60.0, InputSnapshot::idle()) {
        Err(LayoutError::MissingBehavior { entity, behavior }) => {
            assert_eq!(entity, id);
            assert_eq!(behavior, "TimerBehavior");
        }
        other => panic!("expected MissingBehavior, got {:?}", other),
    }

    // The valid spawn queued behind the broken one goes live next frame
    let stats = layout.step(1.0 / 60.0, InputSnapshot::idle()).unwrap();
    assert_eq!(stats.spawned, 1);
    assert_eq!(stats.live, 1);
    assert!(layout.entity(id).is_none());
    assert!(layout.registry().is_live(wall));
    assert_eq!(layout.registry().pending_spawn_count(), 0);
}

#[test]
fn test_damage_kills_and_destroys_owner() {
    let mut layout = layout();
    let target = EntityDefinition::new(Vec2::new(8.0, 8.0))
        .overlap()
        .with_behavior(TimerBehavior::new)
        .with_behavior(|| DamageableBehavior::new(2).with_invulnerability(0.5));
    let id = layout.spawn(&target, Vec2::new(20.0, 20.0));
    step(&mut layout);

    layout.behavior_mut::<DamageableBehavior>(id).unwrap().damage(1);
    step(&mut layout);
    assert_eq!(layout.behavior::<DamageableBehavior>(id).unwrap().health(), 1);

    // Ignored while the invulnerability timer runs
    layout.behavior_mut::<DamageableBehavior>(id).unwrap().damage(1);
    step(&mut layout);
    assert_eq!(layout.behavior::<DamageableBehavior>(id).unwrap().health(), 1);

    for _ in 0..40 {
        step(&mut layout);
    }
    layout.behavior_mut::<DamageableBehavior>(id).unwrap().damage(5);
    step(&mut layout);
    assert!(layout.behavior::<DamageableBehavior>(id).unwrap().is_dead());
    assert!(layout.registry().is_live(id));

    step(&mut layout);
    assert!(layout.entity(id).is_none());
}

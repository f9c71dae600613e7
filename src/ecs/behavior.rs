//! Behaviors and typed access to sibling behaviors
//!
//! A behavior is bound to one entity for the entity's whole lifetime. While
//! one of an entity's behaviors runs, the others are reachable through
//! [`Siblings`], addressed by [`BehaviorSlot`]s that are resolved once when
//! the entity is committed.

use std::any::Any;
use std::marker::PhantomData;

use crate::behaviors::damageable::DamageListener;
use crate::core::error::{LayoutError, Result};
use crate::core::types::EntityId;
use crate::ecs::context::BehaviorContext;

/// Downcasting support for behavior trait objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-entity unit of logic
///
/// Hooks run in this order over an entity's life: `resolve` and
/// `on_owner_created` during the commit that makes the entity live, then
/// `tick` and `post_tick` once per frame, then `on_owner_destroyed` during
/// the commit that removes it.
pub trait Behavior: AsAny {
    /// Look up sibling behaviors this one depends on.
    ///
    /// Runs once, before `on_owner_created`. Returning an error aborts the
    /// commit: a definition missing a required sibling is malformed.
    fn resolve(&mut self, _owner: EntityId, _siblings: &Siblings<'_>) -> Result<()> {
        Ok(())
    }

    fn on_owner_created(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {}

    fn tick(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {}

    /// Runs after every entity finished `tick` for this frame
    fn post_tick(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {}

    fn on_owner_destroyed(&mut self, _ctx: &mut BehaviorContext<'_>, _siblings: &mut Siblings<'_>) {}

    /// Opt in to damage notifications from a sibling `DamageableBehavior`
    fn as_damage_listener(&mut self) -> Option<&mut dyn DamageListener> {
        None
    }
}

/// Typed index of a sibling behavior on the same entity
pub struct BehaviorSlot<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BehaviorSlot<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Position of the behavior in its entity's definition
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for BehaviorSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BehaviorSlot<T> {}

impl<T> std::fmt::Debug for BehaviorSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BehaviorSlot<{}>({})", short_type_name::<T>(), self.index)
    }
}

/// The other behaviors of the entity whose behavior is currently running
pub struct Siblings<'a> {
    before: &'a mut [Box<dyn Behavior>],
    after: &'a mut [Box<dyn Behavior>],
}

impl<'a> Siblings<'a> {
    /// Split off the behavior at `index`, returning it with its siblings
    pub(crate) fn split(
        behaviors: &'a mut [Box<dyn Behavior>],
        index: usize,
    ) -> Option<(&'a mut Box<dyn Behavior>, Siblings<'a>)> {
        if index >= behaviors.len() {
            return None;
        }
        let (before, rest) = behaviors.split_at_mut(index);
        let (current, after) = rest.split_first_mut()?;
        Some((current, Siblings { before, after }))
    }

    /// Number of siblings, not counting the running behavior
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, index: usize) -> Option<&dyn Behavior> {
        let split = self.before.len();
        if index < split {
            Some(&*self.before[index])
        } else if index == split {
            None
        } else {
            self.after.get(index - split - 1).map(|b| &**b)
        }
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Box<dyn Behavior>> {
        let split = self.before.len();
        if index < split {
            Some(&mut self.before[index])
        } else if index == split {
            None
        } else {
            self.after.get_mut(index - split - 1)
        }
    }

    /// First sibling of type `T`
    pub fn find<T: Behavior>(&self) -> Option<BehaviorSlot<T>> {
        let split = self.before.len();
        let in_before = self
            .before
            .iter()
            .position(|b| (**b).as_any().is::<T>());
        if let Some(index) = in_before {
            return Some(BehaviorSlot::new(index));
        }
        self.after
            .iter()
            .position(|b| (**b).as_any().is::<T>())
            .map(|index| BehaviorSlot::new(split + 1 + index))
    }

    /// Like [`find`](Self::find), failing with `MissingBehavior`
    pub fn require<T: Behavior>(&self, owner: EntityId) -> Result<BehaviorSlot<T>> {
        self.find::<T>().ok_or(LayoutError::MissingBehavior {
            entity: owner,
            behavior: short_type_name::<T>(),
        })
    }

    pub fn get<T: Behavior>(&self, slot: BehaviorSlot<T>) -> Option<&T> {
        self.slot(slot.index)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Behavior>(&mut self, slot: BehaviorSlot<T>) -> Option<&mut T> {
        let behavior = self.slot_mut(slot.index)?;
        (**behavior).as_any_mut().downcast_mut::<T>()
    }

    /// Visit every sibling in definition order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut dyn Behavior)) {
        for behavior in self.before.iter_mut().chain(self.after.iter_mut()) {
            f(&mut **behavior);
        }
    }
}

/// Type name without its module path
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Engine {
        revs: u32,
    }
    impl Behavior for Engine {}

    #[derive(Default)]
    struct Wheels;
    impl Behavior for Wheels {}

    #[derive(Default)]
    struct Horn;
    impl Behavior for Horn {}

    fn car() -> Vec<Box<dyn Behavior>> {
        vec![Box::new(Engine::default()), Box::new(Wheels), Box::new(Horn)]
    }

    #[test]
    fn test_find_skips_current() {
        let mut behaviors = car();
        let (_current, siblings) = Siblings::split(&mut behaviors, 1).expect("in range");
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings.find::<Engine>().map(|s| s.index()), Some(0));
        assert_eq!(siblings.find::<Horn>().map(|s| s.index()), Some(2));
        assert!(siblings.find::<Wheels>().is_none());
    }

    #[test]
    fn test_slot_resolves_to_same_behavior_later() {
        let mut behaviors = car();
        let slot = {
            let (_current, siblings) = Siblings::split(&mut behaviors, 2).expect("in range");
            siblings.find::<Engine>().expect("engine present")
        };

        // Resolved from the horn, used later while the wheels run
        let (_current, mut siblings) = Siblings::split(&mut behaviors, 1).expect("in range");
        siblings.get_mut(slot).expect("engine").revs += 3;
        assert_eq!(siblings.get(slot).map(|e| e.revs), Some(3));
    }

    #[test]
    fn test_slot_pointing_at_current_is_none() {
        let mut behaviors = car();
        let (_current, siblings) = Siblings::split(&mut behaviors, 1).expect("in range");
        let engine = siblings.find::<Engine>().expect("engine present");

        let (_current, siblings) = Siblings::split(&mut behaviors, 0).expect("in range");
        assert!(siblings.get(engine).is_none());
    }

    #[test]
    fn test_require_reports_missing_type() {
        let mut behaviors: Vec<Box<dyn Behavior>> = vec![Box::new(Horn)];
        let (_current, siblings) = Siblings::split(&mut behaviors, 0).expect("in range");
        match siblings.require::<Engine>(EntityId(9)) {
            Err(LayoutError::MissingBehavior { entity, behavior }) => {
                assert_eq!(entity, EntityId(9));
                assert_eq!(behavior, "Engine");
            }
            other => panic!("expected MissingBehavior, got {:?}", other.map(|s| s.index())),
        }
    }

    #[test]
    fn test_split_out_of_range() {
        let mut behaviors = car();
        assert!(Siblings::split(&mut behaviors, 3).is_none());
    }
}

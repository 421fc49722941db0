//! Actors and the scene-bound entity set.
//!
//! An [`Actor`] is a bag of optional capabilities (health, experience,
//! position, inventory, quest log, a dialogue to offer) under one persistent
//! entity key. A [`World`] owns the actors of the current scene together
//! with the [`KeyRegistry`] that keeps their keys unique. Engine concerns
//! (navigation, physics, rendering) stay outside; collaborators feed events
//! in through methods like [`World::apply_damage`].

use crate::dialogue::condition::ConditionEvaluator;
use crate::dialogue::Dialogue;
use crate::inventory::Inventory;
use crate::quest::{grant_rewards, QuestLog};
use crate::registry::{InstanceId, KeyRegistry};
use crate::saving::Persistable;
use crate::stats::{Experience, Health, Position, Stats};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies a scene within the game's scene list.
pub type SceneIndex = u32;

/// A registered reaction to a dialogue action token.
struct ActionTrigger {
    token: String,
    handler: Box<dyn FnMut() + Send>,
}

impl fmt::Debug for ActionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTrigger")
            .field("token", &self.token)
            .finish()
    }
}

/// A gameplay entity: a persistent key plus whatever capabilities it has.
#[derive(Debug)]
pub struct Actor {
    instance: InstanceId,
    key: String,
    name: String,
    pub stats: Option<Stats>,
    pub health: Option<Health>,
    pub experience: Option<Experience>,
    pub position: Option<Position>,
    pub inventory: Option<Inventory>,
    pub quest_log: Option<QuestLog>,
    /// The dialogue this actor offers when spoken to.
    pub dialogue: Option<Arc<Dialogue>>,
    triggers: Vec<ActionTrigger>,
}

impl Actor {
    /// Create an actor with no capabilities and no entity key yet; spawning
    /// it into a [`World`] assigns one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            instance: Uuid::new_v4(),
            key: String::new(),
            name: name.into(),
            stats: None,
            health: None,
            experience: None,
            position: None,
            inventory: None,
            quest_log: None,
            dialogue: None,
            triggers: Vec::new(),
        }
    }

    /// Use a key baked into scene data instead of minting a fresh one.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_experience(mut self, experience: Experience) -> Self {
        self.experience = Some(experience);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_quest_log(mut self, quest_log: QuestLog) -> Self {
        self.quest_log = Some(quest_log);
        self
    }

    pub fn with_dialogue(mut self, dialogue: Arc<Dialogue>) -> Self {
        self.dialogue = Some(dialogue);
        self
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The persistable capabilities currently attached, in a stable order.
    pub fn persistables(&self) -> Vec<&dyn Persistable> {
        let mut parts: Vec<&dyn Persistable> = Vec::new();
        if let Some(health) = &self.health {
            parts.push(health);
        }
        if let Some(experience) = &self.experience {
            parts.push(experience);
        }
        if let Some(position) = &self.position {
            parts.push(position);
        }
        if let Some(inventory) = &self.inventory {
            parts.push(inventory);
        }
        if let Some(quest_log) = &self.quest_log {
            parts.push(quest_log);
        }
        parts
    }

    pub fn persistables_mut(&mut self) -> Vec<&mut dyn Persistable> {
        let mut parts: Vec<&mut dyn Persistable> = Vec::new();
        if let Some(health) = &mut self.health {
            parts.push(health);
        }
        if let Some(experience) = &mut self.experience {
            parts.push(experience);
        }
        if let Some(position) = &mut self.position {
            parts.push(position);
        }
        if let Some(inventory) = &mut self.inventory {
            parts.push(inventory);
        }
        if let Some(quest_log) = &mut self.quest_log {
            parts.push(quest_log);
        }
        parts
    }

    /// The condition evaluators this actor exposes to dialogue.
    pub fn evaluators(&self) -> Vec<&dyn ConditionEvaluator> {
        let mut evaluators: Vec<&dyn ConditionEvaluator> = Vec::new();
        if let Some(quest_log) = &self.quest_log {
            evaluators.push(quest_log);
        }
        if let Some(inventory) = &self.inventory {
            evaluators.push(inventory);
        }
        evaluators
    }

    /// Register a handler for a dialogue action token.
    pub fn on_action(&mut self, token: impl Into<String>, handler: impl FnMut() + Send + 'static) {
        self.triggers.push(ActionTrigger {
            token: token.into(),
            handler: Box::new(handler),
        });
    }

    /// Fire every handler registered for `token`. Returns how many fired.
    pub fn dispatch_action(&mut self, token: &str) -> usize {
        let mut fired = 0;
        for trigger in &mut self.triggers {
            if trigger.token == token {
                (trigger.handler)();
                fired += 1;
            }
        }
        debug!(actor = %self.name, token, fired, "dialogue action dispatched");
        fired
    }

    /// Add experience and resolve any level-ups it pays for.
    pub fn gain_experience(&mut self, points: f32) {
        let Some(experience) = &mut self.experience else {
            return;
        };
        experience.gain(points);
        self.check_level_up();
    }

    /// Level up while the experience total covers the next threshold,
    /// replenishing health at each new level. Safe to call after a restore.
    pub fn check_level_up(&mut self) {
        let (Some(experience), Some(stats)) = (&mut self.experience, &mut self.stats) else {
            return;
        };

        while stats.level() < stats.max_level() && experience.points() >= stats.experience() {
            stats.level_up();
            experience.notify_level_up();
            debug!(actor = %self.name, level = stats.level(), "level up");
            if let Some(health) = &mut self.health {
                health.replenish(stats.max_health());
            }
        }
    }

    /// Mark a quest objective complete, granting rewards into this actor's
    /// inventory when the quest finishes.
    pub fn complete_objective(&mut self, quest: &str, objective: &str) {
        let Some(quest_log) = &mut self.quest_log else {
            warn!(actor = %self.name, quest, "objective completed without a quest log");
            return;
        };

        let rewards = quest_log.complete_objective(quest, objective);
        if rewards.is_empty() {
            return;
        }
        match &mut self.inventory {
            Some(inventory) => grant_rewards(&rewards, inventory),
            None => warn!(actor = %self.name, quest, "quest rewards lost, actor has no inventory"),
        }
    }
}

/// The set of live actors in the current scene.
#[derive(Debug)]
pub struct World {
    scene: SceneIndex,
    actors: Vec<Actor>,
    registry: KeyRegistry,
}

impl World {
    pub fn new(scene: SceneIndex) -> Self {
        Self {
            scene,
            actors: Vec::new(),
            registry: KeyRegistry::new(),
        }
    }

    pub fn scene(&self) -> SceneIndex {
        self.scene
    }

    /// Add an actor, reconciling its entity key through the registry.
    /// Returns the key the actor ended up with.
    pub fn spawn(&mut self, mut actor: Actor) -> String {
        self.registry
            .ensure_unique_key(actor.instance, &mut actor.key);
        let key = actor.key.clone();
        self.actors.push(actor);
        key
    }

    /// Remove an actor, releasing its registry claim to later claimants.
    pub fn remove(&mut self, key: &str) -> Option<Actor> {
        let index = self.actors.iter().position(|actor| actor.key == key)?;
        let actor = self.actors.remove(index);
        self.registry.unregister(actor.instance);
        Some(actor)
    }

    pub fn actor(&self, key: &str) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.key == key)
    }

    pub fn actor_mut(&mut self, key: &str) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.key == key)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn actors_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Combat collaborator input: damage flows from attacker to target, and
    /// a lethal blow pays the target's experience value to the attacker.
    pub fn apply_damage(&mut self, attacker: &str, target: &str, damage: f32) {
        let Some(index) = self.actors.iter().position(|actor| actor.key == target) else {
            warn!(target, "damage applied to unknown actor");
            return;
        };

        let (lethal, reward) = {
            let victim = &mut self.actors[index];
            let lethal = victim
                .health
                .as_mut()
                .map(|health| health.take_damage(damage))
                .unwrap_or(false);
            let reward = victim.stats.as_ref().map(Stats::experience).unwrap_or(0.0);
            (lethal, reward)
        };

        if lethal && reward > 0.0 {
            if let Some(killer) = self.actor_mut(attacker) {
                killer.gain_experience(reward);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Progression;

    fn progression() -> Arc<Progression> {
        Arc::new(Progression::geometric(5, 100.0, 10.0, 50.0, 20.0))
    }

    fn fighter(name: &str, key: &str) -> Actor {
        let stats = Stats::new(progression());
        let health = Health::new(stats.max_health());
        Actor::new(name)
            .with_key(key)
            .with_stats(stats)
            .with_health(health)
            .with_experience(Experience::new())
    }

    #[test]
    fn test_spawn_assigns_missing_keys() {
        let mut world = World::new(0);
        let key = world.spawn(Actor::new("Crate"));
        assert!(!key.is_empty());
        assert!(world.actor(&key).is_some());
    }

    #[test]
    fn test_spawn_resolves_key_collisions() {
        let mut world = World::new(0);
        let first = world.spawn(fighter("First", "X"));
        let second = world.spawn(fighter("Second", "X"));

        assert_eq!(first, "X");
        assert_ne!(second, "X");
        assert_eq!(world.len(), 2);
        assert_eq!(world.actor("X").unwrap().name(), "First");
    }

    #[test]
    fn test_removed_actor_frees_its_key() {
        let mut world = World::new(0);
        world.spawn(fighter("First", "X"));
        world.remove("X").unwrap();

        let key = world.spawn(fighter("Second", "X"));
        assert_eq!(key, "X");
        assert_eq!(world.actor("X").unwrap().name(), "Second");
    }

    #[test]
    fn test_lethal_damage_grants_experience() {
        let mut world = World::new(0);
        world.spawn(fighter("Hero", "hero"));
        world.spawn(fighter("Bandit", "bandit"));

        world.apply_damage("hero", "bandit", 40.0);
        assert_eq!(world.actor("hero").unwrap().experience.as_ref().unwrap().points(), 0.0);

        world.apply_damage("hero", "bandit", 100.0);
        let hero = world.actor("hero").unwrap();
        // Bandit was level 1: worth 50 experience, exactly the level-2 threshold.
        assert_eq!(hero.experience.as_ref().unwrap().points(), 50.0);
        assert_eq!(hero.stats.as_ref().unwrap().level(), 2);
        assert!(world.actor("bandit").unwrap().health.as_ref().unwrap().is_dead());
    }

    #[test]
    fn test_level_up_replenishes_health() {
        let mut world = World::new(0);
        world.spawn(fighter("Hero", "hero"));

        let hero = world.actor_mut("hero").unwrap();
        hero.health.as_mut().unwrap().take_damage(60.0);
        assert_eq!(hero.health.as_ref().unwrap().current(), 40.0);

        hero.gain_experience(50.0);
        assert_eq!(hero.stats.as_ref().unwrap().level(), 2);
        assert_eq!(hero.health.as_ref().unwrap().current(), 110.0);
    }

    #[test]
    fn test_dispatch_action_fires_matching_handlers() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let counter = Arc::new(AtomicU32::new(0));
        let mut actor = Actor::new("Innkeeper");
        {
            let counter = Arc::clone(&counter);
            actor.on_action("GiveQuest", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        actor.on_action("Farewell", || {});

        assert_eq!(actor.dispatch_action("GiveQuest"), 1);
        assert_eq!(actor.dispatch_action("Unknown"), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

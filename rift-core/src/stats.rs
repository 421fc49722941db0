//! Level progression, health, experience, and position capabilities.
//!
//! Progression is table-driven: a per-level maximum-health table and a
//! cumulative experience-threshold table, typically generated with
//! geometric growth. Health and experience are the persisted capabilities;
//! the level itself is scene-baked and re-derived from experience on
//! restore.

use crate::saving::Persistable;
use crate::signal::Signal;
use crate::value::SaveValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Per-level stat tables for one character archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    max_health: Vec<f32>,
    /// Cumulative experience required to move past each level.
    experience_thresholds: Vec<f32>,
}

impl Progression {
    pub fn new(max_health: Vec<f32>, experience_thresholds: Vec<f32>) -> Self {
        Self {
            max_health,
            experience_thresholds,
        }
    }

    /// Generate tables with geometric growth: each level's health grows by
    /// `health_growth_pct` over the previous, and each level's experience
    /// goal grows by `experience_growth_pct` and accumulates.
    pub fn geometric(
        levels: u32,
        initial_health: f32,
        health_growth_pct: f32,
        initial_experience: f32,
        experience_growth_pct: f32,
    ) -> Self {
        let levels = levels.max(1) as usize;
        let mut max_health = Vec::with_capacity(levels);
        let mut experience_thresholds = Vec::with_capacity(levels);

        for level in 0..levels {
            if level == 0 {
                max_health.push(initial_health.round());
                experience_thresholds.push(initial_experience.round());
            } else {
                let previous_health = max_health[level - 1];
                max_health.push((previous_health * (1.0 + health_growth_pct / 100.0)).round());

                let goal = initial_experience
                    * (1.0 + experience_growth_pct / 100.0).powi(level as i32);
                experience_thresholds.push(experience_thresholds[level - 1] + goal.round());
            }
        }

        Self {
            max_health,
            experience_thresholds,
        }
    }

    /// Highest level the tables describe.
    pub fn max_level(&self) -> u32 {
        self.max_health.len().min(self.experience_thresholds.len()) as u32
    }

    /// Maximum health at `level` (1-based). Out-of-range levels warn and
    /// yield 0.
    pub fn max_health(&self, level: u32) -> f32 {
        match self.max_health.get(level.wrapping_sub(1) as usize) {
            Some(value) if level >= 1 => *value,
            _ => {
                warn!(level, "level outside progression table");
                0.0
            }
        }
    }

    /// Cumulative experience needed to advance past `level` (1-based).
    /// Out-of-range levels warn and yield 0.
    pub fn experience(&self, level: u32) -> f32 {
        match self.experience_thresholds.get(level.wrapping_sub(1) as usize) {
            Some(value) if level >= 1 => *value,
            _ => {
                warn!(level, "level outside progression table");
                0.0
            }
        }
    }
}

/// Scene-baked level and progression handle. Not persisted; the level is
/// re-derived from experience on restore.
#[derive(Debug, Clone)]
pub struct Stats {
    level: u32,
    progression: Arc<Progression>,
}

impl Stats {
    pub fn new(progression: Arc<Progression>) -> Self {
        Self {
            level: 1,
            progression,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max_level(&self) -> u32 {
        self.progression.max_level()
    }

    pub fn max_health(&self) -> f32 {
        self.progression.max_health(self.level)
    }

    /// Experience meaning depends on perspective: the threshold to level up
    /// for the owner, the kill reward for whoever defeats the owner.
    pub fn experience(&self) -> f32 {
        self.progression.experience(self.level)
    }

    pub fn level_up(&mut self) {
        self.level += 1;
    }
}

/// Hit-point capability.
#[derive(Debug)]
pub struct Health {
    current: f32,
    dead: bool,
    changed: Signal,
    hit: Signal,
    died: Signal,
}

impl Health {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            dead: initial <= 0.0,
            changed: Signal::new(),
            hit: Signal::new(),
            died: Signal::new(),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Apply damage. Returns `true` when this blow was lethal. Damage to an
    /// already-dead entity is ignored.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        if self.dead {
            return false;
        }

        self.current -= damage;
        self.changed.emit();
        self.hit.emit();

        if self.current <= 0.0 {
            self.dead = true;
            self.changed.emit();
            self.died.emit();
            return true;
        }
        false
    }

    /// Restore to full for the given maximum.
    pub fn replenish(&mut self, max: f32) {
        self.current = max;
        self.dead = max <= 0.0;
        self.changed.emit();
    }

    pub fn on_changed(&mut self, listener: impl FnMut() + Send + 'static) {
        self.changed.connect(listener);
    }

    pub fn on_hit(&mut self, listener: impl FnMut() + Send + 'static) {
        self.hit.connect(listener);
    }

    pub fn on_died(&mut self, listener: impl FnMut() + Send + 'static) {
        self.died.connect(listener);
    }
}

impl Persistable for Health {
    fn state_key(&self) -> &'static str {
        "health"
    }

    fn capture_state(&self) -> SaveValue {
        SaveValue::from(self.current)
    }

    fn restore_state(&mut self, state: &SaveValue) {
        let Some(current) = state.as_f32() else {
            warn!("malformed health state, keeping current value");
            return;
        };

        let was_dead = self.dead;
        self.current = current;
        self.dead = current <= 0.0;
        self.changed.emit();
        if self.dead && !was_dead {
            self.died.emit();
        }
    }
}

/// Experience-point capability.
#[derive(Debug)]
pub struct Experience {
    points: f32,
    changed: Signal,
    leveled_up: Signal,
}

impl Experience {
    pub fn new() -> Self {
        Self {
            points: 0.0,
            changed: Signal::new(),
            leveled_up: Signal::new(),
        }
    }

    pub fn with_points(mut self, points: f32) -> Self {
        self.points = points;
        self
    }

    pub fn points(&self) -> f32 {
        self.points
    }

    /// Add points and notify. Level-up checking lives on the owning actor,
    /// which also holds the stats and health this capability cannot see.
    pub fn gain(&mut self, points: f32) {
        self.points += points;
        self.changed.emit();
    }

    pub(crate) fn notify_level_up(&mut self) {
        self.leveled_up.emit();
    }

    pub fn on_changed(&mut self, listener: impl FnMut() + Send + 'static) {
        self.changed.connect(listener);
    }

    pub fn on_level_up(&mut self, listener: impl FnMut() + Send + 'static) {
        self.leveled_up.connect(listener);
    }
}

impl Default for Experience {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistable for Experience {
    fn state_key(&self) -> &'static str {
        "experience"
    }

    fn capture_state(&self) -> SaveValue {
        SaveValue::from(self.points)
    }

    fn restore_state(&mut self, state: &SaveValue) {
        let Some(points) = state.as_f32() else {
            warn!("malformed experience state, keeping current value");
            return;
        };
        self.points = points;
        self.changed.emit();
    }
}

/// World-position capability. Navigation is the host engine's concern; only
/// the resting position is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    coords: [f32; 3],
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { coords: [x, y, z] }
    }

    pub fn coords(&self) -> [f32; 3] {
        self.coords
    }

    pub fn set(&mut self, coords: [f32; 3]) {
        self.coords = coords;
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Persistable for Position {
    fn state_key(&self) -> &'static str {
        "position"
    }

    fn capture_state(&self) -> SaveValue {
        SaveValue::from(self.coords)
    }

    fn restore_state(&mut self, state: &SaveValue) {
        let Some(coords) = state.as_vec3() else {
            warn!("malformed position state, keeping current value");
            return;
        };
        self.coords = coords;
    }
}

//! Quest definitions, per-quest progress, and the quest log capability.
//!
//! Quest definitions are content, registered into a [`QuestCatalog`] and
//! referenced by title; the catalog is how saved quest logs resolve their
//! records back to definitions. The [`QuestLog`] answers dialogue
//! conditions and reports rewards when a quest completes.

use crate::dialogue::condition::ConditionEvaluator;
use crate::inventory::Inventory;
use crate::saving::Persistable;
use crate::signal::Signal;
use crate::value::SaveValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One step of a quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestObjective {
    pub identifier: String,
    pub description: String,
}

/// An item granted when the quest completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestReward {
    pub item_id: String,
    pub amount: u32,
}

/// A quest definition: objectives to finish and rewards for doing so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    title: String,
    #[serde(default)]
    objectives: Vec<QuestObjective>,
    #[serde(default)]
    rewards: Vec<QuestReward>,
}

impl Quest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            objectives: Vec::new(),
            rewards: Vec::new(),
        }
    }

    pub fn with_objective(
        mut self,
        identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.objectives.push(QuestObjective {
            identifier: identifier.into(),
            description: description.into(),
        });
        self
    }

    pub fn with_reward(mut self, item_id: impl Into<String>, amount: u32) -> Self {
        self.rewards.push(QuestReward {
            item_id: item_id.into(),
            amount: amount.max(1),
        });
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn objectives(&self) -> &[QuestObjective] {
        &self.objectives
    }

    pub fn objective_count(&self) -> usize {
        self.objectives.len()
    }

    pub fn rewards(&self) -> &[QuestReward] {
        &self.rewards
    }

    pub fn has_objective(&self, identifier: &str) -> bool {
        self.objectives
            .iter()
            .any(|objective| objective.identifier == identifier)
    }
}

/// Registry resolving quest titles to definitions.
#[derive(Debug, Default)]
pub struct QuestCatalog {
    quests: HashMap<String, Arc<Quest>>,
}

impl QuestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, quest: Quest) -> Arc<Quest> {
        let quest = Arc::new(quest);
        self.quests.insert(quest.title.clone(), Arc::clone(&quest));
        quest
    }

    pub fn get(&self, title: &str) -> Option<Arc<Quest>> {
        self.quests.get(title).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

/// Progress through a single quest.
#[derive(Debug, Clone)]
pub struct QuestProgress {
    quest: Arc<Quest>,
    completed: HashSet<String>,
}

impl QuestProgress {
    pub fn new(quest: Arc<Quest>) -> Self {
        Self {
            quest,
            completed: HashSet::new(),
        }
    }

    pub fn quest(&self) -> &Arc<Quest> {
        &self.quest
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_objective_complete(&self, identifier: &str) -> bool {
        self.completed.contains(identifier)
    }

    /// Mark an objective complete. Identifiers the quest does not define
    /// are ignored. Returns `true` if progress changed.
    pub fn complete_objective(&mut self, identifier: &str) -> bool {
        if !self.quest.has_objective(identifier) {
            return false;
        }
        self.completed.insert(identifier.to_string())
    }

    /// Whether every objective is complete.
    pub fn is_complete(&self) -> bool {
        self.quest
            .objectives
            .iter()
            .all(|objective| self.completed.contains(&objective.identifier))
    }
}

/// The quest-tracking capability of an actor.
#[derive(Debug)]
pub struct QuestLog {
    statuses: HashMap<String, QuestProgress>,
    catalog: Arc<QuestCatalog>,
    changed: Signal,
}

impl QuestLog {
    pub fn new(catalog: Arc<QuestCatalog>) -> Self {
        Self {
            statuses: HashMap::new(),
            catalog,
            changed: Signal::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<QuestCatalog> {
        &self.catalog
    }

    /// Start tracking a quest. Adding a quest twice is a no-op.
    pub fn add_quest(&mut self, quest: &Arc<Quest>) {
        if self.statuses.contains_key(quest.title()) {
            return;
        }
        self.statuses
            .insert(quest.title().to_string(), QuestProgress::new(Arc::clone(quest)));
        debug!(quest = quest.title(), "quest added");
        self.changed.emit();
    }

    pub fn has_quest(&self, title: &str) -> bool {
        self.statuses.contains_key(title)
    }

    pub fn progress(&self, title: &str) -> Option<&QuestProgress> {
        self.statuses.get(title)
    }

    pub fn statuses(&self) -> impl Iterator<Item = &QuestProgress> {
        self.statuses.values()
    }

    /// Mark an objective complete. When this call is what completes the
    /// quest, the quest's rewards are returned for the owner to grant;
    /// repeated calls on a finished quest return nothing.
    pub fn complete_objective(&mut self, title: &str, objective: &str) -> Vec<QuestReward> {
        let Some(progress) = self.statuses.get_mut(title) else {
            warn!(quest = title, "objective completed for an untracked quest");
            return Vec::new();
        };

        let was_complete = progress.is_complete();
        if !progress.complete_objective(objective) {
            debug!(quest = title, objective, "objective unchanged");
        }

        let rewards = if !was_complete && progress.is_complete() {
            debug!(quest = title, "quest complete, rewards due");
            progress.quest.rewards().to_vec()
        } else {
            Vec::new()
        };

        self.changed.emit();
        rewards
    }

    pub fn on_changed(&mut self, listener: impl FnMut() + Send + 'static) {
        self.changed.connect(listener);
    }
}

/// Deliver quest rewards into an inventory.
///
/// Stackable rewards are inserted once with their full amount; non-stackable
/// rewards attempt one slot-insert per unit. Units that do not fit are
/// dropped with a warning, mirroring loot falling to the ground.
pub fn grant_rewards(rewards: &[QuestReward], inventory: &mut Inventory) {
    for reward in rewards {
        let Some(item) = inventory.catalog().get(&reward.item_id) else {
            warn!(item_id = %reward.item_id, "reward references an unknown item");
            continue;
        };

        if item.is_stackable() {
            if !inventory.add_to_first_available(&item, reward.amount) {
                warn!(item = item.name(), amount = reward.amount, "inventory full, reward dropped");
            }
        } else {
            for _ in 0..reward.amount {
                if !inventory.add_to_first_available(&item, 1) {
                    warn!(item = item.name(), "inventory full, reward unit dropped");
                }
            }
        }
    }
}

impl Persistable for QuestLog {
    fn state_key(&self) -> &'static str {
        "quests"
    }

    fn capture_state(&self) -> SaveValue {
        let records = self
            .statuses
            .values()
            .map(|progress| {
                let mut record = BTreeMap::new();
                record.insert(
                    "quest".to_string(),
                    SaveValue::from(progress.quest.title()),
                );
                let mut completed: Vec<String> =
                    progress.completed.iter().cloned().collect();
                completed.sort();
                record.insert(
                    "completed".to_string(),
                    SaveValue::List(completed.into_iter().map(SaveValue::from).collect()),
                );
                SaveValue::Map(record)
            })
            .collect();
        SaveValue::List(records)
    }

    fn restore_state(&mut self, state: &SaveValue) {
        let Some(records) = state.as_list() else {
            warn!("malformed quest log state, keeping current quests");
            return;
        };

        self.statuses.clear();
        for record in records {
            let Some(title) = record.get("quest").and_then(SaveValue::as_str) else {
                warn!("quest record without a title, skipped");
                continue;
            };
            let Some(quest) = self.catalog.get(title) else {
                warn!(quest = title, "saved quest no longer exists, skipped");
                continue;
            };

            let mut progress = QuestProgress::new(quest);
            if let Some(completed) = record.get("completed").and_then(SaveValue::as_list) {
                for identifier in completed {
                    if let Some(identifier) = identifier.as_str() {
                        progress.complete_objective(identifier);
                    }
                }
            }
            self.statuses.insert(title.to_string(), progress);
        }
        self.changed.emit();
    }
}

impl ConditionEvaluator for QuestLog {
    fn evaluate(&self, predicate: &str, parameters: &[String]) -> Option<bool> {
        match predicate {
            "HasQuest" => {
                let title = parameters.first()?;
                Some(self.has_quest(title))
            }
            "DoesNotHaveQuest" => {
                let title = parameters.first()?;
                Some(!self.has_quest(title))
            }
            "HasCompletedObjective" => {
                if parameters.len() < 2 {
                    return None;
                }
                let (title, objective) = (&parameters[0], &parameters[1]);
                if self.catalog.get(title).is_none() {
                    debug!(quest = %title, "condition references unknown quest");
                    return Some(false);
                }
                match self.progress(title) {
                    None => Some(false),
                    Some(progress) => Some(progress.is_objective_complete(objective)),
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ItemCatalog, ItemDefinition};

    fn catalogs() -> (Arc<QuestCatalog>, Arc<ItemCatalog>) {
        let mut items = ItemCatalog::new();
        items.register(
            ItemDefinition::new("Healing Draught")
                .with_id("healing-draught")
                .stackable(),
        );
        items.register(ItemDefinition::new("Iron Sword").with_id("iron-sword"));

        let mut quests = QuestCatalog::new();
        quests.register(
            Quest::new("Intro")
                .with_objective("talk", "Talk to the innkeeper")
                .with_objective("kill", "Drive off the bandit")
                .with_reward("iron-sword", 2),
        );
        (Arc::new(quests), Arc::new(items))
    }

    #[test]
    fn test_quest_incomplete_until_all_objectives() {
        let (quests, _) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut progress = QuestProgress::new(intro);

        assert!(!progress.is_complete());
        progress.complete_objective("talk");
        assert!(!progress.is_complete());
        progress.complete_objective("kill");
        assert!(progress.is_complete());
    }

    #[test]
    fn test_unknown_objective_ignored() {
        let (quests, _) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut progress = QuestProgress::new(intro);

        assert!(!progress.complete_objective("dance"));
        assert_eq!(progress.completed_count(), 0);
    }

    #[test]
    fn test_rewards_returned_once_on_completion() {
        let (quests, _) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut log = QuestLog::new(Arc::clone(&quests));
        log.add_quest(&intro);

        assert!(log.complete_objective("Intro", "talk").is_empty());
        let rewards = log.complete_objective("Intro", "kill");
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].amount, 2);

        // Completing again hands out nothing further.
        assert!(log.complete_objective("Intro", "kill").is_empty());
    }

    #[test]
    fn test_non_stackable_rewards_insert_per_unit() {
        let (quests, items) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut inventory = Inventory::new(3, Arc::clone(&items));

        grant_rewards(intro.rewards(), &mut inventory);

        assert_eq!(inventory.quantity_in_slot(0), 1);
        assert_eq!(inventory.quantity_in_slot(1), 1);
        assert!(inventory.item_in_slot(2).is_none());
    }

    #[test]
    fn test_stackable_rewards_insert_once() {
        let (_, items) = catalogs();
        let rewards = vec![QuestReward {
            item_id: "healing-draught".to_string(),
            amount: 4,
        }];
        let mut inventory = Inventory::new(2, Arc::clone(&items));

        grant_rewards(&rewards, &mut inventory);
        assert_eq!(inventory.quantity_in_slot(0), 4);
        assert!(inventory.item_in_slot(1).is_none());
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let (quests, _) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut log = QuestLog::new(Arc::clone(&quests));
        log.add_quest(&intro);
        log.complete_objective("Intro", "talk");

        let captured = log.capture_state();
        let mut restored = QuestLog::new(Arc::clone(&quests));
        restored.restore_state(&captured);

        assert!(restored.has_quest("Intro"));
        let progress = restored.progress("Intro").unwrap();
        assert!(progress.is_objective_complete("talk"));
        assert!(!progress.is_objective_complete("kill"));
    }

    #[test]
    fn test_restore_skips_unknown_quests() {
        let (quests, _) = catalogs();
        let mut record = BTreeMap::new();
        record.insert("quest".to_string(), SaveValue::from("Deleted Quest"));
        record.insert("completed".to_string(), SaveValue::List(Vec::new()));
        let state = SaveValue::List(vec![SaveValue::Map(record)]);

        let mut log = QuestLog::new(quests);
        log.restore_state(&state);
        assert!(!log.has_quest("Deleted Quest"));
    }

    #[test]
    fn test_condition_predicates() {
        let (quests, _) = catalogs();
        let intro = quests.get("Intro").unwrap();
        let mut log = QuestLog::new(Arc::clone(&quests));

        assert_eq!(
            log.evaluate("HasQuest", &["Intro".to_string()]),
            Some(false)
        );
        assert_eq!(
            log.evaluate("DoesNotHaveQuest", &["Intro".to_string()]),
            Some(true)
        );

        log.add_quest(&intro);
        log.complete_objective("Intro", "talk");

        assert_eq!(log.evaluate("HasQuest", &["Intro".to_string()]), Some(true));
        assert_eq!(
            log.evaluate(
                "HasCompletedObjective",
                &["Intro".to_string(), "talk".to_string()]
            ),
            Some(true)
        );
        assert_eq!(
            log.evaluate(
                "HasCompletedObjective",
                &["Intro".to_string(), "kill".to_string()]
            ),
            Some(false)
        );
        assert_eq!(
            log.evaluate("HasCompletedObjective", &["Intro".to_string()]),
            None,
            "missing parameters abstain"
        );
        assert_eq!(log.evaluate("SomeOtherPredicate", &[]), None);
    }
}

//! Built-in demo content.
//!
//! A small set of standard items, a starter quest, and the innkeeper's
//! dialogue, shared by the demo front end and the integration suites.
//! Game-specific content would normally be loaded from asset files; these
//! are the equivalents that ship with the crate.

use crate::dialogue::condition::Condition;
use crate::dialogue::Dialogue;
use crate::inventory::{ItemCatalog, ItemCategory, ItemDefinition};
use crate::quest::{Quest, QuestCatalog};
use crate::stats::Progression;
use std::sync::Arc;

/// Title of the starter quest.
pub const STARTER_QUEST: &str = "Clear the Road";

/// Action token the innkeeper's dialogue fires when offering the quest.
pub const GIVE_QUEST_ACTION: &str = "GiveQuest";

lazy_static::lazy_static! {
    /// Standard items every demo world knows about.
    pub static ref STANDARD_ITEMS: Vec<ItemDefinition> = vec![
        ItemDefinition::new("Healing Draught")
            .with_id("healing-draught")
            .with_description("Knits small wounds closed. Tastes of nettles.")
            .with_category(ItemCategory::Consumable)
            .stackable(),
        ItemDefinition::new("Iron Sword")
            .with_id("iron-sword")
            .with_description("Plain, heavy, dependable.")
            .with_category(ItemCategory::Weapon),
        ItemDefinition::new("Oak Buckler")
            .with_id("oak-buckler")
            .with_description("A round shield with more dents than paint.")
            .with_category(ItemCategory::Armor),
        ItemDefinition::new("Lucky Coin")
            .with_id("lucky-coin")
            .with_description("Someone scratched a face off one side.")
            .with_category(ItemCategory::Trinket)
            .stackable(),
        ItemDefinition::new("Bandit's Mark")
            .with_id("bandits-mark")
            .with_description("Proof of a road made safe.")
            .with_category(ItemCategory::Quest),
    ];
}

/// Catalog holding the standard items.
pub fn standard_item_catalog() -> Arc<ItemCatalog> {
    let mut catalog = ItemCatalog::new();
    for item in STANDARD_ITEMS.iter() {
        catalog.register(item.clone());
    }
    Arc::new(catalog)
}

/// Catalog holding the starter quest.
pub fn standard_quest_catalog() -> Arc<QuestCatalog> {
    let mut catalog = QuestCatalog::new();
    catalog.register(
        Quest::new(STARTER_QUEST)
            .with_objective("talk", "Hear the innkeeper out")
            .with_objective("kill", "Drive the bandit off the east road")
            .with_reward("iron-sword", 1)
            .with_reward("healing-draught", 2),
    );
    Arc::new(catalog)
}

/// Default level tables for demo characters.
pub fn standard_progression() -> Arc<Progression> {
    Arc::new(Progression::geometric(10, 100.0, 10.0, 50.0, 20.0))
}

/// The innkeeper's dialogue tree.
///
/// Offers the starter quest while the innkeeper has not handed it out yet,
/// follows up on it afterwards, and always allows a polite exit.
pub fn innkeeper_dialogue() -> Arc<Dialogue> {
    let mut dialogue = Dialogue::new();
    let root = dialogue.root().id().clone();
    let mut editor = dialogue.edit();

    editor
        .set_text(&root, "Welcome to the Wayside Inn. What can I do for you?")
        .expect("root exists");

    // Work offer, only while the quest has not been handed out.
    let ask_for_work = editor.create_node(Some(&root)).expect("root exists");
    editor
        .set_text(&ask_for_work, "Any work for a sellsword?")
        .expect("node exists");
    editor
        .set_condition(
            &ask_for_work,
            Some(Condition::new("DoesNotHaveQuest", [STARTER_QUEST])),
        )
        .expect("node exists");

    let offer = editor.create_node(Some(&ask_for_work)).expect("node exists");
    editor
        .set_text(
            &offer,
            "Bandits plague the east road. Drive them off and I'll make it worth your while.",
        )
        .expect("node exists");
    editor
        .set_enter_action(&offer, Some(GIVE_QUEST_ACTION))
        .expect("node exists");

    let accept = editor.create_node(Some(&offer)).expect("node exists");
    editor
        .set_text(&accept, "Consider it done.")
        .expect("node exists");

    // Follow-up, once the quest is out.
    let follow_up = editor.create_node(Some(&root)).expect("root exists");
    editor
        .set_text(&follow_up, "About those bandits...")
        .expect("node exists");
    editor
        .set_condition(
            &follow_up,
            Some(Condition::new("HasQuest", [STARTER_QUEST])),
        )
        .expect("node exists");

    let thanks = editor.create_node(Some(&follow_up)).expect("node exists");
    editor
        .set_text(
            &thanks,
            "The east road, past the mill. Come back when it's done.",
        )
        .expect("node exists");

    // Always available farewell.
    let farewell = editor.create_node(Some(&root)).expect("root exists");
    editor
        .set_text(&farewell, "Just passing through. Safe roads to you.")
        .expect("node exists");

    drop(editor);
    Arc::new(dialogue)
}

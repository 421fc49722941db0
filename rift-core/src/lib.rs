//! RPG gameplay core with scene-persistent state.
//!
//! This crate provides:
//! - Branching dialogue graphs with condition-gated edges and a
//!   conversation state machine
//! - Quests, slotted inventories, health/experience progression
//! - A capability-based save/restore framework with stable entity keys
//! - Scene-transition workflows that save and restore around scene swaps
//!
//! # Quick Start
//!
//! ```no_run
//! use rift_core::content;
//! use rift_core::{Actor, Conversation, QuestLog, SaveSystem, World};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut world = World::new(0);
//!     let innkeeper = world.spawn(
//!         Actor::new("Innkeeper")
//!             .with_key("innkeeper")
//!             .with_quest_log(QuestLog::new(content::standard_quest_catalog()))
//!             .with_dialogue(content::innkeeper_dialogue()),
//!     );
//!
//!     let mut conversation = Conversation::new();
//!     conversation.begin(&mut world, &innkeeper, content::innkeeper_dialogue())?;
//!     println!("{}", conversation.text());
//!     conversation.advance(&mut world)?;
//!     conversation.end(&mut world)?;
//!
//!     let saves = SaveSystem::for_app("rift")?;
//!     saves.save("slot-1", &world).await?;
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod dialogue;
pub mod inventory;
pub mod quest;
pub mod registry;
pub mod saving;
pub mod scene;
pub mod signal;
pub mod stats;
pub mod value;
pub mod world;

// Primary public API
pub use dialogue::condition::{Condition, ConditionEvaluator};
pub use dialogue::conversation::{Advance, Conversation, ConversationError};
pub use dialogue::editor::DialogueEditor;
pub use dialogue::{Dialogue, DialogueError, DialogueNode, NodeId, Speaker};
pub use inventory::{Inventory, ItemCatalog, ItemCategory, ItemDefinition};
pub use quest::{Quest, QuestCatalog, QuestLog, QuestProgress};
pub use registry::KeyRegistry;
pub use saving::{Persistable, SaveError, SaveSystem, StateStore};
pub use scene::{portal_transition, resume_last_session, SceneHost};
pub use signal::Signal;
pub use stats::{Experience, Health, Position, Progression, Stats};
pub use value::SaveValue;
pub use world::{Actor, SceneIndex, World};

//! Interactive terminal front end for the rift gameplay core.
//!
//! A deliberately thin presentation layer: it builds a two-scene demo
//! world, forwards commands into the core, and redraws when the core
//! notifies it. All gameplay rules live in `rift-core`.

use anyhow::{Context, Result};
use rift_core::content::{self, GIVE_QUEST_ACTION, STARTER_QUEST};
use rift_core::{
    portal_transition, resume_last_session, Actor, Conversation, Experience, Health, Inventory,
    Position, QuestLog, SaveSystem, SceneHost, SceneIndex, Speaker, Stats, World,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SAVE_SLOT: &str = "demo";
const PLAYER: &str = "player";
const INNKEEPER: &str = "innkeeper";
const BANDIT: &str = "bandit";

const VILLAGE: SceneIndex = 0;
const EAST_ROAD: SceneIndex = 1;

/// Builds the demo scenes and buffers dialogue action tokens until the
/// frame applies them.
struct DemoHost {
    pending_actions: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl SceneHost for DemoHost {
    async fn fade_out(&mut self) {
        println!("(the world fades to black)");
    }

    async fn fade_in(&mut self) {
        println!("(the world fades back in)");
    }

    async fn build_scene(&mut self, scene: SceneIndex) -> World {
        let items = content::standard_item_catalog();
        let quests = content::standard_quest_catalog();
        let progression = content::standard_progression();

        let mut world = World::new(scene);

        let stats = Stats::new(Arc::clone(&progression));
        let health = Health::new(stats.max_health());
        world.spawn(
            Actor::new("You")
                .with_key(PLAYER)
                .with_stats(stats)
                .with_health(health)
                .with_experience(Experience::new())
                .with_position(Position::default())
                .with_inventory(Inventory::new(8, Arc::clone(&items)))
                .with_quest_log(QuestLog::new(Arc::clone(&quests))),
        );

        match scene {
            VILLAGE => {
                let mut innkeeper = Actor::new("Innkeeper")
                    .with_key(INNKEEPER)
                    .with_position(Position::new(3.0, 0.0, 1.0))
                    .with_quest_log(QuestLog::new(Arc::clone(&quests)))
                    .with_dialogue(content::innkeeper_dialogue());
                let pending = Arc::clone(&self.pending_actions);
                innkeeper.on_action(GIVE_QUEST_ACTION, move || {
                    pending.lock().expect("action queue").push(GIVE_QUEST_ACTION.to_string());
                });
                world.spawn(innkeeper);
            }
            EAST_ROAD => {
                let stats = Stats::new(Arc::clone(&progression));
                let health = Health::new(stats.max_health());
                world.spawn(
                    Actor::new("Road Bandit")
                        .with_key(BANDIT)
                        .with_stats(stats)
                        .with_health(health)
                        .with_position(Position::new(-5.0, 0.0, 12.0)),
                );
            }
            _ => debug!(scene, "no extra actors for scene"),
        }

        world
    }
}

struct Game {
    host: DemoHost,
    saves: SaveSystem,
    world: World,
    conversation: Conversation,
    pending_actions: Arc<Mutex<Vec<String>>>,
    redraw: Arc<AtomicBool>,
}

impl Game {
    async fn new() -> Result<Self> {
        let saves = SaveSystem::for_app("rift").context("locating the save directory")?;
        let pending_actions = Arc::new(Mutex::new(Vec::new()));
        let mut host = DemoHost {
            pending_actions: Arc::clone(&pending_actions),
        };

        let mut world = host.build_scene(VILLAGE).await;
        resume_last_session(&mut host, &saves, SAVE_SLOT, &mut world)
            .await
            .context("resuming the previous session")?;

        let redraw = Arc::new(AtomicBool::new(false));
        let mut conversation = Conversation::new();
        {
            let redraw = Arc::clone(&redraw);
            conversation.on_updated(move || {
                redraw.store(true, Ordering::SeqCst);
            });
        }

        Ok(Self {
            host,
            saves,
            world,
            conversation,
            pending_actions,
            redraw,
        })
    }

    /// Apply buffered dialogue actions to the world. The innkeeper handing
    /// out the quest also starts it (and its "talk" objective) for the
    /// player.
    fn apply_pending_actions(&mut self) {
        let tokens: Vec<String> = self.pending_actions.lock().expect("action queue").drain(..).collect();
        for token in tokens {
            if token != GIVE_QUEST_ACTION {
                debug!(%token, "unhandled dialogue action");
                continue;
            }

            let quests = content::standard_quest_catalog();
            let Some(starter) = quests.get(STARTER_QUEST) else {
                continue;
            };
            if let Some(log) = self
                .world
                .actor_mut(INNKEEPER)
                .and_then(|actor| actor.quest_log.as_mut())
            {
                log.add_quest(&starter);
            }
            if let Some(player) = self.world.actor_mut(PLAYER) {
                if let Some(log) = player.quest_log.as_mut() {
                    log.add_quest(&starter);
                }
                player.complete_objective(STARTER_QUEST, "talk");
            }
            println!("* New quest: {STARTER_QUEST}");
        }
    }

    fn render_conversation(&self) {
        if !self.conversation.is_active() {
            println!("(the conversation is over)");
            return;
        }
        let voice = match self.conversation.speaker() {
            Some(Speaker::Player) => "You",
            _ => "Innkeeper",
        };
        println!("{voice}: \"{}\"", self.conversation.text());
        if self.conversation.has_next(&self.world) {
            println!("  [next to continue, bye to leave]");
        } else {
            println!("  [bye to leave]");
        }
    }

    fn maybe_redraw(&self) {
        if self.redraw.swap(false, Ordering::SeqCst) {
            self.render_conversation();
        }
    }

    fn look(&self) {
        match self.world.scene() {
            VILLAGE => println!("The village square. The Wayside Inn's door stands open."),
            EAST_ROAD => {
                if self
                    .world
                    .actor(BANDIT)
                    .and_then(|bandit| bandit.health.as_ref())
                    .is_some_and(|health| !health.is_dead())
                {
                    println!("The east road. A bandit blocks the way past the mill.");
                } else {
                    println!("The east road, quiet now.");
                }
            }
            other => println!("Scene {other}."),
        }
        let player = self.world.actor(PLAYER);
        if let Some(health) = player.and_then(|actor| actor.health.as_ref()) {
            println!("Health: {:.0}", health.current());
        }
        if let Some(experience) = player.and_then(|actor| actor.experience.as_ref()) {
            println!("Experience: {:.0}", experience.points());
        }
    }

    fn talk(&mut self) {
        if self.world.scene() != VILLAGE {
            println!("There is nobody to talk to here.");
            return;
        }
        let Some(dialogue) = self
            .world
            .actor(INNKEEPER)
            .and_then(|actor| actor.dialogue.clone())
        else {
            println!("The innkeeper has nothing to say.");
            return;
        };
        match self.conversation.begin(&mut self.world, INNKEEPER, dialogue) {
            Ok(()) => self.apply_pending_actions(),
            Err(err) => println!("{err}"),
        }
    }

    fn next(&mut self) {
        match self.conversation.advance(&mut self.world) {
            Ok(_) => self.apply_pending_actions(),
            Err(err) => println!("{err}"),
        }
    }

    fn bye(&mut self) {
        if let Err(err) = self.conversation.end(&mut self.world) {
            println!("{err}");
        }
        self.apply_pending_actions();
    }

    fn fight(&mut self) {
        if self.world.scene() != EAST_ROAD {
            println!("Nothing here wants a fight.");
            return;
        }
        let already_dead = self
            .world
            .actor(BANDIT)
            .and_then(|bandit| bandit.health.as_ref())
            .map(|health| health.is_dead())
            .unwrap_or(true);
        if already_dead {
            println!("The bandit is already beaten.");
            return;
        }

        self.world.apply_damage(PLAYER, BANDIT, 40.0);
        let felled = self
            .world
            .actor(BANDIT)
            .and_then(|bandit| bandit.health.as_ref())
            .is_some_and(|health| health.is_dead());
        if felled {
            println!("The bandit goes down. The road is clear.");
            if let Some(player) = self.world.actor_mut(PLAYER) {
                player.complete_objective(STARTER_QUEST, "kill");
            }
        } else {
            println!("You strike the bandit.");
        }
    }

    fn quests(&self) {
        let Some(log) = self
            .world
            .actor(PLAYER)
            .and_then(|player| player.quest_log.as_ref())
        else {
            return;
        };
        let mut any = false;
        for progress in log.statuses() {
            any = true;
            let quest = progress.quest();
            let state = if progress.is_complete() {
                "complete"
            } else {
                "in progress"
            };
            println!("{} ({state})", quest.title());
            for objective in quest.objectives() {
                let mark = if progress.is_objective_complete(&objective.identifier) {
                    "x"
                } else {
                    " "
                };
                println!("  [{mark}] {}", objective.description);
            }
        }
        if !any {
            println!("No quests yet.");
        }
    }

    fn inventory(&self) {
        let Some(inventory) = self
            .world
            .actor(PLAYER)
            .and_then(|player| player.inventory.as_ref())
        else {
            return;
        };
        let mut any = false;
        for slot in 0..inventory.size() {
            if let Some(item) = inventory.item_in_slot(slot) {
                any = true;
                println!("{} x{}", item.name(), inventory.quantity_in_slot(slot));
            }
        }
        if !any {
            println!("Your pack is empty.");
        }
    }

    async fn portal(&mut self) -> Result<()> {
        if self.conversation.is_active() {
            self.bye();
        }
        let (destination, spawn) = match self.world.scene() {
            VILLAGE => (EAST_ROAD, [-2.0, 0.0, 10.0]),
            _ => (VILLAGE, [0.0, 0.0, 0.0]),
        };
        portal_transition(
            &mut self.host,
            &self.saves,
            SAVE_SLOT,
            &mut self.world,
            destination,
            spawn,
            PLAYER,
        )
        .await
        .context("walking through the portal")?;
        self.look();
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.saves
            .save(SAVE_SLOT, &self.world)
            .await
            .context("saving")?;
        println!("Saved.");
        Ok(())
    }

    async fn load(&mut self) -> Result<()> {
        if self.conversation.is_active() {
            self.bye();
        }
        resume_last_session(&mut self.host, &self.saves, SAVE_SLOT, &mut self.world)
            .await
            .context("loading")?;
        println!("Loaded.");
        self.look();
        Ok(())
    }
}

fn help() {
    println!("Commands:");
    println!("  look            describe the scene");
    println!("  talk            speak with the innkeeper");
    println!("  next            continue the conversation");
    println!("  bye             end the conversation");
    println!("  fight           attack the bandit on the east road");
    println!("  quests          list quests and objectives");
    println!("  inv             list your pack");
    println!("  portal          travel between the village and the east road");
    println!("  save / load     write or read the save slot");
    println!("  quit            leave the game");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut game = Game::new().await?;
    println!("Welcome to the Wayside Inn demo. Type 'help' for commands.");
    game.look();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        game.maybe_redraw();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => {}
            "help" => help(),
            "look" => game.look(),
            "talk" => game.talk(),
            "next" => game.next(),
            "bye" => game.bye(),
            "fight" => game.fight(),
            "quests" => game.quests(),
            "inv" => game.inventory(),
            "portal" => game.portal().await?,
            "save" => game.save().await?,
            "load" => game.load().await?,
            "quit" | "exit" => break,
            other => println!("Unknown command: {other}. Type 'help'."),
        }
    }

    game.save().await?;
    println!("Until next time.");
    Ok(())
}

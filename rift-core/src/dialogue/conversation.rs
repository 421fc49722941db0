//! The conversation session: a single-slot state machine walking a
//! dialogue graph.
//!
//! A [`Conversation`] is either idle or in conversation with one
//! participant over one dialogue. Advancing filters the current node's
//! children through the participant's condition evaluators and picks one of
//! the valid continuations uniformly at random; entering and leaving nodes
//! dispatches their action tokens to the participant's trigger handlers.
//! Conversations are runtime state and are never persisted.

use super::{Dialogue, DialogueNode, NodeId, Speaker};
use crate::signal::Signal;
use crate::world::World;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from conversation transitions.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("no conversation is active")]
    NotActive,

    #[error("a conversation is already active")]
    AlreadyActive,

    #[error("unknown conversation participant: {0}")]
    UnknownActor(String),
}

/// What an [`advance`](Conversation::advance) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to one of the valid children.
    Moved,
    /// No child passed its condition; the conversation ended (fail closed).
    Ended,
}

/// A single-slot conversation session.
#[derive(Debug, Default)]
pub struct Conversation {
    dialogue: Option<Arc<Dialogue>>,
    current: Option<NodeId>,
    participant: Option<String>,
    updated: Signal,
}

impl Conversation {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.dialogue.is_some()
    }

    /// Key of the actor being spoken to, while active.
    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    /// The node the conversation is standing on, while active.
    pub fn current_node(&self) -> Option<&DialogueNode> {
        let dialogue = self.dialogue.as_ref()?;
        dialogue.get(self.current.as_ref()?)
    }

    /// Text of the current node, or empty when idle.
    pub fn text(&self) -> &str {
        self.current_node().map(DialogueNode::text).unwrap_or("")
    }

    pub fn speaker(&self) -> Option<Speaker> {
        self.current_node().map(DialogueNode::speaker)
    }

    /// Register a listener for the "conversation updated" notification.
    pub fn on_updated(&mut self, listener: impl FnMut() + Send + 'static) {
        self.updated.connect(listener);
    }

    /// Start a conversation at the dialogue's root and fire its enter
    /// action. Only valid while idle: one session per player, not a stack.
    pub fn begin(
        &mut self,
        world: &mut World,
        participant: &str,
        dialogue: Arc<Dialogue>,
    ) -> Result<(), ConversationError> {
        if self.is_active() {
            return Err(ConversationError::AlreadyActive);
        }
        if world.actor(participant).is_none() {
            return Err(ConversationError::UnknownActor(participant.to_string()));
        }

        let root = dialogue.root();
        let root_id = root.id().clone();
        let enter = root.on_enter().map(str::to_string);

        self.dialogue = Some(Arc::clone(&dialogue));
        self.current = Some(root_id);
        self.participant = Some(participant.to_string());
        debug!(participant, "conversation started");

        dispatch(world, participant, enter.as_deref());
        self.updated.emit();
        Ok(())
    }

    /// Move to one of the current node's valid children.
    ///
    /// Children are filtered through the participant's evaluators; the
    /// survivor is picked uniformly at random. With no survivors the
    /// conversation fails closed: it ends exactly as [`end`](Self::end)
    /// would and [`Advance::Ended`] is returned.
    pub fn advance(&mut self, world: &mut World) -> Result<Advance, ConversationError> {
        let dialogue = self.dialogue.clone().ok_or(ConversationError::NotActive)?;
        let participant = self
            .participant
            .clone()
            .ok_or(ConversationError::NotActive)?;
        let current_id = self.current.clone().ok_or(ConversationError::NotActive)?;
        let current = dialogue.get(&current_id).ok_or(ConversationError::NotActive)?;

        let candidates: Vec<NodeId> = {
            let actor = world
                .actor(&participant)
                .ok_or_else(|| ConversationError::UnknownActor(participant.clone()))?;
            let evaluators = actor.evaluators();
            dialogue
                .children_of(current)
                .filter(|child| {
                    child
                        .condition()
                        .map_or(true, |condition| condition.check(evaluators.iter().copied()))
                })
                .map(|child| child.id().clone())
                .collect()
        };

        if candidates.is_empty() {
            debug!("no valid continuation, conversation fails closed");
            self.end(world)?;
            return Ok(Advance::Ended);
        }

        dispatch(world, &participant, current.on_exit());

        let pick = rand::thread_rng().gen_range(0..candidates.len());
        let next_id = candidates[pick].clone();
        self.current = Some(next_id.clone());
        if let Some(next) = dialogue.get(&next_id) {
            dispatch(world, &participant, next.on_enter());
        }

        self.updated.emit();
        Ok(Advance::Moved)
    }

    /// Whether any child of the current node passes its condition.
    pub fn has_next(&self, world: &World) -> bool {
        let (Some(dialogue), Some(current_id), Some(participant)) =
            (&self.dialogue, &self.current, &self.participant)
        else {
            return false;
        };
        let Some(current) = dialogue.get(current_id) else {
            return false;
        };
        let Some(actor) = world.actor(participant) else {
            return false;
        };

        let evaluators = actor.evaluators();
        dialogue.children_of(current).any(|child| {
            child
                .condition()
                .map_or(true, |condition| condition.check(evaluators.iter().copied()))
        })
    }

    /// End the conversation: fire the current node's exit action, clear all
    /// state, notify listeners.
    pub fn end(&mut self, world: &mut World) -> Result<(), ConversationError> {
        if !self.is_active() {
            return Err(ConversationError::NotActive);
        }

        let dialogue = self.dialogue.take();
        let current = self.current.take();
        let participant = self.participant.take();

        if let (Some(dialogue), Some(current), Some(participant)) =
            (dialogue, current, participant)
        {
            if let Some(node) = dialogue.get(&current) {
                dispatch(world, &participant, node.on_exit());
            }
            debug!(participant = %participant, "conversation ended");
        }

        self.updated.emit();
        Ok(())
    }
}

/// Dispatch an action token to the participant's trigger handlers. A `None`
/// token means "no action" and is never dispatched.
fn dispatch(world: &mut World, participant: &str, token: Option<&str>) {
    let Some(token) = token else {
        return;
    };
    if let Some(actor) = world.actor_mut(participant) {
        actor.dispatch_action(token);
    }
}

//! Branching dialogue graphs.
//!
//! A [`Dialogue`] is an ordered list of [`DialogueNode`]s; the node at index
//! zero is the root. Nodes reference their children by key, and a derived
//! key→node map is rebuilt on every mutation (it is never serialized). The
//! runtime surface of [`Dialogue`] is read-only; all mutation goes through
//! [`editor::DialogueEditor`], which takes an exclusive borrow so tooling
//! and traversal can never interleave.

pub mod condition;
pub mod conversation;
pub mod editor;

use self::condition::Condition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Errors from dialogue graph operations.
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("unknown dialogue node: {0}")]
    UnknownNode(NodeId),

    #[error("node {parent} already links to child {child}")]
    DuplicateChild { parent: NodeId, child: NodeId },

    #[error("node {parent} references missing child {child}")]
    DanglingChild { parent: NodeId, child: NodeId },
}

/// Stable key of a node, unique within its graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Mint a fresh key.
    fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who voices a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Speaker {
    Player,
    #[default]
    Npc,
}

impl Speaker {
    /// The opposite side of the conversation.
    pub fn other(self) -> Speaker {
        match self {
            Speaker::Player => Speaker::Npc,
            Speaker::Npc => Speaker::Player,
        }
    }
}

/// Editor canvas position of a node. Not gameplay-relevant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeLayout {
    pub x: f32,
    pub y: f32,
}

impl NodeLayout {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset_by(self, other: NodeLayout) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

/// One line of dialogue with its outgoing links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueNode {
    id: NodeId,
    #[serde(default)]
    speaker: Speaker,
    #[serde(default)]
    text: String,
    #[serde(default)]
    children: Vec<NodeId>,
    #[serde(default)]
    layout: NodeLayout,
    #[serde(default)]
    on_enter: Option<String>,
    #[serde(default)]
    on_exit: Option<String>,
    #[serde(default)]
    condition: Option<Condition>,
}

impl DialogueNode {
    fn fresh(speaker: Speaker) -> Self {
        Self {
            id: NodeId::fresh(),
            speaker,
            text: String::new(),
            children: Vec::new(),
            layout: NodeLayout::default(),
            on_enter: None,
            on_exit: None,
            condition: None,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ordered child keys, including any that no longer resolve.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn layout(&self) -> NodeLayout {
        self.layout
    }

    pub fn on_enter(&self) -> Option<&str> {
        self.on_enter.as_deref()
    }

    pub fn on_exit(&self) -> Option<&str> {
        self.on_exit.as_deref()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Append a child key, rejecting duplicates.
    fn add_child(&mut self, child: NodeId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    fn remove_child(&mut self, child: &NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|existing| existing != child);
        self.children.len() != before
    }
}

/// Serialized form of a graph: the node list plus the authoring offset.
/// The key→index map is derived state and deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DialogueData {
    nodes: Vec<DialogueNode>,
    #[serde(default = "default_node_offset")]
    new_node_offset: NodeLayout,
}

fn default_node_offset() -> NodeLayout {
    NodeLayout::new(300.0, 0.0)
}

/// A directed dialogue graph. Always contains at least one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DialogueData", into = "DialogueData")]
pub struct Dialogue {
    nodes: Vec<DialogueNode>,
    new_node_offset: NodeLayout,
    index: HashMap<NodeId, usize>,
}

impl Default for Dialogue {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DialogueData> for Dialogue {
    fn from(data: DialogueData) -> Self {
        let mut dialogue = Self {
            nodes: data.nodes,
            new_node_offset: data.new_node_offset,
            index: HashMap::new(),
        };
        dialogue.ensure_root();
        dialogue.rebuild_index();
        dialogue
    }
}

impl From<Dialogue> for DialogueData {
    fn from(dialogue: Dialogue) -> Self {
        Self {
            nodes: dialogue.nodes,
            new_node_offset: dialogue.new_node_offset,
        }
    }
}

impl Dialogue {
    /// Create a graph containing a single fresh root node.
    pub fn new() -> Self {
        let mut dialogue = Self {
            nodes: Vec::new(),
            new_node_offset: default_node_offset(),
            index: HashMap::new(),
        };
        dialogue.ensure_root();
        dialogue.rebuild_index();
        dialogue
    }

    /// The root node. The graph is never empty, so this always succeeds.
    pub fn root(&self) -> &DialogueNode {
        &self.nodes[0]
    }

    /// Look up a node by key.
    pub fn get(&self, id: &NodeId) -> Option<&DialogueNode> {
        self.index.get(id).map(|&slot| &self.nodes[slot])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DialogueNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // Auto-healing keeps at least the root alive.
        self.nodes.is_empty()
    }

    /// Resolve a node's children, silently skipping keys that no longer
    /// resolve. Stale references are a content error but must not take the
    /// whole traversal down with them.
    pub fn children_of<'a>(
        &'a self,
        parent: &'a DialogueNode,
    ) -> impl Iterator<Item = &'a DialogueNode> {
        parent.children.iter().filter_map(move |child| {
            let resolved = self.get(child);
            if resolved.is_none() {
                warn!(parent = %parent.id, child = %child, "skipping dangling dialogue child");
            }
            resolved
        })
    }

    /// Report the first dangling child reference, if any.
    pub fn validate(&self) -> Result<(), DialogueError> {
        for node in &self.nodes {
            for child in &node.children {
                if !self.index.contains_key(child) {
                    return Err(DialogueError::DanglingChild {
                        parent: node.id.clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Open the authoring surface. Exclusive, so no traversal can observe a
    /// half-edited graph.
    pub fn edit(&mut self) -> editor::DialogueEditor<'_> {
        editor::DialogueEditor::new(self)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut DialogueNode> {
        let slot = *self.index.get(id)?;
        Some(&mut self.nodes[slot])
    }

    /// Append a freshly-created node and reindex.
    pub(crate) fn push_node(&mut self, node: DialogueNode) {
        self.nodes.push(node);
        self.rebuild_index();
    }

    /// Drop a node from the list (links must already be cleared) and heal.
    pub(crate) fn drop_node(&mut self, id: &NodeId) {
        self.nodes.retain(|node| &node.id != id);
        self.ensure_root();
        self.rebuild_index();
    }

    pub(crate) fn make_node(&self, parent: Option<&DialogueNode>) -> DialogueNode {
        match parent {
            None => DialogueNode::fresh(Speaker::default()),
            Some(parent) => {
                let mut node = DialogueNode::fresh(parent.speaker.other());
                node.layout = parent.layout.offset_by(self.new_node_offset);
                node
            }
        }
    }

    /// An empty graph is invalid; heal it by inserting a fresh root.
    fn ensure_root(&mut self) {
        if self.nodes.is_empty() {
            self.nodes.push(DialogueNode::fresh(Speaker::default()));
        }
    }

    /// Rebuild the derived key→node map. Later nodes win duplicate keys,
    /// matching the list order being authoritative.
    pub(crate) fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, node) in self.nodes.iter().enumerate() {
            self.index.insert(node.id.clone(), slot);
        }
    }
}

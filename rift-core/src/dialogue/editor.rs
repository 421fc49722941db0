//! Graph authoring.
//!
//! [`DialogueEditor`] is the mutable counterpart to the read-only
//! [`Dialogue`] surface. It borrows the graph exclusively for the duration
//! of an editing session, so runtime traversal code can never hold a graph
//! that is being restructured underneath it. The derived key→node map is
//! rebuilt before the borrow is released.

use super::condition::Condition;
use super::{Dialogue, DialogueError, NodeId, NodeLayout, Speaker};

/// Exclusive authoring handle over a [`Dialogue`].
pub struct DialogueEditor<'a> {
    dialogue: &'a mut Dialogue,
}

impl<'a> DialogueEditor<'a> {
    pub(crate) fn new(dialogue: &'a mut Dialogue) -> Self {
        Self { dialogue }
    }

    /// Create a node with a fresh unique key.
    ///
    /// With a parent: the new key is appended to the parent's children, the
    /// speaker is toggled relative to the parent, and the node is placed at
    /// the configured layout offset from it. Without a parent the node is a
    /// detached default-speaker node.
    pub fn create_node(&mut self, parent: Option<&NodeId>) -> Result<NodeId, DialogueError> {
        let node = match parent {
            None => self.dialogue.make_node(None),
            Some(parent_id) => {
                let parent_node = self
                    .dialogue
                    .get(parent_id)
                    .ok_or_else(|| DialogueError::UnknownNode(parent_id.clone()))?;
                self.dialogue.make_node(Some(parent_node))
            }
        };

        let id = node.id().clone();
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.dialogue.node_mut(parent_id) {
                parent_node.add_child(id.clone());
            }
        }
        self.dialogue.push_node(node);
        Ok(id)
    }

    /// Remove a node, unlinking it from every other node's children first.
    ///
    /// Deleting the last remaining node immediately re-creates a fresh
    /// root: a graph is never left empty.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<(), DialogueError> {
        if self.dialogue.get(id).is_none() {
            return Err(DialogueError::UnknownNode(id.clone()));
        }

        for node in &mut self.dialogue.nodes {
            node.remove_child(id);
        }
        self.dialogue.drop_node(id);
        Ok(())
    }

    /// Link `child` as the last child of `parent`. Duplicate links are
    /// rejected.
    pub fn link(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DialogueError> {
        if self.dialogue.get(child).is_none() {
            return Err(DialogueError::UnknownNode(child.clone()));
        }
        let parent_node = self
            .dialogue
            .node_mut(parent)
            .ok_or_else(|| DialogueError::UnknownNode(parent.clone()))?;
        if !parent_node.add_child(child.clone()) {
            return Err(DialogueError::DuplicateChild {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s children. Unlinking a key that is not
    /// present is a no-op.
    pub fn unlink(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DialogueError> {
        let parent_node = self
            .dialogue
            .node_mut(parent)
            .ok_or_else(|| DialogueError::UnknownNode(parent.clone()))?;
        parent_node.remove_child(child);
        Ok(())
    }

    pub fn set_text(
        &mut self,
        id: &NodeId,
        text: impl Into<String>,
    ) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.text = text.into();
        Ok(())
    }

    pub fn set_speaker(&mut self, id: &NodeId, speaker: Speaker) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.speaker = speaker;
        Ok(())
    }

    pub fn set_position(&mut self, id: &NodeId, layout: NodeLayout) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.layout = layout;
        Ok(())
    }

    /// Set the action token fired when the node is entered. An empty token
    /// means "no action" and is normalized away so it can never be
    /// dispatched.
    pub fn set_enter_action(
        &mut self,
        id: &NodeId,
        action: Option<impl Into<String>>,
    ) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.on_enter = normalize_action(action);
        Ok(())
    }

    /// Set the action token fired when the node is exited. Empty tokens are
    /// normalized away as for [`set_enter_action`](Self::set_enter_action).
    pub fn set_exit_action(
        &mut self,
        id: &NodeId,
        action: Option<impl Into<String>>,
    ) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.on_exit = normalize_action(action);
        Ok(())
    }

    pub fn set_condition(
        &mut self,
        id: &NodeId,
        condition: Option<Condition>,
    ) -> Result<(), DialogueError> {
        let node = self.node_mut(id)?;
        node.condition = condition;
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut super::DialogueNode, DialogueError> {
        self.dialogue
            .node_mut(id)
            .ok_or_else(|| DialogueError::UnknownNode(id.clone()))
    }
}

fn normalize_action(action: Option<impl Into<String>>) -> Option<String> {
    action.map(Into::into).filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node_toggles_speaker_and_offsets_layout() {
        let mut dialogue = Dialogue::new();
        let root = dialogue.root().id().clone();
        let root_speaker = dialogue.root().speaker();

        let child = dialogue.edit().create_node(Some(&root)).unwrap();
        let grandchild = dialogue.edit().create_node(Some(&child)).unwrap();

        let child_node = dialogue.get(&child).unwrap();
        let grandchild_node = dialogue.get(&grandchild).unwrap();

        assert_eq!(child_node.speaker(), root_speaker.other());
        assert_eq!(grandchild_node.speaker(), root_speaker);
        assert_eq!(child_node.layout().x, 300.0);
        assert_eq!(grandchild_node.layout().x, 600.0);
    }

    #[test]
    fn test_delete_node_unlinks_everywhere() {
        let mut dialogue = Dialogue::new();
        let root = dialogue.root().id().clone();
        let (kept, doomed) = {
            let mut editor = dialogue.edit();
            let kept = editor.create_node(Some(&root)).unwrap();
            let doomed = editor.create_node(Some(&root)).unwrap();
            // Link the doomed node under the kept one too.
            editor.link(&kept, &doomed).unwrap();
            (kept, doomed)
        };

        dialogue.edit().delete_node(&doomed).unwrap();

        assert!(dialogue.get(&doomed).is_none());
        for node in dialogue.nodes() {
            assert!(!node.children().contains(&doomed));
        }
        assert!(dialogue.get(&kept).is_some());
        assert!(dialogue.validate().is_ok());
    }

    #[test]
    fn test_deleting_last_node_recreates_root() {
        let mut dialogue = Dialogue::new();
        let root = dialogue.root().id().clone();

        dialogue.edit().delete_node(&root).unwrap();

        assert_eq!(dialogue.len(), 1);
        assert_ne!(dialogue.root().id(), &root);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let mut dialogue = Dialogue::new();
        let root = dialogue.root().id().clone();
        let mut editor = dialogue.edit();
        let child = editor.create_node(Some(&root)).unwrap();

        assert!(matches!(
            editor.link(&root, &child),
            Err(DialogueError::DuplicateChild { .. })
        ));
    }

    #[test]
    fn test_empty_action_token_normalized_to_none() {
        let mut dialogue = Dialogue::new();
        let root = dialogue.root().id().clone();

        dialogue.edit().set_enter_action(&root, Some("")).unwrap();
        assert_eq!(dialogue.root().on_enter(), None);

        dialogue
            .edit()
            .set_enter_action(&root, Some("GiveQuest"))
            .unwrap();
        assert_eq!(dialogue.root().on_enter(), Some("GiveQuest"));

        dialogue
            .edit()
            .set_exit_action(&root, None::<String>)
            .unwrap();
        assert_eq!(dialogue.root().on_exit(), None);
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut dialogue = Dialogue::new();
        let ghost = {
            // A key from an unrelated graph.
            let mut other = Dialogue::new();
            let id = other.root().id().clone();
            other.edit().delete_node(&id).unwrap();
            id
        };

        let mut editor = dialogue.edit();
        assert!(matches!(
            editor.set_text(&ghost, "hello"),
            Err(DialogueError::UnknownNode(_))
        ));
        assert!(matches!(
            editor.create_node(Some(&ghost)),
            Err(DialogueError::UnknownNode(_))
        ));
    }
}

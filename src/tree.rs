use crate::error::TreeError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::{fs, path::Path};
use tracing::{debug, info, warn};

pub(crate) const START_KEY: &str = "start";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct Choice {
    pub(crate) text: String,
    #[serde(rename = "next")]
    pub(crate) next_key: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct DialogueNode {
    pub(crate) npc_text: String,
    #[serde(default)]
    pub(crate) choices: Vec<Choice>,
    #[serde(default, rename = "end")]
    pub(crate) is_terminal: bool,
}

#[derive(Deserialize)]
struct DialogueDocument {
    dialogues: BTreeMap<String, DialogueNode>,
}

/// A choice whose `next` names a node the tree does not have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DeadLink {
    pub(crate) node: String,
    pub(crate) choice: usize,
    pub(crate) next: String,
}

/// Immutable node store. Always contains [`START_KEY`].
#[derive(Clone, Debug)]
pub(crate) struct DialogueTree {
    nodes: BTreeMap<String, DialogueNode>,
}

impl DialogueTree {
    pub(crate) fn from_nodes(nodes: BTreeMap<String, DialogueNode>) -> Result<Self, TreeError> {
        if !nodes.contains_key(START_KEY) {
            return Err(TreeError::MissingStart);
        }
        Ok(Self { nodes })
    }

    pub(crate) fn from_json_str(s: &str) -> Result<Self, TreeError> {
        let doc: DialogueDocument = serde_json::from_str(s)?;
        Self::from_nodes(doc.dialogues)
    }

    pub(crate) fn load(path: &Path) -> Result<Self, TreeError> {
        let s = fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&s)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&DialogueNode> {
        self.nodes.get(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn dead_links(&self) -> Vec<DeadLink> {
        let mut out = Vec::new();
        for (key, node) in &self.nodes {
            for (i, choice) in node.choices.iter().enumerate() {
                if !self.contains(&choice.next_key) {
                    out.push(DeadLink {
                        node: key.clone(),
                        choice: i,
                        next: choice.next_key.clone(),
                    });
                }
            }
        }
        out
    }

    /// Breadth-first walk over live links.
    pub(crate) fn reachable_from_start(&self) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([START_KEY.to_string()]);
        while let Some(key) = queue.pop_front() {
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            for choice in &node.choices {
                if self.contains(&choice.next_key) && !seen.contains(&choice.next_key) {
                    queue.push_back(choice.next_key.clone());
                }
            }
        }
        seen
    }

    pub(crate) fn log_diagnostics(&self) {
        info!(nodes = self.len(), "dialogue tree loaded");
        for link in self.dead_links() {
            warn!(
                node = %link.node,
                choice = link.choice,
                next = %link.next,
                "choice points at a missing node"
            );
        }
        let reachable = self.reachable_from_start();
        for key in self.nodes.keys().filter(|k| !reachable.contains(*k)) {
            debug!(node = %key, "node is unreachable from start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SMALL: &str = r#"{
        "dialogues": {
            "start": {
                "npc_text": "Hi",
                "choices": [
                    { "text": "Again", "next": "again" },
                    { "text": "Bye", "next": "missing" }
                ]
            },
            "again": { "npc_text": "Hello again", "choices": [{ "text": "Back", "next": "start" }] },
            "done": { "npc_text": "Bye now", "end": true }
        }
    }"#;

    #[test]
    fn parses_nodes_with_defaults() {
        let tree = DialogueTree::from_json_str(SMALL).unwrap();
        assert_eq!(tree.len(), 3);

        let done = tree.get("done").unwrap();
        assert!(done.is_terminal);
        assert!(done.choices.is_empty());

        let start = tree.get("start").unwrap();
        assert!(!start.is_terminal);
        assert_eq!(
            start.choices[1],
            Choice {
                text: "Bye".to_string(),
                next_key: "missing".to_string()
            }
        );
    }

    #[test]
    fn missing_start_is_rejected() {
        let err = DialogueTree::from_json_str(r#"{"dialogues": {"hello": {"npc_text": "x"}}}"#)
            .unwrap_err();
        assert!(matches!(err, TreeError::MissingStart));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = DialogueTree::from_json_str(r#"{"dialogues": {"start": {}}}"#).unwrap_err();
        assert!(matches!(err, TreeError::Parse(_)));

        let err = DialogueTree::from_json_str("not json").unwrap_err();
        assert!(matches!(err, TreeError::Parse(_)));
    }

    #[test]
    fn lists_dead_links() {
        let tree = DialogueTree::from_json_str(SMALL).unwrap();
        assert_eq!(
            tree.dead_links(),
            vec![DeadLink {
                node: "start".to_string(),
                choice: 1,
                next: "missing".to_string(),
            }]
        );
    }

    #[test]
    fn reachability_skips_orphans() {
        let tree = DialogueTree::from_json_str(SMALL).unwrap();
        let reachable: Vec<_> = tree.reachable_from_start().into_iter().collect();
        assert_eq!(reachable, vec!["again".to_string(), "start".to_string()]);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();
        let tree = DialogueTree::load(file.path()).unwrap();
        assert!(tree.contains("again"));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let err = DialogueTree::load(&path).unwrap_err();
        assert!(matches!(err, TreeError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn bundled_dialogue_is_valid() {
        let tree = DialogueTree::from_json_str(crate::assets::CHICKEN_DIALOGUE).unwrap();
        assert!(tree.get(START_KEY).is_some());
        assert!(tree.reachable_from_start().contains("goodbye"));
    }
}

//! Conversation state machine for the chicken.
//!
//! The engine owns the immutable [`DialogueTree`] plus all mutable
//! conversation state. Every command is total: anything issued in the wrong
//! state, or with an out-of-range index, is a no-op.

use crate::tree::{DialogueTree, START_KEY};
use crate::typewriter::{visible_prefix, Reveal};
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DialogueConfig {
    /// Characters revealed per second.
    pub(crate) stream_speed: f32,
    pub(crate) bawk_text: String,
    pub(crate) bawk_ms: f32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            stream_speed: 50.0,
            bawk_text: "Bawk!".to_string(),
            bawk_ms: 2000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DialogueState {
    Idle,
    Available,
    Ended,
    Streaming,
    AwaitingChoice,
    DeadLinkShown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChoiceOutcome {
    Ignored,
    Advanced,
    Finished,
    DeadLinkFlagged,
    DeadLinkAcknowledged,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TransientMessage {
    pub(crate) text: String,
    pub(crate) remaining_ms: f32,
}

#[derive(Clone, Debug)]
struct OpenConversation {
    reveal: Reveal,
    dead_link: Option<usize>,
}

#[derive(Clone, Debug)]
enum Phase {
    Closed,
    Ended,
    Open(OpenConversation),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ChoiceView {
    pub(crate) text: String,
    pub(crate) hovered: bool,
    pub(crate) dead_link: bool,
}

/// Read-only snapshot handed to the presentation layer each frame.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DialogueView {
    pub(crate) state: DialogueState,
    pub(crate) is_active: bool,
    pub(crate) in_range: bool,
    pub(crate) conversation_ended: bool,
    pub(crate) node_key: String,
    pub(crate) npc_text: String,
    pub(crate) streamed_text: String,
    pub(crate) choices_visible: bool,
    pub(crate) choices: Vec<ChoiceView>,
    pub(crate) transient_message: Option<String>,
    pub(crate) box_anim_ms: f32,
    pub(crate) show_indicator: bool,
}

pub(crate) struct DialogueEngine {
    tree: DialogueTree,
    config: DialogueConfig,
    phase: Phase,
    current_key: String,
    seen: HashSet<String>,
    hovered: Option<usize>,
    in_range: bool,
    transient: Option<TransientMessage>,
    box_anim_ms: f32,
}

impl DialogueEngine {
    pub(crate) fn new(tree: DialogueTree, config: DialogueConfig) -> Self {
        Self {
            tree,
            config,
            phase: Phase::Closed,
            current_key: START_KEY.to_string(),
            seen: HashSet::new(),
            hovered: None,
            in_range: false,
            transient: None,
            box_anim_ms: 0.0,
        }
    }

    pub(crate) fn state(&self) -> DialogueState {
        match &self.phase {
            Phase::Closed if self.in_range => DialogueState::Available,
            Phase::Closed => DialogueState::Idle,
            Phase::Ended if self.in_range => DialogueState::Ended,
            Phase::Ended => DialogueState::Idle,
            Phase::Open(open) if open.dead_link.is_some() => DialogueState::DeadLinkShown,
            Phase::Open(open) if open.reveal.is_complete() => DialogueState::AwaitingChoice,
            Phase::Open(_) => DialogueState::Streaming,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Open(_))
    }

    pub(crate) fn conversation_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended)
    }

    pub(crate) fn in_range(&self) -> bool {
        self.in_range
    }

    pub(crate) fn current_key(&self) -> &str {
        &self.current_key
    }

    /// Characters revealed of the current node; 0 when no conversation is open.
    pub(crate) fn streamed_chars(&self) -> usize {
        match &self.phase {
            Phase::Open(open) => open.reveal.revealed(),
            _ => 0,
        }
    }

    /// Choices of the current node, whether or not they are drawn yet.
    pub(crate) fn choice_count(&self) -> usize {
        self.tree
            .get(&self.current_key)
            .map_or(0, |node| node.choices.len())
    }

    pub(crate) fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub(crate) fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub(crate) fn dead_link(&self) -> Option<usize> {
        match &self.phase {
            Phase::Open(open) => open.dead_link,
            _ => None,
        }
    }

    pub(crate) fn transient(&self) -> Option<&TransientMessage> {
        self.transient.as_ref()
    }

    pub(crate) fn set_in_range(&mut self, in_range: bool) {
        self.in_range = in_range;
    }

    /// Forced close used by the proximity gate. An ended conversation stays ended.
    pub(crate) fn close(&mut self) {
        if self.is_active() {
            self.phase = Phase::Closed;
            self.hovered = None;
            info!(node = %self.current_key, "conversation closed");
        }
    }

    pub(crate) fn open(&mut self) {
        if !self.in_range || self.is_active() {
            trace!(in_range = self.in_range, "open ignored");
            return;
        }
        if self.conversation_ended() {
            self.transient = Some(TransientMessage {
                text: self.config.bawk_text.clone(),
                remaining_ms: self.config.bawk_ms,
            });
            debug!("conversation already over, showing bawk");
            return;
        }
        let Some(node) = self.tree.get(&self.current_key) else {
            warn!(node = %self.current_key, "current node missing, cannot open");
            return;
        };

        let mut reveal = Reveal::new(&self.current_key, &node.npc_text);
        if self.seen.contains(&self.current_key) {
            reveal.complete();
        }
        self.phase = Phase::Open(OpenConversation {
            reveal,
            dead_link: None,
        });
        self.box_anim_ms = 0.0;
        info!(node = %self.current_key, "conversation opened");
    }

    pub(crate) fn skip_to_end(&mut self) {
        let Phase::Open(open) = &mut self.phase else {
            trace!("skip ignored, conversation not open");
            return;
        };
        if open.reveal.key() != self.current_key || open.reveal.is_complete() {
            return;
        }
        open.reveal.complete();
        debug!(node = %self.current_key, "node skipped to end");
    }

    pub(crate) fn select_choice(&mut self, index: usize) -> ChoiceOutcome {
        let Phase::Open(open) = &mut self.phase else {
            trace!(index, "choice ignored, conversation not open");
            return ChoiceOutcome::Ignored;
        };
        if !open.reveal.is_complete() {
            trace!(index, "choice ignored, text still streaming");
            return ChoiceOutcome::Ignored;
        }
        let Some(choice) = self
            .tree
            .get(&self.current_key)
            .and_then(|node| node.choices.get(index))
        else {
            trace!(index, "choice index out of range");
            return ChoiceOutcome::Ignored;
        };

        if open.dead_link == Some(index) {
            self.phase = Phase::Ended;
            self.hovered = None;
            info!(node = %self.current_key, index, "dead link acknowledged, conversation over");
            return ChoiceOutcome::DeadLinkAcknowledged;
        }

        let next_key = choice.next_key.clone();
        let Some(next) = self.tree.get(&next_key) else {
            open.dead_link = Some(index);
            info!(node = %self.current_key, next = %next_key, "choice leads nowhere");
            return ChoiceOutcome::DeadLinkFlagged;
        };

        let reveal = Reveal::new(&next_key, &next.npc_text);
        let terminal = next.is_terminal;
        debug!(from = %self.current_key, to = %next_key, "dialogue advanced");
        self.current_key = next_key;
        self.box_anim_ms = 0.0;
        self.hovered = None;

        if terminal {
            self.phase = Phase::Ended;
            info!(node = %self.current_key, "reached an ending");
            ChoiceOutcome::Finished
        } else {
            self.phase = Phase::Open(OpenConversation {
                reveal,
                dead_link: None,
            });
            ChoiceOutcome::Advanced
        }
    }

    pub(crate) fn set_hover(&mut self, index: Option<usize>) {
        self.hovered = if self.is_active() { index } else { None };
    }

    pub(crate) fn tick(&mut self, elapsed_ms: f32) {
        if let Some(msg) = &mut self.transient {
            msg.remaining_ms -= elapsed_ms;
        }
        if self
            .transient
            .as_ref()
            .is_some_and(|msg| msg.remaining_ms <= 0.0)
        {
            self.transient = None;
        }

        let ms_per_char = 1000.0 / self.config.stream_speed.max(1.0);
        let Phase::Open(open) = &mut self.phase else {
            return;
        };
        self.box_anim_ms += elapsed_ms;
        // a skipped reveal is already complete and never counts as read
        if open.reveal.key() != self.current_key || open.reveal.is_complete() {
            return;
        }
        open.reveal.advance(elapsed_ms, ms_per_char);
        if open.reveal.is_complete() && !self.seen.contains(&self.current_key) {
            self.seen.insert(self.current_key.clone());
            debug!(node = %self.current_key, "node fully revealed");
        }
    }

    pub(crate) fn view(&self) -> DialogueView {
        let state = self.state();
        let node = self.tree.get(&self.current_key);
        let npc_text = node.map(|n| n.npc_text.clone()).unwrap_or_default();
        let streamed_text = visible_prefix(&npc_text, self.streamed_chars()).to_string();
        let dead_link = self.dead_link();
        let choices = node
            .map(|n| {
                n.choices
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ChoiceView {
                        text: c.text.clone(),
                        hovered: self.hovered == Some(i),
                        dead_link: dead_link == Some(i),
                    })
                    .collect()
            })
            .unwrap_or_default();

        DialogueView {
            state,
            is_active: self.is_active(),
            in_range: self.in_range,
            conversation_ended: self.conversation_ended(),
            node_key: self.current_key.clone(),
            npc_text,
            streamed_text,
            choices_visible: matches!(
                state,
                DialogueState::AwaitingChoice | DialogueState::DeadLinkShown
            ),
            choices,
            transient_message: self.transient.as_ref().map(|m| m.text.clone()),
            box_anim_ms: self.box_anim_ms,
            show_indicator: state == DialogueState::Available,
        }
    }
}

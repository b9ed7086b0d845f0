use crate::dialogue::DialogueEngine;
use crate::world::Vec2;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RangeEdge {
    Entered,
    Left,
    Unchanged,
}

pub(crate) fn within_range(a: Vec2, b: Vec2, threshold: f32) -> bool {
    a.distance(b) < threshold
}

/// Tracks whether the player can talk to the chicken.
///
/// Walking back into range always leaves the conversation closed; the player
/// has to start it again.
pub(crate) struct ProximityGate {
    threshold: f32,
    in_range: bool,
}

impl ProximityGate {
    pub(crate) fn new(threshold: f32) -> Self {
        Self {
            threshold,
            in_range: false,
        }
    }

    pub(crate) fn in_range(&self) -> bool {
        self.in_range
    }

    pub(crate) fn update(
        &mut self,
        player: Vec2,
        npc: Vec2,
        engine: &mut DialogueEngine,
    ) -> RangeEdge {
        let now = within_range(player, npc, self.threshold);
        let edge = match (self.in_range, now) {
            (false, true) => RangeEdge::Entered,
            (true, false) => RangeEdge::Left,
            _ => RangeEdge::Unchanged,
        };
        self.in_range = now;
        engine.set_in_range(now);

        if edge == RangeEdge::Entered {
            engine.close();
        }
        if edge != RangeEdge::Unchanged {
            debug!(?edge, distance = player.distance(npc), "proximity changed");
        }
        edge
    }
}

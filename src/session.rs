use crate::config::Settings;
use crate::dialogue::{DialogueEngine, DialogueView};
use crate::proximity::ProximityGate;
use crate::tree::DialogueTree;
use crate::world::{Direction, Heading, Scene, World};
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Open,
    SkipToEnd,
    SelectChoice(usize),
    SetHover(Option<usize>),
    Move(Direction),
    Quit,
}

/// Remaining hold time per direction. Terminals report presses and repeats
/// but rarely releases, so a press keeps the direction held for a while.
#[derive(Clone, Copy, Debug, Default)]
struct MoveHold {
    up: f32,
    down: f32,
    left: f32,
    right: f32,
}

impl MoveHold {
    fn press(&mut self, dir: Direction, hold_ms: f32) {
        let slot = match dir {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        };
        *slot = hold_ms;
    }

    fn heading(&self) -> Heading {
        Heading {
            up: self.up > 0.0,
            down: self.down > 0.0,
            left: self.left > 0.0,
            right: self.right > 0.0,
        }
    }

    fn decay(&mut self, elapsed_ms: f32) {
        for t in [&mut self.up, &mut self.down, &mut self.left, &mut self.right] {
            *t = (*t - elapsed_ms).max(0.0);
        }
    }
}

/// Everything that changes while the game runs.
pub(crate) struct Session {
    world: World,
    engine: DialogueEngine,
    gate: ProximityGate,
    hold: MoveHold,
    key_hold_ms: f32,
}

impl Session {
    pub(crate) fn new(tree: DialogueTree, settings: &Settings) -> Self {
        let scene = Scene {
            width: settings.scene_width,
            height: settings.scene_height,
        };
        Self {
            world: World::new(scene, settings.seed),
            engine: DialogueEngine::new(tree, settings.dialogue_config()),
            gate: ProximityGate::new(settings.interaction_range),
            hold: MoveHold::default(),
            key_hold_ms: settings.key_hold_ms,
        }
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    pub(crate) fn view(&self) -> DialogueView {
        self.engine.view()
    }

    /// Returns false when the command asks to quit.
    pub(crate) fn apply(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Open => self.engine.open(),
            Command::SkipToEnd => self.engine.skip_to_end(),
            Command::SelectChoice(i) => {
                let outcome = self.engine.select_choice(i);
                trace!(index = i, ?outcome, "choice selected");
            }
            Command::SetHover(i) => self.engine.set_hover(i),
            Command::Move(dir) => self.hold.press(dir, self.key_hold_ms),
            Command::Quit => return false,
        }
        true
    }

    /// One frame: text streams first, then the player moves, proximity is
    /// re-evaluated and finally the chicken reacts.
    pub(crate) fn tick(&mut self, elapsed_ms: f32) {
        self.engine.tick(elapsed_ms);

        let heading = self.hold.heading();
        self.world.step_player(heading, elapsed_ms);
        self.hold.decay(elapsed_ms);

        let player = self.world.player.pos;
        let chicken = self.world.chicken.pos;
        self.gate.update(player, chicken, &mut self.engine);

        let talking = self.engine.is_active() && self.gate.in_range();
        self.world.step_chicken(talking, elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::DialogueState;
    use crate::world::Vec2;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        let tree = DialogueTree::from_json_str(crate::assets::CHICKEN_DIALOGUE).unwrap();
        Session::new(tree, &Settings::default())
    }

    fn place_player(s: &mut Session, dx: f32) {
        let target = s.world().chicken.pos;
        s.world.player.pos = Vec2::new(target.x + dx, target.y);
    }

    #[test]
    fn range_is_measured_between_sprite_origins() {
        let mut s = session();
        place_player(&mut s, 127.0);
        s.tick(16.0);
        assert!(s.engine().in_range());

        place_player(&mut s, 128.5);
        s.tick(16.0);
        assert!(!s.engine().in_range());
    }

    fn walk_to_chicken(s: &mut Session) {
        let target = s.world().chicken.pos;
        s.world.player.pos = Vec2::new(target.x + 8.0, target.y + 8.0);
    }

    #[test]
    fn starts_out_of_range_and_idle() {
        let mut s = session();
        s.tick(16.0);
        assert_eq!(s.engine().state(), DialogueState::Idle);
        assert!(!s.apply(Command::Quit));
    }

    #[test]
    fn open_needs_proximity() {
        let mut s = session();
        s.apply(Command::Open);
        s.tick(16.0);
        assert!(!s.engine().is_active());

        walk_to_chicken(&mut s);
        s.tick(16.0);
        assert_eq!(s.engine().state(), DialogueState::Available);
        assert!(s.view().show_indicator);

        s.apply(Command::Open);
        assert_eq!(s.engine().state(), DialogueState::Streaming);
        s.apply(Command::SkipToEnd);
        assert_eq!(s.engine().state(), DialogueState::AwaitingChoice);
    }

    #[test]
    fn chicken_stays_put_while_talking() {
        let mut s = session();
        walk_to_chicken(&mut s);
        s.tick(16.0);
        s.apply(Command::Open);
        let before = s.world().chicken.pos;
        for _ in 0..600 {
            s.tick(16.0);
        }
        assert_eq!(s.world().chicken.pos, before);
        assert!(!s.world().chicken.moving);
    }

    #[test]
    fn move_holds_for_key_hold_window() {
        let mut s = session();
        let start = s.world().player.pos;
        s.apply(Command::Move(Direction::Right));
        assert!(s.hold.heading().right);

        s.tick(100.0);
        assert!(s.world().player.pos.x > start.x);
        assert!(s.hold.heading().right);

        s.tick(100.0);
        assert!(!s.hold.heading().right);
        let stopped = s.world().player.pos;
        s.tick(100.0);
        assert_eq!(s.world().player.pos, stopped);
    }

    #[test]
    fn leaving_and_returning_closes_conversation() {
        let mut s = session();
        walk_to_chicken(&mut s);
        s.tick(16.0);
        s.apply(Command::Open);
        assert!(s.engine().is_active());

        s.world.player.pos = Vec2::new(600.0, 350.0);
        s.tick(16.0);
        assert!(s.engine().is_active());
        assert_eq!(s.engine().state(), DialogueState::Streaming);

        walk_to_chicken(&mut s);
        s.tick(16.0);
        assert!(!s.engine().is_active());
        assert_eq!(s.engine().state(), DialogueState::Available);
    }
}

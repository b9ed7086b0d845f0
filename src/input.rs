use crate::dialogue::{DialogueEngine, DialogueState};
use crate::render::ChoiceRow;
use crate::session::Command;
use crate::world::Direction;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::time::Duration;

pub(crate) fn collect_events_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                out.push(Event::Key(k));
            }
            ev @ Event::Mouse(_) => out.push(ev),
            _ => {}
        }
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

/// What the adapter needs to know about the dialogue box this frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InputContext<'a> {
    pub(crate) dialogue_active: bool,
    pub(crate) choices_visible: bool,
    pub(crate) choice_count: usize,
    pub(crate) hovered: Option<usize>,
    pub(crate) choice_rows: &'a [ChoiceRow],
}

impl<'a> InputContext<'a> {
    /// Digits follow the engine's choices. The drawn rows are only used for
    /// mouse hit testing, since the box may still be growing.
    pub(crate) fn from_engine(engine: &DialogueEngine, choice_rows: &'a [ChoiceRow]) -> Self {
        Self {
            dialogue_active: engine.is_active(),
            choices_visible: engine.in_range()
                && matches!(
                    engine.state(),
                    DialogueState::AwaitingChoice | DialogueState::DeadLinkShown
                ),
            choice_count: engine.choice_count(),
            hovered: engine.hovered(),
            choice_rows,
        }
    }
}

pub(crate) struct InputAdapter {
    hold_ms: f32,
    key_hover_ms: f32,
}

impl InputAdapter {
    pub(crate) fn new(hold_ms: f32) -> Self {
        Self {
            hold_ms,
            key_hover_ms: 0.0,
        }
    }

    pub(crate) fn handle(&mut self, ev: &Event, ctx: &InputContext<'_>) -> Vec<Command> {
        match ev {
            Event::Key(k) => self.key(k, ctx),
            Event::Mouse(m) => mouse(m, ctx),
            _ => Vec::new(),
        }
    }

    /// Releases a hover set from the keyboard once its hold runs out.
    pub(crate) fn advance(&mut self, elapsed_ms: f32) -> Option<Command> {
        if self.key_hover_ms <= 0.0 {
            return None;
        }
        self.key_hover_ms -= elapsed_ms;
        (self.key_hover_ms <= 0.0).then_some(Command::SetHover(None))
    }

    fn key(&mut self, k: &KeyEvent, ctx: &InputContext<'_>) -> Vec<Command> {
        if k.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return vec![Command::Quit];
        }
        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => vec![Command::Quit],
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => {
                vec![Command::Move(Direction::Up)]
            }
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => {
                vec![Command::Move(Direction::Down)]
            }
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => {
                vec![Command::Move(Direction::Left)]
            }
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => {
                vec![Command::Move(Direction::Right)]
            }
            KeyCode::Char(' ') if ctx.dialogue_active => vec![Command::SkipToEnd],
            KeyCode::Char(' ') => vec![Command::Open],
            KeyCode::Char(c @ '1'..='9') if ctx.choices_visible => {
                let index = (c as usize) - ('1' as usize);
                if index >= ctx.choice_count {
                    return Vec::new();
                }
                self.key_hover_ms = self.hold_ms;
                vec![Command::SetHover(Some(index)), Command::SelectChoice(index)]
            }
            _ => Vec::new(),
        }
    }
}

fn mouse(m: &MouseEvent, ctx: &InputContext<'_>) -> Vec<Command> {
    if !ctx.choices_visible {
        return Vec::new();
    }
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
            let over = ctx
                .choice_rows
                .iter()
                .find(|r| r.row == m.row)
                .map(|r| r.index);
            if over != ctx.hovered {
                vec![Command::SetHover(over)]
            } else {
                Vec::new()
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            ctx.hovered.map(Command::SelectChoice).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROWS: [ChoiceRow; 2] = [ChoiceRow { row: 20, index: 0 }, ChoiceRow { row: 21, index: 1 }];

    fn ctx(active: bool, visible: bool, hovered: Option<usize>) -> InputContext<'static> {
        InputContext {
            dialogue_active: active,
            choices_visible: visible,
            choice_count: 2,
            hovered,
            choice_rows: &ROWS,
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse_at(kind: MouseEventKind, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 5,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn space_opens_then_skips() {
        let mut input = InputAdapter::new(150.0);
        let space = key(KeyCode::Char(' '));
        assert_eq!(input.handle(&space, &ctx(false, false, None)), vec![Command::Open]);
        assert_eq!(input.handle(&space, &ctx(true, false, None)), vec![Command::SkipToEnd]);
    }

    #[test]
    fn movement_keys() {
        let mut input = InputAdapter::new(150.0);
        let c = ctx(false, false, None);
        assert_eq!(input.handle(&key(KeyCode::Up), &c), vec![Command::Move(Direction::Up)]);
        assert_eq!(
            input.handle(&key(KeyCode::Char('d')), &c),
            vec![Command::Move(Direction::Right)]
        );
    }

    #[test]
    fn quit_keys() {
        let mut input = InputAdapter::new(150.0);
        let c = ctx(true, true, None);
        assert_eq!(input.handle(&key(KeyCode::Esc), &c), vec![Command::Quit]);
        assert_eq!(input.handle(&key(KeyCode::Char('q')), &c), vec![Command::Quit]);
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(input.handle(&ctrl_c, &c), vec![Command::Quit]);
    }

    #[test]
    fn digit_hovers_then_selects_and_releases() {
        let mut input = InputAdapter::new(150.0);
        let two = key(KeyCode::Char('2'));
        assert!(input.handle(&two, &ctx(true, false, None)).is_empty());
        assert_eq!(
            input.handle(&two, &ctx(true, true, None)),
            vec![Command::SetHover(Some(1)), Command::SelectChoice(1)]
        );
        assert_eq!(input.advance(100.0), None);
        assert_eq!(input.advance(100.0), Some(Command::SetHover(None)));
        assert_eq!(input.advance(100.0), None);

        assert!(input.handle(&key(KeyCode::Char('3')), &ctx(true, true, None)).is_empty());
    }

    #[test]
    fn digits_work_while_box_is_still_growing() {
        use crate::dialogue::{DialogueConfig, DialogueEngine};
        use crate::render::{draw_dialogue, CellBuffer, Palette, ScreenMap};
        use crate::tree::DialogueTree;
        use crate::world::Scene;

        let tree = DialogueTree::from_json_str(crate::assets::CHICKEN_DIALOGUE).unwrap();
        let mut engine = DialogueEngine::new(tree, DialogueConfig::default());
        engine.set_in_range(true);
        engine.open();
        engine.skip_to_end();
        engine.tick(16.0);

        let map = ScreenMap::new(
            Scene {
                width: 640.0,
                height: 384.0,
            },
            80,
            25,
        );
        let mut buf = CellBuffer::new(80, 25);
        let rows = draw_dialogue(&mut buf, &map, &engine.view(), 30.0, &Palette::new(true));
        assert!(rows.len() < 3);

        let mut input = InputAdapter::new(150.0);
        let ctx = InputContext::from_engine(&engine, &rows);
        assert_eq!(ctx.choice_count, 3);
        assert_eq!(
            input.handle(&key(KeyCode::Char('3')), &ctx),
            vec![Command::SetHover(Some(2)), Command::SelectChoice(2)]
        );
    }

    #[test]
    fn mouse_hover_and_click() {
        let mut input = InputAdapter::new(150.0);
        assert_eq!(
            input.handle(&mouse_at(MouseEventKind::Moved, 21), &ctx(true, true, None)),
            vec![Command::SetHover(Some(1))]
        );
        assert!(input
            .handle(&mouse_at(MouseEventKind::Moved, 21), &ctx(true, true, Some(1)))
            .is_empty());
        assert_eq!(
            input.handle(&mouse_at(MouseEventKind::Moved, 3), &ctx(true, true, Some(1))),
            vec![Command::SetHover(None)]
        );
        assert_eq!(
            input.handle(
                &mouse_at(MouseEventKind::Up(MouseButton::Left), 21),
                &ctx(true, true, Some(1))
            ),
            vec![Command::SelectChoice(1)]
        );
        assert!(input
            .handle(
                &mouse_at(MouseEventKind::Up(MouseButton::Left), 21),
                &ctx(true, true, None)
            )
            .is_empty());
    }
}

use rand::{rngs::StdRng, Rng, SeedableRng};

pub(crate) const PLAYER_SIZE: f32 = 16.0;
pub(crate) const PLAYER_SPEED: f32 = 60.0; // units/sec
pub(crate) const CHICKEN_SIZE: f32 = 32.0;
pub(crate) const CHICKEN_SPEED: f32 = 12.0;
pub(crate) const ANIM_FRAME_MS: f32 = 533.0;
pub(crate) const ANIM_FRAMES: usize = 4;

const ACTION_INTERVAL_MS: std::ops::Range<f32> = 1600.0..5000.0;
const TALK_EAT_CHANCE_PER_SEC: f32 = 0.3;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Vec2 {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Vec2 {
    pub(crate) fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub(crate) fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub(crate) const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    // Sprite sheet rows: the player sheet is down/up/right/left,
    // the chicken sheets are down/left/up/right.
    fn player_row(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Up => 1,
            Direction::Right => 2,
            Direction::Left => 3,
        }
    }

    fn chicken_row(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Left => 1,
            Direction::Up => 2,
            Direction::Right => 3,
        }
    }
}

/// Movement intent for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Heading {
    pub(crate) up: bool,
    pub(crate) down: bool,
    pub(crate) left: bool,
    pub(crate) right: bool,
}

impl Heading {
    pub(crate) fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Scene {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Scene {
    fn clamp(&self, pos: Vec2, size: f32) -> (Vec2, bool) {
        let max_x = (self.width - size).max(0.0);
        let max_y = (self.height - size).max(0.0);
        let clamped = Vec2::new(pos.x.clamp(0.0, max_x), pos.y.clamp(0.0, max_y));
        (clamped, clamped != pos)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Animation {
    pub(crate) frame: usize,
    accum_ms: f32,
}

impl Animation {
    fn step(&mut self, elapsed_ms: f32) -> bool {
        self.accum_ms += elapsed_ms;
        if self.accum_ms >= ANIM_FRAME_MS {
            self.accum_ms = 0.0;
            self.frame = (self.frame + 1) % ANIM_FRAMES;
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.frame = 0;
        self.accum_ms = 0.0;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) pos: Vec2,
    pub(crate) row: usize,
    pub(crate) moving: bool,
    pub(crate) anim: Animation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChickenAction {
    Walk(Direction),
    Eat,
    Stand,
}

#[derive(Clone, Debug)]
pub(crate) struct Chicken {
    pub(crate) pos: Vec2,
    pub(crate) row: usize,
    pub(crate) heading: Vec2,
    pub(crate) moving: bool,
    pub(crate) eating: bool,
    pub(crate) anim: Animation,
    action_timer_ms: f32,
    action_interval_ms: f32,
}

pub(crate) struct World {
    pub(crate) scene: Scene,
    pub(crate) player: Player,
    pub(crate) chicken: Chicken,
    rng: StdRng,
}

impl World {
    pub(crate) fn new(scene: Scene, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let action_interval_ms = rng.gen_range(ACTION_INTERVAL_MS);
        Self {
            scene,
            player: Player {
                pos: Vec2::new(scene.width / 2.0, scene.height / 2.0),
                row: 0,
                moving: false,
                anim: Animation::default(),
            },
            chicken: Chicken {
                pos: Vec2::new(100.0, 100.0),
                row: 0,
                heading: Vec2::default(),
                moving: false,
                eating: false,
                anim: Animation::default(),
                action_timer_ms: 0.0,
                action_interval_ms,
            },
            rng,
        }
    }

    pub(crate) fn step_player(&mut self, heading: Heading, elapsed_ms: f32) {
        let p = &mut self.player;
        let mut v = Vec2::default();
        // later checks win the facing row, matching a held diagonal
        for (held, dir) in [
            (heading.up, Direction::Up),
            (heading.down, Direction::Down),
            (heading.left, Direction::Left),
            (heading.right, Direction::Right),
        ] {
            if held {
                let u = dir.unit();
                v.x += u.x;
                v.y += u.y;
                p.row = dir.player_row();
            }
        }
        p.moving = !heading.is_idle();

        if p.moving {
            p.anim.step(elapsed_ms);
        } else {
            p.anim.reset();
        }

        let dt = elapsed_ms / 1000.0;
        let next = Vec2::new(
            p.pos.x + v.x * PLAYER_SPEED * dt,
            p.pos.y + v.y * PLAYER_SPEED * dt,
        );
        p.pos = self.scene.clamp(next, PLAYER_SIZE).0;
    }

    /// While `talking`, the chicken stands still, faces the player and
    /// sometimes pecks. Otherwise it wanders on a random timer.
    pub(crate) fn step_chicken(&mut self, talking: bool, elapsed_ms: f32) {
        if talking {
            self.face_player();
            let c = &mut self.chicken;
            c.moving = false;
            if !c.eating && self.rng.gen::<f32>() < TALK_EAT_CHANCE_PER_SEC * elapsed_ms / 1000.0 {
                c.eating = true;
                c.anim.reset();
            }
            if c.eating {
                if c.anim.step(elapsed_ms) && c.anim.frame == 0 {
                    c.eating = false;
                }
            } else {
                c.anim.reset();
            }
            return;
        }

        self.chicken.action_timer_ms += elapsed_ms;
        if self.chicken.action_timer_ms >= self.chicken.action_interval_ms {
            self.chicken.action_timer_ms = 0.0;
            self.chicken.action_interval_ms = self.rng.gen_range(ACTION_INTERVAL_MS);
            let action = self.roll_action();
            self.begin(action);
        }

        let c = &mut self.chicken;
        if c.moving || c.eating {
            c.anim.step(elapsed_ms);
        } else {
            c.anim.reset();
        }

        if c.moving {
            let dt = elapsed_ms / 1000.0;
            let next = Vec2::new(
                c.pos.x + c.heading.x * CHICKEN_SPEED * dt,
                c.pos.y + c.heading.y * CHICKEN_SPEED * dt,
            );
            let (pos, hit_edge) = self.scene.clamp(next, CHICKEN_SIZE);
            c.pos = pos;
            if hit_edge {
                c.moving = false;
            }
        }
    }

    fn roll_action(&mut self) -> ChickenAction {
        let roll: f32 = self.rng.gen();
        if roll < 0.6 {
            let dir = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            ChickenAction::Walk(dir)
        } else if roll < 0.9 {
            ChickenAction::Eat
        } else {
            ChickenAction::Stand
        }
    }

    pub(crate) fn begin(&mut self, action: ChickenAction) {
        let c = &mut self.chicken;
        match action {
            ChickenAction::Walk(dir) => {
                c.moving = true;
                c.eating = false;
                c.heading = dir.unit();
                c.row = dir.chicken_row();
            }
            ChickenAction::Eat => {
                c.moving = false;
                c.eating = true;
                c.heading = Vec2::default();
            }
            ChickenAction::Stand => {
                c.moving = false;
                c.eating = false;
                c.heading = Vec2::default();
            }
        }
    }

    fn face_player(&mut self) {
        let dx = self.player.pos.x - self.chicken.pos.x;
        let dy = self.player.pos.y - self.chicken.pos.y;
        let dir = if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        };
        self.chicken.row = dir.chicken_row();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(
            Scene {
                width: 640.0,
                height: 384.0,
            },
            7,
        )
    }

    #[test]
    fn player_moves_and_faces() {
        let mut w = world();
        let start = w.player.pos;
        w.step_player(
            Heading {
                right: true,
                ..Heading::default()
            },
            1000.0,
        );
        assert_eq!(w.player.pos.x, start.x + PLAYER_SPEED);
        assert_eq!(w.player.row, Direction::Right.player_row());
        assert!(w.player.moving);

        w.step_player(Heading::default(), 16.0);
        assert!(!w.player.moving);
        assert_eq!(w.player.anim.frame, 0);
    }

    #[test]
    fn player_is_clamped_to_scene() {
        let mut w = world();
        for _ in 0..30 {
            w.step_player(
                Heading {
                    up: true,
                    left: true,
                    ..Heading::default()
                },
                1000.0,
            );
        }
        assert_eq!(w.player.pos, Vec2::new(0.0, 0.0));

        for _ in 0..30 {
            w.step_player(
                Heading {
                    down: true,
                    right: true,
                    ..Heading::default()
                },
                1000.0,
            );
        }
        assert_eq!(w.player.pos, Vec2::new(640.0 - PLAYER_SIZE, 384.0 - PLAYER_SIZE));
    }

    #[test]
    fn chicken_stops_at_edge() {
        let mut w = world();
        w.chicken.pos = Vec2::new(1.0, 200.0);
        w.begin(ChickenAction::Walk(Direction::Left));
        w.step_chicken(false, 500.0);
        assert_eq!(w.chicken.pos.x, 0.0);
        assert!(!w.chicken.moving);
    }

    #[test]
    fn chicken_faces_player_while_talking() {
        let mut w = world();
        w.chicken.pos = Vec2::new(100.0, 100.0);
        w.begin(ChickenAction::Walk(Direction::Up));

        w.player.pos = Vec2::new(200.0, 110.0);
        w.step_chicken(true, 16.0);
        assert_eq!(w.chicken.row, Direction::Right.chicken_row());
        assert!(!w.chicken.moving);
        assert_eq!(w.chicken.pos, Vec2::new(100.0, 100.0));

        w.player.pos = Vec2::new(90.0, 20.0);
        w.step_chicken(true, 16.0);
        assert_eq!(w.chicken.row, Direction::Up.chicken_row());
    }

    #[test]
    fn chicken_picks_new_actions_over_time() {
        let mut w = world();
        let mut walked = false;
        for _ in 0..2000 {
            w.step_chicken(false, 50.0);
            walked |= w.chicken.moving;
            assert!(w.chicken.pos.x >= 0.0 && w.chicken.pos.x <= 640.0 - CHICKEN_SIZE);
            assert!(w.chicken.pos.y >= 0.0 && w.chicken.pos.y <= 384.0 - CHICKEN_SIZE);
        }
        assert!(walked);
    }

    #[test]
    fn same_seed_same_wander() {
        let mut a = world();
        let mut b = world();
        for _ in 0..500 {
            a.step_chicken(false, 33.0);
            b.step_chicken(false, 33.0);
        }
        assert_eq!(a.chicken.pos, b.chicken.pos);
    }
}

use crate::assets::{AssetLoader, Sprites};
use crate::config::{load_settings, project_paths, Cli, Settings};
use crate::input::{collect_events_nonblocking, InputAdapter, InputContext};
use crate::render::{
    draw_dialogue, draw_footer, draw_loading, draw_npc_overlay, draw_world, ChoiceRow, Palette,
    ScreenMap, Terminal,
};
use crate::session::{Command, Session};
use anyhow::Context;
use crossterm::event::Event;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Longest step fed to the session, so a stall does not teleport anything.
const MAX_FRAME_MS: f32 = 100.0;

pub(crate) struct App {
    settings: Settings,
    palette: Palette,
    term: Terminal,
    input: InputAdapter,
    choice_rows: Vec<ChoiceRow>,
}

impl App {
    fn frame_dt(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.settings.fps_cap as f32)
    }

    /// Drains the loader until every asset is in. `None` means the user quit.
    fn load(&mut self, mut loader: AssetLoader) -> anyhow::Result<Option<(Session, Sprites)>> {
        let frame_dt = self.frame_dt();
        loop {
            let frame_start = Instant::now();
            self.term.resize_if_needed()?;
            for ev in collect_events_nonblocking(frame_dt)? {
                if let Event::Key(_) = ev {
                    let ctx = InputContext {
                        dialogue_active: false,
                        choices_visible: false,
                        choice_count: 0,
                        hovered: None,
                        choice_rows: &[],
                    };
                    if self.input.handle(&ev, &ctx).contains(&Command::Quit) {
                        return Ok(None);
                    }
                }
            }

            if let Some(assets) = loader.poll().context("loading game assets")? {
                let session = Session::new(assets.tree, &self.settings);
                return Ok(Some((session, assets.sprites)));
            }

            self.term.cur.clear(self.palette.bg);
            draw_loading(&mut self.term.cur, loader.gate(), &self.palette);
            self.term.present(true)?;
            spin_sleep(frame_dt, frame_start);
        }
    }

    fn run(&mut self, mut session: Session, sprites: &Sprites) -> anyhow::Result<()> {
        let frame_dt = self.frame_dt();
        let mut last_frame = Instant::now();

        'frames: loop {
            let frame_start = Instant::now();
            if self.term.resize_if_needed()? {
                self.choice_rows.clear();
            }

            // input
            for ev in collect_events_nonblocking(frame_dt)? {
                let ctx = InputContext::from_engine(session.engine(), &self.choice_rows);
                for cmd in self.input.handle(&ev, &ctx) {
                    if !session.apply(cmd) {
                        break 'frames;
                    }
                }
            }

            // tick
            let now = Instant::now();
            let elapsed_ms =
                (now.saturating_duration_since(last_frame).as_secs_f32() * 1000.0).min(MAX_FRAME_MS);
            last_frame = now;

            if let Some(cmd) = self.input.advance(elapsed_ms) {
                session.apply(cmd);
            }
            session.tick(elapsed_ms);

            // render
            self.render_frame(&session, sprites)?;

            // frame cap
            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }

    fn render_frame(&mut self, session: &Session, sprites: &Sprites) -> anyhow::Result<()> {
        let view = session.view();
        let world = session.world();
        let map = ScreenMap::new(world.scene, self.term.cols, self.term.rows);
        let buf = &mut self.term.cur;

        buf.clear(self.palette.bg);
        draw_world(buf, &map, world, sprites, &self.palette);
        draw_npc_overlay(buf, &map, world, &view, &self.palette);
        self.choice_rows = draw_dialogue(buf, &map, &view, self.settings.box_row_ms, &self.palette);
        draw_footer(buf, &view, &self.palette);

        self.term.present(true)?;
        Ok(())
    }
}

fn init_logging(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("could not install log subscriber: {e}"))?;
    Ok(())
}

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = project_paths()?;
    let mut settings = load_settings(&paths.settings_path);
    settings.apply_cli(&cli);
    init_logging(&paths.log_path, &settings)?;
    info!(
        fps = settings.fps_cap,
        stream_speed = settings.stream_speed,
        range = settings.interaction_range,
        seed = settings.seed,
        "starting henhouse"
    );

    let loader = AssetLoader::spawn(settings.dialogue_source());
    let term = Terminal::begin()?;
    let mut app = App {
        palette: Palette::new(settings.enable_color),
        input: InputAdapter::new(settings.key_hold_ms),
        settings,
        term,
        choice_rows: Vec::new(),
    };

    let result = match app.load(loader) {
        Ok(Some((session, sprites))) => app.run(session, &sprites),
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    app.term.end()?;
    if let Err(e) = &result {
        error!("{e:#}");
    }
    info!("bye");
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, frame_start: Instant) {
    let end = frame_start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

use crate::assets::DialogueSource;
use crate::dialogue::DialogueConfig;
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "henhouse")]
#[command(about = "Walk up to the chicken and have a chat")]
pub(crate) struct Cli {
    /// Frame cap (frames per second)
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Typewriter speed in characters per second
    #[arg(long)]
    pub(crate) stream_speed: Option<f32>,

    /// Talk range in world units
    #[arg(long)]
    pub(crate) range: Option<f32>,

    /// RNG seed for the chicken
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Dialogue JSON file (defaults to the bundled chicken)
    #[arg(long)]
    pub(crate) dialogue: Option<PathBuf>,

    /// Disable colour
    #[arg(long)]
    pub(crate) mono: bool,

    /// Log filter, e.g. "debug" or "henhouse=trace"
    #[arg(long)]
    pub(crate) log_filter: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) stream_speed: f32,
    pub(crate) interaction_range: f32,
    pub(crate) bawk_text: String,
    pub(crate) bawk_ms: f32,
    pub(crate) scene_width: f32,
    pub(crate) scene_height: f32,
    pub(crate) seed: u64,
    pub(crate) enable_color: bool,
    pub(crate) key_hold_ms: f32,
    pub(crate) box_row_ms: f32,
    pub(crate) dialogue_path: Option<PathBuf>,
    pub(crate) log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            stream_speed: 50.0,
            interaction_range: 128.0,
            bawk_text: "Bawk!".to_string(),
            bawk_ms: 2000.0,
            scene_width: 640.0,
            scene_height: 384.0,
            seed: 0xC0FFEE_u64,
            enable_color: true,
            key_hold_ms: 150.0,
            box_row_ms: 30.0,
            dialogue_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub(crate) fn apply_cli(&mut self, cli: &Cli) {
        if let Some(fps) = cli.fps {
            self.fps_cap = fps;
        }
        if let Some(speed) = cli.stream_speed {
            self.stream_speed = speed;
        }
        if let Some(range) = cli.range {
            self.interaction_range = range;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(path) = &cli.dialogue {
            self.dialogue_path = Some(path.clone());
        }
        if cli.mono {
            self.enable_color = false;
        }
        if let Some(filter) = &cli.log_filter {
            self.log_filter = filter.clone();
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        self.fps_cap = self.fps_cap.clamp(10, 240);
        self.stream_speed = self.stream_speed.max(1.0);
        self.interaction_range = self.interaction_range.max(0.0);
        self.bawk_ms = self.bawk_ms.max(0.0);
        self.scene_width = self.scene_width.max(64.0);
        self.scene_height = self.scene_height.max(64.0);
        self.key_hold_ms = self.key_hold_ms.max(1.0);
        self.box_row_ms = self.box_row_ms.max(1.0);
    }

    pub(crate) fn dialogue_config(&self) -> DialogueConfig {
        DialogueConfig {
            stream_speed: self.stream_speed,
            bawk_text: self.bawk_text.clone(),
            bawk_ms: self.bawk_ms,
        }
    }

    pub(crate) fn dialogue_source(&self) -> DialogueSource {
        match &self.dialogue_path {
            Some(path) => DialogueSource::File(path.clone()),
            None => DialogueSource::Bundled,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "henhouse", "Henhouse")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        log_path: dir.join("henhouse.log"),
    })
}

/// Missing or unreadable settings fall back to defaults.
pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

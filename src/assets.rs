use crate::error::AssetError;
use crate::sprites::SpriteSheet;
use crate::tree::DialogueTree;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, info};

pub(crate) const CHICKEN_DIALOGUE: &str = include_str!("../assets/chicken_dialogue.json");
pub(crate) const PLAYER_SHEET: &str = include_str!("../assets/player.sheet");
pub(crate) const CHICKEN_WALK_SHEET: &str = include_str!("../assets/chicken_walk.sheet");
pub(crate) const CHICKEN_EAT_SHEET: &str = include_str!("../assets/chicken_eat.sheet");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AssetKind {
    Dialogue,
    PlayerSheet,
    ChickenWalkSheet,
    ChickenEatSheet,
}

impl AssetKind {
    pub(crate) const ALL: [AssetKind; 4] = [
        AssetKind::Dialogue,
        AssetKind::PlayerSheet,
        AssetKind::ChickenWalkSheet,
        AssetKind::ChickenEatSheet,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            AssetKind::Dialogue => "dialogue",
            AssetKind::PlayerSheet => "player",
            AssetKind::ChickenWalkSheet => "chicken_walk",
            AssetKind::ChickenEatSheet => "chicken_eat",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) enum DialogueSource {
    #[default]
    Bundled,
    File(PathBuf),
}

pub(crate) enum LoadedAsset {
    Dialogue(DialogueTree),
    Sheet(AssetKind, SpriteSheet),
}

pub(crate) enum LoadEvent {
    Loaded(LoadedAsset),
    Failed(AssetError),
}

/// Counts finished loads; the game loop may not tick until it opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ReadyGate {
    expected: usize,
    loaded: usize,
}

impl ReadyGate {
    pub(crate) fn new(expected: usize) -> Self {
        Self {
            expected,
            loaded: 0,
        }
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = (self.loaded + 1).min(self.expected);
    }

    pub(crate) fn loaded(&self) -> usize {
        self.loaded
    }

    pub(crate) fn expected(&self) -> usize {
        self.expected
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.loaded == self.expected
    }
}

pub(crate) struct Sprites {
    pub(crate) player: SpriteSheet,
    pub(crate) chicken_walk: SpriteSheet,
    pub(crate) chicken_eat: SpriteSheet,
}

pub(crate) struct Assets {
    pub(crate) tree: DialogueTree,
    pub(crate) sprites: Sprites,
}

#[derive(Default)]
struct Slots {
    tree: Option<DialogueTree>,
    player: Option<SpriteSheet>,
    chicken_walk: Option<SpriteSheet>,
    chicken_eat: Option<SpriteSheet>,
}

impl Slots {
    fn store(&mut self, asset: LoadedAsset) {
        match asset {
            LoadedAsset::Dialogue(tree) => self.tree = Some(tree),
            LoadedAsset::Sheet(AssetKind::PlayerSheet, s) => self.player = Some(s),
            LoadedAsset::Sheet(AssetKind::ChickenWalkSheet, s) => self.chicken_walk = Some(s),
            LoadedAsset::Sheet(AssetKind::ChickenEatSheet, s) => self.chicken_eat = Some(s),
            LoadedAsset::Sheet(AssetKind::Dialogue, _) => {}
        }
    }

    fn finish(self) -> Result<Assets, AssetError> {
        let missing = |kind: AssetKind| AssetError::Missing(kind.name());
        Ok(Assets {
            tree: self.tree.ok_or_else(|| missing(AssetKind::Dialogue))?,
            sprites: Sprites {
                player: self.player.ok_or_else(|| missing(AssetKind::PlayerSheet))?,
                chicken_walk: self
                    .chicken_walk
                    .ok_or_else(|| missing(AssetKind::ChickenWalkSheet))?,
                chicken_eat: self
                    .chicken_eat
                    .ok_or_else(|| missing(AssetKind::ChickenEatSheet))?,
            },
        })
    }
}

pub(crate) fn load_one(kind: AssetKind, source: &DialogueSource) -> Result<LoadedAsset, AssetError> {
    let sheet = |src: &str| {
        SpriteSheet::parse(src)
            .map(|s| LoadedAsset::Sheet(kind, s))
            .map_err(|source| AssetError::Sheet {
                name: kind.name(),
                source,
            })
    };
    match kind {
        AssetKind::Dialogue => {
            let tree = match source {
                DialogueSource::Bundled => DialogueTree::from_json_str(CHICKEN_DIALOGUE)?,
                DialogueSource::File(path) => DialogueTree::load(path)?,
            };
            tree.log_diagnostics();
            Ok(LoadedAsset::Dialogue(tree))
        }
        AssetKind::PlayerSheet => sheet(PLAYER_SHEET),
        AssetKind::ChickenWalkSheet => sheet(CHICKEN_WALK_SHEET),
        AssetKind::ChickenEatSheet => sheet(CHICKEN_EAT_SHEET),
    }
}

fn spawn_loader(source: DialogueSource, tx: Sender<LoadEvent>) {
    thread::spawn(move || {
        for kind in AssetKind::ALL {
            let event = match load_one(kind, &source) {
                Ok(asset) => LoadEvent::Loaded(asset),
                Err(e) => LoadEvent::Failed(e),
            };
            let failed = matches!(event, LoadEvent::Failed(_));
            if tx.send(event).is_err() || failed {
                return;
            }
            debug!(asset = kind.name(), "asset loaded");
        }
    });
}

/// Receiving end of the startup loader thread.
pub(crate) struct AssetLoader {
    rx: Receiver<LoadEvent>,
    gate: ReadyGate,
    slots: Slots,
}

impl AssetLoader {
    pub(crate) fn spawn(source: DialogueSource) -> Self {
        let (tx, rx) = mpsc::channel();
        spawn_loader(source, tx);
        Self {
            rx,
            gate: ReadyGate::new(AssetKind::ALL.len()),
            slots: Slots::default(),
        }
    }

    pub(crate) fn gate(&self) -> ReadyGate {
        self.gate
    }

    /// Drains finished loads. Returns the assets once the gate opens.
    pub(crate) fn poll(&mut self) -> Result<Option<Assets>, AssetError> {
        loop {
            match self.rx.try_recv() {
                Ok(LoadEvent::Loaded(asset)) => {
                    self.slots.store(asset);
                    self.gate.mark_loaded();
                    if self.gate.is_ready() {
                        info!(assets = self.gate.loaded(), "all assets loaded");
                        return std::mem::take(&mut self.slots).finish().map(Some);
                    }
                }
                Ok(LoadEvent::Failed(e)) => return Err(e),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(AssetError::LoaderStopped {
                        loaded: self.gate.loaded(),
                        expected: self.gate.expected(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut AssetLoader) -> Result<Assets, AssetError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(assets) = loader.poll()? {
                return Ok(assets);
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("loader never finished");
    }

    #[test]
    fn gate_opens_at_expected_count() {
        let mut gate = ReadyGate::new(2);
        assert!(!gate.is_ready());
        gate.mark_loaded();
        assert!(!gate.is_ready());
        gate.mark_loaded();
        assert!(gate.is_ready());
        gate.mark_loaded();
        assert_eq!(gate.loaded(), 2);
    }

    #[test]
    fn loads_bundled_assets() {
        let mut loader = AssetLoader::spawn(DialogueSource::Bundled);
        let assets = wait_for(&mut loader).unwrap();
        assert!(assets.tree.contains("start"));
        assert_eq!(assets.sprites.player.frame_size(), (3, 3));
        assert_eq!(assets.sprites.chicken_eat.frame_size(), (5, 3));
        assert!(loader.gate().is_ready());
    }

    #[test]
    fn file_without_start_fails_startup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"dialogues": {"hi": {"npc_text": "x"}}}"#)
            .unwrap();
        let mut loader = AssetLoader::spawn(DialogueSource::File(file.path().to_path_buf()));
        let err = match wait_for(&mut loader) {
            Ok(_) => panic!("expected a load failure"),
            Err(e) => e,
        };
        assert!(matches!(err, AssetError::Tree(TreeError::MissingStart)));
        assert!(!loader.gate().is_ready());
    }

    #[test]
    fn load_one_reports_sheet_name() {
        let asset = load_one(AssetKind::ChickenWalkSheet, &DialogueSource::Bundled).unwrap();
        assert!(matches!(
            asset,
            LoadedAsset::Sheet(AssetKind::ChickenWalkSheet, _)
        ));
    }
}

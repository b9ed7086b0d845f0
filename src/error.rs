use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum TreeError {
    #[error("failed to read dialogue file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dialogue document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dialogue document has no \"start\" node")]
    MissingStart,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum SheetError {
    #[error("missing frame size header")]
    MissingHeader,

    #[error("bad frame size header {0:?}, expected WxH")]
    BadHeader(String),

    #[error("sheet has no frames")]
    NoFrames,

    #[error("sheet has {lines} lines, not a multiple of frame height {frame_h}")]
    UnevenRows { lines: usize, frame_h: usize },

    #[error("line {line} is {width} wide, expected {expected}")]
    UnevenWidth {
        line: usize,
        width: usize,
        expected: usize,
    },
}

#[derive(Error, Debug)]
pub(crate) enum AssetError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("sprite sheet {name}: {source}")]
    Sheet {
        name: &'static str,
        #[source]
        source: SheetError,
    },

    #[error("asset loader stopped after {loaded} of {expected} assets")]
    LoaderStopped { loaded: usize, expected: usize },

    #[error("asset {0} was counted as loaded but never stored")]
    Missing(&'static str),
}

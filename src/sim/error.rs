use std::path::PathBuf;

use thiserror::Error;

/// Why a level could not be built from its text.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no tile rows")]
    Empty,

    #[error("no level files to load")]
    NoLevels,

    #[error("unsupported tile '{ch}' at column {x}, row {y}")]
    UnknownTile { ch: char, x: usize, y: usize },

    #[error("single-line level of length {len} is not a multiple of {width}")]
    FlatLength { len: usize, width: usize },

    #[error("level has no start tile")]
    MissingStart,

    #[error("level has no exit tile")]
    MissingExit,

    #[error("second start tile at column {x}, row {y}")]
    DuplicateStart { x: usize, y: usize },

    #[error("second exit tile at column {x}, row {y}")]
    DuplicateExit { x: usize, y: usize },

    #[error("could not read level file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

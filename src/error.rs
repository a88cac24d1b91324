use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize/deserialize data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported schema version: {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Unsupported export version: {found} (expected {expected})")]
    UnsupportedExportVersion { found: u32, expected: u32 },

    #[error("Invalid progress record: {0}")]
    InvalidRecord(String),
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse ladder: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Bundled asset missing: {0}")]
    MissingAsset(String),

    #[error("Ladder has no levels")]
    Empty,

    #[error("No practice passages available")]
    NoPassages,

    #[error("Level numbers must run 1..n without gaps: expected {expected}, found {found}")]
    OutOfOrder { expected: u32, found: u32 },

    #[error("Level {level_number} has id {id}; ids must equal level numbers")]
    IdMismatch { level_number: u32, id: u32 },

    #[error("Level {id} has accuracy goal {goal} above 100")]
    AccuracyGoal { id: u32, goal: u32 },

    #[error("Level {id} text cannot be typed: {reason}")]
    UntypeableText { id: u32, reason: &'static str },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Level {0} is locked")]
    LevelLocked(u32),

    #[error("Unknown level: {0}")]
    UnknownLevel(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

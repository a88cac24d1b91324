pub mod challenge;
pub mod progress;
pub mod service;
pub mod stats;

pub use challenge::{ChallengeLevel, Ladder, LevelState};
pub use progress::{ProgressPatch, UserProgress};
pub use service::ProgressService;

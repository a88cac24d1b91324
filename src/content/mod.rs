use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use rust_embed::Embed;
use serde::Deserialize;
use tracing::debug;

use crate::engine::challenge::{ChallengeLevel, Ladder};
use crate::error::ContentError;

#[derive(Embed)]
#[folder = "assets/content/"]
struct ContentAssets;

const LADDER_FILE: &str = "ladder.toml";
const PASSAGES_FILE: &str = "passages.txt";

#[derive(Deserialize)]
struct LadderFile {
    #[serde(default)]
    level: Vec<ChallengeLevel>,
}

fn bundled_text(name: &str) -> Result<String, ContentError> {
    let file = ContentAssets::get(name).ok_or_else(|| ContentError::MissingAsset(name.to_string()))?;
    String::from_utf8(file.data.into_owned())
        .map_err(|_| ContentError::MissingAsset(name.to_string()))
}

/// Parse a ladder from TOML made of `[[level]]` tables.
pub fn parse_ladder(src: &str) -> Result<Ladder, ContentError> {
    let file: LadderFile = toml::from_str(src)?;
    Ladder::new(file.level)
}

pub fn bundled_ladder() -> Result<Ladder, ContentError> {
    parse_ladder(&bundled_text(LADDER_FILE)?)
}

pub fn load_ladder(path: &Path) -> Result<Ladder, ContentError> {
    let src = fs::read_to_string(path)?;
    let ladder = parse_ladder(&src)?;
    debug!(path = %path.display(), levels = ladder.len(), "loaded external ladder");
    Ok(ladder)
}

/// One passage per non-empty line; `#` starts a comment line.
pub fn parse_passages(src: &str) -> Vec<String> {
    src.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn practice_passages() -> Result<Vec<String>, ContentError> {
    Ok(parse_passages(&bundled_text(PASSAGES_FILE)?))
}

pub fn random_passage<R: Rng + ?Sized>(rng: &mut R) -> Result<String, ContentError> {
    practice_passages()?
        .choose(rng)
        .cloned()
        .ok_or(ContentError::NoPassages)
}

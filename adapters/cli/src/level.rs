//! Campaign files: TOML documents holding ASCII level maps.
//!
//! ```toml
//! version = 1
//!
//! [battle]
//! frames_per_move = 4
//!
//! [[levels]]
//! name = "Harbour"
//! map = [
//!     "P..#",
//!     "...E",
//! ]
//! ```
//!
//! Tiles: `#` wall, `.` open water, `P` the player, `E` an enemy. Enemies are
//! enlisted in reading order.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use trivia_fleet_core::{BattleConfig, CellCoord, LevelLayout, ShipSpec};

const SUPPORTED_CAMPAIGN_VERSION: u32 = 1;
const DEFAULT_PLAYER_ENERGY: u32 = 12;
const DEFAULT_ENEMY_ENERGY: u32 = 4;

/// Campaign played when no file is given on the command line.
pub(crate) const DEFAULT_CAMPAIGN: &str = include_str!("../campaigns/default.toml");

/// Parsed campaign: shared battle tuning plus ordered levels.
#[derive(Debug)]
pub(crate) struct Campaign {
    pub(crate) battle: BattleConfig,
    pub(crate) levels: Vec<LevelLayout>,
}

/// Problems found while scanning a level map.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum LevelFormatError {
    #[error("the map has no rows")]
    EmptyMap,
    #[error("row {row} is {found} tiles wide; expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile `{tile}` at {cell}")]
    UnknownTile { tile: char, cell: CellCoord },
    #[error("the map has no player ship")]
    MissingPlayer,
    #[error("second player ship at {second}; the first is at {first}")]
    DuplicatePlayer { first: CellCoord, second: CellCoord },
    #[error("the map has no enemy ships")]
    NoEnemies,
    #[error("the map is too large")]
    TooLarge,
}

#[derive(Debug, Deserialize)]
struct CampaignFile {
    version: u32,
    #[serde(default)]
    battle: BattleConfig,
    #[serde(default)]
    levels: Vec<LevelEntry>,
}

#[derive(Debug, Deserialize)]
struct LevelEntry {
    name: String,
    #[serde(default = "default_player_energy")]
    player_energy: u32,
    #[serde(default = "default_enemy_energy")]
    enemy_energy: u32,
    map: Vec<String>,
}

fn default_player_energy() -> u32 {
    DEFAULT_PLAYER_ENERGY
}

fn default_enemy_energy() -> u32 {
    DEFAULT_ENEMY_ENERGY
}

/// Parses a campaign document.
pub(crate) fn parse_campaign(contents: &str) -> Result<Campaign> {
    let file: CampaignFile =
        toml::from_str(contents).context("failed to parse campaign toml contents")?;
    if file.version != SUPPORTED_CAMPAIGN_VERSION {
        bail!(
            "unsupported campaign version {}; expected {}",
            file.version,
            SUPPORTED_CAMPAIGN_VERSION
        );
    }
    if file.levels.is_empty() {
        bail!("campaign contains no levels");
    }

    let levels = file
        .levels
        .iter()
        .map(|entry| {
            scan_map(entry).with_context(|| format!("level `{}` has a malformed map", entry.name))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Campaign {
        battle: file.battle,
        levels,
    })
}

fn scan_map(entry: &LevelEntry) -> Result<LevelLayout, LevelFormatError> {
    let width = entry
        .map
        .first()
        .map(|row| row.chars().count())
        .filter(|width| *width > 0)
        .ok_or(LevelFormatError::EmptyMap)?;

    let mut walls = Vec::new();
    let mut player = None;
    let mut enemies = Vec::new();

    for (row_index, row) in entry.map.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelFormatError::RaggedRow {
                row: row_index,
                expected: width,
                found,
            });
        }

        let row_coord = u32::try_from(row_index).map_err(|_| LevelFormatError::TooLarge)?;
        for (column_index, tile) in row.chars().enumerate() {
            let column = u32::try_from(column_index).map_err(|_| LevelFormatError::TooLarge)?;
            let cell = CellCoord::new(column, row_coord);
            match tile {
                '.' => {}
                '#' => walls.push(cell),
                'E' => enemies.push(ShipSpec {
                    cell,
                    energy: entry.enemy_energy,
                }),
                'P' => {
                    if let Some(first) = player {
                        return Err(LevelFormatError::DuplicatePlayer {
                            first,
                            second: cell,
                        });
                    }
                    player = Some(cell);
                }
                tile => return Err(LevelFormatError::UnknownTile { tile, cell }),
            }
        }
    }

    let player = player.ok_or(LevelFormatError::MissingPlayer)?;
    if enemies.is_empty() {
        return Err(LevelFormatError::NoEnemies);
    }

    Ok(LevelLayout {
        name: entry.name.clone(),
        columns: u32::try_from(width).map_err(|_| LevelFormatError::TooLarge)?,
        rows: u32::try_from(entry.map.len()).map_err(|_| LevelFormatError::TooLarge)?,
        walls,
        player: ShipSpec {
            cell: player,
            energy: entry.player_energy,
        },
        enemies,
    })
}

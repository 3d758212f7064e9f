//! Level setup: classifies cells from level data and places the fleet.

use trivia_fleet_core::{LevelLayout, ShipId};

use crate::{Board, PlacementError};

/// Fatal problems found while building a board from level data.
///
/// Any of these means the level data itself is broken, so there is no
/// recovery path other than fixing the level.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The level declares a grid without cells.
    #[error("level `{level}` declares an empty {columns}x{rows} grid")]
    EmptyGrid {
        /// Level name.
        level: String,
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
    },
    /// A wall lies outside the declared grid.
    #[error("level `{level}` places a wall outside its grid")]
    WallOutOfBounds {
        /// Level name.
        level: String,
        /// Underlying placement failure.
        #[source]
        source: PlacementError,
    },
    /// A ship could not be put on its starting cell.
    #[error("level `{level}` could not place ship {ship}")]
    Placement {
        /// Level name.
        level: String,
        /// Ship that failed to land.
        ship: ShipId,
        /// Underlying placement failure.
        #[source]
        source: PlacementError,
    },
}

impl Board {
    /// Builds a board from level data.
    ///
    /// Every cell is first classified as wall or open water, independent of
    /// the fleet; then the player and each enemy are placed in roster order.
    pub fn from_layout(layout: &LevelLayout) -> Result<Self, SetupError> {
        if layout.columns == 0 || layout.rows == 0 {
            return Err(SetupError::EmptyGrid {
                level: layout.name.clone(),
                columns: layout.columns,
                rows: layout.rows,
            });
        }

        let mut board = Board::with_player(layout.columns, layout.rows, layout.player.energy);
        for &wall in &layout.walls {
            board
                .set_wall(wall)
                .map_err(|source| SetupError::WallOutOfBounds {
                    level: layout.name.clone(),
                    source,
                })?;
        }

        let placement_error = |ship: ShipId| {
            let level = layout.name.clone();
            move |source: PlacementError| SetupError::Placement {
                level,
                ship,
                source,
            }
        };

        board
            .place_ship(ShipId::PLAYER, layout.player.cell)
            .map_err(placement_error(ShipId::PLAYER))?;

        for spec in &layout.enemies {
            let id = board.enlist_enemy(spec.energy);
            board
                .place_ship(id, spec.cell)
                .map_err(placement_error(id))?;
        }

        log::debug!(
            "level `{}` set up on a {}x{} board with {} enemies",
            layout.name,
            layout.columns,
            layout.rows,
            layout.enemies.len()
        );

        Ok(board)
    }
}

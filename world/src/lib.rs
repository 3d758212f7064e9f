#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state for Trivia Fleet.
//!
//! The [`Board`] owns the occupancy grid and the ship roster and is the only
//! place where either changes. Mutations return explicit results; read-only
//! access lives in the [`query`] module so systems can inspect the board
//! without holding a mutable borrow.

pub mod navigation;
mod setup;

pub use setup::SetupError;

use trivia_fleet_core::{CellCoord, Faction, ShipId, ShipSnapshot};

/// Contents of a single board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Impassable obstacle.
    Wall,
    /// Open water.
    Empty,
    /// Cell held by a live ship.
    Ship(ShipId),
}

/// Reasons a placement or move may be rejected by the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The cell lies outside the grid.
    #[error("cell {cell} is outside the board")]
    OutOfBounds {
        /// Requested cell.
        cell: CellCoord,
    },
    /// The cell holds a wall.
    #[error("cell {cell} is blocked by a wall")]
    Blocked {
        /// Requested cell.
        cell: CellCoord,
    },
    /// The cell already holds a ship.
    #[error("cell {cell} is already occupied by ship {occupant}")]
    Occupied {
        /// Requested cell.
        cell: CellCoord,
        /// Ship holding the cell.
        occupant: ShipId,
    },
    /// No ship with the identifier exists.
    #[error("ship {ship} is not on the roster")]
    UnknownShip {
        /// Requested ship.
        ship: ShipId,
    },
    /// The ship already stands on the board; use [`Board::move_ship`].
    #[error("ship {ship} is already placed at {cell}")]
    AlreadyPlaced {
        /// Requested ship.
        ship: ShipId,
        /// Cell the ship occupies.
        cell: CellCoord,
    },
    /// The ship has not been placed yet; use [`Board::place_ship`].
    #[error("ship {ship} has not been placed")]
    NotPlaced {
        /// Requested ship.
        ship: ShipId,
    },
    /// The ship has no energy left.
    #[error("ship {ship} has been destroyed")]
    ShipDestroyed {
        /// Requested ship.
        ship: ShipId,
    },
}

/// Result of draining energy from a ship.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnergyChange {
    /// Energy left after the drain.
    pub remaining: u32,
    /// Cell the ship was removed from, when the drain destroyed it.
    pub destroyed_at: Option<CellCoord>,
}

#[derive(Clone, Debug)]
struct Ship {
    id: ShipId,
    faction: Faction,
    cell: Option<CellCoord>,
    energy: u32,
    shielded: bool,
}

impl Ship {
    fn new(id: ShipId, faction: Faction, energy: u32) -> Self {
        Self {
            id,
            faction,
            cell: None,
            energy,
            shielded: false,
        }
    }

    fn is_alive(&self) -> bool {
        self.energy > 0
    }

    fn snapshot(&self) -> ShipSnapshot {
        ShipSnapshot {
            id: self.id,
            faction: self.faction,
            cell: self.cell,
            energy: self.energy,
            shielded: self.shielded,
        }
    }
}

/// Occupancy grid plus ship roster.
///
/// The player is always [`ShipId::PLAYER`]; enemies follow in roster order.
/// A [`Cell::Ship`] entry exists exactly when the matching live ship records
/// that cell as its position.
#[derive(Clone, Debug)]
pub struct Board {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
    player: Ship,
    enemies: Vec<Ship>,
}

impl Board {
    pub(crate) fn with_player(columns: u32, rows: u32, player_energy: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![Cell::Empty; capacity],
            player: Ship::new(ShipId::PLAYER, Faction::Player, player_energy),
            enemies: Vec::new(),
        }
    }

    pub(crate) fn set_wall(&mut self, cell: CellCoord) -> Result<(), PlacementError> {
        let index = self.index(cell).ok_or(PlacementError::OutOfBounds { cell })?;
        self.cells[index] = Cell::Wall;
        Ok(())
    }

    pub(crate) fn enlist_enemy(&mut self, energy: u32) -> ShipId {
        let id = ShipId::new(u32::try_from(self.enemies.len() + 1).unwrap_or(u32::MAX));
        self.enemies.push(Ship::new(id, Faction::Enemy, energy));
        id
    }

    /// Puts a ship that is not yet on the board onto an empty cell.
    ///
    /// Only used while setting up a level; moving a placed ship goes through
    /// [`Board::move_ship`].
    pub fn place_ship(&mut self, ship: ShipId, cell: CellCoord) -> Result<(), PlacementError> {
        let entry = self.ship_ref(ship).ok_or(PlacementError::UnknownShip { ship })?;
        if !entry.is_alive() {
            return Err(PlacementError::ShipDestroyed { ship });
        }
        if let Some(current) = entry.cell {
            return Err(PlacementError::AlreadyPlaced {
                ship,
                cell: current,
            });
        }

        let index = self.vacant_index(cell)?;
        self.cells[index] = Cell::Ship(ship);
        if let Some(entry) = self.ship_mut(ship) {
            entry.cell = Some(cell);
        }
        Ok(())
    }

    /// Moves a placed ship onto another cell.
    ///
    /// The destination is validated before anything changes, so a rejected
    /// move leaves both the grid and the roster untouched.
    pub fn move_ship(&mut self, ship: ShipId, cell: CellCoord) -> Result<(), PlacementError> {
        let entry = self.ship_ref(ship).ok_or(PlacementError::UnknownShip { ship })?;
        if !entry.is_alive() {
            return Err(PlacementError::ShipDestroyed { ship });
        }
        let from = entry.cell.ok_or(PlacementError::NotPlaced { ship })?;
        if from == cell {
            return Ok(());
        }

        let destination = self.vacant_index(cell)?;
        let origin = self.index(from).ok_or(PlacementError::OutOfBounds { cell: from })?;
        self.cells[origin] = Cell::Empty;
        self.cells[destination] = Cell::Ship(ship);
        if let Some(entry) = self.ship_mut(ship) {
            entry.cell = Some(cell);
        }
        Ok(())
    }

    /// Removes up to `amount` energy from a ship.
    ///
    /// A ship that reaches zero energy is taken off the grid. Returns `None`
    /// for unknown ships.
    pub fn drain_energy(&mut self, ship: ShipId, amount: u32) -> Option<EnergyChange> {
        let entry = self.ship_mut(ship)?;
        entry.energy = entry.energy.saturating_sub(amount);
        let remaining = entry.energy;
        let destroyed_at = if remaining == 0 { entry.cell.take() } else { None };

        if let Some(cell) = destroyed_at {
            if let Some(index) = self.index(cell) {
                self.cells[index] = Cell::Empty;
            }
        }

        Some(EnergyChange {
            remaining,
            destroyed_at,
        })
    }

    /// Flips a live ship's shield, returning whether it is now raised.
    pub fn toggle_shield(&mut self, ship: ShipId) -> Option<bool> {
        let entry = self.ship_mut(ship)?;
        if !entry.is_alive() {
            return None;
        }
        entry.shielded = !entry.shielded;
        Some(entry.shielded)
    }

    fn vacant_index(&self, cell: CellCoord) -> Result<usize, PlacementError> {
        let index = self.index(cell).ok_or(PlacementError::OutOfBounds { cell })?;
        match self.cells[index] {
            Cell::Empty => Ok(index),
            Cell::Wall => Err(PlacementError::Blocked { cell }),
            Cell::Ship(occupant) => Err(PlacementError::Occupied { cell, occupant }),
        }
    }

    fn ship_ref(&self, ship: ShipId) -> Option<&Ship> {
        match ship.get() {
            0 => Some(&self.player),
            n => self.enemies.get(usize::try_from(n - 1).ok()?),
        }
    }

    fn ship_mut(&mut self, ship: ShipId) -> Option<&mut Ship> {
        match ship.get() {
            0 => Some(&mut self.player),
            n => self.enemies.get_mut(usize::try_from(n - 1).ok()?),
        }
    }

    fn ships(&self) -> impl Iterator<Item = &Ship> {
        std::iter::once(&self.player).chain(self.enemies.iter())
    }

    fn cell_at(&self, cell: CellCoord) -> Option<Cell> {
        self.index(cell).map(|index| self.cells[index])
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Query functions that provide read-only access to the board.
pub mod query {
    use trivia_fleet_core::{CellCoord, Faction, RangeRule, ShipId, ShipSnapshot};

    use super::{Board, Cell};

    /// Number of columns and rows on the board.
    #[must_use]
    pub fn dimensions(board: &Board) -> (u32, u32) {
        (board.columns, board.rows)
    }

    /// Contents of a cell, or `None` when it lies outside the board.
    #[must_use]
    pub fn cell(board: &Board, cell: CellCoord) -> Option<Cell> {
        board.cell_at(cell)
    }

    /// Reports whether the cell is on the board and holds open water.
    #[must_use]
    pub fn is_empty(board: &Board, cell: CellCoord) -> bool {
        board.cell_at(cell) == Some(Cell::Empty)
    }

    /// Reports whether the cell holds an enemy ship.
    #[must_use]
    pub fn is_enemy(board: &Board, cell: CellCoord) -> bool {
        ship_at(board, cell)
            .and_then(|id| board.ship_ref(id))
            .is_some_and(|ship| ship.faction == Faction::Enemy)
    }

    /// Reports whether the cell is a wall or lies outside the board.
    #[must_use]
    pub fn is_blocked(board: &Board, cell: CellCoord) -> bool {
        matches!(board.cell_at(cell), None | Some(Cell::Wall))
    }

    /// Ship standing on the cell, if any.
    #[must_use]
    pub fn ship_at(board: &Board, cell: CellCoord) -> Option<ShipId> {
        match board.cell_at(cell)? {
            Cell::Ship(id) => Some(id),
            Cell::Wall | Cell::Empty => None,
        }
    }

    /// Snapshot of a ship on the roster.
    #[must_use]
    pub fn ship(board: &Board, id: ShipId) -> Option<ShipSnapshot> {
        board.ship_ref(id).map(super::Ship::snapshot)
    }

    /// Snapshot of the player ship.
    #[must_use]
    pub fn player(board: &Board) -> ShipSnapshot {
        board.player.snapshot()
    }

    /// Snapshots of every ship in roster order, destroyed ones included.
    #[must_use]
    pub fn ships(board: &Board) -> Vec<ShipSnapshot> {
        board.ships().map(super::Ship::snapshot).collect()
    }

    /// Live enemies that can reach the player under `rule`, in roster order.
    #[must_use]
    pub fn enemies_in_range(board: &Board, rule: RangeRule) -> Vec<ShipId> {
        let Some(player_cell) = board.player.cell else {
            return Vec::new();
        };

        board
            .enemies
            .iter()
            .filter(|enemy| enemy.is_alive())
            .filter(|enemy| enemy.cell.is_some_and(|cell| rule.covers(player_cell, cell)))
            .map(|enemy| enemy.id)
            .collect()
    }

    /// Reports whether any enemy ship is still alive.
    #[must_use]
    pub fn enemies_remain(board: &Board) -> bool {
        board.enemies.iter().any(super::Ship::is_alive)
    }

    /// Checks that the grid and the roster agree on every ship position.
    #[must_use]
    pub fn occupancy_consistent(board: &Board) -> bool {
        let grid_matches_roster = board.cells.iter().enumerate().all(|(index, cell)| {
            let Cell::Ship(id) = *cell else {
                return true;
            };
            let Some(ship) = board.ship_ref(id) else {
                return false;
            };
            ship.is_alive()
                && ship
                    .cell
                    .and_then(|position| board.index(position))
                    .is_some_and(|position| position == index)
        });

        let roster_matches_grid = board.ships().all(|ship| match ship.cell {
            Some(cell) => ship.is_alive() && board.cell_at(cell) == Some(Cell::Ship(ship.id)),
            None => true,
        });

        grid_matches_roster && roster_matches_grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_fleet_core::{DistanceMetric, RangeRule};

    fn open_board() -> (Board, ShipId, ShipId) {
        let mut board = Board::with_player(5, 5, 10);
        let enemy = board.enlist_enemy(4);
        board
            .place_ship(ShipId::PLAYER, CellCoord::new(0, 0))
            .expect("player placed");
        board
            .place_ship(enemy, CellCoord::new(4, 4))
            .expect("enemy placed");
        (board, ShipId::PLAYER, enemy)
    }

    #[test]
    fn place_ship_rejects_non_empty_cells() {
        let mut board = Board::with_player(3, 3, 5);
        let enemy = board.enlist_enemy(5);
        board.set_wall(CellCoord::new(1, 1)).expect("wall set");
        board
            .place_ship(ShipId::PLAYER, CellCoord::new(0, 0))
            .expect("player placed");

        assert_eq!(
            board.place_ship(enemy, CellCoord::new(1, 1)),
            Err(PlacementError::Blocked {
                cell: CellCoord::new(1, 1)
            })
        );
        assert_eq!(
            board.place_ship(enemy, CellCoord::new(0, 0)),
            Err(PlacementError::Occupied {
                cell: CellCoord::new(0, 0),
                occupant: ShipId::PLAYER,
            })
        );
        assert_eq!(
            board.place_ship(enemy, CellCoord::new(3, 0)),
            Err(PlacementError::OutOfBounds {
                cell: CellCoord::new(3, 0)
            })
        );
        assert!(query::occupancy_consistent(&board));
    }

    #[test]
    fn place_ship_refuses_to_place_twice() {
        let (mut board, player, _) = open_board();
        assert_eq!(
            board.place_ship(player, CellCoord::new(1, 1)),
            Err(PlacementError::AlreadyPlaced {
                ship: player,
                cell: CellCoord::new(0, 0),
            })
        );
    }

    #[test]
    fn move_ship_vacates_source_and_fills_destination() {
        let (mut board, player, _) = open_board();

        board
            .move_ship(player, CellCoord::new(0, 1))
            .expect("move succeeds");

        assert!(query::is_empty(&board, CellCoord::new(0, 0)));
        assert!(!query::is_empty(&board, CellCoord::new(0, 1)));
        assert_eq!(query::ship_at(&board, CellCoord::new(0, 1)), Some(player));
        assert_eq!(query::player(&board).cell, Some(CellCoord::new(0, 1)));
        assert!(query::occupancy_consistent(&board));
    }

    #[test]
    fn rejected_move_leaves_board_untouched() {
        let (mut board, player, enemy) = open_board();

        assert_eq!(
            board.move_ship(player, CellCoord::new(4, 4)),
            Err(PlacementError::Occupied {
                cell: CellCoord::new(4, 4),
                occupant: enemy,
            })
        );

        assert_eq!(query::ship_at(&board, CellCoord::new(0, 0)), Some(player));
        assert_eq!(query::player(&board).cell, Some(CellCoord::new(0, 0)));
        assert!(query::occupancy_consistent(&board));
    }

    #[test]
    fn drain_energy_removes_destroyed_ships() {
        let (mut board, _, enemy) = open_board();

        let change = board.drain_energy(enemy, 3).expect("known ship");
        assert_eq!(change.remaining, 1);
        assert_eq!(change.destroyed_at, None);
        assert!(query::enemies_remain(&board));

        let change = board.drain_energy(enemy, 3).expect("known ship");
        assert_eq!(change.remaining, 0);
        assert_eq!(change.destroyed_at, Some(CellCoord::new(4, 4)));
        assert!(query::is_empty(&board, CellCoord::new(4, 4)));
        assert!(!query::enemies_remain(&board));
        assert!(query::occupancy_consistent(&board));
        assert_eq!(
            board.move_ship(enemy, CellCoord::new(3, 3)),
            Err(PlacementError::ShipDestroyed { ship: enemy })
        );
    }

    #[test]
    fn queries_reject_out_of_bounds_cells() {
        let (board, _, _) = open_board();
        let outside = CellCoord::new(5, 0);

        assert!(!query::is_empty(&board, outside));
        assert!(!query::is_enemy(&board, outside));
        assert!(query::is_blocked(&board, outside));
        assert_eq!(query::ship_at(&board, outside), None);
    }

    #[test]
    fn is_enemy_ignores_the_player() {
        let (board, _, _) = open_board();
        assert!(query::is_enemy(&board, CellCoord::new(4, 4)));
        assert!(!query::is_enemy(&board, CellCoord::new(0, 0)));
        assert!(!query::is_enemy(&board, CellCoord::new(2, 2)));
    }

    #[test]
    fn enemies_in_range_follows_rule_and_roster_order() {
        let mut board = Board::with_player(6, 6, 10);
        let far = board.enlist_enemy(3);
        let diagonal = board.enlist_enemy(3);
        let straight = board.enlist_enemy(3);
        board
            .place_ship(ShipId::PLAYER, CellCoord::new(2, 2))
            .expect("player placed");
        board.place_ship(far, CellCoord::new(5, 5)).expect("placed");
        board
            .place_ship(diagonal, CellCoord::new(3, 3))
            .expect("placed");
        board
            .place_ship(straight, CellCoord::new(2, 4))
            .expect("placed");

        let chebyshev = RangeRule {
            metric: DistanceMetric::Chebyshev,
            reach: 2,
        };
        let manhattan = RangeRule {
            metric: DistanceMetric::Manhattan,
            reach: 1,
        };

        assert_eq!(
            query::enemies_in_range(&board, chebyshev),
            vec![diagonal, straight]
        );
        assert!(query::enemies_in_range(&board, manhattan).is_empty());

        let _ = board.drain_energy(diagonal, 3);
        assert_eq!(query::enemies_in_range(&board, chebyshev), vec![straight]);
    }

    #[test]
    fn toggle_shield_flips_state() {
        let (mut board, player, _) = open_board();
        assert_eq!(board.toggle_shield(player), Some(true));
        assert!(query::player(&board).shielded);
        assert_eq!(board.toggle_shield(player), Some(false));
        assert_eq!(board.toggle_shield(ShipId::new(9)), None);
    }
}

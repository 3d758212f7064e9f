//! Shortest-path search over the board used by move actions.

use std::{
    cmp::Reverse,
    collections::BinaryHeap,
};

use trivia_fleet_core::{CellCoord, OccupancyPolicy, Path};

use crate::{Board, Cell};

/// A* search over the 4-connected board with unit step costs.
///
/// The Manhattan heuristic is admissible and consistent for this movement
/// model, so returned paths are optimal. When several frontier nodes share the
/// same `f = g + h`, the node discovered most recently is expanded first, and
/// neighbours are always discovered in the order north, east, south, west.
/// Together these make every search reproducible.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathFinder {
    policy: OccupancyPolicy,
}

impl PathFinder {
    /// Creates a pathfinder that treats other ships according to `policy`.
    #[must_use]
    pub const fn new(policy: OccupancyPolicy) -> Self {
        Self { policy }
    }

    /// Occupancy policy applied to cells held by ships.
    #[must_use]
    pub const fn policy(&self) -> OccupancyPolicy {
        self.policy
    }

    /// Finds the shortest route from `start` to `goal`.
    ///
    /// Returns an empty path when the two cells coincide, when either lies
    /// outside the board, when the goal is not walkable, or when no route
    /// exists. The board is only read.
    #[must_use]
    pub fn find_path(&self, board: &Board, start: CellCoord, goal: CellCoord) -> Path {
        if start == goal {
            return Path::empty();
        }

        let (Some(start_index), Some(goal_index)) = (board.index(start), board.index(goal)) else {
            return Path::empty();
        };

        if !self.is_walkable(board.cells[goal_index]) {
            log::debug!("goal {goal} is not walkable");
            return Path::empty();
        }

        let node_count = board.cells.len();
        let mut cost = vec![u32::MAX; node_count];
        let mut came_from: Vec<Option<usize>> = vec![None; node_count];
        let mut closed = vec![false; node_count];
        let mut frontier = BinaryHeap::new();
        let mut discovered: u64 = 0;

        cost[start_index] = 0;
        frontier.push(Reverse((start.manhattan_distance(goal), Reverse(discovered), start_index)));

        while let Some(Reverse((_, _, current_index))) = frontier.pop() {
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current_index == goal_index {
                return reconstruct(board, &came_from, start_index, goal_index);
            }

            let current = coord(board.columns, current_index);
            let next_cost = cost[current_index].saturating_add(1);

            for neighbor in neighbors(current, board.columns, board.rows) {
                let Some(neighbor_index) = board.index(neighbor) else {
                    continue;
                };

                if closed[neighbor_index] || !self.is_walkable(board.cells[neighbor_index]) {
                    continue;
                }

                if next_cost >= cost[neighbor_index] {
                    continue;
                }

                cost[neighbor_index] = next_cost;
                came_from[neighbor_index] = Some(current_index);
                discovered += 1;
                let estimate = next_cost.saturating_add(neighbor.manhattan_distance(goal));
                frontier.push(Reverse((estimate, Reverse(discovered), neighbor_index)));
            }
        }

        log::debug!("no route from {start} to {goal}");
        Path::empty()
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        match cell {
            Cell::Empty => true,
            Cell::Wall => false,
            Cell::Ship(_) => self.policy == OccupancyPolicy::PassThroughShips,
        }
    }
}

fn reconstruct(board: &Board, came_from: &[Option<usize>], start: usize, goal: usize) -> Path {
    let mut steps = Vec::new();
    let mut cursor = goal;

    while cursor != start {
        steps.push(coord(board.columns, cursor));
        match came_from[cursor] {
            Some(previous) => cursor = previous,
            None => return Path::empty(),
        }
    }

    steps.reverse();
    Path::from_steps(steps)
}

fn coord(columns: u32, index: usize) -> CellCoord {
    let width = usize::try_from(columns).unwrap_or(1).max(1);
    let column = u32::try_from(index % width).unwrap_or(u32::MAX);
    let row = u32::try_from(index / width).unwrap_or(u32::MAX);
    CellCoord::new(column, row)
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_fleet_core::{LevelLayout, ShipSpec};

    fn board(columns: u32, rows: u32, walls: Vec<CellCoord>, enemies: Vec<CellCoord>) -> Board {
        let layout = LevelLayout {
            name: "test".to_owned(),
            columns,
            rows,
            walls,
            player: ShipSpec {
                cell: CellCoord::new(0, 0),
                energy: 10,
            },
            enemies: enemies
                .into_iter()
                .map(|cell| ShipSpec { cell, energy: 3 })
                .collect(),
        };
        Board::from_layout(&layout).expect("valid layout")
    }

    fn assert_connected(start: CellCoord, path: &Path) {
        let mut previous = start;
        for step in path.steps() {
            assert!(
                previous.direction_to(step).is_some(),
                "{previous} and {step} are not adjacent"
            );
            previous = step;
        }
    }

    #[test]
    fn open_grid_paths_have_manhattan_length() {
        let board = board(5, 5, Vec::new(), vec![CellCoord::new(4, 4)]);
        let finder = PathFinder::default();
        let start = CellCoord::new(0, 0);

        for goal in [
            CellCoord::new(0, 3),
            CellCoord::new(3, 0),
            CellCoord::new(3, 3),
            CellCoord::new(4, 3),
        ] {
            let path = finder.find_path(&board, start, goal);
            assert_eq!(path.len() as u32, start.manhattan_distance(goal));
            assert_eq!(path.goal(), Some(goal));
            assert_connected(start, &path);
        }
    }

    #[test]
    fn start_equal_to_goal_is_empty() {
        let board = board(3, 3, Vec::new(), vec![CellCoord::new(2, 2)]);
        let path = PathFinder::default().find_path(&board, CellCoord::new(0, 0), CellCoord::new(0, 0));
        assert!(path.is_empty());
    }

    #[test]
    fn walled_off_goal_is_unreachable() {
        let ring = vec![
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
            CellCoord::new(3, 1),
            CellCoord::new(1, 2),
            CellCoord::new(3, 2),
            CellCoord::new(1, 3),
            CellCoord::new(2, 3),
            CellCoord::new(3, 3),
        ];
        let board = board(5, 5, ring, vec![CellCoord::new(4, 4)]);

        let path = PathFinder::default().find_path(&board, CellCoord::new(0, 0), CellCoord::new(2, 2));
        assert!(path.is_empty());
    }

    #[test]
    fn walls_and_bounds_reject_goal() {
        let board = board(3, 3, vec![CellCoord::new(1, 1)], vec![CellCoord::new(2, 2)]);
        let finder = PathFinder::default();
        assert!(finder
            .find_path(&board, CellCoord::new(0, 0), CellCoord::new(1, 1))
            .is_empty());
        assert!(finder
            .find_path(&board, CellCoord::new(0, 0), CellCoord::new(3, 0))
            .is_empty());
    }

    #[test]
    fn detours_around_walls_optimally() {
        // Column 1 is blocked except for the bottom row.
        let walls = vec![
            CellCoord::new(1, 0),
            CellCoord::new(1, 1),
            CellCoord::new(1, 2),
        ];
        let board = board(4, 4, walls, vec![CellCoord::new(3, 3)]);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(2, 0);

        let path = PathFinder::default().find_path(&board, start, goal);

        assert_eq!(path.len(), 8);
        assert_eq!(path.goal(), Some(goal));
        assert!(path.steps().any(|cell| cell == CellCoord::new(1, 3)));
        assert_connected(start, &path);
    }

    #[test]
    fn equal_cost_ties_favour_most_recent_discovery() {
        let board = board(3, 3, Vec::new(), vec![CellCoord::new(2, 2)]);
        let path = PathFinder::default().find_path(&board, CellCoord::new(0, 0), CellCoord::new(1, 1));

        assert_eq!(
            path.steps().collect::<Vec<_>>(),
            vec![CellCoord::new(0, 1), CellCoord::new(1, 1)]
        );
    }

    #[test]
    fn searches_are_reproducible() {
        let board = board(6, 6, vec![CellCoord::new(2, 2)], vec![CellCoord::new(5, 0)]);
        let finder = PathFinder::default();
        let first = finder.find_path(&board, CellCoord::new(0, 0), CellCoord::new(5, 5));
        let second = finder.find_path(&board, CellCoord::new(0, 0), CellCoord::new(5, 5));
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
    }

    #[test]
    fn occupancy_policy_controls_ship_cells() {
        // A single-lane corridor with an enemy parked in the middle.
        let walls = vec![
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
            CellCoord::new(3, 1),
        ];
        let board = board(4, 2, walls, vec![CellCoord::new(2, 0)]);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(3, 0);

        let avoiding = PathFinder::new(OccupancyPolicy::AvoidShips).find_path(&board, start, goal);
        assert!(avoiding.is_empty());

        let passing =
            PathFinder::new(OccupancyPolicy::PassThroughShips).find_path(&board, start, goal);
        assert_eq!(passing.len(), 3);

        let onto_ship = PathFinder::new(OccupancyPolicy::AvoidShips).find_path(
            &board,
            start,
            CellCoord::new(2, 0),
        );
        assert!(onto_ship.is_empty());
    }
}

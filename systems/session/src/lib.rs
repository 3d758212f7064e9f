#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level session: one board plus one turn controller, built when a level
//! starts and dropped when it ends.

use std::time::Duration;

use trivia_fleet_core::{BattleConfig, BattleOutcome, Event, LevelLayout, SceneControl};
use trivia_fleet_system_turns::{BattleStatus, Collaborators, TurnController};
use trivia_fleet_world::{Board, SetupError};

/// Position within a campaign of levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LevelCursor {
    current: usize,
    count: usize,
}

impl LevelCursor {
    /// Creates a cursor on `current`, clamped to the last of `count` levels.
    ///
    /// Returns `None` for an empty campaign.
    #[must_use]
    pub fn new(current: usize, count: usize) -> Option<Self> {
        let last = count.checked_sub(1)?;
        Some(Self {
            current: current.min(last),
            count,
        })
    }

    /// Index of the current level.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Number of levels in the campaign.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Reports whether the cursor sits on the final level.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.current + 1 >= self.count
    }

    /// Next level, staying on the final one.
    #[must_use]
    pub const fn advance(self) -> Self {
        if self.is_last() {
            self
        } else {
            Self {
                current: self.current + 1,
                count: self.count,
            }
        }
    }

    /// Previous level, staying on the first one.
    #[must_use]
    pub const fn retreat(self) -> Self {
        Self {
            current: self.current.saturating_sub(1),
            count: self.count,
        }
    }

    /// Same level again.
    #[must_use]
    pub const fn restart(self) -> Self {
        self
    }

    /// First level of the campaign.
    #[must_use]
    pub const fn first(self) -> Self {
        Self {
            current: 0,
            count: self.count,
        }
    }
}

/// What to load once a battle is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelRequest {
    /// Replay the current level.
    Restart,
    /// Continue with the next level.
    Advance,
    /// Go back one level.
    Retreat,
    /// Start over from the first level.
    RestartGame,
}

/// Errors raised by [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The cursor points past the provided levels.
    #[error("level {index} does not exist; the campaign has {count} levels")]
    MissingLevel {
        /// Requested level index.
        index: usize,
        /// Number of levels provided.
        count: usize,
    },
    /// The battle has not ended, so its outcome was never scored.
    #[error("the battle on level {level} is still in progress")]
    OutcomePending {
        /// Index of the level being played.
        level: usize,
    },
    /// The level data could not be turned into a board.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// A single level being played.
#[derive(Debug)]
pub struct Session {
    cursor: LevelCursor,
    board: Board,
    controller: TurnController,
}

impl Session {
    /// Builds the board for the level under `cursor` and a fresh controller.
    pub fn start(
        levels: &[LevelLayout],
        cursor: LevelCursor,
        config: BattleConfig,
    ) -> Result<Self, SessionError> {
        let layout = levels
            .get(cursor.current())
            .ok_or(SessionError::MissingLevel {
                index: cursor.current(),
                count: levels.len(),
            })?;
        let board = Board::from_layout(layout)?;
        log::info!(
            "starting level {} of {}: {}",
            cursor.current() + 1,
            cursor.count(),
            layout.name
        );

        Ok(Self {
            cursor,
            board,
            controller: TurnController::new(config),
        })
    }

    /// Advances the battle by one tick.
    pub fn tick(
        &mut self,
        dt: Duration,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> BattleStatus {
        self.controller.tick(dt, &mut self.board, hosts, out)
    }

    /// Board of the level.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Turn controller of the level.
    #[must_use]
    pub const fn controller(&self) -> &TurnController {
        &self.controller
    }

    /// Cursor of the level being played.
    #[must_use]
    pub const fn cursor(&self) -> LevelCursor {
        self.cursor
    }

    /// Outcome of the battle, once scored.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.controller.outcome()
    }

    /// Loads the level chosen by `request` and returns its cursor.
    ///
    /// Refused until the battle has ended and its outcome was recorded.
    pub fn conclude(
        &self,
        request: LevelRequest,
        scene: &mut dyn SceneControl,
    ) -> Result<LevelCursor, SessionError> {
        if self.outcome().is_none() {
            return Err(SessionError::OutcomePending {
                level: self.cursor.current(),
            });
        }

        let next = match request {
            LevelRequest::Restart => self.cursor.restart(),
            LevelRequest::Advance => self.cursor.advance(),
            LevelRequest::Retreat => self.cursor.retreat(),
            LevelRequest::RestartGame => self.cursor.first(),
        };
        log::debug!("{request:?}: loading level {}", next.current());
        scene.load_level(next.current());
        Ok(next)
    }
}

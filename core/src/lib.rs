#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Trivia Fleet engine.
//!
//! This crate defines the vocabulary that connects adapters, the authoritative
//! board, and the turn systems. The board owns ship positions and energy, the
//! systems advance one tick at a time and broadcast [`Event`] values so that
//! renderers and sound can follow along without the core ever touching a
//! visual handle. Everything the turn loop needs from the outside world (the
//! quiz, grid selection, natural-language commands, combat playback, shields,
//! messages, scoring and scene loading) is expressed as a narrow trait here.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when a campaign boots.
pub const WELCOME_BANNER: &str = "Welcome aboard, captain. Answer well and the fleet is yours.";

/// Coarse turn state of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// A trivia question is awaiting an answer.
    Question,
    /// The player may pick a move, an attack, or a shield toggle.
    Player,
    /// Enemies in range take their shots at the player.
    Enemies,
    /// An action or stage transition is resolving; no input is accepted.
    Busy,
}

/// Overlay surfaces the turn controller switches between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    /// Trivia question panel.
    Question,
    /// Grid selection panel used during the player's turn.
    Selection,
    /// Modal message panel.
    Message,
}

/// Judging state reported by the question surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnswerState {
    /// No answer has been given yet.
    Pending,
    /// The last answer was correct.
    Right,
    /// The last answer was incorrect.
    Wrong,
    /// The answer has been consumed and must not trigger again.
    Suspended,
}

/// Player intent resolved by the grid selection surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionOutcome {
    /// Nothing actionable was selected.
    None,
    /// Move the player ship to the provided cell.
    Move(CellCoord),
    /// Attack the ship standing on the provided cell.
    Attack(CellCoord),
    /// Toggle the player's shield.
    Shield,
}

/// Intent recognised by the natural-language command surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandIntent {
    /// Attack whatever stands on the selected cell.
    Attack,
    /// Move to the selected cell.
    Move,
    /// Toggle the player's shield.
    Shield,
    /// The command could not be understood.
    Fail,
}

/// Result produced when a natural-language command session ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Recognised intent.
    pub intent: CommandIntent,
    /// Index into the selection surface's local grid.
    pub selection_index: u32,
    /// Message shown to the player when the intent is [`CommandIntent::Fail`].
    pub fail_message: String,
}

/// Damage reported by the combat resolver once an attack has played out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttackReport {
    /// Energy removed from the defender.
    pub damage: u32,
}

/// Terminal result of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every enemy ship was destroyed.
    Won,
    /// The player ship ran out of energy.
    Lost,
}

/// Side a ship fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The single ship controlled by the player.
    Player,
    /// A computer-controlled opponent.
    Enemy,
}

/// Unique identifier assigned to a ship; the roster index on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(u32);

impl ShipId {
    /// Identifier always assigned to the player ship.
    pub const PLAYER: ShipId = ShipId(0);

    /// Creates a new ship identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location of a single board cell expressed as column (x) and row (y).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new board cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the Chebyshev (king-move) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Direction of a single orthogonal step from `self` to `to`, if they are adjacent.
    #[must_use]
    pub fn direction_to(self, to: CellCoord) -> Option<Direction> {
        let column_diff = self.column.abs_diff(to.column);
        let row_diff = self.row.abs_diff(to.row);

        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Cardinal movement directions available to ships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

/// Route produced by the pathfinder.
///
/// Cells run from the first step after the start (exclusive) up to and
/// including the goal. The route is consumed nearest-first like a stack, so
/// it is stored goal-first internally and popped from the back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    reversed: Vec<CellCoord>,
}

impl Path {
    /// Empty route, meaning either "already there" or "no route".
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            reversed: Vec::new(),
        }
    }

    /// Builds a path from cells listed in travel order.
    #[must_use]
    pub fn from_steps(mut steps: Vec<CellCoord>) -> Self {
        steps.reverse();
        Self { reversed: steps }
    }

    /// Removes and returns the next cell to enter.
    pub fn pop_next(&mut self) -> Option<CellCoord> {
        self.reversed.pop()
    }

    /// Next cell to enter without consuming it.
    #[must_use]
    pub fn peek_next(&self) -> Option<CellCoord> {
        self.reversed.last().copied()
    }

    /// Final cell of the route.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.reversed.first().copied()
    }

    /// Number of steps left on the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reversed.len()
    }

    /// Reports whether no steps remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reversed.is_empty()
    }

    /// Drops every remaining step.
    pub fn clear(&mut self) {
        self.reversed.clear();
    }

    /// Remaining steps in travel order.
    pub fn steps(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.reversed.iter().rev().copied()
    }
}

/// Immutable representation of a single ship's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipSnapshot {
    /// Identifier of the ship.
    pub id: ShipId,
    /// Side the ship fights for.
    pub faction: Faction,
    /// Cell currently occupied by the ship, `None` once destroyed or before placement.
    pub cell: Option<CellCoord>,
    /// Remaining energy.
    pub energy: u32,
    /// Whether the ship's shield is raised.
    pub shielded: bool,
}

impl ShipSnapshot {
    /// A ship is alive while it still has energy.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.energy > 0
    }
}

/// Starting position and energy of a ship described by level data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSpec {
    /// Cell the ship starts on.
    pub cell: CellCoord,
    /// Energy the ship starts with.
    pub energy: u32,
}

/// Static description of a level used to build the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Human readable level name.
    pub name: String,
    /// Number of columns on the board.
    pub columns: u32,
    /// Number of rows on the board.
    pub rows: u32,
    /// Cells blocked by obstacles.
    pub walls: Vec<CellCoord>,
    /// Player ship placement.
    pub player: ShipSpec,
    /// Enemy ship placements in roster order.
    pub enemies: Vec<ShipSpec>,
}

/// Distance measure used to decide which enemies can reach the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Largest axis difference; diagonal neighbours are one cell away.
    Chebyshev,
    /// Sum of axis differences.
    Manhattan,
}

/// Distance threshold that marks an enemy as "in range" of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRule {
    /// Distance measure.
    pub metric: DistanceMetric,
    /// Largest distance, inclusive, at which an enemy may attack.
    pub reach: u32,
}

impl RangeRule {
    /// Reports whether two cells lie within reach of each other.
    #[must_use]
    pub fn covers(&self, from: CellCoord, to: CellCoord) -> bool {
        let distance = match self.metric {
            DistanceMetric::Chebyshev => from.chebyshev_distance(to),
            DistanceMetric::Manhattan => from.manhattan_distance(to),
        };
        distance <= self.reach
    }
}

impl Default for RangeRule {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Chebyshev,
            reach: 2,
        }
    }
}

/// Whether the pathfinder may route through cells held by other ships.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// Occupied cells are treated like walls.
    #[default]
    AvoidShips,
    /// Occupied cells are walkable; moves abort if they meet a ship on the way.
    PassThroughShips,
}

/// Tunable battle parameters.
///
/// Durations are stored in milliseconds so the configuration reads naturally
/// from TOML; use the accessor methods to obtain [`Duration`] values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Number of ticks spent animating a ship across one cell.
    pub frames_per_move: u32,
    /// Energy every ship loses when its turn ends.
    pub energy_decay_per_turn: u32,
    /// Rule selecting the enemies that attack during the enemy phase.
    pub attack_range: RangeRule,
    /// Whether paths may cross cells held by other ships.
    pub path_policy: OccupancyPolicy,
    /// Pause between an answered question and the next stage.
    pub stage_delay_ms: u64,
    /// Pause before a player attack is handed to the combat resolver.
    pub attack_windup_ms: u64,
    /// Pause after a shield toggle.
    pub shield_delay_ms: u64,
    /// Pause used when no enemy is in range during the enemy phase.
    pub idle_enemy_phase_ms: u64,
    /// Time after which an unresolved attack is abandoned; `None` waits forever.
    pub attack_timeout_ms: Option<u64>,
}

impl BattleConfig {
    /// Pause between an answered question and the next stage.
    #[must_use]
    pub fn stage_delay(&self) -> Duration {
        Duration::from_millis(self.stage_delay_ms)
    }

    /// Pause before a player attack is handed to the combat resolver.
    #[must_use]
    pub fn attack_windup(&self) -> Duration {
        Duration::from_millis(self.attack_windup_ms)
    }

    /// Pause after a shield toggle.
    #[must_use]
    pub fn shield_delay(&self) -> Duration {
        Duration::from_millis(self.shield_delay_ms)
    }

    /// Pause used when no enemy is in range.
    #[must_use]
    pub fn idle_enemy_phase(&self) -> Duration {
        Duration::from_millis(self.idle_enemy_phase_ms)
    }

    /// Time after which an unresolved attack is abandoned.
    #[must_use]
    pub fn attack_timeout(&self) -> Option<Duration> {
        self.attack_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            frames_per_move: 10,
            energy_decay_per_turn: 1,
            attack_range: RangeRule::default(),
            path_policy: OccupancyPolicy::AvoidShips,
            stage_delay_ms: 800,
            attack_windup_ms: 500,
            shield_delay_ms: 1_000,
            idle_enemy_phase_ms: 1_000,
            attack_timeout_ms: Some(10_000),
        }
    }
}

/// Events broadcast by the turn systems while a battle advances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The turn stage changed.
    StageChanged {
        /// Stage before the change.
        from: Stage,
        /// Stage after the change.
        to: Stage,
    },
    /// A ship started travelling along a path.
    MoveStarted {
        /// Ship that moves.
        ship: ShipId,
        /// Number of cells on the route.
        steps: usize,
    },
    /// One animation frame of a ship gliding toward the next cell.
    ShipNudged {
        /// Ship being animated.
        ship: ShipId,
        /// Direction of travel.
        direction: Direction,
        /// One-based frame within the current cell.
        frame: u32,
        /// Frames needed to cross one cell.
        frames: u32,
    },
    /// A ship was committed to a new cell on the board.
    ShipAdvanced {
        /// Ship that moved.
        ship: ShipId,
        /// Cell the ship left.
        from: CellCoord,
        /// Cell the ship now occupies.
        to: CellCoord,
    },
    /// A ship stopped travelling.
    MoveFinished {
        /// Ship that moved.
        ship: ShipId,
        /// Cell the ship ended on.
        cell: Option<CellCoord>,
    },
    /// An attack was handed to the combat resolver.
    AttackLaunched {
        /// Attacking ship.
        attacker: ShipId,
        /// Targeted ship.
        defender: ShipId,
    },
    /// The combat resolver reported the attack's damage.
    AttackResolved {
        /// Attacking ship.
        attacker: ShipId,
        /// Targeted ship.
        defender: ShipId,
        /// Energy removed from the defender.
        damage: u32,
        /// Defender energy after the hit.
        remaining: u32,
    },
    /// The combat resolver never answered and the attack was dropped.
    AttackTimedOut {
        /// Attacking ship.
        attacker: ShipId,
        /// Targeted ship.
        defender: ShipId,
    },
    /// A ship ran out of energy and left the board.
    ShipDestroyed {
        /// Destroyed ship.
        ship: ShipId,
        /// Cell the ship occupied.
        cell: CellCoord,
    },
    /// A ship raised or lowered its shield.
    ShieldToggled {
        /// Ship whose shield changed.
        ship: ShipId,
        /// Whether the shield is now raised.
        raised: bool,
    },
    /// End-of-turn energy decay was applied.
    EnergyDecayed {
        /// Ship that lost energy.
        ship: ShipId,
        /// Energy after the decay.
        remaining: u32,
    },
    /// The battle reached a terminal outcome.
    BattleEnded {
        /// Win or loss.
        outcome: BattleOutcome,
        /// Player energy at the end of the battle.
        final_energy: u32,
    },
}

/// Shows and hides the overlay panels.
pub trait PanelSurface {
    /// Shows `panel` and hides every other panel.
    fn show(&mut self, panel: Panel);

    /// Hides every panel.
    fn hide_all(&mut self);
}

/// Trivia question surface.
pub trait QuestionSurface {
    /// Current judging state.
    fn answer_state(&self) -> AnswerState;

    /// Overrides the judging state, used to mark an answer as consumed.
    fn set_answer_state(&mut self, state: AnswerState);
}

/// Grid selection surface used during the player's turn.
pub trait SelectionSurface {
    /// Intent resolved by the player, if any.
    fn final_result(&self) -> Option<SelectionOutcome>;

    /// Clears the resolved intent so it cannot trigger twice.
    fn reset_final_result(&mut self);

    /// Refreshes selection affordances after the board changed.
    fn update_selection_ui(&mut self);

    /// Maps an index of the selection grid onto a board cell.
    fn map_selection_index(&self, local_index: u32) -> Option<CellCoord>;

    /// Human readable name of a selection grid index.
    fn describe_index(&self, local_index: u32) -> String;
}

/// Natural-language command surface.
pub trait CommandSurface {
    /// Whether a command session is in progress.
    fn is_session_running(&self) -> bool;

    /// Result of the last finished session, if any.
    fn final_result(&self) -> Option<CommandOutcome>;

    /// Clears the last result.
    fn reset_final_result(&mut self);
}

/// External combat playback that decides how much damage an attack deals.
///
/// At most one attack is in flight at any time.
pub trait CombatResolver {
    /// Starts playing an attack.
    fn begin(&mut self, attacker: ShipSnapshot, defender: ShipSnapshot);

    /// Polls the in-flight attack; returns the report once it has finished.
    fn poll(&mut self) -> Option<AttackReport>;

    /// Drops the in-flight attack after it timed out.
    fn abandon(&mut self) {}
}

/// Shield button and shield presentation.
pub trait ShieldControl {
    /// Returns `true` once per press of the shield button.
    fn take_toggle_request(&mut self) -> bool;

    /// Notifies the presentation that a ship's shield changed.
    fn shield_toggled(&mut self, ship: ShipId, raised: bool);
}

/// Modal message surface.
pub trait MessageSurface {
    /// Displays a message to the player.
    fn show_message(&mut self, text: &str);

    /// Returns `true` once after the player dismissed the message.
    fn take_dismissal(&mut self) -> bool;
}

/// Score bookkeeping.
pub trait ScoreKeeper {
    /// Records the end of a battle with the player's final energy.
    fn record_outcome(&mut self, final_energy: u32);

    /// Rewards a correct trivia answer.
    fn increment_on_correct_answer(&mut self);
}

/// Scene loading performed by the host.
pub trait SceneControl {
    /// Loads the level at `index`.
    fn load_level(&mut self, index: usize);
}

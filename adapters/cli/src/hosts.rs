//! Scripted stand-ins for the interactive surfaces of the game.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trivia_fleet_core::{
    AnswerState, AttackReport, BattleConfig, CellCoord, CombatResolver, CommandOutcome,
    CommandSurface, Faction, MessageSurface, Panel, PanelSurface, QuestionSurface, RangeRule,
    SceneControl, ScoreKeeper, SelectionOutcome, SelectionSurface, ShieldControl, ShipId,
    ShipSnapshot, Stage,
};
use trivia_fleet_system_turns::Collaborators;
use trivia_fleet_world::{navigation::PathFinder, query, Board};

/// Side length of the selection window centred on the player.
const WINDOW: u32 = 5;
/// Most cells the autopilot travels in one turn.
const STRIDE: usize = 3;
/// Energy at or below which the autopilot raises its shield.
const LOW_ENERGY: u32 = 3;
const PLAYER_DAMAGE: u32 = 3;
const ENEMY_DAMAGE: u32 = 2;
/// Polls a scripted attack takes to play out.
const PLAYBACK_TICKS: u32 = 3;
const POINTS_PER_ANSWER: u32 = 10;

/// Every scripted collaborator of a campaign run.
pub(crate) struct Hosts {
    pub(crate) panels: ConsolePanels,
    pub(crate) quiz: ScriptedQuiz,
    pub(crate) autopilot: Autopilot,
    pub(crate) commands: SilentCommands,
    pub(crate) combat: DelayedCombat,
    pub(crate) shield: ShieldLog,
    pub(crate) messages: ConsoleMessages,
    pub(crate) score: Scoreboard,
    pub(crate) scenes: SceneLog,
}

impl Hosts {
    pub(crate) fn new(seed: u64, accuracy: f64, battle: &BattleConfig) -> Self {
        Self {
            panels: ConsolePanels::default(),
            quiz: ScriptedQuiz::new(seed, accuracy),
            autopilot: Autopilot::new(battle),
            commands: SilentCommands,
            combat: DelayedCombat::default(),
            shield: ShieldLog,
            messages: ConsoleMessages::default(),
            score: Scoreboard::default(),
            scenes: SceneLog::default(),
        }
    }

    /// Lets the scripted player react to the stage about to be ticked.
    pub(crate) fn prepare(&mut self, stage: Stage, board: &Board) {
        match stage {
            Stage::Question => self.quiz.think(),
            Stage::Player => self.autopilot.plan(board),
            Stage::Enemies | Stage::Busy => {}
        }
    }

    pub(crate) fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            panels: &mut self.panels,
            question: &mut self.quiz,
            selection: &mut self.autopilot,
            commands: &mut self.commands,
            combat: &mut self.combat,
            shield: &mut self.shield,
            messages: &mut self.messages,
            score: &mut self.score,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConsolePanels {
    current: Option<Panel>,
}

impl PanelSurface for ConsolePanels {
    fn show(&mut self, panel: Panel) {
        if self.current != Some(panel) {
            log::trace!("panel {panel:?} shown");
            self.current = Some(panel);
        }
    }

    fn hide_all(&mut self) {
        self.current = None;
    }
}

/// Answers questions correctly with a fixed probability.
#[derive(Debug)]
pub(crate) struct ScriptedQuiz {
    rng: ChaCha8Rng,
    accuracy: f64,
    state: AnswerState,
    asked: u32,
}

impl ScriptedQuiz {
    fn new(seed: u64, accuracy: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            accuracy: accuracy.clamp(0.0, 1.0),
            state: AnswerState::Pending,
            asked: 0,
        }
    }

    fn think(&mut self) {
        if matches!(self.state, AnswerState::Pending | AnswerState::Suspended) {
            self.asked += 1;
            self.state = if self.rng.gen_bool(self.accuracy) {
                AnswerState::Right
            } else {
                AnswerState::Wrong
            };
            log::debug!("question {} answered: {:?}", self.asked, self.state);
        }
    }
}

impl QuestionSurface for ScriptedQuiz {
    fn answer_state(&self) -> AnswerState {
        self.state
    }

    fn set_answer_state(&mut self, state: AnswerState) {
        self.state = state;
    }
}

/// Picks the player's action: shield when weak, attack when in reach,
/// otherwise close in on the nearest enemy.
#[derive(Debug)]
pub(crate) struct Autopilot {
    pathfinder: PathFinder,
    reach: RangeRule,
    origin: Option<CellCoord>,
    result: Option<SelectionOutcome>,
}

impl Autopilot {
    fn new(battle: &BattleConfig) -> Self {
        Self {
            pathfinder: PathFinder::new(battle.path_policy),
            reach: battle.attack_range,
            origin: None,
            result: None,
        }
    }

    fn plan(&mut self, board: &Board) {
        if self.result.is_some() {
            return;
        }

        let player = query::player(board);
        let Some(origin) = player.cell else {
            return;
        };
        self.origin = Some(origin);

        if player.energy <= LOW_ENERGY && !player.shielded {
            self.result = Some(SelectionOutcome::Shield);
            return;
        }

        let target = query::enemies_in_range(board, self.reach)
            .first()
            .and_then(|enemy| query::ship(board, *enemy))
            .and_then(|enemy| enemy.cell);
        if let Some(target) = target {
            self.result = Some(SelectionOutcome::Attack(target));
            return;
        }

        self.result = Some(match self.approach(board, origin) {
            Some(cell) => SelectionOutcome::Move(cell),
            None => SelectionOutcome::Shield,
        });
    }

    fn approach(&self, board: &Board, origin: CellCoord) -> Option<CellCoord> {
        let nearest = query::ships(board)
            .into_iter()
            .filter(|ship| ship.faction == Faction::Enemy)
            .filter_map(|ship| ship.cell)
            .min_by_key(|cell| origin.manhattan_distance(*cell))?;

        adjacent(nearest)
            .filter(|cell| query::is_empty(board, *cell))
            .map(|cell| self.pathfinder.find_path(board, origin, cell))
            .filter(|path| !path.is_empty())
            .min_by_key(|path| path.len())
            .and_then(|path| path.steps().take(STRIDE).last())
    }
}

fn adjacent(cell: CellCoord) -> impl Iterator<Item = CellCoord> {
    [(0, -1), (1, 0), (0, 1), (-1, 0)]
        .into_iter()
        .filter_map(move |(dx, dy)| {
            Some(CellCoord::new(
                cell.column().checked_add_signed(dx)?,
                cell.row().checked_add_signed(dy)?,
            ))
        })
}

impl SelectionSurface for Autopilot {
    fn final_result(&self) -> Option<SelectionOutcome> {
        self.result
    }

    fn reset_final_result(&mut self) {
        self.result = None;
    }

    fn update_selection_ui(&mut self) {
        self.origin = None;
    }

    fn map_selection_index(&self, local_index: u32) -> Option<CellCoord> {
        if local_index >= WINDOW * WINDOW {
            return None;
        }
        let origin = self.origin?;
        let half = i32::try_from(WINDOW / 2).ok()?;
        let dx = i32::try_from(local_index % WINDOW).ok()? - half;
        let dy = i32::try_from(local_index / WINDOW).ok()? - half;
        Some(CellCoord::new(
            origin.column().checked_add_signed(dx)?,
            origin.row().checked_add_signed(dy)?,
        ))
    }

    fn describe_index(&self, local_index: u32) -> String {
        let letter = char::from_u32(u32::from('A') + local_index % WINDOW).unwrap_or('?');
        format!("{letter}{}", local_index / WINDOW + 1)
    }
}

/// Natural-language surface of a player who never speaks.
#[derive(Debug)]
pub(crate) struct SilentCommands;

impl CommandSurface for SilentCommands {
    fn is_session_running(&self) -> bool {
        false
    }

    fn final_result(&self) -> Option<CommandOutcome> {
        None
    }

    fn reset_final_result(&mut self) {}
}

/// Plays each attack for a few ticks; shields halve the damage.
#[derive(Debug, Default)]
pub(crate) struct DelayedCombat {
    in_flight: Option<(u32, u32)>,
}

impl CombatResolver for DelayedCombat {
    fn begin(&mut self, attacker: ShipSnapshot, defender: ShipSnapshot) {
        let base = match attacker.faction {
            Faction::Player => PLAYER_DAMAGE,
            Faction::Enemy => ENEMY_DAMAGE,
        };
        let damage = if defender.shielded {
            base.div_ceil(2)
        } else {
            base
        };
        log::debug!("{} fires on {} for {damage}", attacker.id, defender.id);
        self.in_flight = Some((PLAYBACK_TICKS, damage));
    }

    fn poll(&mut self) -> Option<AttackReport> {
        let (remaining, damage) = self.in_flight.as_mut()?;
        if *remaining > 0 {
            *remaining -= 1;
            return None;
        }
        let damage = *damage;
        self.in_flight = None;
        Some(AttackReport { damage })
    }

    fn abandon(&mut self) {
        self.in_flight = None;
    }
}

#[derive(Debug, Default)]
pub(crate) struct ShieldLog;

impl ShieldControl for ShieldLog {
    fn take_toggle_request(&mut self) -> bool {
        false
    }

    fn shield_toggled(&mut self, ship: ShipId, raised: bool) {
        log::info!(
            "ship {ship} {} its shield",
            if raised { "raises" } else { "lowers" }
        );
    }
}

/// Prints messages and dismisses them on the following tick.
#[derive(Debug, Default)]
pub(crate) struct ConsoleMessages {
    open: bool,
}

impl MessageSurface for ConsoleMessages {
    fn show_message(&mut self, text: &str) {
        println!("  ! {text}");
        self.open = true;
    }

    fn take_dismissal(&mut self) -> bool {
        std::mem::take(&mut self.open)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Scoreboard {
    correct_answers: u32,
    final_energies: Vec<u32>,
}

impl Scoreboard {
    pub(crate) fn total(&self) -> u32 {
        let energy: u32 = self.final_energies.iter().sum();
        self.correct_answers * POINTS_PER_ANSWER + energy
    }
}

impl ScoreKeeper for Scoreboard {
    fn record_outcome(&mut self, final_energy: u32) {
        self.final_energies.push(final_energy);
    }

    fn increment_on_correct_answer(&mut self) {
        self.correct_answers += 1;
    }
}

#[derive(Debug, Default)]
pub(crate) struct SceneLog {
    loads: u32,
}

impl SceneLog {
    pub(crate) fn loads(&self) -> u32 {
        self.loads
    }
}

impl SceneControl for SceneLog {
    fn load_level(&mut self, index: usize) {
        log::info!("loading level {}", index + 1);
        self.loads += 1;
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn controller that drives a battle one tick at a time.
//!
//! A battle cycles through `Question`, `Player` and `Enemies`. Whenever work is
//! in flight (a stage delay, a player action, the enemy volley, a command
//! session or a modal message) the controller sits in `Busy` and refuses new
//! input, which keeps at most one action running at any time.

use std::{collections::VecDeque, time::Duration};

use trivia_fleet_core::{
    AnswerState, BattleConfig, BattleOutcome, CellCoord, CombatResolver, CommandIntent,
    CommandSurface, Event, MessageSurface, Panel, PanelSurface, QuestionSurface, ScoreKeeper,
    SelectionOutcome, SelectionSurface, ShieldControl, ShipId, Stage,
};
use trivia_fleet_system_actions::{
    decay_energy, ActionHosts, ActionProgress, ActionRequest, ActionResolver, RunningAction,
};
use trivia_fleet_world::{query, Board};

/// Inputs that move the stage machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageSignal {
    /// The trivia question was answered.
    Answered,
    /// The player committed to an action or opened a command session.
    ActionStarted,
    /// The enemy volley began.
    VolleyStarted,
    /// The post-answer delay elapsed.
    AnswerSettled {
        /// Whether the answer was correct.
        correct: bool,
    },
    /// The player's action finished.
    PlayerActionFinished,
    /// Every enemy finished its attack.
    VolleyFinished,
    /// Player input was rejected and the player may choose again.
    InputRejected,
}

/// Computes the stage that follows `stage` when `signal` arrives.
///
/// Signals that do not apply to the current stage leave it unchanged.
#[must_use]
pub fn transition(stage: Stage, signal: StageSignal) -> Stage {
    match (stage, signal) {
        (Stage::Question, StageSignal::Answered)
        | (Stage::Player, StageSignal::ActionStarted)
        | (Stage::Enemies, StageSignal::VolleyStarted) => Stage::Busy,
        (Stage::Busy, StageSignal::AnswerSettled { correct: true })
        | (Stage::Busy, StageSignal::InputRejected) => Stage::Player,
        (Stage::Busy, StageSignal::AnswerSettled { correct: false })
        | (Stage::Busy, StageSignal::PlayerActionFinished) => Stage::Enemies,
        (Stage::Busy, StageSignal::VolleyFinished) => Stage::Question,
        (stage, _) => stage,
    }
}

/// Whether the battle still runs after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleStatus {
    /// Keep ticking.
    InProgress,
    /// The battle ended with the provided outcome.
    Finished(BattleOutcome),
}

/// Host collaborators the controller talks to during a tick.
pub struct Collaborators<'a> {
    /// Overlay panels.
    pub panels: &'a mut dyn PanelSurface,
    /// Trivia question surface.
    pub question: &'a mut dyn QuestionSurface,
    /// Grid selection surface.
    pub selection: &'a mut dyn SelectionSurface,
    /// Natural-language command surface.
    pub commands: &'a mut dyn CommandSurface,
    /// Combat playback.
    pub combat: &'a mut dyn CombatResolver,
    /// Shield button and presentation.
    pub shield: &'a mut dyn ShieldControl,
    /// Modal messages.
    pub messages: &'a mut dyn MessageSurface,
    /// Score bookkeeping.
    pub score: &'a mut dyn ScoreKeeper,
}

impl Collaborators<'_> {
    fn action_hosts(&mut self) -> ActionHosts<'_> {
        ActionHosts {
            combat: &mut *self.combat,
            shield: &mut *self.shield,
        }
    }
}

#[derive(Debug)]
enum Pending {
    Settle { remaining: Duration, correct: bool },
    PlayerAction(RunningAction),
    Volley(Volley),
    CommandSession,
    Message,
}

#[derive(Debug)]
struct Volley {
    queue: VecDeque<ShipId>,
    current: Option<RunningAction>,
    idle: Option<Duration>,
}

/// Drives the stage machine of one battle.
#[derive(Debug)]
pub struct TurnController {
    config: BattleConfig,
    resolver: ActionResolver,
    stage: Stage,
    pending: Option<Pending>,
    outcome: Option<BattleOutcome>,
}

impl TurnController {
    /// Creates a controller that opens with a trivia question.
    #[must_use]
    pub fn new(config: BattleConfig) -> Self {
        Self {
            resolver: ActionResolver::new(&config),
            config,
            stage: Stage::Question,
            pending: None,
            outcome: None,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Terminal outcome, once the battle has ended and the score was told.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Configuration the controller runs with.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Advances the battle by `dt` of simulated time.
    pub fn tick(
        &mut self,
        dt: Duration,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> BattleStatus {
        if let Some(outcome) = self.outcome {
            return BattleStatus::Finished(outcome);
        }

        let player = query::player(board);
        if !player.is_alive() {
            return self.finish(BattleOutcome::Lost, player.energy, hosts, out);
        }
        if !query::enemies_remain(board) {
            return self.finish(BattleOutcome::Won, player.energy, hosts, out);
        }

        match self.stage {
            Stage::Question => self.ask(hosts, out),
            Stage::Player => self.take_player_turn(board, hosts, out),
            Stage::Enemies => self.open_volley(board, out),
            Stage::Busy => self.resolve_pending(dt, board, hosts, out),
        }

        BattleStatus::InProgress
    }

    fn finish(
        &mut self,
        outcome: BattleOutcome,
        final_energy: u32,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> BattleStatus {
        self.outcome = Some(outcome);
        self.pending = None;
        hosts.panels.hide_all();
        hosts.score.record_outcome(final_energy);
        log::info!("battle ended: {outcome:?} with {final_energy} energy left");
        out.push(Event::BattleEnded {
            outcome,
            final_energy,
        });
        BattleStatus::Finished(outcome)
    }

    fn ask(&mut self, hosts: &mut Collaborators<'_>, out: &mut Vec<Event>) {
        hosts.panels.show(Panel::Question);

        let correct = match hosts.question.answer_state() {
            AnswerState::Right => true,
            AnswerState::Wrong => false,
            AnswerState::Pending | AnswerState::Suspended => return,
        };

        hosts.question.set_answer_state(AnswerState::Suspended);
        if correct {
            hosts.score.increment_on_correct_answer();
        }

        self.begin(
            Pending::Settle {
                remaining: self.config.stage_delay(),
                correct,
            },
            StageSignal::Answered,
            out,
        );
    }

    fn take_player_turn(
        &mut self,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) {
        hosts.panels.show(Panel::Selection);

        if hosts.commands.is_session_running() {
            log::debug!("command session opened");
            self.begin(Pending::CommandSession, StageSignal::ActionStarted, out);
            return;
        }

        if hosts.shield.take_toggle_request() {
            self.start_player_action(ActionRequest::Shield { ship: ShipId::PLAYER }, board, hosts, out);
            return;
        }

        let selection = hosts.selection.final_result();
        hosts.selection.reset_final_result();

        let request = match selection {
            None | Some(SelectionOutcome::None) => return,
            Some(SelectionOutcome::Move(destination)) => ActionRequest::Move {
                ship: ShipId::PLAYER,
                destination,
            },
            Some(SelectionOutcome::Attack(cell)) => match enemy_at(board, cell) {
                Some(defender) => ActionRequest::Attack {
                    attacker: ShipId::PLAYER,
                    defender,
                },
                None => {
                    log::warn!("ignoring attack on {cell}: no enemy there");
                    return;
                }
            },
            Some(SelectionOutcome::Shield) => ActionRequest::Shield { ship: ShipId::PLAYER },
        };

        self.start_player_action(request, board, hosts, out);
    }

    fn start_player_action(
        &mut self,
        request: ActionRequest,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) {
        let action = self
            .resolver
            .start(request, board, &mut hosts.action_hosts(), out);
        self.begin(Pending::PlayerAction(action), StageSignal::ActionStarted, out);
    }

    fn open_volley(&mut self, board: &Board, out: &mut Vec<Event>) {
        let queue: VecDeque<ShipId> =
            query::enemies_in_range(board, self.config.attack_range).into();
        let idle = queue.is_empty().then(|| self.config.idle_enemy_phase());
        log::debug!("enemy volley with {} attackers", queue.len());

        self.begin(
            Pending::Volley(Volley {
                queue,
                current: None,
                idle,
            }),
            StageSignal::VolleyStarted,
            out,
        );
    }

    fn resolve_pending(
        &mut self,
        dt: Duration,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) {
        if let Some(stray) = hosts.selection.final_result() {
            log::debug!("discarding selection {stray:?} while busy");
            hosts.selection.reset_final_result();
        }

        let Some(pending) = self.pending.take() else {
            log::warn!("busy stage without pending work");
            return;
        };

        self.pending = match pending {
            Pending::Settle { remaining, correct } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    if correct {
                        hosts.panels.show(Panel::Selection);
                    } else {
                        hosts.panels.hide_all();
                    }
                    self.signal(StageSignal::AnswerSettled { correct }, out);
                    None
                } else {
                    Some(Pending::Settle { remaining, correct })
                }
            }
            Pending::PlayerAction(mut action) => {
                match action.advance(dt, board, &mut hosts.action_hosts(), out) {
                    ActionProgress::Running => Some(Pending::PlayerAction(action)),
                    ActionProgress::Complete => {
                        self.signal(StageSignal::PlayerActionFinished, out);
                        hosts.selection.update_selection_ui();
                        None
                    }
                }
            }
            Pending::Volley(mut volley) => {
                match self.advance_volley(&mut volley, dt, board, hosts, out) {
                    ActionProgress::Running => Some(Pending::Volley(volley)),
                    ActionProgress::Complete => {
                        decay_energy(
                            board,
                            ShipId::PLAYER,
                            self.config.energy_decay_per_turn,
                            out,
                        );
                        self.signal(StageSignal::VolleyFinished, out);
                        hosts.selection.update_selection_ui();
                        None
                    }
                }
            }
            Pending::CommandSession => self.resolve_command(board, hosts, out),
            Pending::Message => {
                if hosts.messages.take_dismissal() {
                    self.signal(StageSignal::InputRejected, out);
                    None
                } else {
                    Some(Pending::Message)
                }
            }
        };
    }

    fn advance_volley(
        &self,
        volley: &mut Volley,
        dt: Duration,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> ActionProgress {
        if let Some(action) = volley.current.as_mut() {
            if action.advance(dt, board, &mut hosts.action_hosts(), out) == ActionProgress::Running {
                return ActionProgress::Running;
            }
            volley.current = None;
        }

        if let Some(remaining) = volley.idle {
            let remaining = remaining.saturating_sub(dt);
            volley.idle = Some(remaining);
            return if remaining.is_zero() {
                ActionProgress::Complete
            } else {
                ActionProgress::Running
            };
        }

        while let Some(attacker) = volley.queue.pop_front() {
            if !query::player(board).is_alive() {
                break;
            }
            if !query::ship(board, attacker).is_some_and(|ship| ship.is_alive()) {
                continue;
            }

            let action = self.resolver.start(
                ActionRequest::Attack {
                    attacker,
                    defender: ShipId::PLAYER,
                },
                board,
                &mut hosts.action_hosts(),
                out,
            );
            if !action.is_complete() {
                volley.current = Some(action);
                return ActionProgress::Running;
            }
        }

        ActionProgress::Complete
    }

    fn resolve_command(
        &mut self,
        board: &mut Board,
        hosts: &mut Collaborators<'_>,
        out: &mut Vec<Event>,
    ) -> Option<Pending> {
        if hosts.commands.is_session_running() {
            return Some(Pending::CommandSession);
        }

        let result = hosts.commands.final_result();
        hosts.commands.reset_final_result();
        let Some(command) = result else {
            log::info!("command session closed without a result");
            self.signal(StageSignal::InputRejected, out);
            return None;
        };

        let target = hosts.selection.map_selection_index(command.selection_index);
        let request = match command.intent {
            CommandIntent::Attack => match target.and_then(|cell| enemy_at(board, cell)) {
                Some(defender) => ActionRequest::Attack {
                    attacker: ShipId::PLAYER,
                    defender,
                },
                None => {
                    let name = hosts.selection.describe_index(command.selection_index);
                    return Some(reject(&format!("Nothing to be attacked on {name}"), hosts));
                }
            },
            CommandIntent::Move => match target.filter(|cell| query::is_empty(board, *cell)) {
                Some(destination) => ActionRequest::Move {
                    ship: ShipId::PLAYER,
                    destination,
                },
                None => {
                    let name = hosts.selection.describe_index(command.selection_index);
                    return Some(reject(&format!("You can't move to {name}"), hosts));
                }
            },
            CommandIntent::Shield => ActionRequest::Shield { ship: ShipId::PLAYER },
            CommandIntent::Fail => return Some(reject(&command.fail_message, hosts)),
        };

        let action = self
            .resolver
            .start(request, board, &mut hosts.action_hosts(), out);
        Some(Pending::PlayerAction(action))
    }

    fn begin(&mut self, pending: Pending, signal: StageSignal, out: &mut Vec<Event>) {
        self.pending = Some(pending);
        self.signal(signal, out);
    }

    fn signal(&mut self, signal: StageSignal, out: &mut Vec<Event>) {
        let next = transition(self.stage, signal);
        if next != self.stage {
            log::debug!("stage {:?} -> {next:?}", self.stage);
            out.push(Event::StageChanged {
                from: self.stage,
                to: next,
            });
            self.stage = next;
        }
    }
}

fn enemy_at(board: &Board, cell: CellCoord) -> Option<ShipId> {
    if query::is_enemy(board, cell) {
        query::ship_at(board, cell)
    } else {
        None
    }
}

fn reject(text: &str, hosts: &mut Collaborators<'_>) -> Pending {
    log::info!("command rejected: {text}");
    hosts.messages.show_message(text);
    hosts.panels.show(Panel::Message);
    Pending::Message
}

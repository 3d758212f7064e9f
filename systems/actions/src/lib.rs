#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Step-wise execution of a single ship action.
//!
//! An action (move, attack, or shield toggle) is started with
//! [`ActionResolver::start`] and then advanced once per tick through
//! [`RunningAction::advance`] until it reports [`ActionProgress::Complete`].
//! Suspension points are explicit steps: animation frames while moving, the
//! wind-up before a player attack, the wait for the combat resolver, and the
//! settle delay after a shield toggle. Board mutations happen only at the end
//! of the step they belong to.

use std::time::Duration;

use trivia_fleet_core::{
    BattleConfig, CellCoord, CombatResolver, Direction, Event, Path, ShieldControl, ShipId,
};
use trivia_fleet_world::{navigation::PathFinder, query, Board};

/// Collaborators an action may talk to while it runs.
pub struct ActionHosts<'a> {
    /// Combat playback that decides attack damage.
    pub combat: &'a mut dyn CombatResolver,
    /// Shield presentation.
    pub shield: &'a mut dyn ShieldControl,
}

/// Action requested by the turn controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionRequest {
    /// Travel to `destination` along the shortest route.
    Move {
        /// Ship that moves.
        ship: ShipId,
        /// Cell to travel to.
        destination: CellCoord,
    },
    /// Attack `defender`. Attacks issued by the player wind up first.
    Attack {
        /// Attacking ship.
        attacker: ShipId,
        /// Targeted ship.
        defender: ShipId,
    },
    /// Toggle the shield of `ship`.
    Shield {
        /// Ship whose shield flips.
        ship: ShipId,
    },
}

/// Whether an action still needs ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionProgress {
    /// The action suspended and must be advanced again.
    Running,
    /// The action finished.
    Complete,
}

#[derive(Clone, Copy, Debug)]
struct ActionTiming {
    frames_per_move: u32,
    energy_decay_per_turn: u32,
    attack_windup: Duration,
    shield_delay: Duration,
    attack_timeout: Option<Duration>,
}

/// Starts actions using the battle configuration.
#[derive(Clone, Debug)]
pub struct ActionResolver {
    timing: ActionTiming,
    pathfinder: PathFinder,
}

impl ActionResolver {
    /// Creates a resolver that follows `config`.
    #[must_use]
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            timing: ActionTiming {
                frames_per_move: config.frames_per_move.max(1),
                energy_decay_per_turn: config.energy_decay_per_turn,
                attack_windup: config.attack_windup(),
                shield_delay: config.shield_delay(),
                attack_timeout: config.attack_timeout(),
            },
            pathfinder: PathFinder::new(config.path_policy),
        }
    }

    /// Pathfinder used for move actions.
    #[must_use]
    pub fn pathfinder(&self) -> PathFinder {
        self.pathfinder
    }

    /// Starts an action.
    ///
    /// Work that happens at the very beginning (computing a path, toggling a
    /// shield, handing an enemy attack to the combat resolver) is done here;
    /// everything else waits for [`RunningAction::advance`].
    pub fn start(
        &self,
        request: ActionRequest,
        board: &mut Board,
        hosts: &mut ActionHosts<'_>,
        out: &mut Vec<Event>,
    ) -> RunningAction {
        let step = match request {
            ActionRequest::Move { ship, destination } => {
                self.start_move(ship, destination, board, out)
            }
            ActionRequest::Attack { attacker, defender } => {
                if attacker == ShipId::PLAYER && !self.timing.attack_windup.is_zero() {
                    ActionStep::WindingUp {
                        attacker,
                        defender,
                        remaining: self.timing.attack_windup,
                    }
                } else {
                    launch_attack(attacker, defender, board, hosts, out)
                }
            }
            ActionRequest::Shield { ship } => match board.toggle_shield(ship) {
                Some(raised) => {
                    hosts.shield.shield_toggled(ship, raised);
                    out.push(Event::ShieldToggled { ship, raised });
                    ActionStep::Settling {
                        remaining: self.timing.shield_delay,
                    }
                }
                None => {
                    log::warn!("ship {ship} cannot toggle its shield");
                    ActionStep::Finished
                }
            },
        };

        RunningAction {
            request,
            timing: self.timing,
            step,
        }
    }

    fn start_move(
        &self,
        ship: ShipId,
        destination: CellCoord,
        board: &Board,
        out: &mut Vec<Event>,
    ) -> ActionStep {
        let start = query::ship(board, ship).and_then(|snapshot| snapshot.cell);
        let path = match start {
            Some(start) => self.pathfinder.find_path(board, start, destination),
            None => Path::empty(),
        };

        if path.is_empty() {
            log::info!("ship {ship} has no route to {destination}");
        } else {
            log::debug!("ship {ship} sets course for {destination} over {} cells", path.len());
        }

        out.push(Event::MoveStarted {
            ship,
            steps: path.len(),
        });

        ActionStep::Walking {
            ship,
            path,
            segment: None,
        }
    }
}

/// An action in flight.
#[derive(Debug)]
pub struct RunningAction {
    request: ActionRequest,
    timing: ActionTiming,
    step: ActionStep,
}

#[derive(Debug)]
enum ActionStep {
    Walking {
        ship: ShipId,
        path: Path,
        segment: Option<Segment>,
    },
    WindingUp {
        attacker: ShipId,
        defender: ShipId,
        remaining: Duration,
    },
    Striking {
        attacker: ShipId,
        defender: ShipId,
        waited: Duration,
    },
    Settling {
        remaining: Duration,
    },
    Finished,
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    to: CellCoord,
    direction: Direction,
    frame: u32,
}

impl RunningAction {
    /// Request that started the action.
    #[must_use]
    pub fn request(&self) -> ActionRequest {
        self.request
    }

    /// Reports whether the action has nothing left to do.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.step, ActionStep::Finished)
    }

    /// Advances the action by one tick of `dt` simulated time.
    pub fn advance(
        &mut self,
        dt: Duration,
        board: &mut Board,
        hosts: &mut ActionHosts<'_>,
        out: &mut Vec<Event>,
    ) -> ActionProgress {
        let timing = self.timing;
        let next = match &mut self.step {
            ActionStep::Finished => return ActionProgress::Complete,
            ActionStep::Walking {
                ship,
                path,
                segment,
            } => walk(*ship, path, segment, timing, board, out),
            ActionStep::WindingUp {
                attacker,
                defender,
                remaining,
            } => {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    Some(launch_attack(*attacker, *defender, board, hosts, out))
                } else {
                    None
                }
            }
            ActionStep::Striking {
                attacker,
                defender,
                waited,
            } => strike(*attacker, *defender, waited, dt, timing, board, hosts, out),
            ActionStep::Settling { remaining } => {
                *remaining = remaining.saturating_sub(dt);
                remaining.is_zero().then_some(ActionStep::Finished)
            }
        };

        if let Some(step) = next {
            self.step = step;
        }

        if self.is_complete() {
            ActionProgress::Complete
        } else {
            ActionProgress::Running
        }
    }
}

/// Applies the end-of-turn energy decay to `ship`.
///
/// Emits [`Event::EnergyDecayed`], plus [`Event::ShipDestroyed`] when the decay
/// used up the ship's last energy.
pub fn decay_energy(board: &mut Board, ship: ShipId, amount: u32, out: &mut Vec<Event>) {
    if let Some(remaining) = drain(board, ship, amount, out) {
        out.push(Event::EnergyDecayed { ship, remaining });
    }
}

fn drain(board: &mut Board, ship: ShipId, amount: u32, out: &mut Vec<Event>) -> Option<u32> {
    let change = board.drain_energy(ship, amount)?;
    if let Some(cell) = change.destroyed_at {
        log::info!("ship {ship} destroyed at {cell}");
        out.push(Event::ShipDestroyed { ship, cell });
    }
    Some(change.remaining)
}

fn walk(
    ship: ShipId,
    path: &mut Path,
    segment: &mut Option<Segment>,
    timing: ActionTiming,
    board: &mut Board,
    out: &mut Vec<Event>,
) -> Option<ActionStep> {
    if segment.is_none() {
        let Some(next) = path.pop_next() else {
            return Some(finish_move(ship, timing, board, out));
        };

        let current = query::ship(board, ship).and_then(|snapshot| snapshot.cell);
        let Some(direction) = current.and_then(|cell| cell.direction_to(next)) else {
            log::warn!("ship {ship} cannot step onto {next}; abandoning route");
            path.clear();
            return Some(finish_move(ship, timing, board, out));
        };

        *segment = Some(Segment {
            to: next,
            direction,
            frame: 0,
        });
    }

    let active = segment.as_mut()?;
    active.frame += 1;
    out.push(Event::ShipNudged {
        ship,
        direction: active.direction,
        frame: active.frame,
        frames: timing.frames_per_move,
    });

    if active.frame < timing.frames_per_move {
        return None;
    }

    let to = active.to;
    *segment = None;
    let from = query::ship(board, ship).and_then(|snapshot| snapshot.cell);

    match (from, board.move_ship(ship, to)) {
        (Some(from), Ok(())) => out.push(Event::ShipAdvanced { ship, from, to }),
        (_, Ok(())) => {}
        (_, Err(error)) => {
            log::warn!("ship {ship} stopped short: {error}");
            path.clear();
        }
    }

    if path.is_empty() {
        Some(finish_move(ship, timing, board, out))
    } else {
        None
    }
}

fn finish_move(
    ship: ShipId,
    timing: ActionTiming,
    board: &mut Board,
    out: &mut Vec<Event>,
) -> ActionStep {
    decay_energy(board, ship, timing.energy_decay_per_turn, out);
    let cell = query::ship(board, ship).and_then(|snapshot| snapshot.cell);
    out.push(Event::MoveFinished { ship, cell });
    ActionStep::Finished
}

fn launch_attack(
    attacker: ShipId,
    defender: ShipId,
    board: &Board,
    hosts: &mut ActionHosts<'_>,
    out: &mut Vec<Event>,
) -> ActionStep {
    let attacking = query::ship(board, attacker).filter(|ship| ship.is_alive());
    let defending = query::ship(board, defender).filter(|ship| ship.is_alive());

    let (Some(attacking), Some(defending)) = (attacking, defending) else {
        log::warn!("attack from {attacker} on {defender} dropped: a ship is gone");
        return ActionStep::Finished;
    };

    hosts.combat.begin(attacking, defending);
    out.push(Event::AttackLaunched { attacker, defender });

    ActionStep::Striking {
        attacker,
        defender,
        waited: Duration::ZERO,
    }
}

#[allow(clippy::too_many_arguments)]
fn strike(
    attacker: ShipId,
    defender: ShipId,
    waited: &mut Duration,
    dt: Duration,
    timing: ActionTiming,
    board: &mut Board,
    hosts: &mut ActionHosts<'_>,
    out: &mut Vec<Event>,
) -> Option<ActionStep> {
    if let Some(report) = hosts.combat.poll() {
        let remaining = drain(board, defender, report.damage, out).unwrap_or(0);
        out.push(Event::AttackResolved {
            attacker,
            defender,
            damage: report.damage,
            remaining,
        });
        return Some(ActionStep::Finished);
    }

    *waited = waited.saturating_add(dt);
    match timing.attack_timeout {
        Some(timeout) if *waited >= timeout => {
            log::warn!("attack from {attacker} on {defender} timed out after {waited:?}");
            hosts.combat.abandon();
            out.push(Event::AttackTimedOut { attacker, defender });
            Some(ActionStep::Finished)
        }
        _ => None,
    }
}

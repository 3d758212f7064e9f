use std::time::Duration;

use trivia_fleet_core::{
    AttackReport, BattleConfig, CellCoord, CombatResolver, Event, LevelLayout, ShieldControl,
    ShipId, ShipSnapshot, ShipSpec,
};
use trivia_fleet_system_actions::{
    decay_energy, ActionHosts, ActionProgress, ActionRequest, ActionResolver, RunningAction,
};
use trivia_fleet_world::{query, Board};

const TICK: Duration = Duration::from_millis(100);

#[derive(Default)]
struct ScriptedCombat {
    damage: u32,
    silent: bool,
    in_flight: bool,
    begun: Vec<(ShipSnapshot, ShipSnapshot)>,
    abandoned: u32,
}

impl CombatResolver for ScriptedCombat {
    fn begin(&mut self, attacker: ShipSnapshot, defender: ShipSnapshot) {
        assert!(!self.in_flight, "second attack started while one is in flight");
        self.in_flight = true;
        self.begun.push((attacker, defender));
    }

    fn poll(&mut self) -> Option<AttackReport> {
        if !self.in_flight || self.silent {
            return None;
        }
        self.in_flight = false;
        Some(AttackReport {
            damage: self.damage,
        })
    }

    fn abandon(&mut self) {
        self.in_flight = false;
        self.abandoned += 1;
    }
}

#[derive(Default)]
struct RecordingShield {
    toggles: Vec<(ShipId, bool)>,
}

impl ShieldControl for RecordingShield {
    fn take_toggle_request(&mut self) -> bool {
        false
    }

    fn shield_toggled(&mut self, ship: ShipId, raised: bool) {
        self.toggles.push((ship, raised));
    }
}

struct Harness {
    board: Board,
    resolver: ActionResolver,
    combat: ScriptedCombat,
    shield: RecordingShield,
    events: Vec<Event>,
}

impl Harness {
    fn new(config: BattleConfig, walls: Vec<CellCoord>, enemies: Vec<(CellCoord, u32)>) -> Self {
        let layout = LevelLayout {
            name: "drill".to_owned(),
            columns: 5,
            rows: 5,
            walls,
            player: ShipSpec {
                cell: CellCoord::new(0, 0),
                energy: 10,
            },
            enemies: enemies
                .into_iter()
                .map(|(cell, energy)| ShipSpec { cell, energy })
                .collect(),
        };

        Self {
            board: Board::from_layout(&layout).expect("layout is valid"),
            resolver: ActionResolver::new(&config),
            combat: ScriptedCombat::default(),
            shield: RecordingShield::default(),
            events: Vec::new(),
        }
    }

    fn start(&mut self, request: ActionRequest) -> RunningAction {
        let mut hosts = ActionHosts {
            combat: &mut self.combat,
            shield: &mut self.shield,
        };
        self.resolver
            .start(request, &mut self.board, &mut hosts, &mut self.events)
    }

    fn advance(&mut self, action: &mut RunningAction) -> ActionProgress {
        let mut hosts = ActionHosts {
            combat: &mut self.combat,
            shield: &mut self.shield,
        };
        let progress = action.advance(TICK, &mut self.board, &mut hosts, &mut self.events);
        assert!(
            query::occupancy_consistent(&self.board),
            "occupancy drifted from the roster"
        );
        progress
    }

    fn run_to_completion(&mut self, action: &mut RunningAction, limit: usize) -> usize {
        for tick in 1..=limit {
            if self.advance(action) == ActionProgress::Complete {
                return tick;
            }
        }
        panic!("action did not complete within {limit} ticks");
    }
}

fn enemy() -> ShipId {
    ShipId::new(1)
}

#[test]
fn move_plays_every_frame_before_committing_each_cell() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(4, 4), 3)],
    );
    let mut action = harness.start(ActionRequest::Move {
        ship: ShipId::PLAYER,
        destination: CellCoord::new(0, 3),
    });
    assert!(harness
        .events
        .contains(&Event::MoveStarted {
            ship: ShipId::PLAYER,
            steps: 3
        }));

    for _ in 0..9 {
        assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    }
    assert_eq!(
        query::ship_at(&harness.board, CellCoord::new(0, 0)),
        Some(ShipId::PLAYER),
        "ship left its cell before the last frame"
    );

    assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    assert_eq!(
        query::ship_at(&harness.board, CellCoord::new(0, 1)),
        Some(ShipId::PLAYER)
    );

    let remaining = harness.run_to_completion(&mut action, 100);
    assert_eq!(remaining, 20);

    let nudges = harness
        .events
        .iter()
        .filter(|event| matches!(event, Event::ShipNudged { .. }))
        .count();
    assert_eq!(nudges, 30);

    let advances: Vec<_> = harness
        .events
        .iter()
        .filter_map(|event| match event {
            Event::ShipAdvanced { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        advances,
        vec![
            CellCoord::new(0, 1),
            CellCoord::new(0, 2),
            CellCoord::new(0, 3)
        ]
    );

    let player = query::player(&harness.board);
    assert_eq!(player.cell, Some(CellCoord::new(0, 3)));
    assert_eq!(player.energy, 9, "the mover pays the turn's energy decay");
    assert_eq!(
        harness.events.last(),
        Some(&Event::MoveFinished {
            ship: ShipId::PLAYER,
            cell: Some(CellCoord::new(0, 3))
        })
    );
}

#[test]
fn unreachable_destination_completes_on_first_advance() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        vec![CellCoord::new(2, 2)],
        vec![(CellCoord::new(4, 4), 3)],
    );
    let mut action = harness.start(ActionRequest::Move {
        ship: ShipId::PLAYER,
        destination: CellCoord::new(2, 2),
    });

    assert_eq!(harness.advance(&mut action), ActionProgress::Complete);
    assert!(action.is_complete());

    let player = query::player(&harness.board);
    assert_eq!(player.cell, Some(CellCoord::new(0, 0)));
    assert_eq!(player.energy, 9);
}

#[test]
fn blocked_cell_mid_route_stops_the_move() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 2), 3)],
    );
    let mut action = harness.start(ActionRequest::Move {
        ship: ShipId::PLAYER,
        destination: CellCoord::new(0, 3),
    });

    harness
        .board
        .move_ship(enemy(), CellCoord::new(0, 2))
        .expect("enemy slides into the lane");

    let ticks = harness.run_to_completion(&mut action, 100);
    assert_eq!(ticks, 20);

    let player = query::player(&harness.board);
    assert_eq!(player.cell, Some(CellCoord::new(0, 1)));
    assert_eq!(
        query::ship_at(&harness.board, CellCoord::new(0, 2)),
        Some(enemy())
    );
}

#[test]
fn player_attack_winds_up_before_striking() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 1), 3)],
    );
    harness.combat.damage = 2;

    let mut action = harness.start(ActionRequest::Attack {
        attacker: ShipId::PLAYER,
        defender: enemy(),
    });
    assert!(harness.combat.begun.is_empty());

    for _ in 0..4 {
        assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    }
    assert!(harness.combat.begun.is_empty(), "wind-up ended early");

    assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    assert_eq!(harness.combat.begun.len(), 1);
    let (attacker, defender) = harness.combat.begun[0];
    assert_eq!(attacker.id, ShipId::PLAYER);
    assert_eq!(defender.id, enemy());

    assert_eq!(harness.advance(&mut action), ActionProgress::Complete);
    assert!(harness.events.contains(&Event::AttackResolved {
        attacker: ShipId::PLAYER,
        defender: enemy(),
        damage: 2,
        remaining: 1,
    }));
    assert_eq!(
        query::ship(&harness.board, enemy()).map(|ship| ship.energy),
        Some(1)
    );
}

#[test]
fn lethal_attack_clears_the_defender_cell() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 1), 3)],
    );
    harness.combat.damage = 5;

    let mut action = harness.start(ActionRequest::Attack {
        attacker: ShipId::PLAYER,
        defender: enemy(),
    });
    let _ = harness.run_to_completion(&mut action, 20);

    assert!(query::is_empty(&harness.board, CellCoord::new(1, 1)));
    assert!(!query::enemies_remain(&harness.board));
    assert!(harness.events.contains(&Event::ShipDestroyed {
        ship: enemy(),
        cell: CellCoord::new(1, 1),
    }));
}

#[test]
fn enemy_attack_starts_without_wind_up() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 1), 3)],
    );
    harness.combat.damage = 4;

    let mut action = harness.start(ActionRequest::Attack {
        attacker: enemy(),
        defender: ShipId::PLAYER,
    });
    assert_eq!(harness.combat.begun.len(), 1);

    assert_eq!(harness.advance(&mut action), ActionProgress::Complete);
    assert_eq!(query::player(&harness.board).energy, 6);
}

#[test]
fn shield_toggle_notifies_and_settles() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(4, 4), 3)],
    );

    let mut action = harness.start(ActionRequest::Shield {
        ship: ShipId::PLAYER,
    });
    assert!(query::player(&harness.board).shielded);
    assert_eq!(harness.shield.toggles, vec![(ShipId::PLAYER, true)]);

    let ticks = harness.run_to_completion(&mut action, 50);
    assert_eq!(ticks, 10);

    let mut second = harness.start(ActionRequest::Shield {
        ship: ShipId::PLAYER,
    });
    assert!(!query::player(&harness.board).shielded);
    let _ = harness.run_to_completion(&mut second, 50);
}

#[test]
fn silent_combat_times_out_without_damage() {
    let config = BattleConfig {
        attack_timeout_ms: Some(300),
        ..BattleConfig::default()
    };
    let mut harness = Harness::new(config, Vec::new(), vec![(CellCoord::new(1, 1), 3)]);
    harness.combat.silent = true;

    let mut action = harness.start(ActionRequest::Attack {
        attacker: enemy(),
        defender: ShipId::PLAYER,
    });

    assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    assert_eq!(harness.advance(&mut action), ActionProgress::Complete);

    assert_eq!(harness.combat.abandoned, 1);
    assert_eq!(query::player(&harness.board).energy, 10);
    assert!(harness.events.contains(&Event::AttackTimedOut {
        attacker: enemy(),
        defender: ShipId::PLAYER,
    }));
}

#[test]
fn disabled_timeout_waits_for_the_resolver() {
    let config = BattleConfig {
        attack_timeout_ms: None,
        ..BattleConfig::default()
    };
    let mut harness = Harness::new(config, Vec::new(), vec![(CellCoord::new(1, 1), 3)]);
    harness.combat.silent = true;

    let mut action = harness.start(ActionRequest::Attack {
        attacker: enemy(),
        defender: ShipId::PLAYER,
    });
    for _ in 0..500 {
        assert_eq!(harness.advance(&mut action), ActionProgress::Running);
    }

    harness.combat.silent = false;
    harness.combat.damage = 1;
    assert_eq!(harness.advance(&mut action), ActionProgress::Complete);
    assert_eq!(query::player(&harness.board).energy, 9);
}

#[test]
fn attack_on_destroyed_ship_is_dropped() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 1), 3), (CellCoord::new(3, 3), 3)],
    );
    let _ = harness.board.drain_energy(enemy(), 3);

    let action = harness.start(ActionRequest::Attack {
        attacker: enemy(),
        defender: ShipId::PLAYER,
    });

    assert!(action.is_complete());
    assert!(harness.combat.begun.is_empty());
}

#[test]
fn decay_reports_destruction_at_zero() {
    let mut harness = Harness::new(
        BattleConfig::default(),
        Vec::new(),
        vec![(CellCoord::new(1, 1), 1)],
    );

    decay_energy(&mut harness.board, enemy(), 1, &mut harness.events);

    assert_eq!(
        harness.events,
        vec![
            Event::ShipDestroyed {
                ship: enemy(),
                cell: CellCoord::new(1, 1)
            },
            Event::EnergyDecayed {
                ship: enemy(),
                remaining: 0
            },
        ]
    );
}

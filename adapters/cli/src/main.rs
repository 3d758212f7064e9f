#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver that plays a trivia fleet campaign with scripted players.

mod hosts;
mod level;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use trivia_fleet_core::{BattleOutcome, Event, Stage, WELCOME_BANNER};
use trivia_fleet_system_session::{LevelCursor, LevelRequest, Session};
use trivia_fleet_system_turns::BattleStatus;
use trivia_fleet_world::query;

use crate::hosts::Hosts;

#[derive(Parser, Debug)]
#[command(name = "trivia-fleet")]
#[command(about = "Plays a trivia fleet campaign with scripted players.", long_about = None)]
struct Cli {
    /// Campaign file to play instead of the built-in campaign.
    #[arg(short, long)]
    levels: Option<PathBuf>,

    /// Zero-based index of the first level to play.
    #[arg(long, default_value_t = 0)]
    start_level: usize,

    /// Seed for the scripted quiz.
    #[arg(short, long, default_value_t = 7)]
    seed: u64,

    /// Probability that a question is answered correctly.
    #[arg(short, long, default_value_t = 0.7)]
    accuracy: f64,

    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Ticks after which an unfinished level is abandoned.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Replays allowed after a lost level.
    #[arg(long, default_value_t = 2)]
    retries: u32,
}

struct LevelReport {
    outcome: BattleOutcome,
    ticks: u64,
    rounds: usize,
    final_energy: u32,
}

/// Entry point for the trivia fleet command-line interface.
fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let contents = match &cli.levels {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read campaign at {}", path.display()))?,
        None => level::DEFAULT_CAMPAIGN.to_owned(),
    };
    let campaign = level::parse_campaign(&contents)?;
    println!("{WELCOME_BANNER}");

    let mut cursor = LevelCursor::new(cli.start_level, campaign.levels.len())
        .context("campaign contains no levels")?;
    let mut hosts = Hosts::new(cli.seed, cli.accuracy, &campaign.battle);
    let mut retries_left = cli.retries;

    loop {
        let mut session = Session::start(&campaign.levels, cursor, campaign.battle.clone())
            .with_context(|| format!("failed to start level {}", cursor.current() + 1))?;
        let name = campaign
            .levels
            .get(cursor.current())
            .map_or("?", |layout| layout.name.as_str());

        let report = play(&mut session, &mut hosts, &cli)
            .with_context(|| format!("level `{name}` did not finish"))?;
        println!(
            "level {} `{name}`: {:?} after {} rounds ({} ticks), {} energy left",
            cursor.current() + 1,
            report.outcome,
            report.rounds,
            report.ticks,
            report.final_energy
        );

        let request = match report.outcome {
            BattleOutcome::Won if cursor.is_last() => break,
            BattleOutcome::Won => LevelRequest::Advance,
            BattleOutcome::Lost if retries_left == 0 => {
                println!("the fleet is out of retries");
                break;
            }
            BattleOutcome::Lost => {
                retries_left -= 1;
                LevelRequest::Restart
            }
        };
        cursor = session.conclude(request, &mut hosts.scenes)?;
    }

    println!(
        "final score: {} over {} level loads",
        hosts.score.total(),
        hosts.scenes.loads() + 1
    );
    Ok(())
}

fn play(session: &mut Session, hosts: &mut Hosts, cli: &Cli) -> Result<LevelReport> {
    let dt = Duration::from_millis(cli.tick_ms.max(1));
    let mut events = Vec::new();
    let mut rounds = 0;

    for tick in 1..=cli.max_ticks {
        hosts.prepare(session.controller().stage(), session.board());
        events.clear();
        let status = session.tick(dt, &mut hosts.collaborators(), &mut events);

        for event in &events {
            log::trace!("{event:?}");
            if let Event::StageChanged {
                to: Stage::Question,
                ..
            } = event
            {
                rounds += 1;
            }
        }

        if let BattleStatus::Finished(outcome) = status {
            return Ok(LevelReport {
                outcome,
                ticks: tick,
                rounds,
                final_energy: query::player(session.board()).energy,
            });
        }
    }

    bail!("no outcome within {} ticks", cli.max_ticks)
}

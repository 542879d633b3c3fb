//! Headless Skirmish Runner
//!
//! Plays a bot-vs-bot game over the in-process transport: the server runs on
//! the main thread and every player's client on its own thread. Prints the
//! outcome as JSON or text.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use serde::Serialize;

use hex_tactics::bot::NearestEnemyBot;
use hex_tactics::core::config::GameConfig;
use hex_tactics::core::constants::HEX_PIXEL_SIZE;
use hex_tactics::core::error::Result;
use hex_tactics::entity::creature::CreatureRegistry;
use hex_tactics::map::tile::TileRegistry;
use hex_tactics::net::{in_process, ClientPeer, PeerState, ServerPeer};
use hex_tactics::protocol::WinState;
use hex_tactics::scenario::Scenario;
use hex_tactics::state::GameState;

/// Headless Skirmish Runner - bot vs bot games over the update protocol
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run a bot vs bot hex skirmish and report the outcome")]
struct Args {
    /// Scenario file (TOML); the built-in ford scenario when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Play on an open grass field of this width instead of a scenario
    #[arg(long, requires = "height")]
    width: Option<i32>,

    /// Open field height
    #[arg(long, requires = "width")]
    height: Option<i32>,

    /// Units per side on an open field
    #[arg(long, default_value_t = 4)]
    units: usize,

    /// Game config file (TOML); defaults otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for critical strikes
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many broadcast updates
    #[arg(long, default_value_t = 2000)]
    max_updates: u64,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Debug logging for the whole crate
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct UnitReport {
    creature: String,
    team: String,
    x: i32,
    y: i32,
    pixel: [f32; 2],
    health: i32,
}

#[derive(Serialize)]
struct SkirmishResult {
    scenario: String,
    outcome: WinState,
    winner: Option<String>,
    updates: u64,
    seed: u64,
    survivors: Vec<UnitReport>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose { "hex_tactics=debug" } else { "hex_tactics=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut scenario = match (&args.scenario, args.width, args.height) {
        (Some(path), _, _) => Scenario::load(path)?,
        (None, Some(width), Some(height)) => Scenario::open_field(width, height, args.units)?,
        _ => Scenario::builtin()?,
    };

    if args.seed.is_some() {
        scenario.seed = args.seed;
    }
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let tiles = TileRegistry::builtin()?;
    let creatures = Arc::new(CreatureRegistry::builtin()?);
    let state = scenario.build(&tiles, creatures, config)?;

    let result = play(&scenario, state, args.max_updates)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_text(&result),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn play(scenario: &Scenario, state: GameState, max_updates: u64) -> Result<SkirmishResult> {
    let players: Vec<_> = state.players().map(|p| (p.id, p.name.clone())).collect();
    let capacity = state.config().queue_capacity;
    let (server_end, client_ends) = in_process(players.len(), capacity);

    let blank = state.empty_replica();
    let seats: Vec<_> = players.iter().map(|(player, _)| *player).collect();

    let mut handles = Vec::new();
    for ((player, name), endpoint) in players.into_iter().zip(client_ends) {
        let mut client = ClientPeer::new(blank.clone(), endpoint);
        let handle = thread::Builder::new()
            .name(format!("client-{}", name))
            .spawn(move || {
                let mut bot = NearestEnemyBot::new(player);
                if let Err(err) = client.run(&mut bot) {
                    tracing::error!(player = %name, %err, "client stopped");
                }
            })?;
        handles.push(handle);
    }

    let mut server = ServerPeer::new(state, server_end);
    for (client, player) in seats.into_iter().enumerate() {
        server.seat(client, player)?;
    }
    server.start()?;
    while server.step()? != PeerState::Ended {
        if server.broadcasts() >= max_updates {
            tracing::warn!(max_updates, "update limit reached");
            server.shutdown()?;
        }
    }

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("client thread panicked");
        }
    }

    let updates = server.broadcasts();
    let state = server.into_state();
    Ok(report(scenario, &state, updates))
}

fn report(scenario: &Scenario, state: &GameState, updates: u64) -> SkirmishResult {
    let team_name = |id| state.team(id).map(|team| team.name.clone());

    let survivors = state
        .units()
        .iter()
        .map(|unit| {
            let pixel = unit.position.to_pixel(HEX_PIXEL_SIZE);
            UnitReport {
                creature: unit.template.id.clone(),
                team: state
                    .team_of(unit)
                    .ok()
                    .and_then(team_name)
                    .unwrap_or_default(),
                x: unit.position.x,
                y: unit.position.y,
                pixel: [pixel.x, pixel.y],
                health: unit.health,
            }
        })
        .collect();

    SkirmishResult {
        scenario: scenario.name.clone(),
        outcome: state.win_state(),
        winner: state.winning_team().and_then(team_name),
        updates,
        seed: state.config().seed,
        survivors,
    }
}

fn print_text(result: &SkirmishResult) {
    println!("Skirmish Result");
    println!("===============");
    println!("Scenario: {}", result.scenario);
    println!("Outcome: {:?}", result.outcome);
    if let Some(winner) = &result.winner {
        println!("Winner: {}", winner);
    }
    println!("Updates: {}", result.updates);
    println!("Seed: {}", result.seed);
    println!();
    for unit in &result.survivors {
        println!(
            "  {:<10} {:<6} at ({},{}) health {}",
            unit.creature, unit.team, unit.x, unit.y, unit.health
        );
    }
}

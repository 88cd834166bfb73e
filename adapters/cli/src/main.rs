#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the overworld simulation headlessly.

mod chunks;
mod save_transfer;
mod scene;
mod script;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{ensure, Context, Result as AnyResult};
use clap::{Args, Parser, Subcommand};
use overworld_core::{ChunkCoord, Command, Event, SaveValue};
use overworld_rendering::{Color, HeadlessBackend, Presentation, RenderingBackend};
use overworld_world::{
    config::WorldConfig,
    persistence::MemoryStore,
    query,
    session::Overworld,
    Combatant, Positioned,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::chunks::DirectorySource;

/// Command-line arguments for the overworld runner.
#[derive(Debug, Parser)]
#[command(name = "overworld", version, about = "Headless overworld simulation runner")]
struct CliArgs {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Simulates a chunk directory for a fixed amount of time.
    Run(RunArgs),
    /// Prints the entries of an encoded save.
    Inspect {
        /// File holding an encoded save string.
        #[arg(long)]
        save: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory containing `chunk_<x>_<y>.tmj` maps.
    #[arg(long)]
    chunks: PathBuf,
    /// TOML file overriding the default world configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Chunk entered by a fresh game, written as `x,y`.
    #[arg(long, value_parser = parse_chunk, default_value = "0,0")]
    start: ChunkCoord,
    /// Simulated wall-clock time in seconds.
    #[arg(long, default_value_t = 10.0)]
    seconds: f32,
    /// Render frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Timed input script.
    #[arg(long)]
    script: Option<PathBuf>,
    /// File receiving the encoded save when the run ends.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Encoded save to continue from.
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Emits collision, defense and attack bounds with every frame.
    #[arg(long)]
    debug: bool,
}

/// Entry point for the overworld command-line interface.
fn main() -> AnyResult<()> {
    init_tracing();
    let args = CliArgs::parse();
    match args.command {
        CliCommand::Run(run) => run_simulation(run),
        CliCommand::Inspect { save } => inspect(&save),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run_simulation(args: RunArgs) -> AnyResult<()> {
    ensure!(
        args.seconds.is_finite() && args.seconds >= 0.0,
        "--seconds must be a non-negative number"
    );

    let config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            WorldConfig::from_toml(&contents)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => WorldConfig::default(),
    };
    let source = DirectorySource::scan(&args.chunks)
        .with_context(|| format!("failed to scan {}", args.chunks.display()))?;
    info!(chunks = source.len(), "chunk directory scanned");

    let store = match &args.resume {
        Some(path) => read_save(path)?,
        None => MemoryStore::new(),
    };
    let mut overworld = Overworld::new(Arc::new(config), source, store, args.start)
        .context("failed to open the overworld")?;

    let frames = (args.seconds * args.fps as f32).round() as u32;
    let mut backend = HeadlessBackend::new(frames, args.fps)?;
    if let Some(path) = &args.script {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        let inputs = script::parse(&contents, args.fps)
            .with_context(|| format!("invalid script {}", path.display()))?;
        for (frame, input) in inputs {
            if frame >= frames {
                warn!(frame, frames, "script input falls after the last frame");
            }
            backend.schedule(frame, input);
        }
    }

    let scene = scene::build(overworld.world(), args.debug)?;
    let presentation = Presentation::new("Overworld", Color::from_rgb_u8(20, 24, 32), scene);

    let mut events = Vec::new();
    backend.run(presentation, |dt, input, presented| {
        for command in input.into_commands(dt) {
            overworld.apply(command, &mut events)?;
        }
        scene::refresh(presented, overworld.world())?;
        overworld.apply(Command::AcknowledgeRender, &mut events)?;
        for event in events.drain(..) {
            if let Some(line) = describe(&event) {
                println!("{line}");
            }
        }
        Ok(())
    })?;

    overworld.save();
    report(&overworld);

    if let Some(path) = &args.save {
        let encoded = save_transfer::encode(overworld.store())?;
        fs::write(path, format!("{encoded}\n"))
            .with_context(|| format!("failed to write save {}", path.display()))?;
        info!(path = %path.display(), "save written");
    }
    Ok(())
}

fn read_save(path: &Path) -> AnyResult<MemoryStore> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read save {}", path.display()))?;
    let store = save_transfer::decode(&contents)
        .with_context(|| format!("invalid save {}", path.display()))?;
    Ok(store)
}

fn inspect(path: &Path) -> AnyResult<()> {
    let store = read_save(path)?;
    for (key, value) in store.iter() {
        println!("{key} = {}", format_value(value));
    }
    Ok(())
}

fn report(overworld: &Overworld<DirectorySource, MemoryStore>) {
    let world = overworld.world();
    let player = query::player(world);
    let position = player.position();
    println!("chunk: {}", query::chunk(world));
    println!("steps: {}", query::steps(world));
    println!("player: ({:.1}, {:.1})", position.x, position.y);
    println!("health: {}/{}", player.health(), player.max_health());
    println!("resources: {}", player.resources());
    let slain: Vec<&str> = query::slain(world).collect();
    if !slain.is_empty() {
        println!("slain: {}", slain.join(", "));
    }
    for (name, value) in query::properties(world).iter() {
        println!("property {name} = {value}");
    }
    println!("saved keys: {}", overworld.store().len());
}

fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::TimeAdvanced { .. } | Event::Sound { .. } => return None,
        Event::FrameSkipped { dt } => format!("frame of {dt:?} skipped"),
        Event::Music { track } => format!("music: {track}"),
        Event::MessageShown { name, text } => format!("message {name}: {text}"),
        Event::MessageDismissed => "message dismissed".to_owned(),
        Event::ProjectileLaunched {
            projectile,
            direction,
        } => format!("projectile {} launched {direction:?}", projectile.get()),
        Event::MonsterHit { monster, health } => {
            format!("monster {} hit, health {health}", monster.get())
        }
        Event::MonsterSlain { name, .. } => format!("monster {name} slain"),
        Event::PlayerHit { health } => format!("player hit, health {health}"),
        Event::PlayerDefeated => "player defeated".to_owned(),
        Event::CollectablePicked { name, total, .. } => {
            format!("picked up {name}, total {total}")
        }
        Event::EventTriggered { event } => format!("event {event} triggered"),
        Event::EntitySpawned { name, .. } => format!("{name} appeared"),
        Event::PropertySet { name, value } => format!("property {name} = {value}"),
        Event::ChunkTransitionRequested { direction } => {
            format!("leaving chunk {direction:?}")
        }
    };
    Some(line)
}

fn format_value(value: &SaveValue) -> String {
    match value {
        SaveValue::Bool(value) => value.to_string(),
        SaveValue::Int(value) => value.to_string(),
        SaveValue::Float(value) => value.to_string(),
        SaveValue::Text(value) => format!("{value:?}"),
    }
}

fn parse_chunk(value: &str) -> Result<ChunkCoord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, received '{value}'"))?;
    let x = x
        .trim()
        .parse()
        .map_err(|_| format!("invalid chunk column '{x}'"))?;
    let y = y
        .trim()
        .parse()
        .map_err(|_| format!("invalid chunk row '{y}'"))?;
    Ok(ChunkCoord::new(x, y))
}

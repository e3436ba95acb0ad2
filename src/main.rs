//! mudlark: multi-agent text world
//!
//! Usage:
//!   mudlark play                      → play the demo tavern in the terminal
//!   mudlark play --world w.json --npcs → play a saved world, other agents wander
//!   mudlark dump-world                → print the demo world as JSON
//!   mudlark dump-config               → print the default config as TOML
//!   mudlark version                   → show version

use anyhow::Context;
use clap::{Parser, Subcommand};
use mudlark::{console, demo, AuditLog, MudlarkConfig};
use mudlark_core::{Graph, NodeId};
use mudlark_events::World;
use mudlark_souls::{
    shared, ChannelTransport, DecisionSoul, FillerFactory, Purgatory, Soul, WanderProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Chance that a wandering soul ignores what it just saw.
const WANDER_PASS_CHANCE: f64 = 0.6;

#[derive(Parser)]
#[command(
    name = "mudlark",
    about = "Multi-agent text world with pluggable souls",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Take over an agent and play in the terminal
    Play {
        /// World JSON to load (default: the demo tavern)
        #[arg(short, long)]
        world: Option<PathBuf>,
        /// Override the configured random seed
        #[arg(short, long)]
        seed: Option<u64>,
        /// Animate the other agents with wandering souls
        #[arg(long, default_value_t = false)]
        npcs: bool,
        /// Path to config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write episode start/end snapshots into this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// Print the demo world as JSON
    DumpWorld,
    /// Print the default configuration as TOML
    DumpConfig,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Play {
            world,
            seed,
            npcs,
            config,
            snapshot_dir,
        } => {
            let mut config = config.as_deref().map(MudlarkConfig::load).unwrap_or_default();
            if let Some(seed) = seed {
                config.world.seed = seed;
            }
            play(config, world.as_deref(), npcs, snapshot_dir).await?;
        }
        Commands::DumpWorld => {
            let graph = demo::tavern(&MudlarkConfig::default().world)?;
            println!("{}", graph.to_json_pretty()?);
        }
        Commands::DumpConfig => {
            print!("{}", MudlarkConfig::default().to_toml());
        }
        Commands::Version => {
            println!("mudlark v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("not a file path: {}", path.display()))?;
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mudlark=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn load_world(path: Option<&Path>, config: &MudlarkConfig) -> anyhow::Result<Graph> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading world file {}", path.display()))?;
            let graph = Graph::from_json(&json)?;
            graph.validate()?;
            tracing::info!(path = %path.display(), nodes = graph.len(), "Loaded world");
            Ok(graph)
        }
        None => Ok(demo::tavern(&config.world)?),
    }
}

async fn play(
    config: MudlarkConfig,
    world_file: Option<&Path>,
    npcs: bool,
    snapshot_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let graph = load_world(world_file, &config)?;
    let mut world = World::new(graph, config.world.clone());
    world.set_recorder(Arc::new(AuditLog::new(snapshot_dir)));
    world.begin_episode();
    let world = shared(world);

    let mut purgatory = Purgatory::new(world.clone(), config.purgatory.clone()).await;
    if npcs {
        let provider = Arc::new(WanderProvider::new(config.world.seed, WANDER_PASS_CHANCE));
        let delay = Duration::from_millis(config.purgatory.reaction_delay_ms);
        let factory: FillerFactory = Arc::new(move |_: &NodeId| {
            Box::new(DecisionSoul::new("wander", provider.clone(), delay)) as Box<dyn Soul>
        });
        purgatory = purgatory.with_filler(factory);
    }

    let (transport, narration) = ChannelTransport::new();
    let slot = purgatory.acquire_player_slot(Arc::new(transport)).await?;
    let filled = purgatory.fill_all().await?;
    tracing::info!(agent = %slot.agent, npcs = filled, "Session started");

    let printer = tokio::spawn(console::print_narration(narration));
    let session = console::read_commands(slot.commands.clone()).await;

    purgatory.shutdown().await;
    world.lock().await.end_episode();
    printer.abort();
    session
}

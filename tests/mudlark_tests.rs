//! Tests for the mudlark binary's library side: config files and the demo
//! world

use mudlark::{demo, MudlarkConfig};
use mudlark_core::{Graph, NodeId};
use mudlark_events::{ActionOutcome, EventTag, World, WorldConfig};
use mudlark_souls::{
    shared, ChannelTransport, DecisionSoul, FillerFactory, Purgatory, PurgatoryConfig, Soul,
    WanderProvider,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn agent_named(graph: &Graph, name: &str) -> NodeId {
    graph
        .agents()
        .find(|id| graph.node(id).unwrap().name == name)
        .cloned()
        .unwrap()
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_file_overrides_only_what_it_names() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[world]\nseed = 7\nshout_range = 5\n\n[purgatory]\nfiller_enabled = false").unwrap();

    let config = MudlarkConfig::load(file.path());
    assert_eq!(config.world.seed, 7);
    assert_eq!(config.world.shout_range, 5);
    assert_eq!(config.world.max_health, WorldConfig::default().max_health);
    assert!(!config.purgatory.filler_enabled);
    assert_eq!(
        config.purgatory.observation_buffer,
        PurgatoryConfig::default().observation_buffer
    );
}

#[test]
fn missing_or_broken_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(MudlarkConfig::load(&dir.path().join("absent.toml")), MudlarkConfig::default());

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "[world\nseed = ").unwrap();
    assert_eq!(MudlarkConfig::load(&broken), MudlarkConfig::default());
}

// ===========================================================================
// Demo world
// ===========================================================================

#[test]
fn demo_world_validates_and_reloads() {
    let graph = demo::tavern(&WorldConfig::default()).unwrap();
    graph.validate().unwrap();
    assert_eq!(graph.agents().count(), 4);

    let back = Graph::from_json(&graph.to_json().unwrap()).unwrap();
    back.validate().unwrap();
    assert_eq!(back.len(), graph.len());
}

#[test]
fn the_cellar_opens_with_the_barkeeps_key() {
    let graph = demo::tavern(&WorldConfig::default()).unwrap();
    let odo = agent_named(&graph, "Odo");
    let wren = agent_named(&graph, "Wren");
    let mut world = World::new(graph, WorldConfig::default());

    let ActionOutcome::Rejected(err) = world.parse_exec(&wren, "go stairs").unwrap() else {
        panic!("expected the cellar to be locked");
    };
    assert_eq!(err.text, "The path to the cellar stairs is locked.");

    assert_eq!(world.parse_exec(&odo, "unlock stairs").unwrap().tags(), vec![EventTag::Unlock]);
    assert!(world.parse_exec(&wren, "go stairs").unwrap().is_executed());
    let cellar = world.graph().room_of(&wren).unwrap();
    assert_eq!(world.graph().node(&cellar).unwrap().name, "cellar");
}

#[tokio::test]
async fn a_player_joins_and_the_rest_wander() {
    let config = WorldConfig::default();
    let world = shared(World::new(demo::tavern(&config).unwrap(), config));
    let provider = Arc::new(WanderProvider::new(1, 0.0));
    let factory: FillerFactory = Arc::new(move |_: &NodeId| {
        Box::new(DecisionSoul::new("wander", provider.clone(), Duration::ZERO)) as Box<dyn Soul>
    });
    let purgatory = Purgatory::new(world.clone(), PurgatoryConfig::default())
        .await
        .with_filler(factory);

    let (transport, mut narration) = ChannelTransport::new();
    let slot = purgatory.acquire_player_slot(Arc::new(transport)).await.unwrap();
    assert_eq!(purgatory.fill_all().await.unwrap(), 3);

    let (_, first) = tokio::time::timeout(Duration::from_secs(2), narration.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.starts_with("You wake up as"));
    slot.commands.send("wave".into()).await.unwrap();

    purgatory.shutdown().await;
    assert!(purgatory.attached().is_empty());
    world.lock().await.graph().validate().unwrap();
}

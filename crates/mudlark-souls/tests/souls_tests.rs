//! Tests for mudlark-souls: attachment lifecycle, ordered delivery,
//! cancellation and player-slot acquisition

use async_trait::async_trait;
use mudlark_core::*;
use mudlark_events::{ActionOutcome, EventTag, GraphEvent, NodeRef, Observation, World, WorldConfig};
use mudlark_souls::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

struct Fixture {
    world: SharedWorld,
    alice: NodeId,
    bob: NodeId,
    carol: NodeId,
}

/// Alice and Bob in the hall, Carol in the yard.
fn fixture() -> Fixture {
    let config = WorldConfig::default();
    let mut b = GraphBuilder::new();
    let hall = b.room("hall", "A long hall.", GridLocation::new(0, 0, 0)).unwrap();
    let yard = b.room("yard", "A muddy yard.", GridLocation::new(0, -1, 0)).unwrap();
    b.connect(&hall, &yard, "the south", "the north").unwrap();
    let alice = b.agent("Alice", "A traveller.", config.agent_template(), &hall).unwrap();
    let bob = b.agent("Bob", "A farmer.", config.agent_template(), &hall).unwrap();
    let carol = b.agent("Carol", "A guard.", config.agent_template(), &yard).unwrap();
    let g = b.finish().unwrap();
    Fixture {
        world: shared(World::new(g, config)),
        alice,
        bob,
        carol,
    }
}

async fn purgatory(f: &Fixture) -> Purgatory {
    Purgatory::new(f.world.clone(), PurgatoryConfig::default()).await
}

async fn act(f: &Fixture, actor: &NodeId, command: &str) -> ActionOutcome {
    f.world.lock().await.parse_exec(actor, command).unwrap()
}

/// A recording soul that holds every observation until `gate` lets it
/// through, one permit each.
struct GatedSoul {
    inner: RecordingSoul,
    gate: Arc<Semaphore>,
}

fn gated() -> (GatedSoul, Recording, Arc<Semaphore>) {
    let (inner, recording) = RecordingSoul::new();
    let gate = Arc::new(Semaphore::new(0));
    (GatedSoul { inner, gate: gate.clone() }, recording, gate)
}

#[async_trait]
impl Soul for GatedSoul {
    fn name(&self) -> &str {
        "gated"
    }

    async fn observe(&mut self, observation: Observation, ctx: &SoulContext) -> mudlark_souls::Result<()> {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.inner.observe(observation, ctx).await
    }

    fn reap(&mut self) {
        self.inner.reap();
    }
}

/// Read transport output until a line containing `needle` shows up.
async fn until(rx: &mut mpsc::UnboundedReceiver<(NodeId, String)>, needle: &str) -> bool {
    tokio::time::timeout(WAIT, async {
        while let Some((_, text)) = rx.recv().await {
            if text.contains(needle) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

// ===========================================================================
// Attachment
// ===========================================================================

#[tokio::test]
async fn attaching_twice_is_refused() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (first, _) = RecordingSoul::new();
    let (second, _) = RecordingSoul::new();
    p.attach(&f.alice, Box::new(first)).await.unwrap();
    let err = p.attach(&f.alice, Box::new(second)).await.unwrap_err();
    assert!(matches!(err, SoulError::AlreadyAttached(ref id) if id == &f.alice));
    assert_eq!(p.attached(), vec![(f.alice.clone(), "recording".to_string())]);
}

#[tokio::test]
async fn detaching_unknown_or_missing_agents_fails() {
    let f = fixture();
    let p = purgatory(&f).await;
    assert!(matches!(p.detach(&f.bob).await, Err(SoulError::NotAttached(_))));
    let (soul, _) = RecordingSoul::new();
    let ghost = NodeId::new("ghost_99");
    assert!(matches!(p.attach(&ghost, Box::new(soul)).await, Err(SoulError::World(_))));
}

#[tokio::test]
async fn dead_and_dying_agents_cannot_take_a_soul() {
    let f = fixture();
    let p = purgatory(&f).await;
    {
        let mut world = f.world.lock().await;
        world.graph_mut().agent_mut(&f.alice).unwrap().dying = true;
        world.graph_mut().agent_die(&f.bob).unwrap();
    }
    let (soul, _) = RecordingSoul::new();
    assert!(matches!(p.attach(&f.alice, Box::new(soul)).await, Err(SoulError::Dead(ref id)) if id == &f.alice));
    let (soul, _) = RecordingSoul::new();
    assert!(matches!(p.attach(&f.bob, Box::new(soul)).await, Err(SoulError::World(_))));
    assert!(p.attached().is_empty());
}

#[tokio::test]
async fn detach_reaps_the_soul() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (soul, recording) = RecordingSoul::new();
    p.attach(&f.bob, Box::new(soul)).await.unwrap();
    p.detach(&f.bob).await.unwrap();
    assert!(recording.is_reaped());
    assert!(!p.is_attached(&f.bob));

    act(&f, &f.alice, "wave").await;
    assert!(recording.texts().is_empty());
}

// ===========================================================================
// Delivery
// ===========================================================================

#[tokio::test]
async fn observations_arrive_in_broadcast_order() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (soul, recording) = RecordingSoul::new();
    p.attach(&f.bob, Box::new(soul)).await.unwrap();

    act(&f, &f.alice, "say one").await;
    act(&f, &f.alice, "say two").await;
    act(&f, &f.alice, "wave").await;

    assert!(recording.wait_for(3, WAIT).await);
    assert_eq!(
        recording.texts(),
        vec![
            "Alice said \"one\".".to_string(),
            "Alice said \"two\".".to_string(),
            "Alice waves.".to_string(),
        ]
    );
}

#[tokio::test]
async fn unattached_and_out_of_earshot_agents_get_nothing() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (soul, recording) = RecordingSoul::new();
    p.attach(&f.carol, Box::new(soul)).await.unwrap();

    act(&f, &f.alice, "say psst").await;
    act(&f, &f.alice, "south").await;

    assert!(recording.wait_for(1, WAIT).await);
    assert_eq!(recording.texts(), vec!["Alice arrived from the north.".to_string()]);
}

#[tokio::test]
async fn death_detaches_instead_of_delivering() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (soul, recording) = RecordingSoul::new();
    p.attach(&f.bob, Box::new(soul)).await.unwrap();
    {
        let mut world = f.world.lock().await;
        world.graph_mut().agent_mut(&f.alice).unwrap().damage = 50;
        world.graph_mut().agent_mut(&f.bob).unwrap().health = 1;
    }

    act(&f, &f.alice, "hit bob").await;

    assert!(recording.wait_reaped(WAIT).await);
    assert!(!p.is_attached(&f.bob));
    let seen = recording.texts();
    assert!(seen.iter().all(|t| t != "You have died."));
    assert!(seen.len() <= 1);
    if let Some(hit) = seen.first() {
        assert!(hit.starts_with("Alice hits you for"));
    }
}

#[tokio::test]
async fn a_stalled_soul_does_not_hold_up_the_others() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (bob_soul, bob_sees, gate) = gated();
    p.attach(&f.bob, Box::new(bob_soul)).await.unwrap();
    let (alice_soul, alice_sees) = RecordingSoul::new();
    p.attach(&f.alice, Box::new(alice_soul)).await.unwrap();

    act(&f, &f.alice, "say one").await;
    act(&f, &f.alice, "say two").await;

    assert!(alice_sees.wait_for(2, WAIT).await);
    assert!(bob_sees.texts().is_empty());

    gate.add_permits(2);
    assert!(bob_sees.wait_for(2, WAIT).await);
    assert_eq!(
        bob_sees.texts(),
        vec!["Alice said \"one\".".to_string(), "Alice said \"two\".".to_string()]
    );
}

#[tokio::test]
async fn a_slow_soul_loses_nothing_by_default() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (soul, recording, gate) = gated();
    p.attach(&f.bob, Box::new(soul)).await.unwrap();

    let count = 300;
    for n in 0..count {
        act(&f, &f.alice, &format!("say {}", n)).await;
    }
    assert!(p.is_attached(&f.bob));

    gate.add_permits(count);
    assert!(recording.wait_for(count, WAIT).await);
    let expected: Vec<String> = (0..count).map(|n| format!("Alice said \"{}\".", n)).collect();
    assert_eq!(recording.texts(), expected);
}

#[tokio::test]
async fn overflowing_a_bounded_queue_detaches_with_an_error() {
    let f = fixture();
    let config = PurgatoryConfig {
        observation_buffer: 1,
        ..Default::default()
    };
    let p = Purgatory::new(f.world.clone(), config).await;
    let (soul, recording, _gate) = gated();
    p.attach(&f.bob, Box::new(soul)).await.unwrap();

    let event = {
        let world = f.world.lock().await;
        let alice = NodeRef::of(world.graph().node(&f.alice).unwrap());
        Arc::new(GraphEvent::new(EventTag::Wait, alice, Vec::new(), None))
    };
    let note = |n: usize| Observation {
        recipient: f.bob.clone(),
        recipient_dead: false,
        text: format!("note {}", n),
        event: event.clone(),
    };

    // One observation can sit in the stalled soul and one in the queue.
    let mut overflowed = false;
    for n in 0..3 {
        match p.dispatch_observation(note(n)) {
            Ok(true) => {}
            Err(SoulError::Overflow(id)) => {
                assert_eq!(id, f.bob);
                overflowed = true;
                break;
            }
            other => panic!("unexpected dispatch result {:?}", other),
        }
    }
    assert!(overflowed);
    assert!(!p.is_attached(&f.bob));
    assert!(recording.wait_reaped(WAIT).await);
    assert!(!p.dispatch_observation(note(9)).unwrap());
}

// ===========================================================================
// Cancellation
// ===========================================================================

#[tokio::test]
async fn a_cancelled_context_cannot_act() {
    let f = fixture();
    let cancel = CancellationToken::new();
    let ctx = SoulContext::new(f.alice.clone(), f.world.clone(), cancel.clone());
    assert!(ctx.act("wave").await.unwrap().is_some());

    cancel.cancel();
    assert!(ctx.act("south").await.unwrap().is_none());
    let world = f.world.lock().await;
    assert_ne!(world.graph().room_of(&f.alice).unwrap(), world.graph().room_of(&f.carol).unwrap());
}

#[tokio::test]
async fn a_context_for_a_removed_agent_does_nothing() {
    let f = fixture();
    let ctx = SoulContext::new(f.bob.clone(), f.world.clone(), CancellationToken::new());
    f.world.lock().await.graph_mut().agent_die(&f.bob).unwrap();
    assert!(ctx.act("wave").await.unwrap().is_none());
    assert!(ctx.legal_commands(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn detaching_during_the_reaction_delay_leaves_the_world_alone() {
    let f = fixture();
    let p = purgatory(&f).await;
    let provider = Arc::new(ScriptedProvider::new(["south"]));
    let soul = DecisionSoul::new("scripted", provider.clone(), Duration::from_millis(300));
    p.attach(&f.bob, Box::new(soul)).await.unwrap();

    act(&f, &f.alice, "wave").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    p.detach(&f.bob).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(provider.remaining(), 1);
    let world = f.world.lock().await;
    assert_eq!(world.graph().room_of(&f.bob).unwrap(), world.graph().room_of(&f.alice).unwrap());
    assert_ne!(world.graph().room_of(&f.bob).unwrap(), world.graph().room_of(&f.carol).unwrap());
}

// ===========================================================================
// Players
// ===========================================================================

#[tokio::test]
async fn concurrent_players_get_distinct_agents() {
    let f = fixture();
    let p = Arc::new(purgatory(&f).await);
    let (transport, _rx) = ChannelTransport::new();
    let transport: Arc<dyn PlayerTransport> = Arc::new(transport);

    let joins: Vec<_> = (0..3)
        .map(|_| {
            let p = p.clone();
            let transport = transport.clone();
            tokio::spawn(async move { p.acquire_player_slot(transport).await })
        })
        .collect();
    let mut agents = Vec::new();
    for join in joins {
        agents.push(join.await.unwrap().unwrap().agent);
    }
    agents.sort();
    agents.dedup();
    assert_eq!(agents.len(), 3);

    assert!(matches!(
        p.acquire_player_slot(transport).await,
        Err(SoulError::NoFreeAgent)
    ));
    let world = f.world.lock().await;
    assert!(agents.iter().all(|a| world.graph().agent(a).unwrap().is_player));
}

#[tokio::test]
async fn player_commands_flow_through_the_world() {
    let f = fixture();
    let p = purgatory(&f).await;
    let (transport, mut rx) = ChannelTransport::new();
    let slot = p.acquire_player_slot(Arc::new(transport)).await.unwrap();

    assert!(until(&mut rx, "You wake up as").await);
    slot.commands.send("say hello".into()).await.unwrap();
    assert!(until(&mut rx, "You said \"hello\".").await);

    p.detach(&slot.agent).await.unwrap();
    assert!(!f.world.lock().await.graph().agent(&slot.agent).unwrap().is_player);
}

// ===========================================================================
// Autonomous souls
// ===========================================================================

#[tokio::test]
async fn scripted_soul_reacts_to_others() {
    let f = fixture();
    let p = purgatory(&f).await;
    let provider = Arc::new(ScriptedProvider::new(["wave"]));
    let bob_soul = DecisionSoul::new("scripted", provider.clone(), Duration::ZERO);
    p.attach(&f.bob, Box::new(bob_soul)).await.unwrap();
    let (alice_soul, alice_sees) = RecordingSoul::new();
    p.attach(&f.alice, Box::new(alice_soul)).await.unwrap();

    act(&f, &f.alice, "say hello").await;

    assert!(alice_sees.wait_for(2, WAIT).await);
    assert_eq!(
        alice_sees.texts(),
        vec!["You said \"hello\".".to_string(), "Bob waves.".to_string()]
    );
    assert_eq!(provider.remaining(), 0);
}

#[tokio::test]
async fn fillers_take_free_agents_and_yield_to_players() {
    let f = fixture();
    let filler: FillerFactory = Arc::new(|_: &NodeId| Box::new(RecordingSoul::new().0) as Box<dyn Soul>);
    let p = purgatory(&f).await.with_filler(filler);

    assert_eq!(p.fill_all().await.unwrap(), 3);
    assert_eq!(p.fill_all().await.unwrap(), 0);

    let (transport, _rx) = ChannelTransport::new();
    let slot = p.acquire_player_slot(Arc::new(transport)).await.unwrap();
    let attached = p.attached();
    assert_eq!(attached.len(), 3);
    assert!(attached.contains(&(slot.agent.clone(), "player".to_string())));

    p.shutdown().await;
    assert!(p.attached().is_empty());
}

#[tokio::test]
async fn fillers_can_be_switched_off() {
    let f = fixture();
    let config = PurgatoryConfig {
        filler_enabled: false,
        ..Default::default()
    };
    let filler: FillerFactory = Arc::new(|_: &NodeId| Box::new(RecordingSoul::new().0) as Box<dyn Soul>);
    let p = Purgatory::new(f.world.clone(), config).await.with_filler(filler);
    assert_eq!(p.fill_all().await.unwrap(), 0);
    assert!(p.attached().is_empty());
}

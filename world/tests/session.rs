mod common;

use common::{config, MapBuilder, DUMMY, FRAME};
use glam::Vec2;
use overworld_core::{ChunkCoord, Command, Direction, Event, Key, Rect, SaveValue};
use overworld_world::{
    persistence::{is_visited, keys, MemoryStore, SaveStore},
    query,
    session::{open_edges, ChunkSource, MemorySource, Overworld},
    Positioned,
};

fn two_chunks() -> MemorySource {
    let mut source = MemorySource::new();
    source
        .insert(
            ChunkCoord::new(0, 0),
            &MapBuilder::new(20, 20)
                .start(Vec2::new(308.0, 100.0))
                .monster("slime", DUMMY, Vec2::new(40.0, 250.0), false)
                .collectable("coin", Vec2::new(250.0, 250.0), false)
                .event(1, "set", "gate=open", Rect::new(200.0, 90.0, 32.0, 32.0), None)
                .music("meadow")
                .document(),
        )
        .expect("west chunk");
    source
        .insert(
            ChunkCoord::new(1, 0),
            &MapBuilder::new(20, 20).music("caves").document(),
        )
        .expect("east chunk");
    source
}

fn send(overworld: &mut Overworld<MemorySource, MemoryStore>, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    overworld
        .apply(command, &mut events)
        .expect("command applies");
    events
}

fn run(overworld: &mut Overworld<MemorySource, MemoryStore>, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..frames {
        events.extend(send(overworld, Command::Tick { dt: FRAME }));
    }
    events
}

#[test]
fn fresh_game_starts_at_the_map_anchor() {
    let overworld = Overworld::new(
        config(),
        two_chunks(),
        MemoryStore::new(),
        ChunkCoord::new(0, 0),
    )
    .expect("opens");

    let world = overworld.world();
    assert_eq!(query::chunk(world), ChunkCoord::new(0, 0));
    assert_eq!(query::player(world).position(), Vec2::new(300.0, 100.0));
    assert!(is_visited(overworld.store(), ChunkCoord::new(0, 0)));
    assert!(!is_visited(overworld.store(), ChunkCoord::new(1, 0)));
}

#[test]
fn open_edges_follow_the_available_neighbors() {
    let source = two_chunks();
    let west = open_edges(&source, ChunkCoord::new(0, 0));
    assert!(west[Direction::Right.index()]);
    assert!(!west[Direction::Left.index()]);
    assert!(!west[Direction::Up.index()]);
    assert!(!west[Direction::Down.index()]);
    assert!(source.contains(ChunkCoord::new(1, 0)));
    assert!(source.load(ChunkCoord::new(5, 5)).is_err());
}

#[test]
fn walking_through_an_open_edge_enters_the_neighbor() {
    let mut overworld = Overworld::new(
        config(),
        two_chunks(),
        MemoryStore::new(),
        ChunkCoord::new(0, 0),
    )
    .expect("opens");

    let _ = send(&mut overworld, Command::KeyPressed { key: Key::Right });
    let _ = run(&mut overworld, 1);
    let _ = send(&mut overworld, Command::AcknowledgeRender);

    let mut events = Vec::new();
    for _ in 0..60 {
        events.extend(run(&mut overworld, 1));
        if query::chunk(overworld.world()) != ChunkCoord::new(0, 0) {
            break;
        }
    }

    assert!(events.contains(&Event::ChunkTransitionRequested {
        direction: Direction::Right
    }));
    let world = overworld.world();
    assert_eq!(query::chunk(world), ChunkCoord::new(1, 0));
    assert_eq!(query::pending_transition(world), None);
    let footprint = query::player(world).collision_bounds();
    assert!(
        (footprint.x - 1.0).abs() < 1e-3,
        "footprint entered at {}",
        footprint.x
    );
    assert!(is_visited(overworld.store(), ChunkCoord::new(1, 0)));

    let next = run(&mut overworld, 1);
    assert!(next.contains(&Event::Music {
        track: "caves".to_owned()
    }));
}

#[test]
fn unacknowledged_facing_blocks_the_transition() {
    let mut overworld = Overworld::new(
        config(),
        two_chunks(),
        MemoryStore::new(),
        ChunkCoord::new(0, 0),
    )
    .expect("opens");

    let _ = send(&mut overworld, Command::KeyPressed { key: Key::Right });
    let events = run(&mut overworld, 30);

    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ChunkTransitionRequested { .. })));
    let world = overworld.world();
    assert_eq!(query::chunk(world), ChunkCoord::new(0, 0));
    assert!(query::player(world).collision_bounds().right() <= 320.0 + 1e-3);
}

#[test]
fn properties_and_chunk_state_survive_a_round_trip() {
    let mut overworld = Overworld::new(
        config(),
        two_chunks(),
        MemoryStore::new(),
        ChunkCoord::new(0, 0),
    )
    .expect("opens");

    let _ = send(&mut overworld, Command::KeyPressed { key: Key::Left });
    let _ = run(&mut overworld, 1);
    let _ = send(&mut overworld, Command::AcknowledgeRender);
    let events = run(&mut overworld, 120);
    assert!(events.contains(&Event::PropertySet {
        name: "gate".to_owned(),
        value: "open".to_owned()
    }));
    let _ = send(&mut overworld, Command::KeyReleased { key: Key::Left });

    overworld.save();
    let first = overworld.store().to_json().expect("encode");
    assert_eq!(
        overworld.store().get_text(&keys::property("gate")),
        Some("open")
    );
    assert_eq!(
        overworld
            .store()
            .get(&keys::event_triggered(ChunkCoord::new(0, 0), 1)),
        Some(&SaveValue::Bool(true))
    );

    let store = MemoryStore::from_json(&first).expect("decode");
    let mut reloaded =
        Overworld::new(config(), two_chunks(), store, ChunkCoord::new(0, 0)).expect("reopens");
    assert_eq!(
        query::player(reloaded.world()).position(),
        query::player(overworld.world()).position()
    );
    assert_eq!(query::properties(reloaded.world()).get("gate"), Some("open"));
    assert!(query::events(reloaded.world())[0].is_triggered());

    reloaded.save();
    let second = reloaded.store().to_json().expect("encode");
    assert_eq!(first, second);
}

#[test]
fn collected_items_stay_collected_after_reload() {
    let mut source = MemorySource::new();
    source
        .insert(
            ChunkCoord::new(0, 0),
            &MapBuilder::new(20, 20)
                .start(Vec2::new(108.0, 100.0))
                .collectable("coin", Vec2::new(108.0, 100.0), false)
                .document(),
        )
        .expect("chunk");
    let mut overworld = Overworld::new(
        config(),
        source.clone(),
        MemoryStore::new(),
        ChunkCoord::new(0, 0),
    )
    .expect("opens");

    let events = run(&mut overworld, 2);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::CollectablePicked { total: 1, .. })));
    overworld.save();

    let reloaded = Overworld::new(
        config(),
        source,
        overworld.into_store(),
        ChunkCoord::new(0, 0),
    )
    .expect("reopens");
    let world = reloaded.world();
    assert_eq!(query::player(world).resources(), 1);
    assert!(query::collectables(world).all(|item| !item.is_active()));
    assert!(query::sprites(world)
        .iter()
        .all(|sprite| sprite.frame.sheet() != "coin"));
}

#[test]
fn missing_chunks_are_reported() {
    let result = Overworld::new(
        config(),
        MemorySource::new(),
        MemoryStore::new(),
        ChunkCoord::new(3, 3),
    );
    assert!(result.is_err());

    let mut store = MemoryStore::new();
    store.set(keys::PLAYER_CHUNK_X, SaveValue::Int(1));
    store.set(keys::PLAYER_CHUNK_Y, SaveValue::Int(0));
    let overworld =
        Overworld::new(config(), two_chunks(), store, ChunkCoord::new(0, 0)).expect("opens");
    assert_eq!(query::chunk(overworld.world()), ChunkCoord::new(1, 0));
}

mod common;

use common::{press, spawn_world, tick, MapBuilder, DUMMY};
use glam::Vec2;
use overworld_core::{Command, Event, Key, Rect};
use overworld_world::{self as world, query, Positioned};

fn around_player() -> Rect {
    Rect::new(90.0, 90.0, 40.0, 40.0)
}

#[test]
fn events_fire_once_and_set_properties() {
    let map = MapBuilder::new(20, 20)
        .event(1, "set", "door=open", around_player(), None)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let events = tick(&mut world, 30);

    let fired = events
        .iter()
        .filter(|event| matches!(event, Event::EventTriggered { event: 1 }))
        .count();
    assert_eq!(fired, 1);
    assert!(events.contains(&Event::PropertySet {
        name: "door".to_owned(),
        value: "open".to_owned()
    }));
    assert_eq!(query::properties(&world).get("door"), Some("open"));
    assert!(query::events(&world)[0].is_triggered());
}

#[test]
fn requirements_chain_events_within_a_step() {
    let map = MapBuilder::new(20, 20)
        .event(1, "set", "door=open", around_player(), None)
        .event(2, "set", "hall=lit", around_player(), Some("door=open"))
        .event(3, "set", "cellar=lit", around_player(), Some("door<>open"))
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let events = tick(&mut world, 1);

    assert!(events.contains(&Event::EventTriggered { event: 1 }));
    assert!(events.contains(&Event::EventTriggered { event: 2 }));
    assert!(!events.contains(&Event::EventTriggered { event: 3 }));
    assert_eq!(query::properties(&world).get("hall"), Some("lit"));
    assert_eq!(query::properties(&world).get("cellar"), None);
}

#[test]
fn events_wait_for_the_player_to_arrive() {
    let map = MapBuilder::new(20, 20)
        .event(1, "set", "visited=yes", Rect::new(160.0, 96.0, 32.0, 32.0), None)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let _ = tick(&mut world, 10);
    assert_eq!(query::properties(&world).get("visited"), None);

    let _ = press(&mut world, Key::Right);
    let events = tick(&mut world, 60);
    assert!(events.contains(&Event::EventTriggered { event: 1 }));
}

#[test]
fn spawn_actions_reveal_hidden_monsters() {
    let map = MapBuilder::new(20, 20)
        .monster("ghost", DUMMY, Vec2::new(200.0, 200.0), true)
        .event(1, "spawn", "ghost", around_player(), None)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let ghost = query::monster(&world, "ghost").expect("placed");
    assert!(!ghost.is_active());
    let id = ghost.id();
    assert!(query::sprites(&world).iter().all(|sprite| sprite.entity != id));

    let events = tick(&mut world, 1);

    assert!(events.contains(&Event::EntitySpawned {
        entity: id,
        name: "ghost".to_owned()
    }));
    assert!(query::monster(&world, "ghost").expect("placed").is_active());
    assert!(query::sprites(&world).iter().any(|sprite| sprite.entity == id));
}

#[test]
fn hidden_collectables_cannot_be_picked_up() {
    let map = MapBuilder::new(20, 20)
        .collectable("gem", Vec2::new(104.0, 100.0), true)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let events = tick(&mut world, 10);

    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::CollectablePicked { .. })));
    assert_eq!(query::collectables(&world).count(), 1);
    assert_eq!(query::player(&world).resources(), 0);
}

#[test]
fn messages_queue_and_freeze_gameplay() {
    let map = MapBuilder::new(20, 20)
        .event(1, "message", "welcome", around_player(), None)
        .event(1, "message", "farewell", around_player(), None)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let events = tick(&mut world, 1);
    assert!(events.contains(&Event::MessageShown {
        name: "welcome".to_owned(),
        text: "Welcome, traveller.".to_owned()
    }));
    assert_eq!(query::queued_messages(&world), 2);
    assert_eq!(
        query::active_message(&world),
        Some(("welcome", "Welcome, traveller."))
    );

    let _ = press(&mut world, Key::Up);
    let _ = tick(&mut world, 20);
    assert!(query::is_frozen(&world));
    assert_eq!(query::player(&world).position(), Vec2::new(100.0, 100.0));

    let mut events = Vec::new();
    world::apply(&mut world, Command::DismissMessage, &mut events);
    assert_eq!(
        events,
        vec![
            Event::MessageDismissed,
            Event::MessageShown {
                name: "farewell".to_owned(),
                text: "Safe travels.".to_owned()
            }
        ]
    );

    let mut events = Vec::new();
    world::apply(&mut world, Command::DismissMessage, &mut events);
    assert_eq!(events, vec![Event::MessageDismissed]);
    assert!(!query::is_frozen(&world));

    let _ = tick(&mut world, 20);
    assert!(query::player(&world).position().y > 100.0);
}

#[test]
fn dismissing_without_a_message_does_nothing() {
    let map = MapBuilder::new(20, 20).parse();
    let mut world = spawn_world(&map, Vec2::new(100.0, 100.0));

    let mut events = Vec::new();
    world::apply(&mut world, Command::DismissMessage, &mut events);
    assert!(events.is_empty());
}

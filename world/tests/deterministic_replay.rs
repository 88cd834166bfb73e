mod common;

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use common::{spawn_world, MapBuilder, DUMMY, HUNTER};
use glam::Vec2;
use overworld_core::{Command, Event, Key};
use overworld_world::{self as world, query, Animated, Combatant, Positioned};

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first
        .events
        .iter()
        .any(|record| record.starts_with("ProjectileLaunched")));
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let map = MapBuilder::new(30, 30)
        .monster("wanderer", 1, Vec2::new(300.0, 300.0), false)
        .monster("butterfly", 2, Vec2::new(60.0, 380.0), false)
        .monster("hunter", HUNTER, Vec2::new(200.0, 120.0), false)
        .monster("post", DUMMY, Vec2::new(240.0, 60.0), false)
        .collectable("coin", Vec2::new(260.0, 200.0), false)
        .parse();
    let mut world = spawn_world(&map, Vec2::new(200.0, 200.0));
    let mut events = Vec::new();

    for command in commands {
        world::apply(&mut world, command, &mut events);
    }

    let entities = query::monsters(&world)
        .map(|monster| EntityState {
            name: monster.name().to_owned(),
            x: monster.position().x.to_bits(),
            y: monster.position().y.to_bits(),
            health: monster.health(),
            frame: monster.frame().map(ToString::to_string),
        })
        .chain(std::iter::once({
            let player = query::player(&world);
            EntityState {
                name: "player".to_owned(),
                x: player.position().x.to_bits(),
                y: player.position().y.to_bits(),
                health: player.health(),
                frame: player.frame().map(ToString::to_string),
            }
        }))
        .collect();

    ReplayOutcome {
        entities,
        events: events.iter().map(record).collect(),
    }
}

fn record(event: &Event) -> String {
    format!("{event:?}")
}

fn scripted_commands() -> Vec<Command> {
    let frame = Command::Tick {
        dt: Duration::from_nanos(16_666_666),
    };
    let mut commands = Vec::new();
    commands.push(Command::KeyPressed { key: Key::Right });
    commands.extend(std::iter::repeat(frame.clone()).take(40));
    commands.push(Command::KeyReleased { key: Key::Right });
    commands.push(Command::AcknowledgeRender);
    commands.push(Command::KeyPressed { key: Key::Special });
    commands.extend(std::iter::repeat(frame.clone()).take(30));
    commands.push(Command::KeyReleased { key: Key::Special });
    commands.push(Command::KeyPressed { key: Key::Down });
    commands.push(Command::KeyPressed { key: Key::Attack });
    commands.push(Command::Tick {
        dt: Duration::from_millis(7),
    });
    commands.push(Command::Tick {
        dt: Duration::from_millis(400),
    });
    commands.extend(std::iter::repeat(frame).take(200));
    commands
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    entities: Vec<EntityState>,
    events: Vec<String>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EntityState {
    name: String,
    x: u32,
    y: u32,
    health: i32,
    frame: Option<String>,
}

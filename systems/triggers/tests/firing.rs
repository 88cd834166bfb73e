use overworld_core::Rect;
use overworld_system_triggers::{EventAction, Requirement, TriggerEvent, WorldProperties};

fn gate_event(requirements: Vec<Requirement>) -> TriggerEvent {
    TriggerEvent::new(
        7,
        Rect::new(0.0, 0.0, 32.0, 32.0),
        vec![
            EventAction::parse("message", "gate_greeting").expect("message"),
            EventAction::parse("set", "gate=open").expect("set"),
        ],
        requirements,
    )
}

#[test]
fn unconditioned_event_fires_exactly_once() {
    let mut event = gate_event(Vec::new());
    let properties = WorldProperties::new();
    let player = Rect::new(10.0, 10.0, 8.0, 8.0);

    let fired = event
        .try_fire(&player, &properties)
        .map(<[EventAction]>::to_vec);
    assert_eq!(fired.map(|actions| actions.len()), Some(2));
    assert!(event.is_triggered());

    for _ in 0..10 {
        assert!(event.try_fire(&player, &properties).is_none());
    }
}

#[test]
fn event_waits_for_overlap() {
    let mut event = gate_event(Vec::new());
    let properties = WorldProperties::new();

    let touching = Rect::new(32.0, 0.0, 8.0, 8.0);
    assert!(event.try_fire(&touching, &properties).is_none());
    assert!(!event.is_triggered());
}

#[test]
fn requirements_gate_firing_until_properties_match() {
    let mut event = gate_event(vec![
        Requirement::new("lever", "down", true),
        Requirement::new("gate", "open", false),
    ]);
    let mut properties = WorldProperties::new();
    let player = Rect::new(4.0, 4.0, 8.0, 8.0);

    assert!(event.try_fire(&player, &properties).is_none());

    let _ = properties.set("lever", "down");
    assert!(event.is_ready(&player, &properties));

    let _ = properties.set("gate", "open");
    assert!(event.try_fire(&player, &properties).is_none());

    let _ = properties.set("gate", "closed");
    assert!(event.try_fire(&player, &properties).is_some());
}

#[test]
fn restored_events_stay_triggered() {
    let mut event = gate_event(Vec::new());
    event.mark_triggered();
    let player = Rect::new(4.0, 4.0, 8.0, 8.0);
    assert!(event
        .try_fire(&player, &WorldProperties::new())
        .is_none());
}

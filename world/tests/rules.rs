use std::time::Duration;

use ctf_core::{CellCoord, Command, Event, ObjectKind, TankId, Terrain};
use ctf_world::{apply, query, GridMap, World, WorldConfig};

const STEP: Duration = Duration::from_millis(20);

fn world_from(map: &str) -> World {
    World::new(
        GridMap::parse(map).expect("map parses"),
        WorldConfig::default(),
    )
}

fn tick(world: &mut World) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, Command::Tick { dt: STEP }, &mut events);
    events
}

#[test]
fn shooting_a_wood_box_turns_its_cell_into_grass() {
    let mut world = world_from("1 8\n0\n0\n0\n0\n0\n1\n0\n0\n0.5 0.5 0\n0.5 7.5\n");
    let tank = TankId::new(0);
    let box_cell = CellCoord::new(0, 5);
    let mut events = Vec::new();

    for _ in 0..400 {
        apply(&mut world, Command::Fire { tank }, &mut events);
        events.extend(tick(&mut world));
        if events.contains(&Event::BoxDestroyed { cell: box_cell }) {
            break;
        }
    }

    assert!(events.contains(&Event::BoxDamaged {
        cell: box_cell,
        hit_points: 1
    }));
    assert!(events.contains(&Event::BoxDamaged {
        cell: box_cell,
        hit_points: 0
    }));
    assert!(events.contains(&Event::BoxDestroyed { cell: box_cell }));
    assert_eq!(
        query::grid_view(&world).terrain_at(box_cell),
        Some(Terrain::Grass)
    );

    let objects = query::object_view(&world);
    assert!(objects
        .iter()
        .all(|object| !matches!(object.kind, ObjectKind::Box(_))));
    assert!(objects
        .iter()
        .any(|object| object.kind == ObjectKind::Explosion));
}

#[test]
fn carrying_the_flag_home_scores_and_resets_the_round() {
    let mut world = world_from("1 4\n0\n0\n0\n0\n0.5 0.5 0\n0.5 1.5\n");
    let tank = TankId::new(0);
    let mut events = Vec::new();

    apply(&mut world, Command::Accelerate { tank }, &mut events);
    for _ in 0..200 {
        events.extend(tick(&mut world));
        if query::flag_carrier(&world) == Some(tank) {
            break;
        }
    }
    assert!(events.contains(&Event::FlagGrabbed { tank }));

    apply(&mut world, Command::Decelerate { tank }, &mut events);
    for _ in 0..400 {
        events.extend(tick(&mut world));
        if events.contains(&Event::RoundReset) {
            break;
        }
    }

    assert!(events.contains(&Event::FlagCaptured { tank, score: 1 }));
    assert!(events.contains(&Event::RoundReset));
    assert_eq!(query::scores(&world), vec![(tank, 1)]);
    assert_eq!(query::flag_carrier(&world), None);
    assert_eq!(query::flag_position(&world), query::map(&world).flag_start());

    let snapshot = query::tank(&world, tank).expect("tank exists");
    assert_eq!(snapshot.pose, snapshot.start);
    assert!(!snapshot.carrying_flag);
}

#[test]
fn destroyed_tank_respawns_with_protection() {
    let mut world = world_from("1 6\n0\n0\n0\n0\n0\n0\n0.5 0.5 0\n0.5 5.5 180\n0.5 3.0\n");
    let shooter = TankId::new(0);
    let target = TankId::new(1);
    let mut events = Vec::new();

    for _ in 0..400 {
        apply(&mut world, Command::Fire { tank: shooter }, &mut events);
        let produced = tick(&mut world);
        let destroyed = produced.contains(&Event::TankDestroyed { tank: target });
        events.extend(produced);
        if destroyed {
            break;
        }
    }

    assert!(events.contains(&Event::TankDamaged {
        tank: target,
        hit_points: 1
    }));
    assert!(events.contains(&Event::TankDamaged {
        tank: target,
        hit_points: 0
    }));
    assert!(events.contains(&Event::TankDestroyed { tank: target }));

    let snapshot = query::tank(&world, target).expect("tank exists");
    assert_eq!(snapshot.hit_points, query::config(&world).tank.hit_points);
    assert_eq!(snapshot.pose, snapshot.start);
    assert!(query::object_view(&world)
        .iter()
        .any(|object| object.kind == ObjectKind::Explosion));

    events.clear();
    for _ in 0..100 {
        apply(&mut world, Command::Fire { tank: shooter }, &mut events);
        events.extend(tick(&mut world));
    }
    assert!(events
        .iter()
        .all(|event| !matches!(event, Event::TankDamaged { .. })));
}

#[test]
fn commands_for_unknown_tanks_are_ignored() {
    let mut world = world_from("1 2\n0\n0\n0.5 0.5 0\n0.5 1.5\n");
    let before = query::object_view(&world).len();
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::Fire {
            tank: TankId::new(9),
        },
        &mut events,
    );

    assert!(events.is_empty());
    assert_eq!(query::object_view(&world).len(), before);
}

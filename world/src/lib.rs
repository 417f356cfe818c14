#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the capture-the-flag tank game.
//!
//! The world owns the live terrain, the tanks, the flag, projectiles and
//! explosions, and the ordered object registry. It is only ever mutated
//! through [`apply`]; everything else reads it through the [`query`] module
//! or the [`ctf_core::SpatialQuery`] implementation.

mod config;
pub mod generation;
mod map;
mod physics;
mod registry;

use std::time::Duration;

use ctf_core::{CellCoord, Command, EntityId, Event, ObjectKind, Pose, TankId, Terrain};
use glam::Vec2;
use tracing::{debug, info};

pub use config::{ConfigError, ProjectileConfig, RuleConfig, TankConfig, WorldConfig};
pub use map::{GridMap, MapError};
pub use registry::{ObjectRegistry, RegistryEntry};

use physics::{Collider, Contact};

/// Clearance between a tank hull and a freshly spawned projectile.
const MUZZLE_CLEARANCE: f32 = 0.05;

/// Represents the authoritative game state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    map: GridMap,
    terrain: Vec<Terrain>,
    tanks: Vec<Tank>,
    boxes: Vec<BoxBody>,
    projectiles: Vec<Projectile>,
    explosions: Vec<Explosion>,
    flag: Flag,
    registry: ObjectRegistry,
    tick_index: u64,
}

impl World {
    /// Creates a world in its start state for the provided map.
    ///
    /// Boxes are registered first, column by column, followed by each tank's
    /// base and body in declaration order and finally the flag.
    #[must_use]
    pub fn new(map: GridMap, config: WorldConfig) -> Self {
        let mut registry = ObjectRegistry::default();
        let boxes = register_boxes(&map, &config, &mut registry);

        let tanks = map
            .tank_starts()
            .iter()
            .enumerate()
            .map(|(index, start)| {
                let id = TankId::new(u32::try_from(index).unwrap_or(u32::MAX));
                let _ = registry.register(ObjectKind::Base(id));
                let _ = registry.register(ObjectKind::Tank(id));
                Tank::spawn(id, *start, &config.tank)
            })
            .collect();

        let _ = registry.register(ObjectKind::Flag);
        let flag = Flag {
            position: map.flag_start(),
            start: map.flag_start(),
            carrier: None,
        };

        Self {
            config,
            terrain: map.cells().to_vec(),
            map,
            tanks,
            boxes,
            projectiles: Vec::new(),
            explosions: Vec::new(),
            flag,
            registry,
            tick_index: 0,
        }
    }

    fn bounds(&self) -> Vec2 {
        Vec2::new(self.map.width() as f32, self.map.height() as f32)
    }

    fn tank_mut(&mut self, id: TankId) -> Option<&mut Tank> {
        self.tanks.iter_mut().find(|tank| tank.id == id)
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });

        for tank in &mut self.tanks {
            tank.cooldown = tank.cooldown.saturating_sub(dt);
            tank.respawn_ticks = tank.respawn_ticks.saturating_sub(1);
        }
        self.expire_explosions();

        physics::move_tanks(self, dt.as_secs_f32(), out_events);
        self.carry_flag();
        self.resolve_flag(out_events);
        self.advance_projectiles(dt.as_secs_f32(), out_events);
    }

    fn carry_flag(&mut self) {
        let Some(carrier) = self.flag.carrier else {
            return;
        };
        if let Some(tank) = self.tanks.iter().find(|tank| tank.id == carrier) {
            self.flag.position = tank.pose.position;
        }
    }

    fn resolve_flag(&mut self, out_events: &mut Vec<Event>) {
        let rules = self.config.rules;
        for index in 0..self.tanks.len() {
            let tank = &mut self.tanks[index];
            if tank.respawn_ticks > 0 {
                continue;
            }

            match self.flag.carrier {
                None if tank.pose.position.distance(self.flag.position) < rules.grab_radius => {
                    self.flag.carrier = Some(tank.id);
                    tank.carrying_flag = true;
                    debug!(tank = tank.id.get(), "flag grabbed");
                    out_events.push(Event::FlagGrabbed { tank: tank.id });
                }
                Some(carrier)
                    if carrier == tank.id
                        && tank.pose.position.distance(tank.start.position)
                            < rules.home_radius =>
                {
                    tank.score = tank.score.saturating_add(1);
                    let (id, score) = (tank.id, tank.score);
                    info!(tank = id.get(), score, "flag captured");
                    out_events.push(Event::FlagCaptured { tank: id, score });
                    self.reset_round();
                    out_events.push(Event::RoundReset);
                    return;
                }
                _ => {}
            }
        }
    }

    fn reset_round(&mut self) {
        for tank in &mut self.tanks {
            tank.pose = tank.start;
            tank.halt();
            tank.carrying_flag = false;
        }

        self.flag.position = self.flag.start;
        self.flag.carrier = None;

        for body in self.boxes.drain(..) {
            let _ = self.registry.remove(body.entity);
        }
        self.boxes = register_boxes(&self.map, &self.config, &mut self.registry);
        self.terrain = self.map.cells().to_vec();
    }

    fn fire(&mut self, id: TankId, out_events: &mut Vec<Event>) {
        let config = self.config;
        let Some(tank) = self.tanks.iter_mut().find(|tank| tank.id == id) else {
            return;
        };
        if !tank.cooldown.is_zero() {
            return;
        }

        tank.cooldown = config.tank.fire_cooldown();
        let position = tank
            .pose
            .ahead(config.tank.radius + config.projectile.radius + MUZZLE_CLEARANCE);
        let velocity = tank.pose.forward() * config.projectile.speed;

        let entity = self.registry.register(ObjectKind::Projectile(id));
        self.projectiles.push(Projectile {
            entity,
            owner: id,
            position,
            velocity,
        });
        out_events.push(Event::ProjectileFired {
            tank: id,
            projectile: entity,
        });
    }

    fn advance_projectiles(&mut self, seconds: f32, out_events: &mut Vec<Event>) {
        let in_flight = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(in_flight.len());

        for mut projectile in in_flight {
            let target = projectile.position + projectile.velocity * seconds;
            match physics::first_contact(
                self,
                projectile.position,
                target,
                Some(projectile.owner),
                false,
            ) {
                Some(contact) => {
                    let _ = self.registry.remove(projectile.entity);
                    self.resolve_hit(projectile.owner, contact, out_events);
                }
                None => {
                    projectile.position = target;
                    survivors.push(projectile);
                }
            }
        }

        self.projectiles = survivors;
    }

    fn resolve_hit(&mut self, shooter: TankId, contact: Contact, out_events: &mut Vec<Event>) {
        debug!(
            shooter = shooter.get(),
            x = contact.point.x,
            y = contact.point.y,
            collider = ?contact.collider,
            "projectile hit"
        );
        match contact.collider {
            Collider::Tank(tank) => self.damage_tank(tank, out_events),
            Collider::Box { entity, terrain } if terrain.is_destructible() => {
                self.damage_box(entity, out_events);
            }
            Collider::Box { .. } | Collider::Boundary | Collider::Projectile(_) => {}
        }
    }

    fn damage_tank(&mut self, id: TankId, out_events: &mut Vec<Event>) {
        let config = self.config;
        let Some(tank) = self.tank_mut(id) else {
            return;
        };
        if tank.respawn_ticks > 0 {
            return;
        }

        if tank.hit_points > 0 {
            tank.hit_points -= 1;
            out_events.push(Event::TankDamaged {
                tank: id,
                hit_points: tank.hit_points,
            });
            return;
        }

        let wreck = tank.pose.position;
        tank.pose = tank.start;
        tank.halt();
        tank.hit_points = config.tank.hit_points;
        tank.respawn_ticks = config.rules.respawn_ticks;
        tank.carrying_flag = false;
        if self.flag.carrier == Some(id) {
            self.flag.carrier = None;
        }

        info!(tank = id.get(), "tank destroyed");
        self.spawn_explosion(wreck);
        out_events.push(Event::TankDestroyed { tank: id });
    }

    fn damage_box(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        let Some(index) = self.boxes.iter().position(|body| body.entity == entity) else {
            return;
        };

        let body = &mut self.boxes[index];
        if body.hit_points > 0 {
            body.hit_points -= 1;
            out_events.push(Event::BoxDamaged {
                cell: body.cell,
                hit_points: body.hit_points,
            });
            return;
        }

        let body = self.boxes.remove(index);
        let _ = self.registry.remove(body.entity);
        if let Some(cell) = self.map.view().index(body.cell) {
            self.terrain[cell] = Terrain::Grass;
        }

        info!(x = body.cell.x(), y = body.cell.y(), "box destroyed");
        self.spawn_explosion(body.cell.center());
        out_events.push(Event::BoxDestroyed { cell: body.cell });
    }

    fn spawn_explosion(&mut self, position: Vec2) {
        let entity = self.registry.register(ObjectKind::Explosion);
        self.explosions.push(Explosion {
            entity,
            position,
            remaining_ticks: self.config.rules.explosion_ticks,
        });
    }

    fn expire_explosions(&mut self) {
        let registry = &mut self.registry;
        self.explosions.retain_mut(|explosion| {
            explosion.remaining_ticks = explosion.remaining_ticks.saturating_sub(1);
            if explosion.remaining_ticks > 0 {
                return true;
            }
            let _ = registry.remove(explosion.entity);
            false
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands addressed to unknown tanks are ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::Fire { tank } => world.fire(tank, out_events),
        Command::Accelerate { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.throttle = Throttle::Forward;
            }
        }
        Command::Decelerate { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.throttle = Throttle::Reverse;
            }
        }
        Command::StopMoving { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.throttle = Throttle::Idle;
                tank.speed = 0.0;
            }
        }
        Command::TurnLeft { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.rotation = Rotation::Left;
            }
        }
        Command::TurnRight { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.rotation = Rotation::Right;
            }
        }
        Command::StopTurning { tank } => {
            if let Some(tank) = world.tank_mut(tank) {
                tank.rotation = Rotation::Idle;
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use ctf_core::{
        GridView, ObjectKind, ObjectSnapshot, ObjectView, TankId, TankSnapshot, TankView,
    };
    use glam::Vec2;

    use super::{GridMap, Tank, World, WorldConfig};

    /// Read-only view of the live terrain, reflecting destroyed boxes.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        GridView::new(&world.terrain, world.map.width(), world.map.height())
    }

    /// The map the world was created from.
    #[must_use]
    pub fn map(world: &World) -> &GridMap {
        &world.map
    }

    /// Configuration the world runs with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Captures a read-only view of every tank.
    #[must_use]
    pub fn tank_view(world: &World) -> TankView {
        TankView::from_snapshots(world.tanks.iter().map(snapshot).collect())
    }

    /// Snapshot of a single tank.
    #[must_use]
    pub fn tank(world: &World, id: TankId) -> Option<TankSnapshot> {
        world
            .tanks
            .iter()
            .find(|tank| tank.id == id)
            .map(snapshot)
    }

    /// Score of every tank, ordered by identifier.
    #[must_use]
    pub fn scores(world: &World) -> Vec<(TankId, u32)> {
        world.tanks.iter().map(|tank| (tank.id, tank.score)).collect()
    }

    /// Tank currently carrying the flag, if any.
    #[must_use]
    pub fn flag_carrier(world: &World) -> Option<TankId> {
        world.flag.carrier
    }

    /// Current position of the flag.
    #[must_use]
    pub fn flag_position(world: &World) -> Vec2 {
        world.flag.position
    }

    /// Snapshot of the object registry in insertion order.
    #[must_use]
    pub fn object_view(world: &World) -> ObjectView {
        let snapshots = world
            .registry
            .iter()
            .filter_map(|entry| {
                position_of(world, entry.id, entry.kind).map(|position| ObjectSnapshot {
                    id: entry.id,
                    kind: entry.kind,
                    position,
                })
            })
            .collect();
        ObjectView::from_snapshots(snapshots)
    }

    fn position_of(world: &World, id: ctf_core::EntityId, kind: ObjectKind) -> Option<Vec2> {
        match kind {
            ObjectKind::Box(_) => world
                .boxes
                .iter()
                .find(|body| body.entity == id)
                .map(|body| body.cell.center()),
            ObjectKind::Base(tank) => world
                .tanks
                .iter()
                .find(|candidate| candidate.id == tank)
                .map(|tank| tank.start.position),
            ObjectKind::Tank(tank) => world
                .tanks
                .iter()
                .find(|candidate| candidate.id == tank)
                .map(|tank| tank.pose.position),
            ObjectKind::Flag => Some(world.flag.position),
            ObjectKind::Projectile(_) => world
                .projectiles
                .iter()
                .find(|projectile| projectile.entity == id)
                .map(|projectile| projectile.position),
            ObjectKind::Explosion => world
                .explosions
                .iter()
                .find(|explosion| explosion.entity == id)
                .map(|explosion| explosion.position),
        }
    }

    fn snapshot(tank: &Tank) -> TankSnapshot {
        TankSnapshot {
            id: tank.id,
            pose: tank.pose,
            start: tank.start,
            carrying_flag: tank.carrying_flag,
            hit_points: tank.hit_points,
            weapon_ready: tank.cooldown.is_zero(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Throttle {
    Idle,
    Forward,
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    Idle,
    Left,
    Right,
}

#[derive(Clone, Debug)]
struct Tank {
    id: TankId,
    pose: Pose,
    start: Pose,
    speed: f32,
    throttle: Throttle,
    rotation: Rotation,
    hit_points: u32,
    respawn_ticks: u32,
    cooldown: Duration,
    carrying_flag: bool,
    score: u32,
}

impl Tank {
    fn spawn(id: TankId, start: Pose, config: &TankConfig) -> Self {
        Self {
            id,
            pose: start,
            start,
            speed: 0.0,
            throttle: Throttle::Idle,
            rotation: Rotation::Idle,
            hit_points: config.hit_points,
            respawn_ticks: 0,
            cooldown: Duration::ZERO,
            carrying_flag: false,
            score: 0,
        }
    }

    fn halt(&mut self) {
        self.speed = 0.0;
        self.throttle = Throttle::Idle;
        self.rotation = Rotation::Idle;
    }
}

#[derive(Clone, Debug)]
struct BoxBody {
    entity: EntityId,
    cell: CellCoord,
    terrain: Terrain,
    hit_points: u32,
}

#[derive(Clone, Debug)]
struct Projectile {
    entity: EntityId,
    owner: TankId,
    position: Vec2,
    velocity: Vec2,
}

#[derive(Clone, Debug)]
struct Explosion {
    entity: EntityId,
    position: Vec2,
    remaining_ticks: u32,
}

#[derive(Clone, Debug)]
struct Flag {
    position: Vec2,
    start: Vec2,
    carrier: Option<TankId>,
}

fn register_boxes(
    map: &GridMap,
    config: &WorldConfig,
    registry: &mut ObjectRegistry,
) -> Vec<BoxBody> {
    let grid = map.view();
    let mut boxes = Vec::new();
    for x in 0..map.width() {
        for y in 0..map.height() {
            let cell = CellCoord::new(
                i32::try_from(x).unwrap_or(i32::MAX),
                i32::try_from(y).unwrap_or(i32::MAX),
            );
            let Some(terrain) = grid.terrain_at(cell).filter(|terrain| terrain.is_solid()) else {
                continue;
            };
            boxes.push(BoxBody {
                entity: registry.register(ObjectKind::Box(terrain)),
                cell,
                terrain,
                hit_points: config.rules.wood_box_hit_points,
            });
        }
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctf_core::SpatialQuery;

    const CORRIDOR: &str = "\
1 8
0
0
0
0
0
1
0
0
0.5 0.5 0
0.5 7.5
";

    fn corridor() -> World {
        let map = GridMap::parse(CORRIDOR).expect("corridor parses");
        World::new(map, WorldConfig::default())
    }

    fn tick(world: &mut World, events: &mut Vec<Event>) {
        apply(
            world,
            Command::Tick {
                dt: Duration::from_millis(20),
            },
            events,
        );
    }

    #[test]
    fn registry_lists_boxes_then_bases_tanks_and_flag() {
        let world = corridor();
        let kinds: Vec<_> = query::object_view(&world)
            .iter()
            .map(|object| object.kind)
            .collect();

        assert_eq!(
            kinds,
            vec![
                ObjectKind::Box(Terrain::WoodBox),
                ObjectKind::Base(TankId::new(0)),
                ObjectKind::Tank(TankId::new(0)),
                ObjectKind::Flag,
            ]
        );
    }

    #[test]
    fn fire_respects_cooldown() {
        let mut world = corridor();
        let mut events = Vec::new();
        let tank = TankId::new(0);

        apply(&mut world, Command::Fire { tank }, &mut events);
        apply(&mut world, Command::Fire { tank }, &mut events);

        let fired = events
            .iter()
            .filter(|event| matches!(event, Event::ProjectileFired { .. }))
            .count();
        assert_eq!(fired, 1);
        assert_eq!(world.projectiles.len(), 1);
        assert!(!query::tank(&world, tank).expect("tank exists").weapon_ready);
    }

    #[test]
    fn projectile_is_appended_to_registry() {
        let mut world = corridor();
        let mut events = Vec::new();
        apply(&mut world, Command::Fire { tank: TankId::new(0) }, &mut events);

        let last = query::object_view(&world)
            .iter()
            .last()
            .map(|object| object.kind);
        assert_eq!(last, Some(ObjectKind::Projectile(TankId::new(0))));
    }

    #[test]
    fn turning_left_increases_heading() {
        let mut world = corridor();
        let mut events = Vec::new();
        let tank = TankId::new(0);

        apply(&mut world, Command::TurnLeft { tank }, &mut events);
        tick(&mut world, &mut events);

        let heading = query::tank(&world, tank).expect("tank exists").pose.heading;
        assert!(heading > 0.0);

        apply(&mut world, Command::StopTurning { tank }, &mut events);
        tick(&mut world, &mut events);
        let after = query::tank(&world, tank).expect("tank exists").pose.heading;
        assert!((after - heading).abs() < f32::EPSILON);
    }

    #[test]
    fn accelerating_moves_along_heading_until_blocked() {
        let mut world = corridor();
        let mut events = Vec::new();
        let tank = TankId::new(0);

        apply(&mut world, Command::Accelerate { tank }, &mut events);
        for _ in 0..500 {
            tick(&mut world, &mut events);
        }

        let position = query::tank(&world, tank).expect("tank exists").pose.position;
        assert!((position.x - 0.5).abs() < 1e-4);
        assert!(position.y > 4.0);
        assert!(position.y <= 5.0 - world.config.tank.radius + 1e-4);
    }

    #[test]
    fn metal_box_slides_ahead_of_the_tank_until_the_wall() {
        let map = GridMap::parse("4 1\n0 3 0 0\n0.5 0.5 -90\n3.5 0.5\n").expect("map parses");
        let mut world = World::new(map, WorldConfig::default());
        let mut events = Vec::new();
        let tank = TankId::new(0);

        apply(&mut world, Command::Accelerate { tank }, &mut events);
        for _ in 0..500 {
            tick(&mut world, &mut events);
        }

        let pushes: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::BoxPushed { from, to } => Some((from.x(), to.x())),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![(1, 2), (2, 3)]);

        let grid = query::grid_view(&world);
        assert_eq!(grid.terrain_at(CellCoord::new(1, 0)), Some(Terrain::Grass));
        assert_eq!(grid.terrain_at(CellCoord::new(2, 0)), Some(Terrain::Grass));
        assert_eq!(grid.terrain_at(CellCoord::new(3, 0)), Some(Terrain::MetalBox));

        let position = query::tank(&world, tank).expect("tank exists").pose.position;
        assert!(position.x > 2.0);
        assert!(position.x <= 3.0 - world.config.tank.radius + 1e-4);

        let boxed = query::object_view(&world)
            .iter()
            .find(|object| object.kind == ObjectKind::Box(Terrain::MetalBox))
            .map(|object| object.position);
        assert_eq!(boxed, Some(Vec2::new(3.5, 0.5)));
    }

    #[test]
    fn round_reset_puts_pushed_boxes_back() {
        let map = GridMap::parse("4 1\n0 3 0 0\n0.5 0.5 -90\n3.5 0.5\n").expect("map parses");
        let mut world = World::new(map, WorldConfig::default());
        let mut events = Vec::new();

        apply(&mut world, Command::Accelerate { tank: TankId::new(0) }, &mut events);
        for _ in 0..100 {
            tick(&mut world, &mut events);
        }
        assert!(events.iter().any(|event| matches!(event, Event::BoxPushed { .. })));

        world.reset_round();
        let grid = query::grid_view(&world);
        assert_eq!(grid.terrain_at(CellCoord::new(1, 0)), Some(Terrain::MetalBox));
        assert_eq!(world.boxes.len(), 1);
        assert_eq!(world.boxes[0].cell, CellCoord::new(1, 0));
    }

    #[test]
    fn segment_query_reports_box_ahead_and_ignores_own_body() {
        let world = corridor();
        let hit = world
            .segment_query_first(Vec2::new(0.5, 0.5), Vec2::new(0.5, 7.0), Some(TankId::new(0)))
            .expect("box blocks the corridor");

        assert_eq!(hit.owner, ctf_core::ShapeOwner::Box(Terrain::WoodBox));
        assert!((hit.point.y - 5.0).abs() < 1e-4);

        let own = world
            .segment_query_first(Vec2::new(0.5, 0.4), Vec2::new(0.5, 0.8), None)
            .expect("tank body is hit when not ignored");
        assert_eq!(own.owner, ctf_core::ShapeOwner::Tank(TankId::new(0)));
    }
}

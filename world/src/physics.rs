//! Minimal kinematic physics: tank motion, overlap tests and segment queries.
//!
//! Tanks are circles driven by a scalar speed along their heading, boxes are
//! unit squares aligned with their cell and the map rectangle is a solid
//! boundary. Wood boxes never move; a metal box shoved by a tank slides one
//! whole cell when the cell behind it is free. Projectiles are swept as
//! segments every tick.

use ctf_core::{
    CellCoord, EntityId, Event, SegmentHit, ShapeOwner, SpatialQuery, TankId, Terrain,
};
use glam::Vec2;
use tracing::debug;

use super::{query, Rotation, Throttle, World};

/// Shape touched by a segment, with enough identity to resolve the hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Collider {
    Tank(TankId),
    Box { entity: EntityId, terrain: Terrain },
    Boundary,
    Projectile(EntityId),
}

impl Collider {
    fn owner(self) -> ShapeOwner {
        match self {
            Self::Tank(tank) => ShapeOwner::Tank(tank),
            Self::Box { terrain, .. } => ShapeOwner::Box(terrain),
            Self::Boundary => ShapeOwner::Boundary,
            Self::Projectile(entity) => ShapeOwner::Projectile(entity),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Contact {
    pub(crate) collider: Collider,
    pub(crate) point: Vec2,
}

impl SpatialQuery for World {
    fn segment_query_first(
        &self,
        from: Vec2,
        to: Vec2,
        ignore: Option<TankId>,
    ) -> Option<SegmentHit> {
        first_contact(self, from, to, ignore, true).map(|contact| SegmentHit {
            owner: contact.collider.owner(),
            point: contact.point,
        })
    }
}

/// Nearest shape crossed by the segment `from -> to`.
pub(crate) fn first_contact(
    world: &World,
    from: Vec2,
    to: Vec2,
    ignore: Option<TankId>,
    include_projectiles: bool,
) -> Option<Contact> {
    let delta = to - from;
    let mut best: Option<(f32, Collider)> = None;
    let mut consider = |fraction: f32, collider: Collider| {
        if best.map_or(true, |(current, _)| fraction < current) {
            best = Some((fraction, collider));
        }
    };

    let tank_radius = world.config.tank.radius;
    for tank in &world.tanks {
        if Some(tank.id) == ignore {
            continue;
        }
        if let Some(fraction) = segment_circle(from, delta, tank.pose.position, tank_radius) {
            consider(fraction, Collider::Tank(tank.id));
        }
    }

    for body in &world.boxes {
        let (min, max) = cell_bounds(body.cell);
        if let Some(fraction) = segment_aabb(from, delta, min, max) {
            consider(
                fraction,
                Collider::Box {
                    entity: body.entity,
                    terrain: body.terrain,
                },
            );
        }
    }

    if include_projectiles {
        let radius = world.config.projectile.radius;
        for projectile in &world.projectiles {
            if let Some(fraction) = segment_circle(from, delta, projectile.position, radius) {
                consider(fraction, Collider::Projectile(projectile.entity));
            }
        }
    }

    if let Some(fraction) = boundary_exit(from, delta, world.bounds()) {
        consider(fraction, Collider::Boundary);
    }

    best.map(|(fraction, collider)| Contact {
        collider,
        point: from + delta * fraction,
    })
}

/// Integrates throttle, rotation and position of every tank for one tick.
pub(crate) fn move_tanks(world: &mut World, seconds: f32, out_events: &mut Vec<Event>) {
    let config = world.config.tank;
    for index in 0..world.tanks.len() {
        let tank = &mut world.tanks[index];
        match tank.rotation {
            Rotation::Idle => {}
            Rotation::Left => tank.pose.heading += config.rotation_speed * seconds,
            Rotation::Right => tank.pose.heading -= config.rotation_speed * seconds,
        }

        let top_speed = if tank.carrying_flag {
            config.flag_max_speed
        } else {
            config.max_speed
        };
        tank.speed = match tank.throttle {
            Throttle::Idle => tank.speed,
            Throttle::Forward => tank.speed + config.acceleration * seconds,
            Throttle::Reverse => tank.speed - config.acceleration * seconds,
        }
        .clamp(-top_speed, top_speed);

        let displacement = tank.pose.forward() * tank.speed * seconds;
        let id = tank.id;
        let mut position = tank.pose.position;

        let along_x = position + Vec2::new(displacement.x, 0.0);
        if can_advance(world, id, position, along_x, out_events) {
            position = along_x;
        }
        let along_y = position + Vec2::new(0.0, displacement.y);
        if can_advance(world, id, position, along_y, out_events) {
            position = along_y;
        }

        world.tanks[index].pose.position = position;
    }
}

/// Whether tank `id` may move from `from` to `candidate`, shoving metal boxes
/// out of the way first when that clears the path.
fn can_advance(
    world: &mut World,
    id: TankId,
    from: Vec2,
    candidate: Vec2,
    out_events: &mut Vec<Event>,
) -> bool {
    if !is_blocked(world, id, from, candidate) {
        return true;
    }
    push_boxes(world, from, candidate, out_events) && !is_blocked(world, id, from, candidate)
}

/// Slides every box overlapping `candidate` one cell along the single axis of
/// `candidate - from`. Nothing moves unless all of them can: each must be a
/// metal box lying ahead of the tank with a free cell behind it.
fn push_boxes(
    world: &mut World,
    from: Vec2,
    candidate: Vec2,
    out_events: &mut Vec<Event>,
) -> bool {
    let direction = candidate - from;
    let (dx, dy) = if direction.x.abs() > direction.y.abs() {
        (direction.x.signum() as i32, 0)
    } else if direction.y != 0.0 {
        (0, direction.y.signum() as i32)
    } else {
        return false;
    };

    let radius = world.config.tank.radius;
    let mut moves = Vec::new();
    for (index, body) in world.boxes.iter().enumerate() {
        if !circle_overlaps_cell(candidate, radius, body.cell) {
            continue;
        }
        let ahead = (body.cell.center() - from).dot(direction) > 0.0;
        let target = body.cell.offset(dx, dy);
        if body.terrain != Terrain::MetalBox || !ahead || !is_free(world, target) {
            return false;
        }
        moves.push((index, target));
    }

    for &(index, target) in &moves {
        let origin = world.boxes[index].cell;
        world.boxes[index].cell = target;
        let grid = world.map.view();
        if let (Some(left), Some(entered)) = (grid.index(origin), grid.index(target)) {
            world.terrain[left] = Terrain::Grass;
            world.terrain[entered] = Terrain::MetalBox;
        }
        debug!(
            from_x = origin.x(),
            from_y = origin.y(),
            to_x = target.x(),
            to_y = target.y(),
            "metal box pushed"
        );
        out_events.push(Event::BoxPushed {
            from: origin,
            to: target,
        });
    }
    !moves.is_empty()
}

/// In bounds, not holding a box and not touched by any tank.
fn is_free(world: &World, cell: CellCoord) -> bool {
    let radius = world.config.tank.radius;
    query::grid_view(world)
        .terrain_at(cell)
        .is_some_and(|terrain| !terrain.is_solid())
        && !world
            .tanks
            .iter()
            .any(|tank| circle_overlaps_cell(tank.pose.position, radius, cell))
}

/// Whether moving tank `id` from `from` to `candidate` would collide.
///
/// Tanks already overlapping each other may still separate.
fn is_blocked(world: &World, id: TankId, from: Vec2, candidate: Vec2) -> bool {
    let radius = world.config.tank.radius;
    let bounds = world.bounds();
    if candidate.x < radius
        || candidate.y < radius
        || candidate.x > bounds.x - radius
        || candidate.y > bounds.y - radius
    {
        return true;
    }

    if world
        .boxes
        .iter()
        .any(|body| circle_overlaps_cell(candidate, radius, body.cell))
    {
        return true;
    }

    world
        .tanks
        .iter()
        .filter(|other| other.id != id)
        .any(|other| {
            let after = candidate.distance(other.pose.position);
            after < radius * 2.0 && after < from.distance(other.pose.position)
        })
}

fn cell_bounds(cell: CellCoord) -> (Vec2, Vec2) {
    let min = Vec2::new(cell.x() as f32, cell.y() as f32);
    (min, min + Vec2::ONE)
}

fn circle_overlaps_cell(center: Vec2, radius: f32, cell: CellCoord) -> bool {
    let (min, max) = cell_bounds(cell);
    let closest = center.clamp(min, max);
    closest.distance_squared(center) < radius * radius
}

/// Fraction along `delta` where the segment enters the circle; zero when it starts inside.
fn segment_circle(from: Vec2, delta: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let offset = from - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let a = delta.length_squared();
    if a <= f32::EPSILON {
        return None;
    }

    let b = 2.0 * offset.dot(delta);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let fraction = (-b - discriminant.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

/// Slab test; zero when the segment starts inside the box.
fn segment_aabb(from: Vec2, delta: Vec2, min: Vec2, max: Vec2) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;

    for axis in 0..2 {
        let origin = from[axis];
        let direction = delta[axis];
        if direction.abs() <= f32::EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inverse = 1.0 / direction;
        let near = (min[axis] - origin) * inverse;
        let far = (max[axis] - origin) * inverse;
        t_min = t_min.max(near.min(far));
        t_max = t_max.min(near.max(far));
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

/// Fraction where the segment leaves the `[0, bounds]` rectangle.
fn boundary_exit(from: Vec2, delta: Vec2, bounds: Vec2) -> Option<f32> {
    if from.x < 0.0 || from.y < 0.0 || from.x > bounds.x || from.y > bounds.y {
        return Some(0.0);
    }

    let mut exit: Option<f32> = None;
    for axis in 0..2 {
        let direction = delta[axis];
        let fraction = if direction > 0.0 {
            (bounds[axis] - from[axis]) / direction
        } else if direction < 0.0 {
            -from[axis] / direction
        } else {
            continue;
        };
        if fraction <= 1.0 {
            exit = Some(exit.map_or(fraction, |current| current.min(fraction)));
        }
    }

    exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_enters_circle_at_near_side() {
        let fraction = segment_circle(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 0.0),
            1.0,
        )
        .expect("segment crosses the circle");
        assert!((fraction - 0.4).abs() < 1e-5);
    }

    #[test]
    fn segment_misses_offset_circle() {
        assert!(segment_circle(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 2.0),
            1.0
        )
        .is_none());
    }

    #[test]
    fn segment_hits_box_face() {
        let fraction = segment_aabb(
            Vec2::new(0.5, 0.5),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 5.0),
            Vec2::new(1.0, 6.0),
        )
        .expect("segment reaches the box");
        assert!((fraction - 0.45).abs() < 1e-5);
    }

    #[test]
    fn segment_starting_inside_box_hits_immediately() {
        let fraction = segment_aabb(
            Vec2::new(0.5, 5.5),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 5.0),
            Vec2::new(1.0, 6.0),
        );
        assert_eq!(fraction, Some(0.0));
    }

    #[test]
    fn boundary_exit_uses_first_crossed_edge() {
        let fraction = boundary_exit(
            Vec2::new(1.0, 1.0),
            Vec2::new(4.0, 2.0),
            Vec2::new(3.0, 10.0),
        )
        .expect("segment leaves the map");
        assert!((fraction - 0.5).abs() < 1e-5);
        assert!(boundary_exit(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0)).is_none());
    }

    #[test]
    fn circle_cell_overlap_respects_radius() {
        let cell = CellCoord::new(1, 0);
        assert!(circle_overlaps_cell(Vec2::new(0.8, 0.5), 0.3, cell));
        assert!(!circle_overlaps_cell(Vec2::new(0.5, 0.5), 0.3, cell));
    }
}

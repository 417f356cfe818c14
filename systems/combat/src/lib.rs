#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Forward-looking combat sensor that decides whether a tank should fire.

use ctf_core::{Command, SegmentHit, ShapeOwner, SpatialQuery, TankId, TankSnapshot, Terrain};
use tracing::trace;

/// Extent of the sensing ray, measured from the tank centre along its heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorConfig {
    /// Where the ray starts; clears the tank's own hull.
    pub near: f32,
    /// Where the ray ends.
    pub far: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            near: 0.6,
            far: 10.0,
        }
    }
}

/// Classification of the first shape in front of a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    /// Another tank.
    Tank(TankId),
    /// A box body of the given terrain.
    Box(Terrain),
    /// The boundary, a projectile or a shape that could not be identified.
    Other,
    /// Nothing within range.
    Nothing,
}

impl Hit {
    /// Classifies the result of a segment query.
    #[must_use]
    pub fn classify(hit: Option<SegmentHit>) -> Self {
        let Some(hit) = hit else {
            return Self::Nothing;
        };
        match hit.owner {
            ShapeOwner::Tank(tank) => Self::Tank(tank),
            ShapeOwner::Box(terrain) if terrain.is_solid() => Self::Box(terrain),
            ShapeOwner::Box(_)
            | ShapeOwner::Boundary
            | ShapeOwner::Projectile(_)
            | ShapeOwner::Unknown => Self::Other,
        }
    }

    /// Whether shooting at the hit is worthwhile.
    #[must_use]
    pub const fn is_target(self) -> bool {
        match self {
            Self::Tank(_) => true,
            Self::Box(terrain) => terrain.is_destructible(),
            Self::Other | Self::Nothing => false,
        }
    }
}

/// Pure system that raycasts ahead of a tank and requests a shot at targets.
#[derive(Debug, Default)]
pub struct CombatSensor {
    config: SensorConfig,
}

impl CombatSensor {
    /// Creates a sensor with the provided ray extent.
    #[must_use]
    pub const fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    /// Classifies the first shape along the tank's heading, ignoring the tank itself.
    pub fn scan<S>(&self, tank: &TankSnapshot, spatial: &S) -> Hit
    where
        S: SpatialQuery + ?Sized,
    {
        let from = tank.pose.ahead(self.config.near);
        let to = tank.pose.ahead(self.config.far);
        Hit::classify(spatial.segment_query_first(from, to, Some(tank.id)))
    }

    /// Scans ahead and pushes `Command::Fire` when a tank or a destructible
    /// box is in the line of fire.
    ///
    /// The world decides whether the shot actually happens based on the
    /// weapon cooldown.
    pub fn maybe_shoot<S>(&self, tank: &TankSnapshot, spatial: &S, out: &mut Vec<Command>) -> Hit
    where
        S: SpatialQuery + ?Sized,
    {
        let hit = self.scan(tank, spatial);
        if hit.is_target() {
            trace!(tank = tank.id.get(), ?hit, "target in sight");
            out.push(Command::Fire { tank: tank.id });
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use ctf_core::Pose;
    use glam::Vec2;

    struct FixedQuery {
        owner: Option<ShapeOwner>,
        last_call: Cell<Option<(Vec2, Vec2, Option<TankId>)>>,
    }

    impl FixedQuery {
        fn new(owner: Option<ShapeOwner>) -> Self {
            Self {
                owner,
                last_call: Cell::new(None),
            }
        }
    }

    impl SpatialQuery for FixedQuery {
        fn segment_query_first(
            &self,
            from: Vec2,
            to: Vec2,
            ignore: Option<TankId>,
        ) -> Option<SegmentHit> {
            self.last_call.set(Some((from, to, ignore)));
            self.owner.map(|owner| SegmentHit { owner, point: to })
        }
    }

    fn tank() -> TankSnapshot {
        let pose = Pose::new(Vec2::new(2.0, 2.0), 0.0);
        TankSnapshot {
            id: TankId::new(3),
            pose,
            start: pose,
            carrying_flag: false,
            hit_points: 2,
            weapon_ready: true,
        }
    }

    fn shoot(owner: Option<ShapeOwner>) -> (Hit, Vec<Command>) {
        let mut out = Vec::new();
        let hit = CombatSensor::default().maybe_shoot(&tank(), &FixedQuery::new(owner), &mut out);
        (hit, out)
    }

    #[test]
    fn ray_spans_configured_extent_and_ignores_self() {
        let query = FixedQuery::new(None);
        let _ = CombatSensor::default().scan(&tank(), &query);

        let (from, to, ignore) = query.last_call.get().expect("query issued");
        assert!((from - Vec2::new(2.0, 2.6)).length() < 1e-5);
        assert!((to - Vec2::new(2.0, 12.0)).length() < 1e-5);
        assert_eq!(ignore, Some(TankId::new(3)));
    }

    #[test]
    fn fires_at_tanks_and_wood_boxes() {
        let (hit, out) = shoot(Some(ShapeOwner::Tank(TankId::new(1))));
        assert_eq!(hit, Hit::Tank(TankId::new(1)));
        assert_eq!(out, vec![Command::Fire { tank: TankId::new(3) }]);

        let (hit, out) = shoot(Some(ShapeOwner::Box(Terrain::WoodBox)));
        assert_eq!(hit, Hit::Box(Terrain::WoodBox));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn holds_fire_at_everything_else() {
        for (owner, expected) in [
            (Some(ShapeOwner::Box(Terrain::MetalBox)), Hit::Box(Terrain::MetalBox)),
            (Some(ShapeOwner::Boundary), Hit::Other),
            (Some(ShapeOwner::Unknown), Hit::Other),
            (Some(ShapeOwner::Box(Terrain::Stone)), Hit::Other),
            (None, Hit::Nothing),
        ] {
            let (hit, out) = shoot(owner);
            assert_eq!(hit, expected);
            assert!(out.is_empty(), "{owner:?}");
        }
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the capture-the-flag tank engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values.
//! Systems never mutate the world directly: they read the immutable views
//! defined here ([`GridView`], [`TankView`], [`ObjectView`]) and query the
//! physics through the [`SpatialQuery`] port.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Starts accelerating the tank forward along its heading.
    Accelerate {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Starts accelerating the tank backward.
    Decelerate {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Cancels any translational motion.
    StopMoving {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Starts rotating the tank toward increasing heading.
    TurnLeft {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Starts rotating the tank toward decreasing heading.
    TurnRight {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Cancels any rotation.
    StopTurning {
        /// Tank receiving the command.
        tank: TankId,
    },
    /// Pulls the trigger; the world only spawns a projectile when the weapon is ready.
    Fire {
        /// Tank receiving the command.
        tank: TankId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tank fired and a projectile joined the object registry.
    ProjectileFired {
        /// Tank that fired.
        tank: TankId,
        /// Registry entry of the new projectile.
        projectile: EntityId,
    },
    /// Reports that a projectile struck a tank that survived the hit.
    TankDamaged {
        /// Tank that was hit.
        tank: TankId,
        /// Hit points remaining after the hit.
        hit_points: u32,
    },
    /// Reports that a tank was destroyed and sent back to its start pose.
    TankDestroyed {
        /// Tank that was destroyed.
        tank: TankId,
    },
    /// Reports that a destructible box absorbed a hit.
    BoxDamaged {
        /// Cell occupied by the box.
        cell: CellCoord,
        /// Hit points remaining after the hit.
        hit_points: u32,
    },
    /// Reports that a destructible box was removed and its cell became grass.
    BoxDestroyed {
        /// Cell previously occupied by the box.
        cell: CellCoord,
    },
    /// Reports that a tank shoved a metal box into the neighbouring cell.
    BoxPushed {
        /// Cell the box left; it is grass afterwards.
        from: CellCoord,
        /// Cell the box now occupies.
        to: CellCoord,
    },
    /// Confirms that a tank picked up the flag.
    FlagGrabbed {
        /// Tank now carrying the flag.
        tank: TankId,
    },
    /// Confirms that a tank carried the flag back to its base.
    FlagCaptured {
        /// Tank that scored.
        tank: TankId,
        /// Score of the tank after the capture.
        score: u32,
    },
    /// Announces that tanks, boxes and the flag returned to their start state.
    RoundReset,
}

/// Unique identifier assigned to a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TankId(u32);

impl TankId {
    /// Creates a new tank identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an entry in the world's object registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single map cell expressed as integer coordinates.
///
/// Coordinates are signed so that neighbours of border cells and truncated
/// positions outside the map stay representable; such cells are simply
/// reported as out of bounds by [`GridView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell containing the provided continuous position.
    ///
    /// Components are truncated toward zero.
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self::new(position.x as i32, position.y as i32)
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Continuous position of the cell centre.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Returns the cell displaced by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether the two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Terrain occupying a map cell, keyed by the integer code used in map files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Terrain {
    /// Open ground.
    Grass = 0,
    /// Wooden box that can be shot to pieces.
    WoodBox = 1,
    /// Stone tile; a terrain alias that never blocks.
    Stone = 2,
    /// Metal box that shrugs off projectiles.
    MetalBox = 3,
}

impl Terrain {
    /// Decodes a map-file terrain code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Grass),
            1 => Some(Self::WoodBox),
            2 => Some(Self::Stone),
            3 => Some(Self::MetalBox),
            _ => None,
        }
    }

    /// Map-file code of the terrain.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether projectiles can destroy the terrain.
    #[must_use]
    pub const fn is_destructible(self) -> bool {
        matches!(self, Self::WoodBox)
    }

    /// Whether the terrain is backed by a physical box body.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::WoodBox | Self::MetalBox)
    }
}

/// Position and heading of a body.
///
/// A heading of zero faces `+y`; increasing the heading rotates the facing
/// toward `-x`, so the facing vector is `(-sin h, cos h)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Continuous position in map units.
    pub position: Vec2,
    /// Heading in radians.
    pub heading: f32,
}

impl Pose {
    /// Creates a new pose.
    #[must_use]
    pub const fn new(position: Vec2, heading: f32) -> Self {
        Self { position, heading }
    }

    /// Unit vector the body is facing.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        Vec2::new(-self.heading.sin(), self.heading.cos())
    }

    /// Point located `distance` units ahead of the body.
    #[must_use]
    pub fn ahead(&self, distance: f32) -> Vec2 {
        self.position + self.forward() * distance
    }
}

/// Immutable representation of a single tank used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankSnapshot {
    /// Unique identifier assigned to the tank.
    pub id: TankId,
    /// Current pose of the tank body.
    pub pose: Pose,
    /// Pose the tank spawns at; its position doubles as the home base.
    pub start: Pose,
    /// Whether the tank currently carries the flag.
    pub carrying_flag: bool,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Whether a `Fire` command would spawn a projectile right now.
    pub weapon_ready: bool,
}

/// Read-only snapshot describing all tanks in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct TankView {
    snapshots: Vec<TankSnapshot>,
}

impl TankView {
    /// Creates a new tank view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TankSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tank snapshots ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &TankSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the tank with the provided identifier.
    #[must_use]
    pub fn get(&self, tank: TankId) -> Option<&TankSnapshot> {
        self.snapshots
            .binary_search_by_key(&tank, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }
}

/// Read-only view into the live terrain grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Terrain],
    width: u32,
    height: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Terrain], width: u32, height: u32) -> Self {
        Self {
            cells,
            width,
            height,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Terrain at the provided cell, or `None` when the cell lies outside the grid.
    #[must_use]
    pub fn terrain_at(&self, cell: CellCoord) -> Option<Terrain> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Whether the cell lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Dense row-major index of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        let x = u32::try_from(cell.x()).ok()?;
        let y = u32::try_from(cell.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(y).ok()?;
        let column = usize::try_from(x).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Number of cells covered by the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Kind of entity stored in the object registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// A box body of the given terrain.
    Box(Terrain),
    /// Home base of the given tank.
    Base(TankId),
    /// A tank body.
    Tank(TankId),
    /// The flag.
    Flag,
    /// A projectile fired by the given tank.
    Projectile(TankId),
    /// A short-lived explosion effect.
    Explosion,
}

/// Immutable representation of a single registry entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectSnapshot {
    /// Registry identifier.
    pub id: EntityId,
    /// Kind of the entity.
    pub kind: ObjectKind,
    /// Current position of the entity.
    pub position: Vec2,
}

/// Read-only snapshot of the object registry in insertion order.
///
/// Iteration order matches the order in which the world registered the
/// objects, so linear scans resolve deterministically.
#[derive(Clone, Debug, Default)]
pub struct ObjectView {
    snapshots: Vec<ObjectSnapshot>,
}

impl ObjectView {
    /// Creates a view that preserves the order of the provided snapshots.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<ObjectSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the registry entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectSnapshot> {
        self.snapshots.iter()
    }

    /// Entry with the provided identifier, if it is still registered.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&ObjectSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Owner of a collidable shape reported by a segment query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeOwner {
    /// The body of a tank.
    Tank(TankId),
    /// A box body of the given terrain.
    Box(Terrain),
    /// The wall enclosing the map.
    Boundary,
    /// A projectile in flight.
    Projectile(EntityId),
    /// A shape whose owner could not be resolved.
    Unknown,
}

/// Nearest intersection returned by [`SpatialQuery::segment_query_first`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
    /// Owner of the shape that was hit.
    pub owner: ShapeOwner,
    /// Point where the segment first touches the shape.
    pub point: Vec2,
}

/// Port over the physics engine used by sensing systems.
pub trait SpatialQuery {
    /// Casts a segment from `from` to `to` and returns the nearest hit.
    ///
    /// Shapes belonging to `ignore` are skipped.
    fn segment_query_first(&self, from: Vec2, to: Vec2, ignore: Option<TankId>)
        -> Option<SegmentHit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn from_position_truncates_toward_zero() {
        assert_eq!(
            CellCoord::from_position(Vec2::new(2.9, 0.1)),
            CellCoord::new(2, 0)
        );
        assert_eq!(
            CellCoord::from_position(Vec2::new(-0.5, 3.99)),
            CellCoord::new(0, 3)
        );
    }

    #[test]
    fn cell_center_is_offset_by_half() {
        assert_eq!(CellCoord::new(3, 1).center(), Vec2::new(3.5, 1.5));
    }

    #[test]
    fn terrain_codes_decode() {
        for code in 0..=3u8 {
            let terrain = Terrain::from_code(code).expect("known code");
            assert_eq!(terrain.code(), code);
        }
        assert_eq!(Terrain::from_code(4), None);
        assert!(Terrain::WoodBox.is_destructible());
        assert!(!Terrain::MetalBox.is_destructible());
        assert!(!Terrain::Stone.is_solid());
    }

    #[test]
    fn forward_follows_heading_convention() {
        let up = Pose::new(Vec2::ZERO, 0.0).forward();
        assert!((up - Vec2::new(0.0, 1.0)).length() < 1e-6);

        let left = Pose::new(Vec2::ZERO, FRAC_PI_2).forward();
        assert!((left - Vec2::new(-1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn grid_view_rejects_out_of_range_cells() {
        let cells = vec![Terrain::Grass; 6];
        let grid = GridView::new(&cells, 3, 2);

        assert_eq!(grid.terrain_at(CellCoord::new(2, 1)), Some(Terrain::Grass));
        assert_eq!(grid.terrain_at(CellCoord::new(3, 0)), None);
        assert_eq!(grid.terrain_at(CellCoord::new(0, 2)), None);
        assert_eq!(grid.terrain_at(CellCoord::new(-1, 0)), None);
        assert_eq!(grid.index(CellCoord::new(1, 1)), Some(4));
    }

    #[test]
    fn tank_view_lookup_is_sorted() {
        let snapshot = |id| TankSnapshot {
            id: TankId::new(id),
            pose: Pose::new(Vec2::ZERO, 0.0),
            start: Pose::new(Vec2::ZERO, 0.0),
            carrying_flag: false,
            hit_points: 2,
            weapon_ready: true,
        };
        let view = TankView::from_snapshots(vec![snapshot(3), snapshot(1), snapshot(2)]);

        let ids: Vec<_> = view.iter().map(|tank| tank.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(view.get(TankId::new(2)).map(|tank| tank.id), Some(TankId::new(2)));
        assert!(view.get(TankId::new(9)).is_none());
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_and_cells_round_trip_through_bincode() {
        assert_round_trip(&TankId::new(7));
        assert_round_trip(&EntityId::new(42));
        assert_round_trip(&CellCoord::new(-3, 9));
        assert_round_trip(&Terrain::MetalBox);
    }
}

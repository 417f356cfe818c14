#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tank decision cycle for AI-controlled tanks.
//!
//! Every call to [`TankAi::decide`] first lets the combat sensor fire at
//! whatever is in front of the tank and then resumes the movement cycle by
//! exactly one step. The cycle plans a route toward the current goal, drives
//! to the nearest cell of that route and replans; the place where it stopped
//! is kept in an explicit [`CycleState`].

use ctf_core::{
    CellCoord, Command, EntityId, GridView, ObjectKind, ObjectView, SpatialQuery, TankId,
    TankSnapshot,
};
use ctf_system_combat::{CombatSensor, SensorConfig};
use ctf_system_pathfinding::{PathPlanner, Route, TraversalPolicy};
use ctf_system_steering::{bearing_to, is_aligned, steer, Progress, ProgressTracker};
use glam::Vec2;
use tracing::{debug, trace};

/// Everything a tank may look at while deciding.
#[derive(Debug)]
pub struct DecisionContext<'a, S: ?Sized> {
    /// Snapshot of the controlled tank.
    pub tank: &'a TankSnapshot,
    /// Live terrain.
    pub grid: GridView<'a>,
    /// Object registry in insertion order.
    pub objects: &'a ObjectView,
    /// Physics queries for the combat sensor.
    pub spatial: &'a S,
}

/// Point at which the movement cycle resumes on the next decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleState {
    /// Recompute the grid position and plan a route to the goal.
    Replan,
    /// A fallback route allowing metal boxes was planned; use it or start over.
    AwaitFallback,
    /// Take the nearest cell off the route.
    PopWaypoint,
    /// A waypoint was chosen; start turning toward it.
    AfterPop {
        /// Centre of the waypoint cell.
        waypoint: Vec2,
    },
    /// Turning until the heading matches the bearing to the waypoint.
    Aligning {
        /// Centre of the waypoint cell.
        waypoint: Vec2,
        /// Heading observed when the angles were last sampled.
        heading: f32,
        /// Bearing to the waypoint when the angles were last sampled.
        target: f32,
    },
    /// Driving forward until the waypoint is passed.
    Advancing {
        /// Centre of the waypoint cell.
        waypoint: Vec2,
    },
}

/// Flag lookup state. Once resolved the entity is kept for the tank's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlagCache {
    /// No flag has been looked up yet.
    #[default]
    Unresolved,
    /// The flag found by the first registry scan.
    Resolved(EntityId),
}

/// Decision state of a single AI tank.
#[derive(Debug)]
pub struct TankAi {
    tank: TankId,
    grid_pos: CellCoord,
    route: Route,
    flag: FlagCache,
    tracker: ProgressTracker,
    state: CycleState,
    planner: PathPlanner,
    sensor: CombatSensor,
}

impl TankAi {
    /// Creates the decision state for the provided tank using the default sensor.
    #[must_use]
    pub fn new(tank: &TankSnapshot) -> Self {
        Self::with_sensor(tank, SensorConfig::default())
    }

    /// Creates the decision state with a custom sensor ray.
    #[must_use]
    pub fn with_sensor(tank: &TankSnapshot, sensor: SensorConfig) -> Self {
        Self {
            tank: tank.id,
            grid_pos: CellCoord::from_position(tank.pose.position),
            route: Route::default(),
            flag: FlagCache::Unresolved,
            tracker: ProgressTracker::default(),
            state: CycleState::Replan,
            planner: PathPlanner::default(),
            sensor: CombatSensor::new(sensor),
        }
    }

    /// Tank controlled by this state.
    #[must_use]
    pub const fn tank(&self) -> TankId {
        self.tank
    }

    /// Cell the tank occupied when the cycle last replanned.
    #[must_use]
    pub const fn grid_pos(&self) -> CellCoord {
        self.grid_pos
    }

    /// Remaining steps of the current route.
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// Current flag lookup state.
    #[must_use]
    pub const fn flag_cache(&self) -> FlagCache {
        self.flag
    }

    /// Point the cycle resumes from on the next decision.
    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// Runs one decision: fire if a target is ahead, then advance the movement
    /// cycle by one step. Commands are pushed to `out` for the caller to apply.
    pub fn decide<S>(&mut self, ctx: &DecisionContext<'_, S>, out: &mut Vec<Command>)
    where
        S: SpatialQuery + ?Sized,
    {
        let _ = self.sensor.maybe_shoot(ctx.tank, ctx.spatial, out);
        self.resume(ctx, out);
    }

    /// Advances the movement cycle to its next suspension point.
    pub fn resume<S>(&mut self, ctx: &DecisionContext<'_, S>, out: &mut Vec<Command>)
    where
        S: SpatialQuery + ?Sized,
    {
        let position = ctx.tank.pose.position;
        loop {
            match self.state {
                CycleState::Replan => {
                    self.replan(ctx);
                    if self.route.is_empty() {
                        self.transition(CycleState::AwaitFallback);
                        return;
                    }
                    self.transition(CycleState::PopWaypoint);
                }
                CycleState::AwaitFallback => {
                    if self.route.is_empty() {
                        self.transition(CycleState::Replan);
                    } else {
                        self.transition(CycleState::PopWaypoint);
                    }
                }
                CycleState::PopWaypoint => {
                    let Some(cell) = self.route.pop() else {
                        self.transition(CycleState::Replan);
                        return;
                    };
                    self.transition(CycleState::AfterPop {
                        waypoint: cell.center(),
                    });
                    return;
                }
                CycleState::AfterPop { waypoint } => {
                    let heading = ctx.tank.pose.heading;
                    let target = bearing_to(position, waypoint);
                    let _ = steer(self.tank, heading, target, out);
                    self.transition(CycleState::Aligning {
                        waypoint,
                        heading,
                        target,
                    });
                }
                CycleState::Aligning {
                    waypoint,
                    heading,
                    target,
                } => {
                    if is_aligned(self.tank, target, heading, out) {
                        out.push(Command::Accelerate { tank: self.tank });
                        self.transition(CycleState::Advancing { waypoint });
                        continue;
                    }
                    self.state = CycleState::Aligning {
                        waypoint,
                        heading: ctx.tank.pose.heading,
                        target: bearing_to(position, waypoint),
                    };
                    return;
                }
                CycleState::Advancing { waypoint } => {
                    if self.tracker.sample(position, waypoint) == Progress::Overshot {
                        self.transition(CycleState::Replan);
                    }
                    return;
                }
            }
        }
    }

    fn replan<S>(&mut self, ctx: &DecisionContext<'_, S>)
    where
        S: ?Sized,
    {
        self.grid_pos = CellCoord::from_position(ctx.tank.pose.position);
        let Some(goal) = self.goal(ctx.tank, ctx.objects) else {
            self.route = Route::default();
            return;
        };

        if goal == self.grid_pos {
            self.route = Route::single(goal);
            return;
        }

        self.route =
            self.planner
                .find_shortest_path(ctx.grid, self.grid_pos, goal, TraversalPolicy::Strict);
        if self.route.is_empty() {
            self.route = self.planner.find_shortest_path(
                ctx.grid,
                self.grid_pos,
                goal,
                TraversalPolicy::AllowMetalBox,
            );
            debug!(
                tank = self.tank.get(),
                goal_x = goal.x(),
                goal_y = goal.y(),
                steps = self.route.len(),
                "planned fallback route through metal boxes"
            );
        }
    }

    /// Home cell while carrying the flag, the flag's cell otherwise.
    fn goal(&mut self, tank: &TankSnapshot, objects: &ObjectView) -> Option<CellCoord> {
        if tank.carrying_flag {
            return Some(CellCoord::from_position(tank.start.position));
        }

        let flag = match self.flag {
            FlagCache::Resolved(flag) => flag,
            FlagCache::Unresolved => {
                let flag = objects
                    .iter()
                    .find(|object| object.kind == ObjectKind::Flag)?
                    .id;
                self.flag = FlagCache::Resolved(flag);
                flag
            }
        };

        objects
            .get(flag)
            .map(|object| CellCoord::from_position(object.position))
    }

    fn transition(&mut self, next: CycleState) {
        trace!(tank = self.tank.get(), from = ?self.state, to = ?next, "cycle transition");
        self.state = next;
    }
}

//! Headless match loop wiring the world to one AI per tank.

use std::time::Duration;

use ctf_core::{Command, Event};
use ctf_system_tank_ai::{DecisionContext, TankAi};
use ctf_world::{apply, query, World};
use serde::Serialize;
use tracing::info;

/// Final score of a single tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct TankScore {
    pub(crate) tank: u32,
    pub(crate) score: u32,
}

/// Summary of a finished match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct MatchReport {
    pub(crate) ticks: u64,
    pub(crate) captures: u32,
    pub(crate) shots: u32,
    pub(crate) tanks_destroyed: u32,
    pub(crate) boxes_destroyed: u32,
    pub(crate) scores: Vec<TankScore>,
}

impl MatchReport {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => self.ticks += 1,
                Event::FlagCaptured { tank, score } => {
                    self.captures += 1;
                    info!(tank = tank.get(), score, tick = self.ticks, "capture");
                }
                Event::ProjectileFired { .. } => self.shots += 1,
                Event::TankDestroyed { .. } => self.tanks_destroyed += 1,
                Event::BoxDestroyed { .. } => self.boxes_destroyed += 1,
                Event::TankDamaged { .. }
                | Event::BoxDamaged { .. }
                | Event::BoxPushed { .. }
                | Event::FlagGrabbed { .. }
                | Event::RoundReset => {}
            }
        }
    }
}

/// Runs `ticks` ticks of `dt`, letting every tank's AI decide once per tick
/// in tank order.
pub(crate) fn run_match(world: &mut World, ticks: u64, dt: Duration) -> MatchReport {
    let mut ais: Vec<TankAi> = query::tank_view(world).iter().map(TankAi::new).collect();
    let mut report = MatchReport::default();
    let mut events = Vec::new();
    let mut commands = Vec::new();

    for _ in 0..ticks {
        apply(world, Command::Tick { dt }, &mut events);

        for ai in &mut ais {
            let Some(tank) = query::tank(world, ai.tank()) else {
                continue;
            };
            let objects = query::object_view(world);
            let ctx = DecisionContext {
                tank: &tank,
                grid: query::grid_view(world),
                objects: &objects,
                spatial: &*world,
            };
            ai.decide(&ctx, &mut commands);
            for command in commands.drain(..) {
                apply(world, command, &mut events);
            }
        }

        report.record(&events);
        events.clear();
    }

    report.scores = query::scores(world)
        .into_iter()
        .map(|(tank, score)| TankScore {
            tank: tank.get(),
            score,
        })
        .collect();
    report
}

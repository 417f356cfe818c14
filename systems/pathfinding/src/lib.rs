#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first path planner over the terrain grid.
//!
//! Plans are unweighted: every step between edge-adjacent cells costs the
//! same, so the first route found is a shortest one. Which terrain may be
//! crossed is decided by a [`TraversalPolicy`].

use std::collections::VecDeque;

use ctf_core::{CellCoord, GridView, Terrain};

/// Neighbour expansion order. Ties between equally short routes resolve by it.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Terrain a route is allowed to cross.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalPolicy {
    /// Grass, wood boxes and stone.
    Strict,
    /// Everything [`TraversalPolicy::Strict`] permits plus metal boxes.
    AllowMetalBox,
}

impl TraversalPolicy {
    /// Whether a cell of the given terrain may be entered.
    #[must_use]
    pub const fn permits(self, terrain: Terrain) -> bool {
        match terrain {
            Terrain::Grass | Terrain::WoodBox | Terrain::Stone => true,
            Terrain::MetalBox => matches!(self, Self::AllowMetalBox),
        }
    }
}

/// Planned sequence of cells, stored goal-first so that [`Route::pop`] yields
/// the nearest step.
///
/// The start cell is never part of a route. An empty route means no path was
/// found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    cells: Vec<CellCoord>,
}

impl Route {
    /// Route consisting of the single provided cell.
    #[must_use]
    pub fn single(cell: CellCoord) -> Self {
        Self { cells: vec![cell] }
    }

    /// Builds a route from cells listed nearest-first.
    #[must_use]
    pub fn from_steps(steps: impl IntoIterator<Item = CellCoord>) -> Self {
        let mut cells: Vec<CellCoord> = steps.into_iter().collect();
        cells.reverse();
        Self { cells }
    }

    /// Removes and returns the nearest remaining step.
    pub fn pop(&mut self) -> Option<CellCoord> {
        self.cells.pop()
    }

    /// Nearest remaining step without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Final cell of the route.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Number of remaining steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no step remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Remaining steps, nearest first.
    pub fn steps(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().rev().copied()
    }
}

/// Breadth-first planner that reuses its scratch buffers between calls.
#[derive(Debug, Default)]
pub struct PathPlanner {
    visited: Vec<bool>,
    predecessors: Vec<Option<CellCoord>>,
    queue: VecDeque<CellCoord>,
}

impl PathPlanner {
    /// Finds a shortest 4-connected route from `start` to `goal`.
    ///
    /// Returns an empty route when the goal cannot be reached under `policy`
    /// or when `start == goal`. The start cell itself is never checked
    /// against the policy.
    pub fn find_shortest_path(
        &mut self,
        grid: GridView<'_>,
        start: CellCoord,
        goal: CellCoord,
        policy: TraversalPolicy,
    ) -> Route {
        if start == goal {
            return Route::default();
        }
        let Some(start_index) = grid.index(start) else {
            return Route::default();
        };
        if !grid.contains(goal) {
            return Route::default();
        }

        self.reset(grid.cell_count());
        self.visited[start_index] = true;
        self.queue.push_back(start);

        while let Some(cell) = self.queue.pop_front() {
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let neighbor = cell.offset(dx, dy);
                let Some(index) = grid.index(neighbor) else {
                    continue;
                };
                if self.visited[index] {
                    continue;
                }
                if !grid
                    .terrain_at(neighbor)
                    .is_some_and(|terrain| policy.permits(terrain))
                {
                    continue;
                }

                self.visited[index] = true;
                self.predecessors[index] = Some(cell);
                if neighbor == goal {
                    return self.reconstruct(grid, start, goal);
                }
                self.queue.push_back(neighbor);
            }
        }

        Route::default()
    }

    fn reset(&mut self, cell_count: usize) {
        self.visited.clear();
        self.visited.resize(cell_count, false);
        self.predecessors.clear();
        self.predecessors.resize(cell_count, None);
        self.queue.clear();
    }

    fn reconstruct(&self, grid: GridView<'_>, start: CellCoord, goal: CellCoord) -> Route {
        let mut cells = Vec::new();
        let mut current = goal;
        while current != start {
            cells.push(current);
            let Some(previous) = grid
                .index(current)
                .and_then(|index| self.predecessors[index])
            else {
                return Route::default();
            };
            current = previous;
        }
        Route { cells }
    }
}

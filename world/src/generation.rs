//! Seeded random map generation.

use std::f32::consts::PI;

use ctf_core::{CellCoord, GridView, Pose, Terrain};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{GridMap, MapError};

const WOOD_BOX_CHANCE: f32 = 0.12;
const STONE_CHANCE: f32 = 0.05;
const METAL_BOX_CHANCE: f32 = 0.05;

/// Largest number of tanks a generated map hosts, one per corner.
pub const MAX_TANKS: usize = 4;

/// Longest side of a generated map.
pub const MAX_SIDE: u32 = 1024;

/// Generates a deterministic map from `seed`.
///
/// Tanks start in the corners facing into the map and the flag sits in the
/// central cell. Start and flag cells are always grass. `tanks` is clamped to
/// `1..=MAX_TANKS`.
pub fn generate(width: u32, height: u32, tanks: usize, seed: u64) -> Result<GridMap, MapError> {
    if width < 3 || height < 3 {
        return Err(MapError::TooSmall { width, height });
    }
    if width > MAX_SIDE || height > MAX_SIDE {
        return Err(MapError::TooLarge { width, height });
    }

    let too_large = || MapError::TooLarge { width, height };
    let right = i32::try_from(width - 1).map_err(|_| too_large())?;
    let top = i32::try_from(height - 1).map_err(|_| too_large())?;
    let cell_count = usize::try_from(width)
        .ok()
        .zip(usize::try_from(height).ok())
        .and_then(|(columns, rows)| columns.checked_mul(rows))
        .ok_or_else(too_large)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut cells: Vec<Terrain> = (0..cell_count)
        .map(|_| roll_terrain(rng.gen::<f32>()))
        .collect();

    let corners = [
        (CellCoord::new(0, 0), 0.0),
        (CellCoord::new(right, top), PI),
        (CellCoord::new(right, 0), 0.0),
        (CellCoord::new(0, top), PI),
    ];
    let count = tanks.clamp(1, MAX_TANKS);
    let tank_starts: Vec<Pose> = corners
        .iter()
        .take(count)
        .map(|(cell, heading)| Pose::new(cell.center(), *heading))
        .collect();

    let flag_cell = CellCoord::new((right + 1) / 2, (top + 1) / 2);
    let cleared = corners
        .iter()
        .take(count)
        .map(|(cell, _)| *cell)
        .chain(std::iter::once(flag_cell));
    for cell in cleared {
        let index = GridView::new(&cells, width, height).index(cell);
        if let Some(index) = index {
            cells[index] = Terrain::Grass;
        }
    }

    GridMap::new(width, height, cells, tank_starts, flag_cell.center())
}

fn roll_terrain(roll: f32) -> Terrain {
    if roll < WOOD_BOX_CHANCE {
        Terrain::WoodBox
    } else if roll < WOOD_BOX_CHANCE + STONE_CHANCE {
        Terrain::Stone
    } else if roll < WOOD_BOX_CHANCE + STONE_CHANCE + METAL_BOX_CHANCE {
        Terrain::MetalBox
    } else {
        Terrain::Grass
    }
}

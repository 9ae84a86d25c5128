//! Seeded land-cover feed generator
//!
//! Lays a square grid of parcels over the plane. The outer ring of cells
//! lies outside the greenbelt; island blocks are aligned to cell edges so
//! every parcel is either fully on an island or only touches it.

use geo_types::{polygon, Polygon};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{LandCode, UnitId, ZoneId};
use crate::prepare::LandCoverFeed;
use crate::spatial::{Parcel, Zone};

const ISLAND_CODES: &[&str] = &[
    "111", "111", "111", "112", "112", "141", "121", "131", "132", "154", "331", "423",
];

const BELT_CODES: &[&str] = &[
    "211", "211", "212", "221", "221", "222", "231", "241", "251", "311", "321", "331", "411",
    "423", "623", "111",
];

#[derive(Debug, Clone)]
pub struct SyntheticParams {
    /// Cells per side
    pub grid: u32,
    pub islands: u32,
    pub cell_size: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            grid: 30,
            islands: 3,
            cell_size: 100.0,
            seed: 42,
        }
    }
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
}

/// Cell-aligned block of `side` cells starting at (`col`, `row`)
#[derive(Debug, Clone, Copy)]
struct Block {
    col: u32,
    row: u32,
    side: u32,
}

impl Block {
    fn contains(&self, col: u32, row: u32) -> bool {
        (self.col..self.col + self.side).contains(&col)
            && (self.row..self.row + self.side).contains(&row)
    }
}

fn pick(codes: &[&str], rng: &mut ChaCha8Rng) -> LandCode {
    LandCode::from(codes.choose(rng).copied().unwrap_or("111"))
}

pub fn generate_feed(params: &SyntheticParams) -> LandCoverFeed {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let grid = params.grid.max(4);
    let size = params.cell_size;
    let side = (grid / 6).max(2);

    let blocks: Vec<Block> = (0..params.islands)
        .map(|_| Block {
            col: rng.gen_range(1..grid - side),
            row: rng.gen_range(1..grid - side),
            side,
        })
        .collect();

    let islands = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| Zone {
            id: ZoneId(i as u32 + 1),
            boundary: rect(
                b.col as f64 * size,
                b.row as f64 * size,
                (b.col + b.side) as f64 * size,
                (b.row + b.side) as f64 * size,
            ),
        })
        .collect();

    let mut parcels = Vec::with_capacity((grid * grid) as usize);
    for row in 0..grid {
        for col in 0..grid {
            let on_island = blocks.iter().any(|b| b.contains(col, row));
            let code = if on_island {
                pick(ISLAND_CODES, &mut rng)
            } else {
                pick(BELT_CODES, &mut rng)
            };
            let x = col as f64 * size;
            let y = row as f64 * size;
            parcels.push(Parcel {
                id: UnitId(row * grid + col),
                code,
                geometry: rect(x, y, x + size, y + size),
            });
        }
    }

    let edge = (grid - 1) as f64 * size;
    tracing::info!(
        parcels = parcels.len(),
        islands = params.islands,
        seed = params.seed,
        "Generated synthetic feed"
    );

    LandCoverFeed {
        parcels,
        greenbelt: vec![rect(size, size, edge, edge)],
        islands,
    }
}

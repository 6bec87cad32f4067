#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use verletlist_rs::NeighborList;

pub const BOX_MIN: [f64; 3] = [-5.3; 3];
pub const BOX_MAX: [f64; 3] = [4.7; 3];
pub const RADIUS: f64 = 2.32;
pub const RATIO: f64 = 0.5;

/// Uniform random particles inside the test box, reproducible per seed.
pub fn random_cloud(n: usize, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(BOX_MIN[0]..BOX_MAX[0]),
                rng.gen_range(BOX_MIN[1]..BOX_MAX[1]),
                rng.gen_range(BOX_MIN[2]..BOX_MAX[2]),
            ]
        })
        .collect()
}

pub fn sorted_rows<L: NeighborList>(list: &L) -> Vec<Vec<usize>> {
    (0..list.num_particles())
        .map(|i| {
            let mut row: Vec<usize> = list.neighbors(i).collect();
            row.sort_unstable();
            row
        })
        .collect()
}

pub fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

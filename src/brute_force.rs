use crate::positions::PositionSource;
use std::ops::Range;

/// All-pairs reference search, O(N^2).
///
/// Returns one sorted row per particle; rows outside `targets` are empty.
/// With `half` set, a pair is kept only under its lower index.
pub fn brute_force_neighbors<P>(
    positions: &P,
    targets: Range<usize>,
    radius: f64,
    half: bool,
) -> Vec<Vec<usize>>
where
    P: PositionSource + ?Sized,
{
    let n = positions.len();
    let radius_sq = radius * radius;
    let mut rows = vec![Vec::new(); n];

    for i in targets {
        let pos_i = positions.position(i);
        let start = if half { i + 1 } else { 0 };
        for j in start..n {
            if j == i {
                continue;
            }
            let disp = positions.position(j) - pos_i;
            if disp.norm_squared() <= radius_sq {
                rows[i].push(j);
            }
        }
    }
    rows
}

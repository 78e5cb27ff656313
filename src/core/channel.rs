//! Connectivity-based isolation of the water body that belongs to the lake.
//!
//! A cumulative-cost transform runs over the inverted mask (water is free,
//! anything else costs one unit per metre) from the seed cells that are water.
//! Cells reached at zero cost are connected to the seed through water only.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::{LakeResult, Mask};

/// Parameters for channel extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelParams {
    /// Path length (metres) beyond which cells are unreachable
    pub max_distance_m: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            max_distance_m: 1000.0,
        }
    }
}

/// Priority-queue entry (min-heap on cost, then path length)
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    length: f64,
    row: usize,
    col: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.length.total_cmp(&self.length))
    }
}

/// 8-connected neighbour offsets with their step length in pixels
const NEIGHBORS: [(isize, isize, f64); 8] = [
    (-1, -1, std::f64::consts::SQRT_2),
    (-1, 0, 1.0),
    (-1, 1, std::f64::consts::SQRT_2),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (1, -1, std::f64::consts::SQRT_2),
    (1, 0, 1.0),
    (1, 1, std::f64::consts::SQRT_2),
];

/// Accumulated minimum cost from the nearest source cell.
///
/// `cost` is per metre; `None` cells are impassable. The step cost between two
/// cells is the mean of their costs times the step length. Cells whose path
/// from a source exceeds `max_distance_m`, or that cannot be reached, are `None`.
pub fn cumulative_cost(
    cost: &Array2<Option<f64>>,
    sources: &Array2<bool>,
    pixel_size: f64,
    max_distance_m: f64,
) -> Array2<Option<f64>> {
    let (rows, cols) = cost.dim();
    let mut dist = Array2::from_elem((rows, cols), f64::INFINITY);
    let mut length = Array2::from_elem((rows, cols), f64::INFINITY);
    let mut heap = BinaryHeap::new();

    for ((r, c), &is_source) in sources.indexed_iter() {
        if is_source && cost[[r, c]].is_some() {
            dist[[r, c]] = 0.0;
            length[[r, c]] = 0.0;
            heap.push(State { cost: 0.0, length: 0.0, row: r, col: c });
        }
    }

    while let Some(State { cost: acc, length: len, row, col }) = heap.pop() {
        if acc > dist[[row, col]] || (acc == dist[[row, col]] && len > length[[row, col]]) {
            continue;
        }
        let cost_here = match cost[[row, col]] {
            Some(v) => v,
            None => continue,
        };

        for &(dr, dc, step) in &NEIGHBORS {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            let cost_neighbor = match cost[[nr, nc]] {
                Some(v) if v >= 0.0 => v,
                _ => continue,
            };

            let step_m = step * pixel_size;
            let new_len = len + step_m;
            if new_len > max_distance_m {
                continue;
            }
            let new_cost = acc + (cost_here + cost_neighbor) / 2.0 * step_m;

            let better = new_cost < dist[[nr, nc]]
                || (new_cost == dist[[nr, nc]] && new_len < length[[nr, nc]]);
            if better {
                dist[[nr, nc]] = new_cost;
                length[[nr, nc]] = new_len;
                heap.push(State { cost: new_cost, length: new_len, row: nr, col: nc });
            }
        }
    }

    dist.mapv(|d| if d.is_finite() { Some(d) } else { None })
}

/// Keep only the part of `mask` connected through water to the seed.
///
/// Seeds are the cells where both `seed` and `mask` are true. Connected water
/// stays true, land stays false, and water that is not connected becomes no
/// data. Without any seed cell no water survives.
pub fn extract_channel(mask: &Mask, seed: &Mask, params: &ChannelParams) -> LakeResult<Mask> {
    let sources_mask = seed.and(mask)?;
    let sources = sources_mask.cells().mapv(|c| c == Some(true));
    let seed_count = sources.iter().filter(|s| **s).count();

    if seed_count == 0 {
        log::debug!("Channel seed does not overlap the mask; isolated mask is empty");
        return Ok(mask.map(|c| if c == Some(true) { None } else { c }));
    }

    let cost = mask
        .cells()
        .mapv(|c| c.map(|water| if water { 0.0 } else { 1.0 }));
    let dist = cumulative_cost(&cost, &sources, mask.grid().pixel_size(), params.max_distance_m);

    let cells = Array2::from_shape_fn(mask.dim(), |idx| match mask.cells()[idx] {
        Some(true) if dist[idx] == Some(0.0) => Some(true),
        Some(true) => None,
        other => other,
    });
    let isolated = mask.with_cells(cells);

    log::debug!(
        "Channel extraction: {} seed px, kept {} of {} water px",
        seed_count,
        isolated.count_true(),
        mask.count_true()
    );
    Ok(isolated)
}

//! Focal min/max (erosion/dilation) on tri-state masks.
//!
//! Neighbours outside the grid or without data are ignored; a cell without
//! data stays without data.

use ndarray::Array2;

use crate::types::{Mask, MaskCell};

/// Structuring kernel in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Cells whose centre lies within `radius` of the kernel centre
    Circle { radius: usize },
    Square { radius: usize },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Circle { radius: 1 }
    }
}

impl Kernel {
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let (r, circle) = match *self {
            Kernel::Circle { radius } => (radius as isize, true),
            Kernel::Square { radius } => (radius as isize, false),
        };
        let mut offsets = Vec::new();
        for di in -r..=r {
            for dj in -r..=r {
                if !circle || di * di + dj * dj <= r * r {
                    offsets.push((di, dj));
                }
            }
        }
        offsets
    }
}

fn focal(mask: &Mask, kernel: Kernel, iterations: usize, take_max: bool) -> Mask {
    let offsets = kernel.offsets();
    let mut result = mask.cells().clone();

    for _ in 0..iterations {
        let (height, width) = result.dim();
        let current = result;
        result = Array2::from_shape_fn((height, width), |(i, j)| -> MaskCell {
            current[[i, j]]?;
            let mut acc: Option<bool> = None;
            for &(di, dj) in &offsets {
                let ni = i as isize + di;
                let nj = j as isize + dj;
                if ni < 0 || nj < 0 || ni >= height as isize || nj >= width as isize {
                    continue;
                }
                if let Some(v) = current[[ni as usize, nj as usize]] {
                    acc = Some(match acc {
                        None => v,
                        Some(a) if take_max => a || v,
                        Some(a) => a && v,
                    });
                }
            }
            acc
        });
    }

    mask.with_cells(result)
}

/// Focal minimum
pub fn erode(mask: &Mask, kernel: Kernel, iterations: usize) -> Mask {
    focal(mask, kernel, iterations, false)
}

/// Focal maximum
pub fn dilate(mask: &Mask, kernel: Kernel, iterations: usize) -> Mask {
    focal(mask, kernel, iterations, true)
}

mod common;

use ndarray::Array2;

use common::*;
use lakearea::core::channel::{extract_channel, ChannelParams};
use lakearea::core::quality_flags::{Fmask, QualityFlags};
use lakearea::core::reconstruct::reconstruct_water;
use lakearea::core::shoreline::{estimate_threshold, FALLBACK_THRESHOLD};
use lakearea::{FillStatus, GeoTransform, GridSpec, Mask};

fn small_grid(n: usize) -> GridSpec {
    GridSpec {
        rows: n,
        cols: n,
        geo_transform: GeoTransform::north_up(0.0, 0.0, 30.0),
        crs: "EPSG:32610".to_string(),
    }
}

/// Deterministic mix of true, false and no-data cells
fn scrambled(grid: &GridSpec, salt: usize) -> Mask {
    Mask::from_fn(grid.clone(), |(i, j)| match (i * 7 + j * 13 + salt) % 5 {
        0 => None,
        1 | 2 => Some(true),
        _ => Some(false),
    })
}

#[test]
fn test_quality_categories_are_exclusive() {
    init_logging();
    let grid = small_grid(8);
    // every combination of bits 0-5
    let qa = Array2::from_shape_fn((8, 8), |(i, j)| Some((i * 8 + j) as u16));
    let flags = QualityFlags::decode(&qa, &grid).unwrap();

    let categories = [&flags.cloud, &flags.cloud_shadow, &flags.snow_ice, &flags.clear_water];
    for i in 0..8 {
        for j in 0..8 {
            let hits = categories.iter().filter(|m| m.is_true(i, j)).count();
            assert!(hits <= 1, "pixel ({}, {}) in {} categories", i, j, hits);
            if flags.fmask[[i, j]] == Some(Fmask::Clear) {
                assert!(!flags.obstruction.is_true(i, j));
            }
        }
    }
    let total: usize = categories.iter().map(|m| m.count_true()).sum();
    assert!(total <= 64);
    // bit 5 set in half of all words
    assert_eq!(flags.cloud.count_true(), 32);
}

#[test]
fn test_no_obstruction_keeps_visible_water() {
    let g = grid();
    let water = Mask::from_fn(g.clone(), |(i, j)| Some(is_lake(i, j) || is_pond(i, j)));
    let obstruction = Mask::filled(g.clone(), Some(false));
    let region = Mask::filled(g.clone(), Some(true));

    let recon = reconstruct_water(&water, &obstruction, &occurrence().data, &region).unwrap();
    assert_eq!(recon.reconstructed, water);
    assert_eq!(recon.fill_status(), FillStatus::Success);
}

#[test]
fn test_low_occurrence_under_cloud_is_not_filled() {
    let g = small_grid(12);
    let cloud = |i: usize, j: usize| i < 4 && (2..10).contains(&j);
    let lake = |i: usize, j: usize| (2..10).contains(&i) && (2..10).contains(&j);

    let water = Mask::from_fn(g.clone(), |(i, j)| Some(lake(i, j) && !cloud(i, j)));
    let obstruction = Mask::from_fn(g.clone(), |(i, j)| Some(cloud(i, j)));
    let region = Mask::filled(g.clone(), Some(true));
    let occurrence = Array2::from_shape_fn((12, 12), |(i, j)| {
        if cloud(i, j) {
            30.0
        } else if lake(i, j) {
            85.0
        } else {
            0.0
        }
    });

    let recon = reconstruct_water(&water, &obstruction, &occurrence, &region).unwrap();
    assert_eq!(recon.threshold(), 85.0);
    for i in 0..12 {
        for j in 0..12 {
            if cloud(i, j) {
                assert!(!recon.reconstructed.is_true(i, j));
            }
        }
    }
    assert_eq!(recon.reconstructed.count_true(), water.count_true());
}

#[test]
fn test_reconstruction_contains_water() {
    let g = small_grid(15);
    let occurrence = Array2::from_shape_fn((15, 15), |(i, j)| ((i * 11 + j * 5) % 100) as f32);
    let region = Mask::from_fn(g.clone(), |(i, _)| Some(i > 1));

    for salt in 0..4 {
        let water = scrambled(&g, salt);
        let obstruction = scrambled(&g, salt + 2);
        let recon = reconstruct_water(&water, &obstruction, &occurrence, &region).unwrap();
        assert_eq!(recon.reconstructed.or(&water).unwrap(), recon.reconstructed);
        assert!(water.is_subset_of(&recon.reconstructed));
    }
}

#[test]
fn test_isolation_never_adds_water() {
    let g = small_grid(15);
    let seed = Mask::from_fn(g.clone(), |(i, j)| Some((5..10).contains(&i) && (5..10).contains(&j)));
    for salt in 0..5 {
        let mask = scrambled(&g, salt);
        let isolated = extract_channel(&mask, &seed, &ChannelParams::default()).unwrap();
        assert_eq!(isolated.and_not(&mask).unwrap().count_true(), 0);
        assert!(isolated.is_subset_of(&mask));
    }
}

#[test]
fn test_shoreline_estimate_is_idempotent() {
    let g = grid();
    let water = Mask::from_fn(g.clone(), |(i, j)| Some(is_lake(i, j) && i >= 14));
    let obstruction = Mask::from_fn(g.clone(), |(i, j)| Some(is_lake(i, j) && i < 14));
    let region = Mask::filled(g, Some(true));
    let occ = occurrence().data;

    let first = estimate_threshold(&water, &obstruction, &occ, &region).unwrap();
    let second = estimate_threshold(&water, &obstruction, &occ, &region).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.threshold, 90.0);
}

#[test]
fn test_zero_shoreline_occurrence_falls_back() {
    let g = small_grid(10);
    let water = Mask::from_fn(g.clone(), |(i, j)| Some((3..7).contains(&i) && (3..7).contains(&j)));
    let obstruction = Mask::filled(g.clone(), Some(false));
    let region = Mask::filled(g, Some(true));
    let occ = Array2::zeros((10, 10));

    let estimate = estimate_threshold(&water, &obstruction, &occ, &region).unwrap();
    assert_eq!(estimate.status, FillStatus::Fail);
    assert_eq!(estimate.threshold, FALLBACK_THRESHOLD);
    assert_eq!(estimate.statistics.map(|s| s.count), Some(12));
}

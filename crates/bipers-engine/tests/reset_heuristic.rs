// crates/bipers-engine/tests/reset_heuristic.rs

//! The reset path must fire when a crossing is estimated to need more
//! transpositions than the threshold allows.

mod common;

use bipers_core::{CancelFlag, NoProgress};
use bipers_engine::{compute, query_barcodes, ComputationOptions};
use bipers_vineyard::UpdaterOptions;
use common::{default_params, h0_input, vertex};

/// 500 components born at each of two incomparable bigrades swap across a
/// single strict anchor: the vineyard estimate is ~250000 transpositions,
/// far above the pinned threshold, so the crossing must reset instead.
#[test]
fn reset_fires_when_estimate_exceeds_threshold() {
    let mut vertices = Vec::with_capacity(1000);
    for _ in 0..500 {
        vertices.push(vertex((0, 1)));
    }
    for _ in 0..500 {
        vertices.push(vertex((1, 0)));
    }
    let input = h0_input(&[0, 1], &[0, 1], vertices, vec![]);

    let options = ComputationOptions {
        updater: UpdaterOptions {
            threshold_override: Some(1000),
            calibration_min_ms: 1,
        },
    };
    let result = compute(
        input,
        &default_params(),
        &NoProgress,
        &CancelFlag::new(),
        &options,
    )
    .unwrap();

    assert_eq!(result.arrangement.num_faces(), 2);
    assert!(
        result.stats.resets >= 2,
        "at least one reset beyond the initial decomposition, got {}",
        result.stats.resets
    );
    assert_eq!(
        result.stats.transpositions, 0,
        "the reset path performs no single-column transpositions"
    );

    // Both cells still answer queries: 1000 essential classes everywhere.
    for query in [(30.0, 0.0), (60.0, 0.0)] {
        let barcodes = query_barcodes(&result, &[query]).unwrap();
        let total: u32 = barcodes[0].bars.iter().map(|b| b.multiplicity).sum();
        assert_eq!(total, 1000, "query {query:?}");
        assert!(barcodes[0].bars.iter().all(|b| b.death.is_infinite()));
    }
}

/// With a huge pinned threshold the same input takes the vineyard route and
/// actually performs the quadratic number of transpositions.
#[test]
fn vineyard_route_performs_the_transpositions() {
    let mut vertices = Vec::with_capacity(40);
    for _ in 0..20 {
        vertices.push(vertex((0, 1)));
    }
    for _ in 0..20 {
        vertices.push(vertex((1, 0)));
    }
    let input = h0_input(&[0, 1], &[0, 1], vertices, vec![]);

    let options = ComputationOptions {
        updater: UpdaterOptions {
            threshold_override: Some(u64::MAX),
            calibration_min_ms: 1,
        },
    };
    let result = compute(
        input,
        &default_params(),
        &NoProgress,
        &CancelFlag::new(),
        &options,
    )
    .unwrap();

    assert_eq!(result.stats.resets, 1, "initial decomposition only");
    assert_eq!(
        result.stats.transpositions,
        20 * 20,
        "block swap of 20 against 20 columns"
    );
}

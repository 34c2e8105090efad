// crates/bipers-engine/tests/persistence_roundtrip.rs

//! Persisted-format round trips on a real computation.

mod common;

use bipers_core::{CancelFlag, NoProgress};
use bipers_engine::{
    compute, query_barcodes, read_computation, result_from_messages, result_to_messages,
    write_computation, ComputationOptions,
};
use common::{default_params, edge, h0_input, vertex};
use std::io::Cursor;

#[test]
fn computation_survives_a_round_trip() -> anyhow::Result<()> {
    common::init_tracing();
    let input = h0_input(
        &[0, 1],
        &[0, 1],
        vec![vertex((0, 1)), vertex((1, 0))],
        vec![edge((1, 1), 0, 1)],
    );
    let params = default_params();
    let result = compute(
        input,
        &params,
        &NoProgress,
        &CancelFlag::new(),
        &ComputationOptions::default(),
    )?;

    let (template_points, arrangement) = result_to_messages(&result);
    let mut buffer = Vec::new();
    write_computation(&mut buffer, &params, &template_points, &arrangement)?;

    let mut cursor = Cursor::new(buffer);
    let (params_back, tpm_back, am_back) = read_computation(&mut cursor)?;
    assert_eq!(params, params_back);
    assert_eq!(template_points, tpm_back);
    assert_eq!(arrangement, am_back);

    // The rebuilt arrangement is structurally sound and answers queries
    // identically.
    let restored = result_from_messages(tpm_back, &am_back)?;
    restored.arrangement.validate()?;
    assert_eq!(
        restored.arrangement.num_faces(),
        result.arrangement.num_faces()
    );

    for query in [(0.0, 0.5), (0.0, 1.5), (45.0, 0.0), (90.0, -0.5)] {
        let original = query_barcodes(&result, &[query])?;
        let rebuilt = query_barcodes(&restored, &[query])?;
        assert_eq!(original, rebuilt, "query {query:?}");
    }
    Ok(())
}

#[test]
fn rewriting_a_restored_computation_is_stable() {
    let input = h0_input(
        &[0, 1],
        &[0, 1],
        vec![vertex((0, 0)), vertex((0, 0))],
        vec![edge((1, 1), 0, 1)],
    );
    let params = default_params();
    let result = compute(
        input,
        &params,
        &NoProgress,
        &CancelFlag::new(),
        &ComputationOptions::default(),
    )
    .unwrap();

    let (tpm, am) = result_to_messages(&result);
    let mut first = Vec::new();
    write_computation(&mut first, &params, &tpm, &am).unwrap();

    let (p2, tpm2, am2) = read_computation(&mut Cursor::new(first.clone())).unwrap();
    let mut second = Vec::new();
    write_computation(&mut second, &p2, &tpm2, &am2).unwrap();
    assert_eq!(first, second, "write → read → write is byte-stable");
}

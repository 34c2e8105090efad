// crates/bipers-engine/tests/common/mod.rs

//! Shared fixtures for the end-to-end tests.

use bipers_core::{exact_int, Bigrade, Exact, InputParameters};
use bipers_presentation::{FirepInput, InputColumn};

/// Route engine tracing through the test harness; safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn grades(values: &[i64]) -> Vec<Exact> {
    values.iter().map(|&v| exact_int(v)).collect()
}

pub fn vertex(grade: (u32, u32)) -> InputColumn {
    InputColumn {
        grade: Bigrade::new(grade.0, grade.1),
        entries: vec![],
    }
}

pub fn edge(grade: (u32, u32), a: u32, b: u32) -> InputColumn {
    InputColumn {
        grade: Bigrade::new(grade.0, grade.1),
        entries: vec![a, b],
    }
}

/// Degree-0 input: vertices are the mid simplices, edges the high ones.
pub fn h0_input(
    xs: &[i64],
    ys: &[i64],
    vertices: Vec<InputColumn>,
    edges: Vec<InputColumn>,
) -> FirepInput {
    FirepInput {
        x_label: "x".into(),
        y_label: "y".into(),
        xs: grades(xs),
        ys: grades(ys),
        num_high: edges.len() as u32,
        num_mid: vertices.len() as u32,
        num_low: 0,
        high_columns: edges,
        low_columns: vertices,
    }
}

pub fn default_params() -> InputParameters {
    InputParameters::default()
}

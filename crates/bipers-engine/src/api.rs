// crates/bipers-engine/src/api.rs

//! Query surface over a finished computation.

use crate::computation::ComputationResult;
use bipers_arrangement::{Barcode, FaceId};
use bipers_core::Result;

/// Locate the cell answering one `(angle°, offset)` query.
///
/// # Errors
/// [`bipers_core::Error::Query`] for an angle outside `[0, 90]` or a failed
/// point-location walk.
pub fn face_for_query(result: &ComputationResult, angle: f64, offset: f64) -> Result<FaceId> {
    result.arrangement.face_for_query(angle, offset)
}

/// Rescale the barcode template of each query's cell into numeric bars.
///
/// Queries landing in the same cell share a template by construction; their
/// barcodes differ only in endpoint values.
///
/// # Errors
/// [`bipers_core::Error::Query`] on a malformed query.
pub fn query_barcodes(
    result: &ComputationResult,
    queries: &[(f64, f64)],
) -> Result<Vec<Barcode>> {
    let mut barcodes = Vec::with_capacity(queries.len());
    for &(angle, offset) in queries {
        let face = face_for_query(result, angle, offset)?;
        let template = result.arrangement.barcode(face);
        barcodes.push(template.rescale(
            angle,
            offset,
            &result.template_points,
            &result.arrangement.x_grades,
            &result.arrangement.y_grades,
        )?);
    }
    Ok(barcodes)
}

// crates/bipers-engine/src/computation.rs

//! Stage-by-stage pipeline: normalise, present, build, plan, traverse.

use bipers_arrangement::{build_interior_cancellable, Arrangement, HalfedgeId};
use bipers_core::{
    CancelFlag, Exact, InputParameters, Progress, Result, TemplatePoint, UnsignedMatrix,
};
use bipers_presentation::{BettiNumbers, Firep, FirepInput, Presentation};
use bipers_scheduler::find_path;
use bipers_vineyard::{Updater, UpdaterOptions, UpdaterStats};
use tracing::{debug, info};

/// Engine-level tuning; forwarded to the persistence updater.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputationOptions {
    pub updater: UpdaterOptions,
}

/// Everything the core computes: the arrangement with its per-cell barcode
/// templates plus the self-contained metadata needed to answer queries.
#[derive(Clone, Debug)]
pub struct ComputationResult {
    pub arrangement: Arrangement,
    pub template_points: Vec<TemplatePoint>,
    pub homology_dimensions: UnsignedMatrix,
    pub xs_exact: Vec<Exact>,
    pub ys_exact: Vec<Exact>,
    pub x_label: String,
    pub y_label: String,
    pub x_reverse: bool,
    pub y_reverse: bool,
    pub stats: UpdaterStats,
}

/// Run the whole pipeline.
///
/// # Errors
/// Any of the error kinds: `Input` for malformed data, `Cancelled` when the
/// flag is observed at a poll point, `Invariant` for internal bugs.
pub fn compute(
    input: FirepInput,
    params: &InputParameters,
    progress: &dyn Progress,
    cancel: &CancelFlag,
    options: &ComputationOptions,
) -> Result<ComputationResult> {
    let x_reverse = params.x_reverse;
    let y_reverse = params.y_reverse;

    // S1: normalise the free implicit representation.
    let mut firep = Firep::from_input(input, params)?;
    progress.advance_stage();
    cancel.check()?;

    // S2: minimal presentation, Betti numbers, Hilbert function.
    let mut presentation = Presentation::new(&mut firep, progress, cancel)?;
    presentation.minimize()?;
    let betti = BettiNumbers::from_presentation(&presentation)?;
    let mut template_points = betti.support_points();
    info!(
        support = template_points.len(),
        "Betti support computed"
    );
    progress.advance_stage();
    cancel.check()?;

    let Presentation {
        mat,
        col_ind,
        row_ind,
        hom_dims,
        ..
    } = presentation;
    let pres_firep = Firep::from_presentation(
        mat,
        col_ind,
        &row_ind,
        firep.xs.clone(),
        firep.ys.clone(),
        firep.x_label.clone(),
        firep.y_label.clone(),
        firep.hom_degree,
    );

    // S3 + S4: anchors and the arrangement.
    let mut arrangement = Arrangement::with_frame(firep.xs.clone(), firep.ys.clone());
    let (mut updater, anchors) = Updater::new(&pres_firep, &mut template_points);
    arrangement.set_anchors(anchors);
    build_interior_cancellable(&mut arrangement, cancel)?;
    arrangement.validate()?;
    debug!(
        faces = arrangement.num_faces(),
        anchors = arrangement.anchors.len(),
        "arrangement built"
    );
    progress.advance_stage();
    cancel.check()?;

    // S5: anchor weights by dry run, then the spanning-tree path.
    let weave = weave_path(&arrangement)?;
    updater.set_anchor_weights(&mut arrangement, &weave)?;
    updater.clear_levelsets();
    let path = find_path(&arrangement)?;
    progress.advance_stage();
    progress.set_max(path.len() as u32);
    cancel.check()?;

    // S6 + S7: barcode templates into every cell.
    let stats =
        updater.store_barcodes_with_reset(&mut arrangement, &path, progress, cancel, &options.updater)?;

    Ok(ComputationResult {
        arrangement,
        template_points,
        homology_dimensions: hom_dims,
        xs_exact: firep.xs,
        ys_exact: firep.ys,
        x_label: firep.x_label,
        y_label: firep.y_label,
        x_reverse,
        y_reverse,
        stats,
    })
}

/// A path from the top-right corner that crosses every anchor line exactly
/// once, used to estimate edge weights before planning the real traversal.
fn weave_path(arrangement: &Arrangement) -> Result<Vec<HalfedgeId>> {
    let mut path = Vec::new();
    let mut cur_edge = arrangement.topright;
    while arrangement.he(cur_edge).twin != arrangement.bottomright {
        cur_edge = arrangement.next_of(cur_edge)?;
        loop {
            let twin = arrangement.he(cur_edge).twin;
            if arrangement.he(twin).face.is_none() {
                break;
            }
            cur_edge = twin;
            path.push(cur_edge);
            cur_edge = arrangement.next_of(cur_edge)?;
        }
    }
    Ok(path)
}

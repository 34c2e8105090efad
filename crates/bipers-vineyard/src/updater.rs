// crates/bipers-vineyard/src/updater.rs

//! The persistence updater: initial RU-decomposition under the rightmost
//! line order, vineyard transpositions per anchor crossing, and the
//! rebuild-from-pristine reset path with its self-tuning threshold.

use crate::grid::{EntryId, TemplatePointsGrid};
use bipers_arrangement::{
    Anchor, Arrangement, BarcodeTemplate, FaceId, HalfedgeId, INFINITE_INDEX,
};
use bipers_core::{CancelFlag, Error, Progress, Result, TemplatePoint};
use bipers_matrix::{PermMatrix, RowPriorityMatrix};
use bipers_presentation::Firep;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info, trace};

/// Tuning knobs; the override pins the reset threshold for tests.
#[derive(Clone, Copy, Debug)]
pub struct UpdaterOptions {
    pub threshold_override: Option<u64>,
    /// Minimum duration of the initial calibration walk, in milliseconds.
    pub calibration_min_ms: u64,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        Self {
            threshold_override: None,
            calibration_min_ms: 100,
        }
    }
}

/// Counters reported after the traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdaterStats {
    pub transpositions: u64,
    pub resets: u32,
    pub final_threshold: u64,
}

/// Walks the arrangement path maintaining `D = R·U` for both boundary
/// matrices, reading a barcode template off the decomposition in every
/// newly-entered cell.
pub struct Updater<'a> {
    firep: &'a Firep,
    grid: TemplatePointsGrid,
    anchor_entries: HashMap<(u32, u32), EntryId>,

    lift_low: BTreeMap<u32, EntryId>,
    lift_high: BTreeMap<u32, EntryId>,

    perm_low: Vec<u32>,
    inv_perm_low: Vec<u32>,
    perm_high: Vec<u32>,
    inv_perm_high: Vec<u32>,

    r_low: PermMatrix,
    r_high: PermMatrix,
    u_low: RowPriorityMatrix,
    u_high: RowPriorityMatrix,
}

impl<'a> Updater<'a> {
    /// Build the template-point grid, discover the anchors, and hand back the
    /// anchor records for the arrangement.
    pub fn new(firep: &'a Firep, template_points: &mut Vec<TemplatePoint>) -> (Self, Vec<Anchor>) {
        let grid_x = firep.low.ind.width();
        let grid_y = firep.low.ind.height();
        let (grid, anchor_grades) =
            TemplatePointsGrid::fill_and_find_anchors(grid_x, grid_y, template_points);

        let mut anchor_entries = HashMap::with_capacity(anchor_grades.len());
        for &(x, y) in &anchor_grades {
            if let Some(entry) = grid.entry_at(x, y) {
                anchor_entries.insert((x, y), entry);
            }
        }
        let anchors = anchor_grades
            .iter()
            .map(|&(x, y)| Anchor::new(x, y))
            .collect();

        let updater = Self {
            firep,
            grid,
            anchor_entries,
            lift_low: BTreeMap::new(),
            lift_high: BTreeMap::new(),
            perm_low: Vec::new(),
            inv_perm_low: Vec::new(),
            perm_high: Vec::new(),
            inv_perm_high: Vec::new(),
            r_low: PermMatrix::new(0, 0),
            r_high: PermMatrix::new(0, 0),
            u_low: RowPriorityMatrix::identity(0),
            u_high: RowPriorityMatrix::identity(0),
        };
        (updater, anchors)
    }

    // ------------------------------------------------------------------
    // Level sets and the initial simplex order
    // ------------------------------------------------------------------

    /// Map every multigrade to its equivalence class under the lift induced
    /// by the rightmost line order, walking the staircase frontier of grid
    /// entries top to bottom.
    fn store_multigrades(&mut self, low: bool) {
        let firep = self.firep;
        let ind = if low { &firep.low.ind } else { &firep.high.ind };
        let width = ind.width();
        let height = ind.height();

        let mut frontier: Vec<EntryId> = Vec::new();
        for y in (0..height).rev() {
            if let Some(cur) = self.grid.rows[y as usize] {
                if let Some(&last) = frontier.last() {
                    if self.grid.entries[last].x == self.grid.entries[cur].x {
                        frontier.pop();
                    }
                }
                frontier.push(cur);
            }

            for x in (0..width).rev() {
                let last_col = ind.get(y, x);
                let first_col = if x > 0 {
                    ind.get(y, x - 1)
                } else if y > 0 {
                    ind.get(y - 1, width - 1)
                } else {
                    -1
                };
                if last_col <= first_col || frontier.is_empty() {
                    continue;
                }
                if x > self.grid.entries[frontier[0]].x {
                    continue;
                }
                // Last frontier entry with x-grade at least x.
                let mut k = 0;
                while k < frontier.len() && self.grid.entries[frontier[k]].x >= x {
                    k += 1;
                }
                let target = frontier[k - 1];
                self.grid.entries[target].add_multigrade(
                    x,
                    y,
                    (last_col - first_col) as u32,
                    last_col,
                    low,
                );
            }
        }
    }

    /// Assign order indices to all mapped simplices, top class last, and
    /// register the classes in the lift map. Returns the number of mapped
    /// simplices and the dimension-index → order-index map (-1 = excluded).
    fn build_simplex_order(&mut self, low: bool) -> (u32, Vec<i64>) {
        let firep = self.firep;
        let ind = if low { &firep.low.ind } else { &firep.high.ind };
        let height = ind.height();
        let total_cols = (ind.last() + 1).max(0) as usize;
        let mut order = vec![-1i64; total_cols];

        let mut num_simplices: u32 = 0;
        for y in 0..height {
            if let Some(e) = self.grid.rows[y as usize] {
                let entry = &self.grid.entries[e];
                let list = if low {
                    &entry.low_simplices
                } else {
                    &entry.high_simplices
                };
                num_simplices += list.iter().map(|mg| mg.num_cols).sum::<u32>();
            }
        }

        let mut o_index = i64::from(num_simplices) - 1;
        for y in (0..height).rev() {
            let Some(e) = self.grid.rows[y as usize] else {
                continue;
            };
            let class_end = o_index;
            {
                let entry = &mut self.grid.entries[e];
                if low {
                    entry.low_index = class_end;
                } else {
                    entry.high_index = class_end;
                }
                let list = if low {
                    &mut entry.low_simplices
                } else {
                    &mut entry.high_simplices
                };
                list.sort_by(|a, b| a.lex_desc(b));
                for mg in list.iter() {
                    for s in 0..mg.num_cols {
                        order[(mg.simplex_index - i64::from(s)) as usize] = o_index;
                        o_index -= 1;
                    }
                }
            }
            if class_end != o_index {
                let lift = if low {
                    &mut self.lift_low
                } else {
                    &mut self.lift_high
                };
                lift.insert(class_end as u32, e);
            }
        }
        (num_simplices, order)
    }

    /// Build `R_low`/`R_high` from the boundary columns, permuted into the
    /// initial order, and reset the permutation vectors to the identity.
    fn build_matrices(
        &mut self,
        low_order: &[i64],
        num_low: u32,
        high_order: &[i64],
        num_high: u32,
    ) {
        let firep = self.firep;

        let mut r_low = PermMatrix::new(firep.low.mat.height(), num_low);
        for i in 0..firep.low.mat.width() {
            let pos = low_order[i as usize];
            if pos >= 0 {
                r_low.set_col(pos as u32, firep.low.mat.col_entries(i));
            }
        }
        let mut r_high = PermMatrix::new(num_low, num_high);
        for i in 0..firep.high.mat.width() {
            let pos = high_order[i as usize];
            if pos >= 0 {
                r_high.set_col_mapped(pos as u32, firep.high.mat.col_entries(i), low_order);
            }
        }
        self.r_low = r_low;
        self.r_high = r_high;

        self.perm_low = (0..num_low).collect();
        self.inv_perm_low = (0..num_low).collect();
        self.perm_high = (0..num_high).collect();
        self.inv_perm_high = (0..num_high).collect();
    }

    /// Reset the level sets after the weight dry-run.
    pub fn clear_levelsets(&mut self) {
        self.grid.clear_grade_lists();
    }

    // ------------------------------------------------------------------
    // Anchor weights (dry run, no matrices)
    // ------------------------------------------------------------------

    /// Estimate each anchor's crossing cost by walking the weave path and
    /// counting switches and separations, without touching any matrix.
    ///
    /// # Errors
    /// [`Error::Invariant`] when a path step has no anchor or no grid entry.
    pub fn set_anchor_weights(
        &mut self,
        arrangement: &mut Arrangement,
        path: &[HalfedgeId],
    ) -> Result<()> {
        self.store_multigrades(true);
        self.store_multigrades(false);

        for &step in path {
            let anchor_id = arrangement.he(step).anchor.ok_or_else(|| {
                Error::invariant("updater::set_anchor_weights", "path step without anchor")
            })?;
            let (ax, ay, above) = {
                let anchor = arrangement.anchor(anchor_id);
                (anchor.x, anchor.y, anchor.above_line)
            };
            let at = self.entry_for(ax, ay)?;
            let down = self.grid.entries[at].down;
            let left = self.grid.entries[at].left;

            let mut switches: u64 = 0;
            let mut separations: u64 = 0;

            if down.is_some() && left.is_some() {
                self.count_switches_and_separations(at, above, &mut switches, &mut separations)?;
            } else {
                let generator = down.or(left).ok_or_else(|| {
                    Error::invariant("updater::set_anchor_weights", "anchor with no neighbours")
                })?;
                let is_down = down.is_some();
                if (above && is_down) || (!above && !is_down) {
                    separations += class_product(&self.grid, generator, at);
                    self.merge_grade_lists(at, generator);
                } else {
                    let horiz = self.grid.entries[at].y == self.grid.entries[generator].y;
                    self.separate_lists(at, generator, horiz, false);
                    separations += class_product(&self.grid, generator, at);
                }
            }

            let weight = switches + separations / 4;
            arrangement.anchor_mut(anchor_id).weight = weight;
            trace!(?anchor_id, weight, switches, separations, "anchor weight");
        }
        Ok(())
    }

    /// Dry-run a strict crossing: separations at both neighbours, the block
    /// switch, and the mergers that a real crossing would perform.
    fn count_switches_and_separations(
        &mut self,
        at: EntryId,
        from_below: bool,
        switches: &mut u64,
        separations: &mut u64,
    ) -> Result<()> {
        let down = self.grid.entries[at].down.ok_or_else(|| {
            Error::invariant("updater::count_switches", "strict anchor without down entry")
        })?;
        let left = self.grid.entries[at].left.ok_or_else(|| {
            Error::invariant("updater::count_switches", "strict anchor without left entry")
        })?;
        let (first, second) = if from_below { (down, left) } else { (left, down) };
        let temp = self
            .grid
            .push_scratch(self.grid.entries[left].x, self.grid.entries[down].y);

        self.separate_lists(at, second, from_below, false);
        *separations += class_product(&self.grid, second, at);
        self.separate_lists(first, temp, from_below, false);
        *separations += class_product(&self.grid, temp, first);

        {
            let (lo_f, hi_f) = {
                let e = &self.grid.entries[first];
                (e.low_index, e.high_index)
            };
            let (lo_s, hi_s) = {
                let e = &self.grid.entries[second];
                (e.low_index, e.high_index)
            };
            self.grid.entries[first].low_index = lo_s;
            self.grid.entries[first].high_index = hi_s;
            self.grid.entries[second].low_index = lo_f;
            self.grid.entries[second].high_index = hi_f;
        }
        *switches += class_product(&self.grid, first, second);

        *separations += class_product(&self.grid, first, at);
        self.merge_grade_lists(at, first);
        *separations += class_product(&self.grid, temp, second);
        self.merge_grade_lists(second, temp);
        self.grid.pop_scratch(temp);
        Ok(())
    }

    // ------------------------------------------------------------------
    // The main traversal
    // ------------------------------------------------------------------

    /// Compute and store a barcode template in every 2-cell along the path,
    /// resetting the decomposition whenever vineyard updates would be more
    /// expensive than a rebuild.
    ///
    /// # Errors
    /// [`Error::Cancelled`] at a poll point, [`Error::Invariant`] on any
    /// violated traversal invariant.
    pub fn store_barcodes_with_reset(
        &mut self,
        arrangement: &mut Arrangement,
        path: &[HalfedgeId],
        progress: &dyn Progress,
        cancel: &CancelFlag,
        options: &UpdaterOptions,
    ) -> Result<UpdaterStats> {
        // PART 1: boundary matrices under the initial order.
        self.store_multigrades(true);
        self.store_multigrades(false);
        let (num_low, low_order) = self.build_simplex_order(true);
        let (num_high, high_order) = self.build_simplex_order(false);
        self.build_matrices(&low_order, num_low, &high_order, num_high);

        let r_low_initial = self.r_low.clone();
        let r_high_initial = self.r_high.clone();

        // PART 2: initial RU-decomposition.
        let reset_timer = Instant::now();
        self.u_low = self.r_low.decompose_ru();
        self.u_high = self.r_high.decompose_ru();
        let decomposition_ms = reset_timer.elapsed().as_secs_f64() * 1e3;
        let mut total_reset_ms = decomposition_ms;

        let first_cell = arrangement
            .he(arrangement.he(arrangement.topleft).twin)
            .face
            .ok_or_else(|| {
                Error::invariant("updater::store_barcodes", "top-left cell missing")
            })?;
        self.store_barcode_template(arrangement, first_cell);

        // PART 3: traverse the path.
        let mut total_transpositions: u64 = 0;
        let mut total_transposition_ms: f64 = 0.0;
        let mut number_of_resets: u32 = 1; // the initial decomposition
        let mut threshold = options.threshold_override.unwrap_or_else(|| {
            self.choose_initial_threshold(decomposition_ms, options.calibration_min_ms)
        });
        debug!(threshold, steps = path.len(), "starting path traversal");

        for (step_index, &step) in path.iter().enumerate() {
            progress.progress(step_index as u32);
            cancel.check()?;
            let step_timer = Instant::now();

            let mut num_trans: u64 = 0;
            let mut swap_counter: u64 = 0;

            let anchor_id = arrangement.he(step).anchor.ok_or_else(|| {
                Error::invariant("updater::store_barcodes", "path step without anchor")
            })?;
            let (ax, ay, above) = {
                let anchor = arrangement.anchor(anchor_id);
                (anchor.x, anchor.y, anchor.above_line)
            };
            let at = self.entry_for(ax, ay)?;
            let down = self.grid.entries[at].down;
            let left = self.grid.entries[at].left;

            if let (Some(down), Some(left)) = (down, left) {
                // Strict anchor: two blocks of simplices swap.
                num_trans = self.count_transpositions(at, above, down, left);

                let (moving, stationary, horiz) = if above {
                    (down, left, true)
                } else {
                    (left, down, false)
                };
                self.remove_lift_entries(at);
                self.remove_lift_entries(moving);

                if num_trans < threshold {
                    swap_counter += self.split_grade_lists(at, stationary, horiz)?;
                    swap_counter += self.move_columns(moving, stationary, horiz)?;
                } else {
                    self.split_grade_lists_no_vineyards(at, stationary, horiz);
                    self.update_order_and_reset_matrices(
                        moving,
                        stationary,
                        horiz,
                        &r_low_initial,
                        &r_high_initial,
                    );
                }

                self.merge_grade_lists(at, moving);
                self.add_lift_entries(at);
                self.add_lift_entries(stationary);
            } else {
                // Non-strict anchor: merge or split equivalence classes.
                let generator = down.or(left).ok_or_else(|| {
                    Error::invariant("updater::store_barcodes", "anchor with no neighbours")
                })?;
                let is_down = down.is_some();
                if (above && is_down) || (!above && !is_down) {
                    // Merge; never any transpositions here.
                    self.remove_lift_entries(generator);
                    self.merge_grade_lists(at, generator);
                    self.add_lift_entries(at);
                } else {
                    let horiz = !is_down;
                    let (gx, gy) = {
                        let g = &self.grid.entries[generator];
                        (g.x, g.y)
                    };
                    let (low_trans, _) = self.count_seps(at, gx, gy, horiz, true);
                    let (high_trans, _) = self.count_seps(at, gx, gy, horiz, false);
                    num_trans = low_trans + high_trans;

                    self.remove_lift_entries(at);
                    if num_trans < threshold {
                        swap_counter += self.split_grade_lists(at, generator, horiz)?;
                    } else {
                        self.split_grade_lists_no_vineyards(at, generator, horiz);
                        self.reset_matrices(&r_low_initial, &r_high_initial);
                    }
                    self.add_lift_entries(at);
                    self.add_lift_entries(generator);
                }
            }

            arrangement.anchor_mut(anchor_id).toggle();

            let face = arrangement.he(step).face.ok_or_else(|| {
                Error::invariant("updater::store_barcodes", "path step into the outer face")
            })?;
            if !arrangement.faces[face.index()].visited {
                self.store_barcode_template(arrangement, face);
            }

            // Bookkeeping for the threshold balance rule.
            let step_ms = step_timer.elapsed().as_secs_f64() * 1e3;
            if num_trans < threshold {
                if swap_counter > 0 {
                    total_transpositions += swap_counter;
                    total_transposition_ms += step_ms;
                }
            } else {
                number_of_resets += 1;
                total_reset_ms += step_ms;
            }
            if (swap_counter > 0 || num_trans >= threshold)
                && options.threshold_override.is_none()
            {
                let trans_rate =
                    total_transpositions as f64 / total_transposition_ms.max(1e-6);
                let reset_cost = total_reset_ms / f64::from(number_of_resets);
                threshold = (trans_rate * reset_cost) as u64;
                trace!(threshold, "threshold retuned");
            }
        }

        info!(
            transpositions = total_transpositions,
            resets = number_of_resets,
            threshold,
            "path traversal complete"
        );
        Ok(UpdaterStats {
            transpositions: total_transpositions,
            resets: number_of_resets,
            final_threshold: threshold,
        })
    }

    fn entry_for(&self, x: u32, y: u32) -> Result<EntryId> {
        self.anchor_entries.get(&(x, y)).copied().ok_or_else(|| {
            Error::invariant(
                "updater::entry_for",
                format!("no grid entry for anchor ({x},{y})"),
            )
        })
    }

    // ------------------------------------------------------------------
    // Transposition counting
    // ------------------------------------------------------------------

    /// Transpositions from separating the grades of `greater` that stay
    /// above the `(lesser_x, lesser_y)` threshold. Also reports how many
    /// simplices fall to the lesser side.
    fn count_seps(
        &self,
        greater: EntryId,
        lesser_x: u32,
        lesser_y: u32,
        horiz: bool,
        low: bool,
    ) -> (u64, u32) {
        let entry = &self.grid.entries[greater];
        let (start, list) = if low {
            (entry.low_index, &entry.low_simplices)
        } else {
            (entry.high_index, &entry.high_simplices)
        };
        let mut gr_col = start;
        let mut cur_col = start;
        let mut count: u64 = 0;
        let mut lesser_count: u32 = 0;
        for mg in list {
            if (horiz && mg.x > lesser_x) || (!horiz && mg.y > lesser_y) {
                count += u64::from(mg.num_cols) * (gr_col - cur_col) as u64;
                gr_col -= i64::from(mg.num_cols);
            } else {
                lesser_count += mg.num_cols;
            }
            cur_col -= i64::from(mg.num_cols);
        }
        (count, lesser_count)
    }

    /// Total transpositions a vineyard update of this strict crossing would
    /// perform: separations at both neighbours plus the block switch.
    fn count_transpositions(
        &mut self,
        at: EntryId,
        from_below: bool,
        down: EntryId,
        left: EntryId,
    ) -> u64 {
        let (first, second) = if from_below { (down, left) } else { (left, down) };
        let (sx, sy) = {
            let e = &self.grid.entries[second];
            (e.x, e.y)
        };
        let (tx, ty) = (self.grid.entries[left].x, self.grid.entries[down].y);

        let mut count: u64 = 0;
        let (c, second_low) = self.count_seps(at, sx, sy, from_below, true);
        count += c;
        let (c, second_high) = self.count_seps(at, sx, sy, from_below, false);
        count += c;
        let (c, temp_low) = self.count_seps(first, tx, ty, from_below, true);
        count += c;
        let (c, temp_high) = self.count_seps(first, tx, ty, from_below, false);
        count += c;

        let first_entry = &self.grid.entries[first];
        let first_low = first_entry.low_count - temp_low;
        let first_high = first_entry.high_count - temp_high;
        count += u64::from(first_low) * u64::from(second_low);
        count += u64::from(first_high) * u64::from(second_high);
        count
    }

    // ------------------------------------------------------------------
    // Class surgery
    // ------------------------------------------------------------------

    /// Move the grades of `greater` that fall at or under the lesser
    /// threshold over to `lesser`, updating indices and counts. With
    /// `record_index`, each grade remembers its current rightmost column.
    fn separate_lists(&mut self, greater: EntryId, lesser: EntryId, horiz: bool, record_index: bool) {
        for low in [true, false] {
            let (lx, ly) = {
                let e = &self.grid.entries[lesser];
                (e.x, e.y)
            };
            let start = if low {
                self.grid.entries[greater].low_index
            } else {
                self.grid.entries[greater].high_index
            };
            let grades = if low {
                std::mem::take(&mut self.grid.entries[greater].low_simplices)
            } else {
                std::mem::take(&mut self.grid.entries[greater].high_simplices)
            };

            let mut gr_col = start;
            let mut cur_col = start;
            let mut keep = Vec::with_capacity(grades.len());
            let mut moved = Vec::new();
            for mut mg in grades {
                if record_index {
                    mg.simplex_index = cur_col;
                }
                if (horiz && mg.x > lx) || (!horiz && mg.y > ly) {
                    keep.push(mg);
                    gr_col -= i64::from(mg.num_cols);
                } else {
                    moved.push(mg);
                }
                cur_col -= i64::from(mg.num_cols);
            }

            let lesser_count = (gr_col - cur_col) as u32;
            if low {
                self.grid.entries[greater].low_simplices = keep;
                self.grid.entries[lesser].low_simplices.extend(moved);
                self.grid.entries[lesser].low_index = gr_col;
                self.grid.entries[lesser].low_count = lesser_count;
                let g_index = self.grid.entries[greater].low_index;
                self.grid.entries[greater].low_count = (g_index - gr_col) as u32;
            } else {
                self.grid.entries[greater].high_simplices = keep;
                self.grid.entries[lesser].high_simplices.extend(moved);
                self.grid.entries[lesser].high_index = gr_col;
                self.grid.entries[lesser].high_count = lesser_count;
                let g_index = self.grid.entries[greater].high_index;
                self.grid.entries[greater].high_count = (g_index - gr_col) as u32;
            }
        }
    }

    /// Vineyard version of the separation: column blocks that stay with
    /// `greater` are moved right past the separating ones.
    fn split_grade_lists(&mut self, greater: EntryId, lesser: EntryId, horiz: bool) -> Result<u64> {
        let mut swaps: u64 = 0;
        for low in [true, false] {
            let (lx, ly) = {
                let e = &self.grid.entries[lesser];
                (e.x, e.y)
            };
            let start = if low {
                self.grid.entries[greater].low_index
            } else {
                self.grid.entries[greater].high_index
            };
            let grades = if low {
                std::mem::take(&mut self.grid.entries[greater].low_simplices)
            } else {
                std::mem::take(&mut self.grid.entries[greater].high_simplices)
            };

            let mut gr_col = start;
            let mut cur_col = start;
            let mut keep = Vec::with_capacity(grades.len());
            let mut moved = Vec::new();
            for mg in grades {
                if (horiz && mg.x > lx) || (!horiz && mg.y > ly) {
                    if cur_col != gr_col {
                        swaps += if low {
                            self.move_low_columns(cur_col, mg.num_cols, gr_col)?
                        } else {
                            self.move_high_columns(cur_col, mg.num_cols, gr_col)?
                        };
                    }
                    keep.push(mg);
                    gr_col -= i64::from(mg.num_cols);
                } else {
                    moved.push(mg);
                }
                cur_col -= i64::from(mg.num_cols);
            }

            let lesser_count = (gr_col - cur_col) as u32;
            if low {
                self.grid.entries[greater].low_simplices = keep;
                self.grid.entries[lesser].low_simplices.extend(moved);
                self.grid.entries[lesser].low_index = gr_col;
                self.grid.entries[lesser].low_count = lesser_count;
                let g_index = self.grid.entries[greater].low_index;
                self.grid.entries[greater].low_count = (g_index - gr_col) as u32;
            } else {
                self.grid.entries[greater].high_simplices = keep;
                self.grid.entries[lesser].high_simplices.extend(moved);
                self.grid.entries[lesser].high_index = gr_col;
                self.grid.entries[lesser].high_count = lesser_count;
                let g_index = self.grid.entries[greater].high_index;
                self.grid.entries[greater].high_count = (g_index - gr_col) as u32;
            }
        }
        Ok(swaps)
    }

    /// Separation without matrix work, but with the permutation vectors
    /// updated to reflect the new column order (for the reset path).
    fn split_grade_lists_no_vineyards(&mut self, greater: EntryId, lesser: EntryId, horiz: bool) {
        self.separate_lists(greater, lesser, horiz, true);
        self.renumber_classes(&[greater, lesser]);
    }

    /// Move all grades of `lesser` into `greater`.
    fn merge_grade_lists(&mut self, greater: EntryId, lesser: EntryId) {
        let low = std::mem::take(&mut self.grid.entries[lesser].low_simplices);
        let high = std::mem::take(&mut self.grid.entries[lesser].high_simplices);
        let low_count = std::mem::take(&mut self.grid.entries[lesser].low_count);
        let high_count = std::mem::take(&mut self.grid.entries[lesser].high_count);
        let greater_entry = &mut self.grid.entries[greater];
        greater_entry.low_simplices.extend(low);
        greater_entry.high_simplices.extend(high);
        greater_entry.low_count += low_count;
        greater_entry.high_count += high_count;
    }

    /// Swap the column blocks of `first` past those of `second` with
    /// vineyard transpositions, re-lifting grades that now fall under
    /// `second` on the way.
    fn move_columns(&mut self, first: EntryId, second: EntryId, from_below: bool) -> Result<u64> {
        {
            let f = &self.grid.entries[first];
            let s = &self.grid.entries[second];
            if f.low_index + i64::from(s.low_count) != s.low_index
                || f.high_index + i64::from(s.high_count) != s.high_index
            {
                return Err(Error::invariant(
                    "updater::move_columns",
                    "swapping non-consecutive column blocks",
                ));
            }
        }

        let mut swaps: u64 = 0;
        let (sx, sy) = {
            let e = &self.grid.entries[second];
            (e.x, e.y)
        };

        let mut low_col = self.grid.entries[first].low_index;
        let mut high_col = self.grid.entries[first].high_index;
        {
            let second_low = self.grid.entries[second].low_index;
            let second_high = self.grid.entries[second].high_index;
            let f = &mut self.grid.entries[first];
            f.low_index = second_low;
            f.high_index = second_high;
        }

        for low in [true, false] {
            let grades = if low {
                std::mem::take(&mut self.grid.entries[first].low_simplices)
            } else {
                std::mem::take(&mut self.grid.entries[first].high_simplices)
            };
            let col = if low { &mut low_col } else { &mut high_col };
            let mut keep = Vec::with_capacity(grades.len());
            for mg in grades {
                if (from_below && mg.x > sx) || (!from_below && mg.y > sy) {
                    // Stays with `first`: move its columns past `second`.
                    let target = if low {
                        self.grid.entries[second].low_index
                    } else {
                        self.grid.entries[second].high_index
                    };
                    swaps += if low {
                        self.move_low_columns(*col, mg.num_cols, target)?
                    } else {
                        self.move_high_columns(*col, mg.num_cols, target)?
                    };
                    if low {
                        self.grid.entries[second].low_index -= i64::from(mg.num_cols);
                    } else {
                        self.grid.entries[second].high_index -= i64::from(mg.num_cols);
                    }
                    keep.push(mg);
                } else {
                    // Now lifts to `second`; columns stay put.
                    if low {
                        self.grid.entries[second].low_simplices.push(mg);
                        self.grid.entries[first].low_count -= mg.num_cols;
                        self.grid.entries[second].low_count += mg.num_cols;
                    } else {
                        self.grid.entries[second].high_simplices.push(mg);
                        self.grid.entries[first].high_count -= mg.num_cols;
                        self.grid.entries[second].high_count += mg.num_cols;
                    }
                }
                *col -= i64::from(mg.num_cols);
            }
            if low {
                self.grid.entries[first].low_simplices = keep;
            } else {
                self.grid.entries[first].high_simplices = keep;
            }
        }

        {
            let f = &self.grid.entries[first];
            let s = &self.grid.entries[second];
            if s.low_index + i64::from(f.low_count) != f.low_index
                || s.high_index + i64::from(f.high_count) != f.high_index
            {
                return Err(Error::invariant(
                    "updater::move_columns",
                    "swap resulted in non-consecutive column blocks",
                ));
            }
        }
        Ok(swaps)
    }

    /// Rewrite the permutation vectors so the listed classes occupy their
    /// new positions; the class lists must carry fresh `simplex_index`
    /// values (from [`Self::separate_lists`] with `record_index`).
    fn renumber_classes(&mut self, order: &[EntryId]) {
        let Some(&head) = order.first() else {
            return;
        };
        let mut low_col = self.grid.entries[head].low_index;
        let mut high_col = self.grid.entries[head].high_index;

        for &e in order {
            for mg in &self.grid.entries[e].low_simplices {
                for i in 0..mg.num_cols {
                    let original =
                        self.inv_perm_low[(mg.simplex_index - i64::from(i)) as usize];
                    self.perm_low[original as usize] = low_col as u32;
                    low_col -= 1;
                }
            }
            for mg in &self.grid.entries[e].high_simplices {
                for i in 0..mg.num_cols {
                    let original =
                        self.inv_perm_high[(mg.simplex_index - i64::from(i)) as usize];
                    self.perm_high[original as usize] = high_col as u32;
                    high_col -= 1;
                }
            }
        }

        for (i, &p) in self.perm_low.iter().enumerate() {
            self.inv_perm_low[p as usize] = i as u32;
        }
        for (i, &p) in self.perm_high.iter().enumerate() {
            self.inv_perm_high[p as usize] = i as u32;
        }
    }

    /// Reset path for a strict crossing: record current positions, swap the
    /// two classes in the abstract order, rewrite the permutations, and
    /// rebuild the decomposition from the pristine matrices.
    fn update_order_and_reset_matrices(
        &mut self,
        first: EntryId,
        second: EntryId,
        from_below: bool,
        r_low_initial: &PermMatrix,
        r_high_initial: &PermMatrix,
    ) {
        // STEP 1: store current column indices for second's grades.
        {
            let e = &mut self.grid.entries[second];
            let mut col = e.low_index;
            for mg in &mut e.low_simplices {
                mg.simplex_index = col;
                col -= i64::from(mg.num_cols);
            }
            let mut col = e.high_index;
            for mg in &mut e.high_simplices {
                mg.simplex_index = col;
                col -= i64::from(mg.num_cols);
            }
        }

        let mut low_col = self.grid.entries[first].low_index;
        let mut high_col = self.grid.entries[first].high_index;
        {
            let second_low = self.grid.entries[second].low_index;
            let second_high = self.grid.entries[second].high_index;
            let f = &mut self.grid.entries[first];
            f.low_index = second_low;
            f.high_index = second_high;
        }
        let (sx, sy) = {
            let e = &self.grid.entries[second];
            (e.x, e.y)
        };

        for low in [true, false] {
            let grades = if low {
                std::mem::take(&mut self.grid.entries[first].low_simplices)
            } else {
                std::mem::take(&mut self.grid.entries[first].high_simplices)
            };
            let col = if low { &mut low_col } else { &mut high_col };
            let mut keep = Vec::with_capacity(grades.len());
            for mut mg in grades {
                mg.simplex_index = *col;
                if (from_below && mg.x > sx) || (!from_below && mg.y > sy) {
                    if low {
                        self.grid.entries[second].low_index -= i64::from(mg.num_cols);
                    } else {
                        self.grid.entries[second].high_index -= i64::from(mg.num_cols);
                    }
                    keep.push(mg);
                } else {
                    if low {
                        self.grid.entries[second].low_simplices.push(mg);
                        self.grid.entries[first].low_count -= mg.num_cols;
                        self.grid.entries[second].low_count += mg.num_cols;
                    } else {
                        self.grid.entries[second].high_simplices.push(mg);
                        self.grid.entries[first].high_count -= mg.num_cols;
                        self.grid.entries[second].high_count += mg.num_cols;
                    }
                }
                *col -= i64::from(mg.num_cols);
            }
            if low {
                self.grid.entries[first].low_simplices = keep;
            } else {
                self.grid.entries[first].high_simplices = keep;
            }
        }

        // STEPS 2–4: permutations, rebuild, fresh decomposition.
        self.renumber_classes(&[first, second]);
        self.reset_matrices(r_low_initial, r_high_initial);
    }

    /// Rebuild both matrices from their pristine copies under the current
    /// permutations and recompute the decomposition.
    fn reset_matrices(&mut self, r_low_initial: &PermMatrix, r_high_initial: &PermMatrix) {
        self.r_low.rebuild(r_low_initial, &self.perm_low);
        self.r_high
            .rebuild_with_rows(r_high_initial, &self.perm_high, &self.perm_low);
        self.u_low = self.r_low.decompose_ru();
        self.u_high = self.r_high.decompose_ru();
    }

    // ------------------------------------------------------------------
    // Column transpositions
    // ------------------------------------------------------------------

    /// Move the block of `n` low columns whose rightmost is `s` to follow
    /// column `t`, one vineyard transposition at a time.
    fn move_low_columns(&mut self, s: i64, n: u32, t: i64) -> Result<u64> {
        if s > t {
            return Err(Error::invariant(
                "updater::move_low_columns",
                format!("illegal column move {s} > {t}"),
            ));
        }
        for c in 0..i64::from(n) {
            for i in s..t {
                let a = (i - c) as u32;
                let b = a + 1;
                let orig_a = self.inv_perm_low[a as usize];
                let orig_b = self.inv_perm_low[b as usize];
                self.inv_perm_low[a as usize] = orig_b;
                self.inv_perm_low[b as usize] = orig_a;
                self.perm_low[orig_b as usize] = a;
                self.perm_low[orig_a as usize] = b;
                self.vineyard_update_low(a);
            }
        }
        Ok(u64::from(n) * (t - s) as u64)
    }

    /// High-simplex analogue of [`Self::move_low_columns`].
    fn move_high_columns(&mut self, s: i64, n: u32, t: i64) -> Result<u64> {
        if s > t {
            return Err(Error::invariant(
                "updater::move_high_columns",
                format!("illegal column move {s} > {t}"),
            ));
        }
        for c in 0..i64::from(n) {
            for i in s..t {
                let a = (i - c) as u32;
                let b = a + 1;
                let orig_a = self.inv_perm_high[a as usize];
                let orig_b = self.inv_perm_high[b as usize];
                self.inv_perm_high[a as usize] = orig_b;
                self.inv_perm_high[b as usize] = orig_a;
                self.perm_high[orig_b as usize] = a;
                self.perm_high[orig_a as usize] = b;
                self.vineyard_update_high(a);
            }
        }
        Ok(u64::from(n) * (t - s) as u64)
    }

    /// One transposition of low columns `a` and `a+1`, by the case analysis
    /// of the vineyards algorithm; keeps `D = R·U` for both matrices.
    fn vineyard_update_low(&mut self, a: u32) {
        let b = a + 1;
        let a_positive = self.r_low.low(a).is_none();
        let b_positive = self.r_low.low(b).is_none();

        if a_positive {
            if b_positive {
                // Case 1: both columns zero; watch for the R_high fix-up.
                let k = self.r_high.find_low(a);
                let l = self.r_high.find_low(b);
                let rh_al = l.map_or(false, |l| self.r_high.entry(a, l));

                self.u_low.clear(a, b);
                self.u_low.swap_columns(a);
                self.u_low.swap_rows(a);

                match (k, l, rh_al) {
                    (Some(k), Some(l), true) => {
                        if k < l {
                            self.r_high.swap_rows(a, true);
                            self.r_high.add_column(k, l);
                            self.u_high.add_row(l, k);
                        } else {
                            self.r_high.swap_rows(a, false);
                            self.r_high.add_column(l, k);
                            self.u_high.add_row(k, l);
                        }
                    }
                    _ => self.r_high.swap_rows(a, !rh_al),
                }
            } else {
                // Case 4.
                self.u_low.clear(a, b);
                self.r_low.swap_columns(a, true);
                self.r_high.swap_rows(a, true);
                self.u_low.swap_columns(a);
                self.u_low.swap_rows(a);
            }
        } else {
            if b_positive {
                // Case 3.
                let l = self.r_high.find_low(b);
                let rh_al = l.map_or(false, |l| self.r_high.entry(a, l));
                self.r_high.swap_rows(a, !rh_al);

                if self.u_low.entry(a, b) {
                    // Case 3.1: R is already correct after the row swap.
                    self.u_low.add_row(b, a);
                    self.u_low.swap_rows(a);
                    self.u_low.add_row(b, a);
                } else {
                    // Case 3.2.
                    self.r_low.swap_columns(a, true);
                    self.u_low.swap_rows(a);
                }
            } else {
                // Case 2: neither row holds a pivot of R_high.
                self.r_high.swap_rows(a, false);

                if self.u_low.entry(a, b) {
                    self.u_low.add_row(b, a);
                    self.u_low.swap_rows(a);

                    if self.r_low.low(a) < self.r_low.low(b) {
                        // Case 2.1.1.
                        self.r_low.add_column(a, b);
                        self.r_low.swap_columns(a, true);
                    } else {
                        // Case 2.1.2: swap without touching the pivots, then
                        // restore reduced form.
                        self.r_low.add_column(a, b);
                        self.r_low.swap_columns(a, false);
                        self.r_low.add_column(a, b);
                        self.u_low.add_row(b, a);
                    }
                } else {
                    // Case 2.2.
                    self.r_low.swap_columns(a, true);
                    self.u_low.swap_rows(a);
                }
            }
            self.u_low.swap_columns(a);
        }
    }

    /// One transposition of high columns `a` and `a+1`. Rows of `R_high`
    /// are untouched here; only the column order changes.
    fn vineyard_update_high(&mut self, a: u32) {
        let b = a + 1;
        let a_positive = self.r_high.low(a).is_none();
        let b_positive = self.r_high.low(b).is_none();

        if a_positive {
            if !b_positive {
                self.r_high.swap_columns(a, true);
            }
            self.u_high.clear(a, b);
            self.u_high.swap_columns(a);
            self.u_high.swap_rows(a);
        } else {
            if b_positive {
                if self.u_high.entry(a, b) {
                    self.u_high.add_row(b, a);
                    self.u_high.swap_rows(a);
                    self.u_high.add_row(b, a);
                } else {
                    self.r_high.swap_columns(a, true);
                    self.u_high.swap_rows(a);
                }
            } else if self.u_high.entry(a, b) {
                self.u_high.add_row(b, a);
                self.u_high.swap_rows(a);

                if self.r_high.low(a) < self.r_high.low(b) {
                    self.r_high.add_column(a, b);
                    self.r_high.swap_columns(a, true);
                } else {
                    self.r_high.add_column(a, b);
                    self.r_high.swap_columns(a, false);
                    self.r_high.add_column(a, b);
                    self.u_high.add_row(b, a);
                }
            } else {
                self.r_high.swap_columns(a, true);
                self.u_high.swap_rows(a);
            }
            self.u_high.swap_columns(a);
        }
    }

    // ------------------------------------------------------------------
    // Lift maps and barcode readout
    // ------------------------------------------------------------------

    fn remove_lift_entries(&mut self, entry: EntryId) {
        let (low_index, high_index) = {
            let e = &self.grid.entries[entry];
            (e.low_index, e.high_index)
        };
        if low_index >= 0 {
            if self.lift_low.get(&(low_index as u32)) == Some(&entry) {
                self.lift_low.remove(&(low_index as u32));
            }
        }
        if high_index >= 0 {
            if self.lift_high.get(&(high_index as u32)) == Some(&entry) {
                self.lift_high.remove(&(high_index as u32));
            }
        }
    }

    fn add_lift_entries(&mut self, entry: EntryId) {
        let e = &self.grid.entries[entry];
        if e.low_count > 0 {
            self.lift_low.insert(e.low_index as u32, entry);
        }
        if e.high_count > 0 {
            self.lift_high.insert(e.high_index as u32, entry);
        }
    }

    /// Read the current barcode template off the decomposition and store it
    /// in the given cell.
    fn store_barcode_template(&mut self, arrangement: &mut Arrangement, face: FaceId) {
        arrangement.faces[face.index()].visited = true;
        let mut template = BarcodeTemplate::default();

        for c in 0..self.r_low.width() {
            if !self.r_low.col_is_empty(c) {
                continue;
            }
            let begin = self
                .lift_low
                .range(c..)
                .next()
                .map_or(INFINITE_INDEX, |(_, &e)| self.grid.entries[e].index);

            match self.r_high.find_low(c) {
                Some(s) => {
                    let end = self
                        .lift_high
                        .range(s..)
                        .next()
                        .map_or(INFINITE_INDEX, |(_, &e)| self.grid.entries[e].index);
                    if begin != end {
                        template.add_bar(begin, end);
                    }
                }
                None => template.add_bar(begin, INFINITE_INDEX),
            }
        }
        arrangement.set_barcode(face, template);
    }

    // ------------------------------------------------------------------
    // Threshold calibration
    // ------------------------------------------------------------------

    /// Time a short random walk of transpositions (then undo it) to relate
    /// transposition throughput to the decomposition cost.
    fn choose_initial_threshold(&mut self, decomposition_ms: f64, min_ms: u64) -> u64 {
        let num_cols = self.r_low.width() + self.r_high.width();
        if num_cols <= 3 {
            return 1000;
        }

        let runtime_ms = (decomposition_ms / 20.0).max(min_ms as f64);
        let mut rng = rand::thread_rng();
        let mut walk: Vec<u32> = Vec::new();
        let timer = Instant::now();

        loop {
            let elapsed = timer.elapsed().as_secs_f64() * 1e3;
            let keep_going = (elapsed < runtime_ms || walk.is_empty())
                && (elapsed < 5.0 || walk.len() < 5000);
            if !keep_going {
                break;
            }
            let col = rng.gen_range(0..num_cols - 1);
            if col + 1 < self.r_low.width() {
                self.vineyard_update_low(col);
                walk.push(col);
            } else if col >= self.r_low.width() {
                self.vineyard_update_high(col - self.r_low.width());
                walk.push(col);
            }
            // A draw landing on the boundary between the two matrices swaps
            // nothing: a low simplex cannot transpose with a high one.
        }

        for &col in walk.iter().rev() {
            if col < self.r_low.width() {
                self.vineyard_update_low(col);
            } else {
                self.vineyard_update_high(col - self.r_low.width());
            }
        }

        let walk_ms = (timer.elapsed().as_secs_f64() * 1e3).max(1e-3);
        let num_trans = 2 * walk.len() as u64;
        debug!(num_trans, walk_ms, "threshold calibration walk");
        ((num_trans as f64 / walk_ms) * decomposition_ms) as u64
    }

    // ------------------------------------------------------------------
    // Test support
    // ------------------------------------------------------------------

    /// Dense check that both decompositions currently multiply back to the
    /// permuted boundary matrices. Intended for tests and debugging only.
    #[must_use]
    pub fn decomposition_is_consistent(&self, d_low: &PermMatrix, d_high: &PermMatrix) -> bool {
        fn mul(r: &[Vec<bool>], u: &[Vec<bool>]) -> Vec<Vec<bool>> {
            let rows = r.len();
            let cols = if u.is_empty() { 0 } else { u[0].len() };
            let mid = u.len();
            let mut out = vec![vec![false; cols]; rows];
            for i in 0..rows {
                for j in 0..cols {
                    let mut acc = false;
                    for k in 0..mid {
                        acc ^= r[i][k] && u[k][j];
                    }
                    out[i][j] = acc;
                }
            }
            out
        }

        // Rebuild the expected matrices under the current permutations.
        let mut d_low_now = d_low.clone();
        d_low_now.rebuild(d_low, &self.perm_low);
        let mut d_high_now = d_high.clone();
        d_high_now.rebuild_with_rows(d_high, &self.perm_high, &self.perm_low);

        let product_low = mul(&self.r_low.to_dense(), &self.u_low.to_dense());
        let product_high = mul(&self.r_high.to_dense(), &self.u_high.to_dense());
        product_low == d_low_now.to_dense() && product_high == d_high_now.to_dense()
    }
}

/// Product of class sizes, the separation count between two entries.
fn class_product(grid: &TemplatePointsGrid, a: EntryId, b: EntryId) -> u64 {
    let (ea, eb) = (&grid.entries[a], &grid.entries[b]);
    u64::from(ea.low_count) * u64::from(eb.low_count)
        + u64::from(ea.high_count) * u64::from(eb.high_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_core::{Bigrade, Exact};
    use bipers_matrix::{BigradedMatrix, IndexMatrix};
    use num_bigint::BigInt;

    fn rat(n: i64) -> Exact {
        Exact::from_integer(BigInt::from(n))
    }

    /// A filled triangle: three vertices, edges at (1,0), (0,1), (1,1), and
    /// the 2-cell at (1,1). Homology degree 1, so edges are the low columns.
    fn triangle_firep() -> Firep {
        let low_grades = vec![Bigrade::new(1, 0), Bigrade::new(0, 1), Bigrade::new(1, 1)];
        let mut low = BigradedMatrix::new(3, 3, 2, 2);
        low.ind = IndexMatrix::from_grades(&low_grades, 2, 2);
        low.mat.set_entry(0, 0);
        low.mat.set_entry(1, 0);
        low.mat.set_entry(1, 1);
        low.mat.set_entry(2, 1);
        low.mat.set_entry(0, 2);
        low.mat.set_entry(2, 2);
        for j in 0..3 {
            low.mat.finalize(j);
        }

        let high_grades = vec![Bigrade::new(1, 1)];
        let mut high = BigradedMatrix::new(3, 1, 2, 2);
        high.ind = IndexMatrix::from_grades(&high_grades, 2, 2);
        for e in 0..3 {
            high.mat.set_entry(e, 0);
        }
        high.mat.finalize(0);

        Firep {
            x_label: String::new(),
            y_label: String::new(),
            xs: vec![rat(0), rat(1)],
            ys: vec![rat(0), rat(1)],
            hom_degree: 1,
            low,
            low_grades,
            high,
            high_grades,
        }
    }

    fn triangle_points() -> Vec<TemplatePoint> {
        vec![
            TemplatePoint::new(0, 1, 1, 0, 0),
            TemplatePoint::new(1, 0, 1, 0, 0),
        ]
    }

    fn initialised_updater<'a>(
        firep: &'a Firep,
        points: &mut Vec<TemplatePoint>,
    ) -> (Updater<'a>, PermMatrix, PermMatrix) {
        let (mut updater, _anchors) = Updater::new(firep, points);
        updater.store_multigrades(true);
        updater.store_multigrades(false);
        let (num_low, low_order) = updater.build_simplex_order(true);
        let (num_high, high_order) = updater.build_simplex_order(false);
        updater.build_matrices(&low_order, num_low, &high_order, num_high);
        let d_low = updater.r_low.clone();
        let d_high = updater.r_high.clone();
        updater.u_low = updater.r_low.decompose_ru();
        updater.u_high = updater.r_high.decompose_ru();
        (updater, d_low, d_high)
    }

    #[test]
    fn anchors_complete_the_support() {
        let firep = triangle_firep();
        let mut points = triangle_points();
        let (_updater, anchors) = Updater::new(&firep, &mut points);
        assert_eq!(anchors.len(), 1);
        assert_eq!((anchors[0].x, anchors[0].y), (1, 1));
        assert_eq!(points.len(), 3, "anchor appended with zero multiplicities");
    }

    #[test]
    fn initial_decomposition_satisfies_d_equals_ru() {
        let firep = triangle_firep();
        let mut points = triangle_points();
        let (updater, d_low, d_high) = initialised_updater(&firep, &mut points);
        assert_eq!(updater.r_low.width(), 3);
        assert_eq!(updater.r_high.width(), 1);
        assert!(updater.decomposition_is_consistent(&d_low, &d_high));
        // The triangle kills the cycle born where it appears: no low pivot
        // remains unpaired except the zero column matched by the 2-cell.
        assert_eq!(updater.r_low.low(0), Some(1));
        assert_eq!(updater.r_low.low(1), Some(2));
        assert_eq!(updater.r_low.low(2), None);
        assert_eq!(updater.r_high.find_low(2), Some(0));
    }

    #[test]
    fn transposing_twice_restores_the_pairing() {
        let firep = triangle_firep();
        let mut points = triangle_points();
        let (mut updater, d_low, d_high) = initialised_updater(&firep, &mut points);

        let lows_before: Vec<_> = (0..3).map(|j| updater.r_low.low(j)).collect();
        updater.vineyard_update_low(0);
        updater.vineyard_update_low(0);
        let lows_after: Vec<_> = (0..3).map(|j| updater.r_low.low(j)).collect();
        assert_eq!(lows_before, lows_after);
        assert!(updater.decomposition_is_consistent(&d_low, &d_high));
    }

    #[test]
    fn block_move_and_back_is_identity_on_the_order() {
        let firep = triangle_firep();
        let mut points = triangle_points();
        let (mut updater, d_low, d_high) = initialised_updater(&firep, &mut points);

        let swaps = updater.move_low_columns(0, 1, 1).unwrap();
        assert_eq!(swaps, 1);
        assert!(updater.decomposition_is_consistent(&d_low, &d_high));
        assert_eq!(updater.perm_low, vec![1, 0, 2]);

        updater.move_low_columns(0, 1, 1).unwrap();
        assert!(updater.decomposition_is_consistent(&d_low, &d_high));
        assert_eq!(updater.perm_low, vec![0, 1, 2]);
    }

    #[test]
    fn reset_matches_vineyard_pairing() {
        let firep = triangle_firep();
        let mut points = triangle_points();

        // Vineyard route.
        let (mut vine, _dl, _dh) = initialised_updater(&firep, &mut points);
        vine.move_low_columns(0, 1, 1).unwrap();

        // Reset route: same permutation installed abstractly, then rebuilt.
        let mut points2 = triangle_points();
        let (mut reset, d_low, d_high) = initialised_updater(&firep, &mut points2);
        reset.perm_low = vec![1, 0, 2];
        reset.inv_perm_low = vec![1, 0, 2];
        let rl = d_low.clone();
        let rh = d_high.clone();
        reset.reset_matrices(&rl, &rh);

        for j in 0..3 {
            assert_eq!(vine.r_low.low(j), reset.r_low.low(j), "pivot of column {j}");
        }
        assert!(reset.decomposition_is_consistent(&d_low, &d_high));
    }

    #[test]
    fn illegal_column_move_is_an_invariant_error() {
        let firep = triangle_firep();
        let mut points = triangle_points();
        let (mut updater, _dl, _dh) = initialised_updater(&firep, &mut points);
        let err = updater.move_low_columns(2, 1, 0).unwrap_err();
        assert!(matches!(err, Error::Invariant { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any walk of transpositions, undone in reverse, restores the
            /// pairing and keeps both decompositions valid.
            #[test]
            fn random_walks_undo_cleanly(
                walk in proptest::collection::vec(0u32..2, 1..12)
            ) {
                let firep = triangle_firep();
                let mut points = triangle_points();
                let (mut updater, d_low, d_high) = initialised_updater(&firep, &mut points);
                let lows_before: Vec<_> = (0..3).map(|j| updater.r_low.low(j)).collect();

                for &a in &walk {
                    updater.vineyard_update_low(a);
                }
                for &a in walk.iter().rev() {
                    updater.vineyard_update_low(a);
                }

                let lows_after: Vec<_> = (0..3).map(|j| updater.r_low.low(j)).collect();
                prop_assert_eq!(lows_before, lows_after);
                prop_assert!(updater.decomposition_is_consistent(&d_low, &d_high));
            }
        }
    }
}

use std::rc::Rc;

use tracing::{debug, trace};

use crate::component::{
    AnchorContext, Component, ComponentCore, ComponentHandle, Spacer, into_handle,
    subtree_contains,
};
use crate::core::types::{Point, SpaceRequest};
use crate::error::{ChartError, ChartResult};
use crate::layout::{LayoutAxis, LayoutNode, LayoutTuning};
use crate::render::{Invalidation, RenderFrame};

/// Weight a component-free row or column gets when a neighbour wants more
/// space than it was offered.
const WANTS_SPACE_BONUS: f64 = 0.1;
/// Starting weight given to fixed rows/columns so the first offer is not zero.
const HEURISTIC_FIXED_WEIGHT: f64 = 0.5;

struct TableCell {
    component: ComponentHandle,
    placeholder: bool,
}

impl TableCell {
    fn placeholder() -> Self {
        Self {
            component: into_handle(Spacer::new()),
            placeholder: true,
        }
    }

    fn occupied(component: ComponentHandle) -> Self {
        Self {
            component,
            placeholder: false,
        }
    }
}

/// Resolved track sizes from the last successful layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub column_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
    pub iterations: usize,
}

/// Per-axis outcome of the guarantee loop.
struct AxisResolution {
    minimums: Vec<f64>,
    free: f64,
}

struct Guarantees {
    capped_widths: Vec<f64>,
    capped_heights: Vec<f64>,
    min_widths: Vec<f64>,
    min_heights: Vec<f64>,
    wants_width: Vec<bool>,
    wants_height: Vec<bool>,
}

/// Grid layout distributing free space by row/column weights.
///
/// Empty cells hold [`Spacer`] placeholders. A row's weight is its explicit
/// weight, else 0 when every cell in it is fixed-height and 1 otherwise
/// (columns likewise with fixed width).
pub struct Table {
    core: ComponentCore,
    rows: Vec<Vec<TableCell>>,
    row_weights: Vec<Option<f64>>,
    col_weights: Vec<Option<f64>>,
    row_padding: f64,
    col_padding: f64,
    x_margin: f64,
    y_margin: f64,
    tuning: LayoutTuning,
    context: Option<AnchorContext>,
    last_layout: Option<TableLayout>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Table {
    /// Builds a table from rows of optional components; ragged rows are
    /// padded with placeholders.
    #[must_use]
    pub fn new(rows: Vec<Vec<Option<ComponentHandle>>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows: Vec<Vec<TableCell>> = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<TableCell> = row
                    .into_iter()
                    .map(|cell| cell.map_or_else(TableCell::placeholder, TableCell::occupied))
                    .collect();
                cells.resize_with(columns, TableCell::placeholder);
                cells
            })
            .collect();
        let row_count = rows.len();
        Self {
            core: ComponentCore::new(),
            rows,
            row_weights: vec![None; row_count],
            col_weights: vec![None; columns],
            row_padding: 0.0,
            col_padding: 0.0,
            x_margin: 0.0,
            y_margin: 0.0,
            tuning: LayoutTuning::default(),
            context: None,
            last_layout: None,
        }
    }

    pub fn with_tuning(mut self, tuning: LayoutTuning) -> ChartResult<Self> {
        self.tuning = tuning.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn col_count(&self) -> usize {
        self.col_weights.len()
    }

    #[must_use]
    pub fn last_layout(&self) -> Option<&TableLayout> {
        self.last_layout.as_ref()
    }

    pub fn set_row_weight(&mut self, row: usize, weight: Option<f64>) -> ChartResult<()> {
        validate_weight(weight)?;
        let slot = self.row_weights.get_mut(row).ok_or_else(|| {
            ChartError::InvalidConfig(format!("row {row} is outside the table"))
        })?;
        *slot = weight;
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    pub fn set_col_weight(&mut self, col: usize, weight: Option<f64>) -> ChartResult<()> {
        validate_weight(weight)?;
        let slot = self.col_weights.get_mut(col).ok_or_else(|| {
            ChartError::InvalidConfig(format!("column {col} is outside the table"))
        })?;
        *slot = weight;
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Gaps inserted between rows and between columns.
    pub fn set_padding(&mut self, row_padding: f64, col_padding: f64) -> ChartResult<()> {
        validate_spacing("padding", row_padding)?;
        validate_spacing("padding", col_padding)?;
        self.row_padding = row_padding;
        self.col_padding = col_padding;
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Space kept clear on both horizontal (`x`) and vertical (`y`) edges.
    pub fn set_margins(&mut self, x_margin: f64, y_margin: f64) -> ChartResult<()> {
        validate_spacing("margin", x_margin)?;
        validate_spacing("margin", y_margin)?;
        self.x_margin = x_margin;
        self.y_margin = y_margin;
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Places `component` at `(row, col)`, growing the grid as needed.
    ///
    /// Fails when the cell already holds a component or when `component`
    /// would contain this table.
    pub fn add(&mut self, component: ComponentHandle, row: usize, col: usize) -> ChartResult<()> {
        if subtree_contains(&component, self.core.id()) {
            return Err(ChartError::InvalidConfig(
                "a table cannot be added into itself".to_owned(),
            ));
        }
        self.ensure_cell(row, col);
        let cell = &mut self.rows[row][col];
        if !cell.placeholder {
            return Err(ChartError::InvalidConfig(format!(
                "table cell ({row}, {col}) is already occupied"
            )));
        }
        if let Some(context) = &self.context {
            component.borrow_mut().anchor(context)?;
        }
        *cell = TableCell::occupied(component);
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Replaces `component` with a placeholder and detaches it.
    pub fn remove(&mut self, component: &ComponentHandle) -> bool {
        let Some((row, col)) = self.position_of(component) else {
            return false;
        };
        let removed = std::mem::replace(&mut self.rows[row][col], TableCell::placeholder());
        removed.component.borrow_mut().detach();
        if let Some(context) = &self.context {
            if let Err(err) = self.rows[row][col].component.borrow_mut().anchor(context) {
                debug!(error = %err, "placeholder failed to anchor");
            }
        }
        self.core.invalidate(Invalidation::Layout);
        true
    }

    #[must_use]
    pub fn has(&self, component: &ComponentHandle) -> bool {
        self.position_of(component).is_some()
    }

    #[must_use]
    pub fn component_at(&self, row: usize, col: usize) -> Option<ComponentHandle> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .filter(|cell| !cell.placeholder)
            .map(|cell| Rc::clone(&cell.component))
    }

    fn position_of(&self, component: &ComponentHandle) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, cells)| {
            cells
                .iter()
                .position(|cell| !cell.placeholder && Rc::ptr_eq(&cell.component, component))
                .map(|c| (r, c))
        })
    }

    fn ensure_cell(&mut self, row: usize, col: usize) {
        let columns = self.col_count().max(col + 1);
        while self.rows.len() <= row {
            self.rows.push(Vec::new());
            self.row_weights.push(None);
        }
        self.col_weights.resize(columns, None);
        for cells in &mut self.rows {
            let start = cells.len();
            cells.resize_with(columns, TableCell::placeholder);
            if let Some(context) = &self.context {
                for cell in &cells[start..] {
                    if let Err(err) = cell.component.borrow_mut().anchor(context) {
                        debug!(error = %err, "placeholder failed to anchor");
                    }
                }
            }
        }
    }

    fn cell(&self, row: usize, col: usize) -> &TableCell {
        &self.rows[row][col]
    }

    fn row_track_weights(&self) -> Vec<f64> {
        self.row_weights
            .iter()
            .enumerate()
            .map(|(row, explicit)| {
                explicit.unwrap_or_else(|| {
                    let all_fixed = self.rows[row]
                        .iter()
                        .all(|cell| cell.component.borrow().is_fixed_height());
                    if all_fixed { 0.0 } else { 1.0 }
                })
            })
            .collect()
    }

    fn col_track_weights(&self) -> Vec<f64> {
        self.col_weights
            .iter()
            .enumerate()
            .map(|(col, explicit)| {
                explicit.unwrap_or_else(|| {
                    let all_fixed = self
                        .rows
                        .iter()
                        .all(|cells| cells[col].component.borrow().is_fixed_width());
                    if all_fixed { 0.0 } else { 1.0 }
                })
            })
            .collect()
    }

    fn determine_guarantees(&self, offered_widths: &[f64], offered_heights: &[f64]) -> Guarantees {
        let cols = self.col_count();
        let rows = self.row_count();
        let mut out = Guarantees {
            capped_widths: vec![0.0; cols],
            capped_heights: vec![0.0; rows],
            min_widths: vec![0.0; cols],
            min_heights: vec![0.0; rows],
            wants_width: vec![false; cols],
            wants_height: vec![false; rows],
        };
        let tolerance = self.tuning.tolerance;
        for row in 0..rows {
            for col in 0..cols {
                let offered_w = offered_widths[col];
                let offered_h = offered_heights[row];
                let request = self
                    .cell(row, col)
                    .component
                    .borrow()
                    .requested_space(offered_w, offered_h);
                out.capped_widths[col] = out.capped_widths[col].max(request.min_width.min(offered_w));
                out.capped_heights[row] =
                    out.capped_heights[row].max(request.min_height.min(offered_h));
                out.min_widths[col] = out.min_widths[col].max(request.min_width);
                out.min_heights[row] = out.min_heights[row].max(request.min_height);
                out.wants_width[col] |= request.min_width > offered_w + tolerance;
                out.wants_height[row] |= request.min_height > offered_h + tolerance;
            }
        }
        out
    }

    fn spacing_along(&self, axis: LayoutAxis) -> f64 {
        match axis {
            LayoutAxis::Width => {
                self.col_padding * self.col_count().saturating_sub(1) as f64 + 2.0 * self.x_margin
            }
            LayoutAxis::Height => {
                self.row_padding * self.row_count().saturating_sub(1) as f64 + 2.0 * self.y_margin
            }
        }
    }

    /// Runs the guarantee loop: offer every track its guarantee plus a share
    /// of the remaining space, collect minimums, and bias the next offer
    /// towards tracks that wanted more. Stops once free space settles or
    /// after `max_iterations` rounds.
    fn iterate_layout(&self, width: f64, height: f64) -> (AxisResolution, AxisResolution, usize) {
        let width_after_spacing = width - self.spacing_along(LayoutAxis::Width);
        let height_after_spacing = height - self.spacing_along(LayoutAxis::Height);

        let col_weights = self.col_track_weights();
        let row_weights = self.row_track_weights();
        let heuristic = |weights: &[f64]| -> Vec<f64> {
            weights
                .iter()
                .map(|&w| if w == 0.0 { HEURISTIC_FIXED_WEIGHT } else { w })
                .collect()
        };

        let mut col_share = proportional_space(&heuristic(&col_weights), width_after_spacing);
        let mut row_share = proportional_space(&heuristic(&row_weights), height_after_spacing);
        let mut guaranteed_widths = vec![0.0; self.col_count()];
        let mut guaranteed_heights = vec![0.0; self.row_count()];
        let mut last_free: Option<(f64, f64)> = None;
        let mut iterations = 0;

        let guarantees = loop {
            let offered_widths = add_tracks(&guaranteed_widths, &col_share);
            let offered_heights = add_tracks(&guaranteed_heights, &row_share);
            let guarantees = self.determine_guarantees(&offered_widths, &offered_heights);
            guaranteed_widths.clone_from(&guarantees.capped_widths);
            guaranteed_heights.clone_from(&guarantees.capped_heights);

            let free_width = width_after_spacing - guaranteed_widths.iter().sum::<f64>();
            let free_height = height_after_spacing - guaranteed_heights.iter().sum::<f64>();

            let x_weights = bias_wanting_tracks(&col_weights, &guarantees.wants_width);
            let y_weights = bias_wanting_tracks(&row_weights, &guarantees.wants_height);
            col_share = proportional_space(&x_weights, free_width);
            row_share = proportional_space(&y_weights, free_height);
            iterations += 1;

            trace!(
                iterations,
                free_width,
                free_height,
                "table layout iteration"
            );

            let (improves_width, improves_height) = match last_free {
                Some((last_w, last_h)) => (
                    free_width > 0.0 && free_width != last_w,
                    free_height > 0.0 && free_height != last_h,
                ),
                None => (free_width > 0.0, free_height > 0.0),
            };
            last_free = Some((free_width, free_height));
            if !(improves_width || improves_height) {
                break guarantees;
            }
            if iterations >= self.tuning.max_iterations {
                debug!(iterations, "table layout stopped at iteration cap");
                break guarantees;
            }
        };

        let width_resolution = AxisResolution {
            free: width_after_spacing - guarantees.min_widths.iter().sum::<f64>(),
            minimums: guarantees.min_widths,
        };
        let height_resolution = AxisResolution {
            free: height_after_spacing - guarantees.min_heights.iter().sum::<f64>(),
            minimums: guarantees.min_heights,
        };
        (width_resolution, height_resolution, iterations)
    }

    fn resolve_tracks(&self, width: f64, height: f64) -> ChartResult<TableLayout> {
        let (columns, rows, iterations) = self.iterate_layout(width, height);
        let tolerance = self.tuning.tolerance;
        for (axis, resolution, available) in [
            (LayoutAxis::Width, &columns, width),
            (LayoutAxis::Height, &rows, height),
        ] {
            if resolution.free < -tolerance {
                return Err(ChartError::InsufficientSpace {
                    axis,
                    required: available - resolution.free,
                    available,
                });
            }
        }

        let column_widths = add_tracks(
            &columns.minimums,
            &proportional_space(&self.col_track_weights(), columns.free.max(0.0)),
        );
        let row_heights = add_tracks(
            &rows.minimums,
            &proportional_space(&self.row_track_weights(), rows.free.max(0.0)),
        );
        Ok(TableLayout {
            column_widths,
            row_heights,
            iterations,
        })
    }
}

impl LayoutNode for Table {
    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        let (columns, rows, _) = self.iterate_layout(available_width, available_height);
        SpaceRequest::new(
            columns.minimums.iter().sum::<f64>() + self.spacing_along(LayoutAxis::Width),
            rows.minimums.iter().sum::<f64>() + self.spacing_along(LayoutAxis::Height),
        )
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        let request = self.requested_space(width, height);
        let fixed_width = self.is_fixed_width();
        let fixed_height = self.is_fixed_height();
        let bounds = self
            .core
            .place(origin, width, height, request, fixed_width, fixed_height)?;

        let layout = self.resolve_tracks(bounds.size.width, bounds.size.height)?;

        let mut y = bounds.origin.y + self.y_margin;
        for (row, cells) in self.rows.iter().enumerate() {
            let row_height = layout.row_heights[row];
            let mut x = bounds.origin.x + self.x_margin;
            for (col, cell) in cells.iter().enumerate() {
                let col_width = layout.column_widths[col];
                cell.component
                    .borrow_mut()
                    .compute_layout(Point::new(x, y), col_width, row_height)?;
                x += col_width + self.col_padding;
            }
            debug_assert!(
                cells.is_empty()
                    || (x - self.col_padding + self.x_margin - bounds.right()).abs()
                        <= self.tuning.tolerance.max(1e-9) * bounds.size.width.max(1.0),
                "table columns must fill the available width"
            );
            y += row_height + self.row_padding;
        }
        debug_assert!(
            self.rows.is_empty()
                || (y - self.row_padding + self.y_margin - bounds.bottom()).abs()
                    <= self.tuning.tolerance.max(1e-9) * bounds.size.height.max(1.0),
            "table rows must fill the available height"
        );

        debug!(
            component = %self.core.id(),
            rows = self.row_count(),
            cols = self.col_count(),
            iterations = layout.iterations,
            "table layout resolved"
        );
        self.last_layout = Some(layout);
        Ok(())
    }

    fn is_fixed_width(&self) -> bool {
        self.col_track_weights().iter().all(|&w| w == 0.0)
    }

    fn is_fixed_height(&self) -> bool {
        self.row_track_weights().iter().all(|&w| w == 0.0)
    }
}

impl Component for Table {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.core.anchor(context);
        self.context = Some(context.clone());
        for cells in &self.rows {
            for cell in cells {
                cell.component.borrow_mut().anchor(context)?;
            }
        }
        Ok(())
    }

    fn detach(&mut self) {
        for cells in &self.rows {
            for cell in cells {
                cell.component.borrow_mut().detach();
            }
        }
        self.context = None;
        self.core.detach();
    }

    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()> {
        if !self.core.ready_to_render()? {
            return Ok(());
        }
        for cells in &self.rows {
            for cell in cells {
                cell.component.borrow_mut().render(frame)?;
            }
        }
        self.core.mark_rendered();
        Ok(())
    }

    fn children(&self) -> Vec<ComponentHandle> {
        self.rows
            .iter()
            .flatten()
            .filter(|cell| !cell.placeholder)
            .map(|cell| Rc::clone(&cell.component))
            .collect()
    }
}

/// Splits `free` by `weights`; an all-zero weight vector splits evenly.
fn proportional_space(weights: &[f64], free: f64) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        let share = free / weights.len() as f64;
        return vec![share; weights.len()];
    }
    weights.iter().map(|w| free * w / total).collect()
}

fn add_tracks(left: &[f64], right: &[f64]) -> Vec<f64> {
    left.iter().zip(right).map(|(a, b)| a + b).collect()
}

fn bias_wanting_tracks(weights: &[f64], wants: &[bool]) -> Vec<f64> {
    if !wants.iter().any(|&w| w) {
        return weights.to_vec();
    }
    weights
        .iter()
        .zip(wants)
        .map(|(w, &wants)| if wants { w + WANTS_SPACE_BONUS } else { *w })
        .collect()
}

fn validate_weight(weight: Option<f64>) -> ChartResult<()> {
    match weight {
        Some(w) if !w.is_finite() || w < 0.0 => Err(ChartError::InvalidConfig(format!(
            "track weight must be finite and >= 0 (got {w})"
        ))),
        _ => Ok(()),
    }
}

fn validate_spacing(name: &str, value: f64) -> ChartResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ChartError::InvalidConfig(format!(
            "table {name} must be finite and >= 0 (got {value})"
        )));
    }
    Ok(())
}

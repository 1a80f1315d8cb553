use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::component::stacked::{STACK_EXTENT_ATTR, StackState};
use crate::component::{AnchorContext, Component, ComponentCore, layout_leaf};
use crate::core::domain_value::{QuantitativeValue, normalize_key};
use crate::core::extent::BindingKey;
use crate::core::scale::{DataScale, DomainChanged};
use crate::core::types::{ComponentId, Point, SpaceRequest};
use crate::data::{Accessor, DataInput, DatasetChanged, DatasetHandle};
use crate::error::{ChartError, ChartResult};
use crate::layout::LayoutNode;
use crate::render::{DrawCommand, Invalidation, MarkKind, RenderFrame, RenderQueue};

const DATASET_LISTENER_ATTR: &str = "__dataset";
const BASELINE_ATTR: &str = "__baseline";

static NULL_METADATA: Value = Value::Null;

/// Maps `(datum, datum_index, dataset_index)` to a pixel value.
pub type AttrProjector = Rc<dyn Fn(&Value, usize, usize) -> Option<f64>>;

/// Supplies the raw values an attribute contributes to its scale's extent.
pub trait ExtentProvider {
    fn extent_values(&self, attr: &str) -> Vec<Value>;
}

/// Produces the final attribute projectors used when painting.
pub trait AttrProjectorSource {
    fn generate_attr_to_projector(&self) -> IndexMap<String, AttrProjector>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    #[default]
    Scatter,
    Line,
    Bar,
    Area,
}

impl PlotKind {
    #[must_use]
    pub fn mark(self) -> MarkKind {
        match self {
            Self::Scatter => MarkKind::Point,
            Self::Line => MarkKind::LineVertex,
            Self::Bar => MarkKind::Bar,
            Self::Area => MarkKind::AreaVertex,
        }
    }

    /// Bars and areas are drawn from a baseline.
    #[must_use]
    pub fn has_baseline(self) -> bool {
        matches!(self, Self::Bar | Self::Area)
    }
}

/// Owned registration of one `(owner, attr)` pair on a scale.
///
/// Dropping the binding removes its extent and its listener, so a released
/// plot never leaves stale data behind in a shared scale.
pub struct ScaleBinding {
    scale: Rc<dyn DataScale>,
    key: BindingKey,
}

impl ScaleBinding {
    #[must_use]
    pub fn new(scale: Rc<dyn DataScale>, key: BindingKey) -> Self {
        Self { scale, key }
    }

    #[must_use]
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    #[must_use]
    pub fn scale(&self) -> &Rc<dyn DataScale> {
        &self.scale
    }

    pub fn listen<F>(&self, listener: F)
    where
        F: FnMut(&DomainChanged) + 'static,
    {
        self.scale.subscribe(self.key.clone(), Box::new(listener));
    }

    pub fn push_extent(&self, values: &[Value]) {
        self.scale.update_extent_from_values(&self.key, values);
    }

    pub fn clear_extent(&self) {
        self.scale.remove_extent(&self.key);
    }

    pub(crate) fn targets(&self, scale: &Rc<dyn DataScale>) -> bool {
        self.scale.identity() == scale.identity()
    }
}

impl Drop for ScaleBinding {
    fn drop(&mut self) {
        self.scale.remove_extent(&self.key);
        self.scale.unsubscribe(&self.key);
    }
}

impl std::fmt::Debug for ScaleBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleBinding").field("key", &self.key).finish()
    }
}

/// Accessor bound to an attribute, optionally through a scale.
#[derive(Debug)]
pub struct Projection {
    pub accessor: Accessor,
    pub binding: Option<ScaleBinding>,
}

/// Cross-borrow channel from listeners back to the plot.
struct PlotSignals {
    owner: ComponentId,
    queue: RefCell<Option<RenderQueue>>,
    stale: Cell<bool>,
}

impl PlotSignals {
    fn request(&self, invalidation: Invalidation) {
        if let Some(queue) = self.queue.borrow().as_ref() {
            queue.request(self.owner, invalidation);
        }
    }
}

pub(crate) struct PlotModel {
    owner: ComponentId,
    kind: PlotKind,
    projections: IndexMap<String, Projection>,
    datasets: Vec<DatasetHandle>,
    anchored: bool,
    baseline: f64,
    pub(crate) stacking: Option<StackState>,
}

impl PlotModel {
    fn value_attr(&self) -> &'static str {
        self.stacking
            .as_ref()
            .map_or("y", |stacking| stacking.orientation.value_attr())
    }

    fn baseline_attr(&self) -> &'static str {
        self.stacking
            .as_ref()
            .map_or("y0", |stacking| stacking.orientation.baseline_attr())
    }

    fn value_scale(&self) -> Option<&Rc<dyn DataScale>> {
        self.projections
            .get(self.value_attr())
            .and_then(|projection| projection.binding.as_ref())
            .map(ScaleBinding::scale)
    }

    fn baseline_key(&self) -> String {
        BindingKey::new(self.owner, BASELINE_ATTR).to_string()
    }

    /// Recomputes stack offsets and, while anchored, pushes every bound
    /// attribute's extent into its scale.
    pub(crate) fn refresh_extents(&mut self) {
        if let Some(stacking) = self.stacking.as_mut() {
            stacking.refresh(self.owner, &self.projections, &self.datasets, self.anchored);
        }
        if !self.anchored {
            return;
        }
        let stacked_attr = self
            .stacking
            .as_ref()
            .map(|stacking| stacking.orientation.value_attr());
        for (attr, projection) in &self.projections {
            let Some(binding) = &projection.binding else {
                continue;
            };
            if stacked_attr == Some(attr.as_str()) {
                binding.clear_extent();
                continue;
            }
            binding.push_extent(&collect_values(&self.datasets, &projection.accessor));
        }
        self.update_baseline_exception();
        debug!(component = %self.owner, datasets = self.datasets.len(), "plot extents refreshed");
    }

    fn clear_extents(&mut self) {
        for projection in self.projections.values() {
            if let Some(binding) = &projection.binding {
                binding.clear_extent();
            }
        }
        self.clear_baseline_exception();
        if let Some(stacking) = self.stacking.as_mut() {
            stacking.release();
        }
    }

    fn update_baseline_exception(&self) {
        if !self.kind.has_baseline() {
            return;
        }
        let Some(scale) = self.value_scale() else {
            return;
        };
        let key = self.baseline_key();
        match self.kind {
            PlotKind::Bar => {
                scale.set_padding_exception(&key, Some(self.baseline));
                scale.set_included_value(&key, Some(self.baseline));
            }
            PlotKind::Area => {
                let projected_baseline = self
                    .projections
                    .get(self.baseline_attr())
                    .filter(|_| self.stacking.is_none());
                match projected_baseline {
                    // The projected baseline registers its own extent.
                    Some(projection) => {
                        let constant =
                            constant_number(&collect_values(&self.datasets, &projection.accessor));
                        scale.set_padding_exception(&key, constant);
                        scale.set_included_value(&key, None);
                    }
                    None => {
                        scale.set_padding_exception(&key, Some(self.baseline));
                        scale.set_included_value(&key, Some(self.baseline));
                    }
                }
            }
            PlotKind::Scatter | PlotKind::Line => {}
        }
    }

    fn clear_baseline_exception(&self) {
        if !self.kind.has_baseline() {
            return;
        }
        if let Some(scale) = self.value_scale() {
            let key = self.baseline_key();
            scale.set_padding_exception(&key, None);
            scale.set_included_value(&key, None);
        }
    }

    fn projectors(&self) -> IndexMap<String, AttrProjector> {
        let metadata: Rc<Vec<Value>> = Rc::new(
            self.datasets
                .iter()
                .map(|dataset| dataset.metadata().clone())
                .collect(),
        );
        let mut out: IndexMap<String, AttrProjector> = IndexMap::new();
        for (attr, projection) in &self.projections {
            let accessor = projection.accessor.clone();
            let scale = projection.binding.as_ref().map(|b| Rc::clone(b.scale()));
            let metadata = Rc::clone(&metadata);
            let projector: AttrProjector = Rc::new(move |datum, index, dataset| {
                let meta = metadata.get(dataset).unwrap_or(&NULL_METADATA);
                project_value(scale.as_deref(), &accessor.apply(datum, index, meta))
            });
            out.insert(attr.clone(), projector);
        }

        let value_attr = self.value_attr();
        let baseline_attr = self.baseline_attr();
        let value_scale = self.value_scale().cloned();

        if let Some(stacking) = &self.stacking {
            let key_accessor = self
                .projections
                .get(stacking.orientation.key_attr())
                .map(|projection| projection.accessor.clone());
            let value_accessor = self
                .projections
                .get(value_attr)
                .map(|projection| projection.accessor.clone());
            if let (Some(key_accessor), Some(value_accessor)) = (key_accessor, value_accessor) {
                let offsets = Rc::new(stacking.offsets.clone());
                let lookup = {
                    let metadata = Rc::clone(&metadata);
                    let offsets = Rc::clone(&offsets);
                    move |datum: &Value, index: usize, dataset: usize| -> f64 {
                        let meta = metadata.get(dataset).unwrap_or(&NULL_METADATA);
                        let key = normalize_key(&key_accessor.apply(datum, index, meta));
                        offsets
                            .get(dataset)
                            .and_then(|per_key| per_key.get(&key))
                            .copied()
                            .unwrap_or(0.0)
                    }
                };
                let lookup = Rc::new(lookup);

                let top_scale = value_scale.clone();
                let top_lookup = Rc::clone(&lookup);
                let top_metadata = Rc::clone(&metadata);
                let top: AttrProjector = Rc::new(move |datum, index, dataset| {
                    let meta = top_metadata.get(dataset).unwrap_or(&NULL_METADATA);
                    let value =
                        f64::from_json(&value_accessor.apply(datum, index, meta)).unwrap_or(0.0);
                    let stacked = value + top_lookup(datum, index, dataset);
                    project_value(top_scale.as_deref(), &Value::from(stacked))
                });
                out.insert(value_attr.to_owned(), top);

                let base_scale = value_scale;
                let base: AttrProjector = Rc::new(move |datum, index, dataset| {
                    let offset = lookup(datum, index, dataset);
                    project_value(base_scale.as_deref(), &Value::from(offset))
                });
                out.insert(baseline_attr.to_owned(), base);
            }
        } else if self.kind.has_baseline() && !self.projections.contains_key(baseline_attr) {
            let baseline = Value::from(self.baseline);
            let base: AttrProjector =
                Rc::new(move |_, _, _| project_value(value_scale.as_deref(), &baseline));
            out.insert(baseline_attr.to_owned(), base);
        }
        out
    }
}

impl Drop for PlotModel {
    fn drop(&mut self) {
        self.clear_baseline_exception();
        let key = dataset_listener_key(self.owner);
        for dataset in &self.datasets {
            dataset.unsubscribe(&key);
        }
    }
}

/// Data-driven component binding accessors to scales.
///
/// While anchored, every scaled attribute keeps its extent registered on the
/// scale under `(plot id, attr)`; dataset changes refresh the extents
/// immediately and queue a repaint.
pub struct Plot {
    core: ComponentCore,
    model: Rc<RefCell<PlotModel>>,
    signals: Rc<PlotSignals>,
}

impl Plot {
    #[must_use]
    pub fn new(kind: PlotKind) -> Self {
        Self::build(kind, None)
    }

    pub(crate) fn build(kind: PlotKind, stacking: Option<StackState>) -> Self {
        let core = ComponentCore::new();
        let owner = core.id();
        Self {
            core,
            model: Rc::new(RefCell::new(PlotModel {
                owner,
                kind,
                projections: IndexMap::new(),
                datasets: Vec::new(),
                anchored: false,
                baseline: 0.0,
                stacking,
            })),
            signals: Rc::new(PlotSignals {
                owner,
                queue: RefCell::new(None),
                stale: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> PlotKind {
        self.model.borrow().kind
    }

    /// Binds `attr` to `accessor` through `scale`.
    pub fn project<S>(
        &mut self,
        attr: &str,
        accessor: impl Into<Accessor>,
        scale: &S,
    ) -> ChartResult<()>
    where
        S: DataScale + Clone + 'static,
    {
        let scale: Rc<dyn DataScale> = Rc::new(scale.clone());
        self.project_dyn(attr, accessor.into(), Some(scale))
    }

    /// Binds `attr` to `accessor` with values used as pixels directly.
    pub fn project_unscaled(&mut self, attr: &str, accessor: impl Into<Accessor>) -> ChartResult<()> {
        self.project_dyn(attr, accessor.into(), None)
    }

    /// Replaces any earlier projection of `attr`; the previous binding is
    /// released before the new one registers.
    pub fn project_dyn(
        &mut self,
        attr: &str,
        accessor: Accessor,
        scale: Option<Rc<dyn DataScale>>,
    ) -> ChartResult<()> {
        if attr.is_empty() || attr == STACK_EXTENT_ATTR || attr.starts_with("__") {
            return Err(ChartError::InvalidConfig(format!(
                "`{attr}` cannot be used as a projected attribute"
            )));
        }
        {
            let mut model = self.model.borrow_mut();
            if attr == model.value_attr() {
                model.clear_baseline_exception();
            }
            model.projections.shift_remove(attr);

            let binding = scale.map(|scale| {
                let binding = ScaleBinding::new(scale, BindingKey::new(model.owner, attr));
                let signals = Rc::downgrade(&self.signals);
                binding.listen(move |_: &DomainChanged| {
                    if let Some(signals) = signals.upgrade() {
                        signals.request(Invalidation::Render);
                    }
                });
                binding
            });
            model
                .projections
                .insert(attr.to_owned(), Projection { accessor, binding });
            model.refresh_extents();
        }
        self.core.invalidate(Invalidation::Render);
        Ok(())
    }

    #[must_use]
    pub fn projection(&self, attr: &str) -> Option<Accessor> {
        self.model
            .borrow()
            .projections
            .get(attr)
            .map(|projection| projection.accessor.clone())
    }

    /// Adds a dataset; raw records are wrapped into a new dataset first.
    /// Adding a dataset that is already present is a no-op.
    pub fn add_dataset(&mut self, input: impl Into<DataInput>) -> DatasetHandle {
        let dataset = input.into().into_handle();
        {
            let mut model = self.model.borrow_mut();
            if model.datasets.iter().any(|known| known.ptr_eq(&dataset)) {
                debug!(component = %model.owner, "dataset already attached to plot");
                return dataset;
            }
            self.observe(model.owner, &dataset);
            model.datasets.push(dataset.clone());
            model.refresh_extents();
        }
        self.core.invalidate(Invalidation::Render);
        dataset
    }

    pub fn remove_dataset(&mut self, dataset: &DatasetHandle) -> bool {
        {
            let mut model = self.model.borrow_mut();
            let Some(index) = model.datasets.iter().position(|known| known.ptr_eq(dataset)) else {
                return false;
            };
            let removed = model.datasets.remove(index);
            removed.unsubscribe(&dataset_listener_key(model.owner));
            model.refresh_extents();
        }
        self.core.invalidate(Invalidation::Render);
        true
    }

    #[must_use]
    pub fn datasets(&self) -> Vec<DatasetHandle> {
        self.model.borrow().datasets.clone()
    }

    /// Value bars grow from and areas fill to when no baseline is projected.
    pub fn set_baseline_value(&mut self, baseline: f64) -> ChartResult<()> {
        if !baseline.is_finite() {
            return Err(ChartError::InvalidConfig(format!(
                "baseline must be finite (got {baseline})"
            )));
        }
        {
            let mut model = self.model.borrow_mut();
            model.baseline = baseline;
            model.refresh_extents();
        }
        self.core.invalidate(Invalidation::Render);
        Ok(())
    }

    #[must_use]
    pub fn baseline_value(&self) -> f64 {
        self.model.borrow().baseline
    }

    /// Detaches and releases every scale binding and dataset subscription.
    pub fn destroy(&mut self) {
        self.detach();
        let mut model = self.model.borrow_mut();
        model.clear_baseline_exception();
        let key = dataset_listener_key(model.owner);
        for dataset in model.datasets.drain(..) {
            dataset.unsubscribe(&key);
        }
        model.projections.clear();
        if let Some(stacking) = model.stacking.as_mut() {
            stacking.release();
        }
    }

    pub(crate) fn model(&self) -> std::cell::Ref<'_, PlotModel> {
        self.model.borrow()
    }

    pub(crate) fn model_mut(&self) -> std::cell::RefMut<'_, PlotModel> {
        self.model.borrow_mut()
    }

    fn observe(&self, owner: ComponentId, dataset: &DatasetHandle) {
        let model = Rc::downgrade(&self.model);
        let signals: Weak<PlotSignals> = Rc::downgrade(&self.signals);
        dataset.subscribe(dataset_listener_key(owner), move |_: &DatasetChanged| {
            let (Some(model), Some(signals)) = (model.upgrade(), signals.upgrade()) else {
                return;
            };
            match model.try_borrow_mut() {
                Ok(mut model) => model.refresh_extents(),
                Err(_) => signals.stale.set(true),
            }
            signals.request(Invalidation::Render);
        });
    }

    fn refresh_if_stale(&self) {
        if self.signals.stale.replace(false) {
            self.model.borrow_mut().refresh_extents();
        }
    }
}

impl ExtentProvider for Plot {
    fn extent_values(&self, attr: &str) -> Vec<Value> {
        let model = self.model.borrow();
        if attr == STACK_EXTENT_ATTR {
            return model
                .stacking
                .as_ref()
                .map(|stacking| vec![Value::from(stacking.extent.0), Value::from(stacking.extent.1)])
                .unwrap_or_default();
        }
        model
            .projections
            .get(attr)
            .map(|projection| collect_values(&model.datasets, &projection.accessor))
            .unwrap_or_default()
    }
}

impl AttrProjectorSource for Plot {
    fn generate_attr_to_projector(&self) -> IndexMap<String, AttrProjector> {
        self.model.borrow().projectors()
    }
}

impl LayoutNode for Plot {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        SpaceRequest::NONE
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        let bounds = layout_leaf(self, origin, width, height)?;
        self.refresh_if_stale();
        let model = self.model.borrow();
        for (attr, projection) in &model.projections {
            let Some(binding) = &projection.binding else {
                continue;
            };
            if attr.starts_with('x') {
                binding.scale().set_range((0.0, bounds.size.width))?;
            } else if attr.starts_with('y') {
                binding.scale().set_range((bounds.size.height, 0.0))?;
            }
        }
        Ok(())
    }
}

impl Component for Plot {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.core.anchor(context);
        *self.signals.queue.borrow_mut() = Some(context.queue.clone());
        self.signals.stale.set(false);
        let mut model = self.model.borrow_mut();
        model.anchored = true;
        model.refresh_extents();
        Ok(())
    }

    fn detach(&mut self) {
        {
            let mut model = self.model.borrow_mut();
            model.anchored = false;
            model.clear_extents();
        }
        *self.signals.queue.borrow_mut() = None;
        self.core.detach();
    }

    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()> {
        if !self.core.ready_to_render()? {
            return Ok(());
        }
        self.refresh_if_stale();
        let origin = self.core.bounds().origin;
        let component = self.core.id();
        let model = self.model.borrow();
        let mark = model.kind.mark();
        let projectors = model.projectors();
        let mut skipped = 0_usize;

        for (dataset_index, dataset) in model.datasets.iter().enumerate() {
            let data = dataset.data();
            'datum: for (datum_index, datum) in data.iter().enumerate() {
                let mut attrs = IndexMap::with_capacity(projectors.len());
                for (attr, projector) in &projectors {
                    match projector(datum, datum_index, dataset_index) {
                        Some(value) => {
                            attrs.insert(attr.clone(), value + origin_shift(attr, origin));
                        }
                        None if is_positional(attr) => {
                            skipped += 1;
                            continue 'datum;
                        }
                        None => {}
                    }
                }
                frame.push_command(DrawCommand {
                    component,
                    mark,
                    dataset_index,
                    datum_index,
                    attrs,
                });
            }
        }
        if skipped > 0 {
            trace!(component = %component, skipped, "skipped data without a position");
        }
        drop(model);
        self.core.mark_rendered();
        Ok(())
    }
}

fn dataset_listener_key(owner: ComponentId) -> BindingKey {
    BindingKey::new(owner, DATASET_LISTENER_ATTR)
}

pub(crate) fn collect_values(datasets: &[DatasetHandle], accessor: &Accessor) -> Vec<Value> {
    let mut values = Vec::new();
    for dataset in datasets {
        let data = dataset.data();
        let metadata = dataset.metadata();
        values.extend(
            data.iter()
                .enumerate()
                .map(|(index, datum)| accessor.apply(datum, index, &metadata)),
        );
    }
    values
}

fn constant_number(values: &[Value]) -> Option<f64> {
    let mut numbers = values.iter().filter_map(f64::from_json);
    let first = numbers.next()?;
    numbers.all(|value| value == first).then_some(first)
}

fn project_value(scale: Option<&dyn DataScale>, value: &Value) -> Option<f64> {
    match scale {
        Some(scale) => scale.project(value),
        None => f64::from_json(value).filter(|value| value.is_finite()),
    }
}

fn is_positional(attr: &str) -> bool {
    matches!(attr, "x" | "y")
}

fn origin_shift(attr: &str, origin: Point) -> f64 {
    if attr.starts_with('x') {
        origin.x
    } else if attr.starts_with('y') {
        origin.y
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::{AttrProjectorSource, ExtentProvider, Plot, PlotKind};
    use crate::component::{AnchorContext, Component};
    use crate::core::scale::LinearScale;
    use crate::core::types::{Point, SurfaceId};
    use crate::core::{QuantitativeScale, Size};
    use crate::data::{Accessor, DatasetHandle};
    use crate::layout::LayoutNode;
    use crate::render::{MonospaceMeasurer, RenderFrame, RenderQueue};

    fn context() -> AnchorContext {
        AnchorContext {
            surface: SurfaceId::new(1),
            queue: RenderQueue::new(),
            measurer: Rc::new(MonospaceMeasurer::default()),
        }
    }

    fn points() -> Vec<serde_json::Value> {
        vec![json!({"x": 0, "y": 10}), json!({"x": 5, "y": 30})]
    }

    #[test]
    fn extents_register_only_while_anchored() {
        let x = LinearScale::new(QuantitativeScale::linear());
        let mut plot = Plot::new(PlotKind::Scatter);
        plot.project("x", Accessor::field("x"), &x).expect("project");
        plot.add_dataset(points());
        assert_eq!(x.extent_count(), 0);

        plot.anchor(&context()).expect("anchor");
        assert_eq!(x.extent_count(), 1);

        plot.detach();
        assert_eq!(x.extent_count(), 0);
    }

    #[test]
    fn dataset_changes_refresh_scale_extent() {
        let x = LinearScale::new(QuantitativeScale::linear());
        x.update_domainer(|domainer| {
            domainer.set_pad_proportion(0.0).expect("valid pad");
        });
        let dataset = DatasetHandle::from_values(points());
        let mut plot = Plot::new(PlotKind::Line);
        plot.project("x", "x", &x).expect("project");
        plot.add_dataset(dataset.clone());
        plot.anchor(&context()).expect("anchor");
        assert_eq!(x.domain(), (0.0, 5.0));

        dataset.push(json!({"x": 20, "y": 0}));
        assert_eq!(x.domain(), (0.0, 20.0));
    }

    #[test]
    fn dropping_plot_releases_bindings() {
        let y = LinearScale::new(QuantitativeScale::linear());
        let dataset = DatasetHandle::from_values(points());
        {
            let mut plot = Plot::new(PlotKind::Scatter);
            plot.project("y", "y", &y).expect("project");
            plot.add_dataset(dataset.clone());
            plot.anchor(&context()).expect("anchor");
            assert_eq!(y.listener_count(), 1);
            assert_eq!(dataset.listener_count(), 1);
        }
        assert_eq!(y.extent_count(), 0);
        assert_eq!(y.listener_count(), 0);
        assert_eq!(dataset.listener_count(), 0);
    }

    #[test]
    fn constant_area_baseline_is_not_padded() {
        let y = LinearScale::new(QuantitativeScale::linear());
        let mut plot = Plot::new(PlotKind::Area);
        plot.project("y", "y", &y).expect("project");
        plot.add_dataset(points());
        plot.anchor(&context()).expect("anchor");
        let (lo, hi) = y.domain();
        assert_eq!(lo, 0.0);
        assert!(hi > 30.0);
    }

    #[test]
    fn render_offsets_positions_by_bounds() {
        let x = LinearScale::new(QuantitativeScale::linear());
        x.set_domain((0.0, 10.0));
        let mut plot = Plot::new(PlotKind::Scatter);
        plot.project("x", "x", &x).expect("project");
        plot.project_unscaled("y", Accessor::constant(4.0)).expect("project");
        plot.add_dataset(points());
        plot.anchor(&context()).expect("anchor");
        plot.compute_layout(Point::new(10.0, 20.0), 100.0, 50.0)
            .expect("layout");

        let mut frame = RenderFrame::new(SurfaceId::new(1), Size::new(200.0, 200.0));
        plot.render(&mut frame).expect("render");
        assert_eq!(frame.commands.len(), 2);
        assert_eq!(frame.commands[1].attr("x"), Some(60.0));
        assert_eq!(frame.commands[1].attr("y"), Some(24.0));
    }

    #[test]
    fn projectors_map_through_scales() {
        let x = LinearScale::new(QuantitativeScale::linear());
        x.set_domain((0.0, 10.0));
        x.set_range((0.0, 100.0)).expect("range");
        let mut plot = Plot::new(PlotKind::Scatter);
        plot.project("x", "x", &x).expect("project");
        plot.add_dataset(points());
        let projectors = plot.generate_attr_to_projector();
        assert_eq!(projectors["x"](&json!({"x": 5}), 0, 0), Some(50.0));
        assert_eq!(plot.extent_values("x"), vec![json!(0), json!(5)]);
    }

    #[test]
    fn reserved_attribute_is_rejected() {
        let mut plot = Plot::new(PlotKind::Scatter);
        assert!(plot.project_unscaled("__stack_extent", "x").is_err());
    }
}

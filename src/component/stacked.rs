use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::component::plot::{
    AttrProjector, AttrProjectorSource, ExtentProvider, Plot, PlotKind, Projection, ScaleBinding,
};
use crate::component::{AnchorContext, Component, ComponentCore};
use crate::core::extent::BindingKey;
use crate::core::stacking::{
    StackDatum, StackOffsets, StackOrder, StackSeries, compute_stack_extent, compute_stack_offsets,
};
use crate::core::types::{ComponentId, Point, SpaceRequest};
use crate::data::{Accessor, DataInput, DatasetHandle};
use crate::error::{ChartError, ChartResult};
use crate::layout::LayoutNode;
use crate::render::{Invalidation, RenderFrame};

/// Attribute under which a stacked plot registers its stack extent on the
/// value scale.
pub const STACK_EXTENT_ATTR: &str = "__stack_extent";

/// Axis along which values pile up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingOrientation {
    /// Keys on `x`, stacked values on `y`.
    #[default]
    Vertical,
    /// Keys on `y`, stacked values on `x`.
    Horizontal,
}

impl StackingOrientation {
    #[must_use]
    pub fn key_attr(self) -> &'static str {
        match self {
            Self::Vertical => "x",
            Self::Horizontal => "y",
        }
    }

    #[must_use]
    pub fn value_attr(self) -> &'static str {
        match self {
            Self::Vertical => "y",
            Self::Horizontal => "x",
        }
    }

    #[must_use]
    pub fn baseline_attr(self) -> &'static str {
        match self {
            Self::Vertical => "y0",
            Self::Horizontal => "x0",
        }
    }
}

impl FromStr for StackingOrientation {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            other => Err(ChartError::InvalidConfig(format!(
                "unsupported stacking orientation `{other}`"
            ))),
        }
    }
}

/// Read access to the offsets computed by the last stacking pass.
pub trait StackOffsetProvider {
    /// One key→offset map per dataset, in dataset order.
    fn stack_offsets(&self) -> Vec<StackOffsets>;

    fn stack_offset(&self, dataset_index: usize, key: &str) -> Option<f64> {
        self.stack_offsets()
            .get(dataset_index)
            .and_then(|offsets| offsets.get(key).copied())
    }
}

pub(crate) struct StackState {
    pub(crate) orientation: StackingOrientation,
    pub(crate) order: StackOrder,
    pub(crate) offsets: Vec<StackOffsets>,
    pub(crate) extent: (f64, f64),
    binding: Option<ScaleBinding>,
}

impl StackState {
    fn new(orientation: StackingOrientation) -> Self {
        Self {
            orientation,
            order: StackOrder::default(),
            offsets: Vec::new(),
            extent: (0.0, 0.0),
            binding: None,
        }
    }

    /// Restacks every dataset and, while anchored, registers the stack
    /// extent on the value scale under [`STACK_EXTENT_ATTR`].
    pub(crate) fn refresh(
        &mut self,
        owner: ComponentId,
        projections: &IndexMap<String, Projection>,
        datasets: &[DatasetHandle],
        anchored: bool,
    ) {
        let key = projections.get(self.orientation.key_attr());
        let value = projections.get(self.orientation.value_attr());
        let (Some(key), Some(value)) = (key, value) else {
            self.offsets.clear();
            self.extent = (0.0, 0.0);
            self.binding = None;
            return;
        };

        let series = stack_series(datasets, &key.accessor, &value.accessor);
        self.offsets = compute_stack_offsets(&series, self.order);
        self.extent = compute_stack_extent(&series, &self.offsets, None);

        let Some(value_binding) = &value.binding else {
            self.binding = None;
            return;
        };
        if !anchored {
            return;
        }
        let retarget = self
            .binding
            .as_ref()
            .is_none_or(|binding| !binding.targets(value_binding.scale()));
        if retarget {
            self.binding = Some(ScaleBinding::new(
                Rc::clone(value_binding.scale()),
                BindingKey::new(owner, STACK_EXTENT_ATTR),
            ));
        }
        if let Some(binding) = &self.binding {
            if series.iter().all(Vec::is_empty) {
                binding.clear_extent();
            } else {
                binding.push_extent(&[Value::from(self.extent.0), Value::from(self.extent.1)]);
            }
        }
        debug!(
            component = %owner,
            datasets = series.len(),
            min = self.extent.0,
            max = self.extent.1,
            "stack extent updated"
        );
    }

    pub(crate) fn release(&mut self) {
        self.binding = None;
    }
}

fn stack_series(datasets: &[DatasetHandle], key: &Accessor, value: &Accessor) -> Vec<StackSeries> {
    datasets
        .iter()
        .map(|dataset| {
            let data = dataset.data();
            let metadata = dataset.metadata();
            data.iter()
                .enumerate()
                .map(|(index, datum)| {
                    StackDatum::from_values(
                        &key.apply(datum, index, &metadata),
                        &value.apply(datum, index, &metadata),
                    )
                })
                .collect()
        })
        .collect()
}

/// Bar or area plot whose datasets pile on top of each other per key.
///
/// Positive and negative values stack separately. Extents of the value
/// attribute are replaced by the stack extent.
pub struct StackedPlot {
    plot: Plot,
}

impl StackedPlot {
    pub fn new(kind: PlotKind, orientation: StackingOrientation) -> ChartResult<Self> {
        if !kind.has_baseline() {
            return Err(ChartError::InvalidConfig(format!(
                "{kind:?} plots cannot be stacked"
            )));
        }
        Ok(Self {
            plot: Plot::build(kind, Some(StackState::new(orientation))),
        })
    }

    #[must_use]
    pub fn plot(&self) -> &Plot {
        &self.plot
    }

    pub fn plot_mut(&mut self) -> &mut Plot {
        &mut self.plot
    }

    #[must_use]
    pub fn orientation(&self) -> StackingOrientation {
        self.stacking(|state| state.orientation)
    }

    #[must_use]
    pub fn stack_order(&self) -> StackOrder {
        self.stacking(|state| state.order)
    }

    pub fn set_stack_order(&mut self, order: StackOrder) {
        {
            let mut model = self.plot.model_mut();
            if let Some(state) = model.stacking.as_mut() {
                state.order = order;
            }
            model.refresh_extents();
        }
        self.plot.core_mut().invalidate(Invalidation::Render);
    }

    /// `[min, max]` of every stacked top, always including zero.
    #[must_use]
    pub fn stack_extent(&self) -> (f64, f64) {
        self.stacking(|state| state.extent)
    }

    pub fn project<S>(&mut self, attr: &str, accessor: impl Into<Accessor>, scale: &S) -> ChartResult<()>
    where
        S: crate::core::DataScale + Clone + 'static,
    {
        self.plot.project(attr, accessor, scale)
    }

    pub fn project_unscaled(&mut self, attr: &str, accessor: impl Into<Accessor>) -> ChartResult<()> {
        self.plot.project_unscaled(attr, accessor)
    }

    pub fn add_dataset(&mut self, input: impl Into<DataInput>) -> DatasetHandle {
        self.plot.add_dataset(input)
    }

    pub fn remove_dataset(&mut self, dataset: &DatasetHandle) -> bool {
        self.plot.remove_dataset(dataset)
    }

    pub fn destroy(&mut self) {
        self.plot.destroy();
    }

    fn stacking<R: Default>(&self, read: impl FnOnce(&StackState) -> R) -> R {
        self.plot.model().stacking.as_ref().map(read).unwrap_or_default()
    }
}

impl StackOffsetProvider for StackedPlot {
    fn stack_offsets(&self) -> Vec<StackOffsets> {
        self.stacking(|state| state.offsets.clone())
    }
}

impl ExtentProvider for StackedPlot {
    fn extent_values(&self, attr: &str) -> Vec<Value> {
        self.plot.extent_values(attr)
    }
}

impl AttrProjectorSource for StackedPlot {
    fn generate_attr_to_projector(&self) -> IndexMap<String, AttrProjector> {
        self.plot.generate_attr_to_projector()
    }
}

impl LayoutNode for StackedPlot {
    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        self.plot.requested_space(available_width, available_height)
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        self.plot.compute_layout(origin, width, height)
    }
}

impl Component for StackedPlot {
    fn core(&self) -> &ComponentCore {
        self.plot.core()
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        self.plot.core_mut()
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.plot.anchor(context)
    }

    fn detach(&mut self) {
        self.plot.detach();
    }

    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()> {
        self.plot.render(frame)
    }
}

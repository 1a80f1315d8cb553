//! Component tree: lifecycle core shared by every node, plus the concrete
//! leaf components and plots.

mod group;
mod label;
mod plot;
mod spacer;
mod stacked;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

pub use group::Group;
pub use label::{Label, LabelOrientation};
pub use plot::{
    AttrProjector, AttrProjectorSource, ExtentProvider, Plot, PlotKind, Projection, ScaleBinding,
};
pub use spacer::Spacer;
pub use stacked::{STACK_EXTENT_ATTR, StackOffsetProvider, StackedPlot, StackingOrientation};

use crate::core::types::{Bounds, ComponentId, Point, Size, SpaceRequest, SurfaceId};
use crate::error::{ChartError, ChartResult};
use crate::layout::LayoutNode;
use crate::render::{Invalidation, RenderFrame, RenderQueue, TextMeasurer};

/// Lifecycle of a component.
///
/// Data or scale changes step a component back to `LaidOut` (repaint) or
/// `Anchored` (re-layout) without re-anchoring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ComponentState {
    #[default]
    Unanchored,
    Anchored,
    LaidOut,
    Rendered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl XAlignment {
    #[must_use]
    pub fn proportion(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl FromStr for XAlignment {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(ChartError::InvalidConfig(format!(
                "unsupported x alignment `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

impl YAlignment {
    #[must_use]
    pub fn proportion(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

impl FromStr for YAlignment {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(ChartError::InvalidConfig(format!(
                "unsupported y alignment `{other}`"
            ))),
        }
    }
}

/// Everything a component receives when it is attached to a surface.
#[derive(Clone)]
pub struct AnchorContext {
    pub surface: SurfaceId,
    pub queue: RenderQueue,
    pub measurer: Rc<dyn TextMeasurer>,
}

/// Identity, lifecycle state and placement shared by every component.
#[derive(Debug, Clone)]
pub struct ComponentCore {
    id: ComponentId,
    state: ComponentState,
    surface: Option<SurfaceId>,
    queue: Option<RenderQueue>,
    bounds: Bounds,
    x_alignment: XAlignment,
    y_alignment: YAlignment,
    x_offset: f64,
    y_offset: f64,
}

impl Default for ComponentCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentCore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ComponentId::next(),
            state: ComponentState::Unanchored,
            surface: None,
            queue: None,
            bounds: Bounds::default(),
            x_alignment: XAlignment::default(),
            y_alignment: YAlignment::default(),
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ComponentState {
        self.state
    }

    #[must_use]
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.state != ComponentState::Unanchored
    }

    pub fn anchor(&mut self, context: &AnchorContext) {
        self.surface = Some(context.surface);
        self.queue = Some(context.queue.clone());
        self.state = ComponentState::Anchored;
        trace!(component = %self.id, surface = context.surface.raw(), "component anchored");
    }

    pub fn detach(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.cancel(self.id);
        }
        self.surface = None;
        self.state = ComponentState::Unanchored;
    }

    pub fn set_alignment(&mut self, x: XAlignment, y: YAlignment) {
        self.x_alignment = x;
        self.y_alignment = y;
        self.invalidate(Invalidation::Layout);
    }

    /// Parses alignment names such as `"center"` or `"bottom"`.
    pub fn set_alignment_str(&mut self, x: &str, y: &str) -> ChartResult<()> {
        let x = x.parse()?;
        let y = y.parse()?;
        self.set_alignment(x, y);
        Ok(())
    }

    pub fn set_offset(&mut self, x: f64, y: f64) -> ChartResult<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ChartError::InvalidConfig(format!(
                "component offset must be finite (got {x}, {y})"
            )));
        }
        self.x_offset = x;
        self.y_offset = y;
        self.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Resolves the component's own bounds inside the offered cell.
    ///
    /// Fixed axes shrink to the request and are positioned by alignment;
    /// free axes take the whole offer.
    pub fn place(
        &mut self,
        origin: Point,
        available_width: f64,
        available_height: f64,
        request: SpaceRequest,
        fixed_width: bool,
        fixed_height: bool,
    ) -> ChartResult<Bounds> {
        if !self.is_anchored() {
            return Err(ChartError::NotAnchored("compute_layout"));
        }
        let available = Size::new(available_width, available_height).validate()?;
        if !origin.x.is_finite() || !origin.y.is_finite() {
            return Err(ChartError::InvalidData(format!(
                "layout origin must be finite (got {origin:?})"
            )));
        }

        let width = if fixed_width {
            request.min_width.min(available.width)
        } else {
            available.width
        };
        let height = if fixed_height {
            request.min_height.min(available.height)
        } else {
            available.height
        };
        let x = origin.x + (available.width - width) * self.x_alignment.proportion() + self.x_offset;
        let y = origin.y + (available.height - height) * self.y_alignment.proportion() + self.y_offset;

        self.bounds = Bounds::new(Point::new(x, y), Size::new(width, height));
        self.state = ComponentState::LaidOut;
        Ok(self.bounds)
    }

    /// Checks that painting can proceed: unanchored components are an error,
    /// anchored ones without layout are skipped.
    pub fn ready_to_render(&self) -> ChartResult<bool> {
        match self.state {
            ComponentState::Unanchored => Err(ChartError::NotAnchored("render")),
            ComponentState::Anchored => Ok(false),
            ComponentState::LaidOut | ComponentState::Rendered => Ok(true),
        }
    }

    pub fn mark_rendered(&mut self) {
        if self.state >= ComponentState::LaidOut {
            self.state = ComponentState::Rendered;
        }
    }

    /// Steps the lifecycle back and queues a repaint when anchored.
    pub fn invalidate(&mut self, invalidation: Invalidation) {
        match (invalidation, self.state) {
            (_, ComponentState::Unanchored) => return,
            (Invalidation::Render, ComponentState::Rendered) => {
                self.state = ComponentState::LaidOut;
            }
            (Invalidation::Layout, ComponentState::LaidOut | ComponentState::Rendered) => {
                self.state = ComponentState::Anchored;
            }
            _ => {}
        }
        if let Some(queue) = &self.queue {
            queue.request(self.id, invalidation);
        }
    }
}

/// A node of the component tree.
pub trait Component: LayoutNode {
    fn core(&self) -> &ComponentCore;

    fn core_mut(&mut self) -> &mut ComponentCore;

    fn id(&self) -> ComponentId {
        self.core().id()
    }

    fn state(&self) -> ComponentState {
        self.core().state()
    }

    fn bounds(&self) -> Bounds {
        self.core().bounds()
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.core_mut().anchor(context);
        Ok(())
    }

    fn detach(&mut self) {
        self.core_mut().detach();
    }

    /// Appends this component's paint requests to `frame`.
    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()>;

    fn children(&self) -> Vec<ComponentHandle> {
        Vec::new()
    }
}

pub type ComponentHandle = Rc<RefCell<dyn Component>>;

pub fn into_handle<C: Component + 'static>(component: C) -> ComponentHandle {
    Rc::new(RefCell::new(component))
}

/// Default `compute_layout` for components without children.
pub fn layout_leaf<C: Component + ?Sized>(
    component: &mut C,
    origin: Point,
    available_width: f64,
    available_height: f64,
) -> ChartResult<Bounds> {
    let request = component.requested_space(available_width, available_height);
    let fixed_width = component.is_fixed_width();
    let fixed_height = component.is_fixed_height();
    component.core_mut().place(
        origin,
        available_width,
        available_height,
        request,
        fixed_width,
        fixed_height,
    )
}

/// Collects `root` and every descendant, depth first.
#[must_use]
pub fn walk(root: &ComponentHandle) -> Vec<ComponentHandle> {
    let mut out = vec![Rc::clone(root)];
    let children = root.borrow().children();
    for child in &children {
        out.extend(walk(child));
    }
    out
}

/// True when `id` occurs in the subtree under `handle`, or when some node of
/// that subtree is mutably borrowed (which is how an ancestor in the middle
/// of `add` or `append` shows up).
pub(crate) fn subtree_contains(handle: &ComponentHandle, id: ComponentId) -> bool {
    let mut stack: SmallVec<[ComponentHandle; 8]> = SmallVec::new();
    stack.push(Rc::clone(handle));
    while let Some(node) = stack.pop() {
        let Ok(component) = node.try_borrow() else {
            return true;
        };
        if component.id() == id {
            return true;
        }
        stack.extend(component.children());
    }
    false
}

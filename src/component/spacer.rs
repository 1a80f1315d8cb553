use crate::component::{Component, ComponentCore, layout_leaf};
use crate::core::types::{Point, SpaceRequest};
use crate::error::ChartResult;
use crate::layout::LayoutNode;
use crate::render::RenderFrame;

/// Zero-minimum, zero-weight placeholder filling empty table cells.
#[derive(Debug, Default)]
pub struct Spacer {
    core: ComponentCore,
}

impl Spacer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutNode for Spacer {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        SpaceRequest::NONE
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        layout_leaf(self, origin, width, height).map(|_| ())
    }

    fn is_fixed_width(&self) -> bool {
        true
    }

    fn is_fixed_height(&self) -> bool {
        true
    }
}

impl Component for Spacer {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn render(&mut self, _frame: &mut RenderFrame) -> ChartResult<()> {
        if self.core.ready_to_render()? {
            self.core.mark_rendered();
        }
        Ok(())
    }
}

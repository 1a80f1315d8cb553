use std::rc::Rc;

use tracing::trace;

use crate::component::{
    AnchorContext, Component, ComponentCore, ComponentHandle, subtree_contains,
};
use crate::core::types::{Point, SpaceRequest};
use crate::error::{ChartError, ChartResult};
use crate::layout::LayoutNode;
use crate::render::{Invalidation, RenderFrame};

/// Components drawn on top of each other inside one cell.
///
/// Every member is laid out over the group's whole area; members appended
/// later paint above earlier ones.
#[derive(Default)]
pub struct Group {
    core: ComponentCore,
    members: Vec<ComponentHandle>,
    context: Option<AnchorContext>,
}

impl Group {
    /// Builds a group; a handle listed twice is kept once.
    #[must_use]
    pub fn new(members: Vec<ComponentHandle>) -> Self {
        let mut group = Self::default();
        for member in members {
            if !group.has(&member) {
                group.members.push(member);
            }
        }
        group
    }

    #[must_use]
    pub fn members(&self) -> &[ComponentHandle] {
        &self.members
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn has(&self, component: &ComponentHandle) -> bool {
        self.members.iter().any(|member| Rc::ptr_eq(member, component))
    }

    /// Adds `component` above the current members.
    ///
    /// Appending a member twice is a no-op; a component that would contain
    /// this group is rejected.
    pub fn append(&mut self, component: ComponentHandle) -> ChartResult<()> {
        if self.has(&component) {
            return Ok(());
        }
        if subtree_contains(&component, self.core.id()) {
            return Err(ChartError::InvalidConfig(
                "a group cannot be added into itself".to_owned(),
            ));
        }
        if let Some(context) = &self.context {
            component.borrow_mut().anchor(context)?;
        }
        self.members.push(component);
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    /// Detaches and drops `component`; false when it is not a member.
    pub fn remove(&mut self, component: &ComponentHandle) -> bool {
        let Some(index) = self
            .members
            .iter()
            .position(|member| Rc::ptr_eq(member, component))
        else {
            return false;
        };
        let removed = self.members.remove(index);
        removed.borrow_mut().detach();
        self.core.invalidate(Invalidation::Layout);
        true
    }

    /// Detaches and drops every member.
    pub fn clear(&mut self) {
        for member in self.members.drain(..) {
            member.borrow_mut().detach();
        }
        self.core.invalidate(Invalidation::Layout);
    }
}

impl LayoutNode for Group {
    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest {
        self.members
            .iter()
            .map(|member| {
                member
                    .borrow()
                    .requested_space(available_width, available_height)
            })
            .fold(SpaceRequest::NONE, |acc, request| {
                SpaceRequest::new(
                    acc.min_width.max(request.min_width),
                    acc.min_height.max(request.min_height),
                )
            })
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        let request = self.requested_space(width, height);
        let fixed_width = self.is_fixed_width();
        let fixed_height = self.is_fixed_height();
        let bounds = self
            .core
            .place(origin, width, height, request, fixed_width, fixed_height)?;
        for member in &self.members {
            member
                .borrow_mut()
                .compute_layout(bounds.origin, bounds.size.width, bounds.size.height)?;
        }
        trace!(
            component = %self.core.id(),
            members = self.members.len(),
            "group layout resolved"
        );
        Ok(())
    }

    fn is_fixed_width(&self) -> bool {
        self.members.iter().all(|member| member.borrow().is_fixed_width())
    }

    fn is_fixed_height(&self) -> bool {
        self.members.iter().all(|member| member.borrow().is_fixed_height())
    }
}

impl Component for Group {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.core.anchor(context);
        self.context = Some(context.clone());
        for member in &self.members {
            member.borrow_mut().anchor(context)?;
        }
        Ok(())
    }

    fn detach(&mut self) {
        for member in &self.members {
            member.borrow_mut().detach();
        }
        self.context = None;
        self.core.detach();
    }

    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()> {
        if !self.core.ready_to_render()? {
            return Ok(());
        }
        for member in &self.members {
            member.borrow_mut().render(frame)?;
        }
        self.core.mark_rendered();
        Ok(())
    }

    fn children(&self) -> Vec<ComponentHandle> {
        self.members.clone()
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::component::{AnchorContext, ComponentHandle, ComponentState, walk};
use crate::config::StageConfig;
use crate::core::category_scale::{CategoryScale, CategoryScaleHandle};
use crate::core::domain_value::QuantitativeValue;
use crate::core::domainer::Domainer;
use crate::core::scale::{LinearScale, QuantitativeScale, ScaleHandle, TimeScale};
use crate::core::types::{ComponentId, Point, Size, SurfaceId};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{DomainAnimator, FrameAnimator};
use crate::render::{Invalidation, MonospaceMeasurer, RenderFrame, RenderQueue, Renderer, TextMeasurer};

struct SurfaceEntry {
    size: Size,
    root: Option<ComponentHandle>,
}

/// Top-level owner of surfaces, the renderer and the frame loop.
///
/// Components are anchored to a surface through [`Stage::render_to`].
/// Repaint requests raised by data or scale changes are coalesced in the
/// stage's [`RenderQueue`] and served by [`Stage::flush`] or
/// [`Stage::on_animation_frame`].
pub struct Stage<R: Renderer> {
    renderer: R,
    config: StageConfig,
    queue: RenderQueue,
    measurer: Rc<dyn TextMeasurer>,
    surfaces: IndexMap<SurfaceId, SurfaceEntry>,
    next_surface: u32,
    animators: Vec<Rc<RefCell<dyn FrameAnimator>>>,
}

impl<R: Renderer> Stage<R> {
    pub fn new(renderer: R, config: StageConfig) -> ChartResult<Self> {
        Ok(Self {
            renderer,
            config: config.validate()?,
            queue: RenderQueue::new(),
            measurer: Rc::new(MonospaceMeasurer::default()),
            surfaces: IndexMap::new(),
            next_surface: 1,
            animators: Vec::new(),
        })
    }

    /// Replaces the text measurer handed to components on anchoring.
    #[must_use]
    pub fn with_measurer(mut self, measurer: Rc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    #[must_use]
    pub fn config(&self) -> StageConfig {
        self.config
    }

    #[must_use]
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn create_surface(&mut self, width: f64, height: f64) -> ChartResult<SurfaceId> {
        let size = Size::new(width, height).validate()?;
        let id = SurfaceId::new(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(id, SurfaceEntry { size, root: None });
        debug!(surface = id.raw(), width, height, "surface created");
        Ok(id)
    }

    #[must_use]
    pub fn surface_size(&self, surface: SurfaceId) -> Option<Size> {
        self.surfaces.get(&surface).map(|entry| entry.size)
    }

    #[must_use]
    pub fn root(&self, surface: SurfaceId) -> Option<ComponentHandle> {
        self.surfaces.get(&surface).and_then(|entry| entry.root.clone())
    }

    /// Resizes a surface; its tree is laid out again on the next flush.
    pub fn resize_surface(&mut self, surface: SurfaceId, width: f64, height: f64) -> ChartResult<()> {
        let size = Size::new(width, height).validate()?;
        let entry = self
            .surfaces
            .get_mut(&surface)
            .ok_or(ChartError::UnknownSurface(surface))?;
        entry.size = size;
        if let Some(root) = &entry.root {
            let id = root.borrow().id();
            self.queue.request(id, Invalidation::Layout);
        }
        Ok(())
    }

    /// Drops a surface and detaches the tree rendered into it.
    pub fn remove_surface(&mut self, surface: SurfaceId) -> ChartResult<()> {
        let entry = self
            .surfaces
            .shift_remove(&surface)
            .ok_or(ChartError::UnknownSurface(surface))?;
        if let Some(root) = entry.root {
            root.borrow_mut().detach();
        }
        debug!(surface = surface.raw(), "surface removed");
        Ok(())
    }

    /// Anchors `root` to `surface`, lays it out over the whole surface and
    /// renders it. A different root previously shown there is detached.
    pub fn render_to(&mut self, surface: SurfaceId, root: ComponentHandle) -> ChartResult<()> {
        let context = self.context(surface);
        let entry = self
            .surfaces
            .get_mut(&surface)
            .ok_or(ChartError::UnknownSurface(surface))?;

        let replaced = entry
            .root
            .as_ref()
            .is_some_and(|previous| !Rc::ptr_eq(previous, &root));
        if replaced {
            if let Some(previous) = entry.root.take() {
                previous.borrow_mut().detach();
            }
        }
        let needs_anchor = root.borrow().state() == ComponentState::Unanchored
            || root.borrow().core().surface() != Some(surface);
        if needs_anchor {
            root.borrow_mut().anchor(&context)?;
        }
        entry.root = Some(root);
        self.render_surface(surface, true)
    }

    /// Serves queued repaint requests; returns the number of surfaces drawn.
    ///
    /// Requests from components no longer attached to any surface are
    /// dropped.
    pub fn flush(&mut self) -> ChartResult<usize> {
        let (dirty, needs_layout) = self.queue.drain();
        if dirty.is_empty() && !needs_layout {
            return Ok(0);
        }
        let dirty: IndexSet<ComponentId> = dirty.into_iter().collect();
        let mut served: IndexSet<ComponentId> = IndexSet::new();
        let mut targets = Vec::new();

        for (surface, entry) in &self.surfaces {
            let Some(root) = &entry.root else {
                continue;
            };
            let live: Vec<ComponentId> = walk(root).iter().map(|node| node.borrow().id()).collect();
            let touched: Vec<ComponentId> = live.into_iter().filter(|id| dirty.contains(id)).collect();
            if needs_layout || !touched.is_empty() {
                served.extend(touched);
                targets.push(*surface);
            }
        }

        let stale = dirty.len() - served.len();
        if stale > 0 {
            trace!(stale, "dropping repaint requests from detached components");
        }
        for surface in &targets {
            self.render_surface(*surface, needs_layout)?;
        }
        Ok(targets.len())
    }

    /// Advances registered animators to `now_ms`, then flushes.
    pub fn on_animation_frame(&mut self, now_ms: f64) -> ChartResult<usize> {
        self.animators.retain(|animator| Rc::strong_count(animator) > 1);
        let mut active = 0;
        for animator in &self.animators {
            if animator.borrow_mut().tick(now_ms) {
                active += 1;
            }
        }
        trace!(now_ms, active, "animation frame");
        self.flush()
    }

    /// Registers an animator ticked on every animation frame for as long as
    /// the caller keeps a handle to it.
    pub fn register_animator(&mut self, animator: Rc<RefCell<dyn FrameAnimator>>) {
        self.animators.push(animator);
    }

    /// Creates a domain animator for `scale` using the stage's animation
    /// tuning and registers it.
    pub fn animate<D: QuantitativeValue>(
        &mut self,
        scale: ScaleHandle<QuantitativeScale<D>>,
    ) -> ChartResult<Rc<RefCell<DomainAnimator<D>>>> {
        let animator = Rc::new(RefCell::new(DomainAnimator::new(scale, self.config.animation)?));
        self.register_animator(animator.clone());
        Ok(animator)
    }

    pub fn new_linear_scale(&self) -> ChartResult<LinearScale> {
        let domainer = Domainer::from_tuning(self.config.scale)?;
        Ok(LinearScale::new(
            QuantitativeScale::linear().with_domainer(domainer),
        ))
    }

    pub fn new_log_scale(&self, base: f64) -> ChartResult<LinearScale> {
        let domainer = Domainer::from_tuning(self.config.scale)?;
        Ok(LinearScale::new(
            QuantitativeScale::log(base)?.with_domainer(domainer),
        ))
    }

    pub fn new_time_scale(&self) -> ChartResult<TimeScale> {
        let domainer = Domainer::from_tuning(self.config.scale)?;
        Ok(TimeScale::new(QuantitativeScale::time().with_domainer(domainer)))
    }

    #[must_use]
    pub fn new_category_scale(&self) -> CategoryScaleHandle {
        CategoryScaleHandle::new(CategoryScale::new())
    }

    fn context(&self, surface: SurfaceId) -> AnchorContext {
        AnchorContext {
            surface,
            queue: self.queue.clone(),
            measurer: Rc::clone(&self.measurer),
        }
    }

    fn render_surface(&mut self, surface: SurfaceId, relayout: bool) -> ChartResult<()> {
        let entry = self
            .surfaces
            .get(&surface)
            .ok_or(ChartError::UnknownSurface(surface))?;
        let Some(root) = entry.root.clone() else {
            return Ok(());
        };
        let size = entry.size;

        let laid_out = root.borrow().state() >= ComponentState::LaidOut;
        if relayout || !laid_out {
            root.borrow_mut()
                .compute_layout(Point::ORIGIN, size.width, size.height)?;
        }
        // Requests raised while anchoring or laying out are served by this
        // frame; ones raised while painting it stay queued.
        for node in walk(&root) {
            self.queue.cancel(node.borrow().id());
        }
        let mut frame = RenderFrame::new(surface, size);
        root.borrow_mut().render(&mut frame)?;
        debug!(
            surface = surface.raw(),
            commands = frame.commands.len(),
            texts = frame.texts.len(),
            "surface rendered"
        );
        self.renderer.render(surface, &frame)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::Stage;
    use crate::component::{ComponentState, Spacer, into_handle};
    use crate::config::StageConfig;
    use crate::core::types::SurfaceId;
    use crate::error::ChartError;
    use crate::render::NullRenderer;

    fn stage() -> Stage<NullRenderer> {
        Stage::new(NullRenderer::default(), StageConfig::default()).expect("default config")
    }

    #[test]
    fn unknown_and_invalid_surfaces_are_rejected() {
        let mut stage = stage();
        assert!(matches!(
            stage.create_surface(-1.0, 10.0),
            Err(ChartError::InvalidSize { .. })
        ));
        let missing = SurfaceId::new(99);
        assert!(matches!(
            stage.render_to(missing, into_handle(Spacer::new())),
            Err(ChartError::UnknownSurface(_))
        ));
    }

    #[test]
    fn removing_surface_detaches_root() {
        let mut stage = stage();
        let surface = stage.create_surface(100.0, 50.0).expect("surface");
        let root = into_handle(Spacer::new());
        stage.render_to(surface, Rc::clone(&root)).expect("render");
        assert_eq!(root.borrow().state(), ComponentState::Rendered);
        assert_eq!(stage.renderer().frames_rendered, 1);

        stage.remove_surface(surface).expect("remove");
        assert_eq!(root.borrow().state(), ComponentState::Unanchored);
    }

    #[test]
    fn resize_relayouts_on_flush() {
        let mut stage = stage();
        let surface = stage.create_surface(100.0, 50.0).expect("surface");
        stage
            .render_to(surface, into_handle(Spacer::new()))
            .expect("render");
        stage.resize_surface(surface, 200.0, 80.0).expect("resize");
        assert_eq!(stage.flush().expect("flush"), 1);
        assert_eq!(stage.renderer().frames_rendered, 2);
        assert_eq!(stage.flush().expect("idle flush"), 0);
    }
}

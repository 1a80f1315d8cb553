use std::cell::RefCell;
use std::rc::Rc;

use plotweave::component::{
    Component, ComponentCore, ComponentHandle, Label, Plot, PlotKind, StackedPlot,
    StackingOrientation, layout_leaf,
};
use plotweave::config::StageConfig;
use plotweave::core::{CategoryScaleHandle, LinearScale, Point, SpaceRequest};
use plotweave::data::DatasetHandle;
use plotweave::error::ChartResult;
use plotweave::interaction::{AnimationConfig, Easing};
use plotweave::layout::{LayoutNode, Table};
use plotweave::render::{NullRenderer, RenderFrame};
use plotweave::stage::Stage;
use serde_json::json;

/// Registers a wide extent on a shared scale the first time it paints.
struct LateExtent {
    core: ComponentCore,
    scale: LinearScale,
}

impl LayoutNode for LateExtent {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        SpaceRequest::NONE
    }

    fn compute_layout(&mut self, origin: Point, width: f64, height: f64) -> ChartResult<()> {
        layout_leaf(self, origin, width, height).map(|_| ())
    }
}

impl Component for LateExtent {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn render(&mut self, _frame: &mut RenderFrame) -> ChartResult<()> {
        if self.core.ready_to_render()? {
            self.scale.update_extent(self.core.id(), "y", (0.0, 1_000.0));
            self.core.mark_rendered();
        }
        Ok(())
    }
}

struct Dashboard {
    stage: Stage<NullRenderer>,
    root: Rc<RefCell<Table>>,
    line: ComponentHandle,
    line_data: DatasetHandle,
    x: CategoryScaleHandle,
    line_y: LinearScale,
    stack_y: LinearScale,
}

fn dashboard() -> Dashboard {
    let config = StageConfig::default().with_animation(AnimationConfig {
        duration_ms: 100.0,
        easing: Easing::Linear,
    });
    let stage = Stage::new(NullRenderer::default(), config).expect("valid config");
    let x = stage.new_category_scale();
    let line_y = stage.new_linear_scale().expect("scale");
    let stack_y = stage.new_linear_scale().expect("scale");

    let mut line = Plot::new(PlotKind::Line);
    line.project("x", "k", &x).expect("x");
    line.project("y", "v", &line_y).expect("y");
    let line_data = line.add_dataset(vec![json!({"k": "a", "v": 1}), json!({"k": "b", "v": 3})]);

    let mut stacked =
        StackedPlot::new(PlotKind::Bar, StackingOrientation::Vertical).expect("stackable");
    stacked.project("x", "k", &x).expect("x");
    stacked.project("y", "v", &stack_y).expect("y");
    stacked.add_dataset(vec![json!({"k": "a", "v": 2}), json!({"k": "b", "v": 2})]);
    stacked.add_dataset(vec![json!({"k": "a", "v": 1}), json!({"k": "b", "v": 5})]);

    let line: ComponentHandle = Rc::new(RefCell::new(line));
    let stacked: ComponentHandle = Rc::new(RefCell::new(stacked));
    let title: ComponentHandle = Rc::new(RefCell::new(Label::new("Revenue")));
    let root = Rc::new(RefCell::new(Table::new(vec![
        vec![Some(title)],
        vec![Some(Rc::clone(&line))],
        vec![Some(stacked)],
    ])));

    Dashboard {
        stage,
        root,
        line,
        line_data,
        x,
        line_y,
        stack_y,
    }
}

#[test]
fn render_to_draws_every_component_once() {
    let mut d = dashboard();
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");

    let renderer = d.stage.renderer();
    assert_eq!(renderer.frames_rendered, 1);
    assert_eq!(renderer.last_surface, Some(surface));
    assert_eq!(renderer.last_command_count, 2 + 4);
    assert_eq!(renderer.last_text_count, 1);

    assert_eq!(d.x.domain(), vec!["a", "b"]);
    assert_eq!(d.stack_y.domain().0, 0.0);
    assert!(d.stack_y.domain().1 >= 7.0);

    assert_eq!(d.stage.flush().expect("idle flush"), 0);
}

#[test]
fn dataset_change_repaints_on_next_flush() {
    let mut d = dashboard();
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");
    let before = d.line_y.domain();

    d.line_data.push(json!({"k": "c", "v": 9}));
    assert!(d.line_y.domain().1 > before.1);
    assert_eq!(d.x.domain(), vec!["a", "b", "c"]);

    assert_eq!(d.stage.flush().expect("flush"), 1);
    assert_eq!(d.stage.renderer().frames_rendered, 2);
    assert_eq!(d.stage.renderer().last_command_count, 3 + 4);
    assert_eq!(d.stage.flush().expect("idle flush"), 0);
}

#[test]
fn removed_plot_releases_its_extents_and_stops_repainting() {
    let mut d = dashboard();
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");
    assert_eq!(d.line_y.extent_count(), 1);

    assert!(d.root.borrow_mut().remove(&d.line));
    assert_eq!(d.line_y.extent_count(), 0);
    assert_eq!(d.stage.flush().expect("relayout"), 1);
    assert_eq!(d.stage.renderer().last_command_count, 4);

    d.line_data.push(json!({"k": "z", "v": 100}));
    assert_eq!(d.line_y.extent_count(), 0);
    assert_eq!(d.stage.flush().expect("nothing attached"), 0);
}

#[test]
fn animation_frames_move_domain_and_repaint() {
    let mut d = dashboard();
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");

    let animator = d.stage.animate(d.line_y.clone()).expect("animator");
    animator
        .borrow_mut()
        .start((0.0, 100.0), 0.0)
        .expect("start");

    assert_eq!(d.stage.on_animation_frame(50.0).expect("frame"), 1);
    let (_, mid) = d.line_y.domain();
    assert!(mid > 3.0 && mid < 100.0);

    assert_eq!(d.stage.on_animation_frame(150.0).expect("frame"), 1);
    assert_eq!(d.line_y.domain(), (0.0, 100.0));
    assert!(!animator.borrow().is_animating());

    drop(animator);
    assert_eq!(d.stage.on_animation_frame(200.0).expect("idle"), 0);
}

#[test]
fn replacing_a_surface_root_detaches_the_previous_tree() {
    let mut d = dashboard();
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");
    assert_eq!(d.stack_y.extent_count(), 1);

    let replacement: ComponentHandle = Rc::new(RefCell::new(Label::new("empty")));
    d.stage.render_to(surface, replacement).expect("render");
    assert_eq!(d.stack_y.extent_count(), 0);
    assert_eq!(d.line_y.extent_count(), 0);
    assert_eq!(d.stage.renderer().last_command_count, 0);
}

#[test]
fn domain_change_while_painting_repaints_earlier_siblings() {
    let mut d = dashboard();
    let late: ComponentHandle = Rc::new(RefCell::new(LateExtent {
        core: ComponentCore::new(),
        scale: d.line_y.clone(),
    }));
    d.root.borrow_mut().add(late, 3, 0).expect("add");
    let surface = d.stage.create_surface(400.0, 300.0).expect("surface");
    let root: ComponentHandle = d.root.clone();
    d.stage.render_to(surface, root).expect("render");

    let line_id = d.line.borrow().id();
    assert!(d.line_y.domain().1 >= 1_000.0);
    assert!(d.stage.queue().is_dirty(line_id));

    assert_eq!(d.stage.flush().expect("repaint"), 1);
    assert_eq!(d.stage.renderer().frames_rendered, 2);
    assert_eq!(d.stage.flush().expect("idle flush"), 0);
}

#[test]
fn configuration_is_validated_at_construction() {
    let config = StageConfig::default().with_animation(AnimationConfig {
        duration_ms: f64::NAN,
        easing: Easing::EaseOut,
    });
    assert!(Stage::new(NullRenderer::default(), config).is_err());
}

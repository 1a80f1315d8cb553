use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::component::{AnchorContext, Component, ComponentCore, layout_leaf};
use crate::core::types::{Point, Size, SpaceRequest};
use crate::error::{ChartError, ChartResult};
use crate::layout::LayoutNode;
use crate::render::{
    Color, Invalidation, MonospaceMeasurer, RenderFrame, TextHAlign, TextMeasurer, TextPrimitive,
    TextStyle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrientation {
    #[default]
    Horizontal,
    /// Reads bottom to top.
    VerticalLeft,
    /// Reads top to bottom.
    VerticalRight,
}

impl LabelOrientation {
    fn rotation_deg(self) -> f64 {
        match self {
            Self::Horizontal => 0.0,
            Self::VerticalLeft => -90.0,
            Self::VerticalRight => 90.0,
        }
    }

    fn is_vertical(self) -> bool {
        self != Self::Horizontal
    }
}

impl FromStr for LabelOrientation {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "left" | "vertical-left" => Ok(Self::VerticalLeft),
            "right" | "vertical-right" => Ok(Self::VerticalRight),
            other => Err(ChartError::InvalidConfig(format!(
                "unsupported label orientation `{other}`"
            ))),
        }
    }
}

/// Single text label sized by the host's text measurer.
pub struct Label {
    core: ComponentCore,
    text: String,
    orientation: LabelOrientation,
    style: TextStyle,
    padding: f64,
    color: Color,
    measurer: Rc<dyn TextMeasurer>,
}

impl Label {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            core: ComponentCore::new(),
            text: text.into(),
            orientation: LabelOrientation::Horizontal,
            style: TextStyle::default(),
            padding: 0.0,
            color: Color::BLACK,
            measurer: Rc::new(MonospaceMeasurer::default()),
        }
    }

    /// Builds a label from an orientation name (`"horizontal"`, `"left"`,
    /// `"right"`).
    pub fn with_orientation_str(text: impl Into<String>, orientation: &str) -> ChartResult<Self> {
        let mut label = Self::new(text);
        label.orientation = orientation.parse()?;
        Ok(label)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn orientation(&self) -> LabelOrientation {
        self.orientation
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.core.invalidate(Invalidation::Layout);
    }

    pub fn set_orientation(&mut self, orientation: LabelOrientation) {
        self.orientation = orientation;
        self.core.invalidate(Invalidation::Layout);
    }

    pub fn set_padding(&mut self, padding: f64) -> ChartResult<()> {
        if !padding.is_finite() || padding < 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "label padding must be finite and >= 0 (got {padding})"
            )));
        }
        self.padding = padding;
        self.core.invalidate(Invalidation::Layout);
        Ok(())
    }

    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
        self.core.invalidate(Invalidation::Layout);
    }

    fn measured(&self) -> Size {
        let text = self.measurer.measure(&self.text, &self.style);
        if self.orientation.is_vertical() {
            Size::new(text.height, text.width)
        } else {
            text
        }
    }
}

impl LayoutNode for Label {
    fn requested_space(&self, _available_width: f64, _available_height: f64) -> SpaceRequest {
        let size = self.measured();
        SpaceRequest::new(
            size.width + 2.0 * self.padding,
            size.height + 2.0 * self.padding,
        )
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

impl Component for Label {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn anchor(&mut self, context: &AnchorContext) -> ChartResult<()> {
        self.measurer = Rc::clone(&context.measurer);
        self.core.anchor(context);
        Ok(())
    }

    fn render(&mut self, frame: &mut RenderFrame) -> ChartResult<()> {
        if !self.core.ready_to_render()? {
            return Ok(());
        }
        if !self.text.is_empty() {
            let bounds = self.core.bounds();
            let center_x = bounds.origin.x + bounds.size.width / 2.0;
            let center_y = bounds.origin.y + bounds.size.height / 2.0;
            frame.push_text(
                TextPrimitive::new(
                    self.text.clone(),
                    center_x,
                    center_y,
                    self.style.font_size_px,
                    self.color,
                    TextHAlign::Center,
                )
                .rotated(self.orientation.rotation_deg()),
            );
        }
        self.core.mark_rendered();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Label, LabelOrientation};
    use crate::error::ChartError;
    use crate::layout::LayoutNode;

    #[test]
    fn orientation_parses_known_names_only() {
        assert_eq!(
            "vertical-left".parse::<LabelOrientation>().expect("valid"),
            LabelOrientation::VerticalLeft
        );
        assert!(matches!(
            Label::with_orientation_str("y", "diagonal"),
            Err(ChartError::InvalidConfig(_))
        ));
    }

    #[test]
    fn vertical_labels_swap_requested_axes() {
        let horizontal = Label::new("abcd");
        let vertical = Label::with_orientation_str("abcd", "left").expect("valid");
        let h = horizontal.requested_space(100.0, 100.0);
        let v = vertical.requested_space(100.0, 100.0);
        assert_eq!(h.min_width, v.min_height);
        assert_eq!(h.min_height, v.min_width);
    }
}

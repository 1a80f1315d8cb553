use serde::{Deserialize, Serialize};

use crate::core::types::Size;

/// Font parameters passed to a [`TextMeasurer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size_px: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { font_size_px: 12.0 }
    }
}

/// Host-provided text metrics.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> Size;
}

/// Fixed advance per character; good enough for headless layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub advance_ratio: f64,
    pub line_height_ratio: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            line_height_ratio: 1.2,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> Size {
        let lines = text.lines().count().max(1);
        let widest = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        Size::new(
            widest as f64 * style.font_size_px * self.advance_ratio,
            lines as f64 * style.font_size_px * self.line_height_ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{MonospaceMeasurer, TextMeasurer, TextStyle};

    #[test]
    fn monospace_measures_widest_line() {
        let measurer = MonospaceMeasurer::default();
        let size = measurer.measure("ab\nabcd", &TextStyle { font_size_px: 10.0 });
        assert_relative_eq!(size.width, 24.0);
        assert_relative_eq!(size.height, 24.0);
    }

    #[test]
    fn empty_text_still_has_line_height() {
        let size = MonospaceMeasurer::default().measure("", &TextStyle::default());
        assert_relative_eq!(size.width, 0.0);
        assert!(size.height > 0.0);
    }
}

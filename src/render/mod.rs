mod frame;
mod null_renderer;
mod primitives;
mod queue;
mod text;

pub use frame::RenderFrame;
pub use null_renderer::NullRenderer;
pub use primitives::{Color, DrawCommand, MarkKind, TextHAlign, TextPrimitive};
pub use queue::{Invalidation, RenderQueue};
pub use text::{MonospaceMeasurer, TextMeasurer, TextStyle};

use crate::core::types::SurfaceId;
use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `RenderFrame` with final pixel
/// attributes, so drawing code stays isolated from layout, scale and
/// stacking logic.
pub trait Renderer {
    fn render(&mut self, surface: SurfaceId, frame: &RenderFrame) -> ChartResult<()>;
}

use crate::core::types::SurfaceId;
use crate::error::ChartResult;
use crate::render::{RenderFrame, Renderer};

/// No-op renderer used by tests and headless usage.
///
/// It still validates frame content so tests can catch invalid geometry before
/// a real backend is introduced.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub last_surface: Option<SurfaceId>,
    pub last_command_count: usize,
    pub last_text_count: usize,
    pub frames_rendered: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, surface: SurfaceId, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        self.last_surface = Some(surface);
        self.last_command_count = frame.commands.len();
        self.last_text_count = frame.texts.len();
        self.frames_rendered += 1;
        Ok(())
    }
}

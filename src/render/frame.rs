use crate::core::types::{ComponentId, Size, SurfaceId};
use crate::error::ChartResult;
use crate::render::{DrawCommand, TextPrimitive};

/// Backend-agnostic scene for one surface draw pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub surface: SurfaceId,
    pub size: Size,
    pub commands: Vec<DrawCommand>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(surface: SurfaceId, size: Size) -> Self {
        Self {
            surface,
            size,
            commands: Vec::new(),
            texts: Vec::new(),
        }
    }

    pub fn push_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn push_text(&mut self, text: TextPrimitive) {
        self.texts.push(text);
    }

    /// Commands emitted by one component, in emission order.
    pub fn commands_for(&self, component: ComponentId) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(move |command| command.component == component)
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.size.validate()?;
        for command in &self.commands {
            command.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.texts.is_empty()
    }
}

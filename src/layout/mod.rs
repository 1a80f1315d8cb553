mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use table::{Table, TableLayout};

use crate::core::types::{Point, SpaceRequest};
use crate::error::{ChartError, ChartResult};

/// Axis named in layout diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutAxis {
    Width,
    Height,
}

impl fmt::Display for LayoutAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Width => "width",
            Self::Height => "height",
        })
    }
}

/// Participant in the two-phase layout protocol.
///
/// Parents first ask each child for its minimum size given an offer, then
/// hand down the final absolute placement.
pub trait LayoutNode {
    fn requested_space(&self, available_width: f64, available_height: f64) -> SpaceRequest;

    /// Places the node; positions are absolute so repeated calls with the
    /// same arguments yield the same result.
    fn compute_layout(
        &mut self,
        origin: Point,
        available_width: f64,
        available_height: f64,
    ) -> ChartResult<()>;

    /// A fixed-width node takes only its requested width, never free space.
    fn is_fixed_width(&self) -> bool {
        false
    }

    fn is_fixed_height(&self) -> bool {
        false
    }
}

/// Knobs of the table layout's guarantee loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutTuning {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl LayoutTuning {
    pub fn validate(self) -> ChartResult<Self> {
        if self.max_iterations == 0 {
            return Err(ChartError::InvalidConfig(
                "layout max_iterations must be > 0".to_owned(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "layout tolerance must be finite and >= 0 (got {})",
                self.tolerance
            )));
        }
        Ok(self)
    }
}

fn default_max_iterations() -> usize {
    5
}

fn default_tolerance() -> f64 {
    1e-6
}

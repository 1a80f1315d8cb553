use thiserror::Error;

use crate::core::SurfaceId;
use crate::layout::LayoutAxis;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid size: width={width}, height={height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("insufficient {axis} for layout: requires {required}, offered {available}")]
    InsufficientSpace {
        axis: LayoutAxis,
        required: f64,
        available: f64,
    },

    #[error("component must be anchored before {0}")]
    NotAnchored(&'static str),

    #[error("unknown surface {0:?}")]
    UnknownSurface(SurfaceId),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

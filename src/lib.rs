//! plotweave: component layout, scale-domain aggregation and stacking core
//! for Rust charting.
//!
//! Plots report the data extents they project onto shared scales; scales
//! merge those extents through a [`core::Domainer`] and broadcast domain
//! changes back so dependents repaint. Components are arranged on a
//! [`stage::Stage`] surface by the weighted [`layout::Table`] and drawn into
//! backend-neutral [`render::RenderFrame`]s.

pub mod component;
pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod render;
pub mod stage;
pub mod telemetry;

pub use component::{
    Component, ComponentHandle, ComponentState, Group, Label, Plot, PlotKind, Spacer,
    StackedPlot, StackingOrientation, into_handle,
};
pub use config::StageConfig;
pub use core::{CategoryScaleHandle, DataScale, Domainer, LinearScale, TimeScale};
pub use error::{ChartError, ChartResult};
pub use layout::Table;
pub use stage::Stage;

pub mod broadcaster;
pub mod category_scale;
pub mod domain_value;
pub mod domainer;
pub mod extent;
pub mod scale;
pub mod stacking;
pub mod transform;
pub mod types;

pub use broadcaster::Broadcaster;
pub use category_scale::{CategoryScale, CategoryScaleHandle};
pub use domain_value::{QuantitativeValue, normalize_key};
pub use domainer::{DEFAULT_PAD_PROPORTION, Domainer, DomainerTuning};
pub use extent::{BindingKey, ExtentRegistry};
pub use scale::{
    DataScale, DomainChanged, LinearScale, QuantitativeScale, ScaleHandle, ScaleModel, TimeScale,
};
pub use stacking::{
    StackDatum, StackOffsets, StackOrder, StackSeries, compute_stack_extent,
    compute_stack_offsets, domain_keys,
};
pub use transform::ScaleTransform;
pub use types::{Bounds, ComponentId, Point, Size, SpaceRequest, SurfaceId};

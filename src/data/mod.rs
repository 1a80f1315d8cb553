mod accessor;
mod dataset;

pub use accessor::Accessor;
pub use dataset::{DataInput, Dataset, DatasetChanged, DatasetHandle};

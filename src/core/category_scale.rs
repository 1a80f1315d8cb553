use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::core::domain_value::normalize_key;
use crate::core::extent::{BindingKey, ExtentRegistry};
use crate::core::scale::{DataScale, DomainChanged, ScaleHandle, ScaleModel};
use crate::core::types::ComponentId;
use crate::error::{ChartError, ChartResult};

pub const DEFAULT_INNER_PADDING: f64 = 0.3;
pub const DEFAULT_OUTER_PADDING: f64 = 0.5;

/// Banded scale over string categories.
///
/// The auto domain is the first-seen union of every registered extent.
#[derive(Debug, Clone)]
pub struct CategoryScale {
    domain: Vec<String>,
    range: (f64, f64),
    extents: ExtentRegistry<Vec<String>>,
    auto_domain: bool,
    inner_padding: f64,
    outer_padding: f64,
    revision: u64,
}

impl Default for CategoryScale {
    fn default() -> Self {
        Self {
            domain: Vec::new(),
            range: (0.0, 1.0),
            extents: ExtentRegistry::default(),
            auto_domain: true,
            inner_padding: DEFAULT_INNER_PADDING,
            outer_padding: DEFAULT_OUTER_PADDING,
            revision: 0,
        }
    }
}

impl ScaleModel for CategoryScale {
    fn revision(&self) -> u64 {
        self.revision
    }
}

impl CategoryScale {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub fn extent_count(&self) -> usize {
        self.extents.len()
    }

    pub fn update_extent(&mut self, key: BindingKey, extent: Vec<String>) -> bool {
        if !self.extents.insert(key.clone(), extent) {
            return false;
        }
        debug!(extent_key = %key, "category extent updated");
        self.recompute_if_auto()
    }

    pub fn remove_extent(&mut self, key: &BindingKey) -> bool {
        if self.extents.remove(key).is_none() {
            return false;
        }
        self.recompute_if_auto()
    }

    pub fn remove_owner(&mut self, owner: ComponentId) -> bool {
        if self.extents.remove_owner(owner) == 0 {
            return false;
        }
        self.recompute_if_auto()
    }

    pub fn auto_domain(&mut self) -> bool {
        self.auto_domain = true;
        let union: IndexSet<String> = self.extents.values().flatten().cloned().collect();
        self.apply_domain(union.into_iter().collect())
    }

    /// Sets an explicit domain; duplicate categories keep their first slot.
    pub fn set_domain(&mut self, domain: Vec<String>) -> bool {
        self.auto_domain = false;
        let unique: IndexSet<String> = domain.into_iter().collect();
        self.apply_domain(unique.into_iter().collect())
    }

    pub fn set_range(&mut self, range: (f64, f64)) -> ChartResult<()> {
        if !range.0.is_finite() || !range.1.is_finite() {
            return Err(ChartError::InvalidConfig(format!(
                "scale range must be finite (got {range:?})"
            )));
        }
        self.range = range;
        Ok(())
    }

    /// Both paddings are fractions of a step and must lie in `[0, 1]`.
    pub fn set_padding(&mut self, inner: f64, outer: f64) -> ChartResult<()> {
        for (name, value) in [("inner", inner), ("outer", outer)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidConfig(format!(
                    "{name} padding must be within [0, 1] (got {value})"
                )));
            }
        }
        self.inner_padding = inner;
        self.outer_padding = outer;
        Ok(())
    }

    /// Distance between consecutive band starts.
    #[must_use]
    pub fn step(&self) -> f64 {
        let n = self.domain.len() as f64;
        let slots = n - self.inner_padding + 2.0 * self.outer_padding;
        if slots <= 0.0 {
            return 0.0;
        }
        (self.range.1 - self.range.0) / slots
    }

    #[must_use]
    pub fn band_width(&self) -> f64 {
        self.step() * (1.0 - self.inner_padding)
    }

    /// Pixel center of the band holding `category`.
    #[must_use]
    pub fn scale(&self, category: &str) -> Option<f64> {
        let index = self.domain.iter().position(|entry| entry == category)?;
        let step = self.step();
        let start = self.range.0 + step * self.outer_padding;
        Some(start + step * index as f64 + self.band_width() / 2.0)
    }

    fn recompute_if_auto(&mut self) -> bool {
        if self.auto_domain { self.auto_domain() } else { false }
    }

    fn apply_domain(&mut self, domain: Vec<String>) -> bool {
        if domain == self.domain {
            return false;
        }
        self.domain = domain;
        self.revision += 1;
        true
    }
}

pub type CategoryScaleHandle = ScaleHandle<CategoryScale>;

impl ScaleHandle<CategoryScale> {
    #[must_use]
    pub fn domain(&self) -> Vec<String> {
        self.read(|scale| scale.domain().to_vec())
    }

    pub fn update_extent(&self, owner: ComponentId, attr: &str, extent: Vec<String>) -> bool {
        let key = BindingKey::new(owner, attr);
        self.mutate(|scale| scale.update_extent(key, extent))
            .unwrap_or(false)
    }

    pub fn set_domain(&self, domain: Vec<String>) -> bool {
        self.mutate(|scale| scale.set_domain(domain))
            .unwrap_or(false)
    }

    pub fn auto_domain(&self) -> bool {
        self.mutate(CategoryScale::auto_domain).unwrap_or(false)
    }
}

impl DataScale for ScaleHandle<CategoryScale> {
    fn update_extent_from_values(&self, key: &BindingKey, values: &[Value]) {
        let categories: IndexSet<String> = values.iter().map(normalize_key).collect();
        let key = key.clone();
        if categories.is_empty() {
            self.mutate_or_defer(move |scale| {
                scale.remove_extent(&key);
            });
        } else {
            let extent: Vec<String> = categories.into_iter().collect();
            self.mutate_or_defer(move |scale| {
                scale.update_extent(key, extent);
            });
        }
    }

    fn remove_extent(&self, key: &BindingKey) {
        let key = key.clone();
        self.mutate_or_defer(move |scale| {
            scale.remove_extent(&key);
        });
    }

    fn release_owner(&self, owner: ComponentId) {
        self.mutate_or_defer(move |scale| {
            scale.remove_owner(owner);
        });
        self.unsubscribe_owner(owner);
    }

    fn project(&self, value: &Value) -> Option<f64> {
        let category = normalize_key(value);
        self.read(|scale| scale.scale(&category))
    }

    fn subscribe(&self, key: BindingKey, listener: Box<dyn FnMut(&DomainChanged)>) {
        ScaleHandle::subscribe(self, key, listener);
    }

    fn unsubscribe(&self, key: &BindingKey) {
        ScaleHandle::unsubscribe(self, key);
    }

    fn set_range(&self, range: (f64, f64)) -> ChartResult<()> {
        self.model_mut().set_range(range)
    }

    fn range(&self) -> (f64, f64) {
        self.read(CategoryScale::range)
    }

    fn identity(&self) -> usize {
        self.address()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use serde_json::json;

    use super::{CategoryScale, CategoryScaleHandle};
    use crate::core::extent::BindingKey;
    use crate::core::scale::DataScale;
    use crate::core::types::ComponentId;

    #[test]
    fn auto_domain_is_first_seen_union() {
        let scale = CategoryScaleHandle::new(CategoryScale::new());
        scale.update_extent(ComponentId::new(1), "x", vec!["a".into(), "b".into()]);
        scale.update_extent(ComponentId::new(2), "x", vec!["c".into(), "a".into()]);
        assert_eq!(scale.domain(), vec!["a", "b", "c"]);

        scale.release_owner(ComponentId::new(1));
        assert_eq!(scale.domain(), vec!["c", "a"]);
    }

    #[test]
    fn bands_are_centered_within_range() {
        let mut scale = CategoryScale::new();
        scale.set_padding(0.0, 0.0).expect("valid padding");
        scale.set_domain(vec!["a".into(), "b".into()]);
        scale.set_range((0.0, 100.0)).expect("finite range");
        assert_relative_eq!(scale.step(), 50.0);
        assert_eq!(scale.scale("a"), Some(25.0));
        assert_eq!(scale.scale("b"), Some(75.0));
        assert_eq!(scale.scale("z"), None);
    }

    #[test]
    fn numeric_values_project_by_key() {
        let scale = CategoryScaleHandle::new(CategoryScale::new());
        let key = BindingKey::new(ComponentId::new(3), "x");
        scale.update_extent_from_values(&key, &[json!(1), json!("2")]);
        assert_eq!(scale.domain(), vec!["1", "2"]);
        assert!(scale.project(&json!(2)).is_some());
    }
}

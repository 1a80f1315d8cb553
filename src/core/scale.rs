use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::broadcaster::Broadcaster;
use crate::core::domain_value::QuantitativeValue;
use crate::core::domainer::Domainer;
use crate::core::extent::{BindingKey, ExtentRegistry};
use crate::core::transform::ScaleTransform;
use crate::core::types::ComponentId;
use crate::error::{ChartError, ChartResult};

/// Notification sent to scale listeners after a domain change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainChanged {
    pub revision: u64,
}

/// State shared by every scale model wrapped in a [`ScaleHandle`].
pub trait ScaleModel {
    /// Monotonic counter bumped on every domain change.
    fn revision(&self) -> u64;
}

/// Quantitative scale model: transform, domain, range and extent registry.
///
/// All mutators return `true` when the domain actually changed. The model is
/// plain data; sharing and broadcasting live in [`ScaleHandle`].
#[derive(Debug, Clone)]
pub struct QuantitativeScale<D: QuantitativeValue> {
    transform: ScaleTransform,
    domain: (D, D),
    range: (f64, f64),
    extents: ExtentRegistry<(D, D)>,
    auto_domain: bool,
    domainer: Domainer<D>,
    domain_min: Option<D>,
    domain_max: Option<D>,
    revision: u64,
}

impl<D: QuantitativeValue> ScaleModel for QuantitativeScale<D> {
    fn revision(&self) -> u64 {
        self.revision
    }
}

impl QuantitativeScale<f64> {
    #[must_use]
    pub fn linear() -> Self {
        Self::with_transform(ScaleTransform::Linear)
    }

    pub fn log(base: f64) -> ChartResult<Self> {
        let mut scale = Self::with_transform(ScaleTransform::log(base)?);
        scale.domain = (1.0, base);
        Ok(scale)
    }
}

impl QuantitativeScale<DateTime<Utc>> {
    #[must_use]
    pub fn time() -> Self {
        Self::with_transform(ScaleTransform::Time)
    }
}

impl<D: QuantitativeValue> QuantitativeScale<D> {
    #[must_use]
    pub fn with_transform(transform: ScaleTransform) -> Self {
        Self {
            transform,
            domain: D::default_domain(),
            range: (0.0, 1.0),
            extents: ExtentRegistry::default(),
            auto_domain: true,
            domainer: Domainer::default(),
            domain_min: None,
            domain_max: None,
            revision: 0,
        }
    }

    #[must_use]
    pub fn with_domainer(mut self, domainer: Domainer<D>) -> Self {
        self.domainer = domainer;
        self
    }

    #[must_use]
    pub fn transform(&self) -> ScaleTransform {
        self.transform
    }

    #[must_use]
    pub fn domain(&self) -> (D, D) {
        self.domain
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub fn is_auto_domain(&self) -> bool {
        self.auto_domain
    }

    #[must_use]
    pub fn domainer(&self) -> &Domainer<D> {
        &self.domainer
    }

    #[must_use]
    pub fn extent_count(&self) -> usize {
        self.extents.len()
    }

    #[must_use]
    pub fn extent(&self, key: &BindingKey) -> Option<(D, D)> {
        self.extents.get(key).copied()
    }

    /// Stores the extent contributed by `key` and re-domains in auto mode.
    ///
    /// Extents with non-finite bounds are logged and ignored.
    pub fn update_extent(&mut self, key: BindingKey, extent: (D, D)) -> bool {
        if !self.accepts(extent.0) || !self.accepts(extent.1) {
            warn!(
                extent_key = %key,
                extent = ?extent,
                "ignoring extent with non-representable bounds"
            );
            return false;
        }
        if !self.extents.insert(key.clone(), extent) {
            return false;
        }
        debug!(extent_key = %key, extent = ?extent, "scale extent updated");
        self.recompute_if_auto()
    }

    pub fn remove_extent(&mut self, key: &BindingKey) -> bool {
        if self.extents.remove(key).is_none() {
            return false;
        }
        debug!(extent_key = %key, "scale extent removed");
        self.recompute_if_auto()
    }

    /// Drops every extent contributed by `owner`.
    pub fn remove_owner(&mut self, owner: ComponentId) -> bool {
        if self.extents.remove_owner(owner) == 0 {
            return false;
        }
        debug!(%owner, "scale extents of owner removed");
        self.recompute_if_auto()
    }

    /// Re-enables automatic domaining and recomputes from the registered extents.
    pub fn auto_domain(&mut self) -> bool {
        self.auto_domain = true;
        let computed = self.computed_domain();
        self.apply_domain(computed)
    }

    /// Sets an explicit domain and leaves auto mode.
    ///
    /// Bounds the transform cannot represent (NaN, infinities, non-positive
    /// values on log scales) are logged and the call is ignored.
    pub fn set_domain(&mut self, domain: (D, D)) -> bool {
        if !self.accepts(domain.0) || !self.accepts(domain.1) {
            warn!(domain = ?domain, "ignoring malformed domain");
            return false;
        }
        self.auto_domain = false;
        self.apply_domain(domain)
    }

    /// Pins the lower end of the auto domain.
    pub fn set_domain_min(&mut self, min: Option<D>) -> bool {
        if let Some(value) = min {
            if !self.accepts(value) {
                warn!(domain_min = ?value, "ignoring malformed domain minimum");
                return false;
            }
        }
        self.domain_min = min;
        self.recompute_if_auto()
    }

    /// Pins the upper end of the auto domain.
    pub fn set_domain_max(&mut self, max: Option<D>) -> bool {
        if let Some(value) = max {
            if !self.accepts(value) {
                warn!(domain_max = ?value, "ignoring malformed domain maximum");
                return false;
            }
        }
        self.domain_max = max;
        self.recompute_if_auto()
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

    pub fn set_domainer(&mut self, domainer: Domainer<D>) -> bool {
        self.domainer = domainer;
        self.recompute_if_auto()
    }

    /// Mutates the domainer in place and re-domains in auto mode.
    pub fn update_domainer(&mut self, update: impl FnOnce(&mut Domainer<D>)) -> bool {
        update(&mut self.domainer);
        self.recompute_if_auto()
    }

    /// Rounds the domain outward to nice values.
    ///
    /// In auto mode the rounding sticks to the domainer so later extent
    /// updates stay niced.
    pub fn nice(&mut self, count: usize) -> bool {
        if self.auto_domain {
            self.domainer.set_nice(Some(count));
            return self.recompute_if_auto();
        }
        let (lo, hi) = self.domain;
        let (lo, hi) = self.transform.nice(lo.to_number(), hi.to_number(), count);
        match (D::from_number(lo), D::from_number(hi)) {
            (Some(lo), Some(hi)) => self.apply_domain((lo, hi)),
            _ => false,
        }
    }

    #[must_use]
    pub fn scale(&self, value: D) -> f64 {
        self.transform.map(
            value.to_number(),
            self.numeric_domain(),
            self.range,
        )
    }

    #[must_use]
    pub fn invert(&self, pixel: f64) -> Option<D> {
        D::from_number(self.transform.invert(pixel, self.numeric_domain(), self.range))
    }

    #[must_use]
    pub fn ticks(&self, count: usize) -> Vec<D> {
        let (lo, hi) = self.numeric_domain();
        self.transform
            .ticks(lo, hi, count)
            .into_iter()
            .filter_map(D::from_number)
            .collect()
    }

    /// Clone without extents; the copy starts in manual mode on the current
    /// domain.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            transform: self.transform,
            domain: self.domain,
            range: self.range,
            extents: ExtentRegistry::default(),
            auto_domain: false,
            domainer: self.domainer.clone(),
            domain_min: self.domain_min,
            domain_max: self.domain_max,
            revision: 0,
        }
    }

    /// Domain obtained by zooming `factor` around the pixel `center`.
    ///
    /// `factor < 1` zooms in. Computed in transform space so log scales zoom
    /// geometrically.
    #[must_use]
    pub fn zoom_target(&self, factor: f64, center: f64) -> (D, D) {
        if !factor.is_finite() || factor <= 0.0 {
            return self.domain;
        }
        let t = self.transform;
        let (lo, hi) = self.numeric_domain();
        let anchor = t.forward(t.invert(center, (lo, hi), self.range));
        let zoom = |edge: f64| t.inverse(anchor + (t.forward(edge) - anchor) * factor);
        self.numeric_to_domain((zoom(lo), zoom(hi)))
    }

    /// Domain obtained by dragging the content `delta` pixels along the range.
    #[must_use]
    pub fn pan_target(&self, delta: f64) -> (D, D) {
        if !delta.is_finite() {
            return self.domain;
        }
        let t = self.transform;
        let domain = self.numeric_domain();
        let lo = t.invert(self.range.0 - delta, domain, self.range);
        let hi = t.invert(self.range.1 - delta, domain, self.range);
        self.numeric_to_domain((lo, hi))
    }

    fn numeric_to_domain(&self, (lo, hi): (f64, f64)) -> (D, D) {
        if !self.transform.accepts(lo) || !self.transform.accepts(hi) {
            return self.domain;
        }
        match (D::from_number(lo), D::from_number(hi)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => self.domain,
        }
    }

    fn numeric_domain(&self) -> (f64, f64) {
        (self.domain.0.to_number(), self.domain.1.to_number())
    }

    fn accepts(&self, value: D) -> bool {
        value.is_valid() && self.transform.accepts(value.to_number())
    }

    fn recompute_if_auto(&mut self) -> bool {
        if !self.auto_domain {
            return false;
        }
        let computed = self.computed_domain();
        self.apply_domain(computed)
    }

    fn computed_domain(&self) -> (D, D) {
        let extents: Vec<(D, D)> = self.extents.values().copied().collect();
        let (lo, hi) = self.domainer.compute_domain(&extents, self.transform);
        match (self.domain_min, self.domain_max) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => {
                let hi = if min >= hi { min.single_value_expansion().1 } else { hi };
                (min, hi)
            }
            (None, Some(max)) => {
                let lo = if lo >= max { max.single_value_expansion().0 } else { lo };
                (lo, max)
            }
            (None, None) => (lo, hi),
        }
    }

    fn apply_domain(&mut self, domain: (D, D)) -> bool {
        if !self.accepts(domain.0) || !self.accepts(domain.1) {
            warn!(domain = ?domain, "computed domain is not representable; keeping previous");
            return false;
        }
        if domain == self.domain {
            return false;
        }
        self.domain = domain;
        self.revision += 1;
        true
    }
}

/// Rounds of deferred mutations applied after one broadcast before the rest
/// are dropped as a listener cycle.
const MAX_DEFERRED_ROUNDS: usize = 8;

type DeferredMutation<S> = Box<dyn FnOnce(&mut S)>;

struct ScaleCell<S> {
    model: RefCell<S>,
    listeners: Broadcaster<DomainChanged>,
    in_flight: Cell<bool>,
    deferred: RefCell<Vec<DeferredMutation<S>>>,
}

/// Shared, single-threaded handle to a scale model.
///
/// Mutations run inside a short model borrow; listeners are notified after
/// the borrow is released, once per domain change. While a broadcast is in
/// flight, [`ScaleHandle::mutate`] calls on the same scale are ignored so
/// listener cycles cannot recurse; extent updates made through
/// [`ScaleHandle::mutate_or_defer`] are queued and applied once the
/// broadcast completes.
pub struct ScaleHandle<S> {
    inner: Rc<ScaleCell<S>>,
}

impl<S> Clone for ScaleHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for ScaleHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleHandle")
            .field("model", &self.inner.model)
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<S: ScaleModel> ScaleHandle<S> {
    #[must_use]
    pub fn new(model: S) -> Self {
        Self {
            inner: Rc::new(ScaleCell {
                model: RefCell::new(model),
                listeners: Broadcaster::default(),
                in_flight: Cell::new(false),
                deferred: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Borrows the model for reading.
    #[must_use]
    pub fn model(&self) -> Ref<'_, S> {
        self.inner.model.borrow()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let model = self.inner.model.borrow();
        f(&*model)
    }

    /// Applies `f` to the model and broadcasts if the domain changed.
    ///
    /// Returns `None` when the call was ignored because this scale is
    /// currently broadcasting.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        if self.inner.in_flight.get() {
            debug!("ignoring re-entrant scale mutation during broadcast");
            return None;
        }
        let (result, changed) = self.apply(f);
        if changed {
            self.broadcast();
        }
        Some(result)
    }

    /// Like [`ScaleHandle::mutate`], but a call made during a broadcast is
    /// queued and applied when that broadcast completes.
    pub fn mutate_or_defer(&self, f: impl FnOnce(&mut S) + 'static) {
        if self.inner.in_flight.get() {
            trace!("deferring scale mutation until the broadcast completes");
            self.inner.deferred.borrow_mut().push(Box::new(f));
            return;
        }
        let _ = self.mutate(f);
    }

    fn apply<R>(&self, f: impl FnOnce(&mut S) -> R) -> (R, bool) {
        let mut model = self.inner.model.borrow_mut();
        let before = model.revision();
        let result = f(&mut *model);
        let changed = model.revision() != before;
        (result, changed)
    }

    /// Notifies listeners, then drains mutations they deferred; each round
    /// that changes the domain is broadcast again.
    fn broadcast(&self) {
        self.inner.in_flight.set(true);
        let mut rounds = 0;
        loop {
            let revision = self.inner.model.borrow().revision();
            self.inner.listeners.broadcast(&DomainChanged { revision });

            let deferred = std::mem::take(&mut *self.inner.deferred.borrow_mut());
            if deferred.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > MAX_DEFERRED_ROUNDS {
                debug!(
                    dropped = deferred.len(),
                    "dropping scale mutations deferred by a listener cycle"
                );
                break;
            }
            let (_, changed) = self.apply(|model| {
                for mutation in deferred {
                    mutation(&mut *model);
                }
            });
            if !changed {
                break;
            }
        }
        self.inner.in_flight.set(false);
    }

    #[must_use]
    pub fn is_broadcasting(&self) -> bool {
        self.inner.in_flight.get()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.model.borrow().revision()
    }

    pub fn subscribe<F>(&self, key: BindingKey, listener: F)
    where
        F: FnMut(&DomainChanged) + 'static,
    {
        self.inner.listeners.subscribe(key, listener);
    }

    pub fn unsubscribe(&self, key: &BindingKey) -> bool {
        self.inner.listeners.unsubscribe(key)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn unsubscribe_owner(&self, owner: ComponentId) -> usize {
        self.inner.listeners.unsubscribe_owner(owner)
    }

    /// Mutable model access that bypasses broadcasting; for state that is
    /// not part of the domain, such as the pixel range.
    pub(crate) fn model_mut(&self) -> std::cell::RefMut<'_, S> {
        self.inner.model.borrow_mut()
    }

    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

pub type LinearScale = ScaleHandle<QuantitativeScale<f64>>;
pub type TimeScale = ScaleHandle<QuantitativeScale<DateTime<Utc>>>;

impl<D: QuantitativeValue> ScaleHandle<QuantitativeScale<D>> {
    #[must_use]
    pub fn domain(&self) -> (D, D) {
        self.read(QuantitativeScale::domain)
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.read(QuantitativeScale::range)
    }

    #[must_use]
    pub fn is_auto_domain(&self) -> bool {
        self.read(QuantitativeScale::is_auto_domain)
    }

    #[must_use]
    pub fn extent_count(&self) -> usize {
        self.read(QuantitativeScale::extent_count)
    }

    pub fn update_extent(&self, owner: ComponentId, attr: &str, extent: (D, D)) -> bool {
        let key = BindingKey::new(owner, attr);
        self.mutate(|scale| scale.update_extent(key, extent))
            .unwrap_or(false)
    }

    pub fn remove_extent(&self, owner: ComponentId, attr: &str) -> bool {
        let key = BindingKey::new(owner, attr);
        self.mutate(|scale| scale.remove_extent(&key))
            .unwrap_or(false)
    }

    pub fn auto_domain(&self) -> bool {
        self.mutate(QuantitativeScale::auto_domain).unwrap_or(false)
    }

    pub fn set_domain(&self, domain: (D, D)) -> bool {
        self.mutate(|scale| scale.set_domain(domain))
            .unwrap_or(false)
    }

    pub fn set_domain_min(&self, min: Option<D>) -> bool {
        self.mutate(|scale| scale.set_domain_min(min))
            .unwrap_or(false)
    }

    pub fn set_domain_max(&self, max: Option<D>) -> bool {
        self.mutate(|scale| scale.set_domain_max(max))
            .unwrap_or(false)
    }

    pub fn set_range(&self, range: (f64, f64)) -> ChartResult<()> {
        self.model_mut().set_range(range)
    }

    pub fn nice(&self, count: usize) -> bool {
        self.mutate(|scale| scale.nice(count)).unwrap_or(false)
    }

    pub fn update_domainer(&self, update: impl FnOnce(&mut Domainer<D>)) -> bool {
        self.mutate(|scale| scale.update_domainer(update))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn scale(&self, value: D) -> f64 {
        self.read(|scale| scale.scale(value))
    }

    #[must_use]
    pub fn invert(&self, pixel: f64) -> Option<D> {
        self.read(|scale| scale.invert(pixel))
    }

    #[must_use]
    pub fn ticks(&self, count: usize) -> Vec<D> {
        self.read(|scale| scale.ticks(count))
    }

    /// Independent handle sharing nothing but the current configuration.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self::new(self.read(QuantitativeScale::copy))
    }
}

/// Object-safe view of a scale used by plots, independent of its domain type.
pub trait DataScale {
    /// Recomputes and stores the extent of `values` under `key`; values the
    /// scale cannot read are skipped, and an empty result removes the entry.
    fn update_extent_from_values(&self, key: &BindingKey, values: &[Value]);

    fn remove_extent(&self, key: &BindingKey);

    /// Drops every extent and listener registered by `owner`.
    fn release_owner(&self, owner: ComponentId);

    /// Maps a datum value to a pixel coordinate.
    fn project(&self, value: &Value) -> Option<f64>;

    fn subscribe(&self, key: BindingKey, listener: Box<dyn FnMut(&DomainChanged)>);

    fn unsubscribe(&self, key: &BindingKey);

    fn set_range(&self, range: (f64, f64)) -> ChartResult<()>;

    fn range(&self) -> (f64, f64);

    /// Keyed padding exception in numeric form; `None` removes it.
    fn set_padding_exception(&self, _key: &str, _value: Option<f64>) {}

    /// Keyed included value in numeric form; `None` removes it.
    fn set_included_value(&self, _key: &str, _value: Option<f64>) {}

    /// Stable address used to compare handles behind trait objects.
    fn identity(&self) -> usize;
}

impl<D: QuantitativeValue> DataScale for ScaleHandle<QuantitativeScale<D>> {
    fn update_extent_from_values(&self, key: &BindingKey, values: &[Value]) {
        let extent = values
            .iter()
            .filter_map(D::from_json)
            .filter(|value| value.is_valid())
            .fold(None, |acc: Option<(D, D)>, value| match acc {
                None => Some((value, value)),
                Some((lo, hi)) => Some((
                    if value < lo { value } else { lo },
                    if value > hi { value } else { hi },
                )),
            });
        let key = key.clone();
        match extent {
            Some(extent) => self.mutate_or_defer(move |scale| {
                scale.update_extent(key, extent);
            }),
            None => self.mutate_or_defer(move |scale| {
                scale.remove_extent(&key);
            }),
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
        let value = D::from_json(value)?;
        let pixel = self.scale(value);
        pixel.is_finite().then_some(pixel)
    }

    fn subscribe(&self, key: BindingKey, listener: Box<dyn FnMut(&DomainChanged)>) {
        ScaleHandle::subscribe(self, key, listener);
    }

    fn unsubscribe(&self, key: &BindingKey) {
        ScaleHandle::unsubscribe(self, key);
    }

    fn set_range(&self, range: (f64, f64)) -> ChartResult<()> {
        ScaleHandle::set_range(self, range)
    }

    fn range(&self) -> (f64, f64) {
        ScaleHandle::range(self)
    }

    fn set_padding_exception(&self, key: &str, value: Option<f64>) {
        let value = value.and_then(D::from_number);
        self.update_domainer(|domainer| match value {
            Some(value) => domainer.add_padding_exception(key, value),
            None => {
                domainer.remove_padding_exception(key);
            }
        });
    }

    fn set_included_value(&self, key: &str, value: Option<f64>) {
        let value = value.and_then(D::from_number);
        self.update_domainer(|domainer| match value {
            Some(value) => domainer.add_included_value(key, value),
            None => {
                domainer.remove_included_value(key);
            }
        });
    }

    fn identity(&self) -> usize {
        self.address()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use approx::assert_relative_eq;

    use serde_json::json;

    use super::{DataScale, LinearScale, QuantitativeScale};
    use crate::core::extent::BindingKey;
    use crate::core::types::ComponentId;

    fn owner(raw: u64) -> ComponentId {
        ComponentId::new(raw)
    }

    #[test]
    fn no_extents_fall_back_to_unit_domain() {
        let mut scale = QuantitativeScale::linear();
        scale.auto_domain();
        assert_eq!(scale.domain(), (0.0, 1.0));
    }

    #[test]
    fn manual_domain_disables_auto_mode_until_reenabled() {
        let scale = LinearScale::new(QuantitativeScale::linear());
        scale.set_domain((0.0, 50.0));
        scale.update_extent(owner(1), "y", (0.0, 10.0));
        assert_eq!(scale.domain(), (0.0, 50.0));

        scale.auto_domain();
        assert_relative_eq!(scale.domain().0, -0.25);
        assert_relative_eq!(scale.domain().1, 10.25);
    }

    #[test]
    fn malformed_domain_is_ignored() {
        let scale = LinearScale::new(QuantitativeScale::linear());
        scale.set_domain((0.0, 10.0));
        assert!(!scale.set_domain((f64::NAN, 10.0)));
        assert!(!scale.set_domain((0.0, f64::INFINITY)));
        assert_eq!(scale.domain(), (0.0, 10.0));
    }

    #[test]
    fn log_scale_rejects_non_positive_domain() {
        let mut scale = QuantitativeScale::log(10.0).expect("valid base");
        assert!(scale.set_domain((1.0, 100.0)));
        assert!(!scale.set_domain((0.0, 100.0)));
        assert_eq!(scale.domain(), (1.0, 100.0));
    }

    #[test]
    fn identical_extent_does_not_broadcast() {
        let scale = LinearScale::new(QuantitativeScale::linear());
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        scale.subscribe(BindingKey::new(owner(99), "listener"), move |_| {
            counter.set(counter.get() + 1);
        });

        assert!(scale.update_extent(owner(1), "y", (0.0, 10.0)));
        assert!(!scale.update_extent(owner(1), "y", (0.0, 10.0)));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_mutation_during_broadcast_is_ignored() {
        let scale = LinearScale::new(QuantitativeScale::linear());
        let inner = scale.clone();
        let nested = Rc::new(Cell::new(None));
        let nested_result = Rc::clone(&nested);
        scale.subscribe(BindingKey::new(owner(5), "echo"), move |_| {
            nested_result.set(Some(inner.update_extent(owner(6), "y", (500.0, 600.0))));
        });

        scale.update_extent(owner(1), "y", (0.0, 10.0));
        assert_eq!(nested.get(), Some(false));
        assert_eq!(scale.extent_count(), 1);
        assert!(!scale.is_broadcasting());
    }

    #[test]
    fn extent_update_during_broadcast_is_applied_afterwards() {
        let scale = LinearScale::new(QuantitativeScale::linear());
        scale.update_domainer(|domainer| {
            domainer.set_pad_proportion(0.0).expect("valid pad");
        });
        let inner = scale.clone();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        scale.subscribe(BindingKey::new(owner(7), "follower"), move |_| {
            counter.set(counter.get() + 1);
            let key = BindingKey::new(owner(8), "y");
            DataScale::update_extent_from_values(&inner, &key, &[json!(500), json!(600)]);
        });

        scale.update_extent(owner(1), "y", (0.0, 10.0));
        assert_eq!(scale.extent_count(), 2);
        assert_eq!(scale.domain(), (0.0, 600.0));
        assert_eq!(hits.get(), 2);
        assert!(!scale.is_broadcasting());
    }

    #[test]
    fn pinned_minimum_collision_expands_upward() {
        let mut scale = QuantitativeScale::linear();
        scale.update_extent(BindingKey::new(owner(1), "y"), (0.0, 10.0));
        scale.set_domain_min(Some(20.0));
        assert_eq!(scale.domain(), (20.0, 21.0));
    }

    #[test]
    fn copy_keeps_domain_without_extents() {
        let mut scale = QuantitativeScale::linear();
        scale.update_extent(BindingKey::new(owner(1), "y"), (0.0, 10.0));
        let copy = scale.copy();
        assert_eq!(copy.domain(), scale.domain());
        assert_eq!(copy.extent_count(), 0);
        assert!(!copy.is_auto_domain());
    }

    #[test]
    fn zoom_and_pan_targets_move_domain() {
        let mut scale = QuantitativeScale::linear();
        scale.set_domain((0.0, 100.0));
        scale.set_range((0.0, 100.0)).expect("finite range");

        let (lo, hi) = scale.zoom_target(0.5, 50.0);
        assert_relative_eq!(lo, 25.0);
        assert_relative_eq!(hi, 75.0);

        let (lo, hi) = scale.pan_target(10.0);
        assert_relative_eq!(lo, -10.0);
        assert_relative_eq!(hi, 90.0);
    }
}

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::domain_value::QuantitativeValue;
use crate::core::transform::ScaleTransform;
use crate::error::{ChartError, ChartResult};

pub const DEFAULT_PAD_PROPORTION: f64 = 0.05;

/// Serializable subset of the domainer policy; exceptions and included
/// values are registered at runtime by plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainerTuning {
    #[serde(default = "default_pad_proportion")]
    pub pad_proportion: f64,
    #[serde(default)]
    pub nice_ticks: Option<usize>,
}

impl Default for DomainerTuning {
    fn default() -> Self {
        Self {
            pad_proportion: DEFAULT_PAD_PROPORTION,
            nice_ticks: None,
        }
    }
}

impl DomainerTuning {
    pub fn validate(self) -> ChartResult<Self> {
        if !self.pad_proportion.is_finite() || self.pad_proportion < 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "pad proportion must be finite and >= 0 (got {})",
                self.pad_proportion
            )));
        }
        if self.nice_ticks == Some(0) {
            return Err(ChartError::InvalidConfig(
                "nice tick count must be > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

fn default_pad_proportion() -> f64 {
    DEFAULT_PAD_PROPORTION
}

/// Policy turning a list of raw extents into a single scale domain.
///
/// The pipeline is: combine extents, expand a degenerate point, pad in the
/// transform's space, widen to included values, then optionally round to
/// nice boundaries. Padding exceptions and included values come in two
/// flavours: keyed (one slot per caller, replaced on re-registration) and
/// unkeyed (a value set, removable by value).
#[derive(Debug, Clone, PartialEq)]
pub struct Domainer<D: QuantitativeValue> {
    pad_proportion: f64,
    nice_ticks: Option<usize>,
    padding_exceptions: IndexMap<String, D>,
    unkeyed_padding_exceptions: IndexSet<OrderedFloat<f64>>,
    included_values: IndexMap<String, D>,
    unkeyed_included_values: IndexSet<OrderedFloat<f64>>,
}

impl<D: QuantitativeValue> Default for Domainer<D> {
    fn default() -> Self {
        Self {
            pad_proportion: DEFAULT_PAD_PROPORTION,
            nice_ticks: None,
            padding_exceptions: IndexMap::new(),
            unkeyed_padding_exceptions: IndexSet::new(),
            included_values: IndexMap::new(),
            unkeyed_included_values: IndexSet::new(),
        }
    }
}

impl<D: QuantitativeValue> Domainer<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tuning(tuning: DomainerTuning) -> ChartResult<Self> {
        let tuning = tuning.validate()?;
        Ok(Self {
            pad_proportion: tuning.pad_proportion,
            nice_ticks: tuning.nice_ticks,
            ..Self::default()
        })
    }

    pub fn with_pad_proportion(mut self, pad_proportion: f64) -> ChartResult<Self> {
        self.set_pad_proportion(pad_proportion)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_nice(mut self, ticks: usize) -> Self {
        self.nice_ticks = Some(ticks.max(1));
        self
    }

    pub fn set_pad_proportion(&mut self, pad_proportion: f64) -> ChartResult<()> {
        let tuning = DomainerTuning {
            pad_proportion,
            nice_ticks: self.nice_ticks,
        }
        .validate()?;
        self.pad_proportion = tuning.pad_proportion;
        Ok(())
    }

    pub fn set_nice(&mut self, ticks: Option<usize>) {
        self.nice_ticks = ticks.map(|count| count.max(1));
    }

    #[must_use]
    pub fn pad_proportion(&self) -> f64 {
        self.pad_proportion
    }

    #[must_use]
    pub fn nice_ticks(&self) -> Option<usize> {
        self.nice_ticks
    }

    /// Registers (or replaces) the padding exception owned by `key`.
    pub fn add_padding_exception(&mut self, key: impl Into<String>, value: D) {
        self.padding_exceptions.insert(key.into(), value);
    }

    pub fn remove_padding_exception(&mut self, key: &str) -> Option<D> {
        self.padding_exceptions.shift_remove(key)
    }

    pub fn add_unkeyed_padding_exception(&mut self, value: D) {
        self.unkeyed_padding_exceptions
            .insert(OrderedFloat(value.to_number()));
    }

    pub fn remove_unkeyed_padding_exception(&mut self, value: D) -> bool {
        self.unkeyed_padding_exceptions
            .shift_remove(&OrderedFloat(value.to_number()))
    }

    pub fn add_included_value(&mut self, key: impl Into<String>, value: D) {
        self.included_values.insert(key.into(), value);
    }

    pub fn remove_included_value(&mut self, key: &str) -> Option<D> {
        self.included_values.shift_remove(key)
    }

    pub fn add_unkeyed_included_value(&mut self, value: D) {
        self.unkeyed_included_values
            .insert(OrderedFloat(value.to_number()));
    }

    pub fn remove_unkeyed_included_value(&mut self, value: D) -> bool {
        self.unkeyed_included_values
            .shift_remove(&OrderedFloat(value.to_number()))
    }

    fn is_padding_exception(&self, value: f64) -> bool {
        self.unkeyed_padding_exceptions
            .contains(&OrderedFloat(value))
            || self
                .padding_exceptions
                .values()
                .any(|exception| exception.to_number() == value)
    }

    fn included_numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.included_values
            .values()
            .map(|value| value.to_number())
            .chain(self.unkeyed_included_values.iter().map(|value| value.0))
            .filter(|value| value.is_finite())
    }

    /// Combines `extents` into the final domain.
    ///
    /// Pure with respect to its inputs and the registered exceptions.
    #[must_use]
    pub fn compute_domain(&self, extents: &[(D, D)], transform: ScaleTransform) -> (D, D) {
        let Some((min, max)) = combine_extents(extents) else {
            return D::default_domain();
        };
        let min_n = min.to_number();
        let max_n = max.to_number();

        let (lo, hi) = if min_n == max_n {
            let widened_by_includes = self.included_numbers().any(|value| value != min_n);
            if widened_by_includes {
                (min_n, max_n)
            } else {
                let (below, above) = min.single_value_expansion();
                // An exception at the point keeps the lower edge in place.
                let below = if self.is_padding_exception(min_n) {
                    min
                } else {
                    below
                };
                (below.to_number(), above.to_number())
            }
        } else {
            self.pad(min_n, max_n, transform)
        };

        let (lo, hi) = self
            .included_numbers()
            .fold((lo, hi), |(lo, hi), value| (lo.min(value), hi.max(value)));

        let (lo, hi) = match self.nice_ticks {
            Some(count) => transform.nice(lo, hi, count),
            None => (lo, hi),
        };

        match (D::from_number(lo), D::from_number(hi)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => (min, max),
        }
    }

    fn pad(&self, min: f64, max: f64, transform: ScaleTransform) -> (f64, f64) {
        if self.pad_proportion == 0.0 {
            return (min, max);
        }
        let f_min = transform.forward(min);
        let f_max = transform.forward(max);
        let half = (f_max - f_min) * self.pad_proportion / 2.0;

        let padded_min = transform.inverse(f_min - half);
        let padded_max = transform.inverse(f_max + half);

        let lo = if self.is_padding_exception(min) || !padded_min.is_finite() {
            min
        } else {
            padded_min
        };
        let hi = if self.is_padding_exception(max) || !padded_max.is_finite() {
            max
        } else {
            padded_max
        };
        (lo, hi)
    }
}

/// Element-wise min/max across extents, skipping entries with invalid bounds.
fn combine_extents<D: QuantitativeValue>(extents: &[(D, D)]) -> Option<(D, D)> {
    extents
        .iter()
        .filter(|(lo, hi)| lo.is_valid() && hi.is_valid())
        .map(|&(lo, hi)| if lo <= hi { (lo, hi) } else { (hi, lo) })
        .reduce(|(acc_lo, acc_hi), (lo, hi)| {
            (
                if lo < acc_lo { lo } else { acc_lo },
                if hi > acc_hi { hi } else { acc_hi },
            )
        })
}

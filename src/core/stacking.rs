use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::domain_value::{QuantitativeValue, normalize_key};

/// Order in which datasets are piled onto the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackOrder {
    /// First dataset sits on the baseline.
    #[default]
    BottomUp,
    /// Last dataset sits on the baseline.
    TopDown,
}

/// One `(key, value)` pair extracted from a datum.
#[derive(Debug, Clone, PartialEq)]
pub struct StackDatum {
    pub key: String,
    pub value: f64,
}

impl StackDatum {
    #[must_use]
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Builds a datum from raw accessor output; values that are not numbers
    /// count as zero.
    #[must_use]
    pub fn from_values(key: &Value, value: &Value) -> Self {
        Self {
            key: normalize_key(key),
            value: f64::from_json(value).unwrap_or(0.0),
        }
    }
}

pub type StackSeries = Vec<StackDatum>;

/// Per-dataset mapping from normalized key to the datum's baseline offset.
pub type StackOffsets = IndexMap<String, f64>;

/// Ordered union of every series' keys.
#[must_use]
pub fn domain_keys(series: &[StackSeries]) -> Vec<String> {
    let keys: IndexSet<&str> = series
        .iter()
        .flatten()
        .map(|datum| datum.key.as_str())
        .collect();
    keys.into_iter().map(str::to_owned).collect()
}

/// Computes the baseline offset of every datum.
///
/// Positive and negative values accumulate in separate pools. A zero value
/// follows the rest of its dataset: it sits on the negative pool when every
/// nonzero value of the dataset is negative, on the positive pool otherwise.
/// Offsets come back in input order regardless of `order`.
#[must_use]
pub fn compute_stack_offsets(series: &[StackSeries], order: StackOrder) -> Vec<StackOffsets> {
    let keys = domain_keys(series);
    warn_on_key_mismatch(series, &keys);

    let value_maps: Vec<IndexMap<&str, f64>> = series
        .iter()
        .map(|data| {
            let mut values: IndexMap<&str, f64> =
                keys.iter().map(|key| (key.as_str(), 0.0)).collect();
            for datum in data {
                values.insert(datum.key.as_str(), datum.value);
            }
            values
        })
        .collect();

    let stacking_order: Vec<usize> = match order {
        StackOrder::BottomUp => (0..series.len()).collect(),
        StackOrder::TopDown => (0..series.len()).rev().collect(),
    };

    let mut positive_offsets = vec![IndexMap::<&str, f64>::new(); series.len()];
    let mut negative_offsets = vec![IndexMap::<&str, f64>::new(); series.len()];
    let mut positive_totals: IndexMap<&str, f64> =
        keys.iter().map(|key| (key.as_str(), 0.0)).collect();
    let mut negative_totals = positive_totals.clone();

    for &index in &stacking_order {
        for (&key, &value) in &value_maps[index] {
            let positive = positive_totals.entry(key).or_insert(0.0);
            positive_offsets[index].insert(key, *positive);
            *positive += value.max(0.0);

            let negative = negative_totals.entry(key).or_insert(0.0);
            negative_offsets[index].insert(key, *negative);
            *negative += value.min(0.0);
        }
    }

    series
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let nonzero_all_negative = data
                .iter()
                .filter(|datum| datum.value != 0.0)
                .all(|datum| datum.value < 0.0);
            let has_nonzero = data.iter().any(|datum| datum.value != 0.0);

            data.iter()
                .map(|datum| {
                    let key = datum.key.as_str();
                    let positive = positive_offsets[index].get(key).copied().unwrap_or(0.0);
                    let negative = negative_offsets[index].get(key).copied().unwrap_or(0.0);
                    let offset = if datum.value > 0.0 {
                        positive
                    } else if datum.value < 0.0 {
                        negative
                    } else if has_nonzero {
                        if nonzero_all_negative { negative } else { positive }
                    } else if positive == 0.0 && negative != 0.0 {
                        negative
                    } else {
                        positive
                    };
                    (datum.key.clone(), offset)
                })
                .collect()
        })
        .collect()
}

/// Extent covered by `value + offset` over every datum passing `filter`,
/// always including zero. No data yields `[0, 0]`.
#[must_use]
pub fn compute_stack_extent(
    series: &[StackSeries],
    offsets: &[StackOffsets],
    filter: Option<&dyn Fn(&StackDatum, usize) -> bool>,
) -> (f64, f64) {
    let mut min = 0.0_f64;
    let mut max = 0.0_f64;
    for (data, dataset_offsets) in series.iter().zip(offsets) {
        for (index, datum) in data.iter().enumerate() {
            if let Some(keep) = filter {
                if !keep(datum, index) {
                    continue;
                }
            }
            let offset = dataset_offsets.get(&datum.key).copied().unwrap_or(0.0);
            let top = datum.value + offset;
            if top.is_finite() {
                min = min.min(top);
                max = max.max(top);
            }
        }
    }
    (min, max)
}

fn warn_on_key_mismatch(series: &[StackSeries], keys: &[String]) {
    for (index, data) in series.iter().enumerate() {
        let present: IndexSet<&str> = data.iter().map(|datum| datum.key.as_str()).collect();
        if present.len() != keys.len() {
            warn!(
                dataset = index,
                missing_keys = keys.len() - present.len(),
                "stacked dataset keys differ from the stacking domain; missing keys count as zero"
            );
        }
    }
}

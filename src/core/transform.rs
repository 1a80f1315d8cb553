use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

const E10: f64 = 7.071_067_811_865_476; // sqrt(50)
const E5: f64 = 3.162_277_660_168_379_5; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = 60.0 * SECOND_MS;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;
const YEAR_MS: f64 = 365.0 * DAY_MS;

/// Epoch-aligned intervals used to snap time domains. Months and quarters are
/// approximated by fixed 30/90 day spans.
const TIME_INTERVALS_MS: [f64; 18] = [
    SECOND_MS,
    5.0 * SECOND_MS,
    15.0 * SECOND_MS,
    30.0 * SECOND_MS,
    MINUTE_MS,
    5.0 * MINUTE_MS,
    15.0 * MINUTE_MS,
    30.0 * MINUTE_MS,
    HOUR_MS,
    3.0 * HOUR_MS,
    6.0 * HOUR_MS,
    12.0 * HOUR_MS,
    DAY_MS,
    2.0 * DAY_MS,
    7.0 * DAY_MS,
    30.0 * DAY_MS,
    90.0 * DAY_MS,
    YEAR_MS,
];

/// Domain-to-range mapping function backing a quantitative scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ScaleTransform {
    /// Uniform spacing in raw units.
    #[default]
    Linear,
    /// Uniform spacing in `log_base` units; the domain must stay positive.
    Log { base: f64 },
    /// Linear over epoch milliseconds with calendar-interval nice rounding.
    Time,
}

impl ScaleTransform {
    pub fn log(base: f64) -> ChartResult<Self> {
        if !base.is_finite() || base <= 1.0 {
            return Err(ChartError::InvalidConfig(format!(
                "log scale base must be finite and > 1 (got {base})"
            )));
        }
        Ok(Self::Log { base })
    }

    /// Maps a domain number into the uniform transform space.
    #[must_use]
    pub fn forward(self, value: f64) -> f64 {
        match self {
            Self::Linear | Self::Time => value,
            Self::Log { base } => value.ln() / base.ln(),
        }
    }

    #[must_use]
    pub fn inverse(self, value: f64) -> f64 {
        match self {
            Self::Linear | Self::Time => value,
            Self::Log { base } => base.powf(value),
        }
    }

    /// Whether the transform can represent this domain bound.
    #[must_use]
    pub fn accepts(self, value: f64) -> bool {
        match self {
            Self::Linear | Self::Time => value.is_finite(),
            Self::Log { .. } => value.is_finite() && value > 0.0,
        }
    }

    /// Maps `value` from `domain` onto `range`.
    #[must_use]
    pub fn map(self, value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
        let d0 = self.forward(domain.0);
        let d1 = self.forward(domain.1);
        let span = d1 - d0;
        if span == 0.0 || !span.is_finite() {
            return (range.0 + range.1) / 2.0;
        }
        let normalized = (self.forward(value) - d0) / span;
        range.0 + normalized * (range.1 - range.0)
    }

    /// Inverse of [`ScaleTransform::map`].
    #[must_use]
    pub fn invert(self, pixel: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
        let r_span = range.1 - range.0;
        if r_span == 0.0 {
            return domain.0;
        }
        let d0 = self.forward(domain.0);
        let d1 = self.forward(domain.1);
        let normalized = (pixel - range.0) / r_span;
        self.inverse(d0 + normalized * (d1 - d0))
    }

    /// Expands `(min, max)` outward onto "nice" round values.
    #[must_use]
    pub fn nice(self, min: f64, max: f64, count: usize) -> (f64, f64) {
        if !min.is_finite() || !max.is_finite() || min == max {
            return (min, max);
        }
        let (lo, hi, reversed) = if min <= max {
            (min, max, false)
        } else {
            (max, min, true)
        };
        let (lo, hi) = match self {
            Self::Linear => nice_linear(lo, hi, count),
            Self::Log { base } => nice_log(lo, hi, base),
            Self::Time => nice_time(lo, hi, count),
        };
        if reversed { (hi, lo) } else { (lo, hi) }
    }

    /// Generates roughly `count` tick values inside `(min, max)`.
    #[must_use]
    pub fn ticks(self, min: f64, max: f64, count: usize) -> Vec<f64> {
        if !min.is_finite() || !max.is_finite() {
            return Vec::new();
        }
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        match self {
            Self::Linear => linear_ticks(lo, hi, count),
            Self::Log { base } => log_ticks(lo, hi, base),
            Self::Time => {
                let step = time_interval(hi - lo, count);
                let first = (lo / step).ceil() as i64;
                let last = (hi / step).floor() as i64;
                (first..=last).map(|index| index as f64 * step).collect()
            }
        }
    }
}

/// d3-style tick increment: positive for steps >= 1, negative reciprocal
/// for fractional steps so multiples stay exact.
#[must_use]
pub fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    if step <= 0.0 || !step.is_finite() {
        return 0.0;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -(10f64.powf(-power)) / factor
    }
}

fn floor_to(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).floor() * step
    } else {
        (value * step).ceil() / step
    }
}

fn ceil_to(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).ceil() * step
    } else {
        (value * step).floor() / step
    }
}

fn nice_linear(lo: f64, hi: f64, count: usize) -> (f64, f64) {
    let mut start = lo;
    let mut stop = hi;
    // Two passes: snapping can enlarge the span enough to change the step.
    for _ in 0..2 {
        let step = tick_increment(start, stop, count);
        if step == 0.0 {
            break;
        }
        start = floor_to(start, step);
        stop = ceil_to(stop, step);
    }
    (start, stop)
}

fn nice_log(lo: f64, hi: f64, base: f64) -> (f64, f64) {
    if lo <= 0.0 {
        return (lo, hi);
    }
    let log_base = base.ln();
    let lo_exp = (lo.ln() / log_base).floor();
    let hi_exp = (hi.ln() / log_base).ceil();
    (base.powf(lo_exp), base.powf(hi_exp))
}

fn time_interval(span: f64, count: usize) -> f64 {
    let target = span / count.max(1) as f64;
    if let Some(interval) = TIME_INTERVALS_MS.iter().copied().find(|&ms| ms >= target) {
        return interval;
    }
    let years = tick_increment(0.0, span / YEAR_MS, count).abs().max(1.0);
    years * YEAR_MS
}

fn nice_time(lo: f64, hi: f64, count: usize) -> (f64, f64) {
    let step = time_interval(hi - lo, count);
    ((lo / step).floor() * step, (hi / step).ceil() * step)
}

fn linear_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if lo == hi {
        return vec![lo];
    }
    let step = tick_increment(lo, hi, count);
    if step > 0.0 {
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last).map(|index| index as f64 * step).collect()
    } else if step < 0.0 {
        let inv = -step;
        let first = (lo * inv).ceil() as i64;
        let last = (hi * inv).floor() as i64;
        (first..=last).map(|index| index as f64 / inv).collect()
    } else {
        Vec::new()
    }
}

fn log_ticks(lo: f64, hi: f64, base: f64) -> Vec<f64> {
    if lo <= 0.0 {
        return Vec::new();
    }
    let log_base = base.ln();
    let first = (lo.ln() / log_base).ceil() as i64;
    let last = (hi.ln() / log_base).floor() as i64;
    (first..=last).map(|exp| base.powf(exp as f64)).collect()
}

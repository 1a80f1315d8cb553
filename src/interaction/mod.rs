//! Frame-clock driven domain transitions for zoom and pan.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::domain_value::QuantitativeValue;
use crate::core::scale::{QuantitativeScale, ScaleHandle};
use crate::error::{ChartError, ChartResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Cubic ease-out: fast start, gentle landing.
    #[default]
    EaseOut,
}

impl Easing {
    #[must_use]
    pub fn apply(self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

impl FromStr for Easing {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "ease_out" | "ease-out" => Ok(Self::EaseOut),
            other => Err(ChartError::InvalidConfig(format!("unsupported easing `{other}`"))),
        }
    }
}

/// Tuning for domain transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Transition length in milliseconds; zero applies targets immediately.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            easing: Easing::default(),
        }
    }
}

fn default_duration_ms() -> f64 {
    250.0
}

impl AnimationConfig {
    pub fn validate(self) -> ChartResult<Self> {
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(ChartError::InvalidConfig(format!(
                "animation duration must be finite and >= 0 (got {})",
                self.duration_ms
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationState<D> {
    Idle,
    Animating {
        from: (D, D),
        to: (D, D),
        started_at_ms: f64,
    },
    Settled {
        domain: (D, D),
    },
}

/// Anything the stage advances once per animation frame.
pub trait FrameAnimator {
    /// Advances to `now_ms`; returns `true` while still animating.
    fn tick(&mut self, now_ms: f64) -> bool;
}

/// Moves a scale's domain towards a target over several frames.
///
/// Interpolation runs in transform space so log scales zoom geometrically.
/// Starting a new transition replaces the one in flight, beginning from the
/// domain currently shown.
#[derive(Debug)]
pub struct DomainAnimator<D: QuantitativeValue> {
    scale: ScaleHandle<QuantitativeScale<D>>,
    config: AnimationConfig,
    state: AnimationState<D>,
}

impl<D: QuantitativeValue> DomainAnimator<D> {
    pub fn new(scale: ScaleHandle<QuantitativeScale<D>>, config: AnimationConfig) -> ChartResult<Self> {
        Ok(Self {
            scale,
            config: config.validate()?,
            state: AnimationState::Idle,
        })
    }

    #[must_use]
    pub fn state(&self) -> AnimationState<D> {
        self.state
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, AnimationState::Animating { .. })
    }

    #[must_use]
    pub fn config(&self) -> AnimationConfig {
        self.config
    }

    pub fn start(&mut self, target: (D, D), now_ms: f64) -> ChartResult<()> {
        let transform = self.scale.read(QuantitativeScale::transform);
        let valid = |value: D| value.is_valid() && transform.accepts(value.to_number());
        if !valid(target.0) || !valid(target.1) || !now_ms.is_finite() {
            return Err(ChartError::InvalidData(format!(
                "animation target {target:?} at {now_ms} is not representable"
            )));
        }
        if self.config.duration_ms == 0.0 {
            self.scale.set_domain(target);
            self.state = AnimationState::Settled { domain: target };
            return Ok(());
        }
        let from = self.scale.domain();
        debug!(from = ?from, to = ?target, "domain animation started");
        self.state = AnimationState::Animating {
            from,
            to: target,
            started_at_ms: now_ms,
        };
        Ok(())
    }

    /// Zooms by `factor` around the pixel `center`; `factor < 1` zooms in.
    pub fn zoom(&mut self, factor: f64, center: f64, now_ms: f64) -> ChartResult<()> {
        let target = self.scale.read(|scale| scale.zoom_target(factor, center));
        self.start(target, now_ms)
    }

    pub fn pan(&mut self, delta: f64, now_ms: f64) -> ChartResult<()> {
        let target = self.scale.read(|scale| scale.pan_target(delta));
        self.start(target, now_ms)
    }

    /// Stops an in-flight transition where it is.
    pub fn cancel(&mut self) {
        if self.is_animating() {
            trace!("domain animation cancelled");
            self.state = AnimationState::Idle;
        }
    }

    /// Applies the interpolated domain for `now_ms`; returns it while
    /// animating.
    pub fn advance(&mut self, now_ms: f64) -> Option<(D, D)> {
        let AnimationState::Animating {
            from,
            to,
            started_at_ms,
        } = self.state
        else {
            return None;
        };
        let progress = ((now_ms - started_at_ms) / self.config.duration_ms).clamp(0.0, 1.0);
        let eased = self.config.easing.apply(progress);
        let transform = self.scale.read(QuantitativeScale::transform);
        let lerp = |a: D, b: D| {
            let (fa, fb) = (transform.forward(a.to_number()), transform.forward(b.to_number()));
            D::from_number(transform.inverse(fa + (fb - fa) * eased)).unwrap_or(b)
        };
        let domain = if progress >= 1.0 {
            to
        } else {
            (lerp(from.0, to.0), lerp(from.1, to.1))
        };
        self.scale.set_domain(domain);
        if progress >= 1.0 {
            self.state = AnimationState::Settled { domain: to };
        }
        Some(domain)
    }
}

impl<D: QuantitativeValue> FrameAnimator for DomainAnimator<D> {
    fn tick(&mut self, now_ms: f64) -> bool {
        self.advance(now_ms);
        self.is_animating()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{AnimationConfig, AnimationState, DomainAnimator, Easing, FrameAnimator};
    use crate::core::{LinearScale, QuantitativeScale};

    fn scale() -> LinearScale {
        let scale = LinearScale::new(QuantitativeScale::linear());
        scale.set_domain((0.0, 100.0));
        scale.set_range((0.0, 100.0)).expect("range");
        scale
    }

    #[test]
    fn animation_runs_idle_animating_settled() {
        let scale = scale();
        let config = AnimationConfig {
            duration_ms: 100.0,
            easing: Easing::Linear,
        };
        let mut animator = DomainAnimator::new(scale.clone(), config).expect("config");
        assert_eq!(animator.state(), AnimationState::Idle);

        animator.start((0.0, 50.0), 1000.0).expect("start");
        let mid = animator.advance(1050.0).expect("animating");
        assert_relative_eq!(mid.1, 75.0);
        assert_eq!(scale.domain(), mid);

        assert!(!animator.tick(1200.0));
        assert_eq!(animator.state(), AnimationState::Settled { domain: (0.0, 50.0) });
        assert_eq!(scale.domain(), (0.0, 50.0));
    }

    #[test]
    fn cancel_keeps_current_domain() {
        let scale = scale();
        let mut animator = DomainAnimator::new(scale.clone(), AnimationConfig::default())
            .expect("config");
        animator.zoom(0.5, 50.0, 0.0).expect("zoom");
        animator.advance(100.0);
        let shown = scale.domain();
        animator.cancel();
        assert_eq!(animator.state(), AnimationState::Idle);
        assert!(animator.advance(1000.0).is_none());
        assert_eq!(scale.domain(), shown);
    }

    #[test]
    fn zero_duration_applies_immediately() {
        let scale = scale();
        let config = AnimationConfig {
            duration_ms: 0.0,
            easing: Easing::Linear,
        };
        let mut animator = DomainAnimator::new(scale.clone(), config).expect("config");
        animator.pan(10.0, 0.0).expect("pan");
        assert_eq!(scale.domain(), (-10.0, 90.0));
        assert!(!animator.is_animating());
    }

    #[test]
    fn invalid_config_and_easing_names_are_rejected() {
        let config = AnimationConfig {
            duration_ms: -1.0,
            easing: Easing::Linear,
        };
        assert!(DomainAnimator::new(scale(), config).is_err());
        assert!("bounce".parse::<Easing>().is_err());
        assert_eq!("ease-out".parse::<Easing>().expect("known"), Easing::EaseOut);
    }
}

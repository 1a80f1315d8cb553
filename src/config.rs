use serde::{Deserialize, Serialize};

use crate::core::domainer::DomainerTuning;
use crate::error::{ChartError, ChartResult};
use crate::interaction::AnimationConfig;
use crate::layout::LayoutTuning;

/// Defaults applied to scales created through a stage.
pub type ScaleDefaults = DomainerTuning;

/// Stage-wide tuning, loadable from JSON.
///
/// Every section is optional; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub scale: ScaleDefaults,
    #[serde(default)]
    pub layout: LayoutTuning,
    #[serde(default)]
    pub animation: AnimationConfig,
}

impl StageConfig {
    #[must_use]
    pub fn with_scale(mut self, scale: ScaleDefaults) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: LayoutTuning) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        self.scale.validate()?;
        self.layout.validate()?;
        self.animation.validate()?;
        Ok(self)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()
    }

    pub fn to_json_pretty(self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::StageConfig;
    use crate::error::ChartError;
    use crate::interaction::Easing;

    #[test]
    fn missing_sections_take_defaults() {
        let config = StageConfig::from_json_str(r#"{"animation": {"easing": "linear"}}"#)
            .expect("valid config");
        assert_eq!(config.animation.easing, Easing::Linear);
        assert_eq!(config.animation.duration_ms, 250.0);
        assert_eq!(config.layout.max_iterations, 5);
        assert_eq!(config.scale.pad_proportion, 0.05);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = StageConfig::from_json_str(r#"{"scale": {"pad_proportion": -1}}"#)
            .expect_err("negative pad");
        assert!(matches!(err, ChartError::InvalidConfig(_)));

        let err = StageConfig::from_json_str("{not json").expect_err("malformed");
        assert!(matches!(err, ChartError::ConfigParse(_)));
    }

    #[test]
    fn json_round_trip_keeps_values() {
        let config = StageConfig::default();
        let json = config.to_json_pretty().expect("serialize");
        assert_eq!(StageConfig::from_json_str(&json).expect("parse"), config);
    }
}

//! Snowfall configuration

use crate::constants::*;
use crate::error::{SnowError, SnowResult};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// The four operator knobs exposed by the hosting shell's property pane.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnowConfig {
    pub snow_amount: u32,
    pub fall_speed: f32,
    pub wind_strength: f32,
    /// Seconds until the fade out starts, 0 = unlimited.
    pub timer: u32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            snow_amount: DEFAULT_SNOW_AMOUNT,
            fall_speed: DEFAULT_FALL_SPEED,
            wind_strength: DEFAULT_WIND_STRENGTH,
            timer: DEFAULT_TIMER_SECS,
        }
    }
}

#[wasm_bindgen]
impl SnowConfig {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A single property-pane field, addressed by its JS property path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigField {
    SnowAmount,
    FallSpeed,
    WindStrength,
    Timer,
}

impl ConfigField {
    pub fn from_path(path: &str) -> SnowResult<Self> {
        match path {
            "snowAmount" => Ok(Self::SnowAmount),
            "fallSpeed" => Ok(Self::FallSpeed),
            "windStrength" => Ok(Self::WindStrength),
            "timer" => Ok(Self::Timer),
            other => Err(SnowError::UnknownProperty(other.to_string())),
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::SnowAmount => "snowAmount",
            Self::FallSpeed => "fallSpeed",
            Self::WindStrength => "windStrength",
            Self::Timer => "timer",
        }
    }
}

impl SnowConfig {
    /// Reads a (possibly partial) property bag. Missing or non-numeric
    /// entries keep their defaults.
    pub fn from_js(value: JsValue) -> Self {
        let mut config = Self::default();

        if !value.is_object() {
            if let Some(count) = value.as_f64() {
                config.set(ConfigField::SnowAmount, count);
            }
            return config;
        }

        macro_rules! extract {
            ($field:expr) => {
                if let Ok(v) = js_sys::Reflect::get(&value, &$field.path().into()) {
                    if let Some(num) = v.as_f64() {
                        config.set($field, num);
                    }
                }
            };
        }

        extract!(ConfigField::SnowAmount);
        extract!(ConfigField::FallSpeed);
        extract!(ConfigField::WindStrength);
        extract!(ConfigField::Timer);

        config
    }

    /// Stores `value` into `field`, clamped to the field's range. Non-finite
    /// input resets the field to its default.
    pub fn set(&mut self, field: ConfigField, value: f64) {
        let defaults = Self::default();
        match field {
            ConfigField::SnowAmount => {
                self.snow_amount = if value.is_finite() {
                    clamp_u32(value, SNOW_AMOUNT_RANGE)
                } else {
                    defaults.snow_amount
                };
            }
            ConfigField::FallSpeed => {
                self.fall_speed = if value.is_finite() {
                    (value as f32).clamp(FALL_SPEED_RANGE.0, FALL_SPEED_RANGE.1)
                } else {
                    defaults.fall_speed
                };
            }
            ConfigField::WindStrength => {
                self.wind_strength = if value.is_finite() {
                    (value as f32).clamp(WIND_STRENGTH_RANGE.0, WIND_STRENGTH_RANGE.1)
                } else {
                    defaults.wind_strength
                };
            }
            ConfigField::Timer => {
                self.timer = if value.is_finite() {
                    clamp_u32(value, TIMER_RANGE_SECS)
                } else {
                    defaults.timer
                };
            }
        }
    }

    /// Updates a field by its JS property path.
    pub fn set_path(&mut self, path: &str, value: f64) -> SnowResult<ConfigField> {
        let field = ConfigField::from_path(path)?;
        self.set(field, value);
        Ok(field)
    }

    /// Returns a copy with every field forced into range.
    pub fn clamped(self) -> Self {
        let mut config = self;
        config.set(ConfigField::SnowAmount, f64::from(self.snow_amount));
        config.set(ConfigField::FallSpeed, f64::from(self.fall_speed));
        config.set(ConfigField::WindStrength, f64::from(self.wind_strength));
        config.set(ConfigField::Timer, f64::from(self.timer));
        config
    }

    pub fn timeout_ms(&self) -> Option<f64> {
        (self.timer > 0).then(|| f64::from(self.timer) * 1000.0)
    }
}

fn clamp_u32(value: f64, (min, max): (u32, u32)) -> u32 {
    value.round().clamp(f64::from(min), f64::from(max)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_property_pane() {
        let config = SnowConfig::default();
        assert_eq!(config.snow_amount, 100);
        assert_eq!(config.fall_speed, 2.0);
        assert_eq!(config.wind_strength, 2.0);
        assert_eq!(config.timer, 0);
        assert_eq!(config.timeout_ms(), None);
    }

    #[test]
    fn values_are_clamped_into_range() {
        let mut config = SnowConfig::default();
        config.set(ConfigField::SnowAmount, 5000.0);
        config.set(ConfigField::FallSpeed, 0.1);
        config.set(ConfigField::WindStrength, -3.0);
        config.set(ConfigField::Timer, 900.0);
        assert_eq!(config.snow_amount, 2000);
        assert_eq!(config.fall_speed, 0.5);
        assert_eq!(config.wind_strength, 0.0);
        assert_eq!(config.timer, 500);
    }

    #[test]
    fn zero_wind_is_kept() {
        let mut config = SnowConfig::default();
        config.set(ConfigField::WindStrength, 0.0);
        assert_eq!(config.wind_strength, 0.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let mut config = SnowConfig {
            snow_amount: 300,
            fall_speed: 9.0,
            wind_strength: 1.0,
            timer: 10,
        };
        config.set(ConfigField::SnowAmount, f64::NAN);
        config.set(ConfigField::FallSpeed, f64::INFINITY);
        assert_eq!(config.snow_amount, 100);
        assert_eq!(config.fall_speed, 2.0);
        assert_eq!(config.timer, 10);
    }

    #[test]
    fn set_path_rejects_unknown_fields() {
        let mut config = SnowConfig::default();
        assert_eq!(
            config.set_path("timer", 30.0).ok(),
            Some(ConfigField::Timer)
        );
        assert_eq!(config.timeout_ms(), Some(30_000.0));
        assert!(matches!(
            config.set_path("colour", 1.0),
            Err(SnowError::UnknownProperty(_))
        ));
    }

    #[test]
    fn snapshot_uses_camel_case() {
        let json = serde_json::to_value(SnowConfig::default()).unwrap();
        assert_eq!(json["snowAmount"], 100);
        assert_eq!(json["windStrength"], 2.0);

        let partial: SnowConfig = serde_json::from_str(r#"{"timer": 15}"#).unwrap();
        assert_eq!(partial.timer, 15);
        assert_eq!(partial.snow_amount, 100);
    }
}

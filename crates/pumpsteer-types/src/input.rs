// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PumpSteer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::{PriceModel, PricePoint};

/// Raw hourly outdoor temperature forecast as delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForecastInput {
    /// Comma-separated text, e.g. "3.5, 2.0, -1.0"
    Csv(String),
    /// Already split values
    Values(Vec<f64>),
}

/// Everything one evaluation cycle needs. Built fresh by the host each cycle.
///
/// Sensor readings are optional: a missing or non-finite reading puts the
/// cycle into degraded status instead of failing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleInput {
    /// Evaluation time
    pub now: DateTime<Utc>,

    pub indoor_temp: Option<f64>,
    pub target_temp: Option<f64>,
    pub real_outdoor_temp: Option<f64>,

    /// Current price; falls back to today's price for the current hour
    pub price_now: Option<f64>,

    /// Observed prices, oldest first, covering at least 72 hours
    #[serde(default)]
    pub price_history: Vec<PricePoint>,

    /// Today's hourly prices aligned to local wall-clock hours
    #[serde(default)]
    pub price_forecast_today: Vec<f64>,

    /// Tomorrow's hourly prices, when already published
    #[serde(default)]
    pub price_forecast_tomorrow: Vec<f64>,

    /// Hourly outdoor forecast; entry 0 is the current hour
    #[serde(default)]
    pub temp_forecast: Option<ForecastInput>,

    /// 0 (comfort) ..= 5 (savings)
    #[serde(default = "default_aggressiveness")]
    pub aggressiveness: f64,

    /// 0 ..= 10, user-fixed value or seed for auto-tuning
    #[serde(default = "default_house_inertia")]
    pub house_inertia: f64,

    #[serde(default = "default_summer_threshold")]
    pub summer_threshold: f64,

    #[serde(default)]
    pub holiday_mode: bool,
    pub holiday_start: Option<DateTime<Utc>>,
    pub holiday_end: Option<DateTime<Utc>>,

    #[serde(default = "default_true")]
    pub preboost_enabled: bool,

    #[serde(default)]
    pub price_model: PriceModel,

    /// Use the learned inertia instead of `house_inertia`
    #[serde(default)]
    pub autotune_inertia: bool,
}

fn default_aggressiveness() -> f64 {
    3.0
}

fn default_house_inertia() -> f64 {
    2.0
}

fn default_summer_threshold() -> f64 {
    18.0
}

fn default_true() -> bool {
    true
}

impl Default for CycleInput {
    fn default() -> Self {
        Self {
            now: DateTime::<Utc>::default(),
            indoor_temp: None,
            target_temp: None,
            real_outdoor_temp: None,
            price_now: None,
            price_history: Vec::new(),
            price_forecast_today: Vec::new(),
            price_forecast_tomorrow: Vec::new(),
            temp_forecast: None,
            aggressiveness: default_aggressiveness(),
            house_inertia: default_house_inertia(),
            summer_threshold: default_summer_threshold(),
            holiday_mode: false,
            holiday_start: None,
            holiday_end: None,
            preboost_enabled: true,
            price_model: PriceModel::default(),
            autotune_inertia: false,
        }
    }
}

impl CycleInput {
    /// Names of required readings that are missing or not finite
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let readings = [
            ("indoor_temp", self.indoor_temp),
            ("target_temp", self.target_temp),
            ("real_outdoor_temp", self.real_outdoor_temp),
        ];
        readings
            .into_iter()
            .filter(|(_, value)| !value.is_some_and(f64::is_finite))
            .map(|(name, _)| name)
            .collect()
    }

    /// Known hourly prices from today's midnight onward (today, then tomorrow)
    pub fn known_prices(&self) -> Vec<f64> {
        self.price_forecast_today
            .iter()
            .chain(self.price_forecast_tomorrow.iter())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let input: CycleInput = serde_json::from_str(
            r#"{"now": "2025-01-15T10:00:00Z", "indoor_temp": 20.5, "target_temp": 21.0}"#,
        )
        .unwrap();

        assert_eq!(input.indoor_temp, Some(20.5));
        assert_eq!(input.real_outdoor_temp, None);
        assert!((input.aggressiveness - 3.0).abs() < f64::EPSILON);
        assert!(input.preboost_enabled);
        assert_eq!(input.price_model, PriceModel::Hybrid);
        assert_eq!(input.missing_fields(), vec!["real_outdoor_temp"]);
    }

    #[test]
    fn test_forecast_accepts_text_or_array() {
        let text: ForecastInput = serde_json::from_str(r#""1.0, 2.0""#).unwrap();
        assert_eq!(text, ForecastInput::Csv("1.0, 2.0".to_owned()));

        let values: ForecastInput = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(values, ForecastInput::Values(vec![1.0, 2.0]));
    }

    #[test]
    fn test_non_finite_reading_counts_as_missing() {
        let input = CycleInput {
            indoor_temp: Some(f64::NAN),
            target_temp: Some(21.0),
            real_outdoor_temp: Some(2.0),
            ..CycleInput::default()
        };
        assert_eq!(input.missing_fields(), vec!["indoor_temp"]);
    }
}

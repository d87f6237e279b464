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

use crate::mode::OperatingMode;
use crate::pricing::PriceCategory;

/// Whether the cycle produced a fresh value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    #[default]
    Ok,
    /// Required input missing; last known value held
    Degraded,
}

/// Non-fatal problem detected during a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    MissingInput {
        fields: Vec<String>,
    },
    MalformedForecast {
        reason: String,
    },
    ForecastUnavailable,
    InsufficientHistory {
        span_hours: f64,
        required_hours: f64,
    },
    CorruptedState {
        reason: String,
    },
    InputClamped {
        field: String,
        value: f64,
        clamped_to: f64,
    },
    SafetyLimitReached {
        raw: f64,
    },
}

/// How much of the optional input was usable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub history_span_hours: f64,
    pub history_sufficient: bool,
    pub forecast_hours: usize,
    pub forecast_valid: bool,
    pub known_price_hours: usize,
}

/// Value and attribute set reported once per cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleOutput {
    pub timestamp: DateTime<Utc>,
    pub status: CycleStatus,

    /// Emitted virtual outdoor temperature, one decimal
    pub virtual_temp: Option<f64>,
    pub mode: Option<OperatingMode>,
    pub decision_reason: String,

    // Price
    pub price_category: PriceCategory,
    pub price_factor_percent: f64,
    pub current_price: Option<f64>,
    pub min_price: f64,
    pub max_price: f64,
    pub next_3_hours_prices: Vec<f64>,
    pub saving_potential: f64,
    pub price_categories_all_hours: Vec<PriceCategory>,
    pub braking_threshold_percent: f64,

    // Knobs
    pub aggressiveness: f64,
    pub inertia: f64,
    pub summer_threshold: f64,
    pub holiday_mode: bool,
    pub preboost_enabled: bool,

    // Temperatures and deltas
    pub target_temp: Option<f64>,
    pub effective_target: Option<f64>,
    pub indoor_temp: Option<f64>,
    pub outdoor_temp: Option<f64>,
    pub temp_error_c: Option<f64>,
    pub to_summer_threshold_c: Option<f64>,

    // Forecast
    pub preboost_expected_in_hours: Option<u32>,
    pub first_preboost_hour: Option<u32>,
    pub cold_expensive_hours: usize,
    pub precool_expected_in_hours: Option<u32>,

    pub current_hour: u32,
    pub data_quality: DataQuality,
    pub diagnostics: Vec<Diagnostic>,

    // Learning
    pub sessions_recorded: usize,
    pub recommendations: Vec<String>,
}

impl CycleOutput {
    pub fn has_diagnostic(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_is_tagged() {
        let diagnostic = Diagnostic::InsufficientHistory {
            span_hours: 24.0,
            required_hours: 71.0,
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["type"], "insufficient_history");
        assert_eq!(json["span_hours"], 24.0);
    }
}

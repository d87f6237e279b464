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

use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::session::MAX_SESSION_CAPACITY;
use crate::validation::ValidationResult;

// ============= Engine Configuration =============

/// Tuning constants of the decision engine.
///
/// Every coefficient is a product-tuning value rather than an algorithmic
/// contract, so all of them live here instead of in the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone used to map `now` onto wall-clock price hours
    pub timezone: String,
    pub pricing: PricingConfig,
    pub forecast: ForecastConfig,
    pub decision: DecisionConfig,
    pub output: OutputConfig,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_owned(),
            pricing: PricingConfig::default(),
            forecast: ForecastConfig::default(),
            decision: DecisionConfig::default(),
            output: OutputConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

/// Price classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Length of the rolling window
    pub window_hours: f64,
    /// Minimum span the window must cover to classify at all
    pub min_history_hours: f64,
    pub very_cheap_percentile: f64,
    pub cheap_percentile: f64,
    pub expensive_percentile: f64,
    pub very_expensive_percentile: f64,
    /// Cheap percentile drops by this per aggressiveness step
    pub cheap_shift_per_aggressiveness: f64,
    /// Expensive percentile drops by this per aggressiveness step
    pub expensive_shift_per_aggressiveness: f64,
    /// Hybrid: share of today's range a price must clear to stay expensive/cheap
    pub today_range_fraction: f64,
    /// Hybrid: multiple of the window mean above which a price is extreme
    pub extreme_multiplier: f64,
    /// Hybrid: prices below this are at least cheap
    pub absolute_cheap_limit: Option<f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            window_hours: 72.0,
            // Hourly samples at [now-72h, now-1h] span 71h
            min_history_hours: 71.0,
            very_cheap_percentile: 10.0,
            cheap_percentile: 25.0,
            expensive_percentile: 75.0,
            very_expensive_percentile: 90.0,
            cheap_shift_per_aggressiveness: 2.0,
            expensive_shift_per_aggressiveness: 3.0,
            today_range_fraction: 0.5,
            extreme_multiplier: 3.0,
            absolute_cheap_limit: None,
        }
    }
}

/// Forecast scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub max_hours: usize,
    /// Hours colder than target minus this count as cold
    pub cold_margin: f64,
    /// Upper bound on the cold threshold
    pub cold_hour_max_temp: f64,
    /// Price factor (%) an upcoming hour needs to count as expensive
    pub expensive_factor_base: f64,
    pub expensive_factor_per_aggressiveness: f64,
    pub expensive_factor_max: f64,
    /// Lead hours per inertia unit
    pub lead_time_factor: f64,
    pub min_lead_hours: f64,
    pub max_lead_hours: f64,
    pub precool_lookahead_hours: usize,
    /// Added to the summer threshold when looking for warm hours
    pub precool_margin: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_hours: 24,
            cold_margin: 2.0,
            cold_hour_max_temp: 10.0,
            expensive_factor_base: 60.0,
            expensive_factor_per_aggressiveness: 6.0,
            expensive_factor_max: 95.0,
            lead_time_factor: 0.75,
            min_lead_hours: 1.0,
            max_lead_hours: 6.0,
            precool_lookahead_hours: 24,
            precool_margin: 0.0,
        }
    }
}

/// Mode decision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Target clamp while holiday mode is active
    pub holiday_target: f64,
    /// Price braking allowed when indoor >= target - (base + per_step * aggressiveness)
    pub braking_margin_base: f64,
    pub braking_margin_per_aggressiveness: f64,
    /// Braking by temperature above target + this
    pub overheat_margin: f64,
    /// Heating below target - this
    pub heating_margin: f64,
    /// Preboost is pointless above this outdoor temperature
    pub preboost_max_outdoor_temp: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            holiday_target: 16.0,
            braking_margin_base: 0.5,
            braking_margin_per_aggressiveness: 0.2,
            overheat_margin: 0.5,
            heating_margin: 0.5,
            preboost_max_outdoor_temp: 10.0,
        }
    }
}

/// Virtual temperature calculator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emitted whenever heating should stop
    pub braking_temp: f64,
    pub min_virtual_temp: f64,
    pub max_virtual_temp: f64,

    pub heating_gain_base: f64,
    pub heating_gain_per_aggressiveness: f64,
    pub max_heating_offset: f64,
    /// Extra deficit assumed when the price is very cheap
    pub cheap_price_overshoot: f64,

    pub preboost_base_offset: f64,
    pub preboost_deficit_gain: f64,
    pub preboost_aggressiveness_gain: f64,
    pub preboost_inertia_base: f64,
    pub preboost_inertia_gain: f64,
    pub preboost_inertia_scale_max: f64,
    pub max_preboost_offset: f64,

    /// Integral correction in neutral mode
    pub integral_enabled: bool,
    pub integral_gain: f64,
    /// Anti-windup bound in degree-hours
    pub integral_limit: f64,
    pub max_neutral_correction: f64,
    /// Longest gap between cycles that still accumulates error
    pub max_integration_step_hours: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            braking_temp: 25.0,
            min_virtual_temp: -30.0,
            max_virtual_temp: 35.0,
            heating_gain_base: 0.5,
            heating_gain_per_aggressiveness: 0.2,
            max_heating_offset: 5.0,
            cheap_price_overshoot: 1.5,
            preboost_base_offset: 3.0,
            preboost_deficit_gain: 1.0,
            preboost_aggressiveness_gain: 0.1,
            preboost_inertia_base: 0.5,
            preboost_inertia_gain: 0.25,
            preboost_inertia_scale_max: 3.0,
            max_preboost_offset: 10.0,
            integral_enabled: false,
            integral_gain: 0.05,
            integral_limit: 10.0,
            max_neutral_correction: 0.5,
            max_integration_step_hours: 1.0,
        }
    }
}

/// Inertia estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub max_sessions: usize,
    pub max_trajectory_points: usize,
    /// Session succeeds once indoor reaches target - tolerance
    pub success_tolerance: f64,
    pub min_sessions_for_autotune: usize,
    pub recent_window: usize,
    /// Expected heating minutes per unit of inertia
    pub minutes_per_inertia_unit: f64,
    /// Share of the gap to the new estimate applied per session
    pub damping: f64,
    pub max_step: f64,
    pub inertia_min: f64,
    pub inertia_max: f64,

    // Recommendation thresholds
    pub min_sessions_for_analysis: usize,
    /// Fewer sessions than this triggers the "still learning" notice
    pub patience_sessions: usize,
    pub low_success_rate: f64,
    /// Below this, high aggressiveness is costing comfort
    pub balanced_success_rate: f64,
    pub high_success_rate: f64,
    pub high_aggressiveness: f64,
    pub low_aggressiveness: f64,
    pub aggressiveness_step: f64,
    pub low_inertia: f64,
    pub high_inertia: f64,
    pub long_session_minutes: f64,
    pub short_session_minutes: f64,
    /// Sessions shorter than this leave room for more savings
    pub quick_session_minutes: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            max_trajectory_points: 100,
            success_tolerance: 0.2,
            min_sessions_for_autotune: 3,
            recent_window: 10,
            minutes_per_inertia_unit: 60.0,
            damping: 0.3,
            max_step: 0.5,
            inertia_min: 0.5,
            inertia_max: 10.0,
            min_sessions_for_analysis: 3,
            patience_sessions: 10,
            low_success_rate: 60.0,
            balanced_success_rate: 70.0,
            high_success_rate: 85.0,
            high_aggressiveness: 4.0,
            low_aggressiveness: 2.0,
            aggressiveness_step: 1.0,
            low_inertia: 1.0,
            high_inertia: 3.0,
            long_session_minutes: 150.0,
            short_session_minutes: 20.0,
            quick_session_minutes: 45.0,
        }
    }
}

impl EngineConfig {
    /// Parsed timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {e}", self.timezone))
    }

    /// Parsed timezone, UTC when the name is not recognised
    pub fn tz_or_utc(&self) -> Tz {
        self.tz().unwrap_or(chrono_tz::UTC)
    }

    /// Check every section and report all issues at once
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        if self.tz().is_err() {
            result.add_error("timezone", format!("Unknown timezone '{}'", self.timezone));
        }

        let p = &self.pricing;
        result.check_range("pricing.window_hours", p.window_hours, 1.0, 24.0 * 14.0);
        result.check_range("pricing.min_history_hours", p.min_history_hours, 0.0, p.window_hours);
        result.check_range("pricing.very_cheap_percentile", p.very_cheap_percentile, 0.0, 100.0);
        result.check_range("pricing.cheap_percentile", p.cheap_percentile, 0.0, 100.0);
        result.check_range("pricing.expensive_percentile", p.expensive_percentile, 0.0, 100.0);
        result.check_range(
            "pricing.very_expensive_percentile",
            p.very_expensive_percentile,
            0.0,
            100.0,
        );
        result.check_ordered(
            "pricing.very_cheap_percentile",
            p.very_cheap_percentile,
            "pricing.cheap_percentile",
            p.cheap_percentile,
        );
        result.check_ordered(
            "pricing.cheap_percentile",
            p.cheap_percentile,
            "pricing.expensive_percentile",
            p.expensive_percentile,
        );
        result.check_ordered(
            "pricing.expensive_percentile",
            p.expensive_percentile,
            "pricing.very_expensive_percentile",
            p.very_expensive_percentile,
        );
        result.check_range("pricing.today_range_fraction", p.today_range_fraction, 0.0, 1.0);
        result.check_range("pricing.extreme_multiplier", p.extreme_multiplier, 1.0, 100.0);

        // At full aggressiveness the shifted percentiles must not cross their neighbours
        let cheap_at_max = p.cheap_percentile - 5.0 * p.cheap_shift_per_aggressiveness;
        let expensive_at_max = p.expensive_percentile - 5.0 * p.expensive_shift_per_aggressiveness;
        if cheap_at_max < p.very_cheap_percentile {
            result.add_warning(
                "pricing.cheap_shift_per_aggressiveness",
                format!("Cheap percentile falls to {cheap_at_max} at aggressiveness 5"),
            );
        }
        if expensive_at_max <= p.cheap_percentile {
            result.add_warning(
                "pricing.expensive_shift_per_aggressiveness",
                format!("Expensive percentile falls to {expensive_at_max} at aggressiveness 5"),
            );
        }

        let f = &self.forecast;
        if f.max_hours == 0 || f.max_hours > 48 {
            result.add_error("forecast.max_hours", "Must be between 1 and 48");
        }
        result.check_range("forecast.cold_margin", f.cold_margin, 0.0, 10.0);
        result.check_range(
            "forecast.expensive_factor_base",
            f.expensive_factor_base,
            0.0,
            100.0,
        );
        result.check_range("forecast.expensive_factor_max", f.expensive_factor_max, 0.0, 100.0);
        result.check_range("forecast.lead_time_factor", f.lead_time_factor, 0.0, 5.0);
        result.check_range("forecast.min_lead_hours", f.min_lead_hours, 1.0, 24.0);
        result.check_range("forecast.max_lead_hours", f.max_lead_hours, f.min_lead_hours, 24.0);
        if f.precool_margin > 5.0 {
            result.add_warning(
                "forecast.precool_margin",
                "Large margins make precool fire very rarely",
            );
        }

        let d = &self.decision;
        result.check_range("decision.holiday_target", d.holiday_target, 5.0, 25.0);
        result.check_range("decision.braking_margin_base", d.braking_margin_base, 0.0, 5.0);
        result.check_range("decision.overheat_margin", d.overheat_margin, 0.0, 5.0);
        result.check_range("decision.heating_margin", d.heating_margin, 0.0, 5.0);

        let o = &self.output;
        result.check_ordered(
            "output.min_virtual_temp",
            o.min_virtual_temp,
            "output.max_virtual_temp",
            o.max_virtual_temp,
        );
        result.check_range(
            "output.braking_temp",
            o.braking_temp,
            o.min_virtual_temp,
            o.max_virtual_temp,
        );
        result.check_range("output.max_heating_offset", o.max_heating_offset, 0.0, 20.0);
        result.check_range("output.max_preboost_offset", o.max_preboost_offset, 0.0, 20.0);
        result.check_range("output.integral_gain", o.integral_gain, 0.0, 1.0);
        result.check_range(
            "output.max_neutral_correction",
            o.max_neutral_correction,
            0.0,
            2.0,
        );

        let l = &self.learning;
        if l.max_sessions == 0 || l.max_sessions > MAX_SESSION_CAPACITY {
            result.add_error(
                "learning.max_sessions",
                format!("Must be between 1 and {MAX_SESSION_CAPACITY}"),
            );
        }
        if l.max_trajectory_points < 2 {
            result.add_error("learning.max_trajectory_points", "Must be at least 2");
        }
        if l.recent_window == 0 {
            result.add_error("learning.recent_window", "Must be at least 1");
        }
        result.check_range("learning.damping", l.damping, 0.0, 1.0);
        result.check_range("learning.max_step", l.max_step, 0.0, 10.0);
        result.check_ordered(
            "learning.inertia_min",
            l.inertia_min,
            "learning.inertia_max",
            l.inertia_max,
        );
        if l.minutes_per_inertia_unit <= 0.0 {
            result.add_error("learning.minutes_per_inertia_unit", "Must be positive");
        }

        result
    }

    /// Fail on the first validation error
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_detailed();
        if let Some(issue) = result.errors.first() {
            anyhow::bail!("Invalid configuration: {issue}");
        }
        Ok(())
    }
}

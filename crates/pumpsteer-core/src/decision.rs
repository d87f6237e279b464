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

//! Mode decision engine
//!
//! Rules are evaluated strictly in priority order and the first match wins:
//!
//! 1. `summer_mode`: outdoor at or above the summer threshold
//! 2. `precool`: a forecast hour above the summer threshold is coming
//! 3. holiday: clamps the target, then evaluation continues
//! 4. `braking_mode`: expensive hour and no urgent heating need
//! 5. `braking_by_temp`: indoor already above target
//! 6. `preboost`: cheap now, cold and expensive soon
//! 7. `heating`: indoor below target
//! 8. `neutral`

use chrono::{DateTime, Utc};
use pumpsteer_types::{DecisionConfig, OperatingMode, PriceCategory};
use serde::{Deserialize, Serialize};

use crate::forecast::ForecastScan;

/// Holiday applies when the flag is on and `now` lies in the inclusive window.
/// An open-ended side of the window is unbounded.
pub fn is_holiday_active(
    holiday_mode: bool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    holiday_mode && start.is_none_or(|s| now >= s) && end.is_none_or(|e| now <= e)
}

/// Everything one decision looks at
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub indoor_temp: f64,
    pub target_temp: f64,
    pub real_outdoor_temp: f64,
    pub summer_threshold: f64,
    pub aggressiveness: f64,
    pub price_category: PriceCategory,
    pub holiday_active: bool,
    pub preboost_enabled: bool,
    /// None when the forecast was absent or malformed
    pub scan: Option<&'a ForecastScan>,
}

/// Outcome of one decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub mode: OperatingMode,
    /// Target after the holiday clamp
    pub effective_target: f64,
    pub holiday_active: bool,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ModeEngine<'a> {
    config: &'a DecisionConfig,
}

impl<'a> ModeEngine<'a> {
    pub fn new(config: &'a DecisionConfig) -> Self {
        Self { config }
    }

    /// How far below target price braking is still allowed
    pub fn braking_margin(&self, aggressiveness: f64) -> f64 {
        self.config.braking_margin_base
            + self.config.braking_margin_per_aggressiveness * aggressiveness.clamp(0.0, 5.0)
    }

    pub fn decide(&self, ctx: &DecisionContext<'_>) -> Decision {
        let c = self.config;
        let decided = |mode: OperatingMode, target: f64, detail: String| Decision {
            mode,
            effective_target: target,
            holiday_active: ctx.holiday_active,
            reason: format!("{mode} - Triggered by {}: {detail}", mode.trigger()),
        };

        if ctx.real_outdoor_temp >= ctx.summer_threshold {
            return decided(
                OperatingMode::SummerMode,
                ctx.target_temp,
                format!(
                    "outdoor {:.1}°C >= summer threshold {:.1}°C",
                    ctx.real_outdoor_temp, ctx.summer_threshold
                ),
            );
        }

        if let Some(hours) = ctx.scan.and_then(|s| s.precool_in_hours) {
            return decided(
                OperatingMode::Precool,
                ctx.target_temp,
                format!("forecast exceeds {:.1}°C in {hours}h", ctx.summer_threshold),
            );
        }

        let target = if ctx.holiday_active {
            ctx.target_temp.min(c.holiday_target)
        } else {
            ctx.target_temp
        };
        let indoor = ctx.indoor_temp;

        // Aggressiveness 0 disables all money-saving logic
        if ctx.aggressiveness > 0.0
            && ctx.price_category.is_expensive()
            && indoor >= target - self.braking_margin(ctx.aggressiveness)
        {
            return decided(
                OperatingMode::BrakingMode,
                target,
                format!(
                    "{} price, indoor {indoor:.1}°C close enough to target {target:.1}°C",
                    ctx.price_category
                ),
            );
        }

        if indoor > target + c.overheat_margin {
            return decided(
                OperatingMode::BrakingByTemp,
                target,
                format!("indoor {indoor:.1}°C above target {target:.1}°C"),
            );
        }

        let boost_scan = ctx.scan.filter(|s| {
            s.preboost_opportunity
                && ctx.preboost_enabled
                && ctx.real_outdoor_temp < c.preboost_max_outdoor_temp
                && ctx.price_category.is_cheap()
        });
        if let Some(scan) = boost_scan {
            return decided(
                OperatingMode::Preboost,
                target,
                format!(
                    "{} price now, {} cold and expensive hour(s) ahead",
                    ctx.price_category,
                    scan.cold_expensive_count()
                ),
            );
        }

        if indoor < target - c.heating_margin {
            return decided(
                OperatingMode::Heating,
                target,
                format!("indoor {indoor:.1}°C below target {target:.1}°C"),
            );
        }

        decided(
            OperatingMode::Neutral,
            target,
            format!("indoor {indoor:.1}°C near target {target:.1}°C"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx<'a>(indoor: f64, target: f64, outdoor: f64, category: PriceCategory) -> DecisionContext<'a> {
        DecisionContext {
            indoor_temp: indoor,
            target_temp: target,
            real_outdoor_temp: outdoor,
            summer_threshold: 18.0,
            aggressiveness: 3.0,
            price_category: category,
            holiday_active: false,
            preboost_enabled: true,
            scan: None,
        }
    }

    #[test]
    fn test_holiday_window_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 8, 0, 0, 0).unwrap();

        assert!(is_holiday_active(true, Some(start), Some(end), start));
        assert!(is_holiday_active(true, Some(start), Some(end), end));
        assert!(!is_holiday_active(true, Some(start), Some(end), end + chrono::Duration::seconds(1)));
        assert!(!is_holiday_active(false, Some(start), Some(end), start));
        assert!(is_holiday_active(true, None, None, start));
    }

    #[test]
    fn test_summer_beats_everything() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);
        let mut context = ctx(15.0, 21.0, 18.0, PriceCategory::Extreme);
        context.holiday_active = true;

        let decision = engine.decide(&context);
        assert_eq!(decision.mode, OperatingMode::SummerMode);
        assert!(decision.reason.starts_with("summer_mode - Triggered by summer"));
    }

    #[test]
    fn test_precool_before_braking() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);
        let scan = ForecastScan {
            precool_in_hours: Some(4),
            ..ForecastScan::default()
        };
        let mut context = ctx(21.0, 21.0, 12.0, PriceCategory::Expensive);
        context.scan = Some(&scan);

        assert_eq!(engine.decide(&context).mode, OperatingMode::Precool);
    }

    #[test]
    fn test_price_braking_needs_aggressiveness() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);

        let context = ctx(20.0, 21.0, 2.0, PriceCategory::Expensive);
        assert_eq!(engine.decide(&context).mode, OperatingMode::BrakingMode);

        let passthrough = DecisionContext {
            aggressiveness: 0.0,
            ..context
        };
        assert_eq!(engine.decide(&passthrough).mode, OperatingMode::Heating);
    }

    #[test]
    fn test_cold_house_not_braked_on_price() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);

        // Margin at aggressiveness 3 is 1.1
        let context = ctx(19.0, 21.0, 2.0, PriceCategory::VeryExpensive);
        assert_eq!(engine.decide(&context).mode, OperatingMode::Heating);
    }

    #[test]
    fn test_overheat_brakes_regardless_of_price() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);

        let context = ctx(22.0, 21.0, 2.0, PriceCategory::VeryCheap);
        assert_eq!(engine.decide(&context).mode, OperatingMode::BrakingByTemp);
    }

    #[test]
    fn test_preboost_requires_cheap_price_and_opportunity() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);
        let scan = ForecastScan {
            preboost_opportunity: true,
            cold_expensive_offsets: vec![2],
            ..ForecastScan::default()
        };

        let mut context = ctx(21.0, 21.0, 0.0, PriceCategory::Cheap);
        context.scan = Some(&scan);
        assert_eq!(engine.decide(&context).mode, OperatingMode::Preboost);

        context.price_category = PriceCategory::Normal;
        assert_eq!(engine.decide(&context).mode, OperatingMode::Neutral);

        context.price_category = PriceCategory::Cheap;
        context.preboost_enabled = false;
        assert_eq!(engine.decide(&context).mode, OperatingMode::Neutral);

        context.preboost_enabled = true;
        context.real_outdoor_temp = 12.0;
        assert_eq!(engine.decide(&context).mode, OperatingMode::Neutral);
    }

    #[test]
    fn test_holiday_clamps_target() {
        let config = DecisionConfig::default();
        let engine = ModeEngine::new(&config);
        let mut context = ctx(18.0, 21.0, 5.0, PriceCategory::Normal);

        assert_eq!(engine.decide(&context).mode, OperatingMode::Heating);

        context.holiday_active = true;
        let decision = engine.decide(&context);
        assert!((decision.effective_target - 16.0).abs() < f64::EPSILON);
        assert_eq!(decision.mode, OperatingMode::BrakingByTemp);
    }
}

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

//! Outdoor temperature forecast parsing and look-ahead scanning
//!
//! The scanner looks for upcoming hours that are both cold and expensive
//! (a reason to preboost now, while it is cheap) and for the first warm hour
//! above the summer threshold (a reason to precool). How far ahead a preboost
//! may start is the lead time, which grows with house inertia.

use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;
use pumpsteer_types::{ForecastConfig, ForecastInput, PriceClassification};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, ForecastResult};

// ============= Parsing =============

/// Validated hourly outdoor forecast; entry 0 is the current hour
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureForecast {
    hours: Vec<f64>,
}

impl TemperatureForecast {
    /// Parse comma-separated values, skipping empty entries
    pub fn parse_csv(text: &str, max_hours: usize) -> ForecastResult<Self> {
        let entries: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        check_count(entries.len(), max_hours)?;

        let hours = entries
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.parse::<f64>()
                    .map_err(|_| ForecastError::InvalidValue {
                        index,
                        raw: (*raw).to_owned(),
                    })
            })
            .collect::<ForecastResult<Vec<f64>>>()?;

        Self::from_values(&hours, max_hours)
    }

    pub fn from_values(values: &[f64], max_hours: usize) -> ForecastResult<Self> {
        check_count(values.len(), max_hours)?;
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::NonFinite { index });
        }
        Ok(Self {
            hours: values.to_vec(),
        })
    }

    pub fn from_input(input: &ForecastInput, max_hours: usize) -> ForecastResult<Self> {
        match input {
            ForecastInput::Csv(text) => Self::parse_csv(text, max_hours),
            ForecastInput::Values(values) => Self::from_values(values, max_hours),
        }
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Forecast for `offset` hours from now
    pub fn at(&self, offset: usize) -> Option<f64> {
        self.hours.get(offset).copied()
    }

    pub fn hours(&self) -> &[f64] {
        &self.hours
    }
}

fn check_count(count: usize, max: usize) -> ForecastResult<()> {
    if count == 0 {
        return Err(ForecastError::Empty);
    }
    if count > max {
        return Err(ForecastError::TooManyHours { count, max });
    }
    Ok(())
}

// ============= Scanning =============

/// Live values the scanner needs
#[derive(Debug, Clone, Copy)]
pub struct ScanContext {
    /// Evaluation time in the price timezone
    pub now: DateTime<Tz>,
    pub target_temp: f64,
    pub summer_threshold: f64,
    pub aggressiveness: f64,
    pub inertia: f64,
}

/// What the forecast says about the coming hours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastScan {
    /// How many hours ahead of a cold and expensive hour preboost may start
    pub lead_hours: u32,
    pub cold_threshold: f64,
    /// Price factor (%) from which an upcoming hour counts as expensive
    pub expensive_factor_threshold: f64,

    /// Offsets (hours from now) that are both cold and expensive
    pub cold_expensive_offsets: Vec<u32>,

    /// Hours until preboost should start for the first cold and expensive hour
    pub preboost_expected_in_hours: Option<u32>,
    /// Wall-clock hour at which that preboost would start
    pub first_preboost_hour: Option<u32>,

    /// First cold and expensive hour lies within the lead time
    pub preboost_opportunity: bool,

    /// Hours until the first forecast hour above the summer threshold
    pub precool_in_hours: Option<u32>,
}

impl ForecastScan {
    pub fn cold_expensive_count(&self) -> usize {
        self.cold_expensive_offsets.len()
    }
}

#[derive(Debug, Clone)]
pub struct ForecastScanner<'a> {
    config: &'a ForecastConfig,
}

impl<'a> ForecastScanner<'a> {
    pub fn new(config: &'a ForecastConfig) -> Self {
        Self { config }
    }

    /// Lead time in whole hours for the given inertia
    pub fn lead_hours(&self, inertia: f64) -> u32 {
        let c = self.config;
        (inertia.max(0.0) * c.lead_time_factor)
            .clamp(c.min_lead_hours, c.max_lead_hours)
            .round() as u32
    }

    /// Price factor an upcoming hour needs to count as expensive
    pub fn expensive_factor_threshold(&self, aggressiveness: f64) -> f64 {
        let c = self.config;
        (c.expensive_factor_base + c.expensive_factor_per_aggressiveness * aggressiveness.clamp(0.0, 5.0))
            .min(c.expensive_factor_max)
    }

    pub fn cold_threshold(&self, target_temp: f64) -> f64 {
        (target_temp - self.config.cold_margin).min(self.config.cold_hour_max_temp)
    }

    pub fn scan(
        &self,
        forecast: &TemperatureForecast,
        prices: &PriceClassification,
        ctx: &ScanContext,
    ) -> ForecastScan {
        let lead_hours = self.lead_hours(ctx.inertia);
        let cold_threshold = self.cold_threshold(ctx.target_temp);
        let expensive_factor_threshold = self.expensive_factor_threshold(ctx.aggressiveness);
        let now_index = ctx.now.hour() as usize;

        let mut scan = ForecastScan {
            lead_hours,
            cold_threshold,
            expensive_factor_threshold,
            precool_in_hours: self.find_precool(forecast, ctx.summer_threshold),
            ..ForecastScan::default()
        };

        let Some(current) = forecast.at(0) else {
            return scan;
        };
        if forecast.len() <= lead_hours as usize {
            debug!(
                "Forecast covers {}h, preboost needs more than {}h lead",
                forecast.len(),
                lead_hours
            );
            return scan;
        }
        if forecast.hours().iter().skip(1).all(|t| *t >= current) {
            debug!("No upcoming hour colder than now ({current:.1}°C), skipping preboost");
            return scan;
        }

        scan.cold_expensive_offsets = (1..forecast.len())
            .filter(|&offset| {
                let cold = forecast.at(offset).is_some_and(|t| t < cold_threshold);
                let expensive = prices
                    .factor_at(now_index + offset)
                    .is_some_and(|f| f >= expensive_factor_threshold);
                cold && expensive
            })
            .map(|offset| offset as u32)
            .collect();

        if let Some(&first) = scan.cold_expensive_offsets.first() {
            let start_in = first.saturating_sub(lead_hours);
            scan.preboost_expected_in_hours = Some(start_in);
            scan.first_preboost_hour = Some((ctx.now + Duration::hours(i64::from(start_in))).hour());
            scan.preboost_opportunity = first <= lead_hours;

            debug!(
                "Cold and expensive hour in {first}h (lead {lead_hours}h, threshold {cold_threshold:.1}°C / {expensive_factor_threshold:.0}%), opportunity: {}",
                scan.preboost_opportunity
            );
        }

        scan
    }

    fn find_precool(&self, forecast: &TemperatureForecast, summer_threshold: f64) -> Option<u32> {
        let warm_limit = summer_threshold + self.config.precool_margin;
        let last = self.config.precool_lookahead_hours.min(forecast.len().saturating_sub(1));
        (1..=last)
            .find(|&offset| forecast.at(offset).is_some_and(|t| t > warm_limit))
            .map(|offset| offset as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pumpsteer_types::PriceCategory;

    fn ctx(hour: u32, inertia: f64, aggressiveness: f64) -> ScanContext {
        ScanContext {
            now: chrono_tz::UTC.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap(),
            target_temp: 21.0,
            summer_threshold: 18.0,
            aggressiveness,
            inertia,
        }
    }

    /// Flat factors with a single peak at `peak_hour`
    fn prices_with_peak(peak_hour: usize) -> PriceClassification {
        let mut factors = vec![20.0; 24];
        factors[peak_hour] = 100.0;
        PriceClassification {
            categories: vec![PriceCategory::Normal; 24],
            factors,
            ..PriceClassification::default()
        }
    }

    #[test]
    fn test_parse_csv_skips_empty_entries() {
        let forecast = TemperatureForecast::parse_csv(" 1.5, ,-2,3.25,", 24).unwrap();
        assert_eq!(forecast.hours(), &[1.5, -2.0, 3.25]);
    }

    #[test]
    fn test_parse_csv_rejects_bad_input() {
        assert_eq!(
            TemperatureForecast::parse_csv("", 24),
            Err(ForecastError::Empty)
        );
        assert_eq!(
            TemperatureForecast::parse_csv("1.0,warm", 24),
            Err(ForecastError::InvalidValue {
                index: 1,
                raw: "warm".to_owned()
            })
        );
        assert_eq!(
            TemperatureForecast::parse_csv("1.0,NaN", 24),
            Err(ForecastError::NonFinite { index: 1 })
        );

        let thirty = vec!["1.0"; 30].join(",");
        assert_eq!(
            TemperatureForecast::parse_csv(&thirty, 24),
            Err(ForecastError::TooManyHours { count: 30, max: 24 })
        );
    }

    #[test]
    fn test_lead_hours_grow_with_inertia() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        assert_eq!(scanner.lead_hours(0.0), 1);
        assert_eq!(scanner.lead_hours(2.0), 2);
        assert_eq!(scanner.lead_hours(4.0), 3);
        assert_eq!(scanner.lead_hours(10.0), 6);
    }

    #[test]
    fn test_preboost_opportunity_within_lead_time() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast = TemperatureForecast::from_values(&[2.0, 1.0, -3.0, -4.0, -4.0], 24).unwrap();

        // Peak at 10:00, now 08:00, cold (-3 < 10) at offset 2
        let scan = scanner.scan(&forecast, &prices_with_peak(10), &ctx(8, 4.0, 0.0));
        assert_eq!(scan.lead_hours, 3);
        assert_eq!(scan.cold_expensive_offsets, vec![2]);
        assert!(scan.preboost_opportunity);
        assert_eq!(scan.preboost_expected_in_hours, Some(0));
        assert_eq!(scan.first_preboost_hour, Some(8));
    }

    #[test]
    fn test_preboost_too_early_for_low_inertia() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast =
            TemperatureForecast::from_values(&[2.0, 1.0, 0.0, -1.0, -3.0, -4.0], 24).unwrap();

        let scan = scanner.scan(&forecast, &prices_with_peak(12), &ctx(8, 1.0, 0.0));
        assert_eq!(scan.lead_hours, 1);
        assert_eq!(scan.cold_expensive_offsets, vec![4]);
        assert!(!scan.preboost_opportunity);
        assert_eq!(scan.preboost_expected_in_hours, Some(3));
        assert_eq!(scan.first_preboost_hour, Some(11));
    }

    #[test]
    fn test_no_preboost_when_warming() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast = TemperatureForecast::from_values(&[-5.0, -4.0, -3.0, -2.0], 24).unwrap();

        let scan = scanner.scan(&forecast, &prices_with_peak(9), &ctx(8, 2.0, 0.0));
        assert!(scan.cold_expensive_offsets.is_empty());
        assert!(!scan.preboost_opportunity);
    }

    #[test]
    fn test_short_forecast_gives_no_opportunity() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast = TemperatureForecast::from_values(&[2.0, -3.0], 24).unwrap();

        // inertia 4 needs 3h lead, forecast has only 2 entries
        let scan = scanner.scan(&forecast, &prices_with_peak(9), &ctx(8, 4.0, 0.0));
        assert!(!scan.preboost_opportunity);
        assert!(scan.cold_expensive_offsets.is_empty());
    }

    #[test]
    fn test_higher_aggressiveness_demands_sharper_peak() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast = TemperatureForecast::from_values(&[2.0, -3.0, -3.0], 24).unwrap();
        let mut prices = prices_with_peak(9);
        prices.factors[9] = 70.0;

        assert!(scanner.scan(&forecast, &prices, &ctx(8, 2.0, 0.0)).preboost_opportunity);
        assert!(!scanner.scan(&forecast, &prices, &ctx(8, 2.0, 5.0)).preboost_opportunity);
    }

    #[test]
    fn test_precool_finds_first_warm_hour() {
        let config = ForecastConfig::default();
        let scanner = ForecastScanner::new(&config);
        let forecast =
            TemperatureForecast::from_values(&[15.0, 17.0, 18.0, 19.5, 21.0], 24).unwrap();

        let scan = scanner.scan(&forecast, &prices_with_peak(9), &ctx(8, 2.0, 3.0));
        assert_eq!(scan.precool_in_hours, Some(3));
    }
}

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

//! Price classification over a rolling window
//!
//! Every known hourly price is ranked against the distribution of the last
//! 72 hours of observed prices. Two models are supported:
//!
//! - `percentiles`: pure percentile rank within the window.
//! - `hybrid`: percentile rank, but an hour only stays expensive (or cheap)
//!   when it also stands out within its own day's range. Flat days therefore
//!   classify as normal. Prices far above the window mean become `extreme`.
//!
//! Aggressiveness lowers both the cheap and the expensive percentile, so the
//! expensive band widens and the cheap band narrows as it grows.

use chrono::{DateTime, Duration, Utc};
use pumpsteer_types::{
    PriceCategory, PriceClassification, PriceModel, PricePoint, PriceThresholds, PricingConfig,
};
use tracing::{debug, warn};

const FLAT_RANGE_EPSILON: f64 = 1e-9;

/// Linearly interpolated percentile (0-100) of `values`
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Position of `price` between `min` and `max` in percent, 0 for a flat range
pub fn price_factor(price: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range <= FLAT_RANGE_EPSILON || !price.is_finite() {
        return 0.0;
    }
    ((price - min) / range * 100.0).clamp(0.0, 100.0)
}

/// Prices the classifier looks at in one cycle
#[derive(Debug, Clone, Copy)]
pub struct PriceInputs<'a> {
    pub now: DateTime<Utc>,
    pub history: &'a [PricePoint],
    pub today: &'a [f64],
    pub tomorrow: &'a [f64],
    pub price_now: f64,
}

#[derive(Debug, Clone, Copy)]
struct DayRange {
    min: f64,
    max: f64,
}

impl DayRange {
    fn of(prices: &[f64]) -> Option<Self> {
        let finite = prices.iter().copied().filter(|p| p.is_finite());
        let (min, max) = finite.fold(None, |acc: Option<(f64, f64)>, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })?;
        Some(Self { min, max })
    }

    fn range(self) -> f64 {
        self.max - self.min
    }
}

/// Classifies hourly prices for one cycle
#[derive(Debug, Clone)]
pub struct PriceClassifier<'a> {
    config: &'a PricingConfig,
}

impl<'a> PriceClassifier<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    /// Samples inside `[now - window, now]`, oldest first
    fn window<'p>(&self, history: &'p [PricePoint], now: DateTime<Utc>) -> Vec<&'p PricePoint> {
        let window_start = now - Duration::minutes((self.config.window_hours * 60.0) as i64);
        let mut window: Vec<&PricePoint> = history
            .iter()
            .filter(|p| p.timestamp >= window_start && p.timestamp <= now && p.price.is_finite())
            .collect();
        window.sort_by_key(|p| p.timestamp);
        window
    }

    /// Percentile thresholds for the given aggressiveness
    pub fn thresholds(&self, window_prices: &[f64], aggressiveness: f64) -> Option<PriceThresholds> {
        let c = self.config;
        let aggressiveness = aggressiveness.clamp(0.0, 5.0);

        let cheap_pct = (c.cheap_percentile - c.cheap_shift_per_aggressiveness * aggressiveness)
            .max(c.very_cheap_percentile);
        let expensive_pct = (c.expensive_percentile
            - c.expensive_shift_per_aggressiveness * aggressiveness)
            .clamp(cheap_pct, c.very_expensive_percentile);

        Some(PriceThresholds {
            very_cheap: percentile(window_prices, c.very_cheap_percentile)?,
            cheap: percentile(window_prices, cheap_pct)?,
            expensive: percentile(window_prices, expensive_pct)?,
            very_expensive: percentile(window_prices, c.very_expensive_percentile)?,
            extreme: None,
        })
    }

    /// Classify every known hour plus the current price
    pub fn classify(
        &self,
        prices: PriceInputs<'_>,
        aggressiveness: f64,
        model: PriceModel,
    ) -> PriceClassification {
        let window = self.window(prices.history, prices.now);
        let window_prices: Vec<f64> = window.iter().map(|p| p.price).collect();
        let span_hours = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_minutes() as f64 / 60.0,
            _ => 0.0,
        };
        let sufficient = span_hours >= self.config.min_history_hours;

        let known: Vec<f64> = prices.today.iter().chain(prices.tomorrow).copied().collect();

        // Window bounds, falling back to the known prices when the window is empty
        let bounds = DayRange::of(&window_prices)
            .or_else(|| DayRange::of(&known))
            .or_else(|| DayRange::of(&[prices.price_now]))
            .unwrap_or(DayRange { min: 0.0, max: 0.0 });
        let mean_source = if window_prices.is_empty() { &known } else { &window_prices };
        let mean_price = if mean_source.is_empty() {
            0.0
        } else {
            mean_source.iter().sum::<f64>() / mean_source.len() as f64
        };

        let factors: Vec<f64> = known
            .iter()
            .map(|p| round1(price_factor(*p, bounds.min, bounds.max)))
            .collect();
        let current_factor = round1(price_factor(prices.price_now, bounds.min, bounds.max));

        let mut classification = PriceClassification {
            categories: vec![PriceCategory::Normal; known.len()],
            factors,
            current_category: PriceCategory::Normal,
            current_factor,
            min_price: bounds.min,
            max_price: bounds.max,
            mean_price,
            thresholds: None,
            history_span_hours: span_hours,
            sufficient_history: sufficient,
        };

        if !sufficient {
            warn!(
                "Only {:.1}h of price history (need {:.0}h), classifying all hours as normal",
                span_hours, self.config.min_history_hours
            );
            return classification;
        }

        let Some(mut thresholds) = self.thresholds(&window_prices, aggressiveness) else {
            return classification;
        };
        if model == PriceModel::Hybrid && mean_price > 0.0 {
            thresholds.extreme = Some(mean_price * self.config.extreme_multiplier);
        }

        debug!(
            "Price thresholds ({:?}, aggressiveness {:.1}): very_cheap<{:.3} cheap<{:.3} expensive>{:.3} very_expensive>{:.3}",
            model,
            aggressiveness,
            thresholds.very_cheap,
            thresholds.cheap,
            thresholds.expensive,
            thresholds.very_expensive
        );

        let today_range = DayRange::of(prices.today);
        let tomorrow_range = DayRange::of(prices.tomorrow);

        let mut categories = Vec::with_capacity(known.len());
        for &price in prices.today {
            categories.push(self.categorize(price, &thresholds, model, today_range));
        }
        for &price in prices.tomorrow {
            categories.push(self.categorize(price, &thresholds, model, tomorrow_range));
        }

        classification.current_category = self.categorize(
            prices.price_now,
            &thresholds,
            model,
            today_range.or(Some(bounds)),
        );
        classification.categories = categories;
        classification.thresholds = Some(thresholds);
        classification
    }

    fn categorize(
        &self,
        price: f64,
        thresholds: &PriceThresholds,
        model: PriceModel,
        day: Option<DayRange>,
    ) -> PriceCategory {
        if !price.is_finite() {
            return PriceCategory::Normal;
        }
        if price < 0.0 {
            return PriceCategory::VeryCheap;
        }

        let bucket = percentile_bucket(price, thresholds);
        match model {
            PriceModel::Percentiles => bucket,
            PriceModel::Hybrid => self.refine_hybrid(bucket, price, thresholds, day),
        }
    }

    fn refine_hybrid(
        &self,
        bucket: PriceCategory,
        price: f64,
        thresholds: &PriceThresholds,
        day: Option<DayRange>,
    ) -> PriceCategory {
        if thresholds.extreme.is_some_and(|limit| price > limit) {
            return PriceCategory::Extreme;
        }

        let fraction = self.config.today_range_fraction;
        let stands_out = |high: bool| {
            day.is_some_and(|d| {
                let beyond_fraction = if high {
                    price >= d.min + fraction * d.range()
                } else {
                    price <= d.max - fraction * d.range()
                };
                d.range() > FLAT_RANGE_EPSILON && beyond_fraction
            })
        };

        let demote = (bucket.is_expensive() && !stands_out(true))
            || (bucket.is_cheap() && !stands_out(false));
        let category = if demote { PriceCategory::Normal } else { bucket };

        match self.config.absolute_cheap_limit {
            Some(limit) if category == PriceCategory::Normal && price < limit => PriceCategory::Cheap,
            _ => category,
        }
    }
}

fn percentile_bucket(price: f64, t: &PriceThresholds) -> PriceCategory {
    if price < t.very_cheap {
        PriceCategory::VeryCheap
    } else if price < t.cheap {
        PriceCategory::Cheap
    } else if price > t.very_expensive {
        PriceCategory::VeryExpensive
    } else if price > t.expensive {
        PriceCategory::Expensive
    } else {
        PriceCategory::Normal
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

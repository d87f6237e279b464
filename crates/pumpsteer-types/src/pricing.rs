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
use std::fmt;

// ============= Price Data =============

/// A single observed electricity price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Start of the hour this price applies to
    pub timestamp: DateTime<Utc>,

    /// Price in currency/kWh
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Classification model selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceModel {
    /// Percentile rank in the rolling window, confirmed against today's own range
    #[default]
    Hybrid,
    /// Pure percentile rank within the rolling window
    Percentiles,
}

/// Category of one hour's price relative to the rolling window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCategory {
    VeryCheap,
    Cheap,
    #[default]
    Normal,
    Expensive,
    VeryExpensive,
    Extreme,
}

impl PriceCategory {
    /// Cheap enough to justify extra heating
    pub fn is_cheap(self) -> bool {
        matches!(self, Self::VeryCheap | Self::Cheap)
    }

    /// Expensive enough to justify braking
    pub fn is_expensive(self) -> bool {
        matches!(self, Self::Expensive | Self::VeryExpensive | Self::Extreme)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryCheap => "very_cheap",
            Self::Cheap => "cheap",
            Self::Normal => "normal",
            Self::Expensive => "expensive",
            Self::VeryExpensive => "very_expensive",
            Self::Extreme => "extreme",
        }
    }
}

impl fmt::Display for PriceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price levels that separate the categories for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceThresholds {
    pub very_cheap: f64,
    pub cheap: f64,
    pub expensive: f64,
    pub very_expensive: f64,
    /// Prices above this are extreme (hybrid model only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extreme: Option<f64>,
}

/// Result of classifying the rolling window and the known hourly prices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceClassification {
    /// Category per known hour, indexed from today's local midnight
    pub categories: Vec<PriceCategory>,

    /// Price factor (0-100%) per known hour
    pub factors: Vec<f64>,

    /// Category of the current price
    pub current_category: PriceCategory,

    /// Price factor of the current price
    pub current_factor: f64,

    pub min_price: f64,
    pub max_price: f64,
    pub mean_price: f64,

    /// None when history was insufficient and everything fell back to normal
    pub thresholds: Option<PriceThresholds>,

    /// Span covered by the rolling window in hours
    pub history_span_hours: f64,

    /// Whether the rolling window covered enough history to classify
    pub sufficient_history: bool,
}

impl PriceClassification {
    /// Price factor for an hour index counted from today's midnight
    pub fn factor_at(&self, hour_index: usize) -> Option<f64> {
        self.factors.get(hour_index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_groups() {
        assert!(PriceCategory::VeryCheap.is_cheap());
        assert!(PriceCategory::Cheap.is_cheap());
        assert!(!PriceCategory::Normal.is_cheap());
        assert!(!PriceCategory::Normal.is_expensive());
        assert!(PriceCategory::Expensive.is_expensive());
        assert!(PriceCategory::VeryExpensive.is_expensive());
        assert!(PriceCategory::Extreme.is_expensive());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&PriceCategory::VeryExpensive).unwrap();
        assert_eq!(json, "\"very_expensive\"");
        let model: PriceModel = serde_json::from_str("\"percentiles\"").unwrap();
        assert_eq!(model, PriceModel::Percentiles);
    }
}

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

pub mod decision;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod learning;
pub mod persistence;
pub mod pricing;
pub mod virtual_temp;

pub use decision::{Decision, DecisionContext, ModeEngine, is_holiday_active};
pub use engine::{CycleOutcome, Engine, LearningInsights};
pub use error::{ForecastError, StateError};
pub use forecast::{ForecastScan, ForecastScanner, ScanContext, TemperatureForecast};
pub use learning::{InertiaEstimator, Observation, SessionTransition};
pub use persistence::{LoadedState, StatePersistence, decode_state, restore_state};
pub use pricing::{PriceClassifier, PriceInputs, percentile, price_factor};
pub use virtual_temp::{VirtualTemp, VirtualTempCalculator, VirtualTempInput};

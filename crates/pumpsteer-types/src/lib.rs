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

pub mod config;
pub mod input;
pub mod mode;
pub mod output;
pub mod pricing;
pub mod session;
pub mod state;
pub mod validation;

// Re-export common types for convenience
pub use config::{
    DecisionConfig, EngineConfig, ForecastConfig, LearningConfig, OutputConfig, PricingConfig,
};
pub use input::{CycleInput, ForecastInput};
pub use mode::OperatingMode;
pub use output::{CycleOutput, CycleStatus, DataQuality, Diagnostic};
pub use pricing::{PriceCategory, PriceClassification, PriceModel, PricePoint, PriceThresholds};
pub use session::{
    ActiveSession, HeatingSession, MAX_SESSION_CAPACITY, PerformanceSummary, SessionHistory,
    TrajectoryPoint,
};
pub use state::{AdaptiveState, ControllerState, EngineState, STATE_VERSION};
pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};

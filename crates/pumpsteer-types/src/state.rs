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
use crate::session::{ActiveSession, SessionHistory};

/// Current persisted state layout
pub const STATE_VERSION: u32 = 1;

/// Learned thermal inertia. Written only by the inertia estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveState {
    /// Current auto-tuned inertia estimate
    pub house_inertia: f64,

    /// When the estimate last changed; None until the first adjustment
    pub last_updated: Option<DateTime<Utc>>,

    pub autotune_enabled: bool,

    /// Number of adjustments applied so far
    pub adjustments: u32,
}

impl Default for AdaptiveState {
    fn default() -> Self {
        Self {
            house_inertia: 2.0,
            last_updated: None,
            autotune_enabled: false,
            adjustments: 0,
        }
    }
}

/// Values carried from one cycle to the next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerState {
    pub last_mode: Option<OperatingMode>,

    /// Held and re-reported when a cycle lacks input
    pub last_virtual_temp: Option<f64>,

    /// Accumulated (target - indoor) in degree-hours
    pub temp_error_integral: f64,

    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Everything that survives between cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineState {
    pub version: u32,
    pub adaptive: AdaptiveState,
    pub sessions: SessionHistory,
    pub active_session: Option<ActiveSession>,
    pub controller: ControllerState,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            adaptive: AdaptiveState::default(),
            sessions: SessionHistory::default(),
            active_session: None,
            controller: ControllerState::default(),
        }
    }
}

impl EngineState {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

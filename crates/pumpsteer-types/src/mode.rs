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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete operating mode chosen once per evaluation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Indoor below target, ask for more heat
    Heating,
    /// Pass the real outdoor temperature through
    #[default]
    Neutral,
    /// Indoor already above target
    BrakingByTemp,
    /// Expensive hour and no urgent heating need
    BrakingMode,
    /// Pre-heat ahead of a cold and expensive period
    Preboost,
    /// Suspend heating ahead of a warm period
    Precool,
    /// Outdoor at or above the summer threshold
    SummerMode,
}

impl OperatingMode {
    /// Modes during which a heating session is open
    pub fn is_heating_like(self) -> bool {
        matches!(self, Self::Heating | Self::Preboost)
    }

    /// What caused this mode, used in the decision rationale
    pub fn trigger(self) -> &'static str {
        match self {
            Self::Heating | Self::BrakingByTemp => "temperature",
            Self::BrakingMode => "price",
            Self::SummerMode => "summer",
            Self::Precool => "warm forecast",
            Self::Preboost => "pre-boost (cold & expensive forecast)",
            Self::Neutral => "neutral",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::Neutral => "neutral",
            Self::BrakingByTemp => "braking_by_temp",
            Self::BrakingMode => "braking_mode",
            Self::Preboost => "preboost",
            Self::Precool => "precool",
            Self::SummerMode => "summer_mode",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

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

use thiserror::Error;

/// Why a temperature forecast could not be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("forecast is empty")]
    Empty,

    #[error("forecast entry {index} is not a number: '{raw}'")]
    InvalidValue { index: usize, raw: String },

    #[error("forecast entry {index} is not finite")]
    NonFinite { index: usize },

    #[error("forecast has {count} hours, at most {max} allowed")]
    TooManyHours { count: usize, max: usize },
}

/// Why persisted state could not be restored
#[derive(Error, Debug)]
pub enum StateError {
    #[error("state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

pub type ForecastResult<T> = std::result::Result<T, ForecastError>;

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

/// Field-level outcome of checking a configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the configuration can be used
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Require `field` to lie within `[min, max]`
    pub fn check_range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.add_error(field, format!("Must be between {min} and {max}, got {value}"));
        }
    }

    /// Require `low < high`
    pub fn check_ordered(&mut self, low_field: &str, low: f64, high_field: &str, high: f64) {
        if low >= high {
            self.add_error(
                high_field,
                format!("Must be greater than {low_field} ({low}), got {high}"),
            );
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path, e.g. "pricing.cheap_percentile"
    pub field: String,
    pub message: String,
    pub severity: ValidationSeverity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    /// Prevents the config from being used
    Error,
    /// Usable but probably not intended
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_keeps_result_valid() {
        let mut result = ValidationResult::success();
        result.add_warning("forecast.precool_margin", "Large margin");
        assert!(result.valid);
        assert!(!result.has_errors());

        result.check_range("pricing.extreme_multiplier", 0.5, 1.0, 10.0);
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "pricing.extreme_multiplier");
    }
}

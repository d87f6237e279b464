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

//! Maps the chosen mode onto the emitted virtual outdoor temperature.
//!
//! Lower values than the real outdoor temperature ask the heat pump for more
//! heat; the fixed braking temperature makes its curve stop heating.

use pumpsteer_types::{OperatingMode, OutputConfig, PriceCategory};
use tracing::warn;

use crate::pricing::round1;

#[derive(Debug, Clone, Copy)]
pub struct VirtualTempInput {
    pub mode: OperatingMode,
    pub indoor_temp: f64,
    /// Target after any holiday clamp
    pub target_temp: f64,
    pub real_outdoor_temp: f64,
    pub aggressiveness: f64,
    pub inertia: f64,
    pub price_category: PriceCategory,
    /// Accumulated temperature error, only used in neutral
    pub temp_error_integral: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualTemp {
    /// Clamped and rounded to one decimal
    pub value: f64,
    /// Before clamping and rounding
    pub raw: f64,
    /// Raw value was outside the safe range
    pub clamped: bool,
}

#[derive(Debug, Clone)]
pub struct VirtualTempCalculator<'a> {
    config: &'a OutputConfig,
}

impl<'a> VirtualTempCalculator<'a> {
    pub fn new(config: &'a OutputConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, input: &VirtualTempInput) -> VirtualTemp {
        let c = self.config;
        let outdoor = input.real_outdoor_temp;
        let aggressiveness = input.aggressiveness.clamp(0.0, 5.0);

        let raw = match input.mode {
            OperatingMode::SummerMode
            | OperatingMode::Precool
            | OperatingMode::BrakingMode
            | OperatingMode::BrakingByTemp => c.braking_temp,
            OperatingMode::Heating => {
                outdoor
                    - self.heating_offset(
                        input.target_temp - input.indoor_temp,
                        aggressiveness,
                        input.price_category,
                    )
            }
            OperatingMode::Preboost => {
                outdoor
                    - self.preboost_offset(
                        input.target_temp - input.indoor_temp,
                        aggressiveness,
                        input.inertia,
                    )
            }
            OperatingMode::Neutral => outdoor - self.neutral_correction(input.temp_error_integral),
        };

        self.finish(raw)
    }

    /// Overshoot below outdoor while heating, capped
    pub fn heating_offset(&self, deficit: f64, aggressiveness: f64, category: PriceCategory) -> f64 {
        let c = self.config;
        let mut deficit = deficit.max(0.0);
        if category == PriceCategory::VeryCheap {
            deficit += c.cheap_price_overshoot;
        }
        let gain = c.heating_gain_base + c.heating_gain_per_aggressiveness * aggressiveness;
        (deficit * gain).min(c.max_heating_offset)
    }

    /// Preboost nudge: grows with deficit and aggressiveness, and with inertia
    /// since a responsive house needs less of a head start
    pub fn preboost_offset(&self, deficit: f64, aggressiveness: f64, inertia: f64) -> f64 {
        let c = self.config;
        let base = c.preboost_base_offset + c.preboost_deficit_gain * deficit.max(0.0);
        let aggressiveness_scale = 1.0 + c.preboost_aggressiveness_gain * aggressiveness;
        let inertia_scale = (c.preboost_inertia_base + c.preboost_inertia_gain * inertia.max(0.0))
            .clamp(c.preboost_inertia_base, c.preboost_inertia_scale_max);
        (base * aggressiveness_scale * inertia_scale).min(c.max_preboost_offset)
    }

    /// Small correction from the accumulated error, zero when disabled
    pub fn neutral_correction(&self, integral: f64) -> f64 {
        let c = self.config;
        if !c.integral_enabled {
            return 0.0;
        }
        (c.integral_gain * integral).clamp(-c.max_neutral_correction, c.max_neutral_correction)
    }

    /// Accumulate `(target - indoor)` over the time since the last cycle
    pub fn update_integral(&self, previous: f64, target: f64, indoor: f64, elapsed_hours: f64) -> f64 {
        let c = self.config;
        if !c.integral_enabled {
            return 0.0;
        }
        let step = elapsed_hours.clamp(0.0, c.max_integration_step_hours);
        (previous + (target - indoor) * step).clamp(-c.integral_limit, c.integral_limit)
    }

    fn finish(&self, raw: f64) -> VirtualTemp {
        let c = self.config;
        let clamped = !(c.min_virtual_temp..=c.max_virtual_temp).contains(&raw);
        if clamped {
            warn!(
                "Virtual temperature {raw:.1}°C outside safe range [{}, {}], clamping",
                c.min_virtual_temp, c.max_virtual_temp
            );
        }
        VirtualTemp {
            value: round1(raw.clamp(c.min_virtual_temp, c.max_virtual_temp)),
            raw,
            clamped,
        }
    }
}

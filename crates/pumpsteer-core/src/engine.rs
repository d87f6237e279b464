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

//! One evaluation cycle, from raw input to emitted value.
//!
//! State goes in and comes back out; nothing is shared between cycles except
//! what the caller passes along.

use chrono::Timelike;
use chrono_tz::Tz;
use pumpsteer_types::{
    AdaptiveState, CycleInput, CycleOutput, CycleStatus, DataQuality, Diagnostic, EngineConfig,
    EngineState, HeatingSession, OperatingMode, PerformanceSummary, SessionHistory,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decision::{Decision, DecisionContext, ModeEngine, is_holiday_active};
use crate::forecast::{ForecastScan, ForecastScanner, ScanContext, TemperatureForecast};
use crate::learning::{self, InertiaEstimator, Observation, SessionTransition};
use crate::pricing::{PriceClassifier, PriceInputs, round1};
use crate::virtual_temp::{VirtualTempCalculator, VirtualTempInput};

/// Result of one cycle: what to report and what to carry forward
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub output: CycleOutput,
    pub state: EngineState,
    /// A heating session closed this cycle
    pub closed_session: Option<HeatingSession>,
}

/// Learning status for reporting outside the cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsights {
    pub adaptive: AdaptiveState,
    pub summary: PerformanceSummary,
    pub recommendations: Vec<String>,
    pub session_open: bool,
}

const DEFAULT_INERTIA: f64 = 2.0;

/// User knobs after range checks
#[derive(Debug, Clone, Copy)]
struct Knobs {
    aggressiveness: f64,
    user_inertia: f64,
}

/// Readings that must be present for a fresh value
#[derive(Debug, Clone, Copy)]
struct Readings {
    indoor: f64,
    target: f64,
    outdoor: f64,
    price: f64,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    tz: Tz,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        if let Err(e) = config.tz() {
            warn!("{e}, falling back to UTC");
        }
        let tz = config.tz_or_utc();
        Self { config, tz }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inertia the cycle works with: learned once auto-tune has adjusted it.
    /// Always within `[0, 10]`.
    pub fn effective_inertia(&self, input: &CycleInput, state: &EngineState) -> f64 {
        let inertia = if input.autotune_inertia && state.adaptive.last_updated.is_some() {
            state.adaptive.house_inertia
        } else {
            input.house_inertia
        };
        if inertia.is_finite() {
            inertia.clamp(0.0, 10.0)
        } else {
            DEFAULT_INERTIA
        }
    }

    pub fn insights(&self, state: &EngineState) -> LearningInsights {
        LearningInsights {
            adaptive: state.adaptive.clone(),
            summary: learning::performance_summary(&state.sessions),
            recommendations: learning::recommendations(&state.sessions, &self.config.learning),
            session_open: state.active_session.is_some(),
        }
    }

    pub fn run_cycle(&self, input: &CycleInput, mut state: EngineState) -> CycleOutcome {
        let mut diagnostics = Vec::new();
        let knobs = check_knobs(input, &mut diagnostics);
        let now_local = input.now.with_timezone(&self.tz);
        let hour = now_local.hour();

        let Some(readings) = self.readings(input, hour as usize, &mut diagnostics) else {
            let output = self.degraded_output(input, &state, knobs, hour, diagnostics);
            return CycleOutcome {
                output,
                state,
                closed_session: None,
            };
        };

        let inertia = self.effective_inertia(input, &state);

        // Prices
        let classification = PriceClassifier::new(&self.config.pricing).classify(
            PriceInputs {
                now: input.now,
                history: &input.price_history,
                today: &input.price_forecast_today,
                tomorrow: &input.price_forecast_tomorrow,
                price_now: readings.price,
            },
            knobs.aggressiveness,
            input.price_model,
        );
        if !classification.sufficient_history {
            diagnostics.push(Diagnostic::InsufficientHistory {
                span_hours: classification.history_span_hours,
                required_hours: self.config.pricing.min_history_hours,
            });
        }

        // Forecast
        let forecast = self.parse_forecast(input, &mut diagnostics);
        let scan: Option<ForecastScan> = forecast.as_ref().map(|f| {
            ForecastScanner::new(&self.config.forecast).scan(
                f,
                &classification,
                &ScanContext {
                    now: now_local,
                    target_temp: readings.target,
                    summer_threshold: input.summer_threshold,
                    aggressiveness: knobs.aggressiveness,
                    inertia,
                },
            )
        });

        // Mode
        let holiday_active = is_holiday_active(
            input.holiday_mode,
            input.holiday_start,
            input.holiday_end,
            input.now,
        );
        let decision = ModeEngine::new(&self.config.decision).decide(&DecisionContext {
            indoor_temp: readings.indoor,
            target_temp: readings.target,
            real_outdoor_temp: readings.outdoor,
            summer_threshold: input.summer_threshold,
            aggressiveness: knobs.aggressiveness,
            price_category: classification.current_category,
            holiday_active,
            preboost_enabled: input.preboost_enabled,
            scan: scan.as_ref(),
        });

        if state.controller.last_mode != Some(decision.mode) {
            info!(
                "Mode {} -> {} ({})",
                state
                    .controller
                    .last_mode
                    .map_or("none", OperatingMode::as_str),
                decision.mode,
                decision.reason
            );
        }

        // Virtual temperature
        let calculator = VirtualTempCalculator::new(&self.config.output);
        let elapsed_hours = state
            .controller
            .last_cycle_at
            .map_or(0.0, |last| (input.now - last).num_seconds() as f64 / 3600.0);
        let integral = calculator.update_integral(
            state.controller.temp_error_integral,
            decision.effective_target,
            readings.indoor,
            elapsed_hours,
        );
        let virtual_temp = calculator.calculate(&VirtualTempInput {
            mode: decision.mode,
            indoor_temp: readings.indoor,
            target_temp: decision.effective_target,
            real_outdoor_temp: readings.outdoor,
            aggressiveness: knobs.aggressiveness,
            inertia,
            price_category: classification.current_category,
            temp_error_integral: integral,
        });
        if virtual_temp.clamped {
            diagnostics.push(Diagnostic::SafetyLimitReached {
                raw: virtual_temp.raw,
            });
        }
        debug!(
            "Cycle {}: mode={} virtual={:.1} outdoor={:.1} indoor={:.1} target={:.1} inertia={:.2}",
            input.now,
            decision.mode,
            virtual_temp.value,
            readings.outdoor,
            readings.indoor,
            decision.effective_target,
            inertia
        );

        // Learning; a new estimate only takes effect next cycle
        let closed_session = self.learn(input, &mut state, &decision, readings, knobs, inertia);

        state.controller.last_mode = Some(decision.mode);
        state.controller.last_virtual_temp = Some(virtual_temp.value);
        state.controller.temp_error_integral = integral;
        state.controller.last_cycle_at = Some(input.now);

        let known_prices = input.known_prices();
        let next_index = hour as usize + 1;
        let next_3_hours_prices = known_prices
            .iter()
            .skip(next_index)
            .take(3)
            .copied()
            .collect();

        let output = CycleOutput {
            timestamp: input.now,
            status: CycleStatus::Ok,
            virtual_temp: Some(virtual_temp.value),
            mode: Some(decision.mode),
            decision_reason: decision.reason.clone(),
            price_category: classification.current_category,
            price_factor_percent: classification.current_factor,
            current_price: Some(readings.price),
            min_price: classification.min_price,
            max_price: classification.max_price,
            next_3_hours_prices,
            saving_potential: round3((classification.max_price - readings.price).max(0.0)),
            price_categories_all_hours: classification.categories.clone(),
            braking_threshold_percent: braking_threshold_percent(knobs.aggressiveness),
            aggressiveness: knobs.aggressiveness,
            inertia,
            summer_threshold: input.summer_threshold,
            holiday_mode: holiday_active,
            preboost_enabled: input.preboost_enabled,
            target_temp: Some(readings.target),
            effective_target: Some(decision.effective_target),
            indoor_temp: Some(readings.indoor),
            outdoor_temp: Some(readings.outdoor),
            temp_error_c: Some(round1(readings.indoor - decision.effective_target)),
            to_summer_threshold_c: Some(round1(input.summer_threshold - readings.outdoor)),
            preboost_expected_in_hours: scan.as_ref().and_then(|s| s.preboost_expected_in_hours),
            first_preboost_hour: scan.as_ref().and_then(|s| s.first_preboost_hour),
            cold_expensive_hours: scan.as_ref().map_or(0, ForecastScan::cold_expensive_count),
            precool_expected_in_hours: scan.as_ref().and_then(|s| s.precool_in_hours),
            current_hour: hour,
            data_quality: DataQuality {
                history_span_hours: classification.history_span_hours,
                history_sufficient: classification.sufficient_history,
                forecast_hours: forecast.as_ref().map_or(0, TemperatureForecast::len),
                forecast_valid: forecast.is_some(),
                known_price_hours: known_prices.len(),
            },
            diagnostics,
            sessions_recorded: state.sessions.len(),
            recommendations: learning::recommendations(&state.sessions, &self.config.learning),
        };

        CycleOutcome {
            output,
            state,
            closed_session,
        }
    }

    /// Required readings, or None after recording what is missing
    fn readings(
        &self,
        input: &CycleInput,
        hour: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Readings> {
        let price = input
            .price_now
            .or_else(|| input.price_forecast_today.get(hour).copied())
            .filter(|p| p.is_finite());

        let mut missing = input.missing_fields();
        if price.is_none() {
            missing.push("price_now");
        }

        if let (Some(indoor), Some(target), Some(outdoor), Some(price), true) = (
            input.indoor_temp,
            input.target_temp,
            input.real_outdoor_temp,
            price,
            missing.is_empty(),
        ) {
            return Some(Readings {
                indoor,
                target,
                outdoor,
                price,
            });
        }

        warn!(
            "Missing input ({}), holding last virtual temperature",
            missing.join(", ")
        );
        diagnostics.push(Diagnostic::MissingInput {
            fields: missing.into_iter().map(str::to_owned).collect(),
        });
        None
    }

    fn parse_forecast(
        &self,
        input: &CycleInput,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<TemperatureForecast> {
        let Some(raw) = &input.temp_forecast else {
            diagnostics.push(Diagnostic::ForecastUnavailable);
            return None;
        };
        match TemperatureForecast::from_input(raw, self.config.forecast.max_hours) {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                warn!("Malformed temperature forecast ({e}), preboost and precool disabled");
                diagnostics.push(Diagnostic::MalformedForecast {
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn learn(
        &self,
        input: &CycleInput,
        state: &mut EngineState,
        decision: &Decision,
        readings: Readings,
        knobs: Knobs,
        inertia: f64,
    ) -> Option<HeatingSession> {
        let config = &self.config.learning;
        let estimator = InertiaEstimator::new(config);
        state.adaptive.autotune_enabled = input.autotune_inertia;
        // Mirror the user value until auto-tune has adjusted it
        if state.adaptive.last_updated.is_none() {
            state.adaptive.house_inertia = knobs.user_inertia;
        }

        let transition = estimator.observe(
            &mut state.active_session,
            &Observation {
                now: input.now,
                mode: decision.mode,
                indoor_temp: readings.indoor,
                target_temp: decision.effective_target,
                aggressiveness: knobs.aggressiveness,
                inertia,
            },
        );
        let SessionTransition::Closed(session) = transition else {
            return None;
        };

        if state.sessions.capacity() != SessionHistory::bounded_capacity(config.max_sessions) {
            state.sessions = state.sessions.resized(config.max_sessions);
        }
        if let Some(evicted) = state.sessions.push(session.clone()) {
            debug!("Session history full, evicted session from {}", evicted.started_at);
        }

        if input.autotune_inertia
            && let Some(adaptive) =
                estimator.autotune(&state.adaptive, inertia, &state.sessions, input.now)
        {
            state.adaptive = adaptive;
        }

        Some(session)
    }

    fn degraded_output(
        &self,
        input: &CycleInput,
        state: &EngineState,
        knobs: Knobs,
        hour: u32,
        diagnostics: Vec<Diagnostic>,
    ) -> CycleOutput {
        let mode = state.controller.last_mode;
        CycleOutput {
            timestamp: input.now,
            status: CycleStatus::Degraded,
            virtual_temp: state.controller.last_virtual_temp,
            mode,
            decision_reason: format!(
                "degraded - holding last value ({})",
                mode.map_or("no previous mode", OperatingMode::as_str)
            ),
            current_price: input.price_now,
            braking_threshold_percent: braking_threshold_percent(knobs.aggressiveness),
            aggressiveness: knobs.aggressiveness,
            inertia: self.effective_inertia(input, state),
            summer_threshold: input.summer_threshold,
            holiday_mode: is_holiday_active(
                input.holiday_mode,
                input.holiday_start,
                input.holiday_end,
                input.now,
            ),
            preboost_enabled: input.preboost_enabled,
            target_temp: input.target_temp,
            indoor_temp: input.indoor_temp,
            outdoor_temp: input.real_outdoor_temp,
            current_hour: hour,
            diagnostics,
            sessions_recorded: state.sessions.len(),
            recommendations: learning::recommendations(&state.sessions, &self.config.learning),
            ..CycleOutput::default()
        }
    }
}

/// Clamp user knobs into range, recording every correction
fn check_knobs(input: &CycleInput, diagnostics: &mut Vec<Diagnostic>) -> Knobs {
    Knobs {
        aggressiveness: clamp_knob("aggressiveness", input.aggressiveness, 0.0, 5.0, 3.0, diagnostics),
        user_inertia: clamp_knob(
            "house_inertia",
            input.house_inertia,
            0.0,
            10.0,
            DEFAULT_INERTIA,
            diagnostics,
        ),
    }
}

fn clamp_knob(
    field: &str,
    value: f64,
    min: f64,
    max: f64,
    fallback: f64,
    diagnostics: &mut Vec<Diagnostic>,
) -> f64 {
    let clamped = if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    };
    if value.is_nan() || (clamped - value).abs() > f64::EPSILON {
        warn!("{field} {value} outside [{min}, {max}], using {clamped}");
        diagnostics.push(Diagnostic::InputClamped {
            field: field.to_owned(),
            value,
            clamped_to: clamped,
        });
    }
    clamped
}

/// Share of the target margin still allowed before braking, in percent
fn braking_threshold_percent(aggressiveness: f64) -> f64 {
    round1((1.0 - aggressiveness / 5.0 * 0.5) * 100.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

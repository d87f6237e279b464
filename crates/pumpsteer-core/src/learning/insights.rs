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

use std::collections::BTreeMap;

use pumpsteer_types::{LearningConfig, PerformanceSummary, SessionHistory};

/// Aggregate statistics over every recorded session
pub fn performance_summary(history: &SessionHistory) -> PerformanceSummary {
    let total = history.len();
    if total == 0 {
        return PerformanceSummary::default();
    }

    let count = total as f64;
    let successful = history.iter().filter(|s| s.success).count();

    // Aggressiveness bucketed to one decimal
    let mut usage: BTreeMap<i64, usize> = BTreeMap::new();
    for session in history.iter() {
        *usage
            .entry((session.aggressiveness * 10.0).round() as i64)
            .or_default() += 1;
    }
    let most_used = usage
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(tenths, _)| *tenths as f64 / 10.0);

    PerformanceSummary {
        total_sessions: total,
        successful_sessions: successful,
        success_rate_percent: successful as f64 / count * 100.0,
        avg_duration_minutes: history.iter().map(|s| s.duration_minutes).sum::<f64>() / count,
        avg_peak_error: history.iter().map(|s| s.peak_error).sum::<f64>() / count,
        avg_inertia: history.iter().map(|s| s.inertia).sum::<f64>() / count,
        most_used_aggressiveness: most_used,
    }
}

/// Advice derived from the session history. Never applied automatically.
pub fn recommendations(history: &SessionHistory, config: &LearningConfig) -> Vec<String> {
    if history.len() < config.min_sessions_for_analysis {
        return vec![format!(
            "Still collecting data: {} of {} heating sessions recorded.",
            history.len(),
            config.min_sessions_for_analysis
        )];
    }

    let summary = performance_summary(history);
    let success_rate = summary.success_rate_percent;
    let avg_duration = summary.avg_duration_minutes;
    let recent: Vec<f64> = history.recent(config.recent_window).map(|s| s.inertia).collect();
    let recent_inertia = recent.iter().sum::<f64>() / recent.len().max(1) as f64;

    let mut advice = Vec::new();

    if let Some(aggressiveness) = summary.most_used_aggressiveness {
        if aggressiveness <= 0.0 {
            advice.push(
                "Aggressiveness 0: no price logic is active, the system behaves like a plain thermostat."
                    .to_owned(),
            );
        } else if aggressiveness >= config.high_aggressiveness
            && success_rate < config.balanced_success_rate
        {
            advice.push(format!(
                "Aggressiveness {aggressiveness:.1} saves money but comfort suffers ({success_rate:.1}% success). Consider lowering it to {:.1}.",
                (aggressiveness - config.aggressiveness_step).max(0.0)
            ));
        } else if aggressiveness <= config.low_aggressiveness
            && avg_duration < config.quick_session_minutes
        {
            advice.push(format!(
                "Aggressiveness {aggressiveness:.1} favours comfort and heating recovers quickly. Raising it to {:.1} would save more.",
                (aggressiveness + config.aggressiveness_step).min(5.0)
            ));
        }
    }

    if avg_duration > config.long_session_minutes && recent_inertia < config.low_inertia {
        advice.push(format!(
            "Heating sessions are long ({avg_duration:.0} min) for inertia {recent_inertia:.1}. The house responds slowly, try a higher inertia."
        ));
    } else if avg_duration < config.short_session_minutes && recent_inertia > config.high_inertia {
        advice.push(format!(
            "Heating sessions are short ({avg_duration:.0} min) for inertia {recent_inertia:.1}. The house responds quickly, try a lower inertia."
        ));
    }

    if success_rate > config.high_success_rate {
        advice.push(format!(
            "Good balance between savings and comfort ({success_rate:.1}% success)."
        ));
    } else if success_rate < config.low_success_rate {
        advice.push(format!(
            "Low success rate ({success_rate:.1}%). Adjust aggressiveness or house inertia."
        ));
    }

    if history.len() < config.patience_sessions {
        advice.push(format!(
            "Still learning. Wait for {}+ sessions before making major changes.",
            config.patience_sessions
        ));
    }

    if advice.is_empty() {
        advice.push(
            "Aggressiveness (0-5) trades comfort for savings; house inertia sets how early the system reacts."
                .to_owned(),
        );
    }

    advice
}

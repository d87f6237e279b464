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

//! Inertia estimator and auto-tune loop
//!
//! A heating session opens when the mode enters `heating` or `preboost` and
//! closes when it leaves. Closed sessions go into the bounded history. When
//! auto-tuning is on, each close nudges the inertia estimate toward the value
//! implied by recent session durations; the damping and the step limit keep a
//! single outlier from swinging it.

mod insights;

pub use insights::{performance_summary, recommendations};

use chrono::{DateTime, Utc};
use pumpsteer_types::{
    ActiveSession, AdaptiveState, HeatingSession, LearningConfig, OperatingMode, SessionHistory,
    TrajectoryPoint,
};
use tracing::{debug, info};

/// One cycle's view of the house, as seen by the estimator
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub now: DateTime<Utc>,
    pub mode: OperatingMode,
    pub indoor_temp: f64,
    pub target_temp: f64,
    pub aggressiveness: f64,
    pub inertia: f64,
}

/// What happened to the session state this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTransition {
    Opened,
    Continued,
    Closed(HeatingSession),
    Idle,
}

#[derive(Debug, Clone)]
pub struct InertiaEstimator<'a> {
    config: &'a LearningConfig,
}

impl<'a> InertiaEstimator<'a> {
    pub fn new(config: &'a LearningConfig) -> Self {
        Self { config }
    }

    /// Advance the session state machine by one cycle
    pub fn observe(
        &self,
        active: &mut Option<ActiveSession>,
        obs: &Observation,
    ) -> SessionTransition {
        match (active.take(), obs.mode.is_heating_like()) {
            (None, true) => {
                info!(
                    "Heating session opened ({}, indoor {:.1}°C, target {:.1}°C)",
                    obs.mode, obs.indoor_temp, obs.target_temp
                );
                *active = Some(self.open_session(obs));
                SessionTransition::Opened
            }
            (Some(mut session), true) => {
                self.record(&mut session, obs);
                *active = Some(session);
                SessionTransition::Continued
            }
            (Some(session), false) => SessionTransition::Closed(self.close_session(session, obs)),
            (None, false) => SessionTransition::Idle,
        }
    }

    fn open_session(&self, obs: &Observation) -> ActiveSession {
        ActiveSession {
            started_at: obs.now,
            start_mode: obs.mode,
            start_indoor: obs.indoor_temp,
            target_temp: obs.target_temp,
            aggressiveness: obs.aggressiveness,
            inertia: obs.inertia,
            peak_error: (obs.indoor_temp - obs.target_temp).abs(),
            reached_target: self.reached(obs.indoor_temp, obs.target_temp),
            trajectory: vec![TrajectoryPoint {
                at: obs.now,
                indoor_temp: obs.indoor_temp,
            }],
        }
    }

    fn record(&self, session: &mut ActiveSession, obs: &Observation) {
        session.trajectory.push(TrajectoryPoint {
            at: obs.now,
            indoor_temp: obs.indoor_temp,
        });
        let max_points = self.config.max_trajectory_points.max(2);
        if session.trajectory.len() > max_points {
            let keep = max_points / 2;
            let excess = session.trajectory.len() - keep;
            session.trajectory.drain(..excess);
        }
        if self.reached(obs.indoor_temp, session.target_temp) {
            session.reached_target = true;
        }
    }

    fn reached(&self, indoor: f64, target: f64) -> bool {
        indoor >= target - self.config.success_tolerance
    }

    /// Close the session with the observation that ended it
    pub fn close_session(&self, mut session: ActiveSession, obs: &Observation) -> HeatingSession {
        self.record(&mut session, obs);
        let duration_minutes = (obs.now - session.started_at).num_seconds().max(0) as f64 / 60.0;

        info!(
            "Heating session closed after {:.0} min ({}), success: {}",
            duration_minutes, obs.mode, session.reached_target
        );

        HeatingSession {
            started_at: session.started_at,
            ended_at: obs.now,
            duration_minutes,
            start_mode: session.start_mode,
            start_indoor: session.start_indoor,
            end_indoor: obs.indoor_temp,
            target_temp: session.target_temp,
            aggressiveness: session.aggressiveness,
            inertia: session.inertia,
            peak_error: session.peak_error,
            success: session.reached_target,
            trajectory: session.trajectory,
        }
    }

    /// Inertia implied by recent session durations, once enough sessions exist
    pub fn estimate(&self, history: &SessionHistory) -> Option<f64> {
        let c = self.config;
        let durations: Vec<f64> = history
            .recent(c.recent_window)
            .map(|s| s.duration_minutes)
            .collect();
        if durations.len() < c.min_sessions_for_autotune || durations.is_empty() {
            return None;
        }
        let average = durations.iter().sum::<f64>() / durations.len() as f64;
        Some((average / c.minutes_per_inertia_unit).clamp(c.inertia_min, c.inertia_max))
    }

    /// Damped move from `current` toward the estimate; None when nothing changes
    pub fn autotune(
        &self,
        adaptive: &AdaptiveState,
        current: f64,
        history: &SessionHistory,
        now: DateTime<Utc>,
    ) -> Option<AdaptiveState> {
        let c = self.config;
        let estimate = self.estimate(history)?;
        let step = (c.damping * (estimate - current)).clamp(-c.max_step, c.max_step);
        let next = (current + step).clamp(c.inertia_min, c.inertia_max);

        debug!("Inertia estimate {estimate:.2}, current {current:.2}, step {step:+.2}");
        if (next - current).abs() < 1e-6 {
            return None;
        }

        info!("Auto-tuned house inertia {current:.2} -> {next:.2}");
        Some(AdaptiveState {
            house_inertia: next,
            last_updated: Some(now),
            autotune_enabled: true,
            adjustments: adaptive.adjustments + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 6, 0, 0).unwrap()
    }

    fn obs(minutes: i64, mode: OperatingMode, indoor: f64) -> Observation {
        Observation {
            now: start() + Duration::minutes(minutes),
            mode,
            indoor_temp: indoor,
            target_temp: 21.0,
            aggressiveness: 3.0,
            inertia: 2.0,
        }
    }

    fn closed(duration_minutes: f64) -> HeatingSession {
        HeatingSession {
            started_at: start(),
            ended_at: start() + Duration::minutes(duration_minutes as i64),
            duration_minutes,
            start_mode: OperatingMode::Heating,
            start_indoor: 19.0,
            end_indoor: 21.0,
            target_temp: 21.0,
            aggressiveness: 3.0,
            inertia: 2.0,
            peak_error: 2.0,
            success: true,
            trajectory: Vec::new(),
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let mut active = None;

        assert_eq!(
            estimator.observe(&mut active, &obs(0, OperatingMode::Neutral, 20.8)),
            SessionTransition::Idle
        );
        assert_eq!(
            estimator.observe(&mut active, &obs(5, OperatingMode::Heating, 19.0)),
            SessionTransition::Opened
        );
        assert_eq!(
            estimator.observe(&mut active, &obs(35, OperatingMode::Preboost, 20.0)),
            SessionTransition::Continued
        );
        assert!(!active.as_ref().unwrap().reached_target);
        estimator.observe(&mut active, &obs(65, OperatingMode::Heating, 20.9));
        assert!(active.as_ref().unwrap().reached_target);

        let SessionTransition::Closed(session) =
            estimator.observe(&mut active, &obs(95, OperatingMode::Neutral, 21.1))
        else {
            panic!("expected session to close");
        };
        assert!(active.is_none());
        assert!((session.duration_minutes - 90.0).abs() < 1e-9);
        assert!((session.peak_error - 2.0).abs() < 1e-9);
        assert!(session.success);
        assert_eq!(session.trajectory.len(), 4);
        assert!((session.end_indoor - 21.1).abs() < 1e-9);
    }

    #[test]
    fn test_session_that_never_reaches_target_fails() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let mut active = None;

        estimator.observe(&mut active, &obs(0, OperatingMode::Heating, 18.0));
        estimator.observe(&mut active, &obs(60, OperatingMode::Heating, 19.5));
        let SessionTransition::Closed(session) =
            estimator.observe(&mut active, &obs(120, OperatingMode::BrakingMode, 20.0))
        else {
            panic!("expected session to close");
        };
        assert!(!session.success);
    }

    #[test]
    fn test_trajectory_is_bounded() {
        let config = LearningConfig {
            max_trajectory_points: 10,
            ..LearningConfig::default()
        };
        let estimator = InertiaEstimator::new(&config);
        let mut active = None;

        for minute in 0..25 {
            estimator.observe(&mut active, &obs(minute, OperatingMode::Heating, 19.0));
        }
        let session = active.unwrap();
        assert!(session.trajectory.len() <= 10);
        assert_eq!(session.trajectory.last().unwrap().at, start() + Duration::minutes(24));
    }

    #[test]
    fn test_estimate_needs_enough_sessions() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let history = SessionHistory::from_sessions(100, vec![closed(120.0), closed(120.0)]);
        assert_eq!(estimator.estimate(&history), None);

        let history = SessionHistory::from_sessions(100, vec![closed(120.0); 3]);
        assert_eq!(estimator.estimate(&history), Some(2.0));
    }

    #[test]
    fn test_longer_sessions_raise_inertia() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let adaptive = AdaptiveState::default();

        let slow = SessionHistory::from_sessions(100, vec![closed(300.0); 5]);
        let fast = SessionHistory::from_sessions(100, vec![closed(30.0); 5]);

        let raised = estimator.autotune(&adaptive, 2.0, &slow, start()).unwrap();
        let lowered = estimator.autotune(&adaptive, 2.0, &fast, start()).unwrap();
        assert!(raised.house_inertia > 2.0);
        assert!(lowered.house_inertia < 2.0);
        assert_eq!(raised.adjustments, 1);
        assert_eq!(raised.last_updated, Some(start()));
    }

    #[test]
    fn test_single_outlier_is_damped() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let mut sessions = vec![closed(120.0); 9];
        sessions.push(closed(6000.0));
        let history = SessionHistory::from_sessions(100, sessions);

        let tuned = estimator
            .autotune(&AdaptiveState::default(), 2.0, &history, start())
            .unwrap();
        assert!(tuned.house_inertia - 2.0 <= config.max_step + 1e-9);
    }

    #[test]
    fn test_no_adjustment_when_already_matching() {
        let config = LearningConfig::default();
        let estimator = InertiaEstimator::new(&config);
        let history = SessionHistory::from_sessions(100, vec![closed(120.0); 4]);
        assert!(
            estimator
                .autotune(&AdaptiveState::default(), 2.0, &history, start())
                .is_none()
        );
    }
}

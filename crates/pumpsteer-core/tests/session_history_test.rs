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

// Session bookkeeping across many cycles: FIFO capacity, auto-tune timing,
// and persistence between runs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pumpsteer_core::{Engine, StatePersistence};
use pumpsteer_types::{CycleInput, EngineConfig, EngineState, OperatingMode};
use tempfile::TempDir;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
}

/// Indoor 19 puts the engine in heating, indoor 21 back to neutral
fn cycle(step: i64, indoor: f64, autotune: bool) -> CycleInput {
    CycleInput {
        now: start() + Duration::minutes(30 * step),
        indoor_temp: Some(indoor),
        target_temp: Some(21.0),
        real_outdoor_temp: Some(0.0),
        price_now: Some(1.0),
        autotune_inertia: autotune,
        house_inertia: 2.0,
        ..CycleInput::default()
    }
}

#[test]
fn test_history_keeps_most_recent_hundred() {
    let engine = Engine::new(EngineConfig::default());
    let mut state = EngineState::default();
    let mut closes = 0;

    for session in 0..105 {
        let step = session * 2;
        let opened = engine.run_cycle(&cycle(step, 19.0, false), state);
        assert_eq!(opened.output.mode, Some(OperatingMode::Heating));
        state = opened.state;

        let closed = engine.run_cycle(&cycle(step + 1, 21.0, false), state);
        if closed.closed_session.is_some() {
            closes += 1;
        }
        state = closed.state;
    }

    assert_eq!(closes, 105);
    assert_eq!(state.sessions.len(), 100);

    let starts: Vec<_> = state.sessions.iter().map(|s| s.started_at).collect();
    let expected: Vec<_> = (5..105)
        .map(|session| start() + Duration::minutes(30 * session * 2))
        .collect();
    assert_eq!(starts, expected);
    assert!(state.sessions.iter().all(|s| s.success));
    assert!(state.sessions.iter().all(|s| (s.duration_minutes - 30.0).abs() < 1e-9));
}

#[test]
fn test_autotune_applies_from_next_cycle() {
    let engine = Engine::new(EngineConfig::default());
    let mut state = EngineState::default();

    for session in 0..3 {
        let step = session * 2;
        state = engine.run_cycle(&cycle(step, 19.0, true), state).state;
        let closing = engine.run_cycle(&cycle(step + 1, 21.0, true), state);

        // The closing cycle still reports the inertia it decided with
        assert!((closing.output.inertia - 2.0).abs() < 1e-9);
        state = closing.state;
    }

    // Three 30 min sessions imply inertia 0.5; damping moves 2.0 to 1.55
    assert!((state.adaptive.house_inertia - 1.55).abs() < 1e-9);
    assert_eq!(state.adaptive.adjustments, 1);
    assert!(state.adaptive.autotune_enabled);

    let next = engine.run_cycle(&cycle(6, 19.0, true), state);
    assert!((next.output.inertia - 1.55).abs() < 1e-9);
}

#[test]
fn test_autotune_disabled_keeps_user_inertia() {
    let engine = Engine::new(EngineConfig::default());
    let mut state = EngineState::default();

    for session in 0..5 {
        let step = session * 2;
        state = engine.run_cycle(&cycle(step, 19.0, false), state).state;
        state = engine.run_cycle(&cycle(step + 1, 21.0, false), state).state;
    }

    assert_eq!(state.sessions.len(), 5);
    assert!(state.adaptive.last_updated.is_none());
    assert!((state.adaptive.house_inertia - 2.0).abs() < 1e-9);
}

#[test]
fn test_open_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let persistence = StatePersistence::new(dir.path().join("state.json"));
    let engine = Engine::new(EngineConfig::default());

    let outcome = engine.run_cycle(&cycle(0, 19.0, false), persistence.load().state);
    persistence.save(&outcome.state).unwrap();

    let restored = persistence.load();
    assert!(restored.diagnostic.is_none());
    assert!(restored.state.active_session.is_some());

    let closing = engine.run_cycle(&cycle(1, 21.0, false), restored.state);
    let session = closing.closed_session.unwrap();
    assert!((session.duration_minutes - 30.0).abs() < 1e-9);
    assert_eq!(closing.state.sessions.len(), 1);
}

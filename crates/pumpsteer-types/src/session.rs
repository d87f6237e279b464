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

/// Default number of closed sessions kept in history
pub const DEFAULT_SESSION_CAPACITY: usize = 100;

/// Upper bound on history capacity, whatever the config or state file says
pub const MAX_SESSION_CAPACITY: usize = 10_000;

// ============= Heating Sessions =============

/// One indoor temperature observation inside a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub at: DateTime<Utc>,
    pub indoor_temp: f64,
}

/// Session opened on a transition into heating or preboost, not yet closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub started_at: DateTime<Utc>,
    pub start_mode: OperatingMode,
    pub start_indoor: f64,
    pub target_temp: f64,

    /// Aggressiveness at session start
    pub aggressiveness: f64,

    /// Inertia in effect at session start
    pub inertia: f64,

    /// |indoor - target| at session start
    pub peak_error: f64,

    /// Indoor reached target - tolerance at some point
    pub reached_target: bool,

    /// Bounded indoor trajectory
    pub trajectory: Vec<TrajectoryPoint>,
}

/// A closed heating session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatingSession {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub start_mode: OperatingMode,
    pub start_indoor: f64,
    pub end_indoor: f64,
    pub target_temp: f64,
    pub aggressiveness: f64,
    pub inertia: f64,
    pub peak_error: f64,

    /// Target reached within tolerance before the session closed
    pub success: bool,

    #[serde(default)]
    pub trajectory: Vec<TrajectoryPoint>,
}

// ============= Session History =============

/// Bounded FIFO of closed sessions.
///
/// Backed by a fixed set of slots and a head index: once full, each push
/// overwrites the oldest slot. Serialized as a chronological list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredHistory", into = "StoredHistory")]
pub struct SessionHistory {
    slots: Vec<HeatingSession>,
    /// Slot holding the oldest session once the buffer is full
    head: usize,
    capacity: usize,
}

#[derive(Serialize, Deserialize)]
struct StoredHistory {
    capacity: usize,
    sessions: Vec<HeatingSession>,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl SessionHistory {
    /// Capacity is clamped to `1..=MAX_SESSION_CAPACITY`; slots grow on demand
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            head: 0,
            capacity: Self::bounded_capacity(capacity),
        }
    }

    /// Build from chronological sessions, keeping only the newest `capacity`
    pub fn from_sessions(capacity: usize, sessions: Vec<HeatingSession>) -> Self {
        let mut history = Self::with_capacity(capacity);
        for session in sessions {
            history.push(session);
        }
        history
    }

    pub fn bounded_capacity(capacity: usize) -> usize {
        capacity.clamp(1, MAX_SESSION_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append a session, returning the evicted oldest one when full
    pub fn push(&mut self, session: HeatingSession) -> Option<HeatingSession> {
        if self.slots.len() < self.capacity {
            self.slots.push(session);
            return None;
        }

        let evicted = std::mem::replace(&mut self.slots[self.head], session);
        self.head = if self.head + 1 == self.capacity {
            0
        } else {
            self.head + 1
        };
        Some(evicted)
    }

    /// Sessions oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HeatingSession> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// The `count` most recent sessions, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &HeatingSession> + '_ {
        self.iter().skip(self.len().saturating_sub(count))
    }

    /// Same sessions in a buffer of a different capacity
    pub fn resized(&self, capacity: usize) -> Self {
        Self::from_sessions(capacity, self.iter().cloned().collect())
    }

    pub fn to_vec(&self) -> Vec<HeatingSession> {
        self.iter().cloned().collect()
    }
}

impl From<StoredHistory> for SessionHistory {
    fn from(stored: StoredHistory) -> Self {
        Self::from_sessions(stored.capacity, stored.sessions)
    }
}

impl From<SessionHistory> for StoredHistory {
    fn from(history: SessionHistory) -> Self {
        Self {
            capacity: history.capacity,
            sessions: history.to_vec(),
        }
    }
}

// ============= Performance Summary =============

/// Aggregate statistics over the recorded sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_sessions: usize,
    pub successful_sessions: usize,
    pub success_rate_percent: f64,
    pub avg_duration_minutes: f64,
    pub avg_peak_error: f64,
    pub avg_inertia: f64,
    /// Aggressiveness used most often at session start
    pub most_used_aggressiveness: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session(minute: i64) -> HeatingSession {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        HeatingSession {
            started_at: start,
            ended_at: start + Duration::minutes(30),
            duration_minutes: 30.0,
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
    fn test_history_evicts_oldest_first() {
        let mut history = SessionHistory::with_capacity(3);
        for minute in 0..3 {
            assert!(history.push(session(minute)).is_none());
        }

        let evicted = history.push(session(3)).unwrap();
        assert_eq!(evicted, session(0));
        history.push(session(4));

        let starts: Vec<_> = history.iter().map(|s| s.started_at).collect();
        let expected: Vec<_> = (2..5).map(|m| session(m).started_at).collect();
        assert_eq!(starts, expected);
        assert_eq!(history.iter().next_back(), Some(&session(4)));
    }

    #[test]
    fn test_recent_returns_newest_in_order() {
        let history = SessionHistory::from_sessions(5, (0..8).map(session).collect());
        let recent: Vec<_> = history.recent(2).cloned().collect();
        assert_eq!(recent, vec![session(6), session(7)]);
    }

    #[test]
    fn test_serialized_chronologically() {
        let history = SessionHistory::from_sessions(2, (0..3).map(session).collect());
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["capacity"], 2);
        assert_eq!(json["sessions"].as_array().unwrap().len(), 2);

        let restored: SessionHistory = serde_json::from_value(json).unwrap();
        assert_eq!(restored.to_vec(), history.to_vec());
    }

    #[test]
    fn test_stored_capacity_is_bounded() {
        let json = format!(r#"{{"capacity": {}, "sessions": []}}"#, usize::MAX);
        let restored: SessionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.capacity(), MAX_SESSION_CAPACITY);
        assert!(restored.is_empty());

        let zero: SessionHistory =
            serde_json::from_str(r#"{"capacity": 0, "sessions": []}"#).unwrap();
        assert_eq!(zero.capacity(), 1);
    }

    #[test]
    fn test_resized_keeps_newest() {
        let history = SessionHistory::from_sessions(10, (0..6).map(session).collect());
        let smaller = history.resized(4);
        assert_eq!(smaller.len(), 4);
        assert_eq!(smaller.iter().next(), Some(&session(2)));
    }
}

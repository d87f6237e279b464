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

//! CSV export of recorded heating sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pumpsteer_types::{HeatingSession, SessionHistory};
use serde::Serialize;
use std::io::Write;

/// One CSV row per closed session; the trajectory is summarized by its length
#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_minutes: f64,
    start_mode: &'a str,
    start_indoor: f64,
    end_indoor: f64,
    target_temp: f64,
    aggressiveness: f64,
    inertia: f64,
    peak_error: f64,
    success: bool,
    trajectory_points: usize,
}

impl<'a> From<&'a HeatingSession> for SessionRow<'a> {
    fn from(session: &'a HeatingSession) -> Self {
        Self {
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_minutes: session.duration_minutes,
            start_mode: session.start_mode.as_str(),
            start_indoor: session.start_indoor,
            end_indoor: session.end_indoor,
            target_temp: session.target_temp,
            aggressiveness: session.aggressiveness,
            inertia: session.inertia,
            peak_error: session.peak_error,
            success: session.success,
            trajectory_points: session.trajectory.len(),
        }
    }
}

/// Write sessions oldest first; returns the number of rows written
pub fn write_sessions<W: Write>(history: &SessionHistory, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for session in history.iter() {
        csv_writer
            .serialize(SessionRow::from(session))
            .context("Failed to write session row")?;
        rows += 1;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(rows)
}

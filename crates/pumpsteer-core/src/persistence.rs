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

//! Persistence layer for engine state.
//!
//! The state file holds the adaptive inertia record, the bounded session
//! history and the controller values carried between cycles. A missing file
//! starts from defaults; an unreadable one is reset to defaults with a
//! diagnostic and never stops the cycle.

use anyhow::{Context, Result};
use pumpsteer_types::{Diagnostic, EngineState, STATE_VERSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::StateError;

/// Default path for the engine state file.
pub const DEFAULT_STATE_PATH: &str = "./data/pumpsteer_state.json";

/// State restored at startup, plus why it had to be reset if it was
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: EngineState,
    pub diagnostic: Option<Diagnostic>,
}

impl LoadedState {
    fn fresh() -> Self {
        Self {
            state: EngineState::default(),
            diagnostic: None,
        }
    }

    fn reset(reason: String) -> Self {
        warn!("Engine state unusable ({reason}), starting from defaults");
        Self {
            state: EngineState::default(),
            diagnostic: Some(Diagnostic::CorruptedState { reason }),
        }
    }
}

/// Strict decode: fails on malformed JSON or a newer layout
pub fn decode_state(json: &str) -> std::result::Result<EngineState, StateError> {
    let state = EngineState::from_json(json)?;
    if state.version > STATE_VERSION {
        return Err(StateError::UnsupportedVersion {
            found: state.version,
            supported: STATE_VERSION,
        });
    }
    Ok(state)
}

/// Lenient decode: anything unreadable becomes the default state
pub fn restore_state(json: &str) -> LoadedState {
    match decode_state(json) {
        Ok(state) => LoadedState {
            state,
            diagnostic: None,
        },
        Err(e) => LoadedState::reset(e.to_string()),
    }
}

/// Engine state persistence manager.
#[derive(Debug, Clone)]
pub struct StatePersistence {
    state_path: PathBuf,
}

impl StatePersistence {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    pub fn default_production() -> Self {
        Self::new(DEFAULT_STATE_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }

    pub fn exists(&self) -> bool {
        self.state_path.exists()
    }

    /// Load engine state from disk. Never fails.
    pub fn load(&self) -> LoadedState {
        if !self.state_path.exists() {
            info!(
                "Engine state file not found at {}, using defaults",
                self.state_path.display()
            );
            return LoadedState::fresh();
        }

        let contents = match fs::read_to_string(&self.state_path) {
            Ok(contents) => contents,
            Err(e) => {
                return LoadedState::reset(format!(
                    "failed to read {}: {e}",
                    self.state_path.display()
                ));
            }
        };

        let loaded = restore_state(&contents);
        if loaded.diagnostic.is_none() {
            info!(
                "Loaded engine state: inertia={:.2}, sessions={}, active_session={}",
                loaded.state.adaptive.house_inertia,
                loaded.state.sessions.len(),
                loaded.state.active_session.is_some()
            );
        }
        loaded
    }

    /// Save engine state to disk.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption.
    pub fn save(&self, state: &EngineState) -> Result<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json = state.to_json().context("Failed to serialize engine state")?;

        let temp_path = self.state_path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.state_path).with_context(|| {
            format!(
                "Failed to rename temp file to {}",
                self.state_path.display()
            )
        })?;

        info!(
            "Saved engine state to {} ({} sessions)",
            self.state_path.display(),
            state.sessions.len()
        );

        Ok(())
    }
}

impl Default for StatePersistence {
    fn default() -> Self {
        Self::default_production()
    }
}

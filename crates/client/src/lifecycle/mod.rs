//! Cache lifecycle: install, activate, prune.
//!
//! A controller version moves through
//! `uninstalled → installing → installed → activating → active`.
//! A version whose install fails, or which is replaced by a newer active
//! version, ends in `redundant`. Transition methods reject calls from the
//! wrong phase and leave the phase untouched when they do.

mod controller;
mod manifest;

pub use controller::{
    ActivateReport, CacheUpdate, Controller, InstallReport, UpdateReport, populate_demo, populate_primary,
};
pub use manifest::{CacheNames, Manifest};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::Error;
use std::fmt;

/// Lifecycle phase of one controller version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Uninstalled,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Active,
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninstalled => "uninstalled",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Active => "active",
            Phase::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// The phase state machine of one controller version.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, action: &'static str, from: &[Phase], to: Phase) -> Result<(), Error> {
        if !from.contains(&self.phase) {
            return Err(Error::InvalidTransition { action, phase: self.phase.to_string() });
        }
        tracing::debug!(from = %self.phase, to = %to, "{action}");
        self.phase = to;
        Ok(())
    }

    /// `uninstalled → installing`
    pub fn begin_install(&mut self) -> Result<(), Error> {
        self.transition("install", &[Phase::Uninstalled], Phase::Installing)
    }

    /// `installing → installed` on success, `installing → redundant` on failure.
    pub fn finish_install(&mut self, succeeded: bool) -> Result<(), Error> {
        let to = if succeeded { Phase::Installed } else { Phase::Redundant };
        self.transition("finish install", &[Phase::Installing], to)
    }

    /// `installed → activating`
    pub fn begin_activate(&mut self) -> Result<(), Error> {
        self.transition("activate", &[Phase::Installed], Phase::Activating)
    }

    /// `activating → installed`, when pruning could not complete.
    pub fn abort_activate(&mut self) -> Result<(), Error> {
        self.transition("abort activation", &[Phase::Activating], Phase::Installed)
    }

    /// `activating → active`
    pub fn finish_activate(&mut self) -> Result<(), Error> {
        self.transition("finish activation", &[Phase::Activating], Phase::Active)
    }

    /// Any installed or active version → `redundant`.
    pub fn retire(&mut self) -> Result<(), Error> {
        self.transition("retire", &[Phase::Installed, Phase::Active], Phase::Redundant)
    }
}

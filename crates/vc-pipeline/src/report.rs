//! Per-preset outcomes of a batch export.

use std::path::{Path, PathBuf};

use vc_core::{Error, Result};

/// Result of exporting one preset.
#[derive(Debug)]
pub struct PresetOutcome {
    pub preset: String,
    pub result: Result<PathBuf>,
}

impl PresetOutcome {
    pub fn output(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }
}

/// Outcomes of a batch export, in preset order.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<PresetOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<PresetOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[PresetOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, preset: &str) -> Option<&PresetOutcome> {
        self.outcomes.iter().find(|o| o.preset == preset)
    }

    /// Outputs of the presets that succeeded.
    pub fn outputs(&self) -> Vec<&Path> {
        self.outcomes.iter().filter_map(PresetOutcome::output).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PresetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// The first error, if any preset failed.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }
}

//! JSON summary written next to the step images.

use std::path::Path;

use serde::Serialize;
use strata_core::{EnhanceParams, StepId};

/// File name written for each step, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFiles {
    pub mask: String,
    pub diff: String,
    #[serde(rename = "Im")]
    pub masked: String,
    #[serde(rename = "final")]
    pub final_layer: String,
    pub result: String,
}

impl StepFiles {
    /// `<id>_<step>.png` for every step.
    pub fn for_id(id: &str) -> Self {
        let name = |step: StepId| step_file_name(id, step);
        Self {
            mask: name(StepId::Mask),
            diff: name(StepId::Diff),
            masked: name(StepId::Masked),
            final_layer: name(StepId::Final),
            result: name(StepId::Result),
        }
    }

    pub fn get(&self, step: StepId) -> &str {
        match step {
            StepId::Mask => &self.mask,
            StepId::Diff => &self.diff,
            StepId::Masked => &self.masked,
            StepId::Final => &self.final_layer,
            StepId::Result => &self.result,
        }
    }
}

/// Everything a consumer needs to find and interpret one run's outputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub input: String,
    pub steps: StepFiles,
    pub params_used: EnhanceParams,
}

impl RunManifest {
    pub fn new(input: &Path, id: &str, params: EnhanceParams) -> Self {
        Self {
            input: input.display().to_string(),
            steps: StepFiles::for_id(id),
            params_used: params,
        }
    }
}

pub fn step_file_name(id: &str, step: StepId) -> String {
    format!("{id}_{}.png", step.label())
}

pub fn manifest_file_name(id: &str) -> String {
    format!("{id}_steps.json")
}

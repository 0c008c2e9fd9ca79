//! Named, ordered outputs of one pipeline run.

use serde::{Deserialize, Serialize};

use crate::image::Plane;

/// Identifies a published pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    /// Structure layer `I_k`.
    #[serde(rename = "mask")]
    Mask,
    /// Detail layer `I − I_k`.
    #[serde(rename = "diff")]
    Diff,
    /// Masked selection between `I` and `I_k`.
    #[serde(rename = "Im")]
    Masked,
    /// Recombination `I − s·Im`.
    #[serde(rename = "final")]
    Final,
    /// Tonal rescale of the recombination.
    #[serde(rename = "result")]
    Result,
}

impl StepId {
    /// Stage key as published to callers.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Mask => "mask",
            Self::Diff => "diff",
            Self::Masked => "Im",
            Self::Final => "final",
            Self::Result => "result",
        }
    }

    /// Every step, in pipeline order.
    pub fn all() -> &'static [Self] {
        const ALL: [StepId; 5] = [
            StepId::Mask,
            StepId::Diff,
            StepId::Masked,
            StepId::Final,
            StepId::Result,
        ];
        &ALL
    }
}

/// Every layer one run publishes, plus the masking decision behind `Im`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutputs {
    pub mask: Plane,
    pub diff: Plane,
    pub masked: Plane,
    pub final_layer: Plane,
    pub result: Plane,
    /// Stage 4 decision per pixel, row-major: `true` where `Im` holds the
    /// original sample.
    pub keep_original: Vec<bool>,
}

impl StepOutputs {
    pub fn get(&self, step: StepId) -> &Plane {
        match step {
            StepId::Mask => &self.mask,
            StepId::Diff => &self.diff,
            StepId::Masked => &self.masked,
            StepId::Final => &self.final_layer,
            StepId::Result => &self.result,
        }
    }

    /// `(step, layer)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &Plane)> + '_ {
        StepId::all().iter().map(move |&step| (step, self.get(step)))
    }
}

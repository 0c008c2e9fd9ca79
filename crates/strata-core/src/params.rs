//! Parameter struct that defines one enhancement run.
//!
//! `EnhanceParams` is the single source of truth for the pipeline. Callers
//! either build it directly and let [`EnhanceParams::validate`] reject
//! out-of-domain values, or pass untrusted input through
//! [`EnhanceParams::clamped`] first.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Upper bound for `alpha`.
pub const ALPHA_MAX: f32 = 10.0;
/// Upper bound for `kernel_size`.
pub const KERNEL_SIZE_MAX: usize = 50;
/// Upper bound for the structure pass count `k`.
pub const PASSES_MAX: usize = 10;
/// Upper bound for `final_weight`.
pub const FINAL_WEIGHT_MAX: f32 = 2.0;
/// Clip width, in standard deviations, when the mean±σ rescale has no
/// explicit width and no threshold to borrow.
pub const DEFAULT_SIGMAS: f32 = 2.5;

/// Shape of the spatial falloff used by the adaptive filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelFalloff {
    /// `exp(-d² / (2·alpha²))`: `alpha` is the spatial scale, so a larger
    /// value smooths more.
    #[default]
    Gaussian,
    /// `exp(-alpha·d)`: `alpha` is a decay rate, so a larger value
    /// smooths less.
    ExponentialDecay,
}

impl KernelFalloff {
    /// Human-readable label for logs and manifests.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::ExponentialDecay => "exponential decay",
        }
    }
}

/// Which side of the `threshold·σ` bound keeps the original pixel in the
/// masking stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminantPolicy {
    /// `|I_d - M| > threshold·σ` keeps `I`: statistically significant local
    /// deviations are treated as structure and left untouched.
    #[default]
    KeepOriginalAboveBound,
    /// `|I_d - M| < threshold·σ` keeps `I`: only deviations that look like
    /// ordinary local variation keep the original.
    KeepOriginalWithinBound,
}

impl DiscriminantPolicy {
    /// Whether a pixel with local deviation `deviation` keeps the original
    /// value under a bound of `bound`.
    #[inline]
    pub fn keeps_original(self, deviation: f32, bound: f32) -> bool {
        match self {
            Self::KeepOriginalAboveBound => deviation > bound,
            Self::KeepOriginalWithinBound => deviation < bound,
        }
    }

    /// Human-readable label for logs and manifests.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::KeepOriginalAboveBound => "keep original above bound",
            Self::KeepOriginalWithinBound => "keep original within bound",
        }
    }
}

/// How the final tonal rescale picks its clip range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RescalePolicy {
    /// Clip to the `[low, high]` percentiles (0..=100) of the layer.
    Percentile { low: f32, high: f32 },
    /// Clip to `mean ± sigmas·std` of the layer. `None` borrows the
    /// pipeline's `threshold`.
    MeanStdDev {
        #[serde(default)]
        sigmas: Option<f32>,
    },
}

impl Default for RescalePolicy {
    fn default() -> Self {
        Self::Percentile {
            low: 0.5,
            high: 99.5,
        }
    }
}

impl RescalePolicy {
    /// Fill in an unset σ multiplier with `sigmas`.
    pub fn resolve(self, sigmas: f32) -> Self {
        match self {
            Self::MeanStdDev { sigmas: None } => Self::MeanStdDev {
                sigmas: Some(sigmas),
            },
            other => other,
        }
    }

    /// Check that the policy describes a usable clip range.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Percentile { low, high } => {
                if !(low.is_finite() && high.is_finite()) {
                    return Err(StrataError::invalid("rescale", "percentiles must be finite"));
                }
                if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) {
                    return Err(StrataError::invalid(
                        "rescale",
                        format!("percentiles must lie in [0, 100], got [{low}, {high}]"),
                    ));
                }
                if low >= high {
                    return Err(StrataError::invalid(
                        "rescale",
                        format!("low percentile {low} must be below high percentile {high}"),
                    ));
                }
                Ok(())
            }
            Self::MeanStdDev { sigmas: Some(s) } if !(s.is_finite() && s > 0.0) => Err(
                StrataError::invalid("rescale", format!("sigmas must be positive, got {s}")),
            ),
            Self::MeanStdDev { .. } => Ok(()),
        }
    }

    /// Human-readable label for logs and manifests.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Percentile { .. } => "percentile clip",
            Self::MeanStdDev { .. } => "mean ± σ clip",
        }
    }
}

/// Every stage reads from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceParams {
    /// Spatial smoothing strength of the adaptive filter, in `[0, 10]`.
    pub alpha: f32,
    /// Filter footprint, in `[1, 50]`. Even sizes use `kernel_size / 2` as
    /// the radius.
    pub kernel_size: usize,
    /// Number of sequential adaptive filter passes, in `[1, 10]`.
    #[serde(alias = "iterations")]
    pub k: usize,
    /// Box window for the local mean/variance of the detail layer, `>= 1`.
    pub local_var_size: usize,
    /// Discriminant width in local standard deviations, `> 0`.
    pub threshold: f32,
    /// Strength of the recombination `I - s·Im`, in `[0, 2]`.
    #[serde(alias = "s")]
    pub final_weight: f32,
    /// Spatial kernel shape.
    pub falloff: KernelFalloff,
    /// Masking inequality direction.
    pub discriminant: DiscriminantPolicy,
    /// Final clip range policy.
    pub rescale: RescalePolicy,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            kernel_size: 15,
            k: 5,
            local_var_size: 40,
            threshold: 2.5,
            final_weight: 0.5,
            falloff: KernelFalloff::default(),
            discriminant: DiscriminantPolicy::default(),
            rescale: RescalePolicy::default(),
        }
    }
}

impl EnhanceParams {
    /// Neighborhood radius derived from `kernel_size`.
    pub fn radius(&self) -> usize {
        self.kernel_size / 2
    }

    /// Reject any parameter outside its documented domain.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && (0.0..=ALPHA_MAX).contains(&self.alpha)) {
            return Err(StrataError::invalid(
                "alpha",
                format!("must lie in [0, {ALPHA_MAX}], got {}", self.alpha),
            ));
        }
        if !(1..=KERNEL_SIZE_MAX).contains(&self.kernel_size) {
            return Err(StrataError::invalid(
                "kernel_size",
                format!("must lie in [1, {KERNEL_SIZE_MAX}], got {}", self.kernel_size),
            ));
        }
        if !(1..=PASSES_MAX).contains(&self.k) {
            return Err(StrataError::invalid(
                "k",
                format!("must lie in [1, {PASSES_MAX}], got {}", self.k),
            ));
        }
        if self.local_var_size < 1 {
            return Err(StrataError::invalid("local_var_size", "must be at least 1"));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(StrataError::invalid(
                "threshold",
                format!("must be positive, got {}", self.threshold),
            ));
        }
        if !(self.final_weight.is_finite() && (0.0..=FINAL_WEIGHT_MAX).contains(&self.final_weight))
        {
            return Err(StrataError::invalid(
                "final_weight",
                format!("must lie in [0, {FINAL_WEIGHT_MAX}], got {}", self.final_weight),
            ));
        }
        self.rescale.validate()
    }

    /// Force every scalar into its domain, the way an untrusted front end
    /// should before calling the pipeline. Non-finite values fall back to
    /// the defaults. The rescale policy is left untouched.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        let threshold = if self.threshold.is_finite() && self.threshold > 0.0 {
            self.threshold
        } else {
            defaults.threshold
        };
        Self {
            alpha: clamp_finite(self.alpha, 0.0, ALPHA_MAX, defaults.alpha),
            kernel_size: self.kernel_size.clamp(1, KERNEL_SIZE_MAX),
            k: self.k.clamp(1, PASSES_MAX),
            local_var_size: self.local_var_size.max(1),
            threshold,
            final_weight: clamp_finite(
                self.final_weight,
                0.0,
                FINAL_WEIGHT_MAX,
                defaults.final_weight,
            ),
            ..self.clone()
        }
    }
}

fn clamp_finite(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        EnhanceParams::default().validate().unwrap();
    }

    #[test]
    fn test_even_kernel_size_uses_half_as_radius() {
        let params = EnhanceParams {
            kernel_size: 8,
            ..Default::default()
        };
        assert_eq!(params.radius(), 4);
        let params = EnhanceParams {
            kernel_size: 1,
            ..Default::default()
        };
        assert_eq!(params.radius(), 0);
    }

    #[test]
    fn test_out_of_domain_values_are_rejected() {
        let with = |edit: fn(&mut EnhanceParams)| {
            let mut params = EnhanceParams::default();
            edit(&mut params);
            params
        };
        let cases = [
            ("alpha", with(|p| p.alpha = -0.1)),
            ("alpha", with(|p| p.alpha = f32::NAN)),
            ("kernel_size", with(|p| p.kernel_size = 0)),
            ("kernel_size", with(|p| p.kernel_size = 51)),
            ("k", with(|p| p.k = 0)),
            ("local_var_size", with(|p| p.local_var_size = 0)),
            ("threshold", with(|p| p.threshold = 0.0)),
            ("final_weight", with(|p| p.final_weight = 2.5)),
        ];
        for (expected, params) in cases {
            match params.validate() {
                Err(StrataError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("{expected}: expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_clamped_forces_domain() {
        let wild = EnhanceParams {
            alpha: 50.0,
            kernel_size: 0,
            k: 99,
            local_var_size: 0,
            threshold: -1.0,
            final_weight: f32::INFINITY,
            ..Default::default()
        };
        let tamed = wild.clamped();
        assert_eq!(tamed.alpha, ALPHA_MAX);
        assert_eq!(tamed.kernel_size, 1);
        assert_eq!(tamed.k, PASSES_MAX);
        assert_eq!(tamed.local_var_size, 1);
        assert_eq!(tamed.threshold, 2.5);
        assert_eq!(tamed.final_weight, 0.5);
        tamed.validate().unwrap();
    }

    #[test]
    fn test_percentile_policy_must_be_ordered() {
        let policy = RescalePolicy::Percentile {
            low: 60.0,
            high: 40.0,
        };
        assert!(policy.validate().is_err());
        let policy = RescalePolicy::Percentile {
            low: -1.0,
            high: 40.0,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_mean_std_policy_borrows_threshold() {
        let policy = RescalePolicy::MeanStdDev { sigmas: None }.resolve(3.0);
        assert_eq!(policy, RescalePolicy::MeanStdDev { sigmas: Some(3.0) });
        let fixed = RescalePolicy::MeanStdDev { sigmas: Some(1.0) }.resolve(3.0);
        assert_eq!(fixed, RescalePolicy::MeanStdDev { sigmas: Some(1.0) });
    }

    #[test]
    fn test_discriminant_directions_are_opposite() {
        let above = DiscriminantPolicy::KeepOriginalAboveBound;
        let within = DiscriminantPolicy::KeepOriginalWithinBound;
        assert!(above.keeps_original(3.0, 2.0));
        assert!(!above.keeps_original(1.0, 2.0));
        assert!(within.keeps_original(1.0, 2.0));
        assert!(!within.keeps_original(3.0, 2.0));
    }

    #[test]
    fn test_params_deserialize_with_aliases_and_defaults() {
        let json = r#"{ "alpha": 1.5, "iterations": 3, "s": 1.0,
                        "rescale": { "kind": "mean_std_dev" } }"#;
        let params: EnhanceParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.alpha, 1.5);
        assert_eq!(params.k, 3);
        assert_eq!(params.final_weight, 1.0);
        assert_eq!(params.kernel_size, 15);
        assert_eq!(params.rescale, RescalePolicy::MeanStdDev { sigmas: None });
        assert_eq!(params.discriminant, DiscriminantPolicy::KeepOriginalAboveBound);
    }
}

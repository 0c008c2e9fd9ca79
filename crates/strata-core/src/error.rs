/// Errors reported by filter construction and the enhancement pipeline.
///
/// Numerical degeneracies (flat patches, zero variance, collapsed weights)
/// are handled in place and never surface here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrataError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("non-finite sample {value} at ({x}, {y})")]
    NonFiniteSample { x: usize, y: usize, value: f32 },
}

pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch(message.into())
    }
}

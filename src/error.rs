use crate::geometry::ValidationFailure;
use thiserror::Error;

/// Failure taxonomy for overlay work. None of these are surfaced to
/// `update()` callers; each is recovered where it occurs and logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    #[error("geometry unavailable: {0}")]
    GeometryUnavailable(String),
    #[error("implausible geometry for {label}: {reason}")]
    GeometryImplausible {
        label: String,
        reason: ValidationFailure,
    },
    #[error("no on-screen window owned by process {pid}")]
    ElementWindowUnresolvable { pid: u32 },
    #[error("content parser {parser} refused to position: {reason}")]
    ParserRefusal { parser: String, reason: String },
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl OverlayError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::GeometryUnavailable(detail.into())
    }
}

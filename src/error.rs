use crate::captcha::session::SessionError;
use thiserror::Error;

/// A specialized `Result` type for captcha solving operations.
pub type CaptchaResult<T> = Result<T, CaptchaError>;

/// The error type for everything the solver can fail on.
///
/// Variants fall into three groups, see [`CaptchaError::is_retryable`] and
/// [`CaptchaError::is_fatal`]. Anything in neither group is treated as a
/// defect and is never retried.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Asset fetch failed for {url}: {reason}")]
    AssetFetch { url: String, reason: String },

    #[error("Asset '{name}' was never stored for this attempt")]
    AssetMissing { name: String },

    #[error("Asset '{name}' could not be decoded: {reason}")]
    AssetRead { name: String, reason: String },

    #[error("Low-confidence puzzle: sprite slice {slice} classified as '{label}'")]
    ValidationFailure { slice: usize, label: String },

    #[error("Degenerate assignment: only {distinct} distinct positions for 3 sprites")]
    AssignmentDegenerate { distinct: usize },

    #[error("Cannot determine element size from style {style:?}")]
    StyleParse { style: Option<String> },

    #[error("Puzzle element '{what}' did not become available")]
    ElementTimeout { what: String },

    #[error("Answer rejected by server (indicator class {class:?})")]
    Rejected { class: String },

    #[error("Control '{control}' is unavailable: {reason}")]
    InteractionUnavailable { control: String, reason: String },

    #[error("Retry limit of {limit} attempts exceeded, last failure: {last_reason}")]
    RetryLimitExceeded { limit: u32, last_reason: String },

    #[error("Model call failed: {reason}")]
    Model { reason: String },

    #[error("Interactive session failed: {source}")]
    Session {
        #[from]
        source: SessionError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptchaError {
    /// Failures that are handled inside the attempt loop by refreshing the puzzle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CaptchaError::AssetFetch { .. }
                | CaptchaError::AssetRead { .. }
                | CaptchaError::ValidationFailure { .. }
                | CaptchaError::AssignmentDegenerate { .. }
                | CaptchaError::StyleParse { .. }
                | CaptchaError::ElementTimeout { .. }
                | CaptchaError::Rejected { .. }
        )
    }

    /// Failures that end the solve without further attempts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptchaError::InteractionUnavailable { .. } | CaptchaError::RetryLimitExceeded { .. }
        )
    }

    pub fn asset_read(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::AssetRead {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn interaction_unavailable(control: impl Into<String>, reason: impl ToString) -> Self {
        Self::InteractionUnavailable {
            control: control.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let retryable = [
            CaptchaError::AssetFetch {
                url: "u".into(),
                reason: "r".into(),
            },
            CaptchaError::asset_read("captcha.jpg", "truncated"),
            CaptchaError::ValidationFailure {
                slice: 1,
                label: "0".into(),
            },
            CaptchaError::AssignmentDegenerate { distinct: 2 },
            CaptchaError::StyleParse { style: None },
            CaptchaError::ElementTimeout {
                what: "slideBg".into(),
            },
            CaptchaError::Rejected {
                class: "show-fail".into(),
            },
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{err} should be retryable");
            assert!(!err.is_fatal(), "{err} should not be fatal");
        }
    }

    #[test]
    fn test_fatal_kinds() {
        let reload = CaptchaError::interaction_unavailable("reload", "not found");
        let limit = CaptchaError::RetryLimitExceeded {
            limit: 5,
            last_reason: "x".into(),
        };
        assert!(reload.is_fatal() && !reload.is_retryable());
        assert!(limit.is_fatal() && !limit.is_retryable());
    }

    #[test]
    fn test_unexpected_kinds_are_neither() {
        let model = CaptchaError::Model {
            reason: "inference crashed".into(),
        };
        let missing = CaptchaError::AssetMissing {
            name: "sprite.jpg".into(),
        };
        for err in [model, missing] {
            assert!(!err.is_retryable());
            assert!(!err.is_fatal());
        }
    }
}

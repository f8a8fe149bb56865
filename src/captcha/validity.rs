// Sprite sheet sanity check through the external classifier
use super::assets::{AssetStore, PuzzleAsset, encode_png, sprite_slice_name};
use super::config::SolverConfig;
use super::session::ValidityClassifier;
use crate::error::{CaptchaError, CaptchaResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// First slice (1-based) whose label is in the degenerate set
    Degenerate { slice: usize, label: String },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn into_result(self) -> CaptchaResult<()> {
        match self {
            Validity::Valid => Ok(()),
            Validity::Degenerate { slice, label } => {
                Err(CaptchaError::ValidationFailure { slice, label })
            }
        }
    }
}

pub struct SpriteValidator<'a> {
    classifier: &'a dyn ValidityClassifier,
    config: &'a SolverConfig,
}

impl<'a> SpriteValidator<'a> {
    pub fn new(classifier: &'a dyn ValidityClassifier, config: &'a SolverConfig) -> Self {
        Self { classifier, config }
    }

    /// Classify each sprite slice, storing its PNG as `sprite_{i}.png`.
    ///
    /// Stops at the first degenerate slice.
    pub fn check(&self, store: &mut AssetStore, puzzle: &PuzzleAsset) -> CaptchaResult<Validity> {
        for (i, sprite) in puzzle.sprites.iter().enumerate() {
            let slice = i + 1;
            let name = sprite_slice_name(slice);
            let png = encode_png(&name, sprite)?;
            let label = self
                .classifier
                .classify(&png)
                .map_err(|e| CaptchaError::Model {
                    reason: e.to_string(),
                })?;
            store.put(&name, png)?;

            log::debug!("Sprite slice {} classified as '{}'", slice, label);
            if self.config.is_degenerate_label(&label) {
                return Ok(Validity::Degenerate { slice, label });
            }
        }
        Ok(Validity::Valid)
    }
}

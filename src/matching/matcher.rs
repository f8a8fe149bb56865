//! Feature matcher
//!
//! Scores how well a reference sprite matches a candidate region by the share
//! of its descriptors that pass a 2-nearest-neighbour ratio test.

use super::features::{Descriptor, FeatureConfig, FeatureExtractor, Features};
use image::GrayImage;

#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// A match is kept only if nearest < ratio * second nearest
    pub ratio_threshold: f32,
    pub features: FeatureConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: 0.8,
            features: FeatureConfig::default(),
        }
    }
}

/// Result of comparing two images
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    /// good matches / match attempts, 0.0-1.0
    pub score: f32,
    /// Number of matches that passed the ratio test
    pub matched: usize,
}

impl Similarity {
    pub const NONE: Similarity = Similarity {
        score: 0.0,
        matched: 0,
    };
}

pub struct FeatureMatcher {
    extractor: FeatureExtractor,
    ratio_threshold: f32,
}

impl FeatureMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.features),
            ratio_threshold: config.ratio_threshold,
        }
    }

    pub fn extract(&self, image: &GrayImage) -> Features {
        self.extractor.extract(image)
    }

    /// Compare a reference sprite against a candidate region
    pub fn similarity(&self, reference: &GrayImage, candidate: &GrayImage) -> Similarity {
        let reference = self.extract(reference);
        let candidate = self.extract(candidate);
        self.similarity_of(&reference, &candidate)
    }

    /// Compare already extracted feature sets
    ///
    /// Every reference descriptor is one match attempt. An attempt is good
    /// when the candidate set has two neighbours and the nearest passes the
    /// ratio test.
    pub fn similarity_of(&self, reference: &Features, candidate: &Features) -> Similarity {
        if reference.is_empty() || candidate.is_empty() {
            return Similarity::NONE;
        }

        let attempts = reference.descriptors.len();
        let good = reference
            .descriptors
            .iter()
            .filter(|d| match two_nearest(d, &candidate.descriptors) {
                (Some(best), Some(second)) => {
                    (best as f32) < self.ratio_threshold * second as f32
                }
                _ => false,
            })
            .count();

        if good == 0 {
            return Similarity::NONE;
        }
        Similarity {
            score: good as f32 / attempts as f32,
            matched: good,
        }
    }
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// Hamming distances of the nearest and second nearest descriptors
fn two_nearest(query: &Descriptor, pool: &[Descriptor]) -> (Option<u32>, Option<u32>) {
    let mut best: Option<u32> = None;
    let mut second: Option<u32> = None;
    for candidate in pool {
        let d = query.distance(candidate);
        match best {
            Some(b) if d >= b => {
                if second.is_none_or(|s| d < s) {
                    second = Some(d);
                }
            }
            _ => {
                second = best;
                best = Some(d);
            }
        }
    }
    (best, second)
}

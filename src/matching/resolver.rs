//! Sprite-to-region assignment
//!
//! Every detected region is compared against every reference sprite and each
//! sprite keeps a running maximum. This is greedy per sprite, two sprites can
//! land on the same region, which [`AssignmentResolver::validate`] rejects.

use super::features::Features;
use super::matcher::{FeatureMatcher, Similarity};
use super::types::{AssignmentResult, BestMatch, DetectedRegion, MatchScore, SPRITE_COUNT};
use crate::error::{CaptchaError, CaptchaResult};
use image::GrayImage;
use image::imageops;

pub struct AssignmentResolver {
    matcher: FeatureMatcher,
}

impl AssignmentResolver {
    pub fn new(matcher: FeatureMatcher) -> Self {
        Self { matcher }
    }

    /// Scan all regions and validate the per-sprite winners
    pub fn resolve(
        &self,
        background: &GrayImage,
        sprites: &[GrayImage; SPRITE_COUNT],
        regions: &[DetectedRegion],
    ) -> CaptchaResult<AssignmentResult> {
        let best = self.scan(background, sprites, regions);
        Self::validate(best)
    }

    /// Best match per sprite over all regions.
    ///
    /// The first region initialises each sprite's record; later regions
    /// replace it only with a strictly higher similarity.
    pub fn scan(
        &self,
        background: &GrayImage,
        sprites: &[GrayImage; SPRITE_COUNT],
        regions: &[DetectedRegion],
    ) -> [Option<BestMatch>; SPRITE_COUNT] {
        let sprite_features: Vec<Features> =
            sprites.iter().map(|s| self.matcher.extract(s)).collect();
        let mut best: [Option<BestMatch>; SPRITE_COUNT] = [None; SPRITE_COUNT];

        for (region_index, region) in regions.iter().enumerate() {
            let region_features = match region.clamped(background.width(), background.height()) {
                Some((x, y, w, h)) => {
                    let crop = imageops::crop_imm(background, x, y, w, h).to_image();
                    Some(self.matcher.extract(&crop))
                }
                None => {
                    log::debug!("Region {} {:?} is empty after clamping", region_index, region);
                    None
                }
            };

            for (slot, features) in sprite_features.iter().enumerate() {
                let similarity = region_features
                    .as_ref()
                    .map(|rf| self.matcher.similarity_of(features, rf))
                    .unwrap_or(Similarity::NONE);
                let score = MatchScore {
                    sprite_index: slot + 1,
                    region_index,
                    similarity: similarity.score,
                    matched_features: similarity.matched,
                };
                log::debug!(
                    "Sprite {} vs region {}: similarity={:.3} matched={}",
                    score.sprite_index,
                    region_index,
                    score.similarity,
                    score.matched_features
                );

                let replace = match &best[slot] {
                    Some(current) => score.similarity > current.score.similarity,
                    None => true,
                };
                if replace {
                    best[slot] = Some(BestMatch {
                        score,
                        center: region.center(),
                    });
                }
            }
        }

        best
    }

    /// Require a match for every sprite with pairwise distinct centers
    pub fn validate(
        best: [Option<BestMatch>; SPRITE_COUNT],
    ) -> CaptchaResult<AssignmentResult> {
        let mut centers: Vec<(u32, u32)> = best.iter().flatten().map(|m| m.center).collect();
        centers.sort_unstable();
        centers.dedup();
        let distinct = centers.len();

        match best {
            [Some(a), Some(b), Some(c)] if distinct == SPRITE_COUNT => Ok(AssignmentResult {
                matches: [a, b, c],
            }),
            _ => Err(CaptchaError::AssignmentDegenerate { distinct }),
        }
    }
}

impl Default for AssignmentResolver {
    fn default() -> Self {
        Self::new(FeatureMatcher::default())
    }
}

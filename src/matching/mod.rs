//! Visual matching for three-sprite slider puzzles
//!
//! This module provides the pure, I/O-free part of the solver:
//! - Oriented FAST keypoints with binary descriptors
//! - Ratio-test similarity between a sprite and a candidate region
//! - Greedy per-sprite assignment with a distinctness check
//! - Raw pixel to element-relative click offset mapping

pub mod coords;
pub mod features;
pub mod matcher;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;

pub use coords::{CoordinateMapper, background_url_from_style, resolve_rendered_size};
pub use features::{FeatureConfig, FeatureExtractor, Features};
pub use matcher::{FeatureMatcher, MatchConfig, Similarity};
pub use resolver::AssignmentResolver;
pub use types::{
    AssignmentResult, BestMatch, ClickPlan, DetectedRegion, MatchScore, RenderedSize,
    SPRITE_COUNT, ScreenOffset,
};

#[cfg(test)]
pub(crate) mod test_support {
    use image::{GrayImage, Luma};

    /// Deterministic blocks of random intensity
    pub fn block_noise(width: u32, height: u32, block: u32, seed: u64) -> GrayImage {
        let block = block.max(1);
        let cols = width.div_ceil(block) as u64;
        GrayImage::from_fn(width, height, |x, y| {
            let cell = (y / block) as u64 * cols + (x / block) as u64;
            Luma([(mix(seed, cell) >> 56) as u8])
        })
    }

    fn mix(seed: u64, cell: u64) -> u64 {
        let mut z = seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(cell.wrapping_mul(0xBF58_476D_1CE4_E5B9));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Flat background with patterns pasted at the given top-left corners
    pub fn scene(
        width: u32,
        height: u32,
        patches: &[(&GrayImage, u32, u32)],
    ) -> GrayImage {
        let mut canvas = GrayImage::from_pixel(width, height, Luma([128]));
        for (patch, x, y) in patches {
            image::imageops::replace(&mut canvas, *patch, *x as i64, *y as i64);
        }
        canvas
    }
}

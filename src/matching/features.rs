//! Local feature extraction for sprite/region comparison
//!
//! Keypoints come from FAST-9 corners on a small image pyramid, so the same
//! pattern is found when a sprite is rendered at a different scale than its
//! region in the background. Each keypoint gets an orientation from the
//! intensity centroid of its patch and a 256-bit binary descriptor whose
//! sampling pattern is rotated by that orientation.

use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::corners::{Corner, corners_fast9};
use imageproc::filter::gaussian_blur_f32;
use std::sync::OnceLock;

/// Number of 64-bit words in a descriptor
pub const DESCRIPTOR_WORDS: usize = 4;
const DESCRIPTOR_BITS: usize = DESCRIPTOR_WORDS * 64;
const PATTERN_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// FAST intensity threshold
    pub fast_threshold: u8,
    /// Radius of the sampled patch around each keypoint
    pub patch_radius: u32,
    /// Number of pyramid levels, including the base image
    pub pyramid_levels: usize,
    /// Downscale factor between consecutive levels
    pub scale_step: f32,
    /// Keypoints kept per level, strongest first
    pub max_keypoints: usize,
    /// Images with a shorter side are upscaled to this before extraction
    pub min_side: u32,
    /// Smoothing applied before orientation and descriptor sampling
    pub blur_sigma: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            patch_radius: 8,
            pyramid_levels: 3,
            scale_step: 1.25,
            max_keypoints: 150,
            min_side: 64,
            blur_sigma: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Position in the coordinates of the input image
    pub x: f32,
    pub y: f32,
    pub level: usize,
    /// Orientation in radians
    pub angle: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor(pub [u64; DESCRIPTOR_WORDS]);

impl Descriptor {
    /// Hamming distance
    pub fn distance(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Keypoints and their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extract keypoints and descriptors from a grayscale image
    pub fn extract(&self, image: &GrayImage) -> Features {
        let mut features = Features::default();
        if image.width() == 0 || image.height() == 0 {
            return features;
        }

        let base = self.upscale_small(image);
        let upscale = base.width() as f32 / image.width() as f32;
        let radius = self.config.patch_radius;
        let min_level_side = 2 * radius + 1;

        let mut scale = 1.0f32;
        for level in 0..self.config.pyramid_levels.max(1) {
            let level_image = if level == 0 {
                base.clone()
            } else {
                scale *= self.config.scale_step;
                let w = (base.width() as f32 / scale).round() as u32;
                let h = (base.height() as f32 / scale).round() as u32;
                if w < min_level_side || h < min_level_side {
                    break;
                }
                imageops::resize(&base, w, h, FilterType::Triangle)
            };

            let smoothed = if self.config.blur_sigma > 0.0 {
                gaussian_blur_f32(&level_image, self.config.blur_sigma)
            } else {
                level_image.clone()
            };

            for corner in self.detect(&level_image) {
                let angle = orientation(&smoothed, corner.x, corner.y, radius);
                let descriptor = describe(&smoothed, corner.x, corner.y, angle, radius);
                features.keypoints.push(Keypoint {
                    x: corner.x as f32 * scale / upscale,
                    y: corner.y as f32 * scale / upscale,
                    level,
                    angle,
                    score: corner.score,
                });
                features.descriptors.push(descriptor);
            }
        }

        log::trace!(
            "Extracted {} features from {}x{} image",
            features.len(),
            image.width(),
            image.height()
        );
        features
    }

    fn upscale_small(&self, image: &GrayImage) -> GrayImage {
        let short_side = image.width().min(image.height());
        if short_side >= self.config.min_side {
            return image.clone();
        }
        let factor = self.config.min_side as f32 / short_side as f32;
        let w = (image.width() as f32 * factor).ceil() as u32;
        let h = (image.height() as f32 * factor).ceil() as u32;
        imageops::resize(image, w, h, FilterType::Triangle)
    }

    /// FAST corners away from the border, strongest first, with
    /// neighbouring duplicates suppressed
    fn detect(&self, image: &GrayImage) -> Vec<Corner> {
        let r = self.config.patch_radius;
        let (w, h) = image.dimensions();
        let mut corners: Vec<Corner> = corners_fast9(image, self.config.fast_threshold)
            .into_iter()
            .filter(|c| c.x >= r && c.y >= r && c.x + r < w && c.y + r < h)
            .collect();
        corners.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept: Vec<Corner> = Vec::new();
        for corner in corners {
            if kept.len() >= self.config.max_keypoints {
                break;
            }
            let crowded = kept
                .iter()
                .any(|k| k.x.abs_diff(corner.x) <= 1 && k.y.abs_diff(corner.y) <= 1);
            if !crowded {
                kept.push(corner);
            }
        }
        kept
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

/// Intensity-centroid orientation of the circular patch around (cx, cy)
fn orientation(image: &GrayImage, cx: u32, cy: u32, radius: u32) -> f32 {
    let r = radius as i64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let value = sample(image, cx as f32 + dx as f32, cy as f32 + dy as f32) as f64;
            m10 += dx as f64 * value;
            m01 += dy as f64 * value;
        }
    }
    m01.atan2(m10) as f32
}

fn describe(image: &GrayImage, cx: u32, cy: u32, angle: f32, radius: u32) -> Descriptor {
    let (sin, cos) = angle.sin_cos();
    let r = radius as f32;
    let mut words = [0u64; DESCRIPTOR_WORDS];
    for (bit, pair) in sampling_pattern().iter().enumerate() {
        let [(ax, ay), (bx, by)] = *pair;
        let a = sample(
            image,
            cx as f32 + r * (ax * cos - ay * sin),
            cy as f32 + r * (ax * sin + ay * cos),
        );
        let b = sample(
            image,
            cx as f32 + r * (bx * cos - by * sin),
            cy as f32 + r * (bx * sin + by * cos),
        );
        if a < b {
            words[bit / 64] |= 1u64 << (bit % 64);
        }
    }
    Descriptor(words)
}

fn sample(image: &GrayImage, x: f32, y: f32) -> u8 {
    let max_x = image.width().saturating_sub(1) as f32;
    let max_y = image.height().saturating_sub(1) as f32;
    let px = x.round().clamp(0.0, max_x) as u32;
    let py = y.round().clamp(0.0, max_y) as u32;
    image.get_pixel(px, py)[0]
}

/// Fixed point-pair comparisons inside the unit circle, biased towards the center
fn sampling_pattern() -> &'static [[(f32, f32); 2]] {
    static PATTERN: OnceLock<Vec<[(f32, f32); 2]>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut state = PATTERN_SEED;
        let mut point = || loop {
            let x = (unit(&mut state) + unit(&mut state)) - 1.0;
            let y = (unit(&mut state) + unit(&mut state)) - 1.0;
            if x * x + y * y <= 1.0 {
                return (x, y);
            }
        };
        (0..DESCRIPTOR_BITS).map(|_| [point(), point()]).collect()
    })
}

/// Uniform value in [0, 1) from an xorshift64 state
fn unit(state: &mut u64) -> f32 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    (*state >> 40) as f32 / (1u64 << 24) as f32
}

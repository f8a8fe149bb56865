//! Matching data types

use serde::{Deserialize, Serialize};

/// Number of reference sprites in every puzzle.
pub const SPRITE_COUNT: usize = 3;

/// A detector-proposed bounding box in background pixel space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct DetectedRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl DetectedRegion {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer center of the box, the point a sprite click targets
    pub fn center(&self) -> (u32, u32) {
        let mid = |a: u32, b: u32| ((a as u64 + b as u64) / 2) as u32;
        (mid(self.x1, self.x2), mid(self.y1, self.y2))
    }

    /// Clip the box to an image of the given size.
    ///
    /// Returns `(x, y, width, height)`, or `None` if nothing is left.
    pub fn clamped(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (left, right) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (top, bottom) = (self.y1.min(self.y2), self.y1.max(self.y2));
        let x = left.min(width);
        let y = top.min(height);
        let w = right.min(width).saturating_sub(x);
        let h = bottom.min(height).saturating_sub(y);
        if w == 0 || h == 0 {
            None
        } else {
            Some((x, y, w, h))
        }
    }
}

impl From<[u32; 4]> for DetectedRegion {
    fn from(b: [u32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<DetectedRegion> for [u32; 4] {
    fn from(r: DetectedRegion) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// Similarity of one sprite against one region
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchScore {
    /// 1-based sprite number
    pub sprite_index: usize,
    /// 0-based position in the detector output
    pub region_index: usize,
    /// Fraction of ratio-test survivors, 0.0-1.0
    pub similarity: f32,
    pub matched_features: usize,
}

/// Running best score for one sprite
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BestMatch {
    pub score: MatchScore,
    pub center: (u32, u32),
}

/// Winning region center for each of the three sprites, in sprite order.
///
/// Only built once the centers are known to be pairwise distinct.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssignmentResult {
    pub matches: [BestMatch; SPRITE_COUNT],
}

impl AssignmentResult {
    pub fn centers(&self) -> [(u32, u32); SPRITE_COUNT] {
        self.matches.map(|m| m.center)
    }
}

/// Offset from the center of the on-screen background element
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScreenOffset {
    pub dx: f64,
    pub dy: f64,
}

impl ScreenOffset {
    /// Whole-pixel offset, truncated toward zero
    pub fn to_pixels(self) -> (i32, i32) {
        (self.dx.trunc() as i32, self.dy.trunc() as i32)
    }
}

/// Rendered size of the background element
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RenderedSize {
    pub width: f64,
    pub height: f64,
}

/// Click offsets in ascending sprite order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClickPlan {
    pub offsets: [ScreenOffset; SPRITE_COUNT],
}

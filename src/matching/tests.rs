//! Tests for the matching pipeline on synthetic puzzles

use crate::error::CaptchaError;
use crate::matching::test_support::{block_noise, scene};
use crate::matching::{
    AssignmentResolver, CoordinateMapper, DetectedRegion, FeatureMatcher, RenderedSize,
};
use image::{GrayImage, Luma};

const SPRITE: u32 = 48;

fn sprites() -> [GrayImage; 3] {
    [
        block_noise(SPRITE, SPRITE, 6, 101),
        block_noise(SPRITE, SPRITE, 6, 202),
        block_noise(SPRITE, SPRITE, 6, 303),
    ]
}

#[test]
fn test_identical_images_score_high() {
    let matcher = FeatureMatcher::default();
    let image = block_noise(SPRITE, SPRITE, 6, 42);
    let sim = matcher.similarity(&image, &image);

    println!("self similarity: {:.3} ({} matched)", sim.score, sim.matched);
    assert!(sim.score >= 0.6, "Expected >= 0.6, got {:.3}", sim.score);
    assert!(sim.matched > 0);
}

#[test]
fn test_similarity_in_unit_range() {
    let matcher = FeatureMatcher::default();
    let pairs = [
        (block_noise(48, 48, 6, 1), block_noise(48, 48, 6, 2)),
        (block_noise(40, 56, 5, 3), block_noise(64, 32, 8, 4)),
        (block_noise(48, 48, 6, 5), block_noise(48, 48, 6, 5)),
    ];
    for (a, b) in &pairs {
        let sim = matcher.similarity(a, b);
        assert!((0.0..=1.0).contains(&sim.score), "score {}", sim.score);
    }
}

#[test]
fn test_featureless_image_scores_zero() {
    let matcher = FeatureMatcher::default();
    let textured = block_noise(SPRITE, SPRITE, 6, 9);
    let flat = GrayImage::from_pixel(SPRITE, SPRITE, Luma([200]));

    for sim in [
        matcher.similarity(&flat, &textured),
        matcher.similarity(&textured, &flat),
    ] {
        assert_eq!(sim.score, 0.0);
        assert_eq!(sim.matched, 0);
    }
}

#[test]
fn test_same_pattern_beats_other_pattern() {
    let matcher = FeatureMatcher::default();
    let [a, b, _] = sprites();
    let same = matcher.similarity(&a, &a);
    let other = matcher.similarity(&a, &b);
    assert!(
        same.score > other.score,
        "same={:.3} other={:.3}",
        same.score,
        other.score
    );
}

#[test]
fn test_resolver_assigns_unique_regions() {
    let sprites = sprites();
    // Regions are listed out of sprite order on purpose
    let background = scene(
        300,
        200,
        &[
            (&sprites[2], 20, 30),
            (&sprites[0], 120, 110),
            (&sprites[1], 220, 40),
        ],
    );
    let regions = [
        DetectedRegion::new(20, 30, 20 + SPRITE, 30 + SPRITE),
        DetectedRegion::new(120, 110, 120 + SPRITE, 110 + SPRITE),
        DetectedRegion::new(220, 40, 220 + SPRITE, 40 + SPRITE),
    ];

    let resolver = AssignmentResolver::default();
    let result = resolver
        .resolve(&background, &sprites, &regions)
        .expect("distinct regions should resolve");

    assert_eq!(
        result.centers(),
        [
            (120 + SPRITE / 2, 110 + SPRITE / 2),
            (220 + SPRITE / 2, 40 + SPRITE / 2),
            (20 + SPRITE / 2, 30 + SPRITE / 2),
        ]
    );
    assert_eq!(result.matches[0].score.region_index, 1);
    assert_eq!(result.matches[1].score.region_index, 2);
    assert_eq!(result.matches[2].score.region_index, 0);
    for m in &result.matches {
        assert!(m.score.similarity >= 0.6, "weak match {:?}", m.score);
    }
}

#[test]
fn test_resolver_single_region_is_degenerate() {
    let sprites = sprites();
    let background = scene(300, 200, &[(&sprites[0], 100, 100)]);
    let regions = [DetectedRegion::new(100, 100, 100 + SPRITE, 100 + SPRITE)];

    let err = AssignmentResolver::default()
        .resolve(&background, &sprites, &regions)
        .unwrap_err();
    assert!(matches!(err, CaptchaError::AssignmentDegenerate { distinct: 1 }));
}

#[test]
fn test_resolver_no_regions_is_degenerate() {
    let sprites = sprites();
    let background = scene(300, 200, &[]);
    let err = AssignmentResolver::default()
        .resolve(&background, &sprites, &[])
        .unwrap_err();
    assert!(matches!(err, CaptchaError::AssignmentDegenerate { distinct: 0 }));
}

#[test]
fn test_region_outside_background_is_scanned_as_zero() {
    let sprites = sprites();
    let background = scene(100, 100, &[]);
    let regions = [DetectedRegion::new(150, 150, 190, 190)];
    let best = AssignmentResolver::default().scan(&background, &sprites, &regions);
    for b in best.iter().flatten() {
        assert_eq!(b.score.similarity, 0.0);
        assert_eq!(b.center, (170, 170));
    }
    assert!(best.iter().all(Option::is_some));
}

#[test]
fn test_click_plan_follows_sprite_order() {
    let sprites = sprites();
    let background = scene(
        300,
        200,
        &[
            (&sprites[0], 0, 0),
            (&sprites[1], 126, 76),
            (&sprites[2], 252, 152),
        ],
    );
    let regions = [
        DetectedRegion::new(252, 152, 300, 200),
        DetectedRegion::new(0, 0, SPRITE, SPRITE),
        DetectedRegion::new(126, 76, 126 + SPRITE, 76 + SPRITE),
    ];
    let result = AssignmentResolver::default()
        .resolve(&background, &sprites, &regions)
        .unwrap();

    let mapper = CoordinateMapper::new(
        (300, 200),
        RenderedSize {
            width: 150.0,
            height: 100.0,
        },
    );
    let plan = mapper.plan(&result);
    let pixels: Vec<(i32, i32)> = plan.offsets.iter().map(|o| o.to_pixels()).collect();
    // centers (24,24) (150,100) (276,176)
    assert_eq!(pixels, vec![(-63, -38), (0, 0), (63, 38)]);
}

//! Mapping between background raster pixels and on-screen click offsets
//!
//! The puzzle background is rendered scaled inside its element. Clicks are
//! issued relative to the element center, so a raw pixel `(x, y)` maps to
//! `(-width/2 + x/width_raw*width, -height/2 + y/height_raw*height)`.

use super::types::{AssignmentResult, ClickPlan, RenderedSize, ScreenOffset};
use crate::error::{CaptchaError, CaptchaResult};
use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)url\(([^)]+)\)").expect("valid url pattern"))
}

fn width_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)width\s*:\s*([\d.]+)px").expect("valid width pattern"))
}

fn height_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)height\s*:\s*([\d.]+)px").expect("valid height pattern"))
}

/// Extract the background image URL from an inline style
pub fn background_url_from_style(style: Option<&str>) -> CaptchaResult<String> {
    let style_err = || CaptchaError::StyleParse {
        style: style.map(str::to_string),
    };
    let style = style.filter(|s| !s.trim().is_empty()).ok_or_else(style_err)?;
    let caps = url_pattern().captures(style).ok_or_else(style_err)?;
    let url = caps[1].trim().trim_matches('"').trim_matches('\'');
    if url.is_empty() {
        return Err(style_err());
    }
    Ok(url.to_string())
}

/// Parse explicit `width: Npx` and `height: Npx` declarations
pub fn size_from_style(style: &str) -> Option<RenderedSize> {
    let px = |re: &Regex| -> Option<f64> {
        re.captures(style)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|v| *v > 0.0)
    };
    Some(RenderedSize {
        width: px(width_pattern())?,
        height: px(height_pattern())?,
    })
}

/// Rendered element size, preferring the inline style over the measured box
pub fn resolve_rendered_size(
    style: Option<&str>,
    measured: Option<(f64, f64)>,
) -> CaptchaResult<RenderedSize> {
    if let Some(size) = style.and_then(size_from_style) {
        return Ok(size);
    }
    match measured {
        Some((width, height)) if width > 0.0 && height > 0.0 => Ok(RenderedSize { width, height }),
        _ => Err(CaptchaError::StyleParse {
            style: style.map(str::to_string),
        }),
    }
}

/// Converts between raw background pixels and element-relative offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    raw_width: f64,
    raw_height: f64,
    rendered: RenderedSize,
}

impl CoordinateMapper {
    pub fn new(raw_size: (u32, u32), rendered: RenderedSize) -> Self {
        Self {
            raw_width: raw_size.0 as f64,
            raw_height: raw_size.1 as f64,
            rendered,
        }
    }

    pub fn to_screen(&self, x: f64, y: f64) -> ScreenOffset {
        let RenderedSize { width, height } = self.rendered;
        ScreenOffset {
            dx: -width / 2.0 + x * width / self.raw_width,
            dy: -height / 2.0 + y * height / self.raw_height,
        }
    }

    /// Inverse of [`CoordinateMapper::to_screen`]
    pub fn to_raw(&self, offset: ScreenOffset) -> (f64, f64) {
        let RenderedSize { width, height } = self.rendered;
        (
            (offset.dx + width / 2.0) * self.raw_width / width,
            (offset.dy + height / 2.0) * self.raw_height / height,
        )
    }

    pub fn plan(&self, assignment: &AssignmentResult) -> ClickPlan {
        ClickPlan {
            offsets: assignment
                .centers()
                .map(|(x, y)| self.to_screen(x as f64, y as f64)),
        }
    }
}

//! Per-attempt puzzle assets
//!
//! The store holds the raw bytes downloaded for the current attempt and is
//! wiped before every attempt, so nothing decoded later can come from an
//! earlier puzzle. Buffers can optionally be mirrored into a directory to
//! inspect what the solver saw.

use crate::error::{CaptchaError, CaptchaResult};
use crate::matching::SPRITE_COUNT;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

pub const BACKGROUND: &str = "captcha.jpg";
pub const SPRITE_SHEET: &str = "sprite.jpg";

/// Store name of a sprite slice, 1-based
pub fn sprite_slice_name(index: usize) -> String {
    format!("sprite_{index}.png")
}

#[derive(Debug, Default)]
pub struct AssetStore {
    buffers: HashMap<String, Vec<u8>>,
    dump_dir: Option<PathBuf>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write every stored buffer into `dir`
    pub fn with_dump_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            buffers: HashMap::new(),
            dump_dir: Some(dir.into()),
        }
    }

    /// Drop every buffer, including files mirrored on disk
    pub fn clear(&mut self) -> CaptchaResult<()> {
        self.buffers.clear();
        if let Some(dir) = &self.dump_dir
            && dir.exists()
        {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let meta = std::fs::symlink_metadata(&path)?;
                if meta.is_file() || meta.file_type().is_symlink() {
                    std::fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    pub fn put(&mut self, name: &str, bytes: Vec<u8>) -> CaptchaResult<()> {
        if let Some(dir) = &self.dump_dir {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(name), &bytes)?;
        }
        self.buffers.insert(name.to_string(), bytes);
        Ok(())
    }

    pub fn get(&self, name: &str) -> CaptchaResult<&[u8]> {
        self.buffers
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CaptchaError::AssetMissing {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Decoded background plus the three sprite bands of one puzzle
#[derive(Debug, Clone)]
pub struct PuzzleAsset {
    pub background: DynamicImage,
    pub sprites: [DynamicImage; SPRITE_COUNT],
}

impl PuzzleAsset {
    /// Decode the background and sprite sheet held by the store
    pub fn decode(store: &AssetStore) -> CaptchaResult<Self> {
        let background = decode_image(BACKGROUND, store.get(BACKGROUND)?)?;
        let sheet = decode_image(SPRITE_SHEET, store.get(SPRITE_SHEET)?)?;
        let sprites = slice_sprite_sheet(&sheet)?;
        Ok(Self {
            background,
            sprites,
        })
    }

    /// Raw background size `(width, height)`
    pub fn background_size(&self) -> (u32, u32) {
        (self.background.width(), self.background.height())
    }

    pub fn background_gray(&self) -> GrayImage {
        self.background.to_luma8()
    }

    pub fn sprites_gray(&self) -> [GrayImage; SPRITE_COUNT] {
        self.sprites.each_ref().map(DynamicImage::to_luma8)
    }
}

pub fn decode_image(name: &str, bytes: &[u8]) -> CaptchaResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| CaptchaError::asset_read(name, e))
}

/// Split a sprite sheet into three equal-width vertical bands.
///
/// Band `i` covers columns `[i * w/3, (i + 1) * w/3)`, leftover columns are dropped.
pub fn slice_sprite_sheet(sheet: &DynamicImage) -> CaptchaResult<[DynamicImage; SPRITE_COUNT]> {
    let band = sheet.width() / SPRITE_COUNT as u32;
    if band == 0 || sheet.height() == 0 {
        return Err(CaptchaError::asset_read(
            SPRITE_SHEET,
            format!("sprite sheet {}x{} too small to slice", sheet.width(), sheet.height()),
        ));
    }
    Ok(std::array::from_fn(|i| {
        sheet.crop_imm(band * i as u32, 0, band, sheet.height())
    }))
}

/// PNG bytes of an image, the form the classifier consumes
pub fn encode_png(name: &str, image: &DynamicImage) -> CaptchaResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CaptchaError::asset_read(name, e))?;
    Ok(out.into_inner())
}

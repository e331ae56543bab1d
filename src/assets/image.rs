use std::sync::Arc;

use anyhow::Context;

use crate::foundation::{
    core::premultiply_rgba8_in_place,
    error::{ReelError, ReelResult},
};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Build an image from straight-alpha RGBA8 bytes (premultiplies).
    pub fn from_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> ReelResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if rgba8.len() != expected {
            return Err(ReelError::validation(
                "image byte length mismatch with width*height*4",
            ));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8),
        })
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> ReelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Resolves a scene's `image_url` to a decoded image.
///
/// Load failures are reported as [`ReelError::ImageLoad`]; the sequencer
/// absorbs them per scene and renders the placeholder instead.
pub trait ImageSource {
    /// Resolve and decode `url`.
    fn load(&mut self, url: &str) -> ReelResult<PreparedImage>;
}

/// Filesystem-backed image source.
#[derive(Debug, Default)]
pub struct FsImageSource;

impl ImageSource for FsImageSource {
    fn load(&mut self, url: &str) -> ReelResult<PreparedImage> {
        let bytes = std::fs::read(url)
            .map_err(|e| ReelError::image_load(format!("read '{url}': {e}")))?;
        decode_image(&bytes)
            .map_err(|e| ReelError::image_load(format!("decode '{url}': {e}")))
    }
}

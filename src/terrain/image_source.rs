//! Grayscale image sampling for height import, and preview export.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};
use super::heightmap::HeightMatrix;

/// Luminance weights applied to RGB pixels
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

fn rgb_grayscale(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * LUMA_WEIGHTS[0] + g as f32 * LUMA_WEIGHTS[1] + b as f32 * LUMA_WEIGHTS[2]) / 255.0
}

/// A surface that can be read as grayscale at integer pixel coordinates
pub trait GrayscaleSurface {
    fn dimensions(&self) -> (u32, u32);

    /// Grayscale in [0, 1] for an in-bounds pixel
    fn grayscale(&self, px: u32, py: u32) -> f32;

    /// Grayscale at any pixel coordinate; out-of-range coordinates are
    /// clamped to the nearest edge pixel. An empty surface reads as 0.
    fn sample(&self, px: i64, py: i64) -> f32 {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return 0.0;
        }
        let cx = px.clamp(0, width as i64 - 1) as u32;
        let cy = py.clamp(0, height as i64 - 1) as u32;
        self.grayscale(cx, cy)
    }
}

impl<S: GrayscaleSurface + ?Sized> GrayscaleSurface for &S {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn grayscale(&self, px: u32, py: u32) -> f32 {
        (**self).grayscale(px, py)
    }
}

impl GrayscaleSurface for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        GrayImage::dimensions(self)
    }

    fn grayscale(&self, px: u32, py: u32) -> f32 {
        self.get_pixel(px, py).0[0] as f32 / 255.0
    }
}

impl GrayscaleSurface for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn grayscale(&self, px: u32, py: u32) -> f32 {
        let [r, g, b, _] = self.get_pixel(px, py).0;
        rgb_grayscale(r, g, b)
    }
}

impl GrayscaleSurface for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn grayscale(&self, px: u32, py: u32) -> f32 {
        match self {
            DynamicImage::ImageLuma8(gray) => GrayscaleSurface::grayscale(gray, px, py),
            _ => {
                let [r, g, b, _] = self.get_pixel(px, py).0;
                rgb_grayscale(r, g, b)
            }
        }
    }
}

/// Pixel stride along each axis and the multiplier applied to sampled values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightMapScale {
    pub x: f32,
    pub y: f32,
    pub height: f32,
}

impl Default for HeightMapScale {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            height: 1.0,
        }
    }
}

impl HeightMapScale {
    pub fn new(x: f32, y: f32, height: f32) -> TerrainResult<Self> {
        let scale = Self { x, y, height };
        scale.validate()?;
        Ok(scale)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.x.is_finite() && self.y.is_finite() && self.height.is_finite()) {
            return Err(TerrainError::invalid(
                "height_map_scale",
                format!("components must be finite, got {:?}", self),
            ));
        }
        Ok(())
    }
}

/// Image surface paired with the scale used to map grid cells onto it
#[derive(Debug, Clone)]
pub struct ImageSource<S> {
    pub surface: S,
    pub scale: HeightMapScale,
}

impl<S: GrayscaleSurface> ImageSource<S> {
    pub fn new(surface: S, scale: HeightMapScale) -> Self {
        Self { surface, scale }
    }

    /// Pixel addressed by grid cell (x, y): scaled, then truncated toward zero
    pub fn pixel_for(&self, x: usize, y: usize) -> (i64, i64) {
        (
            (x as f32 * self.scale.x) as i64,
            (y as f32 * self.scale.y) as i64,
        )
    }

    /// Height contribution for grid cell (x, y)
    pub fn sample_cell(&self, x: usize, y: usize) -> f32 {
        let (px, py) = self.pixel_for(x, y);
        self.surface.sample(px, py) * self.scale.height
    }
}

pub fn load_height_image(path: impl AsRef<Path>) -> TerrainResult<DynamicImage> {
    let path = path.as_ref();
    log::info!("Loading height map image {}", path.display());
    Ok(image::open(path)?)
}

/// 8-bit preview of a height matrix. Cells are clamped to [0, 1] first.
pub fn export_grayscale(heights: &HeightMatrix) -> GrayImage {
    let (width, height) = heights.dimensions();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let h = heights.get(x as usize, y as usize).clamp(0.0, 1.0);
        Luma([(h * 255.0).round() as u8])
    })
}

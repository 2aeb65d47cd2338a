use std::path::Path;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeightMapError {
    #[error("failed to read height map: {0}")]
    Image(#[from] img::ImageError),
}

/// Scalar elevation over the flat `[0,1)²` parameter domain.
pub trait HeightField {
    /// Sample at `(u, v)`. Coordinates outside the unit square wrap.
    fn sample(&self, u: f32, v: f32) -> f32;
}

/// The unperturbed torus.
#[derive(Debug, Copy, Clone, Default)]
pub struct Flat;

impl HeightField for Flat {
    fn sample(&self, _u: f32, _v: f32) -> f32 {
        0.0
    }
}

/// Any `(u, v) -> height` closure is a height field.
impl<F: Fn(f32, f32) -> f32> HeightField for F {
    fn sample(&self, u: f32, v: f32) -> f32 {
        self(u, v)
    }
}

/// Grayscale image treated as elevation, sampled bilinearly with wraparound
/// on both axes. Texel values map to `[0, 1]`.
pub struct HeightMap {
    pixels: img::GrayImage,
}

impl HeightMap {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HeightMapError> {
        let image = img::open(path.as_ref())?;
        info!(
            "loaded {}x{} height map from {}",
            image.width(),
            image.height(),
            path.as_ref().display()
        );
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: img::DynamicImage) -> Self {
        Self {
            pixels: image.to_luma8(),
        }
    }

    fn texel(&self, x: u32, y: u32) -> f32 {
        let p = self
            .pixels
            .get_pixel(x % self.pixels.width(), y % self.pixels.height());
        p.0[0] as f32 / 255.0
    }
}

impl HeightField for HeightMap {
    fn sample(&self, u: f32, v: f32) -> f32 {
        let (w, h) = self.pixels.dimensions();
        let x = (u - u.floor()) * w as f32;
        let y = (v - v.floor()) * h as f32;

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let x0 = x0 as u32;
        let y0 = y0 as u32;

        let top = self.texel(x0, y0) * (1. - fx) + self.texel(x0 + 1, y0) * fx;
        let bottom = self.texel(x0, y0 + 1) * (1. - fx) + self.texel(x0 + 1, y0 + 1) * fx;
        top * (1. - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn checker() -> HeightMap {
        // 2x2: black/white checkerboard
        let mut image = img::GrayImage::new(2, 2);
        image.put_pixel(0, 0, img::Luma([0]));
        image.put_pixel(1, 0, img::Luma([255]));
        image.put_pixel(0, 1, img::Luma([255]));
        image.put_pixel(1, 1, img::Luma([0]));
        HeightMap::from_image(img::DynamicImage::ImageLuma8(image))
    }

    #[test]
    fn samples_texel_centers() {
        let map = checker();
        assert_relative_eq!(map.sample(0., 0.), 0.);
        assert_relative_eq!(map.sample(0.5, 0.), 1.);
        assert_relative_eq!(map.sample(0., 0.5), 1.);
        assert_relative_eq!(map.sample(0.5, 0.5), 0.);
    }

    #[test]
    fn blends_between_texels() {
        let map = checker();
        assert_relative_eq!(map.sample(0.25, 0.), 0.5, epsilon = 1e-6);
        assert_relative_eq!(map.sample(0.25, 0.25), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn wraps_out_of_range_coordinates() {
        let map = checker();
        assert_relative_eq!(map.sample(1.5, 0.), map.sample(0.5, 0.));
        assert_relative_eq!(map.sample(-0.5, 0.), map.sample(0.5, 0.));
        assert_relative_eq!(map.sample(0.25, 2.25), map.sample(0.25, 0.25));
    }

    #[test]
    fn closures_are_height_fields() {
        let field = |u: f32, v: f32| u + 2. * v;
        assert_relative_eq!(field.sample(0.25, 0.25), 0.75);
    }

    #[test]
    fn flat_is_zero_everywhere() {
        assert_relative_eq!(Flat.sample(0.3, 0.8), 0.);
    }
}

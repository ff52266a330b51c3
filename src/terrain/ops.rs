//! Height generation operations.
//!
//! Every operation follows the same shape: take a working buffer from the
//! store (current heights or zeros, depending on [`BufferMode`]), visit each
//! cell, then commit the whole buffer in one write. [`radial_peak`] and
//! [`reset_terrain`] always start from zeros.

use rand::distr::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};
use super::heightmap::{acquire_working_buffer, BufferMode, HeightStore};
use super::image_source::{GrayscaleSurface, ImageSource};
use super::noise::{NoiseField, NoiseParameters};
use super::parameters::ParameterSet;

/// Bounds of the uniform perturbation added by [`random_perturb`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomRange {
    pub min: f32,
    pub max: f32,
}

impl Default for RandomRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.1 }
    }
}

impl RandomRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Bounds ordered low to high. Reversed bounds are swapped.
    pub fn ordered(&self) -> (f32, f32) {
        if self.min > self.max {
            (self.max, self.min)
        } else {
            (self.min, self.max)
        }
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(TerrainError::invalid(
                "random_range",
                format!("bounds must be finite, got {}..{}", self.min, self.max),
            ));
        }
        let (low, high) = self.ordered();
        if !(high - low).is_finite() {
            return Err(TerrainError::invalid(
                "random_range",
                format!("span of {}..{} overflows", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Single peak with a linear falloff across the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialPeakSpec {
    /// Peak cell along the grid's x axis
    pub x: usize,
    /// Peak cell along the grid's second axis
    pub z: usize,
    pub height: f32,
    /// Distance multiplier; larger values make steeper slopes
    pub falloff: f32,
}

impl Default for RadialPeakSpec {
    fn default() -> Self {
        Self {
            x: 256,
            z: 256,
            height: 0.2,
            falloff: 2.0,
        }
    }
}

impl RadialPeakSpec {
    pub fn new(x: usize, z: usize, height: f32, falloff: f32) -> Self {
        Self {
            x,
            z,
            height,
            falloff,
        }
    }

    /// Check the peak against a grid of the given size
    pub fn validate(&self, width: usize, height: usize) -> TerrainResult<()> {
        if self.x >= width || self.z >= height {
            return Err(TerrainError::invalid(
                "peak_position",
                format!(
                    "({}, {}) lies outside the {}x{} grid",
                    self.x, self.z, width, height
                ),
            ));
        }
        if !(self.falloff.is_finite() && self.falloff > 0.0) {
            return Err(TerrainError::invalid(
                "falloff",
                format!("must be a positive finite number, got {}", self.falloff),
            ));
        }
        if !self.height.is_finite() {
            return Err(TerrainError::invalid("peak_height", "must be finite"));
        }
        Ok(())
    }
}

/// Add a uniform random value from `range` to every cell.
///
/// Reversed bounds are swapped; equal bounds add exactly that value.
pub fn random_perturb<S, R>(
    store: &mut S,
    mode: BufferMode,
    range: RandomRange,
    rng: &mut R,
) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
    R: Rng + ?Sized,
{
    range.validate()?;
    if range.min > range.max {
        log::warn!(
            "Random height range {}..{} is reversed, swapping bounds",
            range.min,
            range.max
        );
    }
    let (low, high) = range.ordered();
    let uniform = if low == high {
        None
    } else {
        let dist = Uniform::new(low, high)
            .map_err(|e| TerrainError::invalid("random_range", e.to_string()))?;
        Some(dist)
    };

    let mut heights = acquire_working_buffer(store, mode);
    let (width, height) = heights.dimensions();

    for y in 0..height {
        for x in 0..width {
            let delta = match &uniform {
                Some(dist) => dist.sample(&mut *rng),
                None => low,
            };
            heights.add(x, y, delta);
        }
    }

    store.write_heights(heights)
}

/// Add one layer of fBM noise to every cell
pub fn single_layer_noise<S>(
    store: &mut S,
    mode: BufferMode,
    field: &NoiseField,
    params: &NoiseParameters,
) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
{
    params.validate()?;

    let mut heights = acquire_working_buffer(store, mode);
    let (width, height) = heights.dimensions();

    for y in 0..height {
        for x in 0..width {
            let delta = field.layer_contribution(params, x, y);
            heights.add(x, y, delta as f32);
        }
    }

    store.write_heights(heights)
}

/// Add the sum of every layer in `layers`, in set order, to every cell
pub fn multi_layer_noise<S>(
    store: &mut S,
    mode: BufferMode,
    field: &NoiseField,
    layers: &ParameterSet,
) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
{
    layers.validate()?;

    let mut heights = acquire_working_buffer(store, mode);
    let (width, height) = heights.dimensions();

    for y in 0..height {
        for x in 0..width {
            let delta: f64 = layers
                .iter()
                .map(|params| field.layer_contribution(params, x, y))
                .sum();
            heights.add(x, y, delta as f32);
        }
    }

    store.write_heights(heights)
}

/// Add scaled image grayscale to every cell.
///
/// Cell (x, y) reads pixel `(trunc(x * scale.x), trunc(y * scale.y))`,
/// clamped to the image bounds. No interpolation between pixels.
pub fn image_sample<S, I>(
    store: &mut S,
    mode: BufferMode,
    source: &ImageSource<I>,
) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
    I: GrayscaleSurface,
{
    source.scale.validate()?;

    let mut heights = acquire_working_buffer(store, mode);
    let (width, height) = heights.dimensions();

    let (img_w, img_h) = source.surface.dimensions();
    let (last_x, last_y) = source.pixel_for(width.saturating_sub(1), height.saturating_sub(1));
    if last_x >= img_w as i64 || last_y >= img_h as i64 || last_x < 0 || last_y < 0 {
        log::debug!(
            "Image sampling reaches pixel ({}, {}) on a {}x{} image, edge pixels will repeat",
            last_x,
            last_y,
            img_w,
            img_h
        );
    }

    for y in 0..height {
        for x in 0..width {
            heights.add(x, y, source.sample_cell(x, y));
        }
    }

    store.write_heights(heights)
}

/// Replace the grid with a single linear peak.
///
/// Always starts from zeros. Each cell gets
/// `peak_height - distance(peak, cell) * falloff / diagonal`, where
/// `diagonal` is the distance from `(0, 0)` to `(width, height)`. The peak
/// cell itself is written last so it holds exactly `peak_height`.
pub fn radial_peak<S>(store: &mut S, spec: &RadialPeakSpec) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
{
    let mut heights = store.blank_heights();
    let (width, height) = heights.dimensions();
    spec.validate(width, height)?;

    let max_distance = ((width * width + height * height) as f32).sqrt();
    let (peak_x, peak_z) = (spec.x as f32, spec.z as f32);

    for y in 0..height {
        for x in 0..width {
            if x == spec.x && y == spec.z {
                continue;
            }
            let dx = peak_x - x as f32;
            let dz = peak_z - y as f32;
            let distance = (dx * dx + dz * dz).sqrt() * spec.falloff;
            heights.set(x, y, spec.height - distance / max_distance);
        }
    }

    heights.set(spec.x, spec.z, spec.height);
    store.write_heights(heights)
}

/// Zero every cell
pub fn reset_terrain<S>(store: &mut S) -> TerrainResult<()>
where
    S: HeightStore + ?Sized,
{
    let heights = store.blank_heights();
    store.write_heights(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::heightmap::{HeightGrid, HeightMatrix};
    use image::{GrayImage, Luma};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn filled_grid(width: usize, height: usize, value: f32) -> HeightGrid {
        let mut grid = HeightGrid::new(width, height).unwrap();
        let mut m = HeightMatrix::zeros(width, height);
        for y in 0..height {
            for x in 0..width {
                m.set(x, y, value);
            }
        }
        grid.write_heights(m).unwrap();
        grid
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut grid = filled_grid(6, 3, 0.7);
        reset_terrain(&mut grid).unwrap();

        let heights = grid.read_heights();
        assert_eq!(heights.dimensions(), (6, 3));
        assert!(heights.values().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_random_perturb_within_range() {
        let mut grid = filled_grid(16, 16, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        random_perturb(
            &mut grid,
            BufferMode::Accumulate,
            RandomRange::new(0.0, 0.1),
            &mut rng,
        )
        .unwrap();

        for &h in grid.read_heights().values() {
            assert!((0.5..0.6 + 1e-6).contains(&h), "Height {} out of range", h);
        }
    }

    #[test]
    fn test_random_perturb_reset_mode_ignores_existing() {
        let mut grid = filled_grid(8, 8, 5.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        random_perturb(&mut grid, BufferMode::Reset, RandomRange::new(0.0, 0.1), &mut rng)
            .unwrap();

        assert!(grid.read_heights().stats().max < 0.1);
    }

    #[test]
    fn test_random_perturb_seeded_is_repeatable() {
        let mut a = HeightGrid::new(10, 10).unwrap();
        let mut b = HeightGrid::new(10, 10).unwrap();

        random_perturb(
            &mut a,
            BufferMode::Accumulate,
            RandomRange::default(),
            &mut ChaCha8Rng::seed_from_u64(99),
        )
        .unwrap();
        random_perturb(
            &mut b,
            BufferMode::Accumulate,
            RandomRange::default(),
            &mut ChaCha8Rng::seed_from_u64(99),
        )
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_random_perturb_equal_bounds_adds_constant() {
        let mut grid = filled_grid(4, 4, 0.25);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        random_perturb(
            &mut grid,
            BufferMode::Accumulate,
            RandomRange::new(0.125, 0.125),
            &mut rng,
        )
        .unwrap();

        assert!(grid.read_heights().values().iter().all(|&h| h == 0.375));
    }

    #[test]
    fn test_random_perturb_swaps_reversed_bounds() {
        let mut grid = HeightGrid::new(8, 8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        random_perturb(
            &mut grid,
            BufferMode::Accumulate,
            RandomRange::new(0.3, 0.2),
            &mut rng,
        )
        .unwrap();

        for &h in grid.read_heights().values() {
            assert!((0.2..0.3).contains(&h), "Height {} outside swapped range", h);
        }
    }

    #[test]
    fn test_random_perturb_rejects_overflowing_span() {
        let mut grid = filled_grid(2, 2, 0.25);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let result = random_perturb(
            &mut grid,
            BufferMode::Accumulate,
            RandomRange::new(-f32::MAX, f32::MAX),
            &mut rng,
        );

        assert!(matches!(
            result,
            Err(TerrainError::InvalidParameter { name: "random_range", .. })
        ));
        assert!(grid.read_heights().values().iter().all(|&h| h == 0.25));
        assert!(RandomRange::new(f32::MAX, -f32::MAX).validate().is_err());
        assert!(RandomRange::new(-1.0e30, 1.0e30).validate().is_ok());
    }

    #[test]
    fn test_single_layer_noise_deterministic() {
        let field = NoiseField::default();
        let params = NoiseParameters::new(0.037, 0.041, 3, 5, 4, 0.5, 0.3).unwrap();

        let mut a = filled_grid(20, 12, 0.1);
        let mut b = filled_grid(20, 12, 0.1);
        single_layer_noise(&mut a, BufferMode::Accumulate, &field, &params).unwrap();
        single_layer_noise(&mut b, BufferMode::Accumulate, &field, &params).unwrap();

        let bits_a: Vec<u32> = a.read_heights().values().iter().map(|h| h.to_bits()).collect();
        let bits_b: Vec<u32> = b.read_heights().values().iter().map(|h| h.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_single_layer_noise_matches_formula() {
        let field = NoiseField::default();
        let params = NoiseParameters::new(0.05, 0.07, 2, -1, 3, 0.5, 0.2).unwrap();
        let mut grid = HeightGrid::new(9, 7).unwrap();

        single_layer_noise(&mut grid, BufferMode::Reset, &field, &params).unwrap();

        for (x, y) in [(0, 0), (4, 3), (8, 6)] {
            let expected = field.fbm(
                (x as f64 + 2.0) * 0.05,
                (y as f64 - 1.0) * 0.07,
                3,
                0.5,
            ) * 0.2;
            assert!((grid.get(x, y) - expected as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn test_single_layer_noise_accumulates() {
        let field = NoiseField::default();
        let params = NoiseParameters::new(0.05, 0.05, 0, 0, 2, 0.5, 0.2).unwrap();

        let mut base = HeightGrid::new(8, 8).unwrap();
        single_layer_noise(&mut base, BufferMode::Reset, &field, &params).unwrap();

        let mut raised = filled_grid(8, 8, 1.0);
        single_layer_noise(&mut raised, BufferMode::Accumulate, &field, &params).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                assert!((raised.get(x, y) - (base.get(x, y) + 1.0)).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_multi_layer_single_entry_equals_single_layer() {
        let field = NoiseField::new(42);
        let params = NoiseParameters::new(0.023, 0.019, 4, 9, 5, 0.6, 0.15).unwrap();
        let set = ParameterSet::from_parameters(vec![params.clone()]).unwrap();

        let mut single = filled_grid(17, 11, 0.2);
        let mut multi = filled_grid(17, 11, 0.2);
        single_layer_noise(&mut single, BufferMode::Accumulate, &field, &params).unwrap();
        multi_layer_noise(&mut multi, BufferMode::Accumulate, &field, &set).unwrap();

        assert_eq!(single, multi);
    }

    #[test]
    fn test_multi_layer_sums_layers() {
        let field = NoiseField::default();
        let a = NoiseParameters::new(0.03, 0.03, 0, 0, 2, 0.5, 0.1).unwrap();
        let b = NoiseParameters::new(0.11, 0.07, 5, 5, 3, 0.4, 0.05).unwrap();
        let set = ParameterSet::from_parameters(vec![a.clone(), b.clone()]).unwrap();

        let mut grid = HeightGrid::new(10, 10).unwrap();
        multi_layer_noise(&mut grid, BufferMode::Reset, &field, &set).unwrap();

        for (x, y) in [(0, 0), (3, 7), (9, 9)] {
            let expected = field.layer_contribution(&a, x, y) + field.layer_contribution(&b, x, y);
            assert!((grid.get(x, y) - expected as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_noise_leaves_grid_untouched() {
        let field = NoiseField::default();
        let mut grid = filled_grid(4, 4, 0.3);
        let bad = NoiseParameters {
            octaves: 0,
            ..Default::default()
        };

        assert!(single_layer_noise(&mut grid, BufferMode::Reset, &field, &bad).is_err());
        assert!(grid.read_heights().values().iter().all(|&h| h == 0.3));
    }

    #[test]
    fn test_image_sample_adds_scaled_pixels() {
        let img = GrayImage::from_fn(4, 4, |x, y| Luma([((x + y) * 30) as u8]));
        let source = ImageSource::new(img, Default::default());
        let mut grid = filled_grid(4, 4, 0.1);

        image_sample(&mut grid, BufferMode::Accumulate, &source).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                let expected = 0.1 + ((x + y) * 30) as f32 / 255.0;
                assert!((grid.get(x, y) - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_image_sample_clamps_past_edge() {
        let img = GrayImage::from_fn(2, 2, |x, _| Luma([if x == 1 { 255 } else { 0 }]));
        let scale = crate::terrain::HeightMapScale::new(3.0, 3.0, 0.5).unwrap();
        let source = ImageSource::new(img, scale);
        let mut grid = HeightGrid::new(3, 3).unwrap();

        image_sample(&mut grid, BufferMode::Reset, &source).unwrap();

        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(1, 0), 0.5);
        assert_eq!(grid.get(2, 2), 0.5);
    }

    #[test]
    fn test_radial_peak_example_grid() {
        let mut grid = filled_grid(4, 4, 0.9);
        radial_peak(&mut grid, &RadialPeakSpec::new(1, 1, 0.2, 2.0)).unwrap();

        assert_eq!(grid.get(1, 1), 0.2);

        let diagonal = (32.0f32).sqrt();
        let expected = 0.2 - (8.0f32).sqrt() * 2.0 / diagonal;
        assert!((grid.get(3, 3) - expected).abs() < 1e-6);
        assert!((grid.get(3, 3) - (-0.8)).abs() < 1e-5);
    }

    #[test]
    fn test_radial_peak_ignores_existing_heights() {
        let spec = RadialPeakSpec::new(2, 3, 0.6, 1.5);

        let mut a = HeightGrid::new(7, 5).unwrap();
        let mut b = filled_grid(7, 5, 3.0);
        radial_peak(&mut a, &spec).unwrap();
        radial_peak(&mut b, &spec).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_radial_peak_monotonic_falloff() {
        let spec = RadialPeakSpec::new(5, 2, 0.8, 3.0);
        let mut grid = HeightGrid::new(12, 9).unwrap();
        radial_peak(&mut grid, &spec).unwrap();

        let mut cells: Vec<(f32, f32)> = Vec::new();
        for y in 0..9 {
            for x in 0..12 {
                let dx = x as f32 - 5.0;
                let dz = y as f32 - 2.0;
                cells.push(((dx * dx + dz * dz).sqrt(), grid.get(x, y)));
            }
        }
        cells.sort_by(|a, b| a.0.total_cmp(&b.0));

        for pair in cells.windows(2) {
            let (d0, h0) = pair[0];
            let (d1, h1) = pair[1];
            if d1 > d0 {
                assert!(h1 <= h0, "Height rose from {} to {} as distance grew", h0, h1);
            } else {
                assert_eq!(h0, h1);
            }
        }
    }

    #[test]
    fn test_radial_peak_exact_at_any_position() {
        for (w, h, px, pz, falloff) in [(1, 1, 0, 0, 1.0), (5, 9, 4, 8, 0.3), (33, 2, 16, 1, 50.0)] {
            let mut grid = HeightGrid::new(w, h).unwrap();
            radial_peak(&mut grid, &RadialPeakSpec::new(px, pz, 0.37, falloff)).unwrap();
            assert_eq!(grid.get(px, pz), 0.37);
        }
    }

    #[test]
    fn test_radial_peak_outside_grid_rejected() {
        let mut grid = filled_grid(4, 4, 0.5);
        assert!(radial_peak(&mut grid, &RadialPeakSpec::new(4, 0, 0.2, 2.0)).is_err());
        assert!(radial_peak(&mut grid, &RadialPeakSpec::new(1, 1, 0.2, 0.0)).is_err());
        assert!(grid.read_heights().values().iter().all(|&h| h == 0.5));
    }
}

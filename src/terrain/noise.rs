use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};

/// Seed of the Perlin permutation table used when none is configured
pub const DEFAULT_NOISE_SEED: u32 = 0;

/// Parameters for one layer of fractal noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    /// Spatial frequency along x (higher = smaller features)
    /// Typical range: 0.001 - 0.05
    pub x_scale: f64,

    /// Spatial frequency along y
    pub y_scale: f64,

    /// Phase shift along x, in grid cells
    pub x_offset: i32,

    /// Phase shift along y, in grid cells
    pub y_offset: i32,

    /// Number of octaves to sum (more = more detail)
    pub octaves: u32,

    /// Amplitude multiplier applied per octave
    pub persistence: f64,

    /// Multiplier applied to the fBM sum before it is added to a cell
    pub height_scale: f64,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            x_scale: 0.01,
            y_scale: 0.01,
            x_offset: 0,
            y_offset: 0,
            octaves: 3,
            persistence: 8.0,
            height_scale: 0.09,
        }
    }
}

impl NoiseParameters {
    /// Create a validated noise layer
    pub fn new(
        x_scale: f64,
        y_scale: f64,
        x_offset: i32,
        y_offset: i32,
        octaves: u32,
        persistence: f64,
        height_scale: f64,
    ) -> TerrainResult<Self> {
        let params = Self {
            x_scale,
            y_scale,
            x_offset,
            y_offset,
            octaves,
            persistence,
            height_scale,
        };
        params.validate()?;
        Ok(params)
    }

    /// Same layer with a different phase shift
    pub fn with_offset(mut self, x_offset: i32, y_offset: i32) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Reject values that would make the fBM sum degenerate or NaN
    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.x_scale.is_finite() && self.x_scale > 0.0) {
            return Err(TerrainError::invalid(
                "x_scale",
                format!("must be a positive finite number, got {}", self.x_scale),
            ));
        }
        if !(self.y_scale.is_finite() && self.y_scale > 0.0) {
            return Err(TerrainError::invalid(
                "y_scale",
                format!("must be a positive finite number, got {}", self.y_scale),
            ));
        }
        if self.octaves < 1 {
            return Err(TerrainError::invalid("octaves", "must be at least 1"));
        }
        if !self.persistence.is_finite() {
            return Err(TerrainError::invalid("persistence", "must be finite"));
        }
        if !self.height_scale.is_finite() {
            return Err(TerrainError::invalid("height_scale", "must be finite"));
        }
        Ok(())
    }
}

/// Coherent noise field evaluated with fractional Brownian motion (fBM).
///
/// Stateless once built: the permutation table is fixed by the seed, so the
/// same coordinates always produce the same value.
#[derive(Clone)]
pub struct NoiseField {
    perlin: Perlin,
    seed: u32,
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").field("seed", &self.seed).finish()
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_SEED)
    }
}

impl NoiseField {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Single Perlin sample remapped from [-1, 1] to [0, 1]
    pub fn noise2d(&self, x: f64, y: f64) -> f64 {
        (self.perlin.get([x, y]) + 1.0) * 0.5
    }

    /// Sum of `octaves` samples, doubling frequency and scaling amplitude by
    /// `persistence` at each step. The sum is not normalized.
    pub fn fbm(&self, x: f64, y: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;

        for _ in 0..octaves {
            total += self.noise2d(x * frequency, y * frequency) * amplitude;
            frequency *= 2.0;
            amplitude *= persistence;
        }

        total
    }

    /// Height contribution of one noise layer at grid cell (x, y)
    pub fn layer_contribution(&self, params: &NoiseParameters, x: usize, y: usize) -> f64 {
        let nx = (x as f64 + params.x_offset as f64) * params.x_scale;
        let ny = (y as f64 + params.y_offset as f64) * params.y_scale;

        self.fbm(nx, ny, params.octaves, params.persistence) * params.height_scale
    }
}

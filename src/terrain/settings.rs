//! JSON settings describing a grid and the operations to run on it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};
use super::executor::{TerrainExecutor, TerrainOperation};
use super::heightmap::{BufferMode, HeightGrid};
use super::noise::{NoiseField, DEFAULT_NOISE_SEED};

/// Terrain generation settings, usually read from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Grid cells along x
    pub width: usize,

    /// Grid cells along y
    pub height: usize,

    /// Start every operation from a zero grid instead of the current heights
    pub reset_terrain: bool,

    /// Seed for random perturbation; `None` draws one from the OS
    pub seed: Option<u64>,

    /// Seed of the Perlin permutation table
    pub noise_seed: u32,

    /// Operations applied in order
    pub operations: Vec<TerrainOperation>,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            width: 513,
            height: 513,
            reset_terrain: false,
            seed: None,
            noise_seed: DEFAULT_NOISE_SEED,
            operations: Vec::new(),
        }
    }
}

impl TerrainSettings {
    pub fn from_json_str(json: &str) -> TerrainResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let path = path.as_ref();
        log::info!("Loading terrain settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> TerrainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check grid size and every operation's parameters
    pub fn validate(&self) -> TerrainResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::invalid(
                "dimensions",
                format!("grid must be at least 1x1, got {}x{}", self.width, self.height),
            ));
        }

        for operation in &self.operations {
            match operation {
                TerrainOperation::Random { range } => range.validate()?,
                TerrainOperation::Perlin { params } => params.validate()?,
                TerrainOperation::MultiplePerlin { layers } => layers.validate()?,
                TerrainOperation::LoadHeightMap { scale, .. } => scale.validate()?,
                TerrainOperation::Voronoi { peak } => peak.validate(self.width, self.height)?,
                TerrainOperation::Reset => {}
            }
        }

        Ok(())
    }

    pub fn buffer_mode(&self) -> BufferMode {
        BufferMode::from_reset_flag(self.reset_terrain)
    }

    pub fn executor(&self) -> TerrainExecutor {
        let noise = NoiseField::new(self.noise_seed);
        match self.seed {
            Some(seed) => TerrainExecutor::with_seed(self.buffer_mode(), noise, seed),
            None => TerrainExecutor::new(self.buffer_mode(), noise),
        }
    }

    /// Build a fresh grid and run every configured operation on it
    pub fn generate(&self) -> TerrainResult<HeightGrid> {
        self.validate()?;
        let mut grid = HeightGrid::new(self.width, self.height)?;
        self.executor().execute_all(&mut grid, &self.operations)?;
        Ok(grid)
    }
}

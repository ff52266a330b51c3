// 地形操作执行器
//
// 按顺序执行地形操作，修改高度图数据

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::error::TerrainResult;
use super::heightmap::{BufferMode, HeightStore};
use super::image_source::{load_height_image, HeightMapScale, ImageSource};
use super::noise::{NoiseField, NoiseParameters};
use super::ops::{self, RadialPeakSpec, RandomRange};
use super::parameters::ParameterSet;

/// 地形操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TerrainOperation {
    /// 随机扰动
    Random {
        #[serde(default)]
        range: RandomRange,
    },
    /// 单层 Perlin 噪声
    Perlin {
        #[serde(default)]
        params: NoiseParameters,
    },
    /// 多层 Perlin 噪声
    MultiplePerlin {
        #[serde(default)]
        layers: ParameterSet,
    },
    /// 从图片加载高度
    LoadHeightMap {
        path: PathBuf,
        #[serde(default)]
        scale: HeightMapScale,
    },
    /// 单峰径向衰减（总是覆盖现有高度）
    Voronoi {
        #[serde(default)]
        peak: RadialPeakSpec,
    },
    /// 清零
    Reset,
}

impl TerrainOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random { .. } => "Random",
            Self::Perlin { .. } => "Perlin",
            Self::MultiplePerlin { .. } => "MultiplePerlin",
            Self::LoadHeightMap { .. } => "LoadHeightMap",
            Self::Voronoi { .. } => "Voronoi",
            Self::Reset => "Reset",
        }
    }
}

/// 操作执行器
///
/// Holds everything an operation needs besides the grid itself: the
/// accumulate/reset choice, the noise field and the random source.
pub struct TerrainExecutor {
    mode: BufferMode,
    noise: NoiseField,
    rng: StdRng,
}

impl TerrainExecutor {
    /// Executor with an OS-seeded random source
    pub fn new(mode: BufferMode, noise: NoiseField) -> Self {
        Self {
            mode,
            noise,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Executor whose random operations are reproducible
    pub fn with_seed(mode: BufferMode, noise: NoiseField, seed: u64) -> Self {
        Self {
            mode,
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BufferMode) {
        self.mode = mode;
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Run a list of operations in order, stopping at the first failure
    pub fn execute_all<S>(&mut self, store: &mut S, operations: &[TerrainOperation]) -> TerrainResult<()>
    where
        S: HeightStore + ?Sized,
    {
        log::info!(
            "Executing {} terrain operations on {}x{} grid ({:?})",
            operations.len(),
            store.width(),
            store.height(),
            self.mode
        );

        for (idx, operation) in operations.iter().enumerate() {
            log::debug!("  [{}] {}", idx + 1, operation.name());
            self.execute(store, operation)?;
        }

        Ok(())
    }

    /// 执行单个操作
    pub fn execute<S>(&mut self, store: &mut S, operation: &TerrainOperation) -> TerrainResult<()>
    where
        S: HeightStore + ?Sized,
    {
        match operation {
            TerrainOperation::Random { range } => {
                ops::random_perturb(store, self.mode, *range, &mut self.rng)
            }

            TerrainOperation::Perlin { params } => {
                ops::single_layer_noise(store, self.mode, &self.noise, params)
            }

            TerrainOperation::MultiplePerlin { layers } => {
                ops::multi_layer_noise(store, self.mode, &self.noise, layers)
            }

            TerrainOperation::LoadHeightMap { path, scale } => {
                let image = load_height_image(path)?;
                let source = ImageSource::new(image, *scale);
                ops::image_sample(store, self.mode, &source)
            }

            TerrainOperation::Voronoi { peak } => ops::radial_peak(store, peak),

            TerrainOperation::Reset => ops::reset_terrain(store),
        }
    }
}

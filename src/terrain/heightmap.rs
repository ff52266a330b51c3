// 高度图存储
//
// HeightMatrix 是按行存储的高度值，HeightGrid 持有一个固定尺寸的矩阵。
// 所有生成操作都通过 HeightStore 读写，先取得工作缓冲区，最后整体提交。

use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};

/// Row-major elevation matrix, indexed as `(x, y)` with `x` in `[0, width)`.
///
/// Values are nominally normalized to [0, 1] but nothing here enforces it:
/// additive operations can push cells outside that range, and it is up to the
/// consumer to [`clamp`](HeightMatrix::clamped) before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMatrix {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightMatrix {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    /// Build from rows, `rows[y][x]`. Every row must have the same non-zero length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> TerrainResult<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(TerrainError::invalid("rows", "matrix must not be empty"));
        }

        let mut values = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TerrainError::invalid(
                    "rows",
                    format!("row {} has {} cells, expected {}", y, row.len(), width),
                ));
            }
            values.extend(row);
        }

        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({}, {}) outside {}x{} matrix",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// # Panics
    /// If `(x, y)` lies outside the matrix.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let i = self.index(x, y);
        self.values[i] = value;
    }

    pub fn add(&mut self, x: usize, y: usize, delta: f32) {
        let i = self.index(x, y);
        self.values[i] += delta;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.width.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }

    /// Copy with every cell clamped to [0, 1]
    pub fn clamped(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            values: self.values.iter().map(|h| h.clamp(0.0, 1.0)).collect(),
        }
    }

    pub fn stats(&self) -> HeightStats {
        if self.values.is_empty() {
            return HeightStats::default();
        }

        let min = self.values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f64 = self.values.iter().map(|&h| h as f64).sum();
        let out_of_range = self
            .values
            .iter()
            .filter(|h| !(0.0..=1.0).contains(*h))
            .count();

        HeightStats {
            min,
            max,
            mean: (sum / self.values.len() as f64) as f32,
            out_of_range,
        }
    }
}

/// Summary of a height matrix
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeightStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Cells outside [0, 1]
    pub out_of_range: usize,
}

/// Storage that terrain operations read from and commit to.
pub trait HeightStore {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Snapshot of the current heights. Never aliases the store.
    fn read_heights(&self) -> HeightMatrix;

    /// Replace every cell. Fails with [`TerrainError::DimensionMismatch`] and
    /// leaves the store untouched if the matrix shape differs.
    fn write_heights(&mut self, heights: HeightMatrix) -> TerrainResult<()>;

    /// Zero-filled matrix matching the store's dimensions
    fn blank_heights(&self) -> HeightMatrix {
        HeightMatrix::zeros(self.width(), self.height())
    }
}

/// In-memory height grid with fixed dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    heights: HeightMatrix,
}

impl HeightGrid {
    /// Zero-filled grid. Both dimensions must be positive.
    pub fn new(width: usize, height: usize) -> TerrainResult<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::invalid(
                "dimensions",
                format!("grid must be at least 1x1, got {}x{}", width, height),
            ));
        }
        Ok(Self {
            heights: HeightMatrix::zeros(width, height),
        })
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.heights.get(x, y)
    }

    /// Borrowed view of the current heights
    pub fn heights(&self) -> &HeightMatrix {
        &self.heights
    }
}

impl HeightStore for HeightGrid {
    fn width(&self) -> usize {
        self.heights.width()
    }

    fn height(&self) -> usize {
        self.heights.height()
    }

    fn read_heights(&self) -> HeightMatrix {
        self.heights.clone()
    }

    fn write_heights(&mut self, heights: HeightMatrix) -> TerrainResult<()> {
        if heights.dimensions() != self.heights.dimensions() {
            return Err(TerrainError::DimensionMismatch {
                expected_width: self.heights.width(),
                expected_height: self.heights.height(),
                width: heights.width(),
                height: heights.height(),
            });
        }
        self.heights = heights;
        Ok(())
    }
}

/// 工作缓冲区模式：在现有高度上叠加，或从全零开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// Start from the store's current heights
    #[default]
    Accumulate,
    /// Start from a zero-filled matrix
    Reset,
}

impl BufferMode {
    pub fn from_reset_flag(reset_terrain: bool) -> Self {
        if reset_terrain {
            Self::Reset
        } else {
            Self::Accumulate
        }
    }
}

/// 取得工作缓冲区
pub fn acquire_working_buffer<S: HeightStore + ?Sized>(store: &S, mode: BufferMode) -> HeightMatrix {
    match mode {
        BufferMode::Accumulate => store.read_heights(),
        BufferMode::Reset => store.blank_heights(),
    }
}

//! Ordered noise layers consumed by the multi-layer noise operation.

use serde::{Deserialize, Serialize};

use super::error::{TerrainError, TerrainResult};
use super::noise::NoiseParameters;

/// One row of the layer table: parameters plus a pending-removal flag
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoiseLayer {
    #[serde(flatten)]
    pub params: NoiseParameters,
    /// Dropped by the next [`ParameterSet::compact`]
    #[serde(default)]
    pub remove: bool,
}

impl From<NoiseParameters> for NoiseLayer {
    fn from(params: NoiseParameters) -> Self {
        Self {
            params,
            remove: false,
        }
    }
}

/// Non-empty, ordered list of noise layers.
///
/// Layers are applied in list order. Removal is two-phase: flag entries with
/// [`mark_for_removal`](Self::mark_for_removal), then [`compact`](Self::compact).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NoiseLayer>", into = "Vec<NoiseLayer>")]
pub struct ParameterSet {
    layers: Vec<NoiseLayer>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSet {
    /// Set holding one default layer
    pub fn new() -> Self {
        Self {
            layers: vec![NoiseLayer::default()],
        }
    }

    /// Validated set from explicit layers. Fails on an empty list or any invalid layer.
    pub fn from_layers(layers: Vec<NoiseLayer>) -> TerrainResult<Self> {
        if layers.is_empty() {
            return Err(TerrainError::invalid(
                "layers",
                "parameter set needs at least one layer",
            ));
        }
        for layer in &layers {
            layer.params.validate()?;
        }
        Ok(Self { layers })
    }

    pub fn from_parameters(params: Vec<NoiseParameters>) -> TerrainResult<Self> {
        Self::from_layers(params.into_iter().map(NoiseLayer::from).collect())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false for a set built through this API; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[NoiseLayer] {
        &self.layers
    }

    /// Parameters in application order
    pub fn iter(&self) -> impl Iterator<Item = &NoiseParameters> {
        self.layers.iter().map(|layer| &layer.params)
    }

    pub fn get_mut(&mut self, index: usize) -> TerrainResult<&mut NoiseLayer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(TerrainError::IndexOutOfRange { index, len })
    }

    pub fn mark_for_removal(&mut self, index: usize, remove: bool) -> TerrainResult<()> {
        self.get_mut(index)?.remove = remove;
        Ok(())
    }

    /// Append one default layer
    pub fn append(&mut self) {
        self.layers.push(NoiseLayer::default());
    }

    /// Drop every flagged layer. If that would empty the set, the original
    /// first layer is kept.
    ///
    /// The kept layer is restored as it was, `remove` flag included: it stays
    /// flagged, so a later `compact` drops it once any unflagged layer exists
    /// (for example after [`append`](Self::append)). Clear the flag with
    /// [`mark_for_removal`](Self::mark_for_removal) to keep it.
    pub fn compact(&mut self) {
        let Some(first) = self.layers.first().cloned() else {
            return;
        };

        let before = self.layers.len();
        self.layers.retain(|layer| !layer.remove);

        if self.layers.is_empty() {
            log::debug!("All {} noise layers flagged, keeping the first", before);
            self.layers.push(first);
        }
    }

    pub fn validate(&self) -> TerrainResult<()> {
        if self.layers.is_empty() {
            return Err(TerrainError::invalid(
                "layers",
                "parameter set needs at least one layer",
            ));
        }
        self.layers.iter().try_for_each(|layer| layer.params.validate())
    }
}

impl TryFrom<Vec<NoiseLayer>> for ParameterSet {
    type Error = TerrainError;

    fn try_from(layers: Vec<NoiseLayer>) -> Result<Self, Self::Error> {
        Self::from_layers(layers)
    }
}

impl From<ParameterSet> for Vec<NoiseLayer> {
    fn from(set: ParameterSet) -> Self {
        set.layers
    }
}

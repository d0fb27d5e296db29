use std::fmt;

use crate::error::{GalleryError, check_dim};
use crate::feature::{Feature, FeatureId};

/// Identifier of an [`Entity`]. Allocated by [`EntityTable`], starting at 1.
pub type EntityId = u32;

/// An enrolled identity: the features it owns plus per-dimension
/// statistics over them.
///
/// Statistics are recomputed wholesale on every call and must be computed
/// in order: [`Entity::calculate_mean`] first, then
/// [`Entity::calculate_std`]. An entity without features keeps empty
/// statistics and cannot be used for normalization.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,

    /// Display label (e.g. the name of the enrollment source).
    pub name: String,

    feature_ids: Vec<FeatureId>,
    mean: Vec<f32>,
    stddev: Vec<f32>,
}

impl Entity {
    fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            feature_ids: Vec::new(),
            mean: Vec::new(),
            stddev: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Records ownership of a feature.
    pub fn add_feature(&mut self, id: FeatureId) {
        self.feature_ids.push(id);
    }

    /// Ids of the owned features, in insertion order.
    pub fn feature_ids(&self) -> &[FeatureId] {
        &self.feature_ids
    }

    /// Per-dimension mean. Empty until computed.
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Per-dimension population standard deviation. Empty until computed.
    pub fn stddev(&self) -> &[f32] {
        &self.stddev
    }

    /// True once both mean and stddev are available.
    pub fn has_stats(&self) -> bool {
        !self.mean.is_empty() && !self.stddev.is_empty()
    }

    /// Computes the per-dimension mean of `features`.
    ///
    /// `features` must be this entity's own features. Does nothing when it
    /// is empty.
    pub fn calculate_mean(&mut self, features: &[Feature]) -> Result<(), GalleryError> {
        let Some(first) = features.first() else {
            return Ok(());
        };
        let dim = first.len();

        let mut sums = vec![0.0f64; dim];
        for f in features {
            check_dim(dim, f.len())?;
            for (s, &v) in sums.iter_mut().zip(&f.values) {
                *s += v as f64;
            }
        }

        let n = features.len() as f64;
        self.mean = sums.into_iter().map(|s| (s / n) as f32).collect();
        Ok(())
    }

    /// Computes the per-dimension standard deviation of `features` around
    /// the current mean.
    pub fn calculate_std(&mut self, features: &[Feature]) -> Result<(), GalleryError> {
        if features.is_empty() {
            return Ok(());
        }
        if self.mean.is_empty() {
            return Err(GalleryError::StatsNotComputed(self.id));
        }
        let dim = self.mean.len();

        let mut sums = vec![0.0f64; dim];
        for f in features {
            check_dim(dim, f.len())?;
            for ((s, &v), &m) in sums.iter_mut().zip(&f.values).zip(&self.mean) {
                let diff = (v - m) as f64;
                *s += diff * diff;
            }
        }

        let n = features.len() as f64;
        self.stddev = sums.into_iter().map(|s| (s / n).sqrt() as f32).collect();
        Ok(())
    }

    /// Maps `values` into this entity's statistical space:
    /// `mean[i] + values[i] * stddev[i]`.
    pub fn remap(&self, values: &[f32]) -> Result<Vec<f32>, GalleryError> {
        self.check_remap(values.len())?;
        Ok(values
            .iter()
            .zip(&self.mean)
            .zip(&self.stddev)
            .map(|((v, m), s)| m + v * s)
            .collect())
    }

    /// In-place variant of [`Entity::remap`].
    pub fn remap_in_place(&self, values: &mut [f32]) -> Result<(), GalleryError> {
        self.check_remap(values.len())?;
        for ((v, m), s) in values.iter_mut().zip(&self.mean).zip(&self.stddev) {
            *v = *v * s + m;
        }
        Ok(())
    }

    fn check_remap(&self, len: usize) -> Result<(), GalleryError> {
        if !self.has_stats() {
            return Err(GalleryError::StatsNotComputed(self.id));
        }
        check_dim(self.mean.len(), len)
    }

    /// Average of the mean vector's components, or `None` before
    /// [`Entity::calculate_mean`].
    pub fn mean_of_means(&self) -> Option<f32> {
        average(&self.mean)
    }

    /// Average of the stddev vector's components, or `None` before
    /// [`Entity::calculate_std`].
    pub fn mean_of_stds(&self) -> Option<f32> {
        average(&self.stddev)
    }
}

fn average(v: &[f32]) -> Option<f32> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().map(|&x| x as f64).sum();
    Some((sum / v.len() as f64) as f32)
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {})", self.name, self.id)
    }
}

/// Arena of entities addressed by [`EntityId`].
///
/// Features refer to their owner by id and resolve it here, so entities can
/// be rebuilt or moved without leaving dangling references.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entities: Vec<Entity>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entity with the next free id and returns that id.
    pub fn create(&mut self, name: impl Into<String>) -> Result<EntityId, GalleryError> {
        let id = id_for_slot(self.entities.len())?;
        self.entities.push(Entity::new(id, name.into()));
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = id.checked_sub(1)? as usize;
        self.entities.get(slot)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = id.checked_sub(1)? as usize;
        self.entities.get_mut(slot)
    }

    /// Like [`EntityTable::get`], failing with
    /// [`GalleryError::UnknownEntity`].
    pub fn resolve(&self, id: EntityId) -> Result<&Entity, GalleryError> {
        self.get(id).ok_or(GalleryError::UnknownEntity(id))
    }

    /// Resolves the owner of `feature`.
    pub fn representative_of(&self, feature: &Feature) -> Result<&Entity, GalleryError> {
        let id = feature
            .representative()
            .ok_or(GalleryError::Unrepresented(feature.id()))?;
        self.resolve(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Entity ids are slot + 1.
fn id_for_slot(slot: usize) -> Result<EntityId, GalleryError> {
    EntityId::try_from(slot)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or(GalleryError::IdsExhausted("entity"))
}

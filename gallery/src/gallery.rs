use tracing::debug;

use crate::entity::{Entity, EntityId, EntityTable};
use crate::error::{GalleryError, check_dim};
use crate::feature::{Feature, IdAllocator};

/// An enrollment session: owns the id allocator, the entity table and
/// every enrolled feature.
///
/// All features of a gallery, probes included, share one dimensionality,
/// fixed by the first enrollment or probe.
#[derive(Debug, Default)]
pub struct Gallery {
    ids: IdAllocator,
    entities: EntityTable,
    features: Vec<Feature>,
    dim: Option<usize>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session whose feature ids continue from `ids`.
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// Enrolls one entity owning one feature per row, then computes its
    /// mean and standard deviation.
    ///
    /// Rows and id capacity are validated before anything is allocated, so
    /// a failed call leaves the gallery unchanged. An entity with no rows is
    /// allowed and keeps empty statistics.
    pub fn enroll<I>(
        &mut self,
        name: impl Into<String>,
        rows: I,
    ) -> Result<EntityId, GalleryError>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        let rows: Vec<Vec<f32>> = rows.into_iter().collect();
        let dim = self.dim.or_else(|| rows.first().map(Vec::len));
        if let Some(dim) = dim {
            for row in &rows {
                check_dim(dim, row.len())?;
            }
        }

        self.check_capacity(rows.len())?;

        let id = self.entities.create(name)?;
        let start = self.features.len();
        for row in rows {
            let feature = self.ids.feature(row)?.with_representative(id);
            self.features.push(feature);
        }
        self.dim = dim;

        let owned = &self.features[start..];
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(GalleryError::UnknownEntity(id))?;
        for f in owned {
            entity.add_feature(f.id());
        }
        entity.calculate_mean(owned)?;
        entity.calculate_std(owned)?;

        debug!(
            entity = %entity,
            features = owned.len(),
            mean_of_means = ?entity.mean_of_means(),
            mean_of_stds = ?entity.mean_of_stds(),
            "gallery: enrolled"
        );
        Ok(id)
    }

    /// Creates a probe feature (no representative) with a fresh id.
    pub fn probe(&mut self, values: Vec<f32>) -> Result<Feature, GalleryError> {
        if let Some(dim) = self.dim {
            check_dim(dim, values.len())?;
        }
        let len = values.len();
        let feature = self.ids.feature(values)?;
        if self.dim.is_none() {
            self.dim = Some(len);
        }
        Ok(feature)
    }

    /// Creates one probe per row. All rows are validated first.
    pub fn probes<I>(&mut self, rows: I) -> Result<Vec<Feature>, GalleryError>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        let rows: Vec<Vec<f32>> = rows.into_iter().collect();
        if let Some(dim) = self.dim.or_else(|| rows.first().map(Vec::len)) {
            for row in &rows {
                check_dim(dim, row.len())?;
            }
        }
        self.check_capacity(rows.len())?;
        rows.into_iter().map(|row| self.probe(row)).collect()
    }

    fn check_capacity(&self, n: usize) -> Result<(), GalleryError> {
        if (n as u64) > self.ids.remaining() {
            return Err(GalleryError::IdsExhausted("feature"));
        }
        Ok(())
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Every enrolled feature, grouped by entity in enrollment order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Dimensionality of the gallery, once known.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Number of enrolled features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

use std::borrow::Borrow;

use crate::distance::{DistanceCounter, Metric};
use crate::entity::{Entity, EntityTable};
use crate::error::{GalleryError, check_dim};
use crate::feature::Feature;
use crate::nnlist::NNList;
use crate::search::{KnnSearch, SequentialSearcher};

/// Linear scan that compares the query in each candidate's own statistical
/// space.
///
/// For every indexed feature the query is remapped with the statistics of
/// that feature's representative entity, `mean[i] + query[i] * stddev[i]`,
/// before the distance is taken. The remap is redone per candidate since
/// neighbouring candidates may belong to different entities.
///
/// Every indexed feature needs a representative with computed statistics;
/// otherwise the search fails with [`GalleryError::Unrepresented`] or
/// [`GalleryError::StatsNotComputed`].
#[derive(Debug, Clone)]
pub struct AlignedSearcher<'t, F = Feature> {
    inner: SequentialSearcher<F>,
    entities: &'t EntityTable,
}

impl<'t> AlignedSearcher<'t> {
    pub fn new(metric: Metric, entities: &'t EntityTable) -> Self {
        Self::with_metric(metric, entities)
    }

    /// Remaps `query` into `entity`'s statistical space. The result carries
    /// the unassigned id.
    pub fn align_to_candidate(
        query: &[f32],
        entity: &Entity,
    ) -> Result<Feature, GalleryError> {
        Ok(Feature::unassigned(entity.remap(query)?))
    }

    /// Rewrites every feature in place as `value[i] * stddev[i] + mean[i]`,
    /// using the statistics of the feature's own representative.
    ///
    /// All features are checked before any is modified, so on error the
    /// slice is left untouched. This is independent of the per-candidate
    /// remap done by [`KnnSearch::knn`]; callers choose whether to apply
    /// one, the other, or both.
    pub fn normalize_all(
        features: &mut [Feature],
        entities: &EntityTable,
    ) -> Result<(), GalleryError> {
        for f in features.iter() {
            let rep = entities.representative_of(f)?;
            if !rep.has_stats() {
                return Err(GalleryError::StatsNotComputed(rep.id()));
            }
            check_dim(rep.mean().len(), f.len())?;
        }
        for f in features.iter_mut() {
            let rep = entities.representative_of(f)?;
            rep.remap_in_place(&mut f.values)?;
        }
        Ok(())
    }
}

impl<'t, 'a> AlignedSearcher<'t, &'a Feature> {
    /// Creates an index over features owned elsewhere, e.g. by a
    /// [`Gallery`](crate::Gallery).
    pub fn borrowing(metric: Metric, entities: &'t EntityTable) -> Self {
        Self::with_metric(metric, entities)
    }
}

impl<'t, F: Borrow<Feature>> AlignedSearcher<'t, F> {
    fn with_metric(metric: Metric, entities: &'t EntityTable) -> Self {
        Self {
            inner: SequentialSearcher::<F>::with_metric(metric),
            entities,
        }
    }

    pub fn with_counter(mut self, counter: DistanceCounter) -> Self {
        self.inner = self.inner.with_counter(counter);
        self
    }

    pub fn with_sentinel(mut self, distance: f32) -> Self {
        self.inner = self.inner.with_sentinel(distance);
        self
    }

    pub fn add(&mut self, feature: F) {
        self.inner.add(feature);
    }

    pub fn add_all(&mut self, features: impl IntoIterator<Item = F>) {
        self.inner.add_all(features);
    }

    pub fn metric(&self) -> Metric {
        self.inner.metric()
    }

    pub fn counter(&self) -> &DistanceCounter {
        self.inner.counter()
    }

    pub fn features(&self) -> &[F] {
        self.inner.features()
    }
}

impl<F: Borrow<Feature> + Send + Sync> KnnSearch for AlignedSearcher<'_, F> {
    fn knn(&self, query: &[f32], k: usize) -> Result<NNList<&Feature>, GalleryError> {
        let mut list = self.inner.new_list(k);
        let mut aligned = Vec::with_capacity(query.len());
        for candidate in self.inner.iter() {
            let rep = self.entities.representative_of(candidate)?;
            aligned.clear();
            aligned.extend_from_slice(query);
            rep.remap_in_place(&mut aligned)?;

            let d = self.inner.distance(&aligned, &candidate.values)?;
            list.insert(candidate, d);
        }
        Ok(list)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

use std::borrow::Borrow;

use crate::distance::{DistanceCounter, Metric};
use crate::error::GalleryError;
use crate::feature::{Feature, SENTINEL};
use crate::nnlist::NNList;

/// Exact k-nearest-neighbor search over a set of indexed features.
///
/// Searching never mutates the index, so a fully built index can be shared
/// by several threads. Insertions must not race with searches.
pub trait KnnSearch: Send + Sync {
    /// Returns the `k` indexed features closest to `query`, ordered by
    /// ascending distance.
    ///
    /// A dimension mismatch with any indexed feature aborts the search.
    fn knn(&self, query: &[f32], k: usize) -> Result<NNList<&Feature>, GalleryError>;

    /// Number of indexed features.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Linear scan over every indexed feature. O(n) distance evaluations per
/// query.
///
/// The index either owns its features (`SequentialSearcher<Feature>`, built
/// with [`SequentialSearcher::new`]) or borrows them from a collection that
/// outlives it (`SequentialSearcher<&Feature>`, built with
/// [`SequentialSearcher::borrowing`]).
#[derive(Debug, Clone)]
pub struct SequentialSearcher<F = Feature> {
    metric: Metric,
    features: Vec<F>,
    counter: DistanceCounter,
    sentinel: Option<f32>,
}

impl SequentialSearcher {
    pub fn new(metric: Metric) -> Self {
        Self::with_metric(metric)
    }
}

impl<'a> SequentialSearcher<&'a Feature> {
    /// Creates an index over features owned elsewhere, e.g. by a
    /// [`Gallery`](crate::Gallery).
    pub fn borrowing(metric: Metric) -> Self {
        Self::with_metric(metric)
    }
}

impl<F: Borrow<Feature>> SequentialSearcher<F> {
    pub(crate) fn with_metric(metric: Metric) -> Self {
        Self {
            metric,
            features: Vec::new(),
            counter: DistanceCounter::new(),
            sentinel: None,
        }
    }

    /// Records distance evaluations on `counter` instead of a private one.
    pub fn with_counter(mut self, counter: DistanceCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Starts every result list full of unrepresented sentinel entries at
    /// `distance` instead of empty.
    pub fn with_sentinel(mut self, distance: f32) -> Self {
        self.sentinel = Some(distance);
        self
    }

    /// Indexes a single feature.
    pub fn add(&mut self, feature: F) {
        self.features.push(feature);
    }

    /// Indexes every feature of `features`.
    pub fn add_all(&mut self, features: impl IntoIterator<Item = F>) {
        self.features.extend(features);
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn counter(&self) -> &DistanceCounter {
        &self.counter
    }

    /// Indexed features in insertion order.
    pub fn features(&self) -> &[F] {
        &self.features
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().map(<F as Borrow<Feature>>::borrow)
    }

    pub(crate) fn new_list(&self, k: usize) -> NNList<&Feature> {
        match self.sentinel {
            Some(distance) => NNList::filled(k, &SENTINEL, distance),
            None => NNList::new(k),
        }
    }

    pub(crate) fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32, GalleryError> {
        self.metric.distance_counted(a, b, &self.counter)
    }
}

impl<F: Borrow<Feature> + Send + Sync> KnnSearch for SequentialSearcher<F> {
    fn knn(&self, query: &[f32], k: usize) -> Result<NNList<&Feature>, GalleryError> {
        let mut list = self.new_list(k);
        for candidate in self.iter() {
            let d = self.distance(query, &candidate.values)?;
            list.insert(candidate, d);
        }
        Ok(list)
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

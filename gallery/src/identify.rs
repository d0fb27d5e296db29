use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aligned::AlignedSearcher;
use crate::distance::{DistanceCounter, Metric};
use crate::error::GalleryError;
use crate::feature::Feature;
use crate::gallery::Gallery;
use crate::nnlist::NNList;
use crate::result::{Candidate, NNResult, Policy};
use crate::search::{KnnSearch, SequentialSearcher};

/// Controls an [`Identifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    /// Neighbors retrieved per probe. Default: 5.
    pub neighbors: usize,

    /// Entities returned by [`Identifier::identify`]. Default: 2.
    pub top: usize,

    /// Ranking policy. Default: frequency.
    pub policy: Policy,

    /// Distance metric. Default: euclidean.
    pub metric: Metric,

    /// Compare each probe in every candidate's own statistical space
    /// ([`AlignedSearcher`]) instead of the raw space. Default: false.
    pub aligned: bool,

    /// Threads used to search probes. Default: 1.
    pub workers: usize,

    /// Pre-fill every neighbor list with sentinels at this distance.
    pub sentinel: Option<f32>,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            neighbors: 5,
            top: 2,
            policy: Policy::Frequency,
            metric: Metric::Euclidean,
            aligned: false,
            workers: 1,
            sentinel: None,
        }
    }
}

impl IdentifyConfig {
    /// Replaces zero counts with their defaults.
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.neighbors == 0 {
            self.neighbors = defaults.neighbors;
        }
        if self.top == 0 {
            self.top = defaults.top;
        }
        if self.workers == 0 {
            self.workers = defaults.workers;
        }
        self
    }

    /// Parses a YAML document. Missing fields take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, GalleryError> {
        let cfg: Self =
            serde_yaml::from_str(text).map_err(|e| GalleryError::Config(e.to_string()))?;
        Ok(cfg.with_defaults())
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, GalleryError> {
        let cfg: Self =
            serde_json::from_str(text).map_err(|e| GalleryError::Config(e.to_string()))?;
        Ok(cfg.with_defaults())
    }
}

enum Engine<'g> {
    Exact(SequentialSearcher<&'g Feature>),
    Aligned(AlignedSearcher<'g, &'g Feature>),
}

impl Engine<'_> {
    fn searcher(&self) -> &dyn KnnSearch {
        match self {
            Engine::Exact(s) => s,
            Engine::Aligned(s) => s,
        }
    }

    fn counter(&self) -> &DistanceCounter {
        match self {
            Engine::Exact(s) => s.counter(),
            Engine::Aligned(s) => s.counter(),
        }
    }
}

/// Identifies probes against an enrolled [`Gallery`].
///
/// Construction indexes every gallery feature by reference; afterwards the
/// index is read-only and probes may be searched from several threads. The
/// bulk [`AlignedSearcher::normalize_all`] pass is never applied here.
pub struct Identifier<'g> {
    gallery: &'g Gallery,
    engine: Engine<'g>,
    cfg: IdentifyConfig,
}

impl<'g> Identifier<'g> {
    pub fn new(gallery: &'g Gallery, cfg: IdentifyConfig) -> Self {
        let cfg = cfg.with_defaults();
        let features = gallery.features();
        let engine = if cfg.aligned {
            let mut s = AlignedSearcher::borrowing(cfg.metric, gallery.entities());
            if let Some(d) = cfg.sentinel {
                s = s.with_sentinel(d);
            }
            s.add_all(features);
            Engine::Aligned(s)
        } else {
            let mut s = SequentialSearcher::borrowing(cfg.metric);
            if let Some(d) = cfg.sentinel {
                s = s.with_sentinel(d);
            }
            s.add_all(features);
            Engine::Exact(s)
        };
        debug!(
            features = gallery.len(),
            entities = gallery.entities().len(),
            metric = %cfg.metric,
            aligned = cfg.aligned,
            "gallery: index built"
        );
        Self {
            gallery,
            engine,
            cfg,
        }
    }

    pub fn config(&self) -> &IdentifyConfig {
        &self.cfg
    }

    pub fn gallery(&self) -> &'g Gallery {
        self.gallery
    }

    /// Counts every distance evaluated by this identifier.
    pub fn counter(&self) -> &DistanceCounter {
        self.engine.counter()
    }

    /// Searches every probe, returning one neighbor list per probe in probe
    /// order. The first failing probe aborts the whole call.
    pub fn search(&self, probes: &[Feature]) -> Result<Vec<NNList<&Feature>>, GalleryError> {
        let searcher = self.engine.searcher();
        let k = self.cfg.neighbors;
        let workers = self.cfg.workers.min(probes.len()).max(1);

        if workers == 1 {
            return probes.iter().map(|p| searcher.knn(&p.values, k)).collect();
        }

        let chunk = probes.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = probes
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .map(|p| searcher.knn(&p.values, k))
                            .collect::<Result<Vec<_>, _>>()
                    })
                })
                .collect();

            let mut lists = Vec::with_capacity(probes.len());
            for handle in handles {
                let part = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                lists.extend(part);
            }
            Ok(lists)
        })
    }

    /// Searches every probe and ranks gallery entities with the configured
    /// policy.
    pub fn identify(&self, probes: &[Feature]) -> Result<Vec<Candidate>, GalleryError> {
        let start = Instant::now();
        let calls_before = self.counter().get();

        let lists = self.search(probes)?;
        let mut result = NNResult::new(lists);
        let best = result.pick(self.cfg.top, self.cfg.policy);

        debug!(
            probes = probes.len(),
            neighbors = result.len(),
            distance_calls = self.counter().get().saturating_sub(calls_before),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "gallery: identified"
        );
        for c in &best {
            if let Some(entity) = self.gallery.entity(c.entity) {
                debug!(
                    entity = %entity,
                    score = c.score,
                    policy = %self.cfg.policy,
                    "gallery: candidate"
                );
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery() -> (Gallery, Vec<Feature>) {
        let mut g = Gallery::new();
        g.enroll("alice", vec![vec![0.0, 0.0], vec![0.2, 0.1], vec![0.1, 0.3]])
            .unwrap();
        g.enroll("bob", vec![vec![5.0, 5.0], vec![5.2, 4.9]]).unwrap();
        g.enroll("carol", vec![vec![-4.0, 3.0]]).unwrap();
        let probes = g
            .probes(vec![vec![0.1, 0.1], vec![0.0, 0.2], vec![4.9, 5.1]])
            .unwrap();
        (g, probes)
    }

    #[test]
    fn config_defaults() {
        let cfg = IdentifyConfig::default();
        assert_eq!(cfg.neighbors, 5);
        assert_eq!(cfg.top, 2);
        assert_eq!(cfg.policy, Policy::Frequency);
        assert_eq!(cfg.metric, Metric::Euclidean);
        assert!(!cfg.aligned);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.sentinel, None);
    }

    #[test]
    fn config_zero_values_take_defaults() {
        let cfg = IdentifyConfig {
            neighbors: 0,
            top: 0,
            workers: 0,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(cfg, IdentifyConfig::default());
    }

    #[test]
    fn config_from_yaml() {
        let cfg = IdentifyConfig::from_yaml(
            "neighbors: 3\npolicy: distance\nmetric: normalized_cosine\nworkers: 4\n",
        )
        .unwrap();
        assert_eq!(cfg.neighbors, 3);
        assert_eq!(cfg.top, 2);
        assert_eq!(cfg.policy, Policy::Distance);
        assert_eq!(cfg.metric, Metric::NormalizedCosine);
        assert_eq!(cfg.workers, 4);
    }

    #[test]
    fn config_from_json() {
        let cfg = IdentifyConfig::from_json(r#"{"top": 1, "aligned": true, "sentinel": 100.0}"#)
            .unwrap();
        assert_eq!(cfg.top, 1);
        assert!(cfg.aligned);
        assert_eq!(cfg.sentinel, Some(100.0));
    }

    #[test]
    fn config_rejects_unknown_names() {
        let err = IdentifyConfig::from_yaml("policy: majority\n").unwrap_err();
        assert!(matches!(err, GalleryError::Config(_)), "got {err:?}");
    }

    #[test]
    fn identify_by_frequency() {
        let (g, probes) = gallery();
        let id = Identifier::new(
            &g,
            IdentifyConfig {
                neighbors: 2,
                top: 2,
                ..Default::default()
            },
        );
        let best = id.identify(&probes).unwrap();
        // alice: 2 + 2 votes, bob: 2 votes.
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].entity, 1);
        assert_eq!(best[0].score, 4.0);
        assert_eq!(best[1].entity, 2);
        assert_eq!(best[1].score, 2.0);
        assert_eq!(id.counter().get(), 3 * 6);
    }

    #[test]
    fn identify_by_distance() {
        let (g, probes) = gallery();
        let id = Identifier::new(
            &g,
            IdentifyConfig {
                neighbors: 1,
                top: 3,
                policy: Policy::Distance,
                ..Default::default()
            },
        );
        let best = id.identify(&probes[2..]).unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].entity, 2);
    }

    #[test]
    fn parallel_search_matches_sequential() {
        let (g, probes) = gallery();
        let seq = Identifier::new(&g, IdentifyConfig::default());
        let par = Identifier::new(
            &g,
            IdentifyConfig {
                workers: 2,
                ..Default::default()
            },
        );
        let a = seq.search(&probes).unwrap();
        let b = par.search(&probes).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.as_slice(), y.as_slice());
        }
        assert_eq!(
            seq.identify(&probes).unwrap(),
            par.identify(&probes).unwrap()
        );
    }

    #[test]
    fn search_propagates_dimension_mismatch() {
        let (g, _) = gallery();
        let bad = vec![Feature::unassigned(vec![1.0, 2.0, 3.0])];
        for workers in [1, 2] {
            let id = Identifier::new(
                &g,
                IdentifyConfig {
                    workers,
                    ..Default::default()
                },
            );
            assert_eq!(
                id.identify(&bad).unwrap_err(),
                GalleryError::DimensionMismatch { got: 2, want: 3 }
            );
        }
    }

    #[test]
    fn aligned_engine_is_selected() {
        let (g, probes) = gallery();
        let id = Identifier::new(
            &g,
            IdentifyConfig {
                aligned: true,
                ..Default::default()
            },
        );
        // carol has a single feature, so zero deviation; the remap sends
        // every probe onto her mean and her feature is always at distance 0.
        let lists = id.search(&probes).unwrap();
        for list in &lists {
            assert_eq!(list[0].element.representative(), Some(3));
            assert_eq!(list[0].distance, 0.0);
        }
    }

    #[test]
    fn no_probes() {
        let (g, _) = gallery();
        let id = Identifier::new(&g, IdentifyConfig::default());
        assert!(id.search(&[]).unwrap().is_empty());
        assert!(id.identify(&[]).unwrap().is_empty());
    }

    #[test]
    fn index_borrows_gallery_features() {
        let (g, probes) = gallery();
        for aligned in [false, true] {
            let id = Identifier::new(
                &g,
                IdentifyConfig {
                    aligned,
                    ..Default::default()
                },
            );
            let lists = id.search(&probes).unwrap();
            for entry in lists.iter().flatten() {
                assert!(
                    g.features().iter().any(|f| std::ptr::eq(f, entry.element)),
                    "neighbor {} is not a gallery feature",
                    entry.element
                );
            }
        }
    }
}

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::GalleryError;
use crate::feature::Feature;
use crate::nnlist::{NNList, NeighborEntry};

/// How [`NNResult::pick`] ranks entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Most frequent representative among all retained neighbors.
    #[default]
    Frequency,
    /// Closest single supporting neighbor per representative.
    Distance,
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Frequency => "frequency",
            Policy::Distance => "distance",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequency" => Ok(Policy::Frequency),
            "distance" => Ok(Policy::Distance),
            _ => Err(GalleryError::UnknownPolicy(s.to_string())),
        }
    }
}

/// A ranked identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: EntityId,

    /// Neighbor count for [`Policy::Frequency`], best distance for
    /// [`Policy::Distance`].
    pub score: f64,
}

/// Anything that may point at an owning entity.
pub trait Represented {
    fn representative(&self) -> Option<EntityId>;
}

impl Represented for Feature {
    fn representative(&self) -> Option<EntityId> {
        Feature::representative(self)
    }
}

impl<T: Represented + ?Sized> Represented for &T {
    fn representative(&self) -> Option<EntityId> {
        (**self).representative()
    }
}

/// Neighbors of many probes flattened into one sequence and ranked by
/// owning entity.
///
/// Entries without a representative (sentinels, bare probes) are kept but
/// never vote. Ranking may reorder the flattened sequence.
#[derive(Debug, Clone)]
pub struct NNResult<T> {
    entries: Vec<NeighborEntry<T>>,
}

impl<T> NNResult<T> {
    /// Flattens `lists` in order. The per-probe grouping is not retained.
    pub fn new(lists: impl IntoIterator<Item = NNList<T>>) -> Self {
        let entries = lists.into_iter().flatten().collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[NeighborEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Represented> NNResult<T> {
    /// Ranks the best `k` entities by the policy named `policy`
    /// (`"frequency"` or `"distance"`).
    pub fn pick_best(&mut self, k: usize, policy: &str) -> Result<Vec<Candidate>, GalleryError> {
        let policy: Policy = policy.parse()?;
        Ok(self.pick(k, policy))
    }

    /// Ranks the best `k` entities by `policy`.
    pub fn pick(&mut self, k: usize, policy: Policy) -> Vec<Candidate> {
        match policy {
            Policy::Frequency => self.by_frequency(k),
            Policy::Distance => self.by_distance(k),
        }
    }

    /// Counts neighbors per entity, most frequent first. Equal counts keep
    /// the order in which entities first appear.
    fn by_frequency(&self, k: usize) -> Vec<Candidate> {
        let mut counts: Vec<(EntityId, usize)> = Vec::new();
        let mut slot: HashMap<EntityId, usize> = HashMap::new();
        for entry in &self.entries {
            let Some(entity) = entry.element.representative() else {
                continue;
            };
            let i = *slot.entry(entity).or_insert_with(|| {
                counts.push((entity, 0));
                counts.len() - 1
            });
            counts[i].1 += 1;
        }

        // Stable: ties stay in first-seen order.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(k)
            .map(|(entity, count)| Candidate {
                entity,
                score: count as f64,
            })
            .collect()
    }

    /// Closest neighbor per entity, closest first.
    fn by_distance(&mut self, k: usize) -> Vec<Candidate> {
        if k == 0 {
            return Vec::new();
        }

        // Stable: equal distances stay in flattened order.
        self.entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut best = Vec::with_capacity(k);
        let mut seen: HashSet<EntityId> = HashSet::new();
        for entry in &self.entries {
            let Some(entity) = entry.element.representative() else {
                continue;
            };
            if seen.insert(entity) {
                best.push(Candidate {
                    entity,
                    score: entry.distance as f64,
                });
                if best.len() == k {
                    break;
                }
            }
        }
        best
    }
}

impl<T> From<Vec<NNList<T>>> for NNResult<T> {
    fn from(lists: Vec<NNList<T>>) -> Self {
        Self::new(lists)
    }
}

impl<T: fmt::Display> fmt::Display for NNResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{} {}; ", entry.element, entry.distance)?;
        }
        Ok(())
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut};

use crate::entity::EntityId;
use crate::error::GalleryError;
use crate::linalg;

/// Identifier of a [`Feature`]. `0` means "unassigned".
pub type FeatureId = u32;

/// Reserved id for derived vectors (means, deviations, aligned queries).
pub const UNASSIGNED: FeatureId = 0;

/// Empty, unrepresented feature used to fill sentinel slots of a
/// pre-filled [`NNList`](crate::NNList).
pub(crate) static SENTINEL: Feature = Feature {
    id: UNASSIGNED,
    values: Vec::new(),
    representative: None,
};

/// A fixed-length numeric vector with a process-unique identifier.
///
/// Two features compare equal when their ids are equal; the values are
/// not part of identity and may be rewritten in place by normalization.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    id: FeatureId,

    /// Components of the vector.
    pub values: Vec<f32>,

    /// Owning entity, resolved through an [`EntityTable`](crate::EntityTable).
    representative: Option<EntityId>,
}

impl Feature {
    /// Creates a feature with id [`UNASSIGNED`]. Never collides.
    pub fn unassigned(values: Vec<f32>) -> Self {
        Self {
            id: UNASSIGNED,
            values,
            representative: None,
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Returns the id of the owning entity, if any.
    pub fn representative(&self) -> Option<EntityId> {
        self.representative
    }

    /// Attaches the feature to an owning entity.
    pub fn set_representative(&mut self, entity: EntityId) {
        self.representative = Some(entity);
    }

    pub fn with_representative(mut self, entity: EntityId) -> Self {
        self.set_representative(entity);
        self
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean norm of the values.
    pub fn norm(&self) -> f32 {
        linalg::norm(&self.values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl AsRef<[f32]> for Feature {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl Index<usize> for Feature {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.values[index]
    }
}

impl IndexMut<usize> for Feature {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.values[index]
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.representative {
            Some(rep) => write!(f, "(id:{}, rep:{})", self.id, rep),
            None => write!(f, "(id:{})", self.id),
        }
    }
}

/// Hands out monotonically increasing feature ids.
///
/// Ids start at 1 and are never reused by the same allocator. Explicit ids
/// are accepted only when they are not below the next free id; the reserved
/// id [`UNASSIGNED`] is always accepted and leaves the counter untouched.
/// Once [`FeatureId::MAX`] has been handed out the allocator is exhausted.
#[derive(Debug)]
pub struct IdAllocator {
    /// `None` once every id has been used.
    next: Option<FeatureId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: Some(1) }
    }

    /// The id the next auto-assigned feature will receive, or `None` when
    /// the allocator is exhausted.
    pub fn next_id(&self) -> Option<FeatureId> {
        self.next
    }

    /// Number of ids still available.
    pub fn remaining(&self) -> u64 {
        self.next
            .map_or(0, |n| u64::from(FeatureId::MAX) - u64::from(n) + 1)
    }

    fn take(&mut self, id: FeatureId) -> FeatureId {
        self.next = id.checked_add(1);
        id
    }

    /// Creates a feature with an auto-assigned id.
    pub fn feature(&mut self, values: Vec<f32>) -> Result<Feature, GalleryError> {
        let next = self.next.ok_or(GalleryError::IdsExhausted("feature"))?;
        Ok(Feature {
            id: self.take(next),
            values,
            representative: None,
        })
    }

    /// Creates a zero-initialized feature of `size` components.
    pub fn zeroed(&mut self, size: usize) -> Result<Feature, GalleryError> {
        self.feature(vec![0.0; size])
    }

    /// Creates a feature with an explicit id.
    pub fn feature_with_id(
        &mut self,
        id: FeatureId,
        values: Vec<f32>,
    ) -> Result<Feature, GalleryError> {
        if id == UNASSIGNED {
            return Ok(Feature::unassigned(values));
        }
        let next = self.next.ok_or(GalleryError::IdsExhausted("feature"))?;
        if id < next {
            return Err(GalleryError::IdCollision { id, next });
        }
        Ok(Feature {
            id: self.take(id),
            values,
            representative: None,
        })
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

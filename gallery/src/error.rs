use thiserror::Error;

use crate::entity::EntityId;
use crate::feature::FeatureId;

/// Errors returned by gallery operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GalleryError {
    #[error("gallery: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("gallery: feature id {id} already used (next free id is {next})")]
    IdCollision { id: FeatureId, next: FeatureId },

    #[error("gallery: unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("gallery: unknown metric: {0}")]
    UnknownMetric(String),

    #[error("gallery: unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("gallery: feature {0} has no representative entity")]
    Unrepresented(FeatureId),

    #[error("gallery: statistics not computed for entity {0}")]
    StatsNotComputed(EntityId),

    #[error("gallery: invalid config: {0}")]
    Config(String),

    #[error("gallery: {0} ids exhausted")]
    IdsExhausted(&'static str),
}

/// Fails with [`GalleryError::DimensionMismatch`] unless `got == want`.
pub(crate) fn check_dim(want: usize, got: usize) -> Result<(), GalleryError> {
    if want != got {
        return Err(GalleryError::DimensionMismatch { got, want });
    }
    Ok(())
}

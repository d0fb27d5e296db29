//! Exact k-nearest-neighbor identification over enrolled feature galleries.
//!
//! Entities (people, speakers, classes) are enrolled with a set of feature
//! vectors. A probe is identified by finding its nearest gallery features and
//! ranking their owning entities, either by vote count or by best distance.
//!
//! # Usage
//!
//! ```
//! use giztoy_gallery::{Gallery, IdentifyConfig, Identifier, Metric, Policy};
//!
//! let mut gallery = Gallery::new();
//! let alice = gallery.enroll("alice", vec![vec![0.0, 0.0], vec![2.0, 0.0]]).unwrap();
//! let bob = gallery.enroll("bob", vec![vec![10.0, 10.0]]).unwrap();
//!
//! let probes = gallery.probes(vec![vec![1.0, 0.0]]).unwrap();
//! let id = Identifier::new(&gallery, IdentifyConfig {
//!     neighbors: 1,
//!     top: 1,
//!     policy: Policy::Distance,
//!     metric: Metric::Euclidean,
//!     ..Default::default()
//! });
//!
//! let best = id.identify(&probes).unwrap();
//! assert_eq!(best[0].entity, alice);
//! assert_eq!(best[0].score, 1.0);
//! assert_ne!(best[0].entity, bob);
//! ```
//!
//! # Design
//!
//! Features refer to their owning entity by [`EntityId`]; the entity table
//! ([`EntityTable`]) resolves ids. Searches never mutate the index, so one
//! built [`Identifier`] can serve many threads.

mod aligned;
mod distance;
mod entity;
mod error;
mod feature;
mod gallery;
mod identify;
pub mod linalg;
mod nnlist;
mod result;
mod search;

pub use aligned::AlignedSearcher;
pub use distance::{DistanceCounter, Metric};
pub use entity::{Entity, EntityId, EntityTable};
pub use error::GalleryError;
pub use feature::{Feature, FeatureId, IdAllocator, UNASSIGNED};
pub use gallery::Gallery;
pub use identify::{IdentifyConfig, Identifier};
pub use nnlist::{NNList, NeighborEntry};
pub use result::{Candidate, NNResult, Policy, Represented};
pub use search::{KnnSearch, SequentialSearcher};

//! Classical multidimensional scaling for proximity-derived distances.
//!
//! Takes a condensed pairwise distance vector, double-centers the
//! squared distances, and projects the samples onto the leading
//! eigenvectors. Used to turn a random-forest proximity matrix into
//! 2-D ordination coordinates.

mod error;
mod mds;

pub use error::MdsError;
pub use mds::{MdsEmbedding, classical_mds};

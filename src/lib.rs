pub mod error;
pub mod io;
pub mod particles;
pub mod utils;

pub use crate::error::*;
pub use crate::io::*;
pub use crate::particles::*;
pub use crate::utils::*;

/// Turns counted particles into per-identifier conditional probabilities:
/// combine duplicate weights, normalize over every pair, then renormalize
/// within each identifier.
pub fn collate(counts: &ParticleCounts) -> Result<Vec<Posterior>> {
    if counts.is_empty() {
        return Err(CollateError::Domain(
            "no particle records to normalize".to_string(),
        ));
    }
    let combined = CombinedLogWeights::from_counts(counts)?;
    let joint = combined.normalize()?;
    renormalize(&joint)
}

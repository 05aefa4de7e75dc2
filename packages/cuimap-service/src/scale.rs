use cuimap_storage::models::SparseVector;

use crate::{Error, Result};

pub fn validate_alpha(alpha: f32) -> Result<()> {
	if !(0.0..=1.0).contains(&alpha) {
		return Err(Error::InvalidParameter {
			message: format!("alpha must be between 0 and 1, got {alpha}."),
		});
	}

	Ok(())
}

/// Blends a dense and a sparse query into one hybrid pair.
///
/// The dense vector is multiplied by `alpha` and the sparse weights by `1 - alpha`; sparse
/// indices are kept as is.
pub fn hybrid_scale(
	dense: &[f32],
	sparse: &SparseVector,
	alpha: f32,
) -> Result<(Vec<f32>, SparseVector)> {
	validate_alpha(alpha)?;

	let dense = dense.iter().map(|value| value * alpha).collect();
	let sparse = SparseVector {
		indices: sparse.indices.clone(),
		values: sparse.values.iter().map(|value| value * (1.0 - alpha)).collect(),
	};

	Ok((dense, sparse))
}

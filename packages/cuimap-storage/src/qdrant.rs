use std::collections::{HashMap, HashSet};

use qdrant_client::qdrant::{
	Condition, Filter, PointId, Query, QueryPointsBuilder, ScoredPoint, VectorInput,
	point_id::PointIdOptions, vector_output::Vector,
};

use crate::{
	Result,
	models::{ScoredConcept, SparseVector},
};

/// Qdrant collection holding named dense and sparse vectors per concept, partitioned by a
/// keyword payload field.
pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub dense_vector: String,
	pub sparse_vector: String,
	pub namespace_field: String,
	pub candidate_pool_factor: u32,
}
impl QdrantStore {
	pub fn new(cfg: &cuimap_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			dense_vector: cfg.dense_vector.clone(),
			sparse_vector: cfg.sparse_vector.clone(),
			namespace_field: cfg.namespace_field.clone(),
			candidate_pool_factor: cfg.candidate_pool_factor,
		})
	}

	/// Scores concepts by `dense·D + sparse·S` against their stored vectors, best first.
	///
	/// Each leg only nominates candidates; every nominated point is rescored on both spaces.
	pub async fn query_hybrid(
		&self,
		namespace: &str,
		dense: &[f32],
		sparse: &SparseVector,
		top_k: u32,
	) -> Result<Vec<ScoredConcept>> {
		let filter = Filter::must([Condition::matches(
			self.namespace_field.as_str(),
			namespace.to_string(),
		)]);
		let pool = u64::from(top_k).saturating_mul(u64::from(self.candidate_pool_factor.max(1)));
		let mut nominated = Vec::new();

		if dense.iter().any(|value| *value != 0.0) {
			let search = QueryPointsBuilder::new(self.collection.clone())
				.query(Query::new_nearest(dense.to_vec()))
				.using(self.dense_vector.as_str())
				.filter(filter.clone())
				.with_payload(false)
				.with_vectors(true)
				.limit(pool);

			nominated.extend(self.stored_points(self.client.query(search).await?.result));
		}

		let dense_count = nominated.len();

		if sparse.values.iter().any(|value| *value != 0.0) {
			let search = QueryPointsBuilder::new(self.collection.clone())
				.query(Query::new_nearest(VectorInput::new_sparse(
					sparse.indices.clone(),
					sparse.values.clone(),
				)))
				.using(self.sparse_vector.as_str())
				.filter(filter)
				.with_payload(false)
				.with_vectors(true)
				.limit(pool);

			nominated.extend(self.stored_points(self.client.query(search).await?.result));
		}

		tracing::debug!(
			namespace,
			dense = dense_count,
			sparse = nominated.len() - dense_count,
			pool,
			"Qdrant hybrid legs returned."
		);

		Ok(rescore(dense, sparse, nominated, top_k))
	}

	fn stored_points(&self, points: Vec<ScoredPoint>) -> Vec<StoredPoint> {
		let mut out = Vec::with_capacity(points.len());

		for point in points {
			match stored_point(point, &self.dense_vector, &self.sparse_vector) {
				Some(stored) => out.push(stored),
				None => tracing::warn!("Scored point is missing an id."),
			}
		}

		out
	}
}

/// A nominated point with the stored vectors needed to score it on both spaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPoint {
	pub id: String,
	pub dense: Vec<f32>,
	pub sparse: SparseVector,
}

/// Scores the union of nominated points exactly and keeps the best `top_k`.
///
/// A point nominated by both legs is scored once. Equal scores keep nomination order, dense
/// leg first.
pub fn rescore(
	dense: &[f32],
	sparse: &SparseVector,
	nominated: Vec<StoredPoint>,
	top_k: u32,
) -> Vec<ScoredConcept> {
	let mut seen = HashSet::new();
	let mut scored: Vec<ScoredConcept> = nominated
		.into_iter()
		.filter(|point| seen.insert(point.id.clone()))
		.map(|point| ScoredConcept { score: hybrid_score(dense, sparse, &point), id: point.id })
		.collect();

	scored.sort_by(|left, right| right.score.total_cmp(&left.score));
	scored.truncate(top_k as usize);

	scored
}

/// Dot product of the dense query with the stored dense vector plus the sparse dot product.
/// A missing stored vector contributes zero.
pub fn hybrid_score(dense: &[f32], sparse: &SparseVector, point: &StoredPoint) -> f64 {
	let dense_score: f64 =
		dense.iter().zip(&point.dense).map(|(q, d)| f64::from(*q) * f64::from(*d)).sum();
	let weights: HashMap<u32, f32> =
		point.sparse.indices.iter().copied().zip(point.sparse.values.iter().copied()).collect();
	let sparse_score: f64 = sparse
		.indices
		.iter()
		.zip(&sparse.values)
		.filter_map(|(idx, value)| weights.get(idx).map(|w| f64::from(*value) * f64::from(*w)))
		.sum();

	dense_score + sparse_score
}

fn stored_point(point: ScoredPoint, dense_name: &str, sparse_name: &str) -> Option<StoredPoint> {
	let id = point.id.as_ref().and_then(point_id_to_string)?;
	let vectors = point.vectors.as_ref();
	let dense = vectors
		.and_then(|vectors| vectors.get_vector_by_name(dense_name))
		.and_then(|vector| match vector {
			Vector::Dense(dense) => Some(dense.data),
			_ => None,
		})
		.unwrap_or_default();
	let sparse = vectors
		.and_then(|vectors| vectors.get_vector_by_name(sparse_name))
		.and_then(|vector| match vector {
			Vector::Sparse(sparse) =>
				Some(SparseVector { indices: sparse.indices, values: sparse.values }),
			_ => None,
		})
		.unwrap_or_default();

	Some(StoredPoint { id, dense, sparse })
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match point_id.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => Some(num.to_string()),
		PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
	}
}
